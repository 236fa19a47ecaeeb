//! # Retrieval Pipeline Module
//!
//! Single-shot retrieval-augmented answering: one embedding call, one index
//! search, one generation call per query. No query rewriting, no re-ranking,
//! no iterative retrieval, so latency and cost stay bounded to one round
//! trip per external service.
//!
//! The index sits behind a coarse `RwLock`: searches take read guards,
//! mutation (building, appending, saving) requires the write side. That is
//! the entire locking story at this crate's scale.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::embeddings::Embedder;
use crate::errors::{RagLiteError, RagLiteResult};
use crate::generation::GenerationModel;
use crate::index::flat::FlatIndex;
use crate::SearchHit;

/// Output of one [`RagPipeline::answer`] call. `sources` holds one citation
/// key per hit, formatted `source_id#chunk{chunk_index}`, in hit order.
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub hits: Vec<SearchHit>,
}

/// Composes the embedding port, the vector index, and the generation port
/// into a grounded question-answering pipeline.
pub struct RagPipeline {
    index: Arc<RwLock<FlatIndex>>,
    embedder: Embedder,
    llm: Box<dyn GenerationModel>,
    max_retrieval: usize,
}

impl RagPipeline {
    /// Fails with [`RagLiteError::InvalidMaxRetrieval`] when the retrieval
    /// cap would not admit a single hit.
    pub fn new(
        index: Arc<RwLock<FlatIndex>>,
        embedder: Embedder,
        llm: Box<dyn GenerationModel>,
        max_retrieval: usize,
    ) -> RagLiteResult<Self> {
        if max_retrieval == 0 {
            return Err(RagLiteError::InvalidMaxRetrieval(0));
        }
        Ok(Self {
            index,
            embedder,
            llm,
            max_retrieval,
        })
    }

    /// Answer `query` from the indexed corpus.
    ///
    /// Embeds the query, retrieves up to `max_retrieval` chunks, assembles a
    /// numbered context block, and asks the generation model for an answer
    /// that cites only the provided context. Zero retrieved hits is not an
    /// error: the prompt still goes out with an empty context block and the
    /// generator is expected to say it has nothing to ground on.
    pub fn answer(&self, query: &str) -> RagLiteResult<AnswerResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagLiteError::EmptyQuery);
        }

        let query_vector = self
            .embedder
            .embed(&[query.to_string()])?
            .into_iter()
            .next()
            .ok_or(crate::embeddings::EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            })?;

        let hits = {
            let index = self
                .index
                .read()
                .map_err(|e| RagLiteError::Lock(e.to_string()))?;
            index.search(&query_vector, self.max_retrieval)?
        };
        debug!(hits = hits.len(), "retrieved context for query");

        let (context_block, sources) = build_context(&hits);
        let prompt = build_prompt(&context_block, query);
        let answer = self.llm.generate(&prompt)?;

        Ok(AnswerResponse {
            answer,
            sources,
            hits,
        })
    }
}

/// Build the numbered context block and the parallel citation list, both in
/// hit ranking order.
fn build_context(hits: &[SearchHit]) -> (String, Vec<String>) {
    let mut entries = Vec::with_capacity(hits.len());
    let mut sources = Vec::with_capacity(hits.len());
    for (i, hit) in hits.iter().enumerate() {
        let meta = &hit.metadata;
        entries.push(format!(
            "[{}] Source: {} | chunk_id: {}\n{}",
            i + 1,
            meta.source_id,
            meta.chunk_index,
            meta.text
        ));
        sources.push(format!("{}#chunk{}", meta.source_id, meta.chunk_index));
    }
    (entries.join("\n\n---\n\n"), sources)
}

fn build_prompt(context_block: &str, query: &str) -> String {
    format!(
        "You are a helpful assistant. Use the provided context to answer the question. \
         Cite only from the provided context and list sources at the end.\n\n\
         CONTEXT:\n{}\n\nQUESTION: {}\n\nAnswer:",
        context_block, query
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{self, EmbeddingModel};
    use crate::generation;
    use crate::Chunk;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Maps known texts onto fixed 2-d unit vectors.
    struct TableEmbeddings;

    impl EmbeddingModel for TableEmbeddings {
        fn embed_batch(&self, texts: &[String]) -> embeddings::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    t if t.contains("alpha") => vec![1.0, 0.0],
                    t if t.contains("beta") => vec![0.0, 1.0],
                    _ => vec![0.7, 0.7],
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    /// Records every prompt it sees and returns a canned answer.
    struct RecordingLlm {
        prompts: Arc<Mutex<Vec<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl RecordingLlm {
        fn new() -> (Self, Arc<Mutex<Vec<String>>>, Arc<AtomicUsize>) {
            let prompts = Arc::new(Mutex::new(Vec::new()));
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    prompts: Arc::clone(&prompts),
                    calls: Arc::clone(&calls),
                },
                prompts,
                calls,
            )
        }
    }

    impl GenerationModel for RecordingLlm {
        fn generate(&self, prompt: &str) -> generation::Result<String> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("canned answer".to_string())
        }
    }

    struct FailingLlm;

    impl GenerationModel for FailingLlm {
        fn generate(&self, _prompt: &str) -> generation::Result<String> {
            Err(generation::GenerationError::Provider(
                "model unavailable".to_string(),
            ))
        }
    }

    fn chunk(text: &str, source_id: &str, chunk_index: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_id: source_id.to_string(),
            chunk_index,
        }
    }

    fn corpus_index() -> Arc<RwLock<FlatIndex>> {
        // doc1 has two chunks, doc2 one; vectors are pre-normalized.
        let index = FlatIndex::build(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.6, 0.8]],
            vec![
                chunk("beta facts live here", "doc1", 0),
                chunk("alpha facts live here", "doc1", 1),
                chunk("mixed facts live here", "doc2", 0),
            ],
        )
        .unwrap();
        Arc::new(RwLock::new(index))
    }

    fn pipeline_with(
        index: Arc<RwLock<FlatIndex>>,
        llm: Box<dyn GenerationModel>,
        max_retrieval: usize,
    ) -> RagPipeline {
        RagPipeline::new(
            index,
            Embedder::new(Box::new(TableEmbeddings), 32),
            llm,
            max_retrieval,
        )
        .unwrap()
    }

    #[test]
    fn test_answer_cites_best_chunk_first_and_generates_once() {
        let (llm, prompts, calls) = RecordingLlm::new();
        let pipeline = pipeline_with(corpus_index(), Box::new(llm), 2);

        let response = pipeline.answer("tell me about alpha").unwrap();

        assert_eq!(response.answer, "canned answer");
        assert_eq!(response.sources[0], "doc1#chunk1");
        assert_eq!(response.sources.len(), response.hits.len());
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("alpha facts live here"));
        assert!(prompts[0].contains("QUESTION: tell me about alpha"));
    }

    #[test]
    fn test_sources_follow_hit_order() {
        let (llm, _, _) = RecordingLlm::new();
        let pipeline = pipeline_with(corpus_index(), Box::new(llm), 3);

        let response = pipeline.answer("tell me about alpha").unwrap();
        // Query [1,0]: scores 0.0 (doc1#0), 1.0 (doc1#1), 0.6 (doc2#0).
        assert_eq!(
            response.sources,
            vec!["doc1#chunk1", "doc2#chunk0", "doc1#chunk0"]
        );
        for (source, hit) in response.sources.iter().zip(response.hits.iter()) {
            assert_eq!(
                source,
                &format!("{}#chunk{}", hit.metadata.source_id, hit.metadata.chunk_index)
            );
        }
    }

    #[test]
    fn test_empty_query_is_rejected_before_embedding() {
        let (llm, _, calls) = RecordingLlm::new();
        let pipeline = pipeline_with(corpus_index(), Box::new(llm), 2);

        assert!(matches!(
            pipeline.answer("").unwrap_err(),
            RagLiteError::EmptyQuery
        ));
        assert!(matches!(
            pipeline.answer("   \n ").unwrap_err(),
            RagLiteError::EmptyQuery
        ));
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_empty_index_still_generates_with_empty_context() {
        let (llm, prompts, calls) = RecordingLlm::new();
        let index = Arc::new(RwLock::new(FlatIndex::new()));
        let pipeline = pipeline_with(index, Box::new(llm), 5);

        let response = pipeline.answer("anything at all").unwrap();
        assert!(response.sources.is_empty());
        assert!(response.hits.is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert!(prompts.lock().unwrap()[0].contains("CONTEXT:\n\n"));
    }

    #[test]
    fn test_generation_failure_propagates() {
        let pipeline = pipeline_with(corpus_index(), Box::new(FailingLlm), 2);
        let err = pipeline.answer("tell me about beta").unwrap_err();
        assert!(matches!(err, RagLiteError::Generation(_)));
    }

    #[test]
    fn test_zero_max_retrieval_is_rejected_at_construction() {
        let (llm, _, _) = RecordingLlm::new();
        let err = RagPipeline::new(
            corpus_index(),
            Embedder::new(Box::new(TableEmbeddings), 32),
            Box::new(llm),
            0,
        )
        .err()
        .unwrap();
        assert!(matches!(err, RagLiteError::InvalidMaxRetrieval(0)));
    }

    #[test]
    fn test_concurrent_searches_share_the_index() {
        let (llm, _, _) = RecordingLlm::new();
        let index = corpus_index();
        let pipeline = Arc::new(pipeline_with(Arc::clone(&index), Box::new(llm), 2));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pipeline = Arc::clone(&pipeline);
                std::thread::spawn(move || pipeline.answer("tell me about alpha").unwrap())
            })
            .collect();
        for handle in handles {
            let response = handle.join().unwrap();
            assert_eq!(response.sources[0], "doc1#chunk1");
        }
    }
}
