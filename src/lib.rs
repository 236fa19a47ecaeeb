//! # raglite
//!
//! A small retrieval-augmented generation core. Documents are split into
//! overlapping chunks, embedded into unit-normalized vectors, and stored in
//! an exact in-memory inner-product index alongside their metadata. At query
//! time the pipeline retrieves the top-scoring chunks, assembles a grounded
//! prompt, and asks a generation model for an answer with citations.
//!
//! The embedding and generation models are consumed through the
//! [`EmbeddingModel`](embeddings::EmbeddingModel) and
//! [`GenerationModel`](generation::GenerationModel) traits; any provider with
//! a fixed output dimensionality can be plugged in. HTTP implementations for
//! OpenAI-compatible endpoints are included.

pub mod chunker;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod persistence;
pub mod pipeline;

pub use chunker::chunk_text;
pub use config::{ChunkingConfig, EmbeddingConfig, LlmConfig, RagConfig, StoreConfig};
pub use embeddings::{Embedder, EmbeddingModel, OpenAiEmbeddings};
pub use errors::{RagLiteError, RagLiteResult};
pub use generation::{GenerationModel, OpenAiChat};
pub use index::flat::FlatIndex;
pub use ingest::{build_index, load_documents, Document};
pub use pipeline::{AnswerResponse, RagPipeline};

use serde::{Deserialize, Serialize};

/// One retrievable unit of text: a bounded slice of a source document.
///
/// `chunk_index` is the 0-based position of the chunk within its source
/// document and forms the stable citation key `source_id#chunk{chunk_index}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    pub chunk_index: usize,
}

/// One search result: the raw inner-product score paired with the chunk it
/// was computed against. With unit-normalized vectors the score equals
/// cosine similarity; higher is more similar.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub score: f32,
    pub metadata: Chunk,
}

/// Inner product of two equal-length vectors.
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have the same length");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
