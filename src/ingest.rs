//! # Ingest Module
//!
//! Turns a directory of plain-text documents into a built index: walk the
//! tree, chunk each file, embed every chunk in submission order, and
//! bulk-build the flat index. Row id assignment follows chunk submission
//! order, which is the join key against the metadata sequence.

use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunker::chunk_text;
use crate::config::ChunkingConfig;
use crate::embeddings::Embedder;
use crate::errors::RagLiteResult;
use crate::index::flat::FlatIndex;
use crate::Chunk;

/// One source document: raw text plus the identifier used in citations.
#[derive(Debug, Clone)]
pub struct Document {
    pub source_id: String,
    pub text: String,
}

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

/// Collect `.txt` and `.md` files under `data_dir`. The source id is the
/// path relative to `data_dir`. Unreadable files are skipped with a warning
/// rather than failing the whole ingest.
pub fn load_documents(data_dir: &Path) -> std::io::Result<Vec<Document>> {
    let mut documents = Vec::new();
    for entry in WalkDir::new(data_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_text = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if !is_text {
            continue;
        }

        let source_id = path
            .strip_prefix(data_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        match fs::read_to_string(path) {
            Ok(text) => documents.push(Document { source_id, text }),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    info!(documents = documents.len(), data_dir = %data_dir.display(), "loaded documents");
    Ok(documents)
}

/// Chunk every document, embed the chunks in order, and build the index.
///
/// Chunk metadata carries `(source_id, chunk_index)` with `chunk_index`
/// counted per document, so citation keys stay stable across rebuilds of
/// the same corpus.
pub fn build_index(
    documents: &[Document],
    embedder: &Embedder,
    chunking: &ChunkingConfig,
) -> RagLiteResult<FlatIndex> {
    let mut texts = Vec::new();
    let mut metadata = Vec::new();
    for document in documents {
        let chunks = chunk_text(&document.text, chunking.max_chars, chunking.overlap)?;
        for (chunk_index, text) in chunks.into_iter().enumerate() {
            metadata.push(Chunk {
                text: text.clone(),
                source_id: document.source_id.clone(),
                chunk_index,
            });
            texts.push(text);
        }
    }
    info!(
        documents = documents.len(),
        chunks = texts.len(),
        "chunked corpus"
    );

    let vectors = embedder.embed(&texts)?;
    FlatIndex::build(vectors, metadata)
}
