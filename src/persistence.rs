//! # Persistence Module
//!
//! Saving and loading the flat index as a pair of artifacts: a vector file
//! (dimensionality plus raw float rows) and a metadata file (ordered chunk
//! records, one per row). Both are versioned JSON documents.
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! crash mid-write never corrupts a previously valid pair of files. Loads
//! re-check the alignment invariant: the two files must agree on row count
//! and every row must match the recorded dimensionality.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::index::flat::FlatIndex;
use crate::Chunk;

const FORMAT_VERSION: &str = "1.0.0";
const VECTOR_FORMAT: &str = "raglite-vectors";
const METADATA_FORMAT: &str = "raglite-metadata";

/// Error types for persistence operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },

    #[error("Index/metadata alignment corrupted: {rows} vector rows, {metadata} metadata records")]
    AlignmentCorruption { rows: usize, metadata: usize },
}

/// File header containing version and format information
#[derive(Debug, Serialize, Deserialize)]
pub struct FileHeader {
    pub version: String,
    pub format: String,
    pub created_at: DateTime<Utc>,
}

impl FileHeader {
    fn new(format: &str) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            format: format.to_string(),
            created_at: Utc::now(),
        }
    }

    fn validate(&self, expected_format: &str) -> Result<(), StoreError> {
        if self.version != FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: FORMAT_VERSION.to_string(),
                actual: self.version.clone(),
            });
        }
        if self.format != expected_format {
            return Err(StoreError::InvalidFormat(format!(
                "Expected format '{}', got '{}'",
                expected_format, self.format
            )));
        }
        Ok(())
    }
}

/// Vector artifact: dimensionality and raw float rows
#[derive(Debug, Serialize, Deserialize)]
struct VectorFile {
    header: FileHeader,
    dim: usize,
    rows: Vec<Vec<f32>>,
}

/// Metadata artifact: ordered chunk records, one per row
#[derive(Debug, Serialize, Deserialize)]
struct MetadataFile {
    header: FileHeader,
    chunks: Vec<Chunk>,
}

/// Save an index as a vector artifact and a metadata artifact.
pub fn save_index(
    index: &FlatIndex,
    index_path: &Path,
    meta_path: &Path,
) -> Result<(), StoreError> {
    let vector_file = VectorFile {
        header: FileHeader::new(VECTOR_FORMAT),
        dim: index.dimension().unwrap_or(0),
        rows: index.rows().to_vec(),
    };
    let metadata_file = MetadataFile {
        header: FileHeader::new(METADATA_FORMAT),
        chunks: index.metadata().to_vec(),
    };

    write_atomic(index_path, &serde_json::to_string(&vector_file)?)?;
    write_atomic(meta_path, &serde_json::to_string(&metadata_file)?)?;
    info!(
        rows = index.len(),
        index_path = %index_path.display(),
        meta_path = %meta_path.display(),
        "saved index"
    );
    Ok(())
}

/// Load an index from its two artifacts, re-validating the alignment
/// invariant.
pub fn load_index(index_path: &Path, meta_path: &Path) -> Result<FlatIndex, StoreError> {
    let vector_file: VectorFile = read_artifact(index_path)?;
    vector_file.header.validate(VECTOR_FORMAT)?;

    let metadata_file: MetadataFile = read_artifact(meta_path)?;
    metadata_file.header.validate(METADATA_FORMAT)?;

    if vector_file.rows.len() != metadata_file.chunks.len() {
        return Err(StoreError::AlignmentCorruption {
            rows: vector_file.rows.len(),
            metadata: metadata_file.chunks.len(),
        });
    }
    for (i, row) in vector_file.rows.iter().enumerate() {
        if row.len() != vector_file.dim {
            return Err(StoreError::InvalidFormat(format!(
                "Row {} has {} values, expected dimensionality {}",
                i,
                row.len(),
                vector_file.dim
            )));
        }
    }

    let dim = if vector_file.rows.is_empty() {
        None
    } else {
        Some(vector_file.dim)
    };
    info!(
        rows = vector_file.rows.len(),
        index_path = %index_path.display(),
        "loaded index"
    );
    Ok(FlatIndex::from_parts(
        dim,
        vector_file.rows,
        metadata_file.chunks,
    ))
}

fn read_artifact<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Err(StoreError::FileNotFound(path.display().to_string()));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write to a temporary sibling first, then rename over the destination so
/// the old content stays intact until the new content is fully flushed.
fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
