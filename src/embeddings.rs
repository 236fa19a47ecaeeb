//! # Embeddings Module
//!
//! The embedding port. Providers implement [`EmbeddingModel`] (text batch in,
//! raw float vectors out); the [`Embedder`] wrapper owns batching and
//! enforces the output postcondition that every vector is L2-normalized,
//! regardless of what the underlying model returned.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Divisor substituted for a zero norm so degenerate vectors stay finite
/// instead of propagating NaN.
const NORM_EPSILON: f32 = 1e-9;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Provider request failed: {0}")]
    Provider(String),
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Provider returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Capability interface for an external embedding provider.
///
/// Implementations must be deterministic for identical input and produce
/// vectors of a fixed dimensionality. Normalization is not required here;
/// the [`Embedder`] enforces it downstream.
pub trait EmbeddingModel: Send + Sync {
    /// Embed one batch of texts, one vector per text, in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fixed output dimensionality of this provider.
    fn dimension(&self) -> usize;
}

/// Batching and normalization layer over an [`EmbeddingModel`].
///
/// Splits input into `batch_size` slices, dispatches them sequentially, and
/// merges results back in input order, so the batch size never affects
/// output values. Any sub-batch failure fails the whole call with no partial
/// results.
pub struct Embedder {
    model: Box<dyn EmbeddingModel>,
    batch_size: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("batch_size", &self.batch_size)
            .field("dimension", &self.model.dimension())
            .finish()
    }
}

impl Embedder {
    pub fn new(model: Box<dyn EmbeddingModel>, batch_size: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed `texts`, returning one unit-normalized vector per text in the
    /// same order.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let expected_dim = self.model.dimension();
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let batch_vectors = self.model.embed_batch(batch)?;
            if batch_vectors.len() != batch.len() {
                return Err(EmbeddingError::CountMismatch {
                    expected: batch.len(),
                    actual: batch_vectors.len(),
                });
            }
            for vector in &batch_vectors {
                if vector.len() != expected_dim {
                    return Err(EmbeddingError::DimensionMismatch {
                        expected: expected_dim,
                        actual: vector.len(),
                    });
                }
            }
            vectors.extend(batch_vectors);
        }

        for vector in &mut vectors {
            l2_normalize(vector);
        }
        debug!(texts = texts.len(), dimension = expected_dim, "embedded batch");
        Ok(vectors)
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }
}

/// Scale `vector` to unit Euclidean norm in place. A zero-norm input is
/// divided by [`NORM_EPSILON`] instead; its direction is undefined but its
/// components stay finite.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = if norm > 0.0 { norm } else { NORM_EPSILON };
    for x in vector.iter_mut() {
        *x /= denom;
    }
}

/// Embedding provider speaking the OpenAI-compatible `/embeddings` wire
/// shape. The dimensionality is declared up front because it is fixed per
/// model and the index needs it before the first call.
pub struct OpenAiEmbeddings {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, api_key: &str, model: &str, dimension: usize) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
        }
    }
}

impl EmbeddingModel for OpenAiEmbeddings {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .map_err(|e| EmbeddingError::Provider(e.to_string()))?;

        let mut body: EmbeddingsResponse = response
            .into_json()
            .map_err(|e| EmbeddingError::Provider(format!("Invalid response body: {}", e)))?;

        // The API is allowed to return entries out of order.
        body.data.sort_by_key(|entry| entry.index);
        Ok(body.data.into_iter().map(|entry| entry.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
