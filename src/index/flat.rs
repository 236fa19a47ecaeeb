//! # Flat Index Implementation
//!
//! An exact inner-product index: vectors live in a linear array, search is a
//! full scan against every row, results are ranked by descending score.
//!
//! Every row is paired with one [`Chunk`] metadata record at the same
//! position. That alignment is the core invariant of the index: the row
//! count always equals the metadata count, and row `i`'s vector belongs to
//! metadata entry `i`. The only mutation is append, so row ids are stable
//! for the lifetime of the index and across save/load.

use std::path::Path;

use crate::errors::{RagLiteError, RagLiteResult};
use crate::persistence::{self, StoreError};
use crate::{inner_product, Chunk, SearchHit};

/// Exact similarity index over unit-normalized vectors with aligned chunk
/// metadata.
///
/// Created empty via [`FlatIndex::new`] or in bulk via [`FlatIndex::build`];
/// grown only by [`FlatIndex::add`]. The vector dimensionality is
/// established by the first vectors seen and enforced for every later
/// mutation and query.
#[derive(Debug, Default)]
pub struct FlatIndex {
    dim: Option<usize>,
    rows: Vec<Vec<f32>>,
    metadata: Vec<Chunk>,
}

impl FlatIndex {
    /// Create an empty index with no established dimensionality.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-construct an index from aligned vector and metadata sequences.
    ///
    /// Fails if the sequences differ in length or the vectors disagree on
    /// dimensionality.
    pub fn build(vectors: Vec<Vec<f32>>, metadata: Vec<Chunk>) -> RagLiteResult<Self> {
        let mut index = Self::new();
        index.add(vectors, metadata)?;
        Ok(index)
    }

    /// Reassemble an index from already validated parts. Used by the
    /// persistence layer after its own alignment checks.
    pub(crate) fn from_parts(dim: Option<usize>, rows: Vec<Vec<f32>>, metadata: Vec<Chunk>) -> Self {
        debug_assert_eq!(rows.len(), metadata.len());
        Self { dim, rows, metadata }
    }

    /// Append vectors with their aligned metadata.
    ///
    /// The first vectors added to an empty index establish its
    /// dimensionality; every subsequent vector must match it.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>, metadata: Vec<Chunk>) -> RagLiteResult<()> {
        if vectors.len() != metadata.len() {
            return Err(RagLiteError::LengthMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }
        let dim = match self.dim {
            Some(dim) => dim,
            None => match vectors.first() {
                Some(first) => first.len(),
                None => return Ok(()),
            },
        };
        for vector in &vectors {
            if vector.len() != dim {
                return Err(RagLiteError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        }

        self.dim = Some(dim);
        self.rows.extend(vectors);
        self.metadata.extend(metadata);
        Ok(())
    }

    /// Return up to `k` hits ranked by descending inner product.
    ///
    /// Equal scores keep insertion order (first-added wins), so results are
    /// deterministic. An empty index yields an empty result, not an error; a
    /// query of the wrong dimensionality is an error.
    pub fn search(&self, query: &[f32], k: usize) -> RagLiteResult<Vec<SearchHit>> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        if query.len() != dim {
            return Err(RagLiteError::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .rows
            .iter()
            .zip(self.metadata.iter())
            .map(|(row, metadata)| SearchHit {
                score: inner_product(row, query),
                metadata: metadata.clone(),
            })
            .collect();
        // Stable sort: ties stay in ascending row-id order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Established dimensionality, `None` until the first vectors arrive.
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    pub(crate) fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    pub(crate) fn metadata(&self) -> &[Chunk] {
        &self.metadata
    }

    /// Serialize the index to a vector artifact and a metadata artifact.
    pub fn save(&self, index_path: &Path, meta_path: &Path) -> Result<(), StoreError> {
        persistence::save_index(self, index_path, meta_path)
    }

    /// Reconstruct an index saved by [`FlatIndex::save`]. Search results
    /// after a load are bit-identical to results before the save.
    pub fn load(index_path: &Path, meta_path: &Path) -> Result<Self, StoreError> {
        persistence::load_index(index_path, meta_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source_id: &str, chunk_index: usize) -> Chunk {
        Chunk {
            text: format!("{} body {}", source_id, chunk_index),
            source_id: source_id.to_string(),
            chunk_index,
        }
    }

    fn three_row_index() -> FlatIndex {
        FlatIndex::build(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]],
            vec![chunk("a", 0), chunk("b", 0), chunk("c", 0)],
        )
        .unwrap()
    }

    #[test]
    fn test_ranking_by_descending_inner_product() {
        let index = three_row_index();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let sources: Vec<&str> = hits.iter().map(|h| h.metadata.source_id.as_str()).collect();
        assert_eq!(sources, vec!["a", "c", "b"]);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
        assert!((hits[1].score - 0.9).abs() < 1e-6);
        assert!(hits[2].score.abs() < 1e-6);
    }

    #[test]
    fn test_search_returns_at_most_k() {
        let index = three_row_index();
        assert_eq!(index.search(&[1.0, 0.0], 2).unwrap().len(), 2);
        // Fewer rows than k: return them all.
        assert_eq!(index.search(&[1.0, 0.0], 10).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_index_search_is_not_an_error() {
        let index = FlatIndex::new();
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }

    #[test]
    fn test_equal_scores_keep_insertion_order() {
        let index = FlatIndex::build(
            vec![vec![0.6, 0.8], vec![0.6, 0.8], vec![0.6, 0.8]],
            vec![chunk("first", 0), chunk("second", 0), chunk("third", 0)],
        )
        .unwrap();
        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let sources: Vec<&str> = hits.iter().map(|h| h.metadata.source_id.as_str()).collect();
        assert_eq!(sources, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_build_rejects_length_mismatch() {
        let err = FlatIndex::build(vec![vec![1.0, 0.0]], vec![chunk("a", 0), chunk("a", 1)])
            .unwrap_err();
        assert!(matches!(
            err,
            RagLiteError::LengthMismatch {
                vectors: 1,
                metadata: 2
            }
        ));
    }

    #[test]
    fn test_build_rejects_inconsistent_dimensions() {
        let err = FlatIndex::build(
            vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
            vec![chunk("a", 0), chunk("a", 1)],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RagLiteError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_add_establishes_dimension_on_empty_index() {
        let mut index = FlatIndex::new();
        index
            .add(vec![vec![0.0, 1.0, 0.0]], vec![chunk("a", 0)])
            .unwrap();
        assert_eq!(index.dimension(), Some(3));

        let err = index
            .add(vec![vec![1.0, 0.0]], vec![chunk("a", 1)])
            .unwrap_err();
        assert!(matches!(err, RagLiteError::DimensionMismatch { .. }));
        // Failed add must not have touched the rows.
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_query_dimension_is_checked() {
        let index = three_row_index();
        let err = index.search(&[1.0, 0.0, 0.0], 1).unwrap_err();
        assert!(matches!(
            err,
            RagLiteError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_append_preserves_existing_row_alignment() {
        let mut index = three_row_index();
        index
            .add(vec![vec![0.5, 0.5]], vec![chunk("d", 0)])
            .unwrap();
        assert_eq!(index.len(), 4);

        // Row i's metadata is exactly what was inserted at position i.
        let hits = index.search(&[1.0, 0.0], 4).unwrap();
        let best = &hits[0];
        assert_eq!(best.metadata.source_id, "a");
        assert_eq!(index.metadata()[3].source_id, "d");
    }

    #[test]
    fn test_empty_add_on_empty_index_is_a_no_op() {
        let mut index = FlatIndex::new();
        index.add(Vec::new(), Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), None);
    }
}
