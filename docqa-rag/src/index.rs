//! Exact nearest-neighbour index over squared Euclidean distance.
//!
//! [`FlatL2Index`] is a linear scan over a contiguous vector buffer. At document scale (hundreds
//! to a few thousand chunks) this is fast enough and has no build cost beyond a copy.

use crate::document::SearchHit;
use crate::error::{RagError, Result};

/// Squared Euclidean distance between two equal-length vectors.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// A brute-force L2 index whose slot `i` corresponds to chunk `i`.
///
/// # Example
///
/// ```rust
/// use docqa_rag::FlatL2Index;
///
/// let index = FlatL2Index::build(vec![vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
/// let hits = index.search(&[3.0, 3.0], 1).unwrap();
/// assert_eq!(hits[0].position, 1);
/// assert_eq!(hits[0].distance, 1.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Create an empty index for vectors of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, data: Vec::new() }
    }

    /// Build an index from vectors in chunk order.
    ///
    /// The dimensionality is taken from the first vector.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if any vector differs in length from the first
    /// - [`RagError::IndexError`] if any component is NaN or infinite
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimensions = vectors.first().map_or(0, Vec::len);
        let mut index = Self::new(dimensions);
        index.data.reserve(dimensions * vectors.len());
        for vector in &vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Append one vector at the next position.
    ///
    /// # Errors
    ///
    /// - [`RagError::DimensionMismatch`] if the vector length is wrong
    /// - [`RagError::IndexError`] if any component is NaN or infinite
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.check_dimensions(vector)?;
        check_finite(vector, "indexed vector")?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Vector length every entry shares.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimensions == 0 { 0 } else { self.data.len() / self.dimensions }
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        if position >= self.len() {
            return None;
        }
        let start = position * self.dimensions;
        Some(&self.data[start..start + self.dimensions])
    }

    /// Return the `k` nearest vectors to `query`, nearest first.
    ///
    /// `k` is clamped to the index size. Equal distances keep position order.
    ///
    /// # Errors
    ///
    /// - [`RagError::IndexError`] if the index is empty
    /// - [`RagError::DimensionMismatch`] if `query` has the wrong length
    /// - [`RagError::IndexError`] if `query` has a NaN or infinite component
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if self.is_empty() {
            return Err(RagError::IndexError("cannot search an empty index".to_string()));
        }
        self.check_dimensions(query)?;
        check_finite(query, "query vector")?;

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimensions)
            .enumerate()
            .map(|(position, vector)| SearchHit { position, distance: squared_l2(vector, query) })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.position.cmp(&b.position)));
        hits.truncate(k.min(self.len()));
        Ok(hits)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Position of the first NaN or infinite component, if any.
pub fn first_non_finite(vector: &[f32]) -> Option<usize> {
    vector.iter().position(|x| !x.is_finite())
}

fn check_finite(vector: &[f32], what: &str) -> Result<()> {
    match first_non_finite(vector) {
        Some(i) => Err(RagError::IndexError(format!(
            "{what} has a non-finite component at {i}: {}",
            vector[i]
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatL2Index {
        FlatL2Index::build(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]]).unwrap()
    }

    #[test]
    fn squared_distance_has_no_root() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
    }

    #[test]
    fn results_are_ascending_by_distance() {
        let hits = sample().search(&[0.9, 0.0], 3).unwrap();
        let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
        assert_eq!(positions, [1, 0, 2]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn k_is_clamped_to_size() {
        assert_eq!(sample().search(&[0.0, 0.0], 10).unwrap().len(), 3);
        assert!(sample().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn ties_keep_position_order() {
        let index = FlatL2Index::build(vec![vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let positions: Vec<usize> =
            index.search(&[0.0], 3).unwrap().iter().map(|h| h.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn empty_index_search_is_an_error() {
        let index = FlatL2Index::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(matches!(index.search(&[1.0], 1), Err(RagError::IndexError(_))));
    }

    #[test]
    fn wrong_query_dimension_is_rejected() {
        let err = sample().search(&[1.0, 2.0, 3.0], 1).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn build_rejects_ragged_vectors() {
        let err = FlatL2Index::build(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn vector_lookup_by_position() {
        let index = sample();
        assert_eq!(index.vector(2), Some(&[5.0, 5.0][..]));
        assert_eq!(index.vector(3), None);
    }

    #[test]
    fn non_finite_vectors_are_rejected() {
        let mut vectors: Vec<Vec<f32>> = (0..200).map(|i| vec![i as f32, 1.0]).collect();
        vectors[3] = vec![f32::NAN, 0.0];
        assert!(matches!(FlatL2Index::build(vectors), Err(RagError::IndexError(_))));

        let mut index = sample();
        assert!(index.add(&[f32::INFINITY, 0.0]).is_err());
        assert_eq!(index.len(), 3);
        assert!(matches!(index.search(&[f32::NAN, 1.0], 3), Err(RagError::IndexError(_))));
    }

    #[test]
    fn overflowing_distances_still_sort() {
        let vectors: Vec<Vec<f32>> = (0..200)
            .map(|i| if i % 3 == 0 { vec![f32::MAX, 0.0] } else { vec![i as f32, 1.0] })
            .collect();
        let index = FlatL2Index::build(vectors).unwrap();

        let hits = index.search(&[0.0, 1.0], 200).unwrap();
        assert_eq!(hits.len(), 200);
        assert!(hits.windows(2).all(|w| w[0].distance.total_cmp(&w[1].distance).is_le()));
        assert!(hits[199].distance.is_infinite());
    }
}
