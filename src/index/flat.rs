//! Exact flat index ranked by cosine similarity.
//!
//! Vectors live contiguously in one buffer; slot `i` occupies
//! `data[i * dim..(i + 1) * dim]`. The index is append-only. Scores come from
//! [`cosine_similarity`], the same function the default gateway scores with,
//! so a zero vector scores 0.0 here exactly as it does in a linear scan.

use std::cmp::Ordering;

use crate::embedding::cosine_similarity;

use super::{AnnIndex, IndexBackend, IndexError};

/// Append-only flat index. Search is a linear scan over the packed buffer.
#[derive(Debug, Clone)]
pub struct FlatCosineIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatCosineIndex {
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::Construction(
                "index dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::Dimension {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl AnnIndex for FlatCosineIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    fn add(&mut self, vector: &[f32]) -> Result<usize, IndexError> {
        self.check_dimension(vector)?;
        let slot = self.len();
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f64)>, IndexError> {
        self.check_dimension(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored = Vec::with_capacity(self.len());
        for (slot, vector) in self.data.chunks_exact(self.dimension).enumerate() {
            let score =
                cosine_similarity(query, vector).map_err(|e| IndexError::Search(e.to_string()))?;
            scored.push((slot, score));
        }

        // Equal scores keep slot order, so ties resolve to the older entry.
        let best_first = |a: &(usize, f64), b: &(usize, f64)| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        };
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, best_first);
            scored.truncate(k);
        }
        scored.sort_by(best_first);
        Ok(scored)
    }
}

/// Backend producing [`FlatCosineIndex`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlatBackend;

impl IndexBackend for FlatBackend {
    fn name(&self) -> &str {
        "flat-cosine"
    }

    fn create(&self, dimension: usize) -> Result<Box<dyn AnnIndex>, IndexError> {
        Ok(Box::new(FlatCosineIndex::new(dimension)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            FlatCosineIndex::new(0),
            Err(IndexError::Construction(_))
        ));
    }

    #[test]
    fn test_add_assigns_contiguous_slots() {
        let mut index = FlatCosineIndex::new(2).unwrap();
        assert_eq!(index.add(&[1.0, 0.0]).unwrap(), 0);
        assert_eq!(index.add(&[0.0, 1.0]).unwrap(), 1);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_add_wrong_dimension() {
        let mut index = FlatCosineIndex::new(2).unwrap();
        let result = index.add(&[1.0, 0.0, 0.0]);
        assert!(matches!(
            result,
            Err(IndexError::Dimension {
                expected: 2,
                actual: 3
            })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_search_orders_by_score() {
        let mut index = FlatCosineIndex::new(2).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[1.0, 0.0]).unwrap();
        index.add(&[0.7, 0.7]).unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        let slots: Vec<usize> = hits.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![1, 2]);
        assert!((hits[0].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_search_ignores_magnitude() {
        let mut index = FlatCosineIndex::new(2).unwrap();
        index.add(&[0.1, 0.0]).unwrap();
        index.add(&[5.0, 5.0]).unwrap();

        let hits = index.search(&[3.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].0, 0);
    }

    #[test]
    fn test_zero_vector_ties_with_orthogonal() {
        let mut index = FlatCosineIndex::new(2).unwrap();
        index.add(&[0.0, 1.0]).unwrap();
        index.add(&[0.0, 0.0]).unwrap();

        // both score 0.0, so the lower slot wins
        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits, vec![(0, 0.0)]);
    }

    #[test]
    fn test_search_ties_prefer_lower_slot() {
        let mut index = FlatCosineIndex::new(1).unwrap();
        for _ in 0..5 {
            index.add(&[0.5]).unwrap();
        }
        let hits = index.search(&[0.5], 3).unwrap();
        let slots: Vec<usize> = hits.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_k_larger_than_population() {
        let mut index = FlatCosineIndex::new(1).unwrap();
        index.add(&[0.1]).unwrap();
        assert_eq!(index.search(&[1.0], 10).unwrap().len(), 1);
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_vector_fails_search() {
        let mut index = FlatCosineIndex::new(1).unwrap();
        index.add(&[f32::NAN]).unwrap();
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(IndexError::Search(_))
        ));
    }

    #[test]
    fn test_backend_creates_empty_index() {
        let index = FlatBackend.create(3).unwrap();
        assert_eq!(index.dimension(), 3);
        assert!(index.is_empty());
    }
}
