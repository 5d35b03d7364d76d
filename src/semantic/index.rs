//! In-memory vector index over note names with cosine similarity.

use std::collections::HashMap;

/// An entry in the vector index.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// Hash of the plaintext that was embedded
    pub content_hash: u64,
    /// The embedding vector
    pub embedding: Vec<f32>,
}

/// Note embeddings keyed by note name.
pub struct VectorIndex {
    entries: HashMap<String, VectorEntry>,
    dimensions: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("cannot store a zero-norm vector")]
    ZeroNormVector,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimensions,
        }
    }

    pub fn with_capacity(dimensions: usize, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            dimensions,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the vector for `name`.
    ///
    /// Rejects vectors of the wrong dimension and zero-norm vectors (their
    /// cosine similarity is undefined).
    pub fn insert(
        &mut self,
        name: &str,
        content_hash: u64,
        embedding: Vec<f32>,
    ) -> Result<(), IndexError> {
        if embedding.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        if l2_norm(&embedding) < f32::EPSILON {
            return Err(IndexError::ZeroNormVector);
        }

        self.entries.insert(
            name.to_string(),
            VectorEntry {
                content_hash,
                embedding,
            },
        );

        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&VectorEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VectorEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Cosine similarity of `name`'s stored vector against every other
    /// stored document. `None` when `name` is not in the index.
    pub fn similarities_from(&self, name: &str) -> Option<HashMap<String, f32>> {
        let query = self.entries.get(name)?;
        let query_norm = l2_norm(&query.embedding);

        Some(
            self.entries
                .iter()
                .filter(|(other, _)| other.as_str() != name)
                .map(|(other, entry)| {
                    (
                        other.clone(),
                        cosine_similarity(&query.embedding, &entry.embedding, query_norm),
                    )
                })
                .collect(),
        )
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity with the query norm precomputed.
fn cosine_similarity(query: &[f32], target: &[f32], query_norm: f32) -> f32 {
    let target_norm = l2_norm(target);
    if target_norm < f32::EPSILON || query_norm < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = query.iter().zip(target.iter()).map(|(a, b)| a * b).sum();
    dot / (query_norm * target_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut index = VectorIndex::new(3);
        index.insert("Note A", 1, vec![1.0, 0.0, 0.0]).unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.contains("Note A"));
        assert_eq!(index.get("Note A").unwrap().content_hash, 1);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = VectorIndex::new(3);
        let result = index.insert("Note A", 1, vec![1.0, 0.0]);
        assert!(matches!(result, Err(IndexError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_zero_norm_rejected() {
        let mut index = VectorIndex::new(3);
        let result = index.insert("Note A", 1, vec![0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(IndexError::ZeroNormVector)));
    }

    #[test]
    fn test_similarities_from_excludes_self() {
        let mut index = VectorIndex::new(3);
        index.insert("A", 1, vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("B", 2, vec![1.0, 0.0, 0.0]).unwrap();
        index.insert("C", 3, vec![0.0, 1.0, 0.0]).unwrap();

        let scores = index.similarities_from("A").unwrap();
        assert!(!scores.contains_key("A"));
        assert!((scores["B"] - 1.0).abs() < 1e-6);
        assert!(scores["C"].abs() < 1e-6);
    }

    #[test]
    fn test_similarities_from_unknown_name() {
        let index = VectorIndex::new(3);
        assert!(index.similarities_from("Nope").is_none());
    }
}
