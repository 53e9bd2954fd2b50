use serde::{Deserialize, Serialize};

/// L2-normalized face embedding.
///
/// Normalization happens once at construction, so comparing two embeddings
/// is a plain dot product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    vector: Vec<f32>,
}

impl Embedding {
    /// Build an embedding from a raw model output vector, normalizing it.
    pub fn from_raw(vector: Vec<f32>) -> Self {
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        let vector = if norm > 0.0 {
            vector.iter().map(|x| x / norm).collect()
        } else {
            vector
        };
        Self { vector }
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.vector
    }

    /// Cosine similarity in [-1, 1]. Both sides are already unit length, so
    /// this is a dot product over the shared prefix.
    pub fn similarity(&self, other: &Embedding) -> f32 {
        let dot: f32 = self
            .vector
            .iter()
            .zip(other.vector.iter())
            .map(|(x, y)| x * y)
            .sum();
        dot.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_normalizes() {
        let e = Embedding::from_raw(vec![3.0, 4.0]);
        let norm: f32 = e.as_slice().iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let e = Embedding::from_raw(vec![0.0; 4]);
        assert_eq!(e.dim(), 4);
        assert!(e.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn identical_embeddings_have_unit_similarity() {
        let a = Embedding::from_raw(vec![0.5, -0.25, 1.0]);
        let b = a.clone();
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_embeddings_have_zero_similarity() {
        let a = Embedding::from_raw(vec![1.0, 0.0]);
        let b = Embedding::from_raw(vec![0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn opposite_embeddings_clamp_to_minus_one() {
        let a = Embedding::from_raw(vec![1.0, 0.0]);
        let b = Embedding::from_raw(vec![-1.0, 0.0]);
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }
}
