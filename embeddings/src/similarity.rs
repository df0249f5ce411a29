//! Similarity computation for embeddings.

use crate::error::{EmbeddingError, Result};

/// Euclidean length of a vector.
///
/// Accumulates in `f64`, so components too large to square in `f32` still
/// produce a finite length when the result fits.
pub fn magnitude(v: &[f32]) -> f32 {
    magnitude_f64(v) as f32
}

fn magnitude_f64(v: &[f32]) -> f64 {
    v.iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Compute the cosine similarity between two embeddings.
///
/// Returns a value between -1.0 and 1.0, where:
/// - 1.0 means identical direction
/// - 0.0 means orthogonal vectors, or either vector has zero magnitude
/// - -1.0 means opposite vectors
///
/// Vectors of different length are an error; they are never truncated or padded.
/// A score that cannot be computed as a finite number is reported as 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(EmbeddingError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let magnitude_a = magnitude_f64(a);
    let magnitude_b = magnitude_f64(b);
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return Ok(0.0);
    }

    let dot_product: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();
    let similarity = dot_product / (magnitude_a * magnitude_b);
    if !similarity.is_finite() {
        return Ok(0.0);
    }
    Ok(similarity.clamp(-1.0, 1.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        let sim = cosine_similarity(&a, &b).unwrap();
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let zero = vec![0.0, 0.0];
        let other = vec![0.3, 0.4];

        let sim = cosine_similarity(&zero, &other).unwrap();
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());

        let sim = cosine_similarity(&zero, &zero).unwrap();
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(EmbeddingError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_huge_components_stay_finite() {
        let a = vec![3.0e19, 0.0];
        let sim = cosine_similarity(&a, &a).unwrap();
        assert!((sim - 1.0).abs() < 1e-6, "got {sim}");

        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);
        assert!(magnitude(&a).is_finite());
    }

    #[test]
    fn test_non_finite_input_scores_zero() {
        let a = vec![f32::INFINITY, 0.0];
        let b = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b).unwrap(), 0.0);

        let nan = vec![f32::NAN, 1.0];
        assert_eq!(cosine_similarity(&nan, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_magnitude() {
        assert!((magnitude(&[3.0, 4.0]) - 5.0).abs() < 1e-6);
    }
}
