//! Embedding distance functions.

use serde::{Deserialize, Serialize};

/// Distance used to compare face embeddings. Smaller means more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// L2 distance in embedding space
    #[default]
    Euclidean,
    /// 1 - cosine similarity
    Cosine,
}

impl DistanceMetric {
    /// Distance between two embeddings.
    ///
    /// Embeddings of different lengths are never comparable and yield
    /// `f64::INFINITY`, so they can never fall within a tolerance.
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        if a.len() != b.len() || a.is_empty() {
            return f64::INFINITY;
        }
        match self {
            DistanceMetric::Euclidean => euclidean_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
        }
    }
}

fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    (1.0 - dot / (norm_a * norm_b)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_euclidean() {
        let d = DistanceMetric::Euclidean.distance(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.01]);
        assert!((d - 0.01).abs() < 1e-12);

        let d = DistanceMetric::Euclidean.distance(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!((d - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_cosine() {
        let a = [1.0, 0.0, 0.0];
        assert!(DistanceMetric::Cosine.distance(&a, &a) < 1e-12);
        assert!((DistanceMetric::Cosine.distance(&a, &[0.0, 1.0, 0.0]) - 1.0).abs() < 1e-12);
        assert!((DistanceMetric::Cosine.distance(&a, &[-1.0, 0.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch_is_infinite() {
        assert!(DistanceMetric::Euclidean
            .distance(&[1.0, 2.0], &[1.0, 2.0, 3.0])
            .is_infinite());
        assert!(DistanceMetric::Cosine.distance(&[], &[]).is_infinite());
    }

    proptest! {
        #[test]
        fn prop_euclidean_non_negative_and_symmetric(
            a in proptest::collection::vec(-10.0f64..10.0, 4),
            b in proptest::collection::vec(-10.0f64..10.0, 4),
        ) {
            let ab = DistanceMetric::Euclidean.distance(&a, &b);
            let ba = DistanceMetric::Euclidean.distance(&b, &a);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-9);
            prop_assert!(DistanceMetric::Euclidean.distance(&a, &a) == 0.0);
        }
    }
}
