//! In-memory store of enrolled face vectors with thresholded lookup.

use triage_kiosk_vision::DistanceMetric;

use super::{RecognitionError, RecognitionResult};
use crate::db::Database;
use crate::models::{FaceEncoding, Identity};

/// Enrolled faces in enrollment order, one vector per patient.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    metric: DistanceMetric,
    names: Vec<String>,
    vectors: Vec<Vec<f64>>,
}

impl VectorStore {
    /// Create an empty store.
    pub fn new(metric: DistanceMetric) -> Self {
        Self {
            metric,
            names: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Build a store from already-decoded encodings, preserving order.
    pub fn from_encodings(metric: DistanceMetric, encodings: Vec<FaceEncoding>) -> Self {
        let mut store = Self::new(metric);
        for encoding in encodings {
            store.insert(encoding);
        }
        store
    }

    /// Load every enrolled face from the database.
    ///
    /// A failed load never aborts start-up: the store comes back empty and a
    /// warning is logged.
    pub fn load(db: &Database, metric: DistanceMetric) -> Self {
        match db.list_face_encodings() {
            Ok(encodings) => {
                let store = Self::from_encodings(metric, encodings);
                if store.is_empty() {
                    log::warn!("No known faces found. Please register a new patient.");
                } else {
                    log::info!("Loaded {} known face encodings", store.len());
                }
                store
            }
            Err(e) => {
                log::warn!("Could not load face encodings: {}. Starting fresh.", e);
                Self::new(metric)
            }
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Enrolled faces as owned records, in storage order.
    pub fn encodings(&self) -> Vec<FaceEncoding> {
        self.names
            .iter()
            .zip(self.vectors.iter())
            .map(|(name, vector)| FaceEncoding {
                name: name.clone(),
                vector: vector.clone(),
            })
            .collect()
    }

    /// Vector stored for `name`, if enrolled.
    pub fn vector_for(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.vectors[i].as_slice())
    }

    /// Average `vectors` and append the result under `name`.
    ///
    /// Leaves the store untouched on error.
    pub fn enroll(&mut self, name: &str, vectors: &[Vec<f64>]) -> RecognitionResult<Vec<f64>> {
        let mean = mean_vector(vectors)?;
        self.insert(FaceEncoding {
            name: name.to_string(),
            vector: mean.clone(),
        });
        Ok(mean)
    }

    /// Append an already-reduced encoding.
    pub fn insert(&mut self, encoding: FaceEncoding) {
        self.names.push(encoding.name);
        self.vectors.push(encoding.vector);
    }

    /// Index and distance of the closest stored vector within `tolerance`.
    ///
    /// Exact ties go to the earliest enrolled vector.
    pub fn best_match(&self, query: &[f64], tolerance: f64) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for (index, vector) in self.vectors.iter().enumerate() {
            let distance = self.metric.distance(query, vector);
            if distance > tolerance {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((index, distance));
            }
        }
        best
    }

    /// Identify `query`, or `Identity::Unknown` if nothing is within tolerance.
    pub fn match_face(&self, query: &[f64], tolerance: f64) -> Identity {
        match self.best_match(query, tolerance) {
            Some((index, distance)) => {
                log::debug!(
                    "Matched {} at distance {:.4}",
                    self.names[index],
                    distance
                );
                Identity::Known {
                    name: self.names[index].clone(),
                    distance,
                }
            }
            None => Identity::Unknown,
        }
    }
}

/// Element-wise mean of equally sized, non-empty vectors.
pub fn mean_vector(vectors: &[Vec<f64>]) -> RecognitionResult<Vec<f64>> {
    let first = vectors.first().ok_or(RecognitionError::EmptyEnrollment)?;
    let dims = first.len();
    if dims == 0 {
        return Err(RecognitionError::DimensionMismatch {
            expected: 1,
            actual: 0,
        });
    }

    let mut sum = vec![0.0; dims];
    for vector in vectors {
        if vector.len() != dims {
            return Err(RecognitionError::DimensionMismatch {
                expected: dims,
                actual: vector.len(),
            });
        }
        for (acc, value) in sum.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
    }

    let count = vectors.len() as f64;
    Ok(sum.into_iter().map(|total| total / count).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn store_with(entries: &[(&str, Vec<f64>)]) -> VectorStore {
        let mut store = VectorStore::new(DistanceMetric::Euclidean);
        for (name, vector) in entries {
            store.insert(FaceEncoding {
                name: name.to_string(),
                vector: vector.clone(),
            });
        }
        store
    }

    #[test]
    fn test_match_within_tolerance() {
        let store = store_with(&[("alice", vec![1.0, 0.0, 0.0])]);
        let identity = store.match_face(&[1.0, 0.0, 0.01], 0.6);
        assert_eq!(identity.label(), "alice");
    }

    #[test]
    fn test_match_outside_tolerance() {
        let store = store_with(&[("alice", vec![1.0, 0.0, 0.0])]);
        assert_eq!(store.match_face(&[0.0, 1.0, 0.0], 0.6), Identity::Unknown);
    }

    #[test]
    fn test_empty_store_is_unknown() {
        let store = VectorStore::new(DistanceMetric::Euclidean);
        assert_eq!(store.match_face(&[1.0], 1.0), Identity::Unknown);
    }

    #[test]
    fn test_closest_candidate_wins() {
        let store = store_with(&[
            ("far", vec![0.5, 0.0]),
            ("near", vec![0.1, 0.0]),
            ("out", vec![5.0, 0.0]),
        ]);
        assert_eq!(store.match_face(&[0.0, 0.0], 0.6).label(), "near");
    }

    #[test]
    fn test_tie_goes_to_first_enrolled() {
        let store = store_with(&[("first", vec![1.0, 0.0]), ("second", vec![-1.0, 0.0])]);
        assert_eq!(store.match_face(&[0.0, 0.0], 1.0).label(), "first");
    }

    #[test]
    fn test_boundary_distance_matches() {
        let store = store_with(&[("alice", vec![0.5])]);
        assert!(store.match_face(&[0.0], 0.5).is_known());
    }

    #[test]
    fn test_dimension_mismatch_never_matches() {
        let store = store_with(&[("alice", vec![1.0, 0.0])]);
        assert_eq!(store.match_face(&[1.0, 0.0, 0.0], 1.0), Identity::Unknown);
    }

    #[test]
    fn test_enroll_mean() {
        let mut store = VectorStore::new(DistanceMetric::Euclidean);
        let mean = store
            .enroll("bob", &[vec![2.0, 2.0], vec![0.0, 0.0]])
            .unwrap();
        assert_eq!(mean, vec![1.0, 1.0]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.vector_for("bob"), Some(&[1.0, 1.0][..]));
    }

    #[test]
    fn test_enroll_empty_fails_without_mutation() {
        let mut store = store_with(&[("alice", vec![1.0])]);
        let result = store.enroll("bob", &[]);
        assert!(matches!(result, Err(RecognitionError::EmptyEnrollment)));
        assert_eq!(store.len(), 1);
        assert!(!store.contains("bob"));
    }

    #[test]
    fn test_enroll_mismatched_lengths_fails() {
        let mut store = VectorStore::new(DistanceMetric::Euclidean);
        let result = store.enroll("bob", &[vec![1.0, 2.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(RecognitionError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_degrades_on_corrupt_rows() {
        let db = Database::open_in_memory().unwrap();
        db.conn()
            .execute(
                "INSERT INTO face_encodings (name, dims, vector) VALUES ('alice', 3, x'00')",
                [],
            )
            .unwrap();
        let store = VectorStore::load(&db, DistanceMetric::Euclidean);
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_from_database() {
        let db = Database::open_in_memory().unwrap();
        db.insert_face_encoding(&FaceEncoding {
            name: "alice".into(),
            vector: vec![1.0, 0.0, 0.0],
        })
        .unwrap();
        let store = VectorStore::load(&db, DistanceMetric::Euclidean);
        assert_eq!(store.names(), &["alice".to_string()]);
    }

    proptest! {
        #[test]
        fn prop_match_is_min_within_tolerance(
            stored in proptest::collection::vec(proptest::collection::vec(-1.0f64..1.0, 3), 0..8),
            query in proptest::collection::vec(-1.0f64..1.0, 3),
            tolerance in 0.0f64..1.0,
        ) {
            let entries: Vec<(String, Vec<f64>)> = stored
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("p{}", i), v.clone()))
                .collect();
            let mut store = VectorStore::new(DistanceMetric::Euclidean);
            for (name, vector) in &entries {
                store.insert(FaceEncoding { name: name.clone(), vector: vector.clone() });
            }

            let distances: Vec<f64> = entries
                .iter()
                .map(|(_, v)| DistanceMetric::Euclidean.distance(&query, v))
                .collect();
            let within: Vec<f64> = distances.iter().copied().filter(|d| *d <= tolerance).collect();

            match store.match_face(&query, tolerance) {
                Identity::Unknown => prop_assert!(within.is_empty()),
                Identity::Known { name, distance } => {
                    prop_assert!(distance <= tolerance);
                    let min = within.iter().copied().fold(f64::INFINITY, f64::min);
                    prop_assert_eq!(distance, min);
                    let index = entries.iter().position(|(n, _)| *n == name).unwrap();
                    prop_assert_eq!(distances[index], min);
                }
            }
        }

        #[test]
        fn prop_enroll_stores_mean(
            captures in proptest::collection::vec(proptest::collection::vec(-10.0f64..10.0, 4), 1..6),
        ) {
            let mut store = VectorStore::new(DistanceMetric::Euclidean);
            let mean = store.enroll("p", &captures).unwrap();
            for dim in 0..4 {
                let expected = captures.iter().map(|c| c[dim]).sum::<f64>() / captures.len() as f64;
                prop_assert!((mean[dim] - expected).abs() < 1e-9);
            }
            prop_assert_eq!(store.len(), 1);
        }
    }
}
