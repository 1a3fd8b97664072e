/// k-nearest-neighbor example classifier
///
/// Stores labeled MFCC feature vectors and classifies a query vector by
/// majority vote among its k nearest stored examples under Euclidean
/// distance. The database is append-only and iterated in label order so
/// every classification is deterministic.

use crate::mfcc::MfccVector;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("No training examples stored")]
    EmptyDatabase,

    #[error("Neighbor count must be at least 1")]
    ZeroNeighbors,
}

/// Result of a k-NN classification
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Winning label
    pub label: String,

    /// Votes the winning label received among the neighbors
    pub votes: usize,

    /// Neighbors actually considered: min(k, stored examples)
    pub neighbors: usize,

    /// Distance to the single nearest example across all labels
    pub nearest_distance: f32,
}

/// Labeled example database with k-NN voting
#[derive(Debug, Default)]
pub struct ExampleClassifier {
    db: BTreeMap<String, Vec<MfccVector>>,
}

impl ExampleClassifier {
    /// Create an empty classifier
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a feature vector under `label`, creating the entry if absent
    pub fn add_example(&mut self, label: &str, features: MfccVector) {
        let examples = self.db.entry(label.to_string()).or_default();
        examples.push(features);
        trace!("Added example #{} for label '{}'", examples.len(), label);
    }

    /// Classify `query` by majority vote among its k nearest examples
    ///
    /// Candidates are ordered by distance, then by label, so equal-distance
    /// neighbors rank identically on every run. Among labels tied on vote
    /// count the lexicographically smallest wins.
    pub fn recognize(
        &self,
        query: &MfccVector,
        k: usize,
    ) -> Result<Classification, ClassifierError> {
        if k == 0 {
            return Err(ClassifierError::ZeroNeighbors);
        }
        if self.db.values().all(|examples| examples.is_empty()) {
            return Err(ClassifierError::EmptyDatabase);
        }

        let mut candidates: Vec<(f32, &str)> = Vec::with_capacity(self.example_count());
        for (label, examples) in &self.db {
            for example in examples {
                candidates.push((distance(query, example), label.as_str()));
            }
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1)));

        let neighbors = k.min(candidates.len());
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for &(_, label) in &candidates[..neighbors] {
            *counts.entry(label).or_insert(0) += 1;
        }

        // BTreeMap iterates labels in ascending order, so requiring a
        // strictly greater count makes the smallest tied label win.
        let mut best: Option<(&str, usize)> = None;
        for (&label, &votes) in &counts {
            if best.map_or(true, |(_, best_votes)| votes > best_votes) {
                best = Some((label, votes));
            }
        }
        let (label, votes) = best.ok_or(ClassifierError::EmptyDatabase)?;

        debug!(
            "Classified as '{}' with {}/{} votes (nearest distance {:.4})",
            label, votes, neighbors, candidates[0].0
        );

        Ok(Classification {
            label: label.to_string(),
            votes,
            neighbors,
            nearest_distance: candidates[0].0,
        })
    }

    /// Total number of stored examples across all labels
    pub fn example_count(&self) -> usize {
        self.db.values().map(|examples| examples.len()).sum()
    }

    /// Number of distinct labels
    pub fn label_count(&self) -> usize {
        self.db.len()
    }

    /// Check whether the database holds no examples
    pub fn is_empty(&self) -> bool {
        self.example_count() == 0
    }
}

/// Euclidean distance between two feature vectors
fn distance(a: &MfccVector, b: &MfccVector) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x - y;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfcc::NUM_MFCC;
    use approx::assert_relative_eq;

    fn vector(first: f32) -> MfccVector {
        let mut v = [0.0f32; NUM_MFCC];
        v[0] = first;
        v
    }

    #[test]
    fn test_empty_database() {
        let classifier = ExampleClassifier::new();
        assert!(classifier.is_empty());

        let result = classifier.recognize(&vector(0.0), 5);
        assert_eq!(result, Err(ClassifierError::EmptyDatabase));
    }

    #[test]
    fn test_zero_neighbors_rejected() {
        let mut classifier = ExampleClassifier::new();
        classifier.add_example("a", vector(1.0));

        let result = classifier.recognize(&vector(1.0), 0);
        assert_eq!(result, Err(ClassifierError::ZeroNeighbors));
    }

    #[test]
    fn test_exact_match_single_example() {
        let mut classifier = ExampleClassifier::new();
        classifier.add_example("male", vector(2.5));

        let result = classifier.recognize(&vector(2.5), 1).unwrap();
        assert_eq!(result.label, "male");
        assert_eq!(result.votes, 1);
        assert_eq!(result.neighbors, 1);
        assert_relative_eq!(result.nearest_distance, 0.0);
    }

    #[test]
    fn test_majority_vote() {
        let mut classifier = ExampleClassifier::new();

        // Nearest five by distance: a, a, b, b, b
        classifier.add_example("a", vector(1.0));
        classifier.add_example("a", vector(2.0));
        classifier.add_example("b", vector(3.0));
        classifier.add_example("b", vector(4.0));
        classifier.add_example("b", vector(5.0));

        let result = classifier.recognize(&vector(0.0), 5).unwrap();
        assert_eq!(result.label, "b");
        assert_eq!(result.votes, 3);
    }

    #[test]
    fn test_nearest_neighbor_wins_at_k1() {
        let mut classifier = ExampleClassifier::new();
        classifier.add_example("near", vector(1.0));
        classifier.add_example("far", vector(10.0));

        let result = classifier.recognize(&vector(0.0), 1).unwrap();
        assert_eq!(result.label, "near");
    }

    #[test]
    fn test_k_larger_than_database() {
        let mut classifier = ExampleClassifier::new();
        classifier.add_example("a", vector(1.0));
        classifier.add_example("b", vector(2.0));

        let result = classifier.recognize(&vector(0.0), 100).unwrap();
        assert_eq!(result.neighbors, 2);
        assert_eq!(result.label, "a");
    }

    #[test]
    fn test_tie_break_is_lexicographic() {
        let mut classifier = ExampleClassifier::new();

        // Two labels with identical counts and mirrored distances
        classifier.add_example("zebra", vector(-1.0));
        classifier.add_example("apple", vector(1.0));

        let result = classifier.recognize(&vector(0.0), 2).unwrap();
        assert_eq!(result.label, "apple");
        assert_eq!(result.votes, 1);
    }

    #[test]
    fn test_counts_and_append_only_growth() {
        let mut classifier = ExampleClassifier::new();
        assert_eq!(classifier.example_count(), 0);
        assert_eq!(classifier.label_count(), 0);

        classifier.add_example("a", vector(1.0));
        classifier.add_example("a", vector(2.0));
        classifier.add_example("b", vector(3.0));

        assert_eq!(classifier.example_count(), 3);
        assert_eq!(classifier.label_count(), 2);
    }

    #[test]
    fn test_distance_is_euclidean() {
        let mut a = [0.0f32; NUM_MFCC];
        let mut b = [0.0f32; NUM_MFCC];
        a[0] = 3.0;
        b[1] = 4.0;

        assert_relative_eq!(distance(&a, &b), 5.0);
        assert_relative_eq!(distance(&a, &a), 0.0);
    }
}
