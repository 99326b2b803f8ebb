// Brute-force nearest-neighbor indexes over feature vectors
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::features::FeatureVector;

/// Euclidean distance between vectors of equal length
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "distance between vectors of different length");
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Length shared by every vector, `None` when they disagree or there are none
pub fn common_dimension(samples: &[FeatureVector]) -> Option<usize> {
    let first = samples.first()?.len();
    samples
        .iter()
        .all(|sample| sample.len() == first)
        .then_some(first)
}

/// `(index, distance)` of the `k` samples closest to `query`, nearest first.
/// Equal distances keep insertion order.
fn nearest(samples: &[FeatureVector], query: &[f64], k: usize) -> Vec<(usize, f64)> {
    let mut distances: Vec<(usize, f64)> = samples
        .iter()
        .enumerate()
        .map(|(i, sample)| (i, euclidean_distance(sample, query)))
        .collect();
    distances.sort_by(|a, b| a.1.total_cmp(&b.1));
    distances.truncate(k);
    distances
}

/// Single-class index answering "how far is this query from my samples"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestNeighbors {
    k: usize,
    samples: Vec<FeatureVector>,
}

impl NearestNeighbors {
    pub fn fit(k: usize, samples: Vec<FeatureVector>) -> Self {
        Self { k, samples }
    }

    pub fn dimension(&self) -> Option<usize> {
        common_dimension(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Up to `k` neighbors of `query`, nearest first
    pub fn kneighbors(&self, query: &[f64], k: usize) -> Vec<(usize, f64)> {
        nearest(&self.samples, query, k)
    }

    /// Mean distance to the index's own `k` nearest samples
    pub fn mean_distance(&self, query: &[f64]) -> Option<f64> {
        let neighbors = self.kneighbors(query, self.k);
        if neighbors.is_empty() {
            return None;
        }
        let total: f64 = neighbors.iter().map(|(_, d)| d).sum();
        Some(total / neighbors.len() as f64)
    }
}

/// Multi-class majority-vote classifier over every active symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointModel {
    k: usize,
    samples: Vec<FeatureVector>,
    labels: Vec<String>,
}

impl JointModel {
    /// `None` when there is nothing to learn from
    pub fn fit(k: usize, labeled: Vec<(String, FeatureVector)>) -> Option<Self> {
        if labeled.is_empty() {
            return None;
        }
        let (labels, samples) = labeled.into_iter().unzip();
        Some(Self { k, samples, labels })
    }

    pub fn dimension(&self) -> Option<usize> {
        common_dimension(&self.samples)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct labels, sorted
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    /// Most frequent label among the `k` nearest samples. Ties go to the
    /// lexicographically smallest label.
    pub fn predict(&self, query: &[f64]) -> Option<&str> {
        let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
        for (i, _) in nearest(&self.samples, query, self.k) {
            *votes.entry(self.labels[i].as_str()).or_default() += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for (label, count) in votes {
            if best.map_or(true, |(_, top)| count > top) {
                best = Some((label, count));
            }
        }
        best.map(|(label, _)| label)
    }
}
