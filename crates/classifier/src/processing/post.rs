use crate::catalog::LabelCatalog;
use std::cmp::Ordering;

/// A triggered label with its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub probability: f32,
}

/// Converts a probability vector into the ranked set of triggered labels.
pub struct DecisionEngine {
    threshold: f32,
}

impl DecisionEngine {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Select every class whose score meets the threshold (inclusive
    /// boundary) and rank the result by probability, descending. Ties keep
    /// catalog order. An empty result means no label was triggered.
    pub fn decide(&self, scores: &[f32], catalog: &LabelCatalog) -> Vec<Detection> {
        debug_assert_eq!(scores.len(), catalog.len());

        let mut hits: Vec<(usize, f32)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        // Stable sort: equal probabilities stay in catalog order.
        hits.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        hits.into_iter()
            .map(|(index, probability)| Detection {
                label: catalog.names()[index].clone(),
                probability,
            })
            .collect()
    }
}
