//! Core types for PlateLens

use serde::Serialize;

/// A single label paired with the probability the classifier assigned it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredLabel {
    /// Label text from the ingredient vocabulary
    pub label: &'static str,

    /// Softmax probability in `[0, 1]`
    pub score: f32,
}

impl ScoredLabel {
    /// Create a new scored label
    pub fn new(label: &'static str, score: f32) -> Self {
        Self { label, score }
    }

    /// Whether this label clears a detection threshold (strictly greater)
    pub fn clears(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}
