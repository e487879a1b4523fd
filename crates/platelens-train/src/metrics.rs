//! Running micro-averaged F1 over a training epoch

use anyhow::Result;
use candle_core::Tensor;

/// Micro-F1 accumulator for multi-label predictions
///
/// A class counts as predicted when its sigmoid probability is strictly
/// greater than the threshold. Counts are pooled across every class and
/// batch, so frequent classes weigh more than rare ones.
pub struct MicroF1 {
    threshold: f32,
    true_positives: u64,
    false_positives: u64,
    false_negatives: u64,
}

impl MicroF1 {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
        }
    }

    /// Fold one batch of raw logits and multi-hot targets into the counts
    pub fn update(&mut self, logits: &Tensor, targets: &Tensor) -> Result<()> {
        let probabilities = candle_nn::ops::sigmoid(logits)?.to_vec2::<f32>()?;
        let targets = targets.to_vec2::<f32>()?;

        for (row, expected) in probabilities.iter().zip(targets.iter()) {
            for (&probability, &target) in row.iter().zip(expected.iter()) {
                let predicted = probability > self.threshold;
                let actual = target >= 0.5;
                match (predicted, actual) {
                    (true, true) => self.true_positives += 1,
                    (true, false) => self.false_positives += 1,
                    (false, true) => self.false_negatives += 1,
                    (false, false) => {}
                }
            }
        }
        Ok(())
    }

    /// Current micro-F1, or 0.0 before any positive was seen or predicted
    pub fn f1(&self) -> f32 {
        let denominator = 2 * self.true_positives + self.false_positives + self.false_negatives;
        if denominator == 0 {
            return 0.0;
        }
        2.0 * self.true_positives as f32 / denominator as f32
    }
}
