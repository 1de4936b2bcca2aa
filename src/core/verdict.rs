use serde::{Deserialize, Serialize};

use crate::{
    error::{DetectError, InferenceError, Result},
    types::Label,
};

/// Thresholds that turn per-segment scores into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    /// A segment counts as fake when its score is at least this.
    pub segment_threshold: f64,
    /// The recording is fake when the fake share reaches this.
    pub verdict_threshold: f64,
    /// Zero fraction above which a feature tensor is skipped.
    pub silence_ratio: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            segment_threshold: 0.8,
            verdict_threshold: 0.3,
            silence_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub predictions: Vec<Option<f32>>,
    pub fake_count: usize,
    pub real_count: usize,
    pub ratio: f64,
    pub label: Label,
}

impl Verdict {
    /// Collapses per-segment results, failures becoming nulls, and applies
    /// `policy` to the valid scores.
    pub fn from_results(
        results: &[std::result::Result<Option<f32>, InferenceError>],
        policy: &DecisionPolicy,
    ) -> Result<Self> {
        let predictions: Vec<Option<f32>> = results
            .iter()
            .enumerate()
            .map(|(i, r)| match r {
                Ok(p) => *p,
                Err(e) => {
                    log::warn!("segment {i}: {e}");
                    None
                }
            })
            .collect();
        Self::from_predictions(predictions, policy)
    }

    pub fn from_predictions(predictions: Vec<Option<f32>>, policy: &DecisionPolicy) -> Result<Self> {
        let valid: Vec<f32> = predictions.iter().flatten().copied().collect();
        if valid.is_empty() {
            return Err(DetectError::NoValidPredictions);
        }

        let fake_count = valid
            .iter()
            .filter(|&&p| p as f64 >= policy.segment_threshold)
            .count();
        let real_count = valid.len() - fake_count;
        let ratio = fake_count as f64 / valid.len() as f64;
        let label = if ratio >= policy.verdict_threshold {
            Label::Fake
        } else {
            Label::Real
        };

        Ok(Self {
            predictions,
            fake_count,
            real_count,
            ratio,
            label,
        })
    }
}
