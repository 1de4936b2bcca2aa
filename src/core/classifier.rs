use std::sync::Arc;

use ndarray::Array3;

use crate::error::InferenceError;

/// Fraction of exact zeros above which a tensor is treated as silence.
pub const DEFAULT_SILENCE_RATIO: f64 = 0.8;

/// Seam to the classification network: one (128, 128, 1) tensor in, one
/// probability out.
pub trait Scorer: Send + Sync {
    fn score(&self, features: &Array3<f32>) -> Result<f32, InferenceError>;
}

pub struct Classifier {
    scorer: Arc<dyn Scorer>,
    silence_ratio: f64,
}

impl Classifier {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self {
            scorer,
            silence_ratio: DEFAULT_SILENCE_RATIO,
        }
    }

    pub fn with_silence_ratio(mut self, ratio: f64) -> Self {
        self.silence_ratio = ratio;
        self
    }

    /// `Ok(None)` when the tensor is mostly silence and the model was not run.
    pub fn classify(&self, features: &Array3<f32>) -> Result<Option<f32>, InferenceError> {
        if is_mostly_zero(features, self.silence_ratio) {
            return Ok(None);
        }
        let p = self.scorer.score(features)?;
        if !p.is_finite() {
            return Err(InferenceError::NonFinite(p));
        }
        Ok(Some(p))
    }
}

/// True when strictly more than `ratio` of the values are exactly zero.
pub fn is_mostly_zero(features: &Array3<f32>, ratio: f64) -> bool {
    let total = features.len();
    if total == 0 {
        return true;
    }
    let zeros = features.iter().filter(|&&v| v == 0.0).count();
    zeros as f64 / total as f64 > ratio
}
