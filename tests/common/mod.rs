#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use deep_voice_detector::{
    types::AudioData, DecisionPolicy, Detector, InferenceError, MaskModel, MaskPair, Result,
    Scorer, SAMPLE_RATE,
};
use ndarray::{Array3, Array4};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Vocal mask of ones, background of zeros, over each tile's ROI.
pub struct PassThroughMask {
    pub offset: usize,
    pub batches: Mutex<Vec<usize>>,
}

impl PassThroughMask {
    pub fn new(offset: usize) -> Self {
        Self {
            offset,
            batches: Mutex::new(Vec::new()),
        }
    }
}

impl MaskModel for PassThroughMask {
    fn offset(&self) -> usize {
        self.offset
    }

    fn predict_masks(&self, batch: &Array4<f32>) -> Result<MaskPair> {
        let (b, ch, bins, crop) = batch.dim();
        self.batches.lock().unwrap().push(b);
        let roi = crop - 2 * self.offset;
        let vocal = Array4::<f32>::ones((b, ch, bins, roi));
        let background = Array4::<f32>::zeros((b, ch, bins, roi));
        Ok(MaskPair { vocal, background })
    }
}

/// Returns the same score for every tensor and counts calls.
pub struct ConstantScorer {
    pub score: f32,
    pub calls: AtomicUsize,
}

impl ConstantScorer {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for ConstantScorer {
    fn score(&self, _features: &Array3<f32>) -> std::result::Result<f32, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.score)
    }
}

pub fn detector(score: f32) -> (Detector, Arc<ConstantScorer>) {
    let scorer = Arc::new(ConstantScorer::new(score));
    let d = Detector::new(
        Arc::new(PassThroughMask::new(64)),
        scorer.clone(),
        DecisionPolicy::default(),
    )
    .expect("detector");
    (d, scorer)
}

/// Deterministic broadband test signal.
pub fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.random_range(-0.25f32..0.25)).collect()
}

pub fn stereo_noise(seconds: f64) -> AudioData {
    let n = (seconds * SAMPLE_RATE as f64) as usize;
    AudioData::from_stereo(&noise(n, 1), &noise(n, 2), SAMPLE_RATE)
}
