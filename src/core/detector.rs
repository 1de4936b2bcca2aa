use std::{path::Path, sync::Arc};

use crate::{
    core::{
        audio::load_waveform,
        classifier::{Classifier, Scorer},
        engine::Models,
        features::FeatureExtractor,
        segmenter::segment,
        separator::{MaskModel, Separator},
        verdict::{DecisionPolicy, Verdict},
    },
    error::Result,
    io::progress::Progress,
    types::{AudioData, DetectProgress, SAMPLE_RATE},
};

/// Runs a recording through separation, segmentation, features,
/// classification and aggregation.
pub struct Detector {
    separator: Separator,
    features: FeatureExtractor,
    classifier: Classifier,
    policy: DecisionPolicy,
    progress: Progress,
}

impl Detector {
    pub fn new(
        mask_model: Arc<dyn MaskModel>,
        scorer: Arc<dyn Scorer>,
        policy: DecisionPolicy,
    ) -> Result<Self> {
        Ok(Self {
            separator: Separator::new(mask_model),
            features: FeatureExtractor::new(SAMPLE_RATE)?,
            classifier: Classifier::new(scorer).with_silence_ratio(policy.silence_ratio),
            policy,
            progress: Progress::none(),
        })
    }

    /// Detector backed by loaded ONNX sessions, tiled as their manifest says.
    pub fn from_models(models: &Models, policy: DecisionPolicy) -> Result<Self> {
        let mut d = Self::new(models.separator.clone(), models.classifier.clone(), policy)?;
        d.separator = d
            .separator
            .with_crop_size(models.crop_size)
            .with_batch_size(models.batch_size);
        Ok(d)
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.separator = self.separator.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn analyze_file(&self, path: &Path) -> Result<Verdict> {
        self.progress.stage("decode");
        let wave = load_waveform(path)?;
        log::info!(
            "decoded {} ({:.2} s)",
            path.display(),
            wave.frames() as f64 / wave.sample_rate as f64
        );
        self.analyze_waveform(&wave)
    }

    pub fn analyze_waveform(&self, wave: &AudioData) -> Result<Verdict> {
        let vocals = self.isolate_vocals(wave)?;
        self.analyze_vocals(&vocals.downmix_to_mono())
    }

    /// Stereo vocal track of `wave`.
    pub fn isolate_vocals(&self, wave: &AudioData) -> Result<AudioData> {
        self.progress.stage("separate");
        let vocals = self.separator.separate(wave)?;
        log::info!("separated vocals: {} frames", vocals.frames());
        Ok(vocals)
    }

    /// Scores a mono vocal track already at the pipeline sample rate.
    pub fn analyze_vocals(&self, mono: &[f32]) -> Result<Verdict> {
        self.progress.stage("classify");
        let segments = segment(mono, self.features.sample_rate() as usize);
        let total = segments.len();
        log::info!("classifying {total} segments");

        let mut results = Vec::with_capacity(total);
        for (i, seg) in segments.iter().enumerate() {
            let tensor = self.features.extract(seg)?;
            let r = self.classifier.classify(&tensor);
            match &r {
                Ok(Some(p)) => log::debug!("segment {i}: {p:.4}"),
                Ok(None) => log::debug!("segment {i}: silent, skipped"),
                Err(_) => {}
            }
            results.push(r);
            self.progress
                .emit(DetectProgress::Segments { done: i + 1, total });
        }

        let verdict = Verdict::from_results(&results, &self.policy)?;
        log::info!(
            "verdict {} (fake {}, real {}, ratio {:.3})",
            verdict.label,
            verdict.fake_count,
            verdict.real_count,
            verdict.ratio
        );
        Ok(verdict)
    }
}
