use serde::{Deserialize, Serialize};

use crate::{
    core::separator::{DEFAULT_BATCH_SIZE, DEFAULT_CROP_SIZE},
    types::SAMPLE_RATE,
};

pub const MANIFEST_FILE: &str = "manifest.json";

/// `manifest.json` in the model directory. Describes both networks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelManifest {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    pub separator: SeparatorArtifact,
    pub classifier: ClassifierArtifact,
}

/// Where a network's weights live and how to verify them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artifact {
    /// File name relative to the model directory.
    pub file: String,
    #[serde(default)]
    pub sha256: Option<String>,
    /// Fetched into the model directory when `file` is missing.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeparatorArtifact {
    #[serde(flatten)]
    pub artifact: Artifact,
    #[serde(default = "default_input")]
    pub input: String,
    #[serde(default = "default_vocal_output")]
    pub vocal_output: String,
    #[serde(default = "default_background_output")]
    pub background_output: String,
    pub offset: usize,
    #[serde(default = "default_crop_size")]
    pub crop_size: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    #[serde(flatten)]
    pub artifact: Artifact,
    #[serde(default = "default_input")]
    pub input: String,
    /// First output when unset.
    #[serde(default)]
    pub output: Option<String>,
}

impl ModelManifest {
    pub fn validate(&self) -> Result<(), String> {
        let sep = &self.separator;
        if self.sample_rate != SAMPLE_RATE {
            return Err(format!(
                "models expect {} Hz, pipeline runs at {} Hz",
                self.sample_rate, SAMPLE_RATE
            ));
        }
        if sep.crop_size == 0 || sep.batch_size == 0 {
            return Err("separator crop_size and batch_size must be positive".into());
        }
        if 2 * sep.offset > sep.crop_size {
            return Err(format!(
                "separator offset {} does not fit in crop size {}",
                sep.offset, sep.crop_size
            ));
        }
        for a in [&sep.artifact, &self.classifier.artifact] {
            if a.file.is_empty() || a.file.contains(['/', '\\']) {
                return Err(format!("artifact file name {:?} must be a bare file name", a.file));
            }
        }
        Ok(())
    }
}

fn default_sample_rate() -> u32 {
    SAMPLE_RATE
}
fn default_input() -> String {
    "input".into()
}
fn default_vocal_output() -> String {
    "vocal_mask".into()
}
fn default_background_output() -> String {
    "background_mask".into()
}
fn default_crop_size() -> usize {
    DEFAULT_CROP_SIZE
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}
