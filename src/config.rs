use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    core::{engine::DevicePreference, verdict::DecisionPolicy},
    error::Result,
    io::paths::{config_file, default_work_dir, models_cache_dir},
};

pub const ENV_MODEL_DIR: &str = "DEEPVOICE_MODEL_DIR";
pub const ENV_WORK_DIR: &str = "DEEPVOICE_WORK_DIR";
pub const ENV_ALLOWLIST: &str = "DEEPVOICE_ALLOWLIST";
pub const ENV_DEVICE: &str = "DEEPVOICE_DEVICE";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Directory holding `manifest.json` and the ONNX files.
    pub model_dir: PathBuf,
    /// Parent of the per-request scratch directories.
    pub work_dir: PathBuf,
    /// `{ "allowed_ips": [...] }` file. Every caller is admitted when unset.
    pub allowlist: Option<PathBuf>,
    pub device: DevicePreference,
    pub yt_dlp: PathBuf,
    pub policy: DecisionPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_dir: models_cache_dir().unwrap_or_else(|_| PathBuf::from("models")),
            work_dir: default_work_dir(),
            allowlist: None,
            device: DevicePreference::Auto,
            yt_dlp: PathBuf::from("yt-dlp"),
            policy: DecisionPolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Reads `path`, or the platform config file when it exists, then
    /// applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(p.to_path_buf()),
            None => config_file().ok().filter(|p| p.exists()),
        };
        let mut cfg = match file {
            Some(p) => {
                log::debug!("reading config {}", p.display());
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = get(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_WORK_DIR) {
            self.work_dir = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_ALLOWLIST) {
            self.allowlist = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_DEVICE) {
            self.device = v.parse()?;
        }
        Ok(())
    }
}
