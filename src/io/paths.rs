use crate::error::{DetectError, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "DeepVoice", "deep-voice-detector").ok_or(DetectError::CacheDirUnavailable)
}

/// Default location of `manifest.json` and the ONNX files.
pub fn models_cache_dir() -> Result<PathBuf> {
    let mut p = PathBuf::from(project_dirs()?.cache_dir());
    p.push("models");
    Ok(p)
}

/// Parent of the per-request scratch directories.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("deep-voice-detector")
}

/// Default `config.json` location.
pub fn config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}
