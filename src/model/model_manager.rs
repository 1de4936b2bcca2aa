use crate::{
    error::{DetectError, Result},
    io::{
        crypto::verify_sha256,
        net::{download_with_progress, http_client},
        progress::Progress,
    },
    model::manifest::{Artifact, ModelManifest, MANIFEST_FILE},
};

use std::{
    fs,
    path::{Path, PathBuf},
};

/// Verified, on-disk locations of both networks.
#[derive(Clone, Debug)]
pub struct ModelFiles {
    pub manifest: ModelManifest,
    pub separator: PathBuf,
    pub classifier: PathBuf,
}

pub fn read_manifest(dir: &Path) -> Result<ModelManifest> {
    let path = dir.join(MANIFEST_FILE);
    let text = fs::read_to_string(&path)
        .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", path.display())))?;
    let manifest: ModelManifest = serde_json::from_str(&text)
        .map_err(|e| DetectError::ModelLoad(format!("{}: {e}", path.display())))?;
    manifest.validate().map_err(DetectError::ModelLoad)?;
    Ok(manifest)
}

/// Resolves both artifacts in `dir`, downloading any that are missing and
/// have a `url`, and checks every declared digest.
pub fn ensure_models(dir: &Path, progress: &Progress) -> Result<ModelFiles> {
    let manifest = read_manifest(dir)?;
    let separator = ensure_artifact(dir, &manifest.separator.artifact, progress)?;
    let classifier = ensure_artifact(dir, &manifest.classifier.artifact, progress)?;
    Ok(ModelFiles {
        manifest,
        separator,
        classifier,
    })
}

fn ensure_artifact(dir: &Path, a: &Artifact, progress: &Progress) -> Result<PathBuf> {
    let local_path = dir.join(&a.file);

    if !local_path.exists() {
        let url = a.url.as_deref().ok_or_else(|| {
            DetectError::ModelLoad(format!("{} not found and no url given", local_path.display()))
        })?;
        log::info!("fetching {} from {url}", a.file);
        fs::create_dir_all(dir)?;
        let client = http_client()?;
        download_with_progress(&client, url, &local_path, progress)
            .map_err(|e| DetectError::ModelLoad(format!("download {}: {e}", a.file)))?;
    }

    if let Some(expected) = &a.sha256 {
        if !verify_sha256(&local_path, expected)? {
            return Err(DetectError::Checksum {
                path: local_path.display().to_string(),
            });
        }
        log::debug!("{} sha256 ok", a.file);
    }

    Ok(local_path)
}
