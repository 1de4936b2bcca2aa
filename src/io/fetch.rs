//! Source acquisition into a scratch directory.

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::blocking::Client;
use url::Url;

use crate::{
    error::{DetectError, Result},
    io::{
        net::{download_with_progress, http_client},
        progress::Progress,
    },
};

static VIDEO_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+\?v=)?([^&=%\?]{11})",
    )
    .expect("video link pattern")
});

pub fn is_video_link(s: &str) -> bool {
    VIDEO_LINK.is_match(s)
}

/// Where the audio of a request comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Public object-store URL, `https://<bucket>.s3.<region>.amazonaws.com/<key>`.
    ObjectStore(String),
    /// Video link handed to `yt-dlp`.
    Link(String),
    /// Base64 payload; `name` is the caller's file name.
    Inline { name: String, content: String },
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::ObjectStore(_) => "object_store",
            Source::Link(_) => "link",
            Source::Inline { .. } => "inline",
        }
    }
}

/// Acquires a source into `dir`, returning the local audio file.
pub trait Fetch: Send + Sync {
    fn fetch(&self, source: &Source, dir: &Path) -> Result<PathBuf>;
}

/// Bucket and decoded key of an object URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocator {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocator {
    pub fn parse(locator: &str) -> Result<Self> {
        let url = Url::parse(locator)
            .map_err(|e| DetectError::acquisition(format!("invalid object URL {locator:?}: {e}"), false))?;
        let host = url
            .host_str()
            .ok_or_else(|| DetectError::acquisition(format!("object URL {locator:?} has no host"), false))?;
        let bucket = host.split('.').next().unwrap_or_default().to_string();
        let key = percent_decode_str(url.path().trim_start_matches('/'))
            .decode_utf8_lossy()
            .into_owned();
        if bucket.is_empty() || key.is_empty() {
            return Err(DetectError::acquisition(
                format!("object URL {locator:?} names no bucket or key"),
                false,
            ));
        }
        Ok(Self { bucket, key })
    }

    /// Last path component of the key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Keeps only the final path component of a caller-supplied name.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        b => Some(b.to_string()),
    }
}

pub struct DefaultFetcher {
    client: Client,
    yt_dlp: PathBuf,
    progress: Progress,
}

impl DefaultFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            yt_dlp: PathBuf::from("yt-dlp"),
            progress: Progress::none(),
        })
    }

    pub fn with_yt_dlp(mut self, program: impl Into<PathBuf>) -> Self {
        self.yt_dlp = program.into();
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    fn fetch_object(&self, locator: &str, dir: &Path) -> Result<PathBuf> {
        let obj = ObjectLocator::parse(locator)?;
        let name = sanitize_file_name(obj.file_name())
            .ok_or_else(|| DetectError::acquisition(format!("object key {:?} has no file name", obj.key), false))?;
        let dest = dir.join(name);
        // The URL goes out as received so encoded key characters survive.
        log::info!("downloading s3://{}/{}", obj.bucket, obj.key);
        download_with_progress(&self.client, locator, &dest, &self.progress)?;
        Ok(dest)
    }

    fn fetch_link(&self, link: &str, dir: &Path) -> Result<PathBuf> {
        if !is_video_link(link) {
            return Err(DetectError::Validation("Invalid YouTube link.".into()));
        }
        let stem = format!("link_{}", uuid::Uuid::new_v4());
        let template = dir.join(format!("{stem}.%(ext)s"));

        log::info!("extracting audio from {link}");
        let output = Command::new(&self.yt_dlp)
            .arg("--quiet")
            .arg("--no-playlist")
            .args(["-f", "bestaudio/best", "-x", "--audio-format", "wav", "-o"])
            .arg(&template)
            .arg(link)
            .output()
            .map_err(|e| DetectError::acquisition(format!("failed to run {}: {e}", self.yt_dlp.display()), false))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DetectError::acquisition(
                format!("Failed to download audio from {link}: {}", stderr.trim()),
                true,
            ));
        }

        let wav = dir.join(format!("{stem}.wav"));
        if !wav.exists() {
            return Err(DetectError::acquisition(
                format!("yt-dlp produced no audio for {link}"),
                false,
            ));
        }
        Ok(wav)
    }

    fn write_inline(&self, name: &str, content: &str, dir: &Path) -> Result<PathBuf> {
        let name = sanitize_file_name(name)
            .ok_or_else(|| DetectError::Validation(format!("Invalid file name {name:?}.")))?;
        let bytes = STANDARD
            .decode(content.trim())
            .map_err(|e| DetectError::Validation(format!("Invalid base64 content: {e}")))?;
        let dest = dir.join(name);
        fs::write(&dest, bytes)?;
        log::info!("inline content saved at {}", dest.display());
        Ok(dest)
    }
}

impl Fetch for DefaultFetcher {
    fn fetch(&self, source: &Source, dir: &Path) -> Result<PathBuf> {
        match source {
            Source::ObjectStore(locator) => self.fetch_object(locator, dir),
            Source::Link(link) => self.fetch_link(link, dir),
            Source::Inline { name, content } => self.write_inline(name, content, dir),
        }
    }
}
