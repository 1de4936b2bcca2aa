use crate::{
    error::{DetectError, Result},
    io::progress::Progress,
    types::DetectProgress,
};
use reqwest::blocking::Client;
use std::{
    fs,
    fs::File,
    io::{Read, Write},
    path::Path,
    time::Duration,
};

pub fn http_client() -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(10 * 60))
        .build()
        .map_err(|e| DetectError::acquisition(format!("http client: {e}"), false))
}

/// Streams `url` into `dest` through a `.part` file that is renamed once
/// the body is complete.
pub fn download_with_progress(client: &Client, url: &str, dest: &Path, progress: &Progress) -> Result<u64> {
    let tmp = dest.with_extension("part");

    let mut resp = client.get(url).send()?.error_for_status()?;

    let total = resp.content_length().unwrap_or(0);
    progress.emit(DetectProgress::Download { done: 0, total });

    let mut file = File::create(&tmp)?;
    let mut downloaded: u64 = 0;
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = match resp.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                fs::remove_file(&tmp).ok();
                return Err(DetectError::acquisition(format!("reading {url}: {e}"), true));
            }
        };
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        downloaded += n as u64;
        progress.emit(DetectProgress::Download { done: downloaded, total });
    }
    file.flush()?;

    if dest.exists() {
        fs::remove_file(dest).ok();
    }
    fs::rename(&tmp, dest)?;

    log::debug!("downloaded {downloaded} bytes from {url}");
    Ok(downloaded)
}
