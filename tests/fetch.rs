use base64::{engine::general_purpose::STANDARD, Engine as _};
use deep_voice_detector::{
    io::fetch::{ObjectLocator, Source},
    DefaultFetcher, DetectError, Fetch,
};
use httpmock::prelude::*;
use tempfile::tempdir;

#[test]
fn object_locator_splits_bucket_and_key() {
    let loc = ObjectLocator::parse("https://voices.s3.ap-northeast-2.amazonaws.com/uploads/2024/clip.m4a").unwrap();
    assert_eq!(loc.bucket, "voices");
    assert_eq!(loc.key, "uploads/2024/clip.m4a");
    assert_eq!(loc.file_name(), "clip.m4a");
}

#[test]
fn object_locator_rejects_non_urls() {
    let err = ObjectLocator::parse("not a url").unwrap_err();
    assert!(matches!(err, DetectError::Acquisition { retryable: false, .. }));
    assert_eq!(err.status_code(), 502);
}

#[test]
fn object_store_download_lands_in_scratch_dir() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/uploads/clip.wav");
        then.status(200).body("RIFF-bytes");
    });

    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new().unwrap();
    let path = fetcher
        .fetch(&Source::ObjectStore(server.url("/uploads/clip.wav")), dir.path())
        .expect("fetch");

    m.assert();
    assert_eq!(path, dir.path().join("clip.wav"));
    assert_eq!(std::fs::read(&path).unwrap(), b"RIFF-bytes");
    assert!(!dir.path().join("clip.part").exists());
}

#[test]
fn object_locator_decodes_the_key() {
    let loc = ObjectLocator::parse("https://voices.s3.us-east-1.amazonaws.com/takes/a%2Bb%23c.wav").unwrap();
    assert_eq!(loc.key, "takes/a+b#c.wav");
    assert_eq!(loc.file_name(), "a+b#c.wav");
}

#[test]
fn encoded_object_key_is_requested_verbatim() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/takes/a%2Bb%23c.wav");
        then.status(200).body("RIFF-encoded");
    });

    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new().unwrap();
    let path = fetcher
        .fetch(&Source::ObjectStore(server.url("/takes/a%2Bb%23c.wav")), dir.path())
        .expect("fetch");

    m.assert();
    assert_eq!(path, dir.path().join("a+b#c.wav"));
    assert_eq!(std::fs::read(&path).unwrap(), b"RIFF-encoded");
}

#[test]
fn client_errors_are_not_retryable_server_errors_are() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.path("/missing.wav");
        then.status(404);
    });
    server.mock(|when, then| {
        when.path("/busy.wav");
        then.status(503);
    });

    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new().unwrap();

    let err = fetcher
        .fetch(&Source::ObjectStore(server.url("/missing.wav")), dir.path())
        .unwrap_err();
    assert!(!err.is_retryable(), "{err}");

    let err = fetcher
        .fetch(&Source::ObjectStore(server.url("/busy.wav")), dir.path())
        .unwrap_err();
    assert!(err.is_retryable(), "{err}");
}

#[test]
fn inline_content_is_decoded_under_its_base_name() {
    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new().unwrap();
    let source = Source::Inline {
        name: "../../outside/voice.wav".into(),
        content: STANDARD.encode(b"payload"),
    };

    let path = fetcher.fetch(&source, dir.path()).unwrap();
    assert_eq!(path, dir.path().join("voice.wav"));
    assert_eq!(std::fs::read(&path).unwrap(), b"payload");
}

#[test]
fn invalid_base64_is_a_validation_error() {
    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new().unwrap();
    let source = Source::Inline {
        name: "voice.wav".into(),
        content: "%%%".into(),
    };
    let err = fetcher.fetch(&source, dir.path()).unwrap_err();
    assert!(matches!(err, DetectError::Validation(_)));
}

#[test]
fn missing_link_tool_is_an_acquisition_error() {
    let dir = tempdir().unwrap();
    let fetcher = DefaultFetcher::new()
        .unwrap()
        .with_yt_dlp("/nonexistent/yt-dlp-binary");
    let err = fetcher
        .fetch(
            &Source::Link("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into()),
            dir.path(),
        )
        .unwrap_err();
    assert!(matches!(err, DetectError::Acquisition { retryable: false, .. }));
}
