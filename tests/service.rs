mod common;

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{detector, stereo_noise};
use deep_voice_detector::{status, write_audio, AccessList, DefaultFetcher, Service};
use serde_json::json;
use tempfile::tempdir;

fn service(work_dir: &Path, access: AccessList, score: f32) -> Service {
    let (d, _) = detector(score);
    Service::new(
        d,
        Box::new(DefaultFetcher::new().unwrap()),
        access,
        work_dir.to_path_buf(),
    )
}

fn wav_base64(seconds: f64) -> String {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clip.wav");
    write_audio(&path, &stereo_noise(seconds)).unwrap();
    STANDARD.encode(std::fs::read(path).unwrap())
}

fn scratch_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[test]
fn inline_request_end_to_end() {
    let work = tempdir().unwrap();
    let svc = service(work.path(), AccessList::open(), 0.95);
    let body = json!({
        "key_verified": true,
        "source_kind": "inline",
        "locator": "clip.wav",
        "inline_content": wav_base64(2.5),
    });

    let resp = svc.handle_predict("10.0.0.1", body.to_string().as_bytes());
    assert_eq!(resp.status, 200, "{}", resp.body);
    assert_eq!(resp.body["fake_count"], 3);
    assert_eq!(resp.body["real_count"], 0);
    assert_eq!(resp.body["analysis_result"], "Fake");
    assert_eq!(resp.body["predictions"].as_array().unwrap().len(), 3);
    assert_eq!(scratch_entries(work.path()), 0);
}

#[test]
fn caller_outside_allowlist_is_forbidden() {
    let work = tempdir().unwrap();
    let access = AccessList::from_ips(["192.168.1.10"]).unwrap();
    let svc = service(work.path(), access, 0.95);

    let resp = svc.handle_predict("10.0.0.1", b"");
    assert_eq!(resp.status, 403);
    assert_eq!(resp.body, json!({ "error": "Forbidden" }));

    let resp = svc.handle_predict("192.168.1.10", b"");
    assert_eq!(resp.status, 400);
}

#[test]
fn allowlist_file_admits_listed_callers_only() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("allowlist.json");
    std::fs::write(&file, r#"{ "allowed_ips": ["10.1.2.3", " ::1 "] }"#).unwrap();

    let access = AccessList::load(&file).unwrap();
    assert!(access.check("10.1.2.3").is_ok());
    assert!(access.check("::1").is_ok());
    assert_eq!(access.check("10.1.2.4").unwrap_err().status_code(), 403);
    assert!(access.check("not-an-ip").is_err());

    std::fs::write(&file, r#"{ "allowed_ips": ["10.1.2.300"] }"#).unwrap();
    assert!(AccessList::load(&file).is_err());
}

#[test]
fn unverified_key_never_touches_the_source() {
    let work = tempdir().unwrap();
    let svc = service(work.path(), AccessList::open(), 0.95);
    let body = json!({
        "key_verified": false,
        "source_kind": "inline",
        "locator": "clip.wav",
        "inline_content": "AAAA",
    });
    let resp = svc.handle_predict("127.0.0.1", body.to_string().as_bytes());
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body["error"], "This API key is not authorized.");
    assert_eq!(scratch_entries(work.path()), 0);
}

#[test]
fn scratch_dir_is_removed_when_decoding_fails() {
    let work = tempdir().unwrap();
    let svc = service(work.path(), AccessList::open(), 0.95);
    let body = json!({
        "key_verified": true,
        "source_kind": "inline",
        "locator": "clip.wav",
        "inline_content": STANDARD.encode(b"not audio at all"),
    });

    let resp = svc.handle_predict("127.0.0.1", body.to_string().as_bytes());
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].as_str().unwrap().starts_with("Failed to decode audio"));
    assert_eq!(scratch_entries(work.path()), 0);
}

#[test]
fn silent_recording_reports_all_inferences_failed() {
    let work = tempdir().unwrap();
    let svc = service(work.path(), AccessList::open(), 0.95);

    let dir = tempdir().unwrap();
    let path = dir.path().join("quiet.wav");
    let n = 44_100;
    write_audio(
        &path,
        &deep_voice_detector::types::AudioData::from_stereo(&vec![0.0; n], &vec![0.0; n], 44_100),
    )
    .unwrap();
    let body = json!({
        "key_verified": true,
        "source_kind": "inline",
        "locator": "quiet.wav",
        "inline_content": STANDARD.encode(std::fs::read(&path).unwrap()),
    });

    let resp = svc.handle_predict("127.0.0.1", body.to_string().as_bytes());
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, json!({ "error": "All inferences failed." }));
}

#[test]
fn health_check() {
    let resp = status();
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, json!({ "status": "OK", "detail": "Server is healthy" }));
}
