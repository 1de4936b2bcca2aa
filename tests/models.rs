use std::{fs, path::Path};

use deep_voice_detector::{
    ensure_models, io::crypto::sha256_file, model::model_manager::read_manifest, DetectError,
    Progress,
};
use httpmock::prelude::*;
use serde_json::json;
use sha2::{Digest, Sha256};
use tempfile::tempdir;

fn write_manifest(dir: &Path, manifest: serde_json::Value) {
    fs::write(dir.join("manifest.json"), manifest.to_string()).unwrap();
}

fn manifest(sep_sha: Option<&str>, sep_url: Option<&str>) -> serde_json::Value {
    json!({
        "sample_rate": 44100,
        "separator": {
            "file": "separator.onnx",
            "sha256": sep_sha,
            "url": sep_url,
            "offset": 64
        },
        "classifier": {
            "file": "classifier.onnx",
            "input": "mel"
        }
    })
}

#[test]
fn manifest_defaults_fill_in_tiling() {
    let dir = tempdir().unwrap();
    write_manifest(dir.path(), manifest(None, None));
    let m = read_manifest(dir.path()).unwrap();
    assert_eq!(m.separator.crop_size, 256);
    assert_eq!(m.separator.batch_size, 4);
    assert_eq!(m.separator.input, "input");
    assert_eq!(m.classifier.input, "mel");
    assert_eq!(m.classifier.output, None);
}

#[test]
fn verified_files_resolve() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("separator.onnx"), b"sep-weights").unwrap();
    fs::write(dir.path().join("classifier.onnx"), b"cls-weights").unwrap();
    let digest = sha256_file(&dir.path().join("separator.onnx")).unwrap();
    write_manifest(dir.path(), manifest(Some(&digest.to_uppercase()), None));

    let files = ensure_models(dir.path(), &Progress::none()).expect("models");
    assert_eq!(files.separator, dir.path().join("separator.onnx"));
    assert_eq!(files.classifier, dir.path().join("classifier.onnx"));
}

#[test]
fn checksum_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("separator.onnx"), b"tampered").unwrap();
    fs::write(dir.path().join("classifier.onnx"), b"cls-weights").unwrap();
    write_manifest(dir.path(), manifest(Some(&"0".repeat(64)), None));

    let err = ensure_models(dir.path(), &Progress::none()).unwrap_err();
    assert!(matches!(err, DetectError::Checksum { .. }), "{err:?}");
    assert_eq!(err.status_code(), 500);
}

#[test]
fn missing_file_without_url_fails_to_load() {
    let dir = tempdir().unwrap();
    write_manifest(dir.path(), manifest(None, None));
    let err = ensure_models(dir.path(), &Progress::none()).unwrap_err();
    assert!(matches!(err, DetectError::ModelLoad(_)));
}

#[test]
fn missing_file_is_downloaded_and_verified() {
    let server = MockServer::start();
    let m = server.mock(|when, then| {
        when.method(GET).path("/separator.onnx");
        then.status(200).body("sep-weights");
    });

    let dir = tempdir().unwrap();
    fs::write(dir.path().join("classifier.onnx"), b"cls-weights").unwrap();
    let digest = hex::encode(Sha256::digest(b"sep-weights"));
    write_manifest(
        dir.path(),
        manifest(Some(&digest), Some(&server.url("/separator.onnx"))),
    );

    let files = ensure_models(dir.path(), &Progress::none()).expect("models");
    m.assert();
    assert_eq!(fs::read(files.separator).unwrap(), b"sep-weights");
}

#[test]
fn offset_larger_than_half_a_crop_is_a_load_error() {
    let dir = tempdir().unwrap();
    let mut m = manifest(None, None);
    m["separator"]["offset"] = json!(200);
    write_manifest(dir.path(), m);
    assert!(matches!(read_manifest(dir.path()), Err(DetectError::ModelLoad(_))));
}
