use std::{collections::HashMap, path::PathBuf};

use deep_voice_detector::{
    config::{ENV_ALLOWLIST, ENV_DEVICE, ENV_MODEL_DIR},
    DetectorConfig, DevicePreference,
};
use tempfile::tempdir;

#[test]
fn partial_file_keeps_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "model_dir": "/srv/models", "policy": { "verdict_threshold": 0.5 } }"#,
    )
    .unwrap();

    let cfg = DetectorConfig::from_file(&path).unwrap();
    assert_eq!(cfg.model_dir, PathBuf::from("/srv/models"));
    assert_eq!(cfg.device, DevicePreference::Auto);
    assert_eq!(cfg.policy.verdict_threshold, 0.5);
    assert_eq!(cfg.policy.segment_threshold, 0.8);
    assert_eq!(cfg.policy.silence_ratio, 0.8);
}

#[test]
fn environment_overrides_win() {
    let env: HashMap<&str, &str> = [
        (ENV_MODEL_DIR, "/opt/models"),
        (ENV_ALLOWLIST, "/etc/deepvoice/access_ip.json"),
        (ENV_DEVICE, "CPU"),
    ]
    .into_iter()
    .collect();

    let mut cfg = DetectorConfig::default();
    cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string())).unwrap();
    assert_eq!(cfg.model_dir, PathBuf::from("/opt/models"));
    assert_eq!(cfg.allowlist, Some(PathBuf::from("/etc/deepvoice/access_ip.json")));
    assert_eq!(cfg.device, DevicePreference::Cpu);
}

#[test]
fn unknown_device_is_rejected() {
    let mut cfg = DetectorConfig::default();
    assert!(cfg
        .apply_overrides(|k| (k == ENV_DEVICE).then(|| "tpu".to_string()))
        .is_err());
}
