use std::sync::Mutex;

use tempfile::NamedTempFile;

use framegrab::config::GrabConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FRAMEGRAB_CONFIG",
        "FRAMEGRAB_SOURCE",
        "FRAMEGRAB_OUTPUT_DIR",
        "FRAMEGRAB_PREFIX",
        "FRAMEGRAB_INTERVAL_SECS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "capture": {
            "source": "/dev/video2",
            "width": 800,
            "height": 600,
            "fps": 12.0,
            "convert_to_rgb": true
        },
        "recorder": {
            "output_dir": "dataset/raw",
            "interval_secs": 1.5,
            "prefix": "cam2"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("FRAMEGRAB_CONFIG", file.path());
    std::env::set_var("FRAMEGRAB_SOURCE", "stub://override");
    std::env::set_var("FRAMEGRAB_INTERVAL_SECS", "2.5");

    let cfg = GrabConfig::load().expect("load config");

    assert_eq!(cfg.capture.source, "stub://override");
    assert_eq!(cfg.capture.width, Some(800));
    assert_eq!(cfg.capture.height, Some(600));
    assert_eq!(cfg.capture.fps, Some(12.0));
    assert!(cfg.capture.convert_to_rgb);
    assert_eq!(cfg.recorder.output_dir.to_str(), Some("dataset/raw"));
    assert_eq!(cfg.recorder.interval_secs, 2.5);
    assert_eq!(cfg.recorder.prefix, "cam2");

    clear_env();
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = GrabConfig::load().expect("load config");
    assert_eq!(cfg.capture.source, "stub://camera");
    assert_eq!(cfg.capture.width, None);
    assert!(!cfg.capture.convert_to_rgb);
    assert_eq!(cfg.recorder.interval_secs, 0.0);
    assert_eq!(cfg.recorder.prefix, "frame");

    clear_env();
}

#[test]
fn rejects_invalid_interval_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FRAMEGRAB_INTERVAL_SECS", "-1");
    let result = GrabConfig::load();
    clear_env();
    assert!(result.is_err());
}

#[test]
fn validate_catches_mutations_after_load() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    // Callers that patch a loaded config (CLI overrides) must be able to
    // re-check it before handing values to Duration::from_secs_f64.
    let mut cfg = GrabConfig::load().expect("load config");
    assert!(cfg.validate().is_ok());

    cfg.recorder.interval_secs = -1.0;
    assert!(cfg.validate().is_err());

    cfg.recorder.interval_secs = f64::NAN;
    assert!(cfg.validate().is_err());

    cfg.recorder.interval_secs = 0.5;
    cfg.recorder.prefix = "  ".to_string();
    assert!(cfg.validate().is_err());

    clear_env();
}

#[test]
fn rejects_non_numeric_interval_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FRAMEGRAB_INTERVAL_SECS", "soon");
    let result = GrabConfig::load();
    clear_env();
    assert!(result.is_err());
}
