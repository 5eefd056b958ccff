use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use depth_ranger::config::RangerConfig;
use depth_ranger::ExecutionDevice;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "DEPTH_RANGER_CONFIG",
        "DEPTH_RANGER_SOURCE",
        "DEPTH_RANGER_CALIBRATION",
        "DEPTH_RANGER_MODEL",
        "DEPTH_RANGER_BACKEND",
        "DEPTH_RANGER_BASELINE",
        "DEPTH_RANGER_DECISION_PERIOD",
        "DEPTH_RANGER_SNAPSHOT_DIR",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "source": {
            "uri": "/dev/video2",
            "target_fps": 15,
            "width": 800,
            "height": 600
        },
        "calibration_path": "/etc/depth-ranger/camera.txt",
        "backend": {
            "name": "tract",
            "model_path": "/opt/models/midas_small.onnx",
            "device": "cpu",
            "input_size": 384
        },
        "baseline_m": 0.02,
        "grid_size": 4,
        "clamp": { "enabled": true, "max_m": 12.5 },
        "proximity": { "clearance_m": 0.75 },
        "snapshot": { "dir": "/tmp/snapshots", "every": 10 }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var("DEPTH_RANGER_CONFIG", file.path());
    std::env::set_var("DEPTH_RANGER_SOURCE", "stub://bench");
    std::env::set_var("DEPTH_RANGER_DECISION_PERIOD", "3");

    let cfg = RangerConfig::load().expect("load config");

    assert_eq!(cfg.source.uri, "stub://bench");
    assert_eq!(cfg.source.target_fps, 15);
    assert_eq!((cfg.source.width, cfg.source.height), (800, 600));
    assert_eq!(
        cfg.calibration_path.as_deref(),
        Some(std::path::Path::new("/etc/depth-ranger/camera.txt"))
    );
    assert_eq!(cfg.backend.name, "tract");
    assert_eq!(cfg.backend.device, ExecutionDevice::Cpu);
    assert_eq!(cfg.backend.input_size, 384);
    assert_eq!(cfg.decision_period, 3);
    assert_eq!(cfg.clearance_m, 0.75);

    let settings = cfg.pipeline_settings();
    assert_eq!(settings.baseline_m, 0.02);
    assert_eq!(settings.grid_size, 4);
    assert_eq!(settings.max_distance_m, Some(12.5));

    let snapshot = cfg.snapshot.expect("snapshot settings");
    assert_eq!(snapshot.every, 10);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
baseline_m = 0.05
decision_period = 10

[source]
uri = "stub://yard"
max_frames = 50

[backend]
device = "auto"
"#;
    file.write_all(toml.as_bytes()).expect("write config");
    std::env::set_var("DEPTH_RANGER_CONFIG", file.path());
    std::env::set_var("DEPTH_RANGER_BASELINE", "0.03");

    let cfg = RangerConfig::load().expect("load config");
    assert_eq!(cfg.baseline_m, 0.03);
    assert_eq!(cfg.decision_period, 10);
    assert_eq!(cfg.source.uri, "stub://yard");
    assert_eq!(cfg.source.max_frames, Some(50));
    assert_eq!(cfg.backend.name, "stub");
    assert_eq!(cfg.pipeline_settings().max_distance_m, None);

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DEPTH_RANGER_DECISION_PERIOD", "0");
    assert!(RangerConfig::load().is_err());
    clear_env();

    std::env::set_var("DEPTH_RANGER_BASELINE", "wide");
    assert!(RangerConfig::load().is_err());
    clear_env();

    std::env::set_var("DEPTH_RANGER_BACKEND", "opencv");
    assert!(RangerConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "grid_size": "three" }"#).expect("write config");
    std::env::set_var("DEPTH_RANGER_CONFIG", file.path());
    assert!(RangerConfig::load().is_err());

    clear_env();
}

#[test]
fn missing_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("DEPTH_RANGER_CONFIG", "/nonexistent/depth-ranger.json");
    let err = RangerConfig::load().unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));

    clear_env();
}
