use std::sync::Mutex;

use tempfile::NamedTempFile;

use lotwatch::DemoConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LOTWATCH_CONFIG",
        "LOTWATCH_VIDEO",
        "LOTWATCH_MODEL",
        "LOTWATCH_LABELS",
        "LOTWATCH_ADDR",
        "LOTWATCH_CONF_THRESHOLD",
        "LOTWATCH_IOU_THRESHOLD",
        "LOTWATCH_JPEG_QUALITY",
        "LOTWATCH_BIT_RATE",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn defaults_apply_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DemoConfig::load().expect("load config");

    assert_eq!(cfg.video_path, "parking.mp4");
    assert_eq!(cfg.model_path, "best.onnx");
    assert_eq!(cfg.labels, vec!["empty", "occupied"]);
    assert_eq!(cfg.confidence_threshold, 0.25);
    assert_eq!(cfg.iou_threshold, 0.45);
    assert_eq!(cfg.listen_addr, "127.0.0.1:8750");
    assert_eq!(cfg.jpeg_quality, 80);
    assert_eq!(cfg.bit_rate, 4_000_000);
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "video_path": "lot_cam.mp4",
        "model_path": "weights/lot.onnx",
        "labels": ["free", "occupied", "reserved"],
        "detection": {
            "confidence_threshold": 0.3,
            "iou_threshold": 0.5
        },
        "server": {
            "addr": "0.0.0.0:9100"
        },
        "output": {
            "jpeg_quality": 60,
            "bit_rate": 2000000
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("LOTWATCH_CONFIG", file.path());
    std::env::set_var("LOTWATCH_LABELS", "empty, occupied");
    std::env::set_var("LOTWATCH_CONF_THRESHOLD", "0.4");

    let cfg = DemoConfig::load().expect("load config");

    assert_eq!(cfg.video_path, "lot_cam.mp4");
    assert_eq!(cfg.model_path, "weights/lot.onnx");
    assert_eq!(cfg.labels, vec!["empty", "occupied"]);
    assert_eq!(cfg.confidence_threshold, 0.4);
    assert_eq!(cfg.iou_threshold, 0.5);
    assert_eq!(cfg.listen_addr, "0.0.0.0:9100");
    assert_eq!(cfg.jpeg_quality, 60);
    assert_eq!(cfg.bit_rate, 2_000_000);

    clear_env();
}

#[test]
fn out_of_range_threshold_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LOTWATCH_CONF_THRESHOLD", "1.5");
    let result = DemoConfig::load();
    clear_env();

    assert!(result.is_err());
}

#[test]
fn malformed_numeric_override_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("LOTWATCH_JPEG_QUALITY", "high");
    let result = DemoConfig::load();
    clear_env();

    assert!(result.is_err());
}
