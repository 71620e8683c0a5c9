use super::*;

#[test]
fn empty_object_is_default() {
    let cfg = DeviceConfig::from_json_str("{}").unwrap();
    assert_eq!(cfg, DeviceConfig::default());
    assert_eq!(cfg.mode, ExecutionMode::Local);
    assert!(cfg.parallel);
}

#[test]
fn parses_interleaved_mode() {
    let cfg = DeviceConfig::from_json_str(
        r#"{"mode": {"kind": "interleaved", "device_id": 2, "num_devices": 3}, "threads": 4}"#,
    )
    .unwrap();
    assert_eq!(
        cfg.mode,
        ExecutionMode::Interleaved {
            device_id: 2,
            num_devices: 3
        }
    );
    assert_eq!(cfg.threads, Some(4));
}

#[test]
fn round_trips_through_json() {
    let cfg = DeviceConfig {
        mode: ExecutionMode::Interleaved {
            device_id: 0,
            num_devices: 2,
        },
        parallel: false,
        threads: None,
    };
    let text = serde_json::to_string(&cfg).unwrap();
    assert!(text.contains(r#""kind":"interleaved""#));
    assert_eq!(DeviceConfig::from_json_str(&text).unwrap(), cfg);
}

#[test]
fn rejects_invalid_values() {
    for bad in [
        r#"{"mode": {"kind": "interleaved", "device_id": 3, "num_devices": 3}}"#,
        r#"{"mode": {"kind": "interleaved", "device_id": 0, "num_devices": 0}}"#,
        r#"{"threads": 0}"#,
    ] {
        assert!(
            matches!(
                DeviceConfig::from_json_str(bad),
                Err(RaytileError::Validation(_))
            ),
            "{bad}"
        );
    }
    assert!(matches!(
        DeviceConfig::from_json_str(r#"{"mode": {"kind": "cluster"}}"#),
        Err(RaytileError::Serde(_))
    ));
    assert!(matches!(
        DeviceConfig::from_json_str(r#"{"workers": 2}"#),
        Err(RaytileError::Serde(_))
    ));
}

#[test]
fn missing_file_is_io_error() {
    let path = std::env::temp_dir().join("raytile_config_does_not_exist.json");
    assert!(matches!(
        DeviceConfig::from_json_file(&path),
        Err(RaytileError::Io(_))
    ));
}
