// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use camera_paths::Config;
use camera_paths::errors::{ConfigError, DispatchError};
use camera_paths::paths::OutputPath;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(config.validate().is_ok(), "Default config should be valid");
    assert!(
        config.main_pool.is_some() && config.self_pool.is_some(),
        "Both paths should have a pool by default"
    );
    assert_eq!(config.controller.max_pending_commands, 8);
}

#[test]
fn test_config_json_roundtrip() {
    let config = Config::default();
    let json = config.to_json().unwrap();
    let parsed = Config::from_json(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_missing_fields_use_defaults() {
    let config = Config::from_json(r#"{ "controller": { "max_pending_commands": 3 } }"#).unwrap();

    assert_eq!(config.controller.max_pending_commands, 3);
    assert_eq!(
        config.controller.num_buffers_main,
        Config::default().controller.num_buffers_main
    );
    assert_eq!(config.main_pool, Config::default().main_pool);
}

#[test]
fn test_null_pool_disables_path() {
    let config = Config::from_json(r#"{ "self_pool": null }"#).unwrap();
    assert!(config.pool(OutputPath::SelfPath).is_none());
    assert!(config.pool(OutputPath::Main).is_some());
}

#[test]
fn test_no_pool_rejected() {
    let result = Config::from_json(r#"{ "main_pool": null, "self_pool": null }"#);
    assert!(matches!(
        result,
        Err(ConfigError::Invalid(DispatchError::InvalidParameter(_)))
    ));
}

#[test]
fn test_zero_pending_commands_rejected() {
    let result = Config::from_json(r#"{ "controller": { "max_pending_commands": 0 } }"#);
    assert!(matches!(
        result,
        Err(ConfigError::Invalid(DispatchError::OutOfRange(_)))
    ));
}

#[test]
fn test_more_buffers_than_capacity_rejected() {
    let result = Config::from_json(
        r#"{ "controller": { "num_buffers_main": 10 }, "main_pool": { "capacity": 4 } }"#,
    );
    assert!(matches!(
        result,
        Err(ConfigError::Invalid(DispatchError::OutOfRange(_)))
    ));
}

#[test]
fn test_malformed_json() {
    assert!(matches!(
        Config::from_json("{ not json"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_load_missing_file() {
    let path = std::env::temp_dir().join("camera-paths-does-not-exist.json");
    assert!(matches!(Config::load(&path), Err(ConfigError::Io(_))));
}

#[test]
fn test_save_and_load() {
    let path = std::env::temp_dir().join(format!("camera-paths-config-{}.json", std::process::id()));
    let mut config = Config::default();
    config.controller.num_buffers_self = 2;

    config.save(&path).unwrap();
    let loaded = Config::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded, config);
}
