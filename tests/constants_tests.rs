// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use camera_paths::buffers::PoolConfig;
use camera_paths::constants::{
    DEFAULT_BUFFERS_PER_PATH, DEFAULT_MAX_PENDING_COMMANDS, DEFAULT_POOL_CAPACITY,
    MAX_POOL_LISTENERS, SYNC_POINT_INTERVAL, app_version,
};

#[test]
fn test_default_supply_fits_default_pool() {
    // The controller must be able to prepare its buffers from a default pool
    assert!(DEFAULT_BUFFERS_PER_PATH <= DEFAULT_POOL_CAPACITY);
    assert_eq!(PoolConfig::default().capacity, DEFAULT_POOL_CAPACITY);
}

#[test]
fn test_limits_positive() {
    assert!(DEFAULT_MAX_PENDING_COMMANDS > 0);
    assert!(MAX_POOL_LISTENERS > 0);
    assert!(SYNC_POINT_INTERVAL > 0);
}

#[test]
fn test_app_version_set() {
    assert!(!app_version().is_empty(), "Version should be stamped by build.rs");
}
