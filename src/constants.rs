// SPDX-License-Identifier: GPL-3.0-only

//! Crate-wide constants

use std::time::Duration;

/// Default depth of a controller's command queue
pub const DEFAULT_MAX_PENDING_COMMANDS: usize = 8;

/// Default number of buffers per pool
pub const DEFAULT_POOL_CAPACITY: usize = 6;

/// Default number of buffers a path prepares for the pipeline on start
pub const DEFAULT_BUFFERS_PER_PATH: usize = 4;

/// Maximum number of listeners a single pool accepts
pub const MAX_POOL_LISTENERS: usize = 8;

/// Default picture size used when no configuration is given
pub const DEFAULT_PICTURE_WIDTH: u32 = 640;
pub const DEFAULT_PICTURE_HEIGHT: u32 = 480;

/// Interval between sync-point buffers emitted by the synthetic pipeline
pub const SYNC_POINT_INTERVAL: u64 = 30;

/// How long the synthetic pipeline backs off when no empty buffer is ready
pub const EMPTY_BUFFER_RETRY_DELAY: Duration = Duration::from_millis(2);

/// Application version from git (set by build.rs)
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
