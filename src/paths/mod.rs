// SPDX-License-Identifier: GPL-3.0-only

//! Output paths and the controller that distributes buffers along them
//!
//! # Architecture
//!
//! ```text
//!  API callers                       ┌───────────────────────────────┐
//!  start/stop ──► validate ──► queue ─►  worker thread                 │
//!  attach/detach, register ─┐        │   applies commands in order     │
//!                           │        │   owns every state change       │
//!  pipeline                 ▼        │   dispatches full buffers:      │
//!  deliver(path, buffer) ─► queue ──►│     queues ◄── retained lock    │
//!                                    │     callback ◄── locked buffer  │
//!                                    └───────────────────────────────┘
//! ```
//!
//! Each path (Main, Self) keeps its own consumer list, callback slot and
//! locks, so configuring one path never contends with the other.

pub mod command;
pub mod controller;
pub mod state;
pub mod stats;
mod worker;

pub use command::{
    CommandKind, Completion, CompletionCallback, Pending, completion_callback,
};
pub use controller::{BufferCallback, PathController, PathControllerConfig, buffer_callback};
pub use state::ControllerState;
pub use stats::PathStats;

use crate::buffers::LockedBuffer;
use crate::errors::DispatchError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One of the two independent output routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputPath {
    /// Full-resolution main path
    Main,
    /// Secondary (typically downscaled) self path
    #[serde(rename = "self")]
    SelfPath,
}

impl OutputPath {
    pub const ALL: [OutputPath; 2] = [OutputPath::Main, OutputPath::SelfPath];

    pub(crate) fn slot(self) -> usize {
        match self {
            OutputPath::Main => 0,
            OutputPath::SelfPath => 1,
        }
    }
}

/// Raw path identifiers as used by pipeline drivers: 1 = main, 2 = self
impl TryFrom<u32> for OutputPath {
    type Error = DispatchError;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(OutputPath::Main),
            2 => Ok(OutputPath::SelfPath),
            other => Err(DispatchError::InvalidParameter(format!(
                "unknown path id {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for OutputPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputPath::Main => write!(f, "main"),
            OutputPath::SelfPath => write!(f, "self"),
        }
    }
}

impl std::str::FromStr for OutputPath {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "main" | "mp" => Ok(OutputPath::Main),
            "self" | "sp" => Ok(OutputPath::SelfPath),
            other => Err(DispatchError::InvalidParameter(format!(
                "unknown path '{}'",
                other
            ))),
        }
    }
}

/// A sink that is notified of every buffer dispatched on a path
///
/// The queue receives its own reference on the buffer; the buffer stays out
/// of its pool until that guard is dropped.
pub trait ConsumerQueue: Send + Sync {
    fn push(&self, buffer: LockedBuffer);
}

impl ConsumerQueue for tokio::sync::mpsc::Sender<LockedBuffer> {
    fn push(&self, buffer: LockedBuffer) {
        // A rejected buffer is dropped here, which releases its lock
        if let Err(e) = self.try_send(buffer) {
            debug!(error = %e, "Consumer queue rejected buffer");
        }
    }
}

impl ConsumerQueue for std::sync::mpsc::SyncSender<LockedBuffer> {
    fn push(&self, buffer: LockedBuffer) {
        if let Err(e) = self.try_send(buffer) {
            debug!(error = %e, "Consumer queue rejected buffer");
        }
    }
}
