// SPDX-License-Identifier: GPL-3.0-only

//! The image pipeline as seen from the path controller
//!
//! The controller never drives hardware. It only needs to know that the
//! pipeline it serves exists and is alive, and it receives the pipeline's
//! buffer notifications as [`PipelineEvent`]s.

pub mod frame_loop;
pub mod synthetic;

pub use frame_loop::{FrameLoopBuilder, FrameLoopController, LoopAction};
pub use synthetic::{SyntheticOptions, SyntheticPipeline};

use crate::buffers::MediaBuffer;
use crate::paths::OutputPath;
use std::sync::Arc;

/// An image pipeline that produces buffers for a path controller
pub trait IspPipeline: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether the pipeline can still produce frames
    fn is_alive(&self) -> bool {
        true
    }
}

/// Shared handle to an [`IspPipeline`]
///
/// The controller keeps the handle for its whole lifetime but never owns
/// the pipeline's resources.
#[derive(Clone)]
pub struct PipelineHandle(Arc<dyn IspPipeline>);

impl PipelineHandle {
    pub fn new<P: IspPipeline + 'static>(pipeline: P) -> Self {
        Self(Arc::new(pipeline))
    }

    pub fn from_arc(pipeline: Arc<dyn IspPipeline>) -> Self {
        Self(pipeline)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("name", &self.name())
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Buffer notifications from the pipeline
///
/// Events that carry a buffer hand the pipeline's reference on it to the
/// controller.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// The buffer was filled with a picture
    BufferFull { path: OutputPath, buffer: MediaBuffer },
    /// The buffer is returned unfilled (pipeline flush)
    BufferFlushed { path: OutputPath, buffer: MediaBuffer },
    /// A frame was lost before it reached a buffer
    BufferDropped { path: OutputPath },
}

impl PipelineEvent {
    pub fn path(&self) -> OutputPath {
        match self {
            PipelineEvent::BufferFull { path, .. }
            | PipelineEvent::BufferFlushed { path, .. }
            | PipelineEvent::BufferDropped { path } => *path,
        }
    }
}
