// SPDX-License-Identifier: MPL-2.0

//! Camera paths - buffer distribution for an image-signal-processing pipeline
//!
//! This library takes the buffers an ISP pipeline fills and distributes them
//! to downstream consumers along two independent output paths.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`buffers`]: Reference-counted media buffers and their fixed-capacity pools
//! - [`paths`]: The path controller, its command worker and consumer queues
//! - [`pipeline`]: The pipeline boundary, frame loops and a synthetic pipeline
//! - [`config`]: Pool and controller configuration
//!
//! # Example
//!
//! ```ignore
//! let pool = MediaBufferPool::new(PoolConfig::default())?;
//! let controller = PathController::new(
//!     PathControllerConfig::default()
//!         .with_pool(OutputPath::Main, pool)
//!         .with_completion(completion_callback(|done| println!("{:?}", done)))
//!         .with_pipeline(pipeline.handle()),
//! )?;
//! controller.start()?.wait()?;
//! ```

pub mod buffers;
pub mod config;
pub mod constants;
pub mod errors;
pub mod paths;
pub mod pipeline;

// Re-export commonly used types
pub use buffers::{LockedBuffer, MediaBuffer, MediaBufferPool, PoolConfig, PoolEvent};
pub use config::Config;
pub use errors::{DispatchError, DispatchResult};
pub use paths::{
    ControllerState, OutputPath, PathController, PathControllerConfig, buffer_callback,
    completion_callback,
};
pub use pipeline::{IspPipeline, PipelineEvent, PipelineHandle};
