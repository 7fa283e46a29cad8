// SPDX-License-Identifier: GPL-3.0-only

//! A software pipeline that produces test-pattern frames
//!
//! It plays the role of the ISP for demos and tests: it asks the controller
//! for prepared empty buffers, paints a moving gradient into them and hands
//! them back as full buffers.

use super::frame_loop::{FrameLoopBuilder, FrameLoopController, LoopAction};
use super::{IspPipeline, PipelineEvent, PipelineHandle};
use crate::buffers::MediaBuffer;
use crate::constants::{EMPTY_BUFFER_RETRY_DELAY, SYNC_POINT_INTERVAL};
use crate::errors::{DispatchError, DispatchResult};
use crate::paths::{OutputPath, PathController};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// How a synthetic run produces frames
#[derive(Debug, Clone)]
pub struct SyntheticOptions {
    /// Frames to produce per path; `None` runs until stopped
    pub frames: Option<u64>,
    /// Target frame rate; 0 runs as fast as buffers come back
    pub fps: f64,
    /// Paths that receive a buffer for every frame
    pub paths: Vec<OutputPath>,
}

impl Default for SyntheticOptions {
    fn default() -> Self {
        Self {
            frames: None,
            fps: 30.0,
            paths: OutputPath::ALL.to_vec(),
        }
    }
}

pub struct SyntheticPipeline {
    name: String,
    alive: AtomicBool,
    frames: AtomicU64,
}

impl SyntheticPipeline {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            alive: AtomicBool::new(true),
            frames: AtomicU64::new(0),
        })
    }

    pub fn handle(self: &Arc<Self>) -> PipelineHandle {
        PipelineHandle::from_arc(Arc::clone(self) as Arc<dyn IspPipeline>)
    }

    /// Mark the pipeline dead; controllers built afterwards reject it
    pub fn power_down(&self) {
        self.alive.store(false, Ordering::Release);
    }

    /// Frames completed on every requested path
    pub fn frames_produced(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Start producing frames for `controller` on a frame loop thread
    ///
    /// The loop ends after the requested number of frames, when the
    /// controller leaves the running state, or when the returned loop is
    /// stopped.
    pub fn run(
        self: &Arc<Self>,
        controller: Arc<PathController>,
        options: SyntheticOptions,
    ) -> DispatchResult<FrameLoopController> {
        if options.paths.is_empty() {
            return Err(DispatchError::InvalidParameter(
                "synthetic run needs at least one path".into(),
            ));
        }
        if let Some(path) = options
            .paths
            .iter()
            .find(|path| controller.pool(**path).is_none())
        {
            return Err(DispatchError::InvalidParameter(format!(
                "{} path has no buffer pool",
                path
            )));
        }

        info!(
            pipeline = %self.name,
            frames = ?options.frames,
            fps = options.fps,
            paths = ?options.paths,
            "Starting synthetic pipeline"
        );

        let pipeline = Arc::clone(self);
        let mut sequence = 0u64;
        FrameLoopBuilder::new(&format!("{}-frames", self.name))
            .fps(options.fps)
            .start(move |stop| {
                if options.frames.is_some_and(|frames| sequence >= frames) {
                    return LoopAction::Stop;
                }
                let last = options.frames.is_some_and(|frames| sequence + 1 == frames);

                for &path in &options.paths {
                    let Some(buffer) = next_empty_buffer(&controller, path, stop) else {
                        return LoopAction::Stop;
                    };
                    if let Err(e) = paint(&buffer, sequence, last) {
                        warn!(%path, error = %e, "Failed to fill synthetic frame");
                    }
                    if let Err(e) =
                        controller.handle_pipeline_event(PipelineEvent::BufferFull { path, buffer })
                    {
                        debug!(%path, sequence, error = %e, "Synthetic frame not delivered");
                    }
                }

                sequence += 1;
                pipeline.frames.fetch_add(1, Ordering::Relaxed);
                LoopAction::Continue
            })
    }
}

impl IspPipeline for SyntheticPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Wait for a prepared buffer; `None` once the loop should end
fn next_empty_buffer(
    controller: &PathController,
    path: OutputPath,
    stop: &AtomicBool,
) -> Option<MediaBuffer> {
    loop {
        if stop.load(Ordering::SeqCst) {
            return None;
        }
        match controller.request_empty_buffer(path) {
            Ok(buffer) => return Some(buffer),
            Err(DispatchError::NotAvailable) => std::thread::sleep(EMPTY_BUFFER_RETRY_DELAY),
            Err(e) => {
                debug!(%path, error = %e, "Controller stopped handing out buffers");
                return None;
            }
        }
    }
}

fn paint(buffer: &MediaBuffer, sequence: u64, last: bool) -> DispatchResult<()> {
    let format = buffer.metadata()?.format;
    let width = usize::try_from(format.width).unwrap_or(1).max(1);
    buffer.with_payload_mut(|payload| {
        for (offset, byte) in payload.iter_mut().enumerate() {
            let x = (offset % width) as u64;
            let y = (offset / width) as u64;
            *byte = (x + y + sequence) as u8;
        }
    })?;
    buffer.update_metadata(|metadata| metadata.sequence = sequence)?;
    buffer.set_sync_point(sequence % SYNC_POINT_INTERVAL == 0)?;
    buffer.set_last(last)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{MediaBufferPool, PictureFormat, PictureKind, PictureLayout, PoolConfig};

    #[test]
    fn test_paint_sets_flags_and_sequence() {
        let format = PictureFormat::new(PictureKind::Raw8, PictureLayout::Interleaved, 4, 2);
        let pool = MediaBufferPool::new(PoolConfig::new(1, format)).unwrap();
        let buffer = pool.acquire().unwrap();

        paint(&buffer, SYNC_POINT_INTERVAL, true).unwrap();
        assert!(buffer.is_sync_point());
        assert!(buffer.is_last());
        assert_eq!(buffer.metadata().unwrap().sequence, SYNC_POINT_INTERVAL);

        let expected_first = SYNC_POINT_INTERVAL as u8;
        buffer
            .with_payload(|payload| {
                assert_eq!(payload.len(), 8);
                assert_eq!(payload[0], expected_first);
                assert_eq!(payload[5], expected_first.wrapping_add(2));
            })
            .unwrap();
    }

    #[test]
    fn test_power_down_marks_dead() {
        let pipeline = SyntheticPipeline::new("synthetic");
        let handle = pipeline.handle();
        assert!(handle.is_alive());
        pipeline.power_down();
        assert!(!handle.is_alive());
        assert_eq!(handle.name(), "synthetic");
    }
}
