// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for frame-producing loops
//!
//! A frame loop runs a closure on a dedicated thread until the closure asks
//! to stop or the owner raises the stop flag. Loops can be paced to a fixed
//! frame interval.

use crate::errors::{DispatchError, DispatchResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest single sleep while pacing, so a stop request is seen promptly
const PACING_SLICE: Duration = Duration::from_millis(10);

/// Action returned by the loop closure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Run another iteration
    Continue,
    /// Leave the loop
    Stop,
}

/// A frame loop running on its own thread
///
/// ```ignore
/// let mut frames = FrameLoopBuilder::new("synthetic").fps(30.0).start(move |stop| {
///     produce_frame(stop);
///     LoopAction::Continue
/// })?;
///
/// frames.stop();
/// ```
pub struct FrameLoopController {
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl FrameLoopController {
    /// Spawn the loop thread
    ///
    /// `loop_fn` receives the stop flag so long-running iterations can bail
    /// out early. With an `interval`, iterations start at most once per
    /// interval.
    pub fn start<F>(name: &str, interval: Option<Duration>, mut loop_fn: F) -> DispatchResult<Self>
    where
        F: FnMut(&AtomicBool) -> LoopAction + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&stop_signal);
        let thread_name = name.to_string();

        info!(name = %name, ?interval, "Starting frame loop");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                debug!(name = %thread_name, "Frame loop thread started");
                let mut deadline = Instant::now();

                loop {
                    if stop.load(Ordering::SeqCst) {
                        debug!(name = %thread_name, "Stop signal received");
                        break;
                    }

                    if loop_fn(&stop) == LoopAction::Stop {
                        debug!(name = %thread_name, "Loop requested stop");
                        break;
                    }

                    if let Some(interval) = interval {
                        deadline += interval;
                        pace_until(&stop, deadline);
                    }
                }

                info!(name = %thread_name, "Frame loop thread exiting");
            })
            .map_err(|e| {
                DispatchError::OutOfMemory(format!("failed to spawn frame loop '{}': {}", name, e))
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            name: name.to_string(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Raise the stop flag without waiting
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting frame loop stop");
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Raise the stop flag and wait for the thread
    pub fn stop(&mut self) {
        self.request_stop();
        self.join();
    }

    /// Wait for the loop to end on its own
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!(name = %self.name, "Frame loop thread panicked: {:?}", e);
            } else {
                debug!(name = %self.name, "Frame loop thread finished");
            }
        }
    }
}

impl Drop for FrameLoopController {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "FrameLoopController dropped, stopping loop");
            self.stop();
        }
    }
}

fn pace_until(stop: &AtomicBool, deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline || stop.load(Ordering::SeqCst) {
            return;
        }
        thread::sleep((deadline - now).min(PACING_SLICE));
    }
}

/// Builder for frame loops
pub struct FrameLoopBuilder {
    name: String,
    interval: Option<Duration>,
}

impl FrameLoopBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            interval: None,
        }
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = (!interval.is_zero()).then_some(interval);
        self
    }

    /// Pace to a frame rate; non-positive rates run unpaced
    pub fn fps(self, fps: f64) -> Self {
        if fps.is_finite() && fps > 0.0 {
            self.interval(Duration::from_secs_f64(1.0 / fps))
        } else {
            Self {
                interval: None,
                ..self
            }
        }
    }

    pub fn start<F>(self, loop_fn: F) -> DispatchResult<FrameLoopController>
    where
        F: FnMut(&AtomicBool) -> LoopAction + Send + 'static,
    {
        FrameLoopController::start(&self.name, self.interval, loop_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_loop_stops_itself() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frames = FrameLoopBuilder::new("test-loop")
            .start(move |_| {
                let count = counter_clone.fetch_add(1, Ordering::SeqCst);
                if count >= 10 {
                    LoopAction::Stop
                } else {
                    LoopAction::Continue
                }
            })
            .unwrap();

        frames.join();
        assert_eq!(counter.load(Ordering::SeqCst), 11);
        assert!(!frames.is_running());
    }

    #[test]
    fn test_stop_signal_ends_loop() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frames = FrameLoopBuilder::new("test-stop")
            .interval(Duration::from_millis(5))
            .start(move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        thread::sleep(Duration::from_millis(50));
        frames.stop();
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_pacing_limits_rate() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let mut frames = FrameLoopBuilder::new("test-paced")
            .fps(20.0)
            .start(move |_| {
                counter_clone.fetch_add(1, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        thread::sleep(Duration::from_millis(120));
        frames.stop();
        // 50 ms per frame: a handful of iterations, never hundreds
        let count = counter.load(Ordering::SeqCst);
        assert!((1..=6).contains(&count), "unexpected iteration count {}", count);
    }

    #[test]
    fn test_closure_sees_stop_flag() {
        let saw_stop = Arc::new(AtomicBool::new(false));
        let saw_stop_clone = Arc::clone(&saw_stop);

        let frames = FrameLoopBuilder::new("test-flag")
            .start(move |stop| {
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(1));
                }
                saw_stop_clone.store(true, Ordering::SeqCst);
                LoopAction::Continue
            })
            .unwrap();

        assert!(frames.is_running());
        drop(frames);
        assert!(saw_stop.load(Ordering::SeqCst));
    }

    #[test]
    fn test_invalid_fps_runs_unpaced() {
        let builder = FrameLoopBuilder::new("x").fps(0.0);
        assert!(builder.interval.is_none());
        let builder = FrameLoopBuilder::new("x").fps(f64::NAN);
        assert!(builder.interval.is_none());
    }
}
