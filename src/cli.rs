// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running a synthetic pipeline through a path controller
//! - Printing the default configuration

use camera_paths::buffers::{LockedBuffer, MediaBufferPool};
use camera_paths::config::Config;
use camera_paths::paths::{
    ConsumerQueue, OutputPath, PathController, PathControllerConfig, PathStats, buffer_callback,
    completion_callback,
};
use camera_paths::pipeline::{SyntheticOptions, SyntheticPipeline};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::time::Instant;

/// Depth of the demo consumer queue on the main path
const CONSUMER_QUEUE_DEPTH: usize = 2;

#[derive(Serialize)]
struct PathReport {
    path: OutputPath,
    stats: PathStats,
    consumed: u64,
    free_after: usize,
    capacity: usize,
}

#[derive(Serialize)]
struct SimulationReport {
    frames: u64,
    elapsed_ms: u128,
    paths: Vec<PathReport>,
}

/// Run a synthetic pipeline against a freshly built controller
pub fn simulate(
    config_path: Option<PathBuf>,
    frames: u64,
    fps: f64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let mut settings = PathControllerConfig::from_settings(&config.controller);
    let mut paths = Vec::new();
    for path in OutputPath::ALL {
        if let Some(pool_config) = config.pool(path) {
            settings = settings.with_pool(path, MediaBufferPool::new(pool_config.clone())?);
            paths.push(path);
        }
    }

    let pipeline = SyntheticPipeline::new("synthetic");
    let controller = Arc::new(PathController::new(
        settings
            .with_pipeline(pipeline.handle())
            .with_completion(completion_callback(|done| {
                tracing::info!(command = %done.command, result = ?done.result, "Command completed");
            })),
    )?);

    // Main path: a consumer thread standing in for an encoder
    let (tx, rx) = mpsc::sync_channel::<LockedBuffer>(CONSUMER_QUEUE_DEPTH);
    let main_queue: Arc<dyn ConsumerQueue> = Arc::new(tx);
    let main_consumed = Arc::new(AtomicU64::new(0));
    let consumer = {
        let consumed = Arc::clone(&main_consumed);
        std::thread::Builder::new()
            .name("main-consumer".into())
            .spawn(move || {
                for buffer in rx {
                    consumed.fetch_add(1, Ordering::Relaxed);
                    drop(buffer);
                }
            })?
    };
    if controller.pool(OutputPath::Main).is_some() {
        controller.attach_queue(OutputPath::Main, Arc::clone(&main_queue))?;
    }

    // Self path: a callback standing in for a preview
    let self_consumed = Arc::new(AtomicU64::new(0));
    {
        let consumed = Arc::clone(&self_consumed);
        controller.register_buffer_callback(
            OutputPath::SelfPath,
            Some(buffer_callback(move |_, _| {
                consumed.fetch_add(1, Ordering::Relaxed);
            })),
        )?;
    }

    let started = Instant::now();
    controller.start()?.wait()?;

    let mut frame_loop = pipeline.run(
        Arc::clone(&controller),
        SyntheticOptions {
            frames: Some(frames),
            fps,
            paths: paths.clone(),
        },
    )?;
    frame_loop.join();

    controller.stop()?.wait()?;
    let elapsed = started.elapsed();

    controller.detach_queue(OutputPath::Main, &main_queue)?;
    drop(main_queue);
    if consumer.join().is_err() {
        return Err("main consumer thread panicked".into());
    }

    let report = SimulationReport {
        frames: pipeline.frames_produced(),
        elapsed_ms: elapsed.as_millis(),
        paths: paths
            .iter()
            .filter_map(|&path| {
                let pool = controller.pool(path)?;
                Some(PathReport {
                    path,
                    stats: controller.stats(path),
                    consumed: match path {
                        OutputPath::Main => main_consumed.load(Ordering::Relaxed),
                        OutputPath::SelfPath => self_consumed.load(Ordering::Relaxed),
                    },
                    free_after: pool.free_count(),
                    capacity: pool.capacity(),
                })
            })
            .collect(),
    };

    controller.shutdown()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SimulationReport) {
    println!(
        "Produced {} frames in {} ms",
        report.frames, report.elapsed_ms
    );
    println!();
    for path in &report.paths {
        println!("  [{}]", path.path);
        println!("      Dispatched:   {}", path.stats.dispatched);
        println!("      Consumed:     {}", path.consumed);
        println!("      Dropped:      {}", path.stats.dropped);
        println!("      Queue pushes: {}", path.stats.queue_pushes);
        println!("      Callbacks:    {}", path.stats.callbacks);
        println!("      Pool:         {}/{} free", path.free_after, path.capacity);
        println!();
    }
}

/// Print the default configuration
pub fn print_default_config() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", Config::default().to_json()?);
    Ok(())
}
