// SPDX-License-Identifier: GPL-3.0-only

//! Per-path dispatch counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a path's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PathStats {
    /// Buffers fanned out to consumers
    pub dispatched: u64,
    /// Buffers given up without dispatching (queue full, not running, dropped by the pipeline)
    pub dropped: u64,
    /// Unfilled buffers handed back by the pipeline
    pub flushed: u64,
    /// Buffer callback invocations
    pub callbacks: u64,
    /// References pushed into consumer queues
    pub queue_pushes: u64,
}

#[derive(Default)]
pub(crate) struct PathCounters {
    dispatched: AtomicU64,
    dropped: AtomicU64,
    flushed: AtomicU64,
    callbacks: AtomicU64,
    queue_pushes: AtomicU64,
}

impl PathCounters {
    pub(crate) fn dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flushed(&self) {
        self.flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn callback(&self) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn queue_push(&self) {
        self.queue_pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PathStats {
        PathStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            flushed: self.flushed.load(Ordering::Relaxed),
            callbacks: self.callbacks.load(Ordering::Relaxed),
            queue_pushes: self.queue_pushes.load(Ordering::Relaxed),
        }
    }
}
