// SPDX-License-Identifier: GPL-3.0-only

//! Fixed-capacity pool of reference-counted media buffers
//!
//! The pool owns every buffer for its whole lifetime. Buffers are handed out
//! by [`MediaBufferPool::acquire`] and come back only when their reference
//! count drops to zero through [`MediaBuffer::unlock`].
//!
//! ```text
//!            acquire()                 lock()/unlock()
//!  ┌──────┐  count := 1   ┌─────────┐  count ± 1      ┌─────────┐
//!  │ free │──────────────►│ in use  │◄───────────────►│ in use  │
//!  └──────┘               └────┬────┘                 └─────────┘
//!      ▲                       │ last unlock: count == 0
//!      └───────────────────────┘ reclaim (pool lock, generation + 1)
//! ```
//!
//! Each slot keeps its reference count and a generation in one atomic word.
//! Lock and unlock are a single compare-and-swap on that word; only the
//! return to the free list takes the pool lock.

use super::media_buffer::MediaBuffer;
use super::types::{BufferMetadata, PictureFormat};
use crate::constants::{DEFAULT_POOL_CAPACITY, MAX_POOL_LISTENERS};
use crate::errors::{DispatchError, DispatchResult};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, trace, warn};

const COUNT_BITS: u32 = 32;
const COUNT_MASK: u64 = (1 << COUNT_BITS) - 1;

fn pack(generation: u32, count: u32) -> u64 {
    ((generation as u64) << COUNT_BITS) | count as u64
}

fn generation_of(word: u64) -> u32 {
    (word >> COUNT_BITS) as u32
}

fn count_of(word: u64) -> u32 {
    (word & COUNT_MASK) as u32
}

/// Lock a mutex, recovering the data if a holder panicked
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of buffers in the pool
    pub capacity: usize,
    /// Payload shape every buffer is sized for
    pub format: PictureFormat,
    /// Issue buffers in strict cyclic order
    pub ring_buffer: bool,
    /// Fill level that raises the high watermark events (0 disables)
    pub high_watermark: usize,
    /// Fill level that raises the low watermark events (0 disables)
    pub low_watermark: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_POOL_CAPACITY,
            format: PictureFormat::default(),
            ring_buffer: false,
            high_watermark: 0,
            low_watermark: 0,
        }
    }
}

impl PoolConfig {
    pub fn new(capacity: usize, format: PictureFormat) -> Self {
        Self {
            capacity,
            format,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DispatchResult<()> {
        if self.capacity == 0 {
            return Err(DispatchError::OutOfRange(
                "pool capacity must be positive".to_string(),
            ));
        }
        if self.capacity > COUNT_MASK as usize {
            return Err(DispatchError::OutOfRange(format!(
                "pool capacity {} too large",
                self.capacity
            )));
        }
        if self.format.frame_size() == 0 {
            return Err(DispatchError::InvalidParameter(format!(
                "empty picture format {}",
                self.format
            )));
        }
        if self.high_watermark > self.capacity || self.low_watermark > self.capacity {
            return Err(DispatchError::OutOfRange(format!(
                "watermarks ({}, {}) exceed capacity {}",
                self.low_watermark, self.high_watermark, self.capacity
            )));
        }
        if self.high_watermark != 0 && self.low_watermark >= self.high_watermark {
            return Err(DispatchError::OutOfRange(format!(
                "low watermark {} must be below high watermark {}",
                self.low_watermark, self.high_watermark
            )));
        }
        Ok(())
    }
}

/// Notifications a pool sends to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
    /// A buffer went back to the free list
    EmptyBufferAdded,
    /// A buffer was marked as carrying a filled picture
    FullBufferAdded,
    /// The fill level reached the high watermark
    HighWatermarkEntered,
    /// The fill level dropped below the high watermark
    HighWatermarkLeft,
    /// The fill level dropped to the low watermark
    LowWatermarkEntered,
    /// The fill level rose above the low watermark
    LowWatermarkLeft,
}

/// Listener invoked for every pool event
///
/// Listeners run on the thread that caused the event, after the pool lock
/// has been released, so they may call back into the pool.
pub type PoolListener = Arc<dyn Fn(&MediaBufferPool, PoolEvent) + Send + Sync>;

/// Identifies a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One buffer record inside the pool arena
pub(crate) struct BufferSlot {
    /// Generation (high half) and reference count (low half)
    state: AtomicU64,
    sync_point: AtomicBool,
    last: AtomicBool,
    full: AtomicBool,
    pub(crate) payload: RwLock<Vec<u8>>,
    pub(crate) metadata: Mutex<BufferMetadata>,
}

impl BufferSlot {
    fn new(format: PictureFormat) -> DispatchResult<Self> {
        let size = format.frame_size();
        let mut payload = Vec::new();
        payload.try_reserve_exact(size)?;
        payload.resize(size, 0);

        Ok(Self {
            state: AtomicU64::new(pack(0, 0)),
            sync_point: AtomicBool::new(false),
            last: AtomicBool::new(false),
            full: AtomicBool::new(false),
            payload: RwLock::new(payload),
            metadata: Mutex::new(BufferMetadata {
                format,
                ..BufferMetadata::default()
            }),
        })
    }

    /// Current reference count if `generation` is the live issue of this slot
    pub(crate) fn ref_count(&self, generation: u32) -> u32 {
        let word = self.state.load(Ordering::Acquire);
        if generation_of(word) == generation {
            count_of(word)
        } else {
            0
        }
    }

    pub(crate) fn is_live(&self, generation: u32) -> bool {
        self.ref_count(generation) > 0
    }

    /// Add one reference, returning the new count
    pub(crate) fn lock(&self, generation: u32) -> DispatchResult<u32> {
        let mut word = self.state.load(Ordering::Acquire);
        loop {
            let count = count_of(word);
            if generation_of(word) != generation || count == 0 {
                return Err(DispatchError::NotOwned);
            }
            if count == u32::MAX {
                return Err(DispatchError::OutOfRange(
                    "buffer reference count overflow".to_string(),
                ));
            }
            match self.state.compare_exchange_weak(
                word,
                pack(generation, count + 1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(count + 1),
                Err(current) => word = current,
            }
        }
    }

    /// Drop one reference, returning the new count
    pub(crate) fn unlock(&self, generation: u32) -> DispatchResult<u32> {
        let mut word = self.state.load(Ordering::Acquire);
        loop {
            let count = count_of(word);
            if generation_of(word) != generation || count == 0 {
                return Err(DispatchError::NotOwned);
            }
            match self.state.compare_exchange_weak(
                word,
                pack(generation, count - 1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(count - 1),
                Err(current) => word = current,
            }
        }
    }

    pub(crate) fn flag_sync_point(&self) -> &AtomicBool {
        &self.sync_point
    }

    pub(crate) fn flag_last(&self) -> &AtomicBool {
        &self.last
    }

    pub(crate) fn is_full(&self) -> bool {
        self.full.load(Ordering::Acquire)
    }

    /// Issue the slot: count := 1, returns the live generation
    fn issue(&self) -> u32 {
        let generation = generation_of(self.state.load(Ordering::Acquire));
        self.state.store(pack(generation, 1), Ordering::Release);
        generation
    }

    /// Invalidate every handle of the current issue and clear the flags
    fn retire(&self) {
        let generation = generation_of(self.state.load(Ordering::Acquire));
        self.state
            .store(pack(generation.wrapping_add(1), 0), Ordering::Release);
        self.sync_point.store(false, Ordering::Release);
        self.last.store(false, Ordering::Release);
        let mut metadata = lock_unpoisoned(&self.metadata);
        metadata.timestamp_us = 0;
        metadata.sequence = 0;
    }
}

/// Free-list bookkeeping, guarded by the pool lock
struct PoolBook {
    free: VecDeque<usize>,
    /// Next slot to issue in ring-buffer mode
    next: usize,
    fill_level: usize,
}

impl PoolBook {
    fn new(capacity: usize) -> Self {
        Self {
            free: (0..capacity).collect(),
            next: 0,
            fill_level: 0,
        }
    }
}

pub(crate) struct PoolShared {
    config: PoolConfig,
    pub(crate) slots: Box<[BufferSlot]>,
    book: Mutex<PoolBook>,
    listeners: Mutex<Vec<(ListenerId, PoolListener)>>,
    next_listener_id: AtomicU64,
}

impl Drop for PoolShared {
    fn drop(&mut self) {
        let book = lock_unpoisoned(&self.book);
        let in_use = self.config.capacity - book.free.len();
        if in_use > 0 {
            warn!(in_use, "Media buffer pool dropped with buffers still in use");
        }
    }
}

/// Fixed-capacity pool of media buffers
///
/// Cloning the pool clones a handle to the same buffers. Buffers only keep a
/// weak back-reference, so they never extend the pool's lifetime; once the
/// last pool handle is gone every outstanding buffer reports `NotOwned`.
#[derive(Clone)]
pub struct MediaBufferPool {
    shared: Arc<PoolShared>,
}

impl MediaBufferPool {
    /// Create a pool and allocate the payload storage of every buffer
    pub fn new(config: PoolConfig) -> DispatchResult<Self> {
        config.validate()?;

        let mut slots = Vec::new();
        slots.try_reserve_exact(config.capacity)?;
        for _ in 0..config.capacity {
            slots.push(BufferSlot::new(config.format)?);
        }

        info!(
            capacity = config.capacity,
            format = %config.format,
            frame_size = config.format.frame_size(),
            ring_buffer = config.ring_buffer,
            "Creating media buffer pool"
        );

        Ok(Self {
            shared: Arc::new(PoolShared {
                book: Mutex::new(PoolBook::new(config.capacity)),
                config,
                slots: slots.into_boxed_slice(),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
            }),
        })
    }

    pub(crate) fn from_shared(shared: Arc<PoolShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<PoolShared> {
        &self.shared
    }

    /// Take a free buffer; its reference count starts at 1
    ///
    /// Never blocks. Fails with `PoolExhausted` without touching the pool
    /// when no buffer is free (or, in ring-buffer mode, when the next buffer
    /// in order is still in use).
    pub fn acquire(&self) -> DispatchResult<MediaBuffer> {
        let mut book = lock_unpoisoned(&self.shared.book);

        let index = if self.shared.config.ring_buffer {
            let next = book.next;
            let position = book
                .free
                .iter()
                .position(|&index| index == next)
                .ok_or(DispatchError::PoolExhausted)?;
            book.free.remove(position);
            next
        } else {
            book.free.pop_front().ok_or(DispatchError::PoolExhausted)?
        };
        book.next = (index + 1) % self.shared.config.capacity;
        drop(book);

        let generation = self.shared.slots[index].issue();
        trace!(index, generation, "Buffer acquired");

        Ok(MediaBuffer::new(Arc::downgrade(&self.shared), index, generation))
    }

    /// Return a slot whose reference count just reached zero
    pub(crate) fn reclaim(&self, index: usize) {
        let slot = &self.shared.slots[index];
        let config = &self.shared.config;
        let mut events = vec![PoolEvent::EmptyBufferAdded];

        {
            let mut book = lock_unpoisoned(&self.shared.book);
            slot.retire();

            if slot.full.swap(false, Ordering::AcqRel) {
                book.fill_level = book.fill_level.saturating_sub(1);
                if config.low_watermark != 0 && book.fill_level == config.low_watermark {
                    events.push(PoolEvent::LowWatermarkEntered);
                }
                if config.high_watermark != 0 && book.fill_level + 1 == config.high_watermark {
                    events.push(PoolEvent::HighWatermarkLeft);
                }
            }
            book.free.push_back(index);
            trace!(index, free = book.free.len(), "Buffer reclaimed");
        }

        self.notify(&events);
    }

    /// Mark a buffer as carrying a filled picture
    pub(crate) fn mark_filled(&self, index: usize) {
        let slot = &self.shared.slots[index];
        let config = &self.shared.config;
        let mut events = Vec::new();

        {
            let mut book = lock_unpoisoned(&self.shared.book);
            if slot.full.swap(true, Ordering::AcqRel) {
                return;
            }
            book.fill_level += 1;
            events.push(PoolEvent::FullBufferAdded);
            if config.high_watermark != 0 && book.fill_level == config.high_watermark {
                events.push(PoolEvent::HighWatermarkEntered);
            }
            if config.low_watermark != 0 && book.fill_level == config.low_watermark + 1 {
                events.push(PoolEvent::LowWatermarkLeft);
            }
        }

        self.notify(&events);
    }

    fn notify(&self, events: &[PoolEvent]) {
        // Snapshot so listeners may register or deregister from inside the callback
        let listeners: Vec<PoolListener> = lock_unpoisoned(&self.shared.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for event in events {
            for listener in &listeners {
                listener(self, *event);
            }
        }
    }

    /// Register a listener for pool events
    pub fn register_listener<F>(&self, listener: F) -> DispatchResult<ListenerId>
    where
        F: Fn(&MediaBufferPool, PoolEvent) + Send + Sync + 'static,
    {
        let mut listeners = lock_unpoisoned(&self.shared.listeners);
        if listeners.len() >= MAX_POOL_LISTENERS {
            return Err(DispatchError::OutOfRange(format!(
                "at most {} pool listeners",
                MAX_POOL_LISTENERS
            )));
        }
        let id = ListenerId(self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed));
        listeners.push((id, Arc::new(listener)));
        debug!(id = id.0, "Pool listener registered");
        Ok(id)
    }

    /// Remove a previously registered listener
    pub fn deregister_listener(&self, id: ListenerId) -> DispatchResult<()> {
        let mut listeners = lock_unpoisoned(&self.shared.listeners);
        let position = listeners
            .iter()
            .position(|(registered, _)| *registered == id)
            .ok_or(DispatchError::NotAvailable)?;
        listeners.remove(position);
        debug!(id = id.0, "Pool listener deregistered");
        Ok(())
    }

    /// Re-initialize all buffers; only allowed while none is in use
    pub fn reset(&self) -> DispatchResult<()> {
        let mut book = lock_unpoisoned(&self.shared.book);
        let in_use = self.shared.config.capacity - book.free.len();
        if in_use > 0 {
            return Err(DispatchError::PoolBusy(in_use));
        }

        for slot in self.shared.slots.iter() {
            slot.retire();
            slot.full.store(false, Ordering::Release);
        }
        *book = PoolBook::new(self.shared.config.capacity);
        debug!("Media buffer pool reset");
        Ok(())
    }

    /// Destroy the pool, refusing while any buffer is still in use
    ///
    /// On refusal the pool is handed back inside the error.
    pub fn destroy(self) -> Result<(), DestroyError> {
        let in_use = self.in_use();
        if in_use > 0 {
            warn!(in_use, "Refusing to destroy media buffer pool");
            return Err(DestroyError { pool: self, in_use });
        }
        info!(capacity = self.capacity(), "Destroying media buffer pool");
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.shared.config.capacity
    }

    pub fn free_count(&self) -> usize {
        lock_unpoisoned(&self.shared.book).free.len()
    }

    pub fn in_use(&self) -> usize {
        self.capacity() - self.free_count()
    }

    /// Buffers marked full and not yet returned
    pub fn fill_level(&self) -> usize {
        lock_unpoisoned(&self.shared.book).fill_level
    }

    pub fn format(&self) -> PictureFormat {
        self.shared.config.format
    }

    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Whether both handles refer to the same pool
    pub fn same_pool(&self, other: &MediaBufferPool) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl std::fmt::Debug for MediaBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBufferPool")
            .field("capacity", &self.capacity())
            .field("free", &self.free_count())
            .field("format", &self.shared.config.format)
            .finish()
    }
}

/// Returned by [`MediaBufferPool::destroy`] when buffers are still in use
pub struct DestroyError {
    pub pool: MediaBufferPool,
    pub in_use: usize,
}

impl DestroyError {
    pub fn into_pool(self) -> MediaBufferPool {
        self.pool
    }
}

impl std::fmt::Debug for DestroyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DestroyError")
            .field("in_use", &self.in_use)
            .finish()
    }
}

impl std::fmt::Display for DestroyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot destroy pool: {} buffers still in use", self.in_use)
    }
}

impl std::error::Error for DestroyError {}

impl From<DestroyError> for DispatchError {
    fn from(err: DestroyError) -> Self {
        DispatchError::PoolBusy(err.in_use)
    }
}
