// SPDX-License-Identifier: GPL-3.0-only

//! Media buffer handles and the RAII lock guard

use super::pool::{BufferSlot, MediaBufferPool, PoolShared, lock_unpoisoned};
use super::types::BufferMetadata;
use crate::errors::{DispatchError, DispatchResult};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use tracing::warn;

/// Handle to one buffer of a [`MediaBufferPool`]
///
/// A handle does not hold a reference by itself: cloning it does not touch
/// the reference count. References are taken with [`lock`](Self::lock) and
/// dropped with [`unlock`](Self::unlock); the unlock that brings the count to
/// zero returns the buffer to its pool. Once that happened the handle is
/// stale and every further lock or unlock fails with `NotOwned`, even if the
/// pool has meanwhile reissued the same slot.
#[derive(Clone)]
pub struct MediaBuffer {
    owner: Weak<PoolShared>,
    index: usize,
    generation: u32,
}

impl MediaBuffer {
    pub(crate) fn new(owner: Weak<PoolShared>, index: usize, generation: u32) -> Self {
        Self {
            owner,
            index,
            generation,
        }
    }

    fn with_slot<R>(
        &self,
        f: impl FnOnce(&Arc<PoolShared>, &BufferSlot) -> DispatchResult<R>,
    ) -> DispatchResult<R> {
        let shared = self.owner.upgrade().ok_or(DispatchError::NotOwned)?;
        let slot = &shared.slots[self.index];
        f(&shared, slot)
    }

    fn with_live_slot<R>(&self, f: impl FnOnce(&BufferSlot) -> R) -> DispatchResult<R> {
        self.with_slot(|_, slot| {
            if slot.is_live(self.generation) {
                Ok(f(slot))
            } else {
                Err(DispatchError::NotOwned)
            }
        })
    }

    /// Take one more reference on the buffer
    pub fn lock(&self) -> DispatchResult<()> {
        self.with_slot(|_, slot| slot.lock(self.generation).map(|_| ()))
    }

    /// Drop one reference; the last one returns the buffer to its pool
    pub fn unlock(&self) -> DispatchResult<()> {
        self.with_slot(|shared, slot| {
            if slot.unlock(self.generation)? == 0 {
                MediaBufferPool::from_shared(Arc::clone(shared)).reclaim(self.index);
            }
            Ok(())
        })
    }

    /// Take one more reference, wrapped in a guard that drops it again
    pub fn locked(&self) -> DispatchResult<LockedBuffer> {
        self.lock()?;
        Ok(LockedBuffer::adopt(self.clone()))
    }

    /// Hand a reference the caller already holds over to a guard
    pub fn into_locked(self) -> LockedBuffer {
        LockedBuffer::adopt(self)
    }

    /// Outstanding references; 0 once the buffer went back to its pool
    pub fn ref_count(&self) -> u32 {
        self.with_slot(|_, slot| Ok(slot.ref_count(self.generation)))
            .unwrap_or(0)
    }

    /// Whether the buffer is currently issued by a live pool
    pub fn is_owned(&self) -> bool {
        self.ref_count() > 0
    }

    /// The pool this buffer is currently issued by
    pub fn owner(&self) -> Option<MediaBufferPool> {
        let shared = self.owner.upgrade()?;
        if shared.slots[self.index].is_live(self.generation) {
            Some(MediaBufferPool::from_shared(shared))
        } else {
            None
        }
    }

    /// Slot index inside the owning pool
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_sync_point(&self) -> bool {
        self.with_live_slot(|slot| slot.flag_sync_point().load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn set_sync_point(&self, sync_point: bool) -> DispatchResult<()> {
        self.with_live_slot(|slot| {
            slot.flag_sync_point()
                .store(sync_point, Ordering::Release)
        })
    }

    pub fn is_last(&self) -> bool {
        self.with_live_slot(|slot| slot.flag_last().load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn set_last(&self, last: bool) -> DispatchResult<()> {
        self.with_live_slot(|slot| slot.flag_last().store(last, Ordering::Release))
    }

    /// Whether the buffer carries a filled picture
    pub fn is_full(&self) -> bool {
        self.with_live_slot(|slot| slot.is_full()).unwrap_or(false)
    }

    pub fn metadata(&self) -> DispatchResult<BufferMetadata> {
        self.with_live_slot(|slot| *lock_unpoisoned(&slot.metadata))
    }

    pub fn update_metadata(&self, f: impl FnOnce(&mut BufferMetadata)) -> DispatchResult<()> {
        self.with_live_slot(|slot| f(&mut lock_unpoisoned(&slot.metadata)))
    }

    /// Read the payload
    pub fn with_payload<R>(&self, f: impl FnOnce(&[u8]) -> R) -> DispatchResult<R> {
        self.with_live_slot(|slot| {
            let payload = slot
                .payload
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&payload)
        })
    }

    /// Write the payload
    pub fn with_payload_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> DispatchResult<R> {
        self.with_live_slot(|slot| {
            let mut payload = slot
                .payload
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut payload)
        })
    }

    /// Mark the buffer full in its pool's fill bookkeeping
    pub(crate) fn mark_filled(&self) -> DispatchResult<()> {
        self.with_slot(|shared, slot| {
            if !slot.is_live(self.generation) {
                return Err(DispatchError::NotOwned);
            }
            MediaBufferPool::from_shared(Arc::clone(shared)).mark_filled(self.index);
            Ok(())
        })
    }
}

impl PartialEq for MediaBuffer {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.owner, &other.owner)
            && self.index == other.index
            && self.generation == other.generation
    }
}

impl Eq for MediaBuffer {}

impl std::fmt::Debug for MediaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBuffer")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

/// A buffer together with exactly one reference on it
///
/// Dropping the guard releases the reference. Consumer queues and buffer
/// callbacks receive buffers in this form; holding on to a guard (or a
/// [`retain`](Self::retain)ed copy) keeps the buffer out of the pool.
pub struct LockedBuffer {
    buffer: MediaBuffer,
    armed: bool,
}

impl LockedBuffer {
    fn adopt(buffer: MediaBuffer) -> Self {
        Self {
            buffer,
            armed: true,
        }
    }

    pub fn buffer(&self) -> &MediaBuffer {
        &self.buffer
    }

    /// Take another reference on the same buffer
    pub fn retain(&self) -> DispatchResult<LockedBuffer> {
        self.buffer.locked()
    }

    /// Release the reference now and report the outcome
    pub fn release(mut self) -> DispatchResult<()> {
        self.armed = false;
        self.buffer.unlock()
    }

    /// Give up the guard but keep the reference held
    pub fn into_inner(mut self) -> MediaBuffer {
        self.armed = false;
        self.buffer.clone()
    }
}

impl std::ops::Deref for LockedBuffer {
    type Target = MediaBuffer;

    fn deref(&self) -> &MediaBuffer {
        &self.buffer
    }
}

impl std::fmt::Debug for LockedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LockedBuffer").field(&self.buffer).finish()
    }
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        if self.armed
            && let Err(e) = self.buffer.unlock()
        {
            warn!(index = self.buffer.index, error = %e, "Failed to release buffer lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::buffers::{MediaBufferPool, PictureFormat, PoolConfig};
    use crate::errors::DispatchError;

    fn pool(capacity: usize) -> MediaBufferPool {
        MediaBufferPool::new(PoolConfig::new(capacity, PictureFormat::default())).unwrap()
    }

    #[test]
    fn test_lock_unlock_counts() {
        let pool = pool(1);
        let buffer = pool.acquire().unwrap();
        assert_eq!(buffer.ref_count(), 1);

        buffer.lock().unwrap();
        buffer.lock().unwrap();
        assert_eq!(buffer.ref_count(), 3);

        buffer.unlock().unwrap();
        buffer.unlock().unwrap();
        assert_eq!(buffer.ref_count(), 1);
        assert_eq!(pool.free_count(), 0);

        buffer.unlock().unwrap();
        assert_eq!(buffer.ref_count(), 0);
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_stale_handle_rejected_after_reissue() {
        let pool = pool(1);
        let first = pool.acquire().unwrap();
        let stale = first.clone();
        first.unlock().unwrap();

        let second = pool.acquire().unwrap();
        assert_eq!(second.index(), stale.index());
        assert_ne!(second, stale);

        assert_eq!(stale.lock(), Err(DispatchError::NotOwned));
        assert_eq!(stale.unlock(), Err(DispatchError::NotOwned));
        assert_eq!(second.ref_count(), 1);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let pool = pool(1);
        let buffer = pool.acquire().unwrap();

        let guard = buffer.locked().unwrap();
        let retained = guard.retain().unwrap();
        assert_eq!(buffer.ref_count(), 3);

        drop(guard);
        drop(retained);
        assert_eq!(buffer.ref_count(), 1);

        buffer.into_locked().release().unwrap();
        assert_eq!(pool.free_count(), 1);
    }

    #[test]
    fn test_flags_cleared_on_reclaim() {
        let pool = pool(1);
        let buffer = pool.acquire().unwrap();
        buffer.set_sync_point(true).unwrap();
        buffer.set_last(true).unwrap();
        assert!(buffer.is_sync_point());
        assert!(buffer.is_last());
        buffer.unlock().unwrap();

        assert_eq!(buffer.set_last(true), Err(DispatchError::NotOwned));

        let reissued = pool.acquire().unwrap();
        assert!(!reissued.is_sync_point());
        assert!(!reissued.is_last());
    }

    #[test]
    fn test_owner_gone_with_pool() {
        let pool = pool(1);
        let buffer = pool.acquire().unwrap();
        assert!(buffer.owner().is_some());

        drop(pool);
        assert!(buffer.owner().is_none());
        assert_eq!(buffer.unlock(), Err(DispatchError::NotOwned));
    }
}
