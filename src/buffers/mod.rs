// SPDX-License-Identifier: GPL-3.0-only

//! Reference-counted media buffers and their pools

pub mod media_buffer;
pub mod pool;
pub mod types;

pub use media_buffer::{LockedBuffer, MediaBuffer};
pub use pool::{DestroyError, ListenerId, MediaBufferPool, PoolConfig, PoolEvent, PoolListener};
pub use types::{BufferMetadata, PictureFormat, PictureKind, PictureLayout};
