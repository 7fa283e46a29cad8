// SPDX-License-Identifier: MPL-2.0

//! Integration tests for buffer pools and buffer reference counting

use camera_paths::buffers::{
    MediaBufferPool, PictureFormat, PictureKind, PictureLayout, PoolConfig, PoolEvent,
};
use camera_paths::errors::DispatchError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn small_format() -> PictureFormat {
    PictureFormat::new(PictureKind::Raw8, PictureLayout::Interleaved, 16, 8)
}

fn pool(capacity: usize) -> MediaBufferPool {
    MediaBufferPool::new(PoolConfig::new(capacity, small_format())).unwrap()
}

#[test]
fn test_acquire_sets_single_reference() {
    let pool = pool(2);
    let buffer = pool.acquire().unwrap();

    assert_eq!(buffer.ref_count(), 1);
    assert!(buffer.owner().is_some_and(|owner| owner.same_pool(&pool)));
    assert_eq!(pool.in_use(), 1);
}

#[test]
fn test_capacity_four_scenario() {
    let pool = pool(4);
    let buffers: Vec<_> = (0..4).map(|_| pool.acquire().unwrap()).collect();

    assert_eq!(pool.acquire(), Err(DispatchError::PoolExhausted));

    buffers[2].unlock().unwrap();
    let reissued = pool.acquire().unwrap();
    assert_eq!(reissued.index(), buffers[2].index());
    assert_eq!(reissued.ref_count(), 1);
    assert_eq!(pool.free_count(), 0);
}

#[test]
fn test_exhausted_acquire_does_not_mutate() {
    let pool = pool(1);
    let buffer = pool.acquire().unwrap();

    for _ in 0..3 {
        assert_eq!(pool.acquire(), Err(DispatchError::PoolExhausted));
    }
    assert_eq!(pool.free_count(), 0);
    assert_eq!(buffer.ref_count(), 1);
}

#[test]
fn test_returned_exactly_once_after_last_unlock() {
    let pool = pool(2);
    let returns = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&returns);
    pool.register_listener(move |_, event| {
        if event == PoolEvent::EmptyBufferAdded {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    })
    .unwrap();

    let buffer = pool.acquire().unwrap();
    let n = 5;
    for _ in 0..n {
        buffer.lock().unwrap();
    }
    for _ in 0..n {
        buffer.unlock().unwrap();
        assert_eq!(returns.load(Ordering::SeqCst), 0, "returned before the final unlock");
    }
    assert_eq!(buffer.ref_count(), 1);

    buffer.unlock().unwrap();
    assert_eq!(returns.load(Ordering::SeqCst), 1);
    assert_eq!(pool.free_count(), 2);
}

#[test]
fn test_unlock_past_zero_rejected() {
    let pool = pool(2);
    let buffer = pool.acquire().unwrap();
    buffer.unlock().unwrap();
    let free_before = pool.free_count();

    assert_eq!(buffer.unlock(), Err(DispatchError::NotOwned));
    assert_eq!(buffer.lock(), Err(DispatchError::NotOwned));
    assert_eq!(pool.free_count(), free_before);
}

#[test]
fn test_concurrent_lock_unlock() {
    let pool = pool(1);
    let buffer = pool.acquire().unwrap();
    let threads = 8;
    let rounds = 1000;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let buffer = buffer.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..rounds {
                    buffer.lock().unwrap();
                    buffer.unlock().unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(buffer.ref_count(), 1);
    assert_eq!(pool.free_count(), 0);
    buffer.unlock().unwrap();
    assert_eq!(pool.free_count(), 1);
}

#[test]
fn test_ring_buffer_waits_for_next_in_order() {
    let config = PoolConfig {
        ring_buffer: true,
        ..PoolConfig::new(3, small_format())
    };
    let pool = MediaBufferPool::new(config).unwrap();

    let first = pool.acquire().unwrap();
    let second = pool.acquire().unwrap();
    let third = pool.acquire().unwrap();
    assert_eq!(
        [first.index(), second.index(), third.index()],
        [0, 1, 2]
    );

    // Slot 1 is free, but slot 0 is next in order
    second.unlock().unwrap();
    assert_eq!(pool.acquire(), Err(DispatchError::PoolExhausted));

    first.unlock().unwrap();
    assert_eq!(pool.acquire().unwrap().index(), 0);
    assert_eq!(pool.acquire().unwrap().index(), 1);
}

#[test]
fn test_destroy_refused_while_in_use() {
    let pool = pool(2);
    let buffer = pool.acquire().unwrap();

    let refused = pool.destroy().unwrap_err();
    assert_eq!(refused.in_use, 1);
    let pool = refused.into_pool();

    buffer.unlock().unwrap();
    assert!(pool.destroy().is_ok());
}

#[test]
fn test_payload_sized_to_format() {
    let pool = pool(1);
    let buffer = pool.acquire().unwrap();

    buffer
        .with_payload_mut(|payload| payload.fill(0xAB))
        .unwrap();
    let (len, first) = buffer
        .with_payload(|payload| (payload.len(), payload[0]))
        .unwrap();
    assert_eq!(len, small_format().frame_size());
    assert_eq!(first, 0xAB);
}
