// SPDX-License-Identifier: GPL-3.0-only

//! Controller worker loop
//!
//! The worker is the only thread that changes the controller state while it
//! runs. It applies commands strictly in submission order.

use super::OutputPath;
use super::command::{Command, CommandKind};
use super::controller::ControllerShared;
use super::state::ControllerState;
use crate::buffers::LockedBuffer;
use crate::errors::{DispatchError, DispatchResult};
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, trace, warn};

/// Apply commands until `Shutdown`, then hand the receiver back so the
/// caller can discard whatever was queued behind it
pub(crate) fn run(shared: Arc<ControllerShared>, commands: Receiver<Command>) -> Receiver<Command> {
    debug!("Controller worker started");

    while let Ok(command) = commands.recv() {
        trace!(command = command.name(), "Applying command");
        match command {
            Command::Start(ack) => {
                let result = start(&shared);
                shared.complete(CommandKind::Start, result, ack);
            }
            Command::Stop(ack) => {
                let result = stop(&shared);
                shared.complete(CommandKind::Stop, result, ack);
            }
            Command::ProcessFullBuffer { path, buffer } => dispatch(&shared, path, buffer),
            Command::Shutdown => {
                // Only reachable while running when the controller is dropped
                if shared.state.get().is_running() {
                    halt(&shared);
                }
                shared.state.set(ControllerState::Invalid);
                break;
            }
        }
    }

    debug!("Controller worker exiting");
    commands
}

fn start(shared: &ControllerShared) -> DispatchResult<()> {
    let state = shared.state.get();
    if !state.can_start() {
        return Err(DispatchError::wrong_state("start", state));
    }

    shared.state.set(ControllerState::Running);
    for slot in shared.paths() {
        if slot.pool.is_some() && slot.num_buffers > 0 {
            let supplied = slot.supply();
            if supplied < slot.num_buffers {
                warn!(
                    path = %slot.path,
                    supplied,
                    wanted = slot.num_buffers,
                    "Pool could not fill the empty-buffer queue"
                );
            }
        }
    }

    info!("Path controller running");
    Ok(())
}

fn stop(shared: &ControllerShared) -> DispatchResult<()> {
    match shared.state.get() {
        ControllerState::Running => {
            halt(shared);
            info!("Path controller stopped");
            Ok(())
        }
        ControllerState::Stopped => {
            debug!("Path controller already stopped");
            Ok(())
        }
        other => Err(DispatchError::wrong_state("stop", other)),
    }
}

/// Leave the running state and give prepared buffers back to their pools
fn halt(shared: &ControllerShared) {
    shared.state.set(ControllerState::Stopped);
    for slot in shared.paths() {
        let released = slot.release_empty();
        if released > 0 {
            debug!(path = %slot.path, released, "Prepared buffers returned to pool");
        }
    }
}

/// Fan a filled buffer out to the path's queues and callback
///
/// Queues each get their own reference. The callback borrows the
/// controller's reference, which is dropped when this function returns.
fn dispatch(shared: &ControllerShared, path: OutputPath, buffer: LockedBuffer) {
    let slot = shared.path(path);
    if !shared.state.get().is_running() {
        slot.counters.dropped();
        debug!(%path, index = buffer.index(), "Buffer released without dispatch");
        return;
    }

    let (queues, callback) = slot.consumers();
    for queue in &queues {
        match buffer.retain() {
            Ok(reference) => {
                queue.push(reference);
                slot.counters.queue_push();
            }
            Err(e) => warn!(%path, error = %e, "Failed to lock buffer for consumer queue"),
        }
    }

    if let Some(callback) = callback {
        callback(path, &buffer);
        slot.counters.callback();
    }

    slot.counters.dispatched();
    trace!(%path, index = buffer.index(), queues = queues.len(), "Buffer dispatched");
}

/// Settle every command left in the queue after the worker exited
pub(crate) fn drain(shared: &ControllerShared, commands: Receiver<Command>) {
    let mut discarded = 0usize;
    while let Ok(command) = commands.try_recv() {
        match command {
            Command::Start(ack) => {
                shared.complete(CommandKind::Start, Err(DispatchError::Canceled), ack);
                discarded += 1;
            }
            Command::Stop(ack) => {
                shared.complete(CommandKind::Stop, Err(DispatchError::Canceled), ack);
                discarded += 1;
            }
            Command::ProcessFullBuffer { path, buffer } => {
                shared.path(path).counters.dropped();
                drop(buffer);
                discarded += 1;
            }
            Command::Shutdown => {}
        }
    }
    if discarded > 0 {
        warn!(discarded, "Queued commands discarded at shutdown");
    }
}
