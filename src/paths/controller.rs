// SPDX-License-Identifier: GPL-3.0-only

//! Path controller
//!
//! Owns the Main and Self output paths, serializes start/stop and buffer
//! dispatch onto a dedicated worker thread, and hands empty buffers to the
//! pipeline while running.

use super::command::{Command, CommandKind, Completion, CompletionCallback, Pending};
use super::state::{ControllerState, StateCell};
use super::stats::{PathCounters, PathStats};
use super::{ConsumerQueue, OutputPath, worker};
use crate::buffers::pool::lock_unpoisoned;
use crate::buffers::{ListenerId, LockedBuffer, MediaBuffer, MediaBufferPool, PoolEvent};
use crate::config::ControllerSettings;
use crate::constants::DEFAULT_MAX_PENDING_COMMANDS;
use crate::errors::{DispatchError, DispatchResult};
use crate::pipeline::{PipelineEvent, PipelineHandle};
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, info, trace, warn};

/// Called by the worker for every buffer dispatched on a path
///
/// The buffer is locked for the duration of the call. Retain it
/// ([`LockedBuffer::retain`]) to keep it beyond the callback.
pub type BufferCallback = Arc<dyn Fn(OutputPath, &LockedBuffer) + Send + Sync>;

/// Wrap a closure as a [`BufferCallback`]
pub fn buffer_callback<F>(f: F) -> BufferCallback
where
    F: Fn(OutputPath, &LockedBuffer) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Everything a controller needs at construction
///
/// `completion` and `pipeline` are required, as is at least one pool.
/// `num_buffers_*` is how many empty buffers the controller keeps prepared
/// for the pipeline on that path while running (0 disables the supply).
#[derive(Clone)]
pub struct PathControllerConfig {
    pub max_pending_commands: usize,
    pub main_pool: Option<MediaBufferPool>,
    pub self_pool: Option<MediaBufferPool>,
    pub num_buffers_main: usize,
    pub num_buffers_self: usize,
    pub completion: Option<CompletionCallback>,
    pub pipeline: Option<PipelineHandle>,
}

impl Default for PathControllerConfig {
    fn default() -> Self {
        Self {
            max_pending_commands: DEFAULT_MAX_PENDING_COMMANDS,
            main_pool: None,
            self_pool: None,
            num_buffers_main: 0,
            num_buffers_self: 0,
            completion: None,
            pipeline: None,
        }
    }
}

impl PathControllerConfig {
    /// Numeric settings from the configuration file; pools, pipeline and
    /// completion are still to be supplied
    pub fn from_settings(settings: &ControllerSettings) -> Self {
        Self {
            max_pending_commands: settings.max_pending_commands,
            num_buffers_main: settings.num_buffers_main,
            num_buffers_self: settings.num_buffers_self,
            ..Self::default()
        }
    }

    pub fn with_max_pending_commands(mut self, max_pending_commands: usize) -> Self {
        self.max_pending_commands = max_pending_commands;
        self
    }

    pub fn with_pool(mut self, path: OutputPath, pool: MediaBufferPool) -> Self {
        match path {
            OutputPath::Main => self.main_pool = Some(pool),
            OutputPath::SelfPath => self.self_pool = Some(pool),
        }
        self
    }

    pub fn with_num_buffers(mut self, path: OutputPath, num_buffers: usize) -> Self {
        match path {
            OutputPath::Main => self.num_buffers_main = num_buffers,
            OutputPath::SelfPath => self.num_buffers_self = num_buffers,
        }
        self
    }

    pub fn with_completion(mut self, completion: CompletionCallback) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_pipeline(mut self, pipeline: PipelineHandle) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    fn validate(&self) -> DispatchResult<()> {
        if self.main_pool.is_none() && self.self_pool.is_none() {
            return Err(DispatchError::InvalidParameter(
                "at least one buffer pool is required".into(),
            ));
        }
        if self.completion.is_none() {
            return Err(DispatchError::InvalidParameter(
                "a completion callback is required".into(),
            ));
        }
        match &self.pipeline {
            None => {
                return Err(DispatchError::WrongHandle("no pipeline handle".into()));
            }
            Some(pipeline) if !pipeline.is_alive() => {
                return Err(DispatchError::WrongHandle(format!(
                    "pipeline '{}' is not alive",
                    pipeline.name()
                )));
            }
            Some(_) => {}
        }
        if self.max_pending_commands == 0 {
            return Err(DispatchError::OutOfRange(
                "max_pending_commands must be at least 1".into(),
            ));
        }
        for (path, pool, num_buffers) in [
            (OutputPath::Main, &self.main_pool, self.num_buffers_main),
            (OutputPath::SelfPath, &self.self_pool, self.num_buffers_self),
        ] {
            if let Some(pool) = pool
                && num_buffers > pool.capacity()
            {
                return Err(DispatchError::OutOfRange(format!(
                    "{} path wants {} buffers but its pool holds {}",
                    path,
                    num_buffers,
                    pool.capacity()
                )));
            }
        }
        Ok(())
    }
}

/// Per-path resources, each behind its own lock
pub(crate) struct PathSlot {
    pub(crate) path: OutputPath,
    pub(crate) pool: Option<MediaBufferPool>,
    pub(crate) num_buffers: usize,
    queues: Mutex<Vec<Arc<dyn ConsumerQueue>>>,
    callback: Mutex<Option<BufferCallback>>,
    empty: Mutex<VecDeque<MediaBuffer>>,
    listener: Mutex<Option<ListenerId>>,
    pub(crate) counters: PathCounters,
}

impl PathSlot {
    fn new(path: OutputPath, pool: Option<MediaBufferPool>, num_buffers: usize) -> Self {
        Self {
            path,
            pool,
            num_buffers,
            queues: Mutex::new(Vec::new()),
            callback: Mutex::new(None),
            empty: Mutex::new(VecDeque::new()),
            listener: Mutex::new(None),
            counters: PathCounters::default(),
        }
    }

    /// Current consumers, copied out so they can be called without the locks
    pub(crate) fn consumers(&self) -> (Vec<Arc<dyn ConsumerQueue>>, Option<BufferCallback>) {
        let queues = lock_unpoisoned(&self.queues).clone();
        let callback = lock_unpoisoned(&self.callback).clone();
        (queues, callback)
    }

    /// Top the empty-buffer queue up to `num_buffers`
    pub(crate) fn supply(&self) -> usize {
        let Some(pool) = &self.pool else {
            return 0;
        };
        let mut empty = lock_unpoisoned(&self.empty);
        let mut added = 0;
        while empty.len() < self.num_buffers {
            match pool.acquire() {
                Ok(buffer) => {
                    empty.push_back(buffer);
                    added += 1;
                }
                Err(e) => {
                    trace!(path = %self.path, error = %e, "No buffer to supply");
                    break;
                }
            }
        }
        if added > 0 {
            debug!(path = %self.path, added, prepared = empty.len(), "Empty buffers supplied");
        }
        added
    }

    /// Hand every prepared buffer back to the pool
    pub(crate) fn release_empty(&self) -> usize {
        // Drained first: the unlocks below notify pool listeners, which take this lock
        let drained: Vec<MediaBuffer> = lock_unpoisoned(&self.empty).drain(..).collect();
        for buffer in &drained {
            if let Err(e) = buffer.unlock() {
                warn!(path = %self.path, index = buffer.index(), error = %e, "Failed to release prepared buffer");
            }
        }
        drained.len()
    }

    fn take_empty(&self) -> Option<MediaBuffer> {
        lock_unpoisoned(&self.empty).pop_front()
    }

    fn prepared(&self) -> usize {
        lock_unpoisoned(&self.empty).len()
    }
}

pub(crate) struct ControllerShared {
    pub(crate) state: StateCell,
    paths: [PathSlot; 2],
    completion: CompletionCallback,
    pipeline: PipelineHandle,
    epoch: Instant,
}

impl ControllerShared {
    pub(crate) fn path(&self, path: OutputPath) -> &PathSlot {
        &self.paths[path.slot()]
    }

    pub(crate) fn paths(&self) -> impl Iterator<Item = &PathSlot> {
        self.paths.iter()
    }

    /// Report the outcome of a start or stop to both observers
    pub(crate) fn complete(
        &self,
        command: CommandKind,
        result: DispatchResult<()>,
        ack: oneshot::Sender<DispatchResult<()>>,
    ) {
        match &result {
            Ok(()) => debug!(%command, "Command completed"),
            Err(DispatchError::Canceled) => warn!(%command, "Command canceled"),
            Err(e) => error!(%command, error = %e, "Command failed"),
        }
        (self.completion)(&Completion {
            command,
            result: result.clone(),
        });
        // The caller may have dropped its token
        let _ = ack.send(result);
    }

    fn timestamp_us(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }

    /// Keep each path's empty-buffer queue topped up while running
    fn attach_pool_listeners(self: &Arc<Self>) -> DispatchResult<()> {
        for slot in &self.paths {
            let Some(pool) = &slot.pool else {
                continue;
            };
            if slot.num_buffers == 0 {
                continue;
            }
            let weak: Weak<ControllerShared> = Arc::downgrade(self);
            let path = slot.path;
            let id = pool.register_listener(move |_, event| {
                if !matches!(event, PoolEvent::EmptyBufferAdded) {
                    return;
                }
                if let Some(shared) = weak.upgrade()
                    && shared.state.get().is_running()
                {
                    shared.path(path).supply();
                }
            })?;
            *lock_unpoisoned(&slot.listener) = Some(id);
        }
        Ok(())
    }

    fn detach_pool_listeners(&self) {
        for slot in &self.paths {
            if let Some(id) = lock_unpoisoned(&slot.listener).take()
                && let Some(pool) = &slot.pool
                && let Err(e) = pool.deregister_listener(id)
            {
                warn!(path = %slot.path, error = %e, "Failed to deregister pool listener");
            }
        }
    }
}

/// Distributes filled buffers along the Main and Self paths
///
/// Start and stop are queued and applied by the worker; their outcome is
/// reported through the completion callback. Queue attachment and callback
/// registration take effect immediately. The controller is `Send + Sync`
/// and can be shared with the pipeline thread behind an `Arc`.
pub struct PathController {
    shared: Arc<ControllerShared>,
    commands: SyncSender<Command>,
    worker: Mutex<Option<JoinHandle<Receiver<Command>>>>,
    max_pending_commands: usize,
}

impl PathController {
    /// Validate the configuration, then start the worker
    pub fn new(config: PathControllerConfig) -> DispatchResult<Self> {
        config.validate()?;

        let PathControllerConfig {
            max_pending_commands,
            main_pool,
            self_pool,
            num_buffers_main,
            num_buffers_self,
            completion,
            pipeline,
        } = config;
        let (Some(completion), Some(pipeline)) = (completion, pipeline) else {
            return Err(DispatchError::InvalidParameter(
                "incomplete controller configuration".into(),
            ));
        };

        let shared = Arc::new(ControllerShared {
            state: StateCell::new(ControllerState::Invalid),
            paths: [
                PathSlot::new(OutputPath::Main, main_pool, num_buffers_main),
                PathSlot::new(OutputPath::SelfPath, self_pool, num_buffers_self),
            ],
            completion,
            pipeline,
            epoch: Instant::now(),
        });

        if let Err(e) = shared.attach_pool_listeners() {
            shared.detach_pool_listeners();
            return Err(e);
        }

        let (sender, receiver) = mpsc::sync_channel(max_pending_commands);
        shared.state.set(ControllerState::Initializing);

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("path-controller".into())
            .spawn(move || worker::run(worker_shared, receiver));
        let worker = match worker {
            Ok(handle) => handle,
            Err(e) => {
                shared.detach_pool_listeners();
                shared.state.set(ControllerState::Invalid);
                return Err(DispatchError::OutOfMemory(format!(
                    "failed to spawn controller worker: {}",
                    e
                )));
            }
        };

        info!(
            pipeline = shared.pipeline.name(),
            max_pending_commands,
            main = shared.path(OutputPath::Main).pool.is_some(),
            self_path = shared.path(OutputPath::SelfPath).pool.is_some(),
            "Path controller initialized"
        );

        Ok(Self {
            shared,
            commands: sender,
            worker: Mutex::new(Some(worker)),
            max_pending_commands,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.shared.state.get()
    }

    pub fn pipeline(&self) -> &PipelineHandle {
        &self.shared.pipeline
    }

    pub fn max_pending_commands(&self) -> usize {
        self.max_pending_commands
    }

    pub fn pool(&self, path: OutputPath) -> Option<&MediaBufferPool> {
        self.shared.path(path).pool.as_ref()
    }

    pub fn stats(&self, path: OutputPath) -> PathStats {
        self.shared.path(path).counters.snapshot()
    }

    /// Number of empty buffers currently prepared for the pipeline
    pub fn prepared_buffers(&self, path: OutputPath) -> usize {
        self.shared.path(path).prepared()
    }

    /// Queue a start; applied by the worker
    pub fn start(&self) -> DispatchResult<Pending> {
        let state = self.state();
        if !state.can_start() {
            return Err(DispatchError::wrong_state("start", state));
        }
        let (pending, ack) = Pending::new(CommandKind::Start);
        self.submit(Command::Start(ack))?;
        info!("Path controller start requested");
        Ok(pending)
    }

    /// Queue a stop; stopping a stopped controller completes successfully
    pub fn stop(&self) -> DispatchResult<Pending> {
        let state = self.state();
        if !state.can_stop() {
            return Err(DispatchError::wrong_state("stop", state));
        }
        let (pending, ack) = Pending::new(CommandKind::Stop);
        self.submit(Command::Stop(ack))?;
        info!("Path controller stop requested");
        Ok(pending)
    }

    /// Stop the worker and release everything the controller holds
    ///
    /// Commands still queued are discarded: start/stop complete with
    /// `Canceled`, pending buffers are released.
    pub fn shutdown(&self) -> DispatchResult<()> {
        let state = self.state();
        if !state.can_shutdown() {
            return Err(DispatchError::wrong_state("shutdown", state));
        }
        self.teardown();
        Ok(())
    }

    fn submit(&self, command: Command) -> DispatchResult<()> {
        let name = command.name();
        // A rejected command is dropped with the error, releasing any buffer it carries
        self.commands.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!(command = name, "Command queue full");
                DispatchError::QueueFull
            }
            TrySendError::Disconnected(_) => DispatchError::wrong_state(name, self.state()),
        })
    }

    fn teardown(&self) {
        let Some(worker) = lock_unpoisoned(&self.worker).take() else {
            return;
        };

        if self.commands.send(Command::Shutdown).is_err() {
            warn!("Controller worker already exited");
        }
        let leftovers = match worker.join() {
            Ok(receiver) => Some(receiver),
            Err(_) => {
                error!("Controller worker panicked");
                None
            }
        };
        self.shared.state.set(ControllerState::Destroyed);

        if let Some(receiver) = leftovers {
            worker::drain(&self.shared, receiver);
        }
        self.shared.detach_pool_listeners();

        for slot in self.shared.paths() {
            let released = slot.release_empty();
            let queues = {
                let mut queues = lock_unpoisoned(&slot.queues);
                let count = queues.len();
                queues.clear();
                count
            };
            lock_unpoisoned(&slot.callback).take();
            if released > 0 || queues > 0 {
                debug!(path = %slot.path, released, queues, "Path resources released");
            }
        }

        info!("Path controller shut down");
    }

    fn ensure_configurable(&self, operation: &str) -> DispatchResult<()> {
        let state = self.state();
        if state.accepts_configuration() {
            Ok(())
        } else {
            Err(DispatchError::wrong_state(operation, state))
        }
    }

    /// Add a consumer queue to a path
    ///
    /// No deduplication: attaching the same queue twice makes it receive
    /// every buffer twice.
    pub fn attach_queue(&self, path: OutputPath, queue: Arc<dyn ConsumerQueue>) -> DispatchResult<()> {
        self.ensure_configurable("attach")?;
        let mut queues = lock_unpoisoned(&self.shared.path(path).queues);
        queues.push(queue);
        debug!(%path, attached = queues.len(), "Consumer queue attached");
        Ok(())
    }

    /// Remove the first attachment of `queue`; unknown queues are ignored
    pub fn detach_queue(&self, path: OutputPath, queue: &Arc<dyn ConsumerQueue>) -> DispatchResult<()> {
        self.ensure_configurable("detach")?;
        let mut queues = lock_unpoisoned(&self.shared.path(path).queues);
        let target = Arc::as_ptr(queue) as *const ();
        if let Some(position) = queues
            .iter()
            .position(|attached| Arc::as_ptr(attached) as *const () == target)
        {
            queues.remove(position);
            debug!(%path, attached = queues.len(), "Consumer queue detached");
        }
        Ok(())
    }

    pub fn attached_queues(&self, path: OutputPath) -> usize {
        lock_unpoisoned(&self.shared.path(path).queues).len()
    }

    /// Install the path's buffer callback, replacing any previous one
    pub fn register_buffer_callback(
        &self,
        path: OutputPath,
        callback: Option<BufferCallback>,
    ) -> DispatchResult<()> {
        self.ensure_configurable("register callback")?;
        let callback = callback.ok_or(DispatchError::NullCallback)?;
        let replaced = lock_unpoisoned(&self.shared.path(path).callback)
            .replace(callback)
            .is_some();
        debug!(%path, replaced, "Buffer callback registered");
        Ok(())
    }

    pub fn deregister_buffer_callback(&self, path: OutputPath) -> DispatchResult<()> {
        self.ensure_configurable("deregister callback")?;
        lock_unpoisoned(&self.shared.path(path).callback).take();
        debug!(%path, "Buffer callback deregistered");
        Ok(())
    }

    pub fn has_buffer_callback(&self, path: OutputPath) -> bool {
        lock_unpoisoned(&self.shared.path(path).callback).is_some()
    }

    /// Hand the pipeline a prepared empty buffer
    ///
    /// The returned handle carries one reference that now belongs to the
    /// caller.
    pub fn request_empty_buffer(&self, path: OutputPath) -> DispatchResult<MediaBuffer> {
        let state = self.state();
        if !state.is_running() {
            return Err(DispatchError::wrong_state("request empty buffer", state));
        }
        let slot = self.shared.path(path);
        if slot.pool.is_none() {
            return Err(DispatchError::InvalidParameter(format!(
                "{} path has no buffer pool",
                path
            )));
        }
        let buffer = slot.take_empty().ok_or(DispatchError::NotAvailable)?;
        trace!(%path, index = buffer.index(), "Empty buffer handed out");
        Ok(buffer)
    }

    /// Queue a filled buffer for dispatch on `path`
    ///
    /// The controller takes its own reference; the caller keeps (and must
    /// eventually drop) the one it holds.
    pub fn deliver(&self, path: OutputPath, buffer: &MediaBuffer) -> DispatchResult<()> {
        let state = self.state();
        if !state.is_running() {
            return Err(DispatchError::wrong_state("deliver", state));
        }
        let slot = self.shared.path(path);
        let pool = slot.pool.as_ref().ok_or_else(|| {
            DispatchError::InvalidParameter(format!("{} path has no buffer pool", path))
        })?;
        let owner = buffer.owner().ok_or(DispatchError::NotOwned)?;
        if !owner.same_pool(pool) {
            return Err(DispatchError::WrongHandle(format!(
                "buffer does not belong to the {} path pool",
                path
            )));
        }

        let locked = buffer.locked()?;
        locked.mark_filled()?;
        let now = self.shared.timestamp_us();
        locked.update_metadata(|metadata| {
            if metadata.timestamp_us == 0 {
                metadata.timestamp_us = now;
            }
        })?;

        self.submit(Command::ProcessFullBuffer {
            path,
            buffer: locked,
        })
        .inspect_err(|e| {
            slot.counters.dropped();
            debug!(%path, error = %e, "Frame dropped");
        })
    }

    /// Apply a pipeline notification
    ///
    /// `BufferFull` and `BufferFlushed` transfer the pipeline's reference to
    /// the controller, which releases it once the buffer has been queued (or
    /// immediately, for a flushed or undeliverable buffer).
    pub fn handle_pipeline_event(&self, event: PipelineEvent) -> DispatchResult<()> {
        match event {
            PipelineEvent::BufferFull { path, buffer } => {
                let delivered = self.deliver(path, &buffer);
                let released = buffer.unlock();
                delivered.and(released)
            }
            PipelineEvent::BufferFlushed { path, buffer } => {
                self.shared.path(path).counters.flushed();
                trace!(%path, index = buffer.index(), "Buffer flushed by pipeline");
                buffer.unlock()
            }
            PipelineEvent::BufferDropped { path } => {
                self.shared.path(path).counters.dropped();
                debug!(%path, "Frame dropped by pipeline");
                Ok(())
            }
        }
    }
}

impl Drop for PathController {
    fn drop(&mut self) {
        if lock_unpoisoned(&self.worker).is_some() {
            warn!(state = %self.state(), "Path controller dropped without shutdown");
            self.teardown();
        }
    }
}

impl std::fmt::Debug for PathController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathController")
            .field("state", &self.state())
            .field("pipeline", &self.shared.pipeline.name())
            .field("max_pending_commands", &self.max_pending_commands)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffers::{PictureFormat, PictureKind, PictureLayout, PoolConfig};
    use crate::paths::completion_callback;
    use crate::pipeline::IspPipeline;

    struct StubPipeline;

    impl IspPipeline for StubPipeline {
        fn name(&self) -> &str {
            "stub"
        }
    }

    fn config() -> PathControllerConfig {
        let format = PictureFormat::new(PictureKind::Raw8, PictureLayout::Interleaved, 8, 8);
        let pool = MediaBufferPool::new(PoolConfig::new(4, format)).unwrap();
        PathControllerConfig::default()
            .with_pool(OutputPath::Main, pool)
            .with_completion(completion_callback(|_| {}))
            .with_pipeline(PipelineHandle::new(StubPipeline))
    }

    #[test]
    fn test_config_validation_order() {
        let mut missing = config();
        missing.main_pool = None;
        missing.completion = None;
        assert!(matches!(
            missing.validate(),
            Err(DispatchError::InvalidParameter(_))
        ));

        let mut no_pipeline = config();
        no_pipeline.pipeline = None;
        no_pipeline.max_pending_commands = 0;
        assert!(matches!(
            no_pipeline.validate(),
            Err(DispatchError::WrongHandle(_))
        ));

        assert!(matches!(
            config().with_max_pending_commands(0).validate(),
            Err(DispatchError::OutOfRange(_))
        ));
        assert!(matches!(
            config().with_num_buffers(OutputPath::Main, 5).validate(),
            Err(DispatchError::OutOfRange(_))
        ));
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_detach_removes_first_match_only() {
        let controller = PathController::new(config()).unwrap();
        let (tx, _rx) = std::sync::mpsc::sync_channel::<LockedBuffer>(1);
        let queue: Arc<dyn ConsumerQueue> = Arc::new(tx);

        controller.attach_queue(OutputPath::Main, Arc::clone(&queue)).unwrap();
        controller.attach_queue(OutputPath::Main, Arc::clone(&queue)).unwrap();
        assert_eq!(controller.attached_queues(OutputPath::Main), 2);
        assert_eq!(controller.attached_queues(OutputPath::SelfPath), 0);

        controller.detach_queue(OutputPath::Main, &queue).unwrap();
        assert_eq!(controller.attached_queues(OutputPath::Main), 1);

        controller.shutdown().unwrap();
        assert_eq!(controller.attached_queues(OutputPath::Main), 0);
    }

    #[test]
    fn test_deliver_requires_running() {
        let controller = PathController::new(config()).unwrap();
        let buffer = controller.pool(OutputPath::Main).unwrap().acquire().unwrap();
        assert!(matches!(
            controller.deliver(OutputPath::Main, &buffer),
            Err(DispatchError::WrongState(_))
        ));
        assert_eq!(buffer.ref_count(), 1);
        buffer.unlock().unwrap();
        controller.shutdown().unwrap();
    }
}
