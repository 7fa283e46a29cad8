// SPDX-License-Identifier: GPL-3.0-only

//! Commands exchanged between the controller API and its worker

use super::OutputPath;
use crate::buffers::LockedBuffer;
use crate::errors::{DispatchError, DispatchResult};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Lifecycle commands that report back through the completion callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Stop,
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandKind::Start => write!(f, "start"),
            CommandKind::Stop => write!(f, "stop"),
        }
    }
}

/// Outcome of a start or stop, handed to the completion callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub command: CommandKind,
    pub result: DispatchResult<()>,
}

/// Invoked on the worker thread, exactly once per submitted start or stop
pub type CompletionCallback = Arc<dyn Fn(&Completion) + Send + Sync>;

/// Wrap a closure as a [`CompletionCallback`]
pub fn completion_callback<F>(f: F) -> CompletionCallback
where
    F: Fn(&Completion) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) enum Command {
    Start(oneshot::Sender<DispatchResult<()>>),
    Stop(oneshot::Sender<DispatchResult<()>>),
    ProcessFullBuffer {
        path: OutputPath,
        buffer: LockedBuffer,
    },
    Shutdown,
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Stop(_) => "stop",
            Command::ProcessFullBuffer { .. } => "process-full-buffer",
            Command::Shutdown => "shutdown",
        }
    }
}

/// Handle to a submitted start or stop
///
/// The completion callback fires regardless of whether this token is kept.
/// The token only offers a second way to observe the same result.
#[derive(Debug)]
pub struct Pending {
    command: CommandKind,
    receiver: oneshot::Receiver<DispatchResult<()>>,
}

impl Pending {
    pub(crate) fn new(command: CommandKind) -> (Self, oneshot::Sender<DispatchResult<()>>) {
        let (sender, receiver) = oneshot::channel();
        (Self { command, receiver }, sender)
    }

    pub fn command(&self) -> CommandKind {
        self.command
    }

    /// Wait for the worker to apply the command
    pub async fn completion(self) -> DispatchResult<()> {
        self.receiver.await.unwrap_or(Err(DispatchError::Canceled))
    }

    /// Block the current thread until the worker applied the command
    ///
    /// Must not be called from within an async runtime.
    pub fn wait(self) -> DispatchResult<()> {
        self.receiver
            .blocking_recv()
            .unwrap_or(Err(DispatchError::Canceled))
    }

    /// The result if the command was already applied
    pub fn try_result(&mut self) -> Option<DispatchResult<()>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DispatchError::Canceled)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_reports_sent_result() {
        let (pending, sender) = Pending::new(CommandKind::Start);
        assert_eq!(pending.command(), CommandKind::Start);
        sender.send(Ok(())).unwrap();
        assert_eq!(pending.wait(), Ok(()));
    }

    #[test]
    fn test_pending_canceled_when_sender_dropped() {
        let (mut pending, sender) = Pending::new(CommandKind::Stop);
        assert_eq!(pending.try_result(), None);
        drop(sender);
        assert_eq!(pending.try_result(), Some(Err(DispatchError::Canceled)));
    }

    #[tokio::test]
    async fn test_pending_completion_async() {
        let (pending, sender) = Pending::new(CommandKind::Start);
        sender
            .send(Err(DispatchError::WrongState("busy".into())))
            .unwrap();
        assert!(matches!(
            pending.completion().await,
            Err(DispatchError::WrongState(_))
        ));
    }
}
