// SPDX-License-Identifier: GPL-3.0-only

//! Path controller lifecycle state

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a path controller
///
/// ```text
///  Invalid ──init──► Initializing ──start──► Running ──stop──► Stopped
///                        │                      ▲                │ │
///                        │                      └─────start──────┘ │
///                        └────────shutdown──► Destroyed ◄─shutdown─┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Not constructed, or the worker has exited
    Invalid,
    /// Constructed, worker running, nothing started yet
    Initializing,
    /// Dispatching buffers
    Running,
    /// Worker alive but not dispatching
    Stopped,
    /// Torn down; no further operation is accepted
    Destroyed,
}

impl ControllerState {
    /// Attach/detach and callback registration are accepted
    pub fn accepts_configuration(&self) -> bool {
        matches!(
            self,
            ControllerState::Initializing | ControllerState::Running | ControllerState::Stopped
        )
    }

    pub fn can_start(&self) -> bool {
        matches!(self, ControllerState::Initializing | ControllerState::Stopped)
    }

    pub fn can_stop(&self) -> bool {
        matches!(self, ControllerState::Running | ControllerState::Stopped)
    }

    pub fn can_shutdown(&self) -> bool {
        matches!(self, ControllerState::Initializing | ControllerState::Stopped)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ControllerState::Running)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ControllerState::Invalid => "Invalid",
            ControllerState::Initializing => "Initializing",
            ControllerState::Running => "Running",
            ControllerState::Stopped => "Stopped",
            ControllerState::Destroyed => "Destroyed",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            ControllerState::Invalid => 0,
            ControllerState::Initializing => 1,
            ControllerState::Running => 2,
            ControllerState::Stopped => 3,
            ControllerState::Destroyed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ControllerState::Initializing,
            2 => ControllerState::Running,
            3 => ControllerState::Stopped,
            4 => ControllerState::Destroyed,
            _ => ControllerState::Invalid,
        }
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// State shared between the API and the worker
///
/// Readable from any thread; written by the worker while it runs and by the
/// controller only before the worker starts and after it has exited.
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new(state: ControllerState) -> Self {
        Self(AtomicU8::new(state.to_u8()))
    }

    pub(crate) fn get(&self) -> ControllerState {
        ControllerState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, state: ControllerState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_stop_sources() {
        assert!(ControllerState::Initializing.can_start());
        assert!(ControllerState::Stopped.can_start());
        assert!(!ControllerState::Running.can_start());
        assert!(!ControllerState::Destroyed.can_start());

        assert!(ControllerState::Running.can_stop());
        assert!(ControllerState::Stopped.can_stop());
        assert!(!ControllerState::Initializing.can_stop());
    }

    #[test]
    fn test_shutdown_requires_idle() {
        assert!(ControllerState::Initializing.can_shutdown());
        assert!(ControllerState::Stopped.can_shutdown());
        assert!(!ControllerState::Running.can_shutdown());
        assert!(!ControllerState::Invalid.can_shutdown());
    }

    #[test]
    fn test_configuration_states() {
        assert!(ControllerState::Running.accepts_configuration());
        assert!(!ControllerState::Invalid.accepts_configuration());
        assert!(!ControllerState::Destroyed.accepts_configuration());
    }

    #[test]
    fn test_state_cell_roundtrip() {
        let cell = StateCell::new(ControllerState::Invalid);
        for state in [
            ControllerState::Initializing,
            ControllerState::Running,
            ControllerState::Stopped,
            ControllerState::Destroyed,
            ControllerState::Invalid,
        ] {
            cell.set(state);
            assert_eq!(cell.get(), state);
        }
    }
}
