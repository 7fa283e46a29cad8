// SPDX-License-Identifier: GPL-3.0-only

//! Error types for buffer pools and path controllers

use std::fmt;

/// Result type alias using DispatchError
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors reported by the buffer pool and the path controller
///
/// Precondition violations are reported synchronously by the call that
/// detected them. Failures of queued commands are only ever reported through
/// the controller's completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Malformed or missing required configuration
    InvalidParameter(String),
    /// Missing, dead or foreign handle
    WrongHandle(String),
    /// Operation not valid in the current lifecycle state
    WrongState(String),
    /// Numeric configuration outside the allowed bounds
    OutOfRange(String),
    /// Allocation of an internal resource failed
    OutOfMemory(String),
    /// Lock/unlock on a buffer that is not currently issued
    NotOwned,
    /// No free buffer left in the pool
    PoolExhausted,
    /// Callback registration without a callback
    NullCallback,
    /// The bounded command queue has no room left
    QueueFull,
    /// A queued command was discarded during shutdown
    Canceled,
    /// No prepared buffer is available for the request
    NotAvailable,
    /// The pool still has buffers in use
    PoolBusy(usize),
}

impl DispatchError {
    pub(crate) fn wrong_state(operation: &str, state: impl fmt::Display) -> Self {
        DispatchError::WrongState(format!("{} not allowed in state {}", operation, state))
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            DispatchError::WrongHandle(msg) => write!(f, "Wrong handle: {}", msg),
            DispatchError::WrongState(msg) => write!(f, "Wrong state: {}", msg),
            DispatchError::OutOfRange(msg) => write!(f, "Out of range: {}", msg),
            DispatchError::OutOfMemory(msg) => write!(f, "Out of memory: {}", msg),
            DispatchError::NotOwned => write!(f, "Buffer is not owned by a pool"),
            DispatchError::PoolExhausted => write!(f, "No free buffer available"),
            DispatchError::NullCallback => write!(f, "No callback given"),
            DispatchError::QueueFull => write!(f, "Command queue is full"),
            DispatchError::Canceled => write!(f, "Command canceled"),
            DispatchError::NotAvailable => write!(f, "No buffer available"),
            DispatchError::PoolBusy(in_use) => write!(f, "{} buffers still in use", in_use),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<std::collections::TryReserveError> for DispatchError {
    fn from(err: std::collections::TryReserveError) -> Self {
        DispatchError::OutOfMemory(err.to_string())
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(err: std::io::Error) -> Self {
        DispatchError::OutOfMemory(err.to_string())
    }
}

/// Errors while loading or saving configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Reading or writing the file failed
    Io(std::io::Error),
    /// The file is not valid configuration JSON
    Parse(serde_json::Error),
    /// The configuration parsed but cannot be used
    Invalid(DispatchError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {}", e),
            ConfigError::Parse(e) => write!(f, "Configuration parse error: {}", e),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

impl From<DispatchError> for ConfigError {
    fn from(err: DispatchError) -> Self {
        ConfigError::Invalid(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            DispatchError::PoolBusy(3).to_string(),
            "3 buffers still in use"
        );
        assert_eq!(
            DispatchError::wrong_state("start", "Running").to_string(),
            "Wrong state: start not allowed in state Running"
        );
    }
}
