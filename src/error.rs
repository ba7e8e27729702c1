//! Error types and handling for the minfas channel.

use thiserror::Error;

/// Result type alias for channel operations
pub type Result<T> = std::result::Result<T, MinfasError>;

/// Main error type for the minfas library
#[derive(Error, Debug)]
pub enum MinfasError {
    /// I/O errors from file or mapping operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A generator was started before the supervisor created the channel
    #[error("supervisor has to be started first")]
    SupervisorNotRunning,

    /// A named kernel object is still bound from an unclean shutdown
    #[error("channel object {name} already exists (stale shutdown? clean up and retry)")]
    StaleChannel {
        /// Name of the kernel object that is still bound
        name: String,
    },

    /// Shared-memory creation, sizing, or mapping failures
    #[error("shared memory error: {message}")]
    SharedMemory {
        /// Error message describing the shared-memory issue
        message: String,
    },

    /// Named-semaphore failures other than signal interruption
    #[error("semaphore error: {message}")]
    Semaphore {
        /// Error message describing the semaphore issue
        message: String,
    },

    /// A blocking wait was interrupted by a signal; treated as shutdown
    #[error("wait interrupted by signal")]
    WaitInterrupted,

    /// The terminate flag was raised while an operation was in flight
    #[error("channel is shutting down")]
    Terminated,

    /// An edge token on the generator command line could not be parsed
    #[error("invalid edge '{token}': {reason}")]
    MalformedEdge {
        /// The offending command-line token
        token: String,
        /// Reason why the token is invalid
        reason: String,
    },

    /// Invalid configuration parameter
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Signal handler installation errors
    #[error("signal handler error: {0}")]
    Signal(#[from] nix::Error),
}

impl MinfasError {
    /// Create a new shared-memory error
    pub fn shared_memory(message: impl Into<String>) -> Self {
        Self::SharedMemory {
            message: message.into(),
        }
    }

    /// Create a new semaphore error
    pub fn semaphore(message: impl Into<String>) -> Self {
        Self::Semaphore {
            message: message.into(),
        }
    }

    /// Create a new malformed-edge error
    pub fn malformed_edge(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedEdge {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Check if this error is a cooperative-shutdown request rather than a
    /// failure. Both loops exit cleanly on these.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::WaitInterrupted | Self::Terminated)
    }

    /// Check if this error is a startup collision with stale kernel objects
    pub fn is_stale_channel(&self) -> bool {
        matches!(self, Self::StaleChannel { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MinfasError::semaphore("test message");
        assert!(matches!(err, MinfasError::Semaphore { .. }));
        assert!(!err.is_shutdown());
    }

    #[test]
    fn test_shutdown_classification() {
        assert!(MinfasError::WaitInterrupted.is_shutdown());
        assert!(MinfasError::Terminated.is_shutdown());
        assert!(!MinfasError::SupervisorNotRunning.is_shutdown());
        assert!(!MinfasError::shared_memory("mapping failed").is_shutdown());
    }

    #[test]
    fn test_stale_classification() {
        let err = MinfasError::StaleChannel {
            name: "/minfas_shm".to_owned(),
        };
        assert!(err.is_stale_channel());
        assert!(!MinfasError::SupervisorNotRunning.is_stale_channel());
    }
}
