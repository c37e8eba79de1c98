//! Error types for ringshm.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{what} must be non-negative, got {value}")]
    NegativeSize { what: &'static str, value: i64 },

    #[error("a shared memory segment named {name:?} already exists")]
    AlreadyExists { name: String },

    #[error("Failed to open shared memory segment {name:?}")]
    NotFound { name: String },

    #[error("shared memory segment {name:?} has an incompatible header: {reason}")]
    ChecksumOrVersionMismatch { name: String, reason: String },

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,
}

impl QueueError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    pub fn negative_size(what: &'static str, value: i64) -> Self {
        Self::NegativeSize { what, value }
    }

    /// True for the two capacity signals callers are expected to branch on
    /// with `matches!` rather than treat as a hard failure.
    pub fn is_capacity_signal(&self) -> bool {
        matches!(self, Self::Full | Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_signals_are_distinguishable() {
        assert!(QueueError::Full.is_capacity_signal());
        assert!(QueueError::Empty.is_capacity_signal());
        assert!(!QueueError::invalid_argument("x").is_capacity_signal());
    }

    #[test]
    fn messages_match_contract_substrings() {
        let err = QueueError::invalid_argument("capacity must be a power of two");
        assert!(err.to_string().contains("must be a power of two"));

        let err = QueueError::NotFound { name: "q".into() };
        assert!(err.to_string().contains("Failed to open shared memory"));

        let err = QueueError::AlreadyExists { name: "q".into() };
        assert!(err.to_string().contains("already exists"));
    }
}
