use thiserror::Error;
use crate::types::StreamState;
pub type ScopeResult<T> = Result<T, ScopeError>;
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },
    #[error("frame too long: expected {expected} bytes, got {actual}")]
    FrameTooLong { expected: usize, actual: usize },
    #[error("byte source failed: {0}")]
    Source(#[from] std::io::Error),
    #[error("source aborted the read")]
    Cancelled,
    #[error("read loop already started (state {state:?})")]
    AlreadyStarted { state: StreamState },
    #[error("channel index {0} out of range")]
    InvalidChannel(usize),
    #[error("window capacity must be greater than zero")]
    InvalidCapacity,
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}
impl ScopeError {
    /// Fatal errors end the read loop; per-frame length errors do not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ScopeError::FrameTooShort { .. } | ScopeError::FrameTooLong { .. }
        )
    }
}
impl From<tokio_serial::Error> for ScopeError {
    fn from(value: tokio_serial::Error) -> Self {
        ScopeError::Serial(value.to_string())
    }
}
impl From<serde_json::Error> for ScopeError {
    fn from(value: serde_json::Error) -> Self {
        ScopeError::Config(value.to_string())
    }
}
