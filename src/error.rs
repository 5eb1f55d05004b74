//! Error types for the cache server
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine and the wire protocol.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A caller-supplied argument was rejected (empty key)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed command line or payload framing
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transport failure on a client connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Shorthand for a protocol syntax error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        CacheError::Protocol(msg.into())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache server.
pub type Result<T> = std::result::Result<T, CacheError>;
