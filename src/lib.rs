//! Mini Cache - A lightweight in-memory key-value cache server
//!
//! Byte-bounded LRU eviction, lazy TTL expiration and a binary-safe,
//! line-oriented TCP protocol.

pub mod cache;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

pub use cache::{Cache, Clock, ManualClock, MonotonicClock, StatsSnapshot};
pub use config::Config;
pub use error::{CacheError, Result};
pub use protocol::{Command, Response, Session};
