//! Server Module
//!
//! Tokio TCP front end for the cache.

mod connection;
mod listener;

pub use connection::handle_connection;
pub use listener::{run, serve};
