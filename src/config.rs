//! Configuration Module
//!
//! Server configuration from command-line flags, falling back to environment
//! variables and then to built-in defaults.

use clap::Parser;

/// Server configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "mini_cache", about = "In-memory key-value cache server", version)]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "CACHE_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port to listen on
    #[arg(long, env = "CACHE_PORT", default_value_t = 9000)]
    pub port: u16,

    /// Cache capacity in MiB of keys plus values
    #[arg(long, env = "CACHE_CAPACITY_MB", default_value_t = 64)]
    pub capacity_mb: usize,

    /// Maximum bytes read from a socket at a time
    #[arg(long, env = "CACHE_READ_BUFFER_SIZE", default_value_t = 65536)]
    pub read_buffer_size: usize,
}

impl Config {
    pub fn capacity_bytes(&self) -> usize {
        self.capacity_mb.saturating_mul(1024 * 1024)
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            capacity_mb: 64,
            read_buffer_size: 65536,
        }
    }
}
