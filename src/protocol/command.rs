//! Command Parsing
//!
//! Turns one command line (without its `\n`) into a [`Command`].
//!
//! ```text
//! SET <key> <ttl_ms> <nbytes>
//! GET <key>
//! DEL <key>
//! STATS
//! ```

use bytes::Bytes;

use crate::error::{CacheError, Result};

/// A parsed request header.
///
/// `Set` only describes the payload that follows; the value itself is framed
/// by the [`Session`](crate::protocol::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: Bytes, ttl_ms: u64, nbytes: usize },
    Get { key: Bytes },
    Del { key: Bytes },
    Stats,
}

impl Command {
    /// Parses a command line.
    ///
    /// Tokens are separated by ASCII whitespace and the command name is
    /// case-insensitive. Returns `Ok(None)` for a blank line. Keys are sliced
    /// out of `line` without copying.
    pub fn parse(line: &Bytes) -> Result<Option<Command>> {
        let mut tokens = line
            .split(|b| b.is_ascii_whitespace())
            .filter(|token| !token.is_empty());

        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<&[u8]> = tokens.collect();

        let command = if name.eq_ignore_ascii_case(b"SET") {
            let [key, ttl_ms, nbytes] = expect_args::<3>("SET", &args)?;
            Command::Set {
                key: line.slice_ref(key),
                ttl_ms: parse_number(ttl_ms, "ttl_ms")?,
                nbytes: parse_number(nbytes, "nbytes")?,
            }
        } else if name.eq_ignore_ascii_case(b"GET") {
            let [key] = expect_args::<1>("GET", &args)?;
            Command::Get {
                key: line.slice_ref(key),
            }
        } else if name.eq_ignore_ascii_case(b"DEL") {
            let [key] = expect_args::<1>("DEL", &args)?;
            Command::Del {
                key: line.slice_ref(key),
            }
        } else if name.eq_ignore_ascii_case(b"STATS") {
            expect_args::<0>("STATS", &args)?;
            Command::Stats
        } else {
            return Err(CacheError::protocol(format!(
                "unknown command '{}'",
                String::from_utf8_lossy(name)
            )));
        };

        Ok(Some(command))
    }

    /// Upper-case command name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::Stats => "STATS",
        }
    }
}

fn expect_args<'a, const N: usize>(name: &str, args: &[&'a [u8]]) -> Result<[&'a [u8]; N]> {
    <[&[u8]; N]>::try_from(args).map_err(|_| {
        CacheError::protocol(format!(
            "wrong number of arguments for '{}': expected {}, got {}",
            name,
            N,
            args.len()
        ))
    })
}

fn parse_number<T: std::str::FromStr>(token: &[u8], what: &str) -> Result<T> {
    std::str::from_utf8(token)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            CacheError::protocol(format!(
                "invalid {} '{}': expected a non-negative integer",
                what,
                String::from_utf8_lossy(token)
            ))
        })
}
