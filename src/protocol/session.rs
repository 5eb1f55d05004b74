//! Protocol Session
//!
//! Per-connection state machine. The session owns the input buffer and only
//! ever inspects bytes that are already buffered; when a unit is incomplete it
//! returns so the caller can read more. Payload bytes are consumed by count
//! and never scanned, which keeps values binary-safe.

use std::mem;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tracing::debug;

use crate::cache::Cache;
use crate::error::CacheError;
use crate::protocol::{Command, Response};

#[derive(Debug)]
enum State {
    AwaitingCommandLine,
    AwaitingPayload {
        key: Bytes,
        ttl_ms: u64,
        nbytes: usize,
    },
    AwaitingPayloadTerminator {
        key: Bytes,
        ttl_ms: u64,
        value: Bytes,
    },
}

/// Protocol engine for one connection.
#[derive(Debug)]
pub struct Session {
    cache: Cache,
    buffer: BytesMut,
    state: State,
    // Bytes of the current partial line already searched for `\n`.
    scanned: usize,
}

impl Session {
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            buffer: BytesMut::new(),
            state: State::AwaitingCommandLine,
            scanned: 0,
        }
    }

    /// Input buffer for the connection driver to read into. Call
    /// [`process`](Self::process) after appending.
    pub fn read_buffer(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    /// Appends `data` and processes everything that is now complete.
    pub fn feed(&mut self, data: &[u8], out: &mut BytesMut) -> usize {
        self.buffer.extend_from_slice(data);
        self.process(out)
    }

    /// Handles every complete unit in the buffer, appending encoded responses
    /// to `out` in request order. Returns the number of responses written.
    pub fn process(&mut self, out: &mut BytesMut) -> usize {
        let mut written = 0;
        while let Some(step) = self.step() {
            if let Some(response) = step {
                response.encode(out);
                written += 1;
            }
        }
        written
    }

    /// True when no partial command is buffered.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::AwaitingCommandLine) && self.buffer.is_empty()
    }

    /// Number of unconsumed input bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn state_name(&self) -> &'static str {
        match self.state {
            State::AwaitingCommandLine => "awaiting_command_line",
            State::AwaitingPayload { .. } => "awaiting_payload",
            State::AwaitingPayloadTerminator { .. } => "awaiting_payload_terminator",
        }
    }

    // Outer `None` suspends; inner `None` means progress without a reply.
    fn step(&mut self) -> Option<Option<Response>> {
        match mem::replace(&mut self.state, State::AwaitingCommandLine) {
            State::AwaitingCommandLine => {
                let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') else {
                    self.scanned = self.buffer.len();
                    return None;
                };
                let end = self.scanned + offset;
                self.scanned = 0;

                let mut line = self.buffer.split_to(end + 1).freeze();
                line.truncate(end);
                Some(self.handle_line(&line))
            }
            State::AwaitingPayload { key, ttl_ms, nbytes } => {
                if self.buffer.len() < nbytes {
                    self.state = State::AwaitingPayload { key, ttl_ms, nbytes };
                    return None;
                }
                // Copied out so the stored value does not pin the read buffer
                let value = Bytes::copy_from_slice(&self.buffer[..nbytes]);
                self.buffer.advance(nbytes);
                self.state = State::AwaitingPayloadTerminator { key, ttl_ms, value };
                Some(None)
            }
            State::AwaitingPayloadTerminator { key, ttl_ms, value } => {
                if self.buffer.is_empty() {
                    self.state = State::AwaitingPayloadTerminator { key, ttl_ms, value };
                    return None;
                }
                let terminator = self.buffer.get_u8();
                if terminator != b'\n' {
                    debug!(byte = terminator, "missing terminator after payload");
                    return Some(Some(
                        CacheError::protocol("missing terminator after payload").into(),
                    ));
                }
                let response = match self.cache.put(key, value, Duration::from_millis(ttl_ms)) {
                    Ok(()) => Response::Stored,
                    Err(e) => e.into(),
                };
                Some(Some(response))
            }
        }
    }

    fn handle_line(&mut self, line: &Bytes) -> Option<Response> {
        let command = match Command::parse(line) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(e) => {
                debug!(error = %e, "rejected command line");
                return Some(e.into());
            }
        };
        let name = command.name();

        let response = match command {
            Command::Set { key, ttl_ms, nbytes } => {
                let capacity_bytes = self.cache.capacity_bytes();
                if nbytes > capacity_bytes {
                    debug!(
                        command = name,
                        nbytes, capacity_bytes, "declared payload exceeds cache capacity"
                    );
                }
                // Keys sliced from the line would share the read buffer
                let key = Bytes::copy_from_slice(&key);
                self.state = State::AwaitingPayload { key, ttl_ms, nbytes };
                return None;
            }
            Command::Get { key } => match self.cache.get(&key) {
                Ok(Some(value)) => Response::Value(value),
                Ok(None) => Response::NotFound,
                Err(e) => e.into(),
            },
            Command::Del { key } => match self.cache.delete(&key) {
                Ok(n) => Response::Deleted(n),
                Err(e) => e.into(),
            },
            Command::Stats => Response::Stats(self.cache.stats()),
        };
        Some(response)
    }
}
