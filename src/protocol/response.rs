//! Response Encoding
//!
//! Wire form of every reply. Each response ends with a single `\n`.

use bytes::{BufMut, Bytes, BytesMut};

use crate::cache::StatsSnapshot;
use crate::error::CacheError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `OK`
    Stored,
    /// `VALUE <n>\n<bytes>`
    Value(Bytes),
    /// `NOT_FOUND`
    NotFound,
    /// `DELETED <n>`
    Deleted(usize),
    /// `STATS <json>`
    Stats(StatsSnapshot),
    /// `ERR <message>`
    Error(String),
}

impl Response {
    /// Appends the encoded response to `out`.
    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            Response::Stored => out.put_slice(b"OK\n"),
            Response::Value(value) => {
                out.reserve(value.len() + 24);
                out.put_slice(format!("VALUE {}\n", value.len()).as_bytes());
                out.put_slice(value);
                out.put_u8(b'\n');
            }
            Response::NotFound => out.put_slice(b"NOT_FOUND\n"),
            Response::Deleted(n) => out.put_slice(format!("DELETED {}\n", n).as_bytes()),
            Response::Stats(snapshot) => match snapshot.to_json() {
                Ok(json) => out.put_slice(format!("STATS {}\n", json).as_bytes()),
                Err(e) => Response::Error(format!("stats unavailable: {}", e)).encode(out),
            },
            Response::Error(msg) => {
                out.put_slice(b"ERR ");
                // A newline inside the message would split the reply in two
                for b in msg.bytes() {
                    out.put_u8(if b == b'\n' || b == b'\r' { b' ' } else { b });
                }
                out.put_u8(b'\n');
            }
        }
    }
}

impl From<CacheError> for Response {
    fn from(err: CacheError) -> Self {
        Response::Error(err.to_string())
    }
}
