//! Protocol Module
//!
//! Line-oriented, binary-safe wire protocol:
//!
//! ```text
//! SET <key> <ttl_ms> <nbytes>\n<raw-bytes>\n  -> OK | ERR <msg>
//! GET <key>\n                                 -> VALUE <n>\n<raw-bytes> | NOT_FOUND
//! DEL <key>\n                                 -> DELETED <n>
//! STATS\n                                     -> STATS {json}
//! ```

mod command;
mod response;
mod session;

pub use command::Command;
pub use response::Response;
pub use session::Session;
