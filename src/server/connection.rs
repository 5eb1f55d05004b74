//! Connection Driver
//!
//! Pumps bytes between one client stream and its [`Session`].

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::cache::Cache;
use crate::error::Result;
use crate::protocol::Session;

/// Serves one client until it closes the stream.
///
/// Each read appends at most `read_buffer_size` bytes to the session buffer;
/// every response produced by that read is written back with a single write.
/// End of stream returns `Ok(())`, discarding any partial command. I/O errors
/// are returned to the caller and affect only this connection.
pub async fn handle_connection<S>(mut stream: S, cache: Cache, read_buffer_size: usize) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read_buffer_size = read_buffer_size.max(1);
    let mut session = Session::new(cache);
    let mut out = BytesMut::with_capacity(read_buffer_size);

    loop {
        let buffer = session.read_buffer();
        buffer.reserve(read_buffer_size);
        let n = (&mut stream)
            .take(read_buffer_size as u64)
            .read_buf(buffer)
            .await?;

        if n == 0 {
            if !session.is_idle() {
                debug!(
                    state = session.state_name(),
                    buffered = session.buffered(),
                    "discarding partial command on close"
                );
            }
            return Ok(());
        }

        if session.process(&mut out) > 0 {
            stream.write_all(&out).await?;
            stream.flush().await?;
            out.clear();
        }
    }
}
