//! Response body draining (spec.md §4.E): first flush whatever the
//! read-ahead buffer already holds, then keep reading from the transport
//! until the expected length is reached or, for length-unknown bodies, until
//! the peer closes the connection.

use crate::error::DownloadError;
use crate::http::ReadAheadBuffer;
use crate::transport::Transport;
use std::io::Write;

/// Drains a response body of known length into `sink`, calling `on_chunk`
/// with the number of bytes written after each write. Returns an error if
/// the connection closes before `expected_len` bytes have been delivered.
pub fn drain_known_length<W: Write>(
    buf: &mut ReadAheadBuffer,
    transport: &mut Transport,
    sink: &mut W,
    expected_len: u64,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64, DownloadError> {
    let mut written: u64 = 0;

    let residual = buf.unconsumed();
    if !residual.is_empty() {
        let take = (residual.len() as u64).min(expected_len) as usize;
        sink.write_all(&residual[..take])
            .map_err(|e| DownloadError::FileWrite {
                path: "<sink>".to_string(),
                source: e,
            })?;
        buf.consume(take);
        written += take as u64;
        on_chunk(written);
    }

    let mut chunk = [0u8; 65536];
    while written < expected_len {
        let remaining = expected_len - written;
        let want = (chunk.len() as u64).min(remaining) as usize;
        let n = transport.recv(&mut chunk[..want])?;
        if n == 0 {
            return Err(DownloadError::Network(format!(
                "connection closed after {written} of {expected_len} bytes"
            )));
        }
        sink.write_all(&chunk[..n])
            .map_err(|e| DownloadError::FileWrite {
                path: "<sink>".to_string(),
                source: e,
            })?;
        written += n as u64;
        on_chunk(written);
    }

    Ok(written)
}

/// Drains a response body whose length isn't known in advance, reading
/// until the peer closes the connection (spec.md §4.E close-delimited
/// framing).
pub fn drain_until_close<W: Write>(
    buf: &mut ReadAheadBuffer,
    transport: &mut Transport,
    sink: &mut W,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64, DownloadError> {
    let mut written: u64 = 0;

    let residual = buf.unconsumed();
    if !residual.is_empty() {
        sink.write_all(residual).map_err(|e| DownloadError::FileWrite {
            path: "<sink>".to_string(),
            source: e,
        })?;
        written += residual.len() as u64;
        let n = residual.len();
        buf.consume(n);
        on_chunk(written);
    }

    let mut chunk = [0u8; 65536];
    loop {
        let n = transport.recv(&mut chunk)?;
        if n == 0 {
            break;
        }
        sink.write_all(&chunk[..n])
            .map_err(|e| DownloadError::FileWrite {
                path: "<sink>".to_string(),
                source: e,
            })?;
        written += n as u64;
        on_chunk(written);
    }

    Ok(written)
}
