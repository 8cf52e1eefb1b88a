//! Uniform byte-stream transport over plaintext TCP or TLS-on-TCP
//! (spec.md §4.B).
//!
//! One connect call picks plaintext or TLS based on the URL's protocol;
//! callers afterwards only see `send_all`/`recv`/`close` regardless of which
//! one they got. TLS accepts the server certificate without path validation
//! (spec.md §4.B: explicit compatibility choice, not an oversight).

use crate::error::DownloadError;
use native_tls::TlsConnector;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Read/write timeout applied to every connection (spec.md §4.B).
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the initial TCP connect.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

enum Stream {
    Plain(TcpStream),
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

/// A connected transport: plaintext TCP or TLS-on-TCP, behind one interface.
pub struct Transport {
    stream: Stream,
}

impl Transport {
    /// Connects to `host:port`. When `tls` is true, wraps the TCP stream in
    /// a TLS client session with SNI set to `host`, accepting whatever
    /// certificate the server presents.
    pub fn connect(host: &str, port: u16, tls: bool) -> Result<Self, DownloadError> {
        let addr = format!("{host}:{port}");
        let mut addrs = addr.to_socket_addrs().map_err(|e| DownloadError::Dns {
            host: host.to_string(),
            source: e,
        })?;
        let sock_addr = addrs
            .next()
            .ok_or_else(|| DownloadError::Dns {
                host: host.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no addresses resolved",
                ),
            })?;

        let tcp = TcpStream::connect_timeout(&sock_addr, CONNECT_TIMEOUT)
            .map_err(|e| DownloadError::Connection(format!("{host}:{port}: {e}")))?;
        tcp.set_read_timeout(Some(IO_TIMEOUT)).ok();
        tcp.set_write_timeout(Some(IO_TIMEOUT)).ok();
        tcp.set_nodelay(true).ok();

        let stream = if tls {
            // spec.md §4.B: accept the server certificate without path
            // validation (self-signed-server compatibility is explicit;
            // deployers wanting strict validation configure their own
            // TLS context ahead of this one).
            let connector = TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| DownloadError::Tls(format!("build connector: {e}")))?;
            let tls_stream = connector
                .connect(host, tcp)
                .map_err(|e| DownloadError::Tls(format!("handshake with {host}: {e}")))?;
            Stream::Tls(Box::new(tls_stream))
        } else {
            Stream::Plain(tcp)
        };

        Ok(Transport { stream })
    }

    /// Writes all of `data`, retrying short writes until everything is
    /// written or an error occurs.
    pub fn send_all(&mut self, data: &[u8]) -> Result<(), DownloadError> {
        let result = match &mut self.stream {
            Stream::Plain(s) => s.write_all(data),
            Stream::Tls(s) => s.write_all(data),
        };
        result.map_err(|e| DownloadError::HttpRequest(e.to_string()))
    }

    /// Reads into `buf`, returning the number of bytes read. Returns `Ok(0)`
    /// exactly on an orderly peer close.
    pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize, DownloadError> {
        let result = match &mut self.stream {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        };
        result.map_err(|e| DownloadError::Network(e.to_string()))
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.stream {
            Stream::Plain(s) => s.read(buf),
            Stream::Tls(s) => s.read(buf),
        }
    }
}

// `Transport` is closed implicitly on drop (the underlying `TcpStream`/
// `TlsStream` close their file descriptor); there is no explicit `close`
// operation to call because every exit path (success, error, cancel) drops
// the owning scope's `Transport` value.
