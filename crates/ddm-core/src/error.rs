//! Error kinds shared across the download engine.
//!
//! Mirrors the small, closed set of failure categories the CLI boundary maps
//! to negative exit codes. Internal plumbing mostly threads `anyhow::Result`
//! (propagating rich context); `DownloadError` is the tagged type callers
//! pattern-match on at the process boundary.

use thiserror::Error;

/// A failure category for a download attempt.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("invalid URL: {0}")]
    UrlParse(String),

    #[error("DNS resolution failed for {host}: {source}")]
    Dns {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("TLS handshake failed: {0}")]
    Tls(String),

    #[error("failed to send HTTP request: {0}")]
    HttpRequest(String),

    #[error("HTTP response error: {0}")]
    HttpResponse(String),

    #[error("failed to open file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write file {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("memory allocation failed: {0}")]
    Memory(String),
}

impl DownloadError {
    /// The exit code this error maps to at the CLI boundary (spec.md §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            DownloadError::UrlParse(_) => -1,
            DownloadError::Dns { .. } => -2,
            DownloadError::Connection(_) => -3,
            DownloadError::HttpRequest(_) => -4,
            DownloadError::HttpResponse(_) => -5,
            DownloadError::FileOpen { .. } => -6,
            DownloadError::FileWrite { .. } => -7,
            DownloadError::Network(_) => -8,
            DownloadError::Memory(_) => -9,
            DownloadError::Tls(_) => -3,
        }
    }
}

/// Walks an `anyhow::Error`'s chain looking for a `DownloadError`, returning
/// its exit code, or a generic failure code (-1) if none is found.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DownloadError>() {
            return e.exit_code();
        }
    }
    -1
}
