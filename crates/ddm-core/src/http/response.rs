//! HTTP/1.1 response line/header parsing over a read-ahead buffer
//! (spec.md §3 Read-ahead buffer, §4.C HTTP response parser).

use crate::error::DownloadError;
use crate::transport::Transport;

/// Fixed capacity for the read-ahead buffer (spec.md §3).
pub const BUFFER_CAPACITY: usize = 8192;

/// Parsed HTTP/1.1 response metadata (spec.md §3 Response record).
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub status_code: u16,
    pub status_message: String,
    /// -1 when absent/unknown.
    pub content_length: i64,
    pub content_type: Option<String>,
    pub server: Option<String>,
    pub transfer_encoding: Option<String>,
    pub chunked: bool,
    pub connection_close: bool,
    pub accept_ranges: Option<String>,
    pub content_range: Option<String>,
    pub location: Option<String>,
    pub cookies: Option<String>,
    /// Not in spec.md's recognized-header list, but captured as an expansion
    /// (SPEC_FULL.md §4) so the caller can derive a filename without a
    /// second round trip.
    pub content_disposition: Option<String>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status_code)
    }

    pub fn accepts_byte_ranges(&self) -> bool {
        self.accept_ranges
            .as_deref()
            .map(|v| v.to_ascii_lowercase().contains("bytes"))
            .unwrap_or(false)
    }
}

/// Fixed-capacity staging area for bytes read from the transport that
/// haven't yet been consumed by the header parser or body sink
/// (spec.md §3 invariants: `0 <= pos <= len <= CAP`).
pub struct ReadAheadBuffer {
    data: Vec<u8>,
    len: usize,
    pos: usize,
}

impl ReadAheadBuffer {
    pub fn new() -> Self {
        ReadAheadBuffer {
            data: vec![0u8; BUFFER_CAPACITY],
            len: 0,
            pos: 0,
        }
    }

    /// The unconsumed region `data[pos..len]`.
    pub fn unconsumed(&self) -> &[u8] {
        &self.data[self.pos..self.len]
    }

    /// Marks `n` bytes of the unconsumed region as consumed.
    pub fn consume(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.len);
    }

    fn compact(&mut self) {
        if self.pos == 0 {
            return;
        }
        self.data.copy_within(self.pos..self.len, 0);
        self.len -= self.pos;
        self.pos = 0;
    }

    /// Reads more bytes from the transport into the buffer. Returns the
    /// number of bytes newly read (0 on orderly peer close).
    fn fill(&mut self, transport: &mut Transport) -> Result<usize, DownloadError> {
        if self.len == self.data.len() {
            self.compact();
            if self.len == self.data.len() {
                return Err(DownloadError::HttpResponse(
                    "ProtocolTooLong: read-ahead buffer full before a line terminator".into(),
                ));
            }
        }
        let n = transport.recv(&mut self.data[self.len..])?;
        self.len += n;
        Ok(n)
    }

    /// Reads one line ending in `\r\n` (tolerating a bare `\n`), advancing
    /// `pos` past it. Returns `None` on a clean peer close with no further
    /// buffered data. When the peer closes mid-line, the remaining buffered
    /// bytes are returned as the last line (spec.md §4.C).
    fn read_line(&mut self, transport: &mut Transport) -> Result<Option<String>, DownloadError> {
        loop {
            if let Some(rel) = find_newline(&self.data[self.pos..self.len]) {
                let line_end = self.pos + rel;
                let mut end = line_end;
                if end > self.pos && self.data[end - 1] == b'\r' {
                    end -= 1;
                }
                let line = String::from_utf8_lossy(&self.data[self.pos..end]).into_owned();
                self.pos = line_end + 1;
                return Ok(Some(line));
            }

            let n = self.fill(transport)?;
            if n == 0 {
                if self.pos < self.len {
                    let line = String::from_utf8_lossy(&self.data[self.pos..self.len]).into_owned();
                    self.pos = self.len;
                    return Ok(Some(line));
                }
                return Ok(None);
            }
        }
    }
}

impl Default for ReadAheadBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the index just past the end of the first line terminator
/// (`\n`, tolerating a preceding `\r`) in `data`. Returns the index of the
/// `\n` itself (relative to `data`'s start), or `None` if not found.
fn find_newline(data: &[u8]) -> Option<usize> {
    data.iter().position(|&b| b == b'\n')
}

/// Parses a status line + headers from `buf`/`transport`
/// (spec.md §4.C state machine: `StatusLine -> Headers -> Complete|Error`).
///
/// `status_code` is guaranteed set before any body byte is consumed: the
/// function only returns once the blank line terminating headers has been
/// seen (or the connection fails/closes first, which is an error here since
/// a response without a status line is incomplete).
pub fn parse_response(
    buf: &mut ReadAheadBuffer,
    transport: &mut Transport,
) -> Result<Response, DownloadError> {
    let status_line = buf
        .read_line(transport)?
        .ok_or_else(|| DownloadError::HttpResponse("connection closed before status line".into()))?;

    let mut response = parse_status_line(&status_line)?;

    loop {
        let line = buf.read_line(transport)?.unwrap_or_default();
        if line.is_empty() {
            break;
        }
        apply_header(&mut response, &line);
    }

    Ok(response)
}

fn parse_status_line(line: &str) -> Result<Response, DownloadError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts
        .next()
        .ok_or_else(|| DownloadError::HttpResponse("empty status line".into()))?;
    if !version.starts_with("HTTP/") {
        return Err(DownloadError::HttpResponse(format!(
            "not an HTTP status line: {line}"
        )));
    }
    let code_str = parts
        .next()
        .ok_or_else(|| DownloadError::HttpResponse("missing status code".into()))?;
    let status_code: u16 = code_str
        .parse()
        .map_err(|_| DownloadError::HttpResponse(format!("non-numeric status code: {code_str}")))?;
    let status_message = parts.next().unwrap_or("OK").trim().to_string();
    let status_message = if status_message.is_empty() {
        "OK".to_string()
    } else {
        status_message
    };

    Ok(Response {
        status_code,
        status_message,
        content_length: -1,
        ..Default::default()
    })
}

fn apply_header(response: &mut Response, line: &str) {
    let Some((name, value)) = line.split_once(':') else {
        return;
    };
    let name = name.trim();
    let value = value.trim_start().trim_end_matches('\r').trim_end();

    if name.eq_ignore_ascii_case("content-length") {
        if let Ok(n) = value.parse::<i64>() {
            if n >= 0 {
                response.content_length = n;
            }
        }
    } else if name.eq_ignore_ascii_case("content-type") {
        response.content_type = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("transfer-encoding") {
        response.chunked |= value.to_ascii_lowercase().contains("chunked");
        response.transfer_encoding = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("connection") {
        response.connection_close |= value.eq_ignore_ascii_case("close");
    } else if name.eq_ignore_ascii_case("location") {
        response.location = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("server") {
        response.server = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("set-cookie") {
        match &mut response.cookies {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(value);
            }
            None => response.cookies = Some(value.to_string()),
        }
    } else if name.eq_ignore_ascii_case("accept-ranges") {
        response.accept_ranges = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("content-range") {
        response.content_range = Some(value.to_string());
    } else if name.eq_ignore_ascii_case("content-disposition") {
        response.content_disposition = Some(value.to_string());
    }
}
