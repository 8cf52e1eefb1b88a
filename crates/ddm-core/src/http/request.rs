//! HTTP/1.1 request line/header construction (spec.md §4.D).

use crate::error::DownloadError;

/// Conservative cap on a built request's size; a request exceeding this is
/// almost certainly a caller bug (an absurd number of extra headers) rather
/// than a legitimate request, so building fails loudly instead of sending a
/// runaway byte count to the wire.
pub const MAX_REQUEST_SIZE: usize = 16 * 1024;

/// Matches the original program's default UA exactly (spec.md §6 Wire).
const USER_AGENT: &str = "CHttpDownloader/1.0";

/// Builds a raw HTTP/1.1 request: method line, standard headers, any
/// `extra_headers` (each a full `"Name: value"` line, no trailing CRLF), and
/// the blank line terminating the header block.
pub fn build_request(
    method: &str,
    host: &str,
    path: &str,
    extra_headers: &[String],
) -> Result<Vec<u8>, DownloadError> {
    let mut out = String::new();
    out.push_str(method);
    out.push(' ');
    out.push_str(path);
    out.push_str(" HTTP/1.1\r\n");
    out.push_str("Host: ");
    out.push_str(host);
    out.push_str("\r\n");
    out.push_str("User-Agent: ");
    out.push_str(USER_AGENT);
    out.push_str("\r\n");
    out.push_str("Connection: close\r\n");
    out.push_str("Accept: */*\r\n");
    for header in extra_headers {
        out.push_str(header);
        out.push_str("\r\n");
    }
    out.push_str("\r\n");

    if out.len() > MAX_REQUEST_SIZE {
        return Err(DownloadError::HttpRequest(format!(
            "built request of {} bytes exceeds {} byte cap",
            out.len(),
            MAX_REQUEST_SIZE
        )));
    }

    Ok(out.into_bytes())
}

/// Builds a `Range: bytes=<lo>-<hi>` header line for a bounded byte range
/// request (spec.md §4.F/4.G).
pub fn range_header(start: u64, end_inclusive: u64) -> String {
    format!("Range: bytes={start}-{end_inclusive}")
}
