//! Range-support probing and size discovery (spec.md §4.F).

use crate::error::DownloadError;
use crate::http::{build_request, parse_response, range_header, ReadAheadBuffer};
use crate::transport::Transport;
use crate::url::Url;

/// Result of probing a URL for range support and total size.
#[derive(Debug, Clone)]
pub struct RangeProbe {
    pub total_size: u64,
    pub supports_ranges: bool,
    /// Raw `Content-Disposition` header value, when the probe response carried
    /// one (expansion: used to derive a default output filename).
    pub content_disposition: Option<String>,
}

/// Probes `url` for its total size and whether it accepts byte-range
/// requests (spec.md §4.F).
///
/// Issues `HEAD` first; a status other than `200` fails the probe outright.
/// A missing or non-positive `Content-Length` reports `(supported=false,
/// size=-1)` (modeled here as `total_size: 0`, since that result always
/// routes the caller to single-stream regardless of size). When
/// `Accept-Ranges` advertises `bytes`, that's conclusive; otherwise a
/// server can still support ranges without advertising them, so a bounded
/// `Range: bytes=0-1023` `GET` confirms via a `206` response.
pub fn probe(url: &Url) -> Result<RangeProbe, DownloadError> {
    probe_via_head(url)
}

fn probe_via_head(url: &Url) -> Result<RangeProbe, DownloadError> {
    let mut transport = Transport::connect(&url.host, url.port, url.protocol.is_tls())?;
    let request = build_request("HEAD", &url.host, &url.request_target(), &[])?;
    transport.send_all(&request)?;

    let mut buf = ReadAheadBuffer::new();
    let response = parse_response(&mut buf, &mut transport)?;

    if response.status_code != 200 {
        return Err(DownloadError::HttpResponse(format!(
            "HEAD returned {} {} (expected 200)",
            response.status_code, response.status_message
        )));
    }

    let content_disposition = response.content_disposition.clone();
    if response.content_length <= 0 {
        return Ok(RangeProbe {
            total_size: 0,
            supports_ranges: false,
            content_disposition,
        });
    }

    let total_size = response.content_length as u64;
    if response.accepts_byte_ranges() {
        return Ok(RangeProbe {
            total_size,
            supports_ranges: true,
            content_disposition,
        });
    }

    probe_via_ranged_get(url)
}

const PROBE_RANGE_END: u64 = 1023;

fn probe_via_ranged_get(url: &Url) -> Result<RangeProbe, DownloadError> {
    let mut transport = Transport::connect(&url.host, url.port, url.protocol.is_tls())?;
    let extra = vec![range_header(0, PROBE_RANGE_END)];
    let request = build_request("GET", &url.host, &url.request_target(), &extra)?;
    transport.send_all(&request)?;

    let mut buf = ReadAheadBuffer::new();
    let response = parse_response(&mut buf, &mut transport)?;

    if response.status_code == 206 {
        let total_size = total_from_content_range(&response)
            .or(response.content_length.try_into().ok())
            .ok_or_else(|| {
                DownloadError::HttpResponse(
                    "206 response carried no usable size information".to_string(),
                )
            })?;
        return Ok(RangeProbe {
            total_size,
            supports_ranges: true,
            content_disposition: response.content_disposition.clone(),
        });
    }

    if response.is_success() && response.content_length >= 0 {
        return Ok(RangeProbe {
            total_size: response.content_length as u64,
            supports_ranges: false,
            content_disposition: response.content_disposition.clone(),
        });
    }

    Err(DownloadError::HttpResponse(format!(
        "unexpected status probing size: {} {}",
        response.status_code, response.status_message
    )))
}

/// Parses the `/total` suffix out of a `Content-Range: bytes start-end/total`
/// header, when present.
fn total_from_content_range(response: &crate::http::Response) -> Option<u64> {
    let value = response.content_range.as_deref()?;
    let total_str = value.rsplit('/').next()?;
    total_str.parse().ok()
}
