//! Per-segment fetch worker: retry-with-resume loop over one byte range
//! (spec.md §4.H Worker pool).
//!
//! One of these runs per segment, each on its own OS thread (spec.md §5:
//! "Parallel OS threads, one per segment... No event loop; I/O is blocking
//! within a thread"). A worker exclusively owns its segment's temp file and
//! transport from spawn to join; the only state it shares is the
//! [`ProgressTable`] entry for its own `id`, touched under that table's
//! mutex.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::DdmConfig;
use crate::error::DownloadError;
use crate::http::{build_request, parse_response, range_header, ReadAheadBuffer};
use crate::progress::{ProgressTable, SegmentState};
use crate::retry::{run_with_retry, Attempt, RetryOutcome};
use crate::segmenter::Segment;
use crate::transport::Transport;
use crate::url::Url;
use std::sync::Arc;

/// Bytes read per `recv` call while streaming a segment body (spec.md §4.H
/// step 5: "up to 16 KiB at a time").
const SEGMENT_READ_CHUNK: usize = 16 * 1024;

/// Outcome of a segment's worker, reported to the orchestrator after join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentOutcome {
    Completed,
    Stopped,
}

/// Runs the retry-with-resume loop for one segment (spec.md §4.H). Returns
/// once the segment reaches a terminal state (`Completed`/`Stopped`) or every
/// retry attempt has been exhausted.
///
/// `single_segment` is true when this segment spans the entire file (there's
/// only one segment); in that case a plain `200` response is also accepted,
/// matching origins that answer a whole-file Range request without 206
/// (spec.md §4.H step 4).
pub fn run_segment(
    cfg: &DdmConfig,
    url: &Url,
    segment: Segment,
    temp_path: PathBuf,
    progress: &Arc<ProgressTable>,
    single_segment: bool,
) -> Result<SegmentOutcome, DownloadError> {
    let expected = segment.len();

    let outcome = run_with_retry(cfg, || progress.stop_flag(), |_attempt| {
        match attempt_segment(url, segment, &temp_path, progress, single_segment, expected) {
            Ok(outcome) => Attempt::Done(outcome),
            Err(err) => Attempt::Retry(err),
        }
    })?;

    match outcome {
        RetryOutcome::Done(outcome) => Ok(outcome),
        RetryOutcome::Stopped => {
            progress.set_state(segment.index, SegmentState::Stopped, None);
            Ok(SegmentOutcome::Stopped)
        }
    }
}

/// One attempt: resume from whatever's already on disk, connect, send the
/// range request, and stream the body into the temp file.
fn attempt_segment(
    url: &Url,
    segment: Segment,
    temp_path: &Path,
    progress: &Arc<ProgressTable>,
    single_segment: bool,
    expected: u64,
) -> Result<SegmentOutcome, DownloadError> {
    progress.set_state(segment.index, SegmentState::Connecting, None);

    let existing_len = fs::metadata(temp_path).map(|m| m.len()).unwrap_or(0);
    let resume_offset = existing_len.min(expected);
    progress.set_downloaded_absolute(segment.index, resume_offset);

    if resume_offset == expected {
        progress.set_state(segment.index, SegmentState::Completed, None);
        return Ok(SegmentOutcome::Completed);
    }

    let effective_start = segment.start + resume_offset;

    let mut transport = Transport::connect(&url.host, url.port, url.protocol.is_tls())?;
    let extra = vec![range_header(effective_start, segment.end)];
    let request = build_request("GET", &url.host, &url.request_target(), &extra)?;
    transport.send_all(&request)?;

    let mut buf = ReadAheadBuffer::new();
    let response = parse_response(&mut buf, &mut transport)?;

    let accepted_status = response.status_code == 206
        || (single_segment && response.status_code == 200);
    if !accepted_status {
        return Err(DownloadError::HttpResponse(format!(
            "segment {} expected 206 (got {} {})",
            segment.index, response.status_code, response.status_message
        )));
    }

    progress.set_state(segment.index, SegmentState::Downloading, None);

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(resume_offset > 0)
        .truncate(resume_offset == 0)
        .open(temp_path)
        .map_err(|e| DownloadError::FileOpen {
            path: temp_path.display().to_string(),
            source: e,
        })?;

    let mut written = resume_offset;

    let residual = buf.unconsumed();
    if !residual.is_empty() {
        let remaining = expected - written;
        let take = (residual.len() as u64).min(remaining) as usize;
        write_chunk(&mut file, temp_path, &residual[..take])?;
        let n = take;
        buf.consume(n);
        written += take as u64;
        progress.record_chunk(segment.index, take as u64);
    }

    let mut chunk = [0u8; SEGMENT_READ_CHUNK];
    while written < expected {
        if progress.stop_flag() {
            progress.set_state(segment.index, SegmentState::Stopped, None);
            return Ok(SegmentOutcome::Stopped);
        }

        let remaining = expected - written;
        let want = (chunk.len() as u64).min(remaining) as usize;
        let n = transport.recv(&mut chunk[..want])?;
        if n == 0 {
            let msg = "connection closed mid-segment".to_string();
            progress.set_state(segment.index, SegmentState::Error, Some(msg.clone()));
            return Err(DownloadError::Network(msg));
        }
        write_chunk(&mut file, temp_path, &chunk[..n])?;
        written += n as u64;
        progress.record_chunk(segment.index, n as u64);
    }

    file.sync_all().map_err(|e| DownloadError::FileWrite {
        path: temp_path.display().to_string(),
        source: e,
    })?;

    if written != expected {
        let msg = "下载不完整".to_string();
        progress.set_state(segment.index, SegmentState::Error, Some(msg.clone()));
        return Err(DownloadError::Network(msg));
    }

    progress.set_state(segment.index, SegmentState::Completed, None);
    Ok(SegmentOutcome::Completed)
}

fn write_chunk(file: &mut fs::File, path: &Path, data: &[u8]) -> Result<(), DownloadError> {
    file.write_all(data).map_err(|e| DownloadError::FileWrite {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::plan_segments;
    use crate::url::{classify_host, Protocol};
    use std::io::Read;
    use std::net::TcpListener;

    fn test_url(port: u16) -> Url {
        Url {
            protocol: Protocol::Http,
            host: "127.0.0.1".to_string(),
            port,
            path: "/f".to_string(),
            query: String::new(),
            host_kind: classify_host("127.0.0.1"),
        }
    }

    fn serve_range(body: &'static [u8], total: u64) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut discard = [0u8; 4096];
            let n = sock.read(&mut discard).unwrap();
            let req = String::from_utf8_lossy(&discard[..n]);
            let range_line = req.lines().find(|l| l.starts_with("Range:")).unwrap();
            let range = range_line.trim_start_matches("Range: bytes=");
            let (lo, hi) = range.split_once('-').unwrap();
            let lo: u64 = lo.parse().unwrap();
            let hi: u64 = hi.parse().unwrap();
            let slice = &body[lo as usize..=hi as usize];
            let header = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes {}-{}/{}\r\nContent-Length: {}\r\n\r\n",
                lo, hi, total, slice.len()
            );
            sock.write_all(header.as_bytes()).unwrap();
            sock.write_all(slice).unwrap();
        });
        port
    }

    #[test]
    fn downloads_full_segment_in_one_attempt() {
        let body: &'static [u8] = b"0123456789";
        let port = serve_range(body, body.len() as u64);
        let segments = plan_segments(body.len() as u64, 1);
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("out.part0");
        let progress = ProgressTable::new(&[segments[0].len()]);
        let cfg = DdmConfig::default();

        let outcome = run_segment(&cfg, &test_url(port), segments[0], temp_path.clone(), &progress, true).unwrap();
        assert_eq!(outcome, SegmentOutcome::Completed);
        let written = fs::read(&temp_path).unwrap();
        assert_eq!(written, body);
        assert_eq!(progress.snapshot().segments[0].downloaded, body.len() as u64);
    }

    #[test]
    fn resumes_from_existing_partial_temp_file() {
        let body: &'static [u8] = b"abcdefghij";
        let port = serve_range(body, body.len() as u64);
        let segments = plan_segments(body.len() as u64, 1);
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("out.part0");
        fs::write(&temp_path, &body[..4]).unwrap();

        let progress = ProgressTable::new(&[segments[0].len()]);
        let cfg = DdmConfig::default();
        let outcome = run_segment(&cfg, &test_url(port), segments[0], temp_path.clone(), &progress, true).unwrap();
        assert_eq!(outcome, SegmentOutcome::Completed);
        let written = fs::read(&temp_path).unwrap();
        assert_eq!(written, body);
    }

    #[test]
    fn already_complete_temp_file_short_circuits() {
        let body: &'static [u8] = b"xyz";
        let segments = plan_segments(body.len() as u64, 1);
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("out.part0");
        fs::write(&temp_path, body).unwrap();

        // No listener running at all: if the worker tried to connect it would fail,
        // proving the short-circuit path never touches the network.
        let progress = ProgressTable::new(&[segments[0].len()]);
        let cfg = DdmConfig::default();
        let url = Url {
            protocol: Protocol::Http,
            host: "127.0.0.1".to_string(),
            port: 1,
            path: "/f".to_string(),
            query: String::new(),
            host_kind: classify_host("127.0.0.1"),
        };
        let outcome = run_segment(&cfg, &url, segments[0], temp_path, &progress, true).unwrap();
        assert_eq!(outcome, SegmentOutcome::Completed);
    }

    #[test]
    fn stop_flag_halts_mid_stream_without_retry() {
        let body: &'static [u8] = b"0123456789abcdef";
        let port = serve_range(body, body.len() as u64);
        let segments = plan_segments(body.len() as u64, 1);
        let dir = tempfile::tempdir().unwrap();
        let temp_path = dir.path().join("out.part0");
        let progress = ProgressTable::new(&[segments[0].len()]);
        progress.request_stop();
        let cfg = DdmConfig::default();
        let outcome = run_segment(&cfg, &test_url(port), segments[0], temp_path, &progress, true);
        // should_stop() is checked before the first attempt even starts, so this
        // never touches the network; temp files are left for a later resume.
        assert_eq!(outcome.unwrap(), SegmentOutcome::Stopped);
    }
}
