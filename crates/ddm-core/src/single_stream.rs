//! Single-stream fallback downloader with redirect handling (spec.md §4.E
//! Single-stream body reader, §4.K Redirect driver & entry).
//!
//! Used directly when the origin doesn't support range requests or the file
//! is too small to partition, and as the landing path after a `3xx`
//! redirect chain that a multi-segment attempt can't follow on its own.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::body;
use crate::config::{DdmConfig, MAX_REDIRECTS};
use crate::error::DownloadError;
use crate::http::{build_request, parse_response, ReadAheadBuffer};
use crate::progress::{ProgressObserver, ProgressTable, SegmentState};
use crate::transport::Transport;
use crate::url::{self, derive_filename, Url};

/// Result of a successful single-stream download.
#[derive(Debug, Clone)]
pub struct SingleStreamReport {
    pub final_path: PathBuf,
    pub bytes_written: u64,
}

/// Runs the single-stream path: follow up to [`MAX_REDIRECTS`] `3xx`
/// responses, then drain the body of the final `2xx` response to
/// `<output_dir>/<output_name or derived>` (spec.md §4.K entry step 3). Any
/// failure removes the partial output file.
pub fn download_single_stream(
    url: &Url,
    output_dir: &Path,
    output_name: Option<&str>,
    _cfg: &DdmConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<SingleStreamReport, DownloadError> {
    let mut current = url.clone();
    let mut redirects = 0u32;

    loop {
        if current.host_kind == url::HostKind::Invalid {
            return Err(DownloadError::UrlParse(format!(
                "invalid host in redirect target: {}",
                current.host
            )));
        }

        let mut transport = Transport::connect(&current.host, current.port, current.protocol.is_tls())?;
        let request = build_request("GET", &current.host, &current.request_target(), &[])?;
        transport.send_all(&request)?;

        let mut buf = ReadAheadBuffer::new();
        let response = parse_response(&mut buf, &mut transport)?;

        if response.is_redirect() {
            let location = response.location.ok_or_else(|| {
                DownloadError::HttpResponse(format!(
                    "{} redirect without Location header",
                    response.status_code
                ))
            })?;
            redirects += 1;
            if redirects > MAX_REDIRECTS {
                return Err(DownloadError::HttpResponse(format!(
                    "exceeded {MAX_REDIRECTS} redirects"
                )));
            }
            drop(transport);
            current = url::parse(&location)?;
            continue;
        }

        if !response.is_success() {
            return Err(DownloadError::HttpResponse(format!(
                "{} {}",
                response.status_code, response.status_message
            )));
        }

        let filename = match output_name {
            Some(name) => name.to_string(),
            None => derive_filename(&current.path, response.content_disposition.as_deref()),
        };
        let final_path = output_dir.join(&filename);

        let result = drain_to_file(&mut buf, &mut transport, &final_path, response.content_length, observer);
        return match result {
            Ok(bytes_written) => Ok(SingleStreamReport {
                final_path,
                bytes_written,
            }),
            Err(e) => {
                let _ = fs::remove_file(&final_path);
                Err(e)
            }
        };
    }
}

/// Boundary for periodic progress ticks on the length-known path (spec.md
/// §4.E: "on second boundary or after 8 KiB written since last tick,
/// whichever first").
const TICK_BYTES: u64 = 8 * 1024;
const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

fn drain_to_file(
    buf: &mut ReadAheadBuffer,
    transport: &mut Transport,
    final_path: &Path,
    content_length: i64,
    observer: Option<Arc<dyn ProgressObserver>>,
) -> Result<u64, DownloadError> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(final_path)
        .map_err(|e| DownloadError::FileOpen {
            path: final_path.display().to_string(),
            source: e,
        })?;

    let known_total = if content_length >= 0 { content_length as u64 } else { 0 };
    let progress = observer.map(|obs| (ProgressTable::new(&[known_total.max(1)]), obs));
    if let Some((table, _)) = &progress {
        table.set_state(0, SegmentState::Downloading, None);
    }
    let mut last_tick = Instant::now();
    let mut bytes_since_tick = 0u64;

    let mut tick = |n: u64| {
        let Some((table, obs)) = &progress else { return };
        table.record_chunk(0, n);
        bytes_since_tick += n;
        if bytes_since_tick >= TICK_BYTES || last_tick.elapsed() >= TICK_INTERVAL {
            obs.on_update(&table.snapshot());
            bytes_since_tick = 0;
            last_tick = Instant::now();
        }
    };

    let written = if content_length >= 0 {
        body::drain_known_length(buf, transport, &mut file, content_length as u64, &mut tick)?
    } else {
        body::drain_until_close(buf, transport, &mut file, &mut tick)?
    };

    file.flush().map_err(|e| DownloadError::FileWrite {
        path: final_path.display().to_string(),
        source: e,
    })?;

    if let Some((table, obs)) = &progress {
        table.set_state(0, SegmentState::Completed, None);
        obs.on_update(&table.snapshot());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::JobSnapshot;
    use crate::url::{classify_host, Protocol};
    use std::io::{Read, Write as _};
    use std::net::TcpListener;
    use std::sync::Mutex;

    fn test_url(port: u16, path: &str) -> Url {
        Url {
            protocol: Protocol::Http,
            host: "127.0.0.1".to_string(),
            port,
            path: path.to_string(),
            query: String::new(),
            host_kind: classify_host("127.0.0.1"),
        }
    }

    struct RecordingObserver {
        updates: Mutex<Vec<JobSnapshot>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_update(&self, snapshot: &JobSnapshot) {
            self.updates.lock().unwrap().push(snapshot.clone());
        }
    }

    fn serve_once(response: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut discard = [0u8; 4096];
            let _ = sock.read(&mut discard);
            sock.write_all(response).unwrap();
        });
        port
    }

    #[test]
    fn downloads_known_length_body_to_named_file() {
        let port = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let report = download_single_stream(
            &test_url(port, "/f"),
            dir.path(),
            Some("out.bin"),
            &cfg,
            None,
        )
        .unwrap();
        assert_eq!(report.bytes_written, 5);
        assert_eq!(fs::read(&report.final_path).unwrap(), b"hello");
    }

    #[test]
    fn derives_filename_from_url_path_when_absent() {
        let port = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nxyz");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let report =
            download_single_stream(&test_url(port, "/archive.zip"), dir.path(), None, &cfg, None).unwrap();
        assert_eq!(report.final_path.file_name().unwrap(), "archive.zip");
    }

    #[test]
    fn follows_one_redirect_to_final_resource() {
        let final_port = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ndone");
        let location = format!("http://127.0.0.1:{final_port}/x");
        let redirect_response = format!(
            "HTTP/1.1 301 Moved Permanently\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n"
        );
        let redirect_port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();
            std::thread::spawn(move || {
                let (mut sock, _) = listener.accept().unwrap();
                let mut discard = [0u8; 4096];
                let _ = sock.read(&mut discard);
                sock.write_all(redirect_response.as_bytes()).unwrap();
            });
            port
        };

        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let report = download_single_stream(
            &test_url(redirect_port, "/x"),
            dir.path(),
            Some("x.bin"),
            &cfg,
            None,
        )
        .unwrap();
        assert_eq!(fs::read(&report.final_path).unwrap(), b"done");
    }

    #[test]
    fn redirect_without_location_fails() {
        let port = serve_once(b"HTTP/1.1 302 Found\r\nContent-Length: 0\r\n\r\n");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let err = download_single_stream(&test_url(port, "/x"), dir.path(), None, &cfg, None).unwrap_err();
        assert!(matches!(err, DownloadError::HttpResponse(_)));
    }

    #[test]
    fn client_error_status_fails_and_no_file_left() {
        let port = serve_once(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let err =
            download_single_stream(&test_url(port, "/missing"), dir.path(), Some("m.bin"), &cfg, None)
                .unwrap_err();
        assert!(matches!(err, DownloadError::HttpResponse(_)));
        assert!(!dir.path().join("m.bin").exists());
    }

    #[test]
    fn early_close_removes_partial_file() {
        let port = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nshort");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let err =
            download_single_stream(&test_url(port, "/f"), dir.path(), Some("p.bin"), &cfg, None)
                .unwrap_err();
        assert!(matches!(err, DownloadError::Network(_)));
        assert!(!dir.path().join("p.bin").exists());
    }

    #[test]
    fn progress_observer_sees_completion() {
        let port = serve_once(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
        let dir = tempfile::tempdir().unwrap();
        let cfg = DdmConfig::default();
        let observer = Arc::new(RecordingObserver {
            updates: Mutex::new(Vec::new()),
        });
        let obs_dyn: Arc<dyn ProgressObserver> = observer.clone();
        download_single_stream(&test_url(port, "/f"), dir.path(), Some("o.bin"), &cfg, Some(obs_dyn)).unwrap();
        let updates = observer.updates.lock().unwrap();
        assert!(!updates.is_empty());
        assert_eq!(updates.last().unwrap().segments[0].state, SegmentState::Completed);
    }
}
