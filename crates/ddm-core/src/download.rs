//! Public entry point tying range probing, multi-segment scheduling, and
//! the single-stream fallback together (spec.md §4.K Redirect driver & entry,
//! §1 "a downloader engine exposing a small blocking API").

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::DdmConfig;
use crate::error::DownloadError;
use crate::fetch_head;
use crate::progress::ProgressObserver;
use crate::scheduler::{self, SchedulerOutcome};
use crate::single_stream;
use crate::url::{self, derive_filename, HostKind};

/// Caller-supplied knobs for one [`download`] call.
#[derive(Clone, Default)]
pub struct DownloadOptions {
    /// Attempt a multi-segment download when the origin is eligible
    /// (supports byte ranges and is larger than the minimum segment size).
    pub multithread: bool,
    /// Segment/thread count when `multithread` is set. `None` uses
    /// `cfg.default_threads`.
    pub threads: Option<usize>,
    pub observer: Option<Arc<dyn ProgressObserver>>,
    /// External cooperative-cancel flag (e.g. wired to a Ctrl-C handler).
    /// Only observed during a multi-segment attempt (spec.md §5 Cancellation
    /// is specified in terms of the segment worker pool).
    pub cancel: Option<Arc<AtomicBool>>,
}

/// How a download actually completed.
#[derive(Debug)]
pub enum DownloadOutcome {
    Completed(DownloadReport),
    /// A cooperative cancel was observed mid-job; per-segment temp files
    /// were left on disk rather than cleaned up (spec.md §5 Cancellation).
    Stopped,
}

#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub final_path: PathBuf,
    pub bytes_written: u64,
    /// Number of segments actually used; 1 for the single-stream path.
    pub segments_used: usize,
}

/// Downloads `url_str` into `output_dir`, using `output_name` verbatim when
/// given or deriving one from the response otherwise.
///
/// Rejects a URL whose host doesn't classify as IPv4 or Domain before any
/// network operation is attempted (spec.md §4.A). When `options.multithread`
/// is set and the origin is eligible, attempts the multi-segment path first;
/// any probe failure, ineligibility, or multi-segment job failure falls back
/// to the single-stream path rather than failing the whole call (spec.md
/// §4.K entry: "fall back to single-stream on anything but a clean
/// multi-segment success").
pub fn download(
    url_str: &str,
    output_name: Option<&str>,
    output_dir: &Path,
    cfg: &DdmConfig,
    options: DownloadOptions,
) -> Result<DownloadOutcome, DownloadError> {
    let parsed = url::parse(url_str)?;
    if parsed.host_kind == HostKind::Invalid {
        return Err(DownloadError::UrlParse(format!(
            "host does not classify as IPv4 or a valid domain: {}",
            parsed.host
        )));
    }

    std::fs::create_dir_all(output_dir).map_err(|e| DownloadError::FileWrite {
        path: output_dir.display().to_string(),
        source: e,
    })?;

    if options.multithread {
        if let Some(outcome) = try_multi_segment(&parsed, output_dir, output_name, cfg, &options) {
            return outcome;
        }
    }

    let report = single_stream::download_single_stream(
        &parsed,
        output_dir,
        output_name,
        cfg,
        options.observer,
    )?;
    Ok(DownloadOutcome::Completed(DownloadReport {
        final_path: report.final_path,
        bytes_written: report.bytes_written,
        segments_used: 1,
    }))
}

/// Returns `Some` when the multi-segment path reached a terminal, reportable
/// outcome (success, cooperative stop, or a caller-visible error not worth
/// masking with a fallback retry). Returns `None` to signal "fall back to
/// single-stream" — either the origin wasn't eligible, or the attempt itself
/// failed partway through.
fn try_multi_segment(
    url: &url::Url,
    output_dir: &Path,
    output_name: Option<&str>,
    cfg: &DdmConfig,
    options: &DownloadOptions,
) -> Option<Result<DownloadOutcome, DownloadError>> {
    let probe = match fetch_head::probe(url) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::warn!("range probe failed ({e}), falling back to single-stream");
            return None;
        }
    };

    if !probe.supports_ranges || probe.total_size <= crate::config::MIN_SEGMENT_SIZE {
        tracing::info!(
            supports_ranges = probe.supports_ranges,
            total_size = probe.total_size,
            "origin not eligible for multi-segment download; using single-stream"
        );
        return None;
    }

    let name = output_name
        .map(String::from)
        .unwrap_or_else(|| derive_filename(&url.path, probe.content_disposition.as_deref()));
    let threads = options.threads.unwrap_or(cfg.default_threads);

    match scheduler::run_multi_segment(
        url,
        output_dir,
        &name,
        probe.total_size,
        threads,
        cfg,
        options.observer.clone(),
        options.cancel.clone(),
    ) {
        Ok(SchedulerOutcome::Completed(merge)) => Some(Ok(DownloadOutcome::Completed(DownloadReport {
            final_path: merge.final_path,
            bytes_written: merge.bytes_written,
            segments_used: merge.segments_used,
        }))),
        Ok(SchedulerOutcome::Stopped) => Some(Ok(DownloadOutcome::Stopped)),
        Err(e) => {
            tracing::warn!("multi-segment attempt failed ({e}), falling back to single-stream");
            None
        }
    }
}
