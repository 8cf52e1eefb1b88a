//! Job orchestration for a multi-segment download: spawns one worker thread
//! per segment plus a display thread, joins them in segment order, and
//! merges the result (spec.md §4.G–§4.J, §5 Concurrency model).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::DdmConfig;
use crate::error::DownloadError;
use crate::progress::{ProgressObserver, ProgressTable};
use crate::segmenter::{self, Segment};
use crate::storage::{self, MergeOutcome};
use crate::url::Url;
use crate::worker::{self, SegmentOutcome};

/// Interval the display thread redraws at (spec.md §4.H: "every 50 ms").
const DISPLAY_INTERVAL: Duration = Duration::from_millis(50);

/// Terminal result of a multi-segment job.
#[derive(Debug)]
pub enum SchedulerOutcome {
    /// All segments completed and were merged into the final file.
    Completed(MergeOutcome),
    /// Cooperative stop was observed before every segment completed; no
    /// segment reported `Error`, so temp files are left in place rather than
    /// cleaned up (spec.md §5 Cancellation).
    Stopped,
}

/// Runs the full multi-segment pipeline for an already-probed URL: partition
/// `total_size` into segments, download each concurrently with per-segment
/// retry/resume, then merge. On any segment's unretried failure, every temp
/// file for this job is removed and the job-level error is returned
/// (spec.md §7: "A non-zero aggregate triggers temp cleanup and a job-level
/// failure").
pub fn run_multi_segment(
    url: &Url,
    output_dir: &std::path::Path,
    output_name: &str,
    total_size: u64,
    requested_threads: usize,
    cfg: &DdmConfig,
    observer: Option<Arc<dyn ProgressObserver>>,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<SchedulerOutcome, DownloadError> {
    let segments = segmenter::plan_segments(total_size, requested_threads);
    let single_segment = segments.len() == 1;
    let totals: Vec<u64> = segments.iter().map(Segment::len).collect();
    let progress = ProgressTable::new(&totals);

    let done = Arc::new(AtomicBool::new(false));
    let control_handle = if observer.is_some() || cancel.is_some() {
        Some(spawn_control_thread(
            Arc::clone(&progress),
            observer,
            cancel,
            Arc::clone(&done),
        ))
    } else {
        None
    };

    let mut handles = Vec::with_capacity(segments.len());
    for segment in &segments {
        let url = url.clone();
        let temp_path = storage::segment_temp_path(output_dir, output_name, segment.index);
        let progress = Arc::clone(&progress);
        let cfg = cfg.clone();
        let segment = *segment;
        handles.push(thread::spawn(move || {
            worker::run_segment(&cfg, &url, segment, temp_path, &progress, single_segment)
        }));
    }

    let mut completed_count = 0usize;
    let mut error_count = 0usize;
    let mut stopped_count = 0usize;
    let mut first_error: Option<DownloadError> = None;

    for handle in handles {
        match handle.join() {
            Ok(Ok(SegmentOutcome::Completed)) => completed_count += 1,
            Ok(Ok(SegmentOutcome::Stopped)) => stopped_count += 1,
            Ok(Err(e)) => {
                error_count += 1;
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(_) => {
                error_count += 1;
                if first_error.is_none() {
                    first_error = Some(DownloadError::Network("segment worker thread panicked".to_string()));
                }
            }
        }
    }

    done.store(true, Ordering::Relaxed);
    if let Some(handle) = control_handle {
        let _ = handle.join();
    }

    if error_count > 0 {
        storage::remove_all_segment_temp_files(output_dir, output_name, segments.len());
        return Err(first_error.unwrap_or_else(|| DownloadError::Network("segment failure".to_string())));
    }

    if stopped_count > 0 {
        tracing::info!(completed_count, stopped_count, "multi-segment job stopped before completion");
        return Ok(SchedulerOutcome::Stopped);
    }

    let outcome = storage::merge_segments(output_dir, output_name, &segments, total_size)?;
    Ok(SchedulerOutcome::Completed(outcome))
}

/// Redraws the display (if an observer is attached) and propagates an
/// external cancellation request into the job's own `stop_flag` (spec.md
/// §5 Cancellation: "the orchestrator sets it"; an external signal handler
/// requests cancellation through `cancel`, and this loop is what actually
/// sets the flag workers check).
fn spawn_control_thread(
    progress: Arc<ProgressTable>,
    observer: Option<Arc<dyn ProgressObserver>>,
    cancel: Option<Arc<AtomicBool>>,
    done: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        if let Some(cancel) = &cancel {
            if cancel.load(Ordering::Relaxed) {
                progress.request_stop();
            }
        }
        if let Some(obs) = &observer {
            obs.on_update(&progress.snapshot());
        }
        if done.load(Ordering::Relaxed) {
            if let Some(obs) = &observer {
                // Final frame after the orchestrator has joined every worker.
                obs.on_update(&progress.snapshot());
            }
            break;
        }
        thread::sleep(DISPLAY_INTERVAL);
    })
}
