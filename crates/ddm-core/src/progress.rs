//! Progress aggregation for a multi-segment job (spec.md §3 Progress
//! snapshot, §4.I Progress aggregator).
//!
//! State lives behind one mutex guarding the whole segment table (spec.md
//! §5: "segments[] and derived counters are read and written only under
//! `progress_mutex`"). Readers take a consistent snapshot under the same
//! lock every mutator uses; there are no per-segment locks.

pub mod humanize;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A segment's lifecycle state (spec.md §3 File segment).
///
/// Transitions are monotone except that a transient `Error` may retry back
/// to `Connecting`; `Completed` and `Stopped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Idle,
    Connecting,
    Downloading,
    Completed,
    Error,
    Stopped,
}

struct SegmentEntry {
    state: SegmentState,
    downloaded: u64,
    total: u64,
    error_message: Option<String>,
    speed_bps: f64,
}

/// Immutable per-segment view returned by [`ProgressTable::snapshot`].
#[derive(Debug, Clone)]
pub struct SegmentSnapshot {
    pub id: usize,
    pub state: SegmentState,
    pub downloaded: u64,
    pub total: u64,
    pub error_message: Option<String>,
    pub speed_bps: f64,
}

impl SegmentSnapshot {
    /// Percent complete in `[0, 100]`. `total` is never 0 (spec.md §4.G
    /// guarantees every segment has length >= 1).
    pub fn percent(&self) -> f64 {
        (self.downloaded as f64 * 100.0 / self.total as f64).min(100.0)
    }
}

/// Immutable whole-job view returned by [`ProgressTable::snapshot`].
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub segments: Vec<SegmentSnapshot>,
    pub total_downloaded: u64,
    pub total_size: u64,
    pub elapsed_secs: f64,
    pub aggregate_speed_bps: f64,
}

impl JobSnapshot {
    pub fn percent(&self) -> f64 {
        if self.total_size == 0 {
            return 100.0;
        }
        (self.total_downloaded as f64 * 100.0 / self.total_size as f64).min(100.0)
    }

    pub fn completed_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.state == SegmentState::Completed)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.state == SegmentState::Error)
            .count()
    }
}

/// Observer interface the engine drives during a download (spec.md §1:
/// "the progress observer interface" is one of the two things external
/// collaborators consume the core through). The CLI implements this to draw
/// the redrawable multi-line display; the core never prints directly.
pub trait ProgressObserver: Send + Sync {
    fn on_update(&self, snapshot: &JobSnapshot);
}

/// A no-op observer for callers that don't want progress output.
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn on_update(&self, _snapshot: &JobSnapshot) {}
}

/// Mutex-guarded segment table shared by every worker and the display loop
/// (spec.md §3 Downloader job / Progress snapshot).
pub struct ProgressTable {
    entries: Mutex<Vec<SegmentEntry>>,
    /// Read without the mutex on the worker hot path (spec.md §5: "`stop_flag`
    /// fields are plain atomic booleans readable without the mutex").
    stop_flag: AtomicBool,
    start_time: Instant,
}

impl ProgressTable {
    pub fn new(segment_totals: &[u64]) -> Arc<Self> {
        let entries = segment_totals
            .iter()
            .map(|&total| SegmentEntry {
                state: SegmentState::Idle,
                downloaded: 0,
                total,
                error_message: None,
                speed_bps: 0.0,
            })
            .collect();
        Arc::new(ProgressTable {
            entries: Mutex::new(entries),
            stop_flag: AtomicBool::new(false),
            start_time: Instant::now(),
        })
    }

    pub fn stop_flag(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn set_state(&self, id: usize, state: SegmentState, message: Option<String>) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.state = state;
            if message.is_some() {
                entry.error_message = message;
            }
        }
    }

    /// Adds `bytes` to the segment's downloaded count (monotonic) and
    /// recomputes its instantaneous speed from elapsed job time.
    pub fn record_chunk(&self, id: usize, bytes: u64) {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.downloaded += bytes;
            entry.speed_bps = if elapsed > 0.0 {
                entry.downloaded as f64 / elapsed
            } else {
                0.0
            };
        }
    }

    /// Sets a segment's downloaded count to an absolute value, used only
    /// when a retry discovers bytes already on disk from a prior attempt
    /// (spec.md §4.H resume) — unlike [`record_chunk`](Self::record_chunk)
    /// this is not additive.
    pub fn set_downloaded_absolute(&self, id: usize, bytes: u64) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(id) {
            entry.downloaded = bytes;
        }
    }

    pub fn snapshot(&self) -> JobSnapshot {
        let entries = self.entries.lock().unwrap();
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let segments: Vec<SegmentSnapshot> = entries
            .iter()
            .enumerate()
            .map(|(id, e)| SegmentSnapshot {
                id,
                state: e.state,
                downloaded: e.downloaded,
                total: e.total,
                error_message: e.error_message.clone(),
                speed_bps: e.speed_bps,
            })
            .collect();
        let total_downloaded: u64 = segments.iter().map(|s| s.downloaded).sum();
        let total_size: u64 = segments.iter().map(|s| s.total).sum();
        let aggregate_speed_bps = if elapsed_secs > 0.0 {
            total_downloaded as f64 / elapsed_secs
        } else {
            0.0
        };
        JobSnapshot {
            segments,
            total_downloaded,
            total_size,
            elapsed_secs,
            aggregate_speed_bps,
        }
    }
}
