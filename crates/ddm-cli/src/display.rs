//! Terminal progress display: the CLI's implementation of
//! [`ProgressObserver`] (spec.md §4.H display worker, §4.I layout).
//!
//! The core never prints — this is the one place a `JobSnapshot` becomes
//! terminal output. Redraws in place using ANSI cursor-up, the way the
//! original's `progress.c` overwrote its frame rather than scrolling.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

use colored::Colorize;
use ddm_core::progress::humanize::{format_bytes, format_duration_secs, format_rate};
use ddm_core::progress::{JobSnapshot, ProgressObserver, SegmentState};

/// Draws one frame per segment plus a totals line, redrawing over the
/// previous frame on every [`on_update`](ProgressObserver::on_update) call.
pub struct TerminalProgress {
    /// Height (in lines) of the previously drawn frame, so the next frame
    /// knows how many lines to move the cursor up before overwriting.
    last_frame_lines: AtomicUsize,
}

impl TerminalProgress {
    pub fn new() -> Self {
        TerminalProgress {
            last_frame_lines: AtomicUsize::new(0),
        }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

fn bar(pct: f64, width: usize) -> String {
    let filled = ((pct / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!(
        "[{}{}]",
        "#".repeat(filled).green(),
        "-".repeat(width - filled)
    )
}

fn state_label(state: SegmentState) -> colored::ColoredString {
    match state {
        SegmentState::Idle => "idle".normal(),
        SegmentState::Connecting => "connecting".yellow(),
        SegmentState::Downloading => "downloading".cyan(),
        SegmentState::Completed => "done".green(),
        SegmentState::Error => "error".red(),
        SegmentState::Stopped => "stopped".yellow(),
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_update(&self, snapshot: &JobSnapshot) {
        let mut out = String::new();
        for seg in &snapshot.segments {
            out.push_str(&format!(
                "Thread {:>2}: [{}] {:>5.1}% {} {}/{} {}\n",
                seg.id,
                state_label(seg.state),
                seg.percent(),
                bar(seg.percent(), 30),
                format_bytes(seg.downloaded),
                format_bytes(seg.total),
                format_rate(seg.speed_bps),
            ));
        }
        out.push_str(&format!(
            "{} {:>5.1}% {}/{} {} elapsed {}\n",
            "Total:".bold(),
            snapshot.percent(),
            format_bytes(snapshot.total_downloaded),
            format_bytes(snapshot.total_size),
            format_rate(snapshot.aggregate_speed_bps),
            format_duration_secs(snapshot.elapsed_secs),
        ));

        let lines = out.lines().count();
        let mut stdout = io::stdout().lock();
        let previous = self.last_frame_lines.swap(lines, Ordering::Relaxed);
        if previous > 0 {
            let _ = write!(stdout, "\x1b[{previous}A\x1b[J");
        }
        let _ = write!(stdout, "{out}");
        let _ = stdout.flush();
    }
}
