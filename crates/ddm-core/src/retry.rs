//! Fixed-policy retry loop for a single segment's transfer (spec.md §4.H:
//! up to `max_segment_attempts` tries, `retry_delay` between them, resuming
//! from whatever the segment's temp file already holds).

use crate::config::DdmConfig;
use crate::error::DownloadError;
use std::thread;

/// Outcome of one attempt at a unit of retriable work.
pub enum Attempt<T> {
    Done(T),
    Retry(DownloadError),
}

/// Terminal outcome of [`run_with_retry`]: either `f` completed, or a stop
/// was observed before it got the chance to. A stop is not a failure (spec.md
/// §5 Cancellation is cooperative, not an error path), so it's carried as a
/// distinct success variant rather than an `Err`.
pub enum RetryOutcome<T> {
    Done(T),
    Stopped,
}

/// Runs `f` up to `cfg.max_segment_attempts` times, sleeping
/// `cfg.retry_delay()` between attempts, stopping early if `should_stop`
/// returns true. `f` receives the 0-based attempt index so it can decide how
/// much of a partially-written file to resume from.
///
/// Returns the last error if every attempt failed.
pub fn run_with_retry<T>(
    cfg: &DdmConfig,
    should_stop: impl Fn() -> bool,
    mut f: impl FnMut(u32) -> Attempt<T>,
) -> Result<RetryOutcome<T>, DownloadError> {
    let mut last_err = DownloadError::Network("no attempts made".to_string());

    for attempt in 0..cfg.max_segment_attempts {
        if should_stop() {
            return Ok(RetryOutcome::Stopped);
        }

        match f(attempt) {
            Attempt::Done(value) => return Ok(RetryOutcome::Done(value)),
            Attempt::Retry(err) => {
                last_err = err;
                if attempt + 1 < cfg.max_segment_attempts {
                    thread::sleep(cfg.retry_delay());
                }
            }
        }
    }

    Err(last_err)
}
