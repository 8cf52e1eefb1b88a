//! Concatenates per-segment temp files into the final artifact, in segment
//! order, then removes the temp files (spec.md §4.J Merger).
//!
//! Precondition (enforced by the caller, spec.md §4.J): every worker reports
//! `Completed` before this runs. The merge itself is single-threaded and
//! strictly sequential so the output is byte-identical to the origin
//! (spec.md §5 Ordering guarantees).

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::DownloadError;
use crate::segmenter::Segment;

use super::segment_temp_path;

const COPY_BLOCK: usize = 64 * 1024;

/// Outcome of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub final_path: PathBuf,
    pub bytes_written: u64,
    /// Number of segments actually merged (the post-§4.G-reduction count,
    /// not whatever thread count the caller originally requested).
    pub segments_used: usize,
}

/// Concatenates `temp_0..temp_{n-1}` (named via [`segment_temp_path`]) into
/// `<output_dir>/<output_name>`, in segment order, removing each temp file
/// as it's consumed. A per-segment length mismatch is logged and tolerated
/// (spec.md: "assert length equals segment size (warn on mismatch but
/// continue)"); a mismatched running total after the full merge is also only
/// logged. Any write failure removes the partial output file and fails with
/// [`DownloadError::FileWrite`].
pub fn merge_segments(
    output_dir: &Path,
    output_name: &str,
    segments: &[Segment],
    expected_total: u64,
) -> Result<MergeOutcome, DownloadError> {
    let final_path = output_dir.join(output_name);

    let result = do_merge(output_dir, output_name, segments, &final_path);
    if result.is_err() {
        let _ = fs::remove_file(&final_path);
    }
    let bytes_written = result?;

    if bytes_written != expected_total {
        tracing::warn!(
            bytes_written,
            expected_total,
            "merged file size does not match expected total"
        );
    }

    Ok(MergeOutcome {
        final_path,
        bytes_written,
        segments_used: segments.len(),
    })
}

fn do_merge(
    output_dir: &Path,
    output_name: &str,
    segments: &[Segment],
    final_path: &Path,
) -> Result<u64, DownloadError> {
    let mut out = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(final_path)
        .map_err(|e| DownloadError::FileWrite {
            path: final_path.display().to_string(),
            source: e,
        })?;

    let mut total: u64 = 0;
    let mut block = [0u8; COPY_BLOCK];

    for segment in segments {
        let temp_path = segment_temp_path(output_dir, output_name, segment.index);
        let mut temp = File::open(&temp_path).map_err(|e| DownloadError::FileOpen {
            path: temp_path.display().to_string(),
            source: e,
        })?;

        let temp_len = temp
            .metadata()
            .map_err(|e| DownloadError::FileOpen {
                path: temp_path.display().to_string(),
                source: e,
            })?
            .len();
        if temp_len != segment.len() {
            tracing::warn!(
                segment = segment.index,
                expected = segment.len(),
                actual = temp_len,
                "segment temp file size mismatch before merge"
            );
        }

        total += copy_in_blocks(&mut temp, &mut out, &mut block).map_err(|e| {
            DownloadError::FileWrite {
                path: final_path.display().to_string(),
                source: e,
            }
        })?;

        drop(temp);
        let _ = fs::remove_file(&temp_path);
    }

    out.flush().map_err(|e| DownloadError::FileWrite {
        path: final_path.display().to_string(),
        source: e,
    })?;

    Ok(total)
}

fn copy_in_blocks(src: &mut File, dst: &mut File, block: &mut [u8]) -> io::Result<u64> {
    let mut copied = 0u64;
    loop {
        let n = src.read(block)?;
        if n == 0 {
            break;
        }
        dst.write_all(&block[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}

/// Removes every segment temp file for a job, ignoring missing files. Used
/// on a non-resumable job-level failure (spec.md §5 Resource discipline:
/// "Temp files are always removed after successful merge, and also after
/// non-resumable failure").
pub fn remove_all_segment_temp_files(output_dir: &Path, output_name: &str, segment_count: usize) {
    for index in 0..segment_count {
        let path = segment_temp_path(output_dir, output_name, index);
        let _ = fs::remove_file(path);
    }
}
