//! On-disk layout for a multi-segment job and the merge step that produces
//! the final artifact (spec.md §4.J Merger, §6 On-disk state).

mod merger;

pub use merger::{merge_segments, MergeOutcome};

/// Path of segment `index`'s temp file: `<output_dir>/<output_name>.partK`
/// (spec.md §6 On-disk state).
pub fn segment_temp_path(
    output_dir: &std::path::Path,
    output_name: &str,
    index: usize,
) -> std::path::PathBuf {
    output_dir.join(format!("{output_name}.part{index}"))
}
