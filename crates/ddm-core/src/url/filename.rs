//! Derives a safe local filename for a download (spec.md §9 expansion: the
//! original program's menu prompts for an output name; this is the default
//! that prompt falls back to when the user accepts it).

use super::content_disposition::parse_content_disposition_filename;
use super::sanitize::sanitize_filename_for_linux;

/// Default filename when the URL path and Content-Disposition yield nothing usable.
pub const DEFAULT_FILENAME: &str = "Downloaded_File";

/// Extracts the last path segment of a URL's path component, for use as a
/// filename hint. Returns `None` for an empty or root (`/`) path.
fn filename_from_path(path: &str) -> Option<String> {
    let segment = path.split('/').filter(|s| !s.is_empty()).last()?;
    if segment.is_empty() || segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Derives a safe filename for saving a download.
///
/// Prefers the filename from `content_disposition` (if present and
/// parseable), otherwise uses the last segment of `url_path`. Falls back to
/// [`DEFAULT_FILENAME`] when neither yields anything usable. The result is
/// sanitized for the local filesystem.
pub fn derive_filename(url_path: &str, content_disposition: Option<&str>) -> String {
    let candidate = content_disposition
        .and_then(parse_content_disposition_filename)
        .filter(|s| !s.is_empty())
        .or_else(|| filename_from_path(url_path));

    let raw = match candidate {
        Some(c) => c,
        None => return DEFAULT_FILENAME.to_string(),
    };

    let sanitized = sanitize_filename_for_linux(&raw);
    if sanitized.is_empty() || sanitized == "." || sanitized == ".." {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_filename_from_url_path() {
        assert_eq!(derive_filename("/archive.zip", None), "archive.zip");
        assert_eq!(
            derive_filename("/path/to/debian-12.iso", None),
            "debian-12.iso"
        );
    }

    #[test]
    fn derive_filename_from_content_disposition() {
        assert_eq!(
            derive_filename("/", Some("attachment; filename=\"report.pdf\"")),
            "report.pdf"
        );
    }

    #[test]
    fn derive_filename_content_disposition_overrides_path() {
        assert_eq!(
            derive_filename(
                "/archive.zip",
                Some("attachment; filename=\"real-name.tar.gz\"")
            ),
            "real-name.tar.gz"
        );
    }

    #[test]
    fn derive_filename_empty_path_fallback() {
        assert_eq!(derive_filename("/", None), DEFAULT_FILENAME);
        assert_eq!(derive_filename("", None), DEFAULT_FILENAME);
    }
}
