//! Output types: the assembled document plus a conversion report.
//!
//! A conversion that loses an image is still a successful conversion — the
//! document renders with the original remote reference in place. The report
//! types here exist so that partial failures are *visible* (stats, per-URL
//! failure list, parser diagnostics) instead of silently dropped.

use crate::error::ImageError;
use serde::{Deserialize, Serialize};

/// The result of a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The complete self-contained HTML document.
    pub html: String,

    /// Page title, derived from the source repository and file name.
    pub title: String,

    /// Aggregate numbers for the run.
    pub stats: ConversionStats,

    /// Every image reference that could not be embedded, each reported once.
    pub failed_images: Vec<ImageFailure>,

    /// Non-fatal parser irregularities (e.g. padded table rows).
    pub diagnostics: Vec<String>,
}

/// Aggregate statistics for a conversion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Distinct image references found in the document.
    pub images_found: usize,
    /// References successfully embedded as `data:` URIs.
    pub images_embedded: usize,
    /// References left pointing at their original URL.
    pub images_failed: usize,
    /// Size of the final HTML document in bytes.
    pub html_bytes: usize,
    /// Wall-clock duration of the whole conversion.
    pub total_duration_ms: u64,
    /// Time spent fetching and embedding images.
    pub inline_duration_ms: u64,
}

/// One image reference that could not be embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFailure {
    /// The URL we attempted to fetch (after relative resolution).
    pub url: String,
    /// Why the fetch or resolution failed.
    pub error: ImageError,
}

/// Batch report produced by the image inliner.
#[derive(Debug, Clone, Default)]
pub struct ImageReport {
    pub found: usize,
    pub embedded: usize,
    pub failed: Vec<ImageFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_serialises_to_json() {
        let out = ConversionOutput {
            html: "<!DOCTYPE html>".into(),
            title: "repo - README.md".into(),
            stats: ConversionStats {
                images_found: 3,
                images_embedded: 2,
                images_failed: 1,
                ..Default::default()
            },
            failed_images: vec![ImageFailure {
                url: "https://example.com/x.png".into(),
                error: ImageError::Fetch { status: 404 },
            }],
            diagnostics: vec![],
        };
        let json = serde_json::to_string(&out).unwrap();
        let back: ConversionOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.stats.images_failed, 1);
        assert_eq!(back.failed_images.len(), 1);
    }
}
