//! Error types for the readme2html library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Readme2HtmlError`] — **Fatal**: the conversion cannot proceed at all
//!   (unrecognised source URL, primary document unreachable). Returned as
//!   `Err(Readme2HtmlError)` from the top-level `convert*` functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image reference failed (HTTP
//!   error, transport failure, unresolvable relative path) but the rest of
//!   the document is fine. Collected into
//!   [`crate::output::ImageReport::failed`] so callers can inspect partial
//!   success rather than losing the whole document to one dead link.
//!
//! The separation lets callers decide their own tolerance: treat any missing
//! image as an error, log and continue, or ignore the report entirely.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the readme2html library.
///
/// Per-image failures use [`ImageError`] and are aggregated into
/// [`crate::output::ImageReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Readme2HtmlError {
    // ── Locator errors ────────────────────────────────────────────────────
    /// The input URL does not match a hosted-file shape we can map to a
    /// raw-content location.
    #[error("Invalid source URL '{url}': {reason}\nExpected https://github.com/<user>/<repo>/blob/<ref>/<path> or a raw.githubusercontent.com URL.")]
    InvalidUrl { url: String, reason: String },

    // ── Fetch errors ──────────────────────────────────────────────────────
    /// The server answered with a non-success HTTP status.
    #[error("Fetch failed for '{url}': HTTP {status}")]
    FetchFailed { url: String, status: u16 },

    /// Transport-level failure (DNS, connection reset, TLS).
    #[error("Network error fetching '{url}': {reason}\nCheck your internet connection.")]
    Network { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Request timed out after {secs}s for '{url}'\nIncrease --timeout.")]
    Timeout { url: String, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output HTML file.
    #[error("Failed to write output file '{}': {source}", path.display())]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image reference.
///
/// Stored in [`crate::output::ImageFailure`] when an image could not be
/// embedded. The conversion always continues; the reference keeps its
/// original source attribute.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// The image server answered with a non-success HTTP status.
    #[error("image fetch failed: HTTP {status}")]
    Fetch { status: u16 },

    /// Transport failure while fetching the image.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// A relative reference could not be joined against the base path.
    #[error("unresolvable reference '{src}': {reason}")]
    UnresolvableReference { src: String, reason: String },
}
