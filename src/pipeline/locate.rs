//! Source location: map a browsable GitHub file URL to its raw-content URL.
//!
//! GitHub serves two views of the same file: the HTML viewer at
//! `github.com/<user>/<repo>/blob/<ref>/<path>` and the raw bytes at
//! `raw.githubusercontent.com/<user>/<repo>/<ref>/<path>`. Conversion needs
//! the latter; humans paste the former. This stage is a pure string
//! transformation — deterministic, no network — so a bad URL fails before
//! any request is made.

use crate::error::Readme2HtmlError;
use reqwest::Url;
use tracing::debug;

const RAW_HOST: &str = "raw.githubusercontent.com";

/// The canonical raw-content location of a hosted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource {
    /// Direct fetch URL for the document bytes.
    pub raw_url: String,
    /// Directory the document lives in, with a trailing `/`. Relative image
    /// references are joined against this.
    pub base_url: Url,
    /// Repository name, for the page title.
    pub repo: String,
    /// File name (last path segment), for the page title.
    pub file_name: String,
}

impl RawSource {
    /// Title for the output document, e.g. `"my-repo - README.md"`.
    pub fn page_title(&self) -> String {
        format!("{} - {}", self.repo, self.file_name)
    }
}

/// Resolve a browsable GitHub file URL (or an already-raw URL) to a
/// [`RawSource`].
///
/// Branch/ref and path segments are carried over verbatim (still
/// percent-encoded); query string and fragment are dropped.
///
/// # Errors
/// [`Readme2HtmlError::InvalidUrl`] when the host is not GitHub, the `blob`
/// segment is missing, or no file path follows the ref.
pub fn resolve(input: &str) -> Result<RawSource, Readme2HtmlError> {
    let invalid = |reason: &str| Readme2HtmlError::InvalidUrl {
        url: input.to_string(),
        reason: reason.to_string(),
    };

    let parsed = Url::parse(input).map_err(|e| invalid(&e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }

    let host = parsed.host_str().ok_or_else(|| invalid("missing host"))?;
    // Raw (still percent-encoded) segments, so the path survives byte-for-byte.
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let (user, repo, reference, file_path) = match host.trim_start_matches("www.") {
        "github.com" => {
            // github.com/<user>/<repo>/blob/<ref>/<path…>
            if segments.len() < 5 {
                return Err(invalid("expected /<user>/<repo>/blob/<ref>/<path>"));
            }
            if segments[2] != "blob" {
                return Err(invalid("missing 'blob' segment — is this a file view URL?"));
            }
            (segments[0], segments[1], segments[3], &segments[4..])
        }
        RAW_HOST => {
            // raw.githubusercontent.com/<user>/<repo>/<ref>/<path…>
            if segments.len() < 4 {
                return Err(invalid("expected /<user>/<repo>/<ref>/<path>"));
            }
            (segments[0], segments[1], segments[2], &segments[3..])
        }
        other => return Err(invalid(&format!("unsupported host '{other}'"))),
    };

    let raw_url = format!(
        "https://{RAW_HOST}/{user}/{repo}/{reference}/{}",
        file_path.join("/")
    );

    // Base directory = everything up to (and excluding) the file name.
    let dir = &file_path[..file_path.len() - 1];
    let mut base = format!("https://{RAW_HOST}/{user}/{repo}/{reference}/");
    for seg in dir {
        base.push_str(seg);
        base.push('/');
    }
    let base_url = Url::parse(&base).map_err(|e| invalid(&e.to_string()))?;

    let file_name = file_path
        .last()
        .map(|s| s.to_string())
        .ok_or_else(|| invalid("missing file path"))?;

    debug!("Resolved '{}' → '{}'", input, raw_url);

    Ok(RawSource {
        raw_url,
        base_url,
        repo: repo.to_string(),
        file_name,
    })
}
