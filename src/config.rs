//! Configuration types for README-to-HTML conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks and to diff two runs to
//! understand why their outputs differ.
//!
//! The stylesheet is deliberately a config value rather than a module-level
//! constant: the assembler stays a pure function and tests never touch the
//! filesystem to exercise it.

use crate::error::Readme2HtmlError;
use crate::pipeline::fetch::ContentFetcher;
use std::fmt;
use std::sync::Arc;

/// Configuration for a README-to-HTML conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use readme2html::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .concurrency(4)
///     .fetch_timeout_secs(10)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Personal access token attached as `Authorization: token <t>` to every
    /// fetch. Needed for private repositories and to avoid anonymous rate
    /// limits; plain public fetches work without it.
    pub token: Option<String>,

    /// Number of concurrent image fetches. Default: 8.
    ///
    /// Image downloads are network-bound and mutually independent, so a
    /// bounded fan-out cuts wall-clock time without hammering the origin
    /// host. Raise it on wide connections; lower it if you hit rate limits.
    pub concurrency: usize,

    /// Per-request timeout in seconds, for the document and each image.
    /// Default: 30.
    pub fetch_timeout_secs: u64,

    /// Stylesheet injected verbatim into the output `<style>` block.
    /// If None, the built-in GitHub-like stylesheet
    /// ([`crate::style::DEFAULT_STYLESHEET`]) is used.
    pub stylesheet: Option<String>,

    /// Pre-constructed fetcher. Takes precedence over the built-in HTTP
    /// fetcher; used by tests to simulate per-image failures and by callers
    /// that need custom transport (caching, proxies).
    pub fetcher: Option<Arc<dyn ContentFetcher>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            token: None,
            concurrency: 8,
            fetch_timeout_secs: 30,
            stylesheet: None,
            fetcher: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            // Never print the credential itself.
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("concurrency", &self.concurrency)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .field(
                "stylesheet",
                &self.stylesheet.as_ref().map(|s| format!("{} bytes", s.len())),
            )
            .field("fetcher", &self.fetcher.as_ref().map(|_| "<dyn ContentFetcher>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.config.token = Some(token.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.config.fetch_timeout_secs = secs;
        self
    }

    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.stylesheet = Some(css.into());
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn ContentFetcher>) -> Self {
        self.config.fetcher = Some(fetcher);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Readme2HtmlError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Readme2HtmlError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.fetch_timeout_secs == 0 {
            return Err(Readme2HtmlError::InvalidConfig(
                "Fetch timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let c = ConversionConfig::default();
        assert_eq!(c.concurrency, 8);
        assert_eq!(c.fetch_timeout_secs, 30);
        assert!(c.token.is_none());
        assert!(c.stylesheet.is_none());
    }

    #[test]
    fn build_rejects_zero_concurrency() {
        assert!(matches!(
            ConversionConfig::builder().concurrency(0).build(),
            Err(Readme2HtmlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn build_rejects_zero_timeout() {
        assert!(matches!(
            ConversionConfig::builder().fetch_timeout_secs(0).build(),
            Err(Readme2HtmlError::InvalidConfig(_))
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let c = ConversionConfig::builder().token("ghp_secret").build().unwrap();
        let dbg = format!("{:?}", c);
        assert!(!dbg.contains("ghp_secret"), "token leaked: {dbg}");
        assert!(dbg.contains("<redacted>"));
    }
}
