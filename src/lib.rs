//! # readme2html
//!
//! Convert a GitHub README (or any hosted Markdown file) into a single
//! self-contained HTML document: GitHub-like styling inlined, every image
//! embedded as a base64 `data:` URI, callouts rendered as styled boxes.
//! The output opens offline in any browser, with no external requests.
//!
//! ## Pipeline
//!
//! ```text
//! URL ──► locate ──► fetch ──► callout ──► parse ──► inline ──► assemble ──► HTML
//!          (pure)   (network)   (pure)     (pure)   (network)     (pure)
//! ```
//!
//! Only two stages touch the network: fetching the document (fatal on
//! failure) and fetching its images (per-image failures keep the original
//! reference and are reported in [`ConversionOutput::failed_images`]).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use readme2html::{convert, ConversionConfig};
//!
//! # async fn run() -> Result<(), readme2html::Readme2HtmlError> {
//! let config = ConversionConfig::default();
//! let output = convert(
//!     "https://github.com/rust-lang/rust/blob/master/README.md",
//!     &config,
//! )
//! .await?;
//! println!(
//!     "{} bytes, {} image(s) embedded",
//!     output.stats.html_bytes, output.stats.images_embedded
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Private repositories need a personal access token:
//!
//! ```rust,no_run
//! use readme2html::ConversionConfig;
//!
//! let config = ConversionConfig::builder()
//!     .token("ghp_...")
//!     .concurrency(4)
//!     .build()
//!     .unwrap();
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod style;

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{convert, convert_markdown, convert_sync, convert_to_file};
pub use error::{ImageError, Readme2HtmlError};
pub use output::{ConversionOutput, ConversionStats, ImageFailure};
pub use pipeline::fetch::{ContentFetcher, FetchedBytes, HttpFetcher};
pub use pipeline::locate::{resolve, RawSource};
pub use pipeline::parse::{Block, CalloutKind, Inline};
