//! Conversion entry points: orchestrate the pipeline stages end to end.
//!
//! `convert` is the full URL-to-HTML path; `convert_markdown` starts from
//! already-fetched text (useful for local files and tests); `convert_to_file`
//! adds an atomic write; `convert_sync` wraps `convert` for non-async
//! callers.

use crate::config::ConversionConfig;
use crate::error::Readme2HtmlError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::fetch::{ContentFetcher, HttpFetcher};
use crate::pipeline::{assemble, callout, inline, locate, parse};
use crate::style::DEFAULT_STYLESHEET;
use reqwest::Url;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Convert a GitHub README URL into a self-contained HTML document.
///
/// Accepts browsable (`github.com/...:blob:...`) and raw
/// (`raw.githubusercontent.com`) URLs. Image failures are non-fatal and
/// reported in the output; see [`ConversionOutput::failed_images`].
///
/// # Errors
/// Fails on an invalid URL or when the document itself cannot be fetched.
pub async fn convert(
    url: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Readme2HtmlError> {
    let started = Instant::now();

    // ── Step 1: locate ── map the input URL to its raw-content form.
    let source = locate::resolve(url)?;
    info!("Converting {}", source.raw_url);

    // ── Step 2: fetch ── the only fatal network operation.
    let fetcher = resolve_fetcher(config)?;
    let markdown = fetcher.fetch_text(&source.raw_url).await?;
    debug!("Fetched {} bytes of Markdown", markdown.len());

    run_pipeline(
        &markdown,
        &source.base_url,
        &source.page_title(),
        fetcher,
        config,
        started,
    )
    .await
}

/// Convert Markdown text that has already been obtained.
///
/// `base_url` is the directory relative image references resolve against;
/// `title` becomes the page `<title>`.
pub async fn convert_markdown(
    markdown: &str,
    base_url: &Url,
    title: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Readme2HtmlError> {
    let started = Instant::now();
    let fetcher = resolve_fetcher(config)?;
    run_pipeline(markdown, base_url, title, fetcher, config, started).await
}

/// Convert and write the document to `path` atomically (temp file in the
/// same directory, then rename), so a crash never leaves a truncated file.
pub async fn convert_to_file(
    url: &str,
    path: &Path,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Readme2HtmlError> {
    let output = convert(url, config).await?;

    let write_err = |source: std::io::Error| Readme2HtmlError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, &output.html).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    info!("Wrote {} bytes to {}", output.stats.html_bytes, path.display());

    Ok(output)
}

/// Blocking wrapper around [`convert`] for synchronous callers.
pub fn convert_sync(
    url: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Readme2HtmlError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Readme2HtmlError::Internal(format!("tokio runtime: {e}")))?;
    runtime.block_on(convert(url, config))
}

/// The injected fetcher if the caller supplied one, otherwise a fresh
/// [`HttpFetcher`] built from the config's timeout and token.
fn resolve_fetcher(
    config: &ConversionConfig,
) -> Result<Arc<dyn ContentFetcher>, Readme2HtmlError> {
    match &config.fetcher {
        Some(fetcher) => Ok(Arc::clone(fetcher)),
        None => Ok(Arc::new(HttpFetcher::new(
            config.fetch_timeout_secs,
            config.token.as_deref(),
        )?)),
    }
}

/// Stages 3–6: normalise, parse, inline, assemble. Shared by both
/// conversion entry points.
async fn run_pipeline(
    markdown: &str,
    base_url: &Url,
    title: &str,
    fetcher: Arc<dyn ContentFetcher>,
    config: &ConversionConfig,
    started: Instant,
) -> Result<ConversionOutput, Readme2HtmlError> {
    // ── Step 3: normalise callouts ──
    let normalized = callout::normalize(markdown);

    // ── Step 4: parse ── never fatal; irregularities become diagnostics.
    let parsed = parse::parse_document(&normalized);
    debug!(
        "Parsed {} top-level block(s), {} diagnostic(s)",
        parsed.blocks.len(),
        parsed.diagnostics.len()
    );

    // ── Step 5: inline images ──
    let inline_started = Instant::now();
    let (blocks, report) =
        inline::inline_images(parsed.blocks, base_url, fetcher, config.concurrency).await;
    let inline_duration_ms = inline_started.elapsed().as_millis() as u64;

    // ── Step 6: assemble ──
    let body = assemble::render_body(&blocks);
    let css = config.stylesheet.as_deref().unwrap_or(DEFAULT_STYLESHEET);
    let html = assemble::assemble(&body, title, css);

    let stats = ConversionStats {
        images_found: report.found,
        images_embedded: report.embedded,
        images_failed: report.failed.len(),
        html_bytes: html.len(),
        total_duration_ms: started.elapsed().as_millis() as u64,
        inline_duration_ms,
    };
    info!(
        "Conversion finished: {} image(s) embedded, {} failed, {} bytes of HTML in {}ms",
        stats.images_embedded, stats.images_failed, stats.html_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        html,
        title: title.to_string(),
        stats,
        failed_images: report.failed,
        diagnostics: parsed.diagnostics,
    })
}
