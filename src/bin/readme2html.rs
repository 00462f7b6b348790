//! CLI binary for readme2html.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use readme2html::{convert, convert_to_file, ConversionConfig, ConversionOutput};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a README to a self-contained HTML file
  readme2html https://github.com/rust-lang/rust/blob/master/README.md rust.html

  # Print the HTML to stdout
  readme2html https://github.com/user/repo/blob/main/README.md

  # Private repository (token also read from GITHUB_TOKEN)
  readme2html -t ghp_... https://github.com/user/private/blob/main/README.md out.html

  # Raw URLs work too
  readme2html https://raw.githubusercontent.com/user/repo/main/docs/guide.md guide.html

  # Structured JSON output (html + stats + failed images)
  readme2html --json https://github.com/user/repo/blob/main/README.md > report.json

  # Custom stylesheet
  readme2html --css my-theme.css https://github.com/user/repo/blob/main/README.md out.html

ENVIRONMENT VARIABLES:
  GITHUB_TOKEN              Personal access token for private repositories
  README2HTML_CONCURRENCY   Concurrent image downloads (default: 8)
  README2HTML_TIMEOUT       Per-request timeout in seconds (default: 30)

NOTES:
  Every image is embedded as a base64 data: URI, so the output file opens
  offline with no external requests. Images that cannot be fetched keep
  their original URL and are listed on stderr; the conversion still
  succeeds.
"#;

/// Convert a GitHub README into a single self-contained HTML file.
#[derive(Parser, Debug)]
#[command(
    name = "readme2html",
    version,
    about = "Convert a GitHub README into a single self-contained HTML file",
    long_about = "Convert a GitHub README (or any hosted Markdown file) into one standalone \
HTML document: GitHub-like styling inlined, images embedded as base64 data URIs, and \
GitHub callouts ([!NOTE], [!WARNING], …) rendered as styled boxes.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// GitHub file URL (github.com/.../blob/... or raw.githubusercontent.com/...).
    source_url: String,

    /// Write HTML to this file instead of stdout.
    output: Option<PathBuf>,

    /// Personal access token for private repositories.
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Number of concurrent image downloads.
    #[arg(short, long, env = "README2HTML_CONCURRENCY", default_value_t = 8)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "README2HTML_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Path to a CSS file replacing the built-in GitHub-like stylesheet.
    #[arg(long, env = "README2HTML_CSS")]
    css: Option<PathBuf>,

    /// Print the structured JSON report (ConversionOutput) on stdout,
    /// instead of the HTML document (or alongside a file write).
    #[arg(long, env = "README2HTML_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "README2HTML_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "README2HTML_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Logs go to stderr; stdout is reserved for the document itself.
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli).await?;

    // ── Run conversion ───────────────────────────────────────────────────
    let output = if let Some(ref output_path) = cli.output {
        convert_to_file(&cli.source_url, output_path, &config)
            .await
            .context("Conversion failed")?
    } else {
        convert(&cli.source_url, &config)
            .await
            .context("Conversion failed")?
    };

    if let Some(payload) = stdout_payload(cli.json, cli.output.is_some(), &output)? {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(payload.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(&cli, &output);
    }

    Ok(())
}

/// What goes on stdout: the JSON report whenever `--json` is given (even
/// alongside a file write), the HTML document when there is no output file,
/// nothing when the document already went to a file.
fn stdout_payload(
    json: bool,
    wrote_file: bool,
    output: &ConversionOutput,
) -> Result<Option<String>> {
    if json {
        let mut report =
            serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        report.push('\n');
        Ok(Some(report))
    } else if !wrote_file {
        Ok(Some(output.html.clone()))
    } else {
        Ok(None)
    }
}

/// Per-run summary on stderr: tick, image counts, timing, failures.
fn print_summary(cli: &Cli, output: &ConversionOutput) {
    let stats = &output.stats;
    let tick = if stats.images_failed == 0 {
        green("✔")
    } else {
        cyan("⚠")
    };
    let destination = cli
        .output
        .as_ref()
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();

    eprintln!(
        "{tick}  {}  {}/{} image(s) embedded  {}ms{destination}",
        bold(&output.title),
        stats.images_embedded,
        stats.images_found,
        stats.total_duration_ms,
    );

    for failure in &output.failed_images {
        eprintln!("  {} {}  {}", red("✗"), failure.url, dim(&failure.error.to_string()));
    }
    for diagnostic in &output.diagnostics {
        eprintln!("  {} {}", cyan("⚠"), dim(diagnostic));
    }
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .concurrency(cli.concurrency)
        .fetch_timeout_secs(cli.timeout);

    if let Some(ref token) = cli.token {
        builder = builder.token(token.clone());
    }

    if let Some(ref path) = cli.css {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stylesheet from {path:?}"))?;
        builder = builder.stylesheet(css);
    }

    builder.build().context("Invalid configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use readme2html::ConversionStats;

    fn sample_output() -> ConversionOutput {
        ConversionOutput {
            html: "<!DOCTYPE html>\n".into(),
            title: "repo - README.md".into(),
            stats: ConversionStats::default(),
            failed_images: vec![],
            diagnostics: vec![],
        }
    }

    #[test]
    fn json_flag_prints_report_even_with_output_file() {
        let payload = stdout_payload(true, true, &sample_output()).unwrap();
        let payload = payload.expect("json report must still be printed");
        assert!(payload.contains("\"title\": \"repo - README.md\""));
        assert!(payload.ends_with('\n'));
    }

    #[test]
    fn html_goes_to_stdout_without_output_file() {
        let payload = stdout_payload(false, false, &sample_output()).unwrap();
        assert_eq!(payload.as_deref(), Some("<!DOCTYPE html>\n"));
    }

    #[test]
    fn nothing_on_stdout_when_document_went_to_a_file() {
        assert!(stdout_payload(false, true, &sample_output())
            .unwrap()
            .is_none());
    }
}
