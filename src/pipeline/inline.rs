//! Image inlining: replace remote image references with `data:` URIs.
//!
//! Three passes over the document tree:
//!   1. collect every image reference (Markdown images and `src` attributes
//!      inside raw HTML, at any nesting depth),
//!   2. resolve relative references against the document's base directory,
//!      deduplicate by the *resolved* URL (so aliased spellings of the same
//!      target fetch once), and fetch concurrently (bounded by the
//!      configured limit),
//!   3. rebuild the tree with each fetched reference swapped for its
//!      `data:<mime>;base64,…` URI.
//!
//! A reference that cannot be resolved or fetched keeps its original `src`
//! and is reported exactly once, regardless of how many times it appears.

use crate::error::{ImageError, Readme2HtmlError};
use crate::output::{ImageFailure, ImageReport};
use crate::pipeline::fetch::ContentFetcher;
use crate::pipeline::parse::{Block, Inline};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::{stream, StreamExt};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// `<img … src="…">` with the attribute value captured. Only double-quoted
/// values are recognised; anything else passes through untouched.
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)(<img\b[^>]*?\bsrc\s*=\s*")([^"]*)(")"#).unwrap());

/// Inline every image reference in `blocks`, returning the rewritten tree
/// and a batch report. Never fails: per-image errors leave the original
/// reference in place and land in the report.
pub async fn inline_images(
    blocks: Vec<Block>,
    base_url: &Url,
    fetcher: Arc<dyn ContentFetcher>,
    concurrency: usize,
) -> (Vec<Block>, ImageReport) {
    let refs = collect_refs(&blocks);
    let mut report = ImageReport::default();
    if refs.is_empty() {
        return (blocks, report);
    }

    // Resolve first, then deduplicate by the resolved URL: aliased spellings
    // of one target ("assets/x.png", "./assets/x.png") count as one
    // reference, fetch once, and fail once. Unresolvable references fail
    // without a network round-trip.
    let mut targets: Vec<String> = Vec::new();
    let mut sources_for: HashMap<String, Vec<String>> = HashMap::new();
    for src in refs {
        match resolve_reference(&src, base_url) {
            Ok(resolved) => {
                let sources = sources_for.entry(resolved.clone()).or_default();
                if sources.is_empty() {
                    targets.push(resolved);
                }
                sources.push(src);
            }
            Err(error) => {
                warn!("Cannot resolve image reference '{}': {}", src, error);
                report.found += 1;
                report.failed.push(ImageFailure { url: src, error });
            }
        }
    }
    report.found += targets.len();
    debug!("Inlining {} distinct image target(s)", targets.len());

    let fetched: Vec<(String, Result<String, ImageError>)> =
        stream::iter(targets.into_iter().map(|url| {
            let fetcher = Arc::clone(&fetcher);
            async move {
                let result = fetch_data_uri(fetcher.as_ref(), &url).await;
                (url, result)
            }
        }))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    // original reference → data URI, for the substitution pass
    let mut replacements: HashMap<String, String> = HashMap::new();
    for (url, result) in fetched {
        match result {
            Ok(data_uri) => {
                report.embedded += 1;
                for src in sources_for.remove(&url).unwrap_or_default() {
                    replacements.insert(src, data_uri.clone());
                }
            }
            Err(error) => {
                warn!("Failed to embed image '{}': {}", url, error);
                report.failed.push(ImageFailure { url, error });
            }
        }
    }

    let blocks = rewrite_blocks(blocks, &replacements);
    (blocks, report)
}

/// Fetch one image and encode it as a `data:` URI.
async fn fetch_data_uri(fetcher: &dyn ContentFetcher, url: &str) -> Result<String, ImageError> {
    let fetched = fetcher.fetch_binary(url).await.map_err(|e| match e {
        Readme2HtmlError::FetchFailed { status, .. } => ImageError::Fetch { status },
        other => ImageError::Network {
            reason: other.to_string(),
        },
    })?;

    let mime = decide_mime(fetched.content_type.as_deref(), url);
    Ok(format!("data:{mime};base64,{}", BASE64.encode(&fetched.bytes)))
}

/// Resolve an image reference to an absolute URL. Absolute `http(s)` URLs
/// pass through; everything else is joined against the document's directory.
fn resolve_reference(src: &str, base_url: &Url) -> Result<String, ImageError> {
    match Url::parse(src) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(url.into()),
        Ok(url) => Err(ImageError::UnresolvableReference {
            src: src.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        // Relative reference.
        Err(_) => base_url
            .join(src)
            .map(Into::into)
            .map_err(|e| ImageError::UnresolvableReference {
                src: src.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Pick the MIME type for the data URI: the server's declared type wins
/// unless it is absent or the generic `application/octet-stream`, in which
/// case the file extension decides, falling back to `image/png`.
fn decide_mime(content_type: Option<&str>, url: &str) -> String {
    if let Some(ct) = content_type {
        if !ct.is_empty() && ct != "application/octet-stream" {
            return ct.to_string();
        }
    }
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        _ => "image/png",
    }
    .to_string()
}

// ── Reference collection ─────────────────────────────────────────────────

/// Every distinct image reference in the tree, in first-appearance order.
/// `data:` URIs are already inline and are skipped.
fn collect_refs(blocks: &[Block]) -> Vec<String> {
    let mut refs: Vec<String> = Vec::new();
    let mut push = |src: &str| {
        if !src.is_empty() && !src.starts_with("data:") && !refs.iter().any(|r| r == src) {
            refs.push(src.to_string());
        }
    };
    visit_blocks(blocks, &mut push);
    refs
}

fn visit_blocks(blocks: &[Block], push: &mut impl FnMut(&str)) {
    for block in blocks {
        match block {
            Block::Paragraph(inlines) | Block::Heading { content: inlines, .. } => {
                visit_inlines(inlines, push)
            }
            Block::BlockQuote { children, .. } => visit_blocks(children, push),
            Block::List { items, .. } => {
                for item in items {
                    visit_blocks(item, push);
                }
            }
            Block::Table { header, rows, .. } => {
                for cell in header.iter().chain(rows.iter().flatten()) {
                    visit_inlines(cell, push);
                }
            }
            Block::HtmlBlock(html) => visit_html(html, push),
            Block::CodeBlock { .. } | Block::Rule => {}
        }
    }
}

fn visit_inlines(inlines: &[Inline], push: &mut impl FnMut(&str)) {
    for inline in inlines {
        match inline {
            Inline::Image { url, .. } => push(url),
            Inline::Html(html) => visit_html(html, push),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Link { children, .. } => visit_inlines(children, push),
            _ => {}
        }
    }
}

fn visit_html(html: &str, push: &mut impl FnMut(&str)) {
    for caps in RE_IMG_SRC.captures_iter(html) {
        push(&caps[2]);
    }
}

// ── Substitution ─────────────────────────────────────────────────────────

fn rewrite_blocks(blocks: Vec<Block>, map: &HashMap<String, String>) -> Vec<Block> {
    blocks
        .into_iter()
        .map(|block| match block {
            Block::Paragraph(inlines) => Block::Paragraph(rewrite_inlines(inlines, map)),
            Block::Heading { level, content } => Block::Heading {
                level,
                content: rewrite_inlines(content, map),
            },
            Block::BlockQuote { callout, children } => Block::BlockQuote {
                callout,
                children: rewrite_blocks(children, map),
            },
            Block::List { start, items } => Block::List {
                start,
                items: items.into_iter().map(|i| rewrite_blocks(i, map)).collect(),
            },
            Block::Table {
                alignments,
                header,
                rows,
            } => Block::Table {
                alignments,
                header: header
                    .into_iter()
                    .map(|c| rewrite_inlines(c, map))
                    .collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(|c| rewrite_inlines(c, map)).collect())
                    .collect(),
            },
            Block::HtmlBlock(html) => Block::HtmlBlock(rewrite_html(&html, map)),
            other @ (Block::CodeBlock { .. } | Block::Rule) => other,
        })
        .collect()
}

fn rewrite_inlines(inlines: Vec<Inline>, map: &HashMap<String, String>) -> Vec<Inline> {
    inlines
        .into_iter()
        .map(|inline| match inline {
            Inline::Image { url, title, alt } => {
                let url = map.get(&url).cloned().unwrap_or(url);
                Inline::Image { url, title, alt }
            }
            Inline::Html(html) => Inline::Html(rewrite_html(&html, map)),
            Inline::Emphasis(children) => Inline::Emphasis(rewrite_inlines(children, map)),
            Inline::Strong(children) => Inline::Strong(rewrite_inlines(children, map)),
            Inline::Strikethrough(children) => {
                Inline::Strikethrough(rewrite_inlines(children, map))
            }
            Inline::Link {
                url,
                title,
                children,
            } => Inline::Link {
                url,
                title,
                children: rewrite_inlines(children, map),
            },
            other => other,
        })
        .collect()
}

fn rewrite_html(html: &str, map: &HashMap<String, String>) -> String {
    RE_IMG_SRC
        .replace_all(html, |caps: &Captures| {
            let src = &caps[2];
            match map.get(src) {
                Some(data_uri) => format!("{}{}{}", &caps[1], data_uri, &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fetch::FetchedBytes;
    use async_trait::async_trait;

    /// Serves bytes for known URLs, 404s the rest; counts binary fetches.
    struct MapFetcher {
        images: HashMap<String, (Vec<u8>, Option<String>)>,
        fetches: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ContentFetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, Readme2HtmlError> {
            Err(Readme2HtmlError::FetchFailed {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_binary(&self, url: &str) -> Result<FetchedBytes, Readme2HtmlError> {
            self.fetches
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            match self.images.get(url) {
                Some((bytes, content_type)) => Ok(FetchedBytes {
                    bytes: bytes.clone(),
                    content_type: content_type.clone(),
                }),
                None => Err(Readme2HtmlError::FetchFailed {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn base() -> Url {
        Url::parse("https://raw.githubusercontent.com/user/repo/main/").unwrap()
    }

    fn map_fetcher(urls: &[(&str, &[u8], Option<&str>)]) -> Arc<MapFetcher> {
        Arc::new(MapFetcher {
            images: urls
                .iter()
                .map(|(u, b, ct)| (u.to_string(), (b.to_vec(), ct.map(String::from))))
                .collect(),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    fn fetcher_with(urls: &[(&str, &[u8], Option<&str>)]) -> Arc<dyn ContentFetcher> {
        map_fetcher(urls)
    }

    fn image_block(url: &str) -> Block {
        Block::Paragraph(vec![Inline::Image {
            url: url.to_string(),
            title: String::new(),
            alt: "x".to_string(),
        }])
    }

    fn image_url(block: &Block) -> &str {
        match block {
            Block::Paragraph(inlines) => match &inlines[0] {
                Inline::Image { url, .. } => url,
                other => panic!("expected image, got {other:?}"),
            },
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn relative_reference_resolved_and_embedded() {
        let fetcher = fetcher_with(&[(
            "https://raw.githubusercontent.com/user/repo/main/img/logo.png",
            b"\x89PNG",
            Some("image/png"),
        )]);
        let blocks = vec![image_block("img/logo.png")];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.found, 1);
        assert_eq!(report.embedded, 1);
        assert!(report.failed.is_empty());
        let url = image_url(&blocks[0]);
        assert!(url.starts_with("data:image/png;base64,"), "got {url}");
        assert!(url.ends_with(&BASE64.encode(b"\x89PNG")));
    }

    #[tokio::test]
    async fn second_of_three_failing_leaves_original_and_reports_once() {
        let fetcher = fetcher_with(&[
            ("https://example.com/a.png", b"a".as_slice(), Some("image/png")),
            ("https://example.com/c.png", b"c".as_slice(), Some("image/png")),
        ]);
        let blocks = vec![
            image_block("https://example.com/a.png"),
            image_block("https://example.com/b.png"),
            image_block("https://example.com/c.png"),
        ];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.found, 3);
        assert_eq!(report.embedded, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].url, "https://example.com/b.png");
        assert!(matches!(report.failed[0].error, ImageError::Fetch { status: 404 }));
        assert!(image_url(&blocks[0]).starts_with("data:"));
        assert_eq!(image_url(&blocks[1]), "https://example.com/b.png");
        assert!(image_url(&blocks[2]).starts_with("data:"));
    }

    #[tokio::test]
    async fn duplicate_reference_fetched_once_rewritten_everywhere() {
        let fetcher = fetcher_with(&[(
            "https://example.com/x.png",
            b"x".as_slice(),
            Some("image/png"),
        )]);
        let blocks = vec![
            image_block("https://example.com/x.png"),
            image_block("https://example.com/x.png"),
        ];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.found, 1, "duplicates collapse to one reference");
        assert_eq!(report.embedded, 1);
        assert!(image_url(&blocks[0]).starts_with("data:"));
        assert!(image_url(&blocks[1]).starts_with("data:"));
    }

    #[tokio::test]
    async fn aliased_spellings_of_one_target_fetch_once() {
        let fetcher = map_fetcher(&[(
            "https://raw.githubusercontent.com/user/repo/main/assets/x.png",
            b"x".as_slice(),
            Some("image/png"),
        )]);
        let blocks = vec![
            image_block("assets/x.png"),
            image_block("./assets/x.png"),
        ];
        let (blocks, report) =
            inline_images(blocks, &base(), fetcher.clone() as Arc<dyn ContentFetcher>, 4).await;
        assert_eq!(report.found, 1, "aliases collapse to one reference");
        assert_eq!(report.embedded, 1);
        assert_eq!(fetcher.fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(image_url(&blocks[0]).starts_with("data:"));
        assert!(image_url(&blocks[1]).starts_with("data:"), "both spellings rewritten");
    }

    #[tokio::test]
    async fn aliased_spellings_of_one_failing_target_reported_once() {
        let fetcher = map_fetcher(&[]);
        let blocks = vec![
            image_block("assets/x.png"),
            image_block("./assets/x.png"),
        ];
        let (blocks, report) =
            inline_images(blocks, &base(), fetcher.clone() as Arc<dyn ContentFetcher>, 4).await;
        assert_eq!(report.found, 1);
        assert_eq!(report.failed.len(), 1, "one failure for one target");
        assert_eq!(
            report.failed[0].url,
            "https://raw.githubusercontent.com/user/repo/main/assets/x.png"
        );
        assert_eq!(fetcher.fetches.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(image_url(&blocks[0]), "assets/x.png");
        assert_eq!(image_url(&blocks[1]), "./assets/x.png");
    }

    #[tokio::test]
    async fn html_img_src_rewritten_in_place() {
        let fetcher = fetcher_with(&[(
            "https://raw.githubusercontent.com/user/repo/main/shot.png",
            b"s".as_slice(),
            Some("image/png"),
        )]);
        let blocks = vec![Block::HtmlBlock(
            "<p align=\"center\"><img src=\"shot.png\" width=\"400\"></p>".into(),
        )];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.embedded, 1);
        match &blocks[0] {
            Block::HtmlBlock(html) => {
                assert!(html.contains("src=\"data:image/png;base64,"), "got {html}");
                assert!(html.contains("width=\"400\""), "other attributes survive");
            }
            other => panic!("expected html block, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn image_nested_in_quote_and_list_is_found() {
        let fetcher = fetcher_with(&[(
            "https://raw.githubusercontent.com/user/repo/main/deep.png",
            b"d".as_slice(),
            Some("image/png"),
        )]);
        let blocks = vec![Block::BlockQuote {
            callout: None,
            children: vec![Block::List {
                start: None,
                items: vec![vec![image_block("deep.png")]],
            }],
        }];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.embedded, 1);
        match &blocks[0] {
            Block::BlockQuote { children, .. } => match &children[0] {
                Block::List { items, .. } => {
                    assert!(image_url(&items[0][0]).starts_with("data:"))
                }
                other => panic!("expected list, got {other:?}"),
            },
            other => panic!("expected quote, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn data_uri_reference_left_alone() {
        let fetcher = fetcher_with(&[]);
        let blocks = vec![image_block("data:image/png;base64,AAAA")];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.found, 0);
        assert_eq!(image_url(&blocks[0]), "data:image/png;base64,AAAA");
    }

    #[tokio::test]
    async fn unresolvable_reference_reported_without_fetch() {
        let fetcher = fetcher_with(&[]);
        let blocks = vec![image_block("file:///etc/passwd")];
        let (blocks, report) = inline_images(blocks, &base(), fetcher, 4).await;
        assert_eq!(report.found, 1);
        assert_eq!(report.embedded, 0);
        assert!(matches!(
            report.failed[0].error,
            ImageError::UnresolvableReference { .. }
        ));
        assert_eq!(image_url(&blocks[0]), "file:///etc/passwd");
    }

    #[test]
    fn mime_prefers_declared_content_type() {
        assert_eq!(
            decide_mime(Some("image/webp"), "https://x/y.png"),
            "image/webp"
        );
    }

    #[test]
    fn mime_falls_back_to_extension_then_png() {
        assert_eq!(
            decide_mime(Some("application/octet-stream"), "https://x/pic.svg"),
            "image/svg+xml"
        );
        assert_eq!(decide_mime(None, "https://x/photo.JPEG?raw=1"), "image/jpeg");
        assert_eq!(decide_mime(None, "https://x/noext"), "image/png");
    }
}
