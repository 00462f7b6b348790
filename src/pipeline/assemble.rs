//! HTML assembly: document tree → body markup → complete standalone page.
//!
//! Pure string construction, no I/O. `render_body` walks the block tree and
//! emits GitHub-flavoured markup (callout divs, aligned table cells, task
//! checkboxes); `assemble` wraps a body in the full page scaffold with the
//! stylesheet inlined, so the result is a single self-contained file.

use crate::pipeline::parse::{Block, CalloutKind, ColumnAlignment, Inline};

/// Render the block tree as HTML body markup.
pub fn render_body(blocks: &[Block]) -> String {
    let mut out = String::new();
    render_blocks(blocks, &mut out);
    out
}

/// Wrap rendered body markup in a complete HTML document.
///
/// The stylesheet is embedded in a `<style>` element, never linked, so the
/// output has no external dependencies.
pub fn assemble(body: &str, title: &str, css: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         <style>\n{}\n</style>\n\
         </head>\n\
         <body>\n\
         <article class=\"markdown-body\">\n{}</article>\n\
         </body>\n\
         </html>\n",
        escape_text(title),
        css,
        body
    )
}

fn render_blocks(blocks: &[Block], out: &mut String) {
    for block in blocks {
        match block {
            Block::Paragraph(inlines) => {
                out.push_str("<p>");
                render_inlines(inlines, out);
                out.push_str("</p>\n");
            }
            Block::Heading { level, content } => {
                let level = (*level).clamp(1, 6);
                out.push_str(&format!("<h{level}>"));
                render_inlines(content, out);
                out.push_str(&format!("</h{level}>\n"));
            }
            Block::CodeBlock { language, code } => {
                match language {
                    Some(lang) => out.push_str(&format!(
                        "<pre><code class=\"language-{}\">",
                        escape_attr(lang)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&escape_text(code));
                out.push_str("</code></pre>\n");
            }
            Block::BlockQuote { callout, children } => match callout {
                Some(kind) => render_callout(*kind, children, out),
                None => {
                    out.push_str("<blockquote>\n");
                    render_blocks(children, out);
                    out.push_str("</blockquote>\n");
                }
            },
            Block::List { start, items } => {
                let close = match start {
                    None => {
                        out.push_str("<ul>\n");
                        "</ul>\n"
                    }
                    Some(1) => {
                        out.push_str("<ol>\n");
                        "</ol>\n"
                    }
                    Some(n) => {
                        out.push_str(&format!("<ol start=\"{n}\">\n"));
                        "</ol>\n"
                    }
                };
                for item in items {
                    out.push_str("<li>");
                    render_list_item(item, out);
                    out.push_str("</li>\n");
                }
                out.push_str(close);
            }
            Block::Table {
                alignments,
                header,
                rows,
            } => render_table(alignments, header, rows, out),
            Block::HtmlBlock(html) => out.push_str(html),
            Block::Rule => out.push_str("<hr>\n"),
        }
    }
}

/// A single-paragraph (tight) item renders its inlines directly; anything
/// else keeps full block markup inside the `<li>`.
fn render_list_item(item: &[Block], out: &mut String) {
    match item {
        [Block::Paragraph(inlines)] => render_inlines(inlines, out),
        _ => {
            out.push('\n');
            render_blocks(item, out);
        }
    }
}

fn render_callout(kind: CalloutKind, children: &[Block], out: &mut String) {
    out.push_str(&format!(
        "<div class=\"callout {}\">\n<p class=\"callout-title\">{}</p>\n",
        kind.css_class(),
        kind.label()
    ));
    render_blocks(children, out);
    out.push_str("</div>\n");
}

fn render_table(
    alignments: &[ColumnAlignment],
    header: &[Vec<Inline>],
    rows: &[Vec<Vec<Inline>>],
    out: &mut String,
) {
    let align_attr = |i: usize| -> &'static str {
        match alignments.get(i) {
            Some(ColumnAlignment::Left) => " style=\"text-align: left\"",
            Some(ColumnAlignment::Center) => " style=\"text-align: center\"",
            Some(ColumnAlignment::Right) => " style=\"text-align: right\"",
            _ => "",
        }
    };

    out.push_str("<table>\n<thead>\n<tr>\n");
    for (i, cell) in header.iter().enumerate() {
        out.push_str(&format!("<th{}>", align_attr(i)));
        render_inlines(cell, out);
        out.push_str("</th>\n");
    }
    out.push_str("</tr>\n</thead>\n<tbody>\n");
    for row in rows {
        out.push_str("<tr>\n");
        for (i, cell) in row.iter().enumerate() {
            out.push_str(&format!("<td{}>", align_attr(i)));
            render_inlines(cell, out);
            out.push_str("</td>\n");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</tbody>\n</table>\n");
}

fn render_inlines(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape_text(code));
                out.push_str("</code>");
            }
            Inline::Html(html) => out.push_str(html),
            Inline::SoftBreak => out.push('\n'),
            Inline::HardBreak => out.push_str("<br>\n"),
            Inline::Emphasis(children) => wrap(out, "em", children),
            Inline::Strong(children) => wrap(out, "strong", children),
            Inline::Strikethrough(children) => wrap(out, "del", children),
            Inline::Link {
                url,
                title,
                children,
            } => {
                out.push_str(&format!("<a href=\"{}\"", escape_attr(url)));
                if !title.is_empty() {
                    out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                out.push('>');
                render_inlines(children, out);
                out.push_str("</a>");
            }
            Inline::Image { url, title, alt } => {
                out.push_str(&format!(
                    "<img src=\"{}\" alt=\"{}\"",
                    escape_attr(url),
                    escape_attr(alt)
                ));
                if !title.is_empty() {
                    out.push_str(&format!(" title=\"{}\"", escape_attr(title)));
                }
                out.push('>');
            }
            Inline::TaskMarker(checked) => {
                out.push_str(if *checked {
                    "<input type=\"checkbox\" disabled checked> "
                } else {
                    "<input type=\"checkbox\" disabled> "
                });
            }
        }
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    out.push_str(&format!("<{tag}>"));
    render_inlines(children, out);
    out.push_str(&format!("</{tag}>"));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_attr(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse::parse_document;

    fn render(md: &str) -> String {
        render_body(&parse_document(md).blocks)
    }

    #[test]
    fn heading_levels() {
        assert_eq!(render("# One"), "<h1>One</h1>\n");
        assert_eq!(render("### Three"), "<h3>Three</h3>\n");
    }

    #[test]
    fn text_is_escaped_code_verbatim() {
        let html = render("a < b & `x > y`");
        assert!(html.contains("a &lt; b &amp;"));
        assert!(html.contains("<code>x &gt; y</code>"));
    }

    #[test]
    fn callout_renders_classed_div_with_title() {
        let html = render("> [!WARNING]\n> watch out");
        assert!(html.contains("<div class=\"callout warning\">"), "got {html}");
        assert!(html.contains("<p class=\"callout-title\">Warning</p>"));
        assert!(html.contains("<p>watch out</p>"));
        assert!(!html.contains("[!WARNING]"), "marker must not leak into text");
    }

    #[test]
    fn nested_quote_inside_callout_keeps_blockquote_markup() {
        let html = render("> [!NOTE]\n> outer\n> > inner");
        let div = html.find("<div class=\"callout note\">").expect("callout div");
        let quote = html.find("<blockquote>").expect("nested quote");
        let close = html.rfind("</div>").expect("div close");
        assert!(div < quote && quote < close, "nesting order wrong: {html}");
    }

    #[test]
    fn plain_blockquote_stays_blockquote() {
        let html = render("> just a quote");
        assert!(html.starts_with("<blockquote>"));
        assert!(!html.contains("callout"));
    }

    #[test]
    fn table_alignment_styles_emitted() {
        let html = render("| l | c | r |\n|:--|:-:|--:|\n| 1 | 2 | 3 |\n");
        assert!(html.contains("<th style=\"text-align: left\">"));
        assert!(html.contains("<td style=\"text-align: center\">"));
        assert!(html.contains("<td style=\"text-align: right\">"));
    }

    #[test]
    fn ordered_list_start_preserved() {
        let html = render("3. third\n4. fourth");
        assert!(html.contains("<ol start=\"3\">"), "got {html}");
        assert!(html.contains("<li>third</li>"));
    }

    #[test]
    fn tight_item_has_no_inner_paragraph() {
        let html = render("- one\n- two");
        assert!(html.contains("<li>one</li>"), "got {html}");
    }

    #[test]
    fn loose_item_keeps_paragraphs() {
        let html = render("- one\n\n  second paragraph\n- two");
        assert!(html.contains("<p>one</p>"), "got {html}");
    }

    #[test]
    fn task_markers_render_checkboxes() {
        let html = render("- [x] done\n- [ ] todo");
        assert!(html.contains("<input type=\"checkbox\" disabled checked> done"));
        assert!(html.contains("<input type=\"checkbox\" disabled> todo"));
    }

    #[test]
    fn fenced_code_with_language_class() {
        let html = render("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("fn main() {}"));
    }

    #[test]
    fn raw_html_block_passes_through() {
        let html = render("<p align=\"center\"><img src=\"x.png\"></p>\n\ntext");
        assert!(html.contains("<p align=\"center\"><img src=\"x.png\"></p>"));
    }

    #[test]
    fn link_title_and_href_escaped() {
        let html = render("[text](https://e.com/?a=1&b=2 \"the \\\"title\\\"\")");
        assert!(html.contains("href=\"https://e.com/?a=1&amp;b=2\""), "got {html}");
        assert!(html.contains("title=\"the &quot;title&quot;\""));
    }

    #[test]
    fn document_scaffold_complete() {
        let doc = assemble("<p>hi</p>\n", "repo - README.md", "body { margin: 0 }");
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<meta charset=\"utf-8\">"));
        assert!(doc.contains("<meta name=\"viewport\""));
        assert!(doc.contains("<title>repo - README.md</title>"));
        assert!(doc.contains("<style>\nbody { margin: 0 }\n</style>"));
        assert!(doc.contains("<article class=\"markdown-body\">\n<p>hi</p>\n</article>"));
        assert!(doc.ends_with("</html>\n"));
    }

    #[test]
    fn title_is_escaped_in_scaffold() {
        let doc = assemble("", "a <b> & c", "");
        assert!(doc.contains("<title>a &lt;b&gt; &amp; c</title>"));
    }
}
