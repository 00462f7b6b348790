//! Callout normalisation: rewrite GitHub callout markers into one canonical
//! form before parsing.
//!
//! READMEs in the wild spell callouts two ways: the modern alert syntax
//! `> [!WARNING]` and the older bold-emphasis form `> **[WARNING]** text`.
//! The parser's GFM extension only understands the former, with the marker
//! alone on the opening line. This pass rewrites every recognised marker into
//! that canonical shape and moves any trailing text onto its own quote line.
//!
//! Invariants:
//! * Byte-for-byte identical output outside recognised callout spans.
//! * Idempotent — already-canonical lines reproduce themselves exactly.
//! * Fenced code regions are skip-scanned verbatim, so a `> [!NOTE]` inside
//!   a code sample is never rewritten.
//! * Every blockquote nesting level is checked independently (a marker in a
//!   `> >` line is rewritten at its own depth).

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading blockquote prefix: up to 3 spaces of indent, then one or more
/// `>` markers each optionally followed by a space or tab.
static RE_QUOTE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\s{0,3}(?:>[ \t]?)+)(.*)$").unwrap());

/// Older bold-emphasis marker: `**[WARNING]** optional trailing text`.
static RE_BOLD_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\*\*\[(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\]\*\*[ \t]*(.*)$").unwrap()
});

/// Alert marker: `[!WARNING] optional trailing text`.
static RE_ALERT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\[!(NOTE|TIP|IMPORTANT|WARNING|CAUTION)\][ \t]*(.*)$").unwrap()
});

/// Rewrite recognised callout markers into canonical `[!KIND]` lines.
///
/// Lines inside fenced code blocks (``` or ~~~, including fences nested in
/// blockquotes) pass through verbatim. All other lines that do not open a
/// callout are untouched, byte for byte.
pub fn normalize(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    // (fence char, fence length, quote depth) while a fenced block is open.
    let mut open_fence: Option<(char, usize, usize)> = None;

    for raw_line in text.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);

        // Strip any quote prefix before looking for fences, so fenced blocks
        // inside blockquotes are also skip-scanned.
        let (prefix, content) = split_quote_prefix(line);
        let depth = prefix.map(|p| p.matches('>').count()).unwrap_or(0);

        if let Some((ch, len, fence_depth)) = open_fence {
            // A fence opened inside a blockquote ends with the quote itself;
            // a line at lower quote depth is already outside it.
            if depth < fence_depth {
                open_fence = None;
            } else {
                if is_fence_close(content, ch, len) {
                    open_fence = None;
                }
                out.push(raw_line.to_string());
                continue;
            }
        }

        if let Some((ch, len)) = fence_open(content) {
            open_fence = Some((ch, len, depth));
            out.push(raw_line.to_string());
            continue;
        }

        let Some(prefix) = prefix else {
            out.push(raw_line.to_string());
            continue;
        };

        let marker = RE_ALERT_MARKER
            .captures(content)
            .or_else(|| RE_BOLD_MARKER.captures(content));

        match marker {
            Some(caps) => {
                let kind = caps[1].to_uppercase();
                let rest = caps[2].trim_end();
                out.push(format!("{prefix}[!{kind}]"));
                if !rest.is_empty() {
                    out.push(format!("{prefix}{rest}"));
                }
            }
            None => out.push(raw_line.to_string()),
        }
    }

    out.join("\n")
}

/// Split a line into its blockquote prefix (if any) and the remaining
/// content. Returns `(None, line)` for non-quote lines.
fn split_quote_prefix(line: &str) -> (Option<&str>, &str) {
    match RE_QUOTE_PREFIX.captures(line) {
        Some(caps) => {
            let prefix = caps.get(1).map(|m| m.as_str());
            let content = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            (prefix, content)
        }
        None => (None, line),
    }
}

/// A fence opener: three or more backticks or tildes, possibly indented.
/// Backtick info strings may not contain further backticks.
fn fence_open(content: &str) -> Option<(char, usize)> {
    let trimmed = content.trim_start();
    for ch in ['`', '~'] {
        let len = trimmed.chars().take_while(|&c| c == ch).count();
        if len >= 3 {
            if ch == '`' && trimmed[len..].contains('`') {
                return None;
            }
            return Some((ch, len));
        }
    }
    None
}

/// A fence closer: at least as many of the opening character, nothing but
/// whitespace after.
fn is_fence_close(content: &str, ch: char, open_len: usize) -> bool {
    let trimmed = content.trim_start();
    let len = trimmed.chars().take_while(|&c| c == ch).count();
    len >= open_len && trimmed[len..].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_marker_rewritten_with_trailing_text() {
        let input = "> **[WARNING]** be careful";
        assert_eq!(normalize(input), "> [!WARNING]\n> be careful");
    }

    #[test]
    fn alert_marker_uppercased_and_split() {
        let input = "> [!note] remember this";
        assert_eq!(normalize(input), "> [!NOTE]\n> remember this");
    }

    #[test]
    fn canonical_form_untouched() {
        let input = "> [!IMPORTANT]\n> body text";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn idempotent() {
        let input = "> **[Tip]** do the thing\n> more\n\nplain text\n";
        let once = normalize(input);
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn plain_blockquote_passes_through() {
        let input = "> not a callout\n> second line";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn unknown_keyword_passes_through() {
        let input = "> [!DANGER] not in the set";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn body_lines_of_callout_untouched() {
        let input = "> **[NOTE]**\n> > nested quote\n> - list item";
        assert_eq!(normalize(input), "> [!NOTE]\n> > nested quote\n> - list item");
    }

    #[test]
    fn nested_quote_level_checked_independently() {
        let input = "> outer\n> > **[CAUTION]** inner";
        assert_eq!(normalize(input), "> outer\n> > [!CAUTION]\n> > inner");
    }

    #[test]
    fn markers_inside_fenced_code_are_ignored() {
        let input = "```md\n> **[WARNING]** sample\n```\n> **[WARNING]** real";
        assert_eq!(
            normalize(input),
            "```md\n> **[WARNING]** sample\n```\n> [!WARNING]\n> real"
        );
    }

    #[test]
    fn fence_inside_blockquote_is_skip_scanned() {
        let input = "> ```\n> **[NOTE]** in code\n> ```";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn unclosed_fence_in_quote_ends_with_the_quote() {
        let input = "> ```\n> still code\n\nplain\n\n> **[TIP]** real";
        let out = normalize(input);
        assert!(out.contains("> still code"), "fence body untouched: {out}");
        assert!(out.ends_with("> [!TIP]\n> real"), "marker after the quote must rewrite: {out}");
    }

    #[test]
    fn tilde_fences_also_skip() {
        let input = "~~~\n> [!tip] in code\n~~~";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn non_callout_text_is_byte_identical() {
        let input = "# Title\n\nSome *text* with `code`.\n\n| a | b |\n|---|---|\n";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn preserves_trailing_newline() {
        assert_eq!(normalize("plain\n"), "plain\n");
        assert_eq!(normalize("plain"), "plain");
    }

    #[test]
    fn longer_close_fence_required_for_longer_open() {
        // A ```` fence is not closed by ```
        let input = "````\n> [!note] x\n```\n> [!note] y\n````\n> [!note] z";
        let out = normalize(input);
        assert!(out.contains("> [!note] x"), "inside fence must be verbatim");
        assert!(out.contains("> [!note] y"), "still inside fence");
        assert!(out.ends_with("> [!NOTE]\n> z"), "after close must rewrite: {out}");
    }
}
