//! Default stylesheet, embedded at compile time so the binary needs no
//! asset files at runtime. Callers can substitute their own CSS through
//! [`ConversionConfig::stylesheet`](crate::ConversionConfig).

/// GitHub-flavoured CSS covering the markup the assembler emits, including
/// the five callout classes.
pub const DEFAULT_STYLESHEET: &str = include_str!("../assets/github.css");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_covers_all_callout_classes() {
        for class in ["note", "tip", "important", "warning", "caution"] {
            assert!(
                DEFAULT_STYLESHEET.contains(&format!(".callout.{class}")),
                "missing rule for callout class '{class}'"
            );
        }
    }

    #[test]
    fn stylesheet_targets_the_article_wrapper() {
        assert!(DEFAULT_STYLESHEET.contains(".markdown-body"));
    }
}
