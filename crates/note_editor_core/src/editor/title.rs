//! Default title derivation for notes the user has not titled.

use once_cell::sync::Lazy;
use regex::Regex;

/// Title used when the body has no usable text.
pub const UNTITLED_TITLE: &str = "Untitled";
const TITLE_MAX_CHARS: usize = 80;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\[\]]+"#).expect("valid markdown symbol regex"));
static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-+*]|\d+\.)\s+(?:\[[ xX]\]\s+)?").expect("valid list regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Derives a title from the first line of `body` that still has text once
/// markdown is stripped.
///
/// Rules:
/// - list markers, checkboxes, headings and emphasis symbols are dropped;
/// - links keep their label, images their alt text;
/// - whitespace is collapsed and the result capped at 80 chars;
/// - falls back to `"Untitled"`.
pub fn default_title(body: &str) -> String {
    body.lines()
        .map(plain_line)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(TITLE_MAX_CHARS).collect::<String>())
        .map(|line| line.trim_end().to_string())
        .unwrap_or_else(|| UNTITLED_TITLE.to_string())
}

fn plain_line(line: &str) -> String {
    let without_marker = LIST_MARKER_RE.replace(line, "");
    let without_images = MARKDOWN_IMAGE_RE.replace_all(&without_marker, "$1");
    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    WHITESPACE_RE
        .replace_all(&without_symbols, " ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{default_title, UNTITLED_TITLE};

    #[test]
    fn plain_body_becomes_title() {
        assert_eq!(default_title("Hello"), "Hello");
    }

    #[test]
    fn skips_blank_lines_and_strips_markdown() {
        let body = "\n   \n# **Weekly** plan\nsecond line";
        assert_eq!(default_title(body), "Weekly plan");
    }

    #[test]
    fn list_items_and_links_keep_their_text() {
        assert_eq!(
            default_title("- [ ] call [Alice](https://example.com)"),
            "call Alice"
        );
    }

    #[test]
    fn long_lines_are_capped() {
        let body = "a".repeat(200);
        assert_eq!(default_title(&body).chars().count(), 80);
    }

    #[test]
    fn empty_body_falls_back_to_untitled() {
        assert_eq!(default_title(""), UNTITLED_TITLE);
        assert_eq!(default_title("***"), UNTITLED_TITLE);
    }
}
