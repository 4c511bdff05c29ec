//! Field normalization shared by all source extractors.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// Sentinel for records whose payload carries no author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Sentinel for records without a usable price.
pub const PRICE_UNAVAILABLE: &str = "0.00";

/// Block-level tags that become line breaks when markup is stripped.
static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|ul|ol|h[1-6]|tr|table|blockquote)\b[^>]*>")
        .expect("invalid block tag pattern")
});

/// Strip markup from a description, keeping block breaks as newlines.
///
/// Inline tags disappear, entities are decoded, and each block
/// boundary collapses to a single newline. Surrounding whitespace is
/// trimmed.
pub fn strip_markup(html: &str) -> String {
    let with_breaks = BLOCK_TAGS.replace_all(html, "\n");
    let fragment = Html::parse_fragment(&with_breaks);
    let text: String = fragment.root_element().text().collect();

    let mut out = String::with_capacity(text.len());
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line);
    }
    out
}

/// Normalize a price to a two-decimal string, `"0.00"` when absent.
pub fn normalize_price(price: Option<f64>) -> String {
    match price {
        Some(v) if v.is_finite() => format!("{v:.2}"),
        _ => PRICE_UNAVAILABLE.to_string(),
    }
}

/// Make a title/author combination safe to use as a filename.
///
/// Path separators become underscores (matching how the collectors
/// always renamed `Foo/Bar` titles); the remaining reserved
/// characters and control bytes are dropped.
pub fn safe_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '/' | '\\' => out.push('_'),
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => {}
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_markup_plain_text_passes_through() {
        assert_eq!(strip_markup("A short tract."), "A short tract.");
    }

    #[test]
    fn strip_markup_block_tags_become_newlines() {
        let html = "<p>First paragraph.</p><p>Second <b>bold</b> paragraph.</p>";
        assert_eq!(
            strip_markup(html),
            "First paragraph.\nSecond bold paragraph."
        );
    }

    #[test]
    fn strip_markup_br_and_div() {
        let html = "<div>line one<br>line two</div>";
        assert_eq!(strip_markup(html), "line one\nline two");
    }

    #[test]
    fn strip_markup_leaves_no_tokens() {
        let html = "<p>By <a href=\"/x\">an author</a> &amp; friends</p>";
        let text = strip_markup(html);
        assert!(!text.contains('<'));
        assert!(!text.contains('>'));
        assert_eq!(text, "By an author & friends");
    }

    #[test]
    fn strip_markup_trims_surrounding_whitespace() {
        assert_eq!(strip_markup("  <p>  padded  </p>  "), "padded");
    }

    #[test]
    fn strip_markup_collapses_adjacent_blocks() {
        let html = "<p>a</p><div></div><p>b</p>";
        assert_eq!(strip_markup(html), "a\nb");
    }

    #[test]
    fn price_two_decimals() {
        assert_eq!(normalize_price(Some(12.5)), "12.50");
        assert_eq!(normalize_price(Some(3.0)), "3.00");
        assert_eq!(normalize_price(Some(0.999)), "1.00");
    }

    #[test]
    fn price_missing_is_sentinel() {
        assert_eq!(normalize_price(None), "0.00");
        assert_eq!(normalize_price(Some(f64::NAN)), "0.00");
    }

    #[test]
    fn filename_replaces_separators() {
        assert_eq!(
            safe_filename("Law/Gospel - An Author"),
            "Law_Gospel - An Author"
        );
    }

    #[test]
    fn filename_drops_reserved_chars() {
        assert_eq!(safe_filename("Who is He?: \"Volume 1\""), "Who is He Volume 1");
    }
}
