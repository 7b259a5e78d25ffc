//! HTML flattening for notification bodies
//!
//! Notification mails are table-heavy HTML. Block-level closers become line
//! breaks before tags are stripped so adjacent fields are not smashed into
//! one token, then the fixed entity set is decoded and whitespace collapsed.

use regex::Regex;
use std::sync::LazyLock;

static BLOCK_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</tr>|</p>|</div>").unwrap());
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse an HTML document to a single line of field-separated text
pub fn flatten_html(html: &str) -> String {
    let text = BLOCK_BREAKS.replace_all(html, "\n");
    let text = TAGS.replace_all(&text, " ");
    let text = text.replace("&#8377;", "₹").replace("&nbsp;", " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_tags_separate_fields() {
        let html = "<table><tr><td>Order ID:</td><td>ABC123</td></tr><tr><td>From</td><td>someone@upi</td></tr></table>";
        let text = flatten_html(html);
        assert_eq!(text, "Order ID: ABC123 From someone@upi");
    }

    #[test]
    fn test_br_variants_break_lines() {
        assert_eq!(flatten_html("a<br>b<BR/>c<br />d"), "a b c d");
    }

    #[test]
    fn test_entities_decoded_before_matching() {
        let text = flatten_html("<p>&#8377;&nbsp;1,234.50</p>");
        assert_eq!(text, "₹ 1,234.50");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(flatten_html("<div>  a\n\n b </div>"), "a b");
    }
}
