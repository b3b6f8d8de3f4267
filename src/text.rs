//! Plain-text rendering of post comments.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Removes the soft line-break marker the server inserts into long words.
pub fn strip_wbr(html: &str) -> String {
    html.replace("<wbr>", "")
}

/// Converts a comment's HTML into plain text.
///
/// Line breaks become `\n`, every other tag is dropped (keeping its inner
/// text) and entities are decoded last, so escaped markup survives as text.
pub fn clean_comment_body(html: &str) -> String {
    let text = strip_wbr(html);
    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    html_escape::decode_html_entities(&text).into_owned()
}
