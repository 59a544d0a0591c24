//! Markdown to HTML for message bubbles
//!
//! Assistant replies may carry markdown. Content goes through pulldown-cmark,
//! loses its paragraph wrapper when it is a single paragraph (so short replies
//! render inline), and is then sanitized against an allow-list before anyone
//! inserts it into a page.

use std::collections::HashSet;

use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};

/// Render markdown text to an HTML string
pub fn markdown_to_html(text: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
    let parser = Parser::new_ext(text, options);

    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Drop the `<p>`/`</p>` pair around single-paragraph output.
/// Multi-paragraph or non-paragraph output is returned unchanged (minus
/// surrounding whitespace).
pub fn strip_paragraph_wrapper(html: &str) -> &str {
    let trimmed = html.trim();

    if trimmed.matches("<p>").count() != 1 {
        return trimmed;
    }

    trimmed
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
        .unwrap_or(trimmed)
}

fn sanitizer() -> Builder<'static> {
    let mut builder = Builder::default();
    builder
        .url_schemes(HashSet::from(["http", "https", "mailto"]))
        .link_rel(Some("noopener noreferrer"));
    builder
}

/// Clean an HTML fragment against the allow-list. Scripts, event handler
/// attributes and unknown URL schemes are removed.
pub fn sanitize_html(html: &str) -> String {
    sanitizer().clean(html).to_string()
}

/// Full pipeline for one message's content: markdown, unwrap, sanitize.
pub fn render_content(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let html = markdown_to_html(content);
    sanitize_html(strip_paragraph_wrapper(&html))
}
