//! Regex-driven conversion of the markdown subset emitted by the generator.
//!
//! The pipeline is a fixed sequence of substitutions. Each pass sees the output
//! of the previous one, so inline markers are rewritten before block markers and
//! paragraphs are assembled last. Malformed markers are left as literal text.
//! Input is not HTML-escaped; use [`crate::plain`] when the source must be
//! treated as untrusted text.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold regex"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("italic regex"));
static H1_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# ([^\r\n]*)\n").expect("h1 regex"));
static H2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## ([^\r\n]*)\n").expect("h2 regex"));
static LIST_ITEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^- ([^\r\n]*)(?:\n|\z)").expect("list item regex"));
static LIST_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)(?:<li>.*?</li>)+").expect("list run regex"));
static LEADING_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^</?([A-Za-z][A-Za-z0-9]*)").expect("leading tag regex"));

/// Elements that already form a block; segments opening with one of these are
/// not wrapped in `<p>`.
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "details",
    "div",
    "dl",
    "fieldset",
    "figure",
    "footer",
    "form",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "p",
    "pre",
    "section",
    "table",
    "ul",
];

/// Render markdown-lite text as HTML.
///
/// Total over all inputs: the empty string renders as the empty string and
/// unrecognised markup passes through untouched.
#[must_use]
pub fn format(text: &str) -> String {
    let text = BOLD_RE.replace_all(text, "<strong>${1}</strong>");
    let text = ITALIC_RE.replace_all(&text, "<em>${1}</em>");
    let text = H1_RE.replace_all(&text, "<h1>${1}</h1>\n");
    let text = H2_RE.replace_all(&text, "<h2>${1}</h2>\n");
    let text = LIST_ITEM_RE.replace_all(&text, "<li>${1}</li>");
    let text = LIST_RUN_RE.replace_all(&text, "<ul>${0}</ul>");
    wrap_paragraphs(&text)
}

fn wrap_paragraphs(text: &str) -> String {
    text.split("\n\n")
        .filter(|segment| !segment.trim().is_empty())
        .map(|segment| {
            if starts_with_block_tag(segment) {
                Cow::Borrowed(segment)
            } else {
                Cow::Owned(format!("<p>{segment}</p>"))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn starts_with_block_tag(segment: &str) -> bool {
    LEADING_TAG_RE
        .captures(segment.trim_start())
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_ascii_lowercase())
        .is_some_and(|name| BLOCK_TAGS.contains(&name.as_str()))
}
