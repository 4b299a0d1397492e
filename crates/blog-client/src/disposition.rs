//! Extraction of the download file name from a `content-disposition` header.

use once_cell::sync::Lazy;
use regex::Regex;

static EXTENDED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*filename\*\s*=\s*[A-Za-z0-9_-]*'[^']*'([^;]+)")
        .expect("extended filename regex")
});
static PLAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"((?:[^"\\]|\\.)*)"|([^;]+))"#)
        .expect("filename regex")
});

/// Return the file name advertised by `header`, preferring the RFC 5987
/// `filename*` form. Directory components are stripped.
pub fn file_name(header: &str) -> Option<String> {
    let extended = EXTENDED_RE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .and_then(|value| urlencoding::decode(value.as_str().trim()).ok())
        .map(|value| value.into_owned());

    let name = extended.or_else(|| {
        PLAIN_RE.captures(header).and_then(|caps| {
            caps.get(1)
                .map(|quoted| quoted.as_str().replace("\\\"", "\"").replace("\\\\", "\\"))
                .or_else(|| caps.get(2).map(|bare| bare.as_str().trim().to_string()))
        })
    })?;

    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}
