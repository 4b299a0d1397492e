//! Escape-and-linebreak rendering: the source is shown verbatim, never parsed.

/// Escape HTML-significant characters and turn newlines into `<br>`.
#[must_use]
pub fn format(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '\n' => out.push_str("<br>"),
            other => out.push(other),
        }
    }
    out
}
