//! HTML rendering for generated blog content.
//!
//! Two rendering policies exist and a caller picks exactly one through
//! [`FormatPolicy`]:
//!
//! - [`FormatPolicy::MarkdownLite`] runs [`markdown_lite::format`], which
//!   understands bold, italic, two heading levels, unordered lists and
//!   paragraphs, and passes any other markup through unescaped.
//! - [`FormatPolicy::PlainText`] runs [`plain::format`], which escapes the text
//!   and converts newlines to `<br>` without interpreting markdown.

pub mod markdown_lite;
pub mod plain;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatPolicy {
    #[default]
    MarkdownLite,
    PlainText,
}

impl FormatPolicy {
    pub const ALL: [FormatPolicy; 2] = [FormatPolicy::MarkdownLite, FormatPolicy::PlainText];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarkdownLite => "markdown-lite",
            Self::PlainText => "plain-text",
        }
    }

    /// Render `text` as HTML under this policy.
    #[must_use]
    pub fn render(&self, text: &str) -> String {
        match self {
            Self::MarkdownLite => markdown_lite::format(text),
            Self::PlainText => plain::format(text),
        }
    }
}

impl fmt::Display for FormatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown format policy `{0}` (expected `markdown-lite` or `plain-text`)")]
pub struct PolicyParseError(pub String);

impl FromStr for FormatPolicy {
    type Err = PolicyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|policy| policy.as_str() == normalized)
            .ok_or_else(|| PolicyParseError(value.to_string()))
    }
}
