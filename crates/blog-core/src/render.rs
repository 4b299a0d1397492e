use blog_client::types::ArticleSummary;
use blog_format::{plain, FormatPolicy};
use serde::Serialize;

use crate::state::{ContentView, Notice, UiState};

/// Snapshot of what the front-end should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedView {
    pub loading: bool,
    pub content_html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub articles: Vec<ArticleSummary>,
}

pub fn render(state: &UiState, policy: FormatPolicy) -> RenderedView {
    let content_html = match &state.view {
        ContentView::Empty => String::new(),
        ContentView::Article => state
            .current_article
            .as_ref()
            .map(|article| policy.render(&article.content))
            .unwrap_or_default(),
        ContentView::Error(message) => error_html(message),
    };

    RenderedView {
        loading: state.loading,
        content_html,
        notice: state.notice.clone(),
        articles: state.articles.clone(),
    }
}

/// Inline error block; the message is escaped regardless of policy.
pub fn error_html(message: &str) -> String {
    format!(
        "<div class=\"error\">An error occurred: {}</div>",
        plain::format(message)
    )
}
