use blog_client::types::{Article, ArticleSummary, ExportedFile, SaveReceipt};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};

pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic";
const DEFAULT_TITLE_PREFIX: &str = "Blog article";

/// Everything the front-end shows, owned in one place.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub topic: String,
    pub loading: bool,
    pub view: ContentView,
    pub current_article: Option<CurrentArticle>,
    pub articles: Vec<ArticleSummary>,
    pub notice: Option<Notice>,
    pub pending_export: Option<ExportedFile>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ContentView {
    #[default]
    Empty,
    Article,
    Error(String),
}

/// Raw markdown currently on screen. `id` is set once the text is known to the
/// server, either because it was opened from the list or saved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentArticle {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn message(&self) -> &str {
        match self {
            Notice::Info(message) | Notice::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

/// User intents plus the outcomes of the effects they trigger.
#[derive(Debug, Clone)]
pub enum Event {
    TopicChanged(String),
    /// Text supplied from outside the generator, e.g. a file or a previous run.
    DraftLoaded(CurrentArticle),
    Submit,
    Generated(Result<String, String>),
    SaveRequested {
        title: Option<String>,
        requested_at: OffsetDateTime,
    },
    Saved(Result<SaveReceipt, String>),
    ListRequested,
    Listed(Result<Vec<ArticleSummary>, String>),
    OpenRequested(i64),
    Opened(Result<Article, String>),
    DeleteRequested(i64),
    Deleted {
        id: i64,
        result: Result<Option<String>, String>,
    },
    ExportRequested {
        title: Option<String>,
        requested_at: OffsetDateTime,
    },
    ExportArticleRequested(i64),
    Exported(Result<ExportedFile, String>),
}

/// Side effects requested by [`update`]; executed by [`crate::session::Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Generate { topic: String },
    Save { title: String, content: String },
    List,
    Open { id: i64 },
    Delete { id: i64 },
    ExportText { title: String, content: String },
    ExportArticle { id: i64 },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::Generate { .. } => "generate",
            Effect::Save { .. } => "save",
            Effect::List => "list",
            Effect::Open { .. } => "open",
            Effect::Delete { .. } => "delete",
            Effect::ExportText { .. } => "export_text",
            Effect::ExportArticle { .. } => "export_article",
        }
    }
}

/// Apply `event` to `state`, returning the effect to run next, if any.
pub fn update(state: &mut UiState, event: Event) -> Option<Effect> {
    match event {
        Event::TopicChanged(topic) => {
            state.topic = topic;
            None
        }
        Event::DraftLoaded(draft) => {
            state.current_article = Some(draft);
            state.view = ContentView::Article;
            None
        }
        Event::Submit => {
            let topic = state.topic.trim().to_string();
            if topic.is_empty() {
                state.notice = Some(Notice::Error(EMPTY_TOPIC_MESSAGE.to_string()));
                return None;
            }
            state.loading = true;
            state.view = ContentView::Empty;
            state.notice = None;
            Some(Effect::Generate { topic })
        }
        Event::Generated(Ok(content)) => {
            state.loading = false;
            state.current_article = Some(CurrentArticle {
                id: None,
                title: None,
                content,
            });
            state.view = ContentView::Article;
            None
        }
        Event::Generated(Err(message)) | Event::Opened(Err(message)) => {
            state.loading = false;
            state.view = ContentView::Error(message);
            None
        }
        Event::SaveRequested {
            title,
            requested_at,
        } => {
            let Some(current) = &state.current_article else {
                state.notice = Some(Notice::Error("Nothing to save".to_string()));
                return None;
            };
            Some(Effect::Save {
                title: resolve_title(title, current, requested_at),
                content: current.content.clone(),
            })
        }
        Event::Saved(Ok(receipt)) => {
            if let (Some(current), Some(saved)) = (&mut state.current_article, receipt.article) {
                current.id = Some(saved.id);
                if saved.title.is_some() {
                    current.title = saved.title;
                }
            }
            state.notice = Some(Notice::Info(
                receipt
                    .message
                    .unwrap_or_else(|| "Article saved".to_string()),
            ));
            Some(Effect::List)
        }
        Event::Saved(Err(message)) => {
            state.notice = Some(Notice::Error(format!("Failed to save: {message}")));
            None
        }
        Event::ListRequested => Some(Effect::List),
        Event::Listed(Ok(articles)) => {
            state.articles = articles;
            None
        }
        Event::Listed(Err(message)) => {
            state.notice = Some(Notice::Error(format!(
                "Failed to load articles: {message}"
            )));
            None
        }
        Event::OpenRequested(id) => {
            state.loading = true;
            Some(Effect::Open { id })
        }
        Event::Opened(Ok(article)) => {
            state.loading = false;
            state.current_article = Some(CurrentArticle {
                id: Some(article.id),
                title: Some(article.title),
                content: article.content,
            });
            state.view = ContentView::Article;
            None
        }
        Event::DeleteRequested(id) => Some(Effect::Delete { id }),
        Event::Deleted { id, result } => {
            match result {
                Ok(message) => {
                    state.articles.retain(|article| article.id != id);
                    let showing_deleted = state
                        .current_article
                        .as_ref()
                        .is_some_and(|current| current.id == Some(id));
                    if showing_deleted {
                        state.current_article = None;
                        state.view = ContentView::Empty;
                    }
                    state.notice = Some(Notice::Info(
                        message.unwrap_or_else(|| "Article deleted".to_string()),
                    ));
                }
                Err(message) => {
                    state.notice = Some(Notice::Error(format!("Failed to delete: {message}")));
                }
            }
            None
        }
        Event::ExportRequested {
            title,
            requested_at,
        } => {
            let Some(current) = &state.current_article else {
                state.notice = Some(Notice::Error("Nothing to export".to_string()));
                return None;
            };
            match current.id {
                Some(id) => Some(Effect::ExportArticle { id }),
                None => Some(Effect::ExportText {
                    title: resolve_title(title, current, requested_at),
                    content: current.content.clone(),
                }),
            }
        }
        Event::ExportArticleRequested(id) => Some(Effect::ExportArticle { id }),
        Event::Exported(Ok(file)) => {
            state.notice = Some(Notice::Info(format!("Exported {}", file.file_name)));
            state.pending_export = Some(file);
            None
        }
        Event::Exported(Err(message)) => {
            state.notice = Some(Notice::Error(format!("Failed to export: {message}")));
            None
        }
    }
}

fn resolve_title(
    requested: Option<String>,
    current: &CurrentArticle,
    requested_at: OffsetDateTime,
) -> String {
    requested
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .or_else(|| current.title.clone())
        .unwrap_or_else(|| default_title(requested_at))
}

/// Title used when the user saves without naming the article.
pub fn default_title(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    match at.format(&format) {
        Ok(stamp) => format!("{DEFAULT_TITLE_PREFIX} - {stamp}"),
        Err(_) => DEFAULT_TITLE_PREFIX.to_string(),
    }
}
