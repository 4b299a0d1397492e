use blog_client::{types::ExportedFile, BlogApi};
use blog_format::FormatPolicy;
use tracing::{debug, warn};

use crate::{
    render::{render, RenderedView},
    state::{update, Effect, Event, UiState},
};

/// Adapter between an event source and the blog server.
///
/// Each dispatched event is run through [`update`]; any effect it requests is
/// executed against the API and its outcome is fed back in as the next event.
pub struct Session<A> {
    api: A,
    policy: FormatPolicy,
    state: UiState,
}

impl<A: BlogApi> Session<A> {
    pub fn new(api: A, policy: FormatPolicy) -> Self {
        Self {
            api,
            policy,
            state: UiState::default(),
        }
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn policy(&self) -> FormatPolicy {
        self.policy
    }

    pub fn render(&self) -> RenderedView {
        render(&self.state, self.policy)
    }

    /// Remove and return the most recent export so the caller can save it.
    pub fn take_export(&mut self) -> Option<ExportedFile> {
        self.state.pending_export.take()
    }

    pub async fn dispatch(&mut self, event: Event) -> &UiState {
        let mut next = update(&mut self.state, event);
        while let Some(effect) = next {
            debug!(target: "blog_core", effect = effect.name(), "running effect");
            let outcome = self.run(effect).await;
            next = update(&mut self.state, outcome);
        }
        &self.state
    }

    async fn run(&self, effect: Effect) -> Event {
        let name = effect.name();
        let event = match effect {
            Effect::Generate { topic } => {
                Event::Generated(self.api.generate(&topic).await.map_err(|e| e.to_string()))
            }
            Effect::Save { title, content } => Event::Saved(
                self.api
                    .save_article(&title, &content)
                    .await
                    .map_err(|e| e.to_string()),
            ),
            Effect::List => {
                Event::Listed(self.api.list_articles().await.map_err(|e| e.to_string()))
            }
            Effect::Open { id } => {
                Event::Opened(self.api.get_article(id).await.map_err(|e| e.to_string()))
            }
            Effect::Delete { id } => Event::Deleted {
                id,
                result: self.api.delete_article(id).await.map_err(|e| e.to_string()),
            },
            Effect::ExportText { title, content } => Event::Exported(
                self.api
                    .export_text(&title, &content)
                    .await
                    .map_err(|e| e.to_string()),
            ),
            Effect::ExportArticle { id } => {
                Event::Exported(self.api.export_article(id).await.map_err(|e| e.to_string()))
            }
        };
        if let Some(error) = outcome_error(&event) {
            warn!(target: "blog_core", effect = name, error, "effect failed");
        }
        event
    }
}

fn outcome_error(event: &Event) -> Option<&str> {
    match event {
        Event::Generated(Err(error))
        | Event::Saved(Err(error))
        | Event::Listed(Err(error))
        | Event::Opened(Err(error))
        | Event::Deleted {
            result: Err(error), ..
        }
        | Event::Exported(Err(error)) => Some(error),
        _ => None,
    }
}
