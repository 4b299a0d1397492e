use anyhow::{Context, Result};
use blog_client::BlogClient;
use tracing::info;

pub mod export;
pub mod render;
pub mod session;
pub mod settings;
pub mod state;

pub use render::{render, RenderedView};
pub use session::Session;
pub use settings::{Loader, Settings};
pub use state::{update, ContentView, CurrentArticle, Effect, Event, Notice, UiState};

/// Build an HTTP-backed session from resolved settings.
pub fn bootstrap(settings: &Settings) -> Result<Session<BlogClient>> {
    let client = BlogClient::with_config(settings.client_config())
        .context("failed to build the blog HTTP client")?;

    info!(
        target: "blog_core",
        base_url = %settings.server.base_url,
        timeout_secs = settings.server.timeout_secs,
        policy = %settings.render.policy,
        "session initialized"
    );

    Ok(Session::new(client, settings.render.policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_format::FormatPolicy;

    #[test]
    fn bootstrap_uses_configured_policy() {
        let settings = Loader::new()
            .set_override("render.policy", "plain-text")
            .expect("override to apply")
            .build()
            .expect("settings");
        let session = bootstrap(&settings).expect("bootstrap succeeds");
        assert_eq!(session.policy(), FormatPolicy::PlainText);
        assert!(session.render().content_html.is_empty());
    }
}
