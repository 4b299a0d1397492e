use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use blog_client::BlogApi;
use blog_core::{
    bootstrap, export::write_export, settings::default_config_path, ContentView, CurrentArticle,
    Event, Loader, Notice, Session, Settings, UiState,
};
use blog_format::FormatPolicy;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use indicatif::ProgressBar;
use output::{OutputFormat, Renderer};
use progress::spinner;
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "blog",
    version,
    about = "Generate, render and manage blog articles from the shell."
)]
struct Cli {
    /// Output renderer.
    #[arg(long, global = true, value_enum, default_value = "html")]
    format: OutputFormat,
    /// Configuration file layered over the built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the blog server base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Text-to-HTML policy: `markdown-lite` or `plain-text`.
    #[arg(long, global = true)]
    policy: Option<FormatPolicy>,
    /// Directory holding the current article between runs.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,
    /// Disable ANSI colors in CLI output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Suppress non-critical CLI output.
    #[arg(long, global = true)]
    quiet: bool,
    /// Disable progress indicators for long-running tasks.
    #[arg(long, global = true)]
    no_progress: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand, Clone)]
enum Command {
    /// Render text from a file (or stdin) as HTML without contacting the server.
    Format {
        /// Input file; `-` or omitted reads stdin.
        path: Option<PathBuf>,
    },
    /// Ask the server to write an article about a topic.
    Generate {
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
        /// Save the generated article afterwards.
        #[arg(long)]
        save: bool,
        /// Title used when saving or exporting.
        #[arg(long)]
        title: Option<String>,
        /// Download a text export of the generated article.
        #[arg(long)]
        export: bool,
        /// Directory for exported files.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Work with stored articles.
    Articles {
        #[command(subcommand)]
        command: ArticleCommand,
    },
    /// Export the current article (or a file) as a text download.
    ExportText {
        /// Input file; omitted uses the current article.
        path: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Subcommand, Clone)]
enum ArticleCommand {
    /// List saved articles.
    List,
    /// Open an article and render it.
    Show { id: i64 },
    /// Save the current article, or the contents of a file.
    Save {
        /// Input file; omitted uses the current article.
        path: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete an article.
    Delete { id: i64 },
    /// Download an article as a text file.
    Export {
        id: i64,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl Cli {
    fn progress_enabled(&self) -> bool {
        !self.quiet && !self.no_progress
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    if cli.no_color {
        std::env::set_var("NO_COLOR", "1");
    }

    if let Command::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "blog", &mut std::io::stdout());
        return Ok(());
    }

    let settings = load_settings(&cli)?;
    let renderer = Renderer::new(cli.format);

    if let Command::Format { path } = &cli.command {
        let text = read_input(path.as_deref())?;
        let html = settings.render.policy.render(&text);
        renderer.formatted(settings.render.policy, &html)?;
        return Ok(());
    }

    let mut session = bootstrap(&settings)?;
    let drafts = drafts::DraftStore::new(cli.state_dir.clone());
    drafts.restore(&mut session).await;

    let result = match cli.command.clone() {
        Command::Generate {
            topic,
            save,
            title,
            export,
            out,
        } => {
            let options = GenerateOptions {
                topic: topic.join(" "),
                save,
                title,
                export,
                out: out.unwrap_or_else(|| settings.export.directory.clone()),
            };
            handle_generate(options, &cli, &renderer, &mut session).await
        }
        Command::Articles { command } => {
            handle_article_command(command, &cli, &settings, &renderer, &mut session).await
        }
        Command::ExportText { path, title, out } => {
            if let Some(path) = path {
                load_draft(&mut session, &path).await?;
            }
            let out = out.unwrap_or_else(|| settings.export.directory.clone());
            export_current(title, &out, &cli, &renderer, &mut session).await
        }
        Command::Format { .. } | Command::Completions { .. } => Ok(()),
    };

    drafts.persist(&session).await;
    result
}

struct GenerateOptions {
    topic: String,
    save: bool,
    title: Option<String>,
    export: bool,
    out: PathBuf,
}

async fn handle_generate<A: BlogApi>(
    options: GenerateOptions,
    cli: &Cli,
    renderer: &Renderer,
    session: &mut Session<A>,
) -> Result<()> {
    session.dispatch(Event::TopicChanged(options.topic.clone())).await;
    let spinner = spinner(
        cli.progress_enabled(),
        format!("Generating an article about `{}`...", options.topic.trim()),
    );
    let state = session.dispatch(Event::Submit).await;
    let outcome = ensure_ok(state);
    finish_spinner(
        spinner,
        outcome.is_ok().then(|| "Article generated".to_string()),
    );
    outcome?;

    if options.save {
        let state = session
            .dispatch(Event::SaveRequested {
                title: options.title.clone(),
                requested_at: now(),
            })
            .await;
        ensure_ok(state)?;
    }

    if !cli.quiet {
        renderer.view(&session.render())?;
    }

    if options.export {
        export_current(options.title, &options.out, cli, renderer, session).await?;
    }
    Ok(())
}

async fn handle_article_command<A: BlogApi>(
    command: ArticleCommand,
    cli: &Cli,
    settings: &Settings,
    renderer: &Renderer,
    session: &mut Session<A>,
) -> Result<()> {
    match command {
        ArticleCommand::List => {
            let state = session.dispatch(Event::ListRequested).await;
            ensure_ok(state)?;
            if !cli.quiet {
                renderer.articles(&state.articles)?;
            }
        }
        ArticleCommand::Show { id } => {
            let spinner = spinner(cli.progress_enabled(), format!("Loading article #{id}..."));
            let state = session.dispatch(Event::OpenRequested(id)).await;
            let outcome = ensure_ok(state);
            finish_spinner(spinner, None);
            outcome?;
            if !cli.quiet {
                renderer.view(&session.render())?;
            }
        }
        ArticleCommand::Save { path, title } => {
            if let Some(path) = path {
                load_draft(session, &path).await?;
            }
            let state = session
                .dispatch(Event::SaveRequested {
                    title,
                    requested_at: now(),
                })
                .await;
            ensure_ok(state)?;
            if !cli.quiet {
                renderer.notice(state.notice.as_ref())?;
            }
        }
        ArticleCommand::Delete { id } => {
            let state = session.dispatch(Event::DeleteRequested(id)).await;
            ensure_ok(state)?;
            if !cli.quiet {
                renderer.notice(state.notice.as_ref())?;
            }
        }
        ArticleCommand::Export { id, out } => {
            let spinner = spinner(cli.progress_enabled(), format!("Exporting article #{id}..."));
            let state = session.dispatch(Event::ExportArticleRequested(id)).await;
            let outcome = ensure_ok(state);
            finish_spinner(spinner, None);
            outcome?;
            let out = out.unwrap_or_else(|| settings.export.directory.clone());
            save_pending_export(&out, cli, renderer, session).await?;
        }
    }
    Ok(())
}

async fn export_current<A: BlogApi>(
    title: Option<String>,
    out: &Path,
    cli: &Cli,
    renderer: &Renderer,
    session: &mut Session<A>,
) -> Result<()> {
    let spinner = spinner(cli.progress_enabled(), "Exporting article...");
    let state = session
        .dispatch(Event::ExportRequested {
            title,
            requested_at: now(),
        })
        .await;
    let outcome = ensure_ok(state);
    finish_spinner(spinner, None);
    outcome?;
    save_pending_export(out, cli, renderer, session).await
}

async fn save_pending_export<A: BlogApi>(
    out: &Path,
    cli: &Cli,
    renderer: &Renderer,
    session: &mut Session<A>,
) -> Result<()> {
    let file = session
        .take_export()
        .ok_or_else(|| anyhow!("server returned no export"))?;
    let path = write_export(out, &file).await?;
    if !cli.quiet {
        renderer.exported(&path)?;
    }
    Ok(())
}

async fn load_draft<A: BlogApi>(session: &mut Session<A>, path: &Path) -> Result<()> {
    let content = read_input(Some(path))?;
    session
        .dispatch(Event::DraftLoaded(CurrentArticle {
            id: None,
            title: None,
            content,
        }))
        .await;
    Ok(())
}

fn ensure_ok(state: &UiState) -> Result<()> {
    if let ContentView::Error(message) = &state.view {
        bail!("{message}");
    }
    match &state.notice {
        Some(Notice::Error(message)) => bail!("{message}"),
        _ => Ok(()),
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut loader = Loader::new();
    match &cli.config {
        Some(path) => loader = loader.with_file(path),
        None => {
            if let Some(path) = default_config_path() {
                loader = loader.with_optional_file(path);
            }
        }
    }
    loader = loader.with_env();
    if let Some(base_url) = &cli.base_url {
        loader = loader.set_override("server.base_url", base_url.as_str())?;
    }
    if let Some(policy) = cli.policy {
        loader = loader.set_override("render.policy", policy.as_str())?;
    }
    let settings = loader.build().context("invalid configuration")?;
    info!(
        target: "blog_cli",
        base_url = %settings.server.base_url,
        policy = %settings.render.policy,
        "configuration resolved"
    );
    Ok(settings)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn init_tracing(cli: &Cli) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,blog_cli=info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .without_time()
        .with_ansi(!cli.no_color)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow!("failed to initialize logging: {error}"))
}

fn finish_spinner(spinner: Option<ProgressBar>, message: Option<String>) {
    if let Some(progress) = spinner {
        if let Some(msg) = message {
            progress.finish_with_message(msg);
        } else {
            progress.finish_and_clear();
        }
    }
}

mod output {
    use std::{fmt::Write, path::Path};

    use anyhow::Result;
    use blog_client::types::ArticleSummary;
    use blog_core::{Notice, RenderedView};
    use blog_format::{plain, FormatPolicy};
    use clap::ValueEnum;
    use serde_json::json;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
    pub enum OutputFormat {
        Html,
        Json,
        Text,
    }

    #[derive(Copy, Clone, Debug)]
    pub struct Renderer {
        format: OutputFormat,
    }

    impl Renderer {
        pub fn new(format: OutputFormat) -> Self {
            Self { format }
        }

        pub fn formatted(&self, policy: FormatPolicy, html: &str) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    let payload = json!({ "policy": policy, "html": html });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                OutputFormat::Html | OutputFormat::Text => println!("{html}"),
            }
            Ok(())
        }

        pub fn view(&self, view: &RenderedView) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(view)?);
                }
                OutputFormat::Html => {
                    println!("{}", view.content_html);
                    if let Some(notice) = &view.notice {
                        println!("{}", notice_html(notice));
                    }
                }
                OutputFormat::Text => {
                    println!("{}", view.content_html);
                    if let Some(notice) = &view.notice {
                        println!();
                        println!("{}", notice_text(notice));
                    }
                }
            }
            Ok(())
        }

        pub fn articles(&self, articles: &[ArticleSummary]) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    let payload = json!({ "articles": articles });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                OutputFormat::Html => {
                    println!("<ul class=\"articles\">");
                    for article in articles {
                        println!(
                            "<li data-id=\"{}\">{} <time>{}</time></li>",
                            article.id,
                            plain::format(&article.title),
                            plain::format(article.created_at.as_deref().unwrap_or_default())
                        );
                    }
                    println!("</ul>");
                }
                OutputFormat::Text => {
                    if articles.is_empty() {
                        println!("No saved articles.");
                        return Ok(());
                    }
                    let rows: Vec<Vec<String>> = articles
                        .iter()
                        .map(|article| {
                            vec![
                                article.id.to_string(),
                                truncate(&article.title, 60),
                                article
                                    .created_at
                                    .clone()
                                    .unwrap_or_else(|| "n/a".to_string()),
                            ]
                        })
                        .collect();
                    render_table(&["ID", "Title", "Created"], &rows);
                }
            }
            Ok(())
        }

        pub fn notice(&self, notice: Option<&Notice>) -> Result<()> {
            let Some(notice) = notice else {
                return Ok(());
            };
            match self.format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(notice)?);
                }
                OutputFormat::Html => println!("{}", notice_html(notice)),
                OutputFormat::Text => println!("{}", notice_text(notice)),
            }
            Ok(())
        }

        pub fn exported(&self, path: &Path) -> Result<()> {
            match self.format {
                OutputFormat::Json => {
                    let payload = json!({ "event": "export", "path": path.display().to_string() });
                    println!("{}", serde_json::to_string_pretty(&payload)?);
                }
                OutputFormat::Html | OutputFormat::Text => {
                    println!("Exported to {}", path.display());
                }
            }
            Ok(())
        }
    }

    fn notice_html(notice: &Notice) -> String {
        let class = if notice.is_error() { "error" } else { "info" };
        format!(
            "<div class=\"{class}\">{}</div>",
            plain::format(notice.message())
        )
    }

    fn notice_text(notice: &Notice) -> String {
        if notice.is_error() {
            format!("error: {}", notice.message())
        } else {
            notice.message().to_string()
        }
    }

    fn render_table(headers: &[&str], rows: &[Vec<String>]) {
        let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
        for row in rows {
            for (idx, cell) in row.iter().enumerate() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }

        fn render_line(columns: &[&str], widths: &[usize]) -> String {
            let mut line = String::new();
            for (idx, value) in columns.iter().enumerate() {
                let width = widths[idx];
                let _ = write!(line, "| {value:width$} ");
            }
            line.push('|');
            line
        }

        println!("{}", render_line(headers, &widths));
        let separator: String = widths
            .iter()
            .map(|width| format!("|{:-^1$}", "", width + 2))
            .collect::<Vec<_>>()
            .join("");
        println!("{separator}|");

        for row in rows {
            let cols: Vec<&str> = row.iter().map(String::as_str).collect();
            println!("{}", render_line(&cols, &widths));
        }
    }

    pub(crate) fn truncate(value: &str, max: usize) -> String {
        if value.chars().count() <= max {
            value.to_string()
        } else {
            let mut truncated = value
                .chars()
                .take(max.saturating_sub(1))
                .collect::<String>();
            truncated.push('…');
            truncated
        }
    }
}

mod progress {
    use std::time::Duration;

    use indicatif::{ProgressBar, ProgressStyle};

    pub fn spinner(message_enabled: bool, message: impl Into<String>) -> Option<ProgressBar> {
        if !message_enabled {
            return None;
        }
        let progress = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        progress.set_style(style);
        progress.set_message(message.into());
        progress.enable_steady_tick(Duration::from_millis(80));
        Some(progress)
    }
}

mod drafts {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use blog_client::BlogApi;
    use blog_core::{CurrentArticle, Event, Session};
    use directories::ProjectDirs;
    use tokio::fs;
    use tracing::{debug, warn};

    const DRAFT_FILE_NAME: &str = "current-article.json";

    /// Keeps the current article across invocations so that `generate` can be
    /// followed by `articles save` or `export-text`.
    #[derive(Debug)]
    pub struct DraftStore {
        path: Option<PathBuf>,
    }

    impl DraftStore {
        pub fn new(state_dir: Option<PathBuf>) -> Self {
            let dir = state_dir.or_else(|| {
                ProjectDirs::from("com", "BlogWriter", "blog-writer")
                    .map(|dirs| dirs.data_local_dir().to_path_buf())
            });
            Self {
                path: dir.map(|dir| dir.join(DRAFT_FILE_NAME)),
            }
        }

        pub async fn restore<A: BlogApi>(&self, session: &mut Session<A>) {
            if let Err(error) = self.restore_inner(session).await {
                warn!(
                    target: "blog_cli",
                    error = %error,
                    "failed to restore current article"
                );
            }
        }

        pub async fn persist<A: BlogApi>(&self, session: &Session<A>) {
            if let Err(error) = self.persist_inner(session.state().current_article.as_ref()).await {
                warn!(
                    target: "blog_cli",
                    error = %error,
                    "failed to persist current article"
                );
            }
        }

        async fn restore_inner<A: BlogApi>(&self, session: &mut Session<A>) -> Result<()> {
            let Some(path) = &self.path else {
                return Ok(());
            };
            if !fs::try_exists(path).await? {
                return Ok(());
            }
            let bytes = fs::read(path).await?;
            if bytes.is_empty() {
                return Ok(());
            }
            let draft: CurrentArticle =
                serde_json::from_slice(&bytes).context("invalid current article state")?;
            debug!(
                target: "blog_cli",
                id = ?draft.id,
                "restored current article"
            );
            session.dispatch(Event::DraftLoaded(draft)).await;
            Ok(())
        }

        async fn persist_inner(&self, current: Option<&CurrentArticle>) -> Result<()> {
            let Some(path) = &self.path else {
                return Ok(());
            };
            match current {
                Some(article) => {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent).await.with_context(|| {
                            format!("failed to create {}", parent.display())
                        })?;
                    }
                    let payload = serde_json::to_vec_pretty(article)?;
                    fs::write(path, payload).await?;
                }
                None => {
                    if fs::try_exists(path).await? {
                        fs::remove_file(path).await?;
                    }
                }
            }
            Ok(())
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_multi_word_topic() {
        let cli = Cli::try_parse_from(["blog", "generate", "async", "Rust", "--save"])
            .expect("valid arguments");
        match cli.command {
            Command::Generate { topic, save, .. } => {
                assert_eq!(topic.join(" "), "async Rust");
                assert!(save);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_policy_flag() {
        let cli = Cli::try_parse_from(["blog", "--policy", "plain-text", "format"])
            .expect("valid arguments");
        assert_eq!(cli.policy, Some(FormatPolicy::PlainText));
        assert!(Cli::try_parse_from(["blog", "--policy", "rich", "format"]).is_err());
    }

    #[test]
    fn error_view_fails_the_command() {
        let state = UiState {
            view: ContentView::Error("quota exceeded".to_string()),
            ..UiState::default()
        };
        let error = ensure_ok(&state).expect_err("should fail");
        assert_eq!(error.to_string(), "quota exceeded");
    }

    #[test]
    fn info_notice_is_not_an_error() {
        let state = UiState {
            notice: Some(Notice::Info("saved".to_string())),
            ..UiState::default()
        };
        assert!(ensure_ok(&state).is_ok());
    }

    #[test]
    fn truncates_long_titles() {
        assert_eq!(output::truncate("short", 10), "short");
        assert_eq!(output::truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
