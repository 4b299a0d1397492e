//! Layered configuration.
//!
//! `defaults/blog.default.toml` is embedded into the binary. A [`Loader`] stacks
//! a user file, `BLOG_*` environment variables (`__` separates nesting, e.g.
//! `BLOG_SERVER__BASE_URL`) and explicit overrides on top before deserializing
//! into [`Settings`].

use std::{collections::HashMap, path::Path, path::PathBuf, time::Duration};

use blog_client::ClientConfig;
use blog_format::FormatPolicy;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat, ValueKind};
use directories::ProjectDirs;
use serde::Deserialize;

const DEFAULT_TOML: &str = include_str!("../defaults/blog.default.toml");
const ENV_PREFIX: &str = "BLOG";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub render: RenderSettings,
    pub export: ExportSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderSettings {
    pub policy: FormatPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    pub directory: PathBuf,
}

impl Settings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.server.base_url.clone(),
            timeout: Duration::from_secs(self.server.timeout_secs),
            user_agent: self.server.user_agent.clone(),
        }
    }
}

/// Location of the per-user config file, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "BlogWriter", "blog-writer")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file that may not exist.
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `BLOG_*` variables from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_source(None)
    }

    fn with_env_source(mut self, vars: Option<HashMap<String, String>>) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(vars);
        self.builder = self.builder.add_source(source);
        self
    }

    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<Settings, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn load_defaults() -> Result<Settings, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_default_settings() {
        let settings = load_defaults().expect("defaults to deserialize");
        assert_eq!(settings.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(settings.server.timeout_secs, 60);
        assert_eq!(settings.render.policy, FormatPolicy::MarkdownLite);
        assert_eq!(settings.export.directory, PathBuf::from("."));
    }

    #[test]
    fn user_file_overrides_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[render]\npolicy = \"plain-text\"\n\n[server]\nbase_url = \"https://blog.example\"\n",
        )
        .expect("write config");

        let settings = Loader::new().with_file(&path).build().expect("settings");
        assert_eq!(settings.render.policy, FormatPolicy::PlainText);
        assert_eq!(settings.server.base_url, "https://blog.example");
        assert_eq!(settings.server.timeout_secs, 60);
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let dir = tempdir().expect("tempdir");
        let settings = Loader::new()
            .with_optional_file(dir.path().join("absent.toml"))
            .build()
            .expect("settings");
        assert_eq!(settings.render.policy, FormatPolicy::MarkdownLite);
    }

    #[test]
    fn missing_required_file_fails() {
        let dir = tempdir().expect("tempdir");
        let result = Loader::new().with_file(dir.path().join("absent.toml")).build();
        assert!(result.is_err());
    }

    #[test]
    fn environment_variables_are_layered() {
        let vars = HashMap::from([
            ("BLOG_SERVER__TIMEOUT_SECS".to_string(), "5".to_string()),
            (
                "BLOG_SERVER__BASE_URL".to_string(),
                "http://10.0.0.2:8000".to_string(),
            ),
        ]);
        let settings = Loader::new()
            .with_env_source(Some(vars))
            .build()
            .expect("settings");
        assert_eq!(settings.server.timeout_secs, 5);
        assert_eq!(settings.server.base_url, "http://10.0.0.2:8000");
        assert_eq!(
            settings.client_config().timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn overrides_win_over_everything() {
        let settings = Loader::new()
            .set_override("render.policy", "plain-text")
            .expect("override to apply")
            .build()
            .expect("settings");
        assert_eq!(settings.render.policy, FormatPolicy::PlainText);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let result = Loader::new()
            .set_override("render.policy", "rich-text")
            .expect("override to apply")
            .build();
        assert!(result.is_err());
    }
}
