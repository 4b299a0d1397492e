pub mod disposition;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    Client, RequestBuilder, StatusCode,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::types::{
    Acknowledgement, Article, ArticleBody, ArticleListBody, ArticleRequest, ArticleSummary,
    Envelope, ExportedFile, GenerateRequest, GeneratedBody, SaveReceipt, SavedBody,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_EXPORT_FILE_NAME: &str = "article.txt";
const FALLBACK_MESSAGE: &str = "An error occurred";

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("unexpected status code: {0}")]
    Status(StatusCode),
    #[error("{0}")]
    Api(String),
    #[error("invalid response payload: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            user_agent: "BlogWriter/1.0".to_string(),
        }
    }
}

/// Operations offered by the blog server.
///
/// [`BlogClient`] is the HTTP implementation; the seam exists so the UI
/// session can be driven against an in-memory store.
#[async_trait]
pub trait BlogApi: Send + Sync {
    /// Ask the server to write an article about `topic`; returns raw markdown.
    async fn generate(&self, topic: &str) -> Result<String, ClientError>;
    /// Persist an article. The receipt carries the server's message and the
    /// stored article's id when the server reports them.
    async fn save_article(&self, title: &str, content: &str) -> Result<SaveReceipt, ClientError>;
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>, ClientError>;
    async fn get_article(&self, id: i64) -> Result<Article, ClientError>;
    async fn delete_article(&self, id: i64) -> Result<Option<String>, ClientError>;
    /// Export unsaved content as a text file.
    async fn export_text(&self, title: &str, content: &str) -> Result<ExportedFile, ClientError>;
    async fn export_article(&self, id: i64) -> Result<ExportedFile, ClientError>;
}

#[derive(Debug, Clone)]
pub struct BlogClient {
    http: Client,
    config: ClientConfig,
}

impl BlogClient {
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn fetch_envelope<T>(&self, request: RequestBuilder, url: &str) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        if !status.is_success() {
            warn!(status = %status, url, "blog server returned an error status");
        }
        decode_envelope(status, &bytes)
    }

    async fn fetch_export(&self, request: RequestBuilder, url: &str) -> Result<ExportedFile, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        let status = response.status();
        let content_type = header_str(response.headers().get(CONTENT_TYPE));
        let disposition = header_str(response.headers().get(CONTENT_DISPOSITION));
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;
        debug!(url, status = %status, bytes = bytes.len(), "export response received");
        interpret_export(status, content_type.as_deref(), disposition.as_deref(), &bytes)
    }
}

#[async_trait]
impl BlogApi for BlogClient {
    #[instrument(name = "blog_client.generate", skip(self))]
    async fn generate(&self, topic: &str) -> Result<String, ClientError> {
        let url = self.endpoint("generate");
        let request = self.http.post(&url).json(&GenerateRequest { topic });
        let body: GeneratedBody = self
            .fetch_envelope(request, &url)
            .await?
            .into_result(FALLBACK_MESSAGE)?;
        body.content
            .ok_or_else(|| ClientError::Decode("response is missing `content`".to_string()))
    }

    #[instrument(name = "blog_client.save_article", skip(self, content))]
    async fn save_article(&self, title: &str, content: &str) -> Result<SaveReceipt, ClientError> {
        let url = self.endpoint("api/articles");
        let request = self.http.post(&url).json(&ArticleRequest { title, content });
        let envelope: Envelope<SavedBody> = self.fetch_envelope(request, &url).await?;
        let message = envelope.message.clone();
        let body = envelope.into_result(FALLBACK_MESSAGE)?;
        debug!(id = ?body.article.as_ref().map(|article| article.id), "article saved");
        Ok(SaveReceipt {
            message,
            article: body.article,
        })
    }

    #[instrument(name = "blog_client.list_articles", skip(self))]
    async fn list_articles(&self) -> Result<Vec<ArticleSummary>, ClientError> {
        let url = self.endpoint("api/articles");
        let body: ArticleListBody = self
            .fetch_envelope(self.http.get(&url), &url)
            .await?
            .into_result(FALLBACK_MESSAGE)?;
        debug!(count = body.articles.len(), "articles listed");
        Ok(body.articles)
    }

    #[instrument(name = "blog_client.get_article", skip(self))]
    async fn get_article(&self, id: i64) -> Result<Article, ClientError> {
        let url = self.endpoint(&format!("api/articles/{id}"));
        let body: ArticleBody = self
            .fetch_envelope(self.http.get(&url), &url)
            .await?
            .into_result(FALLBACK_MESSAGE)?;
        body.article
            .ok_or_else(|| ClientError::Decode("response is missing `article`".to_string()))
    }

    #[instrument(name = "blog_client.delete_article", skip(self))]
    async fn delete_article(&self, id: i64) -> Result<Option<String>, ClientError> {
        let url = self.endpoint(&format!("api/articles/{id}"));
        let envelope: Envelope<Acknowledgement> =
            self.fetch_envelope(self.http.delete(&url), &url).await?;
        let message = envelope.message.clone();
        envelope.into_result(FALLBACK_MESSAGE)?;
        Ok(message)
    }

    #[instrument(name = "blog_client.export_text", skip(self, content))]
    async fn export_text(&self, title: &str, content: &str) -> Result<ExportedFile, ClientError> {
        let url = self.endpoint("api/export-text");
        let request = self.http.post(&url).json(&ArticleRequest { title, content });
        self.fetch_export(request, &url).await
    }

    #[instrument(name = "blog_client.export_article", skip(self))]
    async fn export_article(&self, id: i64) -> Result<ExportedFile, ClientError> {
        let url = self.endpoint(&format!("api/articles/{id}/export"));
        self.fetch_export(self.http.get(&url), &url).await
    }
}

fn header_str(value: Option<&reqwest::header::HeaderValue>) -> Option<String> {
    value
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

/// Decode a JSON envelope. Bodies that fail to parse are reported as
/// [`ClientError::Status`] on error statuses (HTML error pages, proxies) and as
/// [`ClientError::Decode`] otherwise.
pub fn decode_envelope<T>(status: StatusCode, bytes: &[u8]) -> Result<Envelope<T>, ClientError>
where
    T: DeserializeOwned,
{
    match serde_json::from_slice::<Envelope<T>>(bytes) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(ClientError::Status(status)),
        Err(err) => Err(ClientError::Decode(err.to_string())),
    }
}

/// Turn an export response into a file, or into the error its JSON body
/// describes.
pub fn interpret_export(
    status: StatusCode,
    content_type: Option<&str>,
    disposition: Option<&str>,
    bytes: &[u8],
) -> Result<ExportedFile, ClientError> {
    let is_json = content_type
        .is_some_and(|value| value.trim().to_ascii_lowercase().starts_with("application/json"));

    if is_json || !status.is_success() {
        let envelope = decode_envelope::<Acknowledgement>(status, bytes)?;
        if envelope.is_success() && status.is_success() {
            return Err(ClientError::Decode(
                "expected a file but received a JSON payload".to_string(),
            ));
        }
        return Err(ClientError::Api(
            envelope
                .message
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
        ));
    }

    let file_name = disposition
        .and_then(disposition::file_name)
        .unwrap_or_else(|| DEFAULT_EXPORT_FILE_NAME.to_string());
    Ok(ExportedFile {
        file_name,
        bytes: bytes.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let client = BlogClient::with_config(ClientConfig {
            base_url: "http://localhost:5000/".to_string(),
            ..ClientConfig::default()
        })
        .expect("client");
        assert_eq!(
            client.endpoint("/api/articles"),
            "http://localhost:5000/api/articles"
        );
        assert_eq!(client.base_url(), "http://localhost:5000/");
    }

    #[test]
    fn html_error_page_reports_status() {
        let result = decode_envelope::<Acknowledgement>(
            StatusCode::NOT_FOUND,
            b"<!doctype html><title>404 Not Found</title>",
        );
        assert!(matches!(result, Err(ClientError::Status(StatusCode::NOT_FOUND))));
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let result = decode_envelope::<Acknowledgement>(StatusCode::OK, b"not json");
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[test]
    fn export_uses_disposition_name() {
        let file = interpret_export(
            StatusCode::OK,
            Some("text/plain; charset=utf-8"),
            Some("attachment; filename=article_7_20240501_101500.txt"),
            "タイトル: Rust\n".as_bytes(),
        )
        .expect("file");
        assert_eq!(file.file_name, "article_7_20240501_101500.txt");
        assert_eq!(file.bytes, "タイトル: Rust\n".as_bytes());
    }

    #[test]
    fn export_without_disposition_uses_default_name() {
        let file = interpret_export(StatusCode::OK, Some("text/plain"), None, b"body")
            .expect("file");
        assert_eq!(file.file_name, DEFAULT_EXPORT_FILE_NAME);
    }

    #[test]
    fn export_json_error_carries_message() {
        let result = interpret_export(
            StatusCode::BAD_REQUEST,
            Some("application/json"),
            None,
            br#"{"status": "error", "message": "content is required"}"#,
        );
        match result {
            Err(ClientError::Api(message)) => assert_eq!(message, "content is required"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn export_forbidden_without_body_reports_status() {
        let result = interpret_export(StatusCode::FORBIDDEN, Some("text/html"), None, b"");
        assert!(matches!(result, Err(ClientError::Status(StatusCode::FORBIDDEN))));
    }
}
