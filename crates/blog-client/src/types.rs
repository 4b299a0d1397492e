use serde::{Deserialize, Serialize};

use crate::ClientError;

pub const STATUS_SUCCESS: &str = "success";

/// Wrapper shared by every JSON response: a `status` string, an optional
/// human-readable `message`, and endpoint-specific fields.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }

    /// Unwrap the body of a successful envelope, turning any other status into
    /// [`ClientError::Api`] carrying the server message or `fallback`.
    pub fn into_result(self, fallback: &str) -> Result<T, ClientError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(ClientError::Api(
                self.message
                    .filter(|message| !message.trim().is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {}

/// Identity assigned by the server to a freshly stored article.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedArticle {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedBody {
    #[serde(default)]
    pub article: Option<SavedArticle>,
}

/// Outcome of a successful save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReceipt {
    pub message: Option<String>,
    pub article: Option<SavedArticle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneratedBody {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleListBody {
    #[serde(default)]
    pub articles: Vec<ArticleSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleBody {
    #[serde(default)]
    pub article: Option<Article>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Article {
    pub fn summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            title: self.title.clone(),
            created_at: self.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest<'a> {
    pub topic: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleRequest<'a> {
    pub title: &'a str,
    pub content: &'a str,
}

/// A downloaded text export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// File name suggested by the server, reduced to a bare file name.
    pub file_name: String,
    pub bytes: Vec<u8>,
}
