use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

/// A news article as cached and shown to the reader.
///
/// `id` is derived from the article URL, so repeated fetches of the same
/// article converge on one cache row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub image_url: Option<String>,
    pub author: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    /// Text handed to the AI capabilities: content, else description, else title.
    pub fn analysis_text(&self) -> &str {
        self.content
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.description.as_deref().filter(|d| !d.trim().is_empty()))
            .unwrap_or(&self.title)
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Parameters of `GET /top-headlines`. Unset fields are not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopHeadlinesQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub query: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for TopHeadlinesQuery {
    fn default() -> Self {
        Self {
            country: None,
            category: None,
            query: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Parameters of `GET /everything`. `query` is required by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EverythingQuery {
    pub query: String,
    pub sources: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub language: Option<String>,
    pub sort_by: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl EverythingQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sources: None,
            from: None,
            to: None,
            language: None,
            sort_by: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}
