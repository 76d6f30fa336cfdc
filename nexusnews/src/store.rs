//! Local cache collaborator: article rows, bookmarks, cached summaries and
//! AI usage tracking, plus an in-memory implementation.

use crate::ai::prompt::Capability;
use crate::error::Result;
use crate::types::Article;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub article_id: String,
    pub bookmarked_at: DateTime<Utc>,
    pub is_favorite: bool,
}

/// A generated summary cached against its article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub article_id: String,
    pub summary: String,
    pub model_used: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub generated_at: DateTime<Utc>,
    pub language: String,
}

impl ArticleSummary {
    pub fn new(article_id: impl Into<String>, summary: impl Into<String>, model_used: impl Into<String>) -> Self {
        Self {
            article_id: article_id.into(),
            summary: summary.into(),
            model_used: model_used.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            generated_at: Utc::now(),
            language: "en".into(),
        }
    }

    /// Row key: one summary per article and model.
    pub fn key(&self) -> String {
        format!("{}_{}", self.article_id, self.model_used)
    }
}

/// One successful AI call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiUsage {
    pub id: String,
    pub request_type: Capability,
    pub model_used: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub article_count: usize,
    pub bookmark_count: usize,
    pub summary_count: usize,
    /// Rough size of the cached article text.
    pub approximate_bytes: usize,
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Insert or replace by id.
    async fn upsert_articles(&self, articles: &[Article]) -> Result<()>;

    async fn get_article(&self, id: &str) -> Result<Option<Article>>;

    /// Cached articles, newest first, optionally restricted to one category.
    async fn list_articles(&self, category: Option<&str>) -> Result<Vec<Article>>;

    /// Drop cached articles that are not bookmarked. Returns how many were removed.
    async fn clear_articles(&self) -> Result<usize>;

    /// Store the article and its bookmark together.
    async fn add_bookmark(&self, article: &Article) -> Result<()>;

    /// Remove a bookmark and every summary cached for that article.
    async fn remove_bookmark(&self, article_id: &str) -> Result<bool>;

    async fn is_bookmarked(&self, article_id: &str) -> Result<bool>;

    /// Flip the favorite flag. Returns the new value, or `None` if not bookmarked.
    async fn toggle_favorite(&self, article_id: &str) -> Result<Option<bool>>;

    /// Bookmarked articles, most recently bookmarked first.
    async fn list_bookmarks(&self, favorites_only: bool) -> Result<Vec<Article>>;

    async fn save_summary(&self, summary: ArticleSummary) -> Result<()>;

    /// Most recent summary for the article, from any model.
    async fn get_summary(&self, article_id: &str) -> Result<Option<ArticleSummary>>;

    async fn cache_stats(&self) -> Result<CacheStats>;

    async fn clear_all(&self) -> Result<()>;
}

#[async_trait]
pub trait UsageTracker: Send + Sync {
    async fn record_usage(&self, usage: AiUsage) -> Result<()>;

    async fn list_usage(&self) -> Result<Vec<AiUsage>>;
}

#[derive(Default)]
struct Tables {
    articles: HashMap<String, Article>,
    bookmarks: HashMap<String, Bookmark>,
    summaries: HashMap<String, ArticleSummary>,
    usage: Vec<AiUsage>,
}

/// Process-local store. Every operation runs under one lock, so the
/// two-row bookmark write is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

fn approximate_size(article: &Article) -> usize {
    article.title.len()
        + article.url.len()
        + article.source.len()
        + article.description.as_ref().map_or(0, String::len)
        + article.content.as_ref().map_or(0, String::len)
        + article.tags.iter().map(String::len).sum::<usize>()
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn upsert_articles(&self, articles: &[Article]) -> Result<()> {
        let mut tables = self.tables.write().await;
        for article in articles {
            tables.articles.insert(article.id.clone(), article.clone());
        }
        tracing::debug!(count = articles.len(), "cached articles");
        Ok(())
    }

    async fn get_article(&self, id: &str) -> Result<Option<Article>> {
        Ok(self.tables.read().await.articles.get(id).cloned())
    }

    async fn list_articles(&self, category: Option<&str>) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let mut articles: Vec<Article> = tables
            .articles
            .values()
            .filter(|a| category.is_none_or(|c| a.category.as_deref() == Some(c)))
            .cloned()
            .collect();
        newest_first(&mut articles);
        Ok(articles)
    }

    async fn clear_articles(&self) -> Result<usize> {
        let mut tables = self.tables.write().await;
        let Tables {
            articles,
            bookmarks,
            summaries,
            ..
        } = &mut *tables;
        let before = articles.len();
        articles.retain(|id, _| bookmarks.contains_key(id));
        summaries.retain(|_, s| articles.contains_key(&s.article_id));
        Ok(before - articles.len())
    }

    async fn add_bookmark(&self, article: &Article) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.articles.insert(article.id.clone(), article.clone());
        let previous = tables.bookmarks.get(&article.id).map(|b| b.is_favorite);
        tables.bookmarks.insert(
            article.id.clone(),
            Bookmark {
                article_id: article.id.clone(),
                bookmarked_at: Utc::now(),
                is_favorite: previous.unwrap_or(false),
            },
        );
        tracing::debug!(article_id = %article.id, "bookmark added");
        Ok(())
    }

    async fn remove_bookmark(&self, article_id: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let removed = tables.bookmarks.remove(article_id).is_some();
        if removed {
            tables.summaries.retain(|_, s| s.article_id != article_id);
            tracing::debug!(article_id, "bookmark removed");
        }
        Ok(removed)
    }

    async fn is_bookmarked(&self, article_id: &str) -> Result<bool> {
        Ok(self.tables.read().await.bookmarks.contains_key(article_id))
    }

    async fn toggle_favorite(&self, article_id: &str) -> Result<Option<bool>> {
        let mut tables = self.tables.write().await;
        match tables.bookmarks.get_mut(article_id) {
            Some(bookmark) => {
                bookmark.is_favorite = !bookmark.is_favorite;
                Ok(Some(bookmark.is_favorite))
            }
            None => {
                tracing::warn!(article_id, "cannot toggle favorite, article not bookmarked");
                Ok(None)
            }
        }
    }

    async fn list_bookmarks(&self, favorites_only: bool) -> Result<Vec<Article>> {
        let tables = self.tables.read().await;
        let mut marks: Vec<&Bookmark> = tables
            .bookmarks
            .values()
            .filter(|b| !favorites_only || b.is_favorite)
            .collect();
        marks.sort_by(|a, b| b.bookmarked_at.cmp(&a.bookmarked_at));
        Ok(marks
            .into_iter()
            .filter_map(|b| tables.articles.get(&b.article_id).cloned())
            .collect())
    }

    async fn save_summary(&self, summary: ArticleSummary) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.summaries.insert(summary.key(), summary);
        Ok(())
    }

    async fn get_summary(&self, article_id: &str) -> Result<Option<ArticleSummary>> {
        let tables = self.tables.read().await;
        Ok(tables
            .summaries
            .values()
            .filter(|s| s.article_id == article_id)
            .max_by_key(|s| s.generated_at)
            .cloned())
    }

    async fn cache_stats(&self) -> Result<CacheStats> {
        let tables = self.tables.read().await;
        Ok(CacheStats {
            article_count: tables.articles.len(),
            bookmark_count: tables.bookmarks.len(),
            summary_count: tables.summaries.len(),
            approximate_bytes: tables.articles.values().map(approximate_size).sum(),
        })
    }

    async fn clear_all(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        let usage = std::mem::take(&mut tables.usage);
        *tables = Tables {
            usage,
            ..Tables::default()
        };
        tracing::info!("cache cleared");
        Ok(())
    }
}

#[async_trait]
impl UsageTracker for MemoryStore {
    async fn record_usage(&self, usage: AiUsage) -> Result<()> {
        self.tables.write().await.usage.push(usage);
        Ok(())
    }

    async fn list_usage(&self) -> Result<Vec<AiUsage>> {
        Ok(self.tables.read().await.usage.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::article;
    use super::*;

    #[tokio::test]
    async fn upsert_replaces_on_id() {
        let store = MemoryStore::new();
        store.upsert_articles(&[article("a", 1), article("b", 2)]).await.unwrap();
        let mut updated = article("a", 3);
        updated.title = "Updated".into();
        store.upsert_articles(&[updated]).await.unwrap();

        let all = store.list_articles(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "Updated");
        assert_eq!(all[1].id, "b");
    }

    #[tokio::test]
    async fn category_filter() {
        let store = MemoryStore::new();
        let mut tech = article("t", 1);
        tech.category = Some("technology".into());
        store.upsert_articles(&[tech, article("x", 2)]).await.unwrap();
        let only = store.list_articles(Some("technology")).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].id, "t");
    }

    #[tokio::test]
    async fn bookmark_writes_article_and_cascades_summaries() {
        let store = MemoryStore::new();
        store.add_bookmark(&article("a", 1)).await.unwrap();
        assert!(store.get_article("a").await.unwrap().is_some());
        assert!(store.is_bookmarked("a").await.unwrap());

        store
            .save_summary(ArticleSummary::new("a", "short", "m1"))
            .await
            .unwrap();
        assert!(store.get_summary("a").await.unwrap().is_some());

        assert!(store.remove_bookmark("a").await.unwrap());
        assert!(store.get_summary("a").await.unwrap().is_none());
        assert!(!store.remove_bookmark("a").await.unwrap());
    }

    #[tokio::test]
    async fn favorites() {
        let store = MemoryStore::new();
        store.add_bookmark(&article("a", 1)).await.unwrap();
        store.add_bookmark(&article("b", 2)).await.unwrap();
        assert_eq!(store.toggle_favorite("b").await.unwrap(), Some(true));
        assert_eq!(store.toggle_favorite("zzz").await.unwrap(), None);

        let favorites = store.list_bookmarks(true).await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "b");
        assert_eq!(store.list_bookmarks(false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn clear_articles_keeps_bookmarks() {
        let store = MemoryStore::new();
        store.upsert_articles(&[article("a", 1), article("b", 2)]).await.unwrap();
        store.add_bookmark(&article("b", 2)).await.unwrap();
        store
            .save_summary(ArticleSummary::new("a", "gone", "m1"))
            .await
            .unwrap();

        assert_eq!(store.clear_articles().await.unwrap(), 1);
        let stats = store.cache_stats().await.unwrap();
        assert_eq!(stats.article_count, 1);
        assert_eq!(stats.bookmark_count, 1);
        assert_eq!(stats.summary_count, 0);
        assert!(stats.approximate_bytes > 0);
    }

    #[tokio::test]
    async fn clear_all_keeps_usage_history() {
        let store = MemoryStore::new();
        store.add_bookmark(&article("a", 1)).await.unwrap();
        store
            .record_usage(AiUsage {
                id: "u1".into(),
                request_type: Capability::Summarize,
                model_used: "m1".into(),
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
                latency_ms: 120,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();

        store.clear_all().await.unwrap();
        assert_eq!(store.cache_stats().await.unwrap(), CacheStats::default());
        assert_eq!(store.list_usage().await.unwrap().len(), 1);
    }
}
