//! Offline-first article access and summary caching on top of the remote
//! clients and the local store.

use crate::ai::AiService;
use crate::error::{Error, FailureKind, Result};
use crate::news::NewsClient;
use crate::resource::{Resource, describe_error};
use crate::store::{ArticleStore, ArticleSummary};
use crate::types::{Article, EverythingQuery, TopHeadlinesQuery};
use async_trait::async_trait;
use futures::Stream;
use std::sync::Arc;

/// Remote article source.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn top_headlines(&self, query: &TopHeadlinesQuery) -> Result<Vec<Article>>;

    async fn search(&self, query: &EverythingQuery) -> Result<Vec<Article>>;
}

#[async_trait]
impl NewsSource for NewsClient {
    async fn top_headlines(&self, query: &TopHeadlinesQuery) -> Result<Vec<Article>> {
        NewsClient::top_headlines(self, query).await
    }

    async fn search(&self, query: &EverythingQuery) -> Result<Vec<Article>> {
        NewsClient::search(self, query).await
    }
}

#[derive(Clone)]
pub struct NewsRepository {
    remote: Arc<dyn NewsSource>,
    store: Arc<dyn ArticleStore>,
}

impl NewsRepository {
    pub fn new(remote: Arc<dyn NewsSource>, store: Arc<dyn ArticleStore>) -> Self {
        Self { remote, store }
    }

    /// Headlines, cache first.
    ///
    /// Emits `Loading`, then the cached rows for the query's category (if
    /// any), then the fresh rows after they were written to the store. A
    /// transport failure while cached rows were shown is logged, not emitted.
    pub fn headlines(
        &self,
        query: TopHeadlinesQuery,
    ) -> impl Stream<Item = Resource<Vec<Article>>> + Send + 'static {
        let remote = self.remote.clone();
        let store = self.store.clone();
        async_stream::stream! {
            yield Resource::Loading;

            let cached = match store.list_articles(query.category.as_deref()).await {
                Ok(rows) if !rows.is_empty() => Some(rows),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read cached articles");
                    None
                }
            };
            let has_cache = cached.is_some();
            if let Some(rows) = cached {
                yield Resource::Success(rows);
            }

            match remote.top_headlines(&query).await {
                Ok(mut fresh) => {
                    if let Some(category) = &query.category {
                        for article in &mut fresh {
                            article.category = Some(category.clone());
                        }
                    }
                    if let Err(e) = store.upsert_articles(&fresh).await {
                        tracing::warn!(error = %e, "failed to cache articles");
                    }
                    yield Resource::Success(fresh);
                }
                Err(err) if has_cache && err.failure_kind() == Some(FailureKind::Transport) => {
                    tracing::warn!(error = %err, "network fetch failed, keeping cached articles");
                }
                Err(err) => {
                    tracing::error!(error = %err, "error fetching articles");
                    yield Resource::Error(describe_error(&err));
                }
            }
        }
    }

    /// Search is always remote; results are not cached.
    pub fn search(
        &self,
        query: EverythingQuery,
    ) -> impl Stream<Item = Resource<Vec<Article>>> + Send + 'static {
        let remote = self.remote.clone();
        async_stream::stream! {
            yield Resource::Loading;
            let result = remote.search(&query).await;
            if let Err(e) = &result {
                tracing::error!(query = %query.query, error = %e, "error searching articles");
            }
            yield Resource::from_result(result);
        }
    }

    pub async fn article(&self, id: &str) -> Resource<Article> {
        let result = match self.store.get_article(id).await {
            Ok(Some(article)) => Ok(article),
            Ok(None) => Err(Error::Business {
                code: "not_found".into(),
                message: "Article not found".into(),
            }),
            Err(e) => Err(e),
        };
        Resource::from_result(result)
    }

    pub async fn bookmarks(&self, favorites_only: bool) -> Resource<Vec<Article>> {
        Resource::from_result(self.store.list_bookmarks(favorites_only).await)
    }

    pub async fn add_bookmark(&self, article: &Article) -> Result<()> {
        self.store.add_bookmark(article).await
    }

    pub async fn remove_bookmark(&self, article_id: &str) -> Result<bool> {
        self.store.remove_bookmark(article_id).await
    }

    pub async fn toggle_favorite(&self, article_id: &str) -> Result<Option<bool>> {
        self.store.toggle_favorite(article_id).await
    }
}

/// Summaries with a local cache in front of the AI service.
pub struct ArticleAnalyzer {
    ai: Arc<AiService>,
    store: Arc<dyn ArticleStore>,
}

impl ArticleAnalyzer {
    pub fn new(ai: Arc<AiService>, store: Arc<dyn ArticleStore>) -> Self {
        Self { ai, store }
    }

    /// Cached summary if one exists, otherwise a fresh one that is then cached.
    pub async fn summarize(&self, article: &Article, max_length: usize) -> Result<ArticleSummary> {
        match self.store.get_summary(&article.id).await {
            Ok(Some(summary)) => {
                tracing::debug!(article_id = %article.id, "using cached summary");
                return Ok(summary);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "failed to read cached summary"),
        }

        let completion = self
            .ai
            .summarize_completion(article.analysis_text(), max_length)
            .await?;
        let summary = ArticleSummary {
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            total_tokens: completion.usage.total_tokens,
            ..ArticleSummary::new(&article.id, completion.text, completion.model)
        };
        if let Err(e) = self.store.save_summary(summary.clone()).await {
            tracing::warn!(error = %e, "failed to cache summary");
        }
        Ok(summary)
    }

    pub fn ai(&self) -> &AiService {
        &self.ai
    }
}
