//! Typed access to the NewsAPI `top-headlines` and `everything` endpoints.

pub mod mapper;
pub mod wire;

use crate::error::{Error, Result};
use crate::http::{HttpPipeline, PipelineRequest};
use crate::types::{Article, EverythingQuery, TopHeadlinesQuery};
use url::Url;
use wire::NewsApiResponse;

pub const DEFAULT_NEWS_BASE_URL: &str = "https://newsapi.org/v2";
const STATUS_OK: &str = "ok";

/// Remote data source for articles. Failures are returned as typed errors
/// without further recovery; retrying already happened in the pipeline.
#[derive(Clone)]
pub struct NewsClient {
    pipeline: HttpPipeline,
    base_url: String,
}

impl NewsClient {
    pub fn new(pipeline: HttpPipeline, base_url: &str) -> Self {
        Self {
            pipeline,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn top_headlines(&self, query: &TopHeadlinesQuery) -> Result<Vec<Article>> {
        let mut url = self.endpoint("top-headlines")?;
        {
            let mut pairs = url.query_pairs_mut();
            append_opt(&mut pairs, "country", query.country.as_deref());
            append_opt(&mut pairs, "category", query.category.as_deref());
            append_opt(&mut pairs, "q", query.query.as_deref());
            pairs.append_pair("pageSize", &query.page_size.to_string());
            pairs.append_pair("page", &query.page.to_string());
        }
        self.fetch(url).await
    }

    pub async fn search(&self, query: &EverythingQuery) -> Result<Vec<Article>> {
        let mut url = self.endpoint("everything")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &query.query);
            append_opt(&mut pairs, "sources", query.sources.as_deref());
            append_opt(&mut pairs, "from", query.from.as_deref());
            append_opt(&mut pairs, "to", query.to.as_deref());
            append_opt(&mut pairs, "language", query.language.as_deref());
            append_opt(&mut pairs, "sortBy", query.sort_by.as_deref());
            pairs.append_pair("pageSize", &query.page_size.to_string());
            pairs.append_pair("page", &query.page.to_string());
        }
        self.fetch(url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|e| Error::Configuration(format!("invalid news URL {}: {}", raw, e)))
    }

    async fn fetch(&self, url: Url) -> Result<Vec<Article>> {
        let response = self.pipeline.execute(PipelineRequest::get(url)).await?;
        if response.body.trim().is_empty() {
            return Err(Error::Business {
                code: "null_response".into(),
                message: "API returned null response body".into(),
            });
        }
        let body: NewsApiResponse = response.json()?;
        if body.status != STATUS_OK {
            return Err(Error::Business {
                code: body.code.unwrap_or_else(|| "api_error".into()),
                message: body
                    .message
                    .unwrap_or_else(|| format!("API returned error status: {}", body.status)),
            });
        }
        tracing::debug!(
            total = body.total_results.unwrap_or_default(),
            received = body.articles.len(),
            "fetched articles"
        );
        Ok(mapper::to_domain_list(body.articles))
    }
}

fn append_opt(
    pairs: &mut url::form_urlencoded::Serializer<'_, url::UrlQuery<'_>>,
    key: &str,
    value: Option<&str>,
) {
    if let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) {
        pairs.append_pair(key, v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::http::auth::{AuthStage, AuthStyle, HostCredential};
    use crate::http::retry::RetryPolicy;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> NewsClient {
        let pipeline = HttpPipeline::builder()
            .retry_policy(RetryPolicy::disabled())
            .auth(AuthStage::default().with_credential(HostCredential::new(
                "127.0.0.1",
                AuthStyle::ApiKeyHeader,
                Some("news-key".into()),
            )))
            .build()
            .unwrap();
        NewsClient::new(pipeline, &server.uri())
    }

    fn article_json(url: &str) -> serde_json::Value {
        json!({
            "source": { "id": null, "name": "Reuters" },
            "author": "Jane Doe",
            "title": "Central Bank holds rates",
            "description": "The decision surprised Wall Street.",
            "url": url,
            "urlToImage": null,
            "publishedAt": "2025-11-14T12:00:02Z",
            "content": "Full text"
        })
    }

    #[tokio::test]
    async fn top_headlines_sends_only_set_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/top-headlines"))
            .and(query_param("country", "us"))
            .and(query_param("pageSize", "20"))
            .and(query_param("page", "1"))
            .and(header("x-api-key", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 2,
                "articles": [article_json("https://r.com/1"), article_json("https://r.com/2")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = TopHeadlinesQuery {
            country: Some("us".into()),
            ..Default::default()
        };
        let articles = client(&server).top_headlines(&query).await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].source, "Reuters");
        assert_eq!(articles[0].id, mapper::article_id("https://r.com/1"));

        let requests = server.received_requests().await.unwrap();
        let url = &requests[0].url;
        assert!(url.query_pairs().all(|(k, _)| k != "category" && k != "q"));
    }

    #[tokio::test]
    async fn search_hits_everything_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/everything"))
            .and(query_param("q", "climate"))
            .and(query_param("sortBy", "publishedAt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "totalResults": 1,
                "articles": [article_json("https://r.com/3")]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut query = EverythingQuery::new("climate");
        query.sort_by = Some("publishedAt".into());
        let articles = client(&server).search(&query).await.unwrap();
        assert_eq!(articles.len(), 1);
    }

    #[tokio::test]
    async fn non_ok_status_is_business_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "error",
                "code": "parametersMissing",
                "message": "Required parameters are missing."
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .top_headlines(&TopHeadlinesQuery::default())
            .await
            .unwrap_err();
        match err {
            Error::Business { code, .. } => assert_eq!(code, "parametersMissing"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_failures_propagate_typed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server)
            .search(&EverythingQuery::new("x"))
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), Some(FailureKind::NotFound));
    }
}
