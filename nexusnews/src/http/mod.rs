//! Outbound HTTP pipeline shared by the news and AI clients.
//!
//! Every logical request runs the same stages: connectivity gate, auth
//! headers, send, error classification, and retry with backoff. Attempts are
//! strictly sequential: `ATTEMPT(n)` ends in success, a retryable failure
//! (sleep, then `ATTEMPT(n + 1)`), or a terminal failure returned to the caller.

pub mod auth;
pub mod classify;
pub mod retry;
pub mod sanitize;

use crate::error::{Error, Result};
use crate::network::NetworkMonitor;
use async_trait::async_trait;
use auth::AuthStage;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use retry::RetryPolicy;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Suspends the current task between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A single logical request. Cloned into each attempt.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
    /// Bypass the auth stage (standard headers and credentials).
    pub skip_auth: bool,
    /// Bypass the retry stage: the first failure is returned as-is.
    pub skip_retry: bool,
}

impl PipelineRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            skip_auth: false,
            skip_retry: false,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post_json(url: Url, body: serde_json::Value) -> Self {
        let mut req = Self::new(Method::POST, url);
        req.body = Some(body);
        req
    }

    /// Set a header. Invalid names or values are dropped with a warning.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => tracing::warn!(header = name, "ignoring invalid request header"),
        }
        self
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn skip_retry(mut self) -> Self {
        self.skip_retry = true;
        self
    }
}

/// A successful (2xx) response with its body fully read.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl PipelineResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// The interceptor chain, expressed as an explicit attempt loop.
#[derive(Clone)]
pub struct HttpPipeline {
    client: Client,
    auth: AuthStage,
    policy: Arc<RetryPolicy>,
    monitor: Option<NetworkMonitor>,
    sleeper: Arc<dyn Sleeper>,
}

impl HttpPipeline {
    pub fn builder() -> HttpPipelineBuilder {
        HttpPipelineBuilder::new()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run one logical request to completion.
    pub async fn execute(&self, request: PipelineRequest) -> Result<PipelineResponse> {
        if let Some(monitor) = &self.monitor {
            if !monitor.is_connected() {
                tracing::error!(url = %sanitize::redact_url(&request.url), "no network connection available");
                return Err(Error::transport(
                    "No network connection. Please check your internet.",
                ));
            }
        }

        let mut attempt: u32 = 0;
        loop {
            let err = match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            // Only classified HTTP/transport failures take part in retrying.
            let Some(kind) = err.failure_kind() else {
                return Err(err);
            };
            if request.skip_retry || !self.policy.should_retry(kind, attempt) {
                if attempt > 0 {
                    tracing::warn!(
                        url = %sanitize::redact_url(&request.url),
                        attempts = attempt + 1,
                        %kind,
                        "request failed after retries"
                    );
                }
                return Err(err);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                url = %sanitize::redact_url(&request.url),
                attempt = attempt + 1,
                max_attempts = self.policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, retrying"
            );
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Execute and decode a JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: PipelineRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    async fn send_once(&self, request: &PipelineRequest) -> Result<PipelineResponse> {
        let mut headers = request.headers.clone();
        if !request.skip_auth {
            self.auth.apply(request.url.host_str(), &mut headers);
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify::classify_transport(&e))?;
        let status = response.status();
        let headers = response.headers().clone();
        // Reading the body to the end releases the connection, failed or not.
        let body = response
            .text()
            .await
            .map_err(|e| classify::classify_transport(&e))?;

        if !status.is_success() {
            let err = classify::classify_response(status.as_u16(), status.canonical_reason(), &body);
            tracing::error!(
                status = status.as_u16(),
                url = %sanitize::redact_url(&request.url),
                error = %err,
                "API error"
            );
            return Err(err);
        }

        Ok(PipelineResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

pub struct HttpPipelineBuilder {
    auth: AuthStage,
    policy: RetryPolicy,
    monitor: Option<NetworkMonitor>,
    sleeper: Arc<dyn Sleeper>,
    timeout: Duration,
    client: Option<Client>,
}

impl Default for HttpPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPipelineBuilder {
    pub fn new() -> Self {
        Self {
            auth: AuthStage::default(),
            policy: RetryPolicy::default(),
            monitor: None,
            sleeper: Arc::new(TokioSleeper),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    pub fn auth(mut self, auth: AuthStage) -> Self {
        self.auth = auth;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fail fast with a transport error while the monitor reports offline.
    pub fn monitor(mut self, monitor: NetworkMonitor) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a preconfigured client instead of building one.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<HttpPipeline> {
        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?,
        };
        Ok(HttpPipeline {
            client,
            auth: self.auth,
            policy: Arc::new(self.policy),
            monitor: self.monitor,
            sleeper: self.sleeper,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Sleeper;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records requested delays and returns immediately.
    #[derive(Default)]
    pub struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn delays(&self) -> Vec<Duration> {
            self.delays.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }
}
