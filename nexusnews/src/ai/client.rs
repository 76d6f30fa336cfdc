//! OpenAI-compatible `/chat/completions` client routed through the HTTP pipeline.

use super::types::{ChatCompletionRequest, ChatCompletionResponse};
use crate::error::{Error, Result};
use crate::http::{HttpPipeline, PipelineRequest};
use async_trait::async_trait;
use url::Url;

pub const DEFAULT_AI_BASE_URL: &str = "https://openrouter.ai/api/v1";
const APP_REFERER: &str = "https://nexusnews.app";
const APP_TITLE: &str = "NexusNews";

/// A chat-completion backend.
#[async_trait]
pub trait ChatCompletions: Send + Sync {
    /// True when a credential is available.
    fn is_configured(&self) -> bool;

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse>;
}

#[derive(Clone)]
pub struct OpenRouterClient {
    pipeline: HttpPipeline,
    base_url: String,
    api_key: Option<String>,
}

impl OpenRouterClient {
    pub fn new(pipeline: HttpPipeline, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            pipeline,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn chat_completions_url(&self) -> Result<Url> {
        let raw = if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/chat/completions", self.base_url)
        };
        Url::parse(&raw)
            .map_err(|e| Error::Configuration(format!("invalid AI provider URL {}: {}", raw, e)))
    }
}

#[async_trait]
impl ChatCompletions for OpenRouterClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        if self.api_key.is_none() {
            return Err(Error::Configuration(
                "OpenRouter API key not configured".into(),
            ));
        }
        let url = self.chat_completions_url()?;
        let body = serde_json::to_value(request)?;

        let req = PipelineRequest::post_json(url, body)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE);
        self.pipeline.execute_json(req).await
    }
}
