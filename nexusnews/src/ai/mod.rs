//! AI orchestrator: per-capability prompt building, model fallback, tolerant
//! parsing and usage tracking.
//!
//! A capability call checks that a credential is configured, then tries the
//! models of the [`ModelPreference`] in order, strictly one after another.
//! Any failure of a model (HTTP error after pipeline retries, empty
//! completion) moves on to the next one; each model is tried at most once.
//! The first non-empty completion is handed to the capability's parser, which
//! cannot fail. Only exhaustion of every model is reported as an error.

pub mod client;
pub mod parser;
pub mod prompt;
pub mod types;

use crate::error::{Error, Result};
use crate::models::ModelPreference;
use crate::store::{AiUsage, UsageTracker};
use client::ChatCompletions;
use parser::*;
use prompt::*;
use std::sync::Arc;
use std::time::Instant;
use types::*;

pub const DEFAULT_SUMMARY_LENGTH: usize = 150;
pub const DEFAULT_MAX_KEY_POINTS: usize = 5;
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;

/// A successful completion and the model that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: Usage,
}

pub struct AiService {
    backend: Arc<dyn ChatCompletions>,
    preference: ModelPreference,
    usage: Option<Arc<dyn UsageTracker>>,
}

impl AiService {
    pub fn new(backend: Arc<dyn ChatCompletions>, preference: ModelPreference) -> Self {
        Self {
            backend,
            preference,
            usage: None,
        }
    }

    pub fn with_usage_tracker(mut self, tracker: Arc<dyn UsageTracker>) -> Self {
        self.usage = Some(tracker);
        self
    }

    pub fn preference(&self) -> &ModelPreference {
        &self.preference
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    // -----------------------------------------------------------------------
    // Capabilities
    // -----------------------------------------------------------------------

    /// Summary of roughly `max_length` characters, with the model that wrote it.
    pub async fn summarize_completion(&self, content: &str, max_length: usize) -> Result<Completion> {
        self.run(&SummarizePrompt { content, max_length }).await
    }

    pub async fn summarize(&self, content: &str, max_length: usize) -> Result<String> {
        Ok(self.summarize_completion(content, max_length).await?.text)
    }

    pub async fn analyze_sentiment(&self, content: &str) -> Result<Sentiment> {
        let completion = self.run(&SentimentPrompt { content }).await?;
        Ok(SentimentParser.parse(&completion.text))
    }

    pub async fn translate(&self, content: &str, target_language: &str) -> Result<String> {
        let prompt = TranslatePrompt {
            content,
            target_language,
        };
        Ok(self.run(&prompt).await?.text)
    }

    pub async fn extract_key_points(&self, content: &str, max_points: usize) -> Result<KeyPointsResult> {
        let completion = self.run(&KeyPointsPrompt { content, max_points }).await?;
        let parser = KeyPointsParser {
            article_length: content.chars().count(),
        };
        Ok(parser.parse(&completion.text))
    }

    pub async fn recognize_entities(&self, content: &str) -> Result<EntityRecognitionResult> {
        let completion = self.run(&EntitiesPrompt { content }).await?;
        Ok(EntitiesParser.parse(&completion.text))
    }

    pub async fn classify_topic(
        &self,
        content: &str,
        title: Option<&str>,
    ) -> Result<TopicClassificationResult> {
        let completion = self.run(&TopicPrompt { content, title }).await?;
        Ok(TopicParser.parse(&completion.text))
    }

    pub async fn detect_bias(&self, content: &str, title: Option<&str>) -> Result<BiasDetectionResult> {
        let completion = self.run(&BiasPrompt { content, title }).await?;
        Ok(BiasParser.parse(&completion.text))
    }

    /// `candidates` are `(article id, short metadata)` pairs.
    pub async fn generate_recommendations(
        &self,
        interests: &[UserInterest],
        candidates: &[(String, String)],
        limit: usize,
    ) -> Result<RecommendationResult> {
        let prompt = RecommendPrompt {
            interests,
            candidates,
            limit,
        };
        let completion = self.run(&prompt).await?;
        let parser = RecommendationParser {
            interests: interests.to_vec(),
        };
        Ok(parser.parse(&completion.text))
    }

    pub async fn chat(
        &self,
        history: &[ChatMessage],
        user_message: &str,
        article_context: Option<&str>,
    ) -> Result<ChatResponse> {
        let prompt = ChatPrompt {
            history,
            user_message,
            article_context,
        };
        let completion = self.run(&prompt).await?;
        Ok(ChatParser.parse(&completion.text))
    }

    pub async fn generate_content(
        &self,
        content: &str,
        content_type: ContentType,
        custom_prompt: Option<&str>,
    ) -> Result<ContentGenerationResult> {
        let prompt = ContentPrompt {
            content,
            content_type,
            custom_prompt,
        };
        let completion = self.run(&prompt).await?;
        Ok(ContentParser { content_type }.parse(&completion.text))
    }

    // -----------------------------------------------------------------------
    // Fallback loop
    // -----------------------------------------------------------------------

    async fn run<P: PromptBuilder + Sync>(&self, prompt: &P) -> Result<Completion> {
        if !self.backend.is_configured() {
            return Err(Error::Configuration("OpenRouter API key not configured".into()));
        }
        let models = self.preference.ordered();
        if models.is_empty() {
            return Err(Error::Configuration("no AI models configured".into()));
        }

        let envelope = prompt.envelope();
        let messages = prompt.messages();
        let mut last_error: Option<String> = None;

        for model in &models {
            let started = Instant::now();
            tracing::debug!(model = %model.id, capability = %envelope.capability, "trying model");
            let request = ChatCompletionRequest {
                model: model.id.clone(),
                messages: messages.clone(),
                max_tokens: envelope.max_tokens,
                temperature: envelope.temperature,
            };

            let response = match self.backend.complete(&request).await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(model = %model.display_name, error = %err, "model failed, trying next fallback");
                    last_error = Some(err.to_string());
                    continue;
                }
            };
            let Some(text) = response.first_content().map(str::trim).filter(|t| !t.is_empty()) else {
                tracing::warn!(model = %model.display_name, "model returned empty response");
                last_error = Some(format!("{} returned an empty response", model.display_name));
                continue;
            };

            let usage = response.usage.unwrap_or_default();
            tracing::debug!(
                model = %model.display_name,
                total_tokens = usage.total_tokens,
                "model succeeded"
            );
            let completion = Completion {
                text: text.to_string(),
                model: model.id.clone(),
                usage,
            };
            self.track(envelope.capability, &completion, started).await;
            return Ok(completion);
        }

        Err(Error::ModelsExhausted {
            tried: models
                .iter()
                .map(|m| m.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            last: last_error.unwrap_or_else(|| "Unknown error".into()),
        })
    }

    async fn track(&self, capability: Capability, completion: &Completion, started: Instant) {
        let Some(tracker) = &self.usage else { return };
        let row = AiUsage {
            id: format!("ai_usage_{}", uuid::Uuid::new_v4().simple()),
            request_type: capability,
            model_used: completion.model.clone(),
            prompt_tokens: completion.usage.prompt_tokens,
            completion_tokens: completion.usage.completion_tokens,
            total_tokens: completion.usage.total_tokens,
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            timestamp: chrono::Utc::now(),
        };
        if let Err(e) = tracker.record_usage(row).await {
            tracing::error!(error = %e, "failed to track AI usage");
        }
    }
}
