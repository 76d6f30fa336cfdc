//! Prompt builders: one per capability, each owning its content budget and
//! request envelope.

use super::types::{ChatMessage, ContentType, Message, UserInterest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SUMMARY_BUDGET: usize = 4000;
pub const SENTIMENT_BUDGET: usize = 2000;
pub const TRANSLATION_BUDGET: usize = 3000;
pub const KEY_POINTS_BUDGET: usize = 4000;
pub const ENTITIES_BUDGET: usize = 3000;
pub const TOPIC_BUDGET: usize = 3000;
pub const BIAS_BUDGET: usize = 4000;
pub const CHAT_CONTEXT_BUDGET: usize = 2000;
pub const SHORT_CONTENT_BUDGET: usize = 1000;
pub const LONG_CONTENT_BUDGET: usize = 2000;
pub const MAX_RECOMMENDATION_CANDIDATES: usize = 20;
pub const CHAT_HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Summarize,
    Sentiment,
    Translate,
    KeyPoints,
    Entities,
    Topic,
    Bias,
    Chat,
    Recommend,
    GenerateContent,
}

impl Capability {
    pub const ALL: [Capability; 10] = [
        Self::Summarize,
        Self::Sentiment,
        Self::Translate,
        Self::KeyPoints,
        Self::Entities,
        Self::Topic,
        Self::Bias,
        Self::Chat,
        Self::Recommend,
        Self::GenerateContent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Sentiment => "sentiment",
            Self::Translate => "translate",
            Self::KeyPoints => "key_points",
            Self::Entities => "entities",
            Self::Topic => "topic",
            Self::Bias => "bias",
            Self::Chat => "chat",
            Self::Recommend => "recommend",
            Self::GenerateContent => "generate_content",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("unknown capability: {}", s))
    }
}

/// Per-call generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequestEnvelope {
    pub capability: Capability,
    pub max_tokens: u32,
    /// 0.0 to 1.0
    pub temperature: f32,
    pub system_prompt: Option<String>,
}

impl AiRequestEnvelope {
    fn new(capability: Capability, max_tokens: u32, temperature: f32, system: &str) -> Self {
        Self {
            capability,
            max_tokens,
            temperature,
            system_prompt: Some(system.to_string()),
        }
    }
}

/// Builds the chat messages for one capability call.
pub trait PromptBuilder {
    fn envelope(&self) -> AiRequestEnvelope;

    /// The user prompt.
    fn build(&self) -> String;

    /// System prompt (if any) followed by the user prompt.
    fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.envelope().system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(self.build()));
        messages
    }
}

/// First `max_chars` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn title_line(title: Option<&str>) -> String {
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) => format!("Title: {}\n\n", t),
        None => String::new(),
    }
}

fn clamp_tokens(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ---------------------------------------------------------------------------
// Plain-text capabilities
// ---------------------------------------------------------------------------

pub struct SummarizePrompt<'a> {
    pub content: &'a str,
    /// Target summary length in characters.
    pub max_length: usize,
}

impl PromptBuilder for SummarizePrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Summarize,
            clamp_tokens(self.max_length.saturating_add(50)),
            0.3,
            "You are a news summarization assistant. Summarize concisely and objectively.",
        )
    }

    fn build(&self) -> String {
        format!(
            "Summarize the following news article in approximately {} characters.\n\
             Focus on the key facts and main points. Be concise and objective.\n\
             Do not include phrases like \"This article discusses\" or \"The article is about\".\n\
             Just provide the summary directly.\n\n\
             Article:\n{}",
            self.max_length,
            truncate_chars(self.content, SUMMARY_BUDGET)
        )
    }
}

pub struct SentimentPrompt<'a> {
    pub content: &'a str,
}

impl PromptBuilder for SentimentPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Sentiment,
            10,
            0.1,
            "You are a sentiment analysis assistant. Respond with only: POSITIVE, NEUTRAL, or NEGATIVE.",
        )
    }

    fn build(&self) -> String {
        format!(
            "Analyze the sentiment of this news article.\n\
             Respond with only one word: POSITIVE, NEUTRAL, or NEGATIVE.\n\n\
             Article:\n{}",
            truncate_chars(self.content, SENTIMENT_BUDGET)
        )
    }
}

pub struct TranslatePrompt<'a> {
    pub content: &'a str,
    pub target_language: &'a str,
}

impl PromptBuilder for TranslatePrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Translate,
            clamp_tokens(self.content.chars().count().saturating_add(500)),
            0.3,
            "You are a professional translator. Translate accurately while preserving meaning.",
        )
    }

    fn build(&self) -> String {
        format!(
            "Translate the following news article to {}.\n\
             Preserve the meaning and tone. Provide only the translation.\n\n\
             Article:\n{}",
            self.target_language,
            truncate_chars(self.content, TRANSLATION_BUDGET)
        )
    }
}

// ---------------------------------------------------------------------------
// Structured (JSON) capabilities
// ---------------------------------------------------------------------------

pub struct KeyPointsPrompt<'a> {
    pub content: &'a str,
    pub max_points: usize,
}

impl PromptBuilder for KeyPointsPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::KeyPoints,
            500,
            0.3,
            "You are a news analysis expert. Extract key points from articles in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        format!(
            r#"Extract the {max} most important key points from this news article.
For each key point, provide:
- text: The key point text (concise, 1-2 sentences)
- importance: A score from 0.0 to 1.0
- position: Approximate position in the article (0-100)

Also provide a brief summary of all key points.

Return valid JSON in this format:
{{
    "keyPoints": [
        {{"text": "Key point text", "importance": 0.9, "position": 10}}
    ],
    "summary": "Brief summary of key points"
}}

Article:
{content}"#,
            max = self.max_points,
            content = truncate_chars(self.content, KEY_POINTS_BUDGET)
        )
    }
}

pub struct EntitiesPrompt<'a> {
    pub content: &'a str,
}

impl PromptBuilder for EntitiesPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Entities,
            800,
            0.2,
            "You are an entity recognition expert. Identify entities in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        format!(
            r#"Identify all important entities in this news article.
For each entity, provide:
- text: The exact entity text as it appears
- type: One of: PERSON, ORGANIZATION, LOCATION, DATE, EVENT, PRODUCT, OTHER
- confidence: A score from 0.0 to 1.0
- mentions: List of approximate positions where it appears (0-100)

Return valid JSON in this format:
{{
    "entities": [
        {{"text": "Entity name", "type": "PERSON", "confidence": 0.95, "mentions": [10, 45]}}
    ]
}}

Article:
{}"#,
            truncate_chars(self.content, ENTITIES_BUDGET)
        )
    }
}

pub struct TopicPrompt<'a> {
    pub content: &'a str,
    pub title: Option<&'a str>,
}

impl PromptBuilder for TopicPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Topic,
            400,
            0.3,
            "You are a news classification expert. Classify topics in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        format!(
            r#"Classify the topic of this news article.
Provide:
- primaryTopic: Main topic with confidence and subtopics
- secondaryTopics: Up to 3 related topics with confidence
- allTopics: List of all relevant topics

Common topics: Politics, Technology, Business, Health, Sports, Entertainment, Science, Environment, World News, Crime, Education.

Return valid JSON in this format:
{{
    "primaryTopic": {{"topic": "Technology", "confidence": 0.9, "subtopics": ["AI", "Software"]}},
    "secondaryTopics": [{{"topic": "Business", "confidence": 0.7, "subtopics": []}}],
    "allTopics": ["Technology", "Business", "AI"]
}}

{title}Article:
{content}"#,
            title = title_line(self.title),
            content = truncate_chars(self.content, TOPIC_BUDGET)
        )
    }
}

pub struct BiasPrompt<'a> {
    pub content: &'a str,
    pub title: Option<&'a str>,
}

impl PromptBuilder for BiasPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Bias,
            600,
            0.3,
            "You are a media literacy expert. Analyze bias in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        format!(
            r#"Analyze this news article for potential bias.
Provide:
- biasAnalysis: level (LOW/MEDIUM/HIGH), type (Political/Corporate/Confirmation/Other), explanation, and examples
- objectivityScore: Score from 0.0 to 1.0 (1.0 = completely objective)
- credibilityIndicators: List of positive credibility indicators

Return valid JSON in this format:
{{
    "biasAnalysis": {{
        "level": "LOW",
        "biasType": "Political",
        "explanation": "Brief explanation",
        "examples": ["Example 1", "Example 2"]
    }},
    "objectivityScore": 0.85,
    "credibilityIndicators": ["Multiple sources", "Factual claims", "Balanced perspective"]
}}

{title}Article:
{content}"#,
            title = title_line(self.title),
            content = truncate_chars(self.content, BIAS_BUDGET)
        )
    }
}

pub struct RecommendPrompt<'a> {
    pub interests: &'a [UserInterest],
    /// `(article id, short metadata)` pairs.
    pub candidates: &'a [(String, String)],
    pub limit: usize,
}

impl PromptBuilder for RecommendPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::Recommend,
            1000,
            0.4,
            "You are a recommendation system expert. Generate recommendations in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        let interests = self
            .interests
            .iter()
            .map(|i| format!("{}({})", i.topic, i.score))
            .collect::<Vec<_>>()
            .join(", ");
        let articles = self
            .candidates
            .iter()
            .take(MAX_RECOMMENDATION_CANDIDATES)
            .map(|(id, meta)| format!("- {}: {}", id, meta))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            r#"Generate personalized article recommendations based on user interests.

User interests: {interests}

Available articles:
{articles}

Return the top {limit} recommendations with:
- articleId: The article ID
- score: Relevance score from 0.0 to 1.0
- reason: Brief explanation
- matchedInterests: List of matched interests

Return valid JSON in this format:
{{
    "recommendations": [
        {{"articleId": "id1", "score": 0.9, "reason": "Matches interest in Technology", "matchedInterests": ["Technology"]}}
    ]
}}"#,
            limit = self.limit
        )
    }
}

/// Conversation turn: the system prompt carries the article context, history
/// is windowed to the most recent messages.
pub struct ChatPrompt<'a> {
    pub history: &'a [ChatMessage],
    pub user_message: &'a str,
    pub article_context: Option<&'a str>,
}

impl ChatPrompt<'_> {
    fn system_prompt(&self) -> String {
        match self.article_context.filter(|c| !c.trim().is_empty()) {
            Some(context) => format!(
                "You are a helpful AI assistant for a news app.\n\
                 You can answer questions about articles, explain news topics, and provide context.\n\
                 The user is asking about this article:\n{}\n\n\
                 Be helpful, accurate, and concise. If you don't know something, say so.",
                truncate_chars(context, CHAT_CONTEXT_BUDGET)
            ),
            None => "You are a helpful AI assistant for a news app.\n\
                     You can answer questions about news topics, explain concepts, and provide context.\n\
                     Be helpful, accurate, and concise. If you don't know something, say so."
                .to_string(),
        }
    }
}

impl PromptBuilder for ChatPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope {
            capability: Capability::Chat,
            max_tokens: 500,
            temperature: 0.7,
            system_prompt: Some(self.system_prompt()),
        }
    }

    fn build(&self) -> String {
        self.user_message.to_string()
    }

    fn messages(&self) -> Vec<Message> {
        let skip = self.history.len().saturating_sub(CHAT_HISTORY_WINDOW);
        let mut messages = vec![Message::system(self.system_prompt())];
        messages.extend(self.history[skip..].iter().map(|m| Message {
            role: m.role.clone(),
            content: m.content.clone(),
        }));
        messages.push(Message::user(self.build()));
        messages
    }
}

pub struct ContentPrompt<'a> {
    pub content: &'a str,
    pub content_type: ContentType,
    pub custom_prompt: Option<&'a str>,
}

impl PromptBuilder for ContentPrompt<'_> {
    fn envelope(&self) -> AiRequestEnvelope {
        AiRequestEnvelope::new(
            Capability::GenerateContent,
            400,
            0.8,
            "You are a creative content generator. Generate content in valid JSON format.",
        )
    }

    fn build(&self) -> String {
        let (instructions, example, budget) = match self.content_type {
            ContentType::Headline => (
                "Generate 3 engaging headlines for this article.\n\
                 Headlines should be catchy, accurate, and concise (under 80 chars)."
                    .to_string(),
                r##"{"content": "Best headline", "variations": ["Headline 1", "Headline 2", "Headline 3"], "metadata": {"type": "headline"}}"##,
                SHORT_CONTENT_BUDGET,
            ),
            ContentType::SocialCaption => (
                "Generate 3 social media captions for this article.\nInclude relevant hashtags."
                    .to_string(),
                r##"{"content": "Best caption", "variations": ["Caption 1", "Caption 2", "Caption 3"], "metadata": {"type": "social_caption", "hashtags": "#news #trending"}}"##,
                SHORT_CONTENT_BUDGET,
            ),
            ContentType::Tags => (
                "Generate relevant tags for this article.\nInclude 5-10 tags.".to_string(),
                r##"{"content": "tag1, tag2, tag3", "variations": ["tag1, tag2", "tag1, tag2, tag3, tag4"], "metadata": {"type": "tags", "count": "5"}}"##,
                SHORT_CONTENT_BUDGET,
            ),
            ContentType::ReadingNotes => (
                "Generate reading notes for this article.\n\
                 Include key takeaways, important facts, and questions to consider."
                    .to_string(),
                r##"{"content": "Reading notes...", "variations": ["Notes 1", "Notes 2"], "metadata": {"type": "reading_notes"}}"##,
                LONG_CONTENT_BUDGET,
            ),
            ContentType::CustomQuery => (
                self.custom_prompt
                    .unwrap_or("Write a short piece based on this article.")
                    .to_string(),
                r##"{"content": "Generated content", "variations": ["Variation 1", "Variation 2"], "metadata": {"type": "custom"}}"##,
                LONG_CONTENT_BUDGET,
            ),
        };
        format!(
            "{}\n\nReturn valid JSON:\n{}\n\nArticle: {}",
            instructions,
            example,
            truncate_chars(self.content, budget)
        )
    }
}
