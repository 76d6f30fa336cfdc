use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// OpenAI-compatible wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
    #[serde(default)]
    pub model: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Analysis results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// `POSITIVE` or `NEGATIVE` (any case, surrounding whitespace ignored);
    /// everything else is neutral.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Self::Positive,
            "NEGATIVE" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => write!(f, "POSITIVE"),
            Self::Neutral => write!(f, "NEUTRAL"),
            Self::Negative => write!(f, "NEGATIVE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub text: String,
    /// 0.0 to 1.0
    pub importance: f32,
    /// Approximate position in the article.
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPointsResult {
    pub key_points: Vec<KeyPoint>,
    pub summary: String,
    pub article_length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Date,
    Event,
    Product,
    Other,
}

impl EntityType {
    /// Unrecognized labels become `Other`.
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PERSON" => Self::Person,
            "ORGANIZATION" => Self::Organization,
            "LOCATION" => Self::Location,
            "DATE" => Self::Date,
            "EVENT" => Self::Event,
            "PRODUCT" => Self::Product,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f32,
    pub mentions: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecognitionResult {
    pub entities: Vec<RecognizedEntity>,
    pub total_entities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicClassification {
    pub topic: String,
    pub confidence: f32,
    pub subtopics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicClassificationResult {
    pub primary_topic: TopicClassification,
    pub secondary_topics: Vec<TopicClassification>,
    pub all_topics: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BiasLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl BiasLevel {
    pub fn from_label(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "LOW" => Self::Low,
            "MEDIUM" => Self::Medium,
            "HIGH" => Self::High,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysis {
    pub level: BiasLevel,
    /// e.g. "Political", "Corporate", "Confirmation"
    pub bias_type: Option<String>,
    pub explanation: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasDetectionResult {
    pub bias_analysis: BiasAnalysis,
    pub objectivity_score: f32,
    pub credibility_indicators: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInterest {
    pub topic: String,
    pub score: f32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecommendation {
    pub article_id: String,
    pub score: f32,
    pub reason: String,
    pub matched_interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub recommendations: Vec<ArticleRecommendation>,
    pub user_profile: Vec<UserInterest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    /// "user", "assistant" or "system"
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Id of the article the message relates to, if any.
    pub article_context: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            role: "user".into(),
            content: content.into(),
            timestamp: Utc::now(),
            article_context: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: ChatMessage,
    pub suggested_questions: Vec<String>,
    pub related_articles: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Headline,
    SocialCaption,
    Tags,
    ReadingNotes,
    CustomQuery,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headline => "headline",
            Self::SocialCaption => "social_caption",
            Self::Tags => "tags",
            Self::ReadingNotes => "reading_notes",
            Self::CustomQuery => "custom",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "headline" => Ok(Self::Headline),
            "social_caption" | "caption" => Ok(Self::SocialCaption),
            "tags" => Ok(Self::Tags),
            "reading_notes" | "notes" => Ok(Self::ReadingNotes),
            "custom" | "custom_query" => Ok(Self::CustomQuery),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentGenerationResult {
    pub content_type: ContentType,
    pub content: String,
    pub variations: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sentiment_labels() {
        assert_eq!(Sentiment::from_label(" positive\n"), Sentiment::Positive);
        assert_eq!(Sentiment::from_label("NEGATIVE"), Sentiment::Negative);
        assert_eq!(Sentiment::from_label("Mostly positive"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label(""), Sentiment::Neutral);
    }

    #[test]
    fn unknown_labels_fall_to_catch_all() {
        assert_eq!(EntityType::from_label("person"), EntityType::Person);
        assert_eq!(EntityType::from_label("ANIMAL"), EntityType::Other);
        assert_eq!(BiasLevel::from_label("high"), BiasLevel::High);
        assert_eq!(BiasLevel::from_label("extreme"), BiasLevel::Unknown);
    }

    #[test]
    fn content_type_parses_aliases() {
        assert_eq!("social-caption".parse(), Ok(ContentType::SocialCaption));
        assert_eq!("notes".parse(), Ok(ContentType::ReadingNotes));
        assert!("poem".parse::<ContentType>().is_err());
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let resp: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "role": "assistant", "content": "hi" } }]
        }))
        .unwrap();
        assert_eq!(resp.first_content(), Some("hi"));
        assert!(resp.usage.is_none());

        let empty: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty.first_content(), None);
    }
}
