//! Tolerant parsers for model output.
//!
//! Model text is not a trustworthy machine-readable contract, so parsing
//! never fails: a response that cannot be decoded yields the parser's
//! documented default, and each field is read leniently (missing or
//! mistyped strings become `""`, scores become `0.5`, unknown enum labels
//! map to their catch-all variant, lists become empty and malformed list
//! items are skipped).

use super::types::*;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_SCORE: f32 = 0.5;
pub const DEFAULT_TOPIC: &str = "General";

pub const SUGGESTED_QUESTIONS: [&str; 3] = [
    "Can you explain more about that?",
    "What's the source of this information?",
    "How does this relate to current events?",
];

pub type JsonObject = Map<String, Value>;

/// Turns raw completion text into a typed result. Never fails.
pub trait ResponseParser {
    type Output;

    fn parse(&self, raw: &str) -> Self::Output;
}

/// Parser for capabilities that answer with a JSON object.
pub trait JsonResponseParser {
    type Output;

    /// Name used in log events.
    const NAME: &'static str;

    /// Result returned when the text is not a JSON object.
    fn fallback(&self) -> Self::Output;

    fn read_object(&self, root: &JsonObject) -> Self::Output;
}

impl<P: JsonResponseParser> ResponseParser for P {
    type Output = P::Output;

    fn parse(&self, raw: &str) -> Self::Output {
        match decode_object(raw) {
            Ok(root) => self.read_object(&root),
            Err(reason) => {
                tracing::warn!(parser = P::NAME, %reason, "unparseable model output, using default");
                self.fallback()
            }
        }
    }
}

/// Remove a surrounding Markdown code fence (```` ``` ```` or ```` ```json ````).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string on the opening fence line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn decode_object(raw: &str) -> Result<JsonObject, String> {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        return Err("empty response".into());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Field readers
// ---------------------------------------------------------------------------

/// Scalar rendered as text. Null, arrays and objects read as absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_or_empty(value: Option<&Value>) -> String {
    text(value).unwrap_or_default()
}

/// Score as reported by the model; absent or non-finite values read as `0.5`.
fn score(value: Option<&Value>) -> f32 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => v as f32,
        _ => DEFAULT_SCORE,
    }
}

/// Non-negative integer. Integral floats (`10.0`) are accepted.
fn whole_number(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;
    u32::try_from(n).ok()
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(|v| text(Some(v))).collect(),
        _ => Vec::new(),
    }
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &JsonObject> {
    let items: &[Value] = match value {
        Some(Value::Array(items)) => items,
        _ => &[],
    };
    items.iter().filter_map(Value::as_object)
}

fn object(value: Option<&Value>) -> Option<&JsonObject> {
    value.and_then(Value::as_object)
}

// ---------------------------------------------------------------------------
// Structured capabilities
// ---------------------------------------------------------------------------

pub struct KeyPointsParser {
    /// Length of the analysed article, preserved in every result.
    pub article_length: usize,
}

impl JsonResponseParser for KeyPointsParser {
    type Output = KeyPointsResult;
    const NAME: &'static str = "key_points";

    fn fallback(&self) -> KeyPointsResult {
        KeyPointsResult {
            key_points: Vec::new(),
            summary: String::new(),
            article_length: self.article_length,
        }
    }

    fn read_object(&self, root: &JsonObject) -> KeyPointsResult {
        let key_points = objects(root.get("keyPoints"))
            .map(|item| KeyPoint {
                text: text_or_empty(item.get("text")),
                importance: score(item.get("importance")),
                position: item.get("position").and_then(whole_number).unwrap_or(0),
            })
            .collect();
        KeyPointsResult {
            key_points,
            summary: text_or_empty(root.get("summary")),
            article_length: self.article_length,
        }
    }
}

pub struct EntitiesParser;

impl JsonResponseParser for EntitiesParser {
    type Output = EntityRecognitionResult;
    const NAME: &'static str = "entities";

    fn fallback(&self) -> EntityRecognitionResult {
        EntityRecognitionResult {
            entities: Vec::new(),
            total_entities: 0,
        }
    }

    fn read_object(&self, root: &JsonObject) -> EntityRecognitionResult {
        let entities: Vec<RecognizedEntity> = objects(root.get("entities"))
            .map(|item| RecognizedEntity {
                text: text_or_empty(item.get("text")),
                entity_type: text(item.get("type"))
                    .map(|t| EntityType::from_label(&t))
                    .unwrap_or(EntityType::Other),
                confidence: score(item.get("confidence")),
                mentions: match item.get("mentions") {
                    Some(Value::Array(items)) => items.iter().filter_map(whole_number).collect(),
                    _ => Vec::new(),
                },
            })
            .collect();
        EntityRecognitionResult {
            total_entities: entities.len(),
            entities,
        }
    }
}

pub struct TopicParser;

fn topic_entry(item: &JsonObject, default_topic: &str) -> TopicClassification {
    TopicClassification {
        topic: text(item.get("topic")).unwrap_or_else(|| default_topic.to_string()),
        confidence: score(item.get("confidence")),
        subtopics: text_list(item.get("subtopics")),
    }
}

impl JsonResponseParser for TopicParser {
    type Output = TopicClassificationResult;
    const NAME: &'static str = "topic";

    fn fallback(&self) -> TopicClassificationResult {
        TopicClassificationResult {
            primary_topic: TopicClassification {
                topic: DEFAULT_TOPIC.into(),
                confidence: DEFAULT_SCORE,
                subtopics: Vec::new(),
            },
            secondary_topics: Vec::new(),
            all_topics: Vec::new(),
        }
    }

    fn read_object(&self, root: &JsonObject) -> TopicClassificationResult {
        let primary_topic = match object(root.get("primaryTopic")) {
            Some(primary) => topic_entry(primary, DEFAULT_TOPIC),
            None => self.fallback().primary_topic,
        };
        TopicClassificationResult {
            primary_topic,
            secondary_topics: objects(root.get("secondaryTopics"))
                .map(|item| topic_entry(item, ""))
                .collect(),
            all_topics: text_list(root.get("allTopics")),
        }
    }
}

pub struct BiasParser;

impl JsonResponseParser for BiasParser {
    type Output = BiasDetectionResult;
    const NAME: &'static str = "bias";

    fn fallback(&self) -> BiasDetectionResult {
        BiasDetectionResult {
            bias_analysis: BiasAnalysis {
                level: BiasLevel::Unknown,
                bias_type: None,
                explanation: String::new(),
                examples: Vec::new(),
            },
            objectivity_score: DEFAULT_SCORE,
            credibility_indicators: Vec::new(),
        }
    }

    fn read_object(&self, root: &JsonObject) -> BiasDetectionResult {
        let empty = JsonObject::new();
        let analysis = object(root.get("biasAnalysis")).unwrap_or(&empty);
        BiasDetectionResult {
            bias_analysis: BiasAnalysis {
                level: text(analysis.get("level"))
                    .map(|l| BiasLevel::from_label(&l))
                    .unwrap_or(BiasLevel::Unknown),
                bias_type: text(analysis.get("biasType")),
                explanation: text_or_empty(analysis.get("explanation")),
                examples: text_list(analysis.get("examples")),
            },
            objectivity_score: score(root.get("objectivityScore")),
            credibility_indicators: text_list(root.get("credibilityIndicators")),
        }
    }
}

pub struct RecommendationParser {
    pub interests: Vec<UserInterest>,
}

impl JsonResponseParser for RecommendationParser {
    type Output = RecommendationResult;
    const NAME: &'static str = "recommend";

    fn fallback(&self) -> RecommendationResult {
        RecommendationResult {
            recommendations: Vec::new(),
            user_profile: self.interests.clone(),
        }
    }

    fn read_object(&self, root: &JsonObject) -> RecommendationResult {
        RecommendationResult {
            recommendations: objects(root.get("recommendations"))
                .map(|item| ArticleRecommendation {
                    article_id: text_or_empty(item.get("articleId")),
                    score: score(item.get("score")),
                    reason: text_or_empty(item.get("reason")),
                    matched_interests: text_list(item.get("matchedInterests")),
                })
                .collect(),
            user_profile: self.interests.clone(),
        }
    }
}

pub struct ContentParser {
    pub content_type: ContentType,
}

impl JsonResponseParser for ContentParser {
    type Output = ContentGenerationResult;
    const NAME: &'static str = "generate_content";

    fn fallback(&self) -> ContentGenerationResult {
        ContentGenerationResult {
            content_type: self.content_type,
            content: String::new(),
            variations: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn read_object(&self, root: &JsonObject) -> ContentGenerationResult {
        let metadata = object(root.get("metadata"))
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), text_or_empty(Some(v))))
                    .collect()
            })
            .unwrap_or_default();
        ContentGenerationResult {
            content_type: self.content_type,
            content: text_or_empty(root.get("content")),
            variations: text_list(root.get("variations")),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// Plain-text capabilities
// ---------------------------------------------------------------------------

pub struct SentimentParser;

impl ResponseParser for SentimentParser {
    type Output = Sentiment;

    fn parse(&self, raw: &str) -> Sentiment {
        Sentiment::from_label(raw)
    }
}

/// Wraps the completion as an assistant message.
pub struct ChatParser;

impl ResponseParser for ChatParser {
    type Output = ChatResponse;

    fn parse(&self, raw: &str) -> ChatResponse {
        ChatResponse {
            message: ChatMessage {
                id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
                role: "assistant".into(),
                content: raw.trim().to_string(),
                timestamp: Utc::now(),
                article_context: None,
            },
            suggested_questions: SUGGESTED_QUESTIONS.iter().map(|q| q.to_string()).collect(),
            related_articles: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MALFORMED: [&str; 5] = [
        "{ invalid json }",
        "",
        "   ",
        "[1, 2, 3]",
        "Sure! Here are the key points.",
    ];

    #[test]
    fn key_points_happy_path() {
        let parser = KeyPointsParser { article_length: 1200 };
        let result = parser.parse(
            r#"{"keyPoints":[{"text":"Point 1","importance":0.8,"position":10}],"summary":"S"}"#,
        );
        assert_eq!(result.key_points.len(), 1);
        let point = &result.key_points[0];
        assert_eq!(point.text, "Point 1");
        assert!((point.importance - 0.8).abs() < 1e-6);
        assert_eq!(point.position, 10);
        assert_eq!(result.summary, "S");
        assert_eq!(result.article_length, 1200);
    }

    #[test]
    fn key_points_tolerates_field_types() {
        let parser = KeyPointsParser { article_length: 7 };
        let result = parser.parse(
            r#"{"keyPoints":[
                {"text":"a","importance":"0.9","position":10.0},
                {"text":42,"importance":"high","position":"x"},
                "not an object",
                {"importance":1.7,"position":-3}
            ],"summary":["wrong"]}"#,
        );
        assert_eq!(result.key_points.len(), 3);
        assert!((result.key_points[0].importance - 0.9).abs() < 1e-6);
        assert_eq!(result.key_points[0].position, 10);
        assert_eq!(result.key_points[1].text, "42");
        assert_eq!(result.key_points[1].importance, DEFAULT_SCORE);
        assert_eq!(result.key_points[1].position, 0);
        assert_eq!(result.key_points[2].text, "");
        assert_eq!(result.key_points[2].importance, 1.0);
        assert_eq!(result.key_points[2].position, 0);
        assert_eq!(result.summary, "");
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        let raw = "```json\n{\"keyPoints\":[],\"summary\":\"fenced\"}\n```";
        let result = KeyPointsParser { article_length: 0 }.parse(raw);
        assert_eq!(result.summary, "fenced");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
    }

    #[test]
    fn malformed_input_yields_documented_defaults() {
        for raw in MALFORMED {
            let kp = KeyPointsParser { article_length: 99 }.parse(raw);
            assert!(kp.key_points.is_empty());
            assert_eq!(kp.summary, "");
            assert_eq!(kp.article_length, 99);

            let entities = EntitiesParser.parse(raw);
            assert!(entities.entities.is_empty());
            assert_eq!(entities.total_entities, 0);

            let topic = TopicParser.parse(raw);
            assert_eq!(topic.primary_topic.topic, DEFAULT_TOPIC);
            assert_eq!(topic.primary_topic.confidence, DEFAULT_SCORE);

            let bias = BiasParser.parse(raw);
            assert_eq!(bias.bias_analysis.level, BiasLevel::Unknown);
            assert_eq!(bias.objectivity_score, DEFAULT_SCORE);

            let recs = RecommendationParser { interests: vec![] }.parse(raw);
            assert!(recs.recommendations.is_empty());

            let content = ContentParser {
                content_type: ContentType::Tags,
            }
            .parse(raw);
            assert_eq!(content.content_type, ContentType::Tags);
            assert!(content.content.is_empty());
        }
    }

    #[test]
    fn wrong_top_level_types_use_field_defaults() {
        let raw = r#"{"keyPoints":"none","entities":{"a":1},"primaryTopic":[],"biasAnalysis":7,
                      "objectivityScore":null,"recommendations":false,"variations":"x"}"#;
        assert!(KeyPointsParser { article_length: 0 }.parse(raw).key_points.is_empty());
        assert!(EntitiesParser.parse(raw).entities.is_empty());
        assert_eq!(TopicParser.parse(raw).primary_topic.topic, DEFAULT_TOPIC);
        let bias = BiasParser.parse(raw);
        assert_eq!(bias.bias_analysis.level, BiasLevel::Unknown);
        assert_eq!(bias.objectivity_score, DEFAULT_SCORE);
        assert!(RecommendationParser { interests: vec![] }
            .parse(raw)
            .recommendations
            .is_empty());
        assert!(ContentParser {
            content_type: ContentType::Headline
        }
        .parse(raw)
        .variations
        .is_empty());
    }

    #[test]
    fn entities_map_unknown_types_to_other() {
        let result = EntitiesParser.parse(
            r#"{"entities":[
                {"text":"Ada Lovelace","type":"person","confidence":0.95,"mentions":[10, "45", 2.5, null]},
                {"text":"Rex","type":"ANIMAL"}
            ]}"#,
        );
        assert_eq!(result.total_entities, 2);
        assert_eq!(result.entities[0].entity_type, EntityType::Person);
        assert_eq!(result.entities[0].mentions, vec![10, 45]);
        assert_eq!(result.entities[1].entity_type, EntityType::Other);
        assert_eq!(result.entities[1].confidence, DEFAULT_SCORE);
    }

    #[test]
    fn topic_and_bias_full_payloads() {
        let topic = TopicParser.parse(
            r#"{"primaryTopic":{"topic":"Technology","confidence":0.9,"subtopics":["AI"]},
                "secondaryTopics":[{"topic":"Business","confidence":0.7}],
                "allTopics":["Technology","Business"]}"#,
        );
        assert_eq!(topic.primary_topic.topic, "Technology");
        assert_eq!(topic.primary_topic.subtopics, vec!["AI"]);
        assert_eq!(topic.secondary_topics[0].topic, "Business");
        assert!(topic.secondary_topics[0].subtopics.is_empty());
        assert_eq!(topic.all_topics.len(), 2);

        let bias = BiasParser.parse(
            r#"{"biasAnalysis":{"level":"medium","biasType":"Political","explanation":"e","examples":["x"]},
                "objectivityScore":0.85,"credibilityIndicators":["Multiple sources"]}"#,
        );
        assert_eq!(bias.bias_analysis.level, BiasLevel::Medium);
        assert_eq!(bias.bias_analysis.bias_type.as_deref(), Some("Political"));
        assert!((bias.objectivity_score - 0.85).abs() < 1e-6);
        assert_eq!(bias.credibility_indicators, vec!["Multiple sources"]);
    }

    #[test]
    fn scores_keep_the_reported_value() {
        let bias = BiasParser.parse(
            r#"{"biasAnalysis":{"level":"low"},"objectivityScore":1.7}"#,
        );
        assert!((bias.objectivity_score - 1.7).abs() < 1e-6);

        let bias = BiasParser.parse(
            r#"{"biasAnalysis":{"level":"low"},"objectivityScore":"-0.25"}"#,
        );
        assert!((bias.objectivity_score + 0.25).abs() < 1e-6);

        let bias = BiasParser.parse(
            r#"{"biasAnalysis":{"level":"low"},"objectivityScore":"high"}"#,
        );
        assert_eq!(bias.objectivity_score, DEFAULT_SCORE);
    }

    #[test]
    fn content_metadata_is_stringified() {
        let result = ContentParser {
            content_type: ContentType::Tags,
        }
        .parse(r#"{"content":"a, b","variations":["a"],"metadata":{"type":"tags","count":5,"x":null}}"#);
        assert_eq!(result.metadata.get("count").map(String::as_str), Some("5"));
        assert_eq!(result.metadata.get("x").map(String::as_str), Some(""));
        assert_eq!(result.content, "a, b");
    }

    #[test]
    fn chat_wraps_trimmed_text() {
        let response = ChatParser.parse("  The vote is on Tuesday.\n");
        assert_eq!(response.message.role, "assistant");
        assert_eq!(response.message.content, "The vote is on Tuesday.");
        assert!(response.message.id.starts_with("msg_"));
        assert_eq!(response.suggested_questions.len(), 3);
        assert!(response.related_articles.is_empty());
    }

    #[test]
    fn sentiment_defaults_to_neutral() {
        assert_eq!(SentimentParser.parse("Positive"), Sentiment::Positive);
        assert_eq!(SentimentParser.parse("{ invalid json }"), Sentiment::Neutral);
    }
}
