//! NewsAPI DTO -> domain conversion.

use super::wire::NewsApiArticle;
use crate::types::Article;
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

const MAX_TAGS: usize = 5;
const MIN_TAG_LEN: usize = 3;

pub fn to_domain(dto: NewsApiArticle) -> Article {
    let title = dto.title.unwrap_or_default();
    let tags = extract_tags(&title, dto.description.as_deref());
    Article {
        id: article_id(&dto.url),
        published_at: parse_published_at(dto.published_at.as_deref().unwrap_or_default()),
        source: dto
            .source
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Unknown".to_string()),
        title,
        description: dto.description,
        content: dto.content,
        url: dto.url,
        image_url: dto.url_to_image,
        author: dto.author,
        category: None,
        tags,
    }
}

/// Convert a page of articles, dropping entries without a URL.
pub fn to_domain_list(dtos: Vec<NewsApiArticle>) -> Vec<Article> {
    dtos.into_iter()
        .filter(|a| !a.url.trim().is_empty())
        .map(to_domain)
        .collect()
}

/// Stable id: UUID v5 in the URL namespace of the trimmed URL.
pub fn article_id(url: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, url.trim().as_bytes()).to_string()
}

/// Offset forms beyond RFC 3339. Seconds are optional, as in ISO-8601.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M%#z"];
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// ISO-8601 with offset, then ISO local date-time (taken as UTC), then now.
pub fn parse_published_at(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return dt.with_timezone(&Utc);
    }
    tracing::debug!(published_at = raw, "not an offset date-time, trying local format");
    if let Some(naive) = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return naive.and_utc();
    }
    tracing::warn!(published_at = raw, "unparseable publishedAt, using current time");
    Utc::now()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_capitalized_word(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_uppercase())
        && word.len() > 1
        && chars.all(|c| c.is_ascii_lowercase())
}

/// Up to five distinct capitalized words or whitespace-separated runs of
/// them ("Climate Change", "United States") from title and description.
pub fn extract_tags(title: &str, description: Option<&str>) -> Vec<String> {
    let text = format!("{} {}", title, description.unwrap_or_default());

    let mut phrases: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut gap_is_whitespace = false;
    let mut rest = text.as_str();

    while !rest.is_empty() {
        let starts_word = rest.chars().next().is_some_and(is_word_char);
        let end = rest
            .char_indices()
            .find(|(_, c)| is_word_char(*c) != starts_word)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (segment, tail) = rest.split_at(end);
        rest = tail;

        if !starts_word {
            gap_is_whitespace = segment.chars().all(char::is_whitespace);
            continue;
        }
        if is_capitalized_word(segment) {
            if !current.is_empty() && !gap_is_whitespace {
                phrases.push(current.join(" "));
                current.clear();
            }
            current.push(segment);
        } else if !current.is_empty() {
            phrases.push(current.join(" "));
            current.clear();
        }
        gap_is_whitespace = false;
    }
    if !current.is_empty() {
        phrases.push(current.join(" "));
    }

    let mut tags: Vec<String> = Vec::new();
    for phrase in phrases {
        if phrase.len() >= MIN_TAG_LEN && !tags.contains(&phrase) {
            tags.push(phrase);
            if tags.len() == MAX_TAGS {
                break;
            }
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::news::wire::NewsApiSource;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn id_is_stable_per_url() {
        let a = article_id("https://example.com/story");
        let b = article_id("  https://example.com/story ");
        let c = article_id("https://example.com/other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn parses_offset_timestamps() {
        let dt = parse_published_at("2025-11-14T12:00:02Z");
        assert_eq!(dt, Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 2).unwrap());
        let shifted = parse_published_at("2025-11-14T12:00:02+02:00");
        assert_eq!(shifted.hour(), 10);
    }

    #[test]
    fn seconds_are_optional() {
        let noon = Utc.with_ymd_and_hms(2025, 11, 14, 12, 0, 0).unwrap();
        assert_eq!(parse_published_at("2025-11-14T12:00Z"), noon);
        assert_eq!(
            parse_published_at("2025-11-14T12:00+02:00"),
            Utc.with_ymd_and_hms(2025, 11, 14, 10, 0, 0).unwrap()
        );
        assert_eq!(parse_published_at("2025-11-14T12:00"), noon);
        assert_eq!(parse_published_at("2025-11-14T12:00:30.5"), noon + chrono::TimeDelta::milliseconds(30_500));
    }

    #[test]
    fn falls_back_to_local_then_now() {
        let local = parse_published_at("2024-03-01T08:30:00");
        assert_eq!(local.year(), 2024);
        assert_eq!(local.hour(), 8);

        let before = Utc::now();
        let now = parse_published_at("yesterday-ish");
        assert!(now >= before);
    }

    #[test]
    fn extracts_capitalized_phrases() {
        let tags = extract_tags(
            "Climate Change talks resume in United States today",
            Some("Leaders from the European Union met in Paris. Paris was calm."),
        );
        assert_eq!(
            tags,
            vec!["Climate Change", "United States", "Leaders", "European Union", "Paris"]
        );
    }

    #[test]
    fn skips_short_and_mixed_words() {
        let tags = extract_tags("Al met iPhone USA fans in Rome", None);
        assert_eq!(tags, vec!["Rome"]);
    }

    #[test]
    fn phrases_break_on_punctuation() {
        let tags = extract_tags("Berlin, Madrid", None);
        assert_eq!(tags, vec!["Berlin", "Madrid"]);
    }

    #[test]
    fn maps_dto_fields() {
        let article = to_domain(NewsApiArticle {
            source: NewsApiSource {
                id: Some("bbc-news".into()),
                name: Some("BBC News".into()),
            },
            author: Some("Reporter".into()),
            title: Some("Markets Rally".into()),
            description: None,
            url: "https://bbc.co.uk/a".into(),
            url_to_image: Some("https://bbc.co.uk/a.jpg".into()),
            published_at: Some("2025-01-01T00:00:00Z".into()),
            content: Some("Body".into()),
        });
        assert_eq!(article.id, article_id("https://bbc.co.uk/a"));
        assert_eq!(article.source, "BBC News");
        assert_eq!(article.image_url.as_deref(), Some("https://bbc.co.uk/a.jpg"));
        assert_eq!(article.tags, vec!["Markets Rally"]);
        assert!(article.category.is_none());
    }
}
