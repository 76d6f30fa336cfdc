//! Scrub credentials from text that ends up in errors or logs.

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Query parameters whose values are credentials.
const SECRET_QUERY_PARAMS: [&str; 3] = ["apikey", "api_key", "key"];

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

fn token_end(input: &str, from: usize) -> usize {
    input[from..]
        .char_indices()
        .find(|(_, c)| !is_token_char(*c))
        .map(|(i, _)| from + i)
        .unwrap_or(input.len())
}

/// Redact bearer-style tokens (`sk-...`, including OpenRouter `sk-or-...` keys).
pub fn scrub_secret_tokens(input: &str) -> String {
    const PREFIXES: [&str; 2] = ["sk-", "Bearer "];

    let mut scrubbed = input.to_string();
    for prefix in PREFIXES {
        let mut search_from = 0;
        while let Some(rel) = scrubbed[search_from..].find(prefix) {
            let start = search_from + rel;
            let content_start = start + prefix.len();
            let end = token_end(&scrubbed, content_start);
            if end == content_start {
                search_from = content_start;
                continue;
            }
            scrubbed.replace_range(content_start..end, "[REDACTED]");
            search_from = content_start + "[REDACTED]".len();
        }
    }
    scrubbed
}

/// Sanitize an error body: scrub tokens and truncate on a char boundary.
pub fn sanitize_error_body(input: &str) -> String {
    let scrubbed = scrub_secret_tokens(input.trim());
    if scrubbed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return scrubbed;
    }
    let end = scrubbed
        .char_indices()
        .nth(MAX_ERROR_BODY_CHARS)
        .map(|(i, _)| i)
        .unwrap_or(scrubbed.len());
    format!("{}...", &scrubbed[..end])
}

/// Render a URL for logging with credential query values replaced.
pub fn redact_url(url: &url::Url) -> String {
    if url.query().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if SECRET_QUERY_PARAMS.contains(&k.to_ascii_lowercase().as_str()) {
                "[REDACTED]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrubs_openrouter_keys() {
        let out = scrub_secret_tokens("invalid key sk-or-v1-abc123 supplied");
        assert_eq!(out, "invalid key sk-[REDACTED] supplied");
    }

    #[test]
    fn scrubs_bearer_values() {
        let out = scrub_secret_tokens("header was Bearer abc.def");
        assert_eq!(out, "header was Bearer [REDACTED]");
    }

    #[test]
    fn bare_prefix_is_left_alone() {
        assert_eq!(scrub_secret_tokens("task- sk- done"), "task- sk- done");
    }

    #[test]
    fn truncates_long_bodies() {
        let body = "é".repeat(500);
        let out = sanitize_error_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), MAX_ERROR_BODY_CHARS + 3);
    }

    #[test]
    fn redacts_api_key_query() {
        let url = url::Url::parse("https://newsapi.org/v2/top-headlines?country=us&apiKey=secret").unwrap();
        let out = redact_url(&url);
        assert!(out.contains("country=us"));
        assert!(!out.contains("secret"));
    }
}
