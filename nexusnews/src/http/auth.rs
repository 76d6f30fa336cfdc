//! Authentication stage: standard headers plus host-scoped credentials.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, USER_AGENT};

pub const DEFAULT_USER_AGENT: &str = "NexusNews/1.0";
pub const NEWS_API_KEY_HEADER: &str = "X-Api-Key";

/// How a credential is attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStyle {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `X-Api-Key: <key>`
    ApiKeyHeader,
    /// Custom header name with a value prefix, e.g. `("Authorization", "Token ")`.
    Custom { header: String, value_prefix: String },
}

impl AuthStyle {
    fn header_pair(&self, key: &str) -> (String, String) {
        match self {
            AuthStyle::Bearer => (AUTHORIZATION.as_str().to_string(), format!("Bearer {}", key)),
            AuthStyle::ApiKeyHeader => (NEWS_API_KEY_HEADER.to_string(), key.to_string()),
            AuthStyle::Custom { header, value_prefix } => {
                (header.clone(), format!("{}{}", value_prefix, key))
            }
        }
    }
}

/// Credential applied to every request whose host ends with `host_suffix`.
#[derive(Debug, Clone)]
pub struct HostCredential {
    pub host_suffix: String,
    pub style: AuthStyle,
    pub key: Option<String>,
}

impl HostCredential {
    pub fn new(host_suffix: impl Into<String>, style: AuthStyle, key: Option<String>) -> Self {
        Self {
            host_suffix: host_suffix.into().to_ascii_lowercase(),
            style,
            key: key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        host == self.host_suffix || host.ends_with(&format!(".{}", self.host_suffix))
    }
}

#[derive(Debug, Clone)]
pub struct AuthStage {
    user_agent: String,
    credentials: Vec<HostCredential>,
}

impl Default for AuthStage {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl AuthStage {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            credentials: Vec::new(),
        }
    }

    pub fn with_credential(mut self, credential: HostCredential) -> Self {
        self.credentials.push(credential);
        self
    }

    /// Add standard headers and the matching host credential. Headers the
    /// caller already set are kept as-is.
    pub fn apply(&self, host: Option<&str>, headers: &mut HeaderMap) {
        insert_missing(headers, USER_AGENT.as_str(), &self.user_agent);
        insert_missing(headers, ACCEPT.as_str(), "application/json");

        let Some(host) = host else { return };
        let Some(rule) = self.credentials.iter().find(|c| c.matches(host)) else {
            return;
        };
        match &rule.key {
            Some(key) => {
                let (name, value) = rule.style.header_pair(key);
                insert_missing(headers, &name, &value);
                tracing::debug!(host, header = %name, "attached credential");
            }
            None => tracing::warn!(host, "no credential configured for host"),
        }
    }
}

fn insert_missing(headers: &mut HeaderMap, name: &str, value: &str) {
    let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
        tracing::warn!(header = name, "skipping invalid header name");
        return;
    };
    if headers.contains_key(&name) {
        return;
    }
    match HeaderValue::from_str(value) {
        Ok(mut value) => {
            if name == AUTHORIZATION || name.as_str().eq_ignore_ascii_case(NEWS_API_KEY_HEADER) {
                value.set_sensitive(true);
            }
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = %name, "skipping header with invalid value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage() -> AuthStage {
        AuthStage::new("NexusNews/test")
            .with_credential(HostCredential::new(
                "newsapi.org",
                AuthStyle::ApiKeyHeader,
                Some("news-key".into()),
            ))
            .with_credential(HostCredential::new(
                "openrouter.ai",
                AuthStyle::Bearer,
                Some("ai-key".into()),
            ))
    }

    #[test]
    fn news_host_gets_api_key_header() {
        let mut headers = HeaderMap::new();
        stage().apply(Some("newsapi.org"), &mut headers);
        assert_eq!(headers.get("x-api-key").unwrap(), "news-key");
        assert_eq!(headers.get(USER_AGENT).unwrap(), "NexusNews/test");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn subdomains_match_bearer_rule() {
        let mut headers = HeaderMap::new();
        stage().apply(Some("api.OpenRouter.ai"), &mut headers);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer ai-key");
    }

    #[test]
    fn lookalike_hosts_do_not_match() {
        let mut headers = HeaderMap::new();
        stage().apply(Some("evilnewsapi.org"), &mut headers);
        assert!(headers.get("x-api-key").is_none());
    }

    #[test]
    fn caller_headers_win() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer explicit"));
        stage().apply(Some("openrouter.ai"), &mut headers);
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer explicit");
    }

    #[test]
    fn blank_key_adds_nothing() {
        let stage = AuthStage::default().with_credential(HostCredential::new(
            "newsapi.org",
            AuthStyle::ApiKeyHeader,
            Some("   ".into()),
        ));
        let mut headers = HeaderMap::new();
        stage.apply(Some("newsapi.org"), &mut headers);
        assert!(headers.get("x-api-key").is_none());
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn custom_style_uses_prefix() {
        let stage = AuthStage::default().with_credential(HostCredential::new(
            "example.com",
            AuthStyle::Custom {
                header: "X-Token".into(),
                value_prefix: "Token ".into(),
            },
            Some("abc".into()),
        ));
        let mut headers = HeaderMap::new();
        stage.apply(Some("example.com"), &mut headers);
        assert_eq!(headers.get("x-token").unwrap(), "Token abc");
    }
}
