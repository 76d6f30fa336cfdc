//! On-disk settings, credential resolution and wiring of the service graph.

use crate::ai::AiService;
use crate::ai::client::{DEFAULT_AI_BASE_URL, OpenRouterClient};
use crate::error::{Error, Result};
use crate::http::HttpPipeline;
use crate::http::auth::{AuthStage, AuthStyle, DEFAULT_USER_AGENT, HostCredential};
use crate::http::retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, RetryPolicy,
};
use crate::models::ModelPreference;
use crate::network::NetworkMonitor;
use crate::news::{DEFAULT_NEWS_BASE_URL, NewsClient};
use crate::repository::{ArticleAnalyzer, NewsRepository};
use crate::store::MemoryStore;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const GENERIC_KEY_ENV: &str = "NEXUSNEWS_API_KEY";

/// A remote service that needs its own API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    News,
    Ai,
}

impl Service {
    pub fn env_var(&self) -> &'static str {
        match self {
            Service::News => "NEWS_API_KEY",
            Service::Ai => "OPENROUTER_API_KEY",
        }
    }
}

macro_rules! endpoint_settings {
    ($name:ident, $base:expr) => {
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            pub base_url: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            pub api_key: Option<String>,
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    base_url: $base.to_string(),
                    api_key: None,
                }
            }
        }

        impl $name {
            /// Lower-cased host of `base_url`, used to scope the credential.
            pub fn host(&self) -> Result<String> {
                host_of(&self.base_url)
            }
        }
    };
}

endpoint_settings!(NewsSettings, DEFAULT_NEWS_BASE_URL);
endpoint_settings!(AiSettings, DEFAULT_AI_BASE_URL);

fn host_of(base_url: &str) -> Result<String> {
    let url = Url::parse(base_url)
        .map_err(|e| Error::Configuration(format!("invalid base URL {}: {}", base_url, e)))?;
    url.host_str()
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| Error::Configuration(format!("base URL {} has no host", base_url)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: DEFAULT_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.backoff_multiplier,
        )
    }
}

/// The config file structure. Every field has a default, so a partial file
/// (or none at all) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub news: NewsSettings,
    pub ai: AiSettings,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub retry: RetrySettings,
    pub models: ModelPreference,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            news: NewsSettings::default(),
            ai: AiSettings::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetrySettings::default(),
            models: ModelPreference::default(),
        }
    }
}

impl Settings {
    fn configured_key(&self, service: Service) -> Option<&str> {
        match service {
            Service::News => self.news.api_key.as_deref(),
            Service::Ai => self.ai.api_key.as_deref(),
        }
    }

    /// Key for `service`: override, then config file, then environment.
    pub fn credential(&self, service: Service, override_key: Option<&str>) -> Option<String> {
        resolve_credential(
            service,
            override_key,
            self.configured_key(service),
            |name| std::env::var(name).ok(),
        )
    }
}

/// Explicit keys, typically from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub news_api_key: Option<String>,
    pub ai_api_key: Option<String>,
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Resolution order:
/// 1. Explicit override
/// 2. Config file value
/// 3. Service environment variable
/// 4. Generic `NEXUSNEWS_API_KEY`
///
/// Blank values at any step are skipped.
pub fn resolve_credential(
    service: Service,
    override_key: Option<&str>,
    configured: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    non_blank(override_key)
        .or_else(|| non_blank(configured))
        .or_else(|| non_blank(env(service.env_var()).as_deref()))
        .or_else(|| non_blank(env(GENERIC_KEY_ENV).as_deref()))
}

/// Reads and writes the settings file with a sibling lock file and atomic
/// replace on save.
#[derive(Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.nexusnews/config.json`
    pub fn default_path() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(".nexusnews").join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("json.lock")
    }

    fn ensure_parent(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
            }
        }
        Ok(())
    }

    fn with_exclusive_lock<T>(&self, f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
        self.ensure_parent()?;
        let lock_file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.lock_path())?;

        lock_file.lock_exclusive()?;
        let out = f();
        let _ = lock_file.unlock();
        out
    }

    /// Missing file yields the defaults.
    pub fn load(&self) -> anyhow::Result<Settings> {
        self.with_exclusive_lock(|| self.load_unlocked())
    }

    pub fn save(&self, settings: &Settings) -> anyhow::Result<()> {
        self.with_exclusive_lock(|| self.save_unlocked(settings))
    }

    /// Load, apply `f`, save, all under one lock.
    pub fn update(&self, f: impl FnOnce(&mut Settings)) -> anyhow::Result<Settings> {
        self.with_exclusive_lock(|| {
            let mut settings = self.load_unlocked()?;
            f(&mut settings);
            self.save_unlocked(&settings)?;
            Ok(settings)
        })
    }

    fn load_unlocked(&self) -> anyhow::Result<Settings> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save_unlocked(&self, settings: &Settings) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(settings)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(&tmp_path, &self.path)?;
        tracing::debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Everything a front-end needs, built from one `Settings`.
pub struct Services {
    pub monitor: NetworkMonitor,
    pub pipeline: HttpPipeline,
    pub store: Arc<MemoryStore>,
    pub ai: Arc<AiService>,
    pub repository: NewsRepository,
    pub analyzer: ArticleAnalyzer,
}

impl Services {
    pub fn build(
        settings: &Settings,
        overrides: &CredentialOverrides,
        monitor: NetworkMonitor,
    ) -> Result<Self> {
        let news_key = settings.credential(Service::News, overrides.news_api_key.as_deref());
        let ai_key = settings.credential(Service::Ai, overrides.ai_api_key.as_deref());
        if news_key.is_none() {
            tracing::warn!(env = Service::News.env_var(), "no news API key configured");
        }

        let auth = AuthStage::new(settings.user_agent.clone())
            .with_credential(HostCredential::new(
                settings.news.host()?,
                AuthStyle::ApiKeyHeader,
                news_key,
            ))
            .with_credential(HostCredential::new(
                settings.ai.host()?,
                AuthStyle::Bearer,
                ai_key.clone(),
            ));

        let pipeline = HttpPipeline::builder()
            .auth(auth)
            .retry_policy(settings.retry.policy()?)
            .monitor(monitor.clone())
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        let store = Arc::new(MemoryStore::new());
        let news = NewsClient::new(pipeline.clone(), &settings.news.base_url);
        let chat = OpenRouterClient::new(pipeline.clone(), &settings.ai.base_url, ai_key);
        let ai = Arc::new(
            AiService::new(Arc::new(chat), settings.models.clone())
                .with_usage_tracker(store.clone()),
        );

        Ok(Self {
            monitor,
            repository: NewsRepository::new(Arc::new(news), store.clone()),
            analyzer: ArticleAnalyzer::new(ai.clone(), store.clone()),
            pipeline,
            store,
            ai,
        })
    }
}
