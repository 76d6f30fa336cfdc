pub mod ai;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod network;
pub mod news;
pub mod repository;
pub mod resource;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use ai::AiService;
pub use ai::client::{ChatCompletions, OpenRouterClient};
pub use ai::prompt::Capability;
pub use config::{ConfigManager, CredentialOverrides, Services, Settings};
pub use error::{Error, FailureKind, Result};
pub use http::{HttpPipeline, HttpPipelineBuilder};
pub use models::{ModelDescriptor, ModelPreference, static_models};
pub use network::{NetworkMonitor, NetworkType};
pub use news::NewsClient;
pub use repository::{ArticleAnalyzer, NewsRepository, NewsSource};
pub use resource::{ErrorReport, Resource, describe_error};
pub use store::{ArticleStore, MemoryStore, UsageTracker};
pub use types::*;
