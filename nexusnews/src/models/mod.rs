pub mod static_models;

use serde::{Deserialize, Serialize};

/// Immutable catalog entry for a chat-completion model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub max_context_tokens: u32,
    pub recommended: bool,
}

impl ModelDescriptor {
    /// Descriptor for an id outside the built-in catalog.
    pub fn custom(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            max_context_tokens: 0,
            recommended: false,
        }
    }

    /// Catalog entry for `id`, or a bare descriptor if unknown.
    pub fn resolve(id: &str) -> Self {
        static_models::find_model(id).unwrap_or_else(|| Self::custom(id))
    }
}

pub const DEFAULT_FALLBACK_DEPTH: usize = 1;

/// Primary model plus ordered alternates.
///
/// `fallback_depth` bounds how many alternates one logical call may try
/// after the primary fails. The default of 1 is a single-level fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelPreference {
    pub primary: String,
    pub fallbacks: Vec<String>,
    pub fallback_depth: usize,
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self {
            primary: static_models::LLAMA_3_3_70B.to_string(),
            fallbacks: static_models::default_fallback_ids(),
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
        }
    }
}

impl ModelPreference {
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
            fallback_depth: DEFAULT_FALLBACK_DEPTH,
        }
    }

    pub fn with_fallback_depth(mut self, depth: usize) -> Self {
        self.fallback_depth = depth;
        self
    }

    /// Models to try for one call, in order. The primary comes first, blank
    /// and repeated ids are dropped, and at most `fallback_depth` alternates
    /// follow.
    pub fn ordered(&self) -> Vec<ModelDescriptor> {
        let mut seen: Vec<&str> = Vec::new();
        let primary = self.primary.trim();
        if !primary.is_empty() {
            seen.push(primary);
        }
        let mut alternates = 0;
        for id in self.fallbacks.iter().map(|f| f.trim()) {
            if alternates == self.fallback_depth {
                break;
            }
            if id.is_empty() || seen.contains(&id) {
                continue;
            }
            seen.push(id);
            alternates += 1;
        }
        seen.into_iter().map(ModelDescriptor::resolve).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::static_models::*;
    use super::*;

    #[test]
    fn default_is_primary_plus_one() {
        let ids: Vec<String> = ModelPreference::default()
            .ordered()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec![LLAMA_3_3_70B, GEMMA_2_27B]);
    }

    #[test]
    fn primary_is_not_repeated_in_fallbacks() {
        let pref = ModelPreference::new(
            GEMMA_2_27B,
            vec![GEMMA_2_27B.into(), MISTRAL_SMALL.into(), GEMMA_2_9B.into()],
        )
        .with_fallback_depth(10);
        let ids: Vec<String> = pref.ordered().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![GEMMA_2_27B, MISTRAL_SMALL, GEMMA_2_9B]);
    }

    #[test]
    fn depth_zero_means_primary_only() {
        let pref = ModelPreference::default().with_fallback_depth(0);
        assert_eq!(pref.ordered().len(), 1);
    }

    #[test]
    fn unknown_ids_resolve_to_bare_descriptors() {
        let pref = ModelPreference::new("acme/model", vec![]);
        let models = pref.ordered();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].display_name, "acme/model");
        assert_eq!(models[0].max_context_tokens, 0);
    }

    #[test]
    fn catalog_shape() {
        let models = free_models();
        assert_eq!(models.len(), 6);
        assert_eq!(models[0], default_model());
        assert_eq!(recommended_models().len(), 3);
        assert!(find_model(QWEN_3_235B).is_some());
        assert!(find_model("nope").is_none());
    }
}
