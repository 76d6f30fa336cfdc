use super::ModelDescriptor;

pub const LLAMA_3_3_70B: &str = "meta-llama/llama-3.3-70b-instruct:free";
pub const GEMMA_2_27B: &str = "google/gemma-2-27b-it:free";
pub const MISTRAL_SMALL: &str = "mistralai/mistral-small-3.1-24b-instruct:free";
pub const GEMMA_2_9B: &str = "google/gemma-2-9b-it:free";
pub const LLAMA_3_1_8B: &str = "meta-llama/llama-3.1-8b-instruct:free";
pub const QWEN_3_235B: &str = "qwen/qwen3-235b-a22b:free";

fn free(id: &str, name: &str, description: &str, ctx: u32, recommended: bool) -> ModelDescriptor {
    ModelDescriptor {
        id: id.into(),
        display_name: name.into(),
        description: description.into(),
        max_context_tokens: ctx,
        recommended,
    }
}

/// Free OpenRouter models, in catalog order.
pub fn free_models() -> Vec<ModelDescriptor> {
    vec![
        default_model(),
        free(
            GEMMA_2_27B,
            "Gemma 2 27B",
            "Google's efficient model with strong reasoning",
            8_192,
            true,
        ),
        free(
            MISTRAL_SMALL,
            "Mistral Small 3.1",
            "Fast and efficient for quick tasks",
            32_768,
            true,
        ),
        free(GEMMA_2_9B, "Gemma 2 9B", "Lightweight and fast", 8_192, false),
        free(LLAMA_3_1_8B, "Llama 3.1 8B", "Compact and efficient", 128_000, false),
        free(QWEN_3_235B, "Qwen 3 235B", "Large context window", 32_768, false),
    ]
}

pub fn recommended_models() -> Vec<ModelDescriptor> {
    free_models().into_iter().filter(|m| m.recommended).collect()
}

pub fn find_model(id: &str) -> Option<ModelDescriptor> {
    free_models().into_iter().find(|m| m.id == id)
}

pub fn default_model() -> ModelDescriptor {
    free(
        LLAMA_3_3_70B,
        "Llama 3.3 70B",
        "Meta's multilingual model, strong at summarization",
        128_000,
        true,
    )
}

/// Fallback chain, each progressively smaller and faster.
pub fn default_fallback_ids() -> Vec<String> {
    [GEMMA_2_27B, MISTRAL_SMALL, GEMMA_2_9B, LLAMA_3_1_8B]
        .into_iter()
        .map(String::from)
        .collect()
}
