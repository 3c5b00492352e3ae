use sx_domain::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Token accounting reported by the provider, when available.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The generated text plus whatever metadata the provider returned.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Textual content of the first choice.
    pub text: String,
    /// The model that actually produced the response.
    pub model: String,
    pub usage: Option<Usage>,
    /// The reason the model stopped generating (e.g. "stop", "length").
    pub finish_reason: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The only thing the gateway needs from an LLM: turn a prompt into text.
///
/// Model identity, temperature and base URL are fixed when the adapter is
/// built; callers only choose the prompt and the output token budget.
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send a single-message completion request and wait for the full response.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// The model requested when the caller does not override it.
    fn model(&self) -> &str;
}
