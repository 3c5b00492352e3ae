use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Completion provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Placeholder replaced with the product title in `prompt_template`.
pub const TITLE_PLACEHOLDER: &str = "{title}";
/// Placeholder replaced with the keyword list in `prompt_template`.
pub const KEYWORDS_PLACEHOLDER: &str = "{keywords}";

/// Settings for the upstream completion provider.
///
/// Model identity, temperature and token budget live here rather than in the
/// quota core: the gateway only ever asks for `complete(prompt, max_tokens)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Identifier used in logs and error messages.
    #[serde(default = "d_provider_id")]
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default = "d_300")]
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    #[serde(default = "d_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub auth: ProviderAuthConfig,
    /// Prompt sent upstream. `{title}` and `{keywords}` are substituted.
    #[serde(default = "d_prompt_template")]
    pub prompt_template: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            id: d_provider_id(),
            kind: ProviderKind::default(),
            base_url: d_base_url(),
            model: d_model(),
            max_tokens: 300,
            temperature: d_temperature(),
            timeout_ms: 60_000,
            auth: ProviderAuthConfig::default(),
            prompt_template: d_prompt_template(),
        }
    }
}

impl LlmConfig {
    /// Render the configured prompt for a product.
    pub fn render_prompt(&self, title: &str, keywords: &str) -> String {
        self.prompt_template
            .replace(TITLE_PLACEHOLDER, title)
            .replace(KEYWORDS_PLACEHOLDER, keywords)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// OpenAI, Ollama, vLLM, LM Studio, Together and friends.
    #[default]
    OpenaiCompat,
    /// Azure OpenAI: same wire format, deployment-based URLs, `api-key` header.
    AzureOpenai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderAuthConfig {
    /// Header name (e.g. "Authorization", "api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for ProviderAuthConfig {
    fn default() -> Self {
        Self {
            header: None,
            prefix: None,
            env: d_key_env(),
            key: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_provider_id() -> String {
    "openai".into()
}
fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_model() -> String {
    "gpt-4o-mini".into()
}
fn d_300() -> u32 {
    300
}
fn d_temperature() -> Option<f32> {
    Some(0.7)
}
fn d_60000() -> u64 {
    60_000
}
fn d_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".into())
}
fn d_prompt_template() -> String {
    "Product name: {title}\n\
     Keywords: {keywords}\n\n\
     Write an original, SEO-friendly, sales-oriented product description."
        .into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_openai() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.kind, ProviderKind::OpenaiCompat);
        assert_eq!(cfg.model, "gpt-4o-mini");
        assert_eq!(cfg.max_tokens, 300);
        assert_eq!(cfg.auth.env.as_deref(), Some("OPENAI_API_KEY"));
    }

    #[test]
    fn render_prompt_substitutes_both_fields() {
        let cfg = LlmConfig {
            prompt_template: "T={title} K={keywords}".into(),
            ..LlmConfig::default()
        };
        assert_eq!(cfg.render_prompt("Mug", "coffee, ceramic"), "T=Mug K=coffee, ceramic");
    }

    #[test]
    fn default_prompt_mentions_title_and_keywords() {
        let prompt = LlmConfig::default().render_prompt("Desk Lamp", "led, dimmable");
        assert!(prompt.contains("Product name: Desk Lamp"));
        assert!(prompt.contains("Keywords: led, dimmable"));
    }

    #[test]
    fn azure_kind_parses() {
        let cfg: LlmConfig = toml::from_str(
            r#"
            kind = "azure_openai"
            base_url = "https://example.openai.azure.com"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.kind, ProviderKind::AzureOpenai);
        assert_eq!(cfg.timeout_ms, 60_000);
    }
}
