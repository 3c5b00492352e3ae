//! OpenAI-compatible adapter.
//!
//! Works with OpenAI, Azure OpenAI, Ollama, vLLM, LM Studio, Together,
//! and any other endpoint that follows the OpenAI chat completions contract.

use crate::traits::{Completion, CompletionProvider, Usage};
use crate::util::{from_reqwest, resolve_api_key};
use serde_json::Value;
use sx_domain::config::{LlmConfig, ProviderKind};
use sx_domain::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A completion adapter for any OpenAI-compatible API endpoint.
///
/// Also handles Azure OpenAI, which uses the same wire format but with a
/// different URL pattern (`/openai/deployments/{model}/chat/completions`)
/// and auth header (`api-key` instead of `Authorization: Bearer`).
pub struct OpenAiCompatProvider {
    id: String,
    base_url: String,
    api_key: String,
    auth_header: String,
    auth_prefix: String,
    model: String,
    temperature: Option<f32>,
    client: reqwest::Client,
    /// When true, uses Azure OpenAI URL pattern and omits `model` from body.
    is_azure: bool,
}

impl OpenAiCompatProvider {
    /// Create a new provider from the `[llm]` config section.
    ///
    /// The API key is resolved eagerly (env var read at this point).
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        Self::with_api_key(cfg, api_key)
    }

    /// Same as [`from_config`](Self::from_config) with an explicit key.
    pub fn with_api_key(cfg: &LlmConfig, api_key: String) -> Result<Self> {
        let is_azure = cfg.kind == ProviderKind::AzureOpenai;

        // Azure uses `api-key` header with no prefix; standard OpenAI uses
        // `Authorization: Bearer <key>`.
        let auth_header = cfg.auth.header.clone().unwrap_or_else(|| {
            if is_azure {
                "api-key".into()
            } else {
                "Authorization".into()
            }
        });
        let auth_prefix = cfg.auth.prefix.clone().unwrap_or_else(|| {
            if is_azure {
                String::new()
            } else {
                "Bearer ".into()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            auth_header,
            auth_prefix,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            client,
            is_azure,
        })
    }

    // ── Internal: build authenticated request builder ──────────────

    fn authed_post(&self, url: &str) -> reqwest::RequestBuilder {
        let header_value = format!("{}{}", self.auth_prefix, self.api_key);
        self.client
            .post(url)
            .header(&self.auth_header, &header_value)
            .header("Content-Type", "application/json")
    }

    /// Build the chat completions URL for the configured flavour.
    ///
    /// Azure: `{base_url}/openai/deployments/{model}/chat/completions?api-version=2024-10-21`
    fn chat_url(&self) -> String {
        if self.is_azure {
            format!(
                "{}/openai/deployments/{}/chat/completions?api-version=2024-10-21",
                self.base_url, self.model
            )
        } else {
            format!("{}/chat/completions", self.base_url)
        }
    }

    fn build_body(&self, prompt: &str, max_tokens: u32) -> Value {
        let mut body = serde_json::json!({
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": max_tokens,
        });

        // Azure embeds the model (deployment) name in the URL, so we omit it
        // from the request body. Standard OpenAI requires it in the body.
        if !self.is_azure {
            body["model"] = Value::String(self.model.clone());
        }
        if let Some(temp) = self.temperature {
            body["temperature"] = serde_json::json!(temp);
        }
        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_completion(provider: &str, body: &Value) -> Result<Completion> {
    let choice = body
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no choices in response".into(),
        })?;

    let message = choice.get("message").ok_or_else(|| Error::Provider {
        provider: provider.into(),
        message: "no message in choice".into(),
    })?;

    let text = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();

    if text.is_empty() {
        return Err(Error::Provider {
            provider: provider.into(),
            message: "empty completion".into(),
        });
    }

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    let usage = body.get("usage").and_then(parse_usage);

    Ok(Completion {
        text,
        model,
        usage,
        finish_reason,
    })
}

fn parse_usage(v: &Value) -> Option<Usage> {
    Some(Usage {
        prompt_tokens: v.get("prompt_tokens")?.as_u64()? as u32,
        completion_tokens: v.get("completion_tokens")?.as_u64()? as u32,
        total_tokens: v.get("total_tokens")?.as_u64()? as u32,
    })
}

/// Pull the human-readable message out of an OpenAI-style error body,
/// falling back to the raw text.
fn upstream_error_message(status: u16, text: &str) -> String {
    let detail = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| text.to_string());
    format!("HTTP {status} - {detail}")
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl CompletionProvider for OpenAiCompatProvider {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let url = self.chat_url();
        let body = self.build_body(prompt, max_tokens);

        tracing::debug!(provider = %self.id, url = %url, max_tokens, "openai_compat completion request");

        let resp = self
            .authed_post(&url)
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: upstream_error_message(status.as_u16(), &resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        parse_completion(&self.id, &resp_json)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(kind: ProviderKind) -> OpenAiCompatProvider {
        let cfg = LlmConfig {
            kind,
            base_url: "https://example.test/v1/".into(),
            ..LlmConfig::default()
        };
        OpenAiCompatProvider::with_api_key(&cfg, "sk-test".into()).unwrap()
    }

    #[test]
    fn body_carries_model_prompt_and_budget() {
        let p = provider(ProviderKind::OpenaiCompat);
        let body = p.build_body("hello", 250);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 250);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body.get("temperature").is_some());
    }

    #[test]
    fn azure_omits_model_and_uses_deployment_url() {
        let p = provider(ProviderKind::AzureOpenai);
        assert!(p.build_body("hi", 10).get("model").is_none());
        assert_eq!(
            p.chat_url(),
            "https://example.test/v1/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-10-21"
        );
        assert_eq!(p.auth_header, "api-key");
        assert_eq!(p.auth_prefix, "");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let p = provider(ProviderKind::OpenaiCompat);
        assert_eq!(p.chat_url(), "https://example.test/v1/chat/completions");
    }

    #[test]
    fn parse_completion_reads_first_choice() {
        let body = serde_json::json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "message": { "role": "assistant", "content": "  A great mug.  " },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17 }
        });
        let c = parse_completion("openai", &body).unwrap();
        assert_eq!(c.text, "A great mug.");
        assert_eq!(c.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(c.finish_reason.as_deref(), Some("stop"));
        assert_eq!(c.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn parse_completion_rejects_empty_choices() {
        let body = serde_json::json!({ "choices": [] });
        let err = parse_completion("openai", &body).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn parse_completion_rejects_blank_content() {
        let body = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": null } }]
        });
        assert!(parse_completion("openai", &body).is_err());
    }

    #[test]
    fn upstream_error_prefers_structured_message() {
        let msg = upstream_error_message(
            429,
            r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#,
        );
        assert_eq!(msg, "HTTP 429 - Rate limit reached");
        assert_eq!(upstream_error_message(500, "boom"), "HTTP 500 - boom");
    }
}
