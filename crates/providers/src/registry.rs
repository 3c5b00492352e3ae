//! Provider construction.
//!
//! Reads the [`LlmConfig`], resolves authentication and instantiates the
//! adapter for the configured `kind`.  A provider that cannot be built (most
//! often: `OPENAI_API_KEY` unset) is replaced by [`UnavailableProvider`] so
//! the rest of the service still boots; completion calls then fail with the
//! original initialization error.

use std::sync::Arc;

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::{Completion, CompletionProvider};
use sx_domain::config::{LlmConfig, ProviderKind};
use sx_domain::error::{Error, Result};

/// Build the completion provider described by `config`.
///
/// With `require` set (or `SEOX_REQUIRE_LLM=1`), an initialization failure is
/// returned instead of degrading to [`UnavailableProvider`].
pub fn create_provider(config: &LlmConfig, require: bool) -> Result<Arc<dyn CompletionProvider>> {
    let result = match config.kind {
        ProviderKind::OpenaiCompat | ProviderKind::AzureOpenai => {
            OpenAiCompatProvider::from_config(config)
                .map(|p| Arc::new(p) as Arc<dyn CompletionProvider>)
        }
    };

    match result {
        Ok(provider) => {
            tracing::info!(
                provider_id = %config.id,
                kind = ?config.kind,
                model = %config.model,
                "registered completion provider"
            );
            Ok(provider)
        }
        Err(e) => {
            let require = require
                || std::env::var("SEOX_REQUIRE_LLM")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                    .unwrap_or(false);
            if require {
                return Err(e);
            }
            tracing::warn!(
                provider_id = %config.id,
                kind = ?config.kind,
                error = %e,
                "completion provider unavailable; generation requests will fail \
                 until auth is configured"
            );
            Ok(Arc::new(UnavailableProvider {
                id: config.id.clone(),
                model: config.model.clone(),
                reason: e.to_string(),
            }))
        }
    }
}

/// Stand-in used when the configured provider failed to initialize.
pub struct UnavailableProvider {
    id: String,
    model: String,
    reason: String,
}

#[async_trait::async_trait]
impl CompletionProvider for UnavailableProvider {
    async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<Completion> {
        Err(Error::Provider {
            provider: self.id.clone(),
            message: format!("provider not initialized: {}", self.reason),
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> &str {
        &self.model
    }
}
