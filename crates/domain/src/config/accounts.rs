use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Accounts & quota policy
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Key issuance and admission policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// Whether an existing key may be replaced while it still has quota.
    #[serde(default)]
    pub reissue_policy: ReissuePolicy,
    /// Minimum spacing between two admitted requests on the same key.
    /// `None` disables the anti-burst check.
    #[serde(default)]
    pub min_interval_ms: Option<u64>,
    /// Lifetime of a freshly issued key.  `None` = keys never expire.
    #[serde(default)]
    pub key_ttl_days: Option<u32>,
    /// Plan issued automatically on registration.  `None` = users must call
    /// `/create-api-key` themselves.
    #[serde(default)]
    pub register_plan: Option<String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            reissue_policy: ReissuePolicy::default(),
            min_interval_ms: None,
            key_ttl_days: None,
            register_plan: None,
        }
    }
}

/// When a key may be replaced by a new one on a (possibly different) plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReissuePolicy {
    /// Reissue is always allowed.
    Anytime,
    /// Reissue only once the current key's finite quota is used up.
    /// Unlimited keys are never considered exhausted.
    #[default]
    WhenExhausted,
}
