use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sx_domain::config::Limit;

use crate::plan::Plan;

/// Prefix of every generated API key.
pub const KEY_PREFIX: &str = "sk-";

/// Random bytes per key (hex-encoded after the prefix).
const KEY_BYTES: usize = 16;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An API key and its quota state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub key: String,
    pub plan: String,
    pub limit: Limit,
    #[serde(default)]
    pub used: u64,
    /// Registered user this key belongs to, if any.
    #[serde(default)]
    pub owner: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub last_request_at: Option<DateTime<Utc>>,
}

impl Account {
    /// A fresh account on `plan` with a newly generated key.
    pub fn new(plan: &Plan, owner: Option<u64>, now: DateTime<Utc>) -> Self {
        Self {
            key: generate_key(),
            plan: plan.name.clone(),
            limit: plan.limit,
            used: 0,
            owner,
            created_at: now,
            expires_at: None,
            disabled: false,
            last_request_at: None,
        }
    }

    /// Disabled, or past its expiry.  Closed accounts never reopen.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        self.disabled || self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.limit.is_exhausted_by(self.used)
    }

    pub fn remaining(&self) -> Option<u64> {
        self.limit.remaining(self.used)
    }
}

/// Generate a cryptographically random API key: `sk-` + 32 hex chars.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{KEY_PREFIX}{}", hex::encode(bytes))
}
