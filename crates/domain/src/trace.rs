use serde::Serialize;

/// Structured trace events emitted across all SeoX crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    KeyIssued {
        key_prefix: String,
        plan: String,
        owner: Option<u64>,
    },
    KeyReissued {
        old_key_prefix: String,
        new_key_prefix: String,
        old_plan: String,
        new_plan: String,
    },
    ReissueBlocked {
        key_prefix: String,
        used: u64,
        limit: i64,
    },
    AccountDisabled {
        key_prefix: String,
        owner: Option<u64>,
    },
    GateRejected {
        key_prefix: String,
        reason: String,
        used: u64,
        limit: i64,
    },
    CompletionRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        ok: bool,
    },
    UserRegistered {
        user_id: u64,
    },
    PaymentRecorded {
        payment_id: u64,
        user_id: u64,
        amount: i64,
        status: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "sx_event");
    }
}

/// Shorten an API key for logs: the first 8 characters followed by `…`.
///
/// Keys are never logged in full.
pub fn key_prefix(key: &str) -> String {
    let head: String = key.chars().take(8).collect();
    format!("{head}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_prefix_truncates() {
        assert_eq!(key_prefix("sk-0123456789abcdef"), "sk-01234…");
    }

    #[test]
    fn key_prefix_short_key() {
        assert_eq!(key_prefix("abc"), "abc…");
    }

    #[test]
    fn trace_event_serializes_with_tag() {
        let ev = TraceEvent::UserRegistered { user_id: 7 };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "UserRegistered");
        assert_eq!(json["user_id"], 7);
    }
}
