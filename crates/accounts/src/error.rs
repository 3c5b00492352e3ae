use sx_domain::config::Limit;

/// Everything that can go wrong between an inbound request and the quota
/// bookkeeping.  Each variant maps to exactly one HTTP status at the gateway.
#[derive(thiserror::Error, Debug)]
pub enum AccountError {
    #[error("unknown plan \"{0}\"")]
    InvalidPlan(String),

    #[error("an account for {0} already exists")]
    DuplicateAccount(String),

    #[error("generated API key collides with an existing key")]
    DuplicateKey,

    #[error("{0}")]
    InvalidInput(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("unknown API key")]
    NotFound,

    #[error("account is closed")]
    AccountClosed,

    #[error("quota exhausted ({used}/{limit})")]
    QuotaExceeded { used: u64, limit: Limit },

    #[error("too many requests; retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("current key still has quota left ({used}/{limit}); a new key can be created once it is used up")]
    QuotaRemaining { used: u64, limit: Limit },

    #[error("storage: {0}")]
    Storage(String),
}

impl From<sx_domain::error::Error> for AccountError {
    fn from(e: sx_domain::error::Error) -> Self {
        AccountError::Storage(e.to_string())
    }
}

impl From<std::io::Error> for AccountError {
    fn from(e: std::io::Error) -> Self {
        AccountError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AccountError {
    fn from(e: serde_json::Error) -> Self {
        AccountError::Storage(format!("JSON: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, AccountError>;
