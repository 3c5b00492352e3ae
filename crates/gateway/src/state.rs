use std::sync::Arc;

use sx_accounts::{KeyRegistry, PaymentLedger, TokenIssuer, UsageMeter, UserDirectory};
use sx_domain::config::Config;
use sx_providers::CompletionProvider;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, completion provider
/// - **Accounts**: key registry, usage meter, users, login tokens, payments
/// - **Security**: startup-computed secret digests
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<dyn CompletionProvider>,

    // ── Accounts ──────────────────────────────────────────────────────
    pub registry: Arc<KeyRegistry>,
    /// Serialized find → admit → complete → record path for `/generate-seo`.
    pub meter: Arc<UsageMeter>,
    pub users: Arc<UserDirectory>,
    pub tokens: Arc<TokenIssuer>,
    pub payments: Arc<PaymentLedger>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the admin token (read once at startup).
    /// `None` = admin endpoints disabled (403).
    pub admin_token_hash: Option<Vec<u8>>,
    /// HMAC key for `/payment-webhook`.  `None` = signatures not checked.
    pub webhook_secret: Option<Arc<Vec<u8>>>,
}
