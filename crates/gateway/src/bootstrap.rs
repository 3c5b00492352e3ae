//! AppState construction extracted from `main.rs`.
//!
//! `serve` and the `issue-key` one-shot share the store wiring here so both
//! see the same accounts.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use sx_accounts::{
    AccountStore, FileAccountStore, KeyRegistry, MemoryAccountStore, PaymentLedger, QuotaGate,
    TokenIssuer, UsageMeter, UserDirectory,
};
use sx_domain::config::{Config, ConfigSeverity, StorageBackend};
use sx_providers::{create_provider, CompletionProvider};

use crate::state::AppState;

/// Log every config issue and fail if any of them is an error.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Open the account store selected by `[storage]`.
pub fn open_account_store(config: &Config) -> anyhow::Result<Arc<dyn AccountStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("storage backend is 'memory'; accounts are lost on restart");
            Ok(Arc::new(MemoryAccountStore::new()))
        }
        StorageBackend::File => {
            let store = FileAccountStore::open(&config.storage.path).with_context(|| {
                format!("opening account store in {}", config.storage.path.display())
            })?;
            Ok(Arc::new(store))
        }
    }
}

pub fn build_registry(config: &Config) -> anyhow::Result<Arc<KeyRegistry>> {
    let store = open_account_store(config)?;
    let registry = KeyRegistry::from_config(store, &config.plans, &config.accounts)
        .context("initializing key registry")?;
    tracing::info!(
        plans = registry.plans().len(),
        reissue_policy = ?registry.reissue_policy(),
        "key registry ready"
    );
    Ok(Arc::new(registry))
}

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    validate_config(&config)?;
    let llm = create_provider(&config.llm, false).context("initializing completion provider")?;
    build_app_state_with_provider(config, llm)
}

/// Same as [`build_app_state`] with an explicit completion provider and no
/// config validation.
pub fn build_app_state_with_provider(
    config: Arc<Config>,
    llm: Arc<dyn CompletionProvider>,
) -> anyhow::Result<AppState> {
    // ── Accounts ─────────────────────────────────────────────────────
    let registry = build_registry(&config)?;
    let gate = QuotaGate::from_config(&config.accounts);
    if let Some(interval) = gate.min_interval() {
        tracing::info!(
            min_interval_ms = interval.num_milliseconds(),
            "per-key minimum request interval enabled"
        );
    }
    let meter = Arc::new(UsageMeter::new(registry.clone(), gate));

    // ── Users & payments ─────────────────────────────────────────────
    let min_password_len = config.auth.min_password_len;
    let (users, payments) = match config.storage.backend {
        StorageBackend::Memory => (
            UserDirectory::in_memory(min_password_len),
            PaymentLedger::in_memory(),
        ),
        StorageBackend::File => (
            UserDirectory::open(&config.storage.path, min_password_len)
                .context("opening user directory")?,
            PaymentLedger::open(&config.storage.path).context("opening payment ledger")?,
        ),
    };
    let tokens = TokenIssuer::from_config(&config.auth);

    // ── Admin & webhook secrets ──────────────────────────────────────
    let admin_token_hash = read_env_secret(&config.admin.token_env)
        .map(|t| Sha256::digest(t.as_bytes()).to_vec());
    if admin_token_hash.is_none() {
        tracing::warn!(
            env_var = %config.admin.token_env,
            "admin token not set; /admin endpoints are disabled"
        );
    }

    let webhook_secret = config
        .payments
        .webhook_secret_env
        .as_deref()
        .and_then(read_env_secret)
        .map(|s| Arc::new(s.into_bytes()));
    if webhook_secret.is_none() {
        tracing::warn!("payment webhook signature verification disabled");
    }

    Ok(AppState {
        config,
        llm,
        registry,
        meter,
        users: Arc::new(users),
        tokens: Arc::new(tokens),
        payments: Arc::new(payments),
        admin_token_hash,
        webhook_secret,
    })
}

fn read_env_secret(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
