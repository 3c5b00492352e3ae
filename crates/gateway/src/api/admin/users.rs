//! Account administration: user listing, disable, stats.

use std::collections::HashMap;

use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sx_accounts::Account;

use crate::api::error::ApiError;
use crate::state::AppState;

use super::guard::AdminGuard;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /admin/users
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct AdminUserView {
    pub id: u64,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub api_key: Option<String>,
    pub plan: Option<String>,
    /// `"used/limit"`, with `-1` for unlimited plans.
    pub usage: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub disabled: bool,
}

pub async fn list_users(
    _guard: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUserView>>, ApiError> {
    let by_owner: HashMap<u64, Account> = state
        .registry
        .list()?
        .into_iter()
        .filter_map(|a| a.owner.map(|o| (o, a)))
        .collect();

    let views = state
        .users
        .list()
        .into_iter()
        .map(|u| {
            let account = by_owner.get(&u.id);
            AdminUserView {
                id: u.id,
                email: u.email,
                created_at: u.created_at,
                api_key: account.map(|a| a.key.clone()),
                plan: account.map(|a| a.plan.clone()),
                usage: account.map(|a| format!("{}/{}", a.used, a.limit.as_i64())),
                expires_at: account.and_then(|a| a.expires_at),
                disabled: account.is_some_and(|a| a.disabled),
            }
        })
        .collect();

    Ok(Json(views))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /admin/disable-user
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct DisableUserRequest {
    pub user_id: u64,
}

pub async fn disable_user(
    _guard: AdminGuard,
    State(state): State<AppState>,
    Json(body): Json<DisableUserRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if state.users.get(body.user_id).is_none() {
        return Err(ApiError::NotFound(format!("user {} not found", body.user_id)));
    }
    let disabled = state.registry.disable_owner(body.user_id)?;
    tracing::info!(
        user_id = body.user_id,
        had_key = disabled.is_some(),
        "user disabled by admin"
    );
    Ok(Json(serde_json::json!({
        "ok": true,
        "user_id": body.user_id,
        "key_disabled": disabled.is_some(),
    })))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /admin/stats
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Serialize)]
pub struct Stats {
    pub total_users: usize,
    pub total_keys: usize,
    pub active_keys: usize,
    pub disabled_users: usize,
    pub total_requests: u64,
    pub payments: usize,
}

pub async fn stats(
    _guard: AdminGuard,
    State(state): State<AppState>,
) -> Result<Json<Stats>, ApiError> {
    let now = Utc::now();
    let accounts = state.registry.list()?;

    Ok(Json(Stats {
        total_users: state.users.len(),
        total_keys: accounts.len(),
        active_keys: accounts.iter().filter(|a| !a.is_closed(now)).count(),
        disabled_users: accounts
            .iter()
            .filter(|a| a.disabled && a.owner.is_some())
            .count(),
        total_requests: accounts.iter().map(|a| a.used).sum(),
        payments: state.payments.len(),
    }))
}
