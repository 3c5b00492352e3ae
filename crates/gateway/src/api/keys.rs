//! `POST /create-api-key`: issue a key for the logged-in user, or reissue
//! their existing one on a new plan.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sx_accounts::{Account, AccountError};
use sx_domain::config::Limit;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    /// Login token; `Authorization: Bearer` is accepted as well.
    #[serde(default)]
    pub token: Option<String>,
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub api_key: String,
    pub plan: String,
    pub limit: Limit,
    pub used: u64,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<Account> for KeyResponse {
    fn from(a: Account) -> Self {
        Self {
            api_key: a.key,
            plan: a.plan,
            limit: a.limit,
            used: a.used,
            expires_at: a.expires_at,
        }
    }
}

pub async fn create_api_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateKeyRequest>,
) -> Result<Json<KeyResponse>, ApiError> {
    let token = body
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| ApiError::Unauthorized("missing login token".into()))?;

    let claims = state.tokens.verify(token)?;
    let user = state
        .users
        .get(claims.sub)
        .ok_or_else(|| ApiError::Unauthorized("unknown user".into()))?;

    let account = match state.registry.find_by_owner(user.id)? {
        Some(existing) => state.meter.reissue(&existing.key, &body.plan).await?,
        None => match state.registry.issue_for(user.id, &body.plan) {
            Ok(account) => account,
            // A concurrent first request from the same user got there first.
            Err(AccountError::DuplicateAccount(_)) => {
                reissue_owned(&state, user.id, &body.plan).await?
            }
            Err(e) => return Err(e.into()),
        },
    };

    Ok(Json(account.into()))
}

async fn reissue_owned(state: &AppState, owner: u64, plan: &str) -> Result<Account, ApiError> {
    let existing = state
        .registry
        .find_by_owner(owner)?
        .ok_or(AccountError::NotFound)?;
    Ok(state.meter.reissue(&existing.key, plan).await?)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
