//! Registration and login.

use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub user_id: u64,
    /// Present when `accounts.register_plan` issues a key on sign-up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// `POST /register`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let users = state.users.clone();
    // Argon2 hashing is CPU-bound.
    let user = tokio::task::spawn_blocking(move || users.register(&body.email, &body.password))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let issued = match &state.config.accounts.register_plan {
        Some(plan) => Some(state.registry.issue_for(user.id, plan)?),
        None => None,
    };

    tracing::info!(user_id = user.id, key_issued = issued.is_some(), "user registered");

    Ok(Json(RegisterResponse {
        ok: true,
        user_id: user.id,
        plan: issued.as_ref().map(|a| a.plan.clone()),
        api_key: issued.map(|a| a.key),
    }))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<LoginResponse>, ApiError> {
    let users = state.users.clone();
    let user =
        tokio::task::spawn_blocking(move || users.authenticate(&body.email, &body.password))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    let token = state.tokens.issue(&user)?;
    tracing::debug!(user_id = user.id, "login token issued");
    Ok(Json(LoginResponse {
        token,
        token_type: "bearer",
        expires_in: u64::from(state.config.auth.token_ttl_hours) * 3600,
    }))
}
