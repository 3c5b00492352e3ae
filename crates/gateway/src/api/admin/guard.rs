//! Admin auth guard: `AdminGuard` Axum extractor.
//!
//! Handlers opt in by adding `_guard: AdminGuard` to their parameter list.

use async_trait::async_trait;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Axum extractor that enforces the admin token.
///
/// The token comes from the `X-Admin-Token` header or the `token` query
/// parameter and is checked with SHA-256 + constant-time comparison.
///
/// If the admin token env var is not set, every admin request is refused
/// with 403.
pub struct AdminGuard;

#[async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected_hash) = &state.admin_token_hash else {
            return Err((
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "admin endpoints are disabled" })),
            ));
        };

        let from_header = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let provided = match from_header {
            Some(t) => t,
            None => Query::<TokenQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|q| q.0.token)
                .unwrap_or_default(),
        };

        // Hash to a fixed-length digest so the comparison leaks nothing
        // about the token length.
        let provided_hash = Sha256::digest(provided.as_bytes());

        if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
            tracing::warn!("admin request with invalid token");
            return Err((
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "invalid admin token" })),
            ));
        }
        Ok(AdminGuard)
    }
}
