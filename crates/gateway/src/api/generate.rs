//! `POST /generate-seo`: the metered completion endpoint.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use sx_domain::config::Limit;
use sx_domain::trace::TraceEvent;

use crate::api::error::ApiError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub title: String,
    #[serde(default)]
    pub keywords: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeyQuery {
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub seo_description: String,
    pub used: u64,
    pub limit: Limit,
    pub plan: String,
}

pub async fn generate_seo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<KeyQuery>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or(query.api_key)
        .map(|k| k.trim().to_owned())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("missing API key".into()))?;

    let title = body.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".into()));
    }

    let prompt = state.config.llm.render_prompt(title, body.keywords.trim());
    let max_tokens = state.config.llm.max_tokens;
    let llm = state.llm.clone();

    let (completion, account) = state
        .meter
        .metered(&key, |_, _| async move {
            let started = Instant::now();
            let result = llm.complete(&prompt, max_tokens).await;
            TraceEvent::CompletionRequest {
                provider: llm.provider_id().to_owned(),
                model: llm.model().to_owned(),
                duration_ms: started.elapsed().as_millis() as u64,
                ok: result.is_ok(),
            }
            .emit();
            result
        })
        .await?;

    Ok(Json(GenerateResponse {
        seo_description: completion.text,
        used: account.used,
        limit: account.limit,
        plan: account.plan,
    }))
}
