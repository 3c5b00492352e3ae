//! HTTP error mapping.
//!
//! Every failure leaves the API as `{ "error": "<message>" }` with exactly one
//! status per error kind.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use sx_accounts::{AccountError, MeterError};

/// Build a standardized JSON error response: `{ "error": "<message>" }`.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Account(#[from] AccountError),

    /// The completion provider failed; the request was not charged.
    #[error("upstream provider error: {0}")]
    Upstream(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<MeterError<sx_domain::error::Error>> for ApiError {
    fn from(e: MeterError<sx_domain::error::Error>) -> Self {
        match e {
            MeterError::Account(e) => ApiError::Account(e),
            MeterError::Work(e) => ApiError::Upstream(e.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Account(e) => account_status(e),
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn account_status(e: &AccountError) -> StatusCode {
    match e {
        AccountError::InvalidPlan(_) | AccountError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        AccountError::DuplicateAccount(_) | AccountError::QuotaRemaining { .. } => {
            StatusCode::CONFLICT
        }
        AccountError::AuthFailed(_) | AccountError::NotFound => StatusCode::UNAUTHORIZED,
        AccountError::AccountClosed => StatusCode::FORBIDDEN,
        AccountError::QuotaExceeded { .. } | AccountError::RateLimited { .. } => {
            StatusCode::TOO_MANY_REQUESTS
        }
        AccountError::DuplicateKey | AccountError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Account(AccountError::Storage(detail)) | ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "request failed with internal error");
                "internal storage error".to_owned()
            }
            ApiError::Account(AccountError::NotFound) => "invalid API key".to_owned(),
            ApiError::Upstream(detail) => {
                tracing::warn!(error = %detail, "completion provider failed");
                self.to_string()
            }
            other => other.to_string(),
        };

        let mut response = api_error(status, message);
        if let ApiError::Account(AccountError::RateLimited { retry_after_ms }) = self {
            let secs = retry_after_ms.div_ceil(1000).max(1);
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sx_domain::config::Limit;

    #[test]
    fn account_errors_map_to_one_status_each() {
        let cases = [
            (AccountError::InvalidPlan("x".into()), StatusCode::BAD_REQUEST),
            (AccountError::DuplicateAccount("a@b.c".into()), StatusCode::CONFLICT),
            (AccountError::AuthFailed("bad".into()), StatusCode::UNAUTHORIZED),
            (AccountError::NotFound, StatusCode::UNAUTHORIZED),
            (AccountError::AccountClosed, StatusCode::FORBIDDEN),
            (
                AccountError::QuotaExceeded {
                    used: 10,
                    limit: Limit::Finite(10),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AccountError::QuotaRemaining {
                    used: 1,
                    limit: Limit::Finite(10),
                },
                StatusCode::CONFLICT,
            ),
            (AccountError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn provider_failure_is_bad_gateway() {
        let err: ApiError = MeterError::Work(sx_domain::error::Error::Provider {
            provider: "openai".into(),
            message: "HTTP 500 - boom".into(),
        })
        .into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let resp = ApiError::from(AccountError::RateLimited {
            retry_after_ms: 1500,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "2");
    }
}
