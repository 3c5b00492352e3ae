pub mod admin;
pub mod error;
pub mod generate;
pub mod health;
pub mod keys;
pub mod payments;
pub mod users;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Admin routes authenticate through the `AdminGuard` extractor; key-metered
/// and token-authenticated routes check credentials inside the handler.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Users
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        // Keys & generation
        .route("/create-api-key", post(keys::create_api_key))
        .route("/generate-seo", post(generate::generate_seo))
        // Billing
        .route("/payment-webhook", post(payments::payment_webhook))
        // Admin
        .route("/admin/users", get(admin::list_users))
        .route("/admin/disable-user", post(admin::disable_user))
        .route("/admin/stats", get(admin::stats))
}
