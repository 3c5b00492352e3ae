//! Admin endpoints.
//!
//! All handlers use the `AdminGuard` extractor (see `guard.rs`).  If the
//! admin token env var is unset, they answer 403.

mod guard;
mod users;

pub use guard::{AdminGuard, ADMIN_TOKEN_HEADER};
pub use users::{disable_user, list_users, stats, AdminUserView, Stats};
