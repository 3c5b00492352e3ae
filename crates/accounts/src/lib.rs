//! Accounts, API keys and quota enforcement.
//!
//! - [`KeyRegistry`] owns key → account state over an injected [`AccountStore`].
//! - [`QuotaGate`] decides whether a request on an account may proceed.
//! - [`UsageMeter`] serializes lookup + admission + work + usage recording per key.
//! - [`UserDirectory`], [`TokenIssuer`] and [`PaymentLedger`] back the
//!   registration, login and billing endpoints.

pub mod account;
pub mod error;
pub mod file_store;
pub mod gate;
pub mod key_lock;
pub mod meter;
pub mod payments;
pub(crate) mod persist;
pub mod plan;
pub mod registry;
pub mod store;
pub mod tokens;
pub mod users;

pub use account::Account;
pub use error::{AccountError, Result};
pub use file_store::FileAccountStore;
pub use gate::{Permit, QuotaGate, Rejection};
pub use key_lock::KeyLockMap;
pub use meter::{MeterError, UsageMeter};
pub use payments::{Payment, PaymentLedger};
pub use plan::{Plan, PlanTable};
pub use registry::KeyRegistry;
pub use store::{AccountStore, MemoryAccountStore};
pub use tokens::{Claims, TokenIssuer};
pub use users::{User, UserDirectory};
