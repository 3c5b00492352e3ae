//! Admission check run before every upstream generation call.

use chrono::{DateTime, Duration, Utc};
use sx_domain::config::{AccountsConfig, Limit};

use crate::account::Account;
use crate::error::AccountError;

/// Proof that an account passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    /// Requests left after this one is charged; `None` for unlimited plans.
    pub remaining_after: Option<u64>,
}

/// Why the gate turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AccountClosed,
    QuotaExceeded { used: u64, limit: Limit },
    RateLimited { retry_after: Duration },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::AccountClosed => "account_closed",
            Rejection::QuotaExceeded { .. } => "quota_exceeded",
            Rejection::RateLimited { .. } => "rate_limited",
        }
    }
}

impl From<Rejection> for AccountError {
    fn from(r: Rejection) -> Self {
        match r {
            Rejection::AccountClosed => AccountError::AccountClosed,
            Rejection::QuotaExceeded { used, limit } => AccountError::QuotaExceeded { used, limit },
            Rejection::RateLimited { retry_after } => AccountError::RateLimited {
                retry_after_ms: retry_after.num_milliseconds().max(1) as u64,
            },
        }
    }
}

/// Stateless admission policy.
#[derive(Debug, Clone, Default)]
pub struct QuotaGate {
    min_interval: Option<Duration>,
}

impl QuotaGate {
    pub fn new(min_interval: Option<Duration>) -> Self {
        Self { min_interval }
    }

    pub fn from_config(config: &AccountsConfig) -> Self {
        let min_interval = config
            .min_interval_ms
            .filter(|ms| *ms > 0)
            .map(|ms| Duration::milliseconds(ms as i64));
        Self::new(min_interval)
    }

    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval
    }

    /// Decide whether `account` may make a request at `now`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// closed → quota → minimum interval.
    pub fn admit(&self, account: &Account, now: DateTime<Utc>) -> Result<Permit, Rejection> {
        if account.is_closed(now) {
            return Err(Rejection::AccountClosed);
        }

        if account.limit.is_exhausted_by(account.used) {
            return Err(Rejection::QuotaExceeded {
                used: account.used,
                limit: account.limit,
            });
        }

        if let (Some(interval), Some(last)) = (self.min_interval, account.last_request_at) {
            let elapsed = now - last;
            if elapsed < interval {
                return Err(Rejection::RateLimited {
                    retry_after: interval - elapsed,
                });
            }
        }

        Ok(Permit {
            remaining_after: account
                .limit
                .remaining(account.used)
                .map(|r| r.saturating_sub(1)),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
