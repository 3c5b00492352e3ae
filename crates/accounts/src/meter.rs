//! Metered execution: lookup, admission, work and usage recording as one
//! serialized unit per key.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use sx_domain::trace::{key_prefix, TraceEvent};

use crate::account::Account;
use crate::error::AccountError;
use crate::gate::{Permit, QuotaGate};
use crate::key_lock::KeyLockMap;
use crate::registry::KeyRegistry;

/// Tracked keys above which idle locks are pruned after a request.
const PRUNE_THRESHOLD: usize = 1024;

/// Failure of a metered call: either the account side refused (or failed to
/// record), or the work itself failed.  Work failures are never charged.
#[derive(thiserror::Error, Debug)]
pub enum MeterError<E> {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("{0}")]
    Work(E),
}

pub struct UsageMeter {
    registry: Arc<KeyRegistry>,
    gate: QuotaGate,
    locks: KeyLockMap,
}

impl UsageMeter {
    pub fn new(registry: Arc<KeyRegistry>, gate: QuotaGate) -> Self {
        Self {
            registry,
            gate,
            locks: KeyLockMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<KeyRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &QuotaGate {
        &self.gate
    }

    /// Run `work` on behalf of `key` if the gate admits it, charging one
    /// request only when `work` succeeds.
    ///
    /// The per-key lock is held from lookup until usage is recorded, so two
    /// concurrent calls on one key can never both pass the quota check on
    /// the same `used` value.
    pub async fn metered<F, Fut, T, E>(
        &self,
        key: &str,
        work: F,
    ) -> Result<(T, Account), MeterError<E>>
    where
        F: FnOnce(Account, Permit) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit_guard = self.locks.acquire(key).await?;
        let result = self.metered_locked(key, work).await;
        drop(permit_guard);

        // On every exit path, rejected and unknown keys included.
        if self.locks.len() > PRUNE_THRESHOLD {
            self.locks.prune_idle();
        }

        result
    }

    async fn metered_locked<F, Fut, T, E>(
        &self,
        key: &str,
        work: F,
    ) -> Result<(T, Account), MeterError<E>>
    where
        F: FnOnce(Account, Permit) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let account = self.registry.find(key)?;
        let permit = match self.gate.admit(&account, Utc::now()) {
            Ok(permit) => permit,
            Err(rejection) => {
                TraceEvent::GateRejected {
                    key_prefix: key_prefix(key),
                    reason: rejection.reason().into(),
                    used: account.used,
                    limit: account.limit.as_i64(),
                }
                .emit();
                return Err(MeterError::Account(rejection.into()));
            }
        };

        let output = work(account, permit).await.map_err(MeterError::Work)?;
        let charged = self.registry.record_usage(key)?;
        Ok((output, charged))
    }

    /// Number of keys with a lock entry.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }

    /// [`KeyRegistry::reissue`] under the key's lock, so a reissue never
    /// lands between the admission and the charge of an in-flight request.
    pub async fn reissue(&self, key: &str, new_plan: &str) -> Result<Account, AccountError> {
        let _guard = self.locks.acquire(key).await?;
        self.registry.reissue(key, new_plan)
    }
}
