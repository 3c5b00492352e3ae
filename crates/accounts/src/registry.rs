//! Key registry: issuance, lookup, usage recording, reissue and disable.
//!
//! All state lives in the injected [`AccountStore`]; the registry only adds
//! plan validation, the reissue policy and trace events on top.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sx_domain::config::{AccountsConfig, PlansConfig, ReissuePolicy};
use sx_domain::trace::{key_prefix, TraceEvent};

use crate::account::Account;
use crate::error::{AccountError, Result};
use crate::plan::{Plan, PlanTable};
use crate::store::AccountStore;

pub struct KeyRegistry {
    store: Arc<dyn AccountStore>,
    plans: PlanTable,
    reissue_policy: ReissuePolicy,
    key_ttl: Option<Duration>,
}

impl KeyRegistry {
    pub fn new(
        store: Arc<dyn AccountStore>,
        plans: PlanTable,
        reissue_policy: ReissuePolicy,
        key_ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            plans,
            reissue_policy,
            key_ttl,
        }
    }

    pub fn from_config(
        store: Arc<dyn AccountStore>,
        plans: &PlansConfig,
        accounts: &AccountsConfig,
    ) -> Result<Self> {
        let plans = PlanTable::from_config(plans)?;
        let key_ttl = accounts
            .key_ttl_days
            .filter(|d| *d > 0)
            .map(|d| Duration::days(d as i64));
        Ok(Self::new(store, plans, accounts.reissue_policy, key_ttl))
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    pub fn reissue_policy(&self) -> ReissuePolicy {
        self.reissue_policy
    }

    // ── Issuance ───────────────────────────────────────────────────

    /// Issue an anonymous key on `plan`.
    pub fn issue(&self, plan: &str) -> Result<Account> {
        self.issue_inner(None, plan)
    }

    /// Issue a key on `plan` owned by registered user `owner`.  Fails with
    /// [`AccountError::DuplicateAccount`] if `owner` already holds a key.
    pub fn issue_for(&self, owner: u64, plan: &str) -> Result<Account> {
        self.issue_inner(Some(owner), plan)
    }

    fn issue_inner(&self, owner: Option<u64>, plan: &str) -> Result<Account> {
        let plan = self.plans.resolve(plan)?;
        let account = self.fresh_account(&plan, owner);
        self.store.insert(account.clone())?;

        TraceEvent::KeyIssued {
            key_prefix: key_prefix(&account.key),
            plan: account.plan.clone(),
            owner,
        }
        .emit();

        Ok(account)
    }

    fn fresh_account(&self, plan: &Plan, owner: Option<u64>) -> Account {
        let now = Utc::now();
        let mut account = Account::new(plan, owner, now);
        account.expires_at = self.key_ttl.map(|ttl| now + ttl);
        account
    }

    // ── Lookup ─────────────────────────────────────────────────────

    pub fn find(&self, key: &str) -> Result<Account> {
        self.store.get(key)?.ok_or(AccountError::NotFound)
    }

    pub fn find_by_owner(&self, owner: u64) -> Result<Option<Account>> {
        self.store.find_by_owner(owner)
    }

    pub fn list(&self) -> Result<Vec<Account>> {
        self.store.list()
    }

    // ── Mutation ───────────────────────────────────────────────────

    /// Charge one request to `key`.  Call only after the metered work
    /// succeeded.
    pub fn record_usage(&self, key: &str) -> Result<Account> {
        self.store.increment(key, Utc::now())
    }

    /// Replace `key` with a fresh key on `new_plan`.
    ///
    /// Under [`ReissuePolicy::WhenExhausted`] a key with quota left (any
    /// unlimited key included) is refused with
    /// [`AccountError::QuotaRemaining`] and stays untouched.  An expired key
    /// can always be reissued; a disabled one never can.
    pub fn reissue(&self, key: &str, new_plan: &str) -> Result<Account> {
        let current = self.find(key)?;

        if current.disabled {
            return Err(AccountError::AccountClosed);
        }

        let expired = current.is_closed(Utc::now());
        if self.reissue_policy == ReissuePolicy::WhenExhausted
            && !expired
            && !current.is_exhausted()
        {
            TraceEvent::ReissueBlocked {
                key_prefix: key_prefix(&current.key),
                used: current.used,
                limit: current.limit.as_i64(),
            }
            .emit();
            return Err(AccountError::QuotaRemaining {
                used: current.used,
                limit: current.limit,
            });
        }

        let plan = self.plans.resolve(new_plan)?;
        let mut fresh = self.fresh_account(&plan, current.owner);
        fresh.created_at = current.created_at;
        self.store.replace(&current.key, fresh.clone())?;

        TraceEvent::KeyReissued {
            old_key_prefix: key_prefix(&current.key),
            new_key_prefix: key_prefix(&fresh.key),
            old_plan: current.plan,
            new_plan: fresh.plan.clone(),
        }
        .emit();

        Ok(fresh)
    }

    /// Set the disabled marker on `key`.  Idempotent.
    ///
    /// A single store operation, so a usage charge landing concurrently is
    /// never overwritten.
    pub fn disable(&self, key: &str) -> Result<Account> {
        let (account, newly) = self.store.set_disabled(key)?;
        if newly {
            TraceEvent::AccountDisabled {
                key_prefix: key_prefix(&account.key),
                owner: account.owner,
            }
            .emit();
        }
        Ok(account)
    }

    /// Disable the key owned by `owner`, if the user has one.
    pub fn disable_owner(&self, owner: u64) -> Result<Option<Account>> {
        match self.store.find_by_owner(owner)? {
            Some(account) => self.disable(&account.key).map(Some),
            None => Ok(None),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
