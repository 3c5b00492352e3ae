//! Account storage abstraction.
//!
//! The registry never holds process-wide state of its own: everything goes
//! through an injected [`AccountStore`].  Every method is a single-lock
//! operation, so `increment` is an atomic read-modify-write.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::account::Account;
use crate::error::{AccountError, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Key → account persistence.
pub trait AccountStore: Send + Sync {
    /// Look up an account by key.
    fn get(&self, key: &str) -> Result<Option<Account>>;

    /// Insert a new account.  Fails with [`AccountError::DuplicateKey`] if the
    /// key is already present, and with [`AccountError::DuplicateAccount`] if
    /// `account.owner` already owns a key.  A user never holds two keys.
    fn insert(&self, account: Account) -> Result<()>;

    /// Overwrite an existing account (matched by `account.key`).
    fn update(&self, account: &Account) -> Result<()>;

    /// Swap the account stored under `old_key` for `account`, which carries
    /// a new key.  Atomic: either both the removal and the insert happen or
    /// neither does.
    fn replace(&self, old_key: &str, account: Account) -> Result<()>;

    /// Set the disabled marker in place, leaving the counters alone.  Returns
    /// the account and whether the marker was newly set.
    fn set_disabled(&self, key: &str) -> Result<(Account, bool)>;

    /// Add one request to `used` and stamp `last_request_at`.  Returns the
    /// updated account.
    fn increment(&self, key: &str, at: DateTime<Utc>) -> Result<Account>;

    /// The account owned by a registered user, if any.
    fn find_by_owner(&self, owner: u64) -> Result<Option<Account>>;

    /// All accounts, in no particular order.
    fn list(&self) -> Result<Vec<Account>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// In-memory backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Process-local store.  Also the working set of [`crate::FileAccountStore`].
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(accounts: HashMap<String, Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    /// Clone of the full map, for persistence.
    pub(crate) fn snapshot(&self) -> HashMap<String, Account> {
        self.accounts.read().clone()
    }

    /// Put back a map taken with [`Self::snapshot`].
    pub(crate) fn restore(&self, accounts: HashMap<String, Account>) {
        *self.accounts.write() = accounts;
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl AccountStore for MemoryAccountStore {
    fn get(&self, key: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(key).cloned())
    }

    fn insert(&self, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.key) {
            return Err(AccountError::DuplicateKey);
        }
        if let Some(owner) = account.owner {
            if accounts.values().any(|a| a.owner == Some(owner)) {
                return Err(AccountError::DuplicateAccount(format!("user {owner}")));
            }
        }
        accounts.insert(account.key.clone(), account);
        Ok(())
    }

    fn update(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(&account.key) {
            Some(entry) => {
                *entry = account.clone();
                Ok(())
            }
            None => Err(AccountError::NotFound),
        }
    }

    fn replace(&self, old_key: &str, account: Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        if !accounts.contains_key(old_key) {
            return Err(AccountError::NotFound);
        }
        if account.key != old_key && accounts.contains_key(&account.key) {
            return Err(AccountError::DuplicateKey);
        }
        accounts.remove(old_key);
        accounts.insert(account.key.clone(), account);
        Ok(())
    }

    fn set_disabled(&self, key: &str) -> Result<(Account, bool)> {
        let mut accounts = self.accounts.write();
        let entry = accounts.get_mut(key).ok_or(AccountError::NotFound)?;
        let newly = !entry.disabled;
        entry.disabled = true;
        Ok((entry.clone(), newly))
    }

    fn increment(&self, key: &str, at: DateTime<Utc>) -> Result<Account> {
        let mut accounts = self.accounts.write();
        let entry = accounts.get_mut(key).ok_or(AccountError::NotFound)?;
        entry.used = entry.used.saturating_add(1);
        entry.last_request_at = Some(at);
        Ok(entry.clone())
    }

    fn find_by_owner(&self, owner: u64) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.owner == Some(owner))
            .cloned())
    }

    fn list(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().values().cloned().collect())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;
    use sx_domain::config::Limit;

    fn account(owner: Option<u64>) -> Account {
        let plan = Plan {
            name: "basic".into(),
            limit: Limit::Finite(1000),
        };
        Account::new(&plan, owner, Utc::now())
    }

    #[test]
    fn insert_and_get() {
        let store = MemoryAccountStore::new();
        let acct = account(None);
        store.insert(acct.clone()).unwrap();
        assert_eq!(store.get(&acct.key).unwrap(), Some(acct));
        assert_eq!(store.get("sk-missing").unwrap(), None);
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let store = MemoryAccountStore::new();
        let acct = account(None);
        store.insert(acct.clone()).unwrap();
        assert!(matches!(store.insert(acct), Err(AccountError::DuplicateKey)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn increment_bumps_counter_and_timestamp() {
        let store = MemoryAccountStore::new();
        let acct = account(None);
        store.insert(acct.clone()).unwrap();
        let at = Utc::now();
        let updated = store.increment(&acct.key, at).unwrap();
        assert_eq!(updated.used, 1);
        assert_eq!(updated.last_request_at, Some(at));
        assert_eq!(store.get(&acct.key).unwrap().unwrap().used, 1);
    }

    #[test]
    fn increment_unknown_key_is_not_found() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.increment("sk-nope", Utc::now()),
            Err(AccountError::NotFound)
        ));
    }

    #[test]
    fn replace_moves_account_to_new_key() {
        let store = MemoryAccountStore::new();
        let old = account(Some(1));
        store.insert(old.clone()).unwrap();

        let mut fresh = account(Some(1));
        fresh.plan = "pro".into();
        store.replace(&old.key, fresh.clone()).unwrap();

        assert_eq!(store.get(&old.key).unwrap(), None);
        assert_eq!(store.get(&fresh.key).unwrap().unwrap().plan, "pro");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_onto_existing_key_leaves_store_untouched() {
        let store = MemoryAccountStore::new();
        let a = account(None);
        let b = account(None);
        store.insert(a.clone()).unwrap();
        store.insert(b.clone()).unwrap();

        assert!(matches!(
            store.replace(&a.key, b.clone()),
            Err(AccountError::DuplicateKey)
        ));
        assert!(store.get(&a.key).unwrap().is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn find_by_owner_matches_owner_only() {
        let store = MemoryAccountStore::new();
        let mine = account(Some(7));
        store.insert(mine.clone()).unwrap();
        store.insert(account(None)).unwrap();
        assert_eq!(store.find_by_owner(7).unwrap().unwrap().key, mine.key);
        assert!(store.find_by_owner(8).unwrap().is_none());
    }

    #[test]
    fn second_key_for_same_owner_is_rejected() {
        let store = MemoryAccountStore::new();
        store.insert(account(Some(3))).unwrap();
        assert!(matches!(
            store.insert(account(Some(3))),
            Err(AccountError::DuplicateAccount(_))
        ));
        store.insert(account(None)).unwrap();
        store.insert(account(None)).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn set_disabled_keeps_counters() {
        let store = MemoryAccountStore::new();
        let acct = account(None);
        store.insert(acct.clone()).unwrap();
        store.increment(&acct.key, Utc::now()).unwrap();

        let (disabled, newly) = store.set_disabled(&acct.key).unwrap();
        assert!(newly);
        assert!(disabled.disabled);
        assert_eq!(disabled.used, 1);

        let (_, again) = store.set_disabled(&acct.key).unwrap();
        assert!(!again);
        assert!(matches!(
            store.set_disabled("sk-nope"),
            Err(AccountError::NotFound)
        ));
    }

    #[test]
    fn update_unknown_key_is_not_found() {
        let store = MemoryAccountStore::new();
        assert!(matches!(
            store.update(&account(None)),
            Err(AccountError::NotFound)
        ));
    }
}
