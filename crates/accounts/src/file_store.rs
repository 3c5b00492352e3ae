//! JSON flat-file account store.
//!
//! Persists accounts in `accounts.json` under the configured storage path.
//! The whole table is loaded at startup and rewritten after every mutation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::account::Account;
use crate::error::Result;
use crate::persist::{read_json_or_default, write_json_atomic};
use crate::store::{AccountStore, MemoryAccountStore};

/// Write-through file store.
///
/// Reads are served from memory.  Writers hold `write_lock` across the
/// mutation and the file rewrite, so the file always reflects the latest
/// committed snapshot.  A mutation whose rewrite fails is rolled back.
pub struct FileAccountStore {
    path: PathBuf,
    inner: MemoryAccountStore,
    write_lock: Mutex<()>,
}

impl FileAccountStore {
    /// Load or create the store at `dir/accounts.json`.
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("accounts.json");
        let accounts = read_json_or_default(&path)?;
        let inner = MemoryAccountStore::from_map(accounts);

        tracing::info!(
            accounts = inner.len(),
            path = %path.display(),
            "account store loaded"
        );

        Ok(Self {
            path,
            inner,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` and rewrite the file.  If the rewrite fails the
    /// in-memory table is put back, so memory never runs ahead of disk.
    fn commit<T>(&self, mutate: impl FnOnce(&MemoryAccountStore) -> Result<T>) -> Result<T> {
        let _guard = self.write_lock.lock();
        let before = self.inner.snapshot();
        let out = mutate(&self.inner)?;
        if let Err(e) = self.persist() {
            self.inner.restore(before);
            return Err(e);
        }
        Ok(out)
    }

    fn persist(&self) -> Result<()> {
        let snapshot = self.inner.snapshot();
        write_json_atomic(&self.path, &snapshot).inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "failed to persist accounts");
        })
    }
}

impl AccountStore for FileAccountStore {
    fn get(&self, key: &str) -> Result<Option<Account>> {
        self.inner.get(key)
    }

    fn insert(&self, account: Account) -> Result<()> {
        self.commit(|inner| inner.insert(account))
    }

    fn update(&self, account: &Account) -> Result<()> {
        self.commit(|inner| inner.update(account))
    }

    fn replace(&self, old_key: &str, account: Account) -> Result<()> {
        self.commit(|inner| inner.replace(old_key, account))
    }

    fn set_disabled(&self, key: &str) -> Result<(Account, bool)> {
        self.commit(|inner| inner.set_disabled(key))
    }

    fn increment(&self, key: &str, at: DateTime<Utc>) -> Result<Account> {
        self.commit(|inner| inner.increment(key, at))
    }

    fn find_by_owner(&self, owner: u64) -> Result<Option<Account>> {
        self.inner.find_by_owner(owner)
    }

    fn list(&self) -> Result<Vec<Account>> {
        self.inner.list()
    }
}
