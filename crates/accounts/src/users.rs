//! Registered users: email + Argon2id password hash.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sx_domain::trace::TraceEvent;

use crate::error::{AccountError, Result};
use crate::persist::{read_json_or_default, write_json_atomic};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// User table, in memory or mirrored to `users.json`.
pub struct UserDirectory {
    users: RwLock<BTreeMap<u64, User>>,
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
    email_re: Regex,
    min_password_len: usize,
}

impl UserDirectory {
    pub fn in_memory(min_password_len: usize) -> Self {
        Self::with_users(BTreeMap::new(), None, min_password_len)
    }

    /// Load or create `dir/users.json`.
    pub fn open(dir: &Path, min_password_len: usize) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("users.json");
        let list: Vec<User> = read_json_or_default(&path)?;
        let users = list.into_iter().map(|u| (u.id, u)).collect::<BTreeMap<_, _>>();
        tracing::info!(users = users.len(), path = %path.display(), "user directory loaded");
        Ok(Self::with_users(users, Some(path), min_password_len))
    }

    fn with_users(users: BTreeMap<u64, User>, path: Option<PathBuf>, min_password_len: usize) -> Self {
        Self {
            users: RwLock::new(users),
            path,
            write_lock: Mutex::new(()),
            email_re: Regex::new(EMAIL_PATTERN).expect("static email pattern"),
            min_password_len,
        }
    }

    /// Create a user.  The email is trimmed and lowercased before the
    /// uniqueness check.
    pub fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        if !self.email_re.is_match(&email) {
            return Err(AccountError::InvalidInput("invalid email address".into()));
        }
        if password.chars().count() < self.min_password_len {
            return Err(AccountError::InvalidInput(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }
        if self.find_by_email(&email).is_some() {
            return Err(AccountError::DuplicateAccount(email));
        }

        let password_hash = hash_password(password)?;

        let _guard = self.write_lock.lock();
        let user = {
            let mut users = self.users.write();
            // Re-check under the write lock: hashing ran unlocked.
            if users.values().any(|u| u.email == email) {
                return Err(AccountError::DuplicateAccount(email));
            }
            let id = users.keys().next_back().map_or(1, |last| last + 1);
            let user = User {
                id,
                email,
                password_hash,
                created_at: Utc::now(),
            };
            users.insert(id, user.clone());
            user
        };
        if let Err(e) = self.persist() {
            self.users.write().remove(&user.id);
            return Err(e);
        }

        TraceEvent::UserRegistered { user_id: user.id }.emit();
        Ok(user)
    }

    /// Check credentials.  Unknown email and wrong password fail the same way.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let email = email.trim().to_lowercase();
        let user = self
            .find_by_email(&email)
            .ok_or_else(|| AccountError::AuthFailed("invalid email or password".into()))?;
        if !verify_password(password, &user.password_hash)? {
            return Err(AccountError::AuthFailed("invalid email or password".into()));
        }
        Ok(user)
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    pub fn find_by_email(&self, email: &str) -> Option<User> {
        self.users.read().values().find(|u| u.email == email).cloned()
    }

    /// All users ordered by id.
    pub fn list(&self) -> Vec<User> {
        self.users.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let list = self.list();
        write_json_atomic(path, &list)
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AccountError::Storage(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AccountError::Storage(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
