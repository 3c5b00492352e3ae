use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where accounts, users and payments live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory holding `accounts.json`, `users.json` and `payments.jsonl`
    /// (file backend only).
    #[serde(default = "d_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: d_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process maps; everything is lost on restart.
    Memory,
    /// JSON flat files under `path`, rewritten on every mutation.
    #[default]
    File,
}

fn d_path() -> PathBuf {
    PathBuf::from("./data")
}
