//! `seox issue-key`: operator shortcut for creating a key without going
//! through registration.
//!
//! With the file backend, run it while the server is stopped: the server
//! keeps its own copy of `accounts.json` in memory and would overwrite the
//! new key on its next write.  `--owner` fails if that user already holds a
//! key.

use sx_domain::config::Config;

use crate::bootstrap;

pub fn run(config: &Config, plan: &str, owner: Option<u64>) -> anyhow::Result<()> {
    bootstrap::validate_config(config)?;
    let registry = bootstrap::build_registry(config)?;
    let account = match owner {
        Some(owner) => registry.issue_for(owner, plan)?,
        None => registry.issue(plan)?,
    };
    println!("{}", serde_json::to_string_pretty(&account)?);
    Ok(())
}
