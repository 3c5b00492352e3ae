use std::collections::BTreeMap;

use serde::Serialize;
use sx_domain::config::{Limit, PlansConfig};

use crate::error::{AccountError, Result};

/// A validated plan: a name from the configured table and its quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub name: String,
    pub limit: Limit,
}

/// The closed set of plans accepted by key issuance.
///
/// Built once at startup from `[plans]`; lookups never touch the config again.
#[derive(Debug, Clone)]
pub struct PlanTable {
    plans: BTreeMap<String, Limit>,
}

impl PlanTable {
    /// Validate the configured table.  Rejects an empty table and finite
    /// limits of zero, which would produce keys that can never be used.
    pub fn from_config(config: &PlansConfig) -> Result<Self> {
        if config.is_empty() {
            return Err(AccountError::InvalidInput(
                "no plans configured".into(),
            ));
        }
        for (name, limit) in &config.plans {
            if *limit == Limit::Finite(0) {
                return Err(AccountError::InvalidInput(format!(
                    "plan \"{name}\" has a zero limit"
                )));
            }
        }
        Ok(Self {
            plans: config.plans.clone(),
        })
    }

    /// Resolve a plan name, failing with [`AccountError::InvalidPlan`].
    pub fn resolve(&self, name: &str) -> Result<Plan> {
        let name = name.trim();
        self.plans
            .get(name)
            .map(|limit| Plan {
                name: name.to_owned(),
                limit: *limit,
            })
            .ok_or_else(|| AccountError::InvalidPlan(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Plan> + '_ {
        self.plans.iter().map(|(name, limit)| Plan {
            name: name.clone(),
            limit: *limit,
        })
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_configured_plan() {
        let table = PlanTable::from_config(&PlansConfig::default()).unwrap();
        for plan in table.iter() {
            assert_eq!(table.resolve(&plan.name).unwrap(), plan);
        }
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn unknown_plan_is_invalid() {
        let table = PlanTable::from_config(&PlansConfig::default()).unwrap();
        let err = table.resolve("unknown").unwrap_err();
        assert!(matches!(err, AccountError::InvalidPlan(ref p) if p == "unknown"));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let table = PlanTable::from_config(&PlansConfig::default()).unwrap();
        assert_eq!(table.resolve(" pro ").unwrap().limit, Limit::Finite(10_000));
    }

    #[test]
    fn zero_limit_table_is_rejected() {
        let mut cfg = PlansConfig::default();
        cfg.plans.insert("free".into(), Limit::Finite(0));
        assert!(PlanTable::from_config(&cfg).is_err());
    }

    #[test]
    fn empty_table_is_rejected() {
        let cfg = PlansConfig {
            plans: BTreeMap::new(),
        };
        assert!(PlanTable::from_config(&cfg).is_err());
    }
}
