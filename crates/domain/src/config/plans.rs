use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Limit
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Request quota attached to a plan.
///
/// On the wire (config, JSON responses, persisted files) the limit is a plain
/// integer, with `-1` reserved for [`Limit::Unlimited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    Finite(u64),
    Unlimited,
}

impl Limit {
    /// Wire value meaning "no ceiling".
    pub const UNLIMITED_SENTINEL: i64 = -1;

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            Self::UNLIMITED_SENTINEL => Some(Limit::Unlimited),
            v if v >= 0 => Some(Limit::Finite(v as u64)),
            _ => None,
        }
    }

    pub fn as_i64(self) -> i64 {
        match self {
            Limit::Finite(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Limit::Unlimited => Self::UNLIMITED_SENTINEL,
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// `true` when `used` has reached a finite ceiling.
    pub fn is_exhausted_by(self, used: u64) -> bool {
        match self {
            Limit::Finite(n) => used >= n,
            Limit::Unlimited => false,
        }
    }

    /// Requests left before the ceiling; `None` for unlimited.
    pub fn remaining(self, used: u64) -> Option<u64> {
        match self {
            Limit::Finite(n) => Some(n.saturating_sub(used)),
            Limit::Unlimited => None,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Finite(n) => write!(f, "{n}"),
            Limit::Unlimited => f.write_str("unlimited"),
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Limit::from_i64(raw).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid limit {raw}: expected a non-negative integer or -1 for unlimited"
            ))
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Plans
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The single `plan -> limit` table.  A `[plans]` section in the config file
/// replaces the defaults entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlansConfig {
    pub plans: BTreeMap<String, Limit>,
}

impl Default for PlansConfig {
    fn default() -> Self {
        let mut plans = BTreeMap::new();
        plans.insert("basic".into(), Limit::Finite(1_000));
        plans.insert("pro".into(), Limit::Finite(10_000));
        plans.insert("agency".into(), Limit::Unlimited);
        Self { plans }
    }
}

impl PlansConfig {
    pub fn limit_for(&self, plan: &str) -> Option<Limit> {
        self.plans.get(plan).copied()
    }

    pub fn contains(&self, plan: &str) -> bool {
        self.plans.contains_key(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_maps_to_unlimited() {
        assert_eq!(Limit::from_i64(-1), Some(Limit::Unlimited));
        assert_eq!(Limit::from_i64(0), Some(Limit::Finite(0)));
        assert_eq!(Limit::from_i64(-2), None);
        assert_eq!(Limit::Unlimited.as_i64(), -1);
    }

    #[test]
    fn exhaustion_only_applies_to_finite_limits() {
        assert!(!Limit::Finite(1000).is_exhausted_by(999));
        assert!(Limit::Finite(1000).is_exhausted_by(1000));
        assert!(!Limit::Unlimited.is_exhausted_by(u64::MAX));
    }

    #[test]
    fn remaining_saturates() {
        assert_eq!(Limit::Finite(10).remaining(3), Some(7));
        assert_eq!(Limit::Finite(10).remaining(12), Some(0));
        assert_eq!(Limit::Unlimited.remaining(12), None);
    }

    #[test]
    fn limit_serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Limit::Finite(1000)).unwrap(), "1000");
        assert_eq!(serde_json::to_string(&Limit::Unlimited).unwrap(), "-1");
        let parsed: Limit = serde_json::from_str("-1").unwrap();
        assert_eq!(parsed, Limit::Unlimited);
        assert!(serde_json::from_str::<Limit>("-5").is_err());
    }

    #[test]
    fn default_plans_match_published_tiers() {
        let plans = PlansConfig::default();
        assert_eq!(plans.limit_for("basic"), Some(Limit::Finite(1_000)));
        assert_eq!(plans.limit_for("pro"), Some(Limit::Finite(10_000)));
        assert_eq!(plans.limit_for("agency"), Some(Limit::Unlimited));
        assert_eq!(plans.limit_for("enterprise"), None);
    }

    #[test]
    fn plans_section_replaces_defaults() {
        #[derive(Deserialize)]
        struct Wrapper {
            plans: PlansConfig,
        }
        let w: Wrapper = toml::from_str(
            r#"
            [plans]
            starter = 50
            unlimited = -1
            "#,
        )
        .unwrap();
        assert_eq!(w.plans.names().collect::<Vec<_>>(), vec!["starter", "unlimited"]);
        assert_eq!(w.plans.limit_for("unlimited"), Some(Limit::Unlimited));
        assert!(!w.plans.contains("basic"));
    }
}
