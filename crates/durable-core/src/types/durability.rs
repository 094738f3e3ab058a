//! Requested durability for a write

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Replication/persistence acknowledgement a write must reach before the
/// store reports it complete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DurabilityLevel {
    /// Acknowledged once the active node has the write in memory
    #[default]
    None,

    /// Replicated to a majority of nodes in memory
    Majority,

    /// Majority in memory, and persisted on the active node
    MajorityAndPersistActive,

    /// Persisted on a majority of nodes
    PersistToMajority,
}

impl DurabilityLevel {
    /// All levels, weakest first
    pub const ALL: [DurabilityLevel; 4] = [
        DurabilityLevel::None,
        DurabilityLevel::Majority,
        DurabilityLevel::MajorityAndPersistActive,
        DurabilityLevel::PersistToMajority,
    ];

    /// Whether this level needs synchronous replication support
    pub fn is_synchronous(self) -> bool {
        !matches!(self, DurabilityLevel::None)
    }

    /// Configuration name of this level
    pub fn as_str(self) -> &'static str {
        match self {
            DurabilityLevel::None => "none",
            DurabilityLevel::Majority => "majority",
            DurabilityLevel::MajorityAndPersistActive => "majority-and-persist-active",
            DurabilityLevel::PersistToMajority => "persist-to-majority",
        }
    }
}

impl fmt::Display for DurabilityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurabilityLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        DurabilityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| Error::invalid_durability(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_kebab_and_snake_case() {
        assert_eq!(
            "persist-to-majority".parse::<DurabilityLevel>().unwrap(),
            DurabilityLevel::PersistToMajority
        );
        assert_eq!(
            "MAJORITY_AND_PERSIST_ACTIVE".parse::<DurabilityLevel>().unwrap(),
            DurabilityLevel::MajorityAndPersistActive
        );
        assert!("quorum".parse::<DurabilityLevel>().is_err());
    }

    #[test]
    fn test_display_matches_serde_name() {
        for level in DurabilityLevel::ALL {
            let yaml = serde_yaml_ng::to_string(&level).unwrap();
            assert_eq!(yaml.trim(), level.to_string());
        }
    }

    #[test]
    fn test_only_none_is_asynchronous() {
        assert!(!DurabilityLevel::None.is_synchronous());
        assert!(DurabilityLevel::Majority.is_synchronous());
        assert!(DurabilityLevel::PersistToMajority.is_synchronous());
    }
}
