//! Ordinal levels shared by the threshold records and the engine.
//!
//! Tier predicates compare these through an explicit rank table, never by
//! string comparison or declaration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Durability of a competitive moat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoatDurability {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl MoatDurability {
    /// Ordinal rank: none < low < medium < high.
    pub const fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// True when this durability is at least `required`.
    pub const fn meets(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for MoatDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoatDurability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown moat durability: {other}")),
        }
    }
}

/// Reinvestment runway category produced by the reinvestment gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunwayCategory {
    #[default]
    #[serde(alias = "none", alias = "low_growth")]
    Mature,
    LimitedRunway,
    MediumRunway,
    LongRunway,
}

impl RunwayCategory {
    /// Ordinal rank used by the tier predicates.
    ///
    /// `mature` and `limited_runway` share rank 0 with the absent value.
    pub const fn rank(self) -> u8 {
        match self {
            Self::Mature | Self::LimitedRunway => 0,
            Self::MediumRunway => 1,
            Self::LongRunway => 2,
        }
    }

    /// True when this runway is at least `required`.
    pub const fn meets(self, required: Self) -> bool {
        self.rank() >= required.rank()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mature => "mature",
            Self::LimitedRunway => "limited_runway",
            Self::MediumRunway => "medium_runway",
            Self::LongRunway => "long_runway",
        }
    }
}

impl fmt::Display for RunwayCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Earnings predictability band from the complexity filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predictability {
    Low,
    Medium,
    High,
}

impl Predictability {
    pub const fn rank(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Predictability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(MoatDurability::High, MoatDurability::Medium, true)]
    #[test_case(MoatDurability::Medium, MoatDurability::Medium, true)]
    #[test_case(MoatDurability::Low, MoatDurability::Medium, false)]
    #[test_case(MoatDurability::None, MoatDurability::None, true)]
    fn test_moat_meets(actual: MoatDurability, required: MoatDurability, expected: bool) {
        assert_eq!(actual.meets(required), expected);
    }

    #[test]
    fn test_runway_rank_table() {
        assert_eq!(RunwayCategory::Mature.rank(), 0);
        assert_eq!(RunwayCategory::LimitedRunway.rank(), 0);
        assert!(RunwayCategory::LongRunway.meets(RunwayCategory::MediumRunway));
        assert!(!RunwayCategory::LimitedRunway.meets(RunwayCategory::MediumRunway));
    }

    #[test]
    fn test_runway_legacy_aliases() {
        let parsed: RunwayCategory = serde_json::from_str("\"low_growth\"").unwrap();
        assert_eq!(parsed, RunwayCategory::Mature);
        let parsed: RunwayCategory = serde_json::from_str("\"long_runway\"").unwrap();
        assert_eq!(parsed, RunwayCategory::LongRunway);
    }

    #[test]
    fn test_durability_from_str() {
        assert_eq!("HIGH".parse::<MoatDurability>().unwrap(), MoatDurability::High);
        assert!("wide".parse::<MoatDurability>().is_err());
    }
}
