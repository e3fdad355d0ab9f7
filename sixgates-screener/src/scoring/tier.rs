//! Quality tier classification.
//!
//! Tier predicates are checked strongest to weakest:
//!
//! | Tier | Spread | Moat | Runway |
//! |------|--------|------|--------|
//! | Exceptional | yes | yes | yes |
//! | High Quality | yes | yes | yes |
//! | Good | yes | yes | - |
//! | Acceptable | yes | - | - |
//!
//! Levels compare through `MoatDurability::meets` and `RunwayCategory::meets`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use sixgates_common::{
    MoatDurability, QualityTierThresholds, RunwayCategory, TierRequirement, Validate,
    ValidationResult,
};

use super::AnalysisResult;
use crate::gates::GateId;

/// Investment quality tier, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Exceptional,
    #[serde(rename = "High Quality")]
    HighQuality,
    Good,
    Acceptable,
    Uninvestable,
}

impl QualityTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exceptional => "Exceptional",
            Self::HighQuality => "High Quality",
            Self::Good => "Good",
            Self::Acceptable => "Acceptable",
            Self::Uninvestable => "Uninvestable",
        }
    }

    pub fn is_investable(self) -> bool {
        self != Self::Uninvestable
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the classifier landed on its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationPath {
    /// A quality gate failed; no predicate was checked
    QualityFailed,
    Matched,
    /// Quality passed but no tier predicate matched. Points at inconsistent
    /// thresholds between gate_2 and the acceptable tier.
    Gap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub tier: QualityTier,
    pub path: ClassificationPath,
    pub spread: f64,
    pub moat: MoatDurability,
    pub runway: RunwayCategory,
}

/// Maps an analysis onto a quality tier.
#[derive(Debug, Clone)]
pub struct QualityTierClassifier {
    thresholds: QualityTierThresholds,
}

impl QualityTierClassifier {
    pub fn new(thresholds: QualityTierThresholds) -> ValidationResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn classify(&self, result: &AnalysisResult) -> QualityTier {
        self.classify_detailed(result).tier
    }

    pub fn classify_detailed(&self, result: &AnalysisResult) -> Classification {
        let spread = result
            .gate(GateId::EconomicEngine)
            .and_then(|g| g.metric("spread"))
            .unwrap_or(0.0);
        let moat: MoatDurability = result
            .gate(GateId::MoatAssessment)
            .and_then(|g| g.detail("moat_durability"))
            .unwrap_or_default();
        let runway: RunwayCategory = result
            .gate(GateId::ReinvestmentRunway)
            .and_then(|g| g.detail("runway_category"))
            .unwrap_or_default();

        let classification = |tier, path| Classification {
            tier,
            path,
            spread,
            moat,
            runway,
        };

        if !result.passed_quality {
            return classification(QualityTier::Uninvestable, ClassificationPath::QualityFailed);
        }

        let t = &self.thresholds;
        let tiers = [
            (QualityTier::Exceptional, &t.exceptional, true),
            (QualityTier::HighQuality, &t.high_quality, true),
            (QualityTier::Good, &t.good_quality, false),
            (QualityTier::Acceptable, &t.acceptable, false),
        ];

        for (tier, requirement, check_runway) in tiers {
            if Self::meets(requirement, spread, moat, runway, check_runway) {
                return classification(tier, ClassificationPath::Matched);
            }
        }

        warn!(
            ticker = %result.ticker,
            spread,
            moat = %moat,
            runway = %runway,
            "Passed quality gates but matched no tier; check gate_2 against quality_tiers.acceptable"
        );
        classification(QualityTier::Uninvestable, ClassificationPath::Gap)
    }

    fn meets(
        requirement: &TierRequirement,
        spread: f64,
        moat: MoatDurability,
        runway: RunwayCategory,
        check_runway: bool,
    ) -> bool {
        spread >= requirement.min_roic_spread
            && requirement.min_moat_durability.map_or(true, |m| moat.meets(m))
            && (!check_runway || requirement.min_runway.map_or(true, |r| runway.meets(r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateResult;
    use std::collections::BTreeMap;

    fn analysis(spread: f64, moat: Option<&str>, runway: Option<&str>) -> AnalysisResult {
        let mut engine = BTreeMap::new();
        engine.insert("spread".to_string(), spread);

        let mut moat_gate = GateResult::advisory(GateId::MoatAssessment, BTreeMap::new());
        if let Some(m) = moat {
            moat_gate = moat_gate.with_detail("moat_durability", m);
        }
        let mut runway_gate = GateResult::advisory(GateId::ReinvestmentRunway, BTreeMap::new());
        if let Some(r) = runway {
            runway_gate = runway_gate.with_detail("runway_category", r);
        }

        AnalysisResult::new(
            "TEST",
            vec![
                GateResult::from_reasons(GateId::EconomicEngine, engine, vec![]),
                moat_gate,
                runway_gate,
            ],
        )
    }

    fn classifier() -> QualityTierClassifier {
        QualityTierClassifier::new(QualityTierThresholds::default()).unwrap()
    }

    #[test]
    fn test_tier_ladder() {
        let c = classifier();
        assert_eq!(c.classify(&analysis(0.20, Some("high"), Some("long_runway"))), QualityTier::Exceptional);
        assert_eq!(c.classify(&analysis(0.20, Some("high"), Some("medium_runway"))), QualityTier::HighQuality);
        assert_eq!(c.classify(&analysis(0.12, Some("medium"), Some("medium_runway"))), QualityTier::HighQuality);
        assert_eq!(c.classify(&analysis(0.12, Some("medium"), Some("mature"))), QualityTier::Good);
        assert_eq!(c.classify(&analysis(0.06, Some("low"), None)), QualityTier::Good);
        assert_eq!(c.classify(&analysis(0.06, Some("none"), None)), QualityTier::Acceptable);
        assert_eq!(c.classify(&analysis(0.172, None, Some("mature"))), QualityTier::Acceptable);
    }

    #[test]
    fn test_limited_runway_ranks_with_mature() {
        let c = classifier();
        assert_eq!(
            c.classify(&analysis(0.12, Some("medium"), Some("limited_runway"))),
            QualityTier::Good
        );
    }

    #[test]
    fn test_failed_quality_short_circuits() {
        let mut result = analysis(0.30, Some("high"), Some("long_runway"));
        result.passed_quality = false;
        let c = classifier().classify_detailed(&result);
        assert_eq!(c.tier, QualityTier::Uninvestable);
        assert_eq!(c.path, ClassificationPath::QualityFailed);
    }

    #[test]
    fn test_gap_is_reported() {
        let c = classifier().classify_detailed(&analysis(0.01, Some("high"), Some("long_runway")));
        assert_eq!(c.tier, QualityTier::Uninvestable);
        assert_eq!(c.path, ClassificationPath::Gap);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(QualityTier::HighQuality.to_string(), "High Quality");
        assert_eq!(serde_json::to_string(&QualityTier::HighQuality).unwrap(), "\"High Quality\"");
        assert!(!QualityTier::Uninvestable.is_investable());
    }

    #[test]
    fn test_rejects_inverted_spreads() {
        let mut t = QualityTierThresholds::default();
        t.acceptable.min_roic_spread = 0.5;
        assert!(QualityTierClassifier::new(t).is_err());
    }
}
