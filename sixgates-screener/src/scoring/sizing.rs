//! Position sizing from tier and market regime.

use tracing::debug;

use sixgates_common::{PositionSizingThresholds, Validate, ValidationResult};

use super::QualityTier;
use crate::market::{MarketContext, MarketPhase};

/// Converts a tier into a portfolio fraction in `[0, absolute_max]`.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    thresholds: PositionSizingThresholds,
}

impl PositionSizer {
    pub fn new(thresholds: PositionSizingThresholds) -> ValidationResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    /// Base size before any market adjustment.
    pub fn base_size(&self, tier: QualityTier) -> f64 {
        let t = &self.thresholds;
        match tier {
            QualityTier::Exceptional => t.maximum,
            QualityTier::HighQuality => t.large,
            QualityTier::Good => t.standard,
            QualityTier::Acceptable => t.small,
            QualityTier::Uninvestable => 0.0,
        }
    }

    /// Bear halves, elevated risk trims; the two compose multiplicatively.
    pub fn calculate(&self, tier: QualityTier, context: Option<&MarketContext>) -> f64 {
        if tier == QualityTier::Uninvestable {
            return 0.0;
        }

        let t = &self.thresholds;
        let mut size = self.base_size(tier);

        if let Some(ctx) = context {
            if ctx.phase == MarketPhase::Bear {
                size *= t.bear_multiplier;
            }
            if ctx.risk_score > t.high_risk_score {
                size *= t.high_risk_multiplier;
            }
            // Crash and the other phases leave the size unchanged for now.
        }

        let size = size.clamp(0.0, t.absolute_max);
        debug!(tier = %tier, size, "Position sized");
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sizer() -> PositionSizer {
        PositionSizer::new(PositionSizingThresholds::default()).unwrap()
    }

    fn context(phase: MarketPhase, risk_score: f64) -> MarketContext {
        MarketContext {
            phase,
            risk_score,
            ..MarketContext::neutral()
        }
    }

    #[test_case(QualityTier::Exceptional, 0.15 ; "exceptional")]
    #[test_case(QualityTier::HighQuality, 0.10 ; "high quality")]
    #[test_case(QualityTier::Good, 0.05 ; "good")]
    #[test_case(QualityTier::Acceptable, 0.03 ; "acceptable")]
    #[test_case(QualityTier::Uninvestable, 0.0 ; "uninvestable")]
    fn test_base_sizes(tier: QualityTier, expected: f64) {
        assert!((sizer().calculate(tier, None) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_bear_and_high_risk_compose() {
        let size = sizer().calculate(QualityTier::Good, Some(&context(MarketPhase::Bear, 75.0)));
        assert!((size - 0.05 * 0.5 * 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_risk_threshold_is_strict() {
        let size = sizer().calculate(QualityTier::Good, Some(&context(MarketPhase::Bull, 70.0)));
        assert!((size - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_crash_is_a_no_op() {
        let size = sizer().calculate(QualityTier::Exceptional, Some(&context(MarketPhase::Crash, 50.0)));
        assert!((size - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_uninvestable_ignores_context() {
        let size = sizer().calculate(QualityTier::Uninvestable, Some(&context(MarketPhase::Accumulation, 10.0)));
        assert_eq!(size, 0.0);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let mut t = PositionSizingThresholds::default();
        t.maximum = 0.5;
        assert!(PositionSizer::new(t).is_err());
    }
}
