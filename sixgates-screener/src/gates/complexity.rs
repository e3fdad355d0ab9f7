//! Gate 3.5: Complexity Filter.
//!
//! Measures earnings predictability as the coefficient of variation of EPS.
//! Low predictability is reported but does not kill the ticker.

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::{ComplexityThresholds, Predictability};

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{FinancialDataProvider, ProviderError};
use crate::stats::{mean, population_std_dev};

/// Stand-in mean when EPS averages exactly zero.
const ZERO_MEAN_SUBSTITUTE: f64 = 0.01;

#[derive(Debug, Clone, Default)]
pub struct ComplexityFilterGate {
    thresholds: ComplexityThresholds,
}

impl ComplexityFilterGate {
    pub fn new(thresholds: ComplexityThresholds) -> Self {
        Self { thresholds }
    }

    /// |stddev / mean| of the EPS series.
    pub fn earnings_cov(eps: &[f64]) -> f64 {
        let mut avg = mean(eps);
        if avg == 0.0 {
            avg = ZERO_MEAN_SUBSTITUTE;
        }
        (population_std_dev(eps) / avg).abs()
    }

    pub fn predictability(&self, cov: f64) -> Predictability {
        if cov < self.thresholds.high_cov {
            Predictability::High
        } else if cov < self.thresholds.medium_cov {
            Predictability::Medium
        } else {
            Predictability::Low
        }
    }

    pub fn evaluate(&self, eps: &[f64]) -> GateResult {
        if eps.is_empty() {
            return GateResult::advisory_insufficient(GateId::ComplexityFilter);
        }

        let cov = Self::earnings_cov(eps);
        let predictability = self.predictability(cov);

        let mut result = GateResult::advisory(GateId::ComplexityFilter, metrics([("earnings_cov", cov)]))
            .with_detail("predictability", predictability.as_str())
            .with_detail("too_hard", false);

        if predictability.rank() < self.thresholds.min_earnings_predictability.rank() {
            result = result.with_note(format!(
                "Earnings predictability is {} (CoV: {:.2})",
                predictability, cov
            ));
        }
        result
    }
}

#[async_trait]
impl Gate for ComplexityFilterGate {
    fn id(&self) -> GateId {
        GateId::ComplexityFilter
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let income = provider
            .income_statement(ticker, self.thresholds.lookback_years)
            .await?;
        let eps: Vec<f64> = income.iter().map(|i| i.eps).collect();

        let result = self.evaluate(&eps);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;

    #[test]
    fn test_flat_eps_is_highly_predictable() {
        let gate = ComplexityFilterGate::default();
        let result = gate.evaluate(&[6.13, 6.13, 6.13, 6.13, 6.13]);
        assert!(result.passed);
        assert!(result.metric("earnings_cov").unwrap().abs() < 1e-12);
        assert_eq!(
            result.detail::<Predictability>("predictability"),
            Some(Predictability::High)
        );
        assert!(result.kill_reason.is_none());
    }

    #[test]
    fn test_volatile_eps_is_low_but_passes() {
        let gate = ComplexityFilterGate::default();
        let result = gate.evaluate(&[1.0, 3.0, -1.0, 4.0, 0.5]);
        assert!(result.passed);
        assert_eq!(
            result.detail::<Predictability>("predictability"),
            Some(Predictability::Low)
        );
        assert!(result.kill_reason.unwrap().starts_with("Earnings predictability is low"));
    }

    #[test]
    fn test_zero_mean_does_not_divide_by_zero() {
        let cov = ComplexityFilterGate::earnings_cov(&[1.0, -1.0]);
        assert!(cov.is_finite());
        assert!((cov - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_bands() {
        let gate = ComplexityFilterGate::default();
        assert_eq!(gate.predictability(0.10), Predictability::High);
        assert_eq!(gate.predictability(0.15), Predictability::Medium);
        assert_eq!(gate.predictability(0.29), Predictability::Medium);
        assert_eq!(gate.predictability(0.30), Predictability::Low);
    }

    #[tokio::test]
    async fn test_sample_is_medium() {
        let result = ComplexityFilterGate::default()
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(
            result.detail::<Predictability>("predictability"),
            Some(Predictability::Medium)
        );
    }
}
