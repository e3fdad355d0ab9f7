//! Gate 2: Economic Engine.
//!
//! Return on invested capital against a fixed cost of capital, and the
//! direction of operating margins over the lookback window.

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::EconomicEngineThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{FinancialDataProvider, IncomeStatement, KeyMetrics, ProviderError};
use crate::stats::{linear_regression_slope, mean, safe_div};

#[derive(Debug, Clone, Default)]
pub struct EconomicEngineGate {
    thresholds: EconomicEngineThresholds,
}

impl EconomicEngineGate {
    pub fn new(thresholds: EconomicEngineThresholds) -> Self {
        Self { thresholds }
    }

    /// Operating margins in chronological order (oldest first).
    fn chronological_margins(income: &[IncomeStatement]) -> Vec<f64> {
        income
            .iter()
            .rev()
            .map(|i| safe_div(i.operating_income, i.revenue, 0.0))
            .collect()
    }

    pub fn evaluate(&self, key_metrics: &[KeyMetrics], income: &[IncomeStatement]) -> GateResult {
        let roics: Vec<f64> = key_metrics
            .iter()
            .map(|m| m.return_on_invested_capital)
            .collect();
        let avg_roic = mean(&roics);
        let wacc = self.thresholds.wacc;
        let spread = avg_roic - wacc;
        let margin_slope = linear_regression_slope(&Self::chronological_margins(income));

        let mut reasons = Vec::new();
        if spread < self.thresholds.min_roic_wacc_spread {
            reasons.push(format!(
                "ROIC-WACC spread ({:.2}%) below {:.2}%",
                spread * 100.0,
                self.thresholds.min_roic_wacc_spread * 100.0
            ));
        }
        if margin_slope < self.thresholds.margin_decline_threshold {
            reasons.push(format!(
                "Margin decline rate ({:.2}) exceeds threshold",
                margin_slope
            ));
        }

        GateResult::from_reasons(
            GateId::EconomicEngine,
            metrics([
                ("avg_roic", avg_roic),
                ("wacc", wacc),
                ("spread", spread),
                ("margin_slope", margin_slope),
            ]),
            reasons,
        )
    }
}

#[async_trait]
impl Gate for EconomicEngineGate {
    fn id(&self) -> GateId {
        GateId::EconomicEngine
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let years = self.thresholds.lookback_years;
        let key_metrics = provider.key_metrics(ticker, years).await?;
        let ratios = provider.ratios(ticker, years).await?;
        let income = provider.income_statement(ticker, years).await?;

        if key_metrics.is_empty() || ratios.is_empty() || income.is_empty() {
            return Ok(GateResult::insufficient(self.id()));
        }

        let result = self.evaluate(&key_metrics, &income);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;

    fn roic(values: &[f64]) -> Vec<KeyMetrics> {
        values
            .iter()
            .map(|r| KeyMetrics {
                return_on_invested_capital: *r,
                ..Default::default()
            })
            .collect()
    }

    /// Most-recent-first statements with the given operating margins.
    fn margins(values: &[f64]) -> Vec<IncomeStatement> {
        values
            .iter()
            .map(|m| IncomeStatement {
                revenue: 100.0,
                operating_income: m * 100.0,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_spread_against_fixed_wacc() {
        let gate = EconomicEngineGate::default();
        let result = gate.evaluate(&roic(&[0.20, 0.20]), &margins(&[0.3, 0.3]));
        assert!(result.passed);
        assert!((result.metric("spread").unwrap() - 0.12).abs() < 1e-12);
        assert_eq!(result.metric("wacc"), Some(0.08));
    }

    #[test]
    fn test_thin_spread_kills() {
        let gate = EconomicEngineGate::default();
        let result = gate.evaluate(&roic(&[0.09, 0.10]), &margins(&[0.3, 0.3]));
        assert!(!result.passed);
        assert!(result.kill_reason.unwrap().starts_with("ROIC-WACC spread"));
    }

    #[test]
    fn test_margin_slope_is_chronological() {
        let gate = EconomicEngineGate::default();
        // Newest first: 0.10 now, 0.30 four years ago, so margins are falling.
        let result = gate.evaluate(&roic(&[0.25]), &margins(&[0.10, 0.15, 0.20, 0.25, 0.30]));
        assert!((result.metric("margin_slope").unwrap() - (-0.05)).abs() < 1e-12);
        assert!(!result.passed);
        assert!(result.kill_reason.unwrap().contains("Margin decline"));
    }

    #[tokio::test]
    async fn test_sample_passes() {
        let result = EconomicEngineGate::default()
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert!((result.metric("avg_roic").unwrap() - 0.252).abs() < 1e-9);
        assert!(result.metric("margin_slope").unwrap() > 0.0);
    }
}
