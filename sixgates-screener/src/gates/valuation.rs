//! Gate 4: Valuation.
//!
//! Price against growth on the latest period:
//! - PEG as reported
//! - PEGY = P/E / (implied growth + dividend yield in percent), implied growth = P/E / PEG
//! - price to free cash flow
//! - where today's P/E sits within the lookback P/E range
//!
//! A PEG above the acceptable band fails the gate ("wait for a better price").

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::ValuationThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{FinancialDataProvider, ProviderError, Ratios};

#[derive(Debug, Clone, Default)]
pub struct ValuationGate {
    thresholds: ValuationThresholds,
}

impl ValuationGate {
    pub fn new(thresholds: ValuationThresholds) -> Self {
        Self { thresholds }
    }

    /// `None` when PEG is absent or zero, or the denominator is not positive.
    pub fn pegy(pe: f64, peg: f64, dividend_yield: f64) -> Option<f64> {
        if peg == 0.0 {
            return None;
        }
        let denominator = pe / peg + dividend_yield * 100.0;
        (denominator > 0.0).then(|| pe / denominator)
    }

    /// Position of `current` within the min..max range, 0.5 for a flat range.
    pub fn valuation_percentile(current: f64, history: &[f64]) -> f64 {
        let min = history.iter().copied().fold(f64::INFINITY, f64::min);
        let max = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if history.is_empty() || max == min {
            0.5
        } else {
            (current - min) / (max - min)
        }
    }

    /// `ratios` is most-recent-first and non-empty.
    pub fn evaluate(&self, ratios: &[Ratios]) -> GateResult {
        let Some(latest) = ratios.first() else {
            return GateResult::insufficient(GateId::Valuation);
        };

        let t = &self.thresholds;
        let peg = latest.peg_ratio.unwrap_or(0.0);
        let pe = latest.price_to_earnings_ratio.unwrap_or(0.0);
        let pegy = Self::pegy(pe, peg, latest.dividend_yield);
        let p_fcf = latest.price_to_free_cash_flow_ratio;

        let history: Vec<f64> = ratios.iter().filter_map(|r| r.price_to_earnings_ratio).collect();
        let percentile = Self::valuation_percentile(pe, &history);

        let mut values = metrics([
            ("peg", peg),
            ("p_fcf", p_fcf),
            ("valuation_percentile", percentile),
        ]);
        if let Some(pegy) = pegy {
            values.insert("pegy".to_string(), pegy);
        }

        let mut reasons = Vec::new();
        if peg > t.peg_acceptable {
            reasons.push(format!("PEG ({:.2}) > {:.2}", peg, t.peg_acceptable));
        }

        let action = if reasons.is_empty() { "PROCEED" } else { "WAIT" };
        GateResult::from_reasons(GateId::Valuation, values, reasons)
            .with_detail("action", action)
            .with_detail("peg_attractive", peg > 0.0 && peg <= t.peg_attractive)
            .with_detail("pegy_attractive", pegy.is_some_and(|p| p <= t.pegy_attractive))
    }
}

#[async_trait]
impl Gate for ValuationGate {
    fn id(&self) -> GateId {
        GateId::Valuation
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let ratios = provider.ratios(ticker, self.thresholds.lookback_years).await?;

        let result = self.evaluate(&ratios);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;

    fn ratio(pe: f64, peg: Option<f64>) -> Ratios {
        Ratios {
            price_to_earnings_ratio: Some(pe),
            peg_ratio: peg,
            dividend_yield: 0.02,
            price_to_free_cash_flow_ratio: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_pegy_adds_yield_to_growth() {
        // growth 20 + yield 2 => 22
        let pegy = ValuationGate::pegy(20.0, 1.0, 0.02).unwrap();
        assert!((pegy - 20.0 / 22.0).abs() < 1e-12);
        assert!(ValuationGate::pegy(20.0, 0.0, 0.02).is_none());
        assert!(ValuationGate::pegy(-20.0, 1.0, 0.0).is_none());
    }

    #[test]
    fn test_percentile() {
        assert!((ValuationGate::valuation_percentile(28.5, &[28.5, 25.0, 30.0, 35.0, 20.0]) - 8.5 / 15.0).abs() < 1e-12);
        assert_eq!(ValuationGate::valuation_percentile(20.0, &[20.0, 20.0]), 0.5);
        assert_eq!(ValuationGate::valuation_percentile(20.0, &[]), 0.5);
    }

    #[test]
    fn test_expensive_peg_waits() {
        let result = ValuationGate::default().evaluate(&[ratio(40.0, Some(2.0))]);
        assert!(!result.passed);
        assert_eq!(result.kill_reason.as_deref(), Some("PEG (2.00) > 1.50"));
        assert_eq!(result.detail::<String>("action").as_deref(), Some("WAIT"));
    }

    #[test]
    fn test_missing_peg_passes_without_pegy() {
        let result = ValuationGate::default().evaluate(&[ratio(18.0, None)]);
        assert!(result.passed);
        assert_eq!(result.metric("peg"), Some(0.0));
        assert!(result.metric("pegy").is_none());
        assert_eq!(result.detail::<bool>("peg_attractive"), Some(false));
    }

    #[tokio::test]
    async fn test_sample_proceeds() {
        let result = ValuationGate::default()
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.metric("peg"), Some(1.2));
        assert_eq!(result.detail::<bool>("pegy_attractive"), Some(true));
    }
}
