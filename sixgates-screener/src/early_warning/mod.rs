//! Macro early-warning risk assessment.
//!
//! Scores systemic risk from volatility, the 10Y-2Y yield spread and
//! inflation. Independent of the per-ticker gates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use sixgates_common::MacroRiskThresholds;

use crate::data::{FinancialDataProvider, ProviderError};

const MAX_SCORE: u32 = 100;

/// Systemic risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 60 {
            Self::High
        } else if score >= 30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads the macro inputs through the data provider.
pub struct MacroMonitor {
    thresholds: MacroRiskThresholds,
}

impl MacroMonitor {
    pub fn new(thresholds: MacroRiskThresholds) -> Self {
        Self { thresholds }
    }

    async fn price(
        &self,
        provider: &dyn FinancialDataProvider,
        ticker: &str,
    ) -> Result<f64, ProviderError> {
        let price = provider.quote(ticker).await?.and_then(|q| q.price);
        if price.is_none() {
            warn!(ticker = ticker, "Macro series unavailable");
        }
        Ok(price.unwrap_or(0.0))
    }

    /// Volatility index level, 0 when unavailable.
    pub async fn vix_level(&self, provider: &dyn FinancialDataProvider) -> Result<f64, ProviderError> {
        self.price(provider, &self.thresholds.vix_ticker).await
    }

    /// 10Y minus 2Y yield rounded to 3 dp; 0 when either leg is missing.
    pub async fn yield_spread(
        &self,
        provider: &dyn FinancialDataProvider,
    ) -> Result<f64, ProviderError> {
        let ten = self.price(provider, &self.thresholds.ten_year_ticker).await?;
        let two = self.price(provider, &self.thresholds.two_year_ticker).await?;
        if ten == 0.0 || two == 0.0 {
            return Ok(0.0);
        }
        Ok(((ten - two) * 1000.0).round() / 1000.0)
    }

    /// Configured year-over-year CPI, in percent.
    pub fn inflation_rate(&self) -> f64 {
        self.thresholds.inflation_rate
    }
}

/// One systemic-risk reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub vix: f64,
    pub yield_spread_10y_2y: f64,
    pub inflation: f64,
    pub systemic_risk_score: u32,
    pub risk_level: RiskLevel,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// VIX up to 40, yield curve up to 40, inflation up to 20; capped at 100.
    pub fn score(vix: f64, spread: f64, inflation: f64) -> u32 {
        let vix_points = if vix > 30.0 {
            40
        } else if vix > 20.0 {
            20
        } else if vix > 15.0 {
            10
        } else {
            0
        };

        let curve_points = if spread < 0.0 {
            40
        } else if spread < 0.2 {
            20
        } else {
            0
        };

        let inflation_points = if inflation > 5.0 {
            20
        } else if inflation > 3.0 {
            10
        } else {
            0
        };

        (vix_points + curve_points + inflation_points).min(MAX_SCORE)
    }

    pub fn from_inputs(vix: f64, spread: f64, inflation: f64) -> Self {
        let score = Self::score(vix, spread, inflation);
        Self {
            vix,
            yield_spread_10y_2y: spread,
            inflation,
            systemic_risk_score: score,
            risk_level: RiskLevel::from_score(score),
            assessed_at: Utc::now(),
        }
    }

    pub async fn assess(
        monitor: &MacroMonitor,
        provider: &dyn FinancialDataProvider,
    ) -> Result<Self, ProviderError> {
        let vix = monitor.vix_level(provider).await?;
        let spread = monitor.yield_spread(provider).await?;
        let assessment = Self::from_inputs(vix, spread, monitor.inflation_rate());

        debug!(
            vix,
            spread,
            score = assessment.systemic_risk_score,
            level = %assessment.risk_level,
            "Macro risk assessed"
        );
        Ok(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FixtureProvider, Quote};
    use test_case::test_case;

    fn quote(symbol: &str, price: f64) -> Option<Quote> {
        Some(Quote {
            symbol: symbol.into(),
            price: Some(price),
            ..Default::default()
        })
    }

    #[test_case(12.0, 1.0, 2.0, 0 ; "calm")]
    #[test_case(16.0, 0.1, 3.5, 40 ; "elevated")]
    #[test_case(35.0, -0.5, 6.0, 100 ; "stressed")]
    #[test_case(30.0, 0.2, 3.0, 20 ; "boundaries are strict")]
    fn test_score(vix: f64, spread: f64, inflation: f64, expected: u32) {
        assert_eq!(RiskAssessment::score(vix, spread, inflation), expected);
    }

    #[test]
    fn test_levels() {
        assert_eq!(RiskLevel::from_score(60), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(29), RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_missing_series_default_to_zero() {
        // spread 0 -> 20, inflation 3.5 -> 10
        let monitor = MacroMonitor::new(MacroRiskThresholds::default());
        let a = RiskAssessment::assess(&monitor, &FixtureProvider::empty()).await.unwrap();
        assert_eq!(a.vix, 0.0);
        assert_eq!(a.yield_spread_10y_2y, 0.0);
        assert_eq!(a.systemic_risk_score, 30);
        assert_eq!(a.risk_level, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_inverted_curve_is_high() {
        let provider = FixtureProvider::empty()
            .with_quote_for("^VIX", quote("^VIX", 18.0))
            .with_quote_for("10Y", quote("10Y", 4.1234))
            .with_quote_for("2Y", quote("2Y", 4.5));
        let monitor = MacroMonitor::new(MacroRiskThresholds::default());

        assert_eq!(monitor.yield_spread(&provider).await.unwrap(), -0.377);

        let a = RiskAssessment::assess(&monitor, &provider).await.unwrap();
        // 10 + 40 + 10
        assert_eq!(a.systemic_risk_score, 60);
        assert_eq!(a.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let provider = FixtureProvider::empty().with_failure("quote", ProviderError::Network("reset".into()));
        let monitor = MacroMonitor::new(MacroRiskThresholds::default());
        assert!(RiskAssessment::assess(&monitor, &provider).await.is_err());
    }
}
