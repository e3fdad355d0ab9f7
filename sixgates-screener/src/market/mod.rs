//! Market regime assessment.
//!
//! One benchmark quote (price against its 200-day average) plus the
//! benchmark's trailing P/E give a phase, a 0-100 risk score and a hurdle
//! adjustment. Assessment never fails: missing benchmark data yields
//! [`MarketContext::neutral`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use sixgates_common::{MarketThresholds, Validate, ValidationResult};

use crate::data::FinancialDataProvider;

const BASE_RISK_SCORE: f64 = 50.0;
const BEAR_RISK: f64 = 20.0;
const EXPENSIVE_RISK: f64 = 10.0;
const CHEAP_RELIEF: f64 = 10.0;

/// Hurdle added when risk is elevated, subtracted when it is low.
const HIGH_RISK_ABOVE: f64 = 70.0;
const HIGH_RISK_ADJUSTMENT: f64 = 0.02;
const LOW_RISK_BELOW: f64 = 40.0;
const LOW_RISK_ADJUSTMENT: f64 = -0.01;

/// Market cycle phase. Only `Bull` and `Bear` are produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketPhase {
    Accumulation,
    Bull,
    Distribution,
    Bear,
    Crash,
}

impl MarketPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accumulation => "accumulation",
            Self::Bull => "bull",
            Self::Distribution => "distribution",
            Self::Bear => "bear",
            Self::Crash => "crash",
        }
    }
}

impl fmt::Display for MarketPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Regime snapshot, computed fresh per assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
    pub phase: MarketPhase,
    /// 0..=100, higher means more crash risk
    pub risk_score: f64,
    pub discount_rate_adjustment: f64,
    pub metrics: BTreeMap<String, f64>,
    /// Set when the assessment fell back to neutral
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MarketContext {
    /// Bull, risk 50, no adjustment.
    pub fn neutral() -> Self {
        Self {
            phase: MarketPhase::Bull,
            risk_score: BASE_RISK_SCORE,
            discount_rate_adjustment: 0.0,
            metrics: BTreeMap::new(),
            note: None,
        }
    }

    fn unavailable(reason: String) -> Self {
        Self {
            note: Some(reason),
            ..Self::neutral()
        }
    }
}

pub struct MarketContextAssessor {
    thresholds: MarketThresholds,
}

impl MarketContextAssessor {
    pub fn new(thresholds: MarketThresholds) -> ValidationResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn risk_score(&self, phase: MarketPhase, pe: f64) -> f64 {
        let mut score = BASE_RISK_SCORE;
        if phase == MarketPhase::Bear {
            score += BEAR_RISK;
        }
        if pe > self.thresholds.pe_high {
            score += EXPENSIVE_RISK;
        }
        if pe < self.thresholds.pe_low {
            score -= CHEAP_RELIEF;
        }
        score.clamp(0.0, 100.0)
    }

    pub fn discount_rate_adjustment(risk_score: f64) -> f64 {
        if risk_score > HIGH_RISK_ABOVE {
            HIGH_RISK_ADJUSTMENT
        } else if risk_score < LOW_RISK_BELOW {
            LOW_RISK_ADJUSTMENT
        } else {
            0.0
        }
    }

    /// Pure regime computation from benchmark price, 200-day average and P/E.
    pub fn context_from(&self, price: f64, sma200: f64, pe: f64) -> MarketContext {
        let phase = if price > sma200 {
            MarketPhase::Bull
        } else {
            MarketPhase::Bear
        };
        let risk_score = self.risk_score(phase, pe);

        MarketContext {
            phase,
            risk_score,
            discount_rate_adjustment: Self::discount_rate_adjustment(risk_score),
            metrics: [
                ("benchmark_price", price),
                ("benchmark_sma200", sma200),
                ("market_pe", pe),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            note: None,
        }
    }

    pub async fn assess(&self, provider: &dyn FinancialDataProvider) -> MarketContext {
        let ticker = self.thresholds.benchmark_ticker.as_str();

        let quote = match provider.quote(ticker).await {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                warn!(benchmark = ticker, "Benchmark quote unavailable, using neutral market context");
                return MarketContext::unavailable(format!("{ticker} data unavailable"));
            }
            Err(e) => {
                warn!(benchmark = ticker, error = %e, "Benchmark quote failed, using neutral market context");
                return MarketContext::unavailable(format!("{ticker} data unavailable: {e}"));
            }
        };

        let Some(price) = quote.price.filter(|p| *p > 0.0) else {
            warn!(benchmark = ticker, "Benchmark quote has no price, using neutral market context");
            return MarketContext::unavailable(format!("{ticker} data unavailable"));
        };
        let sma200 = quote.price_avg_200.unwrap_or(price);

        let pe = match provider.ratios(ticker, 1).await {
            Ok(ratios) => ratios.first().and_then(|r| r.price_to_earnings_ratio),
            Err(e) => {
                warn!(benchmark = ticker, error = %e, "Benchmark ratios failed, using default P/E");
                None
            }
        }
        .unwrap_or(self.thresholds.default_pe);

        let context = self.context_from(price, sma200, pe);
        debug!(
            benchmark = ticker,
            phase = %context.phase,
            risk_score = context.risk_score,
            adjustment = context.discount_rate_adjustment,
            "Market context assessed"
        );
        context
    }
}
