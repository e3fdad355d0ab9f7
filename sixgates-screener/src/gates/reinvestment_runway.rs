//! Gate 2.75: Reinvestment Runway.
//!
//! Estimates how much of after-tax operating profit is reinvested and the
//! return earned on the capital added. Never kills; the resulting category
//! feeds tier classification.
//!
//! - NOPAT = EBIT x (1 - tax rate), tax rate = tax expense / pre-tax income
//! - reinvestment rate = (capex - D&A + change in working capital) / NOPAT
//! - incremental ROIC = change in NOPAT / change in invested capital, oldest to newest

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::{ReinvestmentRunwayThresholds, RunwayCategory};

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{
    CashFlowStatement, FinancialDataProvider, IncomeStatement, KeyMetrics, ProviderError,
};
use crate::stats::safe_div;

/// Statutory rate assumed when pre-tax income is missing or zero.
pub const FALLBACK_TAX_RATE: f64 = 0.21;

/// Invested capital assumed when the vendor omits it.
const MISSING_INVESTED_CAPITAL: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct ReinvestmentRunwayGate {
    thresholds: ReinvestmentRunwayThresholds,
}

impl ReinvestmentRunwayGate {
    pub fn new(thresholds: ReinvestmentRunwayThresholds) -> Self {
        Self { thresholds }
    }

    /// Map the two ratios onto a runway band, strongest band first.
    pub fn categorize(&self, reinvestment_rate: f64, incremental_roic: f64) -> RunwayCategory {
        let t = &self.thresholds;
        if reinvestment_rate > t.long_runway_reinvestment
            && incremental_roic > t.long_runway_incremental_roic
        {
            RunwayCategory::LongRunway
        } else if reinvestment_rate > t.medium_runway_reinvestment
            && incremental_roic > t.medium_runway_incremental_roic
        {
            RunwayCategory::MediumRunway
        } else if reinvestment_rate > t.limited_runway_reinvestment {
            RunwayCategory::LimitedRunway
        } else {
            RunwayCategory::Mature
        }
    }

    /// All three series are most-recent-first and non-empty.
    pub fn evaluate(
        &self,
        key_metrics: &[KeyMetrics],
        income: &[IncomeStatement],
        cash_flow: &[CashFlowStatement],
    ) -> GateResult {
        let (Some(latest_cf), Some(newest_income), Some(oldest_income)) =
            (cash_flow.first(), income.first(), income.last())
        else {
            return GateResult::advisory_insufficient(GateId::ReinvestmentRunway);
        };

        let capex = latest_cf.capital_expenditure.abs();
        let reinvestment = capex - latest_cf.depreciation_and_amortization
            + latest_cf.change_in_working_capital;

        let end_nopat = nopat(newest_income);
        let reinvestment_rate = if end_nopat > 0.0 {
            reinvestment / end_nopat
        } else {
            0.0
        };

        let start_nopat = nopat(oldest_income);
        let invested = |m: Option<&KeyMetrics>| {
            m.and_then(|m| m.invested_capital)
                .unwrap_or(MISSING_INVESTED_CAPITAL)
        };
        let delta_ic = invested(key_metrics.first()) - invested(key_metrics.last());
        let incremental_roic = safe_div(end_nopat - start_nopat, delta_ic, 0.0);

        let nopat_growth = if start_nopat > 0.0 {
            (end_nopat - start_nopat) / start_nopat
        } else {
            0.0
        };

        let category = self.categorize(reinvestment_rate, incremental_roic);

        GateResult::advisory(
            GateId::ReinvestmentRunway,
            metrics([
                ("reinvestment_rate", reinvestment_rate),
                ("incremental_roic", incremental_roic),
                ("nopat_growth", nopat_growth),
            ]),
        )
        .with_detail("runway_category", category.as_str())
    }
}

/// Net operating profit after tax for one period.
fn nopat(income: &IncomeStatement) -> f64 {
    let tax_rate = match income.income_before_tax {
        Some(pre_tax) if pre_tax != 0.0 => income.income_tax_expense / pre_tax,
        _ => FALLBACK_TAX_RATE,
    };
    income.operating_income * (1.0 - tax_rate)
}

#[async_trait]
impl Gate for ReinvestmentRunwayGate {
    fn id(&self) -> GateId {
        GateId::ReinvestmentRunway
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let years = self.thresholds.lookback_years;
        let key_metrics = provider.key_metrics(ticker, years).await?;
        let income = provider.income_statement(ticker, years).await?;
        let cash_flow = provider.cash_flow(ticker, years).await?;

        if key_metrics.is_empty() || income.is_empty() || cash_flow.is_empty() {
            return Ok(GateResult::advisory_insufficient(self.id()));
        }

        let result = self.evaluate(&key_metrics, &income, &cash_flow);
        debug!(
            ticker = ticker,
            gate = %self.id(),
            metrics = ?result.metrics,
            runway = ?result.details.get("runway_category"),
            "Gate evaluated"
        );
        Ok(result)
    }
}
