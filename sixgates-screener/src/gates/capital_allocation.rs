//! Gate 1: Capital Allocation.
//!
//! Judges how management deploys shareholder capital:
//! - share count reduction across the lookback window
//! - net insider share activity over the trailing window
//! - dividend cuts between consecutive periods (the only kill condition)

use async_trait::async_trait;
use chrono::{Months, NaiveDate, Utc};
use tracing::debug;

use sixgates_common::CapitalAllocationThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{
    CashFlowStatement, FinancialDataProvider, IncomeStatement, InsiderStatistic, ProviderError,
};

#[derive(Debug, Clone, Default)]
pub struct CapitalAllocationGate {
    thresholds: CapitalAllocationThresholds,
    /// Evaluation date for the insider window; today when unset
    as_of: Option<NaiveDate>,
}

impl CapitalAllocationGate {
    pub fn new(thresholds: CapitalAllocationThresholds) -> Self {
        Self {
            thresholds,
            as_of: None,
        }
    }

    /// Pin the evaluation date.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    /// Count period-over-period dividend drops beyond the tolerance.
    ///
    /// `dividends` is most-recent-first: each period is compared with the one
    /// before it in time (index `i` against `i + 1`). Signs are ignored.
    pub fn count_dividend_cuts(&self, dividends: &[f64]) -> u32 {
        dividends
            .windows(2)
            .filter(|pair| {
                let current = pair[0].abs();
                let previous = pair[1].abs();
                previous > 0.0 && current < previous * (1.0 - self.thresholds.dividend_cut_tolerance)
            })
            .count() as u32
    }

    /// Net shares acquired by insiders in quarters ending on or after the cutoff.
    pub fn net_insider_shares(&self, insider: &[InsiderStatistic], as_of: NaiveDate) -> f64 {
        let cutoff = as_of
            .checked_sub_months(Months::new(self.thresholds.insider_net_buy_months))
            .unwrap_or(NaiveDate::MIN);

        insider
            .iter()
            .filter(|record| quarter_end(record.year, record.quarter).is_some_and(|d| d >= cutoff))
            .map(|record| record.total_acquired - record.total_disposed)
            .sum()
    }

    /// Fractional reduction of diluted shares, oldest period to newest.
    /// A zero starting count is read as one share.
    fn share_reduction(income: &[IncomeStatement]) -> f64 {
        let newest = income.first().and_then(|i| i.weighted_average_shs_out);
        let oldest = income.last().and_then(|i| i.weighted_average_shs_out);
        match (oldest, newest) {
            (Some(start), Some(end)) => {
                let start = if start == 0.0 { 1.0 } else { start };
                (start - end) / start
            }
            _ => 0.0,
        }
    }

    pub fn evaluate(
        &self,
        income: &[IncomeStatement],
        cash_flow: &[CashFlowStatement],
        insider: &[InsiderStatistic],
        as_of: NaiveDate,
    ) -> GateResult {
        let dividends: Vec<f64> = cash_flow.iter().map(|c| c.common_dividends_paid).collect();
        let dividend_cuts = self.count_dividend_cuts(&dividends);
        let net_insider = self.net_insider_shares(insider, as_of);
        let share_reduction = Self::share_reduction(income);

        let mut reasons = Vec::new();
        if dividend_cuts > 0 {
            reasons.push("Dividend cuts detected".to_string());
        }

        GateResult::from_reasons(
            GateId::CapitalAllocation,
            metrics([
                ("share_reduction_5y", share_reduction),
                ("net_insider_shares_12m", net_insider),
                ("dividend_cuts", f64::from(dividend_cuts)),
            ]),
            reasons,
        )
    }
}

/// Last calendar day of a fiscal quarter, `None` for an invalid quarter.
fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        4 => (12, 31),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

#[async_trait]
impl Gate for CapitalAllocationGate {
    fn id(&self) -> GateId {
        GateId::CapitalAllocation
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let years = self.thresholds.lookback_years;
        let key_metrics = provider.key_metrics(ticker, years).await?;
        let cash_flow = provider.cash_flow(ticker, years).await?;

        if key_metrics.is_empty() || cash_flow.is_empty() {
            return Ok(GateResult::insufficient(self.id()));
        }

        let income = provider.income_statement(ticker, years).await?;
        let insider = provider.insider_trading(ticker).await?;
        let as_of = self.as_of.unwrap_or_else(|| Utc::now().date_naive());

        let result = self.evaluate(&income, &cash_flow, &insider, as_of);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn dividends(values: &[f64]) -> Vec<CashFlowStatement> {
        values
            .iter()
            .map(|v| CashFlowStatement {
                common_dividends_paid: *v,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_single_dividend_cut_most_recent_first() {
        let gate = CapitalAllocationGate::default();
        // Newest period paid 90 after 100: one cut of 10%.
        assert_eq!(gate.count_dividend_cuts(&[-90.0, -100.0, -100.0, -98.0]), 1);
    }

    #[test]
    fn test_dividend_growth_and_small_dips_are_not_cuts() {
        let gate = CapitalAllocationGate::default();
        assert_eq!(gate.count_dividend_cuts(&[-110.0, -105.0, -100.0]), 0);
        assert_eq!(gate.count_dividend_cuts(&[-96.0, -100.0]), 0);
        // A newly initiated dividend is not a cut.
        assert_eq!(gate.count_dividend_cuts(&[-50.0, 0.0]), 0);
    }

    #[test]
    fn test_dividend_cut_kills() {
        let gate = CapitalAllocationGate::default();
        let result = gate.evaluate(&[], &dividends(&[-80.0, -100.0]), &[], as_of());
        assert!(!result.passed);
        assert_eq!(result.metric("dividend_cuts"), Some(1.0));
        assert_eq!(result.kill_reason.as_deref(), Some("Dividend cuts detected"));
    }

    #[test]
    fn test_share_reduction_zero_start_counts_as_one() {
        let shares = |v: &[f64]| -> Vec<IncomeStatement> {
            v.iter()
                .map(|s| IncomeStatement {
                    weighted_average_shs_out: Some(*s),
                    ..Default::default()
                })
                .collect()
        };
        assert_eq!(CapitalAllocationGate::share_reduction(&shares(&[0.5, 0.0])), 0.5);
        assert_eq!(CapitalAllocationGate::share_reduction(&shares(&[90.0, 100.0])), 0.1);
        assert_eq!(CapitalAllocationGate::share_reduction(&[]), 0.0);
    }

    #[test]
    fn test_insider_window() {
        let gate = CapitalAllocationGate::default();
        let insider = vec![
            InsiderStatistic { year: 2024, quarter: 1, total_acquired: 500.0, total_disposed: 100.0 },
            InsiderStatistic { year: 2023, quarter: 3, total_acquired: 0.0, total_disposed: 1_000.0 },
            InsiderStatistic { year: 2022, quarter: 4, total_acquired: 9_000.0, total_disposed: 0.0 },
            InsiderStatistic { year: 2024, quarter: 0, total_acquired: 9_000.0, total_disposed: 0.0 },
        ];
        // Cutoff 2023-06-30: Q3 2023 and Q1 2024 count.
        assert!((gate.net_insider_shares(&insider, as_of()) - (-600.0)).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_sample_passes() {
        let gate = CapitalAllocationGate::default().with_as_of(as_of());
        let result = gate.analyze("AAPL", &FixtureProvider::sample()).await.unwrap();
        assert!(result.passed);
        assert_eq!(result.metric("dividend_cuts"), Some(0.0));
        let reduction = result.metric("share_reduction_5y").unwrap();
        assert!(reduction > 0.14 && reduction < 0.15);
        // Q4 2023: 5,000 acquired, 10,000 disposed.
        assert_eq!(result.metric("net_insider_shares_12m"), Some(-5_000.0));
    }
}
