//! Gate 2.5: Capital Structure.
//!
//! Leverage, interest coverage, near-term maturities and a revenue-shock
//! stress test, all on the latest period.

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::CapitalStructureThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{BalanceSheet, FinancialDataProvider, IncomeStatement, KeyMetrics, ProviderError};
use crate::stats::safe_div;

/// Coverage reported when there is no interest to cover.
pub const UNCOVERED_INTEREST_COVERAGE: f64 = 100.0;

/// Interest expense assumed when the vendor omits the line.
const MISSING_INTEREST_EXPENSE: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct CapitalStructureGate {
    thresholds: CapitalStructureThresholds,
}

impl CapitalStructureGate {
    pub fn new(thresholds: CapitalStructureThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate the latest period of each series. All three must be non-empty.
    pub fn evaluate(
        &self,
        key_metrics: &KeyMetrics,
        income: &IncomeStatement,
        balance: &BalanceSheet,
    ) -> GateResult {
        let t = &self.thresholds;

        let net_debt_ebitda = key_metrics.net_debt_to_ebitda;

        let interest_expense = income.interest_expense.unwrap_or(MISSING_INTEREST_EXPENSE);
        let interest_coverage = safe_div(
            income.operating_income,
            interest_expense,
            UNCOVERED_INTEREST_COVERAGE,
        );

        // Short-term debt share stands in for the maturity schedule.
        let total_debt = balance.short_term_debt + balance.long_term_debt;
        let debt_due_pct = if total_debt > 0.0 {
            balance.short_term_debt / total_debt
        } else {
            0.0
        };

        let stress_ebitda = income.ebitda * (1.0 - t.stress_test_revenue_drop);

        let mut reasons = Vec::new();
        if net_debt_ebitda > t.max_net_debt_ebitda {
            reasons.push(format!(
                "Net Debt/EBITDA ({:.2}x) exceeds limit {:.1}x",
                net_debt_ebitda, t.max_net_debt_ebitda
            ));
        }
        if interest_coverage < t.min_interest_coverage {
            reasons.push(format!(
                "Interest Coverage ({:.2}x) below min {:.1}x",
                interest_coverage, t.min_interest_coverage
            ));
        }
        if debt_due_pct > t.max_debt_due_pct {
            reasons.push(format!(
                "Short Term Debt ({:.0}%) exceeds safe limit",
                debt_due_pct * 100.0
            ));
        }
        if stress_ebitda <= interest_expense {
            reasons.push("Failed revenue stress test".to_string());
        }

        GateResult::from_reasons(
            GateId::CapitalStructure,
            metrics([
                ("net_debt_ebitda", net_debt_ebitda),
                ("interest_coverage", interest_coverage),
                ("debt_due_pct", debt_due_pct),
                ("stress_ebitda", stress_ebitda),
                ("interest_expense", interest_expense),
            ]),
            reasons,
        )
    }
}

#[async_trait]
impl Gate for CapitalStructureGate {
    fn id(&self) -> GateId {
        GateId::CapitalStructure
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let years = self.thresholds.lookback_years;
        let key_metrics = provider.key_metrics(ticker, years).await?;
        let income = provider.income_statement(ticker, years).await?;
        let balance = provider.balance_sheet(ticker, years).await?;

        let (Some(latest_metrics), Some(latest_income), Some(latest_balance)) =
            (key_metrics.first(), income.first(), balance.first())
        else {
            return Ok(GateResult::insufficient(self.id()));
        };

        let result = self.evaluate(latest_metrics, latest_income, latest_balance);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;

    fn healthy() -> (KeyMetrics, IncomeStatement, BalanceSheet) {
        (
            KeyMetrics {
                net_debt_to_ebitda: 1.0,
                ..Default::default()
            },
            IncomeStatement {
                operating_income: 100.0,
                interest_expense: Some(10.0),
                ebitda: 120.0,
                ..Default::default()
            },
            BalanceSheet {
                short_term_debt: 20.0,
                long_term_debt: 80.0,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_healthy_structure_passes() {
        let (m, i, b) = healthy();
        let result = CapitalStructureGate::default().evaluate(&m, &i, &b);
        assert!(result.passed);
        assert_eq!(result.metric("interest_coverage"), Some(10.0));
        assert!((result.metric("debt_due_pct").unwrap() - 0.2).abs() < 1e-12);
        assert!((result.metric("stress_ebitda").unwrap() - 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_interest_uses_large_coverage() {
        let (m, mut i, b) = healthy();
        i.interest_expense = Some(0.0);
        let result = CapitalStructureGate::default().evaluate(&m, &i, &b);
        assert_eq!(result.metric("interest_coverage"), Some(UNCOVERED_INTEREST_COVERAGE));
        assert!(result.passed);
    }

    #[test]
    fn test_missing_interest_defaults_to_one() {
        let (m, mut i, b) = healthy();
        i.interest_expense = None;
        let result = CapitalStructureGate::default().evaluate(&m, &i, &b);
        assert_eq!(result.metric("interest_expense"), Some(1.0));
        assert_eq!(result.metric("interest_coverage"), Some(100.0));
    }

    #[test]
    fn test_every_breach_is_reported() {
        let m = KeyMetrics {
            net_debt_to_ebitda: 4.5,
            ..Default::default()
        };
        let i = IncomeStatement {
            operating_income: 20.0,
            interest_expense: Some(20.0),
            ebitda: 25.0,
            ..Default::default()
        };
        let b = BalanceSheet {
            short_term_debt: 50.0,
            long_term_debt: 50.0,
            ..Default::default()
        };
        let result = CapitalStructureGate::default().evaluate(&m, &i, &b);
        assert!(!result.passed);
        let reason = result.kill_reason.unwrap();
        assert_eq!(reason.split("; ").count(), 4);
        assert!(reason.contains("Net Debt/EBITDA (4.50x)"));
        assert!(reason.contains("Failed revenue stress test"));
    }

    #[tokio::test]
    async fn test_sample_passes() {
        let result = CapitalStructureGate::default()
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.metric("interest_coverage").unwrap() > 29.0);
    }
}
