//! Gate 3: Cash Integrity.
//!
//! Checks that reported earnings turn into cash:
//! - FCF conversion: summed FCF over summed net income for the recent periods
//! - accruals ratio: (net income - operating cash flow) / total assets
//! - receivables divergence: receivables growth minus revenue growth

use async_trait::async_trait;
use tracing::debug;

use sixgates_common::CashIntegrityThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{
    BalanceSheet, CashFlowStatement, FinancialDataProvider, IncomeStatement, ProviderError,
};
use crate::stats::safe_div;

#[derive(Debug, Clone, Default)]
pub struct CashIntegrityGate {
    thresholds: CashIntegrityThresholds,
}

impl CashIntegrityGate {
    pub fn new(thresholds: CashIntegrityThresholds) -> Self {
        Self { thresholds }
    }

    fn fcf_conversion(&self, cash_flow: &[CashFlowStatement], income: &[IncomeStatement]) -> f64 {
        let periods = self.thresholds.conversion_years.min(cash_flow.len());
        let total_fcf: f64 = cash_flow.iter().take(periods).map(|c| c.free_cash_flow).sum();
        let total_ni: f64 = income.iter().take(periods).map(|i| i.net_income).sum();
        safe_div(total_fcf, total_ni, 0.0)
    }

    fn accruals_ratio(cash_flow: &CashFlowStatement, income: &IncomeStatement, balance: &BalanceSheet) -> f64 {
        let assets = balance
            .total_assets
            .filter(|a| *a != 0.0)
            .unwrap_or(1.0);
        (income.net_income - cash_flow.operating_cash_flow) / assets
    }

    /// Receivables growth minus revenue growth between the two latest periods.
    fn receivables_divergence(balance: &[BalanceSheet], income: &[IncomeStatement]) -> f64 {
        match (balance, income) {
            ([b0, b1, ..], [i0, i1, ..]) => {
                let ar_growth = (b0.net_receivables - b1.net_receivables) / nonzero(b1.net_receivables);
                let revenue_growth = (i0.revenue - i1.revenue) / nonzero(i1.revenue);
                ar_growth - revenue_growth
            }
            _ => 0.0,
        }
    }

    /// All three series are most-recent-first and non-empty.
    pub fn evaluate(
        &self,
        cash_flow: &[CashFlowStatement],
        income: &[IncomeStatement],
        balance: &[BalanceSheet],
    ) -> GateResult {
        let (Some(cf), Some(inc), Some(bs)) = (cash_flow.first(), income.first(), balance.first())
        else {
            return GateResult::insufficient(GateId::CashIntegrity);
        };

        let t = &self.thresholds;
        let fcf_conversion = self.fcf_conversion(cash_flow, income);
        let accruals_ratio = Self::accruals_ratio(cf, inc, bs);
        let receivables_divergence = Self::receivables_divergence(balance, income);

        let mut reasons = Vec::new();
        if fcf_conversion < t.min_fcf_conversion {
            reasons.push(format!(
                "FCF Conversion ({:.2}%) below {:.0}%",
                fcf_conversion * 100.0,
                t.min_fcf_conversion * 100.0
            ));
        }
        if accruals_ratio > t.max_accruals_ratio {
            reasons.push(format!("Accruals ratio ({:.2}) high", accruals_ratio));
        }
        if receivables_divergence > t.max_receivables_divergence {
            reasons.push(format!(
                "Receivables grew faster than revenue ({:.2}% divergence)",
                receivables_divergence * 100.0
            ));
        }

        GateResult::from_reasons(
            GateId::CashIntegrity,
            metrics([
                ("fcf_conversion", fcf_conversion),
                ("accruals_ratio", accruals_ratio),
                ("receivables_divergence", receivables_divergence),
            ]),
            reasons,
        )
    }
}

fn nonzero(value: f64) -> f64 {
    if value == 0.0 {
        1.0
    } else {
        value
    }
}

#[async_trait]
impl Gate for CashIntegrityGate {
    fn id(&self) -> GateId {
        GateId::CashIntegrity
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let years = self.thresholds.lookback_years;
        let cash_flow = provider.cash_flow(ticker, years).await?;
        let income = provider.income_statement(ticker, years).await?;
        let balance = provider.balance_sheet(ticker, years).await?;

        let result = self.evaluate(&cash_flow, &income, &balance);
        debug!(ticker = ticker, gate = %self.id(), metrics = ?result.metrics, "Gate evaluated");
        Ok(result)
    }
}
