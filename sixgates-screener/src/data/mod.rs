//! Financial data module.
//!
//! Typed period records for the fundamentals the gates read, plus the
//! provider capability and its two variants.
//!
//! # Data Sources
//! - **FMP** (live): Financial Modeling Prep REST API
//! - **Fixture** (deterministic): in-memory dataset for tests and dry runs
//!
//! Every statement series is ordered most-recent-first, as the vendor returns it.

mod fixture;
mod fmp;
mod provider;

pub use fixture::FixtureProvider;
pub use fmp::{FmpAdapter, SOFT_STATUS_CODES};
pub use provider::{FinancialDataProvider, ProviderError};

use serde::{Deserialize, Deserializer, Serialize};

/// Vendor payloads send `null` where a value is unknown; read it as the default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Statements
// ============================================================================

/// One annual income statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IncomeStatement {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub revenue: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub operating_income: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub net_income: f64,
    /// Absent is distinct from zero: absent is treated as 1.0
    pub interest_expense: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub ebitda: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub eps: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub income_tax_expense: f64,
    pub income_before_tax: Option<f64>,
    pub weighted_average_shs_out: Option<f64>,
}

/// One annual balance sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BalanceSheet {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    pub total_assets: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub net_receivables: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub short_term_debt: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub long_term_debt: f64,
}

/// One annual cash flow statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowStatement {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub free_cash_flow: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub operating_cash_flow: f64,
    /// Usually reported negative
    #[serde(deserialize_with = "null_as_default")]
    pub capital_expenditure: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub depreciation_and_amortization: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub change_in_working_capital: f64,
    /// Usually reported negative
    #[serde(alias = "dividendsPaid", deserialize_with = "null_as_default")]
    pub common_dividends_paid: f64,
}

/// Vendor-computed per-period metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyMetrics {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(alias = "roic", deserialize_with = "null_as_default")]
    pub return_on_invested_capital: f64,
    #[serde(rename = "netDebtToEBITDA", deserialize_with = "null_as_default")]
    pub net_debt_to_ebitda: f64,
    pub invested_capital: Option<f64>,
}

/// Vendor-computed valuation and profitability ratios.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ratios {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(alias = "priceEarningsRatio")]
    pub price_to_earnings_ratio: Option<f64>,
    #[serde(rename = "priceToEarningsGrowthRatio", alias = "pegRatio")]
    pub peg_ratio: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub dividend_yield: f64,
    #[serde(alias = "priceToFreeCashFlowsRatio", deserialize_with = "null_as_default")]
    pub price_to_free_cash_flow_ratio: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub gross_profit_margin: f64,
}

// ============================================================================
// Activity, estimates, news
// ============================================================================

/// Aggregated insider activity for one calendar quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsiderStatistic {
    #[serde(deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub quarter: u32,
    /// Shares acquired (purchases and grants)
    #[serde(deserialize_with = "null_as_default")]
    pub total_acquired: f64,
    /// Shares disposed (sales and gifts)
    #[serde(deserialize_with = "null_as_default")]
    pub total_disposed: f64,
}

/// Forward analyst estimate for one fiscal period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalystEstimate {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(alias = "estimatedEpsAvg", deserialize_with = "null_as_default")]
    pub eps_avg: f64,
    #[serde(alias = "estimatedRevenueAvg", deserialize_with = "null_as_default")]
    pub revenue_avg: f64,
    #[serde(alias = "numberAnalystsEstimatedEps", deserialize_with = "null_as_default")]
    pub num_analysts_eps: u32,
}

/// News article about a ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsArticle {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(alias = "content", deserialize_with = "null_as_default")]
    pub text: String,
    pub published_date: Option<String>,
    pub url: Option<String>,
}

impl NewsArticle {
    /// Title and body joined for keyword scoring.
    pub fn full_text(&self) -> String {
        format!("{} {}", self.title, self.text).trim().to_string()
    }
}

// ============================================================================
// Market data
// ============================================================================

/// Latest quote with moving averages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quote {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub price_avg_50: Option<f64>,
    pub price_avg_200: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub volume: f64,
    pub market_cap: Option<f64>,
    pub pe: Option<f64>,
}

/// Daily close.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalPrice {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub close: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub volume: f64,
}

// ============================================================================
// Optional enrichments
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyProfile {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    pub company_name: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "mktCap")]
    pub market_cap: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectorPerformance {
    #[serde(deserialize_with = "null_as_default")]
    pub sector: String,
    #[serde(deserialize_with = "null_as_default")]
    pub changes_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EsgData {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub environmental_score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub social_score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub governance_score: f64,
    #[serde(rename = "ESGScore", alias = "esgScore", deserialize_with = "null_as_default")]
    pub esg_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EarningsTranscript {
    #[serde(deserialize_with = "null_as_default")]
    pub symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    pub year: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub quarter: u32,
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub content: String,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_metrics_accepts_roic_alias() {
        let m: KeyMetrics =
            serde_json::from_str(r#"{"roic": 0.28, "netDebtToEBITDA": 0.8}"#).unwrap();
        assert!((m.return_on_invested_capital - 0.28).abs() < f64::EPSILON);
        assert!((m.net_debt_to_ebitda - 0.8).abs() < f64::EPSILON);
        assert!(m.invested_capital.is_none());
    }

    #[test]
    fn test_ratios_accept_legacy_spellings() {
        let r: Ratios = serde_json::from_str(
            r#"{"priceEarningsRatio": 28.5, "pegRatio": 1.2, "priceToFreeCashFlowsRatio": 25.0}"#,
        )
        .unwrap();
        assert_eq!(r.price_to_earnings_ratio, Some(28.5));
        assert_eq!(r.peg_ratio, Some(1.2));
        assert!((r.price_to_free_cash_flow_ratio - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_interest_expense_stays_absent() {
        let i: IncomeStatement =
            serde_json::from_str(r#"{"revenue": 100.0, "operatingIncome": 20.0}"#).unwrap();
        assert!(i.interest_expense.is_none());
        assert!((i.ebitda - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_news_full_text() {
        let a = NewsArticle {
            title: "Record quarter".into(),
            text: "".into(),
            ..Default::default()
        };
        assert_eq!(a.full_text(), "Record quarter");
    }
}
