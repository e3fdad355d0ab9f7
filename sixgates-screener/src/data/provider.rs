//! Data provider abstraction for fundamental data.
//!
//! Defines the `FinancialDataProvider` trait that every data source implements,
//! so gates and assessors depend only on the capability, never on a vendor.
//!
//! Contract: an empty series (or `None` for the optional enrichments) means
//! "unavailable" and is never an error. Only transport failures surface as
//! `ProviderError`.

use async_trait::async_trait;
use std::fmt;

use super::{
    AnalystEstimate, BalanceSheet, CashFlowStatement, CompanyProfile, EarningsTranscript,
    EsgData, HistoricalPrice, IncomeStatement, InsiderStatistic, KeyMetrics, NewsArticle, Quote,
    Ratios, SectorPerformance,
};

// ============================================================================
// Provider Error
// ============================================================================

/// Transport-level failures of a data provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Network error (connection failed, timeout)
    Network(String),
    /// Vendor answered with a non-success status outside the soft list
    Http { status: u16, body: String },
    /// Rate limit exceeded (HTTP 429)
    RateLimited { retry_after_secs: Option<u64> },
    /// Response body did not match the expected record shape
    Decode(String),
    /// Authentication error (missing or rejected key)
    Auth(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
            Self::RateLimited { retry_after_secs } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after_secs {
                    write!(f, ", retry after {} seconds", secs)?;
                }
                Ok(())
            }
            Self::Decode(msg) => write!(f, "Decode error: {}", msg),
            Self::Auth(msg) => write!(f, "Authentication error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    /// Check if the error is recoverable (worth retrying by the caller)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
            || matches!(self, Self::Http { status, .. } if *status >= 500)
    }

    /// Check if this is a soft status the live adapter maps to "unavailable".
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Http { status, .. } if super::SOFT_STATUS_CODES.contains(status))
    }
}

// ============================================================================
// Financial Data Provider Trait
// ============================================================================

/// Capability consumed by every gate and by the market assessors.
///
/// Statement series are most-recent-first and hold at most `limit` periods.
#[async_trait]
pub trait FinancialDataProvider: Send + Sync {
    /// Provider name for logging (e.g., "fmp", "fixture")
    fn name(&self) -> &'static str;

    async fn income_statement(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<IncomeStatement>, ProviderError>;

    async fn balance_sheet(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<BalanceSheet>, ProviderError>;

    async fn cash_flow(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<CashFlowStatement>, ProviderError>;

    async fn key_metrics(&self, ticker: &str, limit: usize)
        -> Result<Vec<KeyMetrics>, ProviderError>;

    async fn ratios(&self, ticker: &str, limit: usize) -> Result<Vec<Ratios>, ProviderError>;

    /// Quarterly insider statistics, most recent quarter first.
    async fn insider_trading(&self, ticker: &str) -> Result<Vec<InsiderStatistic>, ProviderError>;

    async fn analyst_estimates(&self, ticker: &str)
        -> Result<Vec<AnalystEstimate>, ProviderError>;

    async fn stock_news(&self, ticker: &str, limit: usize)
        -> Result<Vec<NewsArticle>, ProviderError>;

    /// Latest quote; `None` when the vendor knows no such symbol.
    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, ProviderError>;

    async fn historical_prices(&self, ticker: &str)
        -> Result<Vec<HistoricalPrice>, ProviderError>;

    async fn sector_performance(&self) -> Result<Vec<SectorPerformance>, ProviderError>;

    async fn company_profile(&self, ticker: &str)
        -> Result<Option<CompanyProfile>, ProviderError>;

    async fn esg_data(&self, ticker: &str) -> Result<Option<EsgData>, ProviderError>;

    /// Earnings call transcript; latest available when year/quarter are omitted.
    async fn earning_call_transcript(
        &self,
        ticker: &str,
        year: Option<i32>,
        quarter: Option<u32>,
    ) -> Result<Option<EarningsTranscript>, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_recoverable() {
        assert!(ProviderError::Network("timeout".into()).is_recoverable());
        assert!(ProviderError::RateLimited { retry_after_secs: Some(60) }.is_recoverable());
        assert!(ProviderError::Http { status: 503, body: String::new() }.is_recoverable());
        assert!(!ProviderError::Http { status: 400, body: String::new() }.is_recoverable());
        assert!(!ProviderError::Auth("invalid key".into()).is_recoverable());
        assert!(!ProviderError::Decode("bad json".into()).is_recoverable());
    }

    #[test]
    fn test_provider_error_soft_statuses() {
        for status in [402, 403, 404] {
            assert!(ProviderError::Http { status, body: String::new() }.is_soft());
        }
        assert!(!ProviderError::Http { status: 500, body: String::new() }.is_soft());
        assert!(!ProviderError::RateLimited { retry_after_secs: None }.is_soft());
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(err.to_string().contains("30 seconds"));

        let err = ProviderError::Http {
            status: 500,
            body: "upstream".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: upstream");
    }
}
