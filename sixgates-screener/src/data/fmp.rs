//! Financial Modeling Prep adapter.
//!
//! # API Documentation
//! https://site.financialmodelingprep.com/developer/docs/stable
//!
//! # Status Handling
//! - 402 / 403 / 404: endpoint not in the subscription or symbol unknown,
//!   mapped to an empty result
//! - 401: `ProviderError::Auth`
//! - 429: `ProviderError::RateLimited`
//! - any other non-success: `ProviderError::Http`
//!
//! Insider statistics, news and the optional enrichments are best-effort:
//! every failure there degrades to an empty result.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use sixgates_common::config::FmpConfig;
use sixgates_common::util::{sanitize_for_log, truncate_with_ellipsis};

use super::provider::{FinancialDataProvider, ProviderError};
use super::{
    AnalystEstimate, BalanceSheet, CashFlowStatement, CompanyProfile, EarningsTranscript,
    EsgData, HistoricalPrice, IncomeStatement, InsiderStatistic, KeyMetrics, NewsArticle, Quote,
    Ratios, SectorPerformance,
};

/// Statuses that mean "unavailable" rather than failure.
pub const SOFT_STATUS_CODES: &[u16] = &[402, 403, 404];

/// Estimates span a forward window, not the statement lookback.
const ESTIMATE_PERIODS: usize = 10;

/// Insider statistics are quarterly; 100 rows covers decades.
const INSIDER_ROWS: usize = 100;

/// FMP REST adapter
pub struct FmpAdapter {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl FmpAdapter {
    /// Create a new adapter against the given base URL.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_key: api_key.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from config; `None` when no API key is configured.
    pub fn from_config(config: &FmpConfig) -> Option<Self> {
        config
            .api_key
            .clone()
            .map(|key| Self::new(key, config.base_url.clone(), config.timeout_secs))
    }

    /// GET `{base_url}/{endpoint}` and decode a list of records.
    ///
    /// FMP answers some endpoints with a bare object instead of a one-element
    /// list, and the historical endpoint nests rows under `historical`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let mut params: Vec<(&str, String)> = query.to_vec();
        params.push(("apikey", self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .query(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Network("Request timeout".into())
                } else if e.is_connect() {
                    ProviderError::Network("Connection failed".into())
                } else {
                    ProviderError::Network(sanitize_for_log(&e.to_string()))
                }
            })?;

        let status = response.status();
        debug!(endpoint = endpoint, status = status.as_u16(), "FMP response");

        if SOFT_STATUS_CODES.contains(&status.as_u16()) {
            warn!(
                endpoint = endpoint,
                status = status.as_u16(),
                "FMP endpoint unavailable, treating as empty"
            );
            return Ok(Vec::new());
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::Auth("Invalid FMP API key".into()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: truncate_with_ellipsis(&sanitize_for_log(&body), 200),
            });
        }

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("{} response: {}", endpoint, e)))?;

        decode_records(endpoint, value)
    }

    /// Annual statement endpoints share the same query shape.
    async fn fetch_annual<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<T>, ProviderError> {
        let mut rows: Vec<T> = self
            .fetch(
                endpoint,
                &[
                    ("symbol", ticker.to_string()),
                    ("limit", limit.to_string()),
                    ("period", "annual".to_string()),
                ],
            )
            .await?;
        rows.truncate(limit);
        Ok(rows)
    }

    /// Best-effort fetch: any failure degrades to an empty list.
    async fn fetch_lenient<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Vec<T> {
        match self.fetch(endpoint, query).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(endpoint = endpoint, error = %e, "FMP best-effort fetch failed");
                Vec::new()
            }
        }
    }
}

fn decode_records<T: DeserializeOwned>(
    endpoint: &str,
    value: serde_json::Value,
) -> Result<Vec<T>, ProviderError> {
    let rows = match value {
        serde_json::Value::Array(rows) => rows,
        serde_json::Value::Object(mut map) => match map.remove("historical") {
            Some(serde_json::Value::Array(rows)) => rows,
            _ if map.contains_key("Error Message") => {
                warn!(endpoint = endpoint, "FMP returned an error object, treating as empty");
                Vec::new()
            }
            _ => vec![serde_json::Value::Object(map)],
        },
        serde_json::Value::Null => Vec::new(),
        other => {
            return Err(ProviderError::Decode(format!(
                "{} response: unexpected {}",
                endpoint, other
            )))
        }
    };

    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| ProviderError::Decode(format!("{} record: {}", endpoint, e)))
        })
        .collect()
}

#[async_trait]
impl FinancialDataProvider for FmpAdapter {
    fn name(&self) -> &'static str {
        "fmp"
    }

    async fn income_statement(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<IncomeStatement>, ProviderError> {
        self.fetch_annual("income-statement", ticker, limit).await
    }

    async fn balance_sheet(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<BalanceSheet>, ProviderError> {
        self.fetch_annual("balance-sheet-statement", ticker, limit).await
    }

    async fn cash_flow(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<CashFlowStatement>, ProviderError> {
        self.fetch_annual("cash-flow-statement", ticker, limit).await
    }

    async fn key_metrics(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<KeyMetrics>, ProviderError> {
        self.fetch_annual("key-metrics", ticker, limit).await
    }

    async fn ratios(&self, ticker: &str, limit: usize) -> Result<Vec<Ratios>, ProviderError> {
        self.fetch_annual("ratios", ticker, limit).await
    }

    async fn insider_trading(&self, ticker: &str) -> Result<Vec<InsiderStatistic>, ProviderError> {
        Ok(self
            .fetch_lenient(
                "insider-trading/statistics",
                &[("symbol", ticker.to_string()), ("limit", INSIDER_ROWS.to_string())],
            )
            .await)
    }

    async fn analyst_estimates(
        &self,
        ticker: &str,
    ) -> Result<Vec<AnalystEstimate>, ProviderError> {
        self.fetch_annual("analyst-estimates", ticker, ESTIMATE_PERIODS)
            .await
    }

    async fn stock_news(
        &self,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<NewsArticle>, ProviderError> {
        let mut news: Vec<NewsArticle> = self
            .fetch_lenient(
                "news/stock",
                &[("symbols", ticker.to_string()), ("limit", limit.to_string())],
            )
            .await;
        news.truncate(limit);
        Ok(news)
    }

    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, ProviderError> {
        let quotes: Vec<Quote> = self.fetch("quote", &[("symbol", ticker.to_string())]).await?;
        Ok(quotes.into_iter().next())
    }

    async fn historical_prices(
        &self,
        ticker: &str,
    ) -> Result<Vec<HistoricalPrice>, ProviderError> {
        self.fetch("historical-price-eod/light", &[("symbol", ticker.to_string())])
            .await
    }

    async fn sector_performance(&self) -> Result<Vec<SectorPerformance>, ProviderError> {
        Ok(self.fetch_lenient("sector-performance-snapshot", &[]).await)
    }

    async fn company_profile(
        &self,
        ticker: &str,
    ) -> Result<Option<CompanyProfile>, ProviderError> {
        let rows: Vec<CompanyProfile> = self
            .fetch_lenient("profile", &[("symbol", ticker.to_string())])
            .await;
        Ok(rows.into_iter().next())
    }

    async fn esg_data(&self, ticker: &str) -> Result<Option<EsgData>, ProviderError> {
        let rows: Vec<EsgData> = self
            .fetch_lenient("esg-disclosures", &[("symbol", ticker.to_string())])
            .await;
        Ok(rows.into_iter().next())
    }

    async fn earning_call_transcript(
        &self,
        ticker: &str,
        year: Option<i32>,
        quarter: Option<u32>,
    ) -> Result<Option<EarningsTranscript>, ProviderError> {
        let mut query = vec![("symbol", ticker.to_string())];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }
        if let Some(quarter) = quarter {
            query.push(("quarter", quarter.to_string()));
        }

        let rows: Vec<EarningsTranscript> =
            self.fetch_lenient("earning-call-transcript", &query).await;
        Ok(rows.into_iter().next())
    }
}

// ============================================================================
// Tests
// ============================================================================
