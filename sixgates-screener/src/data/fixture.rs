//! Deterministic in-memory provider.
//!
//! Serves one dataset for every ticker, with optional per-ticker quote
//! overrides so a benchmark or macro series can differ from the company.
//! Used by tests and for dry runs without vendor credentials.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use super::provider::{FinancialDataProvider, ProviderError};
use super::{
    AnalystEstimate, BalanceSheet, CashFlowStatement, CompanyProfile, EarningsTranscript,
    EsgData, HistoricalPrice, IncomeStatement, InsiderStatistic, KeyMetrics, NewsArticle, Quote,
    Ratios, SectorPerformance,
};

/// Millions, to keep the sample statements readable.
const M: f64 = 1_000_000.0;

/// In-memory provider with builder-style setters.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    income: Vec<IncomeStatement>,
    balance: Vec<BalanceSheet>,
    cash_flow: Vec<CashFlowStatement>,
    key_metrics: Vec<KeyMetrics>,
    ratios: Vec<Ratios>,
    insider: Vec<InsiderStatistic>,
    estimates: Vec<AnalystEstimate>,
    news: Vec<NewsArticle>,
    quote: Option<Quote>,
    quote_overrides: HashMap<String, Option<Quote>>,
    historical: Vec<HistoricalPrice>,
    profile: Option<CompanyProfile>,
    /// Injected failure, keyed by operation name ("ratios", "quote", ...)
    failures: HashMap<&'static str, ProviderError>,
    calls: AtomicU32,
}

impl FixtureProvider {
    /// Provider with every series empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Large-cap consumer-technology dataset (fiscal 2019-2023) that clears the
    /// quality gates without any moat assessment.
    pub fn sample() -> Self {
        let income = vec![
            income("2023-09-30", 383_285.0, 114_301.0, 96_995.0, 3_933.0, 125_820.0, 6.13, 16_741.0, 113_736.0, 15_812.5),
            income("2022-09-30", 394_328.0, 119_437.0, 99_803.0, 2_931.0, 130_541.0, 6.11, 19_300.0, 119_103.0, 16_325.8),
            income("2021-09-30", 365_817.0, 108_949.0, 94_680.0, 2_645.0, 120_233.0, 5.61, 14_527.0, 109_207.0, 16_864.9),
            income("2020-09-30", 274_515.0, 66_288.0, 57_411.0, 2_873.0, 77_344.0, 3.28, 9_680.0, 67_091.0, 17_528.2),
            income("2019-09-30", 260_174.0, 63_930.0, 55_256.0, 3_576.0, 76_477.0, 2.97, 10_481.0, 65_737.0, 18_471.3),
        ];

        let balance = vec![
            balance("2023-09-30", 352_583.0, 29_508.0, 15_613.0, 95_281.0),
            balance("2022-09-30", 352_755.0, 28_184.0, 9_982.0, 98_959.0),
            balance("2021-09-30", 351_002.0, 26_278.0, 6_000.0, 109_106.0),
            balance("2020-09-30", 323_888.0, 16_120.0, 13_769.0, 98_667.0),
            balance("2019-09-30", 338_516.0, 22_926.0, 10_260.0, 91_807.0),
        ];

        let cash_flow = vec![
            cash("2023-09-30", 99_584.0, 110_543.0, -10_959.0, 11_519.0, -6_577.0, -15_025.0),
            cash("2022-09-30", 111_443.0, 122_151.0, -10_708.0, 11_104.0, 1_200.0, -14_841.0),
            cash("2021-09-30", 92_953.0, 104_038.0, -11_085.0, 11_284.0, -4_911.0, -14_467.0),
            cash("2020-09-30", 73_365.0, 80_674.0, -7_309.0, 11_056.0, 5_690.0, -14_081.0),
            cash("2019-09-30", 58_896.0, 69_391.0, -10_495.0, 12_547.0, -3_488.0, -14_119.0),
        ];

        let key_metrics = vec![
            metrics("2023-09-30", 0.28, 0.8, 181_000.0),
            metrics("2022-09-30", 0.30, 0.7, 176_000.0),
            metrics("2021-09-30", 0.29, 0.9, 170_000.0),
            metrics("2020-09-30", 0.20, 1.1, 168_000.0),
            metrics("2019-09-30", 0.19, 1.2, 175_000.0),
        ];

        let ratios = vec![
            ratios("2023-09-30", 28.5, 1.2, 25.0, 0.005, 0.441),
            ratios("2022-09-30", 25.0, 1.1, 22.0, 0.006, 0.433),
            ratios("2021-09-30", 30.0, 1.5, 28.0, 0.005, 0.418),
            ratios("2020-09-30", 35.0, 2.0, 30.0, 0.006, 0.382),
            ratios("2019-09-30", 20.0, 1.0, 18.0, 0.007, 0.378),
        ];

        let insider = vec![
            InsiderStatistic { year: 2023, quarter: 4, total_acquired: 5_000.0, total_disposed: 10_000.0 },
            InsiderStatistic { year: 2023, quarter: 1, total_acquired: 0.0, total_disposed: 2_000.0 },
        ];

        let estimates = vec![AnalystEstimate {
            date: "2024-09-30".into(),
            eps_avg: 6.50,
            revenue_avg: 390_000.0 * M,
            num_analysts_eps: 30,
        }];

        let news = vec![
            NewsArticle {
                symbol: "AAPL".into(),
                title: "Apple posts record quarter as services growth beats estimates".into(),
                ..Default::default()
            },
            NewsArticle {
                symbol: "AAPL".into(),
                title: "Analysts warn of slowing handset demand".into(),
                ..Default::default()
            },
        ];

        let quote = Quote {
            symbol: "AAPL".into(),
            name: Some("Apple Inc.".into()),
            price: Some(175.50),
            price_avg_50: Some(178.20),
            price_avg_200: Some(172.10),
            volume: 58_000_000.0,
            market_cap: Some(2_750_000.0 * M),
            pe: Some(28.5),
        };

        let benchmark = Quote {
            symbol: "SPY".into(),
            name: Some("SPDR S&P 500 ETF Trust".into()),
            price: Some(450.0),
            price_avg_50: Some(440.0),
            price_avg_200: Some(420.0),
            volume: 80_000_000.0,
            market_cap: None,
            pe: Some(24.0),
        };

        Self {
            income,
            balance,
            cash_flow,
            key_metrics,
            ratios,
            insider,
            estimates,
            news,
            quote: Some(quote),
            profile: Some(CompanyProfile {
                symbol: "AAPL".into(),
                company_name: Some("Apple Inc.".into()),
                sector: Some("Technology".into()),
                industry: Some("Consumer Electronics".into()),
                description: None,
                market_cap: Some(2_750_000.0 * M),
            }),
            ..Self::default()
        }
        .with_quote_for("SPY", Some(benchmark))
    }

    pub fn with_income(mut self, income: Vec<IncomeStatement>) -> Self {
        self.income = income;
        self
    }

    pub fn with_balance_sheet(mut self, balance: Vec<BalanceSheet>) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_cash_flow(mut self, cash_flow: Vec<CashFlowStatement>) -> Self {
        self.cash_flow = cash_flow;
        self
    }

    pub fn with_key_metrics(mut self, key_metrics: Vec<KeyMetrics>) -> Self {
        self.key_metrics = key_metrics;
        self
    }

    pub fn with_ratios(mut self, ratios: Vec<Ratios>) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn with_insider(mut self, insider: Vec<InsiderStatistic>) -> Self {
        self.insider = insider;
        self
    }

    pub fn with_estimates(mut self, estimates: Vec<AnalystEstimate>) -> Self {
        self.estimates = estimates;
        self
    }

    pub fn with_news(mut self, news: Vec<NewsArticle>) -> Self {
        self.news = news;
        self
    }

    pub fn with_historical(mut self, historical: Vec<HistoricalPrice>) -> Self {
        self.historical = historical;
        self
    }

    /// Default quote returned for tickers without an override.
    pub fn with_quote(mut self, quote: Option<Quote>) -> Self {
        self.quote = quote;
        self
    }

    /// Quote for one ticker; `None` makes that ticker unknown.
    pub fn with_quote_for(mut self, ticker: &str, quote: Option<Quote>) -> Self {
        self.quote_overrides.insert(ticker.to_string(), quote);
        self
    }

    /// Make one operation fail with the given error.
    pub fn with_failure(mut self, operation: &'static str, error: ProviderError) -> Self {
        self.failures.insert(operation, error);
        self
    }

    /// Number of provider calls served so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &'static str) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn head<T: Clone>(series: &[T], limit: usize) -> Vec<T> {
    series.iter().take(limit).cloned().collect()
}

#[async_trait]
impl FinancialDataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn income_statement(
        &self,
        _ticker: &str,
        limit: usize,
    ) -> Result<Vec<IncomeStatement>, ProviderError> {
        self.check("income_statement")?;
        Ok(head(&self.income, limit))
    }

    async fn balance_sheet(
        &self,
        _ticker: &str,
        limit: usize,
    ) -> Result<Vec<BalanceSheet>, ProviderError> {
        self.check("balance_sheet")?;
        Ok(head(&self.balance, limit))
    }

    async fn cash_flow(
        &self,
        _ticker: &str,
        limit: usize,
    ) -> Result<Vec<CashFlowStatement>, ProviderError> {
        self.check("cash_flow")?;
        Ok(head(&self.cash_flow, limit))
    }

    async fn key_metrics(
        &self,
        _ticker: &str,
        limit: usize,
    ) -> Result<Vec<KeyMetrics>, ProviderError> {
        self.check("key_metrics")?;
        Ok(head(&self.key_metrics, limit))
    }

    async fn ratios(&self, _ticker: &str, limit: usize) -> Result<Vec<Ratios>, ProviderError> {
        self.check("ratios")?;
        Ok(head(&self.ratios, limit))
    }

    async fn insider_trading(&self, _ticker: &str) -> Result<Vec<InsiderStatistic>, ProviderError> {
        self.check("insider_trading")?;
        Ok(self.insider.clone())
    }

    async fn analyst_estimates(
        &self,
        _ticker: &str,
    ) -> Result<Vec<AnalystEstimate>, ProviderError> {
        self.check("analyst_estimates")?;
        Ok(self.estimates.clone())
    }

    async fn stock_news(
        &self,
        _ticker: &str,
        limit: usize,
    ) -> Result<Vec<NewsArticle>, ProviderError> {
        self.check("stock_news")?;
        Ok(head(&self.news, limit))
    }

    async fn quote(&self, ticker: &str) -> Result<Option<Quote>, ProviderError> {
        self.check("quote")?;
        match self.quote_overrides.get(ticker) {
            Some(quote) => Ok(quote.clone()),
            None => Ok(self.quote.clone()),
        }
    }

    async fn historical_prices(
        &self,
        _ticker: &str,
    ) -> Result<Vec<HistoricalPrice>, ProviderError> {
        self.check("historical_prices")?;
        Ok(self.historical.clone())
    }

    async fn sector_performance(&self) -> Result<Vec<SectorPerformance>, ProviderError> {
        self.check("sector_performance")?;
        Ok(Vec::new())
    }

    async fn company_profile(
        &self,
        _ticker: &str,
    ) -> Result<Option<CompanyProfile>, ProviderError> {
        self.check("company_profile")?;
        Ok(self.profile.clone())
    }

    async fn esg_data(&self, _ticker: &str) -> Result<Option<EsgData>, ProviderError> {
        self.check("esg_data")?;
        Ok(None)
    }

    async fn earning_call_transcript(
        &self,
        _ticker: &str,
        _year: Option<i32>,
        _quarter: Option<u32>,
    ) -> Result<Option<EarningsTranscript>, ProviderError> {
        self.check("earning_call_transcript")?;
        Ok(None)
    }
}

// ============================================================================
// Sample record builders
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn income(
    date: &str,
    revenue: f64,
    operating_income: f64,
    net_income: f64,
    interest_expense: f64,
    ebitda: f64,
    eps: f64,
    income_tax_expense: f64,
    income_before_tax: f64,
    shares: f64,
) -> IncomeStatement {
    IncomeStatement {
        date: date.to_string(),
        revenue: revenue * M,
        operating_income: operating_income * M,
        net_income: net_income * M,
        interest_expense: Some(interest_expense * M),
        ebitda: ebitda * M,
        eps,
        income_tax_expense: income_tax_expense * M,
        income_before_tax: Some(income_before_tax * M),
        weighted_average_shs_out: Some(shares * M),
    }
}

fn balance(
    date: &str,
    total_assets: f64,
    net_receivables: f64,
    short_term_debt: f64,
    long_term_debt: f64,
) -> BalanceSheet {
    BalanceSheet {
        date: date.to_string(),
        total_assets: Some(total_assets * M),
        net_receivables: net_receivables * M,
        short_term_debt: short_term_debt * M,
        long_term_debt: long_term_debt * M,
    }
}

fn cash(
    date: &str,
    free_cash_flow: f64,
    operating_cash_flow: f64,
    capital_expenditure: f64,
    depreciation: f64,
    working_capital_change: f64,
    dividends_paid: f64,
) -> CashFlowStatement {
    CashFlowStatement {
        date: date.to_string(),
        free_cash_flow: free_cash_flow * M,
        operating_cash_flow: operating_cash_flow * M,
        capital_expenditure: capital_expenditure * M,
        depreciation_and_amortization: depreciation * M,
        change_in_working_capital: working_capital_change * M,
        common_dividends_paid: dividends_paid * M,
    }
}

fn metrics(date: &str, roic: f64, net_debt_to_ebitda: f64, invested_capital: f64) -> KeyMetrics {
    KeyMetrics {
        date: date.to_string(),
        return_on_invested_capital: roic,
        net_debt_to_ebitda,
        invested_capital: Some(invested_capital * M),
    }
}

fn ratios(date: &str, pe: f64, peg: f64, p_fcf: f64, dividend_yield: f64, gross_margin: f64) -> Ratios {
    Ratios {
        date: date.to_string(),
        price_to_earnings_ratio: Some(pe),
        peg_ratio: Some(peg),
        dividend_yield,
        price_to_free_cash_flow_ratio: p_fcf,
        gross_profit_margin: gross_margin,
    }
}

// ============================================================================
// Tests
// ============================================================================
