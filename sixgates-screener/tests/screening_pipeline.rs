//! End-to-end screening against the deterministic fixture provider.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use sixgates_common::{Config, MoatDurability, RunwayCategory};
use sixgates_screener::data::{KeyMetrics, Quote, Ratios};
use sixgates_screener::{
    FixtureProvider, FmpAdapter, GateId, LlmError, MarketPhase, ProviderError, QualityTier,
    ScreenerError, ScreeningService, TextGenerator,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Canned text generator that counts its calls.
struct CannedGenerator {
    response: Result<String, LlmError>,
    calls: Mutex<u32>,
}

impl CannedGenerator {
    fn durability(level: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(format!(
                r#"{{"primary_moat": "switching_costs", "durability": "{level}", "confidence": 0.8}}"#
            )),
            calls: Mutex::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            response: Err(LlmError::Client {
                status: 400,
                body: "bad request".into(),
            }),
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _system: &str, _user: &str, _max_tokens: u32) -> Result<String, LlmError> {
        *self.calls.lock().unwrap() += 1;
        self.response.clone()
    }
}

fn service(provider: FixtureProvider, generator: Option<Arc<dyn TextGenerator>>) -> ScreeningService {
    ScreeningService::new(&Config::default(), Arc::new(provider), generator).unwrap()
}

#[tokio::test]
async fn test_sample_ticker_is_acceptable_in_bull_market() {
    let result = service(FixtureProvider::sample(), None).analyze("AAPL").await.unwrap();

    assert_eq!(result.ticker, "AAPL");
    assert_eq!(result.gate_results.len(), 9);
    let ids: Vec<GateId> = result.gate_results.iter().map(|r| r.gate_id).collect();
    assert_eq!(ids, GateId::ALL);
    assert!(result.passed_quality);

    let spread = result.gate(GateId::EconomicEngine).unwrap().metric("spread").unwrap();
    assert!((spread - 0.172).abs() < 1e-9);
    assert_eq!(
        result
            .gate(GateId::ReinvestmentRunway)
            .unwrap()
            .detail::<RunwayCategory>("runway_category"),
        Some(RunwayCategory::Mature)
    );

    assert_eq!(result.quality_tier, Some(QualityTier::Acceptable));
    assert!((result.position_size.unwrap() - 0.03).abs() < 1e-12);

    let context = result.market_context.unwrap();
    assert_eq!(context.phase, MarketPhase::Bull);
    assert_eq!(context.risk_score, 60.0);
}

#[tokio::test]
async fn test_moat_durability_lifts_tier() {
    let generator = CannedGenerator::durability("medium");
    let result = service(FixtureProvider::sample(), Some(generator.clone()))
        .analyze("AAPL")
        .await
        .unwrap();

    assert_eq!(*generator.calls.lock().unwrap(), 1);
    assert_eq!(
        result
            .gate(GateId::MoatAssessment)
            .unwrap()
            .detail::<MoatDurability>("moat_durability"),
        Some(MoatDurability::Medium)
    );
    // Mature runway caps it below High Quality.
    assert_eq!(result.quality_tier, Some(QualityTier::Good));
    assert!((result.position_size.unwrap() - 0.05).abs() < 1e-12);
}

#[tokio::test]
async fn test_generator_failure_does_not_fail_analysis() {
    let result = service(FixtureProvider::sample(), Some(CannedGenerator::failing()))
        .analyze("AAPL")
        .await
        .unwrap();

    let moat = result.gate(GateId::MoatAssessment).unwrap();
    assert!(moat.passed);
    assert_eq!(moat.detail::<String>("method").as_deref(), Some("llm_failed"));
    assert_eq!(result.quality_tier, Some(QualityTier::Acceptable));
}

#[tokio::test]
async fn test_thin_returns_make_ticker_uninvestable() {
    let thin = (0..5)
        .map(|i| KeyMetrics {
            date: format!("{}-09-30", 2023 - i),
            return_on_invested_capital: 0.06,
            net_debt_to_ebitda: 0.8,
            invested_capital: Some(180_000.0e6),
        })
        .collect();
    let provider = FixtureProvider::sample().with_key_metrics(thin);

    let result = service(provider, None).analyze("AAPL").await.unwrap();
    let engine = result.gate(GateId::EconomicEngine).unwrap();
    assert!(!engine.passed);
    assert!(!result.passed_quality);
    assert_eq!(result.quality_tier, Some(QualityTier::Uninvestable));
    assert_eq!(result.position_size, Some(0.0));
}

#[tokio::test]
async fn test_expensive_valuation_does_not_affect_quality() {
    let expensive = (0..5)
        .map(|i| Ratios {
            date: format!("{}-09-30", 2023 - i),
            price_to_earnings_ratio: Some(28.5),
            peg_ratio: Some(2.5),
            dividend_yield: 0.005,
            price_to_free_cash_flow_ratio: 25.0,
            gross_profit_margin: 0.44,
        })
        .collect();
    let provider = FixtureProvider::sample().with_ratios(expensive);

    let result = service(provider, None).analyze("AAPL").await.unwrap();
    let valuation = result.gate(GateId::Valuation).unwrap();
    assert!(!valuation.passed);
    assert_eq!(valuation.kill_reason.as_deref(), Some("PEG (2.50) > 1.50"));
    assert!(result.passed_quality);
    assert_eq!(result.quality_tier, Some(QualityTier::Acceptable));
}

#[tokio::test]
async fn test_bear_market_shrinks_position() {
    let provider = FixtureProvider::sample().with_quote_for(
        "SPY",
        Some(Quote {
            symbol: "SPY".into(),
            price: Some(400.0),
            price_avg_200: Some(420.0),
            ..Default::default()
        }),
    );

    let result = service(provider, None).analyze("AAPL").await.unwrap();
    let context = result.market_context.as_ref().unwrap();
    assert_eq!(context.phase, MarketPhase::Bear);
    assert_eq!(context.risk_score, 80.0);
    assert_eq!(context.discount_rate_adjustment, 0.02);
    assert!((result.position_size.unwrap() - 0.03 * 0.5 * 0.7).abs() < 1e-12);
}

#[tokio::test]
async fn test_transport_error_aborts_run() {
    let provider = FixtureProvider::sample()
        .with_failure("balance_sheet", ProviderError::Http { status: 503, body: "unavailable".into() });

    let err = service(provider, None).analyze("AAPL").await.unwrap_err();
    assert!(matches!(err, ScreenerError::Provider(ProviderError::Http { status: 503, .. })));
}

#[tokio::test]
async fn test_unknown_ticker() {
    let err = service(FixtureProvider::empty(), None).analyze("ZZZZ").await.unwrap_err();
    assert!(matches!(err, ScreenerError::UnknownTicker(t) if t == "ZZZZ"));
}

#[tokio::test]
async fn test_result_serializes_with_wire_ids() {
    let result = service(FixtureProvider::sample(), None).analyze("AAPL").await.unwrap();
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["quality_tier"], "Acceptable");
    assert_eq!(json["gate_results"][1]["gate_id"], "gate_1_5");
    assert_eq!(json["market_context"]["phase"], "bull");
}

#[tokio::test]
async fn test_live_adapter_without_data_is_unknown_ticker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let provider = FmpAdapter::new("test-key", server.uri(), 5);
    let service = ScreeningService::new(&Config::default(), Arc::new(provider), None).unwrap();

    let err = service.analyze("NOPE").await.unwrap_err();
    assert!(matches!(err, ScreenerError::UnknownTicker(_)));
}

#[tokio::test]
async fn test_live_adapter_tolerates_null_fields() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/income-statement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"date": "2023-09-30", "revenue": 383285000000.0, "netIncome": null, "eps": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ratios"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"date": "2023-09-30", "priceToEarningsRatio": 28.5, "dividendYield": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let provider = FmpAdapter::new("test-key", server.uri(), 5);
    let service = ScreeningService::new(&Config::default(), Arc::new(provider), None).unwrap();

    let result = service.analyze("AAPL").await.unwrap();
    assert_eq!(result.gate_results.len(), 9);
}

#[test]
fn test_from_config_requires_data_key() {
    let err = ScreeningService::from_config(&Config::default()).err().unwrap();
    assert!(matches!(err, ScreenerError::Config(_)));
}
