//! Six Gates Screener
//!
//! Gate-based fundamental screening: nine rule modules read published
//! fundamentals for one ticker, the scorer aggregates their verdicts, and the
//! result is mapped onto a quality tier and a regime-aware position size.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        ScreeningService                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//! │  │ Scorer       │──►│ Tier         │──►│ PositionSizer        │  │
//! │  │ (9 gates)    │   │ Classifier   │   │ (+ MarketContext)    │  │
//! │  └──────┬───────┘   └──────────────┘   └──────────────────────┘  │
//! │         │                                                        │
//! │  ┌──────▼───────────────────┐   ┌─────────────────────────────┐  │
//! │  │ FinancialDataProvider    │   │ TextGenerator (moat gate)   │  │
//! │  │ FmpAdapter / Fixture     │   │ AnthropicClient             │  │
//! │  └──────────────────────────┘   └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Concepts
//!
//! ## Quality gates
//! gate_1, gate_2, gate_2_5, gate_3 and gate_3_5 decide `passed_quality`.
//! Valuation (gate_4) failing means "wait for a better price", not "reject".
//!
//! ## Fail-open data, fail-fast transport
//! Missing data produces an "Insufficient data" verdict. A transport error
//! from the provider aborts the whole run; no partial results.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod early_warning;
pub mod error;
pub mod gates;
pub mod llm;
pub mod market;
pub mod moat;
pub mod scoring;
pub mod stats;

pub use data::{FinancialDataProvider, FixtureProvider, FmpAdapter, ProviderError};
pub use early_warning::{MacroMonitor, RiskAssessment, RiskLevel};
pub use error::{Result, ScreenerError};
pub use gates::{Gate, GateId, GateResult};
pub use llm::{AnthropicClient, LlmError, TextGenerator};
pub use market::{MarketContext, MarketContextAssessor, MarketPhase};
pub use moat::{LlmMoatAssessor, MoatAssessment, MoatAssessor};
pub use scoring::{AnalysisResult, PositionSizer, QualityTier, QualityTierClassifier, Scorer};

use std::sync::Arc;
use tracing::{info, info_span, Instrument};

use sixgates_common::logging::generate_trace_id;
use sixgates_common::{Config, ValidationError};

/// Composition root: scorer, classifier, sizer and market assessor over one
/// data provider.
pub struct ScreeningService {
    provider: Arc<dyn FinancialDataProvider>,
    scorer: Scorer,
    classifier: QualityTierClassifier,
    sizer: PositionSizer,
    market: MarketContextAssessor,
    macro_monitor: MacroMonitor,
}

impl ScreeningService {
    /// Build the standard nine-gate pipeline. Without a text generator the
    /// moat gate reports "not configured" and durability counts as none.
    pub fn new(
        config: &Config,
        provider: Arc<dyn FinancialDataProvider>,
        text_generator: Option<Arc<dyn TextGenerator>>,
    ) -> Result<Self> {
        let thresholds = &config.thresholds;

        let moat_assessor = text_generator.map(|generator| {
            Arc::new(LlmMoatAssessor::new(generator, thresholds.gate_1_5.clone()))
                as Arc<dyn MoatAssessor>
        });

        Ok(Self {
            provider,
            scorer: Scorer::standard(thresholds, moat_assessor)?,
            classifier: QualityTierClassifier::new(thresholds.quality_tiers.clone())?,
            sizer: PositionSizer::new(thresholds.position_sizing.clone())?,
            market: MarketContextAssessor::new(thresholds.market.clone())?,
            macro_monitor: MacroMonitor::new(thresholds.macro_risk.clone()),
        })
    }

    /// Live service over FMP, with Anthropic moat assessment when a key is set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = FmpAdapter::from_config(&config.providers.fmp).ok_or_else(|| {
            ScreenerError::Config(ValidationError::MissingField {
                field: "providers.fmp.api_key".to_string(),
            })
        })?;

        let text_generator = match AnthropicClient::new(&config.providers.llm) {
            Ok(client) => Some(Arc::new(client) as Arc<dyn TextGenerator>),
            Err(e) => {
                info!(reason = %e, "Moat assessment disabled");
                None
            }
        };

        Self::new(config, Arc::new(provider), text_generator)
    }

    /// Full pipeline for one ticker: score, classify, size.
    pub async fn analyze(&self, ticker: &str) -> Result<AnalysisResult> {
        let span = info_span!("analyze", ticker = ticker, trace_id = %generate_trace_id());
        self.run(ticker).instrument(span).await
    }

    async fn run(&self, ticker: &str) -> Result<AnalysisResult> {
        let provider = self.provider.as_ref();

        if provider.income_statement(ticker, 1).await?.is_empty() {
            return Err(ScreenerError::UnknownTicker(ticker.to_string()));
        }

        let context = self.market.assess(provider).await;
        let analysis = self.scorer.score(ticker, provider).await?;
        let tier = self.classifier.classify(&analysis);
        let size = self.sizer.calculate(tier, Some(&context));

        info!(
            ticker = ticker,
            passed_quality = analysis.passed_quality,
            tier = %tier,
            position_size = size,
            phase = %context.phase,
            "Analysis complete"
        );

        Ok(analysis.with_tier_and_size(tier, size, Some(context)))
    }

    /// Current regime snapshot for the configured benchmark.
    pub async fn market_context(&self) -> MarketContext {
        self.market.assess(self.provider.as_ref()).await
    }

    /// Systemic macro risk reading.
    pub async fn macro_risk(&self) -> Result<RiskAssessment> {
        Ok(RiskAssessment::assess(&self.macro_monitor, self.provider.as_ref()).await?)
    }
}
