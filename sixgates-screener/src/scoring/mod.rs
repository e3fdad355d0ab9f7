//! Scoring: run the gates, then derive tier and position size.
//!
//! ```text
//! Scorer::score ──► AnalysisResult { gate_results, passed_quality }
//!                        │
//!        QualityTierClassifier::classify ──► QualityTier
//!                        │
//!        PositionSizer::calculate(tier, MarketContext) ──► fraction of portfolio
//! ```
//!
//! Tier and size are always derived here; no gate ever sets them.

mod sizing;
mod tier;

pub use sizing::PositionSizer;
pub use tier::{Classification, ClassificationPath, QualityTier, QualityTierClassifier};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use sixgates_common::{ThresholdsConfig, Validate};

use crate::data::{FinancialDataProvider, ProviderError};
use crate::error::{Result, ScreenerError};
use crate::gates::{standard_gates, Gate, GateId, GateResult};
use crate::market::MarketContext;
use crate::moat::MoatAssessor;

// ============================================================================
// Analysis Result
// ============================================================================

/// Outcome of one scoring run for one ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub ticker: String,
    /// In gate registration order
    pub gate_results: Vec<GateResult>,
    /// No registered quality gate failed
    pub passed_quality: bool,
    pub quality_tier: Option<QualityTier>,
    pub position_size: Option<f64>,
    pub market_context: Option<MarketContext>,
}

impl AnalysisResult {
    pub fn new(ticker: impl Into<String>, gate_results: Vec<GateResult>) -> Self {
        let passed_quality = gate_results
            .iter()
            .filter(|r| r.gate_id.is_quality_gate())
            .all(|r| r.passed);

        Self {
            ticker: ticker.into(),
            gate_results,
            passed_quality,
            quality_tier: None,
            position_size: None,
            market_context: None,
        }
    }

    pub fn gate(&self, id: GateId) -> Option<&GateResult> {
        self.gate_results.iter().find(|r| r.gate_id == id)
    }

    /// Gates that failed, with their kill reasons.
    pub fn failed_gates(&self) -> impl Iterator<Item = &GateResult> {
        self.gate_results.iter().filter(|r| !r.passed)
    }

    /// Copy carrying the derived tier, size and market context.
    pub fn with_tier_and_size(
        &self,
        tier: QualityTier,
        size: f64,
        context: Option<MarketContext>,
    ) -> Self {
        Self {
            quality_tier: Some(tier),
            position_size: Some(size),
            market_context: context,
            ..self.clone()
        }
    }
}

// ============================================================================
// Scorer
// ============================================================================

/// Ordered gate list. Read-only while scoring, so one instance serves any
/// number of tickers.
#[derive(Default)]
pub struct Scorer {
    gates: Vec<Box<dyn Gate>>,
}

impl Scorer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nine gates in canonical order, after validating the thresholds.
    pub fn standard(
        thresholds: &ThresholdsConfig,
        moat_assessor: Option<Arc<dyn MoatAssessor>>,
    ) -> Result<Self> {
        thresholds.validate()?;

        let mut scorer = Self::new();
        for gate in standard_gates(thresholds, moat_assessor) {
            scorer.add_gate(gate)?;
        }
        Ok(scorer)
    }

    /// Register a gate. Execution order is registration order.
    pub fn add_gate(&mut self, gate: Box<dyn Gate>) -> Result<()> {
        let id = gate.id();
        if self.gates.iter().any(|g| g.id() == id) {
            return Err(ScreenerError::DuplicateGate(id));
        }
        self.gates.push(gate);
        Ok(())
    }

    pub fn gate_ids(&self) -> Vec<GateId> {
        self.gates.iter().map(|g| g.id()).collect()
    }

    /// Run every gate in order. The first transport error aborts the run.
    pub async fn score(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> std::result::Result<AnalysisResult, ProviderError> {
        let mut results = Vec::with_capacity(self.gates.len());

        for gate in &self.gates {
            let result = gate.analyze(ticker, provider).await?;
            if !result.passed {
                info!(
                    ticker = ticker,
                    gate = %result.gate_id,
                    reason = result.kill_reason.as_deref().unwrap_or_default(),
                    quality = result.gate_id.is_quality_gate(),
                    "Gate failed"
                );
            }
            results.push(result);
        }

        let analysis = AnalysisResult::new(ticker, results);
        debug!(
            ticker = ticker,
            gates = analysis.gate_results.len(),
            passed_quality = analysis.passed_quality,
            "Scoring complete"
        );
        Ok(analysis)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;
    use crate::gates::{CashIntegrityGate, ValuationGate};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use test_case::test_case;

    /// Gate with a fixed verdict.
    struct StubGate {
        id: GateId,
        passed: bool,
    }

    #[async_trait]
    impl Gate for StubGate {
        fn id(&self) -> GateId {
            self.id
        }

        async fn analyze(
            &self,
            _ticker: &str,
            _provider: &dyn FinancialDataProvider,
        ) -> std::result::Result<GateResult, ProviderError> {
            let reasons = if self.passed { vec![] } else { vec!["stub".to_string()] };
            Ok(GateResult::from_reasons(self.id, BTreeMap::new(), reasons))
        }
    }

    fn stub(id: GateId, passed: bool) -> Box<dyn Gate> {
        Box::new(StubGate { id, passed })
    }

    #[test]
    fn test_duplicate_gate_rejected() {
        let mut scorer = Scorer::new();
        scorer.add_gate(Box::new(ValuationGate::default())).unwrap();
        let err = scorer.add_gate(Box::new(ValuationGate::default())).unwrap_err();
        assert!(matches!(err, ScreenerError::DuplicateGate(GateId::Valuation)));
    }

    #[test]
    fn test_standard_order() {
        let scorer = Scorer::standard(&ThresholdsConfig::default(), None).unwrap();
        assert_eq!(scorer.gate_ids(), GateId::ALL);
    }

    #[test]
    fn test_standard_rejects_invalid_thresholds() {
        let mut thresholds = ThresholdsConfig::default();
        thresholds.position_sizing.absolute_max = 0.0;
        assert!(matches!(
            Scorer::standard(&thresholds, None),
            Err(ScreenerError::Config(_))
        ));
    }

    fn scorer_with_one_failing(failing: GateId) -> Scorer {
        let mut scorer = Scorer::new();
        for id in GateId::ALL {
            scorer.add_gate(stub(id, id != failing)).unwrap();
        }
        scorer
    }

    #[test_case(GateId::MoatAssessment ; "moat")]
    #[test_case(GateId::ReinvestmentRunway ; "runway")]
    #[test_case(GateId::Valuation ; "valuation")]
    #[test_case(GateId::Narrative ; "narrative")]
    #[tokio::test]
    async fn test_non_quality_failure_keeps_quality(failing: GateId) {
        assert!(!failing.is_quality_gate());
        let result = scorer_with_one_failing(failing)
            .score("AAPL", &FixtureProvider::empty())
            .await
            .unwrap();
        assert_eq!(result.gate_results.len(), 9);
        assert!(result.passed_quality);
        assert_eq!(result.failed_gates().count(), 1);
    }

    #[tokio::test]
    async fn test_every_non_quality_gate_failing_keeps_quality() {
        let mut scorer = Scorer::new();
        for id in GateId::ALL {
            scorer.add_gate(stub(id, id.is_quality_gate())).unwrap();
        }
        let result = scorer.score("AAPL", &FixtureProvider::empty()).await.unwrap();
        assert!(result.passed_quality);
        assert_eq!(result.failed_gates().count(), 4);
    }

    #[tokio::test]
    async fn test_each_quality_gate_can_fail_the_run() {
        for failing in GateId::QUALITY_GATES {
            let mut scorer = Scorer::new();
            for id in GateId::ALL {
                scorer.add_gate(stub(id, id != failing)).unwrap();
            }
            let result = scorer.score("AAPL", &FixtureProvider::empty()).await.unwrap();
            assert!(!result.passed_quality, "{failing} should fail quality");
        }
    }

    #[tokio::test]
    async fn test_results_follow_registration_order() {
        let mut scorer = Scorer::new();
        scorer.add_gate(stub(GateId::Narrative, true)).unwrap();
        scorer.add_gate(stub(GateId::CapitalAllocation, true)).unwrap();

        let result = scorer.score("AAPL", &FixtureProvider::empty()).await.unwrap();
        let ids: Vec<GateId> = result.gate_results.iter().map(|r| r.gate_id).collect();
        assert_eq!(ids, [GateId::Narrative, GateId::CapitalAllocation]);
        assert!(result.gate(GateId::Valuation).is_none());
    }

    #[tokio::test]
    async fn test_transport_error_aborts() {
        let provider = FixtureProvider::sample()
            .with_failure("cash_flow", ProviderError::Network("reset".into()));
        let mut scorer = Scorer::new();
        scorer.add_gate(Box::new(CashIntegrityGate::default())).unwrap();
        assert!(scorer.score("AAPL", &provider).await.is_err());
    }
}
