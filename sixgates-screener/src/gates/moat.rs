//! Gate 1.5: Moat Assessment.
//!
//! Delegates to a [`MoatAssessor`] and passes durability through to the tier
//! classifier. Never kills.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use sixgates_common::MoatThresholds;

use super::{metrics, Gate, GateId, GateResult};
use crate::data::{FinancialDataProvider, ProviderError};
use crate::moat::{AssessmentMethod, MoatAssessment, MoatAssessor};

pub const ASSESSOR_NOT_CONFIGURED: &str = "Moat assessor not configured";

#[derive(Clone, Default)]
pub struct MoatAssessmentGate {
    thresholds: MoatThresholds,
    assessor: Option<Arc<dyn MoatAssessor>>,
}

impl MoatAssessmentGate {
    pub fn new(thresholds: MoatThresholds, assessor: Option<Arc<dyn MoatAssessor>>) -> Self {
        Self {
            thresholds,
            assessor,
        }
    }

    pub fn evaluate(&self, assessment: &MoatAssessment) -> GateResult {
        GateResult::advisory(
            GateId::MoatAssessment,
            metrics([("confidence", assessment.confidence)]),
        )
        .with_detail("moat_durability", assessment.durability.as_str())
        .with_detail("moat_type", assessment.moat_type.map(|t| t.as_str()))
        .with_detail(
            "secondary_moats",
            json!(assessment
                .secondary_moats
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()),
        )
        .with_detail("evidence", json!(assessment.evidence))
        .with_detail("threats", json!(assessment.threats))
        .with_detail("method", assessment.method.as_str())
    }
}

#[async_trait]
impl Gate for MoatAssessmentGate {
    fn id(&self) -> GateId {
        GateId::MoatAssessment
    }

    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError> {
        let Some(assessor) = &self.assessor else {
            return Ok(GateResult::advisory(self.id(), Default::default()).with_note(ASSESSOR_NOT_CONFIGURED));
        };

        let assessment = assessor.assess(ticker, provider).await?;

        if assessment.method != AssessmentMethod::LlmFailed
            && assessment.confidence < self.thresholds.llm_confidence_threshold
        {
            warn!(
                ticker = ticker,
                confidence = assessment.confidence,
                threshold = self.thresholds.llm_confidence_threshold,
                "Low-confidence moat assessment"
            );
        }

        let result = self.evaluate(&assessment);
        debug!(
            ticker = ticker,
            gate = %self.id(),
            durability = %assessment.durability,
            method = assessment.method.as_str(),
            "Gate evaluated"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FixtureProvider;
    use crate::moat::{MoatType, StaticMoatAssessor};
    use sixgates_common::MoatDurability;

    fn gate_with(assessment: MoatAssessment) -> MoatAssessmentGate {
        MoatAssessmentGate::new(
            MoatThresholds::default(),
            Some(Arc::new(StaticMoatAssessor::new(assessment))),
        )
    }

    #[tokio::test]
    async fn test_without_assessor_passes_with_note() {
        let result = MoatAssessmentGate::default()
            .analyze("AAPL", &FixtureProvider::empty())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.kill_reason.as_deref(), Some(ASSESSOR_NOT_CONFIGURED));
        assert!(result.detail::<MoatDurability>("moat_durability").is_none());
    }

    #[tokio::test]
    async fn test_durability_is_passed_through() {
        let result = gate_with(MoatAssessment::human(Some(MoatType::Brand), MoatDurability::Medium))
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert!(result.kill_reason.is_none());
        assert_eq!(
            result.detail::<MoatDurability>("moat_durability"),
            Some(MoatDurability::Medium)
        );
        assert_eq!(result.detail::<MoatType>("moat_type"), Some(MoatType::Brand));
        assert_eq!(result.detail::<String>("method").as_deref(), Some("human"));
        assert_eq!(result.metric("confidence"), Some(1.0));
    }

    #[tokio::test]
    async fn test_failed_assessment_still_passes() {
        let result = gate_with(MoatAssessment::failed("timeout"))
            .analyze("AAPL", &FixtureProvider::sample())
            .await
            .unwrap();
        assert!(result.passed);
        assert_eq!(
            result.detail::<MoatDurability>("moat_durability"),
            Some(MoatDurability::None)
        );
        assert_eq!(result.detail::<Vec<String>>("evidence").unwrap().len(), 1);
    }
}
