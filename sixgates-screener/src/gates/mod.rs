//! Gate contract and the nine gate implementations.
//!
//! A gate reads already-published fundamentals for one ticker and produces a
//! `GateResult`. Business conditions never error: missing data becomes an
//! "Insufficient data" result. Only provider transport failures propagate.
//!
//! # Gates
//!
//! | Id | Gate | Kills |
//! |----|------|-------|
//! | gate_1 | Capital allocation | dividend cuts |
//! | gate_1_5 | Moat assessment | never |
//! | gate_2 | Economic engine | thin ROIC spread, falling margins |
//! | gate_2_5 | Capital structure | leverage, coverage, maturity, stress |
//! | gate_2_75 | Reinvestment runway | never |
//! | gate_3 | Cash integrity | weak conversion, accruals, receivables |
//! | gate_3_5 | Complexity filter | never |
//! | gate_4 | Valuation | PEG above acceptable |
//! | gate_5 | Narrative | never |

mod capital_allocation;
mod capital_structure;
mod cash_integrity;
mod complexity;
mod economic_engine;
mod moat;
mod narrative;
mod reinvestment_runway;
mod valuation;

pub use capital_allocation::CapitalAllocationGate;
pub use capital_structure::CapitalStructureGate;
pub use cash_integrity::CashIntegrityGate;
pub use complexity::ComplexityFilterGate;
pub use economic_engine::EconomicEngineGate;
pub use moat::MoatAssessmentGate;
pub use narrative::NarrativeGate;
pub use reinvestment_runway::ReinvestmentRunwayGate;
pub use valuation::ValuationGate;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sixgates_common::ThresholdsConfig;

use crate::data::{FinancialDataProvider, ProviderError};
use crate::moat::MoatAssessor;

/// Kill reason for a gate that could not be evaluated.
pub const INSUFFICIENT_DATA: &str = "Insufficient data";

// ============================================================================
// Gate Id
// ============================================================================

/// The nine fixed gate identifiers, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateId {
    #[serde(rename = "gate_1")]
    CapitalAllocation,
    #[serde(rename = "gate_1_5")]
    MoatAssessment,
    #[serde(rename = "gate_2")]
    EconomicEngine,
    #[serde(rename = "gate_2_5")]
    CapitalStructure,
    #[serde(rename = "gate_2_75")]
    ReinvestmentRunway,
    #[serde(rename = "gate_3")]
    CashIntegrity,
    #[serde(rename = "gate_3_5")]
    ComplexityFilter,
    #[serde(rename = "gate_4")]
    Valuation,
    #[serde(rename = "gate_5")]
    Narrative,
}

impl GateId {
    /// All gates in canonical registration order.
    pub const ALL: [GateId; 9] = [
        GateId::CapitalAllocation,
        GateId::MoatAssessment,
        GateId::EconomicEngine,
        GateId::CapitalStructure,
        GateId::ReinvestmentRunway,
        GateId::CashIntegrity,
        GateId::ComplexityFilter,
        GateId::Valuation,
        GateId::Narrative,
    ];

    /// Gates whose failure makes a ticker uninvestable.
    pub const QUALITY_GATES: [GateId; 5] = [
        GateId::CapitalAllocation,
        GateId::EconomicEngine,
        GateId::CapitalStructure,
        GateId::CashIntegrity,
        GateId::ComplexityFilter,
    ];

    pub fn is_quality_gate(self) -> bool {
        Self::QUALITY_GATES.contains(&self)
    }

    /// Wire id, e.g. "gate_2_5".
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CapitalAllocation => "gate_1",
            Self::MoatAssessment => "gate_1_5",
            Self::EconomicEngine => "gate_2",
            Self::CapitalStructure => "gate_2_5",
            Self::ReinvestmentRunway => "gate_2_75",
            Self::CashIntegrity => "gate_3",
            Self::ComplexityFilter => "gate_3_5",
            Self::Valuation => "gate_4",
            Self::Narrative => "gate_5",
        }
    }

    /// Human-readable gate name.
    pub const fn title(self) -> &'static str {
        match self {
            Self::CapitalAllocation => "Capital Allocation",
            Self::MoatAssessment => "Moat Assessment",
            Self::EconomicEngine => "Economic Engine",
            Self::CapitalStructure => "Capital Structure",
            Self::ReinvestmentRunway => "Reinvestment Runway",
            Self::CashIntegrity => "Cash Integrity",
            Self::ComplexityFilter => "Complexity Filter",
            Self::Valuation => "Valuation",
            Self::Narrative => "Narrative",
        }
    }
}

impl fmt::Display for GateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Gate Result
// ============================================================================

/// Verdict of one gate for one ticker. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateResult {
    pub gate_id: GateId,
    pub passed: bool,
    /// Named numeric metrics
    pub metrics: BTreeMap<String, f64>,
    pub kill_reason: Option<String>,
    /// Categorical outputs (runway category, moat durability, status, ...)
    pub details: BTreeMap<String, serde_json::Value>,
}

impl GateResult {
    /// Verdict from a list of kill reasons: passes when the list is empty.
    pub fn from_reasons(gate_id: GateId, metrics: BTreeMap<String, f64>, reasons: Vec<String>) -> Self {
        let kill_reason = if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        };

        Self {
            gate_id,
            passed: kill_reason.is_none(),
            metrics,
            kill_reason,
            details: BTreeMap::new(),
        }
    }

    /// Passing result for gates that never kill.
    pub fn advisory(gate_id: GateId, metrics: BTreeMap<String, f64>) -> Self {
        Self {
            gate_id,
            passed: true,
            metrics,
            kill_reason: None,
            details: BTreeMap::new(),
        }
    }

    /// Failed result for a killing gate whose inputs are missing.
    pub fn insufficient(gate_id: GateId) -> Self {
        Self {
            gate_id,
            passed: false,
            metrics: BTreeMap::new(),
            kill_reason: Some(INSUFFICIENT_DATA.to_string()),
            details: BTreeMap::new(),
        }
    }

    /// Passing result for an advisory gate whose inputs are missing.
    ///
    /// The absence of data is still reported through the kill reason.
    pub fn advisory_insufficient(gate_id: GateId) -> Self {
        Self {
            passed: true,
            ..Self::insufficient(gate_id)
        }
    }

    /// Attach a note without changing the verdict.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.kill_reason = Some(note.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Decode a categorical detail into a typed value.
    pub fn detail<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.details
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn is_insufficient(&self) -> bool {
        self.kill_reason.as_deref() == Some(INSUFFICIENT_DATA)
    }
}

/// Build a metric map from `(name, value)` pairs.
pub(crate) fn metrics<const N: usize>(pairs: [(&str, f64); N]) -> BTreeMap<String, f64> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ============================================================================
// Gate Trait
// ============================================================================

/// One rule module scoring one financial dimension.
#[async_trait]
pub trait Gate: Send + Sync {
    fn id(&self) -> GateId;

    /// Evaluate `ticker`; only provider transport failures return `Err`.
    async fn analyze(
        &self,
        ticker: &str,
        provider: &dyn FinancialDataProvider,
    ) -> Result<GateResult, ProviderError>;
}

/// The nine gates in canonical order, each with its own threshold record.
pub fn standard_gates(
    thresholds: &ThresholdsConfig,
    moat_assessor: Option<Arc<dyn MoatAssessor>>,
) -> Vec<Box<dyn Gate>> {
    vec![
        Box::new(CapitalAllocationGate::new(thresholds.gate_1.clone())),
        Box::new(MoatAssessmentGate::new(thresholds.gate_1_5.clone(), moat_assessor)),
        Box::new(EconomicEngineGate::new(thresholds.gate_2.clone())),
        Box::new(CapitalStructureGate::new(thresholds.gate_2_5.clone())),
        Box::new(ReinvestmentRunwayGate::new(thresholds.gate_2_75.clone())),
        Box::new(CashIntegrityGate::new(thresholds.gate_3.clone())),
        Box::new(ComplexityFilterGate::new(thresholds.gate_3_5.clone())),
        Box::new(ValuationGate::new(thresholds.gate_4.clone())),
        Box::new(NarrativeGate::new(thresholds.gate_5.clone())),
    ]
}

// ============================================================================
// Tests
// ============================================================================
