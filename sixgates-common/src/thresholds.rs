//! Threshold records for the gates, the tier classifier, the sizer and the
//! market assessors.
//!
//! One immutable record per component. Every field carries a serde default so a
//! partial `thresholds` section in `config.json` only overrides what it names.

use serde::{Deserialize, Serialize};

use crate::levels::{MoatDurability, Predictability, RunwayCategory};

// ============================================================================
// Root
// ============================================================================

/// All thresholds, keyed the way the `thresholds` config section is laid out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default)]
    pub gate_1: CapitalAllocationThresholds,
    #[serde(default)]
    pub gate_1_5: MoatThresholds,
    #[serde(default)]
    pub gate_2: EconomicEngineThresholds,
    #[serde(default)]
    pub gate_2_5: CapitalStructureThresholds,
    #[serde(default)]
    pub gate_2_75: ReinvestmentRunwayThresholds,
    #[serde(default)]
    pub gate_3: CashIntegrityThresholds,
    #[serde(default)]
    pub gate_3_5: ComplexityThresholds,
    #[serde(default)]
    pub gate_4: ValuationThresholds,
    #[serde(default)]
    pub gate_5: NarrativeThresholds,
    #[serde(default)]
    pub quality_tiers: QualityTierThresholds,
    #[serde(default)]
    pub market: MarketThresholds,
    #[serde(default)]
    pub macro_risk: MacroRiskThresholds,
    #[serde(default)]
    pub position_sizing: PositionSizingThresholds,
}

// ============================================================================
// Gate 1: Capital Allocation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalAllocationThresholds {
    /// Trailing window for net insider activity
    #[serde(default = "default_insider_months")]
    pub insider_net_buy_months: u32,
    /// Period-over-period dividend drop that counts as a cut
    #[serde(default = "default_dividend_cut_tolerance")]
    pub dividend_cut_tolerance: f64,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for CapitalAllocationThresholds {
    fn default() -> Self {
        Self {
            insider_net_buy_months: default_insider_months(),
            dividend_cut_tolerance: default_dividend_cut_tolerance(),
            lookback_years: default_five(),
        }
    }
}

fn default_insider_months() -> u32 {
    12
}

fn default_dividend_cut_tolerance() -> f64 {
    0.05
}

fn default_five() -> usize {
    5
}

// ============================================================================
// Gate 1.5: Moat Assessment
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoatThresholds {
    /// Below this confidence the assessment is logged as low-confidence
    #[serde(default = "default_llm_confidence")]
    pub llm_confidence_threshold: f64,
    #[serde(default = "default_moat_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for MoatThresholds {
    fn default() -> Self {
        Self {
            llm_confidence_threshold: default_llm_confidence(),
            max_tokens: default_moat_max_tokens(),
            lookback_years: default_five(),
        }
    }
}

fn default_llm_confidence() -> f64 {
    0.7
}

fn default_moat_max_tokens() -> u32 {
    2000
}

// ============================================================================
// Gate 2: Economic Engine
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicEngineThresholds {
    #[serde(default = "default_min_spread")]
    pub min_roic_wacc_spread: f64,
    /// Minimum acceptable slope of the operating-margin series
    #[serde(default = "default_margin_decline")]
    pub margin_decline_threshold: f64,
    /// Fixed cost of capital
    #[serde(default = "default_wacc")]
    pub wacc: f64,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for EconomicEngineThresholds {
    fn default() -> Self {
        Self {
            min_roic_wacc_spread: default_min_spread(),
            margin_decline_threshold: default_margin_decline(),
            wacc: default_wacc(),
            lookback_years: default_five(),
        }
    }
}

fn default_min_spread() -> f64 {
    0.03
}

fn default_margin_decline() -> f64 {
    -0.02
}

fn default_wacc() -> f64 {
    0.08
}

// ============================================================================
// Gate 2.5: Capital Structure
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalStructureThresholds {
    #[serde(default = "default_max_net_debt_ebitda")]
    pub max_net_debt_ebitda: f64,
    #[serde(default = "default_min_interest_coverage")]
    pub min_interest_coverage: f64,
    /// Maximum short-term share of total debt
    #[serde(default = "default_max_debt_due")]
    pub max_debt_due_pct: f64,
    /// EBITDA haircut applied in the stress test
    #[serde(default = "default_stress_drop")]
    pub stress_test_revenue_drop: f64,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for CapitalStructureThresholds {
    fn default() -> Self {
        Self {
            max_net_debt_ebitda: default_max_net_debt_ebitda(),
            min_interest_coverage: default_min_interest_coverage(),
            max_debt_due_pct: default_max_debt_due(),
            stress_test_revenue_drop: default_stress_drop(),
            lookback_years: default_five(),
        }
    }
}

fn default_max_net_debt_ebitda() -> f64 {
    3.0
}

fn default_min_interest_coverage() -> f64 {
    2.5
}

fn default_max_debt_due() -> f64 {
    0.30
}

fn default_stress_drop() -> f64 {
    0.30
}

// ============================================================================
// Gate 2.75: Reinvestment Runway
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinvestmentRunwayThresholds {
    /// Periods fetched; incremental ROIC spans oldest to newest
    #[serde(default = "default_runway_lookback")]
    pub lookback_years: usize,
    #[serde(default = "default_long_reinvestment")]
    pub long_runway_reinvestment: f64,
    #[serde(default = "default_long_roic")]
    pub long_runway_incremental_roic: f64,
    #[serde(default = "default_medium_reinvestment")]
    pub medium_runway_reinvestment: f64,
    #[serde(default = "default_medium_roic")]
    pub medium_runway_incremental_roic: f64,
    #[serde(default = "default_limited_reinvestment")]
    pub limited_runway_reinvestment: f64,
}

impl Default for ReinvestmentRunwayThresholds {
    fn default() -> Self {
        Self {
            lookback_years: default_runway_lookback(),
            long_runway_reinvestment: default_long_reinvestment(),
            long_runway_incremental_roic: default_long_roic(),
            medium_runway_reinvestment: default_medium_reinvestment(),
            medium_runway_incremental_roic: default_medium_roic(),
            limited_runway_reinvestment: default_limited_reinvestment(),
        }
    }
}

fn default_runway_lookback() -> usize {
    4
}

fn default_long_reinvestment() -> f64 {
    0.50
}

fn default_long_roic() -> f64 {
    0.15
}

fn default_medium_reinvestment() -> f64 {
    0.30
}

fn default_medium_roic() -> f64 {
    0.10
}

fn default_limited_reinvestment() -> f64 {
    0.10
}

// ============================================================================
// Gate 3: Cash Integrity
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashIntegrityThresholds {
    #[serde(default = "default_min_fcf_conversion")]
    pub min_fcf_conversion: f64,
    #[serde(default = "default_max_accruals")]
    pub max_accruals_ratio: f64,
    #[serde(default = "default_max_receivables_divergence")]
    pub max_receivables_divergence: f64,
    /// Periods summed for FCF conversion
    #[serde(default = "default_conversion_years")]
    pub conversion_years: usize,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for CashIntegrityThresholds {
    fn default() -> Self {
        Self {
            min_fcf_conversion: default_min_fcf_conversion(),
            max_accruals_ratio: default_max_accruals(),
            max_receivables_divergence: default_max_receivables_divergence(),
            conversion_years: default_conversion_years(),
            lookback_years: default_five(),
        }
    }
}

fn default_min_fcf_conversion() -> f64 {
    0.80
}

fn default_max_accruals() -> f64 {
    0.10
}

fn default_max_receivables_divergence() -> f64 {
    0.10
}

fn default_conversion_years() -> usize {
    3
}

// ============================================================================
// Gate 3.5: Complexity Filter
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityThresholds {
    /// Predictability below this band is reported in the kill reason
    #[serde(default = "default_min_predictability")]
    pub min_earnings_predictability: Predictability,
    /// EPS coefficient of variation below this is "high" predictability
    #[serde(default = "default_high_cov")]
    pub high_cov: f64,
    /// Below this (and above `high_cov`) is "medium"
    #[serde(default = "default_medium_cov")]
    pub medium_cov: f64,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            min_earnings_predictability: default_min_predictability(),
            high_cov: default_high_cov(),
            medium_cov: default_medium_cov(),
            lookback_years: default_five(),
        }
    }
}

fn default_min_predictability() -> Predictability {
    Predictability::Medium
}

fn default_high_cov() -> f64 {
    0.15
}

fn default_medium_cov() -> f64 {
    0.30
}

// ============================================================================
// Gate 4: Valuation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationThresholds {
    #[serde(default = "default_peg_attractive")]
    pub peg_attractive: f64,
    /// PEG above this fails the gate ("wait for a better price")
    #[serde(default = "default_peg_acceptable")]
    pub peg_acceptable: f64,
    #[serde(default = "default_pegy_attractive")]
    pub pegy_attractive: f64,
    #[serde(default = "default_five")]
    pub lookback_years: usize,
}

impl Default for ValuationThresholds {
    fn default() -> Self {
        Self {
            peg_attractive: default_peg_attractive(),
            peg_acceptable: default_peg_acceptable(),
            pegy_attractive: default_pegy_attractive(),
            lookback_years: default_five(),
        }
    }
}

fn default_peg_attractive() -> f64 {
    1.0
}

fn default_peg_acceptable() -> f64 {
    1.5
}

fn default_pegy_attractive() -> f64 {
    1.5
}

// ============================================================================
// Gate 5: Narrative
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeThresholds {
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    #[serde(default = "default_optimistic_above")]
    pub optimistic_above: f64,
    #[serde(default = "default_pessimistic_below")]
    pub pessimistic_below: f64,
}

impl Default for NarrativeThresholds {
    fn default() -> Self {
        Self {
            max_articles: default_max_articles(),
            optimistic_above: default_optimistic_above(),
            pessimistic_below: default_pessimistic_below(),
        }
    }
}

fn default_max_articles() -> usize {
    10
}

fn default_optimistic_above() -> f64 {
    0.5
}

fn default_pessimistic_below() -> f64 {
    -0.5
}

// ============================================================================
// Quality Tiers
// ============================================================================

/// Requirements for one tier. `None` means the dimension is not checked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierRequirement {
    pub min_roic_spread: f64,
    #[serde(default)]
    pub min_moat_durability: Option<MoatDurability>,
    #[serde(default)]
    pub min_runway: Option<RunwayCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityTierThresholds {
    #[serde(default = "default_exceptional")]
    pub exceptional: TierRequirement,
    #[serde(default = "default_high_quality")]
    pub high_quality: TierRequirement,
    #[serde(default = "default_good_quality")]
    pub good_quality: TierRequirement,
    #[serde(default = "default_acceptable")]
    pub acceptable: TierRequirement,
}

impl Default for QualityTierThresholds {
    fn default() -> Self {
        Self {
            exceptional: default_exceptional(),
            high_quality: default_high_quality(),
            good_quality: default_good_quality(),
            acceptable: default_acceptable(),
        }
    }
}

fn default_exceptional() -> TierRequirement {
    TierRequirement {
        min_roic_spread: 0.15,
        min_moat_durability: Some(MoatDurability::High),
        min_runway: Some(RunwayCategory::LongRunway),
    }
}

fn default_high_quality() -> TierRequirement {
    TierRequirement {
        min_roic_spread: 0.10,
        min_moat_durability: Some(MoatDurability::Medium),
        min_runway: Some(RunwayCategory::MediumRunway),
    }
}

fn default_good_quality() -> TierRequirement {
    TierRequirement {
        min_roic_spread: 0.05,
        min_moat_durability: Some(MoatDurability::Low),
        min_runway: None,
    }
}

fn default_acceptable() -> TierRequirement {
    TierRequirement {
        min_roic_spread: 0.03,
        min_moat_durability: None,
        min_runway: None,
    }
}

// ============================================================================
// Market Regime
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketThresholds {
    /// Index proxy sampled for the regime
    #[serde(default = "default_benchmark")]
    pub benchmark_ticker: String,
    #[serde(default = "default_pe_high")]
    pub pe_high: f64,
    #[serde(default = "default_pe_low")]
    pub pe_low: f64,
    /// Used when the benchmark has no trailing P/E
    #[serde(default = "default_pe")]
    pub default_pe: f64,
}

impl Default for MarketThresholds {
    fn default() -> Self {
        Self {
            benchmark_ticker: default_benchmark(),
            pe_high: default_pe_high(),
            pe_low: default_pe_low(),
            default_pe: default_pe(),
        }
    }
}

fn default_benchmark() -> String {
    "SPY".to_string()
}

fn default_pe_high() -> f64 {
    25.0
}

fn default_pe_low() -> f64 {
    15.0
}

fn default_pe() -> f64 {
    20.0
}

// ============================================================================
// Macro Early Warning
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroRiskThresholds {
    #[serde(default = "default_vix_ticker")]
    pub vix_ticker: String,
    #[serde(default = "default_ten_year")]
    pub ten_year_ticker: String,
    #[serde(default = "default_two_year")]
    pub two_year_ticker: String,
    /// Year-over-year CPI in percent; no CPI series is wired in yet
    #[serde(default = "default_inflation")]
    pub inflation_rate: f64,
}

impl Default for MacroRiskThresholds {
    fn default() -> Self {
        Self {
            vix_ticker: default_vix_ticker(),
            ten_year_ticker: default_ten_year(),
            two_year_ticker: default_two_year(),
            inflation_rate: default_inflation(),
        }
    }
}

fn default_vix_ticker() -> String {
    "^VIX".to_string()
}

fn default_ten_year() -> String {
    "10Y".to_string()
}

fn default_two_year() -> String {
    "2Y".to_string()
}

fn default_inflation() -> f64 {
    3.5
}

// ============================================================================
// Position Sizing
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizingThresholds {
    #[serde(default = "default_size_maximum")]
    pub maximum: f64,
    #[serde(default = "default_size_large")]
    pub large: f64,
    #[serde(default = "default_size_standard")]
    pub standard: f64,
    #[serde(default = "default_size_small")]
    pub small: f64,
    #[serde(default = "default_size_starter")]
    pub starter: f64,
    #[serde(default = "default_absolute_max")]
    pub absolute_max: f64,
    #[serde(default = "default_bear_multiplier")]
    pub bear_multiplier: f64,
    #[serde(default = "default_high_risk_multiplier")]
    pub high_risk_multiplier: f64,
    /// Risk scores strictly above this trigger `high_risk_multiplier`
    #[serde(default = "default_high_risk_score")]
    pub high_risk_score: f64,
}

impl Default for PositionSizingThresholds {
    fn default() -> Self {
        Self {
            maximum: default_size_maximum(),
            large: default_size_large(),
            standard: default_size_standard(),
            small: default_size_small(),
            starter: default_size_starter(),
            absolute_max: default_absolute_max(),
            bear_multiplier: default_bear_multiplier(),
            high_risk_multiplier: default_high_risk_multiplier(),
            high_risk_score: default_high_risk_score(),
        }
    }
}

fn default_size_maximum() -> f64 {
    0.15
}

fn default_size_large() -> f64 {
    0.10
}

fn default_size_standard() -> f64 {
    0.05
}

fn default_size_small() -> f64 {
    0.03
}

fn default_size_starter() -> f64 {
    0.01
}

fn default_absolute_max() -> f64 {
    0.20
}

fn default_bear_multiplier() -> f64 {
    0.5
}

fn default_high_risk_multiplier() -> f64 {
    0.7
}

fn default_high_risk_score() -> f64 {
    70.0
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_thresholds() {
        let t = ThresholdsConfig::default();
        assert!((t.gate_2.wacc - 0.08).abs() < f64::EPSILON);
        assert!((t.gate_2_5.max_net_debt_ebitda - 3.0).abs() < f64::EPSILON);
        assert_eq!(t.gate_2_75.lookback_years, 4);
        assert_eq!(t.gate_3_5.min_earnings_predictability, Predictability::Medium);
        assert_eq!(
            t.quality_tiers.exceptional.min_moat_durability,
            Some(MoatDurability::High)
        );
        assert!(t.quality_tiers.acceptable.min_runway.is_none());
        assert_eq!(t.market.benchmark_ticker, "SPY");
        assert!((t.position_sizing.absolute_max - 0.20).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let json = r#"{
            "gate_2": { "wacc": 0.09 },
            "quality_tiers": {
                "good_quality": { "min_roic_spread": 0.06, "min_moat_durability": "medium" }
            }
        }"#;
        let t: ThresholdsConfig = serde_json::from_str(json).unwrap();
        assert!((t.gate_2.wacc - 0.09).abs() < f64::EPSILON);
        assert!((t.gate_2.min_roic_wacc_spread - 0.03).abs() < f64::EPSILON);
        assert_eq!(
            t.quality_tiers.good_quality.min_moat_durability,
            Some(MoatDurability::Medium)
        );
        assert_eq!(
            t.quality_tiers.exceptional.min_runway,
            Some(RunwayCategory::LongRunway)
        );
    }

    #[test]
    fn test_tier_requirement_needs_spread() {
        let json = r#"{ "quality_tiers": { "acceptable": {} } }"#;
        assert!(serde_json::from_str::<ThresholdsConfig>(json).is_err());
    }
}
