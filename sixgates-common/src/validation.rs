//! Threshold validation.
//!
//! Invalid thresholds are a configuration error and must surface before any
//! ticker is scored, so every fallible constructor in the engine calls
//! [`Validate::validate`] on the record it receives.

use thiserror::Error;

use crate::thresholds::{
    CapitalStructureThresholds, CashIntegrityThresholds, ComplexityThresholds,
    EconomicEngineThresholds, MarketThresholds, NarrativeThresholds, PositionSizingThresholds,
    QualityTierThresholds, ReinvestmentRunwayThresholds, ThresholdsConfig,
};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

fn fraction(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} is not a fraction in [0, 1]"),
        });
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} must be a positive number"),
        });
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: "must be finite".to_string(),
        });
    }
    Ok(())
}

fn lookback(field: &str, value: usize) -> ValidationResult<()> {
    if value < 2 {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            reason: format!("{value} periods is too short, need at least 2"),
        });
    }
    Ok(())
}

/// Run every check, returning the single error or all of them.
fn collect(checks: Vec<ValidationResult<()>>) -> ValidationResult<()> {
    let mut errors: Vec<ValidationError> = checks.into_iter().filter_map(Result::err).collect();
    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}

impl Validate for ThresholdsConfig {
    fn validate(&self) -> ValidationResult<()> {
        collect(vec![
            lookback("gate_1.lookback_years", self.gate_1.lookback_years),
            fraction("gate_1.dividend_cut_tolerance", self.gate_1.dividend_cut_tolerance),
            fraction(
                "gate_1_5.llm_confidence_threshold",
                self.gate_1_5.llm_confidence_threshold,
            ),
            self.gate_2.validate(),
            self.gate_2_5.validate(),
            self.gate_2_75.validate(),
            self.gate_3.validate(),
            self.gate_3_5.validate(),
            positive("gate_4.peg_acceptable", self.gate_4.peg_acceptable),
            lookback("gate_4.lookback_years", self.gate_4.lookback_years),
            self.gate_5.validate(),
            self.quality_tiers.validate(),
            self.market.validate(),
            self.position_sizing.validate(),
        ])
    }
}

impl Validate for EconomicEngineThresholds {
    fn validate(&self) -> ValidationResult<()> {
        collect(vec![
            fraction("gate_2.wacc", self.wacc),
            finite("gate_2.min_roic_wacc_spread", self.min_roic_wacc_spread),
            finite("gate_2.margin_decline_threshold", self.margin_decline_threshold),
            lookback("gate_2.lookback_years", self.lookback_years),
        ])
    }
}

impl Validate for CapitalStructureThresholds {
    fn validate(&self) -> ValidationResult<()> {
        collect(vec![
            positive("gate_2_5.max_net_debt_ebitda", self.max_net_debt_ebitda),
            positive("gate_2_5.min_interest_coverage", self.min_interest_coverage),
            fraction("gate_2_5.max_debt_due_pct", self.max_debt_due_pct),
            fraction("gate_2_5.stress_test_revenue_drop", self.stress_test_revenue_drop),
        ])
    }
}

impl Validate for ReinvestmentRunwayThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = vec![lookback("gate_2_75.lookback_years", self.lookback_years)];
        if !(self.long_runway_reinvestment >= self.medium_runway_reinvestment
            && self.medium_runway_reinvestment >= self.limited_runway_reinvestment)
        {
            checks.push(Err(ValidationError::Conflict {
                reason: "gate_2_75 reinvestment bands must be non-increasing from long to limited"
                    .to_string(),
            }));
        }
        collect(checks)
    }
}

impl Validate for CashIntegrityThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = vec![
            finite("gate_3.min_fcf_conversion", self.min_fcf_conversion),
            finite("gate_3.max_accruals_ratio", self.max_accruals_ratio),
            finite("gate_3.max_receivables_divergence", self.max_receivables_divergence),
            lookback("gate_3.lookback_years", self.lookback_years),
        ];
        if self.conversion_years == 0 || self.conversion_years > self.lookback_years {
            checks.push(Err(ValidationError::InvalidValue {
                field: "gate_3.conversion_years".to_string(),
                reason: format!(
                    "must be between 1 and lookback_years ({})",
                    self.lookback_years
                ),
            }));
        }
        collect(checks)
    }
}

impl Validate for ComplexityThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = vec![
            positive("gate_3_5.high_cov", self.high_cov),
            lookback("gate_3_5.lookback_years", self.lookback_years),
        ];
        if self.high_cov >= self.medium_cov {
            checks.push(Err(ValidationError::Conflict {
                reason: "gate_3_5.high_cov must be below gate_3_5.medium_cov".to_string(),
            }));
        }
        collect(checks)
    }
}

impl Validate for NarrativeThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = Vec::new();
        if self.max_articles == 0 {
            checks.push(Err(ValidationError::InvalidValue {
                field: "gate_5.max_articles".to_string(),
                reason: "must be at least 1".to_string(),
            }));
        }
        if self.pessimistic_below > self.optimistic_above {
            checks.push(Err(ValidationError::Conflict {
                reason: "gate_5.pessimistic_below must not exceed gate_5.optimistic_above"
                    .to_string(),
            }));
        }
        collect(checks)
    }
}

impl Validate for QualityTierThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let spreads = [
            ("exceptional", self.exceptional.min_roic_spread),
            ("high_quality", self.high_quality.min_roic_spread),
            ("good_quality", self.good_quality.min_roic_spread),
            ("acceptable", self.acceptable.min_roic_spread),
        ];
        let mut checks: Vec<ValidationResult<()>> = spreads
            .iter()
            .map(|(name, v)| finite(&format!("quality_tiers.{name}.min_roic_spread"), *v))
            .collect();
        if spreads.windows(2).any(|w| w[0].1 < w[1].1) {
            checks.push(Err(ValidationError::Conflict {
                reason: "quality_tiers min_roic_spread must be non-increasing from exceptional to acceptable"
                    .to_string(),
            }));
        }
        collect(checks)
    }
}

impl Validate for MarketThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = vec![
            positive("market.pe_low", self.pe_low),
            positive("market.default_pe", self.default_pe),
        ];
        if self.benchmark_ticker.trim().is_empty() {
            checks.push(Err(ValidationError::MissingField {
                field: "market.benchmark_ticker".to_string(),
            }));
        }
        if self.pe_low >= self.pe_high {
            checks.push(Err(ValidationError::Conflict {
                reason: format!(
                    "market.pe_low ({}) must be below market.pe_high ({})",
                    self.pe_low, self.pe_high
                ),
            }));
        }
        collect(checks)
    }
}

impl Validate for PositionSizingThresholds {
    fn validate(&self) -> ValidationResult<()> {
        let mut checks = Vec::new();
        if !(self.absolute_max > 0.0 && self.absolute_max <= 1.0) {
            checks.push(Err(ValidationError::InvalidValue {
                field: "position_sizing.absolute_max".to_string(),
                reason: format!("{} must be in (0, 1]", self.absolute_max),
            }));
        }
        for (name, size) in [
            ("maximum", self.maximum),
            ("large", self.large),
            ("standard", self.standard),
            ("small", self.small),
            ("starter", self.starter),
        ] {
            if !size.is_finite() || size < 0.0 || size > self.absolute_max {
                checks.push(Err(ValidationError::InvalidValue {
                    field: format!("position_sizing.{name}"),
                    reason: format!("{size} must be in [0, absolute_max={}]", self.absolute_max),
                }));
            }
        }
        checks.push(fraction("position_sizing.bear_multiplier", self.bear_multiplier));
        checks.push(fraction(
            "position_sizing.high_risk_multiplier",
            self.high_risk_multiplier,
        ));
        collect(checks)
    }
}
