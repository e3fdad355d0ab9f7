//! Six Gates Common - Shared configuration, thresholds, errors and logging.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.sixgates/config.json` + env overrides)
//! - Per-gate threshold records and their validation
//! - Ordinal level enums shared by the thresholds and the engine
//! - Error types and handling utilities
//! - Logging setup and structured logging helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod levels;
pub mod logging;
pub mod thresholds;
pub mod util;
pub mod validation;

pub use config::{Config, FmpConfig, LlmConfig, ObservabilityConfig, ProvidersConfig};
pub use error::{Error, Result, ResultExt};
pub use levels::{MoatDurability, Predictability, RunwayCategory};
pub use thresholds::{
    CapitalAllocationThresholds, CapitalStructureThresholds, CashIntegrityThresholds,
    ComplexityThresholds, EconomicEngineThresholds, MacroRiskThresholds, MarketThresholds,
    MoatThresholds, NarrativeThresholds, PositionSizingThresholds, QualityTierThresholds,
    ReinvestmentRunwayThresholds, ThresholdsConfig, TierRequirement, ValuationThresholds,
};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::levels::{MoatDurability, Predictability, RunwayCategory};
    pub use crate::logging::init_logging;
    pub use crate::thresholds::ThresholdsConfig;
    pub use crate::validation::{Validate, ValidationError};
}
