//! Screener error type.

use thiserror::Error;

use sixgates_common::ValidationError;

use crate::data::ProviderError;
use crate::gates::GateId;

/// Top-level errors from building or running the screening pipeline.
///
/// Business conditions (missing data, failed gates) are never errors; they
/// live in the `GateResult`s.
#[derive(Debug, Error)]
pub enum ScreenerError {
    /// A provider call failed at the transport level; the run was aborted
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Invalid thresholds
    #[error("Invalid thresholds: {0}")]
    Config(#[from] ValidationError),

    #[error("Gate {0} is already registered")]
    DuplicateGate(GateId),

    /// No income statement at all for the ticker
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),
}

pub type Result<T> = std::result::Result<T, ScreenerError>;
