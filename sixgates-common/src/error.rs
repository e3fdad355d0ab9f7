//! Error types for the Six Gates screener.

use thiserror::Error;

/// Result type alias using the common error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for configuration loading and validation.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Threshold validation failure
    #[error(transparent)]
    Validation(#[from] crate::validation::ValidationError),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a threshold validation failure.
    pub fn is_config(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::WithContext { source, .. } => source.is_config(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;

    #[test]
    fn test_error_with_context() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let with_ctx = err.with_context("reading config.json");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert!(with_ctx.to_string().starts_with("reading config.json"));
    }

    #[test]
    fn test_is_config_sees_through_context() {
        let err: Result<()> = Err(ValidationError::MissingField {
            field: "position_sizing.maximum".into(),
        })
        .context("building sizer");
        assert!(err.unwrap_err().is_config());
        let io = Error::Io(std::io::Error::other("disk"));
        assert!(!io.is_config());
    }
}
