//! Error types for climate index computation.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// How far an error is allowed to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorScope {
    /// Aborts the whole run.
    Run,
    /// Skips one (model, experiment) unit.
    Unit,
    /// Skips one biome or one (biome, period) value.
    Biome,
}

impl ErrorScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorScope::Run => "run",
            ErrorScope::Unit => "unit",
            ErrorScope::Biome => "biome",
        }
    }
}

/// Primary error type for index computation and aggregation.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Configuration Errors ===
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    // === Data Errors ===
    #[error("Data unavailable for {model}/{experiment}: {reason}")]
    DataUnavailable {
        model: String,
        experiment: String,
        reason: String,
    },

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    // === Computation Errors ===
    #[error("Mask for '{region}' selects no grid cells")]
    EmptyMask { region: String },

    #[error("Insufficient data for '{biome}' in {period}: {valid} of {total} cells valid")]
    InsufficientData {
        biome: String,
        period: String,
        valid: usize,
        total: usize,
    },

    // === Run Errors ===
    #[error("No models succeeded ({0} unit(s) skipped)")]
    AllModelsFailed(usize),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ClimateError {
    /// Create a ConfigInvalid error.
    pub fn config_invalid(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Create a DataUnavailable error.
    pub fn data_unavailable(
        model: impl Into<String>,
        experiment: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::DataUnavailable {
            model: model.into(),
            experiment: experiment.into(),
            reason: reason.into(),
        }
    }

    /// Create an EmptyMask error.
    pub fn empty_mask(region: impl Into<String>) -> Self {
        Self::EmptyMask {
            region: region.into(),
        }
    }

    /// Propagation scope of this error.
    pub fn scope(&self) -> ErrorScope {
        match self {
            ClimateError::ConfigInvalid(_)
            | ClimateError::InvalidBbox(_)
            | ClimateError::AllModelsFailed(_) => ErrorScope::Run,

            ClimateError::DataUnavailable { .. }
            | ClimateError::InvalidGrid(_)
            | ClimateError::ShapeMismatch { .. }
            | ClimateError::Io(_) => ErrorScope::Unit,

            ClimateError::EmptyMask { .. } | ClimateError::InsufficientData { .. } => {
                ErrorScope::Biome
            }
        }
    }

    /// Whether this error aborts the run.
    pub fn is_fatal(&self) -> bool {
        self.scope() == ErrorScope::Run
    }

    /// Stable identifier used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ClimateError::ConfigInvalid(_) => "config_invalid",
            ClimateError::InvalidBbox(_) => "invalid_bbox",
            ClimateError::DataUnavailable { .. } => "data_unavailable",
            ClimateError::InvalidGrid(_) => "invalid_grid",
            ClimateError::ShapeMismatch { .. } => "shape_mismatch",
            ClimateError::EmptyMask { .. } => "empty_mask",
            ClimateError::InsufficientData { .. } => "insufficient_data",
            ClimateError::AllModelsFailed(_) => "all_models_failed",
            ClimateError::Io(_) => "io",
        }
    }
}

impl From<std::io::Error> for ClimateError {
    fn from(err: std::io::Error) -> Self {
        ClimateError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes() {
        assert!(ClimateError::config_invalid("x").is_fatal());
        assert!(ClimateError::AllModelsFailed(3).is_fatal());
        assert_eq!(
            ClimateError::data_unavailable("m", "historical", "missing").scope(),
            ErrorScope::Unit
        );
        assert_eq!(ClimateError::empty_mask("Fynbos").scope(), ErrorScope::Biome);
    }

    #[test]
    fn test_display() {
        let err = ClimateError::data_unavailable("ACCESS-CM2", "ssp245", "no files");
        assert_eq!(
            err.to_string(),
            "Data unavailable for ACCESS-CM2/ssp245: no files"
        );
        assert_eq!(err.kind(), "data_unavailable");
    }
}
