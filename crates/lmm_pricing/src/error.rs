//! Pricing-layer error types.

use thiserror::Error;

/// Errors raised by the collection and accounting engines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectorError {
    /// The evolver's timetable disagrees with a subscriber's.
    #[error("Incompatible evolution timetables: {reason}")]
    IncompatibleEvolution {
        /// Human-readable description
        reason: String,
    },

    /// Node-data collection requires at least one exercise date.
    #[error("No exercise dates declared by the rebate")]
    NoExerciseDates,

    /// Not enough valid observations to fit a regression.
    #[error("Exercise date {exercise} has {got} valid paths, need at least {need}")]
    InsufficientValidPaths {
        /// Exercise date index (1-based row index)
        exercise: usize,
        /// Valid observations available
        got: usize,
        /// Minimum required
        need: usize,
    },

    /// The collected rows have inconsistent shapes.
    #[error("Malformed collected data: {reason}")]
    MalformedData {
        /// Human-readable description
        reason: String,
    },

    /// A least-squares solve failed to produce coefficients.
    #[error("Regression solve failed at exercise date {exercise}")]
    SingularRegression {
        /// Exercise date index (1-based row index)
        exercise: usize,
    },

    /// An error propagated from the foundation layer.
    #[error("Curve error: {0}")]
    Curve(#[from] lmm_core::types::CurveStateError),

    /// An evolution-timetable error propagated from the foundation layer.
    #[error("Evolution error: {0}")]
    Evolution(#[from] lmm_core::types::EvolutionError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised when validating a collector configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Path count outside the admissible range.
    #[error("Invalid path count: {0}")]
    InvalidPathCount(usize),

    /// Chunk size outside the admissible range.
    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    /// A required parameter was not supplied.
    #[error("Missing parameter: {name}")]
    MissingParameter {
        /// Name of the missing parameter
        name: &'static str,
    },
}
