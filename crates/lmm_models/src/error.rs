//! Model-layer error types.

use thiserror::Error;

/// Errors raised when building covariance parameterisations or evolvers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A supplied vector or matrix does not match the model dimension.
    #[error("Size mismatch for {name}: got {got}, expected {expected}")]
    SizeMismatch {
        /// Name of the offending input
        name: &'static str,
        /// Size provided
        got: usize,
        /// Size required
        expected: usize,
    },

    /// A matrix that must be square was not.
    #[error("Matrix {name} is not square: {rows}x{cols}")]
    NotSquare {
        /// Name of the offending matrix
        name: &'static str,
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// A correlation matrix entry outside [-1, 1], an asymmetric matrix,
    /// or a non-unit diagonal.
    #[error("Invalid correlation matrix: {reason}")]
    InvalidCorrelation {
        /// Human-readable description
        reason: String,
    },

    /// A volatility or model parameter outside its admissible domain.
    #[error("Invalid {name} at index {index}: {value}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Index of the offending entry
        index: usize,
        /// The offending value
        value: f64,
    },

    /// The requested factor count is impossible for the model dimension.
    #[error("Factor count {factors} out of range [1, {max}]")]
    InvalidFactorCount {
        /// Requested factors
        factors: usize,
        /// Maximum admissible factors
        max: usize,
    },

    /// A displaced forward must stay strictly positive for log-space
    /// evolution.
    #[error("Non-positive displaced forward at index {index}: {value}")]
    NonPositiveDisplacedForward {
        /// Rate index
        index: usize,
        /// The offending displaced value
        value: f64,
    },

    /// An error propagated from the foundation layer.
    #[error("Curve error: {0}")]
    Curve(#[from] lmm_core::types::CurveStateError),

    /// An evolution-timetable error propagated from the foundation layer.
    #[error("Evolution error: {0}")]
    Evolution(#[from] lmm_core::types::EvolutionError),
}
