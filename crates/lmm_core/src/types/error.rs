//! Error types for curve construction and evolution timetables.
//!
//! Setter- and constructor-level failures are reported through these enums;
//! hot-path query violations panic instead (see the crate-level notes).

use thiserror::Error;

/// Errors raised when building or mutating a curve state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CurveStateError {
    /// A tenor grid needs at least two boundary times.
    #[error("Rate-time grid too short: got {got} times, need at least 2")]
    GridTooShort {
        /// Number of boundary times provided
        got: usize,
    },

    /// Tenor boundary times must be finite and strictly increasing.
    #[error("Rate times not strictly increasing at index {index}: {previous} >= {current}")]
    NonIncreasingTimes {
        /// Index of the offending time
        index: usize,
        /// Time at `index - 1`
        previous: f64,
        /// Time at `index`
        current: f64,
    },

    /// The first tenor boundary must lie strictly in the future.
    #[error("First rate time must be positive, got {t}")]
    NonPositiveFirstTime {
        /// The offending first time
        t: f64,
    },

    /// A supplied vector does not match the curve dimension.
    #[error("Size mismatch for {name}: got {got}, expected {expected}")]
    SizeMismatch {
        /// Name of the offending input
        name: &'static str,
        /// Length provided
        got: usize,
        /// Length required
        expected: usize,
    },

    /// `first_valid_index` must leave at least one live rate.
    #[error("First valid index {first} out of range, number of rates is {number_of_rates}")]
    FirstIndexOutOfRange {
        /// The offending index
        first: usize,
        /// Curve dimension
        number_of_rates: usize,
    },

    /// A quantity that must be strictly positive was not.
    #[error("Non-positive {name} at index {index}: {value}")]
    NonPositiveValue {
        /// Name of the offending quantity
        name: &'static str,
        /// Index of the offending entry
        index: usize,
        /// The offending value
        value: f64,
    },
}

/// Errors raised when building an evolution timetable.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvolutionError {
    /// Evolution times must be finite and strictly increasing.
    #[error("Evolution times not strictly increasing at index {index}")]
    NonIncreasingTimes {
        /// Index of the offending time
        index: usize,
    },

    /// No evolution steps were supplied.
    #[error("Evolution timetable is empty")]
    Empty,

    /// Evolution must not outlive the last rate fixing.
    #[error("Last evolution time {last} is beyond the final rate fixing {limit}")]
    BeyondLastFixing {
        /// Last evolution time supplied
        last: f64,
        /// Final fixing time of the rate grid
        limit: f64,
    },

    /// One numeraire index is required per evolution step.
    #[error("Numeraire count {got} does not match step count {expected}")]
    NumeraireCountMismatch {
        /// Numeraires provided
        got: usize,
        /// Evolution steps
        expected: usize,
    },

    /// A numeraire bond must not have expired at its step.
    #[error("Numeraire {numeraire} at step {step} expires before evolution time {time}")]
    ExpiredNumeraire {
        /// The offending numeraire index
        numeraire: usize,
        /// The evolution step
        step: usize,
        /// The step's evolution time
        time: f64,
    },

    /// A time grid that must be contained in another was not.
    #[error("Time {time} required by a subscriber is missing from the evolution grid")]
    TimeNotInGrid {
        /// The missing time
        time: f64,
    },
}

/// Errors raised by the yield-curve lookup interface.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Negative time to maturity.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid maturity value
        t: f64,
    },

    /// A rate or discount factor outside its admissible domain.
    #[error("Invalid curve input: {reason}")]
    InvalidInput {
        /// Human-readable description
        reason: String,
    },
}
