//! Numeric type aliases and error types.

pub mod error;

pub use error::{CurveStateError, EvolutionError, MarketDataError};

/// General-purpose real number used throughout the library.
pub type Real = f64;

/// An interest rate (simple compounding unless stated otherwise).
pub type Rate = f64;

/// A point in time, expressed as a year fraction from the reference date.
pub type Time = f64;

/// A discount factor, or a ratio of discount factors.
pub type DiscountFactor = f64;
