//! Flat (constant-rate) yield curve.

use num_traits::Float;

use super::traits::YieldCurve;
use crate::types::MarketDataError;

/// A yield curve with a single continuously compounded rate.
///
/// Mostly useful for tests and for seeding flat initial forward grids.
///
/// # Examples
///
/// ```
/// use lmm_core::curves::{FlatYieldCurve, YieldCurve};
///
/// let curve = FlatYieldCurve::new(0.05_f64);
/// let df = curve.discount(1.0).unwrap();
/// assert!((df - (-0.05_f64).exp()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatYieldCurve<T: Float> {
    rate: T,
}

impl<T: Float> FlatYieldCurve<T> {
    /// Creates a flat curve at the given continuously compounded rate.
    pub fn new(rate: T) -> Self {
        Self { rate }
    }

    /// Returns the flat rate.
    pub fn rate(&self) -> T {
        self.rate
    }
}

impl<T: Float> YieldCurve<T> for FlatYieldCurve<T> {
    fn discount(&self, t: T) -> Result<T, MarketDataError> {
        if t < T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(f64::NAN),
            });
        }
        Ok((-self.rate * t).exp())
    }
}
