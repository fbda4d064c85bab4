//! Yield curve trait definition.

use crate::types::MarketDataError;
use num_traits::Float;

/// Generic yield curve trait for discount factor and rate lookups.
///
/// Implementations are generic over `T: Float` so the same curve code can be
/// driven with plain `f64` or with dual-number types when sensitivities are
/// propagated through the setup layer.
///
/// # Contract
///
/// - `discount(t)` returns the discount factor D(t) for maturity t
/// - `zero_rate(t)` returns the continuously compounded zero rate r(t)
/// - `forward_rate(t1, t2)` returns the simply compounded forward rate
///   between t1 and t2
///
/// # Invariants
///
/// - D(0) = 1
/// - D(t) > 0 for all t >= 0
///
/// Monotonicity of D in t is a financial convention assumed by callers; it
/// is not enforced here.
pub trait YieldCurve<T: Float> {
    /// Returns the discount factor for maturity `t`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::InvalidMaturity`] if `t < 0`.
    fn discount(&self, t: T) -> Result<T, MarketDataError>;

    /// Returns the continuously compounded zero rate for maturity `t`.
    ///
    /// Default implementation: `r(t) = -ln(D(t)) / t`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::InvalidMaturity`] if `t <= 0`.
    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        let df = self.discount(t)?;
        if t <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(-df.ln() / t)
    }

    /// Returns the simply compounded forward rate between `t1` and `t2`.
    ///
    /// Default implementation: `f = (D(t1)/D(t2) - 1) / (t2 - t1)`, the
    /// discrete forward consistent with the forward-rate grids used by the
    /// simulation core.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::InvalidMaturity`] if `t2 <= t1`.
    fn forward_rate(&self, t1: T, t2: T) -> Result<T, MarketDataError> {
        let df1 = self.discount(t1)?;
        let df2 = self.discount(t2)?;
        let dt = t2 - t1;
        if dt <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: dt.to_f64().unwrap_or(0.0),
            });
        }
        Ok((df1 / df2 - T::one()) / dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockCurve {
        rate: f64,
    }

    impl YieldCurve<f64> for MockCurve {
        fn discount(&self, t: f64) -> Result<f64, MarketDataError> {
            if t < 0.0 {
                return Err(MarketDataError::InvalidMaturity { t });
            }
            Ok((-self.rate * t).exp())
        }
    }

    #[test]
    fn test_default_zero_rate() {
        let curve = MockCurve { rate: 0.05 };
        let r = curve.zero_rate(1.0).unwrap();
        assert!((r - 0.05).abs() < 1e-10);
    }

    #[test]
    fn test_default_zero_rate_invalid_maturity() {
        let curve = MockCurve { rate: 0.05 };
        assert!(curve.zero_rate(0.0).is_err());
    }

    #[test]
    fn test_default_forward_rate_is_simply_compounded() {
        let curve = MockCurve { rate: 0.05 };
        let f = curve.forward_rate(1.0, 1.5).unwrap();
        // (e^{0.05*0.5} - 1) / 0.5
        let expected = ((0.05_f64 * 0.5).exp() - 1.0) / 0.5;
        assert!((f - expected).abs() < 1e-12);
    }

    #[test]
    fn test_default_forward_rate_invalid() {
        let curve = MockCurve { rate: 0.05 };
        assert!(curve.forward_rate(2.0, 1.0).is_err());
    }
}
