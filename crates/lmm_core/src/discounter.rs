//! Cash-flow-to-numeraire-bond conversion.

use crate::curve_state::LmmCurveState;
use crate::rate_times::RateTimes;
use crate::types::{CurveStateError, Real, Time};

/// Converts an amount payable at one fixed time into an equivalent number
/// of numeraire bonds, given a curve state and a numeraire index.
///
/// One discounter is constructed per distinct cash-flow time against the
/// shared tenor grid; payment times that fall between tenor boundaries are
/// handled by log-linear interpolation of the bracketing discount ratios.
/// Stateless aside from the construction-time lookup index.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lmm_core::{CashFlowDiscounter, LmmCurveState, RateTimes};
///
/// let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0]).unwrap());
/// let mut state = LmmCurveState::new(Arc::clone(&grid));
/// state.set_on_forward_rates(&[0.05; 3], 0).unwrap();
///
/// let discounter = CashFlowDiscounter::new(1.5, &grid).unwrap();
/// // paying at a tenor boundary: plain discount ratio to the numeraire
/// let bonds = discounter.numeraire_bonds(&state, 0);
/// assert!((bonds - state.discount_ratio(2, 0)).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlowDiscounter {
    before: usize,
    before_weight: Real,
}

impl CashFlowDiscounter {
    /// Creates a discounter for an amount paid at `payment_time`.
    ///
    /// # Errors
    ///
    /// Returns [`CurveStateError::NonPositiveValue`] if the payment time
    /// lies outside the tenor grid `[times[0], times[N]]` or is not finite.
    pub fn new(payment_time: Time, rate_times: &RateTimes) -> Result<Self, CurveStateError> {
        let times = rate_times.times();
        let n = rate_times.number_of_rates();
        if !payment_time.is_finite()
            || payment_time < times[0] - 1e-12
            || payment_time > times[n] + 1e-12
        {
            return Err(CurveStateError::NonPositiveValue {
                name: "payment time outside tenor grid",
                index: 0,
                value: payment_time,
            });
        }

        // last boundary at or before the payment time
        let mut before = times
            .iter()
            .position(|&t| t >= payment_time - 1e-12)
            .expect("bounds checked above");
        let before_weight = if (times[before] - payment_time).abs() <= 1e-12 {
            1.0
        } else {
            // payment strictly between boundaries: step back and weight
            before -= 1;
            (times[before + 1] - payment_time) / (times[before + 1] - times[before])
        };
        Ok(Self {
            before,
            before_weight,
        })
    }

    /// The index of the tenor boundary at or before the payment time.
    #[inline]
    pub fn before_index(&self) -> usize {
        self.before
    }

    /// Converts a unit amount paid at this discounter's time into numeraire
    /// bonds.
    ///
    /// For on-grid payment times this is exactly
    /// `curve_state.discount_ratio(before, numeraire)`; off-grid times use
    /// the log-linear interpolation
    /// `dr(before)^w * dr(before+1)^(1-w)`.
    ///
    /// # Panics
    ///
    /// Panics (through the curve state) if the state is uninitialised or
    /// the involved indices have already expired.
    pub fn numeraire_bonds(&self, curve_state: &LmmCurveState, numeraire: usize) -> Real {
        let pre = curve_state.discount_ratio(self.before, numeraire);
        if self.before_weight == 1.0 {
            return pre;
        }
        let post = curve_state.discount_ratio(self.before + 1, numeraire);
        pre.powf(self.before_weight) * post.powf(1.0 - self.before_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn setup() -> (Arc<RateTimes>, LmmCurveState) {
        let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5]).unwrap());
        let mut state = LmmCurveState::new(Arc::clone(&grid));
        state
            .set_on_forward_rates(&[0.03, 0.04, 0.05, 0.045], 0)
            .unwrap();
        (grid, state)
    }

    #[test]
    fn test_on_grid_payment() {
        let (grid, state) = setup();
        for i in 0..=4 {
            let discounter = CashFlowDiscounter::new(grid.times()[i], &grid).unwrap();
            assert_eq!(discounter.before_index(), i);
            for numeraire in 0..=4 {
                assert_relative_eq!(
                    discounter.numeraire_bonds(&state, numeraire),
                    state.discount_ratio(i, numeraire),
                    epsilon = 1e-14
                );
            }
        }
    }

    #[test]
    fn test_off_grid_payment_interpolates() {
        let (grid, state) = setup();
        let discounter = CashFlowDiscounter::new(1.25, &grid).unwrap();
        assert_eq!(discounter.before_index(), 1);

        let pre = state.discount_ratio(1, 4);
        let post = state.discount_ratio(2, 4);
        let expected = pre.powf(0.5) * post.powf(0.5);
        assert_relative_eq!(
            discounter.numeraire_bonds(&state, 4),
            expected,
            epsilon = 1e-14
        );
        // interpolated value lies between the bracketing ratios
        let bonds = discounter.numeraire_bonds(&state, 4);
        assert!(bonds < pre && bonds > post);
    }

    #[test]
    fn test_payment_before_grid_rejected() {
        let (grid, _) = setup();
        assert!(CashFlowDiscounter::new(0.25, &grid).is_err());
        assert!(CashFlowDiscounter::new(2.75, &grid).is_err());
        assert!(CashFlowDiscounter::new(f64::NAN, &grid).is_err());
    }

    #[test]
    fn test_direction_of_discounting() {
        let (grid, state) = setup();
        // paying after the numeraire matures: fewer than one bond per unit
        let late = CashFlowDiscounter::new(2.5, &grid).unwrap();
        assert!(late.numeraire_bonds(&state, 0) < 1.0);
        // paying before the numeraire matures: more than one bond per unit
        let early = CashFlowDiscounter::new(0.5, &grid).unwrap();
        assert!(early.numeraire_bonds(&state, 4) > 1.0);
    }
}
