//! The tenor grid shared across a simulation run.

use crate::types::{CurveStateError, Time};

/// An ordered, strictly increasing sequence of N+1 tenor boundary times
/// defining N forward-rate accrual periods.
///
/// Immutable once constructed; one instance (usually behind an `Arc`) is
/// shared by every curve state, product, and discounter of a run.
///
/// # Examples
///
/// ```
/// use lmm_core::RateTimes;
///
/// let grid = RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5]).unwrap();
/// assert_eq!(grid.number_of_rates(), 4);
/// assert!((grid.taus()[0] - 0.5).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateTimes {
    times: Vec<Time>,
    taus: Vec<Time>,
}

impl RateTimes {
    /// Builds a tenor grid from N+1 boundary times.
    ///
    /// # Errors
    ///
    /// - [`CurveStateError::GridTooShort`] for fewer than two times
    /// - [`CurveStateError::NonPositiveFirstTime`] if the first boundary is
    ///   not strictly positive
    /// - [`CurveStateError::NonIncreasingTimes`] if the times are not
    ///   finite and strictly increasing
    pub fn new(times: Vec<Time>) -> Result<Self, CurveStateError> {
        if times.len() < 2 {
            return Err(CurveStateError::GridTooShort { got: times.len() });
        }
        if !times[0].is_finite() || times[0] <= 0.0 {
            return Err(CurveStateError::NonPositiveFirstTime { t: times[0] });
        }
        for i in 1..times.len() {
            if !times[i].is_finite() || times[i] <= times[i - 1] {
                return Err(CurveStateError::NonIncreasingTimes {
                    index: i,
                    previous: times[i - 1],
                    current: times[i],
                });
            }
        }
        let taus = times.windows(2).map(|w| w[1] - w[0]).collect();
        Ok(Self { times, taus })
    }

    /// Number of forward-rate accrual periods (N).
    #[inline]
    pub fn number_of_rates(&self) -> usize {
        self.taus.len()
    }

    /// The N+1 tenor boundary times.
    #[inline]
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// The N accrual fractions `times[i+1] - times[i]`.
    #[inline]
    pub fn taus(&self) -> &[Time] {
        &self.taus
    }

    /// The fixing time of rate `i`, i.e. `times[i]`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= number_of_rates()`.
    #[inline]
    pub fn fixing_time(&self, i: usize) -> Time {
        assert!(
            i < self.number_of_rates(),
            "fixing index {} out of range, number of rates is {}",
            i,
            self.number_of_rates()
        );
        self.times[i]
    }

    /// The terminal tenor boundary `times[N]`.
    #[inline]
    pub fn terminal_time(&self) -> Time {
        *self.times.last().expect("grid has at least two times")
    }
}
