//! Day count conventions and rate-grid setup glue.
//!
//! Translates calendar dates into the year-fraction grids consumed by the
//! simulation core. This module is setup-only: nothing here is called from
//! the per-step evolution loop.

use chrono::NaiveDate;

use crate::types::{CurveStateError, Time};

/// Day count convention (year fraction convention).
///
/// Only the two conventions actually used by the rate-grid glue are carried;
/// the enum is non-exhaustive so further conventions can be added without a
/// breaking change.
///
/// # Examples
///
/// ```
/// use lmm_core::daycount::DayCount;
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
///
/// let yf = DayCount::Act365Fixed.year_fraction(start, end);
/// assert!((yf - 182.0 / 365.0).abs() < 1e-12);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayCount {
    /// Actual/365 Fixed: actual days / 365.0. Standard for derivatives.
    Act365Fixed,

    /// Actual/360: actual days / 360.0. Money-market convention.
    Act360,
}

impl DayCount {
    /// Returns the standard convention name.
    pub fn name(&self) -> &'static str {
        match self {
            DayCount::Act365Fixed => "ACT/365F",
            DayCount::Act360 => "ACT/360",
        }
    }

    /// Calculates the year fraction between two dates.
    ///
    /// # Panics
    ///
    /// Panics if `start > end`.
    pub fn year_fraction(&self, start: NaiveDate, end: NaiveDate) -> Time {
        assert!(
            start <= end,
            "start date must be less than or equal to end date"
        );
        let days = (end - start).num_days() as f64;
        match self {
            DayCount::Act365Fixed => days / 365.0,
            DayCount::Act360 => days / 360.0,
        }
    }
}

impl std::fmt::Display for DayCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Converts a schedule of tenor boundary dates into a year-fraction grid.
///
/// The first date is the reference (valuation) date and is not part of the
/// returned grid; the remaining dates become the tenor boundaries measured
/// from it. The output is suitable for [`RateTimes`](crate::RateTimes)
/// construction.
///
/// # Errors
///
/// Returns [`CurveStateError::GridTooShort`] if fewer than three dates are
/// supplied (reference plus at least two boundaries), and
/// [`CurveStateError::NonIncreasingTimes`] if the dates are not strictly
/// increasing.
///
/// # Examples
///
/// ```
/// use lmm_core::daycount::{rate_time_grid, DayCount};
/// use chrono::NaiveDate;
///
/// let dates: Vec<_> = (0..=4)
///     .map(|i| NaiveDate::from_ymd_opt(2024 + i, 1, 1).unwrap())
///     .collect();
/// let grid = rate_time_grid(&dates, DayCount::Act365Fixed).unwrap();
/// assert_eq!(grid.len(), 4);
/// assert!(grid[0] > 0.9 && grid[0] < 1.1);
/// ```
pub fn rate_time_grid(dates: &[NaiveDate], day_count: DayCount) -> Result<Vec<Time>, CurveStateError> {
    if dates.len() < 3 {
        return Err(CurveStateError::GridTooShort { got: dates.len() });
    }
    let reference = dates[0];
    let mut grid = Vec::with_capacity(dates.len() - 1);
    for (i, window) in dates.windows(2).enumerate() {
        if window[1] <= window[0] {
            return Err(CurveStateError::NonIncreasingTimes {
                index: i + 1,
                previous: day_count.year_fraction(reference, window[0].max(reference)),
                current: day_count.year_fraction(reference, window[1].max(reference)),
            });
        }
        grid.push(day_count.year_fraction(reference, window[1]));
    }
    Ok(grid)
}
