//! The run-wide evolution timetable.
//!
//! An [`EvolutionDescription`] fixes, for the life of a run, the tenor grid,
//! the simulation step boundaries, and the numeraire bond used for
//! discounting over each step. Products, exercise values and basis systems
//! each carry their own description; the collector aligns them against the
//! evolver's grid with the time-set utilities below.

use std::sync::Arc;

use crate::rate_times::RateTimes;
use crate::types::{EvolutionError, Time};

/// Static description of one simulation run's timetable.
///
/// Immutable once constructed. The numeraire defaults to the discretely
/// compounded money-market measure and can be overridden through
/// [`with_numeraires`](Self::with_numeraires).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lmm_core::{EvolutionDescription, RateTimes};
///
/// let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0]).unwrap());
/// let evolution =
///     EvolutionDescription::new(grid, vec![0.5, 1.0, 1.5]).unwrap();
/// assert_eq!(evolution.number_of_steps(), 3);
/// // money-market measure: numeraire is the first unexpired bond
/// assert_eq!(evolution.numeraires(), &[0, 1, 2]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionDescription {
    rate_times: Arc<RateTimes>,
    evolution_times: Vec<Time>,
    numeraires: Vec<usize>,
    first_alive: Vec<usize>,
}

impl EvolutionDescription {
    /// Builds a timetable under the money-market measure.
    ///
    /// # Errors
    ///
    /// - [`EvolutionError::Empty`] for an empty step list
    /// - [`EvolutionError::NonIncreasingTimes`] if the evolution times are
    ///   not finite, positive and strictly increasing
    /// - [`EvolutionError::BeyondLastFixing`] if evolution continues past
    ///   the final rate fixing
    pub fn new(
        rate_times: Arc<RateTimes>,
        evolution_times: Vec<Time>,
    ) -> Result<Self, EvolutionError> {
        let numeraires = money_market_measure(&rate_times, &evolution_times)?;
        Self::with_numeraires(rate_times, evolution_times, numeraires)
    }

    /// Builds a timetable with explicit per-step numeraire indices.
    ///
    /// # Errors
    ///
    /// In addition to the conditions of [`new`](Self::new):
    /// - [`EvolutionError::NumeraireCountMismatch`] if the numeraire list
    ///   does not have one entry per step
    /// - [`EvolutionError::ExpiredNumeraire`] if some step's numeraire bond
    ///   matures before that step's evolution time
    pub fn with_numeraires(
        rate_times: Arc<RateTimes>,
        evolution_times: Vec<Time>,
        numeraires: Vec<usize>,
    ) -> Result<Self, EvolutionError> {
        validate_evolution_times(&rate_times, &evolution_times)?;
        if numeraires.len() != evolution_times.len() {
            return Err(EvolutionError::NumeraireCountMismatch {
                got: numeraires.len(),
                expected: evolution_times.len(),
            });
        }
        let times = rate_times.times();
        for (step, (&numeraire, &t)) in numeraires.iter().zip(&evolution_times).enumerate() {
            if numeraire > rate_times.number_of_rates() || times[numeraire] < t {
                return Err(EvolutionError::ExpiredNumeraire {
                    numeraire,
                    step,
                    time: t,
                });
            }
        }

        // rates alive during step k are those not yet fixed at the step's
        // start; rates fixing exactly at a step's end stay in the state
        // through that step
        let mut first_alive = Vec::with_capacity(evolution_times.len());
        let mut alive = 0usize;
        let mut previous = 0.0;
        for &t in &evolution_times {
            while alive < rate_times.number_of_rates() && times[alive] <= previous {
                alive += 1;
            }
            first_alive.push(alive);
            previous = t;
        }

        Ok(Self {
            rate_times,
            evolution_times,
            numeraires,
            first_alive,
        })
    }

    /// The shared tenor grid.
    #[inline]
    pub fn rate_times(&self) -> &Arc<RateTimes> {
        &self.rate_times
    }

    /// Number of forward-rate accrual periods.
    #[inline]
    pub fn number_of_rates(&self) -> usize {
        self.rate_times.number_of_rates()
    }

    /// The simulation step boundary times.
    #[inline]
    pub fn evolution_times(&self) -> &[Time] {
        &self.evolution_times
    }

    /// Number of simulation steps.
    #[inline]
    pub fn number_of_steps(&self) -> usize {
        self.evolution_times.len()
    }

    /// The numeraire bond index for each step.
    #[inline]
    pub fn numeraires(&self) -> &[usize] {
        &self.numeraires
    }

    /// For each step, the index of the first rate still alive at the step's
    /// start.
    #[inline]
    pub fn first_alive_rate(&self) -> &[usize] {
        &self.first_alive
    }

    /// Checks that this description and `other` share the same tenor grid
    /// and evolution times (numeraires may differ).
    ///
    /// # Errors
    ///
    /// Returns [`EvolutionError::TimeNotInGrid`] naming the first
    /// mismatched time.
    pub fn check_compatibility(&self, other: &EvolutionDescription) -> Result<(), EvolutionError> {
        if self.rate_times.times() != other.rate_times.times() {
            return Err(EvolutionError::TimeNotInGrid {
                time: other.rate_times.times()[0],
            });
        }
        if self.evolution_times != other.evolution_times {
            let time = other
                .evolution_times
                .iter()
                .find(|t| !self.evolution_times.contains(t))
                .copied()
                .unwrap_or(self.evolution_times[0]);
            return Err(EvolutionError::TimeNotInGrid { time });
        }
        Ok(())
    }
}

fn validate_evolution_times(
    rate_times: &RateTimes,
    evolution_times: &[Time],
) -> Result<(), EvolutionError> {
    if evolution_times.is_empty() {
        return Err(EvolutionError::Empty);
    }
    let mut previous = 0.0;
    for (i, &t) in evolution_times.iter().enumerate() {
        if !t.is_finite() || t <= previous {
            return Err(EvolutionError::NonIncreasingTimes { index: i });
        }
        previous = t;
    }
    let limit = rate_times.fixing_time(rate_times.number_of_rates() - 1);
    let last = *evolution_times.last().expect("non-empty");
    if last > limit {
        return Err(EvolutionError::BeyondLastFixing { last, limit });
    }
    Ok(())
}

/// Numeraire indices for the discretely compounded money-market measure:
/// at each step the numeraire is the first bond not yet expired.
///
/// # Errors
///
/// Propagates the validation errors of the evolution times.
pub fn money_market_measure(
    rate_times: &RateTimes,
    evolution_times: &[Time],
) -> Result<Vec<usize>, EvolutionError> {
    validate_evolution_times(rate_times, evolution_times)?;
    let times = rate_times.times();
    let mut numeraires = Vec::with_capacity(evolution_times.len());
    let mut j = 0usize;
    for &t in evolution_times {
        while times[j] < t {
            j += 1;
        }
        numeraires.push(j);
    }
    Ok(numeraires)
}

/// Numeraire indices for the terminal measure: every step discounts with
/// the bond maturing at the final tenor boundary.
pub fn terminal_measure(rate_times: &RateTimes, evolution_times: &[Time]) -> Vec<usize> {
    vec![rate_times.number_of_rates(); evolution_times.len()]
}

/// Merges several sorted time grids into one sorted, deduplicated grid.
///
/// Used to build an evolution grid that is a superset of every
/// subscriber's required times.
pub fn merge_times(grids: &[&[Time]]) -> Vec<Time> {
    let mut merged: Vec<Time> = grids.iter().flat_map(|g| g.iter().copied()).collect();
    merged.sort_by(|a, b| a.partial_cmp(b).expect("times must not be NaN"));
    merged.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
    merged
}

/// Marks which elements of `set` belong to `subset`.
///
/// Both inputs must be sorted. Times are matched with a 1e-12 tolerance.
///
/// # Errors
///
/// Returns [`EvolutionError::TimeNotInGrid`] if some element of `subset`
/// does not appear in `set`.
pub fn is_in_subset(set: &[Time], subset: &[Time]) -> Result<Vec<bool>, EvolutionError> {
    let mut mask = vec![false; set.len()];
    let mut i = 0usize;
    for &t in subset {
        while i < set.len() && set[i] < t - 1e-12 {
            i += 1;
        }
        if i >= set.len() || (set[i] - t).abs() > 1e-12 {
            return Err(EvolutionError::TimeNotInGrid { time: t });
        }
        mask[i] = true;
        i += 1;
    }
    Ok(mask)
}
