//! The basis-system capability trait.

use std::sync::Arc;

use crate::error::CollectorError;
use lmm_core::types::Time;
use lmm_core::{EvolutionDescription, LmmCurveState, RateTimes};

/// A path observer producing the regressor vector for the
/// continuation-value fit at each exercise date.
pub trait BasisSystem {
    /// The timetable this observer needs (its evolution times are the
    /// exercise dates).
    fn evolution(&self) -> &EvolutionDescription;

    /// Number of basis functions produced at each exercise date.
    fn number_of_functions(&self) -> &[usize];

    /// Rewinds to the start of a path.
    fn reset(&mut self);

    /// Advances past one exercise date.
    ///
    /// Called once per exercise date, before any [`values`](Self::values)
    /// query at that date.
    fn next_step(&mut self, curve_state: &LmmCurveState);

    /// Writes the regressor vector for the exercise date most recently
    /// passed into `values` (cleared first).
    fn values(&self, curve_state: &LmmCurveState, values: &mut Vec<f64>);
}

/// Swap-rate basis: constant, the front forward rate, and the coterminal
/// swap rate from the current exercise index.
///
/// At the final exercise date the coterminal swap collapses onto the last
/// forward, so only the constant and the forward are produced there.
#[derive(Debug, Clone)]
pub struct SwapBasisSystem {
    evolution: EvolutionDescription,
    rate_indices: Vec<usize>,
    function_counts: Vec<usize>,
    next_index: usize,
    active_index: usize,
}

impl SwapBasisSystem {
    /// Builds the basis system for the given exercise times (each must be
    /// a fixing time of the grid).
    ///
    /// # Errors
    ///
    /// Rejects off-grid exercise times and propagates timetable failures.
    pub fn new(
        rate_times: Arc<RateTimes>,
        exercise_times: Vec<Time>,
    ) -> Result<Self, CollectorError> {
        let n = rate_times.number_of_rates();
        let fixings = &rate_times.times()[..n];
        let mask = lmm_core::evolution::is_in_subset(fixings, &exercise_times)?;
        let rate_indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, &hit)| hit.then_some(i))
            .collect();
        let function_counts: Vec<usize> = rate_indices
            .iter()
            .map(|&r| if r + 1 < n { 3 } else { 2 })
            .collect();
        let evolution = EvolutionDescription::new(rate_times, exercise_times)?;
        Ok(Self {
            evolution,
            rate_indices,
            function_counts,
            next_index: 0,
            active_index: 0,
        })
    }
}

impl BasisSystem for SwapBasisSystem {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }

    fn number_of_functions(&self) -> &[usize] {
        &self.function_counts
    }

    fn reset(&mut self) {
        self.next_index = 0;
        self.active_index = 0;
    }

    fn next_step(&mut self, _curve_state: &LmmCurveState) {
        self.active_index = self.next_index;
        self.next_index += 1;
    }

    fn values(&self, curve_state: &LmmCurveState, values: &mut Vec<f64>) {
        let rate_index = self.rate_indices[self.active_index];
        let n = curve_state.number_of_rates();
        values.clear();
        values.push(1.0);
        values.push(curve_state.forward_rate(rate_index));
        if rate_index + 1 < n {
            values.push(curve_state.coterminal_swap_rate(rate_index + 1));
        }
    }
}
