//! The exercise-value capability trait.

use std::sync::Arc;

use crate::error::CollectorError;
use crate::product::CashFlow;
use lmm_core::types::Time;
use lmm_core::{EvolutionDescription, LmmCurveState, RateTimes};

/// A path observer producing an exercise (or rebate, or control-variate)
/// value at designated evolution times.
///
/// The same contract serves the rebate received on exercise and the
/// optional control variate; the collector drives one instance of each
/// through the shared step loop.
pub trait ExerciseValue {
    /// The timetable this observer needs.
    fn evolution(&self) -> &EvolutionDescription;

    /// For each of this observer's evolution times, whether it is an
    /// exercise opportunity.
    fn is_exercise_time(&self) -> &[bool];

    /// All times at which the produced value can be paid.
    fn possible_cash_flow_times(&self) -> &[Time];

    /// Rewinds to the start of a path.
    fn reset(&mut self);

    /// Advances past one of this observer's evolution times.
    ///
    /// Called once per observer evolution time, before any
    /// [`value`](Self::value) query at that time.
    fn next_step(&mut self, curve_state: &LmmCurveState);

    /// The value at the evolution time most recently passed, as an amount
    /// at one of the declared payment times.
    fn value(&self, curve_state: &LmmCurveState) -> CashFlow;
}

/// An exercise value that is identically zero.
///
/// Used as the rebate of a plain cancellable product (breaking a swap pays
/// nothing) and as the no-op control variate. Every rate time before the
/// terminal boundary counts as an exercise opportunity unless a subset is
/// supplied.
#[derive(Debug, Clone)]
pub struct NothingExerciseValue {
    evolution: EvolutionDescription,
    exercise_flags: Vec<bool>,
    payment_times: Vec<Time>,
    next_index: usize,
    value_index: usize,
}

impl NothingExerciseValue {
    /// Zero exercise value at every fixing time.
    ///
    /// # Errors
    ///
    /// Propagates timetable-construction failures.
    pub fn new(rate_times: Arc<RateTimes>) -> Result<Self, CollectorError> {
        let n = rate_times.number_of_rates();
        let fixing_times: Vec<Time> = rate_times.times()[..n].to_vec();
        Self::with_exercise_times(rate_times, fixing_times)
    }

    /// Zero exercise value at the given subset of fixing times.
    ///
    /// # Errors
    ///
    /// Propagates timetable-construction failures; in particular, exercise
    /// times that are not fixing times are rejected.
    pub fn with_exercise_times(
        rate_times: Arc<RateTimes>,
        exercise_times: Vec<Time>,
    ) -> Result<Self, CollectorError> {
        let n = rate_times.number_of_rates();
        // exercise times must sit on the fixing grid
        lmm_core::evolution::is_in_subset(&rate_times.times()[..n], &exercise_times)?;
        let payment_times = exercise_times.clone();
        let count = exercise_times.len();
        let evolution = EvolutionDescription::new(rate_times, exercise_times)?;
        Ok(Self {
            evolution,
            exercise_flags: vec![true; count],
            payment_times,
            next_index: 0,
            value_index: 0,
        })
    }
}

impl ExerciseValue for NothingExerciseValue {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }

    fn is_exercise_time(&self) -> &[bool] {
        &self.exercise_flags
    }

    fn possible_cash_flow_times(&self) -> &[Time] {
        &self.payment_times
    }

    fn reset(&mut self) {
        self.next_index = 0;
        self.value_index = 0;
    }

    fn next_step(&mut self, _curve_state: &LmmCurveState) {
        self.value_index = self.next_index;
        self.next_index += 1;
    }

    fn value(&self, _curve_state: &LmmCurveState) -> CashFlow {
        CashFlow {
            time_index: self.value_index,
            amount: 0.0,
        }
    }
}
