//! Forward-rate evolvers.
//!
//! An evolver owns the current [`LmmCurveState`] and advances it one step
//! at a time along a simulated path. Exactly one path is in flight per
//! evolver instance; parallel workers construct their own evolvers.

pub mod drift;
pub mod euler;
pub mod predictor_corrector;

pub use drift::LmmDriftCalculator;
pub use euler::LogNormalFwdRateEuler;
pub use predictor_corrector::LogNormalFwdRatePc;

use lmm_core::{EvolutionDescription, LmmCurveState};

/// The path-evolution contract.
///
/// A path moves through `start_new_path` followed by one `advance_step`
/// per evolution step; both return multiplicative path-weight
/// contributions. After an `advance_step`, `current_step` names the step
/// just computed and `current_state` exposes the state at that step's
/// evolution time. `start_new_path` rewinds to step zero, so an evolver
/// is reused across all paths of a run.
pub trait MarketModelEvolver {
    /// The run's timetable.
    fn evolution(&self) -> &EvolutionDescription;

    /// Per-step numeraire indices (delegates to the timetable).
    fn numeraires(&self) -> &[usize] {
        self.evolution().numeraires()
    }

    /// Begins a new path and returns its initial weight.
    fn start_new_path(&mut self) -> f64;

    /// Performs the next step and returns its weight contribution.
    ///
    /// # Panics
    ///
    /// Panics if the path is already complete or no path was started.
    fn advance_step(&mut self) -> f64;

    /// Index of the step most recently computed.
    ///
    /// # Panics
    ///
    /// Panics if no step has been performed on the current path.
    fn current_step(&self) -> usize;

    /// The curve state after the most recent step (the initial state right
    /// after `start_new_path`).
    fn current_state(&self) -> &LmmCurveState;
}
