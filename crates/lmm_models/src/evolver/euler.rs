//! Single-pass log-Euler evolver.

use crate::brownian::BrownianGenerator;
use crate::covariance::CovarianceParameterization;
use crate::error::ModelError;
use crate::evolver::drift::LmmDriftCalculator;
use crate::evolver::MarketModelEvolver;
use lmm_core::{EvolutionDescription, LmmCurveState};

/// Log-Euler evolution of the displaced forward rates.
///
/// Each step applies
///
/// ```text
/// log(f_i' + d_i) = log(f_i + d_i) + drift_i - C_ii/2 + (A·z)_i
/// ```
///
/// with the drift evaluated once at the step's starting state. The
/// predictor-corrector variant
/// [`LogNormalFwdRatePc`](crate::LogNormalFwdRatePc) has lower
/// discretisation bias at coarse step counts; this evolver is the cheaper
/// scheme and the building block for pathwise methods tied to a pure Euler
/// update.
pub struct LogNormalFwdRateEuler<M, G> {
    parameterization: M,
    generator: G,
    drift_calculators: Vec<LmmDriftCalculator>,
    state: LmmCurveState,
    forwards: Vec<f64>,
    drifts: Vec<f64>,
    draws: Vec<f64>,
    steps_done: usize,
    path_started: bool,
}

impl<M, G> LogNormalFwdRateEuler<M, G>
where
    M: CovarianceParameterization,
    G: BrownianGenerator,
{
    /// Builds an evolver from a covariance parameterisation and a Brownian
    /// generator.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::SizeMismatch`] if the generator's factor or
    /// step counts disagree with the parameterisation.
    pub fn new(parameterization: M, generator: G) -> Result<Self, ModelError> {
        let evolution = parameterization.evolution().clone();
        if generator.number_of_factors() != parameterization.number_of_factors() {
            return Err(ModelError::SizeMismatch {
                name: "generator factors",
                got: generator.number_of_factors(),
                expected: parameterization.number_of_factors(),
            });
        }
        if generator.number_of_steps() != evolution.number_of_steps() {
            return Err(ModelError::SizeMismatch {
                name: "generator steps",
                got: generator.number_of_steps(),
                expected: evolution.number_of_steps(),
            });
        }

        let drift_calculators = build_drift_calculators(&parameterization)?;
        let n = evolution.number_of_rates();
        let factors = parameterization.number_of_factors();
        let state = LmmCurveState::new(evolution.rate_times().clone());

        Ok(Self {
            parameterization,
            generator,
            drift_calculators,
            state,
            forwards: vec![0.0; n],
            drifts: vec![0.0; n],
            draws: vec![0.0; factors],
            steps_done: 0,
            path_started: false,
        })
    }

    /// The underlying covariance parameterisation.
    pub fn parameterization(&self) -> &M {
        &self.parameterization
    }
}

/// One drift calculator per step, keyed to that step's numeraire and alive
/// index. Shared by both evolvers.
pub(crate) fn build_drift_calculators<M: CovarianceParameterization>(
    parameterization: &M,
) -> Result<Vec<LmmDriftCalculator>, ModelError> {
    let evolution = parameterization.evolution();
    let taus = evolution.rate_times().taus();
    let mut calculators = Vec::with_capacity(evolution.number_of_steps());
    for step in 0..evolution.number_of_steps() {
        calculators.push(LmmDriftCalculator::new(
            parameterization.pseudo_root(step),
            parameterization.displacements(),
            taus,
            evolution.numeraires()[step],
            evolution.first_alive_rate()[step],
        )?);
    }
    Ok(calculators)
}

/// Applies the log-space update for the live rates of one step.
///
/// `drifts` must already hold the step's (possibly averaged) drift terms.
pub(crate) fn apply_log_update(
    forwards: &mut [f64],
    displacements: &[f64],
    drifts: &[f64],
    pseudo_root: &nalgebra::DMatrix<f64>,
    covariance_diag: impl Fn(usize) -> f64,
    draws: &[f64],
    alive: usize,
) {
    let n = forwards.len();
    for i in alive..n {
        let displaced = forwards[i] + displacements[i];
        debug_assert!(displaced > 0.0, "displaced forward must stay positive");
        let mut brownian = 0.0;
        for (f, &z) in draws.iter().enumerate() {
            brownian += pseudo_root[(i, f)] * z;
        }
        let log_next = displaced.ln() + drifts[i] - 0.5 * covariance_diag(i) + brownian;
        forwards[i] = log_next.exp() - displacements[i];
    }
}

impl<M, G> MarketModelEvolver for LogNormalFwdRateEuler<M, G>
where
    M: CovarianceParameterization,
    G: BrownianGenerator,
{
    fn evolution(&self) -> &EvolutionDescription {
        self.parameterization.evolution()
    }

    fn start_new_path(&mut self) -> f64 {
        self.forwards.copy_from_slice(self.parameterization.initial_rates());
        self.state
            .set_on_forward_rates(&self.forwards, 0)
            .expect("initial rates were validated at construction");
        self.steps_done = 0;
        self.path_started = true;
        self.generator.next_path()
    }

    fn advance_step(&mut self) -> f64 {
        assert!(self.path_started, "advance_step called before start_new_path");
        let step = self.steps_done;
        let evolution = self.parameterization.evolution();
        assert!(
            step < evolution.number_of_steps(),
            "path already complete after {} steps",
            step
        );
        let alive = evolution.first_alive_rate()[step];

        let weight = self.generator.next_step(&mut self.draws);

        let calculator = &mut self.drift_calculators[step];
        calculator.compute(&self.forwards, &mut self.drifts);
        let covariance = calculator.covariance();
        apply_log_update(
            &mut self.forwards,
            self.parameterization.displacements(),
            &self.drifts,
            self.parameterization.pseudo_root(step),
            |i| covariance[(i, i)],
            &self.draws,
            alive,
        );

        self.state
            .set_on_forward_rates(&self.forwards, alive)
            .expect("evolved forwards produced a degenerate discount curve");
        self.steps_done = step + 1;
        weight
    }

    fn current_step(&self) -> usize {
        assert!(
            self.steps_done > 0,
            "current_step queried before the first advance_step"
        );
        self.steps_done - 1
    }

    fn current_state(&self) -> &LmmCurveState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brownian::GaussianBrownianGeneratorFactory;
    use crate::correlation::exponential_forward_correlation;
    use crate::covariance::FlatVol;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use lmm_core::RateTimes;

    fn flat_vol(vol: f64) -> FlatVol {
        let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5]).unwrap());
        let evolution =
            EvolutionDescription::new(Arc::clone(&grid), vec![0.5, 1.0, 1.5, 2.0]).unwrap();
        let rho = exponential_forward_correlation(&grid.times()[..4], 0.0, 0.1, 1.0).unwrap();
        FlatVol::new(
            vec![vol; 4],
            &rho,
            evolution,
            4,
            vec![0.05; 4],
            vec![0.0; 4],
        )
        .unwrap()
    }

    fn euler(vol: f64, seed: u64) -> LogNormalFwdRateEuler<FlatVol, crate::GaussianBrownianGenerator> {
        let parameterization = flat_vol(vol);
        let generator = GaussianBrownianGeneratorFactory::new(seed).create(
            parameterization.number_of_factors(),
            parameterization.number_of_steps(),
        );
        LogNormalFwdRateEuler::new(parameterization, generator).unwrap()
    }

    #[test]
    fn test_zero_volatility_path_is_static() {
        let mut evolver = euler(0.0, 1);
        let weight = evolver.start_new_path();
        assert_eq!(weight, 1.0);
        for step in 0..4 {
            evolver.advance_step();
            assert_eq!(evolver.current_step(), step);
            let state = evolver.current_state();
            for i in state.first_valid_index()..4 {
                assert_relative_eq!(state.forward_rate(i), 0.05, epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_dead_rates_stay_frozen() {
        let mut evolver = euler(0.2, 7);
        evolver.start_new_path();
        evolver.advance_step();
        let rate0_after_fixing = evolver.current_state().forward_rate(0);
        evolver.advance_step();
        // rate 0 fixed at 0.5; its stored value must not move afterwards
        assert_eq!(evolver.current_state().forward_rates()[0], rate0_after_fixing);
        assert_eq!(evolver.current_state().first_valid_index(), 1);
    }

    #[test]
    fn test_same_seed_reproduces_paths() {
        let mut a = euler(0.2, 11);
        let mut b = euler(0.2, 11);
        for _ in 0..3 {
            a.start_new_path();
            b.start_new_path();
            for _ in 0..4 {
                a.advance_step();
                b.advance_step();
            }
            let live = a.current_state().first_valid_index();
            for i in live..4 {
                assert_eq!(
                    a.current_state().forward_rate(i),
                    b.current_state().forward_rate(i)
                );
            }
        }
    }

    #[test]
    fn test_start_new_path_rewinds_to_initial_state() {
        let mut evolver = euler(0.2, 5);
        evolver.start_new_path();
        evolver.advance_step();
        evolver.start_new_path();
        let state = evolver.current_state();
        assert_eq!(state.first_valid_index(), 0);
        for i in 0..4 {
            assert_relative_eq!(state.forward_rate(i), 0.05, epsilon = 1e-15);
        }
    }

    #[test]
    #[should_panic(expected = "path already complete")]
    fn test_overrunning_the_path_panics() {
        let mut evolver = euler(0.1, 3);
        evolver.start_new_path();
        for _ in 0..5 {
            evolver.advance_step();
        }
    }

    #[test]
    #[should_panic(expected = "before start_new_path")]
    fn test_advance_before_start_panics() {
        let mut evolver = euler(0.1, 3);
        evolver.advance_step();
    }

    #[test]
    fn test_factor_mismatch_rejected() {
        let parameterization = flat_vol(0.1);
        let generator = GaussianBrownianGeneratorFactory::new(1).create(2, 4);
        assert!(matches!(
            LogNormalFwdRateEuler::new(parameterization, generator),
            Err(ModelError::SizeMismatch { name: "generator factors", .. })
        ));
    }
}
