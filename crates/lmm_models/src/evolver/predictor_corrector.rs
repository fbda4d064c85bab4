//! Predictor-corrector evolver.

use crate::brownian::BrownianGenerator;
use crate::covariance::CovarianceParameterization;
use crate::error::ModelError;
use crate::evolver::drift::LmmDriftCalculator;
use crate::evolver::euler::{apply_log_update, build_drift_calculators};
use crate::evolver::MarketModelEvolver;
use lmm_core::{EvolutionDescription, LmmCurveState};

/// Predictor-corrector evolution of the displaced forward rates.
///
/// Each step evaluates the drift twice: once at the step's starting state
/// (the predictor), and once at the trial state reached with that drift
/// (the corrector, reusing the same Gaussian draws). The final update uses
/// the average of the two drift vectors:
///
/// ```text
/// trial:  log(f + d) + drift(f)                    - C_ii/2 + A·z
/// final:  log(f + d) + (drift(f) + drift(trial))/2 - C_ii/2 + A·z
/// ```
///
/// The state-dependent drift makes a single Euler pass noticeably biased at
/// coarse step counts; the two-pass averaging must not be collapsed into
/// one evaluation.
pub struct LogNormalFwdRatePc<M, G> {
    parameterization: M,
    generator: G,
    drift_calculators: Vec<LmmDriftCalculator>,
    state: LmmCurveState,
    forwards: Vec<f64>,
    trial_forwards: Vec<f64>,
    drifts: Vec<f64>,
    trial_drifts: Vec<f64>,
    draws: Vec<f64>,
    steps_done: usize,
    path_started: bool,
}

impl<M, G> LogNormalFwdRatePc<M, G>
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
        if generator.number_of_factors() != parameterization.number_of_factors() {
            return Err(ModelError::SizeMismatch {
                name: "generator factors",
                got: generator.number_of_factors(),
                expected: parameterization.number_of_factors(),
            });
        }
        if generator.number_of_steps() != parameterization.number_of_steps() {
            return Err(ModelError::SizeMismatch {
                name: "generator steps",
                got: generator.number_of_steps(),
                expected: parameterization.number_of_steps(),
            });
        }

        let drift_calculators = build_drift_calculators(&parameterization)?;
        let n = parameterization.number_of_rates();
        let factors = parameterization.number_of_factors();
        let state = LmmCurveState::new(parameterization.evolution().rate_times().clone());

        Ok(Self {
            parameterization,
            generator,
            drift_calculators,
            state,
            forwards: vec![0.0; n],
            trial_forwards: vec![0.0; n],
            drifts: vec![0.0; n],
            trial_drifts: vec![0.0; n],
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

impl<M, G> MarketModelEvolver for LogNormalFwdRatePc<M, G>
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
        let pseudo_root = self.parameterization.pseudo_root(step);
        let displacements = self.parameterization.displacements();

        // predictor: drift at the step's starting state
        let calculator = &mut self.drift_calculators[step];
        calculator.compute(&self.forwards, &mut self.drifts);

        // trial step with the predictor drift, same draws
        self.trial_forwards.copy_from_slice(&self.forwards);
        {
            let covariance = calculator.covariance();
            apply_log_update(
                &mut self.trial_forwards,
                displacements,
                &self.drifts,
                pseudo_root,
                |i| covariance[(i, i)],
                &self.draws,
                alive,
            );
        }

        // corrector: drift at the trial state, then average
        calculator.compute(&self.trial_forwards, &mut self.trial_drifts);
        for i in alive..self.forwards.len() {
            self.drifts[i] = 0.5 * (self.drifts[i] + self.trial_drifts[i]);
        }

        let covariance = calculator.covariance();
        apply_log_update(
            &mut self.forwards,
            displacements,
            &self.drifts,
            pseudo_root,
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
