//! End-to-end collector checks: numeraire bookkeeping, validity and
//! cash-flow bucketing, parallel determinism, and the full
//! Longstaff-Schwartz pipeline on a Bermudan payer swaption.

use std::sync::Arc;

use approx::assert_relative_eq;
use lmm_core::evolution::{merge_times, terminal_measure};
use lmm_core::types::Time;
use lmm_core::{EvolutionDescription, LmmCurveState, RateTimes};
use lmm_models::correlation::exponential_forward_correlation;
use lmm_models::{
    CovarianceParameterization, FlatVol, GaussianBrownianGenerator,
    GaussianBrownianGeneratorFactory, LogNormalFwdRatePc, MarketModelEvolver,
};
use lmm_pricing::{
    collect_node_data, collect_node_data_parallel, longstaff_schwartz_regression,
    AccountingEngine, BasisSystem, CashFlow, CollectorConfig, ExerciseValue, MarketModelProduct,
    MultiStepSwap, NothingExerciseValue, SequenceStats, SwapBasisSystem,
};

const RATE_LEVEL: f64 = 0.05;

fn grid() -> Arc<RateTimes> {
    Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]).unwrap())
}

fn initial_state() -> LmmCurveState {
    let mut state = LmmCurveState::new(grid());
    state.set_on_forward_rates(&[RATE_LEVEL; 5], 0).unwrap();
    state
}

fn pc_evolver(
    vol: f64,
    evolution_times: Vec<Time>,
    numeraires: Option<Vec<usize>>,
    seed: u64,
    first_path: usize,
) -> LogNormalFwdRatePc<FlatVol, GaussianBrownianGenerator> {
    let grid = grid();
    let n = grid.number_of_rates();
    let evolution = match numeraires {
        Some(numeraires) => {
            EvolutionDescription::with_numeraires(Arc::clone(&grid), evolution_times, numeraires)
                .unwrap()
        }
        None => EvolutionDescription::new(Arc::clone(&grid), evolution_times).unwrap(),
    };
    let rho = exponential_forward_correlation(&grid.times()[..n], 0.0, 0.2, 1.0).unwrap();
    let parameterization = FlatVol::new(
        vec![vol; n],
        &rho,
        evolution,
        n,
        vec![RATE_LEVEL; n],
        vec![0.0; n],
    )
    .unwrap();
    let steps = parameterization.number_of_steps();
    let generator =
        GaussianBrownianGeneratorFactory::new(seed).create_with_offset(n, steps, first_path);
    LogNormalFwdRatePc::new(parameterization, generator).unwrap()
}

/// Pays one unit at the terminal boundary, emitted at the final fixing.
#[derive(Clone)]
struct UnitTerminalFlow {
    evolution: EvolutionDescription,
    payment_times: Vec<Time>,
    step: usize,
}

impl UnitTerminalFlow {
    fn new(rate_times: Arc<RateTimes>) -> Self {
        let n = rate_times.number_of_rates();
        let fixings: Vec<Time> = rate_times.times()[..n].to_vec();
        let payment_times = vec![rate_times.terminal_time()];
        let evolution = EvolutionDescription::new(rate_times, fixings).unwrap();
        Self {
            evolution,
            payment_times,
            step: 0,
        }
    }
}

impl MarketModelProduct for UnitTerminalFlow {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }
    fn possible_cash_flow_times(&self) -> &[Time] {
        &self.payment_times
    }
    fn max_cash_flows_per_step(&self) -> usize {
        1
    }
    fn reset(&mut self) {
        self.step = 0;
    }
    fn next_time_step(
        &mut self,
        _curve_state: &LmmCurveState,
        cash_flows: &mut Vec<CashFlow>,
    ) -> bool {
        self.step += 1;
        if self.step == self.evolution.number_of_steps() {
            cash_flows.push(CashFlow {
                time_index: 0,
                amount: 1.0,
            });
            true
        } else {
            false
        }
    }
}

/// Swap that signals completion after a fixed number of its steps.
#[derive(Clone)]
struct TruncatedSwap {
    inner: MultiStepSwap,
    stop_after: usize,
    step: usize,
}

impl TruncatedSwap {
    fn new(rate_times: Arc<RateTimes>, stop_after: usize) -> Self {
        Self {
            inner: MultiStepSwap::new(rate_times, RATE_LEVEL, true).unwrap(),
            stop_after,
            step: 0,
        }
    }
}

impl MarketModelProduct for TruncatedSwap {
    fn evolution(&self) -> &EvolutionDescription {
        self.inner.evolution()
    }
    fn possible_cash_flow_times(&self) -> &[Time] {
        self.inner.possible_cash_flow_times()
    }
    fn max_cash_flows_per_step(&self) -> usize {
        self.inner.max_cash_flows_per_step()
    }
    fn reset(&mut self) {
        self.inner.reset();
        self.step = 0;
    }
    fn next_time_step(
        &mut self,
        curve_state: &LmmCurveState,
        cash_flows: &mut Vec<CashFlow>,
    ) -> bool {
        let done = self.inner.next_time_step(curve_state, cash_flows);
        self.step += 1;
        done || self.step == self.stop_after
    }
}

/// Emits a single 100 payment from an off-grid observation time.
#[derive(Clone)]
struct MidPeriodFlow {
    evolution: EvolutionDescription,
    payment_times: Vec<Time>,
    step: usize,
}

impl MidPeriodFlow {
    fn new(rate_times: Arc<RateTimes>, observation: Time, payment: Time, last: Time) -> Self {
        let payment_times = vec![payment];
        let evolution =
            EvolutionDescription::new(rate_times, vec![observation, last]).unwrap();
        Self {
            evolution,
            payment_times,
            step: 0,
        }
    }
}

impl MarketModelProduct for MidPeriodFlow {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }
    fn possible_cash_flow_times(&self) -> &[Time] {
        &self.payment_times
    }
    fn max_cash_flows_per_step(&self) -> usize {
        1
    }
    fn reset(&mut self) {
        self.step = 0;
    }
    fn next_time_step(
        &mut self,
        _curve_state: &LmmCurveState,
        cash_flows: &mut Vec<CashFlow>,
    ) -> bool {
        if self.step == 0 {
            cash_flows.push(CashFlow {
                time_index: 0,
                amount: 100.0,
            });
        }
        self.step += 1;
        self.step == 2
    }
}

/// No cash flows at all; terminates at its last evolution time.
#[derive(Clone)]
struct NothingProduct {
    evolution: EvolutionDescription,
    payment_times: Vec<Time>,
    step: usize,
}

impl NothingProduct {
    fn new(rate_times: Arc<RateTimes>) -> Self {
        let n = rate_times.number_of_rates();
        let fixings: Vec<Time> = rate_times.times()[..n].to_vec();
        let payment_times = fixings.clone();
        let evolution = EvolutionDescription::new(rate_times, fixings).unwrap();
        Self {
            evolution,
            payment_times,
            step: 0,
        }
    }
}

impl MarketModelProduct for NothingProduct {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }
    fn possible_cash_flow_times(&self) -> &[Time] {
        &self.payment_times
    }
    fn max_cash_flows_per_step(&self) -> usize {
        0
    }
    fn reset(&mut self) {
        self.step = 0;
    }
    fn next_time_step(
        &mut self,
        _curve_state: &LmmCurveState,
        _cash_flows: &mut Vec<CashFlow>,
    ) -> bool {
        self.step += 1;
        self.step == self.evolution.number_of_steps()
    }
}

/// Exercise into a coterminal payer swap: the swaption's intrinsic value.
#[derive(Clone)]
struct PayerSwaptionExerciseValue {
    evolution: EvolutionDescription,
    exercise_flags: Vec<bool>,
    payment_times: Vec<Time>,
    strike: f64,
    next_index: usize,
    value_index: usize,
}

impl PayerSwaptionExerciseValue {
    fn new(rate_times: Arc<RateTimes>, strike: f64) -> Self {
        let n = rate_times.number_of_rates();
        let fixings: Vec<Time> = rate_times.times()[..n].to_vec();
        let payment_times = fixings.clone();
        let evolution = EvolutionDescription::new(rate_times, fixings).unwrap();
        Self {
            evolution,
            exercise_flags: vec![true; n],
            payment_times,
            strike,
            next_index: 0,
            value_index: 0,
        }
    }
}

impl ExerciseValue for PayerSwaptionExerciseValue {
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
    fn value(&self, curve_state: &LmmCurveState) -> CashFlow {
        let k = self.value_index;
        // annuity in units of the bond maturing now, i.e. cash at the
        // exercise date
        let annuity = curve_state.coterminal_swap_annuity(k, k);
        let swap_rate = curve_state.coterminal_swap_rate(k);
        CashFlow {
            time_index: k,
            amount: annuity * (swap_rate - self.strike).max(0.0),
        }
    }
}

// ---------------------------------------------------------------------
// property: numeraire rebasing invariance (zero-volatility path)
// ---------------------------------------------------------------------

#[test]
fn zero_vol_value_is_numeraire_independent() {
    let grid = grid();
    let n = grid.number_of_rates();
    let fixings: Vec<Time> = grid.times()[..n].to_vec();
    let initial = initial_state();

    // cash value today of one unit at the terminal boundary, taking the
    // first bond as today's unit of account
    let first_bond_value = 0.97;
    let expected = first_bond_value * initial.discount_ratio(n, 0);

    // money-market measure: the numeraire switches at every step
    let mm_evolver = pc_evolver(0.0, fixings.clone(), None, 1, 0);
    let mut mm_engine = AccountingEngine::new(
        mm_evolver,
        UnitTerminalFlow::new(Arc::clone(&grid)),
        first_bond_value,
    )
    .unwrap();
    let mm_value = mm_engine.single_path_value();

    // terminal measure: the numeraire never switches; its initial value
    // is the terminal bond's price in the same unit of account
    let terminal_numeraires = terminal_measure(&grid, &fixings);
    let terminal_evolver = pc_evolver(0.0, fixings, Some(terminal_numeraires), 1, 0);
    let terminal_bond_value = first_bond_value * initial.discount_ratio(n, 0);
    let mut terminal_engine = AccountingEngine::new(
        terminal_evolver,
        UnitTerminalFlow::new(grid),
        terminal_bond_value,
    )
    .unwrap();
    let terminal_value = terminal_engine.single_path_value();

    assert_relative_eq!(mm_value, expected, max_relative = 1e-10);
    assert_relative_eq!(terminal_value, expected, max_relative = 1e-10);
    assert_relative_eq!(mm_value, terminal_value, max_relative = 1e-10);
}

// ---------------------------------------------------------------------
// property: node-data validity bucketing on early termination
// ---------------------------------------------------------------------

#[test]
fn early_termination_marks_unreached_exercises_invalid() {
    let grid = grid();
    let n = grid.number_of_rates();
    let fixings: Vec<Time> = grid.times()[..n].to_vec();
    let n_paths = 16;

    let mut evolver = pc_evolver(0.15, fixings.clone(), None, 5, 0);
    let mut product = TruncatedSwap::new(Arc::clone(&grid), 2);
    let mut basis = SwapBasisSystem::new(Arc::clone(&grid), fixings).unwrap();
    let mut rebate = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();
    let mut control = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();

    let mut collected = Vec::new();
    collect_node_data(
        &mut evolver,
        &mut product,
        &mut basis,
        &mut rebate,
        &mut control,
        n_paths,
        &mut collected,
    )
    .unwrap();

    assert_eq!(collected.len(), n + 1);
    for path in 0..n_paths {
        for row in 1..=2 {
            assert!(collected[row][path].is_valid, "row {} path {}", row, path);
        }
        for row in 3..=5 {
            let node = &collected[row][path];
            assert!(!node.is_valid, "row {} path {}", row, path);
            assert_eq!(node.exercise_value, 0.0);
            assert_eq!(node.control_value, 0.0);
            assert_eq!(node.cumulated_cash_flows, 0.0);
        }
    }
}

// ---------------------------------------------------------------------
// property: cash flows bucket to the most recently passed exercise date
// ---------------------------------------------------------------------

#[test]
fn mid_period_flow_buckets_to_the_passed_exercise() {
    let grid = grid();
    let n = grid.number_of_rates();
    let fixings: Vec<Time> = grid.times()[..n].to_vec();
    let n_paths = 8;

    // flow observed at 1.25, strictly between exercise dates 2 (t=1.0)
    // and 3 (t=1.5), paid at 1.5
    let product_template = MidPeriodFlow::new(Arc::clone(&grid), 1.25, 1.5, 2.5);
    let evolver_times = merge_times(&[
        product_template.evolution().evolution_times(),
        &fixings,
    ]);
    let mut evolver = pc_evolver(0.0, evolver_times, None, 9, 0);
    let mut product = product_template;
    let mut basis = SwapBasisSystem::new(Arc::clone(&grid), fixings).unwrap();
    let mut rebate = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();
    let mut control = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();

    let mut collected = Vec::new();
    collect_node_data(
        &mut evolver,
        &mut product,
        &mut basis,
        &mut rebate,
        &mut control,
        n_paths,
        &mut collected,
    )
    .unwrap();

    // zero volatility: the discounted amount is known in closed form;
    // at the 1.25 step the money-market numeraire is the 1.5 bond and
    // the rolling principal has accumulated dr(0, 2)
    let initial = initial_state();
    let expected = 100.0 * initial.discount_ratio(2, 0);

    for path in 0..n_paths {
        for (row, nodes) in collected.iter().enumerate() {
            let flows = nodes[path].cumulated_cash_flows;
            if row == 2 {
                assert_relative_eq!(flows, expected, max_relative = 1e-12);
            } else {
                assert_eq!(flows, 0.0, "row {} path {}", row, path);
            }
        }
    }
}

// ---------------------------------------------------------------------
// property: parallel collection is bit-identical to sequential
// ---------------------------------------------------------------------

#[test]
fn parallel_collection_matches_sequential_exactly() {
    let grid = grid();
    let n = grid.number_of_rates();
    let fixings: Vec<Time> = grid.times()[..n].to_vec();
    let n_paths = 100;
    let seed = 1234;

    let product = MultiStepSwap::new(Arc::clone(&grid), RATE_LEVEL, false).unwrap();
    let basis = SwapBasisSystem::new(Arc::clone(&grid), fixings.clone()).unwrap();
    let rebate = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();
    let control = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();

    let mut sequential = Vec::new();
    collect_node_data(
        &mut pc_evolver(0.18, fixings.clone(), None, seed, 0),
        &mut product.clone(),
        &mut basis.clone(),
        &mut rebate.clone(),
        &mut control.clone(),
        n_paths,
        &mut sequential,
    )
    .unwrap();

    let config = CollectorConfig::builder()
        .n_paths(n_paths)
        .chunk_size(50)
        .build()
        .unwrap();
    let fixings_for_factory = fixings.clone();
    let mut parallel = Vec::new();
    collect_node_data_parallel(
        |first_path| pc_evolver(0.18, fixings_for_factory.clone(), None, seed, first_path),
        &product,
        &basis,
        &rebate,
        &control,
        &config,
        &mut parallel,
    )
    .unwrap();

    assert_eq!(sequential.len(), parallel.len());
    for (row_s, row_p) in sequential.iter().zip(&parallel) {
        assert_eq!(row_s, row_p);
    }
}

// ---------------------------------------------------------------------
// pipeline: Bermudan payer swaption via collection plus regression
// ---------------------------------------------------------------------

#[test]
fn bermudan_swaption_pipeline_brackets_the_value() {
    let grid = grid();
    let n = grid.number_of_rates();
    let fixings: Vec<Time> = grid.times()[..n].to_vec();
    let n_paths = 4096;

    let mut evolver = pc_evolver(0.15, fixings.clone(), None, 777, 0);
    let mut product = NothingProduct::new(Arc::clone(&grid));
    let mut basis = SwapBasisSystem::new(Arc::clone(&grid), fixings).unwrap();
    let mut rebate = PayerSwaptionExerciseValue::new(Arc::clone(&grid), RATE_LEVEL);
    let mut control = NothingExerciseValue::new(Arc::clone(&grid)).unwrap();

    let mut collected = Vec::new();
    collect_node_data(
        &mut evolver,
        &mut product,
        &mut basis,
        &mut rebate,
        &mut control,
        n_paths,
        &mut collected,
    )
    .unwrap();

    // static strategies: exercise unconditionally at one fixed date
    let mut best_static = 0.0_f64;
    let mut best_static_error = 0.0_f64;
    for row in &collected[1..] {
        let mut stats = SequenceStats::new(1);
        for node in row {
            assert!(node.is_valid);
            stats.add_sample(&[node.exercise_value], 1.0);
        }
        let mean = stats.mean()[0];
        if mean > best_static {
            best_static = mean;
            best_static_error = stats.error_estimate()[0];
        }
    }

    // perfect foresight: exercise at each path's best date
    let mut foresight_stats = SequenceStats::new(1);
    for path in 0..n_paths {
        let best = collected[1..]
            .iter()
            .map(|row| row[path].exercise_value)
            .fold(0.0_f64, f64::max);
        foresight_stats.add_sample(&[best], 1.0);
    }
    let foresight = foresight_stats.mean()[0];

    let result = longstaff_schwartz_regression(&collected, false).unwrap();

    assert!(result.value > 0.0);
    assert!(
        result.value >= best_static - 4.0 * best_static_error,
        "LS value {} below best static {}",
        result.value,
        best_static
    );
    assert!(
        result.value <= foresight * 1.0001,
        "LS value {} above perfect foresight {}",
        result.value,
        foresight
    );
    assert_eq!(result.coefficients.len(), n);
}
