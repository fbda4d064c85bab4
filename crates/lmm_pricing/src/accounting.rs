//! Path-by-path product pricing.

use tracing::debug;

use crate::error::CollectorError;
use crate::product::MarketModelProduct;
use crate::stats::SequenceStats;
use lmm_core::types::Real;
use lmm_core::CashFlowDiscounter;
use lmm_models::MarketModelEvolver;

/// Prices a product along simulated paths.
///
/// Every generated cash flow is converted into numeraire bonds at its
/// step, divided by the principal accumulated in the rolling numeraire
/// portfolio on that path, and summed; the path value is the bond total
/// scaled by the initial numeraire value. Path values accumulate into a
/// [`SequenceStats`] for the mean and its standard error.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use lmm_core::RateTimes;
/// # use lmm_models::{FlatVol, GaussianBrownianGeneratorFactory, LogNormalFwdRatePc};
/// # use lmm_pricing::{AccountingEngine, MultiStepSwap, SequenceStats};
/// # fn build() -> (LogNormalFwdRatePc<FlatVol, lmm_models::GaussianBrownianGenerator>, MultiStepSwap) { unimplemented!() }
/// let (evolver, swap) = build();
/// let mut engine = AccountingEngine::new(evolver, swap, 0.95).unwrap();
/// let mut stats = SequenceStats::new(1);
/// engine.multiple_path_values(&mut stats, 16_384);
/// println!("price {} +/- {}", stats.mean()[0], stats.error_estimate()[0]);
/// ```
pub struct AccountingEngine<E, P> {
    evolver: E,
    product: P,
    initial_numeraire_value: Real,
    discounters: Vec<CashFlowDiscounter>,
}

impl<E, P> AccountingEngine<E, P>
where
    E: MarketModelEvolver,
    P: MarketModelProduct,
{
    /// Builds an engine from an evolver, a product and the time-zero value
    /// of the first numeraire bond.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::IncompatibleEvolution`] if the product's
    /// timetable is not the evolver's, and propagates discounter
    /// construction failures.
    pub fn new(
        evolver: E,
        product: P,
        initial_numeraire_value: Real,
    ) -> Result<Self, CollectorError> {
        evolver
            .evolution()
            .check_compatibility(product.evolution())
            .map_err(|e| CollectorError::IncompatibleEvolution {
                reason: e.to_string(),
            })?;
        let discounters = product
            .possible_cash_flow_times()
            .iter()
            .map(|&t| CashFlowDiscounter::new(t, evolver.evolution().rate_times()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            evolver,
            product,
            initial_numeraire_value,
            discounters,
        })
    }

    /// Runs one path and returns its value.
    pub fn single_path_value(&mut self) -> Real {
        let numeraires = self.evolver.numeraires().to_vec();
        let number_of_steps = numeraires.len();

        let mut weight = self.evolver.start_new_path();
        self.product.reset();

        let mut bonds_held = 0.0;
        let mut principal = 1.0;
        let mut cash_flows = Vec::with_capacity(self.product.max_cash_flows_per_step());
        let mut done = false;

        while !done {
            weight *= self.evolver.advance_step();
            let step = self.evolver.current_step();
            let state = self.evolver.current_state();
            let numeraire = numeraires[step];

            cash_flows.clear();
            done = self.product.next_time_step(state, &mut cash_flows);
            for flow in &cash_flows {
                bonds_held += flow.amount
                    * self.discounters[flow.time_index].numeraire_bonds(state, numeraire)
                    / principal;
            }

            if !done {
                assert!(
                    step + 1 < number_of_steps,
                    "product did not terminate by the final evolution step"
                );
                principal *= state.discount_ratio(numeraire, numeraires[step + 1]);
            }
        }

        weight * bonds_held * self.initial_numeraire_value
    }

    /// Runs `n_paths` paths, accumulating each path value into `stats`.
    ///
    /// # Panics
    ///
    /// Panics if `stats` was not built with dimension 1.
    pub fn multiple_path_values(&mut self, stats: &mut SequenceStats, n_paths: usize) {
        debug!(n_paths, "accounting engine run");
        for _ in 0..n_paths {
            let value = self.single_path_value();
            stats.add_sample(&[value], 1.0);
        }
    }

    /// The evolver, for inspection after a run.
    pub fn evolver(&self) -> &E {
        &self.evolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::MultiStepSwap;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use lmm_core::{LmmCurveState, RateTimes};
    use lmm_models::correlation::exponential_forward_correlation;
    use lmm_models::{FlatVol, GaussianBrownianGeneratorFactory, LogNormalFwdRatePc};
    use lmm_core::EvolutionDescription;

    fn grid() -> Arc<RateTimes> {
        Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5]).unwrap())
    }

    fn evolver(vol: f64, seed: u64) -> LogNormalFwdRatePc<FlatVol, lmm_models::GaussianBrownianGenerator> {
        let grid = grid();
        let evolution =
            EvolutionDescription::new(Arc::clone(&grid), grid.times()[..4].to_vec()).unwrap();
        let rho = exponential_forward_correlation(&grid.times()[..4], 0.0, 0.1, 1.0).unwrap();
        let parameterization = FlatVol::new(
            vec![vol; 4],
            &rho,
            evolution,
            4,
            vec![0.05; 4],
            vec![0.0; 4],
        )
        .unwrap();
        let generator = GaussianBrownianGeneratorFactory::new(seed).create(4, 4);
        LogNormalFwdRatePc::new(parameterization, generator).unwrap()
    }

    #[test]
    fn test_zero_vol_swap_value_matches_analytics() {
        // deterministic curve: the MC value is the analytic swap value
        let initial_numeraire_value = 0.97;
        let swap = MultiStepSwap::new(grid(), 0.045, true).unwrap();

        let mut initial = LmmCurveState::new(grid());
        initial.set_on_forward_rates(&[0.05; 4], 0).unwrap();
        let expected = swap.analytic_value(&initial, 0) * initial_numeraire_value;

        let mut engine =
            AccountingEngine::new(evolver(0.0, 1), swap, initial_numeraire_value).unwrap();
        let value = engine.single_path_value();
        assert_relative_eq!(value, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_par_swap_prices_to_zero_in_expectation() {
        let swap = MultiStepSwap::new(grid(), 0.05, true).unwrap();
        let mut engine = AccountingEngine::new(evolver(0.15, 42), swap, 1.0).unwrap();
        let mut stats = SequenceStats::new(1);
        engine.multiple_path_values(&mut stats, 20_000);

        let mean = stats.mean()[0];
        let error = stats.error_estimate()[0];
        // a par swap has zero value; allow four standard errors
        assert!(mean.abs() < 4.0 * error + 1e-4, "mean {} error {}", mean, error);
    }

    #[test]
    fn test_incompatible_product_rejected() {
        let other_grid = Arc::new(RateTimes::new(vec![0.25, 0.75, 1.25, 1.75, 2.25]).unwrap());
        let swap = MultiStepSwap::new(other_grid, 0.05, true).unwrap();
        assert!(matches!(
            AccountingEngine::new(evolver(0.1, 1), swap, 1.0),
            Err(CollectorError::IncompatibleEvolution { .. })
        ));
    }
}
