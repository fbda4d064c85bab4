//! Longstaff-Schwartz node-data collection.
//!
//! The collector drives one product, one rebate, one control variate and
//! one basis system through the evolver's step loop, discounts everything
//! they produce onto a common numeraire-relative basis, and assembles the
//! per-exercise-date training records consumed by a regression-based
//! continuation-value estimator.
//!
//! Per step the callbacks run in a fixed order: rebate, control, basis,
//! node-data recording at exercise times, then product cash flows. Basis
//! and exercise/control values therefore always reflect the same curve
//! state that decided the step was an exercise date.

use rayon::prelude::*;
use tracing::debug;

use super::basis_system::BasisSystem;
use super::exercise_value::ExerciseValue;
use super::node_data::NodeData;
use crate::config::CollectorConfig;
use crate::error::CollectorError;
use crate::product::MarketModelProduct;
use lmm_core::evolution::is_in_subset;
use lmm_core::types::Time;
use lmm_core::{CashFlowDiscounter, EvolutionDescription};
use lmm_models::MarketModelEvolver;

fn check_same_grid(
    run: &EvolutionDescription,
    other: &EvolutionDescription,
    who: &str,
) -> Result<(), CollectorError> {
    if run.rate_times().times() != other.rate_times().times() {
        return Err(CollectorError::IncompatibleEvolution {
            reason: format!("{} uses a different tenor grid", who),
        });
    }
    Ok(())
}

fn build_discounters(
    times: &[Time],
    evolution: &EvolutionDescription,
) -> Result<Vec<CashFlowDiscounter>, CollectorError> {
    times
        .iter()
        .map(|&t| CashFlowDiscounter::new(t, evolution.rate_times()).map_err(Into::into))
        .collect()
}

/// Collects Longstaff-Schwartz training data over `n_paths` simulated
/// paths.
///
/// `collected[j][p]` is path `p`'s record for exercise date `j-1`; row 0
/// holds the cash flows accrued before the first exercise date. Product
/// flows are bucketed to the most recently passed exercise date. Paths on
/// which the product terminates early leave their remaining exercise rows
/// zeroed with `is_valid == false`.
///
/// Every stored amount is converted to numeraire bonds at its step and
/// divided by the principal accumulated in the rolling numeraire
/// portfolio so far on that path. The principal is rebased with the
/// pre-advance state whenever the numeraire changes between steps;
/// reordering those two operations would change the implied measure.
///
/// # Errors
///
/// - [`CollectorError::IncompatibleEvolution`] if a subscriber's timetable
///   does not embed into the evolver's
/// - [`CollectorError::NoExerciseDates`] if the rebate declares none
///
/// # Panics
///
/// Curve-state preconditions (uninitialised queries, expired indices)
/// panic as described in `lmm_core`; a product that fails to terminate by
/// the final evolution step panics as well.
pub fn collect_node_data<E, P, B, R, C>(
    evolver: &mut E,
    product: &mut P,
    basis_system: &mut B,
    rebate: &mut R,
    control: &mut C,
    n_paths: usize,
    collected: &mut Vec<Vec<NodeData>>,
) -> Result<(), CollectorError>
where
    E: MarketModelEvolver,
    P: MarketModelProduct,
    B: BasisSystem,
    R: ExerciseValue,
    C: ExerciseValue,
{
    let evolution = evolver.evolution().clone();
    let times = evolution.evolution_times();
    let numeraires = evolution.numeraires().to_vec();
    let number_of_steps = times.len();

    check_same_grid(&evolution, product.evolution(), "product")?;
    check_same_grid(&evolution, rebate.evolution(), "rebate")?;
    check_same_grid(&evolution, control.evolution(), "control")?;
    check_same_grid(&evolution, basis_system.evolution(), "basis system")?;

    let is_product_time = is_in_subset(times, product.evolution().evolution_times())?;
    let is_rebate_time = is_in_subset(times, rebate.evolution().evolution_times())?;
    let is_control_time = is_in_subset(times, control.evolution().evolution_times())?;
    let is_basis_time = is_in_subset(times, basis_system.evolution().evolution_times())?;

    // exercise opportunities are the rebate's sub-predicate of its own
    // evolution times, projected onto the evolver grid
    let rebate_flags = rebate.is_exercise_time().to_vec();
    let mut is_exercise_time = vec![false; number_of_steps];
    let mut rebate_step = 0usize;
    for (step, &hit) in is_rebate_time.iter().enumerate() {
        if hit {
            is_exercise_time[step] = rebate_flags[rebate_step];
            rebate_step += 1;
        }
    }
    let number_of_exercises = is_exercise_time.iter().filter(|&&e| e).count();
    if number_of_exercises == 0 {
        return Err(CollectorError::NoExerciseDates);
    }

    let product_discounters = build_discounters(product.possible_cash_flow_times(), &evolution)?;
    let rebate_discounters = build_discounters(rebate.possible_cash_flow_times(), &evolution)?;
    let control_discounters = build_discounters(control.possible_cash_flow_times(), &evolution)?;

    collected.clear();
    collected.resize_with(number_of_exercises + 1, || {
        vec![NodeData::default(); n_paths]
    });

    let mut cash_flows = Vec::with_capacity(product.max_cash_flows_per_step());

    debug!(
        n_paths,
        number_of_steps, number_of_exercises, "collecting node data"
    );

    for path in 0..n_paths {
        evolver.start_new_path();
        product.reset();
        rebate.reset();
        control.reset();
        basis_system.reset();

        collected[0][path].is_valid = true;
        let mut principal = 1.0;
        let mut next_exercise = 0usize;
        let mut done = false;

        while !done {
            evolver.advance_step();
            let step = evolver.current_step();
            let state = evolver.current_state();
            let numeraire = numeraires[step];

            if is_rebate_time[step] {
                rebate.next_step(state);
            }
            if is_control_time[step] {
                control.next_step(state);
            }
            if is_basis_time[step] {
                basis_system.next_step(state);
            }

            if is_exercise_time[step] {
                let node = &mut collected[next_exercise + 1][path];
                node.is_valid = true;

                let flow = rebate.value(state);
                node.exercise_value = flow.amount
                    * rebate_discounters[flow.time_index].numeraire_bonds(state, numeraire)
                    / principal;

                basis_system.values(state, &mut node.basis_values);

                let flow = control.value(state);
                node.control_value = flow.amount
                    * control_discounters[flow.time_index].numeraire_bonds(state, numeraire)
                    / principal;

                node.cumulated_cash_flows = 0.0;
                next_exercise += 1;
            }

            if is_product_time[step] {
                cash_flows.clear();
                done = product.next_time_step(state, &mut cash_flows);
                for flow in &cash_flows {
                    collected[next_exercise][path].cumulated_cash_flows += flow.amount
                        * product_discounters[flow.time_index].numeraire_bonds(state, numeraire)
                        / principal;
                }
            }

            if !done {
                assert!(
                    step + 1 < number_of_steps,
                    "product did not terminate by the final evolution step"
                );
                principal *= state.discount_ratio(numeraire, numeraires[step + 1]);
            }
        }

        for j in next_exercise..number_of_exercises {
            collected[j + 1][path].clear();
        }
    }

    debug!(n_paths, "node data collection finished");
    Ok(())
}

/// Parallel node-data collection over disjoint path-index ranges.
///
/// `make_evolver(first_path)` must build an evolver whose Brownian stream
/// starts at global path `first_path`; with stream-per-path generators the
/// result is bit-identical to the sequential collector, chunking aside.
/// Each worker clones the product, rebate, control and basis system, so
/// no per-path state crosses worker boundaries.
///
/// # Errors
///
/// As for [`collect_node_data`], plus configuration validation failures.
pub fn collect_node_data_parallel<E, P, B, R, C, F>(
    make_evolver: F,
    product: &P,
    basis_system: &B,
    rebate: &R,
    control: &C,
    config: &CollectorConfig,
    collected: &mut Vec<Vec<NodeData>>,
) -> Result<(), CollectorError>
where
    E: MarketModelEvolver,
    F: Fn(usize) -> E + Sync,
    P: MarketModelProduct + Clone + Send + Sync,
    B: BasisSystem + Clone + Send + Sync,
    R: ExerciseValue + Clone + Send + Sync,
    C: ExerciseValue + Clone + Send + Sync,
{
    config.validate()?;
    let n_paths = config.n_paths();
    let chunk_size = config.chunk_size();
    let starts: Vec<usize> = (0..n_paths).step_by(chunk_size).collect();

    debug!(n_paths, chunk_size, workers = starts.len(), "parallel collection");

    let chunk_results: Vec<Result<Vec<Vec<NodeData>>, CollectorError>> = starts
        .par_iter()
        .map(|&start| {
            let count = chunk_size.min(n_paths - start);
            let mut evolver = make_evolver(start);
            let mut product = product.clone();
            let mut basis_system = basis_system.clone();
            let mut rebate = rebate.clone();
            let mut control = control.clone();
            let mut rows = Vec::new();
            collect_node_data(
                &mut evolver,
                &mut product,
                &mut basis_system,
                &mut rebate,
                &mut control,
                count,
                &mut rows,
            )?;
            Ok(rows)
        })
        .collect();

    collected.clear();
    for (chunk_index, result) in chunk_results.into_iter().enumerate() {
        let rows = result?;
        if collected.is_empty() {
            collected.resize_with(rows.len(), || Vec::with_capacity(n_paths));
        }
        if rows.len() != collected.len() {
            return Err(CollectorError::MalformedData {
                reason: format!(
                    "chunk {} produced {} rows, expected {}",
                    chunk_index,
                    rows.len(),
                    collected.len()
                ),
            });
        }
        for (row, chunk_row) in collected.iter_mut().zip(rows) {
            row.extend(chunk_row);
        }
    }
    Ok(())
}
