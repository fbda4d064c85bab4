//! The product capability trait.

pub mod swap;

pub use swap::MultiStepSwap;

use lmm_core::types::{Real, Time};
use lmm_core::{EvolutionDescription, LmmCurveState};

/// A cash flow generated by a product at one step.
///
/// `time_index` points into the product's
/// [`possible_cash_flow_times`](MarketModelProduct::possible_cash_flow_times)
/// list, not into the evolution grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    /// Index into the product's possible-cash-flow-time list.
    pub time_index: usize,
    /// The flow amount (signed).
    pub amount: Real,
}

/// A path-dependent product driven along an evolving curve.
///
/// Products are path observers: at each of their evolution times they read
/// the current curve state and may emit cash flows keyed to their declared
/// payment times. One product instance services one path at a time; the
/// engines call [`reset`](Self::reset) between paths and parallel workers
/// clone the product.
///
/// Exactly one product is priced per collection run; multi-product
/// batching is a documented extension point that this library does not
/// implement.
pub trait MarketModelProduct {
    /// The timetable this product needs (rate times and the evolution
    /// times at which it must be called).
    fn evolution(&self) -> &EvolutionDescription;

    /// All times at which this product can ever pay.
    fn possible_cash_flow_times(&self) -> &[Time];

    /// Upper bound on flows emitted by one `next_time_step` call, used to
    /// size the reusable flow buffer.
    fn max_cash_flows_per_step(&self) -> usize;

    /// Rewinds the product to the start of a path.
    fn reset(&mut self);

    /// Advances the product by one of its evolution times.
    ///
    /// Appends any generated flows to `cash_flows` (the engine clears the
    /// buffer beforehand) and returns `true` when the product is finished
    /// on this path. Early termination is the expected knock-out
    /// mechanism, not an error.
    fn next_time_step(&mut self, curve_state: &LmmCurveState, cash_flows: &mut Vec<CashFlow>)
        -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_flow_is_plain_data() {
        let flow = CashFlow {
            time_index: 2,
            amount: -1.5,
        };
        let copy = flow;
        assert_eq!(copy, flow);
    }
}
