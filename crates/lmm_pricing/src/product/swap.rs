//! Multi-step fixed-for-floating swap.

use std::sync::Arc;

use super::{CashFlow, MarketModelProduct};
use crate::error::CollectorError;
use lmm_core::types::{Rate, Real, Time};
use lmm_core::{EvolutionDescription, LmmCurveState, RateTimes};

/// A fixed-for-floating swap paying period by period along the tenor grid.
///
/// At each fixing time the product emits the period's floating leg
/// (`tau * forward`) and fixed leg (`tau * fixed_rate`) flows, both keyed
/// to the period's payment time (the next tenor boundary). A payer swap
/// receives floating and pays fixed; a receiver swap the opposite.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lmm_core::RateTimes;
/// use lmm_pricing::{MarketModelProduct, MultiStepSwap};
///
/// let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0]).unwrap());
/// let swap = MultiStepSwap::new(grid, 0.05, true).unwrap();
/// assert_eq!(swap.possible_cash_flow_times().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct MultiStepSwap {
    evolution: EvolutionDescription,
    payment_times: Vec<Time>,
    fixed_rate: Rate,
    payer: bool,
    current_index: usize,
}

impl MultiStepSwap {
    /// Builds a swap spanning the whole tenor grid.
    ///
    /// # Errors
    ///
    /// Propagates timetable-construction failures.
    pub fn new(
        rate_times: Arc<RateTimes>,
        fixed_rate: Rate,
        payer: bool,
    ) -> Result<Self, CollectorError> {
        let n = rate_times.number_of_rates();
        let fixing_times: Vec<Time> = rate_times.times()[..n].to_vec();
        let payment_times: Vec<Time> = rate_times.times()[1..].to_vec();
        let evolution = EvolutionDescription::new(rate_times, fixing_times)?;
        Ok(Self {
            evolution,
            payment_times,
            fixed_rate,
            payer,
            current_index: 0,
        })
    }

    /// The swap's fixed rate.
    pub fn fixed_rate(&self) -> Rate {
        self.fixed_rate
    }

    /// Whether this swap pays fixed (receives floating).
    pub fn is_payer(&self) -> bool {
        self.payer
    }

    /// The time-zero par value of this swap in units of a chosen numeraire
    /// bond, computed on an initial curve state.
    ///
    /// Useful as an analytic benchmark for the accounting engine.
    pub fn analytic_value(&self, initial_state: &LmmCurveState, numeraire: usize) -> Real {
        let n = initial_state.number_of_rates();
        let taus = initial_state.rate_times().taus().to_vec();
        let mut value = 0.0;
        for i in 0..n {
            let leg = taus[i] * (initial_state.forward_rate(i) - self.fixed_rate);
            value += leg * initial_state.discount_ratio(i + 1, numeraire);
        }
        if self.payer {
            value
        } else {
            -value
        }
    }
}

impl MarketModelProduct for MultiStepSwap {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }

    fn possible_cash_flow_times(&self) -> &[Time] {
        &self.payment_times
    }

    fn max_cash_flows_per_step(&self) -> usize {
        2
    }

    fn reset(&mut self) {
        self.current_index = 0;
    }

    fn next_time_step(
        &mut self,
        curve_state: &LmmCurveState,
        cash_flows: &mut Vec<CashFlow>,
    ) -> bool {
        let i = self.current_index;
        let tau = self.evolution.rate_times().taus()[i];
        let sign = if self.payer { 1.0 } else { -1.0 };

        cash_flows.push(CashFlow {
            time_index: i,
            amount: sign * tau * curve_state.forward_rate(i),
        });
        cash_flows.push(CashFlow {
            time_index: i,
            amount: -sign * tau * self.fixed_rate,
        });

        self.current_index += 1;
        self.current_index == self.evolution.number_of_rates()
    }
}
