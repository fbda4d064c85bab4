//! Flat-volatility covariance parameterisation.

use nalgebra::DMatrix;

use super::CovarianceParameterization;
use crate::correlation::check_correlation_matrix;
use crate::error::ModelError;
use crate::pseudo_sqrt::rank_reduced_pseudo_sqrt;
use lmm_core::types::Rate;
use lmm_core::EvolutionDescription;

/// Constant instantaneous volatility per forward rate, with a fixed
/// correlation matrix across rates.
///
/// Each rate's volatility is alive until its own fixing time, so the
/// integrated covariance of rates `i` and `j` over a step `(t_k, t_{k+1}]`
/// is
///
/// ```text
/// vol_i * vol_j * rho_ij * max(0, min(t_{k+1}, T_i, T_j) - t_k)
/// ```
///
/// The per-step pseudo-roots are computed once at construction with the
/// requested factor count.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lmm_core::{EvolutionDescription, RateTimes};
/// use lmm_models::correlation::exponential_forward_correlation;
/// use lmm_models::{CovarianceParameterization, FlatVol};
///
/// let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0]).unwrap());
/// let evolution = EvolutionDescription::new(Arc::clone(&grid), vec![0.5, 1.0, 1.5]).unwrap();
/// let rho = exponential_forward_correlation(&grid.times()[..3], 0.0, 0.1, 1.0).unwrap();
///
/// let flat_vol = FlatVol::new(
///     vec![0.15; 3],
///     &rho,
///     evolution,
///     3,
///     vec![0.05; 3],
///     vec![0.0; 3],
/// )
/// .unwrap();
/// assert_eq!(flat_vol.number_of_factors(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct FlatVol {
    evolution: EvolutionDescription,
    factors: usize,
    initial_rates: Vec<Rate>,
    displacements: Vec<f64>,
    pseudo_roots: Vec<DMatrix<f64>>,
}

impl FlatVol {
    /// Builds the parameterisation and precomputes per-step pseudo-roots.
    ///
    /// # Errors
    ///
    /// - [`ModelError::SizeMismatch`] for vectors not matching the rate
    ///   count
    /// - [`ModelError::InvalidParameter`] for negative or non-finite
    ///   volatilities
    /// - [`ModelError::InvalidCorrelation`] for a malformed correlation
    ///   matrix
    /// - [`ModelError::InvalidFactorCount`] if `factors` is zero or above
    ///   the rate count
    /// - [`ModelError::NonPositiveDisplacedForward`] if some initial
    ///   forward plus its displacement is not strictly positive
    pub fn new(
        volatilities: Vec<f64>,
        correlation: &DMatrix<f64>,
        evolution: EvolutionDescription,
        factors: usize,
        initial_rates: Vec<Rate>,
        displacements: Vec<f64>,
    ) -> Result<Self, ModelError> {
        let n = evolution.number_of_rates();
        if volatilities.len() != n {
            return Err(ModelError::SizeMismatch {
                name: "volatilities",
                got: volatilities.len(),
                expected: n,
            });
        }
        if initial_rates.len() != n {
            return Err(ModelError::SizeMismatch {
                name: "initial rates",
                got: initial_rates.len(),
                expected: n,
            });
        }
        if displacements.len() != n {
            return Err(ModelError::SizeMismatch {
                name: "displacements",
                got: displacements.len(),
                expected: n,
            });
        }
        for (i, &vol) in volatilities.iter().enumerate() {
            if !vol.is_finite() || vol < 0.0 {
                return Err(ModelError::InvalidParameter {
                    name: "volatility",
                    index: i,
                    value: vol,
                });
            }
        }
        for i in 0..n {
            let displaced = initial_rates[i] + displacements[i];
            if !displaced.is_finite() || displaced <= 0.0 {
                return Err(ModelError::NonPositiveDisplacedForward {
                    index: i,
                    value: displaced,
                });
            }
        }
        check_correlation_matrix(correlation)?;
        if correlation.nrows() != n {
            return Err(ModelError::SizeMismatch {
                name: "correlation",
                got: correlation.nrows(),
                expected: n,
            });
        }
        if factors == 0 || factors > n {
            return Err(ModelError::InvalidFactorCount { factors, max: n });
        }

        let fixings = &evolution.rate_times().times()[..n];
        let evolution_times = evolution.evolution_times();
        let mut pseudo_roots = Vec::with_capacity(evolution_times.len());
        let mut step_start = 0.0;
        for &step_end in evolution_times {
            let mut covariance = DMatrix::zeros(n, n);
            for i in 0..n {
                for j in 0..=i {
                    let both_alive_until = fixings[i].min(fixings[j]);
                    let overlap = (step_end.min(both_alive_until) - step_start).max(0.0);
                    let entry =
                        volatilities[i] * volatilities[j] * correlation[(i, j)] * overlap;
                    covariance[(i, j)] = entry;
                    covariance[(j, i)] = entry;
                }
            }
            pseudo_roots.push(rank_reduced_pseudo_sqrt(&covariance, factors)?);
            step_start = step_end;
        }

        Ok(Self {
            evolution,
            factors,
            initial_rates,
            displacements,
            pseudo_roots,
        })
    }
}

impl CovarianceParameterization for FlatVol {
    fn evolution(&self) -> &EvolutionDescription {
        &self.evolution
    }

    fn number_of_factors(&self) -> usize {
        self.factors
    }

    fn initial_rates(&self) -> &[Rate] {
        &self.initial_rates
    }

    fn displacements(&self) -> &[f64] {
        &self.displacements
    }

    fn pseudo_root(&self, step: usize) -> &DMatrix<f64> {
        assert!(
            step < self.pseudo_roots.len(),
            "step {} out of range, number of steps is {}",
            step,
            self.pseudo_roots.len()
        );
        &self.pseudo_roots[step]
    }
}
