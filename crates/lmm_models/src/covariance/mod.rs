//! The covariance parameterisation contract.
//!
//! A covariance parameterisation turns a calibrated volatility/correlation
//! description into per-step integrated covariance matrices and their
//! pseudo-square-roots, which are the diffusion inputs consumed by the
//! evolvers.

pub mod flat_vol;

pub use flat_vol::FlatVol;

use nalgebra::DMatrix;

use lmm_core::types::Rate;
use lmm_core::EvolutionDescription;

/// Supplies drift/diffusion inputs for every evolution step.
///
/// Implementations precompute one pseudo-root per step at construction
/// time; the accessors below are read-only and safe to share across
/// parallel path workers.
///
/// The pseudo-root of step `k` integrates the instantaneous covariance
/// over `(t_{k-1}, t_k]`, so no further `dt` scaling is applied by the
/// evolvers.
pub trait CovarianceParameterization {
    /// The timetable this parameterisation was built for.
    fn evolution(&self) -> &EvolutionDescription;

    /// Number of forward rates (N).
    fn number_of_rates(&self) -> usize {
        self.evolution().number_of_rates()
    }

    /// Number of driving factors (columns of each pseudo-root).
    fn number_of_factors(&self) -> usize;

    /// Number of evolution steps.
    fn number_of_steps(&self) -> usize {
        self.evolution().number_of_steps()
    }

    /// The time-zero forward rates.
    fn initial_rates(&self) -> &[Rate];

    /// Per-rate displacement offsets of the displaced-diffusion dynamics.
    fn displacements(&self) -> &[f64];

    /// The `N x factors` pseudo-root of the integrated covariance over
    /// step `step`.
    ///
    /// # Panics
    ///
    /// Panics if `step >= number_of_steps()`.
    fn pseudo_root(&self, step: usize) -> &DMatrix<f64>;

    /// The integrated covariance matrix of step `step`,
    /// `pseudo_root * pseudo_rootᵀ`.
    fn covariance(&self, step: usize) -> DMatrix<f64> {
        let a = self.pseudo_root(step);
        a * a.transpose()
    }

    /// The covariance integrated from time zero through the end of
    /// `through_step`.
    fn total_covariance(&self, through_step: usize) -> DMatrix<f64> {
        let n = self.number_of_rates();
        let mut total = DMatrix::zeros(n, n);
        for step in 0..=through_step {
            total += self.covariance(step);
        }
        total
    }
}
