//! Displaced-diffusion LMM drift computation.

use nalgebra::DMatrix;

use crate::error::ModelError;
use lmm_core::types::Rate;

/// Computes the per-step drifts of the displaced log-forwards relative to a
/// chosen numeraire bond.
///
/// One calculator is built per evolution step; it owns that step's
/// integrated covariance `C = A·Aᵀ` and the alive/numeraire indices, so the
/// per-path work is a single pass over the live rates.
///
/// For a live rate `i` and numeraire index `p` (with `p >= alive`):
///
/// ```text
/// g_j     = tau_j * (f_j + d_j) / (1 + tau_j * f_j)
/// drift_i = sum_{j=p..=i} C_ij * g_j        for i >= p
/// drift_i = -sum_{j=i+1..p} C_ij * g_j      for i <  p
/// ```
///
/// Rates below `p` carry the negative sum over the periods separating their
/// payment date from the numeraire; the sums are empty exactly when the
/// rate pays on the numeraire date, which is the martingale case.
#[derive(Debug, Clone)]
pub struct LmmDriftCalculator {
    covariance: DMatrix<f64>,
    displacements: Vec<f64>,
    taus: Vec<f64>,
    numeraire: usize,
    alive: usize,
    g: Vec<f64>,
}

impl LmmDriftCalculator {
    /// Builds a calculator for one step.
    ///
    /// # Errors
    ///
    /// - [`ModelError::SizeMismatch`] on inconsistent dimensions
    /// - [`ModelError::InvalidParameter`] if the numeraire index exceeds
    ///   the rate count or lies below the alive index
    pub fn new(
        pseudo_root: &DMatrix<f64>,
        displacements: &[f64],
        taus: &[f64],
        numeraire: usize,
        alive: usize,
    ) -> Result<Self, ModelError> {
        let n = taus.len();
        if pseudo_root.nrows() != n {
            return Err(ModelError::SizeMismatch {
                name: "pseudo-root rows",
                got: pseudo_root.nrows(),
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
        if numeraire > n || numeraire < alive {
            return Err(ModelError::InvalidParameter {
                name: "numeraire index",
                index: numeraire,
                value: alive as f64,
            });
        }
        Ok(Self {
            covariance: pseudo_root * pseudo_root.transpose(),
            displacements: displacements.to_vec(),
            taus: taus.to_vec(),
            numeraire,
            alive,
            g: vec![0.0; n],
        })
    }

    /// This step's integrated covariance matrix.
    #[inline]
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// First live rate index of this step.
    #[inline]
    pub fn alive(&self) -> usize {
        self.alive
    }

    /// Computes drifts for the given forward-rate vector.
    ///
    /// Entries of `drifts` below the alive index are left untouched.
    ///
    /// # Panics
    ///
    /// Panics on buffer-size mismatches.
    pub fn compute(&mut self, forwards: &[Rate], drifts: &mut [f64]) {
        let n = self.taus.len();
        assert_eq!(forwards.len(), n, "forward buffer size");
        assert_eq!(drifts.len(), n, "drift buffer size");

        for j in self.alive..n {
            self.g[j] = self.taus[j] * (forwards[j] + self.displacements[j])
                / (1.0 + self.taus[j] * forwards[j]);
        }

        for i in self.alive..n {
            let mut drift = 0.0;
            if i >= self.numeraire {
                for j in self.numeraire..=i {
                    drift += self.covariance[(i, j)] * self.g[j];
                }
            } else {
                for j in (i + 1)..self.numeraire {
                    drift -= self.covariance[(i, j)] * self.g[j];
                }
            }
            drifts[i] = drift;
        }
    }
}
