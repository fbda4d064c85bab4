//! Rank-reduced pseudo-square-roots of covariance matrices.

use nalgebra::{DMatrix, SymmetricEigen};

use crate::error::ModelError;

/// Computes an `n x factors` matrix `A` with `A * Aᵀ` approximating the
/// symmetric positive semi-definite input `covariance`.
///
/// The spectral decomposition is truncated to the `factors` largest
/// eigenvalues; negative eigenvalues (numerical noise in an otherwise PSD
/// input) are clamped to zero. When the rank is reduced, each row is
/// rescaled so the diagonal of `A * Aᵀ` reproduces the input variances
/// exactly, which keeps the marginal volatility of every rate intact.
///
/// # Errors
///
/// - [`ModelError::NotSquare`] for a non-square input
/// - [`ModelError::InvalidCorrelation`] for an asymmetric input
/// - [`ModelError::InvalidFactorCount`] if `factors` is zero or exceeds the
///   dimension
///
/// # Examples
///
/// ```
/// use nalgebra::DMatrix;
/// use lmm_models::pseudo_sqrt::rank_reduced_pseudo_sqrt;
///
/// let c = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
/// let a = rank_reduced_pseudo_sqrt(&c, 2).unwrap();
/// let back = &a * a.transpose();
/// assert!((back[(0, 1)] - 0.01).abs() < 1e-12);
/// ```
pub fn rank_reduced_pseudo_sqrt(
    covariance: &DMatrix<f64>,
    factors: usize,
) -> Result<DMatrix<f64>, ModelError> {
    let n = covariance.nrows();
    if covariance.ncols() != n {
        return Err(ModelError::NotSquare {
            name: "covariance",
            rows: n,
            cols: covariance.ncols(),
        });
    }
    for i in 0..n {
        for j in 0..i {
            if (covariance[(i, j)] - covariance[(j, i)]).abs() > 1e-10 {
                return Err(ModelError::InvalidCorrelation {
                    reason: format!("covariance asymmetry at ({}, {})", i, j),
                });
            }
        }
    }
    if factors == 0 || factors > n {
        return Err(ModelError::InvalidFactorCount { factors, max: n });
    }

    let eigen = SymmetricEigen::new(covariance.clone());

    // order eigenpairs by decreasing eigenvalue
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .expect("eigenvalues are finite")
    });

    let mut pseudo = DMatrix::zeros(n, factors);
    for (f, &k) in order.iter().take(factors).enumerate() {
        let lambda = eigen.eigenvalues[k].max(0.0);
        let scale = lambda.sqrt();
        for i in 0..n {
            pseudo[(i, f)] = eigen.eigenvectors[(i, k)] * scale;
        }
    }

    if factors < n {
        // restore the marginal variances lost with the discarded components
        for i in 0..n {
            let row_norm_sq: f64 = (0..factors).map(|f| pseudo[(i, f)] * pseudo[(i, f)]).sum();
            let target = covariance[(i, i)].max(0.0);
            if row_norm_sq > 0.0 {
                let scale = (target / row_norm_sq).sqrt();
                for f in 0..factors {
                    pseudo[(i, f)] *= scale;
                }
            }
        }
    }

    Ok(pseudo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_covariance() -> DMatrix<f64> {
        // vols 0.2, 0.3, 0.25 with mild positive correlation
        let vols = [0.2, 0.3, 0.25];
        let rho = [
            [1.0, 0.8, 0.6], //
            [0.8, 1.0, 0.8],
            [0.6, 0.8, 1.0],
        ];
        DMatrix::from_fn(3, 3, |i, j| vols[i] * vols[j] * rho[i][j])
    }

    #[test]
    fn test_full_rank_reproduces_covariance() {
        let c = sample_covariance();
        let a = rank_reduced_pseudo_sqrt(&c, 3).unwrap();
        let back = &a * a.transpose();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(back[(i, j)], c[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_rank_reduction_preserves_variances() {
        let c = sample_covariance();
        let a = rank_reduced_pseudo_sqrt(&c, 1).unwrap();
        assert_eq!(a.ncols(), 1);
        let back = &a * a.transpose();
        for i in 0..3 {
            assert_relative_eq!(back[(i, i)], c[(i, i)], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_negative_noise_eigenvalue_clamped() {
        // nearly singular: duplicated row/column can push an eigenvalue
        // slightly negative in floating point
        let c = DMatrix::from_row_slice(2, 2, &[0.04, 0.04, 0.04, 0.04]);
        let a = rank_reduced_pseudo_sqrt(&c, 2).unwrap();
        let back = &a * a.transpose();
        assert_relative_eq!(back[(0, 0)], 0.04, epsilon = 1e-12);
        assert!(!back.iter().any(|x| x.is_nan()));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let c = sample_covariance();
        assert!(rank_reduced_pseudo_sqrt(&c, 0).is_err());
        assert!(rank_reduced_pseudo_sqrt(&c, 4).is_err());

        let rect = DMatrix::zeros(2, 3);
        assert!(matches!(
            rank_reduced_pseudo_sqrt(&rect, 1),
            Err(ModelError::NotSquare { .. })
        ));

        let mut asym = sample_covariance();
        asym[(0, 1)] += 1.0;
        assert!(matches!(
            rank_reduced_pseudo_sqrt(&asym, 2),
            Err(ModelError::InvalidCorrelation { .. })
        ));
    }
}
