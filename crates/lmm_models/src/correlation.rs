//! Forward-rate correlation structures.

use nalgebra::DMatrix;

use crate::error::ModelError;
use lmm_core::types::Time;

/// Exponential forward correlation on a fixing-time grid:
///
/// ```text
/// rho_ij = L + (1 - L) * exp(-beta * |T_i - T_j|^gamma)
/// ```
///
/// with long-term level `L` in [0, 1), decay `beta >= 0` and exponent
/// `gamma > 0`. `gamma = 1` gives the classic exponential decay.
///
/// # Errors
///
/// Returns [`ModelError::InvalidParameter`] for parameters outside the
/// ranges above or an empty fixing grid.
///
/// # Examples
///
/// ```
/// use lmm_models::correlation::exponential_forward_correlation;
///
/// let rho = exponential_forward_correlation(&[0.5, 1.0, 1.5], 0.0, 0.1, 1.0).unwrap();
/// assert!((rho[(0, 0)] - 1.0).abs() < 1e-15);
/// assert!(rho[(0, 2)] < rho[(0, 1)]);
/// ```
pub fn exponential_forward_correlation(
    fixing_times: &[Time],
    long_term: f64,
    beta: f64,
    gamma: f64,
) -> Result<DMatrix<f64>, ModelError> {
    if fixing_times.is_empty() {
        return Err(ModelError::SizeMismatch {
            name: "fixing times",
            got: 0,
            expected: 1,
        });
    }
    if !(0.0..1.0).contains(&long_term) {
        return Err(ModelError::InvalidParameter {
            name: "long-term correlation",
            index: 0,
            value: long_term,
        });
    }
    if !beta.is_finite() || beta < 0.0 {
        return Err(ModelError::InvalidParameter {
            name: "correlation decay beta",
            index: 0,
            value: beta,
        });
    }
    if !gamma.is_finite() || gamma <= 0.0 {
        return Err(ModelError::InvalidParameter {
            name: "correlation exponent gamma",
            index: 0,
            value: gamma,
        });
    }

    let n = fixing_times.len();
    let mut rho = DMatrix::identity(n, n);
    for i in 0..n {
        for j in 0..i {
            let gap = (fixing_times[i] - fixing_times[j]).abs();
            let value = long_term + (1.0 - long_term) * (-beta * gap.powf(gamma)).exp();
            rho[(i, j)] = value;
            rho[(j, i)] = value;
        }
    }
    Ok(rho)
}

/// Validates a user-supplied correlation matrix: square, symmetric, unit
/// diagonal, entries in [-1, 1].
pub fn check_correlation_matrix(rho: &DMatrix<f64>) -> Result<(), ModelError> {
    if rho.nrows() != rho.ncols() {
        return Err(ModelError::NotSquare {
            name: "correlation",
            rows: rho.nrows(),
            cols: rho.ncols(),
        });
    }
    for i in 0..rho.nrows() {
        if (rho[(i, i)] - 1.0).abs() > 1e-10 {
            return Err(ModelError::InvalidCorrelation {
                reason: format!("diagonal entry {} is {}", i, rho[(i, i)]),
            });
        }
        for j in 0..i {
            let value = rho[(i, j)];
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(ModelError::InvalidCorrelation {
                    reason: format!("entry ({}, {}) is {}", i, j, value),
                });
            }
            if (value - rho[(j, i)]).abs() > 1e-10 {
                return Err(ModelError::InvalidCorrelation {
                    reason: format!("asymmetry at ({}, {})", i, j),
                });
            }
        }
    }
    Ok(())
}
