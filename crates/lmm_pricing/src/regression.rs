//! Backward-induction least-squares fit over collected node data.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::callability::NodeData;
use crate::error::CollectorError;
use lmm_core::types::Real;

/// Outcome of a Longstaff-Schwartz regression pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionResult {
    /// Basis coefficients per exercise date, earliest date first.
    pub coefficients: Vec<Vec<Real>>,
    /// In-sample value of the exercisable claim, in the same
    /// numeraire-relative units as the collected data.
    pub value: Real,
}

/// Fits continuation values date by date, working backward from the last
/// exercise date, and applies the estimated exercise rule in-sample.
///
/// At each date the continuation value of every valid path (the flows
/// bucketed after that date plus the value carried from later decisions)
/// is regressed on that date's basis values; paths whose estimated
/// continuation falls below the recorded exercise value switch to
/// exercising. Records with `is_valid == false` are excluded from both the
/// fit and the decision, never treated as zero-value observations.
///
/// With `use_control_variate` the recorded control value is subtracted
/// from the regression target and added back to the estimate, which
/// reduces the fit variance whenever the control co-moves with the
/// continuation value. The collector always records control values; using
/// them here stays optional per run.
///
/// # Errors
///
/// - [`CollectorError::MalformedData`] for ragged rows or inconsistent
///   basis dimensions
/// - [`CollectorError::InsufficientValidPaths`] if a date has fewer valid
///   observations than basis functions
/// - [`CollectorError::SingularRegression`] if a least-squares solve fails
pub fn longstaff_schwartz_regression(
    collected: &[Vec<NodeData>],
    use_control_variate: bool,
) -> Result<RegressionResult, CollectorError> {
    if collected.len() < 2 {
        return Err(CollectorError::MalformedData {
            reason: format!("{} rows, need accrual row plus exercise rows", collected.len()),
        });
    }
    let n_paths = collected[0].len();
    if n_paths == 0 || collected.iter().any(|row| row.len() != n_paths) {
        return Err(CollectorError::MalformedData {
            reason: "rows have inconsistent path counts".to_string(),
        });
    }
    let number_of_exercises = collected.len() - 1;

    let mut carried = vec![0.0; n_paths];
    let mut coefficients = vec![Vec::new(); number_of_exercises];

    for row_index in (1..=number_of_exercises).rev() {
        let row = &collected[row_index];

        let valid_paths: Vec<usize> = (0..n_paths).filter(|&p| row[p].is_valid).collect();
        let basis_size = match valid_paths.first() {
            Some(&p) => row[p].basis_values.len(),
            None => {
                return Err(CollectorError::InsufficientValidPaths {
                    exercise: row_index,
                    got: 0,
                    need: 1,
                })
            }
        };
        if valid_paths
            .iter()
            .any(|&p| row[p].basis_values.len() != basis_size)
        {
            return Err(CollectorError::MalformedData {
                reason: format!("ragged basis dimensions at exercise {}", row_index),
            });
        }
        if valid_paths.len() < basis_size {
            return Err(CollectorError::InsufficientValidPaths {
                exercise: row_index,
                got: valid_paths.len(),
                need: basis_size,
            });
        }

        let design = DMatrix::from_fn(valid_paths.len(), basis_size, |i, j| {
            row[valid_paths[i]].basis_values[j]
        });
        let targets = DVector::from_fn(valid_paths.len(), |i, _| {
            let p = valid_paths[i];
            let continuation = row[p].cumulated_cash_flows + carried[p];
            if use_control_variate {
                continuation - row[p].control_value
            } else {
                continuation
            }
        });

        let solved = design
            .svd(true, true)
            .solve(&targets, 1e-12)
            .map_err(|_| CollectorError::SingularRegression {
                exercise: row_index,
            })?;
        let coeffs: Vec<Real> = solved.iter().copied().collect();

        for &p in &valid_paths {
            let node = &row[p];
            let continuation = node.cumulated_cash_flows + carried[p];
            let mut estimate: Real = node
                .basis_values
                .iter()
                .zip(&coeffs)
                .map(|(b, c)| b * c)
                .sum();
            if use_control_variate {
                estimate += node.control_value;
            }
            carried[p] = if node.exercise_value > estimate {
                node.exercise_value
            } else {
                continuation
            };
        }

        coefficients[row_index - 1] = coeffs;
    }

    let value = (0..n_paths)
        .map(|p| collected[0][p].cumulated_cash_flows + carried[p])
        .sum::<Real>()
        / n_paths as Real;

    debug!(number_of_exercises, n_paths, value, "regression pass complete");

    Ok(RegressionResult {
        coefficients,
        value,
    })
}
