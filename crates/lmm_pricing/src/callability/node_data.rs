//! Per-path, per-exercise-date training records.

use lmm_core::types::Real;

/// One path's record at one exercise date, everything already discounted
/// to the path's numeraire-relative basis.
///
/// `is_valid == false` marks an exercise date the path never reached
/// (the product terminated earlier); such records carry zeroed values and
/// must be excluded from regression fitting, never treated as zero-value
/// observations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeData {
    /// The rebate received on exercising here.
    pub exercise_value: Real,
    /// The control-variate value observed here.
    pub control_value: Real,
    /// The regressor vector for the continuation-value fit.
    pub basis_values: Vec<Real>,
    /// Product cash flows bucketed since the previous exercise date.
    pub cumulated_cash_flows: Real,
    /// Whether the path actually reached this exercise date.
    pub is_valid: bool,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            exercise_value: 0.0,
            control_value: 0.0,
            basis_values: Vec::new(),
            cumulated_cash_flows: 0.0,
            is_valid: false,
        }
    }
}

impl NodeData {
    /// Resets this record to the zeroed, invalid state.
    pub fn clear(&mut self) {
        self.exercise_value = 0.0;
        self.control_value = 0.0;
        self.basis_values.clear();
        self.cumulated_cash_flows = 0.0;
        self.is_valid = false;
    }
}
