//! Incremental sequence statistics.

use lmm_core::types::Real;

/// Weighted running statistics over fixed-length sample vectors.
///
/// Accumulation is associative and commutative over samples, so partial
/// accumulators from parallel path workers can be [`merge`](Self::merge)d
/// in any order.
///
/// # Examples
///
/// ```
/// use lmm_pricing::SequenceStats;
///
/// let mut stats = SequenceStats::new(1);
/// stats.add_sample(&[2.0], 1.0);
/// stats.add_sample(&[4.0], 1.0);
/// assert!((stats.mean()[0] - 3.0).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceStats {
    total_weight: Real,
    count: usize,
    weighted_sum: Vec<Real>,
    weighted_sum_sq: Vec<Real>,
}

impl SequenceStats {
    /// Creates an accumulator for samples of the given dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            total_weight: 0.0,
            count: 0,
            weighted_sum: vec![0.0; dimension],
            weighted_sum_sq: vec![0.0; dimension],
        }
    }

    /// Sample-vector dimension.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.weighted_sum.len()
    }

    /// Number of samples added.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Adds one sample vector with the given weight.
    ///
    /// # Panics
    ///
    /// Panics on a dimension mismatch or a non-positive weight.
    pub fn add_sample(&mut self, values: &[Real], weight: Real) {
        assert_eq!(
            values.len(),
            self.dimension(),
            "sample dimension {} does not match accumulator dimension {}",
            values.len(),
            self.dimension()
        );
        assert!(weight > 0.0, "sample weight must be positive");
        self.total_weight += weight;
        self.count += 1;
        for (i, &value) in values.iter().enumerate() {
            self.weighted_sum[i] += weight * value;
            self.weighted_sum_sq[i] += weight * value * value;
        }
    }

    /// Merges another accumulator of the same dimension into this one.
    ///
    /// # Panics
    ///
    /// Panics on a dimension mismatch.
    pub fn merge(&mut self, other: &SequenceStats) {
        assert_eq!(
            other.dimension(),
            self.dimension(),
            "cannot merge accumulators of different dimensions"
        );
        self.total_weight += other.total_weight;
        self.count += other.count;
        for i in 0..self.dimension() {
            self.weighted_sum[i] += other.weighted_sum[i];
            self.weighted_sum_sq[i] += other.weighted_sum_sq[i];
        }
    }

    /// Weighted component means.
    ///
    /// # Panics
    ///
    /// Panics if no samples have been added.
    pub fn mean(&self) -> Vec<Real> {
        assert!(self.count > 0, "statistics queried before any sample");
        self.weighted_sum
            .iter()
            .map(|s| s / self.total_weight)
            .collect()
    }

    /// Component standard deviations (with the n/(n-1) bias correction).
    ///
    /// # Panics
    ///
    /// Panics with fewer than two samples.
    pub fn std_dev(&self) -> Vec<Real> {
        assert!(self.count > 1, "standard deviation needs at least two samples");
        let correction = self.count as f64 / (self.count as f64 - 1.0);
        self.weighted_sum
            .iter()
            .zip(&self.weighted_sum_sq)
            .map(|(&s, &sq)| {
                let mean = s / self.total_weight;
                let variance = (sq / self.total_weight - mean * mean).max(0.0) * correction;
                variance.sqrt()
            })
            .collect()
    }

    /// Standard errors of the component means.
    ///
    /// # Panics
    ///
    /// Panics with fewer than two samples.
    pub fn error_estimate(&self) -> Vec<Real> {
        let sqrt_n = (self.count as f64).sqrt();
        self.std_dev().iter().map(|sd| sd / sqrt_n).collect()
    }
}
