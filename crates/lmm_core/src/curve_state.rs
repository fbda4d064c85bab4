//! The discretised forward-rate curve at one evolution time.
//!
//! [`LmmCurveState`] is the snapshot every other component reads: evolvers
//! write it once per step through the two setter entry points, and products,
//! exercise values and basis systems query it through the accessors below.
//!
//! Swap-rate quantities are derived lazily. The backward annuity recursion
//! is memoised with a "computed-through" watermark so repeated queries at
//! decreasing indices reuse earlier work instead of re-running the whole
//! recursion; the cache lives in an explicit interior-mutability cell so the
//! accessors stay `&self`.

use std::cell::RefCell;
use std::sync::Arc;

use crate::rate_times::RateTimes;
use crate::types::{CurveStateError, DiscountFactor, Rate, Real};

/// Lazily derived swap-rate quantities.
///
/// `cot_computed_from` is the watermark: coterminal annuities are valid for
/// indices in `[cot_computed_from, n)`; a value of `n` means nothing has
/// been computed since the last invalidation. The constant-maturity arrays
/// are cached for a single spanning-forward count at a time (`cm_span == 0`
/// means empty).
#[derive(Debug, Clone)]
struct SwapCache {
    cot_annuities: Vec<Real>,
    cot_computed_from: usize,
    cm_span: usize,
    cm_rates: Vec<Rate>,
    cm_annuities: Vec<Real>,
}

impl SwapCache {
    fn empty(number_of_rates: usize) -> Self {
        Self {
            cot_annuities: vec![0.0; number_of_rates],
            cot_computed_from: number_of_rates,
            cm_span: 0,
            cm_rates: vec![0.0; number_of_rates],
            cm_annuities: vec![0.0; number_of_rates],
        }
    }

    fn invalidate(&mut self, number_of_rates: usize) {
        self.cot_computed_from = number_of_rates;
        self.cm_span = 0;
    }

    fn cm_split_mut(&mut self) -> (&mut [Rate], &mut [Real]) {
        (&mut self.cm_rates, &mut self.cm_annuities)
    }
}

/// The discretised yield curve at one evolution time.
///
/// Holds discount-factor ratios relative to the terminal tenor boundary
/// (`discount_ratios[N] == 1`) together with the forward rates they imply.
/// Rates with index below [`first_valid_index`](Self::first_valid_index)
/// have already reset and are no longer meaningful; querying them is a
/// programming error.
///
/// # Lifecycle
///
/// Created once per run by an evolver, then overwritten through
/// [`set_on_forward_rates`](Self::set_on_forward_rates) or
/// [`set_on_discount_ratios`](Self::set_on_discount_ratios) at every step.
/// Consumers receive a shared reference valid for the duration of the step
/// callback and must clone the state if they need to retain it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lmm_core::{LmmCurveState, RateTimes};
///
/// let grid = Arc::new(RateTimes::new(vec![0.5, 1.0, 1.5, 2.0, 2.5]).unwrap());
/// let mut state = LmmCurveState::new(grid);
/// state.set_on_forward_rates(&[0.05; 4], 0).unwrap();
///
/// let dr = state.discount_ratio(0, 4);
/// assert!((dr - 1.025f64.powi(4)).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LmmCurveState {
    rate_times: Arc<RateTimes>,
    first: usize,
    discount_ratios: Vec<DiscountFactor>,
    forward_rates: Vec<Rate>,
    cache: RefCell<SwapCache>,
}

impl LmmCurveState {
    /// Creates an uninitialised curve state on the given tenor grid.
    ///
    /// Every query panics until one of the setters has been called.
    pub fn new(rate_times: Arc<RateTimes>) -> Self {
        let n = rate_times.number_of_rates();
        Self {
            rate_times,
            first: n,
            discount_ratios: vec![0.0; n + 1],
            forward_rates: vec![0.0; n],
            cache: RefCell::new(SwapCache::empty(n)),
        }
    }

    /// Number of forward-rate accrual periods (N).
    #[inline]
    pub fn number_of_rates(&self) -> usize {
        self.forward_rates.len()
    }

    /// The shared tenor grid.
    #[inline]
    pub fn rate_times(&self) -> &Arc<RateTimes> {
        &self.rate_times
    }

    /// Index of the first still-live rate; equals `number_of_rates()` while
    /// the state is uninitialised.
    #[inline]
    pub fn first_valid_index(&self) -> usize {
        self.first
    }

    /// Sets the state from a forward-rate vector.
    ///
    /// Copies `rates[first_valid_index..]` and recomputes the discount
    /// ratios by the forward recursion
    /// `dr[i+1] = dr[i] / (1 + rates[i] * tau[i])`, renormalised so that
    /// `dr[N] == 1`. All lazily derived swap quantities are invalidated.
    ///
    /// # Errors
    ///
    /// - [`CurveStateError::SizeMismatch`] if `rates.len() != N`
    /// - [`CurveStateError::FirstIndexOutOfRange`] if
    ///   `first_valid_index >= N`
    /// - [`CurveStateError::NonPositiveValue`] if some live rate makes
    ///   `1 + tau * rate` non-positive (the discount recursion would cross
    ///   zero)
    pub fn set_on_forward_rates(
        &mut self,
        rates: &[Rate],
        first_valid_index: usize,
    ) -> Result<(), CurveStateError> {
        let n = self.number_of_rates();
        if rates.len() != n {
            return Err(CurveStateError::SizeMismatch {
                name: "forward rates",
                got: rates.len(),
                expected: n,
            });
        }
        if first_valid_index >= n {
            return Err(CurveStateError::FirstIndexOutOfRange {
                first: first_valid_index,
                number_of_rates: n,
            });
        }
        let taus = self.rate_times.taus();
        for i in first_valid_index..n {
            let growth = 1.0 + rates[i] * taus[i];
            if !growth.is_finite() || growth <= 0.0 {
                return Err(CurveStateError::NonPositiveValue {
                    name: "accrual growth factor",
                    index: i,
                    value: growth,
                });
            }
        }

        self.first = first_valid_index;
        self.forward_rates[first_valid_index..].copy_from_slice(&rates[first_valid_index..]);

        self.discount_ratios[first_valid_index] = 1.0;
        for i in first_valid_index..n {
            self.discount_ratios[i + 1] =
                self.discount_ratios[i] / (1.0 + self.forward_rates[i] * taus[i]);
        }
        let terminal = self.discount_ratios[n];
        for i in first_valid_index..=n {
            self.discount_ratios[i] /= terminal;
        }

        self.cache.borrow_mut().invalidate(n);
        Ok(())
    }

    /// Sets the state from a discount-ratio vector of size N+1.
    ///
    /// The input is renormalised so that `dr[N] == 1`; forward rates are
    /// derived from consecutive discount-ratio pairs. All lazily derived
    /// swap quantities are invalidated.
    ///
    /// # Errors
    ///
    /// - [`CurveStateError::SizeMismatch`] if `discount_ratios.len() != N+1`
    /// - [`CurveStateError::FirstIndexOutOfRange`] if
    ///   `first_valid_index >= N`
    /// - [`CurveStateError::NonPositiveValue`] if some live discount ratio
    ///   is not strictly positive and finite
    pub fn set_on_discount_ratios(
        &mut self,
        discount_ratios: &[DiscountFactor],
        first_valid_index: usize,
    ) -> Result<(), CurveStateError> {
        let n = self.number_of_rates();
        if discount_ratios.len() != n + 1 {
            return Err(CurveStateError::SizeMismatch {
                name: "discount ratios",
                got: discount_ratios.len(),
                expected: n + 1,
            });
        }
        if first_valid_index >= n {
            return Err(CurveStateError::FirstIndexOutOfRange {
                first: first_valid_index,
                number_of_rates: n,
            });
        }
        for (i, &dr) in discount_ratios.iter().enumerate().skip(first_valid_index) {
            if !dr.is_finite() || dr <= 0.0 {
                return Err(CurveStateError::NonPositiveValue {
                    name: "discount ratio",
                    index: i,
                    value: dr,
                });
            }
        }

        self.first = first_valid_index;
        let terminal = discount_ratios[n];
        for i in first_valid_index..=n {
            self.discount_ratios[i] = discount_ratios[i] / terminal;
        }

        let taus = self.rate_times.taus();
        for i in first_valid_index..n {
            self.forward_rates[i] =
                (self.discount_ratios[i] / self.discount_ratios[i + 1] - 1.0) / taus[i];
        }

        self.cache.borrow_mut().invalidate(n);
        Ok(())
    }

    fn assert_initialised(&self) {
        assert!(
            self.first < self.number_of_rates(),
            "curve state queried before initialisation"
        );
    }

    fn assert_bond_index(&self, name: &str, i: usize) {
        assert!(
            i >= self.first && i <= self.number_of_rates(),
            "{} index {} out of live range [{}, {}]",
            name,
            i,
            self.first,
            self.number_of_rates()
        );
    }

    /// The discount factor ratio `P(t, T_i) / P(t, T_j)`.
    ///
    /// # Panics
    ///
    /// Panics if the state is uninitialised or either index lies outside
    /// `[first_valid_index, N]`.
    #[inline]
    pub fn discount_ratio(&self, i: usize, j: usize) -> DiscountFactor {
        self.assert_initialised();
        self.assert_bond_index("discount ratio", i);
        self.assert_bond_index("discount ratio", j);
        self.discount_ratios[i] / self.discount_ratios[j]
    }

    /// The forward rate for accrual period `i`.
    ///
    /// # Panics
    ///
    /// Panics if the state is uninitialised or `i` lies outside
    /// `[first_valid_index, N)`.
    #[inline]
    pub fn forward_rate(&self, i: usize) -> Rate {
        self.assert_initialised();
        assert!(
            i >= self.first && i < self.number_of_rates(),
            "forward rate index {} out of live range [{}, {})",
            i,
            self.first,
            self.number_of_rates()
        );
        self.forward_rates[i]
    }

    /// The full forward-rate buffer; entries below `first_valid_index` are
    /// stale and must not be read.
    #[inline]
    pub fn forward_rates(&self) -> &[Rate] {
        &self.forward_rates
    }

    /// The full discount-ratio buffer (relative to the terminal boundary);
    /// entries below `first_valid_index` are stale and must not be read.
    #[inline]
    pub fn discount_ratios(&self) -> &[DiscountFactor] {
        &self.discount_ratios
    }

    /// Extends the coterminal-annuity watermark down to index `i`.
    ///
    /// The backward recursion `annuity[k] = annuity[k+1] + tau[k]*dr[k+1]`
    /// starts from the terminal annuity `tau[N-1]*dr[N]` and only runs over
    /// the indices not yet covered, which keeps repeated Monte-Carlo
    /// queries at O(total indices touched) rather than O(N) each.
    fn ensure_coterminal(&self, i: usize) {
        let n = self.number_of_rates();
        let mut cache = self.cache.borrow_mut();
        if cache.cot_computed_from <= i {
            return;
        }
        let taus = self.rate_times.taus();
        if cache.cot_computed_from == n {
            cache.cot_annuities[n - 1] = taus[n - 1] * self.discount_ratios[n];
            cache.cot_computed_from = n - 1;
        }
        while cache.cot_computed_from > i {
            let k = cache.cot_computed_from - 1;
            cache.cot_annuities[k] = cache.cot_annuities[k + 1] + taus[k] * self.discount_ratios[k + 1];
            cache.cot_computed_from = k;
        }
    }

    /// The coterminal swap annuity starting at rate `i`, expressed in units
    /// of the bond maturing at `rate_times[numeraire]`.
    ///
    /// # Panics
    ///
    /// Panics on an uninitialised state or on indices outside the live
    /// range, and if the annuity degenerates to zero.
    pub fn coterminal_swap_annuity(&self, numeraire: usize, i: usize) -> Real {
        self.assert_initialised();
        self.assert_bond_index("numeraire", numeraire);
        assert!(
            i >= self.first && i < self.number_of_rates(),
            "coterminal annuity index {} out of live range [{}, {})",
            i,
            self.first,
            self.number_of_rates()
        );
        self.ensure_coterminal(i);
        let annuity = self.cache.borrow().cot_annuities[i];
        assert!(
            annuity > 0.0,
            "degenerate coterminal annuity at index {}",
            i
        );
        annuity / self.discount_ratios[numeraire]
    }

    /// The coterminal (to the terminal boundary) swap rate starting at rate
    /// `i`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`coterminal_swap_annuity`](Self::coterminal_swap_annuity).
    pub fn coterminal_swap_rate(&self, i: usize) -> Rate {
        self.assert_initialised();
        assert!(
            i >= self.first && i < self.number_of_rates(),
            "coterminal swap rate index {} out of live range [{}, {})",
            i,
            self.first,
            self.number_of_rates()
        );
        self.ensure_coterminal(i);
        let n = self.number_of_rates();
        let annuity = self.cache.borrow().cot_annuities[i];
        assert!(
            annuity > 0.0,
            "degenerate coterminal annuity at index {}",
            i
        );
        (self.discount_ratios[i] - self.discount_ratios[n]) / annuity
    }

    fn ensure_cm(&self, spanning_forwards: usize) {
        let mut cache = self.cache.borrow_mut();
        if cache.cm_span == spanning_forwards {
            return;
        }
        let (rates, annuities) = cache.cm_split_mut();
        constant_maturity_from_discount_ratios(
            spanning_forwards,
            self.first,
            self.rate_times.taus(),
            &self.discount_ratios,
            rates,
            annuities,
        );
        cache.cm_span = spanning_forwards;
    }

    /// The constant-maturity swap rate spanning `spanning_forwards` accrual
    /// periods starting at rate `i` (truncated at the terminal boundary).
    ///
    /// # Panics
    ///
    /// Panics on an uninitialised state, an index outside the live range,
    /// or a zero spanning-forward count.
    pub fn cm_swap_rate(&self, i: usize, spanning_forwards: usize) -> Rate {
        self.assert_initialised();
        assert!(spanning_forwards > 0, "spanning forwards must be positive");
        assert!(
            i >= self.first && i < self.number_of_rates(),
            "cm swap rate index {} out of live range [{}, {})",
            i,
            self.first,
            self.number_of_rates()
        );
        self.ensure_cm(spanning_forwards);
        self.cache.borrow().cm_rates[i]
    }

    /// The constant-maturity swap annuity spanning `spanning_forwards`
    /// accrual periods starting at rate `i`, in units of the bond maturing
    /// at `rate_times[numeraire]`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`cm_swap_rate`](Self::cm_swap_rate), plus an
    /// out-of-range numeraire.
    pub fn cm_swap_annuity(&self, numeraire: usize, i: usize, spanning_forwards: usize) -> Real {
        self.assert_initialised();
        self.assert_bond_index("numeraire", numeraire);
        assert!(spanning_forwards > 0, "spanning forwards must be positive");
        assert!(
            i >= self.first && i < self.number_of_rates(),
            "cm swap annuity index {} out of live range [{}, {})",
            i,
            self.first,
            self.number_of_rates()
        );
        self.ensure_cm(spanning_forwards);
        self.cache.borrow().cm_annuities[i] / self.discount_ratios[numeraire]
    }
}

/// Computes constant-maturity swap rates and annuities for every live index
/// from a discount-ratio vector.
///
/// The window for index `i` is `[i, min(i + spanning_forwards, N))`; windows
/// near the terminal boundary are truncated. The computation runs backward,
/// rolling the annuity window in O(1) per index, so that spanning windows
/// different from the curve's natural span cost the same as the coterminal
/// recursion.
///
/// `rates` and `annuities` are filled for indices in `[first, N)`.
///
/// # Panics
///
/// Panics on inconsistent buffer sizes, a zero span, or `first >= N`.
pub fn constant_maturity_from_discount_ratios(
    spanning_forwards: usize,
    first: usize,
    taus: &[Real],
    discount_ratios: &[DiscountFactor],
    rates: &mut [Rate],
    annuities: &mut [Real],
) {
    let n = taus.len();
    assert!(spanning_forwards > 0, "spanning forwards must be positive");
    assert!(first < n, "first valid index {} out of range {}", first, n);
    assert_eq!(discount_ratios.len(), n + 1, "discount ratio buffer size");
    assert_eq!(rates.len(), n, "rate buffer size");
    assert_eq!(annuities.len(), n, "annuity buffer size");

    annuities[n - 1] = taus[n - 1] * discount_ratios[n];
    rates[n - 1] = (discount_ratios[n - 1] - discount_ratios[n]) / annuities[n - 1];

    for i in (first..n - 1).rev() {
        annuities[i] = annuities[i + 1] + taus[i] * discount_ratios[i + 1];
        if i + spanning_forwards < n {
            // full window: drop the period that fell off the far end
            annuities[i] -= taus[i + spanning_forwards] * discount_ratios[i + spanning_forwards + 1];
        }
        let end = (i + spanning_forwards).min(n);
        assert!(
            annuities[i] > 0.0,
            "degenerate constant-maturity annuity at index {}",
            i
        );
        rates[i] = (discount_ratios[i] - discount_ratios[end]) / annuities[i];
    }
}
