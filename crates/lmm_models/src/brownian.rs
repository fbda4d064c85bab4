//! Brownian-increment generation for path simulation.
//!
//! Every path draws its increments from an independent stream derived from
//! the pair `(base seed, path index)`, so the draws a given path receives
//! do not depend on how paths are batched across workers. That invariant is
//! what makes parallel collection bit-identical to sequential collection.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Per-step vector-draw source for an evolver.
///
/// `next_path` begins a new path and `next_step` fills one factor-vector of
/// standard normal draws; both return a multiplicative path-weight
/// contribution (1.0 for bias-free schemes, a likelihood ratio for
/// importance-sampling generators).
pub trait BrownianGenerator {
    /// Number of factors supplied per step.
    fn number_of_factors(&self) -> usize;

    /// Number of steps per path.
    fn number_of_steps(&self) -> usize;

    /// Starts the next path and returns its initial weight.
    fn next_path(&mut self) -> f64;

    /// Fills `out` with one step's factor draws and returns the step's
    /// weight contribution.
    ///
    /// # Panics
    ///
    /// Panics if `out.len()` differs from [`number_of_factors`](Self::number_of_factors)
    /// or if more steps are requested than a path has.
    fn next_step(&mut self, out: &mut [f64]) -> f64;
}

/// SplitMix64 finaliser, used to whiten per-path seeds.
fn split_mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Pseudo-random Gaussian generator with deterministic per-path streams.
///
/// # Examples
///
/// ```
/// use lmm_models::{BrownianGenerator, GaussianBrownianGeneratorFactory};
///
/// let factory = GaussianBrownianGeneratorFactory::new(42);
/// let mut generator = factory.create(3, 8);
///
/// let weight = generator.next_path();
/// assert_eq!(weight, 1.0);
/// let mut draws = [0.0; 3];
/// generator.next_step(&mut draws);
/// ```
pub struct GaussianBrownianGenerator {
    factors: usize,
    steps: usize,
    base_seed: u64,
    next_path_index: u64,
    rng: StdRng,
    steps_drawn: usize,
}

impl GaussianBrownianGenerator {
    fn new(factors: usize, steps: usize, base_seed: u64, first_path: u64) -> Self {
        Self {
            factors,
            steps,
            base_seed,
            next_path_index: first_path,
            rng: StdRng::seed_from_u64(0),
            steps_drawn: steps, // force next_path before next_step
        }
    }

    /// The index the next call to [`next_path`](BrownianGenerator::next_path)
    /// will assign.
    pub fn next_path_index(&self) -> u64 {
        self.next_path_index
    }
}

impl BrownianGenerator for GaussianBrownianGenerator {
    fn number_of_factors(&self) -> usize {
        self.factors
    }

    fn number_of_steps(&self) -> usize {
        self.steps
    }

    fn next_path(&mut self) -> f64 {
        let stream_seed = split_mix64(self.base_seed ^ split_mix64(self.next_path_index));
        self.rng = StdRng::seed_from_u64(stream_seed);
        self.next_path_index += 1;
        self.steps_drawn = 0;
        1.0
    }

    fn next_step(&mut self, out: &mut [f64]) -> f64 {
        assert_eq!(
            out.len(),
            self.factors,
            "draw buffer size {} does not match factor count {}",
            out.len(),
            self.factors
        );
        assert!(
            self.steps_drawn < self.steps,
            "all {} steps of this path already drawn",
            self.steps
        );
        for value in out.iter_mut() {
            *value = StandardNormal.sample(&mut self.rng);
        }
        self.steps_drawn += 1;
        1.0
    }
}

/// Creates [`GaussianBrownianGenerator`]s sharing one base seed.
///
/// Parallel workers use [`create_with_offset`](Self::create_with_offset) so
/// each worker's generator starts at its first global path index.
#[derive(Debug, Clone, Copy)]
pub struct GaussianBrownianGeneratorFactory {
    base_seed: u64,
}

impl GaussianBrownianGeneratorFactory {
    /// Creates a factory from a base seed.
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// The shared base seed.
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Creates a generator whose first path is global path 0.
    pub fn create(&self, factors: usize, steps: usize) -> GaussianBrownianGenerator {
        self.create_with_offset(factors, steps, 0)
    }

    /// Creates a generator whose first path is global path `first_path`.
    pub fn create_with_offset(
        &self,
        factors: usize,
        steps: usize,
        first_path: usize,
    ) -> GaussianBrownianGenerator {
        GaussianBrownianGenerator::new(factors, steps, self.base_seed, first_path as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_path(generator: &mut GaussianBrownianGenerator) -> Vec<f64> {
        let mut path = Vec::new();
        generator.next_path();
        let mut buffer = vec![0.0; generator.number_of_factors()];
        for _ in 0..generator.number_of_steps() {
            generator.next_step(&mut buffer);
            path.extend_from_slice(&buffer);
        }
        path
    }

    #[test]
    fn test_same_seed_reproduces_draws() {
        let factory = GaussianBrownianGeneratorFactory::new(7);
        let mut a = factory.create(2, 4);
        let mut b = factory.create(2, 4);
        assert_eq!(draw_path(&mut a), draw_path(&mut b));
    }

    #[test]
    fn test_paths_are_independent_streams() {
        let factory = GaussianBrownianGeneratorFactory::new(7);
        let mut generator = factory.create(2, 4);
        let first = draw_path(&mut generator);
        let second = draw_path(&mut generator);
        assert_ne!(first, second);
    }

    #[test]
    fn test_offset_reproduces_later_paths() {
        // the draws of global path 5 must not depend on batching
        let factory = GaussianBrownianGeneratorFactory::new(99);
        let mut sequential = factory.create(3, 6);
        for _ in 0..5 {
            draw_path(&mut sequential);
        }
        let path5_sequential = draw_path(&mut sequential);

        let mut offset = factory.create_with_offset(3, 6, 5);
        let path5_offset = draw_path(&mut offset);
        assert_eq!(path5_sequential, path5_offset);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a = GaussianBrownianGeneratorFactory::new(1).create(2, 3);
        let mut b = GaussianBrownianGeneratorFactory::new(2).create(2, 3);
        assert_ne!(draw_path(&mut a), draw_path(&mut b));
    }

    #[test]
    #[should_panic(expected = "does not match factor count")]
    fn test_wrong_buffer_size_panics() {
        let mut generator = GaussianBrownianGeneratorFactory::new(1).create(3, 2);
        generator.next_path();
        let mut buffer = [0.0; 2];
        generator.next_step(&mut buffer);
    }

    #[test]
    #[should_panic(expected = "already drawn")]
    fn test_overdrawing_a_path_panics() {
        let mut generator = GaussianBrownianGeneratorFactory::new(1).create(1, 1);
        generator.next_path();
        let mut buffer = [0.0; 1];
        generator.next_step(&mut buffer);
        generator.next_step(&mut buffer);
    }

    #[test]
    fn test_draws_look_standard_normal() {
        let factory = GaussianBrownianGeneratorFactory::new(2024);
        let mut generator = factory.create(1, 1000);
        generator.next_path();
        let mut buffer = [0.0; 1];
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..1000 {
            generator.next_step(&mut buffer);
            sum += buffer[0];
            sum_sq += buffer[0] * buffer[0];
        }
        let mean = sum / 1000.0;
        let variance = sum_sq / 1000.0 - mean * mean;
        assert!(mean.abs() < 0.15, "sample mean {}", mean);
        assert!((variance - 1.0).abs() < 0.2, "sample variance {}", variance);
    }
}
