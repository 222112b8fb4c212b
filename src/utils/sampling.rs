/*!
# Deterministic Sampling

All randomness in the generators flows through [`Sampler`]: a stateless
handle capturing only the configuration seed and the sampler tuning knobs.
Every draw is keyed by a 64-bit structural key and is a pure function of
`(seed, key, parameters)`: two ranks computing the same draw always agree
bit-exactly, which is what replaces message passing with re-derivation.

Two families of variates are provided:

- **Binomial** splits for the multinomial chunk/cell recursion. Small
  totals (`n <= base_size`) use an explicit Bernoulli-count loop; larger
  totals draw from [`rand_distr::Binomial`] on a key-seeded generator.
- **Hypergeometric** splits for distributing an exact edge count over
  disjoint slot ranges. Exact via [`rand_distr::Hypergeometric`], or the
  classical binomial approximation when `use_binom` is set and the
  population exceeds `hyp_base`.

Uniform coordinates are drawn with `precision` mantissa bits so that the
integer quantities derived from them stay platform-independent.
*/

use rand::RngCore;
use rand::SeedableRng;
use rand_distr::{Binomial, Distribution, Hypergeometric};
use rand_pcg::Pcg64Mcg;

use super::hashing::hash;
use super::Probability;

/// Deterministic variate source shared by all generators.
///
/// Cheap to copy; holds no generator state. Each draw seeds a fresh
/// [`Pcg64Mcg`] from `hash(seed + key)`.
#[derive(Debug, Copy, Clone)]
pub struct Sampler {
    seed: u64,
    use_binom: bool,
    base_size: u64,
    hyp_base: u64,
    precision: u32,
}

impl Sampler {
    /// Creates a sampler for the given seed with default tuning.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            use_binom: false,
            base_size: 1 << 8,
            hyp_base: 1 << 8,
            precision: 32,
        }
    }

    /// Enables the binomial approximation for hypergeometric draws (builder style).
    pub fn use_binom(mut self, use_binom: bool) -> Self {
        self.use_binom = use_binom;
        self
    }

    /// Sets the total below which binomial draws use the exact Bernoulli-count path.
    pub fn base_size(mut self, base_size: u64) -> Self {
        self.base_size = base_size;
        self
    }

    /// Sets the population below which hypergeometric draws stay exact even
    /// under [`Sampler::use_binom`].
    pub fn hyp_base(mut self, hyp_base: u64) -> Self {
        self.hyp_base = hyp_base;
        self
    }

    /// Sets the number of mantissa bits for uniform coordinate draws.
    /// Clamped to `1..=53`.
    pub fn precision(mut self, bits: u64) -> Self {
        self.precision = (bits as u32).clamp(1, 53);
        self
    }

    /// The configuration seed this sampler was built from.
    #[inline]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A fresh generator for `key`, e.g. for materializing the vertices of
    /// one cell. Same key, same stream.
    #[inline]
    pub fn rng(&self, key: u64) -> Pcg64Mcg {
        Pcg64Mcg::seed_from_u64(hash(self.seed.wrapping_add(key)))
    }

    /// A uniform double in `[0, 1)` with `precision` mantissa bits.
    #[inline]
    pub fn uniform(&self, rng: &mut Pcg64Mcg) -> f64 {
        (rng.next_u64() >> (64 - self.precision)) as f64 / (1u64 << self.precision) as f64
    }

    /// Draws `k ~ Binomial(n, p)`, a pure function of `(seed, key, n, p)`.
    ///
    /// # Panics
    /// Asserts that `p` is a valid probability.
    pub fn binomial(&self, key: u64, n: u64, p: f64) -> u64 {
        assert!(p.is_valid_probability());

        if n == 0 || p == 0.0 {
            return 0;
        }
        if p == 1.0 {
            return n;
        }

        let mut rng = self.rng(key);
        if n <= self.base_size {
            (0..n).filter(|_| self.uniform(&mut rng) < p).count() as u64
        } else {
            Binomial::new(n, p).unwrap().sample(&mut rng)
        }
    }

    /// Draws the number of marked items in a sample of `draws` items taken
    /// without replacement from a population of `total` items of which
    /// `marked` are marked. Pure function of `(seed, key, total, marked, draws)`.
    ///
    /// The result is always clamped to its feasible interval
    /// `[draws - (total - marked), min(draws, marked)]` so that downstream
    /// splits conserve their totals even under the binomial approximation.
    pub fn hypergeometric(&self, key: u64, total: u64, marked: u64, draws: u64) -> u64 {
        debug_assert!(marked <= total);
        debug_assert!(draws <= total);

        if draws == 0 || marked == 0 {
            return 0;
        }
        if marked == total {
            return draws;
        }

        let lo = draws.saturating_sub(total - marked);
        let hi = draws.min(marked);

        let mut rng = self.rng(key);
        let k = if self.use_binom && total > self.hyp_base {
            Binomial::new(draws, marked as f64 / total as f64)
                .unwrap()
                .sample(&mut rng)
        } else {
            Hypergeometric::new(total, marked, draws)
                .unwrap()
                .sample(&mut rng)
        };

        k.clamp(lo, hi)
    }
}
