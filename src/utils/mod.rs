/*!
# Utilities

Provides the deterministic building blocks shared by all generators:
- [`hashing`](self::hashing): the 64-bit mixing hash keying every reproducible draw,
- [`morton`](self::morton): the Z-order codec for chunk coordinates,
- [`sampling`](self::sampling): deterministic binomial / hypergeometric variates.
*/

pub mod hashing;
pub mod morton;
pub mod sampling;

pub use sampling::Sampler;

/// Helper trait for probabilities
pub trait Probability {
    /// Returns *true* if the probability is valid (ie. between `0` and `1`)
    fn is_valid_probability(&self) -> bool;
}

impl Probability for f64 {
    fn is_valid_probability(&self) -> bool {
        (0.0..=1.0).contains(self)
    }
}
