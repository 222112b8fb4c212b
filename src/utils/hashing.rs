//! # Deterministic Key Hashing
//!
//! Every reproducible draw in this crate is keyed by a 64-bit integer built
//! from structural quantities (seed, region corner, recursion level, chunk
//! and cell ids). [`hash`] turns such a key into a well-mixed 64-bit value
//! that then seeds a variate generator.
//!
//! The hash is only ever used to *seed* generators, never directly as a
//! variate.

/// Mixes a 64-bit key into a 64-bit hash (splitmix64 finalizer).
///
/// Nearby keys (e.g. consecutive chunk ids) produce statistically
/// independent seeds.
#[inline(always)]
pub fn hash(key: u64) -> u64 {
    let mut h = key.wrapping_add(0x9e37_79b9_7f4a_7c15);
    h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    h ^ (h >> 31)
}
