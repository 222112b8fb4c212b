//! # Morton (Z-Order) Codec
//!
//! Bijection between per-dimension chunk coordinates and a linear chunk id,
//! providing spatial locality in the chunk tables: chunks that are close in
//! space receive close ids.
//!
//! Axis `0` occupies the most significant bit of each interleave group.
//! For a power-of-two grid this makes Morton id order coincide with the
//! offset order produced by the KD descent, which in turn keeps vertex ids
//! increasing along the local chunk walk.
//!
//! Supports up to 32 bits per axis in 2D and 21 bits per axis in 3D.

/// Spreads the low 32 bits of `x` so that bit `i` moves to bit `2i`.
#[inline(always)]
fn spread2(mut x: u64) -> u64 {
    x &= 0xffff_ffff;
    x = (x | (x << 16)) & 0x0000_ffff_0000_ffff;
    x = (x | (x << 8)) & 0x00ff_00ff_00ff_00ff;
    x = (x | (x << 4)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

/// Inverse of [`spread2`].
#[inline(always)]
fn compact2(mut x: u64) -> u64 {
    x &= 0x5555_5555_5555_5555;
    x = (x ^ (x >> 1)) & 0x3333_3333_3333_3333;
    x = (x ^ (x >> 2)) & 0x0f0f_0f0f_0f0f_0f0f;
    x = (x ^ (x >> 4)) & 0x00ff_00ff_00ff_00ff;
    x = (x ^ (x >> 8)) & 0x0000_ffff_0000_ffff;
    x = (x ^ (x >> 16)) & 0xffff_ffff;
    x
}

/// Spreads the low 21 bits of `x` so that bit `i` moves to bit `3i`.
#[inline(always)]
fn spread3(mut x: u64) -> u64 {
    x &= 0x1f_ffff;
    x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
    x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
    x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
    x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
    x = (x | (x << 2)) & 0x1249_2492_4924_9249;
    x
}

/// Inverse of [`spread3`].
#[inline(always)]
fn compact3(mut x: u64) -> u64 {
    x &= 0x1249_2492_4924_9249;
    x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
    x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
    x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
    x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
    x = (x ^ (x >> 32)) & 0x1f_ffff;
    x
}

/// Encodes `D`-dimensional coordinates into a Morton id.
///
/// Axis `0` is the most significant axis of each interleave group.
///
/// # Panics
/// Panics if `D` is not 2 or 3.
#[inline]
pub fn encode<const D: usize>(coords: [u64; D]) -> u64 {
    let coords = coords.as_slice();
    match D {
        2 => (spread2(coords[0]) << 1) | spread2(coords[1]),
        3 => (spread3(coords[0]) << 2) | (spread3(coords[1]) << 1) | spread3(coords[2]),
        _ => unreachable!("only 2D and 3D grids are supported"),
    }
}

/// Decodes a Morton id back into `D`-dimensional coordinates.
///
/// # Panics
/// Panics if `D` is not 2 or 3.
#[inline]
pub fn decode<const D: usize>(id: u64) -> [u64; D] {
    let mut coords = [0u64; D];
    let slots = coords.as_mut_slice();
    match D {
        2 => {
            slots[0] = compact2(id >> 1);
            slots[1] = compact2(id);
        }
        3 => {
            slots[0] = compact3(id >> 2);
            slots[1] = compact3(id >> 1);
            slots[2] = compact3(id);
        }
        _ => unreachable!("only 2D and 3D grids are supported"),
    }
    coords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_2d() {
        for x in 0..32u64 {
            for y in 0..32u64 {
                let id = encode([x, y]);
                assert_eq!(decode::<2>(id), [x, y]);
            }
        }
    }

    #[test]
    fn roundtrip_3d() {
        for x in 0..16u64 {
            for y in 0..16u64 {
                for z in 0..16u64 {
                    let id = encode([x, y, z]);
                    assert_eq!(decode::<3>(id), [x, y, z]);
                }
            }
        }
    }

    #[test]
    fn bijective_on_grid() {
        let k = 8u64;

        let mut ids: Vec<u64> = (0..k)
            .flat_map(|x| (0..k).map(move |y| encode([x, y])))
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..k * k).collect::<Vec<_>>());

        let mut ids: Vec<u64> = (0..k)
            .flat_map(|x| {
                (0..k).flat_map(move |y| (0..k).map(move |z| encode([x, y, z])))
            })
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..k * k * k).collect::<Vec<_>>());
    }

    #[test]
    fn axis_zero_is_most_significant() {
        assert!(encode([1u64, 0]) > encode([0u64, 1]));
        assert!(encode([1u64, 0, 0]) > encode([0u64, 1, 0]));
        assert!(encode([0u64, 1, 0]) > encode([0u64, 0, 1]));
    }
}
