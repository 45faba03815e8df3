//! Alignment codes relating two vertex orderings of the same simplex.
//!
//! A code packs three fields into one byte:
//!
//! * `which_down` (bits 3..): which canonical boundary piece of a higher
//!   simplex this is,
//! * `rotation` (bits 1..3): cyclic shift, indices move up in the canonical
//!   ordering (`0 1 2 -> 2 0 1 -> 1 2 0`),
//! * `is_flipped` (bit 0): triangles only, swaps the last two vertices
//!   (`0 1 2 -> 0 2 1`).
//!
//! Rotation is applied before the flip. A code maps a canonical vertex
//! index to its index in the used ordering: `used[align_index(d, j, c)] ==
//! canonical[j]`.
//!
//! Degree is a runtime argument; anything but 2 or 3 is a caller bug and
//! panics.

use core::fmt::{Debug, Formatter};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// Packed `which_down | rotation | is_flipped` byte.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct AlignCode(pub u8);

assert_eq_size!(AlignCode, u8);

impl Debug for AlignCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignCode")
            .field("which_down", &self.which_down())
            .field("rotation", &self.rotation())
            .field("flip", &self.is_flipped())
            .finish()
    }
}

impl AlignCode {
    /// No rotation, no flip, first boundary piece.
    pub const IDENTITY: AlignCode = AlignCode(0);

    #[inline]
    pub const fn new(which_down: usize, rotation: usize, is_flipped: bool) -> Self {
        debug_assert!(which_down < 8 && rotation < 4);
        AlignCode(((which_down << 3) | (rotation << 1) | is_flipped as usize) as u8)
    }

    #[inline]
    pub const fn which_down(self) -> usize {
        (self.0 >> 3) as usize
    }

    #[inline]
    pub const fn rotation(self) -> usize {
        ((self.0 >> 1) & 3) as usize
    }

    #[inline]
    pub const fn is_flipped(self) -> bool {
        self.0 & 1 != 0
    }

    /// `(which_down, rotation, is_flipped)`.
    #[inline]
    pub const fn decode(self) -> (usize, usize, bool) {
        (self.which_down(), self.rotation(), self.is_flipped())
    }

    /// Same rotation and flip, `which_down` replaced.
    #[inline]
    pub const fn with_which_down(self, which_down: usize) -> Self {
        Self::new(which_down, self.rotation(), self.is_flipped())
    }

    /// Rotation and flip only.
    #[inline]
    pub const fn alignment(self) -> Self {
        AlignCode(self.0 & 0b111)
    }
}

#[inline]
fn check_degree(degree: usize) {
    assert!(
        degree == 2 || degree == 3,
        "alignment degree must be 2 or 3, got {degree}"
    );
}

#[inline]
pub fn rotate_index(index: usize, rotation: usize, degree: usize) -> usize {
    check_degree(degree);
    (index + rotation) % degree
}

/// Vertex flip: swaps vertices 1 and 2 of a triangle, identity on edges.
#[inline]
pub fn flip_index(index: usize, degree: usize) -> usize {
    check_degree(degree);
    match (degree, index) {
        (3, 1) => 2,
        (3, 2) => 1,
        _ => index,
    }
}

/// The action of a triangle vertex flip on the triangle's edges:
/// edges 0 and 2 trade places, edge 1 stays.
#[inline]
pub fn flip_edge_index(index: usize) -> usize {
    match index {
        0 => 2,
        2 => 0,
        _ => 1,
    }
}

/// Rotate then flip a vertex index.
#[inline]
pub fn align_index(degree: usize, index: usize, code: AlignCode) -> usize {
    let index = rotate_index(index, code.rotation(), degree);
    if code.is_flipped() {
        flip_index(index, degree)
    } else {
        index
    }
}

/// Rotate then flip an edge index of a triangle.
#[inline]
pub fn align_edge_index(index: usize, code: AlignCode) -> usize {
    let index = rotate_index(index, code.rotation(), 3);
    if code.is_flipped() {
        flip_edge_index(index)
    } else {
        index
    }
}

#[inline]
pub fn invert_rotation(degree: usize, rotation: usize) -> usize {
    check_degree(degree);
    (degree - rotation % degree) % degree
}

/// Rotation that brings vertex `new_first` to position 0.
#[inline]
pub fn rotation_to_first(degree: usize, new_first: usize) -> usize {
    invert_rotation(degree, new_first)
}

/// Inverse alignment. Flipped codes are their own inverses. The result
/// carries `which_down == 0`.
#[inline]
pub fn invert(code: AlignCode, degree: usize) -> AlignCode {
    check_degree(degree);
    if code.is_flipped() {
        return code.alignment();
    }
    AlignCode::new(0, invert_rotation(degree, code.rotation()), false)
}

/// The single alignment equivalent to applying `code1` and then `code2`.
#[inline]
pub fn compound(code1: AlignCode, code2: AlignCode, degree: usize) -> AlignCode {
    // follow the vertex that used to be first; the inverse of the compound
    // is the rotation bringing it back to the front
    let old_first = align_index(degree, align_index(degree, 0, code1), code2);
    let rotation = rotation_to_first(degree, old_first);
    let is_flipped = code1.is_flipped() ^ code2.is_flipped();
    invert(AlignCode::new(0, rotation, is_flipped), degree)
}

/// Reorders one canonical tuple into the used ordering described by `code`.
pub fn align_adj<T: Copy>(code: AlignCode, degree: usize, input: &[T], output: &mut [T]) {
    for (j, &value) in input.iter().take(degree).enumerate() {
        output[align_index(degree, j, code)] = value;
    }
}

/// Applies `codes[i]` to the `i`-th `degree`-tuple of `tuples`.
pub fn align_tuples<T: Copy + Default>(degree: usize, tuples: &[T], codes: &[AlignCode]) -> Vec<T> {
    let mut out = vec![T::default(); tuples.len()];
    for ((inp, outp), &code) in tuples
        .chunks_exact(degree)
        .zip(out.chunks_exact_mut(degree))
        .zip(codes)
    {
        align_adj(code, degree, inp, outp);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn all_codes(degree: usize) -> Vec<AlignCode> {
        let flips: &[bool] = if degree == 3 { &[false, true] } else { &[false] };
        let mut out = Vec::new();
        for r in 0..degree {
            for &f in flips {
                out.push(AlignCode::new(0, r, f));
            }
        }
        out
    }

    #[test]
    fn encode_decode() {
        let c = AlignCode::new(5, 2, true);
        assert_eq!(c.decode(), (5, 2, true));
        assert_eq!(c.alignment(), AlignCode::new(0, 2, true));
        assert_eq!(c.with_which_down(1).decode(), (1, 2, true));
        assert_eq!(AlignCode::IDENTITY.decode(), (0, 0, false));
    }

    #[test]
    fn flips() {
        assert_eq!(
            (0..3).map(|i| flip_index(i, 3)).collect::<Vec<_>>(),
            vec![0, 2, 1]
        );
        assert_eq!(
            (0..2).map(|i| flip_index(i, 2)).collect::<Vec<_>>(),
            vec![0, 1]
        );
        assert_eq!(
            (0..3).map(flip_edge_index).collect::<Vec<_>>(),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn flipped_codes_are_self_inverse() {
        for r in 0..3 {
            let c = AlignCode::new(0, r, true);
            assert_eq!(invert(c, 3), c);
        }
    }

    #[test]
    fn compound_with_inverse_is_identity() {
        for degree in [2, 3] {
            for c in all_codes(degree) {
                assert_eq!(compound(c, invert(c, degree), degree), AlignCode::IDENTITY);
                assert_eq!(compound(invert(c, degree), c, degree), AlignCode::IDENTITY);
            }
        }
    }

    #[test]
    fn compound_matches_sequential_alignment() {
        for degree in [2, 3] {
            for c1 in all_codes(degree) {
                for c2 in all_codes(degree) {
                    let c12 = compound(c1, c2, degree);
                    for i in 0..degree {
                        assert_eq!(
                            align_index(degree, align_index(degree, i, c1), c2),
                            align_index(degree, i, c12),
                            "degree {degree} {c1:?} then {c2:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn edge_flip_follows_vertex_flip() {
        // edge k of a triangle spans vertices (k, k+1)
        for c in all_codes(3) {
            for k in 0..3 {
                let a = align_index(3, k, c);
                let b = align_index(3, (k + 1) % 3, c);
                let e = align_edge_index(k, c);
                let (x, y) = (e, (e + 1) % 3);
                assert!((a, b) == (x, y) || (a, b) == (y, x));
            }
        }
    }

    #[test]
    #[should_panic(expected = "alignment degree must be 2 or 3")]
    fn bad_degree_panics() {
        let _ = align_index(4, 0, AlignCode::IDENTITY);
    }

    proptest! {
        #[test]
        fn align_adj_round_trips(r in 0usize..3, f in any::<bool>(), t in prop::array::uniform3(0u32..100)) {
            let c = AlignCode::new(0, r, f);
            let mut used = [0u32; 3];
            align_adj(c, 3, &t, &mut used);
            let mut back = [0u32; 3];
            align_adj(invert(c, 3), 3, &used, &mut back);
            prop_assert_eq!(back, t);
        }
    }
}
