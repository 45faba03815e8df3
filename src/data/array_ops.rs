//! Bulk array primitives shared by the redistribution engine and the
//! adjacency kernels: prefix sums, stable key sorts, permutations and
//! fan-out expansion and fan-in reduction.
//!
//! Everything here is deterministic for any thread count; parallel regions
//! only write disjoint output slots.

use std::ops::Add;

use bytemuck::Zeroable;
use itertools::Itertools;
use rayon::prelude::*;

use crate::topology::simplex::Lo;

/// Exclusive prefix sum with a trailing total: `out.len() == degrees.len() + 1`.
pub fn offset_scan<T>(degrees: &[T]) -> Vec<Lo>
where
    T: Copy + Into<u64>,
{
    let mut out = Vec::with_capacity(degrees.len() + 1);
    let mut acc: u64 = 0;
    out.push(0);
    for &d in degrees {
        acc += d.into();
        out.push(acc as Lo);
    }
    out
}

/// Per-node degree of an offsets array.
pub fn get_degrees(offsets: &[Lo]) -> Vec<Lo> {
    offsets.iter().tuple_windows().map(|(a, b)| b - a).collect()
}

/// Last entry of an offsets array, zero for an empty one.
#[inline]
pub fn offsets_total(offsets: &[Lo]) -> usize {
    offsets.last().copied().unwrap_or(0) as usize
}

pub fn multiply_each_by(factor: Lo, a: &[Lo]) -> Vec<Lo> {
    a.iter().map(|&x| x * factor).collect()
}

/// Indices of `keys` in stable ascending key order: the result maps a
/// sorted position to the original index.
pub fn sort_by_keys<K>(keys: &[K]) -> Vec<Lo>
where
    K: Ord + Sync,
{
    let mut order: Vec<Lo> = (0..keys.len() as Lo).collect();
    order.par_sort_by_key(|&i| &keys[i as usize]);
    order
}

/// `out[perm[i]] = i`.
pub fn invert_permutation(perm: &[Lo]) -> Vec<Lo> {
    let mut out = vec![0 as Lo; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        out[p as usize] = i as Lo;
    }
    out
}

/// Gather: `out[a] = b_data[a2b[a]]`, `width` values per entry.
pub fn unmap<T>(a2b: &[Lo], b_data: &[T], width: usize) -> Vec<T>
where
    T: Copy + Send + Sync + Zeroable,
{
    let mut out = vec![T::zeroed(); a2b.len() * width];
    if width == 0 {
        return out;
    }
    out.par_chunks_mut(width)
        .zip(a2b.par_iter())
        .for_each(|(dst, &b)| {
            let b = b as usize * width;
            dst.copy_from_slice(&b_data[b..b + width]);
        });
    out
}

/// Scatter through a permutation: `out[a2b[a]] = a_data[a]`.
pub fn permute<T>(a_data: &[T], a2b: &[Lo], width: usize) -> Vec<T>
where
    T: Copy + Send + Sync + Zeroable,
{
    unmap(&invert_permutation(a2b), a_data, width)
}

/// Fan-out: every item in `a2ab[a]..a2ab[a+1]` receives root `a`'s value.
pub fn expand<T>(a_data: &[T], a2ab: &[Lo], width: usize) -> Vec<T>
where
    T: Copy + Send + Sync + Zeroable,
{
    let nb = offsets_total(a2ab);
    let mut b2a = vec![0 as Lo; nb];
    for (a, (&begin, &end)) in a2ab.iter().tuple_windows().enumerate() {
        b2a[begin as usize..end as usize].fill(a as Lo);
    }
    unmap(&b2a, a_data, width)
}

/// Inverts a many-to-one map `a2b` (with `b < nb`) by a stable sort.
/// Returns `(b2ba, ba2a)`: offsets into the sorted order and the sorted
/// order itself, so each `b` lists its `a`s in ascending order.
pub fn invert_by_sorting(a2b: &[Lo], nb: usize) -> (Vec<Lo>, Vec<Lo>) {
    let ba2a = sort_by_keys(a2b);
    let mut counts = vec![0 as Lo; nb];
    for &b in a2b {
        counts[b as usize] += 1;
    }
    (offset_scan(&counts), ba2a)
}

/// How values folding into one root combine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReduceOp {
    Sum,
    Min,
    Max,
}

impl ReduceOp {
    #[inline]
    pub fn apply<T: PartialOrd + Add<Output = T>>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Min => {
                if b < a {
                    b
                } else {
                    a
                }
            }
            ReduceOp::Max => {
                if b > a {
                    b
                } else {
                    a
                }
            }
        }
    }
}

/// Fan-in: root `a` gets `op` folded over the values of its items
/// `a2ab[a]..a2ab[a+1]`, in item order. Roots without items stay zero.
pub fn fan_reduce<T>(a2ab: &[Lo], ab_data: &[T], width: usize, op: ReduceOp) -> Vec<T>
where
    T: Copy + Send + Sync + Zeroable + PartialOrd + Add<Output = T>,
{
    let na = a2ab.len().saturating_sub(1);
    let mut out = vec![T::zeroed(); na * width];
    if width == 0 {
        return out;
    }
    out.par_chunks_mut(width).enumerate().for_each(|(a, dst)| {
        let (begin, end) = (a2ab[a] as usize, a2ab[a + 1] as usize);
        if begin == end {
            return;
        }
        dst.copy_from_slice(&ab_data[begin * width..(begin + 1) * width]);
        for ab in begin + 1..end {
            for (acc, &v) in dst.iter_mut().zip(&ab_data[ab * width..(ab + 1) * width]) {
                *acc = op.apply(*acc, v);
            }
        }
    });
    out
}
