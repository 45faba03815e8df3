//! Bidirectional item redistribution plans.
//!
//! A [`Dist`] moves per-item data between ranks. Three index spaces are
//! involved on each side:
//!
//! * *roots*: the caller-visible logical index (a root may own several items),
//! * *items*: one slot per (root, replica),
//! * *content*: items regrouped by destination rank, ready to send.
//!
//! The plan holds a forward (F) and a reverse (R) direction. The reverse
//! communication graph is the transpose of the forward one, and reverse
//! message sizes are learned from the forward ones by an `alltoall`, so
//! [`Dist::invert`] is a constant-time swap.

use std::ops::Add;
use std::sync::Arc;

use bytemuck::Pod;
use itertools::Itertools;
use log::debug;

use crate::algs::comm_graph::CommGraph;
use crate::debug_invariants::DebugInvariants;
use crate::data::array_ops::{
    ReduceOp, expand, fan_reduce, get_degrees, invert_by_sorting, invert_permutation,
    multiply_each_by, offset_scan, offsets_total, permute, sort_by_keys, unmap,
};
use crate::mesh_error::MeshError;
use crate::topology::simplex::Lo;

const F: usize = 0;
const R: usize = 1;

/// Owners (or copies) of entities on other ranks: entity `i` lives at
/// index `idxs[i]` on rank `ranks[i]`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Remotes {
    pub ranks: Arc<[usize]>,
    pub idxs: Arc<[Lo]>,
}

impl Remotes {
    pub fn new(ranks: impl Into<Arc<[usize]>>, idxs: impl Into<Arc<[Lo]>>) -> Self {
        Self {
            ranks: ranks.into(),
            idxs: idxs.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

/// A redistribution plan; see the module docs.
#[derive(Clone, Debug)]
pub struct Dist {
    parent: CommGraph,
    roots2items: [Option<Arc<[Lo]>>; 2],
    items2content: [Option<Arc<[Lo]>>; 2],
    msgs2content: [Arc<[Lo]>; 2],
    msgs2ranks: [Arc<[usize]>; 2],
    comm: [Option<CommGraph>; 2],
}

impl Dist {
    /// An empty plan over `parent`; call [`Dist::set_dest_ranks`] next.
    pub fn new(parent: CommGraph) -> Self {
        let empty_offsets: Arc<[Lo]> = Arc::from([0 as Lo]);
        let no_ranks: Arc<[usize]> = Arc::from([]);
        Self {
            parent,
            roots2items: [None, None],
            items2content: [None, None],
            msgs2content: [Arc::clone(&empty_offsets), empty_offsets],
            msgs2ranks: [Arc::clone(&no_ranks), no_ranks],
            comm: [None, None],
        }
    }

    /// Plan sending item `i` to index `remotes.idxs[i]` of rank
    /// `remotes.ranks[i]`, where the receiver holds `nroots` roots.
    pub fn from_remotes(parent: CommGraph, remotes: &Remotes, nroots: usize) -> Result<Self, MeshError> {
        let mut dist = Dist::new(parent);
        dist.set_dest_ranks(&remotes.ranks)?;
        dist.set_dest_idxs(&remotes.idxs, nroots)?;
        Ok(dist)
    }

    /// Collective. Builds the message structure from the destination rank of
    /// every local item.
    pub fn set_dest_ranks(&mut self, items2ranks: &[usize]) -> Result<(), MeshError> {
        let size = self.parent.size();
        if let Some(&rank) = items2ranks.iter().find(|&&r| r >= size) {
            return Err(MeshError::InvalidRank { rank, size });
        }
        let content2items = sort_by_keys(items2ranks);
        let content2ranks: Vec<usize> = content2items
            .iter()
            .map(|&i| items2ranks[i as usize])
            .collect();
        // a jump closes the run of one destination; the last slot always does
        let mut jumps: Vec<u8> = content2ranks
            .iter()
            .tuple_windows()
            .map(|(a, b)| u8::from(a != b))
            .collect();
        if !content2ranks.is_empty() {
            jumps.push(1);
        }
        let content2msgs = offset_scan(&jumps);
        let nmsgs = offsets_total(&content2msgs);
        let mut msgs2ranks = vec![0usize; nmsgs];
        let mut msgs2content = vec![0 as Lo; nmsgs + 1];
        for (i, _) in jumps.iter().enumerate().filter(|(_, j)| **j != 0) {
            let msg = content2msgs[i] as usize;
            msgs2ranks[msg] = content2ranks[i];
            msgs2content[msg + 1] = (i + 1) as Lo;
        }

        let fcomm = self.parent.graph(&msgs2ranks)?;
        let rcomm = self
            .parent
            .graph_adjacent(fcomm.destinations(), fcomm.sources())?;
        let fdegrees = get_degrees(&msgs2content);
        let rdegrees = fcomm.alltoall(&fdegrees)?;

        self.items2content[F] = Some(invert_permutation(&content2items).into());
        self.msgs2content[F] = msgs2content.into();
        self.msgs2ranks[F] = msgs2ranks.into();
        self.msgs2ranks[R] = fcomm.sources().into();
        self.msgs2content[R] = offset_scan(&rdegrees).into();
        self.comm[F] = Some(fcomm);
        self.comm[R] = Some(rcomm);
        debug!(
            "dist on rank {}: {} items in {} outgoing messages, {} items in {} incoming",
            self.parent.rank(),
            items2ranks.len(),
            nmsgs,
            offsets_total(&self.msgs2content[R]),
            self.msgs2ranks[R].len()
        );
        self.debug_assert_invariants();
        Ok(())
    }

    /// Collective. `fitems2rroots[i]` is the root index, on the receiving
    /// rank, of forward item `i`; the receiver holds `nrroots` roots.
    ///
    /// The item-to-root map should be injective for exact round trips;
    /// repeated roots are accepted and fan out on the way back.
    ///
    /// Root indices are only checked where they arrive. A rank that gets
    /// [`MeshError::RootOutOfRange`] leaves its peers holding a plan that
    /// disagrees with its own, so callers must treat the error as fatal for
    /// the whole process group.
    pub fn set_dest_idxs(&mut self, fitems2rroots: &[Lo], nrroots: usize) -> Result<(), MeshError> {
        let rcontent2rroots = self.exch(fitems2rroots, 1)?;
        if let Some(&index) = rcontent2rroots.iter().find(|&&r| r as usize >= nrroots) {
            return Err(MeshError::RootOutOfRange {
                index: index as usize,
                nroots: nrroots,
            });
        }
        let (rroots2ritems, ritems2rcontent) = invert_by_sorting(&rcontent2rroots, nrroots);
        self.roots2items[R] = Some(rroots2ritems.into());
        self.items2content[R] = Some(ritems2rcontent.into());
        self.debug_assert_invariants();
        Ok(())
    }

    /// Records that forward root `r` owns items `froots2fitems[r]..froots2fitems[r+1]`.
    /// The offsets must start at zero, never decrease and end at
    /// [`Dist::nitems`].
    pub fn set_roots2items(&mut self, froots2fitems: impl Into<Arc<[Lo]>>) -> Result<(), MeshError> {
        let offsets: Arc<[Lo]> = froots2fitems.into();
        if offsets.first() != Some(&0) || offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(MeshError::InvariantViolation(
                "root offsets must start at 0 and never decrease".into(),
            ));
        }
        let nitems = self.nitems();
        if offsets_total(&offsets) != nitems {
            return Err(MeshError::SizeMismatch {
                context: "Dist::set_roots2items",
                expected: nitems,
                actual: offsets_total(&offsets),
            });
        }
        self.roots2items[F] = Some(offsets);
        Ok(())
    }

    /// The mirror plan: sends what this one receives, back where it came from.
    pub fn invert(&self) -> Dist {
        Dist {
            parent: self.parent.clone(),
            roots2items: [self.roots2items[R].clone(), self.roots2items[F].clone()],
            items2content: [self.items2content[R].clone(), self.items2content[F].clone()],
            msgs2content: [
                Arc::clone(&self.msgs2content[R]),
                Arc::clone(&self.msgs2content[F]),
            ],
            msgs2ranks: [
                Arc::clone(&self.msgs2ranks[R]),
                Arc::clone(&self.msgs2ranks[F]),
            ],
            comm: [self.comm[R].clone(), self.comm[F].clone()],
        }
    }

    /// Number of forward items.
    pub fn nitems(&self) -> usize {
        match &self.items2content[F] {
            Some(perm) => perm.len(),
            None => offsets_total(&self.msgs2content[F]),
        }
    }

    /// Number of forward roots; equals [`Dist::nitems`] without a roots map.
    pub fn nroots(&self) -> usize {
        match &self.roots2items[F] {
            Some(offsets) => offsets.len().saturating_sub(1),
            None => self.nitems(),
        }
    }

    /// Number of values (per unit width) an exchange delivers here.
    pub fn ncontent(&self) -> usize {
        offsets_total(&self.msgs2content[R])
    }

    pub fn msgs2ranks(&self) -> &[usize] {
        &self.msgs2ranks[F]
    }

    pub fn msgs2content(&self) -> &[Lo] {
        &self.msgs2content[F]
    }

    pub fn comm(&self) -> Option<&CommGraph> {
        self.comm[F].as_ref()
    }

    pub fn parent_comm(&self) -> &CommGraph {
        &self.parent
    }

    /// Collective. Sends a root-indexed array (`width` values per root)
    /// along the forward direction and returns the received values in the
    /// receiver's item order.
    pub fn exch<T: Pod + Send + Sync>(&self, data: &[T], width: usize) -> Result<Vec<T>, MeshError> {
        let fcomm = self.comm[F].as_ref().ok_or(MeshError::InvariantViolation(
            "exch called before set_dest_ranks".into(),
        ))?;
        let expected = self.nroots() * width;
        if data.len() != expected {
            return Err(MeshError::SizeMismatch {
                context: "Dist::exch input",
                expected,
                actual: data.len(),
            });
        }
        let mut buf: Vec<T> = match &self.roots2items[F] {
            Some(roots2items) => expand(data, roots2items, width),
            None => data.to_vec(),
        };
        if let Some(items2content) = &self.items2content[F] {
            buf = permute(&buf, items2content, width);
        }
        let width = width as Lo;
        let sendcounts = multiply_each_by(width, &get_degrees(&self.msgs2content[F]));
        let recvcounts = multiply_each_by(width, &get_degrees(&self.msgs2content[R]));
        let sdispls = offset_scan(&sendcounts);
        let rdispls = offset_scan(&recvcounts);
        let mut out = fcomm.alltoallv(&buf, &sendcounts, &sdispls, &recvcounts, &rdispls)?;
        if let Some(items2content) = &self.items2content[R] {
            out = unmap(items2content, &out, width as usize);
        }
        Ok(out)
    }

    /// Collective. Like [`Dist::exch`], then folds the values arriving at
    /// each receiving root with `op`. Needs [`Dist::set_dest_idxs`]; roots
    /// that receive nothing come back zeroed.
    pub fn exch_reduce<T>(&self, data: &[T], width: usize, op: ReduceOp) -> Result<Vec<T>, MeshError>
    where
        T: Pod + Send + Sync + PartialOrd + Add<Output = T>,
    {
        let roots2items = self.roots2items[R].as_ref().ok_or(MeshError::InvariantViolation(
            "exch_reduce called before set_dest_idxs".into(),
        ))?;
        let items = self.exch(data, width)?;
        Ok(fan_reduce(roots2items, &items, width, op))
    }
}

impl DebugInvariants for Dist {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "dist");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        for d in [F, R] {
            let offsets = &self.msgs2content[d];
            if offsets.len() != self.msgs2ranks[d].len() + 1 {
                return Err(MeshError::SizeMismatch {
                    context: "dist message offsets",
                    expected: self.msgs2ranks[d].len() + 1,
                    actual: offsets.len(),
                });
            }
            if offsets[0] != 0 || offsets.windows(2).any(|w| w[0] > w[1]) {
                return Err(MeshError::InvariantViolation(
                    "dist message offsets are not a prefix sum".into(),
                ));
            }
            if let Some(perm) = &self.items2content[d] {
                if perm.len() != offsets_total(offsets) {
                    return Err(MeshError::SizeMismatch {
                        context: "dist content permutation",
                        expected: offsets_total(offsets),
                        actual: perm.len(),
                    });
                }
                let mut seen = vec![false; perm.len()];
                for &c in perm.iter() {
                    match seen.get_mut(c as usize) {
                        Some(slot) if !*slot => *slot = true,
                        _ => {
                            return Err(MeshError::InvariantViolation(format!(
                                "dist content permutation repeats or exceeds slot {c}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
