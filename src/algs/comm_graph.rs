//! Communication graphs: a communicator scoped to explicit source and
//! destination rank lists, with the `alltoall`/`alltoallv` collectives.
//!
//! Messages only travel along graph edges: a rank sends one message to each
//! of its destinations and receives one from each of its sources. Every rank
//! of the parent group takes part in each collective call, even with empty
//! neighbour lists.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use bytemuck::Pod;

use crate::algs::communicator::{Communicator, NoComm};
use crate::algs::wire::{cast_slice, decode_exact};
use crate::mesh_error::MeshError;
use crate::topology::simplex::Lo;

/// A communicator restricted to a directed neighbourhood.
#[derive(Clone)]
pub struct CommGraph {
    backend: Arc<dyn Communicator>,
    sources: Arc<[usize]>,
    destinations: Arc<[usize]>,
}

impl Debug for CommGraph {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommGraph")
            .field("rank", &self.rank())
            .field("size", &self.size())
            .field("sources", &self.sources)
            .field("destinations", &self.destinations)
            .finish()
    }
}

impl CommGraph {
    /// The complete graph over all ranks of `backend`.
    pub fn world(backend: Arc<dyn Communicator>) -> Self {
        let all: Arc<[usize]> = (0..backend.size()).collect();
        Self {
            backend,
            sources: Arc::clone(&all),
            destinations: all,
        }
    }

    /// Single-rank world.
    pub fn serial() -> Self {
        Self::world(Arc::new(NoComm))
    }

    pub fn rank(&self) -> usize {
        self.backend.rank()
    }

    pub fn size(&self) -> usize {
        self.backend.size()
    }

    pub fn backend(&self) -> &Arc<dyn Communicator> {
        &self.backend
    }

    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    pub fn destinations(&self) -> &[usize] {
        &self.destinations
    }

    fn check_ranks(&self, ranks: &[usize]) -> Result<(), MeshError> {
        let size = self.size();
        match ranks.iter().find(|&&r| r >= size) {
            Some(&rank) => Err(MeshError::InvalidRank { rank, size }),
            None => Ok(()),
        }
    }

    /// Collective: a graph whose destinations are `dsts`. Sources are
    /// discovered by asking every rank, and come out in ascending order.
    pub fn graph(&self, dsts: &[usize]) -> Result<CommGraph, MeshError> {
        self.check_ranks(dsts)?;
        let size = self.size();
        let mut flags = vec![0u8; size];
        for &d in dsts {
            flags[d] = 1;
        }
        let sends: Vec<(usize, &[u8])> = flags
            .iter()
            .enumerate()
            .map(|(p, flag)| (p, std::slice::from_ref(flag)))
            .collect();
        let all: Vec<usize> = (0..size).collect();
        let incoming = self.backend.exchange(&sends, &all)?;
        let mut sources = Vec::new();
        for (p, msg) in incoming.iter().enumerate() {
            let flag: Vec<u8> = decode_exact(msg, 1, p)?;
            if flag[0] != 0 {
                sources.push(p);
            }
        }
        Ok(CommGraph {
            backend: Arc::clone(&self.backend),
            sources: sources.into(),
            destinations: dsts.into(),
        })
    }

    /// A graph with explicit neighbour lists (no communication). Passing the
    /// destinations and sources of another graph in swapped order yields its
    /// transpose.
    pub fn graph_adjacent(&self, srcs: &[usize], dsts: &[usize]) -> Result<CommGraph, MeshError> {
        self.check_ranks(srcs)?;
        self.check_ranks(dsts)?;
        Ok(CommGraph {
            backend: Arc::clone(&self.backend),
            sources: srcs.into(),
            destinations: dsts.into(),
        })
    }

    /// Sends `data[i]` to `destinations()[i]`; returns one value per source.
    pub fn alltoall<T: Pod>(&self, data: &[T]) -> Result<Vec<T>, MeshError> {
        if data.len() != self.destinations.len() {
            return Err(MeshError::SizeMismatch {
                context: "alltoall",
                expected: self.destinations.len(),
                actual: data.len(),
            });
        }
        let sends: Vec<(usize, &[u8])> = self
            .destinations
            .iter()
            .zip(data)
            .map(|(&d, v)| (d, cast_slice(std::slice::from_ref(v))))
            .collect();
        let incoming = self.backend.exchange(&sends, &self.sources)?;
        let mut out = Vec::with_capacity(incoming.len());
        for (&src, msg) in self.sources.iter().zip(&incoming) {
            out.extend(decode_exact::<T>(msg, 1, src)?);
        }
        Ok(out)
    }

    /// Variable-size all-to-all along the graph: `sendcounts[i]` values
    /// starting at `sdispls[i]` go to destination `i`; the message from
    /// source `j` must hold `recvcounts[j]` values and lands at `rdispls[j]`.
    pub fn alltoallv<T: Pod>(
        &self,
        sendbuf: &[T],
        sendcounts: &[Lo],
        sdispls: &[Lo],
        recvcounts: &[Lo],
        rdispls: &[Lo],
    ) -> Result<Vec<T>, MeshError> {
        let ndst = self.destinations.len();
        let nsrc = self.sources.len();
        for (context, actual, expected) in [
            ("alltoallv sendcounts", sendcounts.len(), ndst),
            ("alltoallv recvcounts", recvcounts.len(), nsrc),
        ] {
            if actual != expected {
                return Err(MeshError::SizeMismatch { context, expected, actual });
            }
        }
        for (context, actual, expected) in [
            ("alltoallv sdispls", sdispls.len(), ndst),
            ("alltoallv rdispls", rdispls.len(), nsrc),
        ] {
            if actual < expected {
                return Err(MeshError::SizeMismatch { context, expected, actual });
            }
        }
        let mut sends = Vec::with_capacity(ndst);
        for (i, &d) in self.destinations.iter().enumerate() {
            let begin = sdispls[i] as usize;
            let end = begin + sendcounts[i] as usize;
            if end > sendbuf.len() {
                return Err(MeshError::SizeMismatch {
                    context: "alltoallv send buffer",
                    expected: end,
                    actual: sendbuf.len(),
                });
            }
            sends.push((d, cast_slice(&sendbuf[begin..end])));
        }
        let incoming = self.backend.exchange(&sends, &self.sources)?;
        let total = (0..nsrc)
            .map(|j| (rdispls[j] + recvcounts[j]) as usize)
            .max()
            .unwrap_or(0);
        let mut out = vec![T::zeroed(); total];
        for (j, (&src, msg)) in self.sources.iter().zip(&incoming).enumerate() {
            let count = recvcounts[j] as usize;
            let values: Vec<T> = decode_exact(msg, count, src)?;
            let begin = rdispls[j] as usize;
            out[begin..begin + count].copy_from_slice(&values);
        }
        Ok(out)
    }

    /// Collective over the whole parent group, ignoring the graph edges:
    /// the sum of `value` across all ranks.
    pub fn allreduce_sum(&self, value: u64) -> Result<u64, MeshError> {
        let all: Vec<usize> = (0..self.size()).collect();
        let bytes = cast_slice(std::slice::from_ref(&value));
        let sends: Vec<(usize, &[u8])> = all.iter().map(|&p| (p, bytes)).collect();
        let incoming = self.backend.exchange(&sends, &all)?;
        let mut total = 0u64;
        for (p, msg) in incoming.iter().enumerate() {
            let v: Vec<u64> = decode_exact(msg, 1, p)?;
            total += v[0];
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::LocalComm;

    #[test]
    fn serial_self_graph() {
        let world = CommGraph::serial();
        let g = world.graph(&[0]).unwrap();
        assert_eq!(g.sources(), &[0]);
        assert_eq!(g.alltoall(&[5u32]).unwrap(), vec![5]);
        let out = g.alltoallv(&[1i64, 2, 3], &[3], &[0, 3], &[3], &[0, 3]).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(world.allreduce_sum(7).unwrap(), 7);
        assert!(matches!(
            world.graph(&[1]),
            Err(MeshError::InvalidRank { rank: 1, size: 1 })
        ));
    }

    #[test]
    fn ring_graph_discovers_sources() {
        let world = LocalComm::world(3);
        std::thread::scope(|s| {
            for comm in world {
                s.spawn(move || {
                    let rank = comm.rank();
                    let world = CommGraph::world(Arc::new(comm));
                    let next = (rank + 1) % 3;
                    let prev = (rank + 2) % 3;
                    let g = world.graph(&[next]).unwrap();
                    assert_eq!(g.sources(), &[prev]);
                    let got = g.alltoall(&[rank as u32 * 10]).unwrap();
                    assert_eq!(got, vec![prev as u32 * 10]);
                    let t = world.graph_adjacent(g.destinations(), g.sources()).unwrap();
                    assert_eq!(t.destinations(), &[prev]);
                    let back = t.alltoall(&[rank as u32]).unwrap();
                    assert_eq!(back, vec![next as u32]);
                    assert_eq!(g.allreduce_sum(rank as u64 + 1).unwrap(), 6);
                });
            }
        });
    }
}
