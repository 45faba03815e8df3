//! Thin façade over intra-process (threads) or inter-process (MPI) message
//! passing.
//!
//! A [`Communicator`] knows its rank, the group size, and one collective
//! primitive: a sparse exchange where every rank posts byte messages to some
//! peers and receives one message from each peer it names. All ranks of the
//! group must call [`Communicator::exchange`] the same number of times and in
//! the same order; successive calls never mix their messages.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dashmap::DashMap;

use crate::mesh_error::MeshError;

/// Collective message-passing backend.
pub trait Communicator: Send + Sync + 'static {
    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    /// Sends `buf` to each `(peer, buf)` in `sends`, then receives exactly
    /// one message from each rank in `recv_from`, returned in that order.
    /// Blocks until every receive has arrived.
    fn exchange(&self, sends: &[(usize, &[u8])], recv_from: &[usize]) -> Result<Vec<Bytes>, MeshError>;
}

fn check_peer(peer: usize, size: usize) -> Result<(), MeshError> {
    if peer < size {
        Ok(())
    } else {
        Err(MeshError::InvalidRank { rank: peer, size })
    }
}

/// Single-rank world: the only legal peer is rank 0 itself.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(&self, sends: &[(usize, &[u8])], recv_from: &[usize]) -> Result<Vec<Bytes>, MeshError> {
        for &(peer, _) in sends {
            check_peer(peer, 1)?;
        }
        let mut pending: Vec<Bytes> = sends
            .iter()
            .map(|&(_, buf)| Bytes::copy_from_slice(buf))
            .collect();
        pending.reverse();
        recv_from
            .iter()
            .map(|&src| {
                check_peer(src, 1)?;
                pending.pop().ok_or_else(|| MeshError::CommError {
                    neighbor: src,
                    message: "no message was sent to self".into(),
                })
            })
            .collect()
    }
}

// --- LocalComm: intra-process / one thread per rank ---
type Key = (usize, usize, u64); // (src, dst, tag)

/// One rank of an in-process world. Ranks share a mailbox; each rank keeps
/// its own collective counter, which doubles as the message tag.
#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    size: usize,
    mailbox: Arc<DashMap<Key, Bytes>>,
    next_tag: AtomicU64,
}

impl LocalComm {
    /// Creates every rank of a world of `size` ranks. Hand one to each thread.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let mailbox = Arc::new(DashMap::new());
        (0..size)
            .map(|rank| LocalComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
                next_tag: AtomicU64::new(0),
            })
            .collect()
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn exchange(&self, sends: &[(usize, &[u8])], recv_from: &[usize]) -> Result<Vec<Bytes>, MeshError> {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        for &(peer, buf) in sends {
            check_peer(peer, self.size)?;
            let key = (self.rank, peer, tag);
            if self.mailbox.insert(key, Bytes::copy_from_slice(buf)).is_some() {
                return Err(MeshError::CommError {
                    neighbor: peer,
                    message: format!("two messages posted to rank {peer} in one exchange"),
                });
            }
        }
        let mut out = Vec::with_capacity(recv_from.len());
        for &src in recv_from {
            check_peer(src, self.size)?;
            let key = (src, self.rank, tag);
            let bytes = loop {
                if let Some((_, v)) = self.mailbox.remove(&key) {
                    break v;
                }
                std::thread::yield_now();
            };
            out.push(bytes);
        }
        Ok(out)
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;
    use std::sync::atomic::AtomicI32;

    /// Tags wrap below the smallest upper bound MPI guarantees.
    const TAG_MODULUS: i32 = 1 << 15;

    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
        next_tag: AtomicI32,
    }

    // SAFETY: the handle is only used from threads that issue collectives
    // in a single program order, as the MPI threading level requires.
    unsafe impl Send for MpiComm {}
    unsafe impl Sync for MpiComm {}

    impl MpiComm {
        /// Wraps a communicator (usually `universe.world()`); the caller
        /// keeps the `Universe` alive for as long as this handle is used.
        pub fn new(world: SimpleCommunicator) -> Self {
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Self {
                world,
                rank,
                size,
                next_tag: AtomicI32::new(0),
            }
        }
    }

    impl Communicator for MpiComm {
        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn exchange(&self, sends: &[(usize, &[u8])], recv_from: &[usize]) -> Result<Vec<Bytes>, MeshError> {
            for &(peer, _) in sends {
                check_peer(peer, self.size)?;
            }
            for &src in recv_from {
                check_peer(src, self.size)?;
            }
            let tag = self.next_tag.fetch_add(1, Ordering::Relaxed) % TAG_MODULUS;
            let received = mpi::request::scope(|scope| {
                let requests: Vec<_> = sends
                    .iter()
                    .map(|&(peer, buf)| {
                        self.world
                            .process_at_rank(peer as i32)
                            .immediate_send_with_tag(scope, buf, tag)
                    })
                    .collect();
                let received: Vec<Bytes> = recv_from
                    .iter()
                    .map(|&src| {
                        let (msg, _status) = self
                            .world
                            .process_at_rank(src as i32)
                            .matched_probe_with_tag(tag);
                        let (data, _status) = msg.matched_receive_vec::<u8>();
                        Bytes::from(data)
                    })
                    .collect();
                for request in requests {
                    request.wait();
                }
                received
            });
            Ok(received)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
