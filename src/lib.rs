#![cfg_attr(docsrs, feature(doc_cfg))]
//! # simplex-mesh
//!
//! simplex-mesh holds the topology of one rank's piece of a partitioned
//! simplicial mesh (vertices, edges, triangles, tetrahedra) and moves
//! entity data between ranks.
//!
//! ## Features
//! - Every adjacency between entity dimensions, derived on demand from the
//!   immediate downward ones and cached per mesh
//! - Alignment codes recording how a boundary piece's stored vertex order
//!   relates to the order its neighbour uses
//! - [`Dist`](algs::dist::Dist), a bidirectional redistribution plan built
//!   from local sorts, prefix sums and sparse all-to-all exchange
//! - Pluggable communication backends: a serial world, an in-process world
//!   of threads, and MPI behind the `mpi-support` feature
//!
//! ## Determinism
//!
//! Parallel loops only fill disjoint output slots and every aggregation goes
//! through a stable sort or a prefix sum, so results do not depend on the
//! size of the Rayon pool.
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! simplex-mesh = "0.1"
//! # Optional features:
//! # features = ["mpi-support", "check-invariants"]
//! ```
//!
//! ```
//! use simplex_mesh::prelude::*;
//!
//! let mut mesh = Mesh::serial();
//! build_from_elems2verts(&mut mesh, TRI, &[0, 1, 2, 2, 1, 3], 4).unwrap();
//! assert_eq!(mesh.nedges(), 5);
//! let v2v = mesh.ask_star(VERT).unwrap();
//! assert_eq!(v2v.neighbors(0), &[1, 2]);
//! ```

pub mod algs;
pub mod data;
pub mod debug_invariants;
pub mod mesh_error;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::comm_graph::CommGraph;
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::communicator::{Communicator, LocalComm, NoComm};
    pub use crate::algs::dist::{Dist, Remotes};
    pub use crate::data::array_ops::ReduceOp;
    pub use crate::data::tag::{Tag, TagData, TagType};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshError;
    pub use crate::topology::adj::Adj;
    pub use crate::topology::align::AlignCode;
    pub use crate::topology::build::{build_from_elems2verts, find_unique};
    pub use crate::topology::mesh::{GLOBAL_TAG, Mesh};
    pub use crate::topology::reflect::{reflect_down, reflect_down_with_nverts};
    pub use crate::topology::simplex::{EDGE, Go, Lo, TET, TRI, VERT};
}
