//! Communication and redistribution.

pub mod comm_graph;
pub mod communicator;
pub mod dist;
pub mod wire;

pub use comm_graph::CommGraph;
pub use dist::{Dist, Remotes};
