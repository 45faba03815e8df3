//! Top-level module for simplicial mesh topology.
//!
//! This module provides:
//! - Simplex tables and alignment codes
//! - Adjacency records and the kernels deriving one from others
//! - The [`Mesh`](mesh::Mesh) aggregate and a builder from element vertex lists
//!
//! Most users will build a mesh with [`build::build_from_elems2verts`] and
//! query it through [`mesh::Mesh::ask_adj`].

pub mod adj;
pub mod align;
pub mod build;
pub mod derive;
pub mod mesh;
pub mod reflect;
pub mod simplex;

pub use adj::Adj;
pub use align::AlignCode;
pub use mesh::Mesh;
