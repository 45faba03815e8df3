//! MeshError: Unified error type for simplex-mesh public APIs
//!
//! Contract violations (bad dimensions, size mismatches, unsupported
//! derivations) and data-consistency violations (a boundary piece with no
//! matching entity) are reported through this type instead of aborting, so
//! callers decide whether to propagate or terminate the process group.

use thiserror::Error;

/// Unified error type for mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A dimension argument outside `0..=mesh.dim()`.
    #[error("dimension {dim} is out of range for a mesh of dimension {mesh_dim}")]
    InvalidDimension { dim: usize, mesh_dim: usize },
    /// The mesh dimension may only be set once, to 2 or 3.
    #[error("mesh dimension {0} is not supported or was already set")]
    BadMeshDimension(usize),
    /// The mesh dimension has not been set yet.
    #[error("mesh dimension has not been set")]
    DimensionNotSet,
    /// Entities of this dimension were never supplied.
    #[error("no {0} have been set on this mesh")]
    MissingEntities(&'static str),
    /// Entities of this dimension were already supplied.
    #[error("{0} have already been set on this mesh")]
    EntitiesAlreadySet(&'static str),
    /// An array length disagrees with the size implied by the mesh or plan.
    #[error("size mismatch in {context}: expected {expected}, got {actual}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// No derivation strategy exists for this dimension pair.
    #[error("can't derive adjacency from {from} to {to}")]
    UnsupportedDerivation {
        from: &'static str,
        to: &'static str,
    },
    /// A downward adjacency needed alignment codes but carried none.
    #[error("adjacency from {from} to {to} carries no alignment codes")]
    MissingCodes {
        from: &'static str,
        to: &'static str,
    },
    /// A used boundary tuple matched no canonical low entity.
    #[error("use {which_down} of {high} {high_index} matches none of the {low}")]
    NoMatch {
        high: &'static str,
        low: &'static str,
        high_index: usize,
        which_down: usize,
    },
    /// A rank outside the communicator group.
    #[error("rank {rank} is not a member of a communicator of size {size}")]
    InvalidRank { rank: usize, size: usize },
    /// A root index outside `0..nroots`.
    #[error("root index {index} is out of range for {nroots} roots")]
    RootOutOfRange { index: usize, nroots: usize },
    /// Tag with this name already exists on the dimension.
    #[error("tag `{name}` already exists on dimension {dim}")]
    TagExists { dim: usize, name: String },
    /// Tag with this name does not exist on the dimension.
    #[error("tag `{name}` does not exist on dimension {dim}")]
    TagMissing { dim: usize, name: String },
    /// Tag exists but stores a different element type.
    #[error("tag `{name}` on dimension {dim} stores {stored}, not {requested}")]
    TagTypeMismatch {
        dim: usize,
        name: String,
        stored: &'static str,
        requested: &'static str,
    },
    /// Tag exists but no data has been set yet.
    #[error("tag `{name}` on dimension {dim} has no data")]
    TagEmpty { dim: usize, name: String },
    /// A collective exchange failed or delivered a malformed message.
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
    /// A structural invariant of an adjacency or plan does not hold.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}
