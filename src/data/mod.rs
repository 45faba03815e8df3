//! Data module: array primitives and tags

pub mod array_ops;
pub mod tag;

pub use array_ops::ReduceOp;
pub use tag::{Tag, TagData, TagType};
