//! Byte-level encoding of typed arrays for the communicator.
//!
//! Payloads are native-endian `Pod` slices: every rank of a group is
//! assumed to share one architecture.

use bytemuck::Pod;

use crate::mesh_error::MeshError;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Copies a received message into an aligned, typed buffer holding exactly
/// `count` values.
pub fn decode_exact<T: Pod>(bytes: &[u8], count: usize, neighbor: usize) -> Result<Vec<T>, MeshError> {
    expect_exact_len(bytes.len(), count * std::mem::size_of::<T>())
        .map_err(|message| MeshError::CommError { neighbor, message })?;
    let mut out = vec![T::zeroed(); count];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}
