//! Building a mesh from element vertex lists alone.

use itertools::Itertools;
use log::debug;

use crate::data::array_ops::sort_by_keys;
use crate::mesh_error::MeshError;
use crate::topology::adj::Adj;
use crate::topology::mesh::Mesh;
use crate::topology::reflect::{form_uses, reflect_down};
use crate::topology::simplex::{EDGE, Lo, PLURAL_NAMES, VERT, simplex_degree};

/// Vertex lists of the distinct `low_dim` entities bounding the `high_dim`
/// entities `hv2v`. Entities come out sorted by vertex set; each keeps the
/// ordering of the first use that names it.
pub fn find_unique(hv2v: &[Lo], high_dim: usize, low_dim: usize) -> Vec<Lo> {
    let degree = simplex_degree(low_dim, VERT);
    let uv2v = form_uses(hv2v, high_dim, low_dim);
    let keys: Vec<[Lo; 3]> = uv2v
        .chunks_exact(degree)
        .map(|used| {
            let mut key = [Lo::MAX; 3];
            key[..degree].copy_from_slice(used);
            key.sort_unstable();
            key
        })
        .collect();
    let order = sort_by_keys(&keys);
    order
        .iter()
        .dedup_by(|&&a, &&b| keys[a as usize] == keys[b as usize])
        .flat_map(|&u| uv2v[u as usize * degree..(u as usize + 1) * degree].iter().copied())
        .collect()
}

/// Sets the dimension, vertices and every immediate downward adjacency of
/// an empty `mesh` from `ev2v`, the vertex lists of its `dim` elements.
pub fn build_from_elems2verts(mesh: &mut Mesh, dim: usize, ev2v: &[Lo], nverts: usize) -> Result<(), MeshError> {
    mesh.set_dim(dim)?;
    mesh.set_verts(nverts)?;
    let nverts_per_elem = simplex_degree(dim, VERT);
    if ev2v.len() % nverts_per_elem != 0 {
        return Err(MeshError::SizeMismatch {
            context: "build_from_elems2verts",
            expected: ev2v.len().next_multiple_of(nverts_per_elem),
            actual: ev2v.len(),
        });
    }
    let mut lv2v: Vec<Lo> = Vec::new();
    for d in EDGE..=dim {
        let dv2v = if d == dim {
            ev2v.to_vec()
        } else {
            find_unique(ev2v, dim, d)
        };
        let down = if d == EDGE {
            Adj::down(dv2v.as_slice())
        } else {
            let v2l = mesh.ask_up(VERT, d - 1)?;
            reflect_down(&dv2v, &lv2v, &v2l, d, d - 1)?
        };
        mesh.set_ents(d, down)?;
        debug!("built {} {}", mesh.nents(d), PLURAL_NAMES[d]);
        lv2v = dv2v;
    }
    Ok(())
}
