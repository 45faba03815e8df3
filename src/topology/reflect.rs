//! Downward adjacency by matching: given the vertex lists of high and low
//! entities, find which stored low entity each boundary use of a high
//! entity is, and how the two vertex orderings relate.

use rayon::prelude::*;

use crate::mesh_error::MeshError;
use crate::topology::adj::{Adj, invert_adj};
use crate::topology::align::{AlignCode, rotation_to_first};
use crate::topology::simplex::{
    EDGE, Go, Lo, PLURAL_NAMES, SINGULAR_NAMES, TET, TRI, VERT, down_template, simplex_degree,
};

/// Vertex tuples of every `low_dim` boundary use of every `high_dim`
/// entity, uses of one entity in `which_down` order.
pub fn form_uses(hv2v: &[Lo], high_dim: usize, low_dim: usize) -> Vec<Lo> {
    let nverts_per_high = simplex_degree(high_dim, VERT);
    let nlows_per_high = simplex_degree(high_dim, low_dim);
    let nverts_per_low = simplex_degree(low_dim, VERT);
    let mut uv2v = vec![0 as Lo; hv2v.len() / nverts_per_high * nlows_per_high * nverts_per_low];
    uv2v.par_chunks_mut(nlows_per_high * nverts_per_low)
        .zip(hv2v.par_chunks(nverts_per_high))
        .for_each(|(uses, verts)| {
            for (which, used) in uses.chunks_mut(nverts_per_low).enumerate() {
                for (slot, &local) in used.iter_mut().zip(down_template(high_dim, low_dim, which)) {
                    *slot = verts[local as usize];
                }
            }
        });
    uv2v
}

/// Match code for use `a` against candidate `b`, where `which_down` is the
/// position of `a[0]` in `b`.
#[inline]
fn match_code(degree: usize, a: &[Lo], b: &[Lo], which_down: usize) -> Option<AlignCode> {
    match degree {
        2 => (a[1] == b[1 - which_down]).then(|| AlignCode::new(0, which_down, false)),
        3 => {
            let next = b[(which_down + 1) % 3];
            let prev = b[(which_down + 2) % 3];
            let rotation = rotation_to_first(3, which_down);
            if a[1] == next && a[2] == prev {
                Some(AlignCode::new(0, rotation, false))
            } else if a[1] == prev && a[2] == next {
                Some(AlignCode::new(0, rotation, true))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// For every use in `uv2v` (tuples of `degree` vertices), the low entity
/// it coincides with and the code relating the two orderings. Only low
/// entities incident to the use's first vertex are scanned; the first
/// match wins.
pub fn find_matches(
    degree: usize,
    uv2v: &[Lo],
    lv2v: &[Lo],
    v2l: &Adj,
) -> Result<(Vec<Lo>, Vec<AlignCode>), MeshError> {
    if !(2..=3).contains(&degree) {
        return Err(MeshError::InvariantViolation(format!(
            "only uses of 2 or 3 vertices can be matched, not {degree}"
        )));
    }
    let low_dim = degree - 1;
    let v2vl = v2l.offsets_or(VERT, low_dim)?;
    let vl_codes = v2l.codes_or(VERT, low_dim)?;
    let vl2l = &v2l.ab2b;
    let nuses = uv2v.len() / degree;
    let mut u2l = vec![0 as Lo; nuses];
    let mut codes = vec![AlignCode::IDENTITY; nuses];
    u2l.par_iter_mut()
        .zip(codes.par_iter_mut())
        .enumerate()
        .try_for_each(|(u, (l_out, code_out))| {
            let a = &uv2v[u * degree..(u + 1) * degree];
            let v0 = a[0] as usize;
            if v0 + 1 >= v2vl.len() {
                return Err(MeshError::RootOutOfRange {
                    index: v0,
                    nroots: v2vl.len().saturating_sub(1),
                });
            }
            for vl in v2vl[v0] as usize..v2vl[v0 + 1] as usize {
                let l = vl2l[vl] as usize;
                let b = &lv2v[l * degree..(l + 1) * degree];
                if let Some(code) = match_code(degree, a, b, vl_codes[vl].which_down()) {
                    *l_out = l as Lo;
                    *code_out = code;
                    return Ok(());
                }
            }
            Err(MeshError::NoMatch {
                high: "use",
                low: SINGULAR_NAMES[low_dim],
                high_index: u,
                which_down: 0,
            })
        })?;
    Ok((u2l, codes))
}

fn check_reflectable(high_dim: usize, low_dim: usize) -> Result<(), MeshError> {
    if !(EDGE..=TRI).contains(&low_dim) || high_dim <= low_dim || high_dim > TET {
        return Err(MeshError::UnsupportedDerivation {
            from: PLURAL_NAMES[high_dim.min(TET)],
            to: PLURAL_NAMES[low_dim.min(TET)],
        });
    }
    Ok(())
}

/// Downward adjacency `high_dim -> low_dim` (`low_dim` an edge or a
/// triangle) with codes, given the upward vertex adjacency of the low
/// entities.
pub fn reflect_down(
    hv2v: &[Lo],
    lv2v: &[Lo],
    v2l: &Adj,
    high_dim: usize,
    low_dim: usize,
) -> Result<Adj, MeshError> {
    check_reflectable(high_dim, low_dim)?;
    let degree = simplex_degree(low_dim, VERT);
    let nlows_per_high = simplex_degree(high_dim, low_dim);
    let uv2v = form_uses(hv2v, high_dim, low_dim);
    let (hl2l, codes) = find_matches(degree, &uv2v, lv2v, v2l).map_err(|e| match e {
        MeshError::NoMatch { low, high_index, .. } => MeshError::NoMatch {
            high: SINGULAR_NAMES[high_dim],
            low,
            high_index: high_index / nlows_per_high,
            which_down: high_index % nlows_per_high,
        },
        other => other,
    })?;
    Ok(Adj::down_with_codes(hl2l, codes))
}

/// Like [`reflect_down`], building the vertex-to-low upward adjacency from
/// `lv2v` first.
pub fn reflect_down_with_nverts(
    hv2v: &[Lo],
    lv2v: &[Lo],
    nverts: usize,
    high_dim: usize,
    low_dim: usize,
) -> Result<Adj, MeshError> {
    check_reflectable(high_dim, low_dim)?;
    let nverts_per_low = simplex_degree(low_dim, VERT);
    let nlows = lv2v.len() / nverts_per_low;
    let globals: Vec<Go> = (0..nlows as Go).collect();
    let v2l = invert_adj(&Adj::down(lv2v), nverts_per_low, nverts, &globals)?;
    reflect_down(hv2v, lv2v, &v2l, high_dim, low_dim)
}
