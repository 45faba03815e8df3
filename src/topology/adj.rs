//! Adjacency records and the pure kernels that derive one adjacency from
//! others: upward inversion, two-hop downward transit, and same-dimension
//! stars.
//!
//! An [`Adj`] stored in a mesh always satisfies, for entity counts `n`:
//!
//! * downward (`from > to`): no offsets,
//!   `ab2b.len() == n[from] * SIMPLEX_DEGREES[from][to]`,
//! * upward (`from < to`): offsets of length `n[from] + 1` and
//!   `ab2b.len() == n[to] * SIMPLEX_DEGREES[to][from]`,
//! * star (`from == to`): offsets of length `n[from] + 1`.

use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::array_ops::{get_degrees, multiply_each_by, offset_scan, sort_by_keys};
use crate::mesh_error::MeshError;
use crate::topology::align::{AlignCode, align_index, compound};
use crate::topology::simplex::{
    EDGE, Go, Lo, PLURAL_NAMES, SINGULAR_NAMES, TET_OPPOSITE_EDGES, VERT, down_template, find_down, simplex_degree,
};

/// Fixed-degree (no offsets) or graph (offsets) adjacency, with optional
/// per-entry alignment codes parallel to `ab2b`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adj {
    pub a2ab: Option<Arc<[Lo]>>,
    pub ab2b: Arc<[Lo]>,
    pub codes: Option<Arc<[AlignCode]>>,
}

impl Adj {
    /// Fixed-degree adjacency without codes.
    pub fn down(ab2b: impl Into<Arc<[Lo]>>) -> Self {
        Self {
            a2ab: None,
            ab2b: ab2b.into(),
            codes: None,
        }
    }

    /// Fixed-degree adjacency with one code per entry.
    pub fn down_with_codes(ab2b: impl Into<Arc<[Lo]>>, codes: impl Into<Arc<[AlignCode]>>) -> Self {
        Self {
            a2ab: None,
            ab2b: ab2b.into(),
            codes: Some(codes.into()),
        }
    }

    /// Offset graph without codes.
    pub fn graph(a2ab: impl Into<Arc<[Lo]>>, ab2b: impl Into<Arc<[Lo]>>) -> Self {
        Self {
            a2ab: Some(a2ab.into()),
            ab2b: ab2b.into(),
            codes: None,
        }
    }

    /// Offset graph with one code per entry.
    pub fn graph_with_codes(
        a2ab: impl Into<Arc<[Lo]>>,
        ab2b: impl Into<Arc<[Lo]>>,
        codes: impl Into<Arc<[AlignCode]>>,
    ) -> Self {
        Self {
            a2ab: Some(a2ab.into()),
            ab2b: ab2b.into(),
            codes: Some(codes.into()),
        }
    }

    /// Range of `ab2b` belonging to node `a`. Fixed-degree records need the
    /// degree, graph records ignore it.
    pub fn range(&self, a: usize, degree: usize) -> std::ops::Range<usize> {
        match &self.a2ab {
            Some(offsets) => offsets[a] as usize..offsets[a + 1] as usize,
            None => a * degree..(a + 1) * degree,
        }
    }

    /// Neighbours of node `a` in a graph record.
    pub fn neighbors(&self, a: usize) -> &[Lo] {
        &self.ab2b[self.range(a, 0)]
    }

    /// Number of `from` nodes of a graph record.
    pub fn nnodes(&self) -> Option<usize> {
        self.a2ab.as_ref().map(|o| o.len().saturating_sub(1))
    }

    pub(crate) fn offsets_or(&self, from: usize, to: usize) -> Result<&Arc<[Lo]>, MeshError> {
        self.a2ab
            .as_ref()
            .ok_or_else(|| MeshError::InvariantViolation(format!(
                "adjacency from {} to {} has no offsets",
                PLURAL_NAMES[from], PLURAL_NAMES[to]
            )))
    }

    pub(crate) fn codes_or(&self, from: usize, to: usize) -> Result<&Arc<[AlignCode]>, MeshError> {
        self.codes.as_ref().ok_or(MeshError::MissingCodes {
            from: PLURAL_NAMES[from],
            to: PLURAL_NAMES[to],
        })
    }
}

fn check_multiple(context: &'static str, len: usize, degree: usize) -> Result<usize, MeshError> {
    if degree == 0 || len % degree != 0 {
        return Err(MeshError::SizeMismatch {
            context,
            expected: len.next_multiple_of(degree.max(1)),
            actual: len,
        });
    }
    Ok(len / degree)
}

/// Upward adjacency from a downward one. Each low entity lists the high
/// entities using it, ordered by high global id and then by discovery
/// order; codes carry the use position as `which_down` plus the down
/// code's rotation and flip.
pub fn invert_adj(
    down: &Adj,
    nlows_per_high: usize,
    nlows: usize,
    high_globals: &[Go],
) -> Result<Adj, MeshError> {
    let hl2l = &down.ab2b;
    let nhighs = check_multiple("upward inversion", hl2l.len(), nlows_per_high)?;
    if high_globals.len() != nhighs {
        return Err(MeshError::SizeMismatch {
            context: "upward inversion globals",
            expected: nhighs,
            actual: high_globals.len(),
        });
    }
    let mut counts = vec![0 as Lo; nlows];
    for &l in hl2l.iter() {
        let slot = counts.get_mut(l as usize).ok_or(MeshError::RootOutOfRange {
            index: l as usize,
            nroots: nlows,
        })?;
        *slot += 1;
    }
    let keys: Vec<(Lo, Go)> = hl2l
        .iter()
        .enumerate()
        .map(|(hl, &l)| (l, high_globals[hl / nlows_per_high]))
        .collect();
    let lh2hl = sort_by_keys(&keys);
    let deg = nlows_per_high as Lo;
    let lh2h: Vec<Lo> = lh2hl.par_iter().map(|&hl| hl / deg).collect();
    let codes: Vec<AlignCode> = lh2hl
        .par_iter()
        .map(|&hl| {
            let which_down = (hl % deg) as usize;
            match &down.codes {
                Some(codes) => codes[hl as usize].with_which_down(which_down),
                None => AlignCode::new(which_down, 0, false),
            }
        })
        .collect();
    Ok(Adj::graph_with_codes(offset_scan(&counts), lh2h, codes))
}

/// Downward adjacency `high -> low` through the intermediate dimension
/// `low + 1`. Each mid piece's low pieces are placed through the mid piece's
/// alignment code; for `low == EDGE` the resulting codes are the compound of
/// the mid-to-low and high-to-mid alignments.
pub fn transit(h2m: &Adj, m2l: &Adj, high_dim: usize, low_dim: usize) -> Result<Adj, MeshError> {
    let mid_dim = low_dim + 1;
    if high_dim <= mid_dim || low_dim > EDGE {
        return Err(MeshError::UnsupportedDerivation {
            from: PLURAL_NAMES[high_dim],
            to: PLURAL_NAMES[low_dim],
        });
    }
    let nmids_per_high = simplex_degree(high_dim, mid_dim);
    let nlows_per_mid = simplex_degree(mid_dim, low_dim);
    let nlows_per_high = simplex_degree(high_dim, low_dim);
    let nverts_per_mid = simplex_degree(mid_dim, VERT);
    let nhighs = check_multiple("transit high-to-mid", h2m.ab2b.len(), nmids_per_high)?;
    check_multiple("transit mid-to-low", m2l.ab2b.len(), nlows_per_mid)?;
    let hm2m = &h2m.ab2b;
    let hm_codes = h2m.codes_or(high_dim, mid_dim)?;
    let ml2l = &m2l.ab2b;
    let mut hl2l = vec![0 as Lo; nhighs * nlows_per_high];

    if low_dim == VERT {
        hl2l.par_chunks_mut(nlows_per_high)
            .enumerate()
            .for_each(|(h, out)| {
                for hm in 0..nmids_per_high {
                    let m = hm2m[h * nmids_per_high + hm] as usize;
                    let code = hm_codes[h * nmids_per_high + hm];
                    let tmpl = down_template(high_dim, mid_dim, hm);
                    for j in 0..nverts_per_mid {
                        let hv = tmpl[align_index(nverts_per_mid, j, code)] as usize;
                        out[hv] = ml2l[m * nlows_per_mid + j];
                    }
                }
            });
        return Ok(Adj::down(hl2l));
    }

    let ml_codes = m2l.codes_or(mid_dim, low_dim)?;
    let mut codes = vec![AlignCode::IDENTITY; hl2l.len()];
    hl2l.par_chunks_mut(nlows_per_high)
        .zip(codes.par_chunks_mut(nlows_per_high))
        .enumerate()
        .try_for_each(|(h, (out, out_codes))| {
            for hm in 0..nmids_per_high {
                let m = hm2m[h * nmids_per_high + hm] as usize;
                let hm_code = hm_codes[h * nmids_per_high + hm];
                let mid_tmpl = down_template(high_dim, mid_dim, hm);
                for ml in 0..nlows_per_mid {
                    let low_tmpl = down_template(mid_dim, low_dim, ml);
                    let a = mid_tmpl[align_index(nverts_per_mid, low_tmpl[0] as usize, hm_code)];
                    let b = mid_tmpl[align_index(nverts_per_mid, low_tmpl[1] as usize, hm_code)];
                    let hl = find_down(high_dim, low_dim, &[a, b]).ok_or_else(|| {
                        MeshError::InvariantViolation(format!(
                            "{} {h} has a degenerate code on {} {m}",
                            SINGULAR_NAMES[high_dim], SINGULAR_NAMES[mid_dim]
                        ))
                    })?;
                    let reversed = down_template(high_dim, low_dim, hl)[0] != a;
                    let hop = AlignCode::new(0, usize::from(reversed), false);
                    out[hl] = ml2l[m * nlows_per_mid + ml];
                    out_codes[hl] = compound(ml_codes[m * nlows_per_mid + ml].alignment(), hop, 2);
                }
            }
            Ok::<(), MeshError>(())
        })?;
    Ok(Adj::down_with_codes(hl2l, codes))
}

/// Vertices sharing an edge: each vertex's star lists, per incident edge,
/// that edge's other endpoint.
pub fn verts_across_edges(e2v: &Adj, v2e: &Adj) -> Result<Adj, MeshError> {
    let v2ve = v2e.offsets_or(VERT, EDGE)?;
    let codes = v2e.codes_or(VERT, EDGE)?;
    let ev2v = &e2v.ab2b;
    let ve2v: Vec<Lo> = v2e
        .ab2b
        .par_iter()
        .zip(codes.par_iter())
        .map(|(&e, code)| ev2v[e as usize * 2 + (1 - code.which_down())])
        .collect();
    Ok(Adj::graph(Arc::clone(v2ve), ve2v))
}

/// Edges sharing a triangle: per incident triangle, its two other edges.
pub fn edges_across_tris(t2e: &Adj, e2t: &Adj) -> Result<Adj, MeshError> {
    let e2et = e2t.offsets_or(EDGE, 2)?;
    let codes = e2t.codes_or(EDGE, 2)?;
    let te2e = &t2e.ab2b;
    let mut ete2e = vec![0 as Lo; e2t.ab2b.len() * 2];
    ete2e
        .par_chunks_mut(2)
        .zip(e2t.ab2b.par_iter().zip(codes.par_iter()))
        .for_each(|(out, (&t, code))| {
            let w = code.which_down();
            let base = t as usize * 3;
            out[0] = te2e[base + (w + 1) % 3];
            out[1] = te2e[base + (w + 2) % 3];
        });
    Ok(Adj::graph(multiply_each_by(2, e2et), ete2e))
}

/// Edges sharing a tetrahedron without sharing a triangle: per incident
/// tetrahedron, the opposite edge.
pub fn edges_across_tets(tet2e: &Adj, e2tet: &Adj) -> Result<Adj, MeshError> {
    let e2et = e2tet.offsets_or(EDGE, 3)?;
    let codes = e2tet.codes_or(EDGE, 3)?;
    let te2e = &tet2e.ab2b;
    let ete2e: Vec<Lo> = e2tet
        .ab2b
        .par_iter()
        .zip(codes.par_iter())
        .map(|(&t, code)| te2e[t as usize * 6 + TET_OPPOSITE_EDGES[code.which_down()] as usize])
        .collect();
    Ok(Adj::graph(Arc::clone(e2et), ete2e))
}

/// Per-node union of two graphs over the same nodes: `g1`'s neighbours
/// first, then `g2`'s.
pub fn add_edges(g1: &Adj, g2: &Adj) -> Result<Adj, MeshError> {
    let (Some(o1), Some(o2)) = (&g1.a2ab, &g2.a2ab) else {
        return Err(MeshError::InvariantViolation("add_edges needs two offset graphs".into()));
    };
    if o1.len() != o2.len() {
        return Err(MeshError::SizeMismatch {
            context: "add_edges node count",
            expected: o1.len(),
            actual: o2.len(),
        });
    }
    let degrees: Vec<Lo> = get_degrees(o1)
        .into_iter()
        .zip(get_degrees(o2))
        .map(|(a, b)| a + b)
        .collect();
    let offsets = offset_scan(&degrees);
    let mut ab2b = Vec::with_capacity(g1.ab2b.len() + g2.ab2b.len());
    for a in 0..degrees.len() {
        ab2b.extend_from_slice(g1.neighbors(a));
        ab2b.extend_from_slice(g2.neighbors(a));
    }
    Ok(Adj::graph(offsets, ab2b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::simplex::{TET, TRI};

    #[test]
    fn invert_orders_by_global_then_discovery() {
        // two edges over three vertices: (0,1) and (2,1)
        let down = Adj::down(vec![0, 1, 2, 1]);
        let up = invert_adj(&down, 2, 3, &[0, 1]).unwrap();
        assert_eq!(up.a2ab.as_deref(), Some(&[0, 1, 3, 4][..]));
        assert_eq!(&up.ab2b[..], &[0, 0, 1, 1]);
        let which: Vec<usize> = up.codes.unwrap().iter().map(|c| c.which_down()).collect();
        assert_eq!(which, vec![0, 1, 1, 0]);

        // a larger global id on edge 0 moves it after edge 1
        let up = invert_adj(&down, 2, 3, &[9, 1]).unwrap();
        assert_eq!(up.neighbors(1), &[1, 0]);
    }

    #[test]
    fn invert_rejects_out_of_range_lows() {
        let down = Adj::down(vec![0, 4]);
        assert!(matches!(
            invert_adj(&down, 2, 3, &[0]),
            Err(MeshError::RootOutOfRange { index: 4, nroots: 3 })
        ));
    }

    #[test]
    fn transit_needs_a_one_level_gap() {
        let a = Adj::down(vec![0, 1, 2, 3, 4, 5]);
        assert!(matches!(
            transit(&a, &a, TRI, EDGE),
            Err(MeshError::UnsupportedDerivation { .. })
        ));
        assert!(matches!(
            transit(&a, &a, TET, TRI),
            Err(MeshError::UnsupportedDerivation { .. })
        ));
        assert!(matches!(
            transit(&a, &a, TRI, VERT),
            Err(MeshError::MissingCodes { .. })
        ));
    }

    #[test]
    fn transit_recovers_triangle_vertices() {
        // triangle (5,6,7) with edges 0=(5,6), 1=(7,6) reversed, 2=(7,5)
        let t2e = Adj::down_with_codes(
            vec![0, 1, 2],
            vec![
                AlignCode::new(0, 0, false),
                AlignCode::new(0, 1, false),
                AlignCode::new(0, 0, false),
            ],
        );
        let e2v = Adj::down(vec![5, 6, 7, 6, 7, 5]);
        let t2v = transit(&t2e, &e2v, TRI, VERT).unwrap();
        assert_eq!(&t2v.ab2b[..], &[5, 6, 7]);
        assert!(t2v.codes.is_none());
    }

    #[test]
    fn add_edges_concatenates_per_node() {
        let g1 = Adj::graph(vec![0, 1, 1], vec![7]);
        let g2 = Adj::graph(vec![0, 1, 3], vec![8, 9, 10]);
        let g = add_edges(&g1, &g2).unwrap();
        assert_eq!(g.a2ab.as_deref(), Some(&[0, 2, 4][..]));
        assert_eq!(&g.ab2b[..], &[7, 8, 9, 10]);
    }
}
