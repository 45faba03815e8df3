//! Fixed simplex metadata: entity dimensions, boundary counts and the
//! canonical local numbering of boundary pieces.

/// Local ordinal: an index into per-entity arrays on one rank.
pub type Lo = u32;
/// Global ordinal: a rank-independent entity id.
pub type Go = i64;

/// Number of entity dimensions tracked by a mesh.
pub const DIMS: usize = 4;

pub const VERT: usize = 0;
pub const EDGE: usize = 1;
pub const TRI: usize = 2;
pub const TET: usize = 3;

/// `SIMPLEX_DEGREES[dim][subdim]` = number of `subdim` boundary pieces of a
/// `dim` simplex. Entries with `subdim > dim` are zero.
pub const SIMPLEX_DEGREES: [[usize; DIMS]; DIMS] = [
    [1, 0, 0, 0],
    [2, 1, 0, 0],
    [3, 3, 1, 0],
    [4, 6, 4, 1],
];

/// Plural entity names, used in diagnostics.
pub const PLURAL_NAMES: [&str; DIMS] = ["vertices", "edges", "triangles", "tetrahedra"];

/// Singular entity names, used in diagnostics.
pub const SINGULAR_NAMES: [&str; DIMS] = ["vertex", "edge", "triangle", "tetrahedron"];

const TRI_EDGE_VERTS: [[u8; 2]; 3] = [[0, 1], [1, 2], [2, 0]];
const TET_EDGE_VERTS: [[u8; 2]; 6] = [[0, 1], [1, 2], [2, 0], [0, 3], [1, 3], [2, 3]];
const TET_TRI_VERTS: [[u8; 3]; 4] = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
const EDGE_VERTS: [[u8; 1]; 2] = [[0], [1]];
const TRI_VERTS: [[u8; 1]; 3] = [[0], [1], [2]];
const TET_VERTS: [[u8; 1]; 4] = [[0], [1], [2], [3]];

/// For each tetrahedron edge, the local index of the edge that shares no
/// vertex with it.
pub const TET_OPPOSITE_EDGES: [u8; 6] = [5, 3, 4, 1, 2, 0];

/// Number of `subdim` pieces on a `dim` simplex.
#[inline]
pub fn simplex_degree(dim: usize, subdim: usize) -> usize {
    SIMPLEX_DEGREES[dim][subdim]
}

/// Local vertex numbers (in the `high_dim` simplex) of its
/// `which_down`-th `low_dim` boundary piece.
///
/// # Panics
/// Panics when `low_dim >= high_dim` or `which_down` is out of range.
pub fn down_template(high_dim: usize, low_dim: usize, which_down: usize) -> &'static [u8] {
    match (high_dim, low_dim) {
        (EDGE, VERT) => &EDGE_VERTS[which_down],
        (TRI, VERT) => &TRI_VERTS[which_down],
        (TRI, EDGE) => &TRI_EDGE_VERTS[which_down],
        (TET, VERT) => &TET_VERTS[which_down],
        (TET, EDGE) => &TET_EDGE_VERTS[which_down],
        (TET, TRI) => &TET_TRI_VERTS[which_down],
        _ => panic!("no down template from dimension {high_dim} to {low_dim}"),
    }
}

/// Local index of the `low_dim` piece of a `high_dim` simplex whose local
/// vertices are exactly `verts`, in any order.
pub fn find_down(high_dim: usize, low_dim: usize, verts: &[u8]) -> Option<usize> {
    (0..simplex_degree(high_dim, low_dim)).find(|&which| {
        let tmpl = down_template(high_dim, low_dim, which);
        tmpl.len() == verts.len() && tmpl.iter().all(|v| verts.contains(v))
    })
}
