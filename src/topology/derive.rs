//! Which kernel produces an adjacency that is not stored yet.

use crate::topology::simplex::{EDGE, TET, TRI, VERT};

/// Derivation strategy for a `(from, to)` request on a mesh of dimension
/// `dim`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Derivation {
    /// Invert the `(to, from)` downward adjacency.
    Upward,
    /// Compose `(from, to + 1)` with `(to + 1, to)`.
    DownwardTransit,
    /// Vertices sharing an edge.
    VertStar,
    /// Edges sharing a triangle, plus edges across tetrahedra when
    /// `across_tets`.
    EdgeStar { across_tets: bool },
    Unsupported,
}

impl Derivation {
    /// Callers must have checked `from, to <= dim`.
    pub fn plan(from: usize, to: usize, dim: usize) -> Derivation {
        match (from, to) {
            (f, t) if f < t => Derivation::Upward,
            (f, t) if f > t + 1 => Derivation::DownwardTransit,
            (VERT, VERT) if dim >= EDGE => Derivation::VertStar,
            (EDGE, EDGE) if dim == TRI => Derivation::EdgeStar { across_tets: false },
            (EDGE, EDGE) if dim == TET => Derivation::EdgeStar { across_tets: true },
            _ => Derivation::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_pair() {
        assert_eq!(Derivation::plan(VERT, TET, TET), Derivation::Upward);
        assert_eq!(Derivation::plan(TET, VERT, TET), Derivation::DownwardTransit);
        assert_eq!(Derivation::plan(TET, EDGE, TET), Derivation::DownwardTransit);
        assert_eq!(Derivation::plan(TRI, VERT, TRI), Derivation::DownwardTransit);
        // immediate downward adjacencies are stored, never derived
        assert_eq!(Derivation::plan(TET, TRI, TET), Derivation::Unsupported);
        assert_eq!(Derivation::plan(VERT, VERT, TRI), Derivation::VertStar);
        assert_eq!(
            Derivation::plan(EDGE, EDGE, TRI),
            Derivation::EdgeStar { across_tets: false }
        );
        assert_eq!(
            Derivation::plan(EDGE, EDGE, TET),
            Derivation::EdgeStar { across_tets: true }
        );
        assert_eq!(Derivation::plan(TRI, TRI, TRI), Derivation::Unsupported);
        assert_eq!(Derivation::plan(TET, TET, TET), Derivation::Unsupported);
        assert_eq!(Derivation::plan(TRI, TRI, TET), Derivation::Unsupported);
    }
}
