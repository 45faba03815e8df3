use crate::mesh_error::MeshError;
use crate::topology::adj::Adj;
use crate::topology::simplex::{PLURAL_NAMES, VERT, simplex_degree};

/// Trait for validating data structure invariants.
pub trait DebugInvariants {
    /// Assert invariants in debug builds or when invariant checking is enabled.
    fn debug_assert_invariants(&self);
    /// Validate invariants and return the first error encountered.
    fn validate_invariants(&self) -> Result<(), MeshError>;
}

/// Helper macro to run a fallible check and panic on error when invariant
/// checking is enabled.
#[macro_export]
macro_rules! debug_invariants {
    ($expr:expr, $($ctx:tt)*) => {
        #[cfg(any(debug_assertions, feature = "strict-invariants", feature = "check-invariants"))]
        if let Err(e) = $expr {
            panic!(concat!("[invariants] ", $($ctx)*, ": {}"), e);
        }
    };
}

/// An adjacency viewed against the entity counts of its two dimensions.
#[derive(Copy, Clone, Debug)]
pub struct AdjShape<'a> {
    pub adj: &'a Adj,
    pub from: usize,
    pub to: usize,
    pub nfrom: usize,
    pub nto: usize,
}

impl AdjShape<'_> {
    fn violation(&self, what: &str) -> MeshError {
        MeshError::InvariantViolation(format!(
            "adjacency from {} to {}: {what}",
            PLURAL_NAMES[self.from], PLURAL_NAMES[self.to]
        ))
    }
}

impl DebugInvariants for AdjShape<'_> {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "adjacency");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        let Self { adj, from, to, nfrom, nto } = *self;
        if to < from {
            if adj.a2ab.is_some() {
                return Err(self.violation("downward adjacency carries offsets"));
            }
            if to == VERT && adj.codes.is_some() {
                return Err(self.violation("vertex lists carry alignment codes"));
            }
            let expected = nfrom * simplex_degree(from, to);
            if adj.ab2b.len() != expected {
                return Err(MeshError::SizeMismatch {
                    context: "downward adjacency",
                    expected,
                    actual: adj.ab2b.len(),
                });
            }
        } else {
            if from < to {
                let expected = nto * simplex_degree(to, from);
                if adj.ab2b.len() != expected {
                    return Err(MeshError::SizeMismatch {
                        context: "upward adjacency",
                        expected,
                        actual: adj.ab2b.len(),
                    });
                }
            }
            let Some(offsets) = &adj.a2ab else {
                return Err(self.violation("graph adjacency has no offsets"));
            };
            if offsets.len() != nfrom + 1 {
                return Err(MeshError::SizeMismatch {
                    context: "adjacency offsets",
                    expected: nfrom + 1,
                    actual: offsets.len(),
                });
            }
            if offsets.first() != Some(&0)
                || offsets.windows(2).any(|w| w[0] > w[1])
                || offsets[nfrom] as usize != adj.ab2b.len()
            {
                return Err(self.violation("offsets are not a prefix sum over the entries"));
            }
        }
        if let Some(codes) = &adj.codes {
            if codes.len() != adj.ab2b.len() {
                return Err(MeshError::SizeMismatch {
                    context: "alignment codes",
                    expected: adj.ab2b.len(),
                    actual: codes.len(),
                });
            }
        }
        if let Some(&b) = adj.ab2b.iter().find(|&&b| b as usize >= nto) {
            return Err(MeshError::RootOutOfRange {
                index: b as usize,
                nroots: nto,
            });
        }
        Ok(())
    }
}
