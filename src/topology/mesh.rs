//! The mesh aggregate: entity counts, cached adjacencies, tags and
//! ownership of one rank's piece of a partitioned simplicial mesh.
//!
//! Immediate downward adjacencies `(d, d - 1)` are supplied at construction
//! through [`Mesh::set_ents`]; every other adjacency is derived the first
//! time it is asked for and kept in a write-once slot for the lifetime of
//! the mesh. Upward adjacencies are ordered by global id, so changing the
//! [`GLOBAL_TAG`] of a dimension drops the upward adjacencies into it.

use std::array;
use std::ops::Add;
use std::sync::Arc;

use bytemuck::Pod;
use log::{debug, trace, warn};
use once_cell::sync::OnceCell;

use crate::algs::comm_graph::CommGraph;
use crate::algs::dist::{Dist, Remotes};
use crate::data::array_ops::ReduceOp;
use crate::data::tag::{Tag, TagData, TagType};
use crate::debug_invariants::{AdjShape, DebugInvariants};
use crate::mesh_error::MeshError;
use crate::topology::adj::{
    Adj, add_edges, edges_across_tets, edges_across_tris, invert_adj, transit, verts_across_edges,
};
use crate::topology::derive::Derivation;
use crate::topology::simplex::{DIMS, EDGE, Go, Lo, PLURAL_NAMES, TET, TRI, VERT, simplex_degree};

/// Name of the `i64` tag holding global entity ids.
pub const GLOBAL_TAG: &str = "global";

#[derive(Debug)]
pub struct Mesh {
    comm: CommGraph,
    dim: Option<usize>,
    nents: [Option<usize>; DIMS],
    adjs: [[OnceCell<Arc<Adj>>; DIMS]; DIMS],
    tags: [Vec<Tag>; DIMS],
    owners: [Option<Remotes>; DIMS],
    dists: [OnceCell<Arc<Dist>>; DIMS],
}

impl Mesh {
    pub fn new(comm: CommGraph) -> Self {
        Self {
            comm,
            dim: None,
            nents: [None; DIMS],
            adjs: array::from_fn(|_| array::from_fn(|_| OnceCell::new())),
            tags: array::from_fn(|_| Vec::new()),
            owners: array::from_fn(|_| None),
            dists: array::from_fn(|_| OnceCell::new()),
        }
    }

    /// A mesh on a single-rank world.
    pub fn serial() -> Self {
        Self::new(CommGraph::serial())
    }

    pub fn comm(&self) -> &CommGraph {
        &self.comm
    }

    /// Sets the element dimension, 2 or 3. May only be called once.
    pub fn set_dim(&mut self, dim: usize) -> Result<(), MeshError> {
        if self.dim.is_some() || !(TRI..=TET).contains(&dim) {
            return Err(MeshError::BadMeshDimension(dim));
        }
        self.dim = Some(dim);
        Ok(())
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    fn check_dim(&self, dim: usize) -> Result<usize, MeshError> {
        let mesh_dim = self.dim.ok_or(MeshError::DimensionNotSet)?;
        if dim > mesh_dim {
            return Err(MeshError::InvalidDimension { dim, mesh_dim });
        }
        Ok(mesh_dim)
    }

    fn check_ents(&self, dim: usize) -> Result<usize, MeshError> {
        self.check_dim(dim)?;
        self.nents[dim].ok_or(MeshError::MissingEntities(PLURAL_NAMES[dim]))
    }

    pub fn set_verts(&mut self, nverts: usize) -> Result<(), MeshError> {
        self.check_dim(VERT)?;
        if self.nents[VERT].is_some() {
            return Err(MeshError::EntitiesAlreadySet(PLURAL_NAMES[VERT]));
        }
        self.nents[VERT] = Some(nverts);
        Ok(())
    }

    /// Defines the entities of `dim` by their immediate downward adjacency
    /// `(dim, dim - 1)`.
    pub fn set_ents(&mut self, dim: usize, down: Adj) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        if dim == VERT {
            return Err(MeshError::InvalidDimension {
                dim,
                mesh_dim: self.dim.unwrap_or(0),
            });
        }
        if self.nents[dim].is_some() {
            return Err(MeshError::EntitiesAlreadySet(PLURAL_NAMES[dim]));
        }
        self.check_ents(dim - 1)?;
        let degree = simplex_degree(dim, dim - 1);
        if down.ab2b.len() % degree != 0 {
            return Err(MeshError::SizeMismatch {
                context: "Mesh::set_ents",
                expected: down.ab2b.len().next_multiple_of(degree),
                actual: down.ab2b.len(),
            });
        }
        self.nents[dim] = Some(down.ab2b.len() / degree);
        if let Err(e) = self.add_adj(dim, dim - 1, down) {
            self.nents[dim] = None;
            return Err(e);
        }
        Ok(())
    }

    pub fn has_ents(&self, dim: usize) -> bool {
        dim < DIMS && self.nents[dim].is_some()
    }

    /// Entity count of `dim`, zero when not set.
    pub fn nents(&self, dim: usize) -> usize {
        self.nents.get(dim).copied().flatten().unwrap_or(0)
    }

    pub fn nverts(&self) -> usize {
        self.nents(VERT)
    }

    pub fn nedges(&self) -> usize {
        self.nents(EDGE)
    }

    pub fn ntris(&self) -> usize {
        self.nents(TRI)
    }

    pub fn ntets(&self) -> usize {
        self.nents(TET)
    }

    pub fn nelems(&self) -> usize {
        self.dim.map_or(0, |d| self.nents(d))
    }

    // --- adjacency ---

    pub fn has_adj(&self, from: usize, to: usize) -> bool {
        from < DIMS && to < DIMS && self.adjs[from][to].get().is_some()
    }

    /// A stored adjacency; never derives.
    pub fn get_adj(&self, from: usize, to: usize) -> Result<Arc<Adj>, MeshError> {
        self.check_dim(from)?;
        self.check_dim(to)?;
        self.adjs[from][to]
            .get()
            .cloned()
            .ok_or(MeshError::UnsupportedDerivation {
                from: PLURAL_NAMES[from],
                to: PLURAL_NAMES[to],
            })
    }

    fn shape<'a>(&self, adj: &'a Adj, from: usize, to: usize) -> AdjShape<'a> {
        AdjShape {
            adj,
            from,
            to,
            nfrom: self.nents(from),
            nto: self.nents(to),
        }
    }

    /// Stores an adjacency after checking its shape against the entity
    /// counts. Each `(from, to)` slot can be filled once.
    pub fn add_adj(&mut self, from: usize, to: usize, adj: Adj) -> Result<(), MeshError> {
        self.check_ents(from)?;
        self.check_ents(to)?;
        if let Err(e) = self.shape(&adj, from, to).validate_invariants() {
            warn!(
                "rejecting adjacency from {} to {}: {e}",
                PLURAL_NAMES[from], PLURAL_NAMES[to]
            );
            return Err(e);
        }
        self.adjs[from][to].set(Arc::new(adj)).map_err(|_| {
            MeshError::InvariantViolation(format!(
                "adjacency from {} to {} is already stored",
                PLURAL_NAMES[from], PLURAL_NAMES[to]
            ))
        })
    }

    /// Stored adjacency, or derive, store and return it. Later requests
    /// return the same `Arc`.
    pub fn ask_adj(&self, from: usize, to: usize) -> Result<Arc<Adj>, MeshError> {
        self.check_ents(from)?;
        self.check_ents(to)?;
        let cell = &self.adjs[from][to];
        if let Some(adj) = cell.get() {
            trace!("adjacency {} -> {} cached", PLURAL_NAMES[from], PLURAL_NAMES[to]);
            return Ok(Arc::clone(adj));
        }
        cell.get_or_try_init(|| {
            let adj = self.derive_adj(from, to)?;
            self.shape(&adj, from, to).debug_assert_invariants();
            Ok::<_, MeshError>(Arc::new(adj))
        })
        .cloned()
    }

    fn derive_adj(&self, from: usize, to: usize) -> Result<Adj, MeshError> {
        let mesh_dim = self.check_dim(from)?;
        let plan = Derivation::plan(from, to, mesh_dim);
        debug!(
            "deriving {} -> {} ({plan:?})",
            PLURAL_NAMES[from], PLURAL_NAMES[to]
        );
        match plan {
            Derivation::Upward => {
                let down = self.ask_adj(to, from)?;
                let globals = self.ask_globals(to)?;
                invert_adj(&down, simplex_degree(to, from), self.nents(from), &globals)
            }
            Derivation::DownwardTransit => {
                let h2m = self.ask_adj(from, to + 1)?;
                let m2l = self.ask_adj(to + 1, to)?;
                transit(&h2m, &m2l, from, to)
            }
            Derivation::VertStar => {
                verts_across_edges(&*self.ask_adj(EDGE, VERT)?, &*self.ask_adj(VERT, EDGE)?)
            }
            Derivation::EdgeStar { across_tets } => {
                let star = edges_across_tris(&*self.ask_adj(TRI, EDGE)?, &*self.ask_adj(EDGE, TRI)?)?;
                if !across_tets {
                    return Ok(star);
                }
                let opposite =
                    edges_across_tets(&*self.ask_adj(TET, EDGE)?, &*self.ask_adj(EDGE, TET)?)?;
                add_edges(&star, &opposite)
            }
            Derivation::Unsupported => Err(MeshError::UnsupportedDerivation {
                from: PLURAL_NAMES[from],
                to: PLURAL_NAMES[to],
            }),
        }
    }

    /// Downward adjacency, `from > to`.
    pub fn ask_down(&self, from: usize, to: usize) -> Result<Arc<Adj>, MeshError> {
        if from <= to {
            return Err(MeshError::UnsupportedDerivation {
                from: PLURAL_NAMES[from.min(TET)],
                to: PLURAL_NAMES[to.min(TET)],
            });
        }
        self.ask_adj(from, to)
    }

    /// Upward adjacency, `from < to`.
    pub fn ask_up(&self, from: usize, to: usize) -> Result<Arc<Adj>, MeshError> {
        if from >= to {
            return Err(MeshError::UnsupportedDerivation {
                from: PLURAL_NAMES[from.min(TET)],
                to: PLURAL_NAMES[to.min(TET)],
            });
        }
        self.ask_adj(from, to)
    }

    /// Same-dimension neighbours of `dim` entities.
    pub fn ask_star(&self, dim: usize) -> Result<Arc<Adj>, MeshError> {
        self.ask_adj(dim, dim)
    }

    /// Element-to-element neighbours across faces. Not derivable.
    pub fn ask_dual(&self) -> Result<Arc<Adj>, MeshError> {
        let dim = self.dim.ok_or(MeshError::DimensionNotSet)?;
        Err(MeshError::UnsupportedDerivation {
            from: PLURAL_NAMES[dim],
            to: PLURAL_NAMES[dim],
        })
    }

    /// Vertex lists of the `dim` entities.
    pub fn ask_verts_of(&self, dim: usize) -> Result<Arc<[Lo]>, MeshError> {
        Ok(Arc::clone(&self.ask_down(dim, VERT)?.ab2b))
    }

    pub fn ask_elem_verts(&self) -> Result<Arc<[Lo]>, MeshError> {
        self.ask_verts_of(self.dim.ok_or(MeshError::DimensionNotSet)?)
    }

    // --- tags ---

    fn tag_index(&self, dim: usize, name: &str) -> Option<usize> {
        self.tags.get(dim)?.iter().position(|t| t.name() == name)
    }

    pub fn has_tag(&self, dim: usize, name: &str) -> bool {
        self.tag_index(dim, name).is_some()
    }

    /// Declares a tag of `ncomps` values per entity.
    pub fn add_tag<T: TagType>(&mut self, dim: usize, name: &str, ncomps: usize) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        if self.has_tag(dim, name) {
            return Err(MeshError::TagExists { dim, name: name.into() });
        }
        self.tags[dim].push(Tag::new::<T>(name, ncomps));
        Ok(())
    }

    /// Replaces the data of a declared tag.
    pub fn set_tag<T: TagType>(
        &mut self,
        dim: usize,
        name: &str,
        data: impl Into<Arc<[T]>>,
    ) -> Result<(), MeshError> {
        let data = data.into();
        let nents = self.check_ents(dim)?;
        let idx = self
            .tag_index(dim, name)
            .ok_or_else(|| MeshError::TagMissing { dim, name: name.into() })?;
        let tag = &mut self.tags[dim][idx];
        if tag.type_name() != T::NAME {
            return Err(MeshError::TagTypeMismatch {
                dim,
                name: name.into(),
                stored: tag.type_name(),
                requested: T::NAME,
            });
        }
        let expected = nents * tag.ncomps();
        if data.len() != expected {
            return Err(MeshError::SizeMismatch {
                context: "Mesh::set_tag",
                expected,
                actual: data.len(),
            });
        }
        tag.set_data(T::wrap(data));
        if name == GLOBAL_TAG {
            self.forget_global_order(dim);
        }
        Ok(())
    }

    /// Drops every cached adjacency whose order depends on the global ids
    /// of `dim`: upward adjacencies into `dim` and the stars built on them.
    fn forget_global_order(&mut self, dim: usize) {
        for low in VERT..dim {
            self.adjs[low][dim] = OnceCell::new();
        }
        match dim {
            EDGE => self.adjs[VERT][VERT] = OnceCell::new(),
            TRI | TET => self.adjs[EDGE][EDGE] = OnceCell::new(),
            _ => {}
        }
        debug!("global ids of {} changed; upward adjacencies dropped", PLURAL_NAMES[dim]);
    }

    pub fn get_tag(&self, dim: usize, name: &str) -> Result<&Tag, MeshError> {
        self.check_dim(dim)?;
        self.tag_index(dim, name)
            .map(|i| &self.tags[dim][i])
            .ok_or_else(|| MeshError::TagMissing { dim, name: name.into() })
    }

    pub fn get_array<T: TagType>(&self, dim: usize, name: &str) -> Result<Arc<[T]>, MeshError> {
        let tag = self.get_tag(dim, name)?;
        if tag.type_name() != T::NAME {
            return Err(MeshError::TagTypeMismatch {
                dim,
                name: name.into(),
                stored: tag.type_name(),
                requested: T::NAME,
            });
        }
        tag.array::<T>()
            .cloned()
            .ok_or_else(|| MeshError::TagEmpty { dim, name: name.into() })
    }

    pub fn remove_tag(&mut self, dim: usize, name: &str) -> Result<(), MeshError> {
        self.check_dim(dim)?;
        let idx = self
            .tag_index(dim, name)
            .ok_or_else(|| MeshError::TagMissing { dim, name: name.into() })?;
        self.tags[dim].remove(idx);
        if name == GLOBAL_TAG {
            self.forget_global_order(dim);
        }
        Ok(())
    }

    pub fn ntags(&self, dim: usize) -> usize {
        self.tags.get(dim).map_or(0, Vec::len)
    }

    /// Tags of one dimension in declaration order.
    pub fn tag_at(&self, dim: usize, i: usize) -> Option<&Tag> {
        self.tags.get(dim)?.get(i)
    }

    /// Global ids from the [`GLOBAL_TAG`] tag, or local indices without it.
    pub fn ask_globals(&self, dim: usize) -> Result<Arc<[Go]>, MeshError> {
        let nents = self.check_ents(dim)?;
        if self.has_tag(dim, GLOBAL_TAG) {
            return self.get_array::<Go>(dim, GLOBAL_TAG);
        }
        Ok((0..nents as Go).collect())
    }

    // --- ownership and synchronisation ---

    /// Records the owner copy of every `dim` entity. Drops a cached
    /// owner-to-copy plan.
    pub fn set_owners(&mut self, dim: usize, owners: Remotes) -> Result<(), MeshError> {
        let nents = self.check_ents(dim)?;
        for (context, actual) in [
            ("Mesh::set_owners ranks", owners.ranks.len()),
            ("Mesh::set_owners idxs", owners.idxs.len()),
        ] {
            if actual != nents {
                return Err(MeshError::SizeMismatch { context, expected: nents, actual });
            }
        }
        self.owners[dim] = Some(owners);
        self.dists[dim] = OnceCell::new();
        Ok(())
    }

    /// Owners of `dim` entities; every entity owns itself when none were set.
    pub fn ask_owners(&self, dim: usize) -> Result<Remotes, MeshError> {
        let nents = self.check_ents(dim)?;
        if let Some(owners) = &self.owners[dim] {
            return Ok(owners.clone());
        }
        let rank = self.comm.rank();
        Ok(Remotes::new(vec![rank; nents], (0..nents as Lo).collect::<Vec<_>>()))
    }

    /// Whether this rank owns each `dim` entity.
    pub fn owned(&self, dim: usize) -> Result<Vec<bool>, MeshError> {
        let rank = self.comm.rank();
        Ok(self.ask_owners(dim)?.ranks.iter().map(|&r| r == rank).collect())
    }

    /// Collective. Number of `dim` entities across all ranks, each counted
    /// once at its owner.
    pub fn nglobal_ents(&self, dim: usize) -> Result<usize, MeshError> {
        let nowned = self.owned(dim)?.into_iter().filter(|&o| o).count();
        Ok(self.comm.allreduce_sum(nowned as u64)? as usize)
    }

    /// The values (`width` per entity) of the entities this rank owns.
    pub fn owned_array<T: Copy>(&self, dim: usize, data: &[T], width: usize) -> Result<Vec<T>, MeshError> {
        let owned = self.owned(dim)?;
        if data.len() != owned.len() * width {
            return Err(MeshError::SizeMismatch {
                context: "Mesh::owned_array",
                expected: owned.len() * width,
                actual: data.len(),
            });
        }
        if width == 0 {
            return Ok(Vec::new());
        }
        Ok(data
            .chunks_exact(width)
            .zip(owned)
            .filter(|(_, o)| *o)
            .flat_map(|(values, _)| values.iter().copied())
            .collect())
    }

    /// Collective on first use. The plan sending owner values to every copy.
    pub fn ask_dist(&self, dim: usize) -> Result<Arc<Dist>, MeshError> {
        let nents = self.check_ents(dim)?;
        self.dists[dim]
            .get_or_try_init(|| {
                let owners = self.ask_owners(dim)?;
                let copies2owners = Dist::from_remotes(self.comm.clone(), &owners, nents)?;
                debug!("built owner plan for {}", PLURAL_NAMES[dim]);
                Ok::<_, MeshError>(Arc::new(copies2owners.invert()))
            })
            .cloned()
    }

    /// Collective. Overwrites every copy's values with its owner's.
    pub fn sync_array<T: Pod + Send + Sync>(
        &self,
        dim: usize,
        data: &[T],
        width: usize,
    ) -> Result<Vec<T>, MeshError> {
        self.ask_dist(dim)?.exch(data, width)
    }

    /// Collective. Each owner combines the values of all its copies (itself
    /// included) with `op`; entities owned elsewhere keep their own values.
    pub fn reduce_array<T>(&self, dim: usize, data: &[T], width: usize, op: ReduceOp) -> Result<Vec<T>, MeshError>
    where
        T: Pod + Send + Sync + PartialOrd + Add<Output = T>,
    {
        let copies2owners = self.ask_dist(dim)?.invert();
        let mut reduced = copies2owners.exch_reduce(data, width, op)?;
        for (e, owned) in self.owned(dim)?.into_iter().enumerate() {
            if !owned {
                let range = e * width..(e + 1) * width;
                reduced[range.clone()].copy_from_slice(&data[range]);
            }
        }
        Ok(reduced)
    }

    /// Collective. [`Mesh::reduce_array`] on a tag's data, in place.
    pub fn reduce_tag(&mut self, dim: usize, name: &str, op: ReduceOp) -> Result<(), MeshError> {
        let (width, data) = self.tag_payload(dim, name)?;
        let reduced = match data {
            TagData::I8(a) => TagData::I8(self.reduce_array(dim, &a, width, op)?.into()),
            TagData::I32(a) => TagData::I32(self.reduce_array(dim, &a, width, op)?.into()),
            TagData::I64(a) => TagData::I64(self.reduce_array(dim, &a, width, op)?.into()),
            TagData::F64(a) => TagData::F64(self.reduce_array(dim, &a, width, op)?.into()),
        };
        self.replace_tag_data(dim, name, reduced);
        Ok(())
    }

    fn tag_payload(&self, dim: usize, name: &str) -> Result<(usize, TagData), MeshError> {
        let tag = self.get_tag(dim, name)?;
        let data = tag
            .data()
            .cloned()
            .ok_or_else(|| MeshError::TagEmpty { dim, name: name.into() })?;
        Ok((tag.ncomps(), data))
    }

    fn replace_tag_data(&mut self, dim: usize, name: &str, data: TagData) {
        if let Some(idx) = self.tag_index(dim, name) {
            self.tags[dim][idx].set_data(data);
        }
        if name == GLOBAL_TAG {
            self.forget_global_order(dim);
        }
    }

    /// Collective. [`Mesh::sync_array`] on a tag's data, in place.
    pub fn sync_tag(&mut self, dim: usize, name: &str) -> Result<(), MeshError> {
        let (width, data) = self.tag_payload(dim, name)?;
        let synced = match data {
            TagData::I8(a) => TagData::I8(self.sync_array(dim, &a, width)?.into()),
            TagData::I32(a) => TagData::I32(self.sync_array(dim, &a, width)?.into()),
            TagData::I64(a) => TagData::I64(self.sync_array(dim, &a, width)?.into()),
            TagData::F64(a) => TagData::F64(self.sync_array(dim, &a, width)?.into()),
        };
        self.replace_tag_data(dim, name, synced);
        Ok(())
    }
}
