// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simplicial complexes: hypergraphs closed under taking non-empty subsets.
//!
//! Every simplex is an edge of the underlying [`Hypergraph`]. Inserting a
//! simplex inserts each of its missing faces as its own edge, walking the
//! powerset iteratively from the largest faces down. Faces are addressed by
//! content, so a face shared by several simplices is stored once.
//!
//! Removing a face that still has cofaces either removes those cofaces too
//! ([`FaceRemovalPolicy::Cascade`]) or is refused
//! ([`FaceRemovalPolicy::Reject`]). Either way the complex stays closed.

use std::ops::Deref;

use rustc_hash::FxHashMap;

use crate::attrs::{AttrValue, Attributes};
use crate::config::{FaceRemovalPolicy, HypergraphConfig};
use crate::edits::merge_attrs;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::{EdgeId, NodeId};
use crate::incidence::FxIndexSet;
use crate::view::EdgeView;

/// A hypergraph whose edge set is downward closed.
///
/// Read access goes through `Deref<Target = Hypergraph>`; all mutation goes
/// through the complex so the closure and the content index stay in step.
#[derive(Debug, Clone, Default)]
pub struct SimplicialComplex {
    hg: Hypergraph,
    faces: FxHashMap<Vec<NodeId>, EdgeId>,
}

impl Deref for SimplicialComplex {
    type Target = Hypergraph;

    fn deref(&self) -> &Hypergraph {
        &self.hg
    }
}

fn content_key<'a>(members: impl IntoIterator<Item = &'a NodeId>) -> Vec<NodeId> {
    let mut key: Vec<NodeId> = members.into_iter().cloned().collect();
    key.sort();
    key
}

impl SimplicialComplex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HypergraphConfig) -> Self {
        Self {
            hg: Hypergraph::with_config(config),
            faces: FxHashMap::default(),
        }
    }

    /// Closes an existing hypergraph downward.
    ///
    /// Existing edges keep their IDs and attributes; missing faces get fresh
    /// IDs. Fails if two edges have the same members, if an edge is empty,
    /// or if an edge exceeds `max_simplex_size`.
    pub fn from_hypergraph(hg: Hypergraph) -> Result<Self> {
        let mut faces = FxHashMap::default();
        for (id, members) in hg.store.iter_members() {
            if members.is_empty() {
                return Err(Error::invariant(format!("edge {id} is empty and cannot be a simplex")));
            }
            check_size(hg.config(), members.len())?;
            if let Some(other) = faces.insert(content_key(members), id.clone()) {
                return Err(Error::invariant(format!(
                    "edges {other} and {id} describe the same simplex"
                )));
            }
        }

        let mut complex = Self { hg, faces };
        let simplices: Vec<Vec<NodeId>> = complex.hg.edge_list();
        let mut created = 0;
        for simplex in &simplices {
            created += complex.insert_faces(simplex)?;
        }
        if created > 0 {
            tracing::debug!(created, "closed hypergraph downward");
            complex.hg.bump();
        }
        Ok(complex)
    }

    pub fn into_hypergraph(self) -> Hypergraph {
        self.hg
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    pub fn add_node(&mut self) -> Result<NodeId> {
        self.hg.add_node()
    }

    pub fn add_node_with_id(&mut self, id: impl Into<NodeId>) -> Result<NodeId> {
        self.hg.add_node_with_id(id)
    }

    /// Removes a node together with every simplex containing it.
    pub fn remove_node(&mut self, node: &NodeId) -> Result<Attributes> {
        let containing: Vec<EdgeId> = self.hg.memberships(node)?.iter().cloned().collect();
        for edge in &containing {
            self.drop_simplex(edge);
        }
        let attrs = self.hg.raw_remove_node(node);
        self.hg.bump();
        Ok(attrs)
    }

    // =========================================================================
    // Simplex insertion
    // =========================================================================

    /// Inserts a simplex and all of its faces. Returns the simplex ID.
    pub fn add_simplex<I>(&mut self, members: I) -> Result<EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.add_simplex_with(members, None, Attributes::default())
    }

    /// Inserts a simplex with an optional explicit ID and attributes.
    ///
    /// If a simplex with the same members is already present, its ID is
    /// returned and `attrs` are merged into it by the configured merge
    /// policy; naming a different explicit ID for it is an
    /// `InvariantViolation`.
    pub fn add_simplex_with<I>(&mut self, members: I, id: Option<EdgeId>, attrs: Attributes) -> Result<EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let members = self.hg.prepare_members(members)?;
        check_size(self.hg.config(), members.len())?;
        let key = content_key(&members);

        if let Some(existing) = self.faces.get(&key).cloned() {
            if let Some(id) = id.filter(|id| *id != existing) {
                return Err(Error::invariant(format!(
                    "simplex already present as {existing}, cannot insert it as {id}"
                )));
            }
            if !attrs.is_empty() {
                let policy = self.hg.config().merge_policy;
                if let Some(target) = self.hg.edge_attrs.get_mut(&existing) {
                    merge_attrs(target, attrs, policy);
                }
                self.hg.bump();
            }
            return Ok(existing);
        }

        let id = match id {
            Some(id) if self.hg.store.has_edge(&id) => return Err(Error::DuplicateEdgeId(id)),
            Some(id) => {
                self.hg.edge_ids.observe(id.id());
                id
            }
            None => self.hg.fresh_edge_id()?,
        };
        let members: Vec<NodeId> = members.into_iter().collect();
        let faces: Vec<_> = self
            .missing_faces(&members)
            .into_iter()
            .filter(|(face_key, _)| *face_key != key)
            .collect();
        let face_ids = self.hg.fresh_edge_ids(faces.len())?;

        self.hg.raw_insert_edge(id.clone(), members.iter().cloned().collect(), attrs);
        self.faces.insert(key, id.clone());
        let created = faces.len();
        self.commit_faces(faces, face_ids);
        tracing::debug!(simplex = %id, size = members.len(), faces = created, "inserted simplex");
        self.hg.bump();
        Ok(id)
    }

    /// Inserts several simplices with generated IDs.
    ///
    /// Every member list is validated before any simplex is inserted.
    pub fn add_simplices_from<I, E>(&mut self, simplices: I) -> Result<Vec<EdgeId>>
    where
        I: IntoIterator<Item = E>,
        E: IntoIterator,
        E::Item: Into<NodeId>,
    {
        let prepared = simplices
            .into_iter()
            .map(|members| {
                let members = self.hg.prepare_members(members)?;
                check_size(self.hg.config(), members.len())?;
                Ok(members)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut ids = Vec::with_capacity(prepared.len());
        let mut created = 0;
        for members in prepared {
            let members: Vec<NodeId> = members.into_iter().collect();
            created += self.insert_faces(&members)?;
            if let Some(id) = self.faces.get(&content_key(&members)) {
                ids.push(id.clone());
            }
        }
        if created > 0 {
            tracing::debug!(simplices = ids.len(), faces = created, "bulk simplex insertion");
            self.hg.bump();
        }
        Ok(ids)
    }

    /// Every non-empty subset of `members` not yet in the complex, largest
    /// first, paired with its content key.
    fn missing_faces(&self, members: &[NodeId]) -> Vec<(Vec<NodeId>, Vec<NodeId>)> {
        let k = members.len();
        let mut masks: Vec<u64> = (1..(1u64 << k)).collect();
        masks.sort_by_key(|m| std::cmp::Reverse(m.count_ones()));

        masks
            .into_iter()
            .filter_map(|mask| {
                let face: Vec<NodeId> = members
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, n)| n.clone())
                    .collect();
                let key = content_key(&face);
                (!self.faces.contains_key(&key)).then_some((key, face))
            })
            .collect()
    }

    fn commit_faces(&mut self, faces: Vec<(Vec<NodeId>, Vec<NodeId>)>, ids: Vec<EdgeId>) {
        for ((key, face), id) in faces.into_iter().zip(ids) {
            self.hg.raw_insert_edge(id.clone(), face.into_iter().collect(), Attributes::default());
            self.faces.insert(key, id);
        }
    }

    /// Inserts every missing face of `members` with a fresh ID. Returns how
    /// many edges were created. Nothing is inserted if allocation fails.
    fn insert_faces(&mut self, members: &[NodeId]) -> Result<usize> {
        let faces = self.missing_faces(members);
        let ids = self.hg.fresh_edge_ids(faces.len())?;
        let created = faces.len();
        self.commit_faces(faces, ids);
        Ok(created)
    }

    // =========================================================================
    // Simplex removal
    // =========================================================================

    /// Removes a simplex under the configured [`FaceRemovalPolicy`].
    ///
    /// Returns the IDs of every removed simplex, the requested one first.
    pub fn remove_simplex(&mut self, simplex: &EdgeId) -> Result<Vec<EdgeId>> {
        let cofaces = self.cofaces(simplex)?;
        if !cofaces.is_empty() && self.hg.config().face_removal == FaceRemovalPolicy::Reject {
            return Err(Error::invariant(format!(
                "simplex {simplex} is a face of {} larger simplices",
                cofaces.len()
            )));
        }

        let mut removed = Vec::with_capacity(cofaces.len() + 1);
        removed.push(simplex.clone());
        removed.extend(cofaces);
        for edge in &removed {
            self.drop_simplex(edge);
        }
        if removed.len() > 1 {
            tracing::debug!(simplex = %simplex, cascaded = removed.len() - 1, "removed simplex with cofaces");
        }
        self.hg.bump();
        Ok(removed)
    }

    /// Simplices strictly containing `simplex`.
    pub fn cofaces(&self, simplex: &EdgeId) -> Result<Vec<EdgeId>> {
        let store = &self.hg.store;
        let members = self.hg.members(simplex)?;
        let Some(first) = members.first() else {
            return Ok(Vec::new());
        };
        Ok(store
            .memberships(first)
            .into_iter()
            .flatten()
            .filter(|e| *e != simplex)
            .filter(|e| members.iter().all(|n| store.is_member(n, e)))
            .cloned()
            .collect())
    }

    fn drop_simplex(&mut self, edge: &EdgeId) {
        if let Some(members) = self.hg.store.members(edge) {
            let key = content_key(members);
            self.faces.remove(&key);
        }
        self.hg.raw_remove_edge(edge);
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn has_simplex<I>(&self, members: I) -> bool
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.simplex_id(members).is_some()
    }

    /// The ID of the simplex with exactly these members.
    pub fn simplex_id<I>(&self, members: I) -> Option<&EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let set: FxIndexSet<NodeId> = members.into_iter().map(Into::into).collect();
        self.faces.get(&content_key(&set))
    }

    pub fn num_simplices(&self) -> usize {
        self.faces.len()
    }

    /// Simplices that are not a face of any other simplex.
    pub fn maximal_simplices(&self) -> Vec<EdgeId> {
        EdgeView::all().maximal(&self.hg).ids(&self.hg)
    }

    /// Verifies the content index and downward closure.
    ///
    /// Checking the codimension-one faces of every simplex is enough, since
    /// closure then follows by induction on size.
    pub fn check_closure(&self) -> Result<()> {
        self.hg.check_invariants()?;
        if self.faces.len() != self.hg.num_edges() {
            return Err(Error::invariant("simplex index out of sync with edges"));
        }
        for (id, members) in self.hg.store.iter_members() {
            let key = content_key(members);
            if self.faces.get(&key) != Some(id) {
                return Err(Error::invariant(format!("simplex {id} is not indexed")));
            }
            if key.len() < 2 {
                continue;
            }
            for skip in 0..key.len() {
                let mut face = key.clone();
                face.remove(skip);
                if !self.faces.contains_key(&face) {
                    return Err(Error::invariant(format!("simplex {id} is missing a face")));
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn set_node_attr(&mut self, node: &NodeId, key: impl Into<String>, value: impl Into<AttrValue>) -> Result<()> {
        self.hg.set_node_attr(node, key, value)
    }

    pub fn set_simplex_attr(
        &mut self,
        simplex: &EdgeId,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        self.hg.set_edge_attr(simplex, key, value)
    }

    pub fn set_graph_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.hg.set_graph_attr(key, value)
    }
}

fn check_size(config: &HypergraphConfig, size: usize) -> Result<()> {
    let max = config.max_simplex_size.min(63);
    if size > max {
        return Err(Error::SimplexTooLarge { size, max });
    }
    if size >= config.warn_simplex_size {
        tracing::warn!(size, faces = (1u64 << size) - 1, "expanding a large simplex");
    }
    Ok(())
}
