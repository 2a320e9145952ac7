// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Bipartite incidence store.
//!
//! The [`IncidenceStore`] owns the canonical pair of mappings
//! `node -> {edges}` (memberships) and `edge -> {nodes}` (members). Every
//! mutation goes through the primitives below, which update both directions
//! together, so `n ∈ members(e)` holds exactly when `e ∈ memberships(n)`.
//!
//! Both top-level maps and all inner sets are insertion-ordered. Removals use
//! shifting removes so enumeration order stays the order of insertion.

use std::hash::{BuildHasherDefault, Hash};

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHasher};

use crate::error::{Error, Result};
use crate::ids::{EdgeId, NodeId};

/// Insertion-ordered map with Fx hashing.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered set with Fx hashing.
pub type FxIndexSet<K> = IndexSet<K, BuildHasherDefault<FxHasher>>;

/// The dual node/edge incidence index.
#[derive(Debug, Clone, Default)]
pub struct IncidenceStore {
    memberships: FxIndexMap<NodeId, FxIndexSet<EdgeId>>,
    members: FxIndexMap<EdgeId, FxIndexSet<NodeId>>,
}

impl IncidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with room for the given number of entities.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            memberships: FxIndexMap::with_capacity_and_hasher(nodes, Default::default()),
            members: FxIndexMap::with_capacity_and_hasher(edges, Default::default()),
        }
    }

    // --- Queries ---

    pub fn node_count(&self) -> usize {
        self.memberships.len()
    }

    pub fn edge_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_node(&self, node: &NodeId) -> bool {
        self.memberships.contains_key(node)
    }

    pub fn has_edge(&self, edge: &EdgeId) -> bool {
        self.members.contains_key(edge)
    }

    /// Edges that contain `node`.
    pub fn memberships(&self, node: &NodeId) -> Option<&FxIndexSet<EdgeId>> {
        self.memberships.get(node)
    }

    /// Nodes contained in `edge`.
    pub fn members(&self, edge: &EdgeId) -> Option<&FxIndexSet<NodeId>> {
        self.members.get(edge)
    }

    pub fn degree(&self, node: &NodeId) -> Option<usize> {
        self.memberships.get(node).map(FxIndexSet::len)
    }

    pub fn size(&self, edge: &EdgeId) -> Option<usize> {
        self.members.get(edge).map(FxIndexSet::len)
    }

    /// Returns `true` if `node` is a member of `edge`.
    pub fn is_member(&self, node: &NodeId, edge: &EdgeId) -> bool {
        self.members
            .get(edge)
            .map_or(false, |nodes| nodes.contains(node))
    }

    /// Node IDs in insertion order.
    pub fn node_ids(&self) -> impl ExactSizeIterator<Item = &NodeId> + '_ {
        self.memberships.keys()
    }

    /// Edge IDs in insertion order.
    pub fn edge_ids(&self) -> impl ExactSizeIterator<Item = &EdgeId> + '_ {
        self.members.keys()
    }

    /// `(node, memberships)` pairs in insertion order.
    pub fn iter_memberships(&self) -> impl Iterator<Item = (&NodeId, &FxIndexSet<EdgeId>)> + '_ {
        self.memberships.iter()
    }

    /// `(edge, members)` pairs in insertion order.
    pub fn iter_members(&self) -> impl Iterator<Item = (&EdgeId, &FxIndexSet<NodeId>)> + '_ {
        self.members.iter()
    }

    /// Position of a node in enumeration order.
    pub fn node_index(&self, node: &NodeId) -> Option<usize> {
        self.memberships.get_index_of(node)
    }

    /// Position of an edge in enumeration order.
    pub fn edge_index(&self, edge: &EdgeId) -> Option<usize> {
        self.members.get_index_of(edge)
    }

    pub(crate) fn membership_map(&self) -> &FxIndexMap<NodeId, FxIndexSet<EdgeId>> {
        &self.memberships
    }

    pub(crate) fn member_map(&self) -> &FxIndexMap<EdgeId, FxIndexSet<NodeId>> {
        &self.members
    }

    // --- Primitive mutators ---

    /// Inserts a node with no memberships. Returns `false` if it was present.
    pub(crate) fn insert_node(&mut self, node: NodeId) -> bool {
        if self.memberships.contains_key(&node) {
            return false;
        }
        self.memberships.insert(node, FxIndexSet::default());
        true
    }

    /// Inserts an edge and links it to every member.
    ///
    /// The edge must be absent and every member must already be a node.
    pub(crate) fn insert_edge(&mut self, edge: EdgeId, nodes: FxIndexSet<NodeId>) {
        debug_assert!(!self.members.contains_key(&edge));
        for node in &nodes {
            debug_assert!(self.memberships.contains_key(node));
            if let Some(edges) = self.memberships.get_mut(node) {
                edges.insert(edge.clone());
            }
        }
        self.members.insert(edge, nodes);
    }

    /// Adds one incidence. Both endpoints must exist.
    pub(crate) fn link(&mut self, node: &NodeId, edge: &EdgeId) -> bool {
        link_in(&mut self.memberships, &mut self.members, node, edge)
    }

    /// Removes one incidence, leaving both endpoints in place.
    pub(crate) fn unlink(&mut self, node: &NodeId, edge: &EdgeId) -> bool {
        unlink_in(&mut self.memberships, &mut self.members, node, edge)
    }

    /// Removes a node and detaches it from every edge.
    pub(crate) fn remove_node(&mut self, node: &NodeId) -> Option<FxIndexSet<EdgeId>> {
        remove_in(&mut self.memberships, &mut self.members, node)
    }

    /// Removes an edge and detaches it from every member.
    pub(crate) fn remove_edge(&mut self, edge: &EdgeId) -> Option<FxIndexSet<NodeId>> {
        remove_in(&mut self.members, &mut self.memberships, edge)
    }

    /// Changes a node's ID, keeping its position everywhere. `new` must be free.
    pub(crate) fn rename_node(&mut self, old: &NodeId, new: NodeId) -> bool {
        rename_in(&mut self.memberships, &mut self.members, old, new)
    }

    /// Changes an edge's ID, keeping its position everywhere. `new` must be free.
    pub(crate) fn rename_edge(&mut self, old: &EdgeId, new: EdgeId) -> bool {
        rename_in(&mut self.members, &mut self.memberships, old, new)
    }

    /// Moves every incidence of `source` onto `target` and removes `source`.
    pub(crate) fn merge_node_into(&mut self, source: &NodeId, target: &NodeId) -> bool {
        merge_in(&mut self.memberships, &mut self.members, source, target)
    }

    /// Moves every member of `source` into `target` and removes `source`.
    pub(crate) fn merge_edge_into(&mut self, source: &EdgeId, target: &EdgeId) -> bool {
        merge_in(&mut self.members, &mut self.memberships, source, target)
    }

    // --- Content grouping ---

    /// Groups edges by identical member sets.
    ///
    /// Each returned group starts with its canonical (first-seen) edge and
    /// has at least two entries.
    pub fn duplicate_edge_groups(&self) -> Vec<Vec<EdgeId>> {
        duplicate_groups(&self.members)
    }

    /// Edges whose member set repeats an earlier edge's member set.
    ///
    /// The first-seen edge of each content group is the implicit canonical
    /// copy and is not reported.
    pub fn duplicate_edges(&self) -> Vec<EdgeId> {
        redundant(self.duplicate_edge_groups())
    }

    /// Groups nodes by identical membership sets, canonical node first.
    pub fn duplicate_node_groups(&self) -> Vec<Vec<NodeId>> {
        duplicate_groups(&self.memberships)
    }

    /// Nodes whose membership set repeats an earlier node's, canonical excluded.
    pub fn duplicate_nodes(&self) -> Vec<NodeId> {
        redundant(self.duplicate_node_groups())
    }

    /// Verifies that the two mappings are exact duals of each other.
    pub fn check_duality(&self) -> Result<()> {
        for (node, edges) in &self.memberships {
            for edge in edges {
                match self.members.get(edge) {
                    Some(nodes) if nodes.contains(node) => {}
                    _ => {
                        return Err(Error::invariant(format!(
                            "node {node} lists edge {edge} but the edge does not list the node"
                        )))
                    }
                }
            }
        }
        for (edge, nodes) in &self.members {
            for node in nodes {
                match self.memberships.get(node) {
                    Some(edges) if edges.contains(edge) => {}
                    _ => {
                        return Err(Error::invariant(format!(
                            "edge {edge} lists node {node} but the node does not list the edge"
                        )))
                    }
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Direction-agnostic helpers. `primary` is the map keyed by the entity being
// changed, `dual` the opposite direction.
// =============================================================================

fn link_in<A, B>(
    primary: &mut FxIndexMap<A, FxIndexSet<B>>,
    dual: &mut FxIndexMap<B, FxIndexSet<A>>,
    a: &A,
    b: &B,
) -> bool
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
{
    if !primary.contains_key(a) || !dual.contains_key(b) {
        return false;
    }
    let added = primary
        .get_mut(a)
        .map_or(false, |set| set.insert(b.clone()));
    if added {
        if let Some(set) = dual.get_mut(b) {
            set.insert(a.clone());
        }
    }
    added
}

fn unlink_in<A, B>(
    primary: &mut FxIndexMap<A, FxIndexSet<B>>,
    dual: &mut FxIndexMap<B, FxIndexSet<A>>,
    a: &A,
    b: &B,
) -> bool
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
{
    let removed = primary
        .get_mut(a)
        .map_or(false, |set| set.shift_remove(b));
    if removed {
        if let Some(set) = dual.get_mut(b) {
            set.shift_remove(a);
        }
    }
    removed
}

fn remove_in<A, B>(
    primary: &mut FxIndexMap<A, FxIndexSet<B>>,
    dual: &mut FxIndexMap<B, FxIndexSet<A>>,
    a: &A,
) -> Option<FxIndexSet<B>>
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
{
    let incident = primary.shift_remove(a)?;
    for b in &incident {
        if let Some(set) = dual.get_mut(b) {
            set.shift_remove(a);
        }
    }
    Some(incident)
}

fn rename_in<A, B>(
    primary: &mut FxIndexMap<A, FxIndexSet<B>>,
    dual: &mut FxIndexMap<B, FxIndexSet<A>>,
    old: &A,
    new: A,
) -> bool
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
{
    if primary.contains_key(&new) {
        return false;
    }
    let Some((index, _, incident)) = primary.shift_remove_full(old) else {
        return false;
    };
    for b in &incident {
        if let Some(set) = dual.get_mut(b) {
            if let Some((pos, _)) = set.shift_remove_full(old) {
                set.shift_insert(pos, new.clone());
            }
        }
    }
    primary.shift_insert(index, new, incident);
    true
}

fn merge_in<A, B>(
    primary: &mut FxIndexMap<A, FxIndexSet<B>>,
    dual: &mut FxIndexMap<B, FxIndexSet<A>>,
    source: &A,
    target: &A,
) -> bool
where
    A: Hash + Eq + Clone,
    B: Hash + Eq + Clone,
{
    if source == target || !primary.contains_key(target) {
        return false;
    }
    let Some(incident) = primary.shift_remove(source) else {
        return false;
    };
    for b in &incident {
        if let Some(set) = dual.get_mut(b) {
            set.shift_remove(source);
            set.insert(target.clone());
        }
    }
    if let Some(set) = primary.get_mut(target) {
        set.extend(incident);
    }
    true
}

/// Groups keys by identical (unordered) content, first-seen key first.
/// Only groups with at least two keys are returned.
pub(crate) fn duplicate_groups<'a, A, B, I>(entries: I) -> Vec<Vec<A>>
where
    I: IntoIterator<Item = (&'a A, &'a FxIndexSet<B>)>,
    A: Hash + Eq + Clone + 'a,
    B: Hash + Eq + Ord + 'a,
{
    let mut group_of: FxHashMap<Vec<&B>, usize> = FxHashMap::default();
    let mut groups: Vec<Vec<A>> = Vec::new();

    for (key, content) in entries {
        let mut signature: Vec<&B> = content.iter().collect();
        signature.sort_unstable();
        match group_of.get(&signature) {
            Some(&g) => groups[g].push(key.clone()),
            None => {
                group_of.insert(signature, groups.len());
                groups.push(vec![key.clone()]);
            }
        }
    }

    groups.retain(|g| g.len() > 1);
    groups
}

/// Drops the canonical head of every group.
pub(crate) fn redundant<A>(groups: Vec<Vec<A>>) -> Vec<A> {
    groups
        .into_iter()
        .flat_map(|g| g.into_iter().skip(1))
        .collect()
}
