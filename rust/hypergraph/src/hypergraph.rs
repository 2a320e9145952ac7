// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The hypergraph container.
//!
//! [`Hypergraph`] owns the [`IncidenceStore`], the attribute dictionaries of
//! every entity, one allocator per ID space and the structure-version counter.
//! Every public mutator validates all of its input before touching any of
//! that state, so an `Err` leaves the hypergraph exactly as it was.
//!
//! The version counter increases by one for each call that changed something.
//! Views, stats and matrix projections compare it against the version they
//! were computed at to detect staleness.

use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};

use crate::attrs::{AttrValue, Attributes};
use crate::config::HypergraphConfig;
use crate::error::{Error, Result};
use crate::ids::{EdgeId, IdAllocator, NodeId};
use crate::incidence::{FxIndexSet, IncidenceStore};
use crate::view::{EdgeView, NodeView};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// An undirected hypergraph with attributed nodes and edges.
#[derive(Debug)]
pub struct Hypergraph {
    pub(crate) store: IncidenceStore,
    pub(crate) node_attrs: FxHashMap<NodeId, Attributes>,
    pub(crate) edge_attrs: FxHashMap<EdgeId, Attributes>,
    pub(crate) graph_attrs: Attributes,
    pub(crate) node_ids: IdAllocator,
    pub(crate) edge_ids: IdAllocator,
    pub(crate) version: u64,
    instance: u64,
    config: HypergraphConfig,
}

impl Clone for Hypergraph {
    /// The clone is a distinct instance: caches built for `self` do not
    /// apply to it.
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            node_attrs: self.node_attrs.clone(),
            edge_attrs: self.edge_attrs.clone(),
            graph_attrs: self.graph_attrs.clone(),
            node_ids: self.node_ids.clone(),
            edge_ids: self.edge_ids.clone(),
            version: self.version,
            instance: next_instance(),
            config: self.config.clone(),
        }
    }
}

impl Default for Hypergraph {
    fn default() -> Self {
        Self::with_config(HypergraphConfig::default())
    }
}

impl Hypergraph {
    /// Creates an empty hypergraph with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HypergraphConfig) -> Self {
        Self {
            store: IncidenceStore::new(),
            node_attrs: FxHashMap::default(),
            edge_attrs: FxHashMap::default(),
            graph_attrs: Attributes::default(),
            node_ids: IdAllocator::new(config.reuse_freed_ids),
            edge_ids: IdAllocator::new(config.reuse_freed_ids),
            version: 0,
            instance: next_instance(),
            config,
        }
    }

    /// Builds a hypergraph from a list of member lists.
    ///
    /// Edges get IDs `0..n` in list order and nodes are created in order of
    /// first appearance.
    pub fn from_edge_list<I, E>(edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: IntoIterator,
        E::Item: Into<NodeId>,
    {
        let mut hg = Self::new();
        hg.add_edges_from(edges)?;
        Ok(hg)
    }

    pub fn config(&self) -> &HypergraphConfig {
        &self.config
    }

    /// Current structure version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Process-unique token of this hypergraph value.
    ///
    /// Together with [`version`](Self::version) it identifies one state of
    /// one hypergraph. Every construction and every clone gets a new token.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub(crate) fn bump(&mut self) {
        self.version += 1;
    }

    /// Read access to the raw incidence store.
    pub fn store(&self) -> &IncidenceStore {
        &self.store
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn num_nodes(&self) -> usize {
        self.store.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.store.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.store.node_count() == 0 && self.store.edge_count() == 0
    }

    pub fn has_node(&self, node: &NodeId) -> bool {
        self.store.has_node(node)
    }

    pub fn has_edge(&self, edge: &EdgeId) -> bool {
        self.store.has_edge(edge)
    }

    /// View over every node.
    pub fn nodes(&self) -> NodeView {
        NodeView::all()
    }

    /// View over every edge.
    pub fn edges(&self) -> EdgeView {
        EdgeView::all()
    }

    /// Edges that contain `node`.
    pub fn memberships(&self, node: &NodeId) -> Result<&FxIndexSet<EdgeId>> {
        self.store
            .memberships(node)
            .ok_or_else(|| Error::NodeNotFound(node.clone()))
    }

    /// Nodes contained in `edge`.
    pub fn members(&self, edge: &EdgeId) -> Result<&FxIndexSet<NodeId>> {
        self.store
            .members(edge)
            .ok_or_else(|| Error::EdgeNotFound(edge.clone()))
    }

    pub fn degree(&self, node: &NodeId) -> Result<usize> {
        self.memberships(node).map(FxIndexSet::len)
    }

    pub fn size(&self, edge: &EdgeId) -> Result<usize> {
        self.members(edge).map(FxIndexSet::len)
    }

    // =========================================================================
    // Node insertion
    // =========================================================================

    /// Inserts a node, allocating an ID when `id` is `None`.
    pub fn insert_node(&mut self, id: Option<NodeId>, attrs: Attributes) -> Result<NodeId> {
        let id = match id {
            Some(id) if self.store.has_node(&id) => return Err(Error::DuplicateNodeId(id)),
            Some(id) => id,
            None => self.fresh_node_id()?,
        };
        self.raw_insert_node(id.clone(), attrs);
        self.bump();
        Ok(id)
    }

    /// Inserts a node with a freshly allocated ID.
    pub fn add_node(&mut self) -> Result<NodeId> {
        self.insert_node(None, Attributes::default())
    }

    pub fn add_node_with_id(&mut self, id: impl Into<NodeId>) -> Result<NodeId> {
        self.insert_node(Some(id.into()), Attributes::default())
    }

    /// Inserts several nodes with explicit IDs.
    ///
    /// Fails without inserting anything if any ID is live or repeated.
    pub fn add_nodes_from<I>(&mut self, ids: I) -> Result<Vec<NodeId>>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let ids: Vec<NodeId> = ids.into_iter().map(Into::into).collect();
        let mut seen = FxHashSet::default();
        for id in &ids {
            if self.store.has_node(id) || !seen.insert(id) {
                return Err(Error::DuplicateNodeId(id.clone()));
            }
        }
        if ids.is_empty() {
            return Ok(ids);
        }
        for id in &ids {
            self.raw_insert_node(id.clone(), Attributes::default());
        }
        self.bump();
        Ok(ids)
    }

    // =========================================================================
    // Edge insertion
    // =========================================================================

    /// Inserts an edge, allocating an ID when `id` is `None`.
    ///
    /// Repeated members collapse into one incidence. Members that are not
    /// nodes yet are created with empty attributes when
    /// `materialize_missing_nodes` is set; otherwise the call fails with
    /// `NodeNotFound`. An empty member list is an `InvariantViolation`.
    pub fn insert_edge<I>(&mut self, members: I, id: Option<EdgeId>, attrs: Attributes) -> Result<EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let members = self.prepare_members(members)?;
        let id = match id {
            Some(id) if self.store.has_edge(&id) => return Err(Error::DuplicateEdgeId(id)),
            Some(id) => id,
            None => self.fresh_edge_id()?,
        };
        self.raw_insert_edge(id.clone(), members, attrs);
        self.bump();
        Ok(id)
    }

    pub fn add_edge<I>(&mut self, members: I) -> Result<EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.insert_edge(members, None, Attributes::default())
    }

    pub fn add_edge_with_id<I>(&mut self, members: I, id: impl Into<EdgeId>) -> Result<EdgeId>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        self.insert_edge(members, Some(id.into()), Attributes::default())
    }

    /// Bulk insertion from an edge list.
    ///
    /// All member lists are validated first and then committed in one pass,
    /// with a single version bump for the whole batch.
    pub fn add_edges_from<I, E>(&mut self, edges: I) -> Result<Vec<EdgeId>>
    where
        I: IntoIterator<Item = E>,
        E: IntoIterator,
        E::Item: Into<NodeId>,
    {
        let prepared = edges
            .into_iter()
            .map(|members| self.prepare_members(members))
            .collect::<Result<Vec<_>>>()?;
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let nodes_before = self.num_nodes();
        let ids = self.fresh_edge_ids(prepared.len())?;
        for (id, members) in ids.iter().zip(prepared) {
            self.raw_insert_edge(id.clone(), members, Attributes::default());
        }
        self.bump();

        tracing::debug!(
            edges = ids.len(),
            nodes_created = self.num_nodes() - nodes_before,
            "bulk edge insertion"
        );
        Ok(ids)
    }

    /// Bulk insertion of `(members, id)` pairs.
    pub fn add_edges_with_ids_from<I, E, K>(&mut self, edges: I) -> Result<Vec<EdgeId>>
    where
        I: IntoIterator<Item = (E, K)>,
        E: IntoIterator,
        E::Item: Into<NodeId>,
        K: Into<EdgeId>,
    {
        let mut prepared = Vec::new();
        let mut seen = FxHashSet::default();
        for (members, id) in edges {
            let id: EdgeId = id.into();
            let members = self.prepare_members(members)?;
            if self.store.has_edge(&id) || !seen.insert(id.clone()) {
                return Err(Error::DuplicateEdgeId(id));
            }
            prepared.push((id, members));
        }
        if prepared.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(prepared.len());
        for (id, members) in prepared {
            self.raw_insert_edge(id.clone(), members, Attributes::default());
            ids.push(id);
        }
        self.bump();
        tracing::debug!(edges = ids.len(), "bulk edge insertion with explicit ids");
        Ok(ids)
    }

    // =========================================================================
    // Incidence surgery
    // =========================================================================

    /// Adds `node` to an existing edge.
    ///
    /// A missing node is created under the same rule as [`insert_edge`](Self::insert_edge).
    pub fn add_node_to_edge(&mut self, edge: &EdgeId, node: impl Into<NodeId>) -> Result<()> {
        let node = node.into();
        if !self.store.has_edge(edge) {
            return Err(Error::EdgeNotFound(edge.clone()));
        }
        if !self.store.has_node(&node) {
            if !self.config.materialize_missing_nodes {
                return Err(Error::NodeNotFound(node));
            }
            self.raw_insert_node(node.clone(), Attributes::default());
        } else if self.store.is_member(&node, edge) {
            return Ok(());
        }
        self.store.link(&node, edge);
        self.bump();
        Ok(())
    }

    /// Removes a single incidence. Neither the node nor the edge is deleted,
    /// even if the node becomes isolated or the edge empty.
    pub fn remove_node_from_edge(&mut self, node: &NodeId, edge: &EdgeId) -> Result<()> {
        if !self.store.has_node(node) {
            return Err(Error::NodeNotFound(node.clone()));
        }
        if !self.store.has_edge(edge) {
            return Err(Error::EdgeNotFound(edge.clone()));
        }
        if !self.store.unlink(node, edge) {
            return Err(Error::invariant(format!(
                "node {node} is not a member of edge {edge}"
            )));
        }
        self.bump();
        Ok(())
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Removes a node, detaching it from every edge. Edges left empty stay.
    ///
    /// Returns the node's attributes.
    pub fn remove_node(&mut self, node: &NodeId) -> Result<Attributes> {
        if !self.store.has_node(node) {
            return Err(Error::NodeNotFound(node.clone()));
        }
        let attrs = self.raw_remove_node(node);
        self.bump();
        Ok(attrs)
    }

    /// Removes an edge, leaving its members in place.
    ///
    /// Returns the edge's attributes.
    pub fn remove_edge(&mut self, edge: &EdgeId) -> Result<Attributes> {
        if !self.store.has_edge(edge) {
            return Err(Error::EdgeNotFound(edge.clone()));
        }
        let attrs = self.raw_remove_edge(edge);
        self.bump();
        Ok(attrs)
    }

    /// Removes several nodes. Fails without removing any if one is absent.
    pub fn remove_nodes_from<I>(&mut self, nodes: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let nodes: FxIndexSet<NodeId> = nodes.into_iter().map(Into::into).collect();
        if let Some(missing) = nodes.iter().find(|n| !self.store.has_node(n)) {
            return Err(Error::NodeNotFound(missing.clone()));
        }
        if nodes.is_empty() {
            return Ok(());
        }
        for node in &nodes {
            self.raw_remove_node(node);
        }
        self.bump();
        Ok(())
    }

    /// Removes several edges. Fails without removing any if one is absent.
    pub fn remove_edges_from<I>(&mut self, edges: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<EdgeId>,
    {
        let edges: FxIndexSet<EdgeId> = edges.into_iter().map(Into::into).collect();
        if let Some(missing) = edges.iter().find(|e| !self.store.has_edge(e)) {
            return Err(Error::EdgeNotFound(missing.clone()));
        }
        if edges.is_empty() {
            return Ok(());
        }
        for edge in &edges {
            self.raw_remove_edge(edge);
        }
        self.bump();
        Ok(())
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn node_attrs(&self, node: &NodeId) -> Result<&Attributes> {
        self.node_attrs
            .get(node)
            .ok_or_else(|| Error::NodeNotFound(node.clone()))
    }

    pub fn edge_attrs(&self, edge: &EdgeId) -> Result<&Attributes> {
        self.edge_attrs
            .get(edge)
            .ok_or_else(|| Error::EdgeNotFound(edge.clone()))
    }

    pub fn graph_attrs(&self) -> &Attributes {
        &self.graph_attrs
    }

    /// A single node attribute; `Ok(None)` if the node lacks the key.
    pub fn node_attr(&self, node: &NodeId, key: &str) -> Result<Option<&AttrValue>> {
        Ok(self.node_attrs(node)?.get(key))
    }

    /// A single edge attribute; `Ok(None)` if the edge lacks the key.
    pub fn edge_attr(&self, edge: &EdgeId, key: &str) -> Result<Option<&AttrValue>> {
        Ok(self.edge_attrs(edge)?.get(key))
    }

    pub fn set_node_attr(
        &mut self,
        node: &NodeId,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let attrs = self
            .node_attrs
            .get_mut(node)
            .ok_or_else(|| Error::NodeNotFound(node.clone()))?;
        attrs.insert(key.into(), value.into());
        self.bump();
        Ok(())
    }

    pub fn set_edge_attr(
        &mut self,
        edge: &EdgeId,
        key: impl Into<String>,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let attrs = self
            .edge_attrs
            .get_mut(edge)
            .ok_or_else(|| Error::EdgeNotFound(edge.clone()))?;
        attrs.insert(key.into(), value.into());
        self.bump();
        Ok(())
    }

    pub fn set_graph_attr(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.graph_attrs.insert(key.into(), value.into());
        self.bump();
    }

    pub fn remove_node_attr(&mut self, node: &NodeId, key: &str) -> Result<Option<AttrValue>> {
        let attrs = self
            .node_attrs
            .get_mut(node)
            .ok_or_else(|| Error::NodeNotFound(node.clone()))?;
        let removed = attrs.remove(key);
        if removed.is_some() {
            self.bump();
        }
        Ok(removed)
    }

    pub fn remove_edge_attr(&mut self, edge: &EdgeId, key: &str) -> Result<Option<AttrValue>> {
        let attrs = self
            .edge_attrs
            .get_mut(edge)
            .ok_or_else(|| Error::EdgeNotFound(edge.clone()))?;
        let removed = attrs.remove(key);
        if removed.is_some() {
            self.bump();
        }
        Ok(removed)
    }

    pub fn remove_graph_attr(&mut self, key: &str) -> Option<AttrValue> {
        let removed = self.graph_attrs.remove(key);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Merges attribute dictionaries into several nodes at once.
    ///
    /// Every node is checked before any attribute is written.
    pub fn set_node_attributes<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (NodeId, Attributes)>,
    {
        let values: Vec<_> = values.into_iter().collect();
        if let Some((missing, _)) = values.iter().find(|(n, _)| !self.store.has_node(n)) {
            return Err(Error::NodeNotFound(missing.clone()));
        }
        if values.is_empty() {
            return Ok(());
        }
        for (node, attrs) in values {
            self.node_attrs.entry(node).or_default().extend(attrs);
        }
        self.bump();
        Ok(())
    }

    /// Merges attribute dictionaries into several edges at once.
    pub fn set_edge_attributes<I>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = (EdgeId, Attributes)>,
    {
        let values: Vec<_> = values.into_iter().collect();
        if let Some((missing, _)) = values.iter().find(|(e, _)| !self.store.has_edge(e)) {
            return Err(Error::EdgeNotFound(missing.clone()));
        }
        if values.is_empty() {
            return Ok(());
        }
        for (edge, attrs) in values {
            self.edge_attrs.entry(edge).or_default().extend(attrs);
        }
        self.bump();
        Ok(())
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Every node with its attributes, in insertion order.
    pub fn nodes_with_attrs(&self) -> impl Iterator<Item = (&NodeId, &Attributes)> + '_ {
        self.store
            .node_ids()
            .filter_map(move |n| self.node_attrs.get(n).map(|attrs| (n, attrs)))
    }

    /// Every edge with its members and attributes, in insertion order.
    pub fn edges_with_members(
        &self,
    ) -> impl Iterator<Item = (&EdgeId, &FxIndexSet<NodeId>, &Attributes)> + '_ {
        self.store
            .iter_members()
            .filter_map(move |(e, members)| self.edge_attrs.get(e).map(|attrs| (e, members, attrs)))
    }

    /// Member lists of every edge, in insertion order.
    pub fn edge_list(&self) -> Vec<Vec<NodeId>> {
        self.store
            .iter_members()
            .map(|(_, members)| members.iter().cloned().collect())
            .collect()
    }

    /// Verifies incidence duality and attribute-store coverage.
    pub fn check_invariants(&self) -> Result<()> {
        self.store.check_duality()?;
        if self.node_attrs.len() != self.store.node_count() {
            return Err(Error::invariant("node attribute store out of sync"));
        }
        if let Some(n) = self.store.node_ids().find(|n| !self.node_attrs.contains_key(n)) {
            return Err(Error::invariant(format!("node {n} has no attribute dictionary")));
        }
        if self.edge_attrs.len() != self.store.edge_count() {
            return Err(Error::invariant("edge attribute store out of sync"));
        }
        if let Some(e) = self.store.edge_ids().find(|e| !self.edge_attrs.contains_key(e)) {
            return Err(Error::invariant(format!("edge {e} has no attribute dictionary")));
        }
        Ok(())
    }

    // =========================================================================
    // Unversioned primitives shared with edits and the simplicial complex.
    // Callers validate first and bump once afterwards.
    // =========================================================================

    pub(crate) fn fresh_node_id(&mut self) -> Result<NodeId> {
        let store = &self.store;
        self.node_ids
            .next_id(|i| store.has_node(&NodeId::from(i)))
            .map(NodeId::from)
            .ok_or_else(|| Error::value("node id space exhausted"))
    }

    pub(crate) fn fresh_edge_id(&mut self) -> Result<EdgeId> {
        let store = &self.store;
        self.edge_ids
            .next_id(|i| store.has_edge(&EdgeId::from(i)))
            .map(EdgeId::from)
            .ok_or_else(|| Error::value("edge id space exhausted"))
    }

    /// Allocates `n` distinct edge IDs without inserting anything. On failure
    /// the allocator is left as it was.
    pub(crate) fn fresh_edge_ids(&mut self, n: usize) -> Result<Vec<EdgeId>> {
        let saved = self.edge_ids.clone();
        let ids = (0..n).map(|_| self.fresh_edge_id()).collect::<Result<Vec<_>>>();
        if ids.is_err() {
            self.edge_ids = saved;
        }
        ids
    }

    /// Deduplicates a member list and checks it against the configuration.
    pub(crate) fn prepare_members<I>(&self, members: I) -> Result<FxIndexSet<NodeId>>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let members: FxIndexSet<NodeId> = members.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(Error::invariant("an edge needs at least one member"));
        }
        if !self.config.materialize_missing_nodes {
            if let Some(missing) = members.iter().find(|n| !self.store.has_node(n)) {
                return Err(Error::NodeNotFound(missing.clone()));
            }
        }
        Ok(members)
    }

    pub(crate) fn raw_insert_node(&mut self, id: NodeId, attrs: Attributes) {
        self.node_ids.observe(id.id());
        if self.store.insert_node(id.clone()) {
            self.node_attrs.insert(id, attrs);
        }
    }

    pub(crate) fn raw_insert_edge(&mut self, id: EdgeId, members: FxIndexSet<NodeId>, attrs: Attributes) {
        self.edge_ids.observe(id.id());
        for node in &members {
            if !self.store.has_node(node) {
                self.raw_insert_node(node.clone(), Attributes::default());
            }
        }
        self.store.insert_edge(id.clone(), members);
        self.edge_attrs.insert(id, attrs);
    }

    pub(crate) fn raw_remove_node(&mut self, node: &NodeId) -> Attributes {
        self.store.remove_node(node);
        self.node_ids.release(node.id());
        self.node_attrs.remove(node).unwrap_or_default()
    }

    pub(crate) fn raw_remove_edge(&mut self, edge: &EdgeId) -> Attributes {
        self.store.remove_edge(edge);
        self.edge_ids.release(edge.id());
        self.edge_attrs.remove(edge).unwrap_or_default()
    }
}
