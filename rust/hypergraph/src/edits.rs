// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural edits built on the incidence primitives.
//!
//! Duplicate merging, relabelling, edge swaps and cleanup. Each edit checks
//! its preconditions up front and bumps the version once if, and only if,
//! it changed the structure.

use serde::{Deserialize, Serialize};

use crate::attrs::{AttrValue, Attributes};
use crate::config::MergePolicy;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::{EdgeId, NodeId};

/// What a relabel does when the target ID is already live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelabelPolicy {
    /// Fail with a duplicate-ID error.
    #[default]
    Reject,
    /// Fold the relabelled entity into the live one.
    Merge,
}

/// Steps performed by [`Hypergraph::cleanup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    /// Remove nodes that belong to no edge.
    pub remove_isolates: bool,
    /// Remove edges with at most one member.
    pub remove_singletons: bool,
    /// Collapse edges with identical members.
    pub merge_multiedges: bool,
    /// Keep only the largest connected component.
    pub keep_largest_component: bool,
    /// Renumber nodes and edges to consecutive integers.
    pub relabel: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_isolates: true,
            remove_singletons: true,
            merge_multiedges: true,
            keep_largest_component: true,
            relabel: true,
        }
    }
}

impl Hypergraph {
    // =========================================================================
    // Duplicates
    // =========================================================================

    /// Edge-ID groups with identical member sets, canonical edge first.
    pub fn duplicate_edge_groups(&self) -> Vec<Vec<EdgeId>> {
        self.store.duplicate_edge_groups()
    }

    /// Redundant copies of edges; the first-seen edge of each group is omitted.
    pub fn duplicate_edges(&self) -> Vec<EdgeId> {
        self.store.duplicate_edges()
    }

    /// Redundant nodes by identical memberships; first-seen omitted.
    pub fn duplicate_nodes(&self) -> Vec<NodeId> {
        self.store.duplicate_nodes()
    }

    /// Collapses each duplicate group into its canonical edge using the
    /// configured merge policy. Returns the number of edges removed.
    pub fn merge_duplicate_edges(&mut self) -> usize {
        let policy = self.config().merge_policy;
        self.merge_duplicate_edges_with(policy, None)
    }

    /// Collapses duplicate groups into their canonical edge.
    ///
    /// Attributes of the removed copies are merged into the survivor under
    /// `policy`, in group order. With `multiplicity_key`, the survivor records
    /// the size of its group under that key.
    pub fn merge_duplicate_edges_with(
        &mut self,
        policy: MergePolicy,
        multiplicity_key: Option<&str>,
    ) -> usize {
        let groups = self.store.duplicate_edge_groups();
        if groups.is_empty() {
            return 0;
        }

        let mut removed = 0;
        for group in &groups {
            let Some((survivor, copies)) = group.split_first() else {
                continue;
            };
            let mut merged = self.edge_attrs.remove(survivor).unwrap_or_default();
            for copy in copies {
                let attrs = self.raw_remove_edge(copy);
                merge_attrs(&mut merged, attrs, policy);
                removed += 1;
            }
            if let Some(key) = multiplicity_key {
                merged.insert(key.to_string(), AttrValue::from(group.len()));
            }
            self.edge_attrs.insert(survivor.clone(), merged);
        }
        self.bump();

        tracing::debug!(groups = groups.len(), removed, "merged duplicate edges");
        removed
    }

    // =========================================================================
    // Relabelling
    // =========================================================================

    /// Changes a node's ID.
    ///
    /// The node keeps its position in enumeration order and in every edge.
    /// If `new` is live, `Reject` fails with `DuplicateNodeId` and `Merge`
    /// moves every incidence and attribute of `old` onto `new`.
    pub fn relabel_node(&mut self, old: &NodeId, new: impl Into<NodeId>, policy: RelabelPolicy) -> Result<()> {
        let new = new.into();
        if !self.store.has_node(old) {
            return Err(Error::NodeNotFound(old.clone()));
        }
        if *old == new {
            return Ok(());
        }

        if self.store.has_node(&new) {
            if policy == RelabelPolicy::Reject {
                return Err(Error::DuplicateNodeId(new));
            }
            self.store.merge_node_into(old, &new);
            let attrs = self.node_attrs.remove(old).unwrap_or_default();
            let merge_policy = self.config().merge_policy;
            if let Some(target) = self.node_attrs.get_mut(&new) {
                merge_attrs(target, attrs, merge_policy);
            }
            tracing::debug!(from = %old, into = %new, "merged node by relabel");
        } else {
            self.store.rename_node(old, new.clone());
            let attrs = self.node_attrs.remove(old).unwrap_or_default();
            self.node_attrs.insert(new.clone(), attrs);
            self.node_ids.observe(new.id());
        }
        self.node_ids.release(old.id());
        self.bump();
        Ok(())
    }

    /// Changes an edge's ID. Same semantics as [`relabel_node`](Self::relabel_node);
    /// a merge unions the two member sets.
    pub fn relabel_edge(&mut self, old: &EdgeId, new: impl Into<EdgeId>, policy: RelabelPolicy) -> Result<()> {
        let new = new.into();
        if !self.store.has_edge(old) {
            return Err(Error::EdgeNotFound(old.clone()));
        }
        if *old == new {
            return Ok(());
        }

        if self.store.has_edge(&new) {
            if policy == RelabelPolicy::Reject {
                return Err(Error::DuplicateEdgeId(new));
            }
            self.store.merge_edge_into(old, &new);
            let attrs = self.edge_attrs.remove(old).unwrap_or_default();
            let merge_policy = self.config().merge_policy;
            if let Some(target) = self.edge_attrs.get_mut(&new) {
                merge_attrs(target, attrs, merge_policy);
            }
            tracing::debug!(from = %old, into = %new, "merged edge by relabel");
        } else {
            self.store.rename_edge(old, new.clone());
            let attrs = self.edge_attrs.remove(old).unwrap_or_default();
            self.edge_attrs.insert(new.clone(), attrs);
            self.edge_ids.observe(new.id());
        }
        self.edge_ids.release(old.id());
        self.bump();
        Ok(())
    }

    // =========================================================================
    // Swaps
    // =========================================================================

    /// Moves `n1` from `e1` to `e2` and `n2` from `e2` to `e1`.
    ///
    /// Node degrees and edge sizes are unchanged. Fails with
    /// `InvariantViolation` unless `n1 ∈ e1`, `n2 ∈ e2`, `n1 ∉ e2` and
    /// `n2 ∉ e1`.
    pub fn double_edge_swap(&mut self, n1: &NodeId, n2: &NodeId, e1: &EdgeId, e2: &EdgeId) -> Result<()> {
        for node in [n1, n2] {
            if !self.store.has_node(node) {
                return Err(Error::NodeNotFound(node.clone()));
            }
        }
        for edge in [e1, e2] {
            if !self.store.has_edge(edge) {
                return Err(Error::EdgeNotFound(edge.clone()));
            }
        }
        if !self.store.is_member(n1, e1) || !self.store.is_member(n2, e2) {
            return Err(Error::invariant(format!(
                "swap needs {n1} in edge {e1} and {n2} in edge {e2}"
            )));
        }
        if self.store.is_member(n1, e2) || self.store.is_member(n2, e1) {
            return Err(Error::invariant(format!(
                "swapping {n1} and {n2} between {e1} and {e2} would repeat a member"
            )));
        }

        self.store.unlink(n1, e1);
        self.store.unlink(n2, e2);
        self.store.link(n1, e2);
        self.store.link(n2, e1);
        self.bump();
        Ok(())
    }

    // =========================================================================
    // Cleanup
    // =========================================================================

    /// Removes every node that belongs to no edge.
    pub fn remove_isolates(&mut self) -> Vec<NodeId> {
        let isolates: Vec<NodeId> = self
            .store
            .iter_memberships()
            .filter(|(_, edges)| edges.is_empty())
            .map(|(n, _)| n.clone())
            .collect();
        if isolates.is_empty() {
            return isolates;
        }
        for node in &isolates {
            self.raw_remove_node(node);
        }
        self.bump();
        tracing::debug!(count = isolates.len(), "removed isolated nodes");
        isolates
    }

    /// Removes every edge with zero or one member.
    pub fn remove_singleton_edges(&mut self) -> Vec<EdgeId> {
        let singletons: Vec<EdgeId> = self
            .store
            .iter_members()
            .filter(|(_, members)| members.len() <= 1)
            .map(|(e, _)| e.clone())
            .collect();
        if singletons.is_empty() {
            return singletons;
        }
        for edge in &singletons {
            self.raw_remove_edge(edge);
        }
        self.bump();
        tracing::debug!(count = singletons.len(), "removed singleton edges");
        singletons
    }

    /// Keeps only the largest connected component, dropping edges that lie
    /// entirely outside it.
    pub fn keep_largest_component(&mut self) -> usize {
        let keep = self.largest_connected_component();
        let drop_nodes: Vec<NodeId> = self
            .store
            .node_ids()
            .filter(|n| !keep.contains(*n))
            .cloned()
            .collect();
        if drop_nodes.is_empty() {
            return 0;
        }
        let drop_edges: Vec<EdgeId> = self
            .store
            .iter_members()
            .filter(|(_, members)| !members.iter().any(|m| keep.contains(m)))
            .map(|(e, _)| e.clone())
            .collect();
        for edge in &drop_edges {
            self.raw_remove_edge(edge);
        }
        for node in &drop_nodes {
            self.raw_remove_node(node);
        }
        self.bump();
        drop_nodes.len()
    }

    /// Applies the selected cleanup steps in order: multi-edges, singleton
    /// edges, isolates, largest component, relabel.
    pub fn cleanup(&mut self, options: CleanupOptions) {
        let before = (self.num_nodes(), self.num_edges());

        if options.merge_multiedges {
            self.merge_duplicate_edges();
        }
        if options.remove_singletons {
            self.remove_singleton_edges();
        }
        if options.remove_isolates {
            self.remove_isolates();
        }
        if options.keep_largest_component {
            self.keep_largest_component();
        }
        if options.relabel && !self.is_relabelled() {
            let version = self.version;
            *self = self.convert_labels_to_integers(None);
            self.version = version + 1;
        }

        tracing::debug!(
            nodes_before = before.0,
            edges_before = before.1,
            nodes = self.num_nodes(),
            edges = self.num_edges(),
            "cleanup"
        );
    }

    /// Returns `true` if nodes and edges are already numbered `0..n` in order.
    fn is_relabelled(&self) -> bool {
        self.store
            .node_ids()
            .enumerate()
            .all(|(i, n)| n.as_int() == Some(i as i64))
            && self
                .store
                .edge_ids()
                .enumerate()
                .all(|(i, e)| e.as_int() == Some(i as i64))
    }
}

/// Folds `incoming` into `target` under `policy`.
pub(crate) fn merge_attrs(target: &mut Attributes, incoming: Attributes, policy: MergePolicy) {
    match policy {
        MergePolicy::LastWriteWins => target.extend(incoming),
        MergePolicy::FirstWriteWins => {
            for (key, value) in incoming {
                target.entry(key).or_insert(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::attributes;
    use crate::config::HypergraphConfig;

    fn triple_duplicate() -> Hypergraph {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![1, 2], vec![2, 1], vec![3, 4]]).unwrap();
        hg.set_edge_attr(&EdgeId::from(0), "w", 1).unwrap();
        hg.set_edge_attr(&EdgeId::from(1), "w", 2).unwrap();
        hg.set_edge_attr(&EdgeId::from(2), "label", "c").unwrap();
        hg
    }

    #[test]
    fn duplicates_report_copies_only() {
        let hg = triple_duplicate();
        assert_eq!(hg.duplicate_edges(), vec![EdgeId::from(1), EdgeId::from(2)]);
    }

    #[test]
    fn merge_duplicates_last_write_wins() {
        let mut hg = triple_duplicate();
        assert_eq!(hg.merge_duplicate_edges(), 2);
        assert_eq!(hg.num_edges(), 2);
        let attrs = hg.edge_attrs(&EdgeId::from(0)).unwrap();
        assert_eq!(attrs.get("w"), Some(&AttrValue::Int(2)));
        assert_eq!(attrs.get("label"), Some(&AttrValue::from("c")));
        hg.check_invariants().unwrap();
    }

    #[test]
    fn merge_duplicates_first_write_wins_with_multiplicity() {
        let mut hg = triple_duplicate();
        hg.merge_duplicate_edges_with(MergePolicy::FirstWriteWins, Some("multiplicity"));
        let attrs = hg.edge_attrs(&EdgeId::from(0)).unwrap();
        assert_eq!(attrs.get("w"), Some(&AttrValue::Int(1)));
        assert_eq!(attrs.get("multiplicity"), Some(&AttrValue::Int(3)));
    }

    #[test]
    fn merge_duplicates_is_idempotent() {
        let mut hg = triple_duplicate();
        hg.merge_duplicate_edges();
        let v = hg.version();
        assert_eq!(hg.merge_duplicate_edges(), 0);
        assert_eq!(hg.version(), v);
    }

    #[test]
    fn relabel_keeps_position() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3]]).unwrap();
        hg.set_node_attr(&NodeId::from(2), "name", "two").unwrap();
        hg.relabel_node(&NodeId::from(2), "b", RelabelPolicy::Reject).unwrap();

        let order: Vec<String> = hg.store().node_ids().map(ToString::to_string).collect();
        assert_eq!(order, vec!["1", "b", "3"]);
        assert_eq!(
            hg.node_attr(&NodeId::from("b"), "name").unwrap(),
            Some(&AttrValue::from("two"))
        );
        assert!(hg.node_attrs(&NodeId::from(2)).is_err());
        hg.check_invariants().unwrap();
    }

    #[test]
    fn relabel_onto_live_id() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3]]).unwrap();
        let v = hg.version();
        let err = hg
            .relabel_node(&NodeId::from(1), 3, RelabelPolicy::Reject)
            .unwrap_err();
        assert_eq!(err, Error::DuplicateNodeId(NodeId::from(3)));
        assert_eq!(hg.version(), v);

        hg.relabel_node(&NodeId::from(1), 3, RelabelPolicy::Merge).unwrap();
        assert!(!hg.has_node(&NodeId::from(1)));
        assert_eq!(hg.degree(&NodeId::from(3)).unwrap(), 2);
        hg.check_invariants().unwrap();
    }

    #[test]
    fn relabel_edge_merge_unions_members() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![3]]).unwrap();
        hg.relabel_edge(&EdgeId::from(1), 0, RelabelPolicy::Merge).unwrap();
        assert_eq!(hg.num_edges(), 1);
        assert_eq!(hg.size(&EdgeId::from(0)).unwrap(), 3);
    }

    #[test]
    fn double_edge_swap_preserves_degrees() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![3, 4]]).unwrap();
        hg.double_edge_swap(&NodeId::from(1), &NodeId::from(3), &EdgeId::from(0), &EdgeId::from(1))
            .unwrap();
        assert!(hg.store().is_member(&NodeId::from(1), &EdgeId::from(1)));
        assert!(hg.store().is_member(&NodeId::from(3), &EdgeId::from(0)));
        assert_eq!(hg.size(&EdgeId::from(0)).unwrap(), 2);
        hg.check_invariants().unwrap();

        let err = hg
            .double_edge_swap(&NodeId::from(1), &NodeId::from(3), &EdgeId::from(0), &EdgeId::from(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn remove_isolates_is_noop_without_isolates() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2]]).unwrap();
        let v = hg.version();
        assert!(hg.remove_isolates().is_empty());
        assert_eq!(hg.version(), v);

        hg.add_node_with_id(9).unwrap();
        assert_eq!(hg.remove_isolates(), vec![NodeId::from(9)]);
    }

    #[test]
    fn full_cleanup() {
        let mut hg = Hypergraph::new();
        hg.insert_edge(["a", "b"], None, attributes([("w", 1)])).unwrap();
        hg.add_edge(["b", "a"]).unwrap();
        hg.add_edge(["b", "c"]).unwrap();
        hg.add_edge(["x"]).unwrap();
        hg.add_edge(["y", "z"]).unwrap();
        hg.add_node_with_id("lonely").unwrap();
        let v = hg.version();

        hg.cleanup(CleanupOptions::default());

        assert_eq!(hg.num_nodes(), 3);
        assert_eq!(hg.num_edges(), 2);
        assert!(hg.has_node(&NodeId::from(0)));
        assert!(hg.has_edge(&EdgeId::from(1)));
        assert!(hg.version() > v);
        hg.check_invariants().unwrap();
    }

    #[test]
    fn merge_policy_comes_from_config() {
        let config = HypergraphConfig::default().with_merge_policy(MergePolicy::FirstWriteWins);
        let mut hg = Hypergraph::with_config(config);
        hg.add_edges_from(vec![vec![1, 2], vec![1, 2]]).unwrap();
        hg.set_edge_attr(&EdgeId::from(0), "w", 1).unwrap();
        hg.set_edge_attr(&EdgeId::from(1), "w", 5).unwrap();
        hg.merge_duplicate_edges();
        assert_eq!(hg.edge_attr(&EdgeId::from(0), "w").unwrap(), Some(&AttrValue::Int(1)));
    }
}
