// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connectivity queries and derived sub-structures.
//!
//! Two nodes are adjacent when they share an edge, so components are found by
//! breadth-first search over node → edge → node hops. Derived structures
//! (dual, sub-hypergraphs, relabelled copies) are new [`Hypergraph`] values
//! built from the store's enumeration order.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use crate::attrs::{AttrValue, Attributes};
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::{EdgeId, Id, NodeId};
use crate::incidence::FxIndexSet;

impl Hypergraph {
    // =========================================================================
    // Connected components
    // =========================================================================

    /// Connected components in order of their first node.
    ///
    /// Isolated nodes form singleton components. Nodes inside each component
    /// are listed in BFS order.
    pub fn connected_components(&self) -> Vec<FxIndexSet<NodeId>> {
        let n = self.num_nodes();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for (start, node) in self.store.node_ids().enumerate() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            components.push(self.bfs_from(node, &mut visited));
        }

        components
    }

    pub fn number_connected_components(&self) -> usize {
        self.connected_components().len()
    }

    /// Returns `true` when there is exactly one component.
    ///
    /// A hypergraph with no nodes is not connected.
    pub fn is_connected(&self) -> bool {
        let Some(first) = self.store.node_ids().next() else {
            return false;
        };
        let mut visited = vec![false; self.num_nodes()];
        visited[0] = true;
        self.bfs_from(first, &mut visited).len() == self.num_nodes()
    }

    /// The component with the most nodes; the earliest one wins ties.
    pub fn largest_connected_component(&self) -> FxIndexSet<NodeId> {
        let mut best = FxIndexSet::default();
        for component in self.connected_components() {
            if component.len() > best.len() {
                best = component;
            }
        }
        best
    }

    /// The component containing `node`.
    pub fn node_connected_component(&self, node: &NodeId) -> Result<FxIndexSet<NodeId>> {
        let start = self
            .store
            .node_index(node)
            .ok_or_else(|| Error::NodeNotFound(node.clone()))?;
        let mut visited = vec![false; self.num_nodes()];
        visited[start] = true;
        Ok(self.bfs_from(node, &mut visited))
    }

    fn bfs_from(&self, start: &NodeId, visited: &mut [bool]) -> FxIndexSet<NodeId> {
        let mut component = FxIndexSet::default();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());

        while let Some(node) = queue.pop_front() {
            if let Some(edges) = self.store.memberships(&node) {
                for edge in edges {
                    let Some(members) = self.store.members(edge) else {
                        continue;
                    };
                    for neighbor in members {
                        if let Some(idx) = self.store.node_index(neighbor) {
                            if !visited[idx] {
                                visited[idx] = true;
                                queue.push_back(neighbor.clone());
                            }
                        }
                    }
                }
            }
            component.insert(node);
        }

        component
    }

    // =========================================================================
    // Edge size summaries
    // =========================================================================

    /// Distinct edge sizes, ascending.
    pub fn unique_edge_sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.store.iter_members().map(|(_, m)| m.len()).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    /// Largest edge order (size minus one); `None` without edges.
    pub fn max_edge_order(&self) -> Option<usize> {
        self.store
            .iter_members()
            .map(|(_, m)| m.len().saturating_sub(1))
            .max()
    }

    // =========================================================================
    // Derived structures
    // =========================================================================

    /// The dual hypergraph: every edge becomes a node and every node an edge.
    ///
    /// IDs carry over (edge `e` becomes node `e`) together with attributes.
    /// Isolated nodes become empty edges.
    pub fn dual(&self) -> Hypergraph {
        let mut dual = Hypergraph::with_config(self.config().clone());
        for (edge, _, attrs) in self.edges_with_members() {
            dual.raw_insert_node(NodeId(edge.id().clone()), attrs.clone());
        }
        for (node, attrs) in self.nodes_with_attrs() {
            let members: FxIndexSet<NodeId> = self
                .store
                .memberships(node)
                .into_iter()
                .flatten()
                .map(|e| NodeId(e.id().clone()))
                .collect();
            dual.raw_insert_edge(EdgeId(node.id().clone()), members, attrs.clone());
        }
        dual.graph_attrs = self.graph_attrs.clone();
        dual.bump();
        dual
    }

    /// The sub-hypergraph induced by `nodes`: those nodes plus every edge whose
    /// members all lie among them.
    pub fn subhypergraph<I>(&self, nodes: I) -> Result<Hypergraph>
    where
        I: IntoIterator,
        I::Item: Into<NodeId>,
    {
        let keep: FxIndexSet<NodeId> = nodes.into_iter().map(Into::into).collect();
        if let Some(missing) = keep.iter().find(|n| !self.has_node(n)) {
            return Err(Error::NodeNotFound(missing.clone()));
        }

        let mut sub = Hypergraph::with_config(self.config().clone());
        for (node, attrs) in self.nodes_with_attrs() {
            if keep.contains(node) {
                sub.raw_insert_node(node.clone(), attrs.clone());
            }
        }
        for (edge, members, attrs) in self.edges_with_members() {
            if members.iter().all(|m| keep.contains(m)) {
                sub.raw_insert_edge(edge.clone(), members.clone(), attrs.clone());
            }
        }
        sub.graph_attrs = self.graph_attrs.clone();
        sub.bump();
        Ok(sub)
    }

    /// The sub-hypergraph made of `edges` and their members.
    pub fn edge_subhypergraph<I>(&self, edges: I) -> Result<Hypergraph>
    where
        I: IntoIterator,
        I::Item: Into<EdgeId>,
    {
        let keep: FxIndexSet<EdgeId> = edges.into_iter().map(Into::into).collect();
        if let Some(missing) = keep.iter().find(|e| !self.has_edge(e)) {
            return Err(Error::EdgeNotFound(missing.clone()));
        }

        let mut used = FxIndexSet::default();
        for edge in &keep {
            used.extend(self.members(edge)?.iter().cloned());
        }

        let mut sub = Hypergraph::with_config(self.config().clone());
        for (node, attrs) in self.nodes_with_attrs() {
            if used.contains(node) {
                sub.raw_insert_node(node.clone(), attrs.clone());
            }
        }
        for (edge, members, attrs) in self.edges_with_members() {
            if keep.contains(edge) {
                sub.raw_insert_edge(edge.clone(), members.clone(), attrs.clone());
            }
        }
        sub.graph_attrs = self.graph_attrs.clone();
        sub.bump();
        Ok(sub)
    }

    /// A copy with nodes and edges renumbered `0..n` in enumeration order.
    ///
    /// When `label_attr` is given, each entity keeps its old ID under that
    /// attribute key.
    pub fn convert_labels_to_integers(&self, label_attr: Option<&str>) -> Hypergraph {
        let mut out = Hypergraph::with_config(self.config().clone());

        let mut node_map = FxHashMap::default();
        for (i, (node, attrs)) in self.nodes_with_attrs().enumerate() {
            let new_id = NodeId::from(i);
            node_map.insert(node, new_id.clone());
            out.raw_insert_node(new_id, labelled(attrs, label_attr, node.id()));
        }
        for (i, (edge, members, attrs)) in self.edges_with_members().enumerate() {
            let members: FxIndexSet<NodeId> = members
                .iter()
                .filter_map(|m| node_map.get(m).cloned())
                .collect();
            out.raw_insert_edge(EdgeId::from(i), members, labelled(attrs, label_attr, edge.id()));
        }
        out.graph_attrs = self.graph_attrs.clone();
        out.bump();
        out
    }
}

fn labelled(attrs: &Attributes, label_attr: Option<&str>, old: &Id) -> Attributes {
    let mut attrs = attrs.clone();
    if let Some(key) = label_attr {
        let label = match old {
            Id::Int(i) => AttrValue::Int(*i),
            Id::Name(s) => AttrValue::String(s.clone()),
        };
        attrs.insert(key.to_string(), label);
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_components() -> Hypergraph {
        Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3], vec![4, 5]]).unwrap()
    }

    fn ids<'a>(set: impl IntoIterator<Item = &'a NodeId>) -> Vec<NodeId> {
        let mut v: Vec<NodeId> = set.into_iter().cloned().collect();
        v.sort();
        v
    }

    fn nodes(raw: &[i64]) -> Vec<NodeId> {
        raw.iter().map(|&i| NodeId::from(i)).collect()
    }

    #[test]
    fn components() {
        let mut hg = two_components();
        hg.add_node_with_id(6).unwrap();
        let comps = hg.connected_components();
        assert_eq!(comps.len(), 3);
        assert_eq!(ids(&comps[0]), nodes(&[1, 2, 3]));
        assert_eq!(ids(&comps[1]), nodes(&[4, 5]));
        assert_eq!(ids(&comps[2]), nodes(&[6]));
        assert!(!hg.is_connected());
        assert_eq!(ids(&hg.largest_connected_component()).len(), 3);
        assert_eq!(
            ids(&hg.node_connected_component(&NodeId::from(5)).unwrap()),
            nodes(&[4, 5])
        );
    }

    #[test]
    fn empty_is_not_connected() {
        assert!(!Hypergraph::new().is_connected());
        assert_eq!(Hypergraph::new().number_connected_components(), 0);
        assert!(Hypergraph::from_edge_list(vec![vec![1, 2, 3]]).unwrap().is_connected());
    }

    #[test]
    fn unknown_node_component() {
        let err = two_components()
            .node_connected_component(&NodeId::from(99))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn dual_swaps_roles() {
        let hg = two_components();
        let dual = hg.dual();
        assert_eq!(dual.num_nodes(), 3);
        assert_eq!(dual.num_edges(), 5);
        assert_eq!(dual.size(&EdgeId::from(2)).unwrap(), 2);
        assert_eq!(dual.degree(&NodeId::from(1)).unwrap(), 2);
        dual.check_invariants().unwrap();
    }

    #[test]
    fn induced_subhypergraph() {
        let hg = two_components();
        let sub = hg.subhypergraph([1, 2, 4]).unwrap();
        assert_eq!(sub.num_nodes(), 3);
        assert_eq!(sub.num_edges(), 1);
        assert!(sub.has_edge(&EdgeId::from(0)));
        sub.check_invariants().unwrap();
    }

    #[test]
    fn edge_induced_subhypergraph() {
        let hg = two_components();
        let sub = hg.edge_subhypergraph([1, 2]).unwrap();
        assert_eq!(sub.num_edges(), 2);
        assert_eq!(ids(sub.store().node_ids()), nodes(&[2, 3, 4, 5]));
        assert!(hg.edge_subhypergraph([7]).unwrap_err().is_not_found());
    }

    #[test]
    fn relabel_to_integers() {
        let mut hg = Hypergraph::new();
        hg.add_edge_with_id(["a", "b"], "x").unwrap();
        hg.add_edge_with_id(["b", "c"], "y").unwrap();
        let mut out = hg.convert_labels_to_integers(Some("label"));
        assert_eq!(out.members(&EdgeId::from(1)).unwrap().len(), 2);
        assert_eq!(
            out.node_attr(&NodeId::from(2), "label").unwrap(),
            Some(&AttrValue::from("c"))
        );
        assert_eq!(
            out.edge_attr(&EdgeId::from(0), "label").unwrap(),
            Some(&AttrValue::from("x"))
        );
        assert_eq!(out.add_node().unwrap(), NodeId::from(3));
    }

    #[test]
    fn size_summaries() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4], vec![1]]).unwrap();
        assert_eq!(hg.unique_edge_sizes(), vec![1, 2, 3]);
        assert_eq!(hg.max_edge_order(), Some(2));
        assert_eq!(Hypergraph::new().max_edge_order(), None);
    }
}
