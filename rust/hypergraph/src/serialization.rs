// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Format-neutral snapshots of a hypergraph.
//!
//! A [`HypergraphSnapshot`] is the full enumeration of a hypergraph (graph
//! attributes, nodes with attributes, edges with members and attributes) as
//! plain serde data. File formats are left to callers; JSON helpers are
//! provided because they are the common case.

use serde::{Deserialize, Serialize};

use crate::attrs::Attributes;
use crate::config::HypergraphConfig;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::{EdgeId, NodeId};
use crate::incidence::FxIndexSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub members: Vec<NodeId>,
    #[serde(default)]
    pub attrs: Attributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HypergraphSnapshot {
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl Hypergraph {
    /// Captures the hypergraph in insertion order.
    pub fn to_snapshot(&self) -> HypergraphSnapshot {
        HypergraphSnapshot {
            attrs: self.graph_attrs.clone(),
            nodes: self
                .nodes_with_attrs()
                .map(|(id, attrs)| NodeRecord {
                    id: id.clone(),
                    attrs: attrs.clone(),
                })
                .collect(),
            edges: self
                .edges_with_members()
                .map(|(id, members, attrs)| EdgeRecord {
                    id: id.clone(),
                    members: members.iter().cloned().collect(),
                    attrs: attrs.clone(),
                })
                .collect(),
        }
    }

    /// Rebuilds a hypergraph with the IDs and attributes of `snapshot`.
    ///
    /// Edge members missing from the node list are created only if the
    /// configuration materializes missing nodes. Empty member lists are
    /// accepted, since a snapshot may record edges emptied by removals.
    pub fn from_snapshot(snapshot: HypergraphSnapshot, config: HypergraphConfig) -> Result<Self> {
        let mut hg = Hypergraph::with_config(config);
        hg.graph_attrs = snapshot.attrs;

        for record in snapshot.nodes {
            if hg.store.has_node(&record.id) {
                return Err(Error::DuplicateNodeId(record.id));
            }
            hg.raw_insert_node(record.id, record.attrs);
        }
        for record in snapshot.edges {
            if hg.store.has_edge(&record.id) {
                return Err(Error::DuplicateEdgeId(record.id));
            }
            let members: FxIndexSet<NodeId> = record.members.into_iter().collect();
            if !hg.config().materialize_missing_nodes {
                if let Some(missing) = members.iter().find(|n| !hg.store.has_node(n)) {
                    return Err(Error::NodeNotFound(missing.clone()));
                }
            }
            hg.raw_insert_edge(record.id, members, record.attrs);
        }

        tracing::debug!(
            nodes = hg.num_nodes(),
            edges = hg.num_edges(),
            "restored hypergraph from snapshot"
        );
        hg.bump();
        Ok(hg)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_snapshot()).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parses a JSON snapshot using the default configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: HypergraphSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot, HypergraphConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttrValue;

    #[test]
    fn snapshot_preserves_ids_and_attributes() {
        let mut hg = Hypergraph::new();
        hg.add_edge_with_id(["a", "b"], "ab").unwrap();
        hg.add_edge_with_id([7, 8], 3).unwrap();
        hg.set_node_attr(&NodeId::from("a"), "color", "red").unwrap();
        hg.set_edge_attr(&EdgeId::from(3), "weight", 0.5).unwrap();
        hg.set_graph_attr("name", "demo");
        hg.remove_node(&NodeId::from(7)).unwrap();
        hg.remove_node(&NodeId::from(8)).unwrap();

        let restored = Hypergraph::from_json(&hg.to_json().unwrap()).unwrap();
        assert_eq!(restored.to_snapshot(), hg.to_snapshot());
        assert_eq!(restored.size(&EdgeId::from(3)).unwrap(), 0);
        assert_eq!(
            restored.node_attr(&NodeId::from("a"), "color").unwrap(),
            Some(&AttrValue::from("red"))
        );
        restored.check_invariants().unwrap();
    }

    #[test]
    fn allocator_skips_restored_ids() {
        let hg = Hypergraph::from_edge_list(vec![vec![0, 1], vec![1, 2]]).unwrap();
        let mut restored = Hypergraph::from_snapshot(hg.to_snapshot(), HypergraphConfig::default()).unwrap();
        assert_eq!(restored.add_node().unwrap(), NodeId::from(3));
        assert_eq!(restored.add_edge([5]).unwrap(), EdgeId::from(2));
    }

    #[test]
    fn malformed_input() {
        let err = Hypergraph::from_json("{\"nodes\": 3}").unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));

        let json = r#"{"nodes":[{"id":1},{"id":1}]}"#;
        assert_eq!(
            Hypergraph::from_json(json).unwrap_err(),
            Error::DuplicateNodeId(NodeId::from(1))
        );

        let strict = HypergraphConfig::default().with_materialize_missing_nodes(false);
        let snapshot: HypergraphSnapshot =
            serde_json::from_str(r#"{"edges":[{"id":0,"members":[4]}]}"#).unwrap();
        assert!(Hypergraph::from_snapshot(snapshot, strict).unwrap_err().is_not_found());
    }
}
