// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builtin node stats.

use super::{map_ids, StatKernel};
use crate::attrs::AttrValue;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::NodeId;
use crate::incidence::FxIndexSet;
use crate::view::NodeKind;

/// Number of edges containing the node.
///
/// With `order`, only edges of that order (size `order + 1`) are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Degree {
    pub order: Option<usize>,
}

impl Degree {
    pub fn of_order(order: usize) -> Self {
        Self { order: Some(order) }
    }
}

impl StatKernel<NodeKind> for Degree {
    fn name(&self) -> &str {
        "degree"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[NodeId]) -> Result<Vec<AttrValue>> {
        let store = hg.store();
        map_ids(hg, ids, |n| {
            let edges = hg.memberships(n)?;
            let degree = match self.order {
                None => edges.len(),
                Some(order) => edges
                    .iter()
                    .filter(|e| store.size(e) == Some(order + 1))
                    .count(),
            };
            Ok(AttrValue::from(degree))
        })
    }
}

/// Mean degree of the node's neighbours; 0.0 for a node without neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AverageNeighborDegree;

impl StatKernel<NodeKind> for AverageNeighborDegree {
    fn name(&self) -> &str {
        "average_neighbor_degree"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[NodeId]) -> Result<Vec<AttrValue>> {
        map_ids(hg, ids, |n| {
            let neighbors = neighbors(hg, n)?;
            if neighbors.is_empty() {
                return Ok(AttrValue::Float(0.0));
            }
            let total: usize = neighbors
                .iter()
                .filter_map(|m| hg.store().degree(m))
                .sum();
            Ok(AttrValue::Float(total as f64 / neighbors.len() as f64))
        })
    }
}

/// Local clustering coefficient of the pairwise projection.
///
/// The fraction of neighbour pairs that share an edge themselves; 0.0 for
/// nodes with fewer than two neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clustering;

impl StatKernel<NodeKind> for Clustering {
    fn name(&self) -> &str {
        "clustering"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[NodeId]) -> Result<Vec<AttrValue>> {
        map_ids(hg, ids, |n| {
            let neighbors: Vec<NodeId> = neighbors(hg, n)?.into_iter().collect();
            let k = neighbors.len();
            if k < 2 {
                return Ok(AttrValue::Float(0.0));
            }
            let mut links = 0usize;
            for (i, u) in neighbors.iter().enumerate() {
                for v in &neighbors[i + 1..] {
                    if adjacent(hg, u, v) {
                        links += 1;
                    }
                }
            }
            let pairs = k * (k - 1) / 2;
            Ok(AttrValue::Float(links as f64 / pairs as f64))
        })
    }
}

/// Clique-expansion eigenvector centrality, scaled so the maximum is 1.
///
/// Computed by power iteration on `A + I`, where `A` is the adjacency of the
/// pairwise projection. Every node gets NaN when the hypergraph is not
/// connected, since the leading eigenvector is then not unique.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centrality {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for Centrality {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 1000,
        }
    }
}

impl StatKernel<NodeKind> for Centrality {
    fn name(&self) -> &str {
        "centrality"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[NodeId]) -> Result<Vec<AttrValue>> {
        let store = hg.store();
        if let Some(missing) = ids.iter().find(|n| !store.has_node(n)) {
            return Err(Error::NodeNotFound(missing.clone()));
        }
        if !hg.is_connected() {
            return Ok(vec![AttrValue::Float(f64::NAN); ids.len()]);
        }

        let scores = self.power_iteration(hg);
        ids.iter()
            .map(|n| {
                store
                    .node_index(n)
                    .map(|i| AttrValue::Float(scores[i]))
                    .ok_or_else(|| Error::NodeNotFound(n.clone()))
            })
            .collect()
    }
}

impl Centrality {
    fn power_iteration(&self, hg: &Hypergraph) -> Vec<f64> {
        let store = hg.store();
        let adjacency: Vec<Vec<usize>> = store
            .node_ids()
            .map(|n| {
                neighbors(hg, n)
                    .map(|set| set.iter().filter_map(|m| store.node_index(m)).collect())
                    .unwrap_or_default()
            })
            .collect();

        let mut x = vec![1.0; adjacency.len()];
        for _ in 0..self.max_iterations {
            let mut next: Vec<f64> = adjacency
                .iter()
                .enumerate()
                .map(|(i, nbrs)| x[i] + nbrs.iter().map(|&j| x[j]).sum::<f64>())
                .collect();
            let max = next.iter().copied().fold(0.0_f64, f64::max);
            if max > 0.0 {
                next.iter_mut().for_each(|v| *v /= max);
            }
            let delta = next
                .iter()
                .zip(&x)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);
            x = next;
            if delta < self.tolerance {
                return x;
            }
        }

        tracing::warn!(
            iterations = self.max_iterations,
            "eigenvector centrality did not converge"
        );
        x
    }
}

/// Nodes sharing at least one edge with `n`, excluding `n`.
pub(crate) fn neighbors(hg: &Hypergraph, n: &NodeId) -> Result<FxIndexSet<NodeId>> {
    let store = hg.store();
    let mut out = FxIndexSet::default();
    for edge in hg.memberships(n)? {
        if let Some(members) = store.members(edge) {
            out.extend(members.iter().filter(|m| *m != n).cloned());
        }
    }
    Ok(out)
}

fn adjacent(hg: &Hypergraph, u: &NodeId, v: &NodeId) -> bool {
    let store = hg.store();
    match (store.memberships(u), store.memberships(v)) {
        (Some(a), Some(b)) => {
            let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            small.iter().any(|e| large.contains(e))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floats(values: Vec<AttrValue>) -> Vec<f64> {
        values.iter().map(|v| v.as_f64().unwrap()).collect()
    }

    fn ids(raw: &[i64]) -> Vec<NodeId> {
        raw.iter().map(|&i| NodeId::from(i)).collect()
    }

    #[test]
    fn degree_by_order() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![1, 2, 3], vec![1]]).unwrap();
        let all = Degree::default().evaluate(&hg, &ids(&[1, 2, 3])).unwrap();
        assert_eq!(all, vec![AttrValue::Int(3), AttrValue::Int(2), AttrValue::Int(1)]);

        let pairwise = Degree::of_order(1).evaluate(&hg, &ids(&[1, 2, 3])).unwrap();
        assert_eq!(pairwise, vec![AttrValue::Int(1), AttrValue::Int(1), AttrValue::Int(0)]);

        assert!(Degree::default().evaluate(&hg, &ids(&[7])).unwrap_err().is_not_found());
    }

    #[test]
    fn average_neighbor_degree() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3]]).unwrap();
        hg.add_node_with_id(9).unwrap();
        let values = floats(AverageNeighborDegree.evaluate(&hg, &ids(&[1, 2, 9])).unwrap());
        assert_relative_eq!(values[0], 2.0);
        assert_relative_eq!(values[1], 1.0);
        assert_relative_eq!(values[2], 0.0);
    }

    #[test]
    fn clustering_of_projection() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3], vec![3, 4]]).unwrap();
        let values = floats(Clustering.evaluate(&hg, &ids(&[1, 3, 4])).unwrap());
        assert_relative_eq!(values[0], 1.0);
        // neighbours of 3 are {1, 2, 4}; only 1-2 are linked
        assert_relative_eq!(values[1], 1.0 / 3.0);
        assert_relative_eq!(values[2], 0.0);
    }

    #[test]
    fn centrality_of_path() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3]]).unwrap();
        let values = floats(Centrality::default().evaluate(&hg, &ids(&[1, 2, 3])).unwrap());
        let side = 1.0 / 2f64.sqrt();
        assert_relative_eq!(values[0], side, epsilon = 1e-4);
        assert_relative_eq!(values[1], 1.0, epsilon = 1e-4);
        assert_relative_eq!(values[2], side, epsilon = 1e-4);
    }

    #[test]
    fn centrality_is_nan_when_disconnected() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![3, 4]]).unwrap();
        let values = floats(Centrality::default().evaluate(&hg, &ids(&[1, 3])).unwrap());
        assert!(values.iter().all(|v| v.is_nan()));
    }
}
