// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Sparse matrix projections of a hypergraph.
//!
//! Rows and columns follow the insertion order of nodes and edges at call
//! time, the same order the views enumerate. Each result carries its row
//! and column IDs so entries can be looked up by ID.
//!
//! `order` restricts a projection to edges of exactly `order + 1` members;
//! `None` uses every edge.

use std::hash::Hash;

use hyperlite_hypergraph::{EdgeId, Error, FxIndexSet, Hypergraph, NodeId, Result};
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// A sparse matrix with ID-labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedMatrix<R: Hash + Eq, C: Hash + Eq> {
    matrix: CsrMatrix<f64>,
    rows: FxIndexSet<R>,
    cols: FxIndexSet<C>,
}

pub type NodeMatrix = IndexedMatrix<NodeId, NodeId>;
pub type IncidenceMatrix = IndexedMatrix<NodeId, EdgeId>;
pub type EdgeMatrix = IndexedMatrix<EdgeId, EdgeId>;

impl<R: Hash + Eq, C: Hash + Eq> IndexedMatrix<R, C> {
    fn from_coo(coo: &CooMatrix<f64>, rows: FxIndexSet<R>, cols: FxIndexSet<C>) -> Self {
        Self {
            matrix: CsrMatrix::from(coo),
            rows,
            cols,
        }
    }

    pub fn matrix(&self) -> &CsrMatrix<f64> {
        &self.matrix
    }

    pub fn rows(&self) -> &FxIndexSet<R> {
        &self.rows
    }

    pub fn cols(&self) -> &FxIndexSet<C> {
        &self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.nrows(), self.matrix.ncols())
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    /// Entry at a position; 0.0 for unstored or out-of-range positions.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix
            .get_entry(row, col)
            .map_or(0.0, |entry| entry.into_value())
    }

    /// Entry by row and column ID; `None` if either ID is not indexed.
    pub fn get_by_id(&self, row: &R, col: &C) -> Option<f64> {
        let i = self.rows.get_index_of(row)?;
        let j = self.cols.get_index_of(col)?;
        Some(self.get(i, j))
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from(&self.matrix)
    }

    pub fn into_parts(self) -> (CsrMatrix<f64>, FxIndexSet<R>, FxIndexSet<C>) {
        (self.matrix, self.rows, self.cols)
    }
}

/// A dense vector with ID-labelled entries.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedVector<R: Hash + Eq> {
    pub values: DVector<f64>,
    pub ids: FxIndexSet<R>,
}

impl<R: Hash + Eq> IndexedVector<R> {
    pub fn get_by_id(&self, id: &R) -> Option<f64> {
        self.ids.get_index_of(id).map(|i| self.values[i])
    }
}

// =========================================================================
// Helpers
// =========================================================================

fn node_index(hg: &Hypergraph) -> FxIndexSet<NodeId> {
    hg.store().node_ids().cloned().collect()
}

/// Edges of the requested order with their member row indices.
fn selected_edges(hg: &Hypergraph, nodes: &FxIndexSet<NodeId>, order: Option<usize>) -> Vec<(EdgeId, Vec<usize>)> {
    hg.store()
        .iter_members()
        .filter(|(_, members)| order.map_or(true, |d| members.len() == d + 1))
        .map(|(e, members)| {
            let rows = members.iter().filter_map(|n| nodes.get_index_of(n)).collect();
            (e.clone(), rows)
        })
        .collect()
}

/// Pairwise co-membership counts, diagonal excluded, as a COO matrix.
fn co_membership(n: usize, edges: &[(EdgeId, Vec<usize>)]) -> CooMatrix<f64> {
    let mut coo = CooMatrix::new(n, n);
    for (_, rows) in edges {
        for &i in rows {
            for &j in rows {
                if i != j {
                    coo.push(i, j, 1.0);
                }
            }
        }
    }
    coo
}

fn order_degrees(n: usize, edges: &[(EdgeId, Vec<usize>)]) -> Vec<f64> {
    let mut degrees = vec![0.0; n];
    for (_, rows) in edges {
        for &i in rows {
            degrees[i] += 1.0;
        }
    }
    degrees
}

// =========================================================================
// Projections
// =========================================================================

/// Node × edge incidence: entry 1 where the node is a member.
pub fn incidence_matrix(hg: &Hypergraph, order: Option<usize>) -> IncidenceMatrix {
    let nodes = node_index(hg);
    let edges = selected_edges(hg, &nodes, order);

    let mut coo = CooMatrix::new(nodes.len(), edges.len());
    for (j, (_, rows)) in edges.iter().enumerate() {
        for &i in rows {
            coo.push(i, j, 1.0);
        }
    }
    let cols = edges.into_iter().map(|(e, _)| e).collect();
    IndexedMatrix::from_coo(&coo, nodes, cols)
}

/// Node × node adjacency of the pairwise projection.
///
/// Off-diagonal entries count shared edges; pairs sharing fewer than `s`
/// edges are dropped. When `weighted` is false the surviving entries are 1.
/// The diagonal is always zero.
pub fn adjacency_matrix(hg: &Hypergraph, order: Option<usize>, s: usize, weighted: bool) -> NodeMatrix {
    let nodes = node_index(hg);
    let edges = selected_edges(hg, &nodes, order);
    let counts = CsrMatrix::from(&co_membership(nodes.len(), &edges));

    let threshold = s.max(1) as f64;
    let mut coo = CooMatrix::new(nodes.len(), nodes.len());
    for (i, j, &count) in counts.triplet_iter() {
        if count >= threshold {
            coo.push(i, j, if weighted { count } else { 1.0 });
        }
    }
    IndexedMatrix::from_coo(&coo, nodes.clone(), nodes)
}

/// Number of edges of the requested order containing each node.
pub fn degree_vector(hg: &Hypergraph, order: Option<usize>) -> IndexedVector<NodeId> {
    let nodes = node_index(hg);
    let edges = selected_edges(hg, &nodes, order);
    IndexedVector {
        values: DVector::from_vec(order_degrees(nodes.len(), &edges)),
        ids: nodes,
    }
}

/// Edge × edge overlap sizes; the diagonal holds edge sizes.
pub fn intersection_profile(hg: &Hypergraph, order: Option<usize>) -> EdgeMatrix {
    let incidence = incidence_matrix(hg, order);
    let transpose = incidence.matrix.transpose();
    let profile = &transpose * &incidence.matrix;
    let cols = incidence.cols;
    IndexedMatrix {
        matrix: profile,
        rows: cols.clone(),
        cols,
    }
}

/// Order-`order` Laplacian `L = order·K − A`.
///
/// `K` is the diagonal of order-degrees and `A` the weighted adjacency
/// restricted to edges of `order + 1` members. The normalized form is
/// `I − D^{-1/2} A D^{-1/2}` with `D = order·K`; nodes of zero order-degree
/// get an all-zero row and column.
pub fn laplacian_matrix(hg: &Hypergraph, order: usize, normalized: bool) -> NodeMatrix {
    let nodes = node_index(hg);
    let n = nodes.len();
    let edges = selected_edges(hg, &nodes, Some(order));
    let adjacency = CsrMatrix::from(&co_membership(n, &edges));
    let scaled: Vec<f64> = order_degrees(n, &edges)
        .into_iter()
        .map(|k| order as f64 * k)
        .collect();

    let mut coo = CooMatrix::new(n, n);
    if normalized {
        let inv_sqrt: Vec<f64> = scaled
            .iter()
            .map(|&d| if d > 0.0 { d.sqrt().recip() } else { 0.0 })
            .collect();
        for (i, &d) in scaled.iter().enumerate() {
            if d > 0.0 {
                coo.push(i, i, 1.0);
            }
        }
        for (i, j, &a) in adjacency.triplet_iter() {
            coo.push(i, j, -a * inv_sqrt[i] * inv_sqrt[j]);
        }
    } else {
        for (i, &d) in scaled.iter().enumerate() {
            if d > 0.0 {
                coo.push(i, i, d);
            }
        }
        for (i, j, &a) in adjacency.triplet_iter() {
            coo.push(i, j, -a);
        }
    }

    tracing::trace!(order, normalized, nodes = n, edges = edges.len(), "built laplacian");
    IndexedMatrix::from_coo(&coo, nodes.clone(), nodes)
}

/// Normalized hypergraph Laplacian of Zhou, Huang and Schölkopf,
/// `L = I − Dv^{-1/2} H De^{-1} Hᵀ Dv^{-1/2}` with unit edge weights.
///
/// Fails with [`Error::Value`] when any node has degree zero. Empty edges
/// contribute nothing.
pub fn normalized_hypergraph_laplacian(hg: &Hypergraph) -> Result<NodeMatrix> {
    let nodes = node_index(hg);
    let n = nodes.len();
    let edges = selected_edges(hg, &nodes, None);
    let degrees = order_degrees(n, &edges);
    if let Some(i) = degrees.iter().position(|&d| d == 0.0) {
        return Err(Error::Value(format!(
            "node {} is isolated; the normalized hypergraph laplacian is undefined",
            nodes[i]
        )));
    }

    let inv_sqrt: Vec<f64> = degrees.iter().map(|d| d.sqrt().recip()).collect();
    let mut coo = CooMatrix::new(n, n);
    for i in 0..n {
        coo.push(i, i, 1.0);
    }
    for (_, rows) in &edges {
        if rows.is_empty() {
            continue;
        }
        let weight = (rows.len() as f64).recip();
        for &i in rows {
            for &j in rows {
                coo.push(i, j, -weight * inv_sqrt[i] * inv_sqrt[j]);
            }
        }
    }
    Ok(IndexedMatrix::from_coo(&coo, nodes.clone(), nodes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn path() -> Hypergraph {
        Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3]]).unwrap()
    }

    fn sample() -> Hypergraph {
        Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4], vec![1]]).unwrap()
    }

    #[test]
    fn incidence_follows_insertion_order() {
        let hg = sample();
        let inc = incidence_matrix(&hg, None);
        assert_eq!(inc.shape(), (4, 3));
        assert_eq!(inc.nnz(), 6);
        assert_eq!(inc.get_by_id(&NodeId::from(3), &EdgeId::from(1)), Some(1.0));
        assert_eq!(inc.get_by_id(&NodeId::from(3), &EdgeId::from(0)), Some(0.0));
        assert_eq!(inc.get_by_id(&NodeId::from(9), &EdgeId::from(0)), None);

        let pairs = incidence_matrix(&hg, Some(1));
        assert_eq!(pairs.shape(), (4, 1));
        assert_eq!(pairs.cols()[0], EdgeId::from(0));
    }

    #[test]
    fn adjacency_thresholds_and_weights() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3], vec![1, 2]]).unwrap();
        let weighted = adjacency_matrix(&hg, None, 1, true);
        assert_eq!(weighted.get(0, 1), 2.0);
        assert_eq!(weighted.get(0, 2), 1.0);
        assert_eq!(weighted.get(0, 0), 0.0);

        let unweighted = adjacency_matrix(&hg, None, 1, false);
        assert_eq!(unweighted.get(0, 1), 1.0);

        let strong = adjacency_matrix(&hg, None, 2, false);
        assert_eq!(strong.nnz(), 2);
        assert_eq!(strong.get(1, 0), 1.0);
        assert_eq!(strong.get(1, 2), 0.0);
    }

    #[test]
    fn degrees_and_profile() {
        let hg = sample();
        let degrees = degree_vector(&hg, None);
        assert_eq!(degrees.values.as_slice(), &[2.0, 2.0, 1.0, 1.0]);
        assert_eq!(degree_vector(&hg, Some(2)).get_by_id(&NodeId::from(1)), Some(0.0));

        let profile = intersection_profile(&hg, None);
        assert_eq!(profile.shape(), (3, 3));
        assert_eq!(profile.get(1, 1), 3.0);
        assert_eq!(profile.get(0, 1), 1.0);
        assert_eq!(profile.get(0, 2), 1.0);
        assert_eq!(profile.get(1, 2), 0.0);
    }

    #[test]
    fn laplacian_of_path() {
        let lap = laplacian_matrix(&path(), 1, false).to_dense();
        let expected = DMatrix::from_row_slice(3, 3, &[1.0, -1.0, 0.0, -1.0, 2.0, -1.0, 0.0, -1.0, 1.0]);
        assert_eq!(lap, expected);
    }

    #[test]
    fn normalized_laplacian_of_path() {
        let lap = laplacian_matrix(&path(), 1, true).to_dense();
        let off = -1.0 / 2f64.sqrt();
        assert_relative_eq!(lap[(0, 0)], 1.0);
        assert_relative_eq!(lap[(1, 1)], 1.0);
        assert_relative_eq!(lap[(0, 1)], off);
        assert_relative_eq!(lap[(2, 1)], off);
        assert_relative_eq!(lap[(0, 2)], 0.0);
    }

    #[test]
    fn laplacian_rows_of_unused_nodes_are_zero() {
        let lap = laplacian_matrix(&sample(), 2, false);
        // only {2,3,4} has order 2
        assert_eq!(lap.get(0, 0), 0.0);
        assert_eq!(lap.get(1, 1), 2.0);
        assert_eq!(lap.get(1, 2), -1.0);
    }

    #[test]
    fn zhou_laplacian() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2]]).unwrap();
        let lap = normalized_hypergraph_laplacian(&hg).unwrap().to_dense();
        assert_relative_eq!(lap[(0, 0)], 0.5);
        assert_relative_eq!(lap[(0, 1)], -0.5);

        let mut isolated = hg.clone();
        isolated.add_node_with_id(5).unwrap();
        assert!(matches!(
            normalized_hypergraph_laplacian(&isolated).unwrap_err(),
            Error::Value(_)
        ));
    }
}
