// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Version-keyed memoization of matrix projections.

use std::sync::Arc;

use hyperlite_hypergraph::{Hypergraph, Result};
use rustc_hash::FxHashMap;

use crate::matrix::{
    adjacency_matrix, incidence_matrix, intersection_profile, laplacian_matrix,
    normalized_hypergraph_laplacian, EdgeMatrix, IncidenceMatrix, NodeMatrix,
};

/// Node × node projections, keyed by their parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeProjection {
    Adjacency { order: Option<usize>, s: usize, weighted: bool },
    Laplacian { order: usize, normalized: bool },
    HypergraphLaplacian,
}

/// Memoizes projections of one hypergraph.
///
/// Every lookup compares the hypergraph's identity and version with those
/// the cached matrices were built at and drops everything on a mismatch.
#[derive(Debug, Default)]
pub struct ProjectionCache {
    key: Option<(u64, u64)>,
    incidence: FxHashMap<Option<usize>, Arc<IncidenceMatrix>>,
    profiles: FxHashMap<Option<usize>, Arc<EdgeMatrix>>,
    node_matrices: FxHashMap<NodeProjection, Arc<NodeMatrix>>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached matrices.
    pub fn len(&self) -> usize {
        self.incidence.len() + self.profiles.len() + self.node_matrices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.incidence.clear();
        self.profiles.clear();
        self.node_matrices.clear();
        self.key = None;
    }

    fn sync(&mut self, hg: &Hypergraph) {
        let key = (hg.instance(), hg.version());
        if self.key != Some(key) {
            if !self.is_empty() {
                tracing::trace!(dropped = self.len(), version = hg.version(), "projection cache invalidated");
            }
            self.clear();
            self.key = Some(key);
        }
    }

    pub fn incidence(&mut self, hg: &Hypergraph, order: Option<usize>) -> Arc<IncidenceMatrix> {
        self.sync(hg);
        self.incidence
            .entry(order)
            .or_insert_with(|| Arc::new(incidence_matrix(hg, order)))
            .clone()
    }

    pub fn intersection_profile(&mut self, hg: &Hypergraph, order: Option<usize>) -> Arc<EdgeMatrix> {
        self.sync(hg);
        self.profiles
            .entry(order)
            .or_insert_with(|| Arc::new(intersection_profile(hg, order)))
            .clone()
    }

    pub fn adjacency(&mut self, hg: &Hypergraph, order: Option<usize>, s: usize, weighted: bool) -> Arc<NodeMatrix> {
        self.sync(hg);
        self.node_matrices
            .entry(NodeProjection::Adjacency { order, s, weighted })
            .or_insert_with(|| Arc::new(adjacency_matrix(hg, order, s, weighted)))
            .clone()
    }

    pub fn laplacian(&mut self, hg: &Hypergraph, order: usize, normalized: bool) -> Arc<NodeMatrix> {
        self.sync(hg);
        self.node_matrices
            .entry(NodeProjection::Laplacian { order, normalized })
            .or_insert_with(|| Arc::new(laplacian_matrix(hg, order, normalized)))
            .clone()
    }

    /// Failures are not cached.
    pub fn normalized_hypergraph_laplacian(&mut self, hg: &Hypergraph) -> Result<Arc<NodeMatrix>> {
        self.sync(hg);
        if let Some(cached) = self.node_matrices.get(&NodeProjection::HypergraphLaplacian) {
            return Ok(cached.clone());
        }
        let matrix = Arc::new(normalized_hypergraph_laplacian(hg)?);
        self.node_matrices
            .insert(NodeProjection::HypergraphLaplacian, matrix.clone());
        Ok(matrix)
    }
}
