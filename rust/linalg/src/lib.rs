// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Hyperlite Linalg
//!
//! Sparse matrix projections of hyperlite hypergraphs: incidence,
//! adjacency, intersection profiles and Laplacians, as
//! [`nalgebra_sparse::CsrMatrix`] values labelled with node and edge IDs.
//!
//! Row and column order is the hypergraph's insertion order at call time.
//! Callers that need a stable order across mutations should keep the
//! returned ID sets.
//!
//! ```
//! use hyperlite_hypergraph::Hypergraph;
//! use hyperlite_linalg::laplacian_matrix;
//!
//! let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3]]).unwrap();
//! let lap = laplacian_matrix(&hg, 1, false);
//! assert_eq!(lap.get(1, 1), 2.0);
//! ```

pub mod cache;
pub mod matrix;

pub use cache::ProjectionCache;
pub use matrix::{
    adjacency_matrix, degree_vector, incidence_matrix, intersection_profile, laplacian_matrix,
    normalized_hypergraph_laplacian, EdgeMatrix, IncidenceMatrix, IndexedMatrix, IndexedVector,
    NodeMatrix,
};
