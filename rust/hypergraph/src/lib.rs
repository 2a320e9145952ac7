// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Hyperlite Hypergraph
//!
//! In-memory incidence store for undirected hypergraphs and simplicial
//! complexes.
//!
//! A [`Hypergraph`] keeps two mirrored maps, node → containing edges and
//! edge → member nodes, and updates both in every mutation so that
//! `n ∈ members(e)` holds exactly when `e ∈ memberships(n)`. Nodes and edges
//! live in independent ID spaces and carry typed attribute dictionaries.
//!
//! On top of the store sit:
//!
//! - [`View`]s: detached, filterable sets of node or edge IDs with set
//!   algebra.
//! - [`StatQuery`]s: lazily evaluated per-entity statistics with
//!   aggregations, cached against the structure version.
//! - structural edits: duplicate merging, relabeling, double edge swaps and
//!   cleanup.
//! - [`SimplicialComplex`]: a hypergraph kept closed under subsets.
//!
//! ## Example
//!
//! ```
//! use hyperlite_hypergraph::{Hypergraph, NodeId};
//!
//! let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4], vec![1]]).unwrap();
//! assert_eq!(hg.degree(&NodeId::from(2)).unwrap(), 2);
//!
//! let degree = hg.nodes().degree();
//! assert_eq!(degree.max(&hg).unwrap(), 2.0);
//!
//! let hubs = hg.nodes().filterby(&hg, "degree", 2).unwrap();
//! assert_eq!(hubs.len(&hg), 2);
//! ```

pub mod attrs;
pub mod config;
pub mod connectivity;
pub mod edits;
pub mod error;
pub mod hypergraph;
pub mod ids;
pub mod incidence;
pub mod serialization;
pub mod simplicial;
pub mod stats;
pub mod view;

pub use attrs::{attributes, AttrValue, Attributes};
pub use config::{FaceRemovalPolicy, HypergraphConfig, MergePolicy};
pub use edits::{CleanupOptions, RelabelPolicy};
pub use error::{Error, Result};
pub use hypergraph::Hypergraph;
pub use ids::{EdgeId, Id, IdAllocator, NodeId};
pub use incidence::{FxIndexMap, FxIndexSet, IncidenceStore};
pub use serialization::{EdgeRecord, HypergraphSnapshot, NodeRecord};
pub use simplicial::SimplicialComplex;
pub use stats::{
    Aggregate, AttrStat, Column, FnStat, MultiStatQuery, StatKernel, StatQuery, StatRegistry,
    StatTable, StatValues,
};
pub use view::{Criterion, EdgeKind, EdgeView, Entity, NodeKind, NodeView, View};
