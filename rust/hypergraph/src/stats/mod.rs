// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lazily evaluated per-entity statistics.
//!
//! A stat is a [`StatKernel`]: a named function from a slice of IDs to one
//! value per ID. Kernels are bound to a view by a [`StatQuery`], which does
//! nothing until it is materialized or aggregated.
//!
//! Builtin kernels are resolved by name (`"degree"`, `"clustering"`, ...);
//! custom numeric kernels are plain function pointers registered in a
//! [`StatRegistry`].

mod edge;
mod node;
mod query;
mod registry;

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::attrs::AttrValue;
use crate::error::Result;
use crate::hypergraph::Hypergraph;
use crate::view::{EdgeKind, Entity, NodeKind};

pub use edge::{Order, Size};
pub use node::{AverageNeighborDegree, Centrality, Clustering, Degree};
pub use query::{Aggregate, Column, MultiStatQuery, StatQuery, StatTable, StatValues};
pub use registry::StatRegistry;

/// Computes one value per ID.
///
/// Implementations must return exactly one value per input ID, in input
/// order, and fail with the kind's not-found error for an absent ID.
pub trait StatKernel<K: Entity>: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn evaluate(&self, hg: &Hypergraph, ids: &[K::Id]) -> Result<Vec<AttrValue>>;
}

/// Builtin node stat names.
pub const NODE_BUILTINS: &[&str] = &[
    "degree",
    "average_neighbor_degree",
    "clustering",
    "clustering_coefficient",
    "centrality",
    "clique_eigenvector_centrality",
];

/// Builtin edge stat names.
pub const EDGE_BUILTINS: &[&str] = &["order", "size"];

pub(crate) fn node_builtin(name: &str) -> Option<Arc<dyn StatKernel<NodeKind>>> {
    let kernel: Arc<dyn StatKernel<NodeKind>> = match name {
        "degree" => Arc::new(Degree::default()),
        "average_neighbor_degree" => Arc::new(AverageNeighborDegree),
        "clustering" | "clustering_coefficient" => Arc::new(Clustering),
        "centrality" | "clique_eigenvector_centrality" => Arc::new(Centrality::default()),
        _ => return None,
    };
    Some(kernel)
}

pub(crate) fn edge_builtin(name: &str) -> Option<Arc<dyn StatKernel<EdgeKind>>> {
    let kernel: Arc<dyn StatKernel<EdgeKind>> = match name {
        "order" => Arc::new(Order::default()),
        "size" => Arc::new(Size::default()),
        _ => return None,
    };
    Some(kernel)
}

/// Applies `f` to every ID, on the rayon pool when the slice is at least
/// `parallel_threshold` long.
pub(crate) fn map_ids<T, F>(hg: &Hypergraph, ids: &[T], f: F) -> Result<Vec<AttrValue>>
where
    T: Sync,
    F: Fn(&T) -> Result<AttrValue> + Sync + Send,
{
    if ids.len() >= hg.config().parallel_threshold {
        return ids.par_iter().map(&f).collect();
    }
    ids.iter().map(f).collect()
}

/// Reads one attribute; entities lacking it yield `missing`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrStat {
    key: String,
    missing: AttrValue,
}

impl AttrStat {
    pub fn new(key: impl Into<String>, missing: AttrValue) -> Self {
        Self {
            key: key.into(),
            missing,
        }
    }
}

impl<K: Entity> StatKernel<K> for AttrStat {
    fn name(&self) -> &str {
        &self.key
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[K::Id]) -> Result<Vec<AttrValue>> {
        let attrs = K::attr_map(hg);
        map_ids(hg, ids, |id| {
            let entity = attrs.get(id).ok_or_else(|| K::not_found(id))?;
            Ok(entity.get(&self.key).cloned().unwrap_or_else(|| self.missing.clone()))
        })
    }
}

/// A user-supplied numeric stat.
pub struct FnStat<K: Entity> {
    name: String,
    func: fn(&Hypergraph, &K::Id) -> f64,
}

impl<K: Entity> FnStat<K> {
    pub fn new(name: impl Into<String>, func: fn(&Hypergraph, &K::Id) -> f64) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<K: Entity> fmt::Debug for FnStat<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStat").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<K: Entity> StatKernel<K> for FnStat<K> {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[K::Id]) -> Result<Vec<AttrValue>> {
        let live = K::incidence(hg);
        map_ids(hg, ids, |id| {
            if !live.contains_key(id) {
                return Err(K::not_found(id));
            }
            Ok(AttrValue::Float((self.func)(hg, id)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HypergraphConfig;
    use crate::ids::{EdgeId, NodeId};

    #[test]
    fn builtin_lookup() {
        for name in NODE_BUILTINS {
            assert!(node_builtin(name).is_some(), "{name}");
        }
        for name in EDGE_BUILTINS {
            assert!(edge_builtin(name).is_some(), "{name}");
        }
        assert!(node_builtin("size").is_none());
        assert!(edge_builtin("degree").is_none());
    }

    #[test]
    fn attr_stat_defaults_missing() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2]]).unwrap();
        hg.set_node_attr(&NodeId::from(1), "w", 3).unwrap();
        let stat = AttrStat::new("w", AttrValue::Int(0));
        let values =
            StatKernel::<NodeKind>::evaluate(&stat, &hg, &[NodeId::from(1), NodeId::from(2)]).unwrap();
        assert_eq!(values, vec![AttrValue::Int(3), AttrValue::Int(0)]);

        let err = StatKernel::<NodeKind>::evaluate(&stat, &hg, &[NodeId::from(9)]).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn fn_stat_wraps_function() {
        fn twice_size(hg: &Hypergraph, e: &EdgeId) -> f64 {
            hg.size(e).map_or(f64::NAN, |s| 2.0 * s as f64)
        }
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3]]).unwrap();
        let stat = FnStat::<EdgeKind>::new("twice", twice_size);
        assert_eq!(stat.name(), "twice");
        assert_eq!(
            stat.evaluate(&hg, &[EdgeId::from(0)]).unwrap(),
            vec![AttrValue::Float(6.0)]
        );
    }

    #[test]
    fn parallel_path_matches_sequential() {
        let edges: Vec<Vec<i64>> = (0..200).map(|i| vec![i, i + 1, i + 2]).collect();
        let mut config = HypergraphConfig::default().with_parallel_threshold(1);
        let mut parallel = Hypergraph::with_config(config.clone());
        parallel.add_edges_from(edges.clone()).unwrap();
        config.parallel_threshold = usize::MAX;
        let mut sequential = Hypergraph::with_config(config);
        sequential.add_edges_from(edges).unwrap();

        let ids = parallel.nodes().ids(&parallel);
        let kernel = Degree::default();
        assert_eq!(
            kernel.evaluate(&parallel, &ids).unwrap(),
            kernel.evaluate(&sequential, &ids).unwrap()
        );
    }
}
