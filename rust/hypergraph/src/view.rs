// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Node and edge views.
//!
//! A [`View`] is a detached description of a set of IDs in one ID space:
//! either "every live entity" or an explicit bunch. It holds no reference to
//! the hypergraph. Each query takes the live [`Hypergraph`] and evaluates
//! against its current state, so edits made between two queries are always
//! visible. IDs in a bunch that are no longer live are skipped.
//!
//! ```
//! use hyperlite_hypergraph::{Criterion, Hypergraph, NodeId};
//!
//! let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4]]).unwrap();
//! let hubs = hg.nodes().filterby(&hg, "degree", Criterion::Geq(2.into())).unwrap();
//! assert_eq!(hubs.ids(&hg), vec![NodeId::from(2)]);
//! ```

use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::attrs::{AttrValue, Attributes};
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::ids::{EdgeId, NodeId};
use crate::incidence::{self, FxIndexMap, FxIndexSet};
use crate::stats::{self, MultiStatQuery, StatKernel, StatQuery, StatRegistry};

mod sealed {
    pub trait Sealed {}
}

/// One of the two ID spaces of a hypergraph.
///
/// Implemented by [`NodeKind`] and [`EdgeKind`] only.
pub trait Entity: sealed::Sealed + Copy + Default + fmt::Debug + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Ord + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// The opposite ID space.
    type Other: Entity<Other = Self>;

    const NAME: &'static str;

    /// Stat names resolvable without a registry.
    const BUILTIN_STATS: &'static [&'static str];

    #[doc(hidden)]
    fn incidence(hg: &Hypergraph) -> &FxIndexMap<Self::Id, FxIndexSet<<Self::Other as Entity>::Id>>;

    #[doc(hidden)]
    fn attr_map(hg: &Hypergraph) -> &FxHashMap<Self::Id, Attributes>;

    fn not_found(id: &Self::Id) -> Error;

    /// Resolves a builtin stat by name.
    fn builtin_stat(name: &str) -> Option<Arc<dyn StatKernel<Self>>>;
}

/// The node ID space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeKind;

/// The edge ID space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeKind;

impl sealed::Sealed for NodeKind {}
impl sealed::Sealed for EdgeKind {}

impl Entity for NodeKind {
    type Id = NodeId;
    type Other = EdgeKind;
    const NAME: &'static str = "node";
    const BUILTIN_STATS: &'static [&'static str] = stats::NODE_BUILTINS;

    fn incidence(hg: &Hypergraph) -> &FxIndexMap<NodeId, FxIndexSet<EdgeId>> {
        hg.store.membership_map()
    }

    fn attr_map(hg: &Hypergraph) -> &FxHashMap<NodeId, Attributes> {
        &hg.node_attrs
    }

    fn not_found(id: &NodeId) -> Error {
        Error::NodeNotFound(id.clone())
    }

    fn builtin_stat(name: &str) -> Option<Arc<dyn StatKernel<Self>>> {
        stats::node_builtin(name)
    }
}

impl Entity for EdgeKind {
    type Id = EdgeId;
    type Other = NodeKind;
    const NAME: &'static str = "edge";
    const BUILTIN_STATS: &'static [&'static str] = stats::EDGE_BUILTINS;

    fn incidence(hg: &Hypergraph) -> &FxIndexMap<EdgeId, FxIndexSet<NodeId>> {
        hg.store.member_map()
    }

    fn attr_map(hg: &Hypergraph) -> &FxHashMap<EdgeId, Attributes> {
        &hg.edge_attrs
    }

    fn not_found(id: &EdgeId) -> Error {
        Error::EdgeNotFound(id.clone())
    }

    fn builtin_stat(name: &str) -> Option<Arc<dyn StatKernel<Self>>> {
        stats::edge_builtin(name)
    }
}

/// Predicate applied to a stat or attribute value by `filterby`.
///
/// Ordering criteria never match `Null` or NaN and fail with
/// [`Error::Value`] when the value and the bound cannot be compared.
#[derive(Debug, Clone)]
pub enum Criterion {
    Eq(AttrValue),
    Ne(AttrValue),
    Lt(AttrValue),
    Gt(AttrValue),
    Leq(AttrValue),
    Geq(AttrValue),
    /// Inclusive on both ends.
    Between(AttrValue, AttrValue),
    Custom(fn(&AttrValue) -> bool),
}

impl Criterion {
    pub fn matches(&self, value: &AttrValue) -> Result<bool> {
        use std::cmp::Ordering::*;

        match self {
            Criterion::Eq(bound) => Ok(value.loosely_eq(bound)),
            Criterion::Ne(bound) => Ok(!value.loosely_eq(bound)),
            Criterion::Custom(f) => Ok(f(value)),
            Criterion::Lt(bound) => ordered(value, bound, |o| o == Less),
            Criterion::Gt(bound) => ordered(value, bound, |o| o == Greater),
            Criterion::Leq(bound) => ordered(value, bound, |o| o != Greater),
            Criterion::Geq(bound) => ordered(value, bound, |o| o != Less),
            Criterion::Between(lo, hi) => {
                Ok(ordered(value, lo, |o| o != Less)? && ordered(value, hi, |o| o != Greater)?)
            }
        }
    }
}

fn ordered(
    value: &AttrValue,
    bound: &AttrValue,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<bool> {
    if value.is_null() || value.as_f64().map_or(false, f64::is_nan) {
        return Ok(false);
    }
    match value.compare(bound) {
        Some(ord) => Ok(accept(ord)),
        None => Err(Error::value(format!(
            "cannot compare {} with {}",
            value.type_name(),
            bound.type_name()
        ))),
    }
}

impl From<AttrValue> for Criterion {
    fn from(value: AttrValue) -> Self {
        Criterion::Eq(value)
    }
}

impl From<i64> for Criterion {
    fn from(value: i64) -> Self {
        Criterion::Eq(value.into())
    }
}

impl From<i32> for Criterion {
    fn from(value: i32) -> Self {
        Criterion::Eq(value.into())
    }
}

impl From<f64> for Criterion {
    fn from(value: f64) -> Self {
        Criterion::Eq(value.into())
    }
}

impl From<bool> for Criterion {
    fn from(value: bool) -> Self {
        Criterion::Eq(value.into())
    }
}

impl From<&str> for Criterion {
    fn from(value: &str) -> Self {
        Criterion::Eq(value.into())
    }
}

/// A set of IDs in one ID space.
#[derive(Debug, Clone)]
pub struct View<K: Entity> {
    bunch: Option<FxIndexSet<K::Id>>,
    kind: PhantomData<K>,
}

pub type NodeView = View<NodeKind>;
pub type EdgeView = View<EdgeKind>;

impl<K: Entity> Default for View<K> {
    fn default() -> Self {
        Self::all()
    }
}

impl<K: Entity> View<K> {
    /// A view over every live entity.
    pub fn all() -> Self {
        Self {
            bunch: None,
            kind: PhantomData,
        }
    }

    /// A view restricted to `ids`.
    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<K::Id>,
    {
        Self::bunch(ids.into_iter().map(Into::into).collect())
    }

    fn bunch(ids: FxIndexSet<K::Id>) -> Self {
        Self {
            bunch: Some(ids),
            kind: PhantomData,
        }
    }

    /// `false` for a view over every entity.
    pub fn is_restricted(&self) -> bool {
        self.bunch.is_some()
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Live IDs of the view, in view order.
    pub fn iter<'a>(&'a self, hg: &'a Hypergraph) -> Box<dyn Iterator<Item = &'a K::Id> + 'a> {
        let live = K::incidence(hg);
        match &self.bunch {
            None => Box::new(live.keys()),
            Some(bunch) => Box::new(bunch.iter().filter(move |id| live.contains_key(*id))),
        }
    }

    pub fn ids(&self, hg: &Hypergraph) -> Vec<K::Id> {
        self.iter(hg).cloned().collect()
    }

    pub fn len(&self, hg: &Hypergraph) -> usize {
        match &self.bunch {
            None => K::incidence(hg).len(),
            Some(_) => self.iter(hg).count(),
        }
    }

    pub fn is_empty(&self, hg: &Hypergraph) -> bool {
        self.iter(hg).next().is_none()
    }

    /// Membership test. O(1).
    pub fn contains(&self, hg: &Hypergraph, id: &K::Id) -> bool {
        K::incidence(hg).contains_key(id)
            && self.bunch.as_ref().map_or(true, |bunch| bunch.contains(id))
    }

    /// Memberships of a node, or members of an edge.
    pub fn incidences<'a>(
        &self,
        hg: &'a Hypergraph,
        id: &K::Id,
    ) -> Result<&'a FxIndexSet<<K::Other as Entity>::Id>> {
        self.lookup(hg, id)
    }

    /// Attribute dictionary of one entity of the view.
    pub fn attributes<'a>(&self, hg: &'a Hypergraph, id: &K::Id) -> Result<&'a Attributes> {
        if !self.contains(hg, id) {
            return Err(K::not_found(id));
        }
        K::attr_map(hg).get(id).ok_or_else(|| K::not_found(id))
    }

    fn lookup<'a>(
        &self,
        hg: &'a Hypergraph,
        id: &K::Id,
    ) -> Result<&'a FxIndexSet<<K::Other as Entity>::Id>> {
        if !self.contains(hg, id) {
            return Err(K::not_found(id));
        }
        K::incidence(hg).get(id).ok_or_else(|| K::not_found(id))
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    pub fn filter<F>(&self, hg: &Hypergraph, predicate: F) -> Self
    where
        F: Fn(&K::Id) -> bool,
    {
        Self::bunch(self.iter(hg).filter(|id| predicate(*id)).cloned().collect())
    }

    /// Keeps the IDs whose builtin stat `name` satisfies `criterion`.
    pub fn filterby(&self, hg: &Hypergraph, name: &str, criterion: impl Into<Criterion>) -> Result<Self> {
        let kernel = K::builtin_stat(name).ok_or_else(|| Error::UnknownStat(name.to_string()))?;
        self.filterby_stat(hg, kernel.as_ref(), criterion)
    }

    /// Keeps the IDs whose value of `kernel` satisfies `criterion`.
    pub fn filterby_stat(
        &self,
        hg: &Hypergraph,
        kernel: &dyn StatKernel<K>,
        criterion: impl Into<Criterion>,
    ) -> Result<Self> {
        let criterion = criterion.into();
        let ids = self.ids(hg);
        let values = kernel.evaluate(hg, &ids)?;

        let mut kept = FxIndexSet::default();
        for (id, value) in ids.into_iter().zip(values) {
            if criterion.matches(&value)? {
                kept.insert(id);
            }
        }
        Ok(Self::bunch(kept))
    }

    /// Keeps the IDs whose attribute `key` satisfies `criterion`.
    ///
    /// Entities without the key are compared as `missing` when given and
    /// dropped otherwise.
    pub fn filterby_attr(
        &self,
        hg: &Hypergraph,
        key: &str,
        criterion: impl Into<Criterion>,
        missing: Option<AttrValue>,
    ) -> Result<Self> {
        let criterion = criterion.into();
        let attrs = K::attr_map(hg);

        let mut kept = FxIndexSet::default();
        for id in self.iter(hg) {
            let value = match attrs.get(id).and_then(|a| a.get(key)) {
                Some(value) => value,
                None => match &missing {
                    Some(value) => value,
                    None => continue,
                },
            };
            if criterion.matches(value)? {
                kept.insert(id.clone());
            }
        }
        Ok(Self::bunch(kept))
    }

    // =========================================================================
    // Set algebra
    // =========================================================================

    /// IDs in either view; this view's order first.
    pub fn union(&self, hg: &Hypergraph, other: &Self) -> Self {
        let mut ids: FxIndexSet<K::Id> = self.iter(hg).cloned().collect();
        ids.extend(other.iter(hg).cloned());
        Self::bunch(ids)
    }

    pub fn intersection(&self, hg: &Hypergraph, other: &Self) -> Self {
        self.filter(hg, |id| other.contains(hg, id))
    }

    pub fn difference(&self, hg: &Hypergraph, other: &Self) -> Self {
        self.filter(hg, |id| !other.contains(hg, id))
    }

    pub fn symmetric_difference(&self, hg: &Hypergraph, other: &Self) -> Self {
        let mut ids: FxIndexSet<K::Id> = self
            .iter(hg)
            .filter(|id| !other.contains(hg, id))
            .cloned()
            .collect();
        ids.extend(other.iter(hg).filter(|id| !self.contains(hg, id)).cloned());
        Self::bunch(ids)
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Entities sharing at least one incidence with `id`, excluding `id`.
    ///
    /// Neighbours are taken from the whole hypergraph, not only this view.
    pub fn neighbors(&self, hg: &Hypergraph, id: &K::Id) -> Result<FxIndexSet<K::Id>> {
        let other = <K::Other as Entity>::incidence(hg);
        let mut out = FxIndexSet::default();
        for via in self.lookup(hg, id)? {
            if let Some(reached) = other.get(via) {
                out.extend(reached.iter().filter(|n| *n != id).cloned());
            }
        }
        Ok(out)
    }

    /// Redundant IDs of this view: entities whose incidence set repeats that
    /// of an earlier entity in the view. The first-seen entity of each group
    /// is not reported.
    pub fn duplicates(&self, hg: &Hypergraph) -> Vec<K::Id> {
        let map = K::incidence(hg);
        let entries = self.iter(hg).filter_map(|id| map.get_key_value(id));
        incidence::redundant(incidence::duplicate_groups(entries))
    }

    // =========================================================================
    // Stats
    // =========================================================================

    /// A lazy query for a builtin stat.
    pub fn stat(&self, name: &str) -> Result<StatQuery<K>> {
        let kernel = K::builtin_stat(name).ok_or_else(|| Error::UnknownStat(name.to_string()))?;
        Ok(StatQuery::new(self.clone(), kernel))
    }

    /// A lazy query for a builtin or registered stat.
    pub fn stat_with(&self, registry: &StatRegistry<K>, name: &str) -> Result<StatQuery<K>> {
        Ok(StatQuery::new(self.clone(), registry.get(name)?))
    }

    /// A lazy query for an attribute. Entities without it yield `Null`.
    pub fn attrs(&self, key: &str) -> StatQuery<K> {
        StatQuery::new(self.clone(), Arc::new(stats::AttrStat::new(key, AttrValue::Null)))
    }

    /// Several builtin stats evaluated together.
    pub fn multi(&self, names: &[&str]) -> Result<MultiStatQuery<K>> {
        self.multi_with(&StatRegistry::new(), names)
    }

    pub fn multi_with(&self, registry: &StatRegistry<K>, names: &[&str]) -> Result<MultiStatQuery<K>> {
        let kernels = names
            .iter()
            .map(|name| registry.get(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(MultiStatQuery::new(self.clone(), kernels))
    }
}

impl NodeView {
    /// Nodes that belong to no edge.
    ///
    /// With `ignore_singletons`, nodes whose every edge has a single member
    /// count as isolated too.
    pub fn isolates(&self, hg: &Hypergraph, ignore_singletons: bool) -> Self {
        let members = hg.store.member_map();
        self.filter(hg, |n| match hg.store.memberships(n) {
            Some(edges) if ignore_singletons => edges
                .iter()
                .all(|e| members.get(e).map_or(true, |m| m.len() <= 1)),
            Some(edges) => edges.is_empty(),
            None => false,
        })
    }

    /// Lazy node degree.
    pub fn degree(&self) -> StatQuery<NodeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Degree::default()))
    }

    /// Lazy node degree counting only edges of the given order.
    pub fn degree_of_order(&self, order: usize) -> StatQuery<NodeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Degree::of_order(order)))
    }

    pub fn average_neighbor_degree(&self) -> StatQuery<NodeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::AverageNeighborDegree))
    }

    pub fn clustering(&self) -> StatQuery<NodeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Clustering))
    }

    pub fn centrality(&self) -> StatQuery<NodeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Centrality::default()))
    }
}

impl EdgeView {
    /// Edges with at most one member.
    pub fn singletons(&self, hg: &Hypergraph) -> Self {
        self.filter(hg, |e| hg.store.size(e).map_or(false, |s| s <= 1))
    }

    /// Edges not strictly contained in another edge.
    ///
    /// Edges with identical members are all maximal.
    pub fn maximal(&self, hg: &Hypergraph) -> Self {
        let store = &hg.store;
        self.filter(hg, |e| {
            let Some(members) = store.members(e) else {
                return false;
            };
            let mut iter = members.iter();
            let Some(first) = iter.next() else {
                return store.iter_members().all(|(_, m)| m.is_empty());
            };
            let Some(candidates) = store.memberships(first) else {
                return true;
            };
            !candidates.iter().any(|f| {
                f != e
                    && store.size(f).map_or(false, |s| s > members.len())
                    && members.iter().all(|n| store.is_member(n, f))
            })
        })
    }

    /// Lazy edge size.
    pub fn size(&self) -> StatQuery<EdgeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Size::default()))
    }

    /// Lazy edge order (size minus one).
    pub fn order(&self) -> StatQuery<EdgeKind> {
        StatQuery::new(self.clone(), Arc::new(stats::Order::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Hypergraph {
        Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4], vec![1]]).unwrap()
    }

    fn nodes(raw: &[i64]) -> Vec<NodeId> {
        raw.iter().map(|&i| NodeId::from(i)).collect()
    }

    fn edges(raw: &[i64]) -> Vec<EdgeId> {
        raw.iter().map(|&i| EdgeId::from(i)).collect()
    }

    #[test]
    fn enumeration_and_membership() {
        let hg = sample();
        let all = hg.nodes();
        assert_eq!(all.ids(&hg), nodes(&[1, 2, 3, 4]));
        assert_eq!(all.len(&hg), 4);
        assert!(all.contains(&hg, &NodeId::from(3)));
        assert!(!all.contains(&hg, &NodeId::from(9)));

        let some = NodeView::from_ids([4, 1, 9]);
        assert_eq!(some.ids(&hg), nodes(&[4, 1]));
        assert!(!some.contains(&hg, &NodeId::from(2)));
    }

    #[test]
    fn views_see_later_edits() {
        let mut hg = sample();
        let view = NodeView::from_ids([1, 3]);
        assert_eq!(view.len(&hg), 2);
        hg.remove_node(&NodeId::from(3)).unwrap();
        assert_eq!(view.ids(&hg), nodes(&[1]));
    }

    #[test]
    fn filterby_degree() {
        let hg = sample();
        let hubs = hg.nodes().filterby(&hg, "degree", 2).unwrap();
        assert_eq!(hubs.ids(&hg), nodes(&[1, 2]));

        let low = hg
            .nodes()
            .filterby(&hg, "degree", Criterion::Lt(AttrValue::Int(2)))
            .unwrap();
        assert_eq!(low.ids(&hg), nodes(&[3, 4]));

        let mid = hg
            .edges()
            .filterby(&hg, "size", Criterion::Between(2.into(), 3.into()))
            .unwrap();
        assert_eq!(mid.ids(&hg), edges(&[0, 1]));
    }

    #[test]
    fn filterby_unknown_stat() {
        let hg = sample();
        let err = hg.nodes().filterby(&hg, "charisma", 1).unwrap_err();
        assert_eq!(err, Error::UnknownStat("charisma".into()));
    }

    #[test]
    fn filterby_attr_with_missing() {
        let mut hg = sample();
        hg.set_node_attr(&NodeId::from(1), "color", "red").unwrap();
        hg.set_node_attr(&NodeId::from(2), "color", "blue").unwrap();

        let red = hg.nodes().filterby_attr(&hg, "color", "red", None).unwrap();
        assert_eq!(red.ids(&hg), nodes(&[1]));

        let not_blue = hg
            .nodes()
            .filterby_attr(&hg, "color", Criterion::Ne("blue".into()), Some("none".into()))
            .unwrap();
        assert_eq!(not_blue.ids(&hg), nodes(&[1, 3, 4]));
    }

    #[test]
    fn ordering_against_incomparable_type_fails() {
        let mut hg = sample();
        hg.set_node_attr(&NodeId::from(1), "color", "red").unwrap();
        let err = hg
            .nodes()
            .filterby_attr(&hg, "color", Criterion::Gt(1.into()), None)
            .unwrap_err();
        assert!(matches!(err, Error::Value(_)));
    }

    #[test]
    fn null_never_satisfies_ordering() {
        assert!(!Criterion::Gt(0.into()).matches(&AttrValue::Null).unwrap());
        assert!(Criterion::Ne(0.into()).matches(&AttrValue::Null).unwrap());
        assert!(Criterion::Custom(|v| v.is_null()).matches(&AttrValue::Null).unwrap());
    }

    #[test]
    fn set_algebra() {
        let hg = sample();
        let a = NodeView::from_ids([1, 2, 3]);
        let b = NodeView::from_ids([3, 4]);
        assert_eq!(a.union(&hg, &b).ids(&hg), nodes(&[1, 2, 3, 4]));
        assert_eq!(a.intersection(&hg, &b).ids(&hg), nodes(&[3]));
        assert_eq!(a.difference(&hg, &b).ids(&hg), nodes(&[1, 2]));
        assert_eq!(a.symmetric_difference(&hg, &b).ids(&hg), nodes(&[1, 2, 4]));
        assert_eq!(a.ids(&hg).len(), 3);
    }

    #[test]
    fn neighbors_exclude_self() {
        let hg = sample();
        let n = hg.nodes().neighbors(&hg, &NodeId::from(2)).unwrap();
        let mut n: Vec<_> = n.into_iter().collect();
        n.sort();
        assert_eq!(n, nodes(&[1, 3, 4]));

        let e = hg.edges().neighbors(&hg, &EdgeId::from(0)).unwrap();
        let mut e: Vec<_> = e.into_iter().collect();
        e.sort();
        assert_eq!(e, edges(&[1, 2]));

        assert!(hg.nodes().neighbors(&hg, &NodeId::from(9)).unwrap_err().is_not_found());
    }

    #[test]
    fn isolates_and_singletons() {
        let mut hg = sample();
        hg.add_node_with_id(7).unwrap();
        assert_eq!(hg.nodes().isolates(&hg, false).ids(&hg), nodes(&[7]));
        assert_eq!(hg.nodes().isolates(&hg, true).ids(&hg), nodes(&[7]));
        assert_eq!(hg.edges().singletons(&hg).ids(&hg), edges(&[2]));

        hg.add_edge([8]).unwrap();
        assert_eq!(hg.nodes().isolates(&hg, true).ids(&hg), nodes(&[7, 8]));
    }

    #[test]
    fn view_duplicates() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2], vec![1, 2], vec![1, 2], vec![3]]).unwrap();
        assert_eq!(hg.edges().duplicates(&hg), edges(&[1, 2]));
        assert_eq!(EdgeView::from_ids([2, 1]).duplicates(&hg), edges(&[1]));
    }

    #[test]
    fn maximal_edges() {
        let hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3], vec![1, 2], vec![3, 4], vec![3, 4]]).unwrap();
        assert_eq!(hg.edges().maximal(&hg).ids(&hg), edges(&[0, 2, 3]));
    }
}
