// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lazy stat queries and their materialized forms.
//!
//! A [`StatQuery`] captures a view and a kernel. Nothing is computed until a
//! materializing call (`evaluate`, `asdict`, an aggregate, ...). The result is
//! cached together with the structure version it was computed at and is
//! reused until the hypergraph changes.
//!
//! Aggregates over an empty view follow fixed sentinels: `sum` is 0.0, every
//! other aggregate is NaN and `argmax`/`argmin` are `None`. Any non-numeric
//! value (including `Null`) makes a numeric aggregate fail with
//! [`Error::Value`].

use std::cell::RefCell;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::StatKernel;
use crate::attrs::AttrValue;
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::incidence::FxIndexMap;
use crate::view::{Entity, View};

/// A numeric reduction over stat values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    Sum,
    Mean,
    Max,
    Min,
    Median,
    /// Population variance.
    Var,
    /// Population standard deviation.
    Std,
    /// `order`-th moment, about the mean when `center` is set and about zero
    /// otherwise.
    Moment { order: u32, center: bool },
}

impl Aggregate {
    /// Reduces `xs`. Empty input yields 0.0 for `Sum` and NaN otherwise.
    pub fn apply(self, xs: &[f64]) -> f64 {
        if xs.is_empty() {
            return match self {
                Aggregate::Sum => 0.0,
                _ => f64::NAN,
            };
        }
        let n = xs.len() as f64;
        let mean = || xs.iter().sum::<f64>() / n;

        match self {
            Aggregate::Sum => xs.iter().sum(),
            Aggregate::Mean => mean(),
            Aggregate::Max => xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Min => xs.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Median => {
                let mut sorted = xs.to_vec();
                sorted.sort_by(f64::total_cmp);
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregate::Var => Aggregate::Moment { order: 2, center: true }.apply(xs),
            Aggregate::Std => Aggregate::Var.apply(xs).sqrt(),
            Aggregate::Moment { order, center } => {
                let c = if center { mean() } else { 0.0 };
                let power = |x: f64| match i32::try_from(order) {
                    Ok(p) => x.powi(p),
                    Err(_) => x.powf(f64::from(order)),
                };
                xs.iter().map(|x| power(x - c)).sum::<f64>() / n
            }
        }
    }
}

/// Materialized stat values, row-aligned with their IDs.
#[derive(Debug, Clone)]
pub struct StatValues<K: Entity> {
    ids: Vec<K::Id>,
    values: Vec<AttrValue>,
}

impl<K: Entity> StatValues<K> {
    pub fn ids(&self) -> &[K::Id] {
        &self.ids
    }

    pub fn values(&self) -> &[AttrValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: &K::Id) -> Option<&AttrValue> {
        self.ids.iter().position(|i| i == id).map(|p| &self.values[p])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K::Id, &AttrValue)> + '_ {
        self.ids.iter().zip(&self.values)
    }

    pub fn into_map(self) -> FxIndexMap<K::Id, AttrValue> {
        self.ids.into_iter().zip(self.values).collect()
    }
}

/// One named column of a stat table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<AttrValue>,
}

#[derive(Debug, Clone)]
struct Materialized<K: Entity> {
    instance: u64,
    version: u64,
    values: StatValues<K>,
}

/// A lazily evaluated stat bound to a view.
#[derive(Debug, Clone)]
pub struct StatQuery<K: Entity> {
    view: View<K>,
    kernel: Arc<dyn StatKernel<K>>,
    cache: RefCell<Option<Materialized<K>>>,
}

impl<K: Entity> StatQuery<K> {
    pub fn new(view: View<K>, kernel: Arc<dyn StatKernel<K>>) -> Self {
        Self {
            view,
            kernel,
            cache: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.kernel.name()
    }

    pub fn view(&self) -> &View<K> {
        &self.view
    }

    /// Returns `true` if a cached result is valid for `hg` as it is now.
    pub fn is_materialized(&self, hg: &Hypergraph) -> bool {
        self.cache
            .borrow()
            .as_ref()
            .map_or(false, |m| m.instance == hg.instance() && m.version == hg.version())
    }

    fn with_values<R>(&self, hg: &Hypergraph, f: impl FnOnce(&StatValues<K>) -> Result<R>) -> Result<R> {
        if self.is_materialized(hg) {
            if let Some(m) = self.cache.borrow().as_ref() {
                return f(&m.values);
            }
        }

        let ids = self.view.ids(hg);
        let values = self.kernel.evaluate(hg, &ids)?;
        if values.len() != ids.len() {
            return Err(Error::invariant(format!(
                "stat '{}' produced {} values for {} ids",
                self.name(),
                values.len(),
                ids.len()
            )));
        }
        let values = StatValues { ids, values };
        let result = f(&values);
        *self.cache.borrow_mut() = Some(Materialized {
            instance: hg.instance(),
            version: hg.version(),
            values,
        });
        result
    }

    fn numeric(&self, values: &StatValues<K>) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|(id, v)| {
                v.as_f64().ok_or_else(|| {
                    Error::value(format!(
                        "stat '{}' is not numeric for {} {id}: {}",
                        self.name(),
                        K::NAME,
                        v.type_name()
                    ))
                })
            })
            .collect()
    }

    // =========================================================================
    // Materialization
    // =========================================================================

    pub fn evaluate(&self, hg: &Hypergraph) -> Result<StatValues<K>> {
        self.with_values(hg, |v| Ok(v.clone()))
    }

    /// ID → value, in view order.
    pub fn asdict(&self, hg: &Hypergraph) -> Result<FxIndexMap<K::Id, AttrValue>> {
        self.evaluate(hg).map(StatValues::into_map)
    }

    pub fn aslist(&self, hg: &Hypergraph) -> Result<Vec<AttrValue>> {
        self.with_values(hg, |v| Ok(v.values.clone()))
    }

    /// Values as floats; fails on any non-numeric value.
    pub fn asarray(&self, hg: &Hypergraph) -> Result<Vec<f64>> {
        self.with_values(hg, |v| self.numeric(v))
    }

    /// Values as a named table column.
    pub fn as_column(&self, hg: &Hypergraph) -> Result<Column> {
        Ok(Column {
            name: self.name().to_string(),
            values: self.aslist(hg)?,
        })
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    pub fn aggregate(&self, hg: &Hypergraph, op: Aggregate) -> Result<f64> {
        self.with_values(hg, |v| Ok(op.apply(&self.numeric(v)?)))
    }

    pub fn sum(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Sum)
    }

    pub fn mean(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Mean)
    }

    pub fn max(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Max)
    }

    pub fn min(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Min)
    }

    pub fn median(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Median)
    }

    pub fn var(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Var)
    }

    pub fn std(&self, hg: &Hypergraph) -> Result<f64> {
        self.aggregate(hg, Aggregate::Std)
    }

    pub fn moment(&self, hg: &Hypergraph, order: u32, center: bool) -> Result<f64> {
        self.aggregate(hg, Aggregate::Moment { order, center })
    }

    /// ID of the largest value; the first one on ties.
    pub fn argmax(&self, hg: &Hypergraph) -> Result<Option<K::Id>> {
        self.arg_extreme(hg, |candidate, best| candidate > best)
    }

    /// ID of the smallest value; the first one on ties.
    pub fn argmin(&self, hg: &Hypergraph) -> Result<Option<K::Id>> {
        self.arg_extreme(hg, |candidate, best| candidate < best)
    }

    fn arg_extreme(&self, hg: &Hypergraph, better: impl Fn(f64, f64) -> bool) -> Result<Option<K::Id>> {
        self.with_values(hg, |v| {
            let xs = self.numeric(v)?;
            let mut best: Option<usize> = None;
            for (i, &x) in xs.iter().enumerate() {
                if x.is_nan() {
                    continue;
                }
                if best.map_or(true, |b| better(x, xs[b])) {
                    best = Some(i);
                }
            }
            Ok(best.map(|i| v.ids[i].clone()))
        })
    }

    /// Distinct values in order of first appearance.
    pub fn unique(&self, hg: &Hypergraph) -> Result<Vec<AttrValue>> {
        self.with_values(hg, |v| {
            let mut out: Vec<AttrValue> = Vec::new();
            for value in &v.values {
                if !out.contains(value) {
                    out.push(value.clone());
                }
            }
            Ok(out)
        })
    }
}

/// Several stats evaluated together over one ID ordering.
#[derive(Debug, Clone)]
pub struct MultiStatQuery<K: Entity> {
    view: View<K>,
    kernels: Vec<Arc<dyn StatKernel<K>>>,
}

impl<K: Entity> MultiStatQuery<K> {
    pub fn new(view: View<K>, kernels: Vec<Arc<dyn StatKernel<K>>>) -> Self {
        Self { view, kernels }
    }

    /// Adds one more column.
    pub fn with(mut self, kernel: Arc<dyn StatKernel<K>>) -> Self {
        self.kernels.push(kernel);
        self
    }

    /// Evaluates every kernel exactly once against the same ID list.
    pub fn evaluate(&self, hg: &Hypergraph) -> Result<StatTable<K>> {
        let ids = self.view.ids(hg);
        let mut columns = Vec::with_capacity(self.kernels.len());
        for kernel in &self.kernels {
            let values = kernel.evaluate(hg, &ids)?;
            if values.len() != ids.len() {
                return Err(Error::invariant(format!(
                    "stat '{}' produced {} values for {} ids",
                    kernel.name(),
                    values.len(),
                    ids.len()
                )));
            }
            columns.push(Column {
                name: kernel.name().to_string(),
                values,
            });
        }
        Ok(StatTable { ids, columns })
    }
}

/// Row-aligned result of a [`MultiStatQuery`].
#[derive(Debug, Clone)]
pub struct StatTable<K: Entity> {
    ids: Vec<K::Id>,
    columns: Vec<Column>,
}

impl<K: Entity> StatTable<K> {
    pub fn ids(&self) -> &[K::Id] {
        &self.ids
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column name → value for one ID.
    pub fn row(&self, id: &K::Id) -> Option<FxIndexMap<&str, &AttrValue>> {
        let index = self.ids.iter().position(|i| i == id)?;
        Some(
            self.columns
                .iter()
                .map(|c| (c.name.as_str(), &c.values[index]))
                .collect(),
        )
    }

    /// Every row as an owned record, in ID order.
    pub fn records(&self) -> Vec<(K::Id, FxIndexMap<String, AttrValue>)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(index, id)| {
                let record = self
                    .columns
                    .iter()
                    .map(|c| (c.name.clone(), c.values[index].clone()))
                    .collect();
                (id.clone(), record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EdgeId, NodeId};
    use crate::view::NodeView;
    use approx::assert_relative_eq;

    fn sample() -> Hypergraph {
        Hypergraph::from_edge_list(vec![vec![1, 2], vec![2, 3, 4], vec![1]]).unwrap()
    }

    #[test]
    fn construction_is_lazy() {
        let hg = sample();
        let degree = hg.nodes().degree();
        assert!(!degree.is_materialized(&hg));
        degree.sum(&hg).unwrap();
        assert!(degree.is_materialized(&hg));
    }

    #[test]
    fn reflects_state_at_materialization() {
        let mut hg = sample();
        let degree = hg.nodes().degree();
        hg.add_edge([3, 4]).unwrap();
        let values = degree.asdict(&hg).unwrap();
        assert_eq!(values[&NodeId::from(3)], AttrValue::Int(2));

        hg.remove_edge(&EdgeId::from(3)).unwrap();
        assert!(!degree.is_materialized(&hg));
        assert_eq!(degree.asdict(&hg).unwrap()[&NodeId::from(3)], AttrValue::Int(1));
    }

    #[test]
    fn replaced_hypergraph_is_not_served_from_cache() {
        let mut hg = Hypergraph::from_edge_list(vec![vec![1, 2]]).unwrap();
        let degree = hg.nodes().degree();
        assert_relative_eq!(degree.sum(&hg).unwrap(), 2.0);

        hg = Hypergraph::from_edge_list(vec![vec![1, 2, 3], vec![1, 2]]).unwrap();
        assert!(!degree.is_materialized(&hg));
        assert_relative_eq!(degree.sum(&hg).unwrap(), 5.0);

        let mut other = Hypergraph::from_edge_list(vec![vec![7]]).unwrap();
        std::mem::swap(&mut hg, &mut other);
        assert_relative_eq!(degree.sum(&hg).unwrap(), 1.0);

        let copy = other.clone();
        degree.sum(&other).unwrap();
        assert!(!degree.is_materialized(&copy));
    }

    #[test]
    fn moment_orders_beyond_i32() {
        assert_relative_eq!(Aggregate::Moment { order: 3, center: false }.apply(&[2.0, -1.0]), 3.5);
        let huge = Aggregate::Moment { order: u32::MAX, center: false }.apply(&[1.0, 1.0]);
        assert_relative_eq!(huge, 1.0);
        let odd = Aggregate::Moment { order: u32::MAX, center: false }.apply(&[-1.0]);
        assert_relative_eq!(odd, -1.0);
    }

    #[test]
    fn aggregates() {
        let hg = sample();
        let degree = hg.nodes().degree();
        assert_relative_eq!(degree.sum(&hg).unwrap(), 6.0);
        assert_relative_eq!(degree.mean(&hg).unwrap(), 1.5);
        assert_relative_eq!(degree.max(&hg).unwrap(), 2.0);
        assert_relative_eq!(degree.min(&hg).unwrap(), 1.0);
        assert_relative_eq!(degree.median(&hg).unwrap(), 1.5);
        assert_relative_eq!(degree.var(&hg).unwrap(), 0.25);
        assert_relative_eq!(degree.std(&hg).unwrap(), 0.5);
        assert_relative_eq!(degree.moment(&hg, 2, false).unwrap(), 2.5);
        assert_eq!(degree.argmax(&hg).unwrap(), Some(NodeId::from(1)));
        assert_eq!(degree.argmin(&hg).unwrap(), Some(NodeId::from(3)));
        assert_eq!(
            degree.unique(&hg).unwrap(),
            vec![AttrValue::Int(2), AttrValue::Int(1)]
        );
    }

    #[test]
    fn empty_view_sentinels() {
        let hg = sample();
        let empty = NodeView::from_ids(Vec::<NodeId>::new()).degree();
        assert!(empty.mean(&hg).unwrap().is_nan());
        assert!(empty.max(&hg).unwrap().is_nan());
        assert!(empty.std(&hg).unwrap().is_nan());
        assert_eq!(empty.sum(&hg).unwrap(), 0.0);
        assert_eq!(empty.argmax(&hg).unwrap(), None);

        let nothing = Hypergraph::new();
        assert!(nothing.nodes().degree().mean(&nothing).unwrap().is_nan());
    }

    #[test]
    fn null_values_break_numeric_aggregation() {
        let mut hg = sample();
        hg.set_node_attr(&NodeId::from(1), "w", 1.0).unwrap();
        let weights = hg.nodes().attrs("w");
        assert_eq!(weights.aslist(&hg).unwrap()[1], AttrValue::Null);
        assert!(matches!(weights.mean(&hg).unwrap_err(), Error::Value(_)));
        assert!(weights.unique(&hg).is_ok());
    }

    #[test]
    fn multi_stat_rows_align() {
        let hg = sample();
        let table = hg
            .nodes()
            .multi(&["degree", "clustering"])
            .unwrap()
            .evaluate(&hg)
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.columns().len(), 2);
        let row = table.row(&NodeId::from(2)).unwrap();
        assert_eq!(row["degree"], &AttrValue::Int(2));
        assert_eq!(row["clustering"], &AttrValue::Float(1.0 / 3.0));
        let records = table.records();
        assert_eq!(records[0].0, NodeId::from(1));
        assert_eq!(records[0].1["degree"], AttrValue::Int(2));
    }

    #[test]
    fn unknown_stat_in_batch() {
        let hg = sample();
        let err = hg.nodes().multi(&["degree", "nope"]).unwrap_err();
        assert_eq!(err, Error::UnknownStat("nope".into()));
        assert!(hg.edges().stat("degree").is_err());
        assert_eq!(hg.edges().stat("order").unwrap().sum(&hg).unwrap(), 3.0);
    }

    #[test]
    fn median_of_odd_count() {
        assert_eq!(Aggregate::Median.apply(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(Aggregate::Moment { order: 3, center: true }.apply(&[1.0, 2.0, 3.0]), 0.0);
    }
}
