// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Name lookup for builtin and user-registered stats.

use std::sync::Arc;

use super::{FnStat, StatKernel};
use crate::error::{Error, Result};
use crate::hypergraph::Hypergraph;
use crate::incidence::FxIndexMap;
use crate::view::Entity;

/// Resolves stat names to kernels for one ID space.
///
/// Builtin names always resolve; registered names are checked afterwards.
/// Registering a name that is already taken fails with [`Error::Value`].
#[derive(Debug, Clone)]
pub struct StatRegistry<K: Entity> {
    custom: FxIndexMap<String, Arc<dyn StatKernel<K>>>,
}

impl<K: Entity> Default for StatRegistry<K> {
    fn default() -> Self {
        Self {
            custom: FxIndexMap::default(),
        }
    }
}

impl<K: Entity> StatRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a numeric function under `name`.
    pub fn register(&mut self, name: impl Into<String>, func: fn(&Hypergraph, &K::Id) -> f64) -> Result<()> {
        let name = name.into();
        let kernel = Arc::new(FnStat::<K>::new(name.clone(), func));
        self.insert(name, kernel)
    }

    /// Registers a kernel under its own name.
    pub fn register_kernel(&mut self, kernel: Arc<dyn StatKernel<K>>) -> Result<()> {
        self.insert(kernel.name().to_string(), kernel)
    }

    fn insert(&mut self, name: String, kernel: Arc<dyn StatKernel<K>>) -> Result<()> {
        if self.contains(&name) {
            return Err(Error::value(format!(
                "{} stat name already registered: {name}",
                K::NAME
            )));
        }
        self.custom.insert(name, kernel);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        K::BUILTIN_STATS.contains(&name) || self.custom.contains_key(name)
    }

    /// Looks up a stat, failing with `UnknownStat` for an unknown name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn StatKernel<K>>> {
        if let Some(kernel) = K::builtin_stat(name) {
            return Ok(kernel);
        }
        self.custom
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownStat(name.to_string()))
    }

    /// Builtin names followed by registered names.
    pub fn names(&self) -> Vec<&str> {
        K::BUILTIN_STATS
            .iter()
            .copied()
            .chain(self.custom.keys().map(String::as_str))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::NodeId;
    use crate::view::NodeKind;

    fn doubled_degree(hg: &Hypergraph, n: &NodeId) -> f64 {
        hg.degree(n).map_or(f64::NAN, |d| 2.0 * d as f64)
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = StatRegistry::<NodeKind>::new();
        registry.register("doubled", doubled_degree).unwrap();
        assert!(registry.contains("doubled"));
        assert!(registry.contains("degree"));
        assert_eq!(registry.get("doubled").unwrap().name(), "doubled");
        assert_eq!(registry.names().last(), Some(&"doubled"));
    }

    #[test]
    fn names_cannot_be_shadowed() {
        let mut registry = StatRegistry::<NodeKind>::new();
        let err = registry.register("degree", doubled_degree).unwrap_err();
        assert!(matches!(err, Error::Value(_)));
        registry.register("doubled", doubled_degree).unwrap();
        assert!(registry.register("doubled", doubled_degree).is_err());
    }

    #[test]
    fn unknown_names() {
        let registry = StatRegistry::<NodeKind>::new();
        assert_eq!(
            registry.get("nope").unwrap_err(),
            Error::UnknownStat("nope".into())
        );
    }
}
