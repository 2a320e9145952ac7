// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Behavioural configuration for a hypergraph instance.

use serde::{Deserialize, Serialize};

/// How attribute conflicts are resolved when entities are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MergePolicy {
    /// A later entity's value replaces an earlier one.
    #[default]
    LastWriteWins,
    /// The first value seen for a key is kept.
    FirstWriteWins,
}

/// What removing a simplex does when larger simplices still contain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaceRemovalPolicy {
    /// Remove the face together with every simplex that contains it.
    #[default]
    Cascade,
    /// Refuse the removal with `Error::InvariantViolation`.
    Reject,
}

/// Configuration for a [`Hypergraph`](crate::Hypergraph) or
/// [`SimplicialComplex`](crate::SimplicialComplex).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HypergraphConfig {
    /// Create members of a new edge that are not nodes yet. When `false`,
    /// such an insertion fails with `NodeNotFound`.
    pub materialize_missing_nodes: bool,
    /// Hand out released integer IDs again (smallest first).
    pub reuse_freed_ids: bool,
    /// Attribute conflict policy for duplicate merges and merge-relabels.
    pub merge_policy: MergePolicy,
    /// Simplicial-complex face removal policy.
    pub face_removal: FaceRemovalPolicy,
    /// Largest simplex whose faces will be generated.
    pub max_simplex_size: usize,
    /// Simplex size at which a warning is logged before expansion.
    pub warn_simplex_size: usize,
    /// Stats over at least this many IDs are computed on the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for HypergraphConfig {
    fn default() -> Self {
        Self {
            materialize_missing_nodes: true,
            reuse_freed_ids: false,
            merge_policy: MergePolicy::LastWriteWins,
            face_removal: FaceRemovalPolicy::Cascade,
            max_simplex_size: 20,
            warn_simplex_size: 12,
            parallel_threshold: 4096,
        }
    }
}

impl HypergraphConfig {
    pub fn with_materialize_missing_nodes(mut self, enabled: bool) -> Self {
        self.materialize_missing_nodes = enabled;
        self
    }

    pub fn with_reuse_freed_ids(mut self, enabled: bool) -> Self {
        self.reuse_freed_ids = enabled;
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    pub fn with_face_removal(mut self, policy: FaceRemovalPolicy) -> Self {
        self.face_removal = policy;
        self
    }

    pub fn with_max_simplex_size(mut self, size: usize) -> Self {
        self.max_simplex_size = size;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HypergraphConfig::default();
        assert!(config.materialize_missing_nodes);
        assert!(!config.reuse_freed_ids);
        assert_eq!(config.merge_policy, MergePolicy::LastWriteWins);
        assert_eq!(config.face_removal, FaceRemovalPolicy::Cascade);
        assert_eq!(config.max_simplex_size, 20);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: HypergraphConfig =
            serde_json::from_str(r#"{"reuse_freed_ids": true, "face_removal": "Reject"}"#).unwrap();
        assert!(config.reuse_freed_ids);
        assert_eq!(config.face_removal, FaceRemovalPolicy::Reject);
        assert!(config.materialize_missing_nodes);
        assert_eq!(config.parallel_threshold, 4096);
    }

    #[test]
    fn serialization_roundtrip() {
        let config = HypergraphConfig::default()
            .with_merge_policy(MergePolicy::FirstWriteWins)
            .with_max_simplex_size(8);
        let json = serde_json::to_string(&config).unwrap();
        let back: HypergraphConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
