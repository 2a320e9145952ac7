// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for hypergraph operations.

use crate::ids::{EdgeId, NodeId};

/// Result type alias for hypergraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during hypergraph operations.
///
/// Every structural mutator checks its preconditions before touching the
/// incidence store, so an `Err` always means nothing was modified.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A referenced node is not present.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// A referenced edge is not present.
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),

    /// An explicitly supplied node ID is already used by a live node.
    #[error("node id already in use: {0}")]
    DuplicateNodeId(NodeId),

    /// An explicitly supplied edge ID is already used by a live edge.
    #[error("edge id already in use: {0}")]
    DuplicateEdgeId(EdgeId),

    /// The operation would break one of the structure's invariants.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A stat was requested by a name that is neither builtin nor registered.
    #[error("unknown stat: {0}")]
    UnknownStat(String),

    /// A value or predicate could not be used as requested.
    #[error("invalid value: {0}")]
    Value(String),

    /// A simplex is too large to expand into its faces.
    #[error("simplex of size {size} exceeds the maximum of {max}")]
    SimplexTooLarge { size: usize, max: usize },

    /// Snapshot encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` for the not-found family (`NodeNotFound`, `EdgeNotFound`).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NodeNotFound(_) | Error::EdgeNotFound(_))
    }

    /// Returns `true` for the duplicate-ID family.
    pub fn is_duplicate_id(&self) -> bool {
        matches!(self, Error::DuplicateNodeId(_) | Error::DuplicateEdgeId(_))
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    pub(crate) fn value(msg: impl Into<String>) -> Self {
        Error::Value(msg.into())
    }
}
