// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier types and the per-kind identifier allocator.
//!
//! Nodes and edges live in independent ID spaces: a node and an edge may carry
//! equal-valued IDs without colliding. Each space uses its own newtype over
//! [`Id`], so the compiler keeps the two apart.
//!
//! Auto-generated IDs are non-negative integers handed out by an
//! [`IdAllocator`]. Callers may also supply their own IDs (integers or
//! strings, mixed freely); the allocator advances its frontier past every
//! explicit integer it is told about, so it never produces an ID that was
//! claimed out of band.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A hashable, ordered identifier value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Name(String),
}

impl Id {
    /// Returns the integer value, if this is an integer ID.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Id::Int(i) => Some(*i),
            Id::Name(_) => None,
        }
    }

    /// Returns the string value, if this is a named ID.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Id::Int(_) => None,
            Id::Name(s) => Some(s),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(i) => write!(f, "{i}"),
            Id::Name(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(i: i64) -> Self {
        Id::Int(i)
    }
}

impl From<i32> for Id {
    fn from(i: i32) -> Self {
        Id::Int(i64::from(i))
    }
}

impl From<u32> for Id {
    fn from(i: u32) -> Self {
        Id::Int(i64::from(i))
    }
}

impl From<usize> for Id {
    fn from(i: usize) -> Self {
        Id::Int(i as i64)
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Name(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Name(s)
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Id);

        impl $name {
            /// Returns the underlying identifier value.
            pub fn id(&self) -> &Id {
                &self.0
            }

            /// Returns the integer value, if this is an integer ID.
            pub fn as_int(&self) -> Option<i64> {
                self.0.as_int()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Id> for $name {
            fn from(id: Id) -> Self {
                $name(id)
            }
        }

        impl From<&$name> for $name {
            fn from(id: &$name) -> Self {
                id.clone()
            }
        }

        impl From<i64> for $name {
            fn from(i: i64) -> Self {
                $name(Id::from(i))
            }
        }

        impl From<i32> for $name {
            fn from(i: i32) -> Self {
                $name(Id::from(i))
            }
        }

        impl From<u32> for $name {
            fn from(i: u32) -> Self {
                $name(Id::from(i))
            }
        }

        impl From<usize> for $name {
            fn from(i: usize) -> Self {
                $name(Id::from(i))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(Id::from(s))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(Id::from(s))
            }
        }
    };
}

entity_id! {
    /// Identifier of a node.
    NodeId
}

entity_id! {
    /// Identifier of a hyperedge.
    EdgeId
}

/// Allocates fresh integer IDs for one ID space.
///
/// Allocation is O(1) amortized: a frontier counter is bumped past every
/// integer ID the allocator hands out or is told about through
/// [`observe`](Self::observe). Released IDs are only handed out again when
/// the allocator was built with reuse enabled, smallest first.
///
/// Once the frontier has passed `i64::MAX` the allocator falls back to a
/// linear scan from 0 that skips every ID the caller's guard reports as in
/// use. Allocation fails only when that scan runs out too.
#[derive(Debug, Clone)]
pub struct IdAllocator {
    /// `None` once `i64::MAX` has been handed out or observed.
    next: Option<i64>,
    /// Cursor of the fallback scan.
    scan: Option<i64>,
    reuse: bool,
    released: BTreeSet<i64>,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl IdAllocator {
    /// Creates an allocator starting at 0.
    pub fn new(reuse: bool) -> Self {
        Self {
            next: Some(0),
            scan: Some(0),
            reuse,
            released: BTreeSet::new(),
        }
    }

    /// Returns the smallest integer the frontier will hand out next, or
    /// `None` once the frontier is exhausted.
    pub fn frontier(&self) -> Option<i64> {
        self.next
    }

    /// Returns a fresh ID that `in_use` reports as free, or `None` when the
    /// integer space is exhausted.
    ///
    /// `in_use` is consulted as a guard against IDs claimed without going
    /// through `observe` (relabels, snapshots).
    pub fn next_id(&mut self, in_use: impl Fn(i64) -> bool) -> Option<i64> {
        if self.reuse {
            while let Some(id) = self.released.pop_first() {
                if !in_use(id) {
                    return Some(id);
                }
            }
        }
        while let Some(id) = self.next {
            self.advance_past(id);
            if !in_use(id) {
                return Some(id);
            }
        }
        while let Some(id) = self.scan {
            self.scan = id.checked_add(1);
            if !in_use(id) {
                return Some(id);
            }
        }
        None
    }

    /// Records an explicitly supplied ID so it is never auto-generated.
    pub fn observe(&mut self, id: &Id) {
        if let Id::Int(i) = *id {
            if self.next.map_or(false, |next| i >= next) {
                self.advance_past(i);
            }
            self.released.remove(&i);
        }
    }

    /// Returns an ID to the pool. Ignored unless reuse is enabled.
    pub fn release(&mut self, id: &Id) {
        if !self.reuse {
            return;
        }
        if let (Id::Int(i), Some(next)) = (id, self.next) {
            if *i >= 0 && *i < next {
                self.released.insert(*i);
            }
        }
    }

    /// Moves the frontier past `id`. The fallback scan covers released IDs
    /// once the frontier is gone.
    fn advance_past(&mut self, id: i64) {
        self.next = id.checked_add(1);
        if self.next.is_none() {
            self.released.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_and_edge_ids_are_distinct_types() {
        let n = NodeId::from(3);
        let e = EdgeId::from(3);
        assert_eq!(n.id(), e.id());
        assert_eq!(n.to_string(), "3");
        assert_eq!(NodeId::from("x").to_string(), "x");
    }

    #[test]
    fn id_ordering_puts_integers_first() {
        let mut ids = vec![Id::from("b"), Id::from(2), Id::from("a"), Id::from(-1)];
        ids.sort();
        assert_eq!(ids, vec![Id::from(-1), Id::from(2), Id::from("a"), Id::from("b")]);
    }

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = IdAllocator::new(false);
        assert_eq!(alloc.next_id(|_| false).unwrap(), 0);
        assert_eq!(alloc.next_id(|_| false).unwrap(), 1);
        alloc.release(&Id::Int(0));
        assert_eq!(alloc.next_id(|_| false).unwrap(), 2);
    }

    #[test]
    fn allocator_skips_observed_ids() {
        let mut alloc = IdAllocator::new(false);
        alloc.observe(&Id::from("x"));
        alloc.observe(&Id::from(5));
        alloc.observe(&Id::from(6));
        assert_eq!(alloc.frontier(), Some(7));
        assert_eq!(alloc.next_id(|_| false).unwrap(), 7);
    }

    #[test]
    fn allocator_observes_out_of_order_ids() {
        let mut alloc = IdAllocator::new(false);
        alloc.observe(&Id::from(10));
        alloc.observe(&Id::from(3));
        assert_eq!(alloc.next_id(|_| false).unwrap(), 11);
    }

    #[test]
    fn allocator_consults_guard() {
        let mut alloc = IdAllocator::new(false);
        let taken = [0_i64, 1];
        assert_eq!(alloc.next_id(|i| taken.contains(&i)), Some(2));
    }

    #[test]
    fn allocator_reuses_smallest_released_when_enabled() {
        let mut alloc = IdAllocator::new(true);
        for _ in 0..4 {
            alloc.next_id(|_| false);
        }
        alloc.release(&Id::Int(2));
        alloc.release(&Id::Int(1));
        assert_eq!(alloc.next_id(|_| false).unwrap(), 1);
        assert_eq!(alloc.next_id(|_| false).unwrap(), 2);
        assert_eq!(alloc.next_id(|_| false).unwrap(), 4);
    }

    #[test]
    fn observed_id_is_not_reused() {
        let mut alloc = IdAllocator::new(true);
        alloc.next_id(|_| false);
        alloc.release(&Id::Int(0));
        alloc.observe(&Id::Int(0));
        assert_eq!(alloc.next_id(|_| false).unwrap(), 1);
    }

    #[test]
    fn allocator_survives_the_largest_explicit_id() {
        let mut alloc = IdAllocator::new(false);
        alloc.observe(&Id::Int(i64::MAX));
        assert_eq!(alloc.frontier(), None);
        alloc.observe(&Id::Int(i64::MAX));

        let live = [0_i64, 2];
        assert_eq!(alloc.next_id(|i| live.contains(&i)), Some(1));
        assert_eq!(alloc.next_id(|i| live.contains(&i)), Some(3));
    }

    #[test]
    fn reuse_stops_once_the_frontier_is_exhausted() {
        let mut alloc = IdAllocator::new(true);
        alloc.observe(&Id::Int(i64::MAX - 1));
        assert_eq!(alloc.next_id(|_| false), Some(i64::MAX));
        alloc.release(&Id::Int(i64::MAX));
        assert!(alloc.released.is_empty());
        assert_eq!(alloc.next_id(|i| i < 5), Some(5));
        assert_eq!(alloc.next_id(|_| false), Some(6));
    }
}
