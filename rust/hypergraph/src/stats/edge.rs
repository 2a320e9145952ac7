// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Builtin edge stats.

use super::{map_ids, StatKernel};
use crate::attrs::AttrValue;
use crate::error::Result;
use crate::hypergraph::Hypergraph;
use crate::ids::EdgeId;
use crate::view::EdgeKind;

/// Number of members. With `degree`, only members of that degree count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Size {
    pub degree: Option<usize>,
}

impl Size {
    pub fn of_degree(degree: usize) -> Self {
        Self { degree: Some(degree) }
    }
}

/// Size minus one. An empty edge has order -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Order {
    pub degree: Option<usize>,
}

impl Order {
    pub fn of_degree(degree: usize) -> Self {
        Self { degree: Some(degree) }
    }
}

fn counted_size(hg: &Hypergraph, edge: &EdgeId, degree: Option<usize>) -> Result<usize> {
    let members = hg.members(edge)?;
    Ok(match degree {
        None => members.len(),
        Some(d) => members
            .iter()
            .filter(|n| hg.store().degree(n) == Some(d))
            .count(),
    })
}

impl StatKernel<EdgeKind> for Size {
    fn name(&self) -> &str {
        "size"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[EdgeId]) -> Result<Vec<AttrValue>> {
        map_ids(hg, ids, |e| counted_size(hg, e, self.degree).map(AttrValue::from))
    }
}

impl StatKernel<EdgeKind> for Order {
    fn name(&self) -> &str {
        "order"
    }

    fn evaluate(&self, hg: &Hypergraph, ids: &[EdgeId]) -> Result<Vec<AttrValue>> {
        map_ids(hg, ids, |e| {
            counted_size(hg, e, self.degree).map(|s| AttrValue::Int(s as i64 - 1))
        })
    }
}
