// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! The compressed tree of ranked ballots.
//!
//! A path from the root spells out a ballot prefix; the difference between a
//! node's value and the sum of its children's values is the number of ballots
//! that end exactly there. Keeping the multiset in this form lets elimination
//! transfer whole blocks of ballots at once instead of touching each paper.


use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::Deserialize;
use serde::Serialize;

/// A candidate, referred to by 1-based position on the ballot paper.
/// Zero is reserved for "no candidate".
///
/// A wrapper around an integer, used to prevent e.g. adding a number of votes
/// to a candidate. Rust allows zero cost abstractions for such wrappers, so
/// there is little reason not to use them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CandidateId(pub u32);
// type alias really, don't want long display
impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "{}", self.0) }
}
// type alias really, don't want long display
impl fmt::Debug for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result { write!(f, "#{}", self.0) }
}

impl FromStr for CandidateId {
    type Err = <u32 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CandidateId(u32::from_str(s)?))
    }
}

/// A node of the ballot tree.
///
/// `value` counts every ballot that either terminates at this node or passes
/// through it, so `value >= sum of children's values` always holds. Children
/// are kept in a `BTreeMap` so iteration order is deterministic (ascending
/// candidate id); tie-breaking throughout the crate relies on that.
///
/// `Clone` is a full structural copy. There is deliberately no way to share
/// subtrees between two nodes, as aliasing would break the value invariant.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub value: u64,
    children: BTreeMap<CandidateId, Node>,
}

impl Node {
    pub fn new() -> Node {
        Node { value: 0, children: BTreeMap::new() }
    }

    pub fn has_child(&self, c: CandidateId) -> bool {
        self.children.contains_key(&c)
    }

    /// Get the child node, creating a zero-valued one first if necessary.
    pub fn get_child(&mut self, c: CandidateId) -> &mut Node {
        self.children.entry(c).or_default()
    }

    pub fn child(&self, c: CandidateId) -> Option<&Node> {
        self.children.get(&c)
    }

    /// The number of top-choice votes currently credited to `c` below this
    /// node; zero if there is no such child.
    pub fn child_value(&self, c: CandidateId) -> u64 {
        self.children.get(&c).map_or(0, |n| n.value)
    }

    /// Remove the whole subtree under `c`. The child must exist.
    pub fn delete_child(&mut self, c: CandidateId) {
        let removed = self.children.remove(&c);
        assert!(removed.is_some(), "no child {c} to delete");
    }

    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = (CandidateId, &Node)> {
        self.children.iter().map(|(&c, n)| (c, n))
    }

    pub fn candidates(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.children.keys().copied()
    }

    /// Remove candidate `c` everywhere below this node, transferring each of
    /// its ballots to the next continuing candidate on that ballot.
    ///
    /// The removed child's subtrees are merged into the siblings; this node's
    /// own value is unchanged.
    pub fn eliminate(&mut self, c: CandidateId) {
        if let Some(child) = self.children.remove(&c) {
            for (name, node) in child.children {
                self.get_child(name).merge(node);
            }
        }
        for node in self.children.values_mut() {
            node.eliminate(c);
        }
    }

    /// Merge another node into self by adding the value and merging children.
    fn merge(&mut self, other: Node) {
        self.value += other.value;
        if self.children.is_empty() {
            self.children = other.children;
        } else {
            for (name, node) in other.children {
                self.get_child(name).merge(node);
            }
        }
    }

    /// Prune the tree modulo an elimination order.
    ///
    /// Assuming the election eliminates candidates in `elim_order`, weed out
    /// the ballot information that cannot contribute. If `i` precedes `j` in
    /// `elim_order` then any mention of `i` after `j` on a ballot is
    /// irrelevant and `i` is eliminated from that subtree, and once either of
    /// the two final-round candidates appears the rest of the ballot can
    /// never be looked at.
    pub fn reduce(&mut self, elim_order: &[CandidateId]) {
        assert_eq!(
            elim_order.len(),
            self.children.len(),
            "reduce needs exactly one elimination entry per remaining candidate"
        );
        if elim_order.len() < 2 {
            return;
        }
        for (&c, node) in self.children.iter_mut() {
            node.reduce_below(c, elim_order, 0);
        }
    }

    fn reduce_below(&mut self, c: CandidateId, elim_order: &[CandidateId], start: usize) {
        let last = elim_order.len() - 1;
        if c == elim_order[last] || c == elim_order[last - 1] {
            self.children.clear();
            return;
        }
        let idx = elim_order
            .iter()
            .position(|&e| e == c)
            .expect("reduced tree mentions a candidate missing from the elimination order");
        for i in start..idx {
            self.eliminate(elim_order[i]);
        }
        for (&child, node) in self.children.iter_mut() {
            node.reduce_below(child, elim_order, start + 1);
        }
    }
}
