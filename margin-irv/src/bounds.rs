// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Heuristic lower bounds on the margin, and a constructive upper bound.
//!
//! The lower bounds come from batch-elimination round margins: to undo a
//! round's elimination, at least the gap between the weakest survivor and the
//! eliminated set's combined vote must be shifted. The upper bound actually
//! builds a ballot alteration that changes the winner, so it is always
//! achievable.


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::BinaryHeap;
use crate::election::Election;
use crate::irv::{elimination_set, irv, irv_round, Rules};
use crate::tree::{CandidateId, Node};

/// The round margin for eliminating `elim_set` from `root`: the weakest
/// surviving candidate's votes minus the set's combined votes. Negative if
/// the set could not legally be eliminated.
fn round_margin(root: &Node, elim_set: &BTreeSet<CandidateId>) -> i64 {
    let continuing_min = root
        .children()
        .filter(|(c, _)| !elim_set.contains(c))
        .map(|(_, n)| n.value)
        .min()
        .unwrap();
    let eliminated: u64 = elim_set.iter().map(|&c| root.child_value(c)).sum();
    continuing_min as i64 - eliminated as i64
}

/// A margin lower bound from the elimination sets the rules actually dictate:
/// the minimum round margin along the real elimination trajectory.
pub fn irv_simple_lb(election: &Election, rules: Rules) -> i64 {
    let mut root = election.profile.clone();
    let mut lb = i64::MAX;
    loop {
        let elim_set = elimination_set(&root, rules, None);
        lb = lb.min(round_margin(&root, &elim_set));
        let outcome = irv_round(&root, 1, rules);
        root = outcome.profile;
        if outcome.winner.is_some() {
            return lb;
        }
    }
}

/// An entry in the best-first queue: the weakest round margin along this
/// trace so far, the elimination sets taken, and the tree they leave behind.
struct LbEntry {
    margin: i64,
    eliminations: Vec<BTreeSet<CandidateId>>,
    root: Node,
}

// impls for LbEntry support ordering in the max-priority queue; only the
// margin participates, so equally promising traces pop in arbitrary order.

impl PartialEq for LbEntry {
    fn eq(&self, other: &Self) -> bool {
        self.margin == other.margin
    }
}

impl Eq for LbEntry {}

impl PartialOrd for LbEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LbEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.margin.cmp(&other.margin)
    }
}

/// The best margin lower bound obtainable from any sequence of valid batch
/// eliminations: a best-first search maximizing the per-trace minimum round
/// margin. If `eliminations` is provided it receives the optimal sequence.
pub fn irv_lb(election: &Election, mut eliminations: Option<&mut Vec<BTreeSet<CandidateId>>>) -> i64 {
    let mut queue: BinaryHeap<LbEntry> = BinaryHeap::new();
    queue.push(LbEntry {
        margin: i64::MAX,
        eliminations: Vec::new(),
        root: election.profile.clone(),
    });
    loop {
        let entry = queue.pop().expect("every popped trace with several candidates pushes successors");
        log::trace!("examining a trace with margin {}", entry.margin);
        if entry.root.num_children() == 1 {
            log::debug!("found lower bound {}", entry.margin);
            if let Some(out) = eliminations.take() {
                out.clear();
                out.extend(entry.eliminations);
            }
            return entry.margin;
        }
        let mut elim_sets: Vec<BTreeSet<CandidateId>> = Vec::new();
        elimination_set(&entry.root, Rules::SfRcv, Some(&mut elim_sets));
        for elim_set in elim_sets {
            let m2 = round_margin(&entry.root, &elim_set);
            let mut new_root = entry.root.clone();
            for &c in &elim_set {
                new_root.eliminate(c);
            }
            let mut new_seq = entry.eliminations.clone();
            new_seq.push(elim_set);
            queue.push(LbEntry {
                margin: entry.margin.min(m2),
                eliminations: new_seq,
                root: new_root,
            });
        }
    }
}

/// Shift strictly more than `m` net round margin toward `j` by recasting
/// ballots held by `k` as first preferences for `j`, returning the number of
/// ballots moved.
///
/// `elim_order` is the remaining elimination order, whose first set contains
/// `j`; `w` is the current winner. Ballots are taken from `k`'s subtree in an
/// order that prefers papers `k` would pass to candidates eliminated later
/// (or to the winner) over papers that would have reached `j` anyway, so
/// each move is worth the full swing of two.
pub fn modify_margin(
    root: &mut Node,
    m: i64,
    j: CandidateId,
    k: CandidateId,
    elim_order: &[BTreeSet<CandidateId>],
    w: CandidateId,
) -> u64 {
    assert!(elim_order[0].contains(&j));
    assert!(m >= 0);
    let mut steal_from_order: Vec<CandidateId> =
        elim_order[1..].iter().flatten().copied().collect();
    steal_from_order.push(w);
    steal_from_order.extend(elim_order[0].iter().copied().filter(|&c| c != j));
    steal_from_order.push(j);
    steal_from_order.retain(|&c| c != k);

    let mut path = vec![k];
    let (changed, _) = steal_votes(root.get_child(k), m, &steal_from_order, j, &mut path);
    root.get_child(j).value += changed;
    changed
}

/// Steal at least `m` margin from this subtree, depth first along `order`.
/// Returns the ballots taken and the margin still outstanding (negative once
/// the shift has strictly overshot).
fn steal_votes(
    node: &mut Node,
    mut m: i64,
    order: &[CandidateId],
    j: CandidateId,
    path: &mut Vec<CandidateId>,
) -> (u64, i64) {
    let mut changed: u64 = 0;
    // Try children
    for &c in order {
        if node.has_child(c) {
            path.push(c);
            let (subtotal, rest) = steal_votes(node.get_child(c), m, order, j, path);
            path.pop();
            m = rest;
            changed += subtotal;
            assert!(node.value >= subtotal);
            node.value -= subtotal;
            if node.child_value(c) == 0 {
                node.delete_child(c);
            }
            if m < 0 {
                return (changed, m);
            }
        }
    }
    // Try self: take from the ballots terminating here. The +1 guarantees a
    // strict overshoot even when m is even.
    if node.value > 0 {
        let x = node.value.min((m / 2) as u64 + 1);
        assert!(x > 0);
        node.value -= x;
        m -= 2 * x as i64;
        changed += x;
        log::trace!("shifting {x} ballots from {path:?} to {j}");
    }
    (changed, m)
}

/// A margin upper bound from an explicit vote shift.
///
/// For each losing candidate `j`, repeatedly rescue `j` from the round that
/// eliminates it by shifting votes from the nearest stronger candidate until
/// the winner changes; the cheapest rescue over all `j`, doubled, bounds the
/// margin. Using the SF batch rules cannot increase the bound; `BaseIrv` is
/// accepted for callers who want it.
pub fn irv_ub(
    election: &Election,
    rules: Rules,
    winner: Option<CandidateId>,
    elim_order: Option<Vec<BTreeSet<CandidateId>>>,
) -> i64 {
    let root = &election.profile;
    let (winner, elim_order) = match (winner, elim_order) {
        (Some(w), Some(e)) => (w, e),
        _ => {
            let (w, _, e) = irv(election, rules);
            (w, e)
        }
    };
    let mut error: BTreeMap<CandidateId, u64> = BTreeMap::new();
    let candidates: Vec<CandidateId> = root.candidates().collect();
    for &j in &candidates {
        if j == winner {
            continue;
        }
        let mut new_root = root.clone();
        let mut w = winner;
        let mut mod_elim_order = elim_order.clone();
        let mut changed: u64 = 0;
        while w == winner {
            let l = mod_elim_order
                .iter()
                .position(|set| set.contains(&j))
                .expect("every losing candidate appears in some elimination set");
            if l > 0 {
                new_root = irv_round(&new_root, l, rules).profile;
            }
            // Since j is eliminated in round l, for j to survive it needs
            // more votes than everyone else eliminated with it, and the
            // combined votes of that set must reach the count of some
            // candidate outside it.
            let votes_for_j = new_root.child_value(j);
            let mut diff = i64::MAX;
            let mut k = CandidateId(0);
            for (c, n) in new_root.children() {
                if mod_elim_order[l].contains(&c) {
                    continue;
                }
                let d = n.value as i64 - votes_for_j as i64;
                if d < diff {
                    k = c;
                    diff = d;
                }
            }
            assert!(diff < i64::MAX);
            let s: u64 = mod_elim_order[l].iter().map(|&c| new_root.child_value(c)).sum();
            let mut m = new_root.child_value(k) as i64 - s as i64;
            if s > votes_for_j {
                m -= 1;
            }
            assert!(m >= 0);
            changed += modify_margin(&mut new_root, m, j, k, &mod_elim_order[l..], w);
            let outcome = irv_round(&new_root, new_root.num_children(), rules);
            w = outcome.winner.expect("full tabulation produces a winner");
            mod_elim_order = outcome.elimination;
        }
        log::debug!("changing the winner to {j} takes {changed} ballots");
        error.insert(j, changed);
    }
    let cheapest = *error.values().min().expect("there is at least one losing candidate");
    2 * cheapest as i64
}
