// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! The exact margin: a best-first search over alternative elimination
//! orders, each candidate order priced by the ILP formulation.


use std::cmp::Ordering;
use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::collections::BinaryHeap;
use crate::bounds::irv_ub;
use crate::election::Election;
use crate::ilp::distance_to;
use crate::irv::{elimination_set, irv, Rules};
use crate::timeout::TimeBudget;
use crate::tree::CandidateId;

/// An entry in the search frontier: a suffix of a target elimination order
/// (first entry eliminated first, last entry the would-be winner) and the
/// cost of realizing it on the correspondingly reduced profile.
///
/// Ordered cheapest first, then longest suffix, then fewest departures from
/// the observed elimination order.
struct SearchEntry {
    cost: i64,
    mismatch: usize,
    elim: Vec<CandidateId>,
}

// impls for SearchEntry support ordering in the priority queue.

impl PartialEq for SearchEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchEntry {}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .cmp(&other.cost)
            .then_with(|| other.elim.len().cmp(&self.elim.len()))
            .then_with(|| self.mismatch.cmp(&other.mismatch))
            .then_with(|| self.elim.cmp(&other.elim))
    }
}

/// Compute the exact margin of the election, in doubled accounting.
///
/// `winner` and `elim_order` are tabulated if absent; `ub` defaults to the
/// constructive upper bound. `timeout` is a wall-clock budget in seconds
/// (`f64::INFINITY` for no limit); on expiry -1 is returned.
///
/// This is the algorithm of Magrino et al., more or less: a best-first
/// search over ever longer tails of candidate elimination orders, where a
/// tail of length `L` is priced by the ILP on the profile with every other
/// candidate eliminated, and any tail costing more than the upper bound is
/// abandoned.
pub fn irv_margin(
    election: &Election,
    winner: Option<CandidateId>,
    elim_order: Option<Vec<BTreeSet<CandidateId>>>,
    ub: Option<i64>,
    timeout: f64,
) -> i64 {
    let mut budget = TimeBudget::new(timeout);
    let (winner, elim_order) = match (winner, elim_order) {
        (Some(w), Some(e)) => (w, e),
        _ => {
            let (w, _, e) = irv(election, Rules::BaseIrv);
            (w, e)
        }
    };
    let ub = ub.unwrap_or_else(|| {
        irv_ub(election, Rules::SfRcv, Some(winner), Some(elim_order.clone()))
    });

    // Some candidates must be eliminated first no matter what: reinstating
    // them would take more vote shifting than the upper bound on the margin.
    // Removing them up front shrinks every ILP below.
    let mut root = election.profile.clone();
    loop {
        let mut elim_sets: Vec<BTreeSet<CandidateId>> = Vec::new();
        elimination_set(&root, Rules::SfRcv, Some(&mut elim_sets));
        let candidates: BTreeSet<CandidateId> = root.candidates().collect();
        let mut max_eset: BTreeSet<CandidateId> = BTreeSet::new();
        for eset in elim_sets {
            if eset.len() <= max_eset.len() {
                continue;
            }
            let lb = candidates
                .difference(&eset)
                .map(|&c| root.child_value(c))
                .min()
                .unwrap() as i64
                - eset.iter().map(|&c| root.child_value(c)).sum::<u64>() as i64;
            if lb > ub {
                max_eset = eset;
            }
        }
        if max_eset.is_empty() {
            break;
        }
        for &c in &max_eset {
            log::debug!("eliminating locked-in loser {c}");
            root.eliminate(c);
        }
    }

    let candidates: BTreeSet<CandidateId> = root.candidates().collect();
    let k = candidates.len();

    // tertiary[i] holds the candidates known to be eliminated among the last
    // i+1 positions of the observed order; suffixes that agree with it are
    // searched first.
    let mut tertiary: Vec<BTreeSet<CandidateId>> = Vec::with_capacity(k);
    let mut elims: BTreeSet<CandidateId> = std::iter::once(winner).collect();
    let mut next_set = elim_order.len();
    for i in 1..=k {
        if i >= elims.len() && next_set > 0 {
            next_set -= 1;
            elims.extend(elim_order[next_set].iter().copied());
        }
        tertiary.push(elims.clone());
    }
    log::trace!("tertiary ordering {tertiary:?}");

    let ranks = election.ranks;
    let mut fringe: BinaryHeap<Reverse<SearchEntry>> = BinaryHeap::new();
    for &c in &candidates {
        if c != winner {
            fringe.push(Reverse(SearchEntry { cost: 0, mismatch: 0, elim: vec![c] }));
        }
    }
    loop {
        let Reverse(entry) = fringe
            .pop()
            .expect("the frontier always retains the cheapest complete order");
        log::trace!("expanding {:?} at cost {}", entry.elim, entry.cost);
        if entry.elim.len() == k {
            return entry.cost;
        }
        if budget.tick() {
            return -1;
        }
        let elim_set: BTreeSet<CandidateId> = entry.elim.iter().copied().collect();
        for &c in candidates.difference(&elim_set) {
            let mut reduced = root.clone();
            for &e in candidates.difference(&elim_set) {
                if e != c {
                    reduced.eliminate(e);
                }
            }
            let mut new_elim = Vec::with_capacity(entry.elim.len() + 1);
            new_elim.push(c);
            new_elim.extend_from_slice(&entry.elim);
            let d = distance_to(&reduced, ranks, &new_elim, budget.remaining());
            if d == -1 {
                return -1;
            }
            if d <= ub {
                let mismatch = new_elim
                    .iter()
                    .filter(|&&c2| !tertiary[new_elim.len() - 1].contains(&c2))
                    .count();
                log::trace!("queueing {new_elim:?} at cost {d}");
                fringe.push(Reverse(SearchEntry { cost: d, mismatch, elim: new_elim }));
            }
        }
    }
}
