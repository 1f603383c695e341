// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Round-by-round instant-runoff tabulation and elimination-set selection.


use std::collections::BTreeMap;
use std::collections::BTreeSet;
use serde::Deserialize;
use serde::Serialize;
use crate::election::Election;
use crate::tree::{CandidateId, Node};

/// Which rule picks the candidates to eliminate each round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rules {
    /// Eliminate the single candidate with the fewest top-choice votes.
    BaseIrv,
    /// San Francisco batch elimination: the largest set of trailing
    /// candidates whose combined top-choice votes are less than the votes of
    /// every candidate outside the set goes in one round.
    SfRcv,
    /// Like `BaseIrv` but with the majority early-out disabled, so every
    /// round runs until only two candidates remain. Used when a full
    /// elimination order is wanted.
    CompleteIrv,
}

/// The elimination set for the current state of the ballot tree.
///
/// Under `BaseIrv`/`CompleteIrv` this is the singleton argmin by top-choice
/// votes, ties going to the first candidate in iteration order. Under
/// `SfRcv`, candidates are sorted ascending by votes and the largest prefix
/// whose total is strictly below every vote count outside it is taken; every
/// valid non-empty prefix encountered on the way is appended to `all_sets`
/// when that is provided. If no prefix qualifies (a tie at the bottom that
/// cannot be batched) the single lowest candidate is returned and a warning
/// is logged; callers who care can detect this from the returned singleton.
pub fn elimination_set(
    root: &Node,
    rules: Rules,
    mut all_sets: Option<&mut Vec<BTreeSet<CandidateId>>>,
) -> BTreeSet<CandidateId> {
    match rules {
        Rules::BaseIrv | Rules::CompleteIrv => {
            let mut low_candidate = CandidateId(0);
            let mut low_votes = u64::MAX;
            for (c, n) in root.children() {
                if n.value < low_votes {
                    low_candidate = c;
                    low_votes = n.value;
                }
            }
            BTreeSet::from([low_candidate])
        }
        Rules::SfRcv => {
            // S.F., Cal., Charter art. XIII s. 13.102(e): candidates whose
            // combined vote is below the next-highest candidate's are
            // eliminated simultaneously. In practice this means the largest
            // prefix of the ascending vote order whose sum is smaller than
            // the count of every candidate outside the prefix.
            let mut sorted: Vec<CandidateId> = root.candidates().collect();
            sorted.sort_by_key(|&c| root.child_value(c));
            let mut n: u64 = 0; // votes credited to sorted[..j]
            let mut i = 0; // sorted[..i] are definitely going to be eliminated
            let mut j = 0;
            let mut at = 0;
            while at < sorted.len() {
                let k = root.child_value(sorted[at]);
                let mut num = 1;
                while at + num < sorted.len() && root.child_value(sorted[at + num]) == k {
                    num += 1;
                }
                if n < k {
                    i = j;
                    if i > 0 {
                        if let Some(sets) = all_sets.as_deref_mut() {
                            sets.push(sorted[..i].iter().copied().collect());
                        }
                    }
                }
                n += k * num as u64;
                j += num;
                at += num;
            }
            if i == 0 {
                log::warn!("there was a tie and not all tied candidates could be eliminated");
                sorted[..1].iter().copied().collect()
            } else {
                sorted[..i].iter().copied().collect()
            }
        }
    }
}

/// What a bounded run of IRV rounds produced.
pub struct RoundOutcome {
    /// The winner, if one was reached within the allotted rounds.
    pub winner: Option<CandidateId>,
    /// Per-candidate top-choice tallies, one entry per executed round.
    pub counts: BTreeMap<CandidateId, Vec<u64>>,
    /// The elimination set applied in each executed round. When a winner is
    /// declared, the final entry is every remaining loser at once.
    pub elimination: Vec<BTreeSet<CandidateId>>,
    /// The ballot tree after the executed rounds.
    pub profile: Node,
}

/// Perform at most `rounds` rounds of IRV under `rules`, on a copy of
/// `profile`.
///
/// A winner is declared as soon as some candidate holds a strict majority of
/// the continuing votes (unless the rules are `CompleteIrv`) or at most two
/// candidates remain. Exactly half is not a majority and tabulation
/// continues.
pub fn irv_round(profile: &Node, rounds: usize, rules: Rules) -> RoundOutcome {
    let mut root = profile.clone();
    let candidates: BTreeSet<CandidateId> = root.candidates().collect();
    let mut eliminated: BTreeSet<CandidateId> = BTreeSet::new();
    let mut winner = None;
    let mut counts: BTreeMap<CandidateId, Vec<u64>> =
        candidates.iter().map(|&c| (c, vec![0; rounds])).collect();
    let mut elimination: Vec<BTreeSet<CandidateId>> = Vec::new();

    let mut r = 0;
    while r < rounds {
        r += 1;
        let mut num_votes: u64 = 0;
        let mut high_candidate = CandidateId(0);
        let mut high_votes: u64 = 0;

        for (c, n) in root.children() {
            debug_assert!(!eliminated.contains(&c));
            counts.get_mut(&c).expect("tallied candidate was present at the start")[r - 1] = n.value;
            num_votes += n.value;
            if n.value > high_votes {
                high_candidate = c;
                high_votes = n.value;
            }
        }

        if (rules != Rules::CompleteIrv && high_votes * 2 > num_votes) || root.num_children() <= 2 {
            winner = Some(high_candidate);
            let mut final_elim: BTreeSet<CandidateId> =
                candidates.difference(&eliminated).copied().collect();
            final_elim.remove(&high_candidate);
            elimination.push(final_elim);
            break;
        }

        let lowest = elimination_set(&root, rules, None);
        for &c in &lowest {
            root.eliminate(c);
            eliminated.insert(c);
        }
        elimination.push(lowest);
    }

    if r < rounds {
        for tallies in counts.values_mut() {
            tallies.truncate(r);
        }
    }
    RoundOutcome { winner, counts, elimination, profile: root }
}

/// Tabulate the whole election under `rules`, returning the winner, the
/// per-round vote counts, and the elimination order.
pub fn irv(
    election: &Election,
    rules: Rules,
) -> (CandidateId, BTreeMap<CandidateId, Vec<u64>>, Vec<BTreeSet<CandidateId>>) {
    let root = &election.profile;
    let outcome = irv_round(root, root.num_children(), rules);
    let winner = outcome
        .winner
        .expect("running as many rounds as there are candidates always produces a winner");
    (winner, outcome.counts, outcome.elimination)
}
