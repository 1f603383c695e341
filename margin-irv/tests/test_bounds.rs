// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Test the heuristic lower bounds and the constructive upper bound.


use std::collections::BTreeMap;
use std::collections::BTreeSet;
use margin_irv::bounds::{irv_lb, irv_simple_lb, irv_ub, modify_margin};
use margin_irv::election::Election;
use margin_irv::irv::{irv_round, Rules};
use margin_irv::tree::{CandidateId, Node};

/// Build an election from weighted ranked ballots.
fn build_election(num_candidates: u32, ranks: u32, ballots: &[(u64, &[u32])]) -> Election {
    let mut root = Node::new();
    for c in 1..=num_candidates {
        root.get_child(CandidateId(c));
    }
    let mut total = 0;
    for &(count, prefs) in ballots {
        total += count;
        let mut curr = &mut root;
        for &p in prefs {
            curr = curr.get_child(CandidateId(p));
            curr.value += count;
        }
    }
    root.value = total;
    let names: BTreeMap<CandidateId, String> = (1..=num_candidates)
        .map(|c| (CandidateId(c), format!("Candidate {c}")))
        .collect();
    Election::new(names, root, ranks, 1, "a test contest".to_string())
}

fn clean_majority() -> Election {
    build_election(3, 3, &[(60, &[1, 2, 3]), (30, &[2, 1, 3]), (10, &[3, 2, 1])])
}

fn set(candidates: &[u32]) -> BTreeSet<CandidateId> {
    candidates.iter().map(|&c| CandidateId(c)).collect()
}

/// Check `value >= sum of child values` everywhere below `node`.
fn check_values(node: &Node) {
    let child_sum: u64 = node.children().map(|(_, n)| n.value).sum();
    assert!(node.value >= child_sum);
    for (_, child) in node.children() {
        check_values(child);
    }
}

#[test]
fn test_simple_lower_bound() {
    // Undoing the first elimination means closing the 20 vote gap between
    // the batch {3} and the weakest survivor, candidate 2 on 30.
    assert_eq!(20, irv_simple_lb(&clean_majority(), Rules::SfRcv));
}

#[test]
fn test_best_first_lower_bound() {
    let election = clean_majority();
    let mut eliminations: Vec<BTreeSet<CandidateId>> = Vec::new();
    let lb = irv_lb(&election, Some(&mut eliminations));
    assert_eq!(20, lb);
    assert!(lb >= irv_simple_lb(&election, Rules::SfRcv));
    // The reported sequence must tabulate down to a single candidate.
    let mut root = election.profile.clone();
    for elim_set in &eliminations {
        for &c in elim_set {
            root.eliminate(c);
        }
    }
    assert_eq!(1, root.num_children());
}

#[test]
fn test_upper_bound_value() {
    let election = clean_majority();
    let ub = irv_ub(&election, Rules::SfRcv, None, None);
    assert_eq!(22, ub);
    assert!(ub >= irv_lb(&election, None));
}

#[test]
fn test_modify_margin_overshoots_strictly() {
    let election = clean_majority();
    let mut root = election.profile.clone();
    // Rescue 2 from the round that eliminates {2,3} by taking votes from 1.
    let changed = modify_margin(
        &mut root,
        19,
        CandidateId(2),
        CandidateId(1),
        &[set(&[2, 3])],
        CandidateId(1),
    );
    // A net swing strictly above 19 needs ten two-vote moves.
    assert_eq!(10, changed);
    assert_eq!(50, root.child_value(CandidateId(1)));
    assert_eq!(40, root.child_value(CandidateId(2)));
    assert_eq!(100, root.value);
    check_values(&root);
}

#[test]
fn test_modify_margin_witness_flips_the_winner() {
    let election = clean_majority();
    let mut root = election.profile.clone();
    let changed = modify_margin(
        &mut root,
        39,
        CandidateId(2),
        CandidateId(1),
        &[set(&[2, 3])],
        CandidateId(1),
    );
    assert_eq!(20, changed);
    check_values(&root);
    let outcome = irv_round(&root, root.num_children(), Rules::BaseIrv);
    // 1 drops to 40 against 2 on 50 plus 3's transfers: the winner changes.
    assert_eq!(Some(CandidateId(2)), outcome.winner);
}

#[test]
fn test_bound_ordering_on_a_two_candidate_race() {
    let election = build_election(2, 1, &[(60, &[1]), (40, &[2])]);
    let simple = irv_simple_lb(&election, Rules::SfRcv);
    let lb = irv_lb(&election, None);
    let ub = irv_ub(&election, Rules::SfRcv, None, None);
    assert_eq!(20, simple);
    assert_eq!(20, lb);
    assert_eq!(22, ub);
    assert!(simple <= lb && lb <= ub);
}
