// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Test the exact margin search and its ILP pricing.


use std::collections::BTreeMap;
use margin_irv::bounds::{irv_lb, irv_simple_lb, irv_ub};
use margin_irv::election::Election;
use margin_irv::ilp::distance_to;
use margin_irv::irv::Rules;
use margin_irv::margin::irv_margin;
use margin_irv::tree::{CandidateId, Node};
use margin_irv::MarginProblem;

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

fn order(candidates: &[u32]) -> Vec<CandidateId> {
    candidates.iter().map(|&c| CandidateId(c)).collect()
}

#[test]
fn test_distance_to_the_observed_order_is_free() {
    let election = clean_majority();
    let d = distance_to(&election.profile, election.ranks, &order(&[3, 2, 1]), f64::INFINITY);
    assert_eq!(0, d);
}

#[test]
fn test_distance_to_an_upset_order() {
    let election = clean_majority();
    // For 2 to win after 3 and 1 go out, 1 must fall to 2's transfer total:
    // ten first preferences move, each a removal plus an addition.
    let d = distance_to(&election.profile, election.ranks, &order(&[3, 1, 2]), f64::INFINITY);
    assert_eq!(20, d);
}

#[test]
fn test_distance_to_a_trivial_order() {
    let election = build_election(1, 1, &[(5, &[1])]);
    assert_eq!(0, distance_to(&election.profile, 1, &order(&[1]), f64::INFINITY));
}

#[test]
fn test_exact_margin_of_the_clean_majority_contest() {
    let election = clean_majority();
    assert_eq!(20, irv_margin(&election, None, None, None, f64::INFINITY));
}

#[test]
fn test_bound_chain_brackets_the_margin() {
    let election = clean_majority();
    let simple = irv_simple_lb(&election, Rules::SfRcv);
    let lb = irv_lb(&election, None);
    let margin = irv_margin(&election, None, None, None, f64::INFINITY);
    let ub = irv_ub(&election, Rules::SfRcv, None, None);
    assert!(simple <= lb);
    assert!(lb <= margin);
    assert!(margin <= ub);
    assert_eq!(20, margin);
}

#[test]
fn test_two_candidate_margin() {
    let election = build_election(2, 1, &[(60, &[1]), (40, &[2])]);
    assert_eq!(20, irv_margin(&election, None, None, None, f64::INFINITY));
}

#[test]
fn test_a_first_round_tie_makes_the_margin_zero() {
    // 4 and 5 tie; flipping the tie-break needs no ballot changes at all.
    let election = build_election(
        5,
        2,
        &[(10, &[1]), (10, &[2]), (10, &[3]), (35, &[4, 1]), (35, &[5, 2])],
    );
    assert_eq!(0, irv_margin(&election, None, None, None, f64::INFINITY));
}

#[test]
fn test_an_expired_budget_reports_a_timeout() {
    let election = clean_majority();
    assert_eq!(-1, irv_margin(&election, None, None, None, 0.0));
}

#[test]
fn test_solving_a_whole_problem() {
    let problem = MarginProblem {
        metadata: serde_json::json!({"contest": "clean majority"}),
        election: clean_majority(),
        rules: Rules::SfRcv,
        timeout: None,
    };
    let report = problem.solve();
    assert_eq!(CandidateId(1), report.winner);
    assert_eq!(20, report.simple_lower_bound);
    assert_eq!(20, report.lower_bound);
    assert_eq!(20, report.margin);
    assert_eq!(22, report.upper_bound);
    assert_eq!(Some(CandidateId(1)), report.condorcet_winner);
    assert_eq!(20, report.condorcet_lower_bound);
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"margin\":20"));
}
