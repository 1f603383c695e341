// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Test the ballot tree operations: elimination with subtree merging,
//! structural copying, and order-aware reduction.


use margin_irv::tree::{CandidateId, Node};

/// Build a profile tree from weighted ranked ballots.
fn build_profile(num_candidates: u32, ballots: &[(u64, &[u32])]) -> Node {
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
    root
}

/// The three-candidate contest used throughout: 60 of 1>2>3, 30 of 2>1>3,
/// 10 of 3>2>1.
fn clean_majority_profile() -> Node {
    build_profile(3, &[(60, &[1, 2, 3]), (30, &[2, 1, 3]), (10, &[3, 2, 1])])
}

/// Walk the tree checking `value >= sum of child values` everywhere, and
/// return the number of ballots terminating in the subtree, which must equal
/// the subtree's value.
fn terminating_ballots(node: &Node) -> u64 {
    let child_sum: u64 = node.children().map(|(_, n)| n.value).sum();
    assert!(node.value >= child_sum, "node value below its children's total");
    let mut terminating = node.value - child_sum;
    for (_, child) in node.children() {
        terminating += terminating_ballots(child);
    }
    assert_eq!(node.value, terminating);
    terminating
}

fn mentions(node: &Node, c: CandidateId) -> bool {
    node.has_child(c) || node.children().any(|(_, child)| mentions(child, c))
}

#[test]
fn test_get_child_creates_and_lookups() {
    let mut node = Node::new();
    assert!(!node.has_child(CandidateId(2)));
    assert_eq!(0, node.num_children());
    node.get_child(CandidateId(2)).value = 7;
    assert!(node.has_child(CandidateId(2)));
    assert_eq!(1, node.num_children());
    assert_eq!(7, node.child_value(CandidateId(2)));
    assert_eq!(0, node.child_value(CandidateId(3)));
    node.delete_child(CandidateId(2));
    assert_eq!(0, node.num_children());
}

#[test]
fn test_eliminate_transfers_ballots() {
    let mut root = clean_majority_profile();
    root.eliminate(CandidateId(3));
    assert!(!mentions(&root, CandidateId(3)));
    assert_eq!(100, root.value);
    assert_eq!(60, root.child_value(CandidateId(1)));
    // 2 keeps its 30 first preferences and picks up 3's 10 transfers.
    assert_eq!(40, root.child_value(CandidateId(2)));
    let two = root.child(CandidateId(2)).unwrap();
    assert_eq!(40, two.child_value(CandidateId(1)));
    assert_eq!(100, terminating_ballots(&root));
}

#[test]
fn test_eliminate_exhausts_truncated_ballots() {
    let mut root = build_profile(3, &[(5, &[3]), (4, &[1])]);
    root.eliminate(CandidateId(3));
    // The 5 ballots ranking only candidate 3 are exhausted, not lost.
    assert_eq!(9, root.value);
    assert_eq!(4, root.child_value(CandidateId(1)));
    assert_eq!(0, root.child_value(CandidateId(2)));
    assert_eq!(9, terminating_ballots(&root));
}

#[test]
fn test_clone_is_a_deep_copy() {
    let original = clean_majority_profile();
    let mut copy = original.clone();
    copy.eliminate(CandidateId(1));
    copy.get_child(CandidateId(2)).value += 1;
    assert_eq!(clean_majority_profile(), original);
    assert_ne!(original, copy);
}

#[test]
fn test_reduce_clears_below_final_round_candidates() {
    let mut root = clean_majority_profile();
    root.reduce(&[CandidateId(3), CandidateId(2), CandidateId(1)]);
    // 1 and 2 fight the final round, so nothing below them matters; 3's
    // ballots only matter up to the first final-round candidate they reach.
    let one = root.child(CandidateId(1)).unwrap();
    assert_eq!(60, one.value);
    assert_eq!(0, one.num_children());
    let two = root.child(CandidateId(2)).unwrap();
    assert_eq!(30, two.value);
    assert_eq!(0, two.num_children());
    let three = root.child(CandidateId(3)).unwrap();
    assert_eq!(10, three.value);
    assert_eq!(10, three.child_value(CandidateId(2)));
    assert_eq!(0, three.child(CandidateId(2)).unwrap().num_children());
}

#[test]
fn test_reduce_is_idempotent() {
    let order = [CandidateId(3), CandidateId(2), CandidateId(1)];
    let mut root = clean_majority_profile();
    root.reduce(&order);
    let once = root.clone();
    root.reduce(&order);
    assert_eq!(once, root);
}

#[test]
fn test_eliminate_merges_into_existing_subtrees() {
    // 1>2 ballots must merge into the existing 2 subtree when 1 goes.
    let mut root = build_profile(2, &[(5, &[1, 2]), (3, &[2])]);
    root.eliminate(CandidateId(1));
    assert_eq!(8, root.child_value(CandidateId(2)));
    assert_eq!(0, root.child(CandidateId(2)).unwrap().num_children());
    assert_eq!(8, terminating_ballots(&root));
}
