// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! The pairwise comparison matrix, the Condorcet winner, and the margin
//! lower bound it implies.


use std::collections::BTreeSet;
use crate::election::Election;
use crate::tree::{CandidateId, Node};

/// Credit `node`'s ballots to `who` against every candidate still under
/// consideration, then recurse into the children still under consideration.
fn add_child_to_matrix(
    node: &Node,
    who: CandidateId,
    considered: &BTreeSet<CandidateId>,
    matrix: &mut [Vec<i64>],
) {
    let mut considered = considered.clone();
    considered.remove(&who);
    let row = (who.0 - 1) as usize;
    for &c in &considered {
        matrix[row][(c.0 - 1) as usize] += node.value as i64;
    }
    for (c, child) in node.children() {
        if considered.contains(&c) {
            add_child_to_matrix(child, c, &considered, matrix);
        }
    }
}

/// Build the pairwise matrix: entry `[i][j]` counts the ballots ranking
/// candidate `i+1` above candidate `j+1`. The candidates are assumed to be
/// `1..=K`; the matrix is 0-based.
pub fn build_condorcet(election: &Election) -> Vec<Vec<i64>> {
    let root = &election.profile;
    let n = root.num_children();
    let mut matrix = vec![vec![0; n]; n];
    let candidates: BTreeSet<CandidateId> = root.candidates().collect();
    for (c, node) in root.children() {
        add_child_to_matrix(node, c, &candidates, &mut matrix);
    }
    matrix
}

/// The candidate who beats every other pairwise, if one exists.
/// The returned id is 1-based, unlike the matrix.
pub fn condorcet_winner(matrix: &[Vec<i64>]) -> Option<CandidateId> {
    let k = matrix.len();
    for i in 0..k {
        let score: i64 = (0..k).map(|j| (matrix[i][j] - matrix[j][i]).signum()).sum();
        if score == k as i64 - 1 {
            return Some(CandidateId(i as u32 + 1));
        }
    }
    None
}

/// A lower bound on the Condorcet margin: the smallest pairwise margin
/// between the Condorcet winner and any other candidate, or 0 if there is no
/// Condorcet winner. The winner is computed when not supplied.
pub fn condorcet_lb(matrix: &[Vec<i64>], winner: Option<CandidateId>) -> i64 {
    let winner = winner.or_else(|| condorcet_winner(matrix));
    let Some(w) = winner else {
        return 0;
    };
    let k = matrix.len();
    let i = (w.0 - 1) as usize;
    let mut row: Vec<i64> = (0..k).map(|j| matrix[i][j] - matrix[j][i]).collect();
    // The self pairing is meaningless; mask it out of the minimum.
    let max = *row.iter().max().unwrap();
    row[i] = max;
    *row.iter().min().unwrap()
}
