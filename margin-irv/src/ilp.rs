// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Pricing a target elimination order as an integer linear program.
//!
//! This is the `distance_to` computation of Magrino et al., with three
//! changes to their formulation:
//! 1. the `y_S` variables are removed, leaving only additions `p_S` and
//!    removals `m_S`;
//! 2. the constraints tying `p_S` and `m_S` to the observed profile become
//!    simple variable bounds; and
//! 3. the objective is rewritten for this crate's definition of margin.
//!
//! Change 3 matters most. The natural objective for counting altered ballots
//! is `sum_{S != ()} (p_S + m_S)`, which solvers handle poorly. Because the
//! balance constraint forces `sum_S p_S = sum_S m_S`, it can be rewritten as
//! `2*sum_{S != ()} m_S - p_() + m_()`, which is noticeably tighter.


use std::collections::BTreeMap;
use coin_cbc::{Col, Model, Sense};
use crate::tree::{CandidateId, Node};

/// A ballot class: the candidates a ballot ranks, listed in the order their
/// positions appear in the target elimination order.
type Signature = Vec<CandidateId>;

/// Collect the residual ballot counts of the tree into a signature map.
fn tree_to_map(root: &Node, profile: &mut BTreeMap<Signature, u64>, prefix: &mut Vec<CandidateId>) {
    let mut num: u64 = 0;
    for (c, n) in root.children() {
        num += n.value;
        prefix.push(c);
        tree_to_map(n, profile, prefix);
        prefix.pop();
    }
    if root.value > num {
        profile.insert(prefix.clone(), root.value - num);
    }
}

/// All bitmasks over `k` bits with exactly `ones` bits set, ascending
/// (Gosper's hack). `k` must be below 64, which any real contest satisfies.
fn subsets_of_size(k: u32, ones: u32) -> impl Iterator<Item = u64> {
    debug_assert!(k < 64);
    let first: u64 = if ones == 0 { 0 } else { (1u64 << ones) - 1 };
    let limit: u64 = 1u64 << k;
    std::iter::successors(Some(first), move |&mask| {
        if mask == 0 {
            return None;
        }
        let c = mask & mask.wrapping_neg();
        let r = mask + c;
        Some((((r ^ mask) >> 2) / c) | r)
    })
    .take_while(move |&mask| mask < limit)
}

/// The addition column and, for signatures present in the observed profile,
/// the removal column.
struct SignatureVars {
    add: Col,
    remove: Option<Col>,
}

/// The minimum number of ballot alterations (in doubled accounting) that
/// make the election eliminate candidates in exactly `elim_order`, the last
/// entry becoming the winner. Returns -1 if the solver cannot prove
/// optimality within `timeout` seconds.
///
/// `root` must have exactly the candidates of `elim_order` as children;
/// `ranks` caps how many candidates one ballot may name.
pub fn distance_to(root: &Node, ranks: u32, elim_order: &[CandidateId], timeout: f64) -> i64 {
    let k = elim_order.len();
    if k < 2 {
        return 0;
    }
    let mut reduced = root.clone();
    reduced.reduce(elim_order);
    let n = reduced.value;
    let mut profile: BTreeMap<Signature, u64> = BTreeMap::new();
    tree_to_map(&reduced, &mut profile, &mut Vec::new());

    let mut model = Model::default();
    model.set_parameter("logLevel", "0");
    model.set_obj_sense(Sense::Minimize);

    // Total ballot count is preserved: additions and removals cancel.
    let balance = model.add_row();
    model.set_row_equal(balance, 0.0);

    let mut vars: Vec<SignatureVars> = Vec::new();
    let mut observed: Vec<u64> = Vec::new();
    // buckets[r][d] lists the signatures credited to candidate elim_order[r+d]
    // in round r, for r in 0..k-1.
    let mut buckets: Vec<Vec<Vec<usize>>> =
        (0..k - 1).map(|i| vec![Vec::new(); k - i]).collect();

    let maxsize = (ranks as usize).min(k);
    for ones in 0..=maxsize {
        for mask in subsets_of_size(k as u32, ones as u32) {
            // A ballot never needs to rank both final-round candidates.
            if mask >> (k - 1) & 1 == 1 && mask >> (k - 2) & 1 == 1 {
                continue;
            }
            let signature: Signature = (0..k)
                .filter(|i| mask >> i & 1 == 1)
                .map(|i| elim_order[i])
                .collect();
            let count = profile.get(&signature).copied();
            let sig_index = vars.len();

            let add = model.add_integer();
            model.set_col_lower(add, 0.0);
            model.set_col_upper(add, (n - count.unwrap_or(0)) as f64);
            model.set_obj_coeff(add, if mask == 0 { -1.0 } else { 0.0 });
            model.set_weight(balance, add, 1.0);

            let remove = count.map(|observed_count| {
                let col = model.add_integer();
                model.set_col_lower(col, 0.0);
                model.set_col_upper(col, observed_count as f64);
                model.set_obj_coeff(col, if mask == 0 { 1.0 } else { 2.0 });
                model.set_weight(balance, col, -1.0);
                col
            });

            vars.push(SignatureVars { add, remove });
            observed.push(count.unwrap_or(0));

            // Until its first listed candidate is eliminated the ballot
            // counts for that candidate; it then transfers to the next one.
            let mut round = 0;
            for i in (0..k).filter(|i| mask >> i & 1 == 1) {
                let hi = (i + 1).min(k - 1);
                for r in round..hi {
                    buckets[r][i - r].push(sig_index);
                }
                round = hi;
            }
        }
    }

    // In every round the candidate being eliminated may not exceed any
    // candidate eliminated later; grouping by position gives k(k-1)/2
    // inequalities.
    for per_round in &buckets {
        let lowest = &per_round[0];
        let lowest_observed: u64 = lowest.iter().map(|&s| observed[s]).sum();
        for higher in &per_round[1..] {
            let row = model.add_row();
            for &s in lowest {
                model.set_weight(row, vars[s].add, 1.0);
                if let Some(remove) = vars[s].remove {
                    model.set_weight(row, remove, -1.0);
                }
            }
            let mut higher_observed: u64 = 0;
            for &s in higher {
                model.set_weight(row, vars[s].add, -1.0);
                if let Some(remove) = vars[s].remove {
                    model.set_weight(row, remove, 1.0);
                }
                higher_observed += observed[s];
            }
            model.set_row_upper(row, higher_observed as f64 - lowest_observed as f64);
        }
    }

    if timeout.is_finite() {
        model.set_parameter("seconds", &format!("{}", timeout.max(0.0)));
    }
    let solution = model.solve();
    if solution.raw().status() != coin_cbc::raw::Status::Finished
        || !solution.raw().is_proven_optimal()
    {
        return -1;
    }
    solution.raw().obj_value().round() as i64
}
