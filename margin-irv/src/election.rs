// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! The record of everything known about a single contest.


use std::collections::BTreeMap;
use serde::Deserialize;
use serde::Serialize;
use crate::tree::{CandidateId, Node};

/// A single-winner contest: candidate names, the ballot profile, and how the
/// papers were marked. Immutable after construction; algorithms that need to
/// mutate the profile clone it first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    /// The version of the serialized form this instance was built with.
    /// Cached copies with a different version are discarded.
    pub version: u32,
    /// Candidate names, keyed by id; the keys are exactly `1..=K`.
    pub names: BTreeMap<CandidateId, String>,
    /// The root of the ballot tree. Its value is the total ballot count and
    /// it has a child for every candidate, even zero-valued ones.
    pub profile: Node,
    /// The maximum number of candidates a voter was allowed to rank.
    pub ranks: u32,
    /// The number of candidates to be elected. Always 1 here.
    pub seats: u32,
    pub description: String,
}

impl Election {
    /// Bump whenever the serialized form changes incompatibly.
    pub const VERSION: u32 = 1;

    pub fn new(
        names: BTreeMap<CandidateId, String>,
        profile: Node,
        ranks: u32,
        seats: u32,
        description: String,
    ) -> Election {
        let named: Vec<CandidateId> = names.keys().copied().collect();
        let children: Vec<CandidateId> = profile.candidates().collect();
        assert_eq!(named, children, "candidate names and profile children must coincide");
        Election { version: Election::VERSION, names, profile, ranks, seats, description }
    }

    pub fn num_candidates(&self) -> usize {
        self.names.len()
    }
}
