// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! How far is an instant-runoff election from electing someone else?
//!
//! Given the ranked ballots of a single contest this crate tabulates the
//! winner (under plain one-at-a-time elimination or San Francisco batch
//! elimination), derives heuristic lower and upper bounds on the margin of
//! victory, and computes the exact margin: the minimum number of ballot
//! alterations, counting a removal plus an addition as two, that would
//! change the winner.


use std::collections::BTreeSet;
use serde::Deserialize;
use serde::Serialize;
use crate::election::Election;
use crate::irv::Rules;
use crate::tree::CandidateId;

pub mod blt;
pub mod bounds;
pub mod condorcet;
pub mod election;
pub mod ilp;
pub mod irv;
pub mod margin;
pub mod timeout;
pub mod tree;

#[derive(thiserror::Error, Debug)]
pub enum MarginError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid blt header {0:?}")]
    InvalidHeader(String),
    #[error("invalid ballot line {0:?}")]
    InvalidBallot(String),
    #[error("expected 0 after the ballots, found {0:?}")]
    UnterminatedBallots(String),
    #[error("candidate name line {0:?} is not quoted")]
    UnquotedName(String),
    #[error("the file ended before the election was complete")]
    TruncatedFile,
    #[error("cache serialization failed: {0}")]
    Cache(#[from] serde_json::Error),
}

/// This file contains an API suitable for driving the whole analysis at once.

/// A margin analysis request: the contest, the tabulation rules to report
/// under, and an optional deadline for the exact computation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarginProblem {
    pub metadata: serde_json::Value,
    pub election: Election,
    pub rules: Rules,
    /// Wall-clock seconds allowed for the exact margin; unlimited if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
}

/// Everything the analyzer can say about one contest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarginReport {
    pub metadata: serde_json::Value,
    pub winner: CandidateId,
    pub elimination: Vec<BTreeSet<CandidateId>>,
    pub simple_lower_bound: i64,
    pub lower_bound: i64,
    pub upper_bound: i64,
    /// The exact margin in doubled accounting, or -1 if the deadline passed.
    pub margin: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condorcet_winner: Option<CandidateId>,
    pub condorcet_lower_bound: i64,
}

impl MarginProblem {
    pub fn solve(self) -> MarginReport {
        let (winner, _, elimination) = irv::irv(&self.election, self.rules);
        let simple_lower_bound = bounds::irv_simple_lb(&self.election, Rules::SfRcv);
        let lower_bound = bounds::irv_lb(&self.election, None);
        let upper_bound =
            bounds::irv_ub(&self.election, Rules::SfRcv, Some(winner), Some(elimination.clone()));
        let margin = margin::irv_margin(
            &self.election,
            Some(winner),
            Some(elimination.clone()),
            Some(upper_bound),
            self.timeout.unwrap_or(f64::INFINITY),
        );
        let matrix = condorcet::build_condorcet(&self.election);
        let condorcet_winner = condorcet::condorcet_winner(&matrix);
        let condorcet_lower_bound = condorcet::condorcet_lb(&matrix, condorcet_winner);
        MarginReport {
            metadata: self.metadata,
            winner,
            elimination,
            simple_lower_bound,
            lower_bound,
            upper_bound,
            margin,
            condorcet_winner,
            condorcet_lower_bound,
        }
    }
}
