// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Wall-clock accounting for the margin search.


use std::time::Instant;

/// A countdown over wall-clock seconds.
///
/// The margin search charges the time spent between queue pops against this
/// budget and hands whatever remains to the solver as its time limit, so the
/// whole computation respects a single deadline.
pub struct TimeBudget {
    remaining: f64,
    last: Instant,
}

impl TimeBudget {
    pub fn new(seconds: f64) -> TimeBudget {
        TimeBudget { remaining: seconds, last: Instant::now() }
    }

    /// A budget that never runs out.
    pub fn unlimited() -> TimeBudget {
        TimeBudget::new(f64::INFINITY)
    }

    /// Charge the time elapsed since the previous call and report whether
    /// the budget is exhausted.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        self.remaining -= now.duration_since(self.last).as_secs_f64();
        self.last = now;
        self.remaining <= 0.0
    }

    /// Seconds left, suitable for a solver time limit.
    pub fn remaining(&self) -> f64 {
        self.remaining
    }
}
