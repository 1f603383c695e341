// Copyright 2024 Andrew Conway.
// Based on software (c) Stephen Checkoway <s@cs.ucsd.edu> in Python
// documented in https://www.usenix.org/events/evtwote11/tech/final_files/Magrino.pdf
//
// This file is part of margin-irv-rs.
// margin-irv-rs is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// margin-irv-rs is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License along with ConcreteSTV.  If not, see <https://www.gnu.org/licenses/>.


//! Reading and writing `.blt` ballot files.
//!
//! The format: optional `#` comment lines, a `K S` header, ballot lines of
//! the form `(weight)? 1 <tokens> 0` (the weight, if present, is ignored), a
//! lone `0` terminator, `K` quoted candidate names, and a quoted description.
//! Within a ballot, `-` is a skipped rank, a token containing `=` truncates
//! the ballot (equal ranking is not representable in the tree), and a repeat
//! of an already ranked candidate is dropped.
//!
//! Parsing a large file is slow enough to be worth caching, so `read_blt`
//! keeps a serialized sidecar next to the `.blt` and reuses it while it is
//! no older than the ballots and its version matches.


use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use regex::Regex;
use crate::election::Election;
use crate::tree::{CandidateId, Node};
use crate::MarginError;

/// Parse a `.blt` file, ignoring any cache.
pub fn parse_blt(path: &Path) -> Result<Election, MarginError> {
    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    // Skip over leading comments
    let header = loop {
        let line = lines.next().ok_or(MarginError::TruncatedFile)??;
        if !line.starts_with('#') {
            break line;
        }
    };
    // Get the number of candidates and seats
    let mut fields = header.split_whitespace();
    let (num_candidates, seats): (u32, u32) = match (
        fields.next().map(|s| s.parse()),
        fields.next().map(|s| s.parse()),
        fields.next(),
    ) {
        (Some(Ok(candidates)), Some(Ok(seats)), None) => (candidates, seats),
        _ => return Err(MarginError::InvalidHeader(header)),
    };

    let ballot_line = Regex::new(r"^(\(.*?\) )?1 ([-=0-9 ]*)0").expect("the ballot pattern is valid");
    let mut root = Node::new();
    // Make sure the root has a child for every candidate
    for c in 1..=num_candidates {
        root.get_child(CandidateId(c));
    }
    let mut ranks: u32 = 0;
    let mut num_ballots: u64 = 0;
    let terminator = loop {
        let line = lines.next().ok_or(MarginError::TruncatedFile)??;
        let Some(captures) = ballot_line.captures(&line) else {
            break line;
        };
        num_ballots += 1;
        let choices: Vec<&str> = captures
            .get(2)
            .map_or("", |m| m.as_str())
            .split_whitespace()
            .collect();
        ranks = ranks.max(choices.len() as u32);
        let mut seen: BTreeSet<CandidateId> = BTreeSet::new();
        let mut curr = &mut root;
        for token in choices {
            if token == "-" {
                continue;
            }
            if token.contains('=') {
                break;
            }
            let c: CandidateId = token
                .parse()
                .map_err(|_| MarginError::InvalidBallot(line.clone()))?;
            if seen.insert(c) {
                curr = curr.get_child(c);
                curr.value += 1;
            }
        }
    };
    if terminator != "0" {
        return Err(MarginError::UnterminatedBallots(terminator));
    }

    let mut names: BTreeMap<CandidateId, String> = BTreeMap::new();
    for c in 1..=num_candidates {
        let line = lines.next().ok_or(MarginError::TruncatedFile)??;
        names.insert(CandidateId(c), unquote(&line)?);
    }
    let line = lines.next().ok_or(MarginError::TruncatedFile)??;
    let description = unquote(&line)?;
    root.value = num_ballots;
    Ok(Election::new(names, root, ranks, seats, description))
}

fn unquote(line: &str) -> Result<String, MarginError> {
    line.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_owned)
        .ok_or_else(|| MarginError::UnquotedName(line.to_owned()))
}

/// Parse a `.blt` file, or reuse the serialized sidecar next to it.
///
/// For `foo/bar.blt` the sidecar is `foo/bar.json`. It is trusted when it is
/// at least as new as the ballots and was written by this version of
/// [`Election`]; anything else (including a corrupt sidecar) silently falls
/// back to parsing, and the sidecar is rewritten.
pub fn read_blt(path: &Path) -> Result<Election, MarginError> {
    let cached = path.with_extension("json");
    let ballot_time = fs::metadata(path)?.modified()?;
    if let Ok(meta) = fs::metadata(&cached) {
        if meta.modified().map_or(false, |t| t >= ballot_time) {
            match load_cache(&cached) {
                Ok(election) if election.version == Election::VERSION => return Ok(election),
                Ok(election) => log::debug!(
                    "cache {} has version {}, want {}; reparsing",
                    cached.display(),
                    election.version,
                    Election::VERSION
                ),
                Err(e) => log::debug!("unusable cache {}: {e}; reparsing", cached.display()),
            }
        }
    }
    let election = parse_blt(path)?;
    let writer = BufWriter::new(File::create(&cached)?);
    serde_json::to_writer(writer, &election)?;
    Ok(election)
}

fn load_cache(path: &Path) -> Result<Election, MarginError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Write a simplified `.blt`: no comments, no weights, no equal rankings,
/// one line per ballot with `-` padding out to the number of ranks.
pub fn write_blt(path: &Path, election: &Election) -> Result<(), MarginError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "{} {}", election.names.len(), election.seats)?;
    write_ballots(&mut out, &election.profile, election.ranks, &mut Vec::new())?;
    writeln!(out, "0")?;
    for name in election.names.values() {
        writeln!(out, "\"{name}\"")?;
    }
    writeln!(out, "\"{}\"", election.description)?;
    out.flush()?;
    Ok(())
}

fn write_ballots(
    out: &mut impl Write,
    root: &Node,
    ranks: u32,
    prefix: &mut Vec<CandidateId>,
) -> Result<(), MarginError> {
    let mut num: u64 = 0;
    for (c, node) in root.children() {
        num += node.value;
        prefix.push(c);
        write_ballots(out, node, ranks, prefix)?;
        prefix.pop();
    }
    // Ballots terminating here get one line each.
    if root.value > num {
        let mut line = String::from("1");
        for c in prefix.iter() {
            line.push_str(&format!(" {c}"));
        }
        for _ in prefix.len()..ranks as usize {
            line.push_str(" -");
        }
        line.push_str(" 0");
        for _ in 0..root.value - num {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}
