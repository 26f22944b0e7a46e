//! The human-authored topology description.
//!
//! Line-oriented format, one member per line:
//!
//! ```text
//! # members and their neighbours
//! 1: 2@1 3@2
//! 2: 1@1
//! 3:
//! ```
//!
//! `<member>: <neighbour>[@interval] ...` — every member gets a head line,
//! neighbour references must point at a declared member, and the sharing
//! interval (in agent ticks) defaults to 1. Relations may be asymmetric.
//! Parsing is all-or-nothing.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::NetError;
use crate::MemberId;

/// Default sharing interval for an unannotated edge.
pub const DEFAULT_INTERVAL: u64 = 1;

/// A parsed topology: members and, per member, neighbours with sharing
/// intervals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    members: BTreeMap<MemberId, BTreeMap<MemberId, u64>>,
}

impl Topology {
    /// Parses a topology description.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::MalformedTopology`] (with the offending line
    /// number) on syntax errors, duplicate member declarations, duplicate
    /// edges, references to undeclared members, or a zero interval.
    ///
    /// # Example
    ///
    /// ```
    /// use axon_net::Topology;
    ///
    /// let topo = Topology::parse("1: 2@3\n2: 1\n").unwrap();
    /// assert_eq!(topo.member_ids(), vec![1, 2]);
    /// assert_eq!(topo.interval(1, 2), Some(3));
    /// assert_eq!(topo.interval(2, 1), Some(1));
    /// ```
    pub fn parse(text: &str) -> Result<Self, NetError> {
        let malformed = |line: usize, reason: String| NetError::MalformedTopology { line, reason };

        // First pass: collect declared members and raw neighbour tokens.
        let mut members: BTreeMap<MemberId, BTreeMap<MemberId, u64>> = BTreeMap::new();
        let mut edges: Vec<(usize, MemberId, MemberId, u64)> = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (head, tail) = line
                .split_once(':')
                .ok_or_else(|| malformed(line_no, "missing ':' after member id".into()))?;
            let member: MemberId = head
                .trim()
                .parse()
                .map_err(|_| malformed(line_no, format!("invalid member id '{}'", head.trim())))?;
            if members.insert(member, BTreeMap::new()).is_some() {
                return Err(malformed(line_no, format!("member {member} declared twice")));
            }

            for token in tail.split_whitespace() {
                let (nid_str, interval) = match token.split_once('@') {
                    Some((n, i)) => {
                        let interval: u64 = i.parse().map_err(|_| {
                            malformed(line_no, format!("invalid interval '{i}'"))
                        })?;
                        (n, interval)
                    }
                    None => (token, DEFAULT_INTERVAL),
                };
                if interval == 0 {
                    return Err(malformed(line_no, "sharing interval must be >= 1".into()));
                }
                let neighbour: MemberId = nid_str.parse().map_err(|_| {
                    malformed(line_no, format!("invalid neighbour id '{nid_str}'"))
                })?;
                edges.push((line_no, member, neighbour, interval));
            }
        }

        // Second pass: resolve edges now that every member is known.
        for (line_no, member, neighbour, interval) in edges {
            if !members.contains_key(&neighbour) {
                return Err(malformed(
                    line_no,
                    format!("neighbour {neighbour} is not a declared member"),
                ));
            }
            let entry = members.get_mut(&member).expect("declared in first pass");
            if entry.insert(neighbour, interval).is_some() {
                return Err(malformed(
                    line_no,
                    format!("duplicate edge {member} -> {neighbour}"),
                ));
            }
        }

        Ok(Self { members })
    }

    /// Builds a topology programmatically. Used by the network's dump path.
    pub fn from_members(members: BTreeMap<MemberId, BTreeMap<MemberId, u64>>) -> Self {
        Self { members }
    }

    /// All declared member ids, ascending.
    pub fn member_ids(&self) -> Vec<MemberId> {
        self.members.keys().copied().collect()
    }

    /// Neighbours of a member with their intervals.
    pub fn neighbours(&self, member: MemberId) -> Vec<(MemberId, u64)> {
        self.members
            .get(&member)
            .map(|n| n.iter().map(|(&id, &iv)| (id, iv)).collect())
            .unwrap_or_default()
    }

    /// Sharing interval of one edge.
    pub fn interval(&self, member: MemberId, neighbour: MemberId) -> Option<u64> {
        self.members.get(&member)?.get(&neighbour).copied()
    }

    /// Renders the description format `parse` accepts.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (member, neighbours) in &self.members {
            let _ = write!(out, "{member}:");
            for (neighbour, interval) in neighbours {
                let _ = write!(out, " {neighbour}@{interval}");
            }
            out.push('\n');
        }
        out
    }
}
