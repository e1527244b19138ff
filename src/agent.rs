//! Agents and the r-median aggregation rule.
//!
//! An [`Agent`] owns a [`Relation`] together with a fixed aggregation width
//! `r` and an [`UpdatePolicy`]. Updating never mutates the agent: it returns
//! the relation the agent would hold next, and the network commits it.

use crate::error::{PreferenceError, Result};
use crate::relation::Relation;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anything that exposes a preference relation to its peers.
pub trait PreferenceSource {
    /// The relation currently held.
    fn relation(&self) -> &Relation;
}

impl PreferenceSource for Relation {
    fn relation(&self) -> &Relation {
        self
    }
}

impl<T: PreferenceSource + ?Sized> PreferenceSource for &T {
    fn relation(&self) -> &Relation {
        (**self).relation()
    }
}

/// How an agent combines its own view with the neighborhood aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdatePolicy {
    /// Keep the current relation.
    #[serde(rename = "prior")]
    KeepOwn,
    /// Replace the current relation with the aggregate.
    #[serde(rename = "posterior")]
    ReplaceWithAggregate,
    /// Join the current relation with the aggregate.
    #[serde(rename = "join")]
    OwnJoinAggregate,
    /// Meet the current relation with the aggregate.
    #[serde(rename = "meet")]
    OwnMeetAggregate,
}

impl UpdatePolicy {
    /// All policies, in declaration order.
    pub const ALL: [UpdatePolicy; 4] = [
        UpdatePolicy::KeepOwn,
        UpdatePolicy::ReplaceWithAggregate,
        UpdatePolicy::OwnJoinAggregate,
        UpdatePolicy::OwnMeetAggregate,
    ];

    /// Short name used in config files and reports.
    pub fn name(&self) -> &'static str {
        match self {
            UpdatePolicy::KeepOwn => "prior",
            UpdatePolicy::ReplaceWithAggregate => "posterior",
            UpdatePolicy::OwnJoinAggregate => "join",
            UpdatePolicy::OwnMeetAggregate => "meet",
        }
    }
}

impl fmt::Display for UpdatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for UpdatePolicy {
    type Err = PreferenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "prior" | "keep" => Ok(UpdatePolicy::KeepOwn),
            "posterior" | "replace" => Ok(UpdatePolicy::ReplaceWithAggregate),
            "join" => Ok(UpdatePolicy::OwnJoinAggregate),
            "meet" => Ok(UpdatePolicy::OwnMeetAggregate),
            other => Err(PreferenceError::InvalidRole(format!(
                "unknown update policy '{}', expected prior, posterior, join or meet",
                other
            ))),
        }
    }
}

/// A network participant holding a preference relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    initial: Relation,
    current: Relation,
    r: usize,
    policy: UpdatePolicy,
}

impl Agent {
    /// Create an agent. `r` must be at least 1.
    pub fn new(relation: Relation, r: usize, policy: UpdatePolicy) -> Result<Self> {
        if r == 0 {
            return Err(PreferenceError::InvalidParameter(
                "aggregation width r must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            initial: relation.clone(),
            current: relation,
            r,
            policy,
        })
    }

    /// Aggregation width.
    pub fn r(&self) -> usize {
        self.r
    }

    /// Update policy.
    pub fn policy(&self) -> UpdatePolicy {
        self.policy
    }

    /// Relation the agent was created with.
    pub fn initial_relation(&self) -> &Relation {
        &self.initial
    }

    /// Successor agent holding `relation`, with the same `r`, policy and
    /// initial relation.
    pub fn with_relation(&self, relation: Relation) -> Agent {
        Agent {
            initial: self.initial.clone(),
            current: relation,
            r: self.r,
            policy: self.policy,
        }
    }

    /// r-median aggregate of the neighborhood.
    ///
    /// With `k = clamp(r, 1, neighbors.len())`, every k-subset of the
    /// neighbors is met, and the subset meets are joined. `k == 1` yields
    /// the join of all neighbors; `k == len` yields their meet.
    pub fn aggregate<S: PreferenceSource>(&self, neighbors: &[S]) -> Result<Relation> {
        if neighbors.is_empty() {
            return Err(PreferenceError::EmptyNeighborhood);
        }
        let own = self.current.alternative_count();
        for neighbor in neighbors {
            let theirs = neighbor.relation().alternative_count();
            if theirs != own {
                return Err(PreferenceError::DomainMismatch {
                    left: own,
                    right: theirs,
                });
            }
        }

        let k = self.r.clamp(1, neighbors.len());
        let mut aggregate: Option<Relation> = None;
        for subset in Combinations::new(neighbors.len(), k) {
            let met = Relation::meet_all(subset.iter().map(|&idx| neighbors[idx].relation()))?;
            aggregate = Some(match aggregate {
                Some(acc) => acc.join(&met)?,
                None => met,
            });
        }
        aggregate.ok_or(PreferenceError::EmptyNeighborhood)
    }

    /// Relation this agent holds after one round, per its policy.
    pub fn update<S: PreferenceSource>(&self, neighbors: &[S]) -> Result<Relation> {
        match self.policy {
            UpdatePolicy::KeepOwn => Ok(self.current.clone()),
            UpdatePolicy::ReplaceWithAggregate => self.aggregate(neighbors),
            UpdatePolicy::OwnJoinAggregate => self.current.join(&self.aggregate(neighbors)?),
            UpdatePolicy::OwnMeetAggregate => self.current.meet(&self.aggregate(neighbors)?),
        }
    }
}

impl PreferenceSource for Agent {
    fn relation(&self) -> &Relation {
        &self.current
    }
}

/// Lexicographic k-subsets of `0..n`.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        let k = self.indices.len();
        // Rightmost index that can still move forward.
        match (0..k).rev().find(|&i| self.indices[i] < self.n - k + i) {
            Some(i) => {
                self.indices[i] += 1;
                for j in (i + 1)..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
            }
            None => self.done = true,
        }
        Some(current)
    }
}
