//! Preference relations and their lattice algebra.
//!
//! A [`Relation`] is a preorder over the alternatives `0..n`, stored as a
//! transitively closed digraph with the diagonal removed. Join is the
//! closure of the edge union, meet is the edge intersection. Both return
//! new values and leave their operands untouched.
//!
//! The minimal, human-readable form of a relation is a separate type,
//! [`CleanView`], so it can never be fed back into the algebra.

pub mod generate;
pub mod graph;

use crate::error::{PreferenceError, Result};
use graph::Digraph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transitively closed, irreflexive preference relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    closed: Digraph,
}

impl Relation {
    /// Build a relation from an edge set, closing it.
    ///
    /// Self-loops in the input are accepted and dropped.
    pub fn new<I>(alternatives: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let graph = Digraph::from_edges(alternatives, edges)?;
        Ok(Self::close(&graph))
    }

    /// The relation with no comparisons.
    pub fn empty(alternatives: usize) -> Self {
        Self {
            closed: Digraph::empty(alternatives),
        }
    }

    fn close(graph: &Digraph) -> Self {
        let mut closed = graph.transitive_closure();
        closed.remove_self_loops();
        Self { closed }
    }

    /// Size of the alternative set.
    pub fn alternative_count(&self) -> usize {
        self.closed.node_count()
    }

    /// Number of edges in the closed form.
    pub fn edge_count(&self) -> usize {
        self.closed.edge_count()
    }

    /// Whether `from` weakly precedes `to`.
    pub fn contains(&self, from: usize, to: usize) -> bool {
        self.closed.contains(from, to)
    }

    /// Closed edges in lexicographic order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.closed.edges()
    }

    /// Whether the relation is a strict partial order (no indifference cycles).
    pub fn is_acyclic(&self) -> bool {
        self.closed.is_acyclic()
    }

    /// Least upper bound: the closure of both edge sets together.
    pub fn join(&self, other: &Relation) -> Result<Relation> {
        let union = self.closed.compose(&other.closed)?;
        Ok(Self::close(&union))
    }

    /// Greatest lower bound: the edges both relations contain.
    ///
    /// Intersections of closed relations are closed, so no re-closure runs.
    pub fn meet(&self, other: &Relation) -> Result<Relation> {
        let closed = self.closed.intersection(&other.closed)?;
        Ok(Self { closed })
    }

    /// Fold [`Relation::join`] over a non-empty sequence.
    pub fn join_all<'a, I>(relations: I) -> Result<Relation>
    where
        I: IntoIterator<Item = &'a Relation>,
    {
        Self::fold(relations, Relation::join)
    }

    /// Fold [`Relation::meet`] over a non-empty sequence.
    pub fn meet_all<'a, I>(relations: I) -> Result<Relation>
    where
        I: IntoIterator<Item = &'a Relation>,
    {
        Self::fold(relations, Relation::meet)
    }

    fn fold<'a, I, F>(relations: I, op: F) -> Result<Relation>
    where
        I: IntoIterator<Item = &'a Relation>,
        F: Fn(&Relation, &Relation) -> Result<Relation>,
    {
        let mut iter = relations.into_iter();
        let first = iter.next().ok_or(PreferenceError::EmptyNeighborhood)?;
        iter.try_fold(first.clone(), |acc, next| op(&acc, next))
    }

    /// Count of direct contradictions: ordered pairs `(i, j)` with
    /// `(i, j)` in `self` and `(j, i)` in `other`.
    ///
    /// Incomparability against a strict claim is not counted.
    pub fn distance(&self, other: &Relation) -> Result<usize> {
        let (left, right) = (self.alternative_count(), other.alternative_count());
        if left != right {
            return Err(PreferenceError::SizeMismatch { left, right });
        }
        Ok(self
            .edges()
            .filter(|&(i, j)| other.contains(j, i))
            .count())
    }

    /// Minimal display form: self-loops removed, transitive reduction applied.
    pub fn clean_view(&self) -> Result<CleanView> {
        let reduced = self.closed.transitive_reduction()?;
        Ok(CleanView { reduced })
    }

    /// Add one edge and re-close in place.
    ///
    /// Only the greedy builder mutates relations, and only its own.
    pub(crate) fn insert_and_close(&mut self, from: usize, to: usize) -> Result<()> {
        let mut graph = self.closed.clone();
        graph.add_edge(from, to)?;
        *self = Self::close(&graph);
        Ok(())
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_edges(f, self.edges())
    }
}

/// Transitive reduction of an acyclic relation, for presentation only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanView {
    reduced: Digraph,
}

impl CleanView {
    /// Covering edges in lexicographic order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.reduced.edges()
    }

    /// Number of covering edges.
    pub fn edge_count(&self) -> usize {
        self.reduced.edge_count()
    }
}

impl fmt::Display for CleanView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_edges(f, self.edges())
    }
}

fn write_edges(
    f: &mut fmt::Formatter<'_>,
    edges: impl Iterator<Item = (usize, usize)>,
) -> fmt::Result {
    write!(f, "{{")?;
    for (idx, (from, to)) in edges.enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "({}, {})", from, to)?;
    }
    write!(f, "}}")
}

/// Serializable edge-list snapshot of a relation, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationSnapshot {
    /// Size of the alternative set.
    pub alternatives: usize,
    /// Closed edges.
    pub edges: Vec<(usize, usize)>,
}

impl From<&Relation> for RelationSnapshot {
    fn from(relation: &Relation) -> Self {
        Self {
            alternatives: relation.alternative_count(),
            edges: relation.edges().collect(),
        }
    }
}

impl TryFrom<RelationSnapshot> for Relation {
    type Error = PreferenceError;

    fn try_from(snapshot: RelationSnapshot) -> Result<Self> {
        Relation::new(snapshot.alternatives, snapshot.edges)
    }
}
