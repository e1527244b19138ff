//! Greedy utility-maximizing preference construction.
//!
//! A [`GreedyBuilder`] owns a relation and a table of weighted candidate
//! edges. Each step tries every candidate not yet implied by the relation,
//! scores the result, and commits the best one. There is no backtracking.

use crate::error::{PreferenceError, Result};
use crate::relation::Relation;
use std::collections::BTreeMap;
use tracing::debug;

/// Incrementally grows a closed preference to maximize edge weight.
#[derive(Debug, Clone)]
pub struct GreedyBuilder {
    relation: Relation,
    weights: BTreeMap<(usize, usize), f64>,
}

impl GreedyBuilder {
    /// Start from the empty relation on `alternatives`.
    pub fn new<W>(alternatives: usize, weights: W) -> Result<Self>
    where
        W: IntoIterator<Item = ((usize, usize), f64)>,
    {
        Self::with_relation(Relation::empty(alternatives), weights)
    }

    /// Start from an existing relation.
    pub fn with_relation<W>(relation: Relation, weights: W) -> Result<Self>
    where
        W: IntoIterator<Item = ((usize, usize), f64)>,
    {
        let count = relation.alternative_count();
        let weights: BTreeMap<(usize, usize), f64> = weights.into_iter().collect();
        for &(from, to) in weights.keys() {
            for alternative in [from, to] {
                if alternative >= count {
                    return Err(PreferenceError::AlternativeOutOfRange { alternative, count });
                }
            }
        }
        Ok(Self { relation, weights })
    }

    /// The relation built so far.
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Total weight of the current relation.
    ///
    /// Only covering edges count: the relation is scored on its transitive
    /// reduction, so implied edges carry no weight of their own.
    pub fn utility(&self) -> Result<f64> {
        self.utility_of(&self.relation)
    }

    fn utility_of(&self, relation: &Relation) -> Result<f64> {
        relation.clean_view()?.edges().try_fold(0.0, |total, (from, to)| {
            self.weights
                .get(&(from, to))
                .map(|weight| total + weight)
                .ok_or(PreferenceError::MissingWeight { from, to })
        })
    }

    /// Run up to `max_steps` greedy steps and return the resulting relation.
    ///
    /// Candidates are scanned in lexicographic edge order and the first one
    /// with maximal utility wins. Candidates that would close a cycle are
    /// inadmissible. Stops early once no admissible candidate remains.
    pub fn find_optimum(&mut self, max_steps: usize) -> Result<&Relation> {
        let alternatives = self.relation.alternative_count();

        for step in 0..max_steps {
            let mut best: Option<((usize, usize), f64)> = None;

            for &(from, to) in self.weights.keys() {
                if from == to || self.relation.contains(from, to) {
                    continue;
                }
                let atom = Relation::new(alternatives, [(from, to)])?;
                let candidate = self.relation.join(&atom)?;
                if !candidate.is_acyclic() {
                    debug!("Skipping ({}, {}): would close a cycle", from, to);
                    continue;
                }
                let utility = self.utility_of(&candidate)?;
                if best.map_or(true, |(_, top)| utility > top) {
                    best = Some(((from, to), utility));
                }
            }

            let Some(((from, to), utility)) = best else {
                debug!("No admissible candidates left after {} step(s)", step);
                break;
            };
            debug!(
                "Step {}: adding ({}, {}) for utility {}",
                step + 1,
                from,
                to,
                utility
            );
            self.relation.insert_and_close(from, to)?;
        }

        Ok(&self.relation)
    }
}
