//! Seeded random relation generators.
//!
//! Every generator takes its randomness source as an argument so trials
//! stay reproducible from a single seed.

use super::graph::Digraph;
use super::Relation;
use crate::error::{PreferenceError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Maximum number of strict comparisons an acyclic relation on `n`
/// alternatives can hold.
pub fn max_comparisons(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Random DAG with exactly `comparisons` direct edges, returned closed.
///
/// A hidden linear order is drawn first; every sampled edge points forward
/// in that order, which rules out cycles.
pub fn random_dag<R: Rng + ?Sized>(n: usize, comparisons: usize, rng: &mut R) -> Result<Relation> {
    let max = max_comparisons(n);
    if comparisons > max {
        return Err(PreferenceError::TooManyComparisons {
            requested: comparisons,
            max,
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut dag = Digraph::empty(n);
    while dag.edge_count() < comparisons {
        let a = rng.random_range(0..n);
        let b = rng.random_range(0..n);
        if a == b {
            continue;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        dag.add_edge(order[lo], order[hi])?;
    }

    debug!("Generated DAG over {} alternatives with {} edges", n, comparisons);
    Relation::new(n, dag.edges())
}

/// Random partial order: each forward pair of a hidden linear order is
/// compared with probability `p`, then the result is closed.
pub fn random_preorder<R: Rng + ?Sized>(n: usize, p: f64, rng: &mut R) -> Result<Relation> {
    if !(0.0..=1.0).contains(&p) {
        return Err(PreferenceError::InvalidParameter(format!(
            "comparison probability must be in [0, 1], got {}",
            p
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let mut edges = Vec::new();
    for lo in 0..n {
        for hi in (lo + 1)..n {
            if rng.random_bool(p) {
                edges.push((order[lo], order[hi]));
            }
        }
    }
    Relation::new(n, edges)
}
