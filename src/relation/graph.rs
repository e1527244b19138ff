//! Dense directed graphs over a fixed alternative set.
//!
//! This module holds the graph primitives the relation algebra is built
//! from: union, intersection, transitive closure and transitive reduction.
//! A [`Digraph`] carries no closure invariant of its own.
//!
//! Union, intersection and closure run on the dense matrix, which also
//! gives relations structural equality and hashing. Cycle detection and
//! the reduction of a DAG are delegated to `petgraph`.

use crate::error::{PreferenceError, Result};
use petgraph::algo::tred::{dag_to_toposorted_adjacency_list, dag_transitive_reduction_closure};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DefaultIx, DiGraph, NodeIndex};
use petgraph::visit::IntoNeighbors;

/// Directed graph on the alternatives `0..n`, stored as an `n x n`
/// adjacency matrix in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digraph {
    n: usize,
    adj: Vec<bool>,
}

impl Digraph {
    /// Create a graph with `n` alternatives and no edges.
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            adj: vec![false; n * n],
        }
    }

    /// Build a graph from an edge list, rejecting out-of-range alternatives.
    pub fn from_edges<I>(n: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut graph = Self::empty(n);
        for (from, to) in edges {
            graph.add_edge(from, to)?;
        }
        Ok(graph)
    }

    /// Number of alternatives.
    pub fn node_count(&self) -> usize {
        self.n
    }

    /// Number of edges, self-loops included.
    pub fn edge_count(&self) -> usize {
        self.adj.iter().filter(|&&e| e).count()
    }

    /// Whether the edge `(from, to)` is present. Out-of-range pairs are absent.
    pub fn contains(&self, from: usize, to: usize) -> bool {
        from < self.n && to < self.n && self.adj[from * self.n + to]
    }

    /// Insert the edge `(from, to)`.
    pub fn add_edge(&mut self, from: usize, to: usize) -> Result<()> {
        for alternative in [from, to] {
            if alternative >= self.n {
                return Err(PreferenceError::AlternativeOutOfRange {
                    alternative,
                    count: self.n,
                });
            }
        }
        self.adj[from * self.n + to] = true;
        Ok(())
    }

    /// Edges in lexicographic `(from, to)` order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let n = self.n;
        self.adj
            .iter()
            .enumerate()
            .filter(|(_, present)| **present)
            .map(move |(idx, _)| (idx / n, idx % n))
    }

    /// Drop every self-loop.
    pub fn remove_self_loops(&mut self) {
        for i in 0..self.n {
            self.adj[i * self.n + i] = false;
        }
    }

    /// Directed edge union of two graphs over the same alternatives.
    ///
    /// This is the `compose` step of a join: edges are merged, not chained.
    pub fn compose(&self, other: &Digraph) -> Result<Digraph> {
        self.check_domain(other)?;
        let adj = self
            .adj
            .iter()
            .zip(&other.adj)
            .map(|(a, b)| *a || *b)
            .collect();
        Ok(Digraph { n: self.n, adj })
    }

    /// Edges present in both graphs.
    pub fn intersection(&self, other: &Digraph) -> Result<Digraph> {
        self.check_domain(other)?;
        let adj = self
            .adj
            .iter()
            .zip(&other.adj)
            .map(|(a, b)| *a && *b)
            .collect();
        Ok(Digraph { n: self.n, adj })
    }

    /// Transitive closure (Warshall). Cycles produce self-loops, which
    /// callers strip if they keep relations irreflexive.
    pub fn transitive_closure(&self) -> Digraph {
        let n = self.n;
        let mut adj = self.adj.clone();
        for k in 0..n {
            for i in 0..n {
                if !adj[i * n + k] {
                    continue;
                }
                for j in 0..n {
                    if adj[k * n + j] {
                        adj[i * n + j] = true;
                    }
                }
            }
        }
        Digraph { n, adj }
    }

    /// Whether the graph, ignoring self-loops, has no directed cycle.
    pub fn is_acyclic(&self) -> bool {
        !is_cyclic_directed(&self.to_petgraph(false))
    }

    /// Transitive reduction of a DAG: keep the edges of `self` that are not
    /// implied by a path through another alternative.
    ///
    /// Requires an acyclic graph without self-loops.
    pub fn transitive_reduction(&self) -> Result<Digraph> {
        let graph = self.to_petgraph(true);
        // Self-loops are kept above so toposort rejects them as cycles.
        let order = toposort(&graph, None).map_err(|_| PreferenceError::CyclicRelation)?;
        let (sorted, position) = dag_to_toposorted_adjacency_list::<_, DefaultIx>(&graph, &order);
        let (reduction, _) = dag_transitive_reduction_closure(&sorted);

        let mut reduced = Digraph::empty(self.n);
        for from in 0..self.n {
            for to in reduction.neighbors(position[from]) {
                reduced.adj[from * self.n + order[to as usize].index()] = true;
            }
        }
        Ok(reduced)
    }

    /// Copy into a `petgraph` digraph whose node `i` is alternative `i`.
    fn to_petgraph(&self, keep_self_loops: bool) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.n, self.edge_count());
        for _ in 0..self.n {
            graph.add_node(());
        }
        for (from, to) in self.edges() {
            if keep_self_loops || from != to {
                graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
            }
        }
        graph
    }

    fn check_domain(&self, other: &Digraph) -> Result<()> {
        if self.n != other.n {
            return Err(PreferenceError::DomainMismatch {
                left: self.n,
                right: other.n,
            });
        }
        Ok(())
    }
}
