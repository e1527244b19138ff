//! Undirected interaction topologies.

use crate::error::{PreferenceError, Result};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Identifier of a node in a topology.
pub type NodeId = usize;

/// Attempts made by the pairing model before giving up.
const MAX_PAIRING_ATTEMPTS: usize = 1000;

/// Fixed undirected simple graph over node identifiers.
///
/// Node weights are the caller's [`NodeId`]s; `index` maps them back to
/// graph indices.
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<NodeId, ()>,
    index: BTreeMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Build a topology from its node set and undirected edges.
    ///
    /// Edge endpoints must be listed nodes; self-loops are rejected and
    /// repeated edges are merged.
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = NodeId>,
        E: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let mut graph = UnGraph::new_undirected();
        let mut index = BTreeMap::new();
        for node in nodes {
            index.entry(node).or_insert_with(|| graph.add_node(node));
        }

        for (a, b) in edges {
            if a == b {
                return Err(PreferenceError::InvalidTopology(format!(
                    "self-loop on node {}",
                    a
                )));
            }
            let ia = *index.get(&a).ok_or(PreferenceError::NodeNotFound(a))?;
            let ib = *index.get(&b).ok_or(PreferenceError::NodeNotFound(b))?;
            graph.update_edge(ia, ib, ());
        }

        Ok(Self { graph, index })
    }

    /// Cycle through nodes `0..n`.
    pub fn ring(n: usize) -> Result<Self> {
        if n < 3 {
            return Err(PreferenceError::InvalidTopology(
                "a ring needs at least 3 nodes".to_string(),
            ));
        }
        Self::from_edges(0..n, (0..n).map(|i| (i, (i + 1) % n)))
    }

    /// Complete graph on nodes `0..n`.
    pub fn complete(n: usize) -> Result<Self> {
        let edges = (0..n).flat_map(|a| ((a + 1)..n).map(move |b| (a, b)));
        Self::from_edges(0..n, edges)
    }

    /// Random `degree`-regular graph on nodes `0..n` (pairing model with
    /// rejection of loops and multi-edges).
    pub fn random_regular<R: Rng + ?Sized>(degree: usize, n: usize, rng: &mut R) -> Result<Self> {
        if degree >= n {
            return Err(PreferenceError::InvalidTopology(format!(
                "degree {} must be smaller than node count {}",
                degree, n
            )));
        }
        if (n * degree) % 2 != 0 {
            return Err(PreferenceError::InvalidTopology(format!(
                "n * degree must be even, got {} * {}",
                n, degree
            )));
        }

        let mut stubs: Vec<NodeId> = (0..n)
            .flat_map(|node| std::iter::repeat(node).take(degree))
            .collect();

        for attempt in 1..=MAX_PAIRING_ATTEMPTS {
            stubs.shuffle(rng);
            if let Some(edges) = pair_stubs(&stubs) {
                debug!(
                    "Built {}-regular topology on {} nodes after {} attempt(s)",
                    degree, n, attempt
                );
                return Self::from_edges(0..n, edges);
            }
        }

        Err(PreferenceError::InvalidTopology(format!(
            "no simple {}-regular graph found on {} nodes after {} attempts",
            degree, n, MAX_PAIRING_ATTEMPTS
        )))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Whether `node` belongs to the topology.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Whether `a` and `b` are adjacent (in either direction).
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        match (self.index.get(&a), self.index.get(&b)) {
            (Some(&ia), Some(&ib)) => self.graph.contains_edge(ia, ib),
            _ => false,
        }
    }

    /// Neighbors of `node` in ascending order.
    pub fn neighbors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let idx = self.node_index(node)?;
        let mut neighbors: Vec<NodeId> = self
            .graph
            .neighbors(idx)
            .map(|peer| self.graph[peer])
            .collect();
        neighbors.sort_unstable();
        Ok(neighbors)
    }

    /// Degree of `node`.
    pub fn degree(&self, node: NodeId) -> Result<usize> {
        let idx = self.node_index(node)?;
        Ok(self.graph.neighbors(idx).count())
    }

    /// Undirected edges as `(low, high)` pairs in ascending order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .graph
            .edge_references()
            .map(|edge| {
                let (a, b) = (self.graph[edge.source()], self.graph[edge.target()]);
                (a.min(b), a.max(b))
            })
            .collect();
        edges.sort_unstable();
        edges
    }

    fn node_index(&self, node: NodeId) -> Result<NodeIndex> {
        self.index
            .get(&node)
            .copied()
            .ok_or(PreferenceError::NodeNotFound(node))
    }
}

impl PartialEq for Topology {
    fn eq(&self, other: &Self) -> bool {
        self.index.keys().eq(other.index.keys()) && self.edges() == other.edges()
    }
}

impl Eq for Topology {}

/// Pair consecutive stubs; `None` if a loop or repeated edge appears.
fn pair_stubs(stubs: &[NodeId]) -> Option<Vec<(NodeId, NodeId)>> {
    let mut seen = BTreeSet::new();
    let mut edges = Vec::with_capacity(stubs.len() / 2);
    for pair in stubs.chunks(2) {
        let (a, b) = (pair[0], pair[1]);
        if a == b || !seen.insert((a.min(b), a.max(b))) {
            return None;
        }
        edges.push((a, b));
    }
    Some(edges)
}
