//! Agent networks and synchronous update rounds.
//!
//! A [`Network`] binds one [`Agent`] to every node of a fixed [`Topology`].
//! A round computes every node's next relation from the pre-round snapshot
//! and only then swaps the whole snapshot in. Rounds take `&mut self` (or
//! produce a fresh network via [`Network::next_round`]), so no caller can
//! touch an agent while a round is being computed.

pub mod topology;

use crate::agent::{Agent, PreferenceSource};
use crate::error::{PreferenceError, Result};
use crate::relation::{CleanView, Relation};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error};

pub use topology::{NodeId, Topology};

/// A topology with one agent per node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Network {
    topology: Topology,
    agents: BTreeMap<NodeId, Agent>,
}

impl Network {
    /// Bind agents to the nodes of `topology`.
    ///
    /// Every node needs an agent (`IncompleteProfile`), and every agent must
    /// sit on a topology node (`NodeNotFound`).
    pub fn new(topology: Topology, agents: BTreeMap<NodeId, Agent>) -> Result<Self> {
        if let Some(&stray) = agents.keys().find(|&&node| !topology.contains_node(node)) {
            error!("Agent bound to node {} which is not in the topology", stray);
            return Err(PreferenceError::NodeNotFound(stray));
        }
        if let Some(missing) = topology.nodes().find(|node| !agents.contains_key(node)) {
            error!("Node {} has no agent in the preference profile", missing);
            return Err(PreferenceError::IncompleteProfile(missing));
        }
        Ok(Self { topology, agents })
    }

    /// The interaction topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.agents.keys().copied()
    }

    /// Agent bound to `node`.
    pub fn agent(&self, node: NodeId) -> Result<&Agent> {
        self.agents
            .get(&node)
            .ok_or(PreferenceError::NodeNotFound(node))
    }

    /// Current relation of `node`.
    pub fn relation(&self, node: NodeId) -> Result<&Relation> {
        self.agent(node).map(|agent| agent.relation())
    }

    /// Display form of `node`'s current relation.
    pub fn clean_relation(&self, node: NodeId) -> Result<CleanView> {
        self.relation(node)?.clean_view()
    }

    /// Relation `node` would hold after the next round, computed from the
    /// current snapshot.
    pub fn update_node(&self, node: NodeId) -> Result<Relation> {
        let agent = self.agent(node)?;
        let neighbors = self
            .topology
            .neighbors(node)?
            .into_iter()
            .map(|peer| self.agent(peer))
            .collect::<Result<Vec<&Agent>>>()?;
        agent.update(&neighbors)
    }

    /// The network after one synchronous round. `self` is left untouched.
    ///
    /// Node updates only read the current snapshot, so they run in parallel.
    pub fn next_round(&self) -> Result<Network> {
        let updated = self
            .agents
            .par_iter()
            .map(|(&node, agent)| {
                self.update_node(node)
                    .map(|relation| (node, agent.with_relation(relation)))
            })
            .collect::<Result<BTreeMap<NodeId, Agent>>>()?;

        Ok(Network {
            topology: self.topology.clone(),
            agents: updated,
        })
    }

    /// Run one synchronous round and commit it.
    ///
    /// On error the snapshot is left as it was before the round.
    pub fn round_update(&mut self) -> Result<()> {
        debug!("Running update round over {} agents", self.agents.len());
        let next = self.next_round()?;
        self.agents = next.agents;
        Ok(())
    }

    /// Pairwise contradiction counts along topology edges.
    ///
    /// Entry `(i, j)` (in node order) is `distance(agent_i, agent_j)` when
    /// `i` and `j` are adjacent, else 0. With `normalize`, entries are
    /// rescaled by the global min/max; if those coincide every entry is 0.
    pub fn distance_matrix(&self, normalize: bool) -> Result<DistanceMatrix> {
        let nodes: Vec<NodeId> = self.nodes().collect();
        let n = nodes.len();
        let mut matrix = DistanceMatrix::zeros(n);

        for (i, &a) in nodes.iter().enumerate() {
            for (j, &b) in nodes.iter().enumerate() {
                if self.topology.has_edge(a, b) {
                    let distance = self.relation(a)?.distance(self.relation(b)?)?;
                    matrix.set(i, j, distance as f64);
                }
            }
        }

        if normalize {
            matrix.normalize();
        }
        Ok(matrix)
    }
}

/// Dense square matrix of pairwise distances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// An all-zero `size x size` matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    /// Number of rows (and columns).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Entry at row `i`, column `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        self.values[i * self.size + j] = value;
    }

    /// Rows as slices.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.values.chunks(self.size.max(1))
    }

    /// Sum of all entries.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Largest entry, 0 for an empty matrix.
    pub fn max(&self) -> f64 {
        self.values.iter().copied().reduce(f64::max).unwrap_or(0.0)
    }

    /// Smallest entry, 0 for an empty matrix.
    pub fn min(&self) -> f64 {
        self.values.iter().copied().reduce(f64::min).unwrap_or(0.0)
    }

    fn normalize(&mut self) {
        let (min, max) = (self.min(), self.max());
        let range = max - min;
        for value in &mut self.values {
            *value -= min;
            if range != 0.0 {
                *value /= range;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::UpdatePolicy;

    fn rel(n: usize, edges: &[(usize, usize)]) -> Relation {
        Relation::new(n, edges.iter().copied()).unwrap()
    }

    fn agent(edges: &[(usize, usize)], r: usize, policy: UpdatePolicy) -> Agent {
        Agent::new(rel(3, edges), r, policy).unwrap()
    }

    /// Path 0 - 1 - 2.
    fn path_network(policy: UpdatePolicy) -> Network {
        let topology = Topology::from_edges(0..3, vec![(0, 1), (1, 2)]).unwrap();
        let agents = BTreeMap::from([
            (0, agent(&[(0, 1)], 1, policy)),
            (1, agent(&[(1, 2)], 1, policy)),
            (2, agent(&[(1, 0)], 1, policy)),
        ]);
        Network::new(topology, agents).unwrap()
    }

    #[test]
    fn test_new_rejects_incomplete_profile() {
        let topology = Topology::ring(3).unwrap();
        let agents = BTreeMap::from([
            (0, agent(&[], 1, UpdatePolicy::KeepOwn)),
            (2, agent(&[], 1, UpdatePolicy::KeepOwn)),
        ]);
        assert_eq!(
            Network::new(topology, agents).unwrap_err(),
            PreferenceError::IncompleteProfile(1)
        );
    }

    #[test]
    fn test_new_rejects_stray_agent() {
        let topology = Topology::complete(2).unwrap();
        let agents = BTreeMap::from([
            (0, agent(&[], 1, UpdatePolicy::KeepOwn)),
            (1, agent(&[], 1, UpdatePolicy::KeepOwn)),
            (5, agent(&[], 1, UpdatePolicy::KeepOwn)),
        ]);
        assert_eq!(
            Network::new(topology, agents).unwrap_err(),
            PreferenceError::NodeNotFound(5)
        );
    }

    #[test]
    fn test_unknown_node_lookup() {
        let network = path_network(UpdatePolicy::KeepOwn);
        assert_eq!(network.relation(7).unwrap_err(), PreferenceError::NodeNotFound(7));
        assert!(network.update_node(7).is_err());
    }

    #[test]
    fn test_round_update_posterior() {
        let mut network = path_network(UpdatePolicy::ReplaceWithAggregate);
        network.round_update().unwrap();

        // Node 0 sees only node 1, node 2 sees only node 1.
        assert_eq!(network.relation(0).unwrap(), &rel(3, &[(1, 2)]));
        assert_eq!(network.relation(2).unwrap(), &rel(3, &[(1, 2)]));
        // Node 1 joins its two neighbors' pre-round views: (0,1) and (1,0).
        let middle = network.relation(1).unwrap();
        assert!(middle.contains(0, 1) && middle.contains(1, 0));
    }

    #[test]
    fn test_round_uses_pre_round_snapshot() {
        let network = path_network(UpdatePolicy::ReplaceWithAggregate);

        // Expected results computed node by node from the untouched snapshot.
        let expected: Vec<Relation> = network
            .nodes()
            .map(|node| network.update_node(node).unwrap())
            .collect();

        let next = network.next_round().unwrap();
        for (node, relation) in next.nodes().zip(&expected) {
            assert_eq!(next.relation(node).unwrap(), relation);
        }
        // The source snapshot is unchanged by computing the next round.
        assert_eq!(network, path_network(UpdatePolicy::ReplaceWithAggregate));
    }

    // Mid-round mutation cannot be written: `round_update` holds `&mut self`
    // and `next_round` only borrows the snapshot it reads.
    #[test]
    fn test_round_is_pure_function_of_snapshot() {
        let source = path_network(UpdatePolicy::ReplaceWithAggregate);
        let next = source.next_round().unwrap();

        let mut changed = source.clone();
        changed
            .agents
            .insert(1, agent(&[(2, 0)], 1, UpdatePolicy::ReplaceWithAggregate));
        assert_eq!(next, source.next_round().unwrap());
        assert_ne!(changed.next_round().unwrap(), next);
    }

    #[test]
    fn test_clean_relation() {
        let mut network = path_network(UpdatePolicy::ReplaceWithAggregate);
        let clean = network.clean_relation(0).unwrap();
        assert_eq!(clean.edges().collect::<Vec<_>>(), vec![(0, 1)]);

        network.round_update().unwrap();
        // Node 1 now holds 0 ~ 1, which has no reduction.
        assert_eq!(
            network.clean_relation(1).unwrap_err(),
            PreferenceError::CyclicRelation
        );
        assert_eq!(
            network.clean_relation(7).unwrap_err(),
            PreferenceError::NodeNotFound(7)
        );
    }

    #[test]
    fn test_keep_own_is_fixed_point() {
        let mut network = path_network(UpdatePolicy::KeepOwn);
        let before = network.clone();
        network.round_update().unwrap();
        assert_eq!(network, before);
    }

    #[test]
    fn test_isolated_node_fails_round() {
        let topology = Topology::from_edges(0..2, Vec::new()).unwrap();
        let agents = BTreeMap::from([
            (0, agent(&[(0, 1)], 1, UpdatePolicy::ReplaceWithAggregate)),
            (1, agent(&[], 1, UpdatePolicy::ReplaceWithAggregate)),
        ]);
        let mut network = Network::new(topology, agents).unwrap();
        let before = network.clone();
        assert_eq!(
            network.round_update().unwrap_err(),
            PreferenceError::EmptyNeighborhood
        );
        assert_eq!(network, before);
    }

    #[test]
    fn test_distance_matrix_edges_only() {
        let network = path_network(UpdatePolicy::KeepOwn);
        let matrix = network.distance_matrix(false).unwrap();

        assert_eq!(matrix.size(), 3);
        // 0 and 2 contradict each other but are not adjacent.
        assert_eq!(matrix.get(0, 2), 0.0);
        assert_eq!(matrix.get(0, 1), 0.0);
        assert_eq!(matrix.get(1, 2), 0.0);
        assert_eq!(matrix.sum(), 0.0);
    }

    #[test]
    fn test_distance_matrix_counts_and_normalizes() {
        let topology = Topology::complete(3).unwrap();
        let agents = BTreeMap::from([
            (0, agent(&[(0, 1), (1, 2)], 1, UpdatePolicy::KeepOwn)),
            (1, agent(&[(2, 1), (1, 0)], 1, UpdatePolicy::KeepOwn)),
            (2, agent(&[(1, 0)], 1, UpdatePolicy::KeepOwn)),
        ]);
        let network = Network::new(topology, agents).unwrap();

        let raw = network.distance_matrix(false).unwrap();
        assert_eq!(raw.get(0, 1), 3.0);
        assert_eq!(raw.get(1, 0), 3.0);
        assert_eq!(raw.get(0, 2), 1.0);
        assert_eq!(raw.get(1, 2), 0.0);
        assert_eq!(raw.get(0, 0), 0.0);
        assert_eq!(raw.max(), 3.0);

        let normalized = network.distance_matrix(true).unwrap();
        assert_eq!(normalized.get(0, 1), 1.0);
        assert!((normalized.get(0, 2) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(normalized.min(), 0.0);
    }

    #[test]
    fn test_distance_matrix_flat_normalization() {
        let network = path_network(UpdatePolicy::KeepOwn);
        let normalized = network.distance_matrix(true).unwrap();
        assert!(normalized.rows().all(|row| row.iter().all(|&v| v == 0.0)));
    }
}
