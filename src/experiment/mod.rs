//! Experiment runner.
//!
//! Builds a fixed topology and agent parameters from one seed, then runs
//! independent trials that each draw fresh initial preferences and record
//! the network energy before every update round.

pub mod report;

use crate::agent::{Agent, UpdatePolicy};
use crate::network::{DistanceMatrix, Network, Topology};
use crate::relation::generate::random_preorder;
use crate::relation::RelationSnapshot;
use anyhow::{bail, Context, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// How a distance matrix is reduced to a single loss value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnergyMethod {
    /// Half the sum of all entries (each edge counted once).
    #[default]
    Sum,
    /// Largest entry.
    Max,
}

impl EnergyMethod {
    /// Reduce a raw distance matrix to a loss.
    pub fn energy(&self, matrix: &DistanceMatrix) -> f64 {
        match self {
            EnergyMethod::Sum => 0.5 * matrix.sum(),
            EnergyMethod::Max => matrix.max(),
        }
    }
}

impl fmt::Display for EnergyMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnergyMethod::Sum => write!(f, "sum"),
            EnergyMethod::Max => write!(f, "max"),
        }
    }
}

/// Parameters of an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSettings {
    /// Free-form description stored with the results.
    pub description: String,
    /// Base seed for every random draw.
    pub seed: u64,
    /// Number of independent trials.
    pub trials: usize,
    /// Update rounds per trial.
    pub iterations: usize,
    /// Number of agents (nodes).
    pub agents: usize,
    /// Degree of the random regular topology.
    pub degree: usize,
    /// Number of alternatives each relation ranges over.
    pub alternatives: usize,
    /// Probability that a pair is compared in an initial preference.
    pub p_preference: f64,
    /// Policies agents are drawn from.
    pub policies: Vec<UpdatePolicy>,
    /// Upper bound for drawn aggregation widths (defaults to the degree).
    pub max_r: Option<usize>,
    /// Loss reduction.
    pub energy: EnergyMethod,
    /// Trials run at the same time.
    pub concurrency: usize,
}

/// Fixed per-experiment draws shared by every trial.
#[derive(Debug, Clone)]
pub struct ExperimentPlan {
    /// Settings the plan was drawn from.
    pub settings: ExperimentSettings,
    /// Interaction topology.
    pub topology: Topology,
    /// Aggregation width per node.
    pub r_values: Vec<usize>,
    /// Update policy per node.
    pub policies: Vec<UpdatePolicy>,
}

impl ExperimentPlan {
    /// Draw topology, widths and policies from `settings.seed`.
    pub fn draw(settings: ExperimentSettings) -> Result<Self> {
        if settings.policies.is_empty() {
            bail!("At least one update policy is required");
        }
        let mut rng = StdRng::seed_from_u64(settings.seed);

        let max_r = settings.max_r.unwrap_or(settings.degree).max(1);
        let r_values: Vec<usize> = (0..settings.agents)
            .map(|_| rng.random_range(1..=max_r))
            .collect();
        let policies: Vec<UpdatePolicy> = (0..settings.agents)
            .filter_map(|_| settings.policies.choose(&mut rng).copied())
            .collect();

        let topology = Topology::random_regular(settings.degree, settings.agents, &mut rng)
            .context("Failed to build interaction topology")?;

        debug!("r values: {:?}", r_values);
        debug!("Topology edges: {:?}", topology.edges());

        Ok(Self {
            settings,
            topology,
            r_values,
            policies,
        })
    }

    /// Initial network of `trial`; node `i` draws its preference from
    /// seed `seed + i + trial`.
    pub fn initial_network(&self, trial: usize) -> Result<Network> {
        let s = &self.settings;
        let mut agents = BTreeMap::new();
        for (node, (&r, &policy)) in self.r_values.iter().zip(&self.policies).enumerate() {
            let seed = s.seed.wrapping_add((node + trial) as u64);
            let relation = random_preorder(
                s.alternatives,
                s.p_preference,
                &mut StdRng::seed_from_u64(seed),
            )?;
            debug!("Trial {} agent {}: {}", trial, node, relation);
            agents.insert(node, Agent::new(relation, r, policy)?);
        }
        Ok(Network::new(self.topology.clone(), agents)?)
    }

    /// Run one trial: the loss before each round and the relations the
    /// agents hold afterwards.
    pub fn run_trial(&self, trial: usize) -> Result<TrialOutcome> {
        let mut network = self.initial_network(trial)?;
        let energy = self.settings.energy;
        let mut losses = Vec::with_capacity(self.settings.iterations);

        for round in 0..self.settings.iterations {
            let loss = energy.energy(&network.distance_matrix(false)?);
            debug!("Trial {} round {}: loss = {}", trial, round, loss);
            losses.push(loss);
            network
                .round_update()
                .with_context(|| format!("Round {} of trial {} failed", round, trial))?;
        }

        let mut final_preferences = Vec::with_capacity(self.settings.agents);
        for node in network.nodes() {
            let relation = network.relation(node)?;
            match network.clean_relation(node) {
                Ok(clean) => debug!("Trial {} agent {} final: {}", trial, node, clean),
                Err(_) => debug!("Trial {} agent {} final (cyclic): {}", trial, node, relation),
            }
            final_preferences.push(RelationSnapshot::from(relation));
        }

        info!(
            "Trial {} done: loss {} -> {}",
            trial,
            losses.first().copied().unwrap_or_default(),
            losses.last().copied().unwrap_or_default()
        );
        Ok(TrialOutcome {
            losses,
            final_preferences,
        })
    }
}

/// Result of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Loss before each round.
    pub losses: Vec<f64>,
    /// Closed relation of every node after the last round, in node order.
    pub final_preferences: Vec<RelationSnapshot>,
}

/// Run every trial of `plan`, at most `concurrency` at a time.
///
/// Returns the outcomes indexed by trial.
pub async fn run_experiment(
    plan: Arc<ExperimentPlan>,
    show_progress: bool,
) -> Result<Vec<TrialOutcome>> {
    let trials = plan.settings.trials;
    let permits = Arc::new(Semaphore::new(plan.settings.concurrency.max(1)));

    let progress = if show_progress {
        let pb = ProgressBar::new(trials as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} trials ({eta})")
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let tasks = (0..trials).map(|trial| {
        let plan = Arc::clone(&plan);
        let permits = Arc::clone(&permits);
        let progress = progress.clone();
        async move {
            let _permit = permits.acquire_owned().await.context("Trial scheduler closed")?;
            let outcome = tokio::task::spawn_blocking(move || plan.run_trial(trial))
                .await
                .with_context(|| format!("Trial {} panicked", trial))??;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            Ok::<_, anyhow::Error>(outcome)
        }
    });

    let results = join_all(tasks).await;
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    results.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ExperimentSettings {
        ExperimentSettings {
            description: "test".to_string(),
            seed: 29,
            trials: 3,
            iterations: 4,
            agents: 6,
            degree: 2,
            alternatives: 4,
            p_preference: 0.3,
            policies: vec![UpdatePolicy::ReplaceWithAggregate],
            max_r: None,
            energy: EnergyMethod::Sum,
            concurrency: 2,
        }
    }

    #[test]
    fn test_energy_methods() {
        let network = {
            let plan = ExperimentPlan::draw(settings()).unwrap();
            plan.initial_network(0).unwrap()
        };
        let matrix = network.distance_matrix(false).unwrap();
        assert_eq!(EnergyMethod::Sum.energy(&matrix), matrix.sum() / 2.0);
        assert_eq!(EnergyMethod::Max.energy(&matrix), matrix.max());
    }

    #[test]
    fn test_plan_is_reproducible() {
        let a = ExperimentPlan::draw(settings()).unwrap();
        let b = ExperimentPlan::draw(settings()).unwrap();
        assert_eq!(a.topology, b.topology);
        assert_eq!(a.r_values, b.r_values);
        assert!(a.r_values.iter().all(|&r| (1..=2).contains(&r)));
        assert_eq!(a.policies.len(), 6);
    }

    #[test]
    fn test_plan_requires_policies() {
        let mut s = settings();
        s.policies.clear();
        assert!(ExperimentPlan::draw(s).is_err());
    }

    #[test]
    fn test_trial_records_one_loss_per_round() {
        let plan = ExperimentPlan::draw(settings()).unwrap();
        let outcome = plan.run_trial(0).unwrap();
        assert_eq!(outcome.losses.len(), 4);
        assert!(outcome.losses.iter().all(|&l| l >= 0.0));
        assert_eq!(plan.run_trial(0).unwrap(), outcome);
    }

    #[test]
    fn test_trial_records_final_preferences() {
        let plan = ExperimentPlan::draw(settings()).unwrap();
        let outcome = plan.run_trial(2).unwrap();
        assert_eq!(outcome.final_preferences.len(), 6);

        let mut network = plan.initial_network(2).unwrap();
        for _ in 0..plan.settings.iterations {
            network.round_update().unwrap();
        }
        for (node, snapshot) in network.nodes().zip(&outcome.final_preferences) {
            let relation = crate::relation::Relation::try_from(snapshot.clone()).unwrap();
            assert_eq!(network.relation(node).unwrap(), &relation);
        }
    }

    #[test]
    fn test_keep_own_trial_is_flat() {
        let mut s = settings();
        s.policies = vec![UpdatePolicy::KeepOwn];
        let plan = ExperimentPlan::draw(s).unwrap();
        let outcome = plan.run_trial(1).unwrap();
        assert!(outcome.losses.windows(2).all(|w| w[0] == w[1]));

        let initial = plan.initial_network(1).unwrap();
        for (node, snapshot) in initial.nodes().zip(&outcome.final_preferences) {
            assert_eq!(&RelationSnapshot::from(initial.relation(node).unwrap()), snapshot);
        }
    }

    #[test]
    fn test_run_experiment_orders_by_trial() {
        let plan = Arc::new(ExperimentPlan::draw(settings()).unwrap());
        let outcomes = tokio_test::block_on(run_experiment(Arc::clone(&plan), false)).unwrap();
        assert_eq!(outcomes.len(), 3);
        for (trial, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome, &plan.run_trial(trial).unwrap());
        }
    }
}
