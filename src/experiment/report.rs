//! Experiment result files.
//!
//! Losses go to a CSV table (one row per trial, one column per round) and
//! run metadata to a pretty-printed JSON document.

use super::{EnergyMethod, ExperimentPlan, TrialOutcome};
use crate::agent::UpdatePolicy;
use crate::relation::RelationSnapshot;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the loss table inside the output directory.
pub const LOSSES_FILE: &str = "losses.csv";

/// File name of the metadata document inside the output directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentMetadata {
    /// When the run finished.
    pub date: DateTime<Utc>,
    /// Free-form description.
    pub description: String,
    /// Base seed.
    pub seed: u64,
    /// Number of trials.
    pub trials: usize,
    /// Rounds per trial.
    pub iterations: usize,
    /// Number of agents.
    pub agents: usize,
    /// Topology degree.
    pub degree: usize,
    /// Alternatives per relation.
    pub alternatives: usize,
    /// Pair comparison probability of initial preferences.
    pub p_preference: f64,
    /// Loss reduction.
    pub energy: EnergyMethod,
    /// Aggregation width per node.
    pub r_values: Vec<usize>,
    /// Update policy per node.
    pub policies: Vec<UpdatePolicy>,
    /// Undirected topology edges.
    pub topology: Vec<(usize, usize)>,
    /// `final_preferences[trial][node]`: closed relations after the last round.
    pub final_preferences: Vec<Vec<RelationSnapshot>>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
}

impl ExperimentMetadata {
    /// Collect metadata from a finished plan.
    pub fn from_plan(
        plan: &ExperimentPlan,
        final_preferences: Vec<Vec<RelationSnapshot>>,
        duration_seconds: f64,
    ) -> Self {
        let s = &plan.settings;
        Self {
            date: Utc::now(),
            description: s.description.clone(),
            seed: s.seed,
            trials: s.trials,
            iterations: s.iterations,
            agents: s.agents,
            degree: s.degree,
            alternatives: s.alternatives,
            p_preference: s.p_preference,
            energy: s.energy,
            r_values: plan.r_values.clone(),
            policies: plan.policies.clone(),
            topology: plan.topology.edges(),
            final_preferences,
            duration_seconds,
        }
    }
}

/// Losses of every trial with the run's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    /// Run metadata.
    pub metadata: ExperimentMetadata,
    /// `losses[trial][round]`.
    pub losses: Vec<Vec<f64>>,
}

impl ExperimentReport {
    /// Split trial outcomes into the loss table and the metadata.
    pub fn from_outcomes(
        plan: &ExperimentPlan,
        outcomes: Vec<TrialOutcome>,
        duration_seconds: f64,
    ) -> Self {
        let (losses, final_preferences): (Vec<Vec<f64>>, Vec<Vec<RelationSnapshot>>) = outcomes
            .into_iter()
            .map(|outcome| (outcome.losses, outcome.final_preferences))
            .unzip();
        Self {
            metadata: ExperimentMetadata::from_plan(plan, final_preferences, duration_seconds),
            losses,
        }
    }

    /// Mean loss per round across trials.
    pub fn mean_losses(&self) -> Vec<f64> {
        let rounds = self.losses.iter().map(Vec::len).max().unwrap_or(0);
        (0..rounds)
            .map(|round| {
                let values: Vec<f64> = self
                    .losses
                    .iter()
                    .filter_map(|row| row.get(round).copied())
                    .collect();
                values.iter().sum::<f64>() / values.len() as f64
            })
            .collect()
    }
}

/// Render the loss table: a header of round indices, then one row per trial.
pub fn generate_losses_csv(losses: &[Vec<f64>]) -> String {
    let rounds = losses.iter().map(Vec::len).max().unwrap_or(0);
    let mut output = (0..rounds)
        .map(|round| round.to_string())
        .collect::<Vec<_>>()
        .join(",");
    output.push('\n');

    for row in losses {
        let line = row
            .iter()
            .map(|loss| loss.to_string())
            .collect::<Vec<_>>()
            .join(",");
        output.push_str(&line);
        output.push('\n');
    }
    output
}

/// Render the metadata document.
pub fn generate_json_metadata(metadata: &ExperimentMetadata) -> Result<String> {
    serde_json::to_string_pretty(metadata).context("Failed to serialize experiment metadata")
}

/// Write both result files into `dir`, creating it if needed.
pub fn write_report(dir: &Path, report: &ExperimentReport) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let losses_path = dir.join(LOSSES_FILE);
    std::fs::write(&losses_path, generate_losses_csv(&report.losses))
        .with_context(|| format!("Failed to write {}", losses_path.display()))?;

    let metadata_path = dir.join(METADATA_FILE);
    std::fs::write(&metadata_path, generate_json_metadata(&report.metadata)?)
        .with_context(|| format!("Failed to write {}", metadata_path.display()))?;

    info!("Results written to {}", dir.display());
    Ok(vec![losses_path, metadata_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> ExperimentMetadata {
        ExperimentMetadata {
            date: Utc::now(),
            description: "ring".to_string(),
            seed: 1,
            trials: 2,
            iterations: 3,
            agents: 4,
            degree: 2,
            alternatives: 3,
            p_preference: 0.5,
            energy: EnergyMethod::Max,
            r_values: vec![1, 2, 1, 2],
            policies: vec![UpdatePolicy::OwnJoinAggregate; 4],
            topology: vec![(0, 1), (0, 3), (1, 2), (2, 3)],
            final_preferences: vec![vec![
                RelationSnapshot {
                    alternatives: 3,
                    edges: vec![(0, 1), (0, 2), (1, 2)],
                };
                4
            ]],
            duration_seconds: 0.25,
        }
    }

    #[test]
    fn test_losses_csv_layout() {
        let csv = generate_losses_csv(&[vec![3.0, 2.0, 1.5], vec![4.0, 4.0, 0.0]]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["0,1,2", "3,2,1.5", "4,4,0"]);
    }

    #[test]
    fn test_mean_losses() {
        let report = ExperimentReport {
            metadata: metadata(),
            losses: vec![vec![2.0, 1.0], vec![4.0, 3.0]],
        };
        assert_eq!(report.mean_losses(), vec![3.0, 2.0]);
    }

    #[test]
    fn test_metadata_json_fields() {
        let json = generate_json_metadata(&metadata()).unwrap();
        assert!(json.contains("\"energy\": \"max\""));
        assert!(json.contains("\"join\""));
        assert!(json.contains("\"final_preferences\""));
        let parsed: ExperimentMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.topology.len(), 4);
        assert_eq!(parsed.final_preferences, metadata().final_preferences);
    }

    #[test]
    fn test_report_from_outcomes() {
        let plan = ExperimentPlan::draw(crate::experiment::ExperimentSettings {
            description: "report".to_string(),
            seed: 3,
            trials: 2,
            iterations: 2,
            agents: 4,
            degree: 2,
            alternatives: 3,
            p_preference: 0.5,
            policies: vec![UpdatePolicy::OwnJoinAggregate],
            max_r: None,
            energy: EnergyMethod::Sum,
            concurrency: 1,
        })
        .unwrap();
        let outcomes: Vec<TrialOutcome> = (0..2).map(|t| plan.run_trial(t).unwrap()).collect();

        let report = ExperimentReport::from_outcomes(&plan, outcomes.clone(), 1.5);
        assert_eq!(report.losses.len(), 2);
        assert_eq!(report.losses[1], outcomes[1].losses);
        assert_eq!(report.metadata.final_preferences[0], outcomes[0].final_preferences);
        assert_eq!(report.metadata.final_preferences[0].len(), 4);
        assert_eq!(report.metadata.duration_seconds, 1.5);
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("run");
        let report = ExperimentReport {
            metadata: metadata(),
            losses: vec![vec![1.0, 0.0, 0.0]],
        };

        let written = write_report(&out, &report).unwrap();
        assert_eq!(written.len(), 2);
        let csv = std::fs::read_to_string(out.join(LOSSES_FILE)).unwrap();
        assert!(csv.starts_with("0,1,2\n"));
        assert!(out.join(METADATA_FILE).exists());
    }
}
