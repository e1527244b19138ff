//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `prefnet.toml` files.

use anyhow::{bail, Context, Result};
use prefnet::experiment::{EnergyMethod, ExperimentSettings};
use prefnet::UpdatePolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "prefnet.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Trial settings.
    #[serde(default)]
    pub experiment: ExperimentConfig,

    /// Topology settings.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Initial preference settings.
    #[serde(default)]
    pub preferences: PreferencesConfig,

    /// Agent parameter settings.
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory results are written to.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of trials run concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_output() -> String {
    "experiments".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Trial settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Stored with the results.
    #[serde(default = "default_description")]
    pub description: String,

    /// Base seed.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of trials.
    #[serde(default = "default_trials")]
    pub trials: usize,

    /// Update rounds per trial.
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Loss reduction (`sum` or `max`).
    #[serde(default)]
    pub energy: EnergyMethod,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            description: default_description(),
            seed: default_seed(),
            trials: default_trials(),
            iterations: default_iterations(),
            energy: EnergyMethod::default(),
        }
    }
}

fn default_description() -> String {
    "random initial profiles, fixed regular graph".to_string()
}

fn default_seed() -> u64 {
    29
}

fn default_trials() -> usize {
    10
}

fn default_iterations() -> usize {
    16
}

/// Topology settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of agents.
    #[serde(default = "default_agents")]
    pub agents: usize,

    /// Neighbors per agent.
    #[serde(default = "default_degree")]
    pub degree: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            degree: default_degree(),
        }
    }
}

fn default_agents() -> usize {
    20
}

fn default_degree() -> usize {
    2
}

/// Initial preference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Number of alternatives.
    #[serde(default = "default_alternatives")]
    pub alternatives: usize,

    /// Probability that a pair of alternatives is compared.
    #[serde(default = "default_p_preference")]
    pub p_preference: f64,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            alternatives: default_alternatives(),
            p_preference: default_p_preference(),
        }
    }
}

fn default_alternatives() -> usize {
    5
}

fn default_p_preference() -> f64 {
    0.2
}

/// Agent parameter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Policies agents are drawn from.
    #[serde(default = "default_policies")]
    pub policies: Vec<UpdatePolicy>,

    /// Upper bound for drawn aggregation widths (defaults to the degree).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_r: Option<usize>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            policies: default_policies(),
            max_r: None,
        }
    }
}

fn default_policies() -> Vec<UpdatePolicy> {
    vec![UpdatePolicy::ReplaceWithAggregate]
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(seed) = args.seed {
            self.experiment.seed = seed;
        }
        if let Some(trials) = args.trials {
            self.experiment.trials = trials;
        }
        if let Some(iterations) = args.iterations {
            self.experiment.iterations = iterations;
        }
        if let Some(energy) = args.energy {
            self.experiment.energy = energy;
        }

        if let Some(agents) = args.agents {
            self.network.agents = agents;
        }
        if let Some(degree) = args.degree {
            self.network.degree = degree;
        }

        if let Some(alternatives) = args.alternatives {
            self.preferences.alternatives = alternatives;
        }
        if let Some(p) = args.p_preference {
            self.preferences.p_preference = p;
        }

        if let Some(ref policies) = args.policies {
            self.agents.policies = policies.clone();
        }
        if let Some(max_r) = args.max_r {
            self.agents.max_r = Some(max_r);
        }
    }

    /// Check values that config files can set but the CLI cannot vet.
    pub fn validate(&self) -> Result<()> {
        if self.experiment.trials == 0 || self.experiment.iterations == 0 {
            bail!("Trials and iterations must be at least 1");
        }
        if self.network.degree == 0 {
            bail!("Degree must be at least 1: agents need neighbors to aggregate");
        }
        if self.network.degree >= self.network.agents {
            bail!(
                "Degree {} must be smaller than the number of agents {}",
                self.network.degree,
                self.network.agents
            );
        }
        if !(0.0..=1.0).contains(&self.preferences.p_preference) {
            bail!("Preference probability must be between 0.0 and 1.0");
        }
        if self.agents.policies.is_empty() {
            bail!("At least one update policy is required");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

impl From<&Config> for ExperimentSettings {
    fn from(config: &Config) -> Self {
        Self {
            description: config.experiment.description.clone(),
            seed: config.experiment.seed,
            trials: config.experiment.trials,
            iterations: config.experiment.iterations,
            agents: config.network.agents,
            degree: config.network.degree,
            alternatives: config.preferences.alternatives,
            p_preference: config.preferences.p_preference,
            policies: config.agents.policies.clone(),
            max_r: config.agents.max_r,
            energy: config.experiment.energy,
            concurrency: config.general.concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.experiment.seed, 29);
        assert_eq!(config.network.agents, 20);
        assert_eq!(config.agents.policies, vec![UpdatePolicy::ReplaceWithAggregate]);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "runs/exp6"
verbose = true

[experiment]
trials = 3
energy = "max"

[network]
agents = 12
degree = 3

[agents]
policies = ["join", "meet"]
max_r = 2
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "runs/exp6");
        assert!(config.general.verbose);
        assert_eq!(config.experiment.trials, 3);
        assert_eq!(config.experiment.iterations, 16);
        assert_eq!(config.experiment.energy, EnergyMethod::Max);
        assert_eq!(config.network.degree, 3);
        assert_eq!(
            config.agents.policies,
            vec![UpdatePolicy::OwnJoinAggregate, UpdatePolicy::OwnMeetAggregate]
        );
        assert_eq!(config.agents.max_r, Some(2));
        assert_eq!(config.preferences.alternatives, 5);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[experiment]"));
        assert!(toml_str.contains("[network]"));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.network.degree = 20;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.agents.policies.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = Config::default();
        config.general.concurrency = 8;
        config.preferences.p_preference = 0.5;

        let settings = ExperimentSettings::from(&config);
        assert_eq!(settings.concurrency, 8);
        assert_eq!(settings.p_preference, 0.5);
        assert_eq!(settings.trials, config.experiment.trials);
    }
}
