//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Every experiment flag is optional so that
//! unset flags fall through to the config file.

use clap::Parser;
use prefnet::experiment::EnergyMethod;
use prefnet::UpdatePolicy;
use std::path::PathBuf;

/// PrefNet - preference dynamics on agent networks
///
/// Runs seeded trials in which agents on a random regular network revise
/// their preference relations by lattice aggregation, and records the
/// network's disagreement energy before every round.
///
/// Examples:
///   prefnet
///   prefnet --trials 20 --iterations 32 --policy posterior --policy join
///   prefnet --config experiment6.toml --output experiments/6
///   prefnet --dry-run
///   prefnet --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for prefnet.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for losses.csv and metadata.json
    #[arg(short, long, value_name = "DIR", env = "PREFNET_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Base seed for topology, agent parameters and preferences
    #[arg(short, long, env = "PREFNET_SEED")]
    pub seed: Option<u64>,

    /// Number of independent trials
    #[arg(short, long, value_name = "COUNT")]
    pub trials: Option<usize>,

    /// Update rounds per trial
    #[arg(short, long, value_name = "COUNT")]
    pub iterations: Option<usize>,

    /// Number of agents in the network
    #[arg(long, value_name = "COUNT")]
    pub agents: Option<usize>,

    /// Neighbors per agent (degree of the regular topology)
    #[arg(long, value_name = "COUNT")]
    pub degree: Option<usize>,

    /// Number of alternatives each agent ranks
    #[arg(long, value_name = "COUNT")]
    pub alternatives: Option<usize>,

    /// Probability that a pair of alternatives is compared initially (0.0 - 1.0)
    #[arg(long, value_name = "P")]
    pub p_preference: Option<f64>,

    /// Update policy agents may be assigned (repeatable)
    ///
    /// Values: prior, posterior, join, meet
    #[arg(long = "policy", value_name = "POLICY")]
    pub policies: Option<Vec<UpdatePolicy>>,

    /// Upper bound for randomly drawn aggregation widths
    #[arg(long, value_name = "R")]
    pub max_r: Option<usize>,

    /// How the distance matrix is reduced to a loss
    #[arg(long, value_name = "METHOD")]
    pub energy: Option<EnergyMethod>,

    /// Number of trials run concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: print the resolved setup and drawn topology without running trials
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default prefnet.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(p) = self.p_preference {
            if !(0.0..=1.0).contains(&p) {
                return Err("Preference probability must be between 0.0 and 1.0".to_string());
            }
        }

        let positive = [
            ("Trials", self.trials),
            ("Iterations", self.iterations),
            ("Agents", self.agents),
            ("Alternatives", self.alternatives),
            ("Concurrency", self.concurrency),
            ("Max r", self.max_r),
        ];
        for (name, value) in positive {
            if value == Some(0) {
                return Err(format!("{} must be at least 1", name));
            }
        }

        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Config file does not exist: {}",
                    config_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose_by_default` comes from the config file; `--quiet` still wins.
    pub fn log_level(&self, verbose_by_default: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || verbose_by_default {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
