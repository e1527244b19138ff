//! PrefNet - preference dynamics experiment runner
//!
//! A CLI tool that runs seeded trials of lattice-based preference
//! aggregation on random regular agent networks and writes the
//! per-round disagreement energy to disk.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid config, failed trial, unwritable output)

mod cli;
mod config;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use prefnet::experiment::report::{write_report, ExperimentReport};
use prefnet::experiment::{run_experiment, ExperimentPlan, ExperimentSettings};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration first: it may turn on verbose logging
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("PrefNet v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("Experiment failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default prefnet.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize the network, preferences and agent policies.");
    Ok(())
}

/// Initialize logging at the resolved verbosity.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete experiment workflow.
async fn run(args: Args, mut config: Config) -> Result<()> {
    let start_time = Instant::now();

    config.merge_with_args(&args);
    config.validate()?;
    debug!("Resolved config: {:?}", config);

    let settings = ExperimentSettings::from(&config);

    // Step 1: Draw the fixed parts of the experiment
    let plan = ExperimentPlan::draw(settings).context("Failed to set up experiment")?;
    print_setup(&plan);

    if args.dry_run {
        println!("\n✅ Dry run complete. No trials were run.");
        return Ok(());
    }

    // Step 2: Run the trials
    println!("\n🔁 Running {} trial(s)...", plan.settings.trials);
    let plan = Arc::new(plan);
    let outcomes = run_experiment(Arc::clone(&plan), !args.quiet).await?;

    // Step 3: Write results
    let duration = start_time.elapsed().as_secs_f64();
    let report = ExperimentReport::from_outcomes(&plan, outcomes, duration);

    let output_dir = PathBuf::from(&config.general.output);
    let written = write_report(&output_dir, &report)?;

    // Print summary
    let means = report.mean_losses();
    println!("\n📊 Experiment Summary:");
    println!("   Trials: {}", report.losses.len());
    if let (Some(first), Some(last)) = (means.first(), means.last()) {
        println!("   Mean loss: {:.3} -> {:.3}", first, last);
    }
    println!("   Duration: {:.1}s", duration);
    for path in &written {
        println!("   📄 {}", path.display());
    }
    println!("\n✅ Experiment complete!");

    Ok(())
}

/// Print the resolved setup.
fn print_setup(plan: &ExperimentPlan) {
    let s = &plan.settings;
    println!("🧪 {}", s.description);
    println!("   Seed: {}", s.seed);
    println!("   Trials: {} x {} rounds", s.trials, s.iterations);
    println!("   Agents: {} (degree {})", s.agents, s.degree);
    println!("   Alternatives: {} (p = {})", s.alternatives, s.p_preference);
    println!("   Energy: {}", s.energy);
    println!(
        "   Policies: {}",
        plan.policies
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("   r values: {:?}", plan.r_values);
    println!("   Topology edges: {}", plan.topology.edges().len());
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}. Using defaults.", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
