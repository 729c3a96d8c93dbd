//! mrisummary - MRI tool result aggregator
//!
//! A CLI tool that collects the area measurements written by the MRI
//! image-analysis tool across a directory tree and assembles them into
//! time-series tables for plotting and statistics.
//!
//! Exit codes:
//!   0 - Success (including "nothing found")
//!   1 - Runtime error (unreadable input, config, or output failure)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod scanner;

use anyhow::{Context, Result};
use chrono::Local;
use cli::Args;
use config::{AggregateOptions, Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{RunGroup, RunRecord};
use report::SummaryWriter;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
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

    // Initialize logging
    init_logging(&args);

    info!("mrisummary v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_summary(args) {
        error!("Summary failed: {:#}", e);
        eprintln!("\nError: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .mrisummary.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete summary workflow.
fn run_summary(args: Args) -> Result<()> {
    let input_dir = args.input_dir();

    let mut config = load_config(&args, &input_dir)?;
    config.merge_with_args(&args);
    config.validate()?;
    let options = config.options();
    debug!("Options: {:?}", options);

    // Step 1: Discover runs
    let show_progress = !args.quiet && args.verbose == 0;
    let runs = scan_runs(&input_dir, &options, show_progress)?;

    // Step 2: Select, order and group them
    let groups = build_groups(runs, &options);
    let Some(all) = groups.first().filter(|g| !g.runs.is_empty()) else {
        println!("Found nothing :(");
        return Ok(());
    };
    info!("{} runs in {} tables", all.runs.len(), groups.len());

    if args.dry_run {
        return handle_dry_run(&groups);
    }

    // Step 3: Write one table and one threshold list per group
    let identifier =
        report::summary_identifier(&config.output.summary_prefix, &Local::now());
    let writer = SummaryWriter::create(&input_dir, identifier)?;

    for group in &groups {
        if let Some(ref prefix) = group.prefix {
            println!(
                "### Filtered {} runs for prefix '{}' ###",
                group.runs.len(),
                prefix
            );
            for run in &group.runs {
                debug!(" -> {}", run.name);
            }
        }

        let split_name = group.split_name();
        println!(
            "Writing data for {} to '{}'.",
            split_name,
            writer.path_for(group, ".csv").display()
        );
        writer.write_table(group, &options)?;

        println!(
            "Writing thresholds for {} to '{}'.",
            split_name,
            writer.path_for(group, "_settings.txt").display()
        );
        writer.write_thresholds(group, &options)?;
    }

    info!("Output written to {}", writer.out_dir().display());
    println!("Done!");
    Ok(())
}

/// Walk the input directory, showing a spinner while it runs.
fn scan_runs(
    input_dir: &Path,
    options: &AggregateOptions,
    show_progress: bool,
) -> Result<Vec<RunRecord>> {
    let run_scanner =
        scanner::RunScanner::new(input_dir.to_path_buf(), scanner::ScanConfig::from(options));

    if !show_progress {
        return run_scanner.scan();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] Scanning {pos} directories...")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = run_scanner.scan_with_progress(|_| spinner.inc(1));
    spinner.finish_and_clear();

    result
}

/// Deduplicate, order, and split the discovered runs into output groups.
///
/// The first group always holds every selected run.
fn build_groups(runs: Vec<RunRecord>, options: &AggregateOptions) -> Vec<RunGroup> {
    let mut runs = if options.all_runs {
        runs
    } else {
        println!("### Found {} runs ###", runs.len());
        for (name, run_ids) in analysis::runs_by_name(&runs) {
            debug!("{}:", name);
            for run_id in run_ids {
                debug!(" - {}", run_id);
            }
        }
        analysis::keep_newest_runs(runs)
    };

    println!("### Using {} runs ###", runs.len());
    for run in &runs {
        println!(" -> {} => {}", run.name, run.mri_run);
    }

    analysis::sort_runs(&mut runs, options.sort_mode);
    analysis::group_by_prefix(runs, options.split_by_prefix)
}

/// Handle --dry-run: list the runs of every group, write nothing.
fn handle_dry_run(groups: &[RunGroup]) -> Result<()> {
    println!("\nDry run: no files will be written.\n");

    for group in groups {
        println!("[{}] {} runs", group.split_name(), group.runs.len());
        for run in &group.runs {
            println!("    {} => {} ({} time points)", run.name, run.mri_run, run.data.len());
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args, input_dir: &Path) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Then the input directory, then the working directory
    for dir in [input_dir, Path::new(".")] {
        match Config::load_from_dir(dir) {
            Ok(Some(config)) => {
                info!("Loaded config from {}", dir.join(CONFIG_FILE).display());
                return Ok(config);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                return Ok(Config::default());
            }
        }
    }

    debug!("No config file found, using defaults");
    Ok(Config::default())
}
