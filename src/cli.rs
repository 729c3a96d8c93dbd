//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// mrisummary - collect MRI tool results into time-series tables
///
/// Scans a directory tree for MRI tool results (`results.csv` or
/// `*.mri.txt`), keeps the newest run of every series, and writes one CSV
/// table plus one threshold summary per naming prefix.
///
/// Examples:
///   mrisummary ./experiments
///   mrisummary ./experiments --all --timestep 0.5
///   mrisummary ./experiments --match 2023-05 --depth 4 -v
///   mrisummary ./experiments --dry-run
///   mrisummary --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory to scan for MRI tool results
    #[arg(value_name = "DIRECTORY", required_unless_present = "init_config")]
    pub directory: Option<PathBuf>,

    /// Show all MRI tool runs (default: only the newest run per series)
    #[arg(short, long)]
    pub all: bool,

    /// Only use MRI tool runs whose directory contains this string
    #[arg(short, long = "match", value_name = "TEXT")]
    pub match_filter: Option<String>,

    /// Recursively search the directory up to this depth [default: 42]
    #[arg(short, long, value_name = "LEVELS")]
    pub depth: Option<usize>,

    /// Imaging interval in (fractional) hours [default: 0.25]
    #[arg(short, long, value_name = "HOURS")]
    pub timestep: Option<f64>,

    /// Do NOT sort result files naturally
    ///
    /// Natural sorting compares the numerical parts of names as numbers,
    /// which fixes e.g. "a10x" vs "a101x".
    #[arg(short, long)]
    pub sort_simple: bool,

    /// Save all results to a single table instead of one per prefix
    ///
    /// By default "WT_siNOD1_4_1009" also goes into a separate table "WT"
    /// as series "siNOD1_4_1009".
    #[arg(short = 'p', long)]
    pub disable_split_by_prefix: bool,

    /// Print additional information
    ///
    /// Use twice to print all result file names during processing.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Run in quiet mode (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .mrisummary.toml in the input directory,
    /// then in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Dry run: scan and list the selected runs without writing any files
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .mrisummary.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The input directory, empty if not set (should be validated first).
    pub fn input_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_default()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref dir) = self.directory else {
            return Err("An input directory is required".to_string());
        };

        if !dir.exists() {
            return Err(format!("Directory does not exist: {}", dir.display()));
        }
        if !dir.is_dir() {
            return Err(format!("Path is not a directory: {}", dir.display()));
        }

        if let Some(timestep) = self.timestep {
            if !timestep.is_finite() || timestep <= 0.0 {
                return Err("Timestep must be a positive number of hours".to_string());
            }
        }

        if self.verbose > 0 && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else {
            match self.verbose {
                0 => tracing::Level::INFO,
                1 => tracing::Level::DEBUG,
                _ => tracing::Level::TRACE,
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            directory: Some(std::env::temp_dir()),
            all: false,
            match_filter: None,
            depth: None,
            timestep: None,
            sort_simple: false,
            disable_split_by_prefix: false,
            verbose: 0,
            quiet: false,
            config: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "mrisummary",
            "data",
            "-a",
            "-m",
            "2023",
            "-d",
            "3",
            "-t",
            "0.5",
            "-s",
            "-p",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.directory, Some(PathBuf::from("data")));
        assert!(args.all);
        assert_eq!(args.match_filter.as_deref(), Some("2023"));
        assert_eq!(args.depth, Some(3));
        assert_eq!(args.timestep, Some(0.5));
        assert!(args.sort_simple);
        assert!(args.disable_split_by_prefix);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_directory_required() {
        assert!(Args::try_parse_from(["mrisummary"]).is_err());
        assert!(Args::try_parse_from(["mrisummary", "--init-config"]).is_ok());
    }

    #[test]
    fn test_validation_missing_directory() {
        let mut args = make_args();
        args.directory = Some(PathBuf::from("/definitely/not/here"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_timestep() {
        let mut args = make_args();
        args.timestep = Some(0.0);
        assert!(args.validate().is_err());

        args.timestep = Some(0.25);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = 1;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = 1;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = 2;
        assert_eq!(args.log_level(), tracing::Level::TRACE);

        args.verbose = 0;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
