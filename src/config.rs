//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.mrisummary.toml` files, and produces the [`AggregateOptions`] that are
//! passed explicitly through every aggregation step.

use crate::analysis::SortMode;
use crate::scanner::DEFAULT_DEPTH;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up in the input and working directories.
pub const CONFIG_FILE: &str = ".mrisummary.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanning settings.
    #[serde(default)]
    pub scan: ScanSettings,

    /// Table assembly settings.
    #[serde(default)]
    pub table: TableSettings,

    /// Output settings.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Directory scanning settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Levels of subdirectories to descend into.
    #[serde(default = "default_depth")]
    pub depth: usize,

    /// Only use result directories whose path contains this text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_filter: Option<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            depth: default_depth(),
            match_filter: None,
        }
    }
}

fn default_depth() -> usize {
    DEFAULT_DEPTH
}

/// Table assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSettings {
    /// Imaging interval in (fractional) hours.
    #[serde(default = "default_timestep")]
    pub timestep: f64,

    /// Ordering of series keys and runs.
    #[serde(default)]
    pub sort: SortMode,

    /// Write one extra table per name prefix.
    #[serde(default = "default_true")]
    pub split_by_prefix: bool,

    /// Keep every run instead of only the newest per series.
    #[serde(default)]
    pub all_runs: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            sort: SortMode::default(),
            split_by_prefix: true,
            all_runs: false,
        }
    }
}

fn default_timestep() -> f64 {
    0.25
}

fn default_true() -> bool {
    true
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    /// Leading part of the output directory and file names.
    #[serde(default = "default_summary_prefix")]
    pub summary_prefix: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            summary_prefix: default_summary_prefix(),
        }
    }
}

fn default_summary_prefix() -> String {
    "mritool-summary".to_string()
}

/// Everything the aggregation steps need to know, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    pub depth: usize,
    pub match_filter: Option<String>,
    pub timestep: f64,
    pub sort_mode: SortMode,
    pub split_by_prefix: bool,
    pub all_runs: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Config::default().options()
    }
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

    /// Try to load configuration from `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Flags can only switch a setting away from its default.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(depth) = args.depth {
            self.scan.depth = depth;
        }
        if let Some(ref filter) = args.match_filter {
            self.scan.match_filter = Some(filter.clone());
        }
        if let Some(timestep) = args.timestep {
            self.table.timestep = timestep;
        }

        if args.sort_simple {
            self.table.sort = SortMode::Simple;
        }
        if args.disable_split_by_prefix {
            self.table.split_by_prefix = false;
        }
        if args.all {
            self.table.all_runs = true;
        }
    }

    /// Resolve the options used by the aggregation steps.
    pub fn options(&self) -> AggregateOptions {
        AggregateOptions {
            depth: self.scan.depth,
            match_filter: self.scan.match_filter.clone(),
            timestep: self.table.timestep,
            sort_mode: self.table.sort,
            split_by_prefix: self.table.split_by_prefix,
            all_runs: self.table.all_runs,
        }
    }

    /// Check the merged settings.
    pub fn validate(&self) -> Result<()> {
        let timestep = self.table.timestep;
        if !timestep.is_finite() || timestep <= 0.0 {
            bail!("Timestep must be a positive number of hours, got {}", timestep);
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;

    #[test]
    fn test_default_config() {
        let options = Config::default().options();
        assert_eq!(options.depth, 42);
        assert_eq!(options.timestep, 0.25);
        assert_eq!(options.sort_mode, SortMode::Natural);
        assert!(options.split_by_prefix);
        assert!(!options.all_runs);
        assert_eq!(options.match_filter, None);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[scan]
depth = 5
match_filter = "2023"

[table]
timestep = 0.5
sort = "simple"
split_by_prefix = false

[output]
summary_prefix = "area-summary"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.scan.depth, 5);
        assert_eq!(config.scan.match_filter.as_deref(), Some("2023"));
        assert_eq!(config.table.timestep, 0.5);
        assert_eq!(config.table.sort, SortMode::Simple);
        assert!(!config.table.split_by_prefix);
        assert!(!config.table.all_runs);
        assert_eq!(config.output.summary_prefix, "area-summary");
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        config.table.timestep = 1.0;

        let mut args = make_args();
        args.depth = Some(3);
        args.all = true;
        args.sort_simple = true;
        config.merge_with_args(&args);

        let options = config.options();
        assert_eq!(options.depth, 3);
        assert_eq!(options.timestep, 1.0);
        assert!(options.all_runs);
        assert_eq!(options.sort_mode, SortMode::Simple);
        assert!(options.split_by_prefix);
    }

    #[test]
    fn test_validate_timestep_from_file() {
        let mut config: Config = toml::from_str("[table]\ntimestep = 0.0\n").unwrap();
        assert!(config.validate().is_err());

        config.table.timestep = -0.5;
        assert!(config.validate().is_err());

        // A valid flag overrides a bad file value.
        let mut args = make_args();
        args.timestep = Some(0.5);
        config.merge_with_args(&args);
        assert!(config.validate().is_ok());

        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[scan]"));
        assert!(toml_str.contains("[table]"));
        assert!(toml_str.contains("[output]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.options(), AggregateOptions::default());
    }
}
