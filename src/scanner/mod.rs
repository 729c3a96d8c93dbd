//! Directory scanner for discovering MRI tool runs.
//!
//! Every directory below the root that holds result files becomes one
//! [`RunRecord`]. The directory layout encodes the metadata:
//!
//! ```text
//! <series>/<date>_<run>/<result dir>/results.csv
//! <series>/<date>_<run>/settings.txt
//! ```

pub mod parser;
pub mod settings;

pub use parser::{ParseError, ResultFormat, Series};
pub use settings::{load_settings, SETTINGS_FILE};

use crate::analysis::SortMode;
use crate::models::RunRecord;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Folder name prefix of microscope sub-scans, skipped when naming a series.
const SUB_SCAN_PREFIX: &str = "Mark_and_Find ";

/// Default recursion depth below the root.
pub const DEFAULT_DEPTH: usize = 42;

/// Configuration for run discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Levels of subdirectories to descend into.
    pub max_depth: usize,
    /// Only directories whose path contains this text produce runs.
    pub match_filter: Option<String>,
    /// Ordering of series keys within a run.
    pub sort_mode: SortMode,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_DEPTH,
            match_filter: None,
            sort_mode: SortMode::Natural,
        }
    }
}

impl From<&crate::config::AggregateOptions> for ScanConfig {
    fn from(options: &crate::config::AggregateOptions) -> Self {
        Self {
            max_depth: options.depth,
            match_filter: options.match_filter.clone(),
            sort_mode: options.sort_mode,
        }
    }
}

/// Scanner that walks a directory tree and collects runs.
pub struct RunScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl RunScanner {
    /// Create a new scanner rooted at `root`.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all runs.
    pub fn scan(&self) -> Result<Vec<RunRecord>> {
        self.scan_with_progress(|_| {})
    }

    /// Scan for all runs, reporting each visited directory to `on_dir`.
    ///
    /// Fails only if the root itself cannot be read. Unreadable
    /// subdirectories and malformed result files are logged and skipped.
    pub fn scan_with_progress<F>(&self, mut on_dir: F) -> Result<Vec<RunRecord>>
    where
        F: FnMut(&Path),
    {
        fs::read_dir(&self.root)
            .with_context(|| format!("Cannot read directory {}", self.root.display()))?;

        // Result files of a directory sit one level below it.
        let walker = WalkDir::new(&self.root)
            .max_depth(self.config.max_depth.saturating_add(1))
            .sort_by_file_name();

        let mut candidates: BTreeMap<PathBuf, Vec<(PathBuf, ResultFormat)>> = BTreeMap::new();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Cannot read entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                on_dir(entry.path());
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let Some(format) = ResultFormat::detect(&name) else {
                continue;
            };
            let Some(dir) = entry.path().parent() else {
                continue;
            };
            if !self.is_eligible(dir) {
                continue;
            }

            candidates
                .entry(dir.to_path_buf())
                .or_default()
                .push((entry.path().to_path_buf(), format));
        }

        let runs = candidates
            .into_iter()
            .filter_map(|(dir, files)| self.build_run(&dir, &files))
            .collect();

        Ok(runs)
    }

    /// Check the directory filter.
    fn is_eligible(&self, dir: &Path) -> bool {
        match &self.config.match_filter {
            Some(filter) => dir.to_string_lossy().contains(filter.as_str()),
            None => true,
        }
    }

    /// Parse the result files of one directory into a run.
    fn build_run(&self, dir: &Path, files: &[(PathBuf, ResultFormat)]) -> Option<RunRecord> {
        let mut series = Series::new();

        for (path, format) in files {
            match parser::parse_file(path, *format) {
                Ok(parsed) => series.extend(parsed),
                Err(e) => {
                    let name = path.file_name().unwrap_or_default().to_string_lossy();
                    warn!("Error reading file \"{}\": {}", name, e);
                }
            }
        }

        if series.is_empty() {
            return None;
        }

        let (name, mri_run) = run_identity(dir);
        let settings = load_settings(&settings_path(dir));

        let mut keys: Vec<String> = series.keys().cloned().collect();
        self.config.sort_mode.sort_by_key(&mut keys, String::clone);
        for key in &keys {
            trace!("    ~ {}", key);
        }

        let data = keys.iter().map(|k| series[k]).collect();
        debug!("Found run {} => {} in {}", name, mri_run, dir.display());

        Some(RunRecord::new(name, mri_run, data, settings))
    }
}

/// Settings of a run live next to its result directory.
fn settings_path(dir: &Path) -> PathBuf {
    dir.join("..").join(SETTINGS_FILE)
}

fn path_parts(dir: &Path) -> Vec<String> {
    dir.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            Component::CurDir => Some(".".to_string()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir | Component::Prefix(_) => None,
        })
        .collect()
}

/// Derive `(series name, run)` from a result directory path.
///
/// The series is named by the directory two levels up, or three if that one
/// is a sub-scan folder. The run is the part of the parent directory's name
/// after its first `_`. Paths too shallow for either yield empty strings.
pub fn run_identity(dir: &Path) -> (String, String) {
    let parts = path_parts(dir);
    let from_end = |n: usize| parts.len().checked_sub(n).map(|i| parts[i].as_str());

    let name = match from_end(3) {
        Some(series) if series.starts_with(SUB_SCAN_PREFIX) => from_end(4).unwrap_or_default(),
        Some(series) => series,
        None => "",
    };

    let run = from_end(2)
        .and_then(|run_dir| run_dir.split_once('_'))
        .map(|(_, run)| run)
        .unwrap_or_default();

    (name.to_string(), run.to_string())
}
