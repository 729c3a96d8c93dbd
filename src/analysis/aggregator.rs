//! Run selection, ordering, and grouping.
//!
//! This module turns the flat list of discovered runs into the ordered
//! groups that each become one output table.

use crate::analysis::SortMode;
use crate::models::{RunGroup, RunRecord};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::debug;

/// `<prefix>_<base>_<digits>` where prefix and base each contain a letter.
fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?:([^_\n]*[a-zA-Z][^_\n]*)_)?((?:[^_\n]*[a-zA-Z][^_\n]*(?:_[^_\n]+)?)_\d+)$",
        )
        .expect("prefix pattern is valid")
    })
}

/// Runs grouped by series name, in order of first appearance.
pub fn runs_by_name(runs: &[RunRecord]) -> Vec<(String, Vec<String>)> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();

    for run in runs {
        if !grouped.contains_key(&run.name) {
            order.push(run.name.clone());
        }
        grouped
            .entry(run.name.clone())
            .or_default()
            .push(run.mri_run.clone());
    }

    order
        .into_iter()
        .map(|name| {
            let runs = grouped.remove(&name).unwrap_or_default();
            (name, runs)
        })
        .collect()
}

/// Keep only the newest run of every series.
///
/// "Newest" is the greatest run identifier under plain string ordering,
/// so `run2` wins over `run10`. Records sharing that identifier are all kept.
pub fn keep_newest_runs(runs: Vec<RunRecord>) -> Vec<RunRecord> {
    let mut newest: HashMap<String, String> = HashMap::new();

    for run in &runs {
        newest
            .entry(run.name.clone())
            .and_modify(|best| {
                if run.mri_run > *best {
                    *best = run.mri_run.clone();
                }
            })
            .or_insert_with(|| run.mri_run.clone());
    }

    runs.into_iter()
        .filter(|run| newest.get(&run.name) == Some(&run.mri_run))
        .collect()
}

/// Order runs by series name, then run identifier.
pub fn sort_runs(runs: &mut [RunRecord], mode: SortMode) {
    mode.sort_by_key(runs, RunRecord::sort_key);
}

/// Split a series name into `(prefix, base)`.
///
/// Returns `None` when the name does not follow the naming convention or
/// carries no prefix.
pub fn split_prefix(name: &str) -> Option<(String, String)> {
    let caps = prefix_pattern().captures(name)?;
    let prefix = caps.get(1)?.as_str();
    if prefix.is_empty() {
        return None;
    }
    let base = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    Some((prefix.to_string(), base.to_string()))
}

/// Build the output groups.
///
/// The first group always holds every run. With `split_by_prefix`, every
/// run whose name carries a prefix is also copied, under its base name,
/// into one group per prefix. Prefix groups follow in order of first
/// appearance and keep the order of `runs`.
pub fn group_by_prefix(runs: Vec<RunRecord>, split_by_prefix: bool) -> Vec<RunGroup> {
    let mut prefixed: Vec<RunGroup> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    if split_by_prefix {
        for run in &runs {
            if let Some((prefix, base)) = split_prefix(&run.name) {
                let slot = *slots.entry(prefix.clone()).or_insert_with(|| {
                    prefixed.push(RunGroup {
                        prefix: Some(prefix),
                        runs: Vec::new(),
                    });
                    prefixed.len() - 1
                });
                prefixed[slot].runs.push(run.renamed(&base));
            }
        }
    }

    debug!("Split {} runs into {} prefix groups", runs.len(), prefixed.len());

    let mut groups = vec![RunGroup { prefix: None, runs }];
    groups.extend(prefixed);
    groups
}
