//! Data models for the summary tool.
//!
//! This module contains the core data structures passed between the
//! scanner, the analysis stages, and the report writer.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Reference area in pixels; measured areas are reported as a percentage of it.
pub const REFERENCE_AREA: f64 = 1024.0 * 1024.0;

/// Convert a raw pixel area into "% of area".
pub fn percent_of_area(area: f64) -> f64 {
    100.0 * area / REFERENCE_AREA
}

/// A single value from a `settings.txt` sidecar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Value written as a plain integer (e.g. a threshold).
    Integer(i64),
    /// Any other value, kept verbatim.
    Text(String),
}

impl SettingValue {
    /// Coerce raw sidecar text into a typed value.
    ///
    /// Text that begins with a digit and parses as an integer becomes
    /// `Integer`; everything else is kept as `Text`.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(|c: char| c.is_ascii_digit()) {
            if let Ok(value) = raw.parse::<i64>() {
                return SettingValue::Integer(value);
            }
        }
        SettingValue::Text(raw.to_string())
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Integer(i) => write!(f, "{}", i),
            SettingValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Options read from one `settings.txt`, keyed by option name.
pub type Settings = BTreeMap<String, SettingValue>;

/// One MRI tool run: the time series measured in a single result directory.
///
/// `data`, `data_normalized` and `settings` are shared read-only views.
/// Copies made while grouping by prefix only replace `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    /// Series name taken from the experiment folder.
    pub name: String,
    /// Run identifier taken from the run folder.
    pub mri_run: String,
    /// Area per time slice, `data[i]` belongs to slice `i + 1`.
    pub data: Rc<[f64]>,
    /// `data` scaled by its own maximum.
    pub data_normalized: Rc<[f64]>,
    /// Settings the run was produced with.
    pub settings: Rc<Settings>,
}

impl RunRecord {
    /// Creates a record, deriving the normalized series from `data`.
    pub fn new(name: String, mri_run: String, data: Vec<f64>, settings: Settings) -> Self {
        let data_normalized = normalize(&data);
        Self {
            name,
            mri_run,
            data: data.into(),
            data_normalized: data_normalized.into(),
            settings: Rc::new(settings),
        }
    }

    /// Returns a copy under a different series name, sharing all data.
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            mri_run: self.mri_run.clone(),
            data: Rc::clone(&self.data),
            data_normalized: Rc::clone(&self.data_normalized),
            settings: Rc::clone(&self.settings),
        }
    }

    /// Key used to order runs: series name first, then run.
    pub fn sort_key(&self) -> String {
        format!("{}#{}", self.name, self.mri_run)
    }

    /// Identifier of this run's column in the output table.
    pub fn series_id(&self, all_runs: bool) -> String {
        if all_runs {
            format!("{}_{}", self.name, self.mri_run)
        } else {
            self.name.clone()
        }
    }

    /// The `threshold` setting as text, empty if the run has none.
    pub fn threshold(&self) -> String {
        self.settings
            .get("threshold")
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

/// Divide every value by the series maximum; an all-zero maximum yields zeros.
pub fn normalize(data: &[f64]) -> Vec<f64> {
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    data.iter()
        .map(|d| if max != 0.0 && max.is_finite() { d / max } else { 0.0 })
        .collect()
}

/// A named subset of runs that ends up in its own table.
#[derive(Debug, Clone)]
pub struct RunGroup {
    /// Naming prefix shared by the runs, `None` for the group of all runs.
    pub prefix: Option<String>,
    /// Runs in output order.
    pub runs: Vec<RunRecord>,
}

impl RunGroup {
    /// File name fragment for this group: `all` or `prefix-<prefix>`.
    pub fn split_name(&self) -> String {
        match &self.prefix {
            None => "all".to_string(),
            Some(prefix) => {
                let safe: String = prefix
                    .chars()
                    .map(|c| {
                        if c.is_alphanumeric() || "._- ".contains(c) {
                            c
                        } else {
                            '.'
                        }
                    })
                    .collect();
                format!("prefix-{}", safe)
            }
        }
    }
}
