//! Pivot table assembly.
//!
//! A table is built column by column: a label column, a time column, and
//! one column per run. Runs of different lengths share one time axis; the
//! CSV rows are the transposed columns, padded with empty cells.
//!
//! ```text
//! name       |          | WT_a_1   | WT_b_2
//! mri_run    |          | 001      | 003
//! threshold  |          | 40       | 42
//! id         | Time [h] | WT_a_1   | WT_b_2
//! % of area  | 0.0      | 1.5      | 0.7
//!            | 0.25     | 1.7      | 0.9
//!            | 0.5      | 2.0      |
//! ```

use crate::config::AggregateOptions;
use crate::models::{RunGroup, SettingValue};
use std::collections::BTreeSet;
use std::fmt;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    Number(f64),
}

impl Cell {
    fn text(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<&SettingValue> for Cell {
    fn from(value: &SettingValue) -> Self {
        match value {
            SettingValue::Integer(i) => Cell::Integer(*i),
            SettingValue::Text(s) => Cell::Text(s.clone()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Number(v) => write_number(f, *v),
        }
    }
}

/// Shortest round-trip form. Whole numbers keep one decimal, values below
/// 1e-4 or from 1e16 on switch to `<mantissa>e<sign><two or more digits>`.
fn write_number(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }

    let magnitude = v.abs();
    if v == 0.0 || (1e-4..1e16).contains(&magnitude) {
        return if v.fract() == 0.0 {
            write!(f, "{:.1}", v)
        } else {
            write!(f, "{}", v)
        };
    }

    let scientific = format!("{:e}", v);
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            write!(f, "{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => f.write_str(&scientific),
    }
}

/// Column-oriented table for one run group.
#[derive(Debug, Clone)]
pub struct PivotTable {
    /// Union of the settings keys of all runs, in column order.
    pub settings_keys: Vec<String>,
    /// Shared time axis in hours.
    pub time_axis: Vec<f64>,
    columns: Vec<Vec<Cell>>,
}

impl PivotTable {
    /// Assemble the table for `group`.
    pub fn build(group: &RunGroup, options: &AggregateOptions) -> Self {
        let settings_keys: Vec<String> = group
            .runs
            .iter()
            .flat_map(|run| run.settings.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let max_len = group.runs.iter().map(|r| r.data.len()).max().unwrap_or(0);
        let time_axis: Vec<f64> = (0..max_len).map(|i| i as f64 * options.timestep).collect();

        let mut columns = Vec::with_capacity(group.runs.len() + 2);

        let mut labels = vec![Cell::text("name"), Cell::text("mri_run")];
        labels.extend(settings_keys.iter().map(|k| Cell::text(k)));
        labels.push(Cell::text("id"));
        labels.push(Cell::text("% of area"));
        labels.extend(std::iter::repeat(Cell::Empty).take(max_len.saturating_sub(1)));
        columns.push(labels);

        let mut times = vec![Cell::Empty; 2 + settings_keys.len()];
        times.push(Cell::text("Time [h]"));
        times.extend(time_axis.iter().map(|&t| Cell::Number(t)));
        columns.push(times);

        for run in &group.runs {
            let mut column = vec![Cell::text(&run.name), Cell::text(&run.mri_run)];
            column.extend(
                settings_keys
                    .iter()
                    .map(|k| run.settings.get(k).map(Cell::from).unwrap_or(Cell::Empty)),
            );
            column.push(Cell::Text(run.series_id(options.all_runs)));
            column.extend(run.data.iter().map(|&v| Cell::Number(v)));
            column.extend(std::iter::repeat(Cell::Empty).take(max_len - run.data.len()));
            columns.push(column);
        }

        Self {
            settings_keys,
            time_axis,
            columns,
        }
    }

    /// The label column, the time column, then one column per run.
    pub fn columns(&self) -> &[Vec<Cell>] {
        &self.columns
    }

    /// Transpose the columns into rows, padding short columns with empty cells.
    pub fn rows(&self) -> Vec<Vec<Cell>> {
        let height = self.columns().iter().map(Vec::len).max().unwrap_or(0);

        (0..height)
            .map(|i| {
                self.columns
                    .iter()
                    .map(|c| c.get(i).cloned().unwrap_or(Cell::Empty))
                    .collect()
            })
            .collect()
    }
}
