//! Summary file generation.
//!
//! This module writes the per-group CSV tables and threshold summaries
//! into a freshly created, timestamped output directory.

use crate::config::AggregateOptions;
use crate::models::RunGroup;
use crate::report::pivot::PivotTable;
use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

const SERIES_HEAD: &str = "Series";
const THRESHOLD_HEAD: &str = "Threshold";

/// Name shared by the output directory and all files in it,
/// e.g. `mritool-summary_2024-03-01_14-05-09`.
pub fn summary_identifier<Tz>(prefix: &str, time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}_{}", prefix, time.format("%Y-%m-%d_%H-%M-%S"))
}

/// Write `table` as CSV rows.
pub fn write_table_csv<W: Write>(table: &PivotTable, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    for row in table.rows() {
        csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Render the fixed-width list of series ids and their thresholds.
pub fn generate_threshold_summary(group: &RunGroup, all_runs: bool) -> String {
    let pairs: Vec<(String, String)> = group
        .runs
        .iter()
        .map(|run| (run.series_id(all_runs), run.threshold()))
        .collect();

    let id_width = pairs.iter().map(|(id, _)| id.chars().count()).max().unwrap_or(0);
    let threshold_width = pairs.iter().map(|(_, t)| t.chars().count()).max().unwrap_or(0);
    let head_width = SERIES_HEAD
        .len()
        .max((id_width + threshold_width).saturating_sub(THRESHOLD_HEAD.len()));

    let mut output = format!("{:<head_width$} {}\n", SERIES_HEAD, THRESHOLD_HEAD);
    for (id, threshold) in &pairs {
        output.push_str(&format!(
            "{:<id_width$} {:>threshold_width$}\n",
            id, threshold
        ));
    }

    output
}

/// Writes all groups of one invocation into a single output directory.
pub struct SummaryWriter {
    out_dir: PathBuf,
    identifier: String,
}

impl SummaryWriter {
    /// Create `<input_dir>/<identifier>`.
    pub fn create(input_dir: &Path, identifier: String) -> Result<Self> {
        let out_dir = input_dir.join(&identifier);
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        debug!("Output directory: {}", out_dir.display());

        Ok(Self {
            out_dir,
            identifier,
        })
    }

    /// The output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Path of a file in the output directory for `group`.
    pub fn path_for(&self, group: &RunGroup, suffix: &str) -> PathBuf {
        self.out_dir.join(format!(
            "{}_{}{}",
            self.identifier,
            group.split_name(),
            suffix
        ))
    }

    /// Write the CSV table of `group`.
    pub fn write_table(&self, group: &RunGroup, options: &AggregateOptions) -> Result<PathBuf> {
        let path = self.path_for(group, ".csv");
        let table = PivotTable::build(group, options);
        debug!(
            "Table {}: {} runs, {} settings, {} time points",
            group.split_name(),
            group.runs.len(),
            table.settings_keys.len(),
            table.time_axis.len()
        );

        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        write_table_csv(&table, file)
            .with_context(|| format!("Failed to write table to {}", path.display()))?;

        Ok(path)
    }

    /// Write the threshold summary of `group`.
    pub fn write_thresholds(&self, group: &RunGroup, options: &AggregateOptions) -> Result<PathBuf> {
        let path = self.path_for(group, "_settings.txt");
        let content = generate_threshold_summary(group, options.all_runs);

        fs::write(&path, content)
            .with_context(|| format!("Failed to write thresholds to {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunRecord, SettingValue, Settings};
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_run(name: &str, run: &str, data: Vec<f64>, threshold: Option<i64>) -> RunRecord {
        let mut settings = Settings::new();
        if let Some(t) = threshold {
            settings.insert("threshold".to_string(), SettingValue::Integer(t));
        }
        RunRecord::new(name.to_string(), run.to_string(), data, settings)
    }

    #[test]
    fn test_summary_identifier() {
        let time = Utc.with_ymd_and_hms(2024, 3, 1, 14, 5, 9).unwrap();
        assert_eq!(
            summary_identifier("mritool-summary", &time),
            "mritool-summary_2024-03-01_14-05-09"
        );
    }

    #[test]
    fn test_threshold_summary() {
        let group = RunGroup {
            prefix: None,
            runs: vec![
                create_run("WT_siNOD1_4_1009", "1", vec![1.0], Some(40)),
                create_run("ctrl_2", "1", vec![1.0], Some(125)),
            ],
        };

        let summary = generate_threshold_summary(&group, false);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Series     Threshold");
        assert_eq!(lines[1], "WT_siNOD1_4_1009  40");
        assert_eq!(lines[2], "ctrl_2           125");
    }

    #[test]
    fn test_threshold_summary_short_ids() {
        let group = RunGroup {
            prefix: None,
            runs: vec![create_run("a", "1", vec![1.0], None)],
        };

        let summary = generate_threshold_summary(&group, true);
        assert_eq!(summary, "Series Threshold\na_1 \n");
    }

    #[test]
    fn test_write_table_csv() {
        let group = RunGroup {
            prefix: None,
            runs: vec![
                create_run("a", "1", vec![1.5, 2.0], Some(40)),
                create_run("b", "1", vec![3.0], None),
            ],
        };
        let table = PivotTable::build(&group, &AggregateOptions::default());

        let mut buffer = Vec::new();
        write_table_csv(&table, &mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();

        let expected = "name,,a,b\r\n\
                        mri_run,,1,1\r\n\
                        threshold,,40,\r\n\
                        id,Time [h],a,b\r\n\
                        % of area,0.0,1.5,3.0\r\n\
                        ,0.25,2.0,\r\n";
        assert_eq!(csv, expected);
    }

    #[test]
    fn test_summary_writer() {
        let temp = TempDir::new().unwrap();
        let writer =
            SummaryWriter::create(temp.path(), "mritool-summary_test".to_string()).unwrap();
        let group = RunGroup {
            prefix: Some("WT".to_string()),
            runs: vec![create_run("ctrl_1", "1", vec![1.0], Some(40))],
        };
        let options = AggregateOptions::default();

        let table = writer.write_table(&group, &options).unwrap();
        let thresholds = writer.write_thresholds(&group, &options).unwrap();

        assert_eq!(
            table,
            temp.path()
                .join("mritool-summary_test")
                .join("mritool-summary_test_prefix-WT.csv")
        );
        assert!(table.exists());
        assert!(thresholds
            .to_string_lossy()
            .ends_with("mritool-summary_test_prefix-WT_settings.txt"));
        assert!(fs::read_to_string(thresholds).unwrap().contains("ctrl_1"));
    }
}
