//! Parsers for the two MRI tool result formats.
//!
//! - `results.csv`: one row per measured region, labelled with the slice it
//!   belongs to. Areas of all regions on a slice are summed.
//! - `<image>.mri.txt`: a header plus one row per region; the third column
//!   holds the area. The file contributes a single value.
//!
//! Both produce a [`Series`]: series key to "% of area".

use crate::models::percent_of_area;
use regex::{NoExpand, Regex};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

/// File name of the slice-table format.
pub const SLICE_TABLE_FILE: &str = "results.csv";

/// File name suffix of the single-value format.
pub const SINGLE_VALUE_SUFFIX: &str = ".mri.txt";

/// Series key to value, as collected from one directory.
pub type Series = HashMap<String, f64>;

/// Errors raised while reading a result file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: missing area column")]
    MissingField { line: usize },

    #[error("line {line}: invalid area value '{value}'")]
    InvalidInteger { line: usize, value: String },

    #[error("line {line}: total area out of range")]
    Overflow { line: usize },
}

/// Supported result file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    /// `results.csv`
    SliceTable,
    /// `*.mri.txt`
    SingleValue,
}

impl ResultFormat {
    /// Detect the format from a file name, `None` for unrelated files.
    pub fn detect(file_name: &str) -> Option<Self> {
        if file_name == SLICE_TABLE_FILE {
            Some(ResultFormat::SliceTable)
        } else if file_name.ends_with(SINGLE_VALUE_SUFFIX) {
            Some(ResultFormat::SingleValue)
        } else {
            None
        }
    }
}

fn slice_row_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^.*:(\d+)-\d+-\d+:([^,]+),(\d+)").expect("slice row pattern is valid")
    })
}

fn time_index_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"_t\d+_").expect("time index pattern is valid"))
}

fn image_suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:\.(?:tiff?|png))?\.mri\.txt$").expect("image suffix pattern is valid")
    })
}

/// Parse the contents of a `results.csv`.
///
/// Rows look like
/// `1,Mark_and_Find 001:0001-0001-0369:WT_0TriDAP_06080_t00_RAW_ch00,390818,...`.
/// Rows that do not match are skipped. Every slice from 1 up to the highest
/// one seen gets an entry, missing slices count as 0. Keys are the label of
/// the last matching row with its `_tNN_` part set to the zero-based slice.
/// A label without a time index yields the same key for every slice, so
/// only the last slice survives.
pub fn parse_slice_table(content: &str) -> Series {
    let mut slices: BTreeMap<usize, f64> = BTreeMap::new();
    let mut label = String::new();

    for line in content.lines() {
        let Some(caps) = slice_row_pattern().captures(line) else {
            continue;
        };
        let (Ok(slice), Ok(area)) = (caps[1].parse::<usize>(), caps[3].parse::<u64>()) else {
            continue;
        };
        label = caps[2].to_string();
        *slices.entry(slice).or_insert(0.0) += percent_of_area(area as f64);
    }

    let mut series = Series::new();
    let Some(&last_slice) = slices.keys().next_back() else {
        return series;
    };

    for slice in 1..=last_slice {
        let index = format!("_t{:02}_", slice - 1);
        let key = time_index_pattern().replacen(&label, 1, NoExpand(&index));
        series.insert(key.into_owned(), slices.get(&slice).copied().unwrap_or(0.0));
    }

    series
}

/// Series key for a single-value file: the file name without the
/// `.mri.txt` suffix and an optional image extension.
pub fn single_value_key(file_name: &str) -> String {
    image_suffix_pattern().replace(file_name, "").into_owned()
}

/// Parse the contents of a `*.mri.txt` file into one entry.
///
/// The first line is a header. The third tab-separated column of every
/// other line is summed; any missing or non-integer value rejects the file.
pub fn parse_single_value(file_name: &str, content: &str) -> Result<Series, ParseError> {
    let mut total: i64 = 0;

    for (index, line) in content.lines().enumerate().skip(1) {
        let line_no = index + 1;
        let field = line
            .split('\t')
            .nth(2)
            .ok_or(ParseError::MissingField { line: line_no })?
            .trim();
        let value: i64 = field.parse().map_err(|_| ParseError::InvalidInteger {
            line: line_no,
            value: field.to_string(),
        })?;
        total = total
            .checked_add(value)
            .ok_or(ParseError::Overflow { line: line_no })?;
    }

    let mut series = Series::new();
    series.insert(single_value_key(file_name), percent_of_area(total as f64));
    Ok(series)
}

/// Read and parse one result file.
pub fn parse_file(path: &Path, format: ResultFormat) -> Result<Series, ParseError> {
    let bytes = fs::read(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let content = String::from_utf8_lossy(&bytes);

    match format {
        ResultFormat::SliceTable => Ok(parse_slice_table(&content)),
        ResultFormat::SingleValue => {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            parse_single_value(&file_name, &content)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = " ,Label,Area,Mean,Min,Max,BX,BY,Width,Height\n";

    fn row(n: usize, slice: usize, label: &str, area: u64) -> String {
        format!(
            "{},Mark_and_Find 001:{:04}-0001-0369:{},{},161.834,66,210,10,81,1004,577\n",
            n, slice, label, area
        )
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(ResultFormat::detect("results.csv"), Some(ResultFormat::SliceTable));
        assert_eq!(
            ResultFormat::detect("img_01.tif.mri.txt"),
            Some(ResultFormat::SingleValue)
        );
        assert_eq!(ResultFormat::detect("other.csv"), None);
        assert_eq!(ResultFormat::detect("settings.txt"), None);
    }

    #[test]
    fn test_slice_table_sums_areas_per_slice() {
        let label = "WT_0TriDAP_06080_t05_RAW_ch00";
        let content = format!(
            "{}{}{}{}",
            HEADER,
            row(1, 1, label, 1000),
            row(2, 1, label, 2000),
            row(3, 2, label, 4000),
        );

        let series = parse_slice_table(&content);
        assert_eq!(series.len(), 2);
        assert_eq!(
            series["WT_0TriDAP_06080_t00_RAW_ch00"],
            100.0 * 3000.0 / 1048576.0
        );
        assert_eq!(
            series["WT_0TriDAP_06080_t01_RAW_ch00"],
            100.0 * 4000.0 / 1048576.0
        );
    }

    #[test]
    fn test_slice_table_fills_gaps_with_zero() {
        let label = "exp_t00_RAW";
        let content = format!("{}{}{}", HEADER, row(1, 1, label, 512), row(2, 4, label, 512));

        let series = parse_slice_table(&content);
        assert_eq!(series.len(), 4);
        assert_eq!(series["exp_t01_RAW"], 0.0);
        assert_eq!(series["exp_t02_RAW"], 0.0);
        assert!(series["exp_t03_RAW"] > 0.0);
    }

    #[test]
    fn test_slice_table_without_time_index_collapses() {
        let label = "plain_label";
        let content = format!("{}{}{}", HEADER, row(1, 1, label, 100), row(2, 2, label, 200));

        let series = parse_slice_table(&content);
        assert_eq!(series.len(), 1);
        assert_eq!(series["plain_label"], 100.0 * 200.0 / 1048576.0);
    }

    #[test]
    fn test_slice_table_skips_malformed_rows() {
        let label = "exp_t00_RAW";
        let content = format!(
            "{}garbage line\n1,no label here,12\n{}",
            HEADER,
            row(1, 1, label, 1024)
        );

        let series = parse_slice_table(&content);
        assert_eq!(series.len(), 1);
        assert_eq!(series["exp_t00_RAW"], 100.0 * 1024.0 / 1048576.0);
    }

    #[test]
    fn test_slice_table_empty() {
        assert!(parse_slice_table(HEADER).is_empty());
        assert!(parse_slice_table("").is_empty());
    }

    #[test]
    fn test_single_value_key() {
        assert_eq!(single_value_key("img_01.tif.mri.txt"), "img_01");
        assert_eq!(single_value_key("img_01.tiff.mri.txt"), "img_01");
        assert_eq!(single_value_key("img_01.png.mri.txt"), "img_01");
        assert_eq!(single_value_key("img_01.mri.txt"), "img_01");
        assert_eq!(single_value_key("img_01.jpg.mri.txt"), "img_01.jpg");
    }

    #[test]
    fn test_single_value_sums_third_column() {
        let content = "#\tLabel\tArea\n1\ta\t1000\n2\tb\t 24 \n3\tc\t0\n";
        let series = parse_single_value("cell_t00.tif.mri.txt", content).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series["cell_t00"], 100.0 * 1024.0 / 1048576.0);
    }

    #[test]
    fn test_single_value_header_only() {
        let series = parse_single_value("x.mri.txt", "#\tLabel\tArea\n").unwrap();
        assert_eq!(series["x"], 0.0);
    }

    #[test]
    fn test_single_value_rejects_non_integer() {
        let content = "#\tLabel\tArea\n1\ta\t10\n2\tb\t3.5\n";
        let err = parse_single_value("x.mri.txt", content).unwrap_err();
        assert!(matches!(err, ParseError::InvalidInteger { line: 3, .. }));
    }

    #[test]
    fn test_single_value_rejects_overflowing_total() {
        let content = "#\tLabel\tArea\n1\ta\t9223372036854775807\n2\tb\t1\n";
        let err = parse_single_value("x.mri.txt", content).unwrap_err();
        assert!(matches!(err, ParseError::Overflow { line: 3 }));

        let content = "#\tLabel\tArea\n1\ta\t-9223372036854775808\n2\tb\t-1\n";
        assert!(parse_single_value("x.mri.txt", content).is_err());
    }

    #[test]
    fn test_single_value_rejects_short_row() {
        let content = "#\tLabel\tArea\n1\ta\n";
        let err = parse_single_value("x.mri.txt", content).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { line: 2 }));
    }
}
