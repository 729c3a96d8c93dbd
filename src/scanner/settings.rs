//! `settings.txt` sidecar loading.

use crate::models::{SettingValue, Settings};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the sidecar written next to the result directories of a run.
pub const SETTINGS_FILE: &str = "settings.txt";

/// Parse `key<TAB>value` lines. Later keys replace earlier ones.
pub fn parse_settings(content: &str) -> Settings {
    let mut settings = Settings::new();

    for line in content.lines() {
        let mut fields = line.trim().split('\t');
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        settings.insert(key.to_string(), SettingValue::parse(value));
    }

    settings
}

/// Load settings from `path`; a missing file yields no settings.
pub fn load_settings(path: &Path) -> Settings {
    match fs::read(path) {
        Ok(bytes) => parse_settings(&String::from_utf8_lossy(&bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No settings at {}", path.display());
            Settings::new()
        }
        Err(e) => {
            warn!("Failed to read {}: {}", path.display(), e);
            Settings::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_settings() {
        let settings = parse_settings("threshold\t40\nmethod\totsu\n\nchannel\t00 raw\n");

        assert_eq!(settings.len(), 3);
        assert_eq!(settings.get("threshold"), Some(&SettingValue::Integer(40)));
        assert_eq!(
            settings.get("method"),
            Some(&SettingValue::Text("otsu".to_string()))
        );
        assert_eq!(
            settings.get("channel"),
            Some(&SettingValue::Text("00 raw".to_string()))
        );
    }

    #[test]
    fn test_last_occurrence_wins() {
        let settings = parse_settings("threshold\t40\r\nthreshold\t55\r\n");
        assert_eq!(settings.get("threshold"), Some(&SettingValue::Integer(55)));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let settings = load_settings(&temp.path().join(SETTINGS_FILE));
        assert!(settings.is_empty());
    }

    #[test]
    fn test_load_settings() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(SETTINGS_FILE);
        std::fs::write(&path, "threshold\t12\n").unwrap();

        let settings = load_settings(&path);
        assert_eq!(settings.get("threshold"), Some(&SettingValue::Integer(12)));
    }
}
