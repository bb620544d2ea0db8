use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Cell texts treated as missing, matching the default NA set pandas uses
/// when reading spreadsheets.
pub const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan",
    "1.#IND", "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None",
    "n/a", "nan", "null",
];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("CSV delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(char),
}

/// How the header row of a sheet is located.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// The first row holds the column names.
    First,
    /// Scan the top of the sheet for the last all-text row.
    Detect,
}

impl Default for HeaderMode {
    fn default() -> Self {
        HeaderMode::First
    }
}

impl HeaderMode {
    pub fn label(&self) -> &'static str {
        match self {
            HeaderMode::First => "first",
            HeaderMode::Detect => "detect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub missing_tokens: Vec<String>,
    pub header: HeaderMode,
    /// Rows inspected by `HeaderMode::Detect`.
    pub header_scan_rows: usize,
    pub csv_delimiter: char,
    /// Worksheet to read; the first sheet when unset.
    pub sheet: Option<String>,
    /// Apply Yates' continuity correction to chi-square tests with one
    /// degree of freedom.
    pub yates_correction: bool,
    pub preview_rows: usize,
    /// Decimal places used when printing test statistics.
    pub precision: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missing_tokens: DEFAULT_MISSING_TOKENS.iter().map(|s| s.to_string()).collect(),
            header: HeaderMode::default(),
            header_scan_rows: 50,
            csv_delimiter: ',',
            sheet: None,
            yates_correction: true,
            preview_rows: 5,
            precision: 4,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. Fields absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.delimiter_byte()?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn is_missing(&self, cell: &str) -> bool {
        let trimmed = cell.trim();
        self.missing_tokens.iter().any(|t| t == trimmed)
    }

    /// The CSV delimiter as a byte.
    pub fn delimiter_byte(&self) -> Result<u8, SettingsError> {
        if self.csv_delimiter.is_ascii() {
            Ok(self.csv_delimiter as u8)
        } else {
            Err(SettingsError::Delimiter(self.csv_delimiter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "header": "detect", "yates_correction": false }}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.header, HeaderMode::Detect);
        assert!(!settings.yates_correction);
        assert_eq!(settings.preview_rows, 5);
        assert_eq!(settings.csv_delimiter, ',');
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(Settings::load(file.path()), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn non_ascii_delimiter_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "csv_delimiter": "§" }}"#).unwrap();
        assert!(matches!(Settings::load(file.path()), Err(SettingsError::Delimiter('§'))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "csv_delimiter": ";" }}"#).unwrap();
        assert_eq!(Settings::load(file.path()).unwrap().delimiter_byte().unwrap(), b';');
    }

    #[test]
    fn missing_tokens_are_trimmed() {
        let settings = Settings::default();
        assert!(settings.is_missing(""));
        assert!(settings.is_missing("  NA "));
        assert!(settings.is_missing("nan"));
        assert!(!settings.is_missing("0"));
        assert!(!settings.is_missing("Nissan"));
    }
}
