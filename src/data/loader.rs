use std::path::Path;
use thiserror::Error;

use crate::data::dataset::DatasetError;
use crate::data::parser;
use crate::state::settings::{HeaderMode, Settings, SettingsError};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file format: .{0}")]
    UnsupportedFormat(String),
    #[error("cannot read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("cannot open workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("sheet not found: {0}")]
    SheetNotFound(String),
    #[error("no data found after header detection")]
    Empty,
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result of loading a data file: column names and column data as strings
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub columns: Vec<String>,
    pub column_data: Vec<Vec<String>>,  // column-major: column_data[col_idx][row_idx]
    pub row_count: usize,
}

/// Load a CSV or spreadsheet file and return the column names and raw string data.
pub fn load_file(path: &Path, settings: &Settings) -> Result<LoadedData, LoadError> {
    let ext = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let rows = match ext.as_str() {
        "csv" | "txt" => read_csv_rows(path, settings.delimiter_byte()?)?,
        "tsv" => read_csv_rows(path, b'\t')?,
        "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => read_sheet_rows(path, settings.sheet.as_deref())?,
        _ => return Err(LoadError::UnsupportedFormat(ext)),
    };

    let loaded = into_columns(rows, settings)?;
    tracing::info!(
        path = %path.display(),
        columns = loaded.columns.len(),
        rows = loaded.row_count,
        "Loaded data file"
    );
    Ok(loaded)
}

fn read_csv_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, LoadError> {
    let content = std::fs::read(path)?;
    // Fallback: treat as latin1 (each byte maps to same Unicode code point)
    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|s| s.to_string()).collect());
    }
    Ok(rows)
}

fn read_sheet_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<String>>, LoadError> {
    use calamine::{open_workbook_auto, Reader};

    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(LoadError::SheetNotFound(name.to_string()));
            }
            name.to_string()
        }
        None => workbook.sheet_names().first()
            .ok_or(LoadError::NoSheets)?
            .clone(),
    };

    let range = workbook.worksheet_range(&sheet_name)?;

    let rows = range.rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    Ok(rows)
}

/// Render a workbook cell as the text a CSV export would carry.
/// Dates become ISO 8601 so they are never typed as numbers.
fn cell_text(cell: &calamine::Data) -> String {
    use calamine::Data;

    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) if dt.is_duration() => match dt.as_duration() {
            Some(d) => d.to_string(),
            None => format!("{}d", dt.as_f64()),
        },
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ts) if ts.time() == chrono::NaiveTime::MIN => ts.format("%Y-%m-%d").to_string(),
            Some(ts) => ts.format("%Y-%m-%dT%H:%M:%S").to_string(),
            // Out of chrono's range; keep it non-numeric
            None => format!("#DATE {}", dt.as_f64()),
        },
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

/// Split off the header row and convert the remaining rows to column-major form.
/// Short rows are padded with empty cells.
fn into_columns(all_rows: Vec<Vec<String>>, settings: &Settings) -> Result<LoadedData, LoadError> {
    let header_row = match settings.header {
        HeaderMode::First => 0,
        HeaderMode::Detect => parser::detect_header_row(&all_rows, settings.header_scan_rows),
    };

    if all_rows.is_empty() || header_row >= all_rows.len() {
        return Err(LoadError::Empty);
    }

    let mut raw_header = all_rows[header_row].clone();
    let data_rows = &all_rows[header_row + 1..];

    // Data cells past the header still need a column
    let widest = data_rows.iter().map(|r| r.len()).max().unwrap_or(0);
    if widest > raw_header.len() {
        raw_header.resize(widest, String::new());
    }
    let columns = parser::normalize_headers(&raw_header);

    let num_cols = columns.len();
    let mut column_data: Vec<Vec<String>> = vec![Vec::with_capacity(data_rows.len()); num_cols];
    let row_count = data_rows.len();

    for row in data_rows {
        for (col_idx, col_data) in column_data.iter_mut().enumerate() {
            match row.get(col_idx) {
                Some(cell) => col_data.push(cell.clone()),
                None => col_data.push(String::new()),
            }
        }
    }

    tracing::debug!(header_row, mode = settings.header.label(), "Split header row");
    Ok(LoadedData { columns, column_data, row_count })
}
