use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::data::loader::LoadedData;
use crate::state::settings::Settings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("column {column} has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Semantic type of a column, decided once when the dataset is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single non-missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// Column storage; `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self { name: name.into(), data: ColumnData::Numeric(values) }
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self { name: name.into(), data: ColumnData::Categorical(values) }
    }

    /// Build a column from raw cell text, inferring its type.
    ///
    /// Cells matching a missing token, or parsing to NaN, are missing. The
    /// column is numeric when every remaining cell parses as a float,
    /// including the case where no cell remains.
    pub fn from_raw(name: impl Into<String>, cells: &[String], settings: &Settings) -> Self {
        let present: Vec<Option<&str>> = cells.iter()
            .map(|c| {
                let trimmed = c.trim();
                if settings.is_missing(trimmed) { None } else { Some(trimmed) }
            })
            .collect();

        let parsed: Option<Vec<Option<f64>>> = present.iter()
            .map(|cell| match cell {
                None => Some(None),
                Some(s) => s.parse::<f64>().ok().map(|v| if v.is_nan() { None } else { Some(v) }),
            })
            .collect();

        match parsed {
            Some(values) => Column::numeric(name, values),
            None => Column::categorical(
                name,
                present.into_iter().map(|c| c.map(str::to_string)).collect(),
            ),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        match self.data {
            ColumnData::Numeric(_) => ColumnType::Numeric,
            ColumnData::Categorical(_) => ColumnType::Categorical,
        }
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.data {
            ColumnData::Categorical(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Value at `row`, or `None` when the cell is missing or out of range.
    pub fn cell(&self, row: usize) -> Option<CellValue> {
        match &self.data {
            ColumnData::Numeric(v) => v.get(row).copied().flatten().map(CellValue::Number),
            ColumnData::Categorical(v) => v.get(row).cloned().flatten().map(CellValue::Text),
        }
    }

    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Categorical(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    /// Non-missing values in row order; empty for categorical columns.
    pub fn present_numbers(&self) -> Vec<f64> {
        self.as_numeric()
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }
}

/// A rectangular table of uniquely named, typed columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut names = HashSet::new();
        for col in &columns {
            if !names.insert(col.name()) {
                return Err(DatasetError::DuplicateColumn(col.name().to_string()));
            }
        }

        let row_count = columns.first().map_or(0, Column::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(DatasetError::RaggedColumn {
                column: bad.name().to_string(),
                expected: row_count,
                found: bad.len(),
            });
        }

        Ok(Self { columns, row_count })
    }

    /// Type every loaded column and assemble the dataset.
    pub fn from_loaded(loaded: LoadedData, settings: &Settings) -> Result<Self, DatasetError> {
        let columns = loaded.columns.into_iter()
            .zip(loaded.column_data.iter())
            .map(|(name, cells)| Column::from_raw(name, cells, settings))
            .collect();
        let dataset = Self::new(columns)?;

        tracing::debug!(
            numeric = dataset.columns_of_type(ColumnType::Numeric).len(),
            categorical = dataset.columns_of_type(ColumnType::Categorical).len(),
            "Typed dataset columns"
        );
        Ok(dataset)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn columns_of_type(&self, column_type: ColumnType) -> Vec<&str> {
        self.columns.iter()
            .filter(|c| c.column_type() == column_type)
            .map(Column::name)
            .collect()
    }

    /// The first `n` rows rendered as text, missing cells left blank.
    pub fn preview(&self, n: usize) -> Vec<Vec<String>> {
        (0..self.row_count.min(n))
            .map(|row| {
                self.columns.iter()
                    .map(|c| c.cell(row).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}
