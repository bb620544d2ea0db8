//! Spreadsheet statistics: load a table, pick columns, compute descriptive
//! statistics, correlation, chi-square independence tests and one-way ANOVA.

pub mod data;
pub mod processing;
pub mod state;

pub use data::dataset::{CellValue, Column, ColumnType, Dataset};
pub use processing::engine::StatisticsEngine;
pub use processing::error::StatError;
pub use processing::operation::{ColumnRequirement, ColumnSelection, StatOperation};
pub use processing::result::{StatResult, StatValue};
pub use state::session::Session;
pub use state::settings::Settings;
