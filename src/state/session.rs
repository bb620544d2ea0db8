use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::data::dataset::Dataset;
use crate::data::loader::{self, LoadError};
use crate::processing::engine::StatisticsEngine;
use crate::processing::error::StatError;
use crate::processing::operation::{ColumnSelection, StatOperation};
use crate::processing::result::StatResult;
use crate::state::settings::Settings;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no data loaded; load a file first")]
    NoDataset,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Stat(#[from] StatError),
}

/// A result on display, with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ShownResult {
    pub operation: StatOperation,
    pub selection: ColumnSelection,
    pub result: StatResult,
}

/// One user's analysis session: the loaded table and the last shown result.
///
/// Loading a file replaces the dataset and clears the result. A failed load
/// or computation leaves both untouched.
#[derive(Debug)]
pub struct Session {
    settings: Settings,
    engine: StatisticsEngine,
    dataset: Option<Dataset>,
    source: Option<PathBuf>,
    last: Option<ShownResult>,
}

impl Session {
    pub fn new(settings: Settings) -> Self {
        Self {
            engine: StatisticsEngine::new(&settings),
            settings,
            dataset: None,
            source: None,
            last: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn last_result(&self) -> Option<&ShownResult> {
        self.last.as_ref()
    }

    pub fn load_file(&mut self, path: &Path) -> Result<&Dataset, SessionError> {
        let loaded = loader::load_file(path, &self.settings)?;
        let dataset = Dataset::from_loaded(loaded, &self.settings).map_err(LoadError::from)?;
        Ok(self.replace_dataset(dataset, Some(path.to_path_buf())))
    }

    /// Swap in a new dataset, discarding the previous one and its result.
    pub fn replace_dataset(&mut self, dataset: Dataset, source: Option<PathBuf>) -> &Dataset {
        self.last = None;
        self.source = source;
        self.dataset.insert(dataset)
    }

    pub fn run(
        &mut self,
        operation: StatOperation,
        selection: ColumnSelection,
    ) -> Result<&StatResult, SessionError> {
        let dataset = self.dataset.as_ref().ok_or(SessionError::NoDataset)?;
        let result = self.engine.try_compute(dataset, operation, &selection)?;
        let shown = self.last.insert(ShownResult { operation, selection, result });
        Ok(&shown.result)
    }
}
