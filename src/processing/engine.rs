use crate::data::dataset::{Column, Dataset};
use crate::processing::anova;
use crate::processing::contingency::{self, ContingencyTable};
use crate::processing::correlation;
use crate::processing::descriptive;
use crate::processing::error::StatError;
use crate::processing::operation::{ColumnRequirement, ColumnSelection, StatOperation};
use crate::processing::result::{StatResult, StatValue};
use crate::state::settings::Settings;

/// Stateless dispatcher from (dataset, operation, selection) to a result.
#[derive(Debug, Clone)]
pub struct StatisticsEngine {
    yates_correction: bool,
}

impl Default for StatisticsEngine {
    fn default() -> Self {
        Self { yates_correction: true }
    }
}

impl StatisticsEngine {
    pub fn new(settings: &Settings) -> Self {
        Self { yates_correction: settings.yates_correction }
    }

    pub fn with_yates_correction(mut self, enabled: bool) -> Self {
        self.yates_correction = enabled;
        self
    }

    /// Validate the selection against the operation, then compute.
    pub fn compute(
        &self,
        dataset: &Dataset,
        operation: StatOperation,
        selection: &ColumnSelection,
    ) -> Result<StatResult, StatError> {
        let columns = resolve(dataset, operation, selection)?;

        let value = match (operation, columns.as_slice()) {
            (StatOperation::Mean, [col]) => StatValue::Scalar { value: descriptive::mean(col)? },
            (StatOperation::Median, [col]) => StatValue::Scalar { value: descriptive::median(col)? },
            (StatOperation::Mode, [col]) => StatValue::Mode { value: descriptive::mode(col)? },
            (StatOperation::Variance, [col]) => StatValue::Scalar { value: descriptive::variance(col)? },
            (StatOperation::StdDev, [col]) => StatValue::Scalar { value: descriptive::std_dev(col)? },
            (StatOperation::Correlation, [a, b]) => StatValue::Scalar { value: correlation::pearson(a, b)? },
            (StatOperation::ChiSquare, [a, b]) => {
                let table = ContingencyTable::crosstab(a, b)?;
                StatValue::ChiSquare(contingency::chi_square(&table, self.yates_correction)?)
            }
            (StatOperation::Anova, [response, factor]) => {
                let groups = anova::group_by_factor(response, factor)?;
                StatValue::Anova(anova::one_way(&groups)?)
            }
            _ => {
                return Err(StatError::Arity {
                    operation,
                    expected: operation.arity(),
                    found: columns.len(),
                })
            }
        };

        tracing::debug!(operation = operation.key(), selection = %selection, "Computed statistic");
        Ok(StatResult { operation, value })
    }

    /// Compute, logging a rejected request at warn level.
    pub fn try_compute(
        &self,
        dataset: &Dataset,
        operation: StatOperation,
        selection: &ColumnSelection,
    ) -> Result<StatResult, StatError> {
        self.compute(dataset, operation, selection).inspect_err(|e| {
            tracing::warn!(operation = operation.key(), selection = %selection, error = %e, "Statistic rejected");
        })
    }
}

/// Look up the selected columns and check arity and types.
fn resolve<'a>(
    dataset: &'a Dataset,
    operation: StatOperation,
    selection: &ColumnSelection,
) -> Result<Vec<&'a Column>, StatError> {
    let names = selection.names();
    let requirements = operation.requirements();
    if names.len() != requirements.len() {
        return Err(StatError::Arity {
            operation,
            expected: requirements.len(),
            found: names.len(),
        });
    }

    names.iter()
        .zip(requirements.iter())
        .map(|(&name, &requirement)| {
            let column = dataset.column(name)
                .ok_or_else(|| StatError::UnknownColumn(name.to_string()))?;
            if !requirement.accepts(column.column_type()) {
                return Err(StatError::TypeMismatch {
                    column: name.to_string(),
                    operation,
                    expected: requirement,
                    found: column.column_type(),
                });
            }
            Ok(column)
        })
        .collect()
}

impl Dataset {
    /// Columns a user may pick for the given slot requirement.
    pub fn eligible_columns(&self, requirement: ColumnRequirement) -> Vec<&str> {
        self.columns().iter()
            .filter(|c| requirement.accepts(c.column_type()))
            .map(Column::name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{CellValue, ColumnType};

    fn cars() -> Dataset {
        let model = ["GT-R", "GT-R", "Z", "Z", "Leaf", "Leaf", "GT-R", "Z"];
        let colour = ["Red", "Blue", "Red", "Red", "Blue", "Blue", "Red", "Blue"];
        Dataset::new(vec![
            Column::numeric("airbags", [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0].map(Some).to_vec()),
            Column::numeric("price", [10.0, 12.0, 7.0, 6.0, 3.0, 4.0, 11.0, 8.0].map(Some).to_vec()),
            Column::categorical("model", model.map(|s| Some(s.to_string())).to_vec()),
            Column::categorical("colour", colour.map(|s| Some(s.to_string())).to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn descriptive_operations() {
        let ds = cars();
        let engine = StatisticsEngine::default();
        let sel = ColumnSelection::single("airbags");

        let mean = engine.compute(&ds, StatOperation::Mean, &sel).unwrap();
        assert!((mean.scalar().unwrap() - 5.0).abs() < 1e-12);
        let median = engine.compute(&ds, StatOperation::Median, &sel).unwrap();
        assert_eq!(median.scalar(), Some(4.5));
        let sd = engine.compute(&ds, StatOperation::StdDev, &sel).unwrap();
        assert!((sd.scalar().unwrap() - 2.138089935).abs() < 1e-6);

        let mode = engine.compute(&ds, StatOperation::Mode, &ColumnSelection::single("model")).unwrap();
        assert_eq!(mode.value, StatValue::Mode { value: CellValue::Text("GT-R".into()) });
    }

    #[test]
    fn type_mismatch_is_reported() {
        let ds = cars();
        let err = StatisticsEngine::default()
            .compute(&ds, StatOperation::Mean, &ColumnSelection::single("model"))
            .unwrap_err();
        assert_eq!(
            err,
            StatError::TypeMismatch {
                column: "model".into(),
                operation: StatOperation::Mean,
                expected: ColumnRequirement::Numeric,
                found: ColumnType::Categorical,
            }
        );

        let err = StatisticsEngine::default()
            .compute(&ds, StatOperation::ChiSquare, &ColumnSelection::pair("model", "price"))
            .unwrap_err();
        assert!(matches!(err, StatError::TypeMismatch { ref column, .. } if column == "price"));
    }

    #[test]
    fn arity_and_unknown_columns() {
        let ds = cars();
        let engine = StatisticsEngine::default();
        assert_eq!(
            engine.compute(&ds, StatOperation::Correlation, &ColumnSelection::single("price")),
            Err(StatError::Arity { operation: StatOperation::Correlation, expected: 2, found: 1 })
        );
        assert_eq!(
            engine.compute(&ds, StatOperation::Mean, &ColumnSelection::pair("price", "airbags")),
            Err(StatError::Arity { operation: StatOperation::Mean, expected: 1, found: 2 })
        );
        assert_eq!(
            engine.compute(&ds, StatOperation::Mean, &ColumnSelection::single("torque")),
            Err(StatError::UnknownColumn("torque".into()))
        );
    }

    #[test]
    fn paired_operations() {
        let ds = cars();
        let engine = StatisticsEngine::default();

        let r = engine.compute(&ds, StatOperation::Correlation, &ColumnSelection::pair("price", "price")).unwrap();
        assert!((r.scalar().unwrap() - 1.0).abs() < 1e-12);

        let chi = engine.compute(&ds, StatOperation::ChiSquare, &ColumnSelection::pair("model", "colour")).unwrap();
        let (_, dof, p) = chi.test_summary().unwrap();
        assert_eq!(dof, 2);
        assert!((0.0..=1.0).contains(&p));

        let anova = engine.compute(&ds, StatOperation::Anova, &ColumnSelection::pair("price", "model")).unwrap();
        match anova.value {
            StatValue::Anova(t) => {
                assert_eq!((t.df_between, t.df_within), (2, 5));
                assert_eq!(t.groups, vec!["GT-R", "Z", "Leaf"]);
                assert!(t.f_statistic > 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn yates_setting_is_honoured() {
        let ds = Dataset::new(vec![
            Column::categorical("a", ["x", "x", "y", "y"].map(|s| Some(s.to_string())).to_vec()),
            Column::categorical("b", ["p", "q", "q", "q"].map(|s| Some(s.to_string())).to_vec()),
        ])
        .unwrap();
        let sel = ColumnSelection::pair("a", "b");
        let corrected = StatisticsEngine::default().compute(&ds, StatOperation::ChiSquare, &sel).unwrap();
        let raw = StatisticsEngine::default()
            .with_yates_correction(false)
            .compute(&ds, StatOperation::ChiSquare, &sel)
            .unwrap();
        assert!(corrected.test_summary().unwrap().0 < raw.test_summary().unwrap().0);
    }

    #[test]
    fn eligible_columns_follow_requirements() {
        let ds = cars();
        assert_eq!(ds.eligible_columns(ColumnRequirement::Numeric), vec!["airbags", "price"]);
        assert_eq!(ds.eligible_columns(ColumnRequirement::Categorical), vec!["model", "colour"]);
        assert_eq!(ds.eligible_columns(ColumnRequirement::Any).len(), 4);
    }
}
