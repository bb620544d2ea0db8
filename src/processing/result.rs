use serde::Serialize;
use std::fmt;

use crate::data::dataset::CellValue;
use crate::processing::anova::AnovaTest;
use crate::processing::contingency::ChiSquareTest;
use crate::processing::operation::StatOperation;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StatValue {
    Scalar { value: f64 },
    Mode { value: CellValue },
    ChiSquare(ChiSquareTest),
    Anova(AnovaTest),
}

/// A computed statistic, tagged with the operation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatResult {
    pub operation: StatOperation,
    #[serde(flatten)]
    pub value: StatValue,
}

impl StatResult {
    pub fn scalar(&self) -> Option<f64> {
        match self.value {
            StatValue::Scalar { value } => Some(value),
            _ => None,
        }
    }

    /// Statistic, degrees of freedom and p-value of a hypothesis test.
    /// ANOVA reports its between-group degrees of freedom here.
    pub fn test_summary(&self) -> Option<(f64, usize, f64)> {
        match &self.value {
            StatValue::ChiSquare(t) => Some((t.statistic, t.degrees_of_freedom, t.p_value)),
            StatValue::Anova(t) => Some((t.f_statistic, t.df_between, t.p_value)),
            _ => None,
        }
    }

    /// One-line rendering with test statistics rounded to `precision` places.
    pub fn render(&self, precision: usize) -> String {
        match &self.value {
            StatValue::Scalar { value } => format!("{}: {}", self.operation.label(), value),
            StatValue::Mode { value } => format!("Mode: {value}"),
            StatValue::ChiSquare(t) => format!(
                "Chi-Square Statistic: {:.p$}, Degrees of Freedom: {}, P-Value: {:.p$}",
                t.statistic,
                t.degrees_of_freedom,
                t.p_value,
                p = precision
            ),
            StatValue::Anova(t) => format!(
                "ANOVA F-Statistic: {:.p$}, P-Value: {:.p$} (df = {}, {})",
                t.f_statistic,
                t.p_value,
                t.df_between,
                t.df_within,
                p = precision
            ),
        }
    }
}

impl fmt::Display for StatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(4))
    }
}
