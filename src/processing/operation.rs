use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::dataset::ColumnType;

/// Statistical operations offered by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatOperation {
    Mean,
    Median,
    Mode,
    Variance,
    StdDev,
    Correlation,
    ChiSquare,
    Anova,
}

/// Type a selected column must have to fill an operation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRequirement {
    Numeric,
    Categorical,
    Any,
}

impl ColumnRequirement {
    pub fn accepts(&self, column_type: ColumnType) -> bool {
        match self {
            ColumnRequirement::Numeric => column_type == ColumnType::Numeric,
            ColumnRequirement::Categorical => column_type == ColumnType::Categorical,
            ColumnRequirement::Any => true,
        }
    }
}

impl fmt::Display for ColumnRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRequirement::Numeric => f.write_str("numeric"),
            ColumnRequirement::Categorical => f.write_str("categorical"),
            ColumnRequirement::Any => f.write_str("any"),
        }
    }
}

impl StatOperation {
    pub const ALL: [StatOperation; 8] = [
        StatOperation::Mean,
        StatOperation::Median,
        StatOperation::Mode,
        StatOperation::Variance,
        StatOperation::StdDev,
        StatOperation::ChiSquare,
        StatOperation::Correlation,
        StatOperation::Anova,
    ];

    /// Menu label, as shown to users.
    pub fn label(&self) -> &'static str {
        match self {
            StatOperation::Mean => "Mean",
            StatOperation::Median => "Median",
            StatOperation::Mode => "Mode",
            StatOperation::Variance => "Variance",
            StatOperation::StdDev => "Standard Deviation",
            StatOperation::Correlation => "Correlation",
            StatOperation::ChiSquare => "Chi-Square Test",
            StatOperation::Anova => "ANOVA",
        }
    }

    /// Short command-line name.
    pub fn key(&self) -> &'static str {
        match self {
            StatOperation::Mean => "mean",
            StatOperation::Median => "median",
            StatOperation::Mode => "mode",
            StatOperation::Variance => "variance",
            StatOperation::StdDev => "std-dev",
            StatOperation::Correlation => "correlation",
            StatOperation::ChiSquare => "chi-square",
            StatOperation::Anova => "anova",
        }
    }

    /// Column type required for each selection slot, in order.
    /// ANOVA takes the numeric response first and the categorical factor second.
    pub fn requirements(&self) -> &'static [ColumnRequirement] {
        use ColumnRequirement::*;
        match self {
            StatOperation::Mean
            | StatOperation::Median
            | StatOperation::Variance
            | StatOperation::StdDev => &[Numeric],
            StatOperation::Mode => &[Any],
            StatOperation::Correlation => &[Numeric, Numeric],
            StatOperation::ChiSquare => &[Categorical, Categorical],
            StatOperation::Anova => &[Numeric, Categorical],
        }
    }

    pub fn arity(&self) -> usize {
        self.requirements().len()
    }
}

impl fmt::Display for StatOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOperation(pub String);

impl fmt::Display for UnknownOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = StatOperation::ALL.iter().map(|op| op.key()).collect();
        write!(f, "unknown operation '{}' (expected one of: {})", self.0, keys.join(", "))
    }
}

impl std::error::Error for UnknownOperation {}

impl FromStr for StatOperation {
    type Err = UnknownOperation;

    /// Accepts the short key or the menu label, ignoring case, spaces,
    /// dashes and underscores ("std-dev", "Standard Deviation", "chi_square").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let squashed: String = s.chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        let op = match squashed.as_str() {
            "mean" | "average" => StatOperation::Mean,
            "median" => StatOperation::Median,
            "mode" => StatOperation::Mode,
            "variance" | "var" => StatOperation::Variance,
            "stddev" | "std" | "standarddeviation" => StatOperation::StdDev,
            "correlation" | "corr" => StatOperation::Correlation,
            "chisquare" | "chisquaretest" | "chi2" => StatOperation::ChiSquare,
            "anova" => StatOperation::Anova,
            _ => return Err(UnknownOperation(s.to_string())),
        };
        Ok(op)
    }
}

/// Column names chosen for an operation: one, or two for paired operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub primary: String,
    pub secondary: Option<String>,
}

impl ColumnSelection {
    pub fn single(column: impl Into<String>) -> Self {
        Self { primary: column.into(), secondary: None }
    }

    pub fn pair(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self { primary: first.into(), secondary: Some(second.into()) }
    }

    pub fn names(&self) -> Vec<&str> {
        std::iter::once(self.primary.as_str())
            .chain(self.secondary.as_deref())
            .collect()
    }
}

impl fmt::Display for ColumnSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(second) => write!(f, "{} × {}", self.primary, second),
            None => f.write_str(&self.primary),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keys_and_labels() {
        for op in StatOperation::ALL {
            assert_eq!(op.key().parse::<StatOperation>().unwrap(), op);
            assert_eq!(op.label().parse::<StatOperation>().unwrap(), op);
        }
        assert_eq!("CHI_SQUARE".parse::<StatOperation>().unwrap(), StatOperation::ChiSquare);
        assert!("kurtosis".parse::<StatOperation>().is_err());
    }

    #[test]
    fn arity_matches_requirements() {
        assert_eq!(StatOperation::Mean.arity(), 1);
        assert_eq!(StatOperation::Mode.requirements(), &[ColumnRequirement::Any]);
        assert_eq!(StatOperation::Anova.requirements(), &[ColumnRequirement::Numeric, ColumnRequirement::Categorical]);
        assert_eq!(StatOperation::ChiSquare.arity(), 2);
    }

    #[test]
    fn selection_names() {
        assert_eq!(ColumnSelection::single("a").names(), vec!["a"]);
        assert_eq!(ColumnSelection::pair("a", "b").names(), vec!["a", "b"]);
    }
}
