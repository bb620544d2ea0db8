use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::HashMap;

use crate::data::dataset::Column;
use crate::processing::error::{finite, StatError};

/// Cross-tabulated joint counts of two categorical columns.
///
/// Levels are kept in order of first appearance. Rows missing either value
/// are left out, so every level has at least one count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContingencyTable {
    pub row_levels: Vec<String>,
    pub col_levels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn crosstab(rows: &Column, cols: &Column) -> Result<Self, StatError> {
        let (a, b) = match (rows.as_categorical(), cols.as_categorical()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(StatError::Computation("crosstab needs categorical columns".into())),
        };

        let mut row_index: HashMap<&str, usize> = HashMap::new();
        let mut col_index: HashMap<&str, usize> = HashMap::new();
        let mut row_levels = Vec::new();
        let mut col_levels = Vec::new();
        let mut pairs = Vec::new();

        for (x, y) in a.iter().zip(b.iter()) {
            let (Some(x), Some(y)) = (x, y) else { continue };
            let i = *row_index.entry(x.as_str()).or_insert_with(|| {
                row_levels.push(x.clone());
                row_levels.len() - 1
            });
            let j = *col_index.entry(y.as_str()).or_insert_with(|| {
                col_levels.push(y.clone());
                col_levels.len() - 1
            });
            pairs.push((i, j));
        }

        for (column, levels) in [(rows, &row_levels), (cols, &col_levels)] {
            if levels.len() < 2 {
                return Err(StatError::InsufficientCategories {
                    column: column.name().to_string(),
                    found: levels.len(),
                });
            }
        }

        let mut counts = vec![vec![0u64; col_levels.len()]; row_levels.len()];
        for (i, j) in pairs {
            counts[i][j] += 1;
        }

        Ok(Self { row_levels, col_levels, counts })
    }

    /// Build a table straight from counts, with numbered levels.
    pub fn from_counts(counts: Vec<Vec<u64>>) -> Self {
        let rows = counts.len();
        let cols = counts.first().map_or(0, Vec::len);
        Self {
            row_levels: (0..rows).map(|i| i.to_string()).collect(),
            col_levels: (0..cols).map(|j| j.to_string()).collect(),
            counts,
        }
    }

    pub fn transpose(&self) -> Self {
        let counts = (0..self.col_levels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).collect())
            .collect();
        Self {
            row_levels: self.col_levels.clone(),
            col_levels: self.row_levels.clone(),
            counts,
        }
    }

    pub fn row_totals(&self) -> Vec<f64> {
        self.counts.iter()
            .map(|row| row.iter().sum::<u64>() as f64)
            .collect()
    }

    pub fn col_totals(&self) -> Vec<f64> {
        (0..self.col_levels.len())
            .map(|j| self.counts.iter().map(|row| row[j]).sum::<u64>() as f64)
            .collect()
    }

    /// Expected counts under independence: row total × column total / grand total.
    pub fn expected(&self) -> Vec<Vec<f64>> {
        let rows = self.row_totals();
        let cols = self.col_totals();
        let grand: f64 = rows.iter().sum();
        rows.iter()
            .map(|r| cols.iter().map(|c| r * c / grand).collect())
            .collect()
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.row_levels.len().saturating_sub(1) * self.col_levels.len().saturating_sub(1)
    }
}

/// Outcome of a chi-square test of independence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub expected: Vec<Vec<f64>>,
    pub yates_corrected: bool,
}

/// Pearson's chi-square test on a contingency table.
///
/// With `yates` set and one degree of freedom, each observed count moves
/// toward its expected count by at most 0.5 before the statistic is summed.
pub fn chi_square(table: &ContingencyTable, yates: bool) -> Result<ChiSquareTest, StatError> {
    let dof = table.degrees_of_freedom();
    if dof == 0 {
        return Err(StatError::InsufficientCategories {
            column: if table.row_levels.len() < 2 { "rows" } else { "columns" }.to_string(),
            found: table.row_levels.len().min(table.col_levels.len()),
        });
    }

    let expected = table.expected();
    let corrected = yates && dof == 1;

    let mut statistic = 0.0;
    for (observed_row, expected_row) in table.counts.iter().zip(expected.iter()) {
        for (&o, &e) in observed_row.iter().zip(expected_row.iter()) {
            let mut diff = o as f64 - e;
            if corrected {
                diff = diff.signum() * (diff.abs() - diff.abs().min(0.5));
            }
            statistic += diff * diff / e;
        }
    }
    let statistic = finite(statistic, "chi-square statistic")?;

    let dist = ChiSquared::new(dof as f64)
        .map_err(|e| StatError::Computation(e.to_string()))?;
    let p_value = dist.sf(statistic);

    tracing::debug!(statistic, dof, p_value, corrected, "Chi-square test");
    Ok(ChiSquareTest {
        statistic,
        degrees_of_freedom: dof,
        p_value,
        expected,
        yates_corrected: corrected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(name: &str, values: &[&str]) -> Column {
        Column::categorical(
            name,
            values.iter().map(|v| if v.is_empty() { None } else { Some(v.to_string()) }).collect(),
        )
    }

    /// Expand a 2-D count grid into two label columns.
    fn columns_from_counts(counts: &[&[usize]]) -> (Column, Column) {
        let mut a = Vec::new();
        let mut b = Vec::new();
        for (i, row) in counts.iter().enumerate() {
            for (j, &n) in row.iter().enumerate() {
                for _ in 0..n {
                    a.push(format!("r{i}"));
                    b.push(format!("c{j}"));
                }
            }
        }
        let a: Vec<&str> = a.iter().map(String::as_str).collect();
        let b: Vec<&str> = b.iter().map(String::as_str).collect();
        (cat("a", &a), cat("b", &b))
    }

    #[test]
    fn crosstab_counts_joint_levels() {
        let a = cat("model", &["GT-R", "Z", "GT-R", "", "Z"]);
        let b = cat("colour", &["Red", "Red", "Blue", "Red", ""]);
        let table = ContingencyTable::crosstab(&a, &b).unwrap();
        assert_eq!(table.row_levels, vec!["GT-R", "Z"]);
        assert_eq!(table.col_levels, vec!["Red", "Blue"]);
        assert_eq!(table.counts, vec![vec![1, 1], vec![1, 0]]);
    }

    #[test]
    fn two_by_two_with_yates() {
        let table = ContingencyTable::from_counts(vec![vec![10, 20], vec![30, 40]]);
        let test = chi_square(&table, true).unwrap();
        assert_eq!(test.degrees_of_freedom, 1);
        assert!(test.yates_corrected);
        assert!((test.statistic - 0.446428571).abs() < 1e-6);
        assert!((test.p_value - 0.504035866).abs() < 1e-6);
        assert_eq!(test.expected, vec![vec![12.0, 18.0], vec![28.0, 42.0]]);
    }

    #[test]
    fn two_by_two_uncorrected() {
        let table = ContingencyTable::from_counts(vec![vec![10, 20], vec![30, 40]]);
        let test = chi_square(&table, false).unwrap();
        assert!(!test.yates_corrected);
        assert!((test.statistic - 0.793650794).abs() < 1e-6);
        assert!((test.p_value - 0.372998484).abs() < 1e-6);
    }

    #[test]
    fn yates_does_not_overshoot_small_differences() {
        // Observed equals expected: the correction must not create a deviation
        let table = ContingencyTable::from_counts(vec![vec![5, 5], vec![5, 5]]);
        let test = chi_square(&table, true).unwrap();
        assert_eq!(test.statistic, 0.0);
        assert!((test.p_value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn dof_from_level_counts() {
        let (a, b) = columns_from_counts(&[&[4, 1], &[2, 6], &[3, 3]]);
        let table = ContingencyTable::crosstab(&a, &b).unwrap();
        let test = chi_square(&table, true).unwrap();
        assert_eq!(test.degrees_of_freedom, (3 - 1) * (2 - 1));
        assert!(!test.yates_corrected);
    }

    #[test]
    fn swapping_columns_gives_same_test() {
        let (a, b) = columns_from_counts(&[&[4, 1, 7], &[2, 6, 3]]);
        let ab = chi_square(&ContingencyTable::crosstab(&a, &b).unwrap(), true).unwrap();
        let ba = chi_square(&ContingencyTable::crosstab(&b, &a).unwrap(), true).unwrap();
        assert!((ab.statistic - ba.statistic).abs() < 1e-12);
        assert!((ab.p_value - ba.p_value).abs() < 1e-12);
        assert_eq!(ab.degrees_of_freedom, ba.degrees_of_freedom);

        let table = ContingencyTable::crosstab(&a, &b).unwrap();
        assert_eq!(table.transpose(), ContingencyTable::crosstab(&b, &a).unwrap());
    }

    #[test]
    fn single_category_is_rejected() {
        let a = cat("a", &["x", "x", "x"]);
        let b = cat("b", &["p", "q", "p"]);
        assert_eq!(
            ContingencyTable::crosstab(&a, &b),
            Err(StatError::InsufficientCategories { column: "a".into(), found: 1 })
        );
    }
}
