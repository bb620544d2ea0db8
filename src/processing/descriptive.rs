use serde::Serialize;
use std::collections::HashMap;

use crate::data::dataset::{CellValue, Column, ColumnData};
use crate::processing::error::{finite, StatError};

/// Running mean and sum of squared deviations (Welford 1962).
#[derive(Debug, Clone, Copy, Default)]
pub struct Welford {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Welford {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (n - 1 denominator).
    pub fn sample_variance(&self) -> Option<f64> {
        (self.count > 1).then(|| self.m2 / (self.count - 1) as f64)
    }
}

impl FromIterator<f64> for Welford {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut acc = Welford::new();
        for x in iter {
            acc.update(x);
        }
        acc
    }
}

/// Neumaier compensated summation.
pub fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0f64;
    let mut comp = 0.0f64;
    for &x in values {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            comp += (sum - t) + x;
        } else {
            comp += (x - t) + sum;
        }
        sum = t;
    }
    sum + comp
}

fn numbers(column: &Column) -> Vec<f64> {
    column.present_numbers()
}

pub fn mean(column: &Column) -> Result<f64, StatError> {
    let vals = numbers(column);
    if vals.is_empty() {
        return Err(StatError::EmptyColumn { column: column.name().to_string() });
    }
    finite(compensated_sum(&vals) / vals.len() as f64, "mean")
}

pub fn median(column: &Column) -> Result<f64, StatError> {
    let mut vals = numbers(column);
    if vals.is_empty() {
        return Err(StatError::EmptyColumn { column: column.name().to_string() });
    }
    vals.sort_by(f64::total_cmp);
    let count = vals.len();
    let median = if count % 2 == 0 {
        // Halve first so two huge middle values don't overflow
        vals[count / 2 - 1] / 2.0 + vals[count / 2] / 2.0
    } else {
        vals[count / 2]
    };
    finite(median, "median")
}

/// Most frequent non-missing value. Ties go to the value that appears first.
pub fn mode(column: &Column) -> Result<CellValue, StatError> {
    let winner = match column.data() {
        ColumnData::Numeric(values) => {
            // Keyed on bit patterns; fold -0.0 into 0.0 so they count together
            let present = values.iter().flatten().map(|v| if *v == 0.0 { 0.0 } else { *v });
            most_frequent(present, |v: &f64| v.to_bits()).map(CellValue::Number)
        }
        ColumnData::Categorical(values) => {
            most_frequent(values.iter().flatten(), |s| s.clone())
                .map(|s| CellValue::Text(s.clone()))
        }
    };
    winner.ok_or_else(|| StatError::EmptyColumn { column: column.name().to_string() })
}

fn most_frequent<T, K, I, F>(values: I, key: F) -> Option<T>
where
    I: Iterator<Item = T>,
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    // key -> (count, first position)
    let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
    let mut firsts: Vec<T> = Vec::new();
    for value in values {
        let entry = counts.entry(key(&value)).or_insert_with(|| {
            firsts.push(value);
            (0, firsts.len() - 1)
        });
        entry.0 += 1;
    }

    let (_, best_pos) = counts.into_values()
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))?;
    firsts.into_iter().nth(best_pos)
}

pub fn variance(column: &Column) -> Result<f64, StatError> {
    let acc: Welford = numbers(column).into_iter().collect();
    let var = acc.sample_variance().ok_or(StatError::InsufficientData {
        needed: 2,
        found: acc.count(),
    })?;
    finite(var, "variance")
}

pub fn std_dev(column: &Column) -> Result<f64, StatError> {
    variance(column).map(f64::sqrt)
}

/// Summary of one numeric column.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std_dev: Option<f64>,
}

impl ColumnSummary {
    pub fn compute(column: &Column) -> Result<Self, StatError> {
        let vals = numbers(column);
        if vals.is_empty() {
            return Err(StatError::EmptyColumn { column: column.name().to_string() });
        }

        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let std_dev = match std_dev(column) {
            Ok(s) => Some(s),
            Err(StatError::InsufficientData { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(ColumnSummary {
            column: column.name().to_string(),
            count: vals.len(),
            missing: column.missing_count(),
            min,
            max,
            range: finite(max - min, "range")?,
            mean: mean(column)?,
            median: median(column)?,
            std_dev,
        })
    }

    /// Format as a multi-line report string.
    pub fn report(&self) -> String {
        let std_dev = self.std_dev
            .map(|s| format!("{s:.3}"))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{}:\n  Count: {}\n  Missing: {}\n  Min: {:.3}\n  Max: {:.3}\n  Range: {:.3}\n  Mean: {:.3}\n  Median: {:.3}\n  Std Dev: {}\n",
            self.column, self.count, self.missing, self.min, self.max, self.range, self.mean, self.median, std_dev
        )
    }
}
