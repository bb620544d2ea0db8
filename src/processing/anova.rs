use serde::Serialize;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::collections::HashMap;

use crate::data::dataset::Column;
use crate::processing::descriptive::Welford;
use crate::processing::error::{finite, StatError};

/// Outcome of a one-way analysis of variance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTest {
    pub f_statistic: f64,
    pub df_between: usize,
    pub df_within: usize,
    pub p_value: f64,
    /// Factor levels that contributed a group, in order of first appearance.
    pub groups: Vec<String>,
}

/// Group response values by factor level, dropping missing cells.
/// Levels whose responses are all missing do not form a group.
pub fn group_by_factor(response: &Column, factor: &Column) -> Result<Vec<(String, Vec<f64>)>, StatError> {
    let (values, levels) = match (response.as_numeric(), factor.as_categorical()) {
        (Some(v), Some(l)) => (v, l),
        _ => {
            return Err(StatError::Computation(
                "ANOVA needs a numeric response and a categorical factor".into(),
            ))
        }
    };

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<f64>)> = Vec::new();
    for (value, level) in values.iter().zip(levels.iter()) {
        let (Some(value), Some(level)) = (value, level) else { continue };
        let slot = *index.entry(level.as_str()).or_insert_with(|| {
            groups.push((level.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(*value);
    }
    Ok(groups)
}

/// One-way ANOVA over already-grouped samples.
///
/// Needs at least two non-empty groups and more observations than groups.
/// With no between-group spread the result is F = 0, p = 1; with no
/// within-group spread but some between-group spread it is F = inf, p = 0.
pub fn one_way(groups: &[(String, Vec<f64>)]) -> Result<AnovaTest, StatError> {
    let groups: Vec<&(String, Vec<f64>)> = groups.iter()
        .filter(|(_, v)| !v.is_empty())
        .collect();

    let k = groups.len();
    if k < 2 {
        return Err(StatError::InsufficientGroups { found: k });
    }

    let stats: Vec<Welford> = groups.iter()
        .map(|(_, v)| v.iter().copied().collect())
        .collect();
    let n: usize = stats.iter().map(Welford::count).sum();
    if n <= k {
        return Err(StatError::InsufficientData { needed: k + 1, found: n });
    }

    let grand: Welford = groups.iter()
        .flat_map(|(_, v)| v.iter().copied())
        .collect();
    let grand_mean = grand.mean().unwrap_or(0.0);

    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for acc in &stats {
        let mean = acc.mean().unwrap_or(grand_mean);
        ss_between += acc.count() as f64 * (mean - grand_mean).powi(2);
        ss_within += acc.sample_variance().unwrap_or(0.0) * (acc.count() - 1) as f64;
    }
    let ss_between = finite(ss_between, "between-group sum of squares")?;
    let ss_within = finite(ss_within, "within-group sum of squares")?;

    let df_between = k - 1;
    let df_within = n - k;

    // Between-group spread at the level of rounding in the group means, or a
    // negligible share of the total, counts as none
    let magnitude = groups.iter()
        .flat_map(|(_, v)| v.iter())
        .fold(0.0f64, |m, x| m.max(x.abs()));
    let mean_noise = n as f64 * (4.0 * f64::EPSILON * magnitude).powi(2);
    let cutoff = mean_noise.max(f64::EPSILON * (ss_between + ss_within));
    let (f_statistic, p_value) = if ss_between <= cutoff {
        (0.0, 1.0)
    } else if ss_within == 0.0 {
        (f64::INFINITY, 0.0)
    } else {
        let f = (ss_between / df_between as f64) / (ss_within / df_within as f64);
        let dist = FisherSnedecor::new(df_between as f64, df_within as f64)
            .map_err(|e| StatError::Computation(e.to_string()))?;
        (f, dist.sf(f))
    };

    tracing::debug!(f_statistic, df_between, df_within, p_value, "One-way ANOVA");
    Ok(AnovaTest {
        f_statistic,
        df_between,
        df_within,
        p_value,
        groups: groups.iter().map(|(name, _)| name.clone()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(data: &[(&str, Vec<f64>)]) -> Vec<(String, Vec<f64>)> {
        data.iter().map(|(n, v)| (n.to_string(), v.clone())).collect()
    }

    #[test]
    fn separated_groups() {
        let test = one_way(&groups(&[("a", vec![1.0, 2.0, 3.0]), ("b", vec![4.0, 5.0, 6.0])])).unwrap();
        assert_eq!((test.df_between, test.df_within), (1, 4));
        // SSB = 13.5, SSW = 4
        assert!((test.f_statistic - 13.5).abs() < 1e-9);
        assert!((test.p_value - 0.021311641).abs() < 1e-6);
    }

    #[test]
    fn identical_groups_have_no_effect() {
        let test = one_way(&groups(&[("a", vec![1.0, 2.0, 3.0]), ("b", vec![3.0, 2.0, 1.0])])).unwrap();
        assert_eq!(test.f_statistic, 0.0);
        assert_eq!(test.p_value, 1.0);

        let flat = one_way(&groups(&[("a", vec![5.0, 5.0]), ("b", vec![5.0, 5.0])])).unwrap();
        assert_eq!(flat.f_statistic, 0.0);
        assert_eq!(flat.p_value, 1.0);
    }

    #[test]
    fn large_offset_keeps_the_effect() {
        let base = 1.7e9;
        let test = one_way(&groups(&[
            ("early", vec![base, base + 1.0, base + 2.0]),
            ("late", vec![base + 10.0, base + 11.0, base + 12.0]),
        ]))
        .unwrap();
        // SSB = 150, SSW = 4, df = (1, 4)
        assert!((test.f_statistic - 150.0).abs() < 1e-6, "F = {}", test.f_statistic);
        assert!(test.p_value < 1e-3);

        let same = one_way(&groups(&[
            ("early", vec![base + 1.0, base + 2.0, base + 3.0]),
            ("late", vec![base + 3.0, base + 2.0, base + 1.0]),
        ]))
        .unwrap();
        assert_eq!(same.f_statistic, 0.0);
        assert_eq!(same.p_value, 1.0);
    }

    #[test]
    fn no_within_spread() {
        let test = one_way(&groups(&[("a", vec![1.0, 1.0]), ("b", vec![2.0, 2.0])])).unwrap();
        assert!(test.f_statistic.is_infinite());
        assert_eq!(test.p_value, 0.0);
    }

    #[test]
    fn one_group_is_rejected() {
        let err = one_way(&groups(&[("a", vec![1.0, 2.0]), ("b", vec![])])).unwrap_err();
        assert_eq!(err, StatError::InsufficientGroups { found: 1 });
    }

    #[test]
    fn needs_within_group_freedom() {
        let err = one_way(&groups(&[("a", vec![1.0]), ("b", vec![2.0])])).unwrap_err();
        assert_eq!(err, StatError::InsufficientData { needed: 3, found: 2 });
    }

    #[test]
    fn grouping_drops_missing() {
        let response = Column::numeric("price", vec![Some(1.0), None, Some(3.0), Some(4.0), Some(9.0)]);
        let factor = Column::categorical(
            "model",
            vec![Some("x".into()), Some("y".into()), Some("x".into()), None, Some("z".into())],
        );
        let grouped = group_by_factor(&response, &factor).unwrap();
        assert_eq!(grouped, vec![("x".to_string(), vec![1.0, 3.0]), ("z".to_string(), vec![9.0])]);
    }
}
