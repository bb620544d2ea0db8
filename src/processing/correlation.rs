use crate::data::dataset::Column;
use crate::processing::error::{finite, StatError};

/// Pearson correlation over the rows where both columns have a value.
///
/// Means and co-moments are accumulated in one Welford-style pass. A column
/// with zero variance across the complete pairs leaves the coefficient
/// undefined, which is reported as a computation error.
pub fn pearson(a: &Column, b: &Column) -> Result<f64, StatError> {
    let (xs, ys) = match (a.as_numeric(), b.as_numeric()) {
        (Some(xs), Some(ys)) => (xs, ys),
        _ => return Err(StatError::Computation("correlation needs numeric columns".into())),
    };

    let mut n = 0usize;
    let (mut mean_x, mut mean_y) = (0.0f64, 0.0f64);
    let (mut sxx, mut syy, mut sxy) = (0.0f64, 0.0f64, 0.0f64);

    for (x, y) in xs.iter().zip(ys.iter()) {
        let (Some(x), Some(y)) = (x, y) else { continue };
        n += 1;
        let dx = x - mean_x;
        mean_x += dx / n as f64;
        let dy = y - mean_y;
        mean_y += dy / n as f64;
        sxx += dx * (x - mean_x);
        syy += dy * (y - mean_y);
        sxy += dx * (y - mean_y);
    }

    if n < 2 {
        return Err(StatError::InsufficientData { needed: 2, found: n });
    }

    for (name, spread) in [(a.name(), sxx), (b.name(), syy)] {
        if spread == 0.0 {
            return Err(StatError::Computation(format!(
                "correlation is undefined: column '{name}' is constant"
            )));
        }
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    // Rounding can push |r| a hair past 1
    finite(r, "correlation").map(|r| r.clamp(-1.0, 1.0))
}
