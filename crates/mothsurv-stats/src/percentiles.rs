//! Nearest-rank percentiles.

/// Computes a single percentile value from sorted data.
///
/// This function uses the nearest-rank method (also called "ordinary" percentile).
/// For a dataset with n values, the k-th percentile is the value at position
/// `floor(n * k / 100)`, clamped to the last value.
///
/// Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::percentiles::compute_percentile;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_percentile(&values, 50.0), 3.0);
/// assert_eq!(compute_percentile(&values, 25.0), 2.0);
/// assert_eq!(compute_percentile(&values, 100.0), 5.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let idx = ((sorted_values.len() as f64 * percentile) / 100.0) as usize;
    let idx = idx.min(sorted_values.len() - 1);
    sorted_values[idx]
}

/// The 25th, 50th and 75th percentiles of sorted data, `None` when empty.
///
/// ```
/// use mothsurv_stats::percentiles::quartile_cuts;
///
/// let values = [0.18, 0.20, 0.22, 0.25, 0.27, 0.30, 0.31, 0.35];
/// assert_eq!(quartile_cuts(&values), Some([0.22, 0.27, 0.31]));
/// assert_eq!(quartile_cuts(&[]), None);
/// ```
#[must_use]
pub fn quartile_cuts(sorted_values: &[f64]) -> Option<[f64; 3]> {
    if sorted_values.is_empty() {
        return None;
    }
    Some([25.0, 50.0, 75.0].map(|p| compute_percentile(sorted_values, p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_of_single_value() {
        assert_eq!(compute_percentile(&[4.2], 0.0), 4.2);
        assert_eq!(compute_percentile(&[4.2], 99.0), 4.2);
        assert_eq!(quartile_cuts(&[4.2]), Some([4.2; 3]));
    }

    #[test]
    fn test_empty_percentile_is_nan() {
        assert!(compute_percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_cuts_are_ordered() {
        let values = (0..37).map(f64::from).collect::<Vec<_>>();
        let [q1, q2, q3] = quartile_cuts(&values).unwrap();
        assert!(q1 <= q2 && q2 <= q3);
        assert_eq!(q2, 18.0);
    }
}
