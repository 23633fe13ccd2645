//! Reference distributions used for confidence intervals and test p-values.
//!
//! Thin wrappers around [`statrs`] that return plain `f64` values and never
//! panic: parameters outside the valid domain yield `NaN` p-values instead.

use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal};

/// Two-sided critical value of the standard normal distribution.
///
/// For `conf_level = 0.95` this is approximately `1.959964`.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::distribution::normal_critical_value;
///
/// let z = normal_critical_value(0.95);
/// assert!((z - 1.959964).abs() < 1e-5);
/// ```
#[must_use]
pub fn normal_critical_value(conf_level: f64) -> f64 {
    if !(conf_level > 0.0 && conf_level < 1.0) {
        return f64::NAN;
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.inverse_cdf(1.0 - (1.0 - conf_level) / 2.0),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value for a standard normal test statistic.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::distribution::normal_two_sided_p;
///
/// assert!((normal_two_sided_p(1.959964) - 0.05).abs() < 1e-6);
/// assert_eq!(normal_two_sided_p(0.0), 1.0);
/// ```
#[must_use]
pub fn normal_two_sided_p(z: f64) -> f64 {
    if !z.is_finite() {
        return if z.is_nan() { f64::NAN } else { 0.0 };
    }
    match Normal::new(0.0, 1.0) {
        Ok(normal) => (2.0 * normal.sf(z.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Upper tail probability `P(X > x)` of a chi-squared distribution.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::distribution::chi_squared_sf;
///
/// assert!((chi_squared_sf(3.841459, 1.0) - 0.05).abs() < 1e-6);
/// assert_eq!(chi_squared_sf(0.0, 2.0), 1.0);
/// ```
#[must_use]
pub fn chi_squared_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    match ChiSquared::new(df) {
        Ok(chi2) => chi2.sf(x),
        Err(_) => f64::NAN,
    }
}

/// Upper tail probability `P(X > f)` of an F distribution.
#[must_use]
pub fn f_sf(f: f64, df_num: f64, df_den: f64) -> f64 {
    if f <= 0.0 {
        return 1.0;
    }
    if !f.is_finite() {
        return 0.0;
    }
    match FisherSnedecor::new(df_num, df_den) {
        Ok(dist) => dist.sf(f),
        Err(_) => f64::NAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_values() {
        assert!((normal_critical_value(0.90) - 1.644_854).abs() < 1e-5);
        assert!((normal_critical_value(0.99) - 2.575_829).abs() < 1e-5);
        assert!(normal_critical_value(1.0).is_nan());
        assert!(normal_critical_value(0.0).is_nan());
    }

    #[test]
    fn test_normal_p_is_symmetric() {
        let p_pos = normal_two_sided_p(2.3);
        let p_neg = normal_two_sided_p(-2.3);
        assert!((p_pos - p_neg).abs() < 1e-12);
        assert_eq!(normal_two_sided_p(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_f_sf() {
        // F(1, 10) critical value at alpha = 0.05 is 4.964603
        assert!((f_sf(4.964_603, 1.0, 10.0) - 0.05).abs() < 1e-5);
        assert_eq!(f_sf(0.0, 2.0, 10.0), 1.0);
        assert_eq!(f_sf(f64::INFINITY, 2.0, 10.0), 0.0);
    }

    #[test]
    fn test_chi_squared_invalid_df() {
        assert!(chi_squared_sf(1.0, 0.0).is_nan());
    }
}
