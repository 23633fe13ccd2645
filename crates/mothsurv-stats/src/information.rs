//! Information criteria for comparing fitted models.
//!
//! Lower is better for every criterion here. The small-sample corrected AIC
//! (AICc) adds a penalty that vanishes as `n / k` grows, and is undefined when
//! `n <= k + 1`.

#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("AICc undefined: sample size {n} must exceed parameter count {k} + 1")]
pub struct InsufficientSampleError {
    pub n: usize,
    pub k: usize,
}

/// Akaike information criterion `-2 logL + 2k`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn aic(log_likelihood: f64, k: usize) -> f64 {
    -2.0 * log_likelihood + 2.0 * k as f64
}

/// Small-sample corrected AIC: `AIC + 2k(k+1) / (n - k - 1)`.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::information::{aic, aicc};
///
/// let ll = -120.0;
/// let corrected = aicc(ll, 3, 50).unwrap();
/// assert!(corrected > aic(ll, 3));
/// assert!(aicc(ll, 3, 4).is_err());
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn aicc(log_likelihood: f64, k: usize, n: usize) -> Result<f64, InsufficientSampleError> {
    if n <= k + 1 {
        return Err(InsufficientSampleError { n, k });
    }
    let kf = k as f64;
    let correction = 2.0 * kf * (kf + 1.0) / (n - k - 1) as f64;
    Ok(aic(log_likelihood, k) + correction)
}

/// Bayesian information criterion `-2 logL + k ln(n)`.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn bic(log_likelihood: f64, k: usize, n: usize) -> f64 {
    -2.0 * log_likelihood + k as f64 * (n as f64).ln()
}

/// Akaike weights `exp(-Δ/2) / Σ exp(-Δ/2)` for a set of criterion values.
///
/// Returns an empty vector for empty input.
///
/// # Examples
///
/// ```
/// use mothsurv_stats::information::akaike_weights;
///
/// let w = akaike_weights(&[100.0, 100.0]);
/// assert!((w[0] - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn akaike_weights(scores: &[f64]) -> Vec<f64> {
    let Some(min) = scores.iter().copied().min_by(f64::total_cmp) else {
        return vec![];
    };
    let raw = scores
        .iter()
        .map(|s| (-(s - min) / 2.0).exp())
        .collect::<Vec<_>>();
    let total = raw.iter().sum::<f64>();
    raw.into_iter().map(|r| r / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aicc_correction() {
        // k = 2, n = 10: correction = 2*2*3 / 7
        let value = aicc(-10.0, 2, 10).unwrap();
        assert!((value - (20.0 + 4.0 + 12.0 / 7.0)).abs() < 1e-12);
    }

    #[test]
    fn test_aicc_rejects_small_samples() {
        assert_eq!(aicc(-1.0, 5, 6), Err(InsufficientSampleError { n: 6, k: 5 }));
    }

    #[test]
    fn test_weights_sum_to_one() {
        let w = akaike_weights(&[210.3, 204.1, 207.9, 230.0]);
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        let best = w
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(best, Some(1));
    }

    #[test]
    fn test_bic() {
        assert!((bic(-5.0, 2, 100) - (10.0 + 2.0 * 100.0_f64.ln())).abs() < 1e-12);
    }
}
