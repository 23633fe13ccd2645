use crate::distribution;

/// Kaplan-Meier survival curve for survival analysis.
///
/// The Kaplan-Meier estimator is a non-parametric statistic used to estimate the survival
/// function from lifetime data. It accounts for censored data (observations where the event
/// of interest has not occurred by the end of the study period).
///
/// # Fields
///
/// The curve stores parallel vectors representing the survival function at discrete time points:
/// - Time points where events occurred
/// - Survival probability at each time point
/// - Number of subjects at risk at each time point
/// - Number of events (non-censored observations) at each time point
/// - Greenwood standard error of the survival probability
#[derive(Debug, Clone, serde::Serialize)]
pub struct KaplanMeierCurve {
    /// Time points where events (non-censored observations) occurred.
    pub times: Vec<f64>,
    /// Survival probability at each corresponding time point.
    /// Values range from 0.0 (no survival) to 1.0 (complete survival).
    pub survival_prob: Vec<f64>,
    /// Number of subjects at risk (not yet experienced the event or censored) at each time point.
    pub at_risk: Vec<usize>,
    /// Number of events (non-censored observations) that occurred at each time point.
    pub events: Vec<usize>,
    /// Greenwood standard error of `survival_prob` at each time point.
    pub std_err: Vec<f64>,
}

/// Pointwise confidence band of a [`KaplanMeierCurve`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfidenceBand {
    pub conf_level: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl KaplanMeierCurve {
    /// Computes the Kaplan-Meier survival curve from survival data.
    ///
    /// # Arguments
    ///
    /// * `data` - A vector of tuples where each tuple contains:
    ///   - `time`: The time at which the observation occurred
    ///   - `is_censored`: `true` if the observation was censored (event did not occur),
    ///     `false` if the event occurred
    ///
    /// # Examples
    ///
    /// ```
    /// # use mothsurv_stats::survival::KaplanMeierCurve;
    /// // Data: (time, is_censored)
    /// let data = vec![
    ///     (1.5, false), // Event at time 1.5
    ///     (2.0, true),  // Censored at time 2.0
    ///     (3.5, false), // Event at time 3.5
    /// ];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.times, vec![1.5, 3.5]);
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(mut data: Vec<(f64, bool)>) -> Self {
        let mut curve = Self {
            times: vec![],
            survival_prob: vec![],
            at_risk: vec![],
            events: vec![],
            std_err: vec![],
        };
        if data.is_empty() {
            return curve;
        }

        data.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut current_survival = 1.0;
        let mut greenwood_sum = 0.0;
        let total = data.len();

        let mut i = 0;
        while i < data.len() {
            let current_time = data[i].0;
            let at_risk = total - i;

            // Count events (non-censored) at this time point
            let mut event_count = 0;
            let mut j = i;
            while j < data.len() && data[j].0 == current_time {
                if !data[j].1 {
                    event_count += 1;
                }
                j += 1;
            }

            if event_count > 0 {
                let n = at_risk as f64;
                let d = event_count as f64;
                current_survival *= 1.0 - d / n;
                greenwood_sum += if at_risk > event_count {
                    d / (n * (n - d))
                } else {
                    f64::INFINITY
                };

                curve.times.push(current_time);
                curve.survival_prob.push(current_survival);
                curve.at_risk.push(at_risk);
                curve.events.push(event_count);
                curve.std_err.push(if current_survival > 0.0 {
                    current_survival * greenwood_sum.sqrt()
                } else {
                    0.0
                });
            }

            i = j;
        }

        curve
    }

    /// Returns the median survival time.
    ///
    /// The median survival time is the earliest event time at which the
    /// survival probability drops to or below 50%. If the survival probability
    /// never reaches 50%, this method returns `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mothsurv_stats::survival::KaplanMeierCurve;
    /// let data = vec![(1.0, false), (2.0, false), (3.0, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    /// assert_eq!(curve.median_survival(), Some(2.0));
    /// ```
    #[must_use]
    pub fn median_survival(&self) -> Option<f64> {
        self.times
            .iter()
            .zip(&self.survival_prob)
            .find(|(_, s)| **s <= 0.5)
            .map(|(t, _)| *t)
    }

    /// Returns the survival probability at a specific time.
    ///
    /// This method uses a step function: the survival probability remains constant
    /// between event times and decreases only when an event occurs.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mothsurv_stats::survival::KaplanMeierCurve;
    /// let data = vec![(10.0, false), (20.0, false)];
    /// let curve = KaplanMeierCurve::from_data(data);
    ///
    /// assert_eq!(curve.survival_at(5.0), 1.0);  // Before first event
    /// assert!(curve.survival_at(15.0) < 1.0);   // After first event
    /// ```
    #[must_use]
    pub fn survival_at(&self, time: f64) -> f64 {
        // Find the last time point <= target time
        for i in (0..self.times.len()).rev() {
            if self.times[i] <= time {
                return self.survival_prob[i];
            }
        }
        1.0
    }

    /// Survival probability just before `time` (left-continuous version).
    #[must_use]
    pub fn survival_before(&self, time: f64) -> f64 {
        for i in (0..self.times.len()).rev() {
            if self.times[i] < time {
                return self.survival_prob[i];
            }
        }
        1.0
    }

    /// Pointwise log-log confidence band, `S^exp(±z·se/(S·|ln S|))`.
    ///
    /// The limits always stay inside `[0, 1]`. Where `S` is 0 or 1 the band
    /// collapses onto the estimate.
    ///
    /// ```
    /// use mothsurv_stats::survival::KaplanMeierCurve;
    ///
    /// let curve = KaplanMeierCurve::from_data((1..=10).map(|t| (f64::from(t), false)).collect());
    /// let band = curve.confidence_band(0.95);
    /// assert!((band.lower[1] - 0.4087).abs() < 1e-4);
    /// assert!((band.upper[1] - 0.9459).abs() < 1e-4);
    /// ```
    #[must_use]
    pub fn confidence_band(&self, conf_level: f64) -> ConfidenceBand {
        let z = distribution::normal_critical_value(conf_level);
        let (lower, upper) = self
            .survival_prob
            .iter()
            .zip(&self.std_err)
            .map(|(&s, &se)| {
                if s <= 0.0 || s >= 1.0 {
                    return (s, s);
                }
                let log_log_se = se / (s * s.ln().abs());
                if !log_log_se.is_finite() {
                    return (0.0, 1.0);
                }
                (
                    s.powf((z * log_log_se).exp()),
                    s.powf((-z * log_log_se).exp()),
                )
            })
            .unzip();
        ConfidenceBand {
            conf_level,
            lower,
            upper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_curve() {
        let curve = KaplanMeierCurve::from_data(vec![]);
        assert!(curve.times.is_empty());
        assert_eq!(curve.median_survival(), None);
        assert_eq!(curve.survival_at(3.0), 1.0);
    }

    #[test]
    fn test_censoring_shrinks_risk_set() {
        // 6 subjects: events at 1, 2, 4; censored at 2, 3, 5
        let data = vec![
            (1.0, false),
            (2.0, false),
            (2.0, true),
            (3.0, true),
            (4.0, false),
            (5.0, true),
        ];
        let curve = KaplanMeierCurve::from_data(data);
        assert_eq!(curve.times, vec![1.0, 2.0, 4.0]);
        assert_eq!(curve.at_risk, vec![6, 5, 2]);
        let expected = [5.0 / 6.0, 5.0 / 6.0 * 4.0 / 5.0, 5.0 / 6.0 * 4.0 / 5.0 * 0.5];
        for (got, want) in curve.survival_prob.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(curve.median_survival(), Some(4.0));
    }

    #[test]
    fn test_greenwood_standard_error() {
        let data = vec![(1.0, false), (2.0, false), (3.0, false), (4.0, false)];
        let curve = KaplanMeierCurve::from_data(data);
        // S(1) = 0.75, var = 0.75^2 * 1/(4*3)
        let expected = 0.75 * (1.0_f64 / 12.0).sqrt();
        assert!((curve.std_err[0] - expected).abs() < 1e-12);
        // all died: last point has zero survival and zero se
        assert_eq!(curve.survival_prob[3], 0.0);
        assert_eq!(curve.std_err[3], 0.0);
    }

    #[test]
    fn test_confidence_band_contains_estimate() {
        let data = (1..=20)
            .map(|t| (f64::from(t) * 0.5, t % 3 == 0))
            .collect::<Vec<_>>();
        let curve = KaplanMeierCurve::from_data(data);
        let band = curve.confidence_band(0.95);
        for ((s, lo), hi) in curve.survival_prob.iter().zip(&band.lower).zip(&band.upper) {
            assert!(*lo <= *s && *s <= *hi);
        }
    }

    #[test]
    fn test_log_log_band_values() {
        // S(2) = 0.8, Greenwood var = 0.64 * (1/90 + 1/72) = 0.016
        let data = (1..=10).map(|t| (f64::from(t), false)).collect();
        let curve = KaplanMeierCurve::from_data(data);
        let band = curve.confidence_band(0.95);
        assert!((curve.survival_prob[1] - 0.8).abs() < 1e-12);
        assert!((band.lower[1] - 0.408_69).abs() < 1e-4, "{}", band.lower[1]);
        assert!((band.upper[1] - 0.945_87).abs() < 1e-4, "{}", band.upper[1]);
        // everyone dead: the band collapses at zero
        assert_eq!(band.lower[9], 0.0);
        assert_eq!(band.upper[9], 0.0);
        // the band is asymmetric around S on the probability scale
        assert!(0.8 - band.lower[1] > band.upper[1] - 0.8);
    }

    #[test]
    fn test_left_continuous_lookup() {
        let curve = KaplanMeierCurve::from_data(vec![(1.0, false), (2.0, false)]);
        assert_eq!(curve.survival_before(1.0), 1.0);
        assert_eq!(curve.survival_at(1.0), 0.5);
        assert_eq!(curve.survival_before(2.0), 0.5);
    }
}
