//! Kaplan-Meier survival by group
//!
//! Non-parametric survival curves of the adult lifespan, computed per group of
//! subjects. The grouping key is arbitrary: the full treatment cell, one
//! factor, or anything else derived from a [`SurvivalSubject`].
//!
//! Durations used here are the effective durations of the interval dataset,
//! so zero-duration subjects promoted to half a day are counted at 0.5 days
//! and excluded ones are absent. Every subject died, so there is no
//! censoring in lab data; the curves still handle it for generality.
//!
//! # Examples
//!
//! ```
//! use mothsurv_analysis::{
//!     duration::survival_subjects,
//!     interval::{IntervalDataset, ZeroDurationPolicy},
//!     simulate::{SimulationConfig, simulate},
//!     survival::{SurvivalStatsMap, TreatmentGroup},
//! };
//! use rand::SeedableRng;
//!
//! let dataset = simulate(&SimulationConfig::default(), &mut rand_pcg::Pcg64::seed_from_u64(1));
//! let intervals = IntervalDataset::from_subjects(&survival_subjects(&dataset), ZeroDurationPolicy::HalfDay);
//!
//! let by_cell = SurvivalStatsMap::collect_by_group(&intervals, TreatmentGroup::of);
//! assert_eq!(by_cell.map.len(), 24);
//! for (group, stats) in &by_cell.map {
//!     assert!(stats.median_km.is_some(), "{group}");
//! }
//! ```

use std::{collections::BTreeMap, fmt, io};

use serde::Serialize;

use mothsurv_stats::survival::KaplanMeierCurve;

use crate::{
    duration::SurvivalSubject,
    interval::IntervalDataset,
    record::{Sex, Temperature},
    terms::Covariates,
};

/// Survival statistics for one group of subjects.
#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStats {
    pub subjects_count: usize,
    pub censored_count: usize,
    /// Mean duration over all subjects in days.
    pub mean_days: f64,
    /// Kaplan-Meier median survival in days.
    pub median_km: Option<f64>,
    pub km_curve: KaplanMeierCurve,
}

impl SurvivalStats {
    /// Computes statistics from `(duration, is_censored)` pairs.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_data(data: &[(f64, bool)]) -> Self {
        let subjects_count = data.len();
        let censored_count = data.iter().filter(|(_, c)| *c).count();
        let mean_days = if data.is_empty() {
            0.0
        } else {
            data.iter().map(|(t, _)| t).sum::<f64>() / data.len() as f64
        };
        let km_curve = KaplanMeierCurve::from_data(data.to_vec());
        let median_km = km_curve.median_survival();
        Self {
            subjects_count,
            censored_count,
            mean_days,
            median_km,
            km_curve,
        }
    }
}

/// Full treatment cell: sex × acclimation × exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TreatmentGroup {
    pub sex: Sex,
    pub acclimation: Temperature,
    pub exposure: Temperature,
}

impl TreatmentGroup {
    #[must_use]
    pub fn of<R>(record: &R) -> Self
    where
        R: Covariates,
    {
        Self {
            sex: record.sex(),
            acclimation: record.acclimation(),
            exposure: record.exposure(),
        }
    }
}

impl fmt::Display for TreatmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} acc={} exp={}", self.sex, self.acclimation, self.exposure)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SurvivalStatsMap<K>
where
    K: Ord,
{
    pub map: BTreeMap<K, SurvivalStats>,
}

impl<K> SurvivalStatsMap<K>
where
    K: Ord,
{
    /// Groups subjects by `group` and computes Kaplan-Meier statistics per group.
    pub fn collect_by_group<F>(dataset: &IntervalDataset, mut group: F) -> Self
    where
        F: FnMut(&SurvivalSubject) -> K,
    {
        let mut data_map: BTreeMap<K, Vec<(f64, bool)>> = BTreeMap::new();
        let survival_data = dataset.survival_data();
        for (subject, observation) in dataset.subjects().iter().zip(survival_data) {
            data_map.entry(group(subject)).or_default().push(observation);
        }

        Self {
            map: data_map
                .into_iter()
                .map(|(key, data)| (key, SurvivalStats::from_data(&data)))
                .collect(),
        }
    }

    /// Writes every group's curve as plot-ready CSV rows:
    /// `group,time,at_risk,events,survival,std_err,lower,upper`.
    ///
    /// Each curve starts with a `time = 0, survival = 1` row.
    pub fn write_curves_csv<W>(&self, writer: W, conf_level: f64) -> Result<(), csv::Error>
    where
        W: io::Write,
        K: fmt::Display,
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record([
            "group", "time", "at_risk", "events", "survival", "std_err", "lower", "upper",
        ])?;
        for (key, stats) in &self.map {
            let group = key.to_string();
            let curve = &stats.km_curve;
            writer.write_record([
                group.clone(),
                "0".to_owned(),
                stats.subjects_count.to_string(),
                "0".to_owned(),
                "1".to_owned(),
                "0".to_owned(),
                "1".to_owned(),
                "1".to_owned(),
            ])?;
            let band = curve.confidence_band(conf_level);
            for i in 0..curve.times.len() {
                writer.write_record([
                    group.clone(),
                    curve.times[i].to_string(),
                    curve.at_risk[i].to_string(),
                    curve.events[i].to_string(),
                    format!("{:.6}", curve.survival_prob[i]),
                    format!("{:.6}", curve.std_err[i]),
                    format!("{:.6}", band.lower[i]),
                    format!("{:.6}", band.upper[i]),
                ])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
