//! Residual diagnostics of a fitted Cox model
//!
//! # Martingale residuals
//!
//! For subject `i` the martingale residual is `δ_i − Ĥ_i`: the death indicator
//! minus the cumulative hazard accumulated over the subject's intervals, using
//! the Breslow baseline hazard scaled by `exp(xβ)`. Residuals sum to zero.
//! Their mean per covariate level, and their trend against pupal mass (not in
//! any model), show whether a covariate's functional form is adequate.
//!
//! # Proportional hazards
//!
//! The Grambsch-Therneau test regresses scaled Schoenfeld residuals on a
//! transform `g(t)` of the death time. With `r_k` the Schoenfeld residual of
//! death `k`, `V` the coefficient covariance, `d` the number of deaths and
//! `S = Σ (g_k − ḡ)²`:
//!
//! ```text
//! u     = Σ (g_k − ḡ) r_k
//! T_j   = d · (V u)_j² / (V_jj · S)     1 df per coefficient
//! T     = d · uᵀ V u / S                p df globally
//! ```
//!
//! Large statistics mean the effect changes over time. Schoenfeld residuals
//! use the risk-set mean without the Efron tie correction.

use std::{fmt, io};

use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

use mothsurv_stats::{
    descriptive::pearson_correlation,
    distribution::chi_squared_sf,
    linalg::quadratic_form,
    percentiles::quartile_cuts,
    survival::KaplanMeierCurve,
};

use crate::{
    cox::{CoxFit, RiskSets},
    interval::IntervalDataset,
    record::{Sex, Temperature},
};

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum DiagnosticsError {
    #[display("fit has {fit} subjects but the data have {data}")]
    SubjectMismatch { fit: usize, data: usize },
    #[display("proportional-hazards test needs at least two distinct death times")]
    ConstantTime,
}

/// Time scale against which Schoenfeld residuals are tested.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize)]
pub enum TimeTransform {
    /// `1 − S(t−)` of the pooled Kaplan-Meier curve.
    #[default]
    Km,
    /// Rank of the death time, ties averaged.
    Rank,
    Identity,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticsOptions {
    pub time_transform: TimeTransform,
}

/// Mean martingale residual of one group of subjects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualGroup {
    pub label: String,
    pub n: usize,
    pub mean_residual: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinearityCheck {
    pub by_sex: Vec<ResidualGroup>,
    pub by_acclimation: Vec<ResidualGroup>,
    pub by_exposure: Vec<ResidualGroup>,
    /// Quartile bins of pupal mass; subjects without a mass are left out.
    pub by_pupal_mass: Vec<ResidualGroup>,
    /// Pearson correlation of residuals with pupal mass.
    pub pupal_mass_correlation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhTermTest {
    pub term: String,
    /// Correlation of transformed time with the scaled residuals; `None` for
    /// the global row and for constant residuals.
    pub rho: Option<f64>,
    pub chi_sq: f64,
    pub df: usize,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhTest {
    pub transform: TimeTransform,
    pub terms: Vec<PhTermTest>,
    pub global: PhTermTest,
}

/// Scaled Schoenfeld residuals, one row per death, for plotting against time.
#[derive(Debug, Clone)]
pub struct ScaledSchoenfeld {
    pub column_names: Vec<String>,
    pub times: Vec<f64>,
    pub transformed: Vec<f64>,
    /// `β + d·V·r` per death.
    pub residuals: Array2<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub model: String,
    pub martingale: Vec<f64>,
    pub linearity: LinearityCheck,
    pub ph_test: PhTest,
    #[serde(skip)]
    pub schoenfeld: ScaledSchoenfeld,
}

impl ScaledSchoenfeld {
    /// Writes `time,transformed_time,<column>...` rows, one per death.
    pub fn write_csv<W>(&self, writer: W) -> Result<(), csv::Error>
    where
        W: io::Write,
    {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = vec!["time".to_owned(), "transformed_time".to_owned()];
        header.extend(self.column_names.iter().cloned());
        writer.write_record(&header)?;
        for (k, row) in self.residuals.outer_iter().enumerate() {
            let mut record = vec![self.times[k].to_string(), format!("{:.6}", self.transformed[k])];
            record.extend(row.iter().map(|r| format!("{r:.6}")));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Diagnostics {
    pub fn compute(
        dataset: &IntervalDataset,
        fit: &CoxFit,
        options: &DiagnosticsOptions,
    ) -> Result<Self, DiagnosticsError> {
        let martingale = martingale_residuals(dataset, fit)?;
        let linearity = linearity_check(dataset, &martingale);
        let (ph_test, schoenfeld) = proportional_hazards_test(dataset, fit, options.time_transform)?;
        Ok(Self {
            model: fit.model.clone(),
            martingale,
            linearity,
            ph_test,
            schoenfeld,
        })
    }
}

/// Writes `id,sex,acclimation,exposure,pupal_mass,duration,event,residual` rows.
pub fn write_martingale_csv<W>(
    dataset: &IntervalDataset,
    residuals: &[f64],
    writer: W,
) -> Result<(), csv::Error>
where
    W: io::Write,
{
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record([
        "id",
        "sex",
        "acclimation",
        "exposure",
        "pupal_mass",
        "duration",
        "event",
        "residual",
    ])?;
    let observations = dataset.survival_data();
    for (i, (subject, residual)) in dataset.subjects().iter().zip(residuals).enumerate() {
        let (duration, censored) = observations[i];
        writer.write_record([
            subject.id.clone(),
            subject.sex.to_string(),
            subject.acclimation.celsius().to_string(),
            subject.exposure.celsius().to_string(),
            subject.pupal_mass.map(|m| m.to_string()).unwrap_or_default(),
            duration.to_string(),
            u8::from(!censored).to_string(),
            format!("{residual:.6}"),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn check_subjects(dataset: &IntervalDataset, fit: &CoxFit) -> Result<(), DiagnosticsError> {
    let data = dataset.subjects().len();
    if fit.design.matrix.nrows() == data {
        Ok(())
    } else {
        Err(DiagnosticsError::SubjectMismatch {
            fit: fit.design.matrix.nrows(),
            data,
        })
    }
}

/// Martingale residuals per subject, in dataset order.
pub fn martingale_residuals(
    dataset: &IntervalDataset,
    fit: &CoxFit,
) -> Result<Vec<f64>, DiagnosticsError> {
    check_subjects(dataset, fit)?;
    let risk_sets = RiskSets::new(dataset);
    let eta = fit.linear_predictors();
    let shift = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights = eta.mapv(|e| (e - shift).exp());

    let mut expected = vec![0.0; dataset.subjects().len()];
    for (deaths, at_risk) in risk_sets.deaths.iter().zip(&risk_sets.at_risk) {
        let total = at_risk.iter().map(|&i| weights[i]).sum::<f64>();
        #[expect(clippy::cast_precision_loss)]
        let hazard = deaths.len() as f64 / total;
        for &i in at_risk {
            expected[i] += weights[i] * hazard;
        }
    }

    Ok((0..dataset.subjects().len())
        .map(|i| {
            let died = dataset.intervals_for(i).last().is_some_and(|r| r.event);
            f64::from(u8::from(died)) - expected[i]
        })
        .collect())
}

fn group_means<K, F>(dataset: &IntervalDataset, residuals: &[f64], mut key: F) -> Vec<ResidualGroup>
where
    K: Ord + fmt::Display,
    F: FnMut(usize) -> Option<K>,
{
    let mut groups = std::collections::BTreeMap::<K, (usize, f64)>::new();
    for (i, r) in residuals.iter().enumerate().take(dataset.subjects().len()) {
        if let Some(k) = key(i) {
            let entry = groups.entry(k).or_default();
            entry.0 += 1;
            entry.1 += r;
        }
    }
    groups
        .into_iter()
        .map(|(k, (n, sum))| {
            #[expect(clippy::cast_precision_loss)]
            let mean_residual = sum / n as f64;
            ResidualGroup {
                label: k.to_string(),
                n,
                mean_residual,
            }
        })
        .collect()
}

/// Quartile bin `0..4` of `mass` given the three cut points.
fn quartile_bin(mass: f64, cuts: &[f64; 3]) -> usize {
    cuts.iter().take_while(|c| mass >= **c).count()
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
struct MassBin {
    index: usize,
    label: String,
}

impl fmt::Display for MassBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Mean martingale residual per covariate level and pupal-mass quartile.
#[must_use]
pub fn linearity_check(dataset: &IntervalDataset, residuals: &[f64]) -> LinearityCheck {
    let subjects = dataset.subjects();
    let by_sex = group_means::<Sex, _>(dataset, residuals, |i| Some(subjects[i].sex));
    let by_acclimation =
        group_means::<Temperature, _>(dataset, residuals, |i| Some(subjects[i].acclimation));
    let by_exposure =
        group_means::<Temperature, _>(dataset, residuals, |i| Some(subjects[i].exposure));

    let (masses, mass_residuals): (Vec<f64>, Vec<f64>) = subjects
        .iter()
        .zip(residuals)
        .filter_map(|(s, r)| s.pupal_mass.map(|m| (m, *r)))
        .unzip();
    let mut sorted = masses.clone();
    sorted.sort_by(f64::total_cmp);
    let by_pupal_mass = match (quartile_cuts(&sorted), sorted.first(), sorted.last()) {
        (Some(cuts), Some(&min), Some(&max)) => {
            let bounds = [min, cuts[0], cuts[1], cuts[2], max];
            group_means(dataset, residuals, |i| {
                subjects[i].pupal_mass.map(|m| {
                    let index = quartile_bin(m, &cuts);
                    let close = if index == 3 { ']' } else { ')' };
                    MassBin {
                        index,
                        label: format!(
                            "Q{} [{:.3}, {:.3}{close}",
                            index + 1,
                            bounds[index],
                            bounds[index + 1]
                        ),
                    }
                })
            })
        }
        _ => vec![],
    };

    LinearityCheck {
        by_sex,
        by_acclimation,
        by_exposure,
        by_pupal_mass,
        pupal_mass_correlation: pearson_correlation(&masses, &mass_residuals),
    }
}

/// Transformed death times, one per distinct death time.
fn transform_times(
    dataset: &IntervalDataset,
    risk_sets: &RiskSets,
    transform: TimeTransform,
) -> Vec<f64> {
    match transform {
        TimeTransform::Identity => risk_sets.times.clone(),
        TimeTransform::Km => {
            let curve = KaplanMeierCurve::from_data(dataset.survival_data());
            risk_sets
                .times
                .iter()
                .map(|t| 1.0 - curve.survival_before(*t))
                .collect()
        }
        TimeTransform::Rank => {
            // deaths at earlier times occupy ranks 1..=before; ties share the mean rank
            let mut before = 0usize;
            risk_sets
                .deaths
                .iter()
                .map(|deaths| {
                    let d = deaths.len();
                    #[expect(clippy::cast_precision_loss)]
                    let rank = before as f64 + (d as f64 + 1.0) / 2.0;
                    before += d;
                    rank
                })
                .collect()
        }
    }
}

/// Grambsch-Therneau test and the scaled Schoenfeld residuals behind it.
pub fn proportional_hazards_test(
    dataset: &IntervalDataset,
    fit: &CoxFit,
    transform: TimeTransform,
) -> Result<(PhTest, ScaledSchoenfeld), DiagnosticsError> {
    check_subjects(dataset, fit)?;
    let risk_sets = RiskSets::new(dataset);
    if risk_sets.times.len() < 2 {
        return Err(DiagnosticsError::ConstantTime);
    }
    let x = &fit.design.matrix;
    let p = x.ncols();
    let eta = fit.linear_predictors();
    let shift = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights = eta.mapv(|e| (e - shift).exp());
    let g_by_time = transform_times(dataset, &risk_sets, transform);

    let n_events = risk_sets.event_count();
    let mut raw = Array2::<f64>::zeros((n_events, p));
    let mut times = Vec::with_capacity(n_events);
    let mut transformed = Vec::with_capacity(n_events);
    let mut row = 0;
    for (k, (deaths, at_risk)) in risk_sets.deaths.iter().zip(&risk_sets.at_risk).enumerate() {
        let mut s0 = 0.0;
        let mut s1 = Array1::<f64>::zeros(p);
        for &i in at_risk {
            s0 += weights[i];
            s1.scaled_add(weights[i], &x.row(i));
        }
        let mean = s1 / s0;
        for &i in deaths {
            raw.row_mut(row).assign(&(&x.row(i) - &mean));
            times.push(risk_sets.times[k]);
            transformed.push(g_by_time[k]);
            row += 1;
        }
    }

    #[expect(clippy::cast_precision_loss)]
    let d = n_events as f64;
    let g_mean = transformed.iter().sum::<f64>() / d;
    let centered = transformed.iter().map(|g| g - g_mean).collect::<Vec<_>>();
    let s = centered.iter().map(|c| c * c).sum::<f64>();
    if s <= 0.0 {
        return Err(DiagnosticsError::ConstantTime);
    }

    let u = Array1::from(centered.clone()).dot(&raw);
    let v = &fit.covariance;
    let vu = v.dot(&u);

    // scaled residuals: β + d·V·r
    let mut residuals = raw.dot(v) * d;
    residuals += &fit.coefficients.view().insert_axis(Axis(0));

    let terms = fit
        .design
        .column_names
        .iter()
        .enumerate()
        .map(|(j, term)| {
            let chi_sq = d * vu[j] * vu[j] / (v[[j, j]] * s);
            let column = residuals.column(j).to_vec();
            PhTermTest {
                term: term.clone(),
                rho: pearson_correlation(&transformed, &column),
                chi_sq,
                df: 1,
                p_value: chi_squared_sf(chi_sq, 1.0),
            }
        })
        .collect();

    let global_chi_sq = d * quadratic_form(u.view(), v.view()) / s;
    #[expect(clippy::cast_precision_loss)]
    let global = PhTermTest {
        term: "GLOBAL".to_owned(),
        rho: None,
        chi_sq: global_chi_sq,
        df: p,
        p_value: chi_squared_sf(global_chi_sq, p as f64),
    };

    Ok((
        PhTest {
            transform,
            terms,
            global,
        },
        ScaledSchoenfeld {
            column_names: fit.design.column_names.clone(),
            times,
            transformed,
            residuals,
        },
    ))
}
