//! Cox proportional-hazards regression on interval data
//!
//! The model is fitted by maximizing the counting-process partial likelihood.
//! For each distinct death time `t` the risk set is every interval with
//! `start < t <= stop`; since intervals of one subject never overlap, a subject
//! contributes at most one interval to a risk set.
//!
//! Deaths are recorded on a half-day grid, so tied death times are the rule.
//! [`TieMethod::Efron`] (the default) approximates the exact likelihood much
//! better than [`TieMethod::Breslow`] when many deaths share a time.
//!
//! # Fitting
//!
//! Newton-Raphson from `β = 0`. A step that lowers the log-likelihood is halved
//! until it does not. Iteration stops when the relative change of the
//! log-likelihood falls below [`CoxOptions::tolerance`]. Standard errors come
//! from the inverse observed information at the optimum.
//!
//! Perfectly separating covariates (every male dies before every female, for
//! example) have no finite maximum. The iteration then converges on a flat
//! likelihood with a huge coefficient, which is reported as
//! [`FitError::InfiniteCoefficient`] instead of a meaningless estimate.

use ndarray::{Array1, Array2, ArrayView1};
use serde::Serialize;

use mothsurv_stats::{
    distribution::{chi_squared_sf, normal_critical_value, normal_two_sided_p},
    linalg::Cholesky,
};

use crate::{
    interval::IntervalDataset,
    terms::{CovariateEncoder, DesignMatrix, ModelError, ModelSpec},
};

/// Coefficients beyond this magnitude (log-hazard scale) indicate divergence.
const MAX_ABS_COEFFICIENT: f64 = 15.0;

/// Maximum number of step halvings per Newton iteration.
const MAX_HALVINGS: usize = 30;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize)]
pub enum TieMethod {
    #[default]
    Efron,
    Breslow,
}

#[derive(Debug, Clone)]
pub struct CoxOptions {
    pub ties: TieMethod,
    pub max_iterations: usize,
    /// Relative change of the log partial likelihood that counts as converged.
    pub tolerance: f64,
}

impl Default for CoxOptions {
    fn default() -> Self {
        Self {
            ties: TieMethod::default(),
            max_iterations: 30,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum FitError {
    #[display("{_0}")]
    Model(ModelError),
    #[display("no deaths in the data")]
    NoEvents,
    #[display("model has no covariate columns")]
    EmptyDesign,
    #[display("design has {rows} rows but the data have {subjects} subjects")]
    DesignMismatch { rows: usize, subjects: usize },
    #[display("information matrix is singular (collinear or constant covariates)")]
    SingularInformation,
    #[display("did not converge within {iterations} iterations")]
    DidNotConverge { iterations: usize },
    #[display("log-likelihood is not finite at iteration {iteration}")]
    NonFiniteLikelihood { iteration: usize },
    #[display("coefficient of '{term}' diverges ({coef:.2}); the covariate separates deaths")]
    InfiniteCoefficient { term: String, coef: f64 },
}

impl From<ModelError> for FitError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

/// Death times and the subjects at risk / dying at each of them.
#[derive(Debug, Clone)]
pub(crate) struct RiskSets {
    /// Distinct death times, ascending.
    pub times: Vec<f64>,
    /// Subjects dying at `times[k]`.
    pub deaths: Vec<Vec<usize>>,
    /// Subjects with an interval covering `times[k]`.
    pub at_risk: Vec<Vec<usize>>,
}

impl RiskSets {
    pub fn new(dataset: &IntervalDataset) -> Self {
        let mut times = dataset
            .intervals()
            .iter()
            .filter(|i| i.event)
            .map(|i| i.stop)
            .collect::<Vec<_>>();
        times.sort_by(f64::total_cmp);
        times.dedup();

        let mut deaths = vec![Vec::new(); times.len()];
        let mut at_risk = vec![Vec::new(); times.len()];
        for interval in dataset.intervals() {
            let lo = times.partition_point(|t| *t <= interval.start);
            let hi = times.partition_point(|t| *t <= interval.stop);
            for k in lo..hi {
                at_risk[k].push(interval.subject);
            }
            if interval.event {
                let k = times.partition_point(|t| *t < interval.stop);
                deaths[k].push(interval.subject);
            }
        }
        Self {
            times,
            deaths,
            at_risk,
        }
    }

    pub fn event_count(&self) -> usize {
        self.deaths.iter().map(Vec::len).sum()
    }
}

/// Log partial likelihood with its gradient and negative Hessian.
struct Evaluation {
    log_likelihood: f64,
    score: Array1<f64>,
    information: Array2<f64>,
}

fn evaluate(
    x: &Array2<f64>,
    beta: ArrayView1<'_, f64>,
    risk_sets: &RiskSets,
    ties: TieMethod,
) -> Evaluation {
    let p = beta.len();
    let eta = x.dot(&beta);
    // shifting every linear predictor by a constant leaves the likelihood unchanged
    let shift = eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let weights = eta.mapv(|e| (e - shift).exp());

    let mut log_likelihood = 0.0;
    let mut score = Array1::<f64>::zeros(p);
    let mut information = Array2::<f64>::zeros((p, p));

    let mut s1 = Array1::<f64>::zeros(p);
    let mut s2 = Array2::<f64>::zeros((p, p));
    let mut d1 = Array1::<f64>::zeros(p);
    let mut d2 = Array2::<f64>::zeros((p, p));

    for (deaths, at_risk) in risk_sets.deaths.iter().zip(&risk_sets.at_risk) {
        let mut s0 = 0.0;
        s1.fill(0.0);
        s2.fill(0.0);
        for &i in at_risk {
            let w = weights[i];
            let row = x.row(i);
            s0 += w;
            s1.scaled_add(w, &row);
            for a in 0..p {
                for b in 0..=a {
                    s2[[a, b]] += w * row[a] * row[b];
                }
            }
        }

        let mut d0 = 0.0;
        d1.fill(0.0);
        d2.fill(0.0);
        for &i in deaths {
            let w = weights[i];
            let row = x.row(i);
            log_likelihood += eta[i] - shift;
            score += &row;
            d0 += w;
            d1.scaled_add(w, &row);
            for a in 0..p {
                for b in 0..=a {
                    d2[[a, b]] += w * row[a] * row[b];
                }
            }
        }

        #[expect(clippy::cast_precision_loss)]
        let d = deaths.len() as f64;
        let steps = match ties {
            TieMethod::Breslow => 1,
            TieMethod::Efron => deaths.len(),
        };
        for l in 0..steps {
            #[expect(clippy::cast_precision_loss)]
            let l = l as f64;
            // Breslow: one term weighted by `d`; Efron: `d` terms with the
            // tied deaths' weight removed step by step.
            let (fraction, multiplicity) = match ties {
                TieMethod::Breslow => (0.0, d),
                TieMethod::Efron => (l / d, 1.0),
            };
            let denom = s0 - fraction * d0;
            let mean = (&s1 - &(&d1 * fraction)) / denom;
            log_likelihood -= multiplicity * denom.ln();
            score.scaled_add(-multiplicity, &mean);
            for a in 0..p {
                for b in 0..=a {
                    let second = (s2[[a, b]] - fraction * d2[[a, b]]) / denom;
                    information[[a, b]] += multiplicity * (second - mean[a] * mean[b]);
                }
            }
        }
    }

    for a in 0..p {
        for b in 0..a {
            information[[b, a]] = information[[a, b]];
        }
    }

    Evaluation {
        log_likelihood,
        score,
        information,
    }
}

/// Wald statistics of one coefficient on the hazard-ratio scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardRatio {
    pub term: String,
    pub coef: f64,
    pub hr: f64,
    pub se: f64,
    pub lower: f64,
    pub upper: f64,
    pub z: f64,
    pub p: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LikelihoodRatioTest {
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
}

/// A fitted model.
#[derive(Debug, Clone)]
pub struct CoxFit {
    pub model: String,
    pub design: DesignMatrix,
    pub coefficients: Array1<f64>,
    /// Inverse of the observed information at the optimum.
    pub covariance: Array2<f64>,
    pub log_likelihood: f64,
    /// Log partial likelihood at `β = 0`.
    pub null_log_likelihood: f64,
    pub iterations: usize,
    pub ties: TieMethod,
    pub n_subjects: usize,
    pub n_intervals: usize,
    pub n_events: usize,
}

impl CoxFit {
    /// Encodes `spec` for the dataset's subjects and fits it.
    pub fn fit(
        dataset: &IntervalDataset,
        spec: &ModelSpec,
        encoder: &CovariateEncoder,
        options: &CoxOptions,
    ) -> Result<Self, FitError> {
        let design = encoder.design(spec, dataset.subjects())?;
        Self::fit_design(dataset, spec.name(), design, options)
    }

    /// Fits a model given its subject-level design matrix.
    pub fn fit_design(
        dataset: &IntervalDataset,
        model: String,
        design: DesignMatrix,
        options: &CoxOptions,
    ) -> Result<Self, FitError> {
        let subjects = dataset.subjects().len();
        if design.matrix.nrows() != subjects {
            return Err(FitError::DesignMismatch {
                rows: design.matrix.nrows(),
                subjects,
            });
        }
        if design.ncols() == 0 {
            return Err(FitError::EmptyDesign);
        }
        let risk_sets = RiskSets::new(dataset);
        let n_events = risk_sets.event_count();
        if n_events == 0 {
            return Err(FitError::NoEvents);
        }

        let x = &design.matrix;
        let mut beta = Array1::<f64>::zeros(design.ncols());
        let mut current = evaluate(x, beta.view(), &risk_sets, options.ties);
        if !current.log_likelihood.is_finite() {
            return Err(FitError::NonFiniteLikelihood { iteration: 0 });
        }
        let null_log_likelihood = current.log_likelihood;

        let mut iterations = 0;
        let mut converged = false;
        while iterations < options.max_iterations {
            iterations += 1;
            let Ok(cholesky) = Cholesky::new(current.information.view()) else {
                return Err(diverged(&design, &beta).unwrap_or(FitError::SingularInformation));
            };
            let Ok(step) = cholesky.solve(current.score.view()) else {
                return Err(FitError::SingularInformation);
            };

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..=MAX_HALVINGS {
                let candidate = &beta + &(&step * scale);
                let next = evaluate(x, candidate.view(), &risk_sets, options.ties);
                if next.log_likelihood.is_finite()
                    && next.log_likelihood >= current.log_likelihood
                {
                    accepted = Some((candidate, next));
                    break;
                }
                scale /= 2.0;
            }
            let Some((candidate, next)) = accepted else {
                if current.log_likelihood.is_finite() {
                    // no ascent direction left: at the optimum up to rounding
                    converged = true;
                    break;
                }
                return Err(FitError::NonFiniteLikelihood {
                    iteration: iterations,
                });
            };

            let change = (next.log_likelihood - current.log_likelihood).abs();
            tracing::debug!(
                iteration = iterations,
                log_likelihood = next.log_likelihood,
                step_scale = scale,
                "newton-raphson step"
            );
            beta = candidate;
            current = next;
            if change <= options.tolerance * current.log_likelihood.abs().max(options.tolerance) {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(FitError::DidNotConverge { iterations });
        }
        if let Some(err) = diverged(&design, &beta) {
            return Err(err);
        }

        let covariance = Cholesky::new(current.information.view())
            .map_err(|_| FitError::SingularInformation)?
            .inverse();

        tracing::debug!(
            model = %model,
            iterations,
            log_likelihood = current.log_likelihood,
            "cox model fitted"
        );

        Ok(Self {
            model,
            design,
            coefficients: beta,
            covariance,
            log_likelihood: current.log_likelihood,
            null_log_likelihood,
            iterations,
            ties: options.ties,
            n_subjects: subjects,
            n_intervals: dataset.intervals().len(),
            n_events,
        })
    }

    /// Number of estimated coefficients.
    #[must_use]
    pub fn num_params(&self) -> usize {
        self.coefficients.len()
    }

    #[must_use]
    pub fn std_errors(&self) -> Array1<f64> {
        self.covariance.diag().mapv(|v| v.max(0.0).sqrt())
    }

    /// Wald z statistics.
    #[must_use]
    pub fn z_scores(&self) -> Array1<f64> {
        &self.coefficients / &self.std_errors()
    }

    #[must_use]
    pub fn p_values(&self) -> Array1<f64> {
        self.z_scores().mapv(normal_two_sided_p)
    }

    /// Linear predictor `xβ` per subject.
    #[must_use]
    pub fn linear_predictors(&self) -> Array1<f64> {
        self.design.matrix.dot(&self.coefficients)
    }

    /// Likelihood-ratio test against the null model.
    #[must_use]
    pub fn likelihood_ratio_test(&self) -> LikelihoodRatioTest {
        let statistic = (2.0 * (self.log_likelihood - self.null_log_likelihood)).max(0.0);
        let df = self.num_params();
        #[expect(clippy::cast_precision_loss)]
        let p_value = chi_squared_sf(statistic, df as f64);
        LikelihoodRatioTest {
            statistic,
            df,
            p_value,
        }
    }

    /// Hazard ratios with Wald confidence limits `exp(β ± z·se)`.
    ///
    /// ```
    /// # use mothsurv_analysis::{cox::*, interval::*, simulate::*, duration::survival_subjects, terms::*};
    /// # use rand::SeedableRng;
    /// let dataset = simulate(&SimulationConfig::default(), &mut rand_pcg::Pcg64::seed_from_u64(7));
    /// let intervals = IntervalDataset::from_subjects(&survival_subjects(&dataset), ZeroDurationPolicy::HalfDay);
    /// let encoder = CovariateEncoder::from_records(intervals.subjects(), TemperatureCoding::Categorical);
    /// let spec = ModelSpec::parse("sex").unwrap();
    /// let fit = CoxFit::fit(&intervals, &spec, &encoder, &CoxOptions::default()).unwrap();
    /// let hr = &fit.hazard_ratios(0.95)[0];
    /// assert_eq!(hr.term, "sex[M]");
    /// assert!(hr.lower < hr.hr && hr.hr < hr.upper);
    /// ```
    #[must_use]
    pub fn hazard_ratios(&self, conf_level: f64) -> Vec<HazardRatio> {
        let z_crit = normal_critical_value(conf_level);
        let se = self.std_errors();
        self.design
            .column_names
            .iter()
            .enumerate()
            .map(|(j, term)| {
                let coef = self.coefficients[j];
                let z = coef / se[j];
                HazardRatio {
                    term: term.clone(),
                    coef,
                    hr: coef.exp(),
                    se: se[j],
                    lower: (coef - z_crit * se[j]).exp(),
                    upper: (coef + z_crit * se[j]).exp(),
                    z,
                    p: normal_two_sided_p(z),
                }
            })
            .collect()
    }
}

fn diverged(design: &DesignMatrix, beta: &Array1<f64>) -> Option<FitError> {
    beta.iter()
        .zip(&design.column_names)
        .find(|(coef, _)| !coef.is_finite() || coef.abs() > MAX_ABS_COEFFICIENT)
        .map(|(coef, term)| FitError::InfiniteCoefficient {
            term: term.clone(),
            coef: *coef,
        })
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::{
        duration::{SurvivalDuration, SurvivalSubject, survival_subjects},
        interval::ZeroDurationPolicy,
        record::{Sex, Temperature},
        simulate::{SimulationConfig, simulate},
        terms::TemperatureCoding,
    };

    fn subject(id: usize, sex: Sex, half_days: u32) -> SurvivalSubject {
        SurvivalSubject {
            id: id.to_string(),
            sex,
            acclimation: Temperature::from_celsius_whole(20),
            exposure: Temperature::from_celsius_whole(25),
            pupal_mass: None,
            duration: SurvivalDuration::from_half_days(half_days),
        }
    }

    fn sex_design(dataset: &IntervalDataset) -> DesignMatrix {
        let encoder = CovariateEncoder::from_records(dataset.subjects(), TemperatureCoding::Categorical);
        encoder
            .design(&ModelSpec::parse("sex").unwrap(), dataset.subjects())
            .unwrap()
    }

    #[test]
    fn test_risk_sets_follow_intervals() {
        let dataset = IntervalDataset::from_subjects(
            &[subject(0, Sex::Female, 2), subject(1, Sex::Male, 2), subject(2, Sex::Male, 4)],
            ZeroDurationPolicy::HalfDay,
        );
        let risk_sets = RiskSets::new(&dataset);
        assert_eq!(risk_sets.times, [1.0, 2.0]);
        assert_eq!(risk_sets.deaths, [vec![0, 1], vec![2]]);
        assert_eq!(risk_sets.at_risk, [vec![0, 1, 2], vec![2]]);
        assert_eq!(risk_sets.event_count(), 3);
    }

    #[test]
    fn test_alternating_deaths_have_finite_optimum() {
        let dataset = IntervalDataset::from_subjects(
            &[
                subject(0, Sex::Male, 2),
                subject(1, Sex::Female, 4),
                subject(2, Sex::Male, 6),
                subject(3, Sex::Female, 8),
            ],
            ZeroDurationPolicy::HalfDay,
        );
        let design = sex_design(&dataset);
        let fit = CoxFit::fit_design(&dataset, "sex".into(), design.clone(), &CoxOptions::default())
            .unwrap();

        // the score vanishes at the optimum
        let eval = evaluate(&design.matrix, fit.coefficients.view(), &RiskSets::new(&dataset), TieMethod::Efron);
        assert!(eval.score[0].abs() < 1e-4);
        assert!(fit.log_likelihood >= fit.null_log_likelihood);
        // null likelihood: log(1/4) + log(1/3) + log(1/2)
        let expected_null = -(4.0_f64.ln() + 3.0_f64.ln() + 2.0_f64.ln());
        assert!((fit.null_log_likelihood - expected_null).abs() < 1e-12);
    }

    #[test]
    fn test_efron_matches_breslow_without_ties() {
        let subjects = (0..12)
            .map(|i| {
                let sex = if i % 3 == 0 { Sex::Male } else { Sex::Female };
                subject(i, sex, u32::try_from(i).unwrap() + 1)
            })
            .collect::<Vec<_>>();
        let dataset = IntervalDataset::from_subjects(&subjects, ZeroDurationPolicy::HalfDay);
        let efron = CoxFit::fit_design(&dataset, "sex".into(), sex_design(&dataset), &CoxOptions::default())
            .unwrap();
        let breslow_options = CoxOptions {
            ties: TieMethod::Breslow,
            ..CoxOptions::default()
        };
        let breslow =
            CoxFit::fit_design(&dataset, "sex".into(), sex_design(&dataset), &breslow_options).unwrap();
        assert!((efron.coefficients[0] - breslow.coefficients[0]).abs() < 1e-9);
        assert!((efron.log_likelihood - breslow.log_likelihood).abs() < 1e-9);
    }

    #[test]
    fn test_breslow_tied_null_likelihood() {
        // two deaths at t=1 among three at risk: Breslow gives -2 log 3,
        // Efron gives -log 3 - log 2
        let dataset = IntervalDataset::from_subjects(
            &[subject(0, Sex::Male, 2), subject(1, Sex::Female, 2), subject(2, Sex::Male, 4)],
            ZeroDurationPolicy::HalfDay,
        );
        let design = sex_design(&dataset);
        let risk_sets = RiskSets::new(&dataset);
        let zero = array![0.0];
        let breslow = evaluate(&design.matrix, zero.view(), &risk_sets, TieMethod::Breslow);
        let efron = evaluate(&design.matrix, zero.view(), &risk_sets, TieMethod::Efron);
        assert!((breslow.log_likelihood + 2.0 * 3.0_f64.ln()).abs() < 1e-12);
        assert!((efron.log_likelihood + 3.0_f64.ln() + 2.0_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_separation_is_reported() {
        // every male dies before every female
        let subjects = (0..8)
            .map(|i| {
                let (sex, d) = if i < 4 { (Sex::Male, 1 + i) } else { (Sex::Female, 10 + i) };
                subject(i as usize, sex, d)
            })
            .collect::<Vec<_>>();
        let dataset = IntervalDataset::from_subjects(&subjects, ZeroDurationPolicy::HalfDay);
        let options = CoxOptions {
            max_iterations: 200,
            ..CoxOptions::default()
        };
        let err = CoxFit::fit_design(&dataset, "sex".into(), sex_design(&dataset), &options)
            .unwrap_err();
        assert!(
            matches!(err, FitError::InfiniteCoefficient { ref term, .. } if term == "sex[M]"),
            "{err:?}"
        );
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let subjects = (0..12)
            .map(|i| {
                let sex = if i % 3 == 0 { Sex::Male } else { Sex::Female };
                subject(i, sex, u32::try_from(i).unwrap() + 1)
            })
            .collect::<Vec<_>>();
        let dataset = IntervalDataset::from_subjects(&subjects, ZeroDurationPolicy::HalfDay);
        let options = CoxOptions {
            max_iterations: 1,
            tolerance: 1e-15,
            ..CoxOptions::default()
        };
        let err = CoxFit::fit_design(&dataset, "sex".into(), sex_design(&dataset), &options)
            .unwrap_err();
        assert_eq!(err, FitError::DidNotConverge { iterations: 1 });
        assert_eq!(err.to_string(), "did not converge within 1 iterations");

        // the same data converge with the default budget
        let fit = CoxFit::fit_design(&dataset, "sex".into(), sex_design(&dataset), &CoxOptions::default())
            .unwrap();
        assert!(fit.iterations > 1);
    }

    #[test]
    fn test_no_events_and_empty_design() {
        let dataset = IntervalDataset::from_subjects(&[], ZeroDurationPolicy::HalfDay);
        let design = DesignMatrix {
            column_names: vec!["x".into()],
            column_terms: vec![0],
            matrix: Array2::zeros((0, 1)),
        };
        assert_eq!(
            CoxFit::fit_design(&dataset, "x".into(), design, &CoxOptions::default()).unwrap_err(),
            FitError::NoEvents
        );

        let dataset = IntervalDataset::from_subjects(&[subject(0, Sex::Male, 2)], ZeroDurationPolicy::HalfDay);
        let design = DesignMatrix {
            column_names: vec![],
            column_terms: vec![],
            matrix: Array2::zeros((1, 0)),
        };
        assert_eq!(
            CoxFit::fit_design(&dataset, "empty".into(), design, &CoxOptions::default()).unwrap_err(),
            FitError::EmptyDesign
        );
    }

    #[test]
    fn test_constant_covariate_is_singular() {
        let dataset = IntervalDataset::from_subjects(
            &[subject(0, Sex::Male, 2), subject(1, Sex::Male, 4), subject(2, Sex::Male, 5)],
            ZeroDurationPolicy::HalfDay,
        );
        let design = DesignMatrix {
            column_names: vec!["one".into()],
            column_terms: vec![0],
            matrix: Array2::ones((3, 1)),
        };
        assert_eq!(
            CoxFit::fit_design(&dataset, "one".into(), design, &CoxOptions::default()).unwrap_err(),
            FitError::SingularInformation
        );
    }

    #[test]
    fn test_recovers_simulated_effects() {
        let config = SimulationConfig {
            per_cell: 120,
            male_effect: 0.5,
            acclimation_effect: 0.0,
            exposure_effect: 0.08,
            ..SimulationConfig::default()
        };
        let dataset = simulate(&config, &mut Pcg64::seed_from_u64(20_231_104));
        let intervals =
            IntervalDataset::from_subjects(&survival_subjects(&dataset), ZeroDurationPolicy::HalfDay);
        let encoder = CovariateEncoder::from_records(intervals.subjects(), TemperatureCoding::Linear);
        let spec = ModelSpec::parse("sex + acclimation + exposure").unwrap();
        let fit = CoxFit::fit(&intervals, &spec, &encoder, &CoxOptions::default()).unwrap();

        assert_eq!(fit.design.column_names, ["sex[M]", "acclimation", "exposure"]);
        assert!((fit.coefficients[0] - 0.5).abs() < 0.15, "{}", fit.coefficients);
        assert!(fit.coefficients[1].abs() < 0.05, "{}", fit.coefficients);
        assert!((fit.coefficients[2] - 0.08).abs() < 0.03, "{}", fit.coefficients);

        let lr = fit.likelihood_ratio_test();
        assert_eq!(lr.df, 3);
        assert!(lr.p_value < 1e-6);
        assert!(fit.iterations < 15);
        assert_eq!(fit.n_events, fit.n_subjects);

        let hr = fit.hazard_ratios(0.95);
        assert!(hr[0].lower < 0.5_f64.exp() && 0.5_f64.exp() < hr[0].upper);
        let wide = fit.hazard_ratios(0.99);
        assert!(wide[0].lower < hr[0].lower && wide[0].upper > hr[0].upper);
    }
}
