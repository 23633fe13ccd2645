//! Ranking candidate models by AICc
//!
//! Every candidate is fitted to the same interval dataset and scored with the
//! small-sample corrected AIC, using the number of deaths as the sample size.
//! The ranking is sorted by AICc with the model name as tie-breaker, so it does
//! not depend on the order in which candidates were submitted.
//!
//! A candidate that cannot be fitted aborts the whole selection unless
//! [`FailurePolicy::SkipFailed`] is chosen, in which case it is left out of
//! the ranking and listed in [`Selection::failures`]. A ranking never mixes
//! fitted and failed models.

use std::collections::BTreeSet;

use serde::Serialize;

use mothsurv_stats::information::{aicc, akaike_weights, bic};

use crate::{
    cox::{CoxFit, CoxOptions, FitError},
    interval::IntervalDataset,
    terms::{CovariateEncoder, ModelSpec, TemperatureCoding},
};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize)]
pub enum FailurePolicy {
    /// Any failed fit aborts selection.
    #[default]
    Abort,
    /// Failed fits are reported and left out of the ranking.
    SkipFailed,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionOptions {
    pub cox: CoxOptions,
    pub coding: TemperatureCoding,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SelectionError {
    #[display("no candidate models given")]
    NoCandidates,
    #[display("model '{model}': {params} coefficients need more than {} deaths, got {events}", params + 1)]
    InsufficientEvents {
        model: String,
        events: usize,
        params: usize,
    },
    #[display("model '{model}' failed to fit: {source}")]
    FitFailed { model: String, source: FitError },
    #[display("all {failures} candidate models failed to fit")]
    NoModelFitted { failures: usize },
}

/// One row of the ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankedModel {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub model: String,
    /// Number of coefficients.
    pub k: usize,
    pub log_likelihood: f64,
    pub aicc: f64,
    pub delta_aicc: f64,
    pub weight: f64,
    /// BIC on the same sample size, reported alongside but not used for ranking.
    pub bic: f64,
    #[serde(skip)]
    pub fit: CoxFit,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedModel {
    pub model: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: FitError,
}

fn serialize_display<S>(error: &FitError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(error)
}

#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    /// Ascending AICc.
    pub ranking: Vec<RankedModel>,
    pub failures: Vec<FailedModel>,
    /// Deaths in the data: the AICc sample size.
    pub n_events: usize,
}

impl Selection {
    /// The lowest-AICc model, however small its margin over the runner-up.
    #[must_use]
    pub fn best(&self) -> Option<&RankedModel> {
        self.ranking.first()
    }

    #[must_use]
    pub fn get(&self, model: &str) -> Option<&RankedModel> {
        self.ranking.iter().find(|m| m.model == model)
    }
}

/// Fits and ranks candidate models on one dataset.
#[derive(Debug, Clone)]
pub struct ModelSelector<'a> {
    dataset: &'a IntervalDataset,
    encoder: CovariateEncoder,
    options: SelectionOptions,
}

impl<'a> ModelSelector<'a> {
    #[must_use]
    pub fn new(dataset: &'a IntervalDataset, options: SelectionOptions) -> Self {
        let encoder = CovariateEncoder::from_records(dataset.subjects(), options.coding);
        Self {
            dataset,
            encoder,
            options,
        }
    }

    /// Fits a single candidate.
    pub fn fit(&self, spec: &ModelSpec) -> Result<CoxFit, FitError> {
        CoxFit::fit(self.dataset, spec, &self.encoder, &self.options.cox)
    }

    /// Fits every candidate and ranks the successful fits by AICc.
    ///
    /// Candidates with the same canonical formula are fitted once.
    pub fn rank(&self, candidates: &[ModelSpec]) -> Result<Selection, SelectionError> {
        if candidates.is_empty() {
            return Err(SelectionError::NoCandidates);
        }
        let n_events = self.dataset.event_count();

        let mut seen = BTreeSet::new();
        let mut scored = Vec::new();
        let mut failures = Vec::new();
        for spec in candidates {
            let model = spec.name();
            if !seen.insert(model.clone()) {
                tracing::debug!(model = %model, "skipping duplicate candidate");
                continue;
            }
            tracing::info!(model = %model, "fitting candidate");
            let fitted = match self.encoder.design(spec, self.dataset.subjects()) {
                Ok(design) => {
                    let params = design.ncols();
                    if n_events <= params + 1 {
                        return Err(SelectionError::InsufficientEvents {
                            model,
                            events: n_events,
                            params,
                        });
                    }
                    CoxFit::fit_design(self.dataset, model.clone(), design, &self.options.cox)
                }
                Err(err) => Err(err.into()),
            };
            let fit = match fitted {
                Ok(fit) => fit,
                Err(error) => match self.options.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(SelectionError::FitFailed {
                            model,
                            source: error,
                        });
                    }
                    FailurePolicy::SkipFailed => {
                        tracing::warn!(model = %model, %error, "candidate failed to fit, skipping");
                        failures.push(FailedModel { model, error });
                        continue;
                    }
                },
            };
            let k = fit.num_params();
            let score = aicc(fit.log_likelihood, k, n_events).map_err(|_| {
                SelectionError::InsufficientEvents {
                    model: model.clone(),
                    events: n_events,
                    params: k,
                }
            })?;
            scored.push((model, k, score, fit));
        }
        if scored.is_empty() {
            return Err(SelectionError::NoModelFitted {
                failures: failures.len(),
            });
        }

        scored.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| a.0.cmp(&b.0)));
        let scores = scored.iter().map(|s| s.2).collect::<Vec<_>>();
        let weights = akaike_weights(&scores);
        let min = scores[0];

        let ranking = scored
            .into_iter()
            .zip(weights)
            .enumerate()
            .map(|(i, ((model, k, score, fit), weight))| RankedModel {
                rank: i + 1,
                model,
                k,
                log_likelihood: fit.log_likelihood,
                aicc: score,
                delta_aicc: score - min,
                weight,
                bic: bic(fit.log_likelihood, k, n_events),
                fit,
            })
            .collect();

        Ok(Selection {
            ranking,
            failures,
            n_events,
        })
    }
}
