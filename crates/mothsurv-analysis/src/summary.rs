//! Descriptive summaries and analyses of variance
//!
//! Group summaries use the observed durations (zero durations stay zero) and
//! every individual with a pupal mass, whether or not its lifespan is known.

use std::collections::BTreeMap;

use ndarray::Array1;
use serde::Serialize;

use mothsurv_stats::{
    anova::{AnovaError, AnovaTable, AnovaTerm},
    descriptive::DescriptiveStats,
};

use crate::{
    dataset::Dataset,
    duration::SurvivalSubject,
    record::Individual,
    terms::{CovariateEncoder, Covariates, ModelError, ModelSpec, TemperatureCoding},
};

/// Sequential model for adult lifespan.
pub const SURVIVAL_ANOVA_FORMULA: &str = "sex + acclimation * exposure";
/// Sequential model for pupal mass.
pub const PUPAL_MASS_ANOVA_FORMULA: &str = "sex + acclimation";

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum SummaryError {
    #[display("{_0}")]
    Model(ModelError),
    #[display("{_0}")]
    Anova(AnovaError),
}

impl From<ModelError> for SummaryError {
    fn from(err: ModelError) -> Self {
        Self::Model(err)
    }
}

impl From<AnovaError> for SummaryError {
    fn from(err: AnovaError) -> Self {
        Self::Anova(err)
    }
}

/// Lifespan and pupal mass statistics of one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary<K> {
    pub key: K,
    pub individuals: usize,
    /// Observed adult lifespan in days, individuals with both stamps only.
    pub survival_days: Option<DescriptiveStats>,
    pub pupal_mass: Option<DescriptiveStats>,
}

/// Summarizes the dataset per group, groups in key order.
pub fn summarize_by<K, F>(dataset: &Dataset, mut key: F) -> Vec<GroupSummary<K>>
where
    K: Ord,
    F: FnMut(&Individual) -> K,
{
    let mut groups = BTreeMap::<K, (usize, Vec<f64>, Vec<f64>)>::new();
    for individual in &dataset.individuals {
        let (count, days, masses) = groups.entry(key(individual)).or_default();
        *count += 1;
        if let Some(subject) = SurvivalSubject::from_individual(individual) {
            days.push(subject.duration.as_days());
        }
        if let Some(mass) = individual.pupal_mass {
            masses.push(mass);
        }
    }
    groups
        .into_iter()
        .map(|(key, (individuals, days, masses))| GroupSummary {
            key,
            individuals,
            survival_days: DescriptiveStats::new(days),
            pupal_mass: DescriptiveStats::new(masses),
        })
        .collect()
}

/// Sequential ANOVA of `response` on the terms of `formula`, in canonical term order.
pub fn anova<R>(
    response: &str,
    records: &[R],
    y: &[f64],
    formula: &str,
    coding: TemperatureCoding,
) -> Result<AnovaTable, SummaryError>
where
    R: Covariates,
{
    let spec = ModelSpec::parse(formula)?;
    let encoder = CovariateEncoder::from_records(records, coding);
    let terms = spec
        .terms()
        .iter()
        .map(|term| {
            let design = encoder.term_design(*term, records)?;
            Ok(AnovaTerm {
                name: term.to_string(),
                columns: design.matrix,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;
    let y = Array1::from(y.to_vec());
    Ok(AnovaTable::sequential(response, y.view(), &terms)?)
}

/// `survival_days ~ sex + acclimation * exposure` over subjects with a lifespan.
pub fn survival_anova(
    subjects: &[SurvivalSubject],
    coding: TemperatureCoding,
) -> Result<AnovaTable, SummaryError> {
    let days = subjects
        .iter()
        .map(|s| s.duration.as_days())
        .collect::<Vec<_>>();
    anova("survival_days", subjects, &days, SURVIVAL_ANOVA_FORMULA, coding)
}

/// `pupal_mass ~ sex + acclimation` over individuals with a recorded mass.
pub fn pupal_mass_anova(
    dataset: &Dataset,
    coding: TemperatureCoding,
) -> Result<AnovaTable, SummaryError> {
    let (records, masses): (Vec<&Individual>, Vec<f64>) = dataset
        .individuals
        .iter()
        .filter_map(|i| i.pupal_mass.map(|m| (i, m)))
        .unzip();
    anova("pupal_mass", &records, &masses, PUPAL_MASS_ANOVA_FORMULA, coding)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::{
        duration::survival_subjects,
        record::{Sex, Temperature},
        simulate::{SimulationConfig, simulate},
        survival::TreatmentGroup,
    };

    fn dataset() -> Dataset {
        let config = SimulationConfig {
            per_cell: 10,
            ..SimulationConfig::default()
        };
        simulate(&config, &mut Pcg64::seed_from_u64(4))
    }

    #[test]
    fn test_summaries_per_cell() {
        let dataset = dataset();
        let summaries = summarize_by(&dataset, TreatmentGroup::of);
        assert_eq!(summaries.len(), 24);
        for summary in &summaries {
            assert_eq!(summary.individuals, 10);
            assert_eq!(summary.survival_days.as_ref().unwrap().count, 10);
            assert_eq!(summary.pupal_mass.as_ref().unwrap().count, 10);
        }
        assert!(summaries.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn test_summary_counts_missing_values() {
        let mut dataset = dataset();
        dataset.individuals[0].death = None;
        dataset.individuals[1].pupal_mass = None;
        let by_sex = summarize_by(&dataset, |i| i.sex);
        let female = &by_sex[0];
        assert_eq!(female.key, Sex::Female);
        assert_eq!(female.individuals, 120);
        assert_eq!(female.survival_days.as_ref().unwrap().count, 119);
        assert_eq!(female.pupal_mass.as_ref().unwrap().count, 119);
    }

    #[test]
    fn test_survival_anova_rows() {
        let dataset = dataset();
        let table = survival_anova(&survival_subjects(&dataset), TemperatureCoding::Categorical)
            .unwrap();
        let terms = table.rows.iter().map(|r| r.term.as_str()).collect::<Vec<_>>();
        assert_eq!(
            terms,
            ["sex", "acclimation", "exposure", "acclimation:exposure", "Residuals"]
        );
        let dfs = table.rows.iter().map(|r| r.df).collect::<Vec<_>>();
        assert_eq!(dfs, [1, 2, 3, 6, 240 - 1 - 1 - 2 - 3 - 6]);
    }

    #[test]
    fn test_pupal_mass_anova_detects_sex_difference() {
        let mut dataset = dataset();
        for individual in &mut dataset.individuals {
            if individual.sex == Sex::Female {
                individual.pupal_mass = individual.pupal_mass.map(|m| m + 0.1);
            }
        }
        let table = pupal_mass_anova(&dataset, TemperatureCoding::Categorical).unwrap();
        assert_eq!(table.response, "pupal_mass");
        assert_eq!(table.rows[0].term, "sex");
        assert!(table.rows[0].p_value.unwrap() < 1e-6);
        assert_eq!(table.rows[1].df, 2);
    }

    #[test]
    fn test_single_level_factor_is_an_error() {
        let mut dataset = dataset();
        for individual in &mut dataset.individuals {
            individual.acclimation = Temperature::from_celsius_whole(20);
        }
        assert!(matches!(
            pupal_mass_anova(&dataset, TemperatureCoding::Categorical),
            Err(SummaryError::Model(ModelError::DegenerateTerm { .. }))
        ));
    }
}
