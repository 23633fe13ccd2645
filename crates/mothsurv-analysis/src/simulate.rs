//! Synthetic experiments
//!
//! Generates a [`Dataset`] with a fully crossed sex × acclimation × exposure
//! design and exponential adult lifespans whose log-hazard is linear in the
//! covariates:
//!
//! ```text
//! log h = log h0 + β_sex·[male] + β_acc·(acc − acc_min) + β_exp·(exp − exp_min)
//! ```
//!
//! Lifespans are recorded on the half-day grid the same way the lab sheets
//! are: the death stamp is the half-day slot in which the death falls.

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};

use crate::{
    dataset::{Dataset, ExclusionSummary},
    record::{DayPeriod, HalfDayStamp, Individual, Sex, Temperature},
};

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Individuals per sex × acclimation × exposure cell.
    pub per_cell: usize,
    pub acclimation_levels: Vec<Temperature>,
    pub exposure_levels: Vec<Temperature>,
    /// Daily hazard of a female at the lowest temperatures.
    pub baseline_hazard: f64,
    /// Log hazard ratio of males.
    pub male_effect: f64,
    /// Log hazard ratio per degree of acclimation above the lowest level.
    pub acclimation_effect: f64,
    /// Log hazard ratio per degree of exposure above the lowest level.
    pub exposure_effect: f64,
    pub pupal_mass_mean: f64,
    pub pupal_mass_sd: f64,
    /// First possible emergence date; emergences spread over the following week.
    pub start_date: NaiveDate,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            per_cell: 20,
            acclimation_levels: [20, 25, 30].map(Temperature::from_celsius_whole).to_vec(),
            exposure_levels: [20, 25, 30, 35].map(Temperature::from_celsius_whole).to_vec(),
            baseline_hazard: 0.1,
            male_effect: 0.4,
            acclimation_effect: -0.02,
            exposure_effect: 0.08,
            pupal_mass_mean: 0.25,
            pupal_mass_sd: 0.04,
            start_date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap_or_default(),
        }
    }
}

/// Draws one synthetic experiment.
///
/// Invalid distribution parameters (non-positive hazard or mass spread) yield
/// individuals without the affected measurement.
pub fn simulate<R>(config: &SimulationConfig, rng: &mut R) -> Dataset
where
    R: Rng + ?Sized,
{
    let acc_min = config.acclimation_levels.iter().min().map_or(0.0, |t| t.celsius());
    let exp_min = config.exposure_levels.iter().min().map_or(0.0, |t| t.celsius());
    let mass = Normal::new(config.pupal_mass_mean, config.pupal_mass_sd).ok();
    let start = HalfDayStamp::new(config.start_date, DayPeriod::Morning).index();

    let mut individuals = Vec::new();
    for sex in Sex::ALL {
        for &acclimation in &config.acclimation_levels {
            for &exposure in &config.exposure_levels {
                let log_hazard = config.baseline_hazard.ln()
                    + if sex == Sex::Male { config.male_effect } else { 0.0 }
                    + config.acclimation_effect * (acclimation.celsius() - acc_min)
                    + config.exposure_effect * (exposure.celsius() - exp_min);
                let lifespan = Exp::new(log_hazard.exp()).ok();

                for _ in 0..config.per_cell {
                    let emergence_index = start + rng.random_range(0..14);
                    let emergence = HalfDayStamp::from_index(emergence_index);
                    let death = lifespan.as_ref().and_then(|dist| {
                        #[expect(clippy::cast_possible_truncation)]
                        let half_days = (dist.sample(rng) * 2.0).floor().min(1e6) as i64;
                        HalfDayStamp::from_index(emergence_index + half_days)
                    });
                    let pupal_mass = mass.as_ref().map(|dist| dist.sample(rng).max(0.01));
                    individuals.push(Individual {
                        id: format!("S{:04}", individuals.len() + 1),
                        sex,
                        acclimation,
                        exposure,
                        emergence,
                        death,
                        pupal_mass,
                        notes: None,
                    });
                }
            }
        }
    }

    let missing_lifespan = individuals.iter().filter(|i| !i.has_lifespan()).count();
    tracing::info!(individuals = individuals.len(), "simulated dataset");
    Dataset {
        exclusions: ExclusionSummary {
            rows_read: individuals.len(),
            missing_covariates: 0,
            missing_lifespan,
        },
        individuals,
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::duration::survival_subjects;

    #[test]
    fn test_design_is_fully_crossed() {
        let config = SimulationConfig::default();
        let dataset = simulate(&config, &mut Pcg64::seed_from_u64(1));
        assert_eq!(dataset.individuals.len(), 2 * 3 * 4 * config.per_cell);
        assert_eq!(dataset.acclimation_levels(), config.acclimation_levels);
        assert_eq!(dataset.exposure_levels(), config.exposure_levels);
        assert!(dataset.individuals.iter().all(Individual::has_lifespan));
        assert_eq!(dataset.exclusions.missing_lifespan, 0);
    }

    #[test]
    fn test_same_seed_same_data() {
        let config = SimulationConfig::default();
        let a = simulate(&config, &mut Pcg64::seed_from_u64(42));
        let b = simulate(&config, &mut Pcg64::seed_from_u64(42));
        assert_eq!(a.individuals, b.individuals);
    }

    #[test]
    fn test_hotter_exposure_dies_sooner() {
        let config = SimulationConfig {
            per_cell: 200,
            exposure_effect: 0.15,
            ..SimulationConfig::default()
        };
        let dataset = simulate(&config, &mut Pcg64::seed_from_u64(3));
        let subjects = survival_subjects(&dataset);
        let mean_days = |celsius: i32| {
            let durations = subjects
                .iter()
                .filter(|s| s.exposure == Temperature::from_celsius_whole(celsius))
                .map(|s| s.duration.as_days())
                .collect::<Vec<_>>();
            durations.iter().sum::<f64>() / durations.len() as f64
        };
        assert!(mean_days(20) > mean_days(35));
    }
}
