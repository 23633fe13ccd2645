//! Adult survival durations at half-day resolution
//!
//! The duration of an individual is the number of half-day slots between its
//! emergence stamp and its death stamp. In days this is the calendar date
//! difference adjusted by half a day when the two observations fall in
//! different periods:
//!
//! | emergence | death | adjustment |
//! |-----------|-------|------------|
//! | AM        | AM    | 0          |
//! | AM        | PM    | +0.5       |
//! | PM        | AM    | -0.5       |
//! | PM        | PM    | 0          |

use std::fmt;

use serde::Serialize;

use crate::{
    dataset::Dataset,
    record::{HalfDayStamp, Individual, Sex, Temperature},
};

/// Elapsed adult lifespan as a whole number of half-days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SurvivalDuration {
    half_days: u32,
}

impl SurvivalDuration {
    #[must_use]
    pub const fn from_half_days(half_days: u32) -> Self {
        Self { half_days }
    }

    /// Duration between two stamps, or `None` if `death` precedes `emergence`.
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use mothsurv_analysis::{
    ///     duration::SurvivalDuration,
    ///     record::{DayPeriod, HalfDayStamp},
    /// };
    ///
    /// let day = |d| NaiveDate::from_ymd_opt(2023, 6, d).unwrap();
    /// let emergence = HalfDayStamp::new(day(10), DayPeriod::Morning);
    /// let death = HalfDayStamp::new(day(14), DayPeriod::Afternoon);
    /// let duration = SurvivalDuration::between(emergence, death).unwrap();
    /// assert_eq!(duration.as_days(), 4.5);
    /// assert_eq!(duration.half_days(), 9);
    /// ```
    #[must_use]
    pub fn between(emergence: HalfDayStamp, death: HalfDayStamp) -> Option<Self> {
        let diff = death.index() - emergence.index();
        u32::try_from(diff).ok().map(Self::from_half_days)
    }

    #[must_use]
    pub const fn half_days(self) -> u32 {
        self.half_days
    }

    #[must_use]
    pub fn as_days(self) -> f64 {
        f64::from(self.half_days) / 2.0
    }
}

impl fmt::Display for SurvivalDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} d", self.as_days())
    }
}

/// An individual eligible for survival analysis: covariates plus duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurvivalSubject {
    pub id: String,
    pub sex: Sex,
    pub acclimation: Temperature,
    pub exposure: Temperature,
    pub pupal_mass: Option<f64>,
    pub duration: SurvivalDuration,
}

impl SurvivalSubject {
    /// Builds a subject from an individual with both stamps.
    ///
    /// Returns `None` when either stamp is missing or death precedes
    /// emergence; loading rejects the latter, so in practice only missing
    /// stamps yield `None`.
    #[must_use]
    pub fn from_individual(individual: &Individual) -> Option<Self> {
        let duration = SurvivalDuration::between(individual.emergence?, individual.death?)?;
        Some(Self {
            id: individual.id.clone(),
            sex: individual.sex,
            acclimation: individual.acclimation,
            exposure: individual.exposure,
            pupal_mass: individual.pupal_mass,
            duration,
        })
    }
}

/// All individuals of the dataset with a complete lifespan, in input order.
#[must_use]
pub fn survival_subjects(dataset: &Dataset) -> Vec<SurvivalSubject> {
    dataset
        .individuals
        .iter()
        .filter_map(SurvivalSubject::from_individual)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::record::DayPeriod;

    fn stamp(day: u32, period: DayPeriod) -> HalfDayStamp {
        HalfDayStamp::new(NaiveDate::from_ymd_opt(2023, 6, day).unwrap(), period)
    }

    #[test]
    fn test_half_day_adjustments() {
        use DayPeriod::{Afternoon as Pm, Morning as Am};
        let cases = [
            (stamp(10, Am), stamp(14, Am), 4.0),
            (stamp(10, Am), stamp(14, Pm), 4.5),
            (stamp(10, Pm), stamp(14, Am), 3.5),
            (stamp(10, Pm), stamp(14, Pm), 4.0),
            (stamp(10, Am), stamp(10, Am), 0.0),
            (stamp(10, Am), stamp(10, Pm), 0.5),
        ];
        for (emergence, death, days) in cases {
            let duration = SurvivalDuration::between(emergence, death).unwrap();
            assert_eq!(duration.as_days(), days, "{emergence} -> {death}");
        }
    }

    #[test]
    fn test_month_boundary() {
        let emergence = HalfDayStamp::new(
            NaiveDate::from_ymd_opt(2023, 6, 29).unwrap(),
            DayPeriod::Afternoon,
        );
        let death = HalfDayStamp::new(
            NaiveDate::from_ymd_opt(2023, 7, 2).unwrap(),
            DayPeriod::Morning,
        );
        let duration = SurvivalDuration::between(emergence, death).unwrap();
        assert_eq!(duration.as_days(), 2.5);
    }

    #[test]
    fn test_negative_duration_is_rejected() {
        assert!(SurvivalDuration::between(stamp(12, DayPeriod::Morning), stamp(11, DayPeriod::Afternoon)).is_none());
    }

    #[test]
    fn test_subject_requires_both_stamps() {
        let individual = Individual {
            id: "x".into(),
            sex: Sex::Male,
            acclimation: Temperature::from_celsius_whole(20),
            exposure: Temperature::from_celsius_whole(25),
            emergence: Some(stamp(10, DayPeriod::Morning)),
            death: None,
            pupal_mass: None,
            notes: None,
        };
        assert!(SurvivalSubject::from_individual(&individual).is_none());
        let complete = Individual {
            death: Some(stamp(11, DayPeriod::Morning)),
            ..individual
        };
        let subject = SurvivalSubject::from_individual(&complete).unwrap();
        assert_eq!(subject.duration.half_days(), 2);
    }
}
