//! Half-day interval (counting-process) representation
//!
//! The hazards model consumes one `(start, stop]` record per half-day an
//! individual was observed alive, with an event flag set only on the record
//! that ends at its death:
//!
//! ```text
//! duration 1.5 d:   (0.0, 0.5] 0
//!                   (0.5, 1.0] 0
//!                   (1.0, 1.5] 1
//! ```
//!
//! Per subject the records are contiguous, non-overlapping and strictly
//! increasing, start at 0 and end at the subject's effective duration.
//!
//! # Zero durations
//!
//! A moth that emerged and died within the same half-day period has duration
//! 0, which cannot be expressed as an interval with `start < stop`. The
//! [`ZeroDurationPolicy`] decides what happens:
//!
//! - [`HalfDay`](ZeroDurationPolicy::HalfDay): the death is placed at the end
//!   of the observation period it happened in, giving one record `(0, 0.5]`
//!   with the event flag set. The effective duration becomes 0.5 days.
//! - [`Exclude`](ZeroDurationPolicy::Exclude): the subject is left out of the
//!   interval dataset and counted in [`IntervalDataset::excluded_zero_duration`].

use std::{io, ops::Range};

use serde::Serialize;

use crate::duration::{SurvivalDuration, SurvivalSubject};

/// Length of one interval in days.
pub const INTERVAL_LENGTH: f64 = 0.5;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize)]
pub enum ZeroDurationPolicy {
    #[default]
    HalfDay,
    Exclude,
}

/// One half-day segment of a subject's lifespan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IntervalRecord {
    /// Index of the subject in [`IntervalDataset::subjects`].
    pub subject: usize,
    pub start: f64,
    pub stop: f64,
    /// `true` only on the last interval, when the subject died.
    pub event: bool,
}

impl IntervalRecord {
    #[must_use]
    pub fn length(&self) -> f64 {
        self.stop - self.start
    }
}

/// Splits one lifespan into half-day intervals.
///
/// Returns `None` when the duration is zero and the policy is
/// [`ZeroDurationPolicy::Exclude`].
///
/// ```
/// use mothsurv_analysis::{
///     duration::SurvivalDuration,
///     interval::{ZeroDurationPolicy, reshape},
/// };
///
/// let intervals = reshape(0, SurvivalDuration::from_half_days(9), ZeroDurationPolicy::HalfDay).unwrap();
/// assert_eq!(intervals.len(), 9);
/// assert_eq!(intervals[8].stop, 4.5);
/// assert!(intervals[8].event);
/// assert!(intervals[..8].iter().all(|i| !i.event));
/// ```
#[must_use]
pub fn reshape(
    subject: usize,
    duration: SurvivalDuration,
    policy: ZeroDurationPolicy,
) -> Option<Vec<IntervalRecord>> {
    let count = match (duration.half_days(), policy) {
        (0, ZeroDurationPolicy::Exclude) => return None,
        (0, ZeroDurationPolicy::HalfDay) => 1,
        (n, _) => n,
    };
    Some(
        (0..count)
            .map(|k| IntervalRecord {
                subject,
                start: f64::from(k) * INTERVAL_LENGTH,
                stop: f64::from(k + 1) * INTERVAL_LENGTH,
                event: k + 1 == count,
            })
            .collect(),
    )
}

/// Interval records of every subject, grouped by subject in input order.
#[derive(Debug, Clone, Serialize)]
pub struct IntervalDataset {
    subjects: Vec<SurvivalSubject>,
    intervals: Vec<IntervalRecord>,
    ranges: Vec<Range<usize>>,
    excluded_zero_duration: usize,
    policy: ZeroDurationPolicy,
}

impl IntervalDataset {
    /// Reshapes all subjects.
    #[must_use]
    pub fn from_subjects(subjects: &[SurvivalSubject], policy: ZeroDurationPolicy) -> Self {
        let mut kept = Vec::with_capacity(subjects.len());
        let mut intervals = Vec::new();
        let mut ranges = Vec::with_capacity(subjects.len());
        let mut excluded_zero_duration = 0;

        for subject in subjects {
            match reshape(kept.len(), subject.duration, policy) {
                Some(records) => {
                    let start = intervals.len();
                    intervals.extend(records);
                    ranges.push(start..intervals.len());
                    kept.push(subject.clone());
                }
                None => {
                    tracing::warn!(id = %subject.id, "excluding zero-duration subject");
                    excluded_zero_duration += 1;
                }
            }
        }

        Self {
            subjects: kept,
            intervals,
            ranges,
            excluded_zero_duration,
            policy,
        }
    }

    #[must_use]
    pub fn subjects(&self) -> &[SurvivalSubject] {
        &self.subjects
    }

    #[must_use]
    pub fn intervals(&self) -> &[IntervalRecord] {
        &self.intervals
    }

    /// Intervals belonging to subject `index`, in time order.
    #[must_use]
    pub fn intervals_for(&self, index: usize) -> &[IntervalRecord] {
        match self.ranges.get(index) {
            Some(range) => &self.intervals[range.clone()],
            None => &[],
        }
    }

    #[must_use]
    pub fn excluded_zero_duration(&self) -> usize {
        self.excluded_zero_duration
    }

    #[must_use]
    pub fn policy(&self) -> ZeroDurationPolicy {
        self.policy
    }

    /// Duration actually represented by the subject's intervals, in days.
    ///
    /// Equal to the observed duration except for zero-duration subjects
    /// promoted to one half-day.
    #[must_use]
    pub fn effective_duration(&self, index: usize) -> f64 {
        self.intervals_for(index).last().map_or(0.0, |i| i.stop)
    }

    /// Number of deaths (one per subject).
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.intervals.iter().filter(|i| i.event).count()
    }

    /// `(effective duration, is_censored)` pairs for Kaplan-Meier estimation.
    #[must_use]
    pub fn survival_data(&self) -> Vec<(f64, bool)> {
        (0..self.subjects.len())
            .map(|i| {
                let censored = !self.intervals_for(i).last().is_some_and(|r| r.event);
                (self.effective_duration(i), censored)
            })
            .collect()
    }

    /// Writes `id,subject,start,stop,event,sex,acclimation,exposure` rows.
    pub fn write_csv<W>(&self, writer: W) -> Result<(), csv::Error>
    where
        W: io::Write,
    {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record([
            "id",
            "subject",
            "start",
            "stop",
            "event",
            "sex",
            "acclimation",
            "exposure",
        ])?;
        for record in &self.intervals {
            let subject = &self.subjects[record.subject];
            writer.write_record([
                subject.id.clone(),
                record.subject.to_string(),
                format!("{:.1}", record.start),
                format!("{:.1}", record.stop),
                u8::from(record.event).to_string(),
                subject.sex.to_string(),
                format!("{}", subject.acclimation.celsius()),
                format!("{}", subject.exposure.celsius()),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::record::{Sex, Temperature};

    fn subject(id: &str, half_days: u32) -> SurvivalSubject {
        SurvivalSubject {
            id: id.to_owned(),
            sex: Sex::Female,
            acclimation: Temperature::from_celsius_whole(20),
            exposure: Temperature::from_celsius_whole(30),
            pupal_mass: None,
            duration: SurvivalDuration::from_half_days(half_days),
        }
    }

    #[test]
    fn test_four_and_a_half_days() {
        let intervals = reshape(3, SurvivalDuration::from_half_days(9), ZeroDurationPolicy::HalfDay)
            .unwrap();
        assert_eq!(intervals.len(), 9);
        assert_eq!(intervals[0].start, 0.0);
        assert_eq!(intervals[8].stop, 4.5);
        assert!(intervals.iter().all(|i| i.subject == 3));
        assert_eq!(intervals.iter().filter(|i| i.event).count(), 1);
    }

    #[test]
    fn test_zero_duration_half_day_policy() {
        let intervals =
            reshape(0, SurvivalDuration::from_half_days(0), ZeroDurationPolicy::HalfDay).unwrap();
        assert_eq!(
            intervals,
            vec![IntervalRecord {
                subject: 0,
                start: 0.0,
                stop: 0.5,
                event: true
            }]
        );
    }

    #[test]
    fn test_zero_duration_exclude_policy() {
        assert!(reshape(0, SurvivalDuration::from_half_days(0), ZeroDurationPolicy::Exclude).is_none());
        let dataset = IntervalDataset::from_subjects(
            &[subject("a", 0), subject("b", 2)],
            ZeroDurationPolicy::Exclude,
        );
        assert_eq!(dataset.subjects().len(), 1);
        assert_eq!(dataset.subjects()[0].id, "b");
        assert_eq!(dataset.excluded_zero_duration(), 1);
        // indices are re-numbered densely
        assert!(dataset.intervals().iter().all(|i| i.subject == 0));
    }

    #[test]
    fn test_identical_covariates_stay_independent() {
        let dataset = IntervalDataset::from_subjects(
            &[subject("a", 3), subject("b", 5)],
            ZeroDurationPolicy::HalfDay,
        );
        assert_eq!(dataset.intervals_for(0).len(), 3);
        assert_eq!(dataset.intervals_for(1).len(), 5);
        assert!(dataset.intervals_for(0).iter().all(|i| i.subject == 0));
        assert!(dataset.intervals_for(1).iter().all(|i| i.subject == 1));
        assert_eq!(dataset.effective_duration(0), 1.5);
        assert_eq!(dataset.effective_duration(1), 2.5);
        assert_eq!(dataset.event_count(), 2);
        assert!(dataset.intervals_for(2).is_empty());
    }

    #[test]
    fn test_survival_data_has_no_censoring() {
        let dataset = IntervalDataset::from_subjects(
            &[subject("a", 0), subject("b", 4)],
            ZeroDurationPolicy::HalfDay,
        );
        assert_eq!(dataset.survival_data(), vec![(0.5, false), (2.0, false)]);
    }

    #[test]
    fn test_csv_output() {
        let dataset = IntervalDataset::from_subjects(&[subject("a", 2)], ZeroDurationPolicy::HalfDay);
        let mut buf = Vec::new();
        dataset.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "id,subject,start,stop,event,sex,acclimation,exposure\n\
             a,0,0.0,0.5,0,F,20,30\n\
             a,0,0.5,1.0,1,F,20,30\n"
        );
    }

    proptest! {
        #[test]
        fn prop_intervals_partition_lifespan(half_days in 1u32..400) {
            let duration = SurvivalDuration::from_half_days(half_days);
            let intervals = reshape(0, duration, ZeroDurationPolicy::HalfDay).unwrap();

            prop_assert_eq!(intervals.len() as u32, half_days);
            let total: f64 = intervals.iter().map(IntervalRecord::length).sum();
            prop_assert!((total - duration.as_days()).abs() < 1e-9);

            prop_assert_eq!(intervals.iter().filter(|i| i.event).count(), 1);
            prop_assert!(intervals.last().unwrap().event);
            prop_assert_eq!(intervals.last().unwrap().stop, duration.as_days());

            for pair in intervals.windows(2) {
                prop_assert_eq!(pair[0].stop, pair[1].start);
                prop_assert!(pair[0].start < pair[0].stop);
            }
        }

        #[test]
        fn prop_dataset_keeps_subject_grouping(durations in prop::collection::vec(0u32..40, 1..30)) {
            let subjects = durations
                .iter()
                .enumerate()
                .map(|(i, d)| subject(&format!("s{i}"), *d))
                .collect::<Vec<_>>();
            let dataset = IntervalDataset::from_subjects(&subjects, ZeroDurationPolicy::HalfDay);

            prop_assert_eq!(dataset.subjects().len(), subjects.len());
            for (index, d) in durations.iter().enumerate() {
                let records = dataset.intervals_for(index);
                prop_assert_eq!(records.len() as u32, (*d).max(1));
                prop_assert!(records.iter().all(|r| r.subject == index));
                let expected = f64::from((*d).max(1)) * INTERVAL_LENGTH;
                prop_assert_eq!(dataset.effective_duration(index), expected);
            }
        }
    }
}
