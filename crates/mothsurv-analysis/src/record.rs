//! Individual moth records
//!
//! One [`Individual`] per row of the input table. Categorical fields are
//! parsed into small value types here so the rest of the crate never sees raw
//! strings.
//!
//! # Half-day timestamps
//!
//! Emergence and death were checked twice a day, so each event is known only
//! to the morning or afternoon of a date:
//!
//! ```text
//! day 10         day 11         day 12
//! |  AM  |  PM  |  AM  |  PM  |  AM  |
//!    20     21     22     23     24     <- half-day index
//! ```
//!
//! [`HalfDayStamp::index`] maps a stamp onto a monotone integer scale so that
//! durations are exact integer differences.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ParseFieldError {
    #[display("invalid sex '{value}' (expected F/M)")]
    Sex { value: String },
    #[display("invalid temperature '{value}'")]
    Temperature { value: String },
    #[display("invalid time of day '{value}' (expected AM/PM)")]
    DayPeriod { value: String },
}

/// Sex of an adult moth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Female, Sex::Male];

    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Sex::Female => "F",
            Sex::Male => "M",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Sex {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "f" | "female" => Ok(Sex::Female),
            "m" | "male" => Ok(Sex::Male),
            _ => Err(ParseFieldError::Sex {
                value: s.to_owned(),
            }),
        }
    }
}

/// A constant rearing or holding temperature, stored in tenths of a degree Celsius.
///
/// ```
/// use mothsurv_analysis::record::Temperature;
///
/// let t: Temperature = "22.5".parse().unwrap();
/// assert_eq!(t.to_string(), "22.5°C");
/// assert_eq!("30 C".parse::<Temperature>().unwrap().celsius(), 30.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", try_from = "f64")]
pub struct Temperature {
    tenths: i32,
}

impl Temperature {
    #[must_use]
    pub const fn from_tenths(tenths: i32) -> Self {
        Self { tenths }
    }

    #[must_use]
    pub const fn from_celsius_whole(degrees: i32) -> Self {
        Self {
            tenths: degrees * 10,
        }
    }

    #[must_use]
    pub fn celsius(self) -> f64 {
        f64::from(self.tenths) / 10.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tenths % 10 == 0 {
            write!(f, "{}°C", self.tenths / 10)
        } else {
            write!(f, "{:.1}°C", self.celsius())
        }
    }
}

impl From<Temperature> for f64 {
    fn from(t: Temperature) -> Self {
        t.celsius()
    }
}

impl TryFrom<f64> for Temperature {
    type Error = ParseFieldError;

    #[expect(clippy::cast_possible_truncation)]
    fn try_from(degrees: f64) -> Result<Self, Self::Error> {
        if !degrees.is_finite() || degrees.abs() > 1000.0 {
            return Err(ParseFieldError::Temperature {
                value: degrees.to_string(),
            });
        }
        Ok(Self {
            tenths: (degrees * 10.0).round() as i32,
        })
    }
}

impl FromStr for Temperature {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseFieldError::Temperature {
            value: s.to_owned(),
        };
        let trimmed = s
            .trim()
            .trim_end_matches(['C', 'c'])
            .trim_end_matches('°')
            .trim();
        let degrees = trimmed.parse::<f64>().map_err(|_| err())?;
        Self::try_from(degrees).map_err(|_| err())
    }
}

/// Morning or afternoon observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DayPeriod {
    Morning,
    Afternoon,
}

impl DayPeriod {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            DayPeriod::Morning => "AM",
            DayPeriod::Afternoon => "PM",
        }
    }
}

impl FromStr for DayPeriod {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "am" | "morning" | "a" => Ok(DayPeriod::Morning),
            "pm" | "afternoon" | "p" => Ok(DayPeriod::Afternoon),
            _ => Err(ParseFieldError::DayPeriod {
                value: s.to_owned(),
            }),
        }
    }
}

/// A date plus morning/afternoon flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HalfDayStamp {
    pub date: NaiveDate,
    pub period: DayPeriod,
}

impl HalfDayStamp {
    #[must_use]
    pub fn new(date: NaiveDate, period: DayPeriod) -> Self {
        Self { date, period }
    }

    /// Monotone half-day index: two slots per calendar day, morning first.
    #[must_use]
    pub fn index(self) -> i64 {
        let slot = match self.period {
            DayPeriod::Morning => 0,
            DayPeriod::Afternoon => 1,
        };
        i64::from(self.date.num_days_from_ce()) * 2 + slot
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        let days = i32::try_from(index.div_euclid(2)).ok()?;
        let period = if index.rem_euclid(2) == 0 {
            DayPeriod::Morning
        } else {
            DayPeriod::Afternoon
        };
        NaiveDate::from_num_days_from_ce_opt(days).map(|date| Self { date, period })
    }
}

impl fmt::Display for HalfDayStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date, self.period.code())
    }
}

/// One experimental individual.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub sex: Sex,
    /// Larval/pupal rearing temperature.
    pub acclimation: Temperature,
    /// Adult holding temperature.
    pub exposure: Temperature,
    pub emergence: Option<HalfDayStamp>,
    pub death: Option<HalfDayStamp>,
    /// Pupal mass in the unit of the input file (grams in the lab sheets).
    pub pupal_mass: Option<f64>,
    pub notes: Option<String>,
}

impl Individual {
    /// Whether both emergence and death are known.
    #[must_use]
    pub fn has_lifespan(&self) -> bool {
        self.emergence.is_some() && self.death.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_sex() {
        assert_eq!("F".parse::<Sex>().unwrap(), Sex::Female);
        assert_eq!(" male ".parse::<Sex>().unwrap(), Sex::Male);
        assert!("x".parse::<Sex>().is_err());
    }

    #[test]
    fn test_parse_temperature_variants() {
        assert_eq!(
            "25".parse::<Temperature>().unwrap(),
            Temperature::from_celsius_whole(25)
        );
        assert_eq!(
            "25.0°C".parse::<Temperature>().unwrap(),
            Temperature::from_celsius_whole(25)
        );
        assert_eq!(
            "17.5".parse::<Temperature>().unwrap(),
            Temperature::from_tenths(175)
        );
        assert!("warm".parse::<Temperature>().is_err());
        assert!("NaN".parse::<Temperature>().is_err());
    }

    #[test]
    fn test_temperature_order_and_display() {
        let mut temps = ["30", "20", "25"]
            .iter()
            .map(|s| s.parse::<Temperature>().unwrap())
            .collect::<Vec<_>>();
        temps.sort();
        let shown = temps.iter().map(ToString::to_string).collect::<Vec<_>>();
        assert_eq!(shown, ["20°C", "25°C", "30°C"]);
    }

    #[test]
    fn test_half_day_index_is_monotone() {
        let am = HalfDayStamp::new(date(2023, 6, 10), DayPeriod::Morning);
        let pm = HalfDayStamp::new(date(2023, 6, 10), DayPeriod::Afternoon);
        let next_am = HalfDayStamp::new(date(2023, 6, 11), DayPeriod::Morning);
        assert_eq!(pm.index() - am.index(), 1);
        assert_eq!(next_am.index() - pm.index(), 1);
        assert!(am < pm && pm < next_am);
        assert_eq!(HalfDayStamp::from_index(pm.index()), Some(pm));
        assert_eq!(HalfDayStamp::from_index(next_am.index()), Some(next_am));
    }

    #[test]
    fn test_parse_day_period() {
        assert_eq!("AM".parse::<DayPeriod>().unwrap(), DayPeriod::Morning);
        assert_eq!("afternoon".parse::<DayPeriod>().unwrap(), DayPeriod::Afternoon);
        assert!("noon".parse::<DayPeriod>().is_err());
    }
}
