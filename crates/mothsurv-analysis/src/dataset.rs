//! Loading the experimental table
//!
//! The input is a CSV file with one row per individual. Column names are
//! matched case-insensitively after trimming:
//!
//! | column             | required | content                                  |
//! |--------------------|----------|------------------------------------------|
//! | `id`               | yes      | unique identifier                        |
//! | `pupation_date`    | no       | ignored by the analysis                  |
//! | `pupal_mass`       | yes      | number, may be missing                   |
//! | `sex`              | yes      | `F` / `M`                                |
//! | `acclimation_temp` | yes      | degrees Celsius                          |
//! | `exposure_temp`    | yes      | degrees Celsius                          |
//! | `emergence_date`   | yes      | date, may be missing                     |
//! | `emergence_time`   | yes      | `AM` / `PM`, may be missing              |
//! | `death_date`       | yes      | date, may be missing                     |
//! | `death_time`       | yes      | `AM` / `PM`, may be missing              |
//! | `notes`            | no       | free text                                |
//!
//! Empty cells and `NA` are missing values.
//!
//! # Missing vs malformed values
//!
//! Missing sex or treatment temperatures drop the row from every analysis;
//! missing emergence or death drops it from survival analysis only. Both are
//! counted in [`ExclusionSummary`]. A value that is present but cannot be
//! parsed, a duplicated id, or a death stamp earlier than the emergence stamp
//! is an input error and aborts loading.

use std::{collections::BTreeSet, io, path::Path};

use chrono::NaiveDate;
use serde::Serialize;

use crate::record::{DayPeriod, HalfDayStamp, Individual, ParseFieldError, Sex, Temperature};

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// `chrono` format string for date columns.
    pub date_format: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    #[display("failed to read CSV input: {_0}")]
    Csv(csv::Error),
    #[display("missing required column '{column}'")]
    MissingColumn { column: &'static str },
    #[display("row {row}, column '{column}': {source}")]
    Field {
        row: usize,
        column: &'static str,
        source: ParseFieldError,
    },
    #[display("row {row}, column '{column}': invalid date '{value}'")]
    Date {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[display("row {row}, column '{column}': invalid number '{value}'")]
    Number {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[display("row {row}: id is empty")]
    EmptyId { row: usize },
    #[display("row {row}: duplicate id '{id}'")]
    DuplicateId { row: usize, id: String },
    #[display("individual '{id}': death ({death}) precedes emergence ({emergence})")]
    DeathBeforeEmergence {
        id: String,
        emergence: HalfDayStamp,
        death: HalfDayStamp,
    },
    #[display("input contains no usable individuals")]
    Empty,
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Counts of rows dropped by the drop-incomplete-rows policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExclusionSummary {
    /// Rows read from the file.
    pub rows_read: usize,
    /// Rows dropped for missing sex or treatment temperature.
    pub missing_covariates: usize,
    /// Individuals kept but lacking emergence or death stamps.
    pub missing_lifespan: usize,
}

/// The loaded experiment.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub individuals: Vec<Individual>,
    pub exclusions: ExclusionSummary,
}

struct Columns {
    id: usize,
    pupal_mass: usize,
    sex: usize,
    acclimation: usize,
    exposure: usize,
    emergence_date: usize,
    emergence_time: usize,
    death_date: usize,
    death_time: usize,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require =
            |name: &'static str| find(name).ok_or(LoadError::MissingColumn { column: name });
        Ok(Self {
            id: require("id")?,
            pupal_mass: require("pupal_mass")?,
            sex: require("sex")?,
            acclimation: require("acclimation_temp")?,
            exposure: require("exposure_temp")?,
            emergence_date: require("emergence_date")?,
            emergence_time: require("emergence_time")?,
            death_date: require("death_date")?,
            death_time: require("death_time")?,
            notes: find("notes"),
        })
    }
}

/// Returns the trimmed cell, or `None` for empty / `NA` cells.
fn cell(record: &csv::StringRecord, index: usize) -> Option<&str> {
    let value = record.get(index)?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("na") {
        None
    } else {
        Some(value)
    }
}

struct RowParser<'a> {
    row: usize,
    record: &'a csv::StringRecord,
    options: &'a LoadOptions,
}

impl RowParser<'_> {
    fn field<T>(&self, index: usize, column: &'static str) -> Result<Option<T>, LoadError>
    where
        T: std::str::FromStr<Err = ParseFieldError>,
    {
        cell(self.record, index)
            .map(|value| {
                value.parse().map_err(|source| LoadError::Field {
                    row: self.row,
                    column,
                    source,
                })
            })
            .transpose()
    }

    fn number(&self, index: usize, column: &'static str) -> Result<Option<f64>, LoadError> {
        cell(self.record, index)
            .map(|value| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| LoadError::Number {
                        row: self.row,
                        column,
                        value: value.to_owned(),
                    })
            })
            .transpose()
    }

    fn date(&self, index: usize, column: &'static str) -> Result<Option<NaiveDate>, LoadError> {
        cell(self.record, index)
            .map(|value| {
                NaiveDate::parse_from_str(value, &self.options.date_format).map_err(|_| {
                    LoadError::Date {
                        row: self.row,
                        column,
                        value: value.to_owned(),
                    }
                })
            })
            .transpose()
    }

    fn stamp(
        &self,
        date_index: usize,
        date_column: &'static str,
        time_index: usize,
        time_column: &'static str,
    ) -> Result<Option<HalfDayStamp>, LoadError> {
        let date = self.date(date_index, date_column)?;
        let period = self.field::<DayPeriod>(time_index, time_column)?;
        Ok(date.zip(period).map(|(d, p)| HalfDayStamp::new(d, p)))
    }
}

impl Dataset {
    /// Reads the experiment table from a CSV file.
    pub fn from_path<P>(path: P, options: &LoadOptions) -> Result<Self, LoadError>
    where
        P: AsRef<Path>,
    {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        Self::from_csv_reader(reader, options)
    }

    /// Reads the experiment table from any CSV source.
    ///
    /// ```
    /// use mothsurv_analysis::dataset::{Dataset, LoadOptions};
    ///
    /// let csv = "\
    /// id,pupal_mass,sex,acclimation_temp,exposure_temp,emergence_date,emergence_time,death_date,death_time
    /// m1,0.21,F,20,25,2023-06-10,AM,2023-06-14,PM
    /// m2,NA,M,20,30,2023-06-11,PM,,
    /// ";
    /// let dataset = Dataset::from_reader(csv.as_bytes(), &LoadOptions::default()).unwrap();
    /// assert_eq!(dataset.individuals.len(), 2);
    /// assert_eq!(dataset.exclusions.missing_lifespan, 1);
    /// ```
    pub fn from_reader<R>(reader: R, options: &LoadOptions) -> Result<Self, LoadError>
    where
        R: io::Read,
    {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        Self::from_csv_reader(reader, options)
    }

    fn from_csv_reader<R>(mut reader: csv::Reader<R>, options: &LoadOptions) -> Result<Self, LoadError>
    where
        R: io::Read,
    {
        let columns = Columns::from_headers(reader.headers()?)?;
        let mut individuals = Vec::new();
        let mut exclusions = ExclusionSummary::default();
        let mut seen_ids = BTreeSet::new();

        for (i, record) in reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let row = i + 2;
            exclusions.rows_read += 1;
            let parser = RowParser {
                row,
                record: &record,
                options,
            };

            let id = cell(&record, columns.id)
                .ok_or(LoadError::EmptyId { row })?
                .to_owned();
            if !seen_ids.insert(id.clone()) {
                return Err(LoadError::DuplicateId { row, id });
            }

            let sex = parser.field::<Sex>(columns.sex, "sex")?;
            let acclimation = parser.field::<Temperature>(columns.acclimation, "acclimation_temp")?;
            let exposure = parser.field::<Temperature>(columns.exposure, "exposure_temp")?;
            let pupal_mass = parser.number(columns.pupal_mass, "pupal_mass")?;
            let emergence = parser.stamp(
                columns.emergence_date,
                "emergence_date",
                columns.emergence_time,
                "emergence_time",
            )?;
            let death = parser.stamp(
                columns.death_date,
                "death_date",
                columns.death_time,
                "death_time",
            )?;
            let notes = columns
                .notes
                .and_then(|index| cell(&record, index))
                .map(str::to_owned);

            let (Some(sex), Some(acclimation), Some(exposure)) = (sex, acclimation, exposure)
            else {
                tracing::warn!(row, %id, "excluding individual with missing sex or treatment");
                exclusions.missing_covariates += 1;
                continue;
            };

            if let (Some(emergence), Some(death)) = (emergence, death) {
                if death < emergence {
                    return Err(LoadError::DeathBeforeEmergence {
                        id,
                        emergence,
                        death,
                    });
                }
            } else {
                tracing::debug!(row, %id, "individual has no complete lifespan");
                exclusions.missing_lifespan += 1;
            }

            individuals.push(Individual {
                id,
                sex,
                acclimation,
                exposure,
                emergence,
                death,
                pupal_mass,
                notes,
            });
        }

        if individuals.is_empty() {
            return Err(LoadError::Empty);
        }
        tracing::info!(
            individuals = individuals.len(),
            rows = exclusions.rows_read,
            "dataset loaded"
        );
        Ok(Self {
            individuals,
            exclusions,
        })
    }

    /// Writes the table back out in the input column layout.
    ///
    /// Missing values are written as `NA`; dates use `options.date_format`.
    pub fn write_csv<W>(&self, writer: W, options: &LoadOptions) -> Result<(), csv::Error>
    where
        W: io::Write,
    {
        const NA: &str = "NA";
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record([
            "id",
            "pupal_mass",
            "sex",
            "acclimation_temp",
            "exposure_temp",
            "emergence_date",
            "emergence_time",
            "death_date",
            "death_time",
            "notes",
        ])?;
        let stamp = |stamp: Option<HalfDayStamp>| match stamp {
            Some(s) => (
                s.date.format(&options.date_format).to_string(),
                s.period.code().to_owned(),
            ),
            None => (NA.to_owned(), NA.to_owned()),
        };
        for individual in &self.individuals {
            let (emergence_date, emergence_time) = stamp(individual.emergence);
            let (death_date, death_time) = stamp(individual.death);
            writer.write_record([
                individual.id.clone(),
                individual
                    .pupal_mass
                    .map_or_else(|| NA.to_owned(), |m| m.to_string()),
                individual.sex.code().to_owned(),
                individual.acclimation.celsius().to_string(),
                individual.exposure.celsius().to_string(),
                emergence_date,
                emergence_time,
                death_date,
                death_time,
                individual.notes.clone().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Sorted distinct acclimation temperatures.
    #[must_use]
    pub fn acclimation_levels(&self) -> Vec<Temperature> {
        self.individuals
            .iter()
            .map(|i| i.acclimation)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Sorted distinct exposure temperatures.
    #[must_use]
    pub fn exposure_levels(&self) -> Vec<Temperature> {
        self.individuals
            .iter()
            .map(|i| i.exposure)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    use super::*;
    use crate::simulate::{SimulationConfig, simulate};

    const HEADER: &str = "id,pupation_date,pupal_mass,sex,acclimation_temp,exposure_temp,emergence_date,emergence_time,death_date,death_time,notes\n";

    fn load(rows: &str) -> Result<Dataset, LoadError> {
        let input = format!("{HEADER}{rows}");
        Dataset::from_reader(input.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn test_complete_row() {
        let dataset =
            load("a1,2023-06-01,0.25,F,20,30,2023-06-10,AM,2023-06-14,PM,healthy\n").unwrap();
        let ind = &dataset.individuals[0];
        assert_eq!(ind.id, "a1");
        assert_eq!(ind.sex, Sex::Female);
        assert_eq!(ind.exposure, Temperature::from_celsius_whole(30));
        assert_eq!(ind.pupal_mass, Some(0.25));
        assert_eq!(ind.notes.as_deref(), Some("healthy"));
        assert!(ind.has_lifespan());
        assert_eq!(dataset.exclusions.rows_read, 1);
    }

    #[test]
    fn test_missing_covariates_are_dropped() {
        let dataset = load(
            "a1,,0.25,F,20,30,2023-06-10,AM,2023-06-14,PM,\n\
             a2,,0.30,,20,30,2023-06-10,AM,2023-06-12,AM,\n\
             a3,,0.30,M,NA,30,2023-06-10,AM,2023-06-12,AM,\n",
        )
        .unwrap();
        assert_eq!(dataset.individuals.len(), 1);
        assert_eq!(dataset.exclusions.missing_covariates, 2);
    }

    #[test]
    fn test_missing_lifespan_is_kept() {
        let dataset = load(
            "a1,,0.25,F,20,30,2023-06-10,AM,,,\n\
             a2,,,M,25,30,2023-06-10,,2023-06-12,AM,\n",
        )
        .unwrap();
        assert_eq!(dataset.individuals.len(), 2);
        assert_eq!(dataset.exclusions.missing_lifespan, 2);
        assert!(dataset.individuals.iter().all(|i| !i.has_lifespan()));
    }

    #[test]
    fn test_death_before_emergence_is_an_error() {
        let err = load("a1,,0.25,F,20,30,2023-06-10,PM,2023-06-10,AM,\n").unwrap_err();
        assert!(matches!(err, LoadError::DeathBeforeEmergence { .. }));
    }

    #[test]
    fn test_malformed_values_name_the_cell() {
        let err = load("a1,,heavy,F,20,30,2023-06-10,AM,2023-06-14,PM,\n").unwrap_err();
        assert_eq!(
            err.to_string(),
            "row 2, column 'pupal_mass': invalid number 'heavy'"
        );
        let err = load("a1,,0.2,F,20,30,10/06/2023,AM,2023-06-14,PM,\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::Date {
                column: "emergence_date",
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_id() {
        let err = load(
            "a1,,0.25,F,20,30,2023-06-10,AM,2023-06-14,PM,\n\
             a1,,0.25,F,20,30,2023-06-10,AM,2023-06-14,PM,\n",
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId { row: 3, .. }));
    }

    #[test]
    fn test_missing_column() {
        let input = "id,sex\na1,F\n";
        let err = Dataset::from_reader(input.as_bytes(), &LoadOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn {
                column: "pupal_mass"
            }
        ));
    }

    #[test]
    fn test_custom_date_format_and_levels() {
        let input = format!(
            "{HEADER}a1,,0.2,F,25,30,10/06/2023,AM,14/06/2023,PM,\n\
             a2,,0.2,M,20,35,10/06/2023,AM,12/06/2023,PM,\n"
        );
        let options = LoadOptions {
            date_format: "%d/%m/%Y".to_owned(),
        };
        let dataset = Dataset::from_reader(input.as_bytes(), &options).unwrap();
        assert_eq!(
            dataset.acclimation_levels(),
            vec![
                Temperature::from_celsius_whole(20),
                Temperature::from_celsius_whole(25)
            ]
        );
        assert_eq!(dataset.exposure_levels().len(), 2);
    }

    #[test]
    fn test_written_table_loads_back() {
        let dataset = load(
            "a1,,0.25,F,20,30,2023-06-10,AM,2023-06-14,PM,healthy\n\
             a2,,NA,M,22.5,30,2023-06-10,PM,,,\n",
        )
        .unwrap();
        let mut buf = Vec::new();
        dataset.write_csv(&mut buf, &LoadOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("a2,NA,M,22.5,30,2023-06-10,PM,NA,NA,"));

        let reloaded = Dataset::from_reader(text.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(reloaded.individuals, dataset.individuals);
    }

    #[test]
    fn test_written_masses_keep_full_precision() {
        let config = SimulationConfig {
            per_cell: 2,
            ..SimulationConfig::default()
        };
        let dataset = simulate(&config, &mut Pcg64::seed_from_u64(6));
        let mut buf = Vec::new();
        dataset.write_csv(&mut buf, &LoadOptions::default()).unwrap();
        let reloaded =
            Dataset::from_reader(buf.as_slice(), &LoadOptions::default()).unwrap();
        let masses = |d: &Dataset| d.individuals.iter().map(|i| i.pupal_mass).collect::<Vec<_>>();
        assert_eq!(masses(&reloaded), masses(&dataset));
        assert_eq!(reloaded.individuals, dataset.individuals);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(load(""), Err(LoadError::Empty)));
    }
}
