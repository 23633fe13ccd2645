//! Model terms, formulas and design matrices
//!
//! Candidate models are written as small R-like formulas over the three
//! experimental factors:
//!
//! ```text
//! sex + acclimation * exposure
//!     == sex + acclimation + exposure + acclimation:exposure
//! ```
//!
//! `a:b` is the interaction alone and `a*b` expands to both main effects plus
//! the interaction. Interactions always bring their main effects along, so a
//! parsed [`ModelSpec`] is hierarchical. Terms are kept in a canonical order
//! (main effects first, then interactions) and the canonical formula string is
//! the model's name: two formulas describing the same model get the same name.
//!
//! # Coding
//!
//! Sex is a single indicator column `sex[M]` (females are the reference).
//! Temperatures are coded according to [`TemperatureCoding`]: treatment
//! contrasts against the lowest level (`exposure[30°C]`, ...) or a single
//! linear column in degrees above the lowest level. Interaction columns are
//! products of the main-effect columns.

use std::{collections::BTreeSet, fmt, str::FromStr};

use ndarray::Array2;
use serde::Serialize;

use crate::{
    duration::SurvivalSubject,
    record::{Individual, Sex, Temperature},
};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ModelError {
    #[display("empty model formula")]
    EmptyFormula,
    #[display("unknown covariate '{name}' (expected sex, acclimation or exposure)")]
    UnknownCovariate { name: String },
    #[display("unsupported term '{term}': only two-way interactions are allowed")]
    UnsupportedTerm { term: String },
    #[display("term '{term}' has no columns: the data contain a single level")]
    DegenerateTerm { term: String },
}

/// One experimental factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Covariate {
    Sex,
    Acclimation,
    Exposure,
}

impl Covariate {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Covariate::Sex => "sex",
            Covariate::Acclimation => "acclimation",
            Covariate::Exposure => "exposure",
        }
    }
}

impl fmt::Display for Covariate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Covariate {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sex" => Ok(Covariate::Sex),
            "acclimation" | "acclimation_temp" | "acc" => Ok(Covariate::Acclimation),
            "exposure" | "exposure_temp" | "exp" => Ok(Covariate::Exposure),
            _ => Err(ModelError::UnknownCovariate {
                name: s.trim().to_owned(),
            }),
        }
    }
}

/// Access to the experimental factors of a record.
pub trait Covariates {
    fn sex(&self) -> Sex;
    fn acclimation(&self) -> Temperature;
    fn exposure(&self) -> Temperature;
}

impl Covariates for SurvivalSubject {
    fn sex(&self) -> Sex {
        self.sex
    }
    fn acclimation(&self) -> Temperature {
        self.acclimation
    }
    fn exposure(&self) -> Temperature {
        self.exposure
    }
}

impl Covariates for Individual {
    fn sex(&self) -> Sex {
        self.sex
    }
    fn acclimation(&self) -> Temperature {
        self.acclimation
    }
    fn exposure(&self) -> Temperature {
        self.exposure
    }
}

impl<T> Covariates for &T
where
    T: Covariates,
{
    fn sex(&self) -> Sex {
        (**self).sex()
    }
    fn acclimation(&self) -> Temperature {
        (**self).acclimation()
    }
    fn exposure(&self) -> Temperature {
        (**self).exposure()
    }
}

/// A model term: a main effect or a two-way interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Term {
    Main(Covariate),
    /// Always stored with the first covariate ordered before the second.
    Interaction(Covariate, Covariate),
}

impl Term {
    #[must_use]
    pub fn interaction(a: Covariate, b: Covariate) -> Self {
        if a <= b {
            Term::Interaction(a, b)
        } else {
            Term::Interaction(b, a)
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Main(c) => write!(f, "{c}"),
            Term::Interaction(a, b) => write!(f, "{a}:{b}"),
        }
    }
}

/// A candidate proportional-hazards model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ModelSpec {
    terms: Vec<Term>,
}

impl ModelSpec {
    /// Builds a hierarchical model from arbitrary terms.
    #[must_use]
    pub fn new<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        let mut set = BTreeSet::new();
        for term in terms {
            if let Term::Interaction(a, b) = term {
                set.insert(Term::Main(a));
                set.insert(Term::Main(b));
            }
            set.insert(term);
        }
        // `Term` orders `Main` before `Interaction`
        Self {
            terms: set.into_iter().collect(),
        }
    }

    /// Parses an R-like formula such as `sex + acclimation*exposure`.
    ///
    /// ```
    /// use mothsurv_analysis::terms::ModelSpec;
    ///
    /// let spec = ModelSpec::parse("exposure*acclimation + sex").unwrap();
    /// assert_eq!(spec.name(), "sex + acclimation + exposure + acclimation:exposure");
    /// ```
    pub fn parse(formula: &str) -> Result<Self, ModelError> {
        let formula = formula
            .split_once('~')
            .map_or(formula, |(_, rhs)| rhs)
            .trim();
        if formula.is_empty() {
            return Err(ModelError::EmptyFormula);
        }
        let mut terms = Vec::new();
        for piece in formula.split('+').map(str::trim) {
            if piece.is_empty() {
                return Err(ModelError::EmptyFormula);
            }
            let (factors, crossed) = if piece.contains('*') {
                (piece.split('*').collect::<Vec<_>>(), true)
            } else {
                (piece.split(':').collect::<Vec<_>>(), false)
            };
            let covariates = factors
                .into_iter()
                .map(str::parse::<Covariate>)
                .collect::<Result<Vec<_>, _>>()?;
            match covariates.as_slice() {
                [single] => terms.push(Term::Main(*single)),
                [a, b] if a != b => {
                    if crossed {
                        terms.push(Term::Main(*a));
                        terms.push(Term::Main(*b));
                    }
                    terms.push(Term::interaction(*a, *b));
                }
                _ => {
                    return Err(ModelError::UnsupportedTerm {
                        term: piece.to_owned(),
                    });
                }
            }
        }
        Ok(Self::new(terms))
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Canonical formula string, used as the model's name.
    #[must_use]
    pub fn name(&self) -> String {
        self.terms
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

impl FromStr for ModelSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The fixed candidate menu, from sex-only to main effects plus both interactions.
#[must_use]
pub fn default_candidates() -> Vec<ModelSpec> {
    use Covariate::{Acclimation, Exposure, Sex};
    let main = [Term::Main(Sex), Term::Main(Acclimation), Term::Main(Exposure)];
    let acc_exp = Term::interaction(Acclimation, Exposure);
    let sex_exp = Term::interaction(Sex, Exposure);
    vec![
        ModelSpec::new([Term::Main(Sex)]),
        ModelSpec::new([Term::Main(Sex), Term::Main(Acclimation)]),
        ModelSpec::new([Term::Main(Sex), Term::Main(Exposure)]),
        ModelSpec::new(main),
        ModelSpec::new(main.into_iter().chain([acc_exp])),
        ModelSpec::new(main.into_iter().chain([sex_exp])),
        ModelSpec::new(main.into_iter().chain([acc_exp, sex_exp])),
    ]
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr, Serialize)]
pub enum TemperatureCoding {
    /// Treatment contrasts against the lowest level.
    #[default]
    Categorical,
    /// One column: degrees above the lowest level.
    Linear,
}

/// Named columns of one term or of a whole model.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub column_names: Vec<String>,
    /// Index into the model's terms for every column.
    pub column_terms: Vec<usize>,
    /// One row per record.
    pub matrix: Array2<f64>,
}

impl DesignMatrix {
    #[must_use]
    pub fn ncols(&self) -> usize {
        self.column_names.len()
    }
}

/// Turns covariate values into numeric columns with fixed factor levels.
#[derive(Debug, Clone)]
pub struct CovariateEncoder {
    coding: TemperatureCoding,
    acclimation_levels: Vec<Temperature>,
    exposure_levels: Vec<Temperature>,
}

impl CovariateEncoder {
    /// Derives factor levels from the records that will be modelled.
    #[must_use]
    pub fn from_records<R>(records: &[R], coding: TemperatureCoding) -> Self
    where
        R: Covariates,
    {
        let acclimation_levels = records
            .iter()
            .map(Covariates::acclimation)
            .collect::<BTreeSet<_>>();
        let exposure_levels = records
            .iter()
            .map(Covariates::exposure)
            .collect::<BTreeSet<_>>();
        Self {
            coding,
            acclimation_levels: acclimation_levels.into_iter().collect(),
            exposure_levels: exposure_levels.into_iter().collect(),
        }
    }

    fn temperature_levels(&self, covariate: Covariate) -> &[Temperature] {
        match covariate {
            Covariate::Acclimation => &self.acclimation_levels,
            Covariate::Exposure => &self.exposure_levels,
            Covariate::Sex => &[],
        }
    }

    /// Column names of a main effect.
    fn main_columns(&self, covariate: Covariate) -> Vec<String> {
        match covariate {
            Covariate::Sex => vec![format!("sex[{}]", Sex::Male)],
            Covariate::Acclimation | Covariate::Exposure => {
                let levels = self.temperature_levels(covariate);
                match self.coding {
                    TemperatureCoding::Categorical => levels
                        .iter()
                        .skip(1)
                        .map(|level| format!("{covariate}[{level}]"))
                        .collect(),
                    TemperatureCoding::Linear if levels.len() > 1 => {
                        vec![covariate.name().to_owned()]
                    }
                    TemperatureCoding::Linear => vec![],
                }
            }
        }
    }

    /// Values of a main effect's columns for one record.
    fn main_values<R>(&self, covariate: Covariate, record: &R) -> Vec<f64>
    where
        R: Covariates,
    {
        let temperature = match covariate {
            Covariate::Sex => {
                return vec![if record.sex() == Sex::Male { 1.0 } else { 0.0 }];
            }
            Covariate::Acclimation => record.acclimation(),
            Covariate::Exposure => record.exposure(),
        };
        let levels = self.temperature_levels(covariate);
        match self.coding {
            TemperatureCoding::Categorical => levels
                .iter()
                .skip(1)
                .map(|level| if *level == temperature { 1.0 } else { 0.0 })
                .collect(),
            TemperatureCoding::Linear if levels.len() > 1 => {
                let reference = levels.first().map_or(0.0, |t| t.celsius());
                vec![temperature.celsius() - reference]
            }
            TemperatureCoding::Linear => vec![],
        }
    }

    fn term_columns(&self, term: Term) -> Vec<String> {
        match term {
            Term::Main(c) => self.main_columns(c),
            Term::Interaction(a, b) => {
                let right = self.main_columns(b);
                self.main_columns(a)
                    .iter()
                    .flat_map(|l| right.iter().map(move |r| format!("{l}:{r}")))
                    .collect()
            }
        }
    }

    fn term_values<R>(&self, term: Term, record: &R) -> Vec<f64>
    where
        R: Covariates,
    {
        match term {
            Term::Main(c) => self.main_values(c, record),
            Term::Interaction(a, b) => {
                let right = self.main_values(b, record);
                self.main_values(a, record)
                    .iter()
                    .flat_map(|l| right.iter().map(move |r| l * r))
                    .collect()
            }
        }
    }

    /// Design matrix of a single term.
    pub fn term_design<R>(&self, term: Term, records: &[R]) -> Result<DesignMatrix, ModelError>
    where
        R: Covariates,
    {
        self.design_for_terms(&[term], records)
    }

    /// Design matrix of a model, one row per record.
    pub fn design<R>(&self, spec: &ModelSpec, records: &[R]) -> Result<DesignMatrix, ModelError>
    where
        R: Covariates,
    {
        self.design_for_terms(spec.terms(), records)
    }

    fn design_for_terms<R>(&self, terms: &[Term], records: &[R]) -> Result<DesignMatrix, ModelError>
    where
        R: Covariates,
    {
        let mut column_names = Vec::new();
        let mut column_terms = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            let names = self.term_columns(*term);
            if names.is_empty() {
                return Err(ModelError::DegenerateTerm {
                    term: term.to_string(),
                });
            }
            column_terms.extend(std::iter::repeat_n(index, names.len()));
            column_names.extend(names);
        }

        let mut matrix = Array2::<f64>::zeros((records.len(), column_names.len()));
        for (row, record) in records.iter().enumerate() {
            let values = terms
                .iter()
                .flat_map(|term| self.term_values(*term, record));
            for (col, value) in values.enumerate() {
                matrix[[row, col]] = value;
            }
        }

        Ok(DesignMatrix {
            column_names,
            column_terms,
            matrix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::SurvivalDuration;

    fn subject(sex: Sex, acc: i32, exp: i32) -> SurvivalSubject {
        SurvivalSubject {
            id: format!("{sex}{acc}{exp}"),
            sex,
            acclimation: Temperature::from_celsius_whole(acc),
            exposure: Temperature::from_celsius_whole(exp),
            pupal_mass: None,
            duration: SurvivalDuration::from_half_days(4),
        }
    }

    #[test]
    fn test_parse_equivalent_formulas() {
        let a = ModelSpec::parse("sex + acclimation * exposure").unwrap();
        let b = ModelSpec::parse("exposure:acclimation + acclimation + sex + exposure").unwrap();
        let c = ModelSpec::parse("surv ~ sex + acc*exp").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.terms().len(), 4);
    }

    #[test]
    fn test_interaction_implies_main_effects() {
        let spec = ModelSpec::parse("sex:exposure").unwrap();
        assert_eq!(spec.name(), "sex + exposure + sex:exposure");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(ModelSpec::parse("  "), Err(ModelError::EmptyFormula));
        assert_eq!(ModelSpec::parse("sex + "), Err(ModelError::EmptyFormula));
        assert!(matches!(
            ModelSpec::parse("sex + mass"),
            Err(ModelError::UnknownCovariate { .. })
        ));
        assert!(matches!(
            ModelSpec::parse("sex*acclimation*exposure"),
            Err(ModelError::UnsupportedTerm { .. })
        ));
        assert!(matches!(
            ModelSpec::parse("sex:sex"),
            Err(ModelError::UnsupportedTerm { .. })
        ));
    }

    #[test]
    fn test_default_candidates_are_distinct_and_nested() {
        let candidates = default_candidates();
        assert_eq!(candidates.len(), 7);
        let names = candidates.iter().map(ModelSpec::name).collect::<BTreeSet<_>>();
        assert_eq!(names.len(), 7);
        assert_eq!(candidates[0].name(), "sex");
        assert_eq!(
            candidates[6].name(),
            "sex + acclimation + exposure + sex:exposure + acclimation:exposure"
        );
    }

    #[test]
    fn test_categorical_design() {
        let records = vec![
            subject(Sex::Female, 20, 25),
            subject(Sex::Male, 25, 30),
            subject(Sex::Male, 30, 30),
        ];
        let encoder = CovariateEncoder::from_records(&records, TemperatureCoding::Categorical);
        let spec = ModelSpec::parse("sex + acclimation*exposure").unwrap();
        let design = encoder.design(&spec, &records).unwrap();
        assert_eq!(
            design.column_names,
            [
                "sex[M]",
                "acclimation[25°C]",
                "acclimation[30°C]",
                "exposure[30°C]",
                "acclimation[25°C]:exposure[30°C]",
                "acclimation[30°C]:exposure[30°C]",
            ]
        );
        assert_eq!(design.column_terms, [0, 1, 1, 2, 3, 3]);
        assert_eq!(design.matrix.row(0).to_vec(), [0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(design.matrix.row(1).to_vec(), [1.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
        assert_eq!(design.matrix.row(2).to_vec(), [1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_linear_design() {
        let records = vec![subject(Sex::Female, 20, 25), subject(Sex::Male, 25, 35)];
        let encoder = CovariateEncoder::from_records(&records, TemperatureCoding::Linear);
        let spec = ModelSpec::parse("acclimation*exposure").unwrap();
        let design = encoder.design(&spec, &records).unwrap();
        assert_eq!(
            design.column_names,
            ["acclimation", "exposure", "acclimation:exposure"]
        );
        assert_eq!(design.matrix.row(1).to_vec(), [5.0, 10.0, 50.0]);
    }

    #[test]
    fn test_single_level_term_is_degenerate() {
        let records = vec![subject(Sex::Female, 20, 25), subject(Sex::Male, 20, 30)];
        let encoder = CovariateEncoder::from_records(&records, TemperatureCoding::Categorical);
        let spec = ModelSpec::parse("sex + acclimation").unwrap();
        assert_eq!(
            encoder.design(&spec, &records).unwrap_err(),
            ModelError::DegenerateTerm {
                term: "acclimation".into()
            }
        );
    }
}
