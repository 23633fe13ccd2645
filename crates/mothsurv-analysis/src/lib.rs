//! Survival analysis of moth temperature experiments
//!
//! This crate turns a table of individually tracked moths into adult lifespan
//! data, fits Cox proportional-hazards models of how sex, developmental
//! (acclimation) temperature and adult (exposure) temperature affect the
//! hazard of death, ranks candidate models and checks the chosen one.
//!
//! # Overview
//!
//! The analysis runs as a pipeline:
//!
//! 1. **Load** ([`dataset::Dataset`]): parse the CSV table into
//!    [`record::Individual`]s, dropping rows with missing covariates
//! 2. **Durations** ([`duration::SurvivalSubject`]): half-day resolved adult
//!    lifespan for every individual with emergence and death stamps
//! 3. **Reshape** ([`interval::IntervalDataset`]): one `(start, stop]` record
//!    per half-day alive, death flagged on the last one
//! 4. **Fit** ([`cox::CoxFit`]): Cox regression on a model formula
//!    ([`terms::ModelSpec`])
//! 5. **Select** ([`selection::ModelSelector`]): fit a candidate menu and rank
//!    it by AICc
//! 6. **Check** ([`diagnostics::Diagnostics`]): martingale residuals and the
//!    proportional-hazards test
//!
//! Alongside the pipeline, [`summary`] computes grouped descriptive tables and
//! ANOVAs, [`survival`] computes Kaplan-Meier curves per group and
//! [`simulate`] draws synthetic experiments.
//!
//! # Examples
//!
//! ```
//! use mothsurv_analysis::{
//!     duration::survival_subjects,
//!     interval::{IntervalDataset, ZeroDurationPolicy},
//!     selection::{ModelSelector, SelectionOptions},
//!     simulate::{SimulationConfig, simulate},
//!     terms::default_candidates,
//! };
//! use rand::SeedableRng;
//!
//! let dataset = simulate(&SimulationConfig::default(), &mut rand_pcg::Pcg64::seed_from_u64(5));
//! let subjects = survival_subjects(&dataset);
//! let intervals = IntervalDataset::from_subjects(&subjects, ZeroDurationPolicy::HalfDay);
//!
//! let selector = ModelSelector::new(&intervals, SelectionOptions::default());
//! let selection = selector.rank(&default_candidates()).unwrap();
//! let best = selection.best().unwrap();
//! println!("best model: {} (AICc {:.1})", best.model, best.aicc);
//! for hr in best.fit.hazard_ratios(0.95) {
//!     println!("{}: HR {:.2} [{:.2}, {:.2}]", hr.term, hr.hr, hr.lower, hr.upper);
//! }
//! ```

pub mod cox;
pub mod dataset;
pub mod diagnostics;
pub mod duration;
pub mod interval;
pub mod record;
pub mod selection;
pub mod simulate;
pub mod summary;
pub mod survival;
pub mod terms;
