use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mothsurv_analysis::{
    cox::{CoxOptions, TieMethod},
    dataset::{DEFAULT_DATE_FORMAT, Dataset, LoadOptions},
    duration::survival_subjects,
    interval::{IntervalDataset, ZeroDurationPolicy},
    selection::{FailurePolicy, SelectionOptions},
    terms::{ModelSpec, TemperatureCoding, default_candidates},
};

use self::{
    diagnose::DiagnoseArg, km::KmArg, report::ReportArg, reshape::ReshapeArg, select::SelectArg,
    simulate::SimulateArg, summarize::SummarizeArg,
};
use crate::util;

mod diagnose;
mod km;
mod report;
mod reshape;
mod select;
mod simulate;
mod summarize;
mod table;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// Log more (-v info, -vv debug, -vvv trace); `RUST_LOG` overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// What to run
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Print exclusions, grouped descriptive tables and ANOVA tables
    Summarize(#[clap(flatten)] SummarizeArg),
    /// Write the half-day interval dataset as CSV
    Reshape(#[clap(flatten)] ReshapeArg),
    /// Kaplan-Meier medians per treatment group and curve CSV
    Km(#[clap(flatten)] KmArg),
    /// Fit candidate Cox models and rank them by AICc
    Select(#[clap(flatten)] SelectArg),
    /// Residual and proportional-hazards diagnostics of one model
    Diagnose(#[clap(flatten)] DiagnoseArg),
    /// Run the whole analysis, optionally saving a JSON report
    Report(#[clap(flatten)] ReportArg),
    /// Generate a synthetic experiment table
    Simulate(#[clap(flatten)] SimulateArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    util::init_tracing(args.verbose);
    match args.mode {
        Mode::Summarize(arg) => summarize::run(&arg)?,
        Mode::Reshape(arg) => reshape::run(&arg)?,
        Mode::Km(arg) => km::run(&arg)?,
        Mode::Select(arg) => select::run(&arg)?,
        Mode::Diagnose(arg) => diagnose::run(&arg)?,
        Mode::Report(arg) => report::run(&arg)?,
        Mode::Simulate(arg) => simulate::run(&arg)?,
    }
    Ok(())
}

/// Input table and how it is turned into interval data.
#[derive(Debug, Clone, Args)]
pub(crate) struct InputArg {
    /// Path to the experiment CSV file
    pub input: PathBuf,

    /// `chrono` format of the date columns
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    pub date_format: String,

    /// Handling of deaths recorded in the emergence half-day (halfday, exclude)
    #[arg(long, default_value = "halfday")]
    pub zero_duration: ZeroDurationPolicy,
}

impl InputArg {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            date_format: self.date_format.clone(),
        }
    }

    pub fn load(&self) -> anyhow::Result<Dataset> {
        util::read_dataset_file(&self.input, &self.load_options())
    }

    pub fn intervals(&self, dataset: &Dataset) -> IntervalDataset {
        let intervals =
            IntervalDataset::from_subjects(&survival_subjects(dataset), self.zero_duration);
        tracing::info!(
            subjects = intervals.subjects().len(),
            intervals = intervals.intervals().len(),
            excluded = intervals.excluded_zero_duration(),
            "interval dataset built"
        );
        intervals
    }
}

/// Cox model options shared by the fitting commands.
#[derive(Debug, Clone, Args)]
pub(crate) struct ModelArg {
    /// Temperature coding in the design matrix (categorical, linear)
    #[arg(long, default_value = "categorical")]
    pub temperature_coding: TemperatureCoding,

    /// Handling of tied death times (efron, breslow)
    #[arg(long, default_value = "efron")]
    pub ties: TieMethod,

    /// Report failed fits and rank the rest instead of aborting
    #[arg(long, default_value_t = false)]
    pub skip_failed: bool,

    /// Candidate model formula, e.g. "sex + acclimation * exposure" (repeatable)
    ///
    /// Without any, the built-in candidate menu is fitted.
    #[arg(long = "model", value_name = "FORMULA")]
    pub models: Vec<ModelSpec>,

    /// Confidence level of hazard ratio and survival intervals
    #[arg(long, default_value_t = 0.95, value_parser = parse_conf_level)]
    pub conf_level: f64,
}

impl ModelArg {
    pub fn selection_options(&self) -> SelectionOptions {
        SelectionOptions {
            cox: CoxOptions {
                ties: self.ties,
                ..CoxOptions::default()
            },
            coding: self.temperature_coding,
            failure_policy: if self.skip_failed {
                FailurePolicy::SkipFailed
            } else {
                FailurePolicy::Abort
            },
        }
    }

    pub fn candidates(&self) -> Vec<ModelSpec> {
        if self.models.is_empty() {
            default_candidates()
        } else {
            self.models.clone()
        }
    }
}

fn parse_conf_level(s: &str) -> Result<f64, String> {
    let level = s.parse::<f64>().map_err(|e| e.to_string())?;
    if level > 0.0 && level < 1.0 {
        Ok(level)
    } else {
        Err(format!("confidence level must be in (0, 1), got {level}"))
    }
}
