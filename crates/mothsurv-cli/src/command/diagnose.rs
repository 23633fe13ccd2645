use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mothsurv_analysis::{
    cox::CoxFit,
    diagnostics::{self, Diagnostics, DiagnosticsOptions, TimeTransform},
    interval::IntervalDataset,
    selection::ModelSelector,
    terms::ModelSpec,
};

use super::{InputArg, ModelArg, select, table};
use crate::util;

/// Diagnostics options shared by `diagnose` and `report`.
#[derive(Debug, Clone, Args)]
pub(crate) struct DiagnosticsArg {
    /// Time scale of the proportional-hazards test (km, rank, identity)
    #[arg(long, default_value = "km")]
    pub time_transform: TimeTransform,

    /// Write scaled Schoenfeld residuals as CSV to this path
    #[arg(long)]
    pub schoenfeld_output: Option<PathBuf>,

    /// Write martingale residuals as CSV to this path
    #[arg(long)]
    pub residuals_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct DiagnoseArg {
    #[clap(flatten)]
    pub input: InputArg,

    #[clap(flatten)]
    pub model: ModelArg,

    #[clap(flatten)]
    pub diagnostics: DiagnosticsArg,

    /// Model to check; defaults to the best-ranked candidate
    #[arg(long, value_name = "FORMULA")]
    pub formula: Option<ModelSpec>,
}

pub(crate) fn run(arg: &DiagnoseArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    table::print_heading("Cox Model Diagnostics");
    let fit = match &arg.formula {
        Some(spec) => {
            let selector = ModelSelector::new(&intervals, arg.model.selection_options());
            selector
                .fit(spec)
                .with_context(|| format!("Failed to fit model '{spec}'"))?
        }
        None => {
            let mut selection = select::select_models(&intervals, &arg.model)?;
            anyhow::ensure!(!selection.ranking.is_empty(), "No model was fitted");
            selection.ranking.swap_remove(0).fit
        }
    };
    table::print_fit(&fit, arg.model.conf_level);
    println!();
    diagnose(&intervals, &fit, &arg.diagnostics)?;
    Ok(())
}

/// Computes, prints and optionally saves the diagnostics of `fit`.
pub(super) fn diagnose(
    intervals: &IntervalDataset,
    fit: &CoxFit,
    arg: &DiagnosticsArg,
) -> anyhow::Result<Diagnostics> {
    let options = DiagnosticsOptions {
        time_transform: arg.time_transform,
    };
    let diagnostics = Diagnostics::compute(intervals, fit, &options)
        .with_context(|| format!("Diagnostics of model '{}' failed", fit.model))?;
    table::print_diagnostics(&diagnostics);

    if arg.schoenfeld_output.is_some() || arg.residuals_output.is_some() {
        println!();
    }
    if let Some(path) = &arg.schoenfeld_output {
        util::save_csv("Scaled Schoenfeld residuals", path.clone(), |w| {
            diagnostics.schoenfeld.write_csv(w)
        })?;
    }
    if let Some(path) = &arg.residuals_output {
        util::save_csv("Martingale residuals", path.clone(), |w| {
            diagnostics::write_martingale_csv(intervals, &diagnostics.martingale, w)
        })?;
    }
    Ok(diagnostics)
}
