use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use mothsurv_analysis::{
    interval::IntervalDataset,
    selection::{ModelSelector, Selection},
};

use super::{InputArg, ModelArg, table};
use crate::util::Output;

#[derive(Debug, Clone, Args)]
pub(crate) struct SelectArg {
    #[clap(flatten)]
    pub input: InputArg,

    #[clap(flatten)]
    pub model: ModelArg,

    /// Save the ranking as JSON to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SelectArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    table::print_heading("Cox Model Selection");
    let selection = select_models(&intervals, &arg.model)?;
    print_selection(&selection, arg.model.conf_level);

    if let Some(path) = &arg.output {
        Output::save_json(&selection, Some(path.clone()))?;
        println!();
        println!("Ranking saved to: {}", path.display());
    }
    Ok(())
}

/// Fits and ranks the configured candidates.
pub(super) fn select_models(
    intervals: &IntervalDataset,
    model: &ModelArg,
) -> anyhow::Result<Selection> {
    let candidates = model.candidates();
    let selector = ModelSelector::new(intervals, model.selection_options());
    selector
        .rank(&candidates)
        .with_context(|| format!("Model selection over {} candidates failed", candidates.len()))
}

pub(super) fn print_selection(selection: &Selection, conf_level: f64) {
    println!("AICc ranking:");
    table::print_ranking(selection);
    println!();

    if let Some(best) = selection.best() {
        println!("Best model:");
        if let Some(runner_up) = selection.ranking.get(1) {
            println!(
                "  Runner-up  : {} (ΔAICc {:.2})",
                runner_up.model, runner_up.delta_aicc
            );
        }
        table::print_fit(&best.fit, conf_level);
    }
}
