use std::{fmt, path::PathBuf};

use clap::Args;
use mothsurv_analysis::{
    duration::SurvivalSubject,
    interval::IntervalDataset,
    survival::{SurvivalStatsMap, TreatmentGroup},
};

use super::{InputArg, table};
use crate::util;

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
pub enum GroupBy {
    #[default]
    Cell,
    Sex,
    Acclimation,
    Exposure,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct KmArg {
    #[clap(flatten)]
    pub input: InputArg,

    /// Grouping of the curves (cell, sex, acclimation, exposure)
    #[arg(long, default_value = "cell")]
    pub group_by: GroupBy,

    /// Confidence level of the pointwise survival limits
    #[arg(long, default_value_t = 0.95, value_parser = super::parse_conf_level)]
    pub conf_level: f64,

    /// Write plot-ready curve CSV to this path
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub(crate) fn run(arg: &KmArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    table::print_heading("Kaplan-Meier Survival");
    match arg.group_by {
        GroupBy::Cell => show(arg, &intervals, "Group", TreatmentGroup::of)?,
        GroupBy::Sex => show(arg, &intervals, "Sex", |s| s.sex)?,
        GroupBy::Acclimation => show(arg, &intervals, "Acclimation", |s| s.acclimation)?,
        GroupBy::Exposure => show(arg, &intervals, "Exposure", |s| s.exposure)?,
    }
    Ok(())
}

fn show<K, F>(
    arg: &KmArg,
    intervals: &IntervalDataset,
    label_col: &str,
    group: F,
) -> anyhow::Result<()>
where
    K: Ord + fmt::Display,
    F: FnMut(&SurvivalSubject) -> K,
{
    let stats = SurvivalStatsMap::collect_by_group(intervals, group);
    table::print_km_table(label_col, &stats);
    if let Some(path) = &arg.output {
        println!();
        util::save_csv("KM curves", path.clone(), |w| {
            stats.write_curves_csv(w, arg.conf_level)
        })?;
    }
    Ok(())
}
