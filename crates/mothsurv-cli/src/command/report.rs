use std::path::PathBuf;

use clap::Args;
use mothsurv_analysis::{
    cox::{HazardRatio, LikelihoodRatioTest},
    dataset::ExclusionSummary,
    diagnostics::Diagnostics,
    interval::ZeroDurationPolicy,
    selection::Selection,
    summary::GroupSummary,
    survival::{SurvivalStats, SurvivalStatsMap, TreatmentGroup},
};
use mothsurv_stats::anova::AnovaTable;
use serde::Serialize;

use super::{
    InputArg, ModelArg,
    diagnose::{self, DiagnosticsArg},
    select, summarize, table,
};
use crate::util::{self, Output};

#[derive(Debug, Clone, Args)]
pub(crate) struct ReportArg {
    #[clap(flatten)]
    pub input: InputArg,

    #[clap(flatten)]
    pub model: ModelArg,

    #[clap(flatten)]
    pub diagnostics: DiagnosticsArg,

    /// Write the interval dataset as CSV to this path
    #[arg(long)]
    pub intervals_output: Option<PathBuf>,

    /// Write Kaplan-Meier curves per treatment group as CSV to this path
    #[arg(long)]
    pub km_output: Option<PathBuf>,

    /// Save the full report as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Report<'a> {
    input: String,
    zero_duration: ZeroDurationPolicy,
    conf_level: f64,
    exclusions: &'a ExclusionSummary,
    subjects: usize,
    intervals: usize,
    deaths: usize,
    excluded_zero_duration: usize,
    groups: &'a [GroupSummary<TreatmentGroup>],
    survival_anova: Option<&'a AnovaTable>,
    pupal_mass_anova: Option<&'a AnovaTable>,
    kaplan_meier: Vec<KmGroup<'a>>,
    selection: &'a Selection,
    best_model: Option<BestModel>,
    diagnostics: Option<&'a Diagnostics>,
}

/// Map keys of [`SurvivalStatsMap`] are structs, which JSON objects cannot hold.
#[derive(Debug, Serialize)]
struct KmGroup<'a> {
    group: TreatmentGroup,
    label: String,
    #[serde(flatten)]
    stats: &'a SurvivalStats,
}

#[derive(Debug, Serialize)]
struct BestModel {
    model: String,
    iterations: usize,
    log_likelihood: f64,
    null_log_likelihood: f64,
    likelihood_ratio_test: LikelihoodRatioTest,
    hazard_ratios: Vec<HazardRatio>,
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    table::print_heading(&format!("Moth Survival Report ({})", arg.input.input.display()));

    let summary =
        summarize::print_summary(&dataset, &intervals, arg.model.temperature_coding);
    if let Some(path) = &arg.intervals_output {
        util::save_csv("Interval dataset", path.clone(), |w| intervals.write_csv(w))?;
        println!();
    }

    println!("Kaplan-Meier by treatment group:");
    let km = SurvivalStatsMap::collect_by_group(&intervals, TreatmentGroup::of);
    table::print_km_table("Group", &km);
    if let Some(path) = &arg.km_output {
        util::save_csv("KM curves", path.clone(), |w| {
            km.write_curves_csv(w, arg.model.conf_level)
        })?;
    }
    println!();

    table::print_heading("Cox Model Selection");
    let selection = select::select_models(&intervals, &arg.model)?;
    select::print_selection(&selection, arg.model.conf_level);
    println!();

    let diagnostics = match selection.best() {
        Some(best) => {
            table::print_heading("Cox Model Diagnostics");
            Some(diagnose::diagnose(&intervals, &best.fit, &arg.diagnostics)?)
        }
        None => None,
    };

    if let Some(path) = &arg.json {
        let report = Report {
            input: arg.input.input.display().to_string(),
            zero_duration: intervals.policy(),
            conf_level: arg.model.conf_level,
            exclusions: &dataset.exclusions,
            subjects: intervals.subjects().len(),
            intervals: intervals.intervals().len(),
            deaths: intervals.event_count(),
            excluded_zero_duration: intervals.excluded_zero_duration(),
            groups: &summary.by_group,
            survival_anova: summary.survival_anova.as_ref(),
            pupal_mass_anova: summary.pupal_mass_anova.as_ref(),
            kaplan_meier: km
                .map
                .iter()
                .map(|(group, stats)| KmGroup {
                    group: *group,
                    label: group.to_string(),
                    stats,
                })
                .collect(),
            selection: &selection,
            best_model: selection.best().map(|best| BestModel {
                model: best.model.clone(),
                iterations: best.fit.iterations,
                log_likelihood: best.fit.log_likelihood,
                null_log_likelihood: best.fit.null_log_likelihood,
                likelihood_ratio_test: best.fit.likelihood_ratio_test(),
                hazard_ratios: best.fit.hazard_ratios(arg.model.conf_level),
            }),
            diagnostics: diagnostics.as_ref(),
        };
        Output::save_json(&report, Some(path.clone()))?;
        println!();
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}
