use clap::Args;
use mothsurv_analysis::{
    dataset::Dataset,
    duration::survival_subjects,
    interval::IntervalDataset,
    summary::{self, GroupSummary},
    survival::TreatmentGroup,
    terms::TemperatureCoding,
};
use mothsurv_stats::anova::AnovaTable;

use super::{InputArg, table};

#[derive(Debug, Clone, Args)]
pub(crate) struct SummarizeArg {
    #[clap(flatten)]
    pub input: InputArg,

    /// Temperature coding of the ANOVA terms (categorical, linear)
    #[arg(long, default_value = "categorical")]
    pub temperature_coding: TemperatureCoding,
}

pub(crate) fn run(arg: &SummarizeArg) -> anyhow::Result<()> {
    let dataset = arg.input.load()?;
    let intervals = arg.input.intervals(&dataset);

    table::print_heading(&format!("Experiment Summary ({})", arg.input.input.display()));
    print_summary(&dataset, &intervals, arg.temperature_coding);
    Ok(())
}

/// Descriptive and ANOVA results shared by `summarize` and `report`.
pub(super) struct SummarySection {
    pub by_group: Vec<GroupSummary<TreatmentGroup>>,
    pub survival_anova: Option<AnovaTable>,
    pub pupal_mass_anova: Option<AnovaTable>,
}

impl SummarySection {
    pub fn compute(dataset: &Dataset, coding: TemperatureCoding) -> Self {
        let by_group = summary::summarize_by(dataset, TreatmentGroup::of);
        let survival_anova =
            match summary::survival_anova(&survival_subjects(dataset), coding) {
                Ok(table) => Some(table),
                Err(error) => {
                    tracing::warn!(%error, "lifespan ANOVA skipped");
                    None
                }
            };
        let pupal_mass_anova = match summary::pupal_mass_anova(dataset, coding) {
            Ok(table) => Some(table),
            Err(error) => {
                tracing::warn!(%error, "pupal mass ANOVA skipped");
                None
            }
        };
        Self {
            by_group,
            survival_anova,
            pupal_mass_anova,
        }
    }

    pub fn print(&self) {
        println!("By treatment group (lifespan in days, pupal mass in g):");
        table::print_group_summaries("Group", &self.by_group);
        println!();

        println!("Analysis of variance (sequential):");
        for (name, anova) in [
            ("survival_days", &self.survival_anova),
            ("pupal_mass", &self.pupal_mass_anova),
        ] {
            match anova {
                Some(anova) => table::print_anova(anova),
                None => println!("  Response: {name} (not estimable, see log)"),
            }
            println!();
        }
    }
}

pub(super) fn print_summary(
    dataset: &Dataset,
    intervals: &IntervalDataset,
    coding: TemperatureCoding,
) -> SummarySection {
    table::print_load_summary(dataset, intervals);
    println!();
    let section = SummarySection::compute(dataset, coding);
    section.print();
    section
}
