use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Args;
use mothsurv_analysis::{
    dataset::{DEFAULT_DATE_FORMAT, LoadOptions},
    record::Temperature,
    simulate::{SimulationConfig, simulate},
};
use rand::SeedableRng as _;
use rand_pcg::Pcg64;

use crate::util::Output;

#[derive(Debug, Clone, Args)]
pub(crate) struct SimulateArg {
    /// Random seed
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Individuals per sex × acclimation × exposure cell
    #[arg(long, default_value_t = 20)]
    per_cell: usize,

    /// Acclimation temperatures in °C (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = ["20", "25", "30"])]
    acclimation: Vec<Temperature>,

    /// Exposure temperatures in °C (comma-separated)
    #[arg(long, value_delimiter = ',', default_values = ["20", "25", "30", "35"])]
    exposure: Vec<Temperature>,

    /// Daily hazard of a female at the lowest temperatures
    #[arg(long, default_value_t = 0.1)]
    baseline_hazard: f64,

    /// Log hazard ratio of males
    #[arg(long, default_value_t = 0.4, allow_negative_numbers = true)]
    male_effect: f64,

    /// Log hazard ratio per degree of acclimation
    #[arg(long, default_value_t = -0.02, allow_negative_numbers = true)]
    acclimation_effect: f64,

    /// Log hazard ratio per degree of exposure
    #[arg(long, default_value_t = 0.08, allow_negative_numbers = true)]
    exposure_effect: f64,

    /// First emergence date
    #[arg(long, default_value = "2023-06-01")]
    start_date: NaiveDate,

    /// `chrono` format of the written date columns
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,

    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &SimulateArg) -> anyhow::Result<()> {
    anyhow::ensure!(
        arg.baseline_hazard > 0.0,
        "baseline hazard must be positive, got {}",
        arg.baseline_hazard
    );
    anyhow::ensure!(
        !arg.acclimation.is_empty() && !arg.exposure.is_empty(),
        "at least one acclimation and one exposure temperature are needed"
    );
    let config = SimulationConfig {
        per_cell: arg.per_cell,
        acclimation_levels: arg.acclimation.clone(),
        exposure_levels: arg.exposure.clone(),
        baseline_hazard: arg.baseline_hazard,
        male_effect: arg.male_effect,
        acclimation_effect: arg.acclimation_effect,
        exposure_effect: arg.exposure_effect,
        start_date: arg.start_date,
        ..SimulationConfig::default()
    };
    let mut rng = Pcg64::seed_from_u64(arg.seed);
    let dataset = simulate(&config, &mut rng);
    tracing::info!(
        individuals = dataset.individuals.len(),
        seed = arg.seed,
        "synthetic experiment drawn"
    );

    let options = LoadOptions {
        date_format: arg.date_format.clone(),
    };
    let mut output = Output::from_output_path(arg.output.clone())?;
    output.write_csv("experiment", |w| dataset.write_csv(w, &options))?;
    Ok(())
}
