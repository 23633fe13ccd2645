//! Text tables for the report sections
//!
//! Every table is printed to stdout with a two-space indent, a header line
//! and a dashed separator sized to the columns.

use std::fmt;

use mothsurv_analysis::{
    cox::CoxFit,
    dataset::Dataset,
    diagnostics::{Diagnostics, PhTermTest, ResidualGroup},
    interval::IntervalDataset,
    selection::Selection,
    summary::GroupSummary,
    survival::SurvivalStatsMap,
};
use mothsurv_stats::{anova::AnovaTable, descriptive::DescriptiveStats};

pub(super) fn print_heading(title: &str) {
    println!("{title}");
    println!("{}", "=".repeat(title.chars().count()));
    println!();
}

fn print_separator(width: usize) {
    println!("  {}", "-".repeat(width));
}

fn format_p(p: f64) -> String {
    if p < 1e-4 {
        "<0.0001".to_owned()
    } else {
        format!("{p:.4}")
    }
}

fn format_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "N/A".to_owned(), |v| format!("{v:.precision$}"))
}

/// Row counts after loading and reshaping.
pub(super) fn print_load_summary(dataset: &Dataset, intervals: &IntervalDataset) {
    let exclusions = &dataset.exclusions;
    println!("Data:");
    println!("  Rows read                       : {}", exclusions.rows_read);
    println!(
        "  Excluded (missing covariates)   : {}",
        exclusions.missing_covariates
    );
    println!("  Individuals                     : {}", dataset.individuals.len());
    println!(
        "  Without emergence/death stamps  : {}",
        exclusions.missing_lifespan
    );
    println!(
        "  Excluded zero-length lifespans  : {}",
        intervals.excluded_zero_duration()
    );
    println!("  Survival subjects               : {}", intervals.subjects().len());
    println!("  Half-day intervals              : {}", intervals.intervals().len());
    println!("  Deaths                          : {}", intervals.event_count());
}

fn stats_columns(stats: Option<&DescriptiveStats>, precision: usize) -> String {
    match stats {
        Some(s) => format!(
            "{:>5} {:>9.prec$} {:>9.prec$} {:>9.prec$}",
            s.count,
            s.mean,
            s.std_dev,
            s.median,
            prec = precision
        ),
        None => format!("{:>5} {:>9} {:>9} {:>9}", 0, "N/A", "N/A", "N/A"),
    }
}

/// Lifespan (days) and pupal mass statistics per group.
pub(super) fn print_group_summaries<K>(label_col: &str, summaries: &[GroupSummary<K>])
where
    K: fmt::Display,
{
    println!(
        "  {:<24} {:>5} | {:>5} {:>9} {:>9} {:>9} | {:>5} {:>9} {:>9} {:>9}",
        label_col, "N", "n", "Days", "SD", "Median", "n", "Mass", "SD", "Median",
    );
    // label(24) + N(5) + 2 × (n(5) + 3 × 9) + separators(3 + 3) + spaces(8)
    print_separator(24 + 5 + 2 * (5 + 27) + 6 + 8);
    for summary in summaries {
        println!(
            "  {:<24} {:>5} | {} | {}",
            summary.key.to_string(),
            summary.individuals,
            stats_columns(summary.survival_days.as_ref(), 2),
            stats_columns(summary.pupal_mass.as_ref(), 4),
        );
    }
}

/// Sequential ANOVA table.
pub(super) fn print_anova(table: &AnovaTable) {
    println!("  Response: {}", table.response);
    println!(
        "  {:<24} {:>5} {:>14} {:>14} {:>10} {:>10}",
        "Term", "Df", "Sum Sq", "Mean Sq", "F", "Pr(>F)",
    );
    print_separator(24 + 5 + 14 + 14 + 10 + 10 + 5);
    for row in &table.rows {
        println!(
            "  {:<24} {:>5} {:>14.4} {:>14.4} {:>10} {:>10}",
            row.term,
            row.df,
            row.sum_sq,
            row.mean_sq,
            format_opt(row.f_value, 3),
            row.p_value.map_or_else(|| "N/A".to_owned(), format_p),
        );
    }
}

/// Kaplan-Meier medians per group.
pub(super) fn print_km_table<K>(label_col: &str, stats: &SurvivalStatsMap<K>)
where
    K: Ord + fmt::Display,
{
    println!(
        "  {:<24} {:>8} {:>10} {:>12} {:>12}",
        label_col, "Subjects", "Censored", "Mean(days)", "Median(KM)",
    );
    print_separator(24 + 8 + 10 + 12 + 12 + 4);
    for (key, s) in &stats.map {
        println!(
            "  {:<24} {:>8} {:>10} {:>12.2} {:>12}",
            key.to_string(),
            s.subjects_count,
            s.censored_count,
            s.mean_days,
            format_opt(s.median_km, 1),
        );
    }
}

/// AICc ranking followed by the failed candidates.
pub(super) fn print_ranking(selection: &Selection) {
    let width = selection
        .ranking
        .iter()
        .map(|m| m.model.len())
        .chain(selection.failures.iter().map(|f| f.model.len()))
        .max()
        .unwrap_or(0)
        .max(5);
    println!("  Deaths (AICc sample size): {}", selection.n_events);
    println!(
        "  {:>4} {:<width$} {:>3} {:>12} {:>10} {:>8} {:>8} {:>10}",
        "Rank", "Model", "k", "logLik", "AICc", "ΔAICc", "Weight", "BIC",
    );
    print_separator(4 + width + 3 + 12 + 10 + 8 + 8 + 10 + 7);
    for m in &selection.ranking {
        println!(
            "  {:>4} {:<width$} {:>3} {:>12.3} {:>10.3} {:>8.3} {:>8.4} {:>10.3}",
            m.rank, m.model, m.k, m.log_likelihood, m.aicc, m.delta_aicc, m.weight, m.bic,
        );
    }
    if !selection.failures.is_empty() {
        println!();
        println!("  Failed to fit:");
        for f in &selection.failures {
            println!("    {:<width$}  {}", f.model, f.error);
        }
    }
}

/// Fit summary and hazard ratio table.
pub(super) fn print_fit(fit: &CoxFit, conf_level: f64) {
    let lrt = fit.likelihood_ratio_test();
    println!("  Model      : {}", fit.model);
    println!(
        "  Subjects   : {}  Intervals: {}  Deaths: {}",
        fit.n_subjects, fit.n_intervals, fit.n_events
    );
    println!(
        "  Ties       : {:?}  Iterations: {}",
        fit.ties, fit.iterations
    );
    println!(
        "  logLik     : {:.3} (null {:.3})",
        fit.log_likelihood, fit.null_log_likelihood
    );
    println!(
        "  LR test    : {:.3} on {} df, p = {}",
        lrt.statistic,
        lrt.df,
        format_p(lrt.p_value)
    );
    println!();

    let ci = format!("{:.0}% CI", conf_level * 100.0);
    println!(
        "  {:<34} {:>9} {:>9} {:>8} {:>19} {:>8} {:>8}",
        "Term", "coef", "HR", "se", ci, "z", "p",
    );
    print_separator(34 + 9 + 9 + 8 + 19 + 8 + 8 + 6);
    for hr in fit.hazard_ratios(conf_level) {
        println!(
            "  {:<34} {:>9.4} {:>9.4} {:>8.4} {:>19} {:>8.3} {:>8}",
            hr.term,
            hr.coef,
            hr.hr,
            hr.se,
            format!("[{:.3}, {:.3}]", hr.lower, hr.upper),
            hr.z,
            format_p(hr.p),
        );
    }
}

fn print_residual_groups(title: &str, groups: &[ResidualGroup]) {
    println!("  {title}");
    for g in groups {
        println!("    {:<28} n={:<5} mean={:>8.4}", g.label, g.n, g.mean_residual);
    }
}

fn print_ph_row(row: &PhTermTest) {
    println!(
        "  {:<34} {:>8} {:>10.4} {:>4} {:>8}",
        row.term,
        row.rho.map_or_else(|| "-".to_owned(), |rho| format!("{rho:.4}")),
        row.chi_sq,
        row.df,
        format_p(row.p_value),
    );
}

/// Martingale residual summaries and the proportional-hazards test.
pub(super) fn print_diagnostics(diagnostics: &Diagnostics) {
    let residuals = DescriptiveStats::new(diagnostics.martingale.iter().copied());
    println!("Martingale residuals ({})", diagnostics.model);
    if let Some(r) = &residuals {
        println!(
            "  n={}  sum={:.2e}  min={:.3}  median={:.3}  max={:.3}",
            r.count,
            diagnostics.martingale.iter().sum::<f64>(),
            r.min,
            r.median,
            r.max
        );
    }
    let linearity = &diagnostics.linearity;
    print_residual_groups("By sex:", &linearity.by_sex);
    print_residual_groups("By acclimation:", &linearity.by_acclimation);
    print_residual_groups("By exposure:", &linearity.by_exposure);
    print_residual_groups("By pupal mass quartile:", &linearity.by_pupal_mass);
    println!(
        "  Correlation with pupal mass: {}",
        format_opt(linearity.pupal_mass_correlation, 4)
    );
    println!();

    let ph = &diagnostics.ph_test;
    println!("Proportional hazards (scaled Schoenfeld, time = {:?})", ph.transform);
    println!(
        "  {:<34} {:>8} {:>10} {:>4} {:>8}",
        "Term", "rho", "chisq", "df", "p"
    );
    print_separator(34 + 8 + 10 + 4 + 8 + 4);
    for row in &ph.terms {
        print_ph_row(row);
    }
    print_ph_row(&ph.global);
}
