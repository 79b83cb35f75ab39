use anyhow::{Context, Result, bail};
use log::info;

use crate::{
    cli::VerifyArgs,
    query::{IntegrityReport, StoreReader},
    table,
};

/// Prints row counts and integrity checks; fails when any check finds rows.
pub fn execute(args: &VerifyArgs) -> Result<()> {
    let reader = StoreReader::open(&args.store)
        .with_context(|| format!("Opening store {:?}", args.store))?;
    let report = reader
        .integrity_report()
        .with_context(|| format!("Checking integrity of {:?}", args.store))?;
    table::print_table(&["check", "rows"], &report_rows(&report));
    if !report.is_clean() {
        bail!(
            "{} integrity violation(s) found in {:?}",
            report.violations(),
            args.store
        );
    }
    info!("✓ {:?} passed all integrity checks", args.store);
    Ok(())
}

fn report_rows(report: &IntegrityReport) -> Vec<Vec<String>> {
    let counts = report.counts;
    [
        ("movies", counts.movies),
        ("genres", counts.genres),
        ("movie_genres", counts.links),
        ("budgets", counts.budgets),
        ("links without movie", report.links_missing_movie),
        ("links without genre", report.links_missing_genre),
        ("budgets without movie", report.budgets_missing_movie),
        ("movies with several budgets", report.movies_with_multiple_budgets),
    ]
    .into_iter()
    .map(|(check, rows)| vec![check.to_string(), rows.to_string()])
    .collect()
}
