use chrono::NaiveDate;

use crate::{
    clean::{DropReason, dedupe_by, derive_title_year, missing_standard_columns, require_column},
    error::PipelineResult,
    frame::RawTable,
    normalize::{parse_money, parse_release_date},
    pipeline::StageLog,
    records::{BudgetRecord, Source, Standardized},
};

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("Movie", "title"),
    ("Release Date", "release_date"),
    ("Production Budget", "production_budget"),
    ("Domestic Gross", "domestic_gross"),
    ("Worldwide Gross", "worldwide_gross"),
];

/// Cleans the scraped budget table. Rows released after `today` are dropped.
pub fn clean_budgets(
    raw: RawTable,
    today: NaiveDate,
    log: &mut StageLog,
) -> PipelineResult<Standardized<BudgetRecord>> {
    log.info(format_args!("Cleaning {} raw budget row(s)", raw.len()));
    require_column(&raw, Source::Budget, "Movie")?;
    require_column(&raw, Source::Budget, "Release Date")?;
    let missing_columns = missing_standard_columns(&raw, COLUMN_MAPPING, log);

    let mut records = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let derived = match derive_title_year(row.get("Movie"), row.get("Release Date")) {
            Ok(derived) => derived,
            Err(reason) => {
                log.dropped(reason, 1);
                continue;
            }
        };
        let release_date = row.get("Release Date").and_then(parse_release_date);
        if release_date.is_some_and(|date| date > today) {
            log.dropped(DropReason::FutureRelease, 1);
            continue;
        }

        records.push(BudgetRecord {
            title: derived.title,
            normalized_title: derived.normalized_title,
            normalized_title_year: derived.composite_key,
            release_date: release_date.map(|date| date.format("%Y-%m-%d").to_string()),
            year: derived.year,
            decade: derived.decade,
            production_budget: row.get("Production Budget").and_then(parse_money),
            domestic_gross: row.get("Domestic Gross").and_then(parse_money),
            worldwide_gross: row.get("Worldwide Gross").and_then(parse_money),
        });
    }

    let (mut records, by_title_year) =
        dedupe_by(records, |r| Some((r.normalized_title.clone(), r.year)));
    log.dropped(DropReason::DuplicateTitleYear, by_title_year);

    records.sort_by(|a, b| a.title.cmp(&b.title));
    log.info(format_args!("Budget cleaning kept {} row(s)", records.len()));
    Ok(Standardized {
        source: Source::Budget,
        records,
        missing_columns,
    })
}
