use crate::{
    clean::{
        DropReason, dedupe_by, derive_title_year, is_zero_or_absent, missing_standard_columns,
        optional_column, require_column,
    },
    error::PipelineResult,
    frame::{RawRow, RawTable},
    normalize::{
        is_true_flag, parse_count, parse_float, parse_money, parse_release_date, split_multi_value,
    },
    pipeline::StageLog,
    records::{MetadataRecord, Source, Standardized},
};

const IRRELEVANT_COLUMNS: &[&str] = &["backdrop_path", "homepage", "poster_path"];

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("imdb_id", "movie_id"),
    ("title", "title"),
    ("release_date", "release_date"),
    ("vote_average", "rating"),
    ("vote_count", "votes"),
    ("runtime", "runtime"),
    ("genres", "genre"),
    ("budget", "budget"),
    ("revenue", "worldwide_gross"),
    ("overview", "description"),
    ("production_countries", "production_countries"),
];

const SIGNAL_COLUMNS: [&str; 3] = ["runtime", "revenue", "budget"];

pub fn clean_metadata(
    mut raw: RawTable,
    log: &mut StageLog,
) -> PipelineResult<Standardized<MetadataRecord>> {
    log.info(format_args!("Cleaning {} raw metadata row(s)", raw.len()));
    require_column(&raw, Source::Metadata, "title")?;
    require_column(&raw, Source::Metadata, "release_date")?;

    let dropped_columns = raw.drop_columns(IRRELEVANT_COLUMNS);
    log.debug(format_args!("Dropped {dropped_columns} irrelevant column(s)"));

    let check_status = optional_column(&raw, log, "status", "release status filter");
    let check_adult = optional_column(&raw, log, "adult", "adult content filter");
    let check_signal = SIGNAL_COLUMNS.iter().any(|column| raw.has_column(column));
    if !check_signal {
        log.warn(format_args!(
            "None of runtime, revenue or budget present; skipping placeholder filter"
        ));
    }
    let missing_columns = missing_standard_columns(&raw, COLUMN_MAPPING, log);

    let mut records = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let derived = match derive_title_year(row.get("title"), row.get("release_date")) {
            Ok(derived) => derived,
            Err(reason) => {
                log.dropped(reason, 1);
                continue;
            }
        };
        if check_status && row.text("status") != Some("Released") {
            log.dropped(DropReason::NotReleased, 1);
            continue;
        }
        if check_signal && is_placeholder(&row) {
            log.dropped(DropReason::NoRuntimeRevenueOrBudget, 1);
            continue;
        }
        if check_adult && row.text("adult").is_some_and(is_true_flag) {
            log.dropped(DropReason::AdultContent, 1);
            continue;
        }

        records.push(MetadataRecord {
            movie_id: row.text("imdb_id").map(str::to_string),
            title: derived.title,
            normalized_title: derived.normalized_title,
            normalized_title_year: derived.composite_key,
            release_date: row
                .get("release_date")
                .and_then(parse_release_date)
                .map(|date| date.format("%Y-%m-%d").to_string()),
            year: derived.year,
            decade: derived.decade,
            rating: row.get("vote_average").and_then(parse_float),
            votes: row.get("vote_count").and_then(parse_count),
            runtime: row.get("runtime").and_then(parse_count),
            genre: row.get("genres").map(split_multi_value).unwrap_or_default(),
            budget: row.get("budget").and_then(parse_money),
            worldwide_gross: row.get("revenue").and_then(parse_money),
            description: row.text("overview").map(str::to_string),
            production_countries: row.text("production_countries").map(str::to_string),
        });
    }

    let (records, by_id) = dedupe_by(records, |r| r.movie_id.clone());
    log.dropped(DropReason::DuplicateIdentifier, by_id);
    let (mut records, by_title_year) =
        dedupe_by(records, |r| Some((r.normalized_title.clone(), r.year)));
    log.dropped(DropReason::DuplicateTitleYear, by_title_year);

    records.sort_by(|a, b| a.title.cmp(&b.title));
    log.info(format_args!("Metadata cleaning kept {} row(s)", records.len()));
    Ok(Standardized {
        source: Source::Metadata,
        records,
        missing_columns,
    })
}

fn is_placeholder(row: &RawRow<'_>) -> bool {
    SIGNAL_COLUMNS
        .iter()
        .all(|column| is_zero_or_absent(row.get(column).and_then(parse_float)))
}
