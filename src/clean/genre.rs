use itertools::Itertools;

use crate::{
    clean::{
        DropReason, dedupe_by, derive_title_year, missing_standard_columns, optional_column,
        require_column,
    },
    error::PipelineResult,
    frame::{RawRow, RawTable},
    normalize::{parse_count, parse_float, parse_sequence, split_multi_value, title_case},
    pipeline::StageLog,
    rating::{CertificateOutcome, classify_certificate},
    records::{GenreRecord, Source, Standardized},
};

const IRRELEVANT_COLUMNS: &[&str] = &[
    "backdrop_path",
    "homepage",
    "poster_path",
    "director_id",
    "star_id",
];

const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("movie_id", "movie_id"),
    ("movie_name", "title"),
    ("year", "year"),
    ("certificate", "certificate"),
    ("runtime", "runtime"),
    ("genre", "genre"),
    ("rating", "rating"),
    ("description", "description"),
    ("director", "director"),
    ("star", "stars"),
    ("votes", "votes"),
];

pub fn clean_genres(
    mut raw: RawTable,
    log: &mut StageLog,
) -> PipelineResult<Standardized<GenreRecord>> {
    log.info(format_args!("Cleaning {} raw genre catalog row(s)", raw.len()));
    require_column(&raw, Source::Genre, "movie_name")?;
    require_column(&raw, Source::Genre, "year")?;

    let dropped_columns = raw.drop_columns(IRRELEVANT_COLUMNS);
    log.debug(format_args!("Dropped {dropped_columns} irrelevant column(s)"));

    optional_column(&raw, log, "certificate", "certificate filter");
    let missing_columns = missing_standard_columns(&raw, COLUMN_MAPPING, log);

    let mut records = Vec::with_capacity(raw.len());
    for row in raw.rows() {
        let derived = match derive_title_year(row.get("movie_name"), row.get("year")) {
            Ok(derived) => derived,
            Err(reason) => {
                log.dropped(reason, 1);
                continue;
            }
        };
        let certificate = match classify_certificate(row.get("certificate")) {
            CertificateOutcome::Rated(certificate) => certificate,
            CertificateOutcome::Excluded => {
                log.dropped(DropReason::ExcludedCertificate, 1);
                continue;
            }
        };

        records.push(GenreRecord {
            movie_id: row.text("movie_id").map(str::to_string),
            title: derived.title,
            normalized_title: derived.normalized_title,
            normalized_title_year: derived.composite_key,
            certificate,
            year: derived.year,
            decade: derived.decade,
            rating: row.get("rating").and_then(parse_float),
            votes: row.get("votes").and_then(parse_count),
            runtime: row.get("runtime").and_then(parse_count),
            genre: row.get("genre").map(split_multi_value).unwrap_or_default(),
            description: row.text("description").map(str::to_string),
            director: row.text("director").map(str::to_string),
            stars: parse_stars(&row),
        });
    }

    let (records, by_id) = dedupe_by(records, |r| r.movie_id.clone());
    log.dropped(DropReason::DuplicateIdentifier, by_id);
    let (mut records, by_title_year) =
        dedupe_by(records, |r| Some((r.normalized_title.clone(), r.year)));
    log.dropped(DropReason::DuplicateTitleYear, by_title_year);

    records.sort_by(|a, b| a.title.cmp(&b.title));
    log.info(format_args!("Genre catalog cleaning kept {} row(s)", records.len()));
    Ok(Standardized {
        source: Source::Genre,
        records,
        missing_columns,
    })
}

/// The cast column is a stringified list that may carry escaped newlines.
fn parse_stars(row: &RawRow<'_>) -> Vec<String> {
    row.get("star")
        .map(|raw| {
            parse_sequence(raw)
                .iter()
                .map(|name| title_case(name))
                .unique()
                .collect()
        })
        .unwrap_or_default()
}
