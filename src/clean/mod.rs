//! Per-source cleaners.
//!
//! Each cleaner turns one stacked [`RawTable`] into a [`Standardized`] table of
//! typed records. The order of the steps is fixed for every source: drop
//! irrelevant columns, drop rows without a title, derive normalized title and
//! year (rows outside the accepted year range go), derive decade and composite
//! key, apply the source filters, de-duplicate by natural identifier and then
//! by normalized title and year, and finally sort by title.
//!
//! Rows removed along the way are counted per [`DropReason`] on the stage's
//! [`StageLog`]; only a missing title or date column is fatal.

mod budget;
mod genre;
mod metadata;

use std::{collections::HashSet, fmt, fs, hash::Hash, io, path::{Path, PathBuf}};

use serde::{Serialize, de::DeserializeOwned};

pub use self::{budget::clean_budgets, genre::clean_genres, metadata::clean_metadata};
use crate::{
    error::{PipelineError, PipelineResult},
    frame::RawTable,
    io_utils,
    normalize::{composite_key, decade_label, extract_year, normalize_title, year_in_range},
    pipeline::StageLog,
    records::{Source, Standardized},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    MissingTitle,
    MissingYear,
    YearOutOfRange,
    NotReleased,
    NoRuntimeRevenueOrBudget,
    AdultContent,
    ExcludedCertificate,
    FutureRelease,
    DuplicateIdentifier,
    DuplicateTitleYear,
    MissingCriticalField,
    LowInformation,
    UnresolvedMatch,
    DuplicateBudget,
    UnknownMovie,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::MissingTitle => "missing title",
            DropReason::MissingYear => "missing or unparseable year",
            DropReason::YearOutOfRange => "year outside accepted range",
            DropReason::NotReleased => "not released",
            DropReason::NoRuntimeRevenueOrBudget => "runtime, revenue and budget all zero",
            DropReason::AdultContent => "adult content",
            DropReason::ExcludedCertificate => "excluded certificate",
            DropReason::FutureRelease => "release date in the future",
            DropReason::DuplicateIdentifier => "duplicate identifier",
            DropReason::DuplicateTitleYear => "duplicate normalized title and year",
            DropReason::MissingCriticalField => "missing critical field",
            DropReason::LowInformation => "too many absent fields",
            DropReason::UnresolvedMatch => "no matching movie",
            DropReason::DuplicateBudget => "second budget for the same movie",
            DropReason::UnknownMovie => "matched movie not in merged table",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Title, year and the fields derived from them, shared by every source.
#[derive(Debug, Clone)]
pub(crate) struct TitleYear {
    pub title: String,
    pub normalized_title: String,
    pub year: i32,
    pub decade: String,
    pub composite_key: String,
}

/// Steps 3 to 5 of every cleaner. Returns the reason when the row must go.
pub(crate) fn derive_title_year(
    raw_title: Option<&str>,
    raw_date: Option<&str>,
) -> Result<TitleYear, DropReason> {
    let title = raw_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(DropReason::MissingTitle)?;
    let year = raw_date
        .and_then(extract_year)
        .ok_or(DropReason::MissingYear)?;
    if !year_in_range(year) {
        return Err(DropReason::YearOutOfRange);
    }
    let normalized_title = normalize_title(title);
    let decade = decade_label(Some(year)).ok_or(DropReason::MissingYear)?;
    Ok(TitleYear {
        title: title.to_string(),
        composite_key: composite_key(&normalized_title, year),
        normalized_title,
        year,
        decade,
    })
}

pub(crate) fn require_column(
    raw: &RawTable,
    source: Source,
    column: &str,
) -> PipelineResult<()> {
    if raw.has_column(column) {
        Ok(())
    } else {
        Err(PipelineError::missing_column(source, column))
    }
}

/// Reports whether an optional raw column exists, warning when it does not.
pub(crate) fn optional_column(raw: &RawTable, log: &StageLog, column: &str, step: &str) -> bool {
    let present = raw.has_column(column);
    if !present {
        log.warn(format_args!("Column '{column}' not found; skipping {step}"));
    }
    present
}

/// Standardized column names whose raw counterpart is absent.
pub(crate) fn missing_standard_columns(
    raw: &RawTable,
    mapping: &[(&str, &str)],
    log: &StageLog,
) -> Vec<String> {
    let missing: Vec<String> = mapping
        .iter()
        .filter(|(raw_name, _)| !raw.has_column(raw_name))
        .map(|(_, standard)| standard.to_string())
        .collect();
    if !missing.is_empty() {
        log.info(format_args!("Missing columns: {}", missing.join(", ")));
    }
    missing
}

/// Keeps the first record for every key. Records without a key are kept.
pub(crate) fn dedupe_by<R, K, F>(records: Vec<R>, key: F) -> (Vec<R>, usize)
where
    K: Eq + Hash,
    F: Fn(&R) -> Option<K>,
{
    let mut seen = HashSet::new();
    let before = records.len();
    let kept: Vec<R> = records
        .into_iter()
        .filter(|record| match key(record) {
            Some(k) => seen.insert(k),
            None => true,
        })
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

pub(crate) fn is_zero_or_absent(value: Option<f64>) -> bool {
    value.is_none_or(|v| v == 0.0)
}

/// Sidecar written next to an artifact, listing the standardized columns the
/// raw input did not provide (`metadata.csv` -> `metadata.missing.json`).
pub fn missing_columns_path(artifact: &Path) -> PathBuf {
    artifact.with_extension("missing.json")
}

/// Writes the records to `path` and the missing-column list to its sidecar.
pub fn write_artifact<R: Serialize>(table: &Standardized<R>, path: &Path) -> PipelineResult<()> {
    let mut writer = io_utils::open_csv_writer(path)?;
    for record in &table.records {
        writer
            .serialize(record)
            .map_err(|err| PipelineError::csv(path, err))?;
    }
    writer.flush().map_err(|err| PipelineError::io(path, err))?;

    let sidecar = missing_columns_path(path);
    let listed = serde_json::to_string(&table.missing_columns)
        .map_err(|err| PipelineError::io(&sidecar, io::Error::from(err)))?;
    fs::write(&sidecar, listed).map_err(|err| PipelineError::io(&sidecar, err))?;
    Ok(())
}

/// Reads back a table written by [`write_artifact`], restoring the columns
/// its raw input lacked from the sidecar.
pub fn read_artifact<R: DeserializeOwned>(
    source: Source,
    path: &Path,
) -> PipelineResult<Standardized<R>> {
    let sidecar = missing_columns_path(path);
    let listed = fs::read_to_string(&sidecar).map_err(|err| PipelineError::io(&sidecar, err))?;
    let missing_columns: Vec<String> = serde_json::from_str(&listed)
        .map_err(|err| PipelineError::io(&sidecar, io::Error::from(err)))?;

    let mut reader = io_utils::open_csv_reader_from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.map_err(|err| PipelineError::csv(path, err))?);
    }
    Ok(Standardized {
        source,
        records,
        missing_columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_year_rejects_out_of_range_years() {
        assert!(matches!(
            derive_title_year(Some("Old"), Some("1879-01-01")),
            Err(DropReason::YearOutOfRange)
        ));
        assert!(matches!(
            derive_title_year(Some("Future"), Some("2026")),
            Err(DropReason::YearOutOfRange)
        ));
        assert!(matches!(
            derive_title_year(Some("  "), Some("2000")),
            Err(DropReason::MissingTitle)
        ));
        assert!(matches!(
            derive_title_year(Some("Odd"), Some("someday")),
            Err(DropReason::MissingYear)
        ));
    }

    #[test]
    fn derive_title_year_keeps_range_endpoints() {
        let first = derive_title_year(Some("Edge"), Some("1880")).unwrap();
        assert_eq!(first.year, 1880);
        assert_eq!(first.decade, "1880–1889");
        let last = derive_title_year(Some("Edge"), Some("2025-12-31")).unwrap();
        assert_eq!(last.year, 2025);
        assert_eq!(last.composite_key, "edge_2025");
    }

    #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
    struct Row {
        title: String,
        year: i32,
    }

    #[test]
    fn artifact_round_trip_restores_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budgets.csv");
        let table = Standardized {
            source: Source::Budget,
            records: vec![Row {
                title: "heat".to_string(),
                year: 1995,
            }],
            missing_columns: vec!["domestic_gross".to_string()],
        };
        write_artifact(&table, &path).unwrap();
        assert!(dir.path().join("budgets.missing.json").is_file());

        let restored: Standardized<Row> = read_artifact(Source::Budget, &path).unwrap();
        assert_eq!(restored.records, table.records);
        assert!(!restored.has_column("domestic_gross"));
        assert!(restored.has_column("production_budget"));
    }

    #[test]
    fn derive_title_year_builds_composite_key() {
        let derived = derive_title_year(Some(" Inception "), Some("2010-07-16")).unwrap();
        assert_eq!(derived.title, "Inception");
        assert_eq!(derived.normalized_title, "inception");
        assert_eq!(derived.decade, "2010–2019");
        assert_eq!(derived.composite_key, "inception_2010");
    }

    #[test]
    fn dedupe_by_keeps_first_and_unkeyed_rows() {
        let rows = vec![(Some(1), "a"), (None, "b"), (Some(1), "c"), (None, "d")];
        let (kept, removed) = dedupe_by(rows, |row| row.0);
        assert_eq!(removed, 1);
        assert_eq!(
            kept.iter().map(|r| r.1).collect::<Vec<_>>(),
            vec!["a", "b", "d"]
        );
    }
}
