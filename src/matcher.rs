//! Cross-source record linkage.
//!
//! The primary join attaches genre catalog rows to metadata rows through the
//! shared external identifier. Budgets carry no identifier, so they are
//! resolved through the normalized title and year: metadata first, then the
//! genre catalog. Candidates sharing a key resolve to the first one in row
//! order.

use std::collections::{HashMap, HashSet};

use crate::{
    clean::{DropReason, dedupe_by},
    error::{PipelineError, PipelineResult},
    pipeline::StageLog,
    records::{
        BudgetRecord, Completeness, GenreRecord, MatchSource, MetadataRecord, MovieRecord,
        ResolvedBudget, Source, Standardized,
    },
};

/// Counts produced while resolving budget rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub via_metadata: usize,
    pub via_genre: usize,
    pub unresolved: usize,
    pub duplicates: usize,
    pub orphaned: usize,
}

impl MatchReport {
    pub fn resolved(&self) -> usize {
        self.via_metadata + self.via_genre - self.duplicates - self.orphaned
    }
}

/// Drops rows missing a critical field, then rows where more than 80% of the
/// non-critical fields are absent.
pub fn filter_low_information<R: Completeness>(
    table: Standardized<R>,
    log: &mut StageLog,
) -> Standardized<R> {
    let Standardized {
        source,
        records,
        missing_columns,
    } = table;
    let before = records.len();
    let records: Vec<R> = records
        .into_iter()
        .filter(|record| {
            if !record.has_critical_fields() {
                log.dropped(DropReason::MissingCriticalField, 1);
                return false;
            }
            let (absent, total) = record.non_critical_absent();
            if absent * 5 > total * 4 {
                log.dropped(DropReason::LowInformation, 1);
                return false;
            }
            true
        })
        .collect();
    log.debug(format_args!(
        "{source}: {} of {before} row(s) passed the completeness filter",
        records.len()
    ));
    Standardized {
        source,
        records,
        missing_columns,
    }
}

/// Field-wise collision resolution: the primary value wins unless absent.
trait Coalesce {
    fn or_secondary(self, secondary: Self) -> Self;
}

impl<T> Coalesce for Option<T> {
    fn or_secondary(self, secondary: Self) -> Self {
        self.or(secondary)
    }
}

impl<T> Coalesce for Vec<T> {
    fn or_secondary(self, secondary: Self) -> Self {
        if self.is_empty() { secondary } else { self }
    }
}

/// Left join of metadata onto the genre catalog by external identifier.
///
/// Every metadata row with an identifier yields one movie. Genre rows whose
/// identifier has no metadata counterpart are dropped.
pub fn merge_movies(
    metadata: &Standardized<MetadataRecord>,
    genres: &Standardized<GenreRecord>,
    log: &StageLog,
) -> PipelineResult<Vec<MovieRecord>> {
    if !metadata.has_column("movie_id") {
        return Err(PipelineError::missing_column(Source::Metadata, "imdb_id"));
    }
    if !genres.has_column("movie_id") {
        return Err(PipelineError::missing_column(Source::Genre, "movie_id"));
    }

    let mut by_id: HashMap<&str, &GenreRecord> = HashMap::with_capacity(genres.len());
    for record in &genres.records {
        if let Some(id) = record.movie_id.as_deref() {
            by_id.entry(id).or_insert(record);
        }
    }

    let mut matched = 0usize;
    let mut movies = Vec::with_capacity(metadata.len());
    for primary in &metadata.records {
        let Some(movie_id) = primary.movie_id.clone() else {
            continue;
        };
        let secondary = by_id.get(movie_id.as_str()).copied();
        if secondary.is_some() {
            matched += 1;
        }
        movies.push(merge_pair(movie_id, primary, secondary));
    }
    log.info(format_args!(
        "Merged {} movie(s); {matched} matched the genre catalog, {} catalog row(s) unmatched",
        movies.len(),
        genres.len().saturating_sub(matched)
    ));
    Ok(movies)
}

fn merge_pair(
    movie_id: String,
    primary: &MetadataRecord,
    secondary: Option<&GenreRecord>,
) -> MovieRecord {
    MovieRecord {
        movie_id,
        title: primary.title.clone(),
        normalized_title: primary.normalized_title.clone(),
        release_date: primary.release_date.clone(),
        year: primary.year,
        decade: primary.decade.clone(),
        certificate: secondary.map(|s| s.certificate),
        rating: primary.rating.or_secondary(secondary.and_then(|s| s.rating)),
        votes: primary.votes.or_secondary(secondary.and_then(|s| s.votes)),
        runtime: primary
            .runtime
            .or_secondary(secondary.and_then(|s| s.runtime)),
        description: primary
            .description
            .clone()
            .or_secondary(secondary.and_then(|s| s.description.clone())),
        production_countries: primary.production_countries.clone(),
        genres: primary
            .genre
            .clone()
            .or_secondary(secondary.map(|s| s.genre.clone()).unwrap_or_default()),
    }
}

/// Resolves every budget row to a movie identifier through the composite
/// title-and-year key. Unresolved rows are dropped; when two rows resolve to
/// the same movie the first is kept.
pub fn assign_budget_movie_ids(
    budgets: &[BudgetRecord],
    metadata: &[MetadataRecord],
    genres: &[GenreRecord],
    log: &mut StageLog,
) -> (Vec<ResolvedBudget>, MatchReport) {
    let metadata_keys = first_by_key(
        metadata
            .iter()
            .map(|r| (r.normalized_title_year.as_str(), r.movie_id.as_deref())),
    );
    let genre_keys = first_by_key(
        genres
            .iter()
            .map(|r| (r.normalized_title_year.as_str(), r.movie_id.as_deref())),
    );

    let mut report = MatchReport::default();
    let mut resolved = Vec::with_capacity(budgets.len());
    for budget in budgets {
        let key = budget.normalized_title_year.as_str();
        let (movie_id, matched_via) = if let Some(id) = metadata_keys.get(key) {
            report.via_metadata += 1;
            (*id, MatchSource::Metadata)
        } else if let Some(id) = genre_keys.get(key) {
            report.via_genre += 1;
            (*id, MatchSource::Genre)
        } else {
            report.unresolved += 1;
            log.debug(format_args!(
                "No movie for budget row '{}' ({})",
                budget.title, budget.year
            ));
            continue;
        };
        resolved.push(ResolvedBudget {
            movie_id: movie_id.to_string(),
            production_budget: budget.production_budget,
            domestic_gross: budget.domestic_gross,
            worldwide_gross: budget.worldwide_gross,
            matched_via,
        });
    }
    log.dropped(DropReason::UnresolvedMatch, report.unresolved);
    if report.unresolved > 0 {
        log.info(format_args!(
            "{} budget row(s) matched no movie and were discarded",
            report.unresolved
        ));
    }

    let (resolved, duplicates) = dedupe_by(resolved, |b| Some(b.movie_id.clone()));
    report.duplicates = duplicates;
    log.dropped(DropReason::DuplicateBudget, duplicates);
    (resolved, report)
}

fn first_by_key<'a>(
    pairs: impl Iterator<Item = (&'a str, Option<&'a str>)>,
) -> HashMap<&'a str, &'a str> {
    let mut map = HashMap::new();
    for (key, id) in pairs {
        if let Some(id) = id {
            map.entry(key).or_insert(id);
        }
    }
    map
}

/// Drops budgets whose identifier is not among the merged movies.
pub fn drop_orphaned_budgets(
    budgets: Vec<ResolvedBudget>,
    movies: &[MovieRecord],
    report: &mut MatchReport,
    log: &mut StageLog,
) -> Vec<ResolvedBudget> {
    let known: HashSet<&str> = movies.iter().map(|m| m.movie_id.as_str()).collect();
    let before = budgets.len();
    let kept: Vec<ResolvedBudget> = budgets
        .into_iter()
        .filter(|b| known.contains(b.movie_id.as_str()))
        .collect();
    report.orphaned = before - kept.len();
    log.dropped(DropReason::UnknownMovie, report.orphaned);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pipeline::RunContext, rating::Certificate};

    fn metadata(id: &str, title: &str, year: i32) -> MetadataRecord {
        let normalized = crate::normalize::normalize_title(title);
        MetadataRecord {
            movie_id: Some(id.to_string()),
            title: title.to_string(),
            normalized_title_year: format!("{normalized}_{year}"),
            normalized_title: normalized,
            release_date: Some(format!("{year}-01-01")),
            year,
            decade: crate::normalize::decade_label(Some(year)).unwrap(),
            rating: None,
            votes: Some(10),
            runtime: Some(100),
            genre: Vec::new(),
            budget: None,
            worldwide_gross: None,
            description: Some("primary".into()),
            production_countries: None,
        }
    }

    fn genre(id: &str, title: &str, year: i32) -> GenreRecord {
        let normalized = crate::normalize::normalize_title(title);
        GenreRecord {
            movie_id: Some(id.to_string()),
            title: title.to_string(),
            normalized_title_year: format!("{normalized}_{year}"),
            normalized_title: normalized,
            certificate: Certificate::Pg13,
            year,
            decade: crate::normalize::decade_label(Some(year)).unwrap(),
            rating: Some(8.8),
            votes: Some(99),
            runtime: None,
            genre: vec!["Action".into(), "Sci-Fi".into()],
            description: Some("secondary".into()),
            director: None,
            stars: Vec::new(),
        }
    }

    fn budget(title: &str, year: i32, amount: i64) -> BudgetRecord {
        let normalized = crate::normalize::normalize_title(title);
        BudgetRecord {
            title: title.to_string(),
            normalized_title_year: format!("{normalized}_{year}"),
            normalized_title: normalized,
            release_date: None,
            year,
            decade: crate::normalize::decade_label(Some(year)).unwrap(),
            production_budget: Some(amount),
            domestic_gross: None,
            worldwide_gross: None,
        }
    }

    #[test]
    fn merge_prefers_primary_and_falls_back_to_secondary() {
        let ctx = RunContext::new();
        let log = ctx.stage("match");
        let meta = Standardized::new(Source::Metadata, vec![metadata("tt1", "Heat", 1995)]);
        let cat = Standardized::new(Source::Genre, vec![genre("tt1", "Heat", 1995)]);
        let movies = merge_movies(&meta, &cat, &log).unwrap();
        let movie = &movies[0];
        assert_eq!(movie.votes, Some(10));
        assert_eq!(movie.rating, Some(8.8));
        assert_eq!(movie.description.as_deref(), Some("primary"));
        assert_eq!(movie.genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(movie.certificate, Some(Certificate::Pg13));
    }

    #[test]
    fn merge_requires_identifier_columns() {
        let ctx = RunContext::new();
        let log = ctx.stage("match");
        let mut meta = Standardized::new(Source::Metadata, vec![metadata("tt1", "Heat", 1995)]);
        meta.missing_columns.push("movie_id".into());
        let cat = Standardized::new(Source::Genre, Vec::new());
        let err = merge_movies(&meta, &cat, &log).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::SchemaPrecondition {
                source_name: Source::Metadata,
                ..
            }
        ));
    }

    #[test]
    fn budget_falls_back_to_genre_catalog() {
        let ctx = RunContext::new();
        let mut log = ctx.stage("match");
        let meta = vec![metadata("tt0", "Heat", 1995)];
        let cat = vec![genre("tt1375666", "Inception", 2010)];
        let budgets = vec![budget("Inception", 2010, 160), budget("Nope", 2001, 1)];
        let (resolved, report) = assign_budget_movie_ids(&budgets, &meta, &cat, &mut log);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].movie_id, "tt1375666");
        assert_eq!(resolved[0].matched_via, MatchSource::Genre);
        assert_eq!(report.unresolved, 1);
    }

    #[test]
    fn first_candidate_wins_on_shared_key() {
        let ctx = RunContext::new();
        let mut log = ctx.stage("match");
        let meta = vec![metadata("tt1", "Heat", 1995), metadata("tt2", "HEAT!", 1995)];
        let budgets = vec![budget("Heat", 1995, 1), budget("heat", 1995, 2)];
        let (resolved, report) = assign_budget_movie_ids(&budgets, &meta, &[], &mut log);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].movie_id, "tt1");
        assert_eq!(resolved[0].production_budget, Some(1));
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn low_information_rows_are_dropped() {
        let ctx = RunContext::new();
        let mut log = ctx.stage("match");
        let mut sparse = metadata("tt9", "Sparse", 2000);
        sparse.release_date = None;
        sparse.votes = None;
        sparse.runtime = None;
        sparse.description = None;
        let mut anonymous = metadata("tt8", "Nameless", 2000);
        anonymous.movie_id = None;
        let table = Standardized::new(
            Source::Metadata,
            vec![metadata("tt1", "Heat", 1995), sparse, anonymous],
        );
        let kept = filter_low_information(table, &mut log);
        assert_eq!(kept.len(), 1);
        assert_eq!(log.drops().get(&DropReason::LowInformation), Some(&1));
        assert_eq!(log.drops().get(&DropReason::MissingCriticalField), Some(&1));
    }

    #[test]
    fn orphaned_budgets_are_dropped() {
        let ctx = RunContext::new();
        let mut log = ctx.stage("match");
        let meta = vec![metadata("tt1", "Heat", 1995)];
        let cat = vec![genre("tt7", "Inception", 2010)];
        let budgets = vec![budget("Heat", 1995, 1), budget("Inception", 2010, 2)];
        let (resolved, mut report) = assign_budget_movie_ids(&budgets, &meta, &cat, &mut log);
        let movie_table = Standardized::new(Source::Metadata, meta.clone());
        let movies = merge_movies(
            &movie_table,
            &Standardized::new(Source::Genre, cat.clone()),
            &log,
        )
        .unwrap();
        let kept = drop_orphaned_budgets(resolved, &movies, &mut report, &mut log);
        assert_eq!(kept.len(), 1);
        assert_eq!(report.orphaned, 1);
        assert_eq!(report.resolved(), 1);
    }
}
