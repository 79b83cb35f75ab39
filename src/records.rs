//! Typed records that flow between pipeline stages.
//!
//! Each source cleaner produces one of [`MetadataRecord`], [`GenreRecord`] or
//! [`BudgetRecord`] wrapped in a [`Standardized`] table; the matcher turns
//! them into [`MovieRecord`] and [`ResolvedBudget`] rows, and the genre
//! normalizer adds [`Genre`] and [`MovieGenre`]. Field names double as the
//! column names of the on-disk artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rating::Certificate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Metadata,
    Genre,
    Budget,
}

impl Source {
    pub fn artifact_name(self) -> &'static str {
        match self {
            Source::Metadata => "metadata.csv",
            Source::Genre => "genres.csv",
            Source::Budget => "budgets.csv",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Source::Metadata => "metadata",
            Source::Genre => "genre",
            Source::Budget => "budget",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaned table for one source plus the standardized columns its raw
/// input did not provide.
#[derive(Debug, Clone)]
pub struct Standardized<R> {
    pub source: Source,
    pub records: Vec<R>,
    pub missing_columns: Vec<String>,
}

impl<R> Standardized<R> {
    pub fn new(source: Source, records: Vec<R>) -> Self {
        Self {
            source,
            records,
            missing_columns: Vec::new(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        !self.missing_columns.iter().any(|missing| missing == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Presence checks used by the low-information filter.
pub trait Completeness {
    /// `false` when any critical field (id, title, normalized title, year,
    /// decade) is absent.
    fn has_critical_fields(&self) -> bool;

    /// Number of absent non-critical fields and the number of such fields.
    fn non_critical_absent(&self) -> (usize, usize);
}

fn absent_count(flags: &[bool]) -> (usize, usize) {
    (flags.iter().filter(|present| !**present).count(), flags.len())
}

/// Standardized row of the tabular metadata export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub movie_id: Option<String>,
    pub title: String,
    pub normalized_title: String,
    pub normalized_title_year: String,
    pub release_date: Option<String>,
    pub year: i32,
    pub decade: String,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub runtime: Option<i64>,
    #[serde(with = "sequence_cell")]
    pub genre: Vec<String>,
    pub budget: Option<i64>,
    pub worldwide_gross: Option<i64>,
    pub description: Option<String>,
    pub production_countries: Option<String>,
}

impl Completeness for MetadataRecord {
    fn has_critical_fields(&self) -> bool {
        self.movie_id.is_some()
            && !self.title.is_empty()
            && !self.normalized_title.is_empty()
            && !self.decade.is_empty()
    }

    fn non_critical_absent(&self) -> (usize, usize) {
        absent_count(&[
            !self.normalized_title_year.is_empty(),
            self.release_date.is_some(),
            self.rating.is_some(),
            self.votes.is_some(),
            self.runtime.is_some(),
            !self.genre.is_empty(),
            self.budget.is_some(),
            self.worldwide_gross.is_some(),
            self.description.is_some(),
            self.production_countries.is_some(),
        ])
    }
}

/// Standardized row of the genre-labeled catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecord {
    pub movie_id: Option<String>,
    pub title: String,
    pub normalized_title: String,
    pub normalized_title_year: String,
    pub certificate: Certificate,
    pub year: i32,
    pub decade: String,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub runtime: Option<i64>,
    #[serde(with = "sequence_cell")]
    pub genre: Vec<String>,
    pub description: Option<String>,
    pub director: Option<String>,
    #[serde(with = "sequence_cell")]
    pub stars: Vec<String>,
}

impl Completeness for GenreRecord {
    fn has_critical_fields(&self) -> bool {
        self.movie_id.is_some()
            && !self.title.is_empty()
            && !self.normalized_title.is_empty()
            && !self.decade.is_empty()
    }

    fn non_critical_absent(&self) -> (usize, usize) {
        absent_count(&[
            !self.normalized_title_year.is_empty(),
            true,
            self.rating.is_some(),
            self.votes.is_some(),
            self.runtime.is_some(),
            !self.genre.is_empty(),
            self.description.is_some(),
            self.director.is_some(),
            !self.stars.is_empty(),
        ])
    }
}

/// Standardized row of the scraped budget table. Carries no identifier until
/// the matcher resolves it into a [`ResolvedBudget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub title: String,
    pub normalized_title: String,
    pub normalized_title_year: String,
    pub release_date: Option<String>,
    pub year: i32,
    pub decade: String,
    pub production_budget: Option<i64>,
    pub domestic_gross: Option<i64>,
    pub worldwide_gross: Option<i64>,
}

impl Completeness for BudgetRecord {
    fn has_critical_fields(&self) -> bool {
        !self.title.is_empty() && !self.normalized_title.is_empty() && !self.decade.is_empty()
    }

    fn non_critical_absent(&self) -> (usize, usize) {
        absent_count(&[
            !self.normalized_title_year.is_empty(),
            self.release_date.is_some(),
            self.production_budget.is_some(),
            self.domestic_gross.is_some(),
            self.worldwide_gross.is_some(),
        ])
    }
}

/// One distinct film in the merged identifier space.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieRecord {
    pub movie_id: String,
    pub title: String,
    pub normalized_title: String,
    pub release_date: Option<String>,
    pub year: i32,
    pub decade: String,
    pub certificate: Option<Certificate>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub runtime: Option<i64>,
    pub description: Option<String>,
    pub production_countries: Option<String>,
    pub genres: Vec<String>,
}

/// Which side of the fallback join produced a budget's identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    Metadata,
    Genre,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBudget {
    pub movie_id: String,
    pub production_budget: Option<i64>,
    pub domestic_gross: Option<i64>,
    pub worldwide_gross: Option<i64>,
    pub matched_via: MatchSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub genre_id: i64,
    pub genre_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovieGenre {
    pub movie_id: String,
    pub genre_id: i64,
}

/// Sequence fields are flattened into one CSV cell as a JSON array and read
/// back through [`crate::normalize::parse_sequence`].
pub mod sequence_cell {
    use serde::{Deserialize, Deserializer, Serializer, ser};

    use crate::normalize::parse_sequence;

    pub fn serialize<S>(values: &[String], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = serde_json::to_string(values).map_err(ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(parse_sequence).unwrap_or_default())
    }
}
