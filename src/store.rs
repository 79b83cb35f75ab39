//! SQLite store holding the four relational tables.
//!
//! The schema is created only when the file does not exist yet; an existing
//! file is trusted after a probe query. Every load runs inside a single
//! transaction and uses insert-or-skip, so rerunning a load with the same
//! input leaves the row counts unchanged. Genres are matched by name against
//! the stored rows, so ids already handed out never change.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use rusqlite::{Connection, Transaction, params};

use crate::{
    error::{PipelineError, PipelineResult},
    pipeline::MergedDataset,
    records::{Genre, MovieGenre, MovieRecord, ResolvedBudget},
};

pub const TABLES: [&str; 4] = ["movies", "genres", "movie_genres", "budgets"];

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS movies (
    movie_id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    normalized_title TEXT NOT NULL,
    release_date TEXT,
    year INTEGER NOT NULL,
    decade TEXT NOT NULL,
    certificate TEXT,
    rating REAL,
    votes INTEGER,
    runtime INTEGER,
    description TEXT,
    production_countries TEXT
);
CREATE TABLE IF NOT EXISTS genres (
    genre_id INTEGER PRIMARY KEY,
    genre_name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS movie_genres (
    movie_id TEXT NOT NULL REFERENCES movies(movie_id),
    genre_id INTEGER NOT NULL REFERENCES genres(genre_id),
    PRIMARY KEY (movie_id, genre_id)
);
CREATE TABLE IF NOT EXISTS budgets (
    budget_id INTEGER PRIMARY KEY AUTOINCREMENT,
    movie_id TEXT NOT NULL REFERENCES movies(movie_id),
    production_budget INTEGER,
    domestic_gross INTEGER,
    worldwide_gross INTEGER
);
CREATE INDEX IF NOT EXISTS idx_budgets_movie_id ON budgets(movie_id);
CREATE INDEX IF NOT EXISTS idx_movie_genres_genre_id ON movie_genres(genre_id);
";

const INSERT_MOVIE: &str = "INSERT OR IGNORE INTO movies (
    movie_id, title, normalized_title, release_date, year, decade, certificate,
    rating, votes, runtime, description, production_countries
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

const INSERT_GENRE: &str = "INSERT INTO genres (genre_id, genre_name) VALUES (?1, ?2)";

const INSERT_LINK: &str =
    "INSERT OR IGNORE INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)";

// Budgets have a surrogate key, so a repeated observation is detected by content.
const INSERT_BUDGET: &str = "INSERT INTO budgets (
    movie_id, production_budget, domestic_gross, worldwide_gross
)
SELECT ?1, ?2, ?3, ?4
WHERE NOT EXISTS (
    SELECT 1 FROM budgets
    WHERE movie_id = ?1
      AND production_budget IS ?2
      AND domestic_gross IS ?3
      AND worldwide_gross IS ?4
)";

/// Rows newly written per table by one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub movies: usize,
    pub genres: usize,
    pub links: usize,
    pub budgets: usize,
}

impl LoadReport {
    pub fn total(&self) -> usize {
        self.movies + self.genres + self.links + self.budgets
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub movies: u64,
    pub genres: u64,
    pub links: u64,
    pub budgets: u64,
}

pub struct MovieStore {
    conn: Connection,
    path: PathBuf,
}

impl MovieStore {
    pub fn open_or_create(path: &Path) -> PipelineResult<Self> {
        let existed = path.exists();
        if !existed
            && let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
        {
            fs::create_dir_all(parent).map_err(|err| PipelineError::io(parent, err))?;
        }
        let store = Self {
            conn: Connection::open(path)?,
            path: path.to_path_buf(),
        };
        if existed {
            store.probe()?;
            debug!("Opened existing store {path:?}");
        }
        store.conn.pragma_update(None, "foreign_keys", "ON")?;
        if !existed {
            store.conn.execute_batch(SCHEMA)?;
            info!("Created store schema in {path:?}");
        }
        Ok(store)
    }

    /// Deletes any existing file at `path` and creates a fresh store.
    pub fn rebuild(path: &Path) -> PipelineResult<Self> {
        if path.exists() {
            fs::remove_file(path).map_err(|err| PipelineError::io(path, err))?;
            info!("Removed existing store {path:?}");
        }
        Self::open_or_create(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn probe(&self) -> PipelineResult<()> {
        probe_tables(&self.conn, &self.path)
    }

    /// Writes all four tables in one transaction. The first failing row
    /// aborts the load and nothing is committed.
    pub fn load(&mut self, data: &MergedDataset) -> PipelineResult<LoadReport> {
        let tx = self.conn.transaction()?;
        let movies = insert_movies(&tx, &data.movies)?;
        let (genres, genre_ids) = insert_genres(&tx, &data.genres)?;
        let report = LoadReport {
            movies,
            genres,
            links: insert_links(&tx, &data.links, &genre_ids)?,
            budgets: insert_budgets(&tx, &data.budgets)?,
        };
        tx.commit()?;
        info!(
            "Loaded {} movie(s), {} genre(s), {} link(s), {} budget(s) into {:?}",
            report.movies, report.genres, report.links, report.budgets, self.path
        );
        Ok(report)
    }

    pub fn counts(&self) -> PipelineResult<StoreCounts> {
        table_counts(&self.conn)
    }
}

pub(crate) fn count_rows(conn: &Connection, sql: &str) -> rusqlite::Result<u64> {
    let value: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(value.max(0) as u64)
}

pub(crate) fn table_counts(conn: &Connection) -> PipelineResult<StoreCounts> {
    Ok(StoreCounts {
        movies: count_rows(conn, "SELECT COUNT(*) FROM movies")?,
        genres: count_rows(conn, "SELECT COUNT(*) FROM genres")?,
        links: count_rows(conn, "SELECT COUNT(*) FROM movie_genres")?,
        budgets: count_rows(conn, "SELECT COUNT(*) FROM budgets")?,
    })
}

/// Fails with [`PipelineError::StoreUnreadable`] unless every table answers a count.
pub(crate) fn probe_tables(conn: &Connection, path: &Path) -> PipelineResult<()> {
    for table in TABLES {
        count_rows(conn, &format!("SELECT COUNT(*) FROM {table}")).map_err(|cause| {
            PipelineError::StoreUnreadable {
                path: path.to_path_buf(),
                cause,
            }
        })?;
    }
    Ok(())
}

fn insertion_failure(
    table: &'static str,
    row: usize,
) -> impl FnOnce(rusqlite::Error) -> PipelineError {
    move |cause| PipelineError::InsertionFailure { table, row, cause }
}

fn insert_movies(tx: &Transaction<'_>, movies: &[MovieRecord]) -> PipelineResult<usize> {
    let mut stmt = tx.prepare_cached(INSERT_MOVIE)?;
    let mut inserted = 0;
    for (idx, movie) in movies.iter().enumerate() {
        inserted += stmt
            .execute(params![
                movie.movie_id,
                movie.title,
                movie.normalized_title,
                movie.release_date,
                movie.year,
                movie.decade,
                movie.certificate.map(|c| c.as_str()),
                movie.rating,
                movie.votes,
                movie.runtime,
                movie.description,
                movie.production_countries,
            ])
            .map_err(insertion_failure("movies", idx))?;
    }
    Ok(inserted)
}

/// Genre names already in the store keep their id; new names are appended
/// after the current maximum. Returns the inserted count and the mapping from
/// dataset ids to store ids.
fn insert_genres(
    tx: &Transaction<'_>,
    genres: &[Genre],
) -> PipelineResult<(usize, HashMap<i64, i64>)> {
    let mut known: HashMap<String, i64> = {
        let mut stmt = tx.prepare_cached("SELECT genre_name, genre_id FROM genres")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<_>>()?;
        pairs
    };
    let mut next_id: i64 =
        tx.query_row("SELECT COALESCE(MAX(genre_id), 0) FROM genres", [], |row| row.get(0))?;

    let mut stmt = tx.prepare_cached(INSERT_GENRE)?;
    let mut inserted = 0;
    let mut ids = HashMap::with_capacity(genres.len());
    for (idx, genre) in genres.iter().enumerate() {
        let store_id = match known.get(&genre.genre_name) {
            Some(id) => *id,
            None => {
                next_id += 1;
                inserted += stmt
                    .execute(params![next_id, genre.genre_name])
                    .map_err(insertion_failure("genres", idx))?;
                known.insert(genre.genre_name.clone(), next_id);
                next_id
            }
        };
        if store_id != genre.genre_id {
            debug!(
                "Genre '{}' keeps stored id {store_id} (dataset id {})",
                genre.genre_name, genre.genre_id
            );
        }
        ids.insert(genre.genre_id, store_id);
    }
    Ok((inserted, ids))
}

/// Link genre ids are translated through `genre_ids`; ids the dataset does
/// not define are written as given.
fn insert_links(
    tx: &Transaction<'_>,
    links: &[MovieGenre],
    genre_ids: &HashMap<i64, i64>,
) -> PipelineResult<usize> {
    let mut stmt = tx.prepare_cached(INSERT_LINK)?;
    let mut inserted = 0;
    for (idx, link) in links.iter().enumerate() {
        let genre_id = genre_ids.get(&link.genre_id).copied().unwrap_or(link.genre_id);
        inserted += stmt
            .execute(params![link.movie_id, genre_id])
            .map_err(insertion_failure("movie_genres", idx))?;
    }
    Ok(inserted)
}

fn insert_budgets(tx: &Transaction<'_>, budgets: &[ResolvedBudget]) -> PipelineResult<usize> {
    let mut stmt = tx.prepare_cached(INSERT_BUDGET)?;
    let mut inserted = 0;
    for (idx, budget) in budgets.iter().enumerate() {
        inserted += stmt
            .execute(params![
                budget.movie_id,
                budget.production_budget,
                budget.domestic_gross,
                budget.worldwide_gross,
            ])
            .map_err(insertion_failure("budgets", idx))?;
    }
    Ok(inserted)
}
