//! Read-only access to a built store, as used by the dashboard.
//!
//! Filters are optional; an empty list or an absent range places no
//! restriction. List filters become `IN (...)` clauses and ranges become
//! inclusive `BETWEEN` clauses, all bound as parameters.

use std::{io, path::Path};

use anyhow::{Context, Result};
use log::info;
use rusqlite::{Connection, OpenFlags, params_from_iter, types::Value};

use crate::{
    cli::{ListKind, QueryArgs},
    error::{PipelineError, PipelineResult},
    rating::Certificate,
    store::{self, StoreCounts},
    table,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    pub decades: Vec<String>,
    pub genres: Vec<String>,
    pub budget: Option<(i64, i64)>,
    pub revenue: Option<(i64, i64)>,
    pub rating: Option<(f64, f64)>,
    pub certificates: Vec<Certificate>,
}

impl FilterSet {
    /// Renders the `WHERE` clause and its parameters in placeholder order.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut conditions = Vec::new();
        let mut params = Vec::new();

        let texts = |values: &[String]| -> Vec<Value> {
            values.iter().cloned().map(Value::Text).collect()
        };
        push_in(&mut conditions, &mut params, "m.decade", texts(&self.decades));
        push_in(&mut conditions, &mut params, "g.genre_name", texts(&self.genres));
        if let Some((min, max)) = self.budget {
            conditions.push("b.production_budget BETWEEN ? AND ?".to_string());
            params.extend([Value::Integer(min), Value::Integer(max)]);
        }
        if let Some((min, max)) = self.revenue {
            conditions.push("b.worldwide_gross BETWEEN ? AND ?".to_string());
            params.extend([Value::Integer(min), Value::Integer(max)]);
        }
        if let Some((min, max)) = self.rating {
            conditions.push("m.rating BETWEEN ? AND ?".to_string());
            params.extend([Value::Real(min), Value::Real(max)]);
        }
        let certificates = self
            .certificates
            .iter()
            .map(|c| Value::Text(c.as_str().to_string()))
            .collect();
        push_in(&mut conditions, &mut params, "m.certificate", certificates);

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

fn push_in(
    conditions: &mut Vec<String>,
    params: &mut Vec<Value>,
    column: &str,
    values: Vec<Value>,
) {
    if values.is_empty() {
        return;
    }
    let placeholders = vec!["?"; values.len()].join(", ");
    conditions.push(format!("{column} IN ({placeholders})"));
    params.extend(values);
}

/// One row of the dashboard's flat result set: one per movie, genre and budget.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRow {
    pub title: String,
    pub year: i32,
    pub decade: String,
    pub genre_name: String,
    pub rating: Option<f64>,
    pub certificate: Option<String>,
    pub production_budget: Option<i64>,
    pub worldwide_gross: Option<i64>,
}

/// A budget against revenue point for the scatter view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetPoint {
    pub production_budget: Option<i64>,
    pub worldwide_gross: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub counts: StoreCounts,
    pub links_missing_movie: u64,
    pub links_missing_genre: u64,
    pub budgets_missing_movie: u64,
    pub movies_with_multiple_budgets: u64,
}

impl IntegrityReport {
    pub fn violations(&self) -> u64 {
        self.links_missing_movie
            + self.links_missing_genre
            + self.budgets_missing_movie
            + self.movies_with_multiple_budgets
    }

    pub fn is_clean(&self) -> bool {
        self.violations() == 0
    }
}

pub struct StoreReader {
    conn: Connection,
}

impl StoreReader {
    pub fn open(path: &Path) -> PipelineResult<Self> {
        if !path.is_file() {
            return Err(PipelineError::io(
                path,
                io::Error::new(io::ErrorKind::NotFound, "store has not been built"),
            ));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|cause| PipelineError::StoreUnreadable {
            path: path.to_path_buf(),
            cause,
        })?;
        store::probe_tables(&conn, path)?;
        Ok(Self { conn })
    }

    pub fn genre_names(&self) -> PipelineResult<Vec<String>> {
        self.strings(
            "SELECT DISTINCT genre_name FROM genres ORDER BY genre_name",
            Vec::new(),
        )
    }

    /// Distinct decades, restricted to movies linked to `genre` when given.
    pub fn decades(&self, genre: Option<&str>) -> PipelineResult<Vec<String>> {
        match genre {
            Some(genre) => self.strings(
                "SELECT DISTINCT m.decade
                 FROM movies m
                 JOIN movie_genres mg ON m.movie_id = mg.movie_id
                 JOIN genres g ON mg.genre_id = g.genre_id
                 WHERE g.genre_name = ?
                 ORDER BY m.decade",
                vec![Value::Text(genre.to_string())],
            ),
            None => self.strings(
                "SELECT DISTINCT decade FROM movies ORDER BY decade",
                Vec::new(),
            ),
        }
    }

    /// Normalized titles of the movies in one genre and decade.
    pub fn titles(&self, genre: &str, decade: &str) -> PipelineResult<Vec<String>> {
        self.strings(
            "SELECT DISTINCT m.normalized_title
             FROM movies m
             JOIN movie_genres mg ON m.movie_id = mg.movie_id
             JOIN genres g ON mg.genre_id = g.genre_id
             WHERE g.genre_name = ? AND m.decade = ?
             ORDER BY m.normalized_title",
            vec![Value::Text(genre.to_string()), Value::Text(decade.to_string())],
        )
    }

    /// Budget and revenue pairs, narrowed by title, else by genre and decade,
    /// else by genre alone.
    pub fn budget_points(
        &self,
        genre: Option<&str>,
        decade: Option<&str>,
        title: Option<&str>,
    ) -> PipelineResult<Vec<BudgetPoint>> {
        let base = "SELECT b.production_budget, b.worldwide_gross
                    FROM budgets b
                    JOIN movies m ON b.movie_id = m.movie_id";
        let by_genre = "JOIN movie_genres mg ON m.movie_id = mg.movie_id
                        JOIN genres g ON mg.genre_id = g.genre_id";
        let text = |value: &str| Value::Text(value.to_string());
        let (sql, params) = match (title, genre, decade) {
            (Some(title), _, _) => (
                format!("{base} WHERE m.normalized_title = ?"),
                vec![text(title)],
            ),
            (None, Some(genre), Some(decade)) => (
                format!("{base} {by_genre} WHERE g.genre_name = ? AND m.decade = ?"),
                vec![text(genre), text(decade)],
            ),
            (None, Some(genre), None) => (
                format!("{base} {by_genre} WHERE g.genre_name = ?"),
                vec![text(genre)],
            ),
            (None, None, _) => (base.to_string(), Vec::new()),
        };
        let mut stmt = self.conn.prepare(&sql)?;
        let points = stmt
            .query_map(params_from_iter(params), |row| {
                Ok(BudgetPoint {
                    production_budget: row.get(0)?,
                    worldwide_gross: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(points)
    }

    pub fn filtered_rows(
        &self,
        filters: &FilterSet,
        limit: Option<usize>,
    ) -> PipelineResult<Vec<DashboardRow>> {
        let (where_clause, mut params) = filters.where_clause();
        let mut sql = format!(
            "SELECT m.title, m.year, m.decade, g.genre_name, m.rating, m.certificate,
                    b.production_budget, b.worldwide_gross
             FROM movies m
             JOIN budgets b ON m.movie_id = b.movie_id
             JOIN movie_genres mg ON m.movie_id = mg.movie_id
             JOIN genres g ON mg.genre_id = g.genre_id
             {where_clause}
             ORDER BY m.title, m.year, g.genre_name"
        );
        if let Some(limit) = limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
        }
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(params), |row| {
                Ok(DashboardRow {
                    title: row.get(0)?,
                    year: row.get(1)?,
                    decade: row.get(2)?,
                    genre_name: row.get(3)?,
                    rating: row.get(4)?,
                    certificate: row.get(5)?,
                    production_budget: row.get(6)?,
                    worldwide_gross: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn integrity_report(&self) -> PipelineResult<IntegrityReport> {
        let count = |sql: &str| store::count_rows(&self.conn, sql);
        Ok(IntegrityReport {
            counts: store::table_counts(&self.conn)?,
            links_missing_movie: count(
                "SELECT COUNT(*) FROM movie_genres mg
                 LEFT JOIN movies m ON mg.movie_id = m.movie_id
                 WHERE m.movie_id IS NULL",
            )?,
            links_missing_genre: count(
                "SELECT COUNT(*) FROM movie_genres mg
                 LEFT JOIN genres g ON mg.genre_id = g.genre_id
                 WHERE g.genre_id IS NULL",
            )?,
            budgets_missing_movie: count(
                "SELECT COUNT(*) FROM budgets b
                 LEFT JOIN movies m ON b.movie_id = m.movie_id
                 WHERE m.movie_id IS NULL",
            )?,
            movies_with_multiple_budgets: count(
                "SELECT COUNT(*) FROM (
                     SELECT movie_id FROM budgets GROUP BY movie_id HAVING COUNT(*) > 1
                 )",
            )?,
        })
    }

    fn strings(&self, sql: &str, params: Vec<Value>) -> PipelineResult<Vec<String>> {
        let mut stmt = self.conn.prepare(sql)?;
        let values = stmt
            .query_map(params_from_iter(params), |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(values)
    }
}

pub fn execute(args: &QueryArgs) -> Result<()> {
    let reader = StoreReader::open(&args.store)
        .with_context(|| format!("Opening store {:?}", args.store))?;
    let first_genre = args.genres.first().map(String::as_str);
    let first_decade = args.decades.first().map(String::as_str);
    match args.list {
        ListKind::Genres => print_single_column("genre", reader.genre_names()?),
        ListKind::Decades => print_single_column("decade", reader.decades(first_genre)?),
        ListKind::Titles => {
            let (Some(genre), Some(decade)) = (first_genre, first_decade) else {
                anyhow::bail!("Listing titles requires --genre and --decade");
            };
            print_single_column("normalized_title", reader.titles(genre, decade)?);
        }
        ListKind::Points => {
            let points = reader.budget_points(first_genre, first_decade, args.title.as_deref())?;
            let rows: Vec<Vec<String>> = points
                .iter()
                .map(|p| {
                    vec![
                        table::format_amount(p.production_budget),
                        table::format_amount(p.worldwide_gross),
                    ]
                })
                .collect();
            table::print_table(&["production_budget", "worldwide_gross"], &rows);
            info!("{} point(s)", rows.len());
        }
        ListKind::Rows => {
            let filters = FilterSet {
                decades: args.decades.clone(),
                genres: args.genres.clone(),
                budget: args.budget,
                revenue: args.revenue,
                rating: args.rating,
                certificates: args.certificates.clone(),
            };
            let rows = reader.filtered_rows(&filters, args.limit)?;
            let rendered: Vec<Vec<String>> = rows.iter().map(render_row).collect();
            table::print_table(
                &[
                    "title",
                    "year",
                    "decade",
                    "genre",
                    "rating",
                    "certificate",
                    "budget",
                    "revenue",
                ],
                &rendered,
            );
            info!("{} row(s) matched", rows.len());
        }
    }
    Ok(())
}

fn print_single_column(header: &str, values: Vec<String>) {
    let rows: Vec<Vec<String>> = values.into_iter().map(|v| vec![v]).collect();
    table::print_table(&[header], &rows);
}

fn render_row(row: &DashboardRow) -> Vec<String> {
    vec![
        row.title.clone(),
        row.year.to_string(),
        row.decade.clone(),
        row.genre_name.clone(),
        row.rating.map(|r| format!("{r:.1}")).unwrap_or_default(),
        row.certificate.clone().unwrap_or_default(),
        table::format_amount(row.production_budget),
        table::format_amount(row.worldwide_gross),
    ]
}
