use std::{path::PathBuf, str::FromStr};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{rating::Certificate, records::Source};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Clean, link and load movie datasets into a SQLite store",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Clean one raw source folder into its standardized CSV artifact
    Clean(CleanArgs),
    /// Clean, match and load all three sources into the store
    Build(BuildArgs),
    /// Run dashboard queries against a built store
    Query(QueryArgs),
    /// Check row counts and referential integrity of a built store
    Verify(VerifyArgs),
}

/// Locations shared by `clean` and `build`; each overrides the YAML config.
#[derive(Debug, Clone, Default, Args)]
pub struct PipelineArgs {
    /// YAML pipeline configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Folder of metadata export CSV files
    #[arg(long = "metadata-dir")]
    pub metadata_dir: Option<PathBuf>,
    /// Folder of genre catalog CSV files
    #[arg(long = "genres-dir")]
    pub genres_dir: Option<PathBuf>,
    /// Folder of scraped budget CSV files
    #[arg(long = "budgets-dir")]
    pub budgets_dir: Option<PathBuf>,
    /// Folder receiving the standardized per-source artifacts
    #[arg(long = "processed-dir")]
    pub processed_dir: Option<PathBuf>,
    /// SQLite store path
    #[arg(short, long)]
    pub store: Option<PathBuf>,
    /// Character encoding of the raw CSV files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Processing date used to drop future releases (defaults to today)
    #[arg(long, value_parser = parse_date)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SourceArg {
    Metadata,
    Genre,
    Budget,
}

impl From<SourceArg> for Source {
    fn from(value: SourceArg) -> Self {
        match value {
            SourceArg::Metadata => Source::Metadata,
            SourceArg::Genre => Source::Genre,
            SourceArg::Budget => Source::Budget,
        }
    }
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Which source to clean
    #[arg(value_enum)]
    pub source: SourceArg,
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
    /// Write the standardized per-source CSV artifacts
    #[arg(long = "write-artifacts")]
    pub write_artifacts: bool,
    /// Reuse existing artifacts instead of re-cleaning their sources
    #[arg(long)]
    pub resume: bool,
    /// Delete any existing store and recreate the schema
    #[arg(long)]
    pub rebuild: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum ListKind {
    #[default]
    Rows,
    Genres,
    Decades,
    Titles,
    Points,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// SQLite store path
    #[arg(short, long, default_value = "data/moviz.sqlite")]
    pub store: PathBuf,
    /// What to list: filtered rows, genres, decades, titles or budget points
    #[arg(long, value_enum, default_value_t = ListKind::Rows)]
    pub list: ListKind,
    /// Restrict to these decade labels (repeatable, e.g. `1990–1999`)
    #[arg(long = "decade", action = clap::ArgAction::Append)]
    pub decades: Vec<String>,
    /// Restrict to these genre names (repeatable)
    #[arg(long = "genre", action = clap::ArgAction::Append)]
    pub genres: Vec<String>,
    /// Production budget range `MIN:MAX` or `MIN..MAX`
    #[arg(long, value_parser = parse_range::<i64>)]
    pub budget: Option<(i64, i64)>,
    /// Worldwide gross range `MIN:MAX` or `MIN..MAX`
    #[arg(long, value_parser = parse_range::<i64>)]
    pub revenue: Option<(i64, i64)>,
    /// Rating range `MIN:MAX` or `MIN..MAX`
    #[arg(long, value_parser = parse_range::<f64>)]
    pub rating: Option<(f64, f64)>,
    /// Restrict to these certificates (repeatable, e.g. `PG-13`)
    #[arg(
        long = "certificate",
        action = clap::ArgAction::Append,
        value_parser = Certificate::from_str
    )]
    pub certificates: Vec<Certificate>,
    /// Normalized title for `--list points`
    #[arg(long)]
    pub title: Option<String>,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// SQLite store path
    #[arg(short, long, default_value = "data/moviz.sqlite")]
    pub store: PathBuf,
}

pub fn parse_range<T>(value: &str) -> Result<(T, T), String>
where
    T: FromStr + PartialOrd + Copy,
{
    let (min, max) = value
        .split_once("..")
        .or_else(|| value.split_once(':'))
        .ok_or_else(|| format!("Range '{value}' must look like MIN:MAX or MIN..MAX"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<T>()
            .map_err(|_| format!("Invalid range bound '{}'", part.trim()))
    };
    let (min, max) = (parse(min)?, parse(max)?);
    if min > max {
        return Err(format!("Range '{value}' has its minimum above its maximum"));
    }
    Ok((min, max))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|err| format!("Invalid date '{value}': {err}"))
}
