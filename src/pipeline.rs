//! Per-run context and the end-to-end build driver.
//!
//! A [`RunContext`] is created once per invocation and handed to every stage.
//! Stages log through the [`StageLog`] handle it gives out, which tags each
//! message with the run id and stage name and counts dropped rows per
//! [`DropReason`]. The driver runs the stages strictly one after another:
//! clean (or resume from artifacts), match, build genre tables, load.

use std::{collections::BTreeMap, fmt::Display, path::PathBuf};

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
    clean::{self, DropReason},
    config::PipelineConfig,
    error::PipelineResult,
    frame::RawTable,
    genres::GenreTables,
    io_utils,
    matcher::{self, MatchReport},
    records::{
        BudgetRecord, Genre, GenreRecord, MetadataRecord, MovieGenre, MovieRecord, ResolvedBudget,
        Source, Standardized,
    },
    store::{LoadReport, MovieStore},
};

#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: Uuid,
    today: NaiveDate,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    pub fn new() -> Self {
        Self::with_today(Local::now().date_naive())
    }

    /// Fixes the processing date used by the future-release filter.
    pub fn with_today(today: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            today,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn stage(&self, name: &str) -> StageLog {
        StageLog {
            run: self.run_id.simple().to_string()[..8].to_string(),
            stage: name.to_string(),
            target: format!("moviz::{name}"),
            drops: BTreeMap::new(),
        }
    }
}

/// Logging handle for one stage of one run.
#[derive(Debug)]
pub struct StageLog {
    run: String,
    stage: String,
    target: String,
    drops: BTreeMap<DropReason, usize>,
}

impl StageLog {
    pub fn info(&self, message: impl Display) {
        info!(target: self.target.as_str(), "[{}] {}: {}", self.run, self.stage, message);
    }

    pub fn warn(&self, message: impl Display) {
        warn!(target: self.target.as_str(), "[{}] {}: {}", self.run, self.stage, message);
    }

    pub fn debug(&self, message: impl Display) {
        debug!(target: self.target.as_str(), "[{}] {}: {}", self.run, self.stage, message);
    }

    pub fn dropped(&mut self, reason: DropReason, count: usize) {
        if count > 0 {
            *self.drops.entry(reason).or_default() += count;
        }
    }

    pub fn drops(&self) -> &BTreeMap<DropReason, usize> {
        &self.drops
    }

    pub fn name(&self) -> &str {
        &self.stage
    }

    /// Logs the drop counters and closes the stage.
    pub fn finish(self) -> StageSummary {
        let total: usize = self.drops.values().sum();
        if total == 0 {
            self.info("no rows dropped");
        } else {
            for (reason, count) in &self.drops {
                self.info(format_args!("dropped {count} row(s): {reason}"));
            }
        }
        StageSummary {
            stage: self.stage,
            drops: self.drops,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSummary {
    pub stage: String,
    pub drops: BTreeMap<DropReason, usize>,
}

impl StageSummary {
    pub fn total_dropped(&self) -> usize {
        self.drops.values().sum()
    }
}

/// The three cleaned sources, ready for matching.
#[derive(Debug, Clone)]
pub struct CleanedSources {
    pub metadata: Standardized<MetadataRecord>,
    pub genres: Standardized<GenreRecord>,
    pub budgets: Standardized<BudgetRecord>,
}

/// Everything the store loader writes.
#[derive(Debug, Clone, Default)]
pub struct MergedDataset {
    pub movies: Vec<MovieRecord>,
    pub genres: Vec<Genre>,
    pub links: Vec<MovieGenre>,
    pub budgets: Vec<ResolvedBudget>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub run_id: Uuid,
    pub store_path: PathBuf,
    pub matching: MatchReport,
    pub load: LoadReport,
    pub stages: Vec<StageSummary>,
}

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub source: Source,
    pub kept: usize,
    pub artifact: PathBuf,
    pub summary: StageSummary,
}

/// Runs clean, match, genre normalization and load against `config`.
pub fn run_pipeline(config: &PipelineConfig, ctx: &RunContext) -> PipelineResult<PipelineOutcome> {
    info!("Starting run {} (processing date {})", ctx.run_id(), ctx.today());
    let mut stages = Vec::new();
    let metadata = prepare_source(
        config,
        ctx,
        Source::Metadata,
        &mut stages,
        clean::clean_metadata,
    )?;
    let genres = prepare_source(config, ctx, Source::Genre, &mut stages, clean::clean_genres)?;
    let budgets = prepare_source(config, ctx, Source::Budget, &mut stages, |raw, log| {
        clean::clean_budgets(raw, ctx.today(), log)
    })?;
    let sources = CleanedSources {
        metadata,
        genres,
        budgets,
    };

    let (dataset, matching) = merge_sources(sources, ctx, &mut stages)?;

    let log = ctx.stage("load");
    let mut store = if config.rebuild {
        MovieStore::rebuild(&config.store_path)?
    } else {
        MovieStore::open_or_create(&config.store_path)?
    };
    let load = store.load(&dataset)?;
    let counts = store.counts()?;
    log.info(format_args!(
        "store now holds {} movie(s), {} genre(s), {} link(s), {} budget(s)",
        counts.movies, counts.genres, counts.links, counts.budgets
    ));
    stages.push(log.finish());

    let dropped: usize = stages.iter().map(StageSummary::total_dropped).sum();
    info!(
        "Run {} finished: {} new row(s) written, {dropped} row(s) dropped across {} stage(s)",
        ctx.run_id(),
        load.total(),
        stages.len()
    );
    Ok(PipelineOutcome {
        run_id: ctx.run_id(),
        store_path: config.store_path.clone(),
        matching,
        load,
        stages,
    })
}

/// Matches the cleaned sources and derives the genre tables.
pub fn merge_sources(
    sources: CleanedSources,
    ctx: &RunContext,
    stages: &mut Vec<StageSummary>,
) -> PipelineResult<(MergedDataset, MatchReport)> {
    let mut log = ctx.stage("match");
    let metadata = matcher::filter_low_information(sources.metadata, &mut log);
    let genres = matcher::filter_low_information(sources.genres, &mut log);
    let budgets = matcher::filter_low_information(sources.budgets, &mut log);

    let movies = matcher::merge_movies(&metadata, &genres, &log)?;
    let (resolved, mut report) = matcher::assign_budget_movie_ids(
        &budgets.records,
        &metadata.records,
        &genres.records,
        &mut log,
    );
    let budgets = matcher::drop_orphaned_budgets(resolved, &movies, &mut report, &mut log);
    log.info(format_args!(
        "{} budget(s) resolved ({} via metadata, {} via genre catalog)",
        budgets.len(),
        report.via_metadata,
        report.via_genre
    ));
    stages.push(log.finish());

    let log = ctx.stage("genres");
    let tables = GenreTables::build(&movies);
    log.info(format_args!(
        "{} distinct genre(s), {} link(s)",
        tables.genres.len(),
        tables.links.len()
    ));
    stages.push(log.finish());

    Ok((
        MergedDataset {
            movies,
            genres: tables.genres,
            links: tables.links,
            budgets,
        },
        report,
    ))
}

/// Cleans one source and always writes its artifact.
pub fn clean_single_source(
    config: &PipelineConfig,
    ctx: &RunContext,
    source: Source,
) -> PipelineResult<CleanOutcome> {
    let config = PipelineConfig {
        write_artifacts: true,
        resume: false,
        ..config.clone()
    };
    let mut stages = Vec::new();
    let kept = match source {
        Source::Metadata => {
            prepare_source(&config, ctx, source, &mut stages, clean::clean_metadata)?.len()
        }
        Source::Genre => {
            prepare_source(&config, ctx, source, &mut stages, clean::clean_genres)?.len()
        }
        Source::Budget => prepare_source(&config, ctx, source, &mut stages, |raw, log| {
            clean::clean_budgets(raw, ctx.today(), log)
        })?
        .len(),
    };
    let summary = stages.pop().unwrap_or_else(|| ctx.stage(source.as_str()).finish());
    Ok(CleanOutcome {
        source,
        kept,
        artifact: config.artifact_path(source),
        summary,
    })
}

fn prepare_source<R, F>(
    config: &PipelineConfig,
    ctx: &RunContext,
    source: Source,
    stages: &mut Vec<StageSummary>,
    clean: F,
) -> PipelineResult<Standardized<R>>
where
    R: Serialize + DeserializeOwned,
    F: FnOnce(RawTable, &mut StageLog) -> PipelineResult<Standardized<R>>,
{
    let mut log = ctx.stage(&format!("clean.{source}"));
    let artifact = config.artifact_path(source);
    let resumable = artifact.is_file() && clean::missing_columns_path(&artifact).is_file();
    let table = if config.resume && resumable {
        log.info(format_args!("resuming from {artifact:?}"));
        clean::read_artifact(source, &artifact)?
    } else {
        if config.resume {
            log.warn(format_args!("no complete artifact at {artifact:?}; cleaning raw input"));
        }
        let folder = config.source_dir(source);
        let encoding = io_utils::resolve_encoding(config.input_encoding.as_deref())?;
        let raw = io_utils::load_stacked_csvs(folder, encoding)?;
        log.info(format_args!(
            "loaded {} row(s) and {} column(s) from {folder:?}",
            raw.len(),
            raw.headers().len()
        ));
        let table = clean(raw, &mut log)?;
        if config.write_artifacts {
            clean::write_artifact(&table, &artifact)?;
            log.info(format_args!("wrote {} row(s) to {artifact:?}", table.len()));
        }
        table
    };
    stages.push(log.finish());
    Ok(table)
}
