pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod genres;
pub mod io_utils;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod rating;
pub mod records;
pub mod store;
pub mod table;
pub mod verify;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{BuildArgs, CleanArgs, Cli, Commands, PipelineArgs},
    config::PipelineConfig,
    pipeline::{RunContext, StageSummary},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("moviz", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Clean(args) => handle_clean(&args),
        Commands::Build(args) => handle_build(&args),
        Commands::Query(args) => query::execute(&args),
        Commands::Verify(args) => verify::execute(&args),
    }
}

fn run_context(args: &PipelineArgs) -> RunContext {
    match args.today {
        Some(today) => RunContext::with_today(today),
        None => RunContext::new(),
    }
}

fn handle_clean(args: &CleanArgs) -> Result<()> {
    let config = PipelineConfig::resolve(&args.pipeline)?;
    let ctx = run_context(&args.pipeline);
    let source = args.source.into();
    info!(
        "Cleaning {source} source from {:?}",
        config.source_dir(source)
    );
    let outcome = pipeline::clean_single_source(&config, &ctx, source)
        .with_context(|| format!("Cleaning {source} source"))?;
    print_drop_summary(std::slice::from_ref(&outcome.summary));
    info!(
        "Standardized {} row(s) written to {:?}",
        outcome.kept, outcome.artifact
    );
    Ok(())
}

fn handle_build(args: &BuildArgs) -> Result<()> {
    let mut config = PipelineConfig::resolve(&args.pipeline)?;
    config.write_artifacts |= args.write_artifacts;
    config.resume |= args.resume;
    config.rebuild |= args.rebuild;
    let ctx = run_context(&args.pipeline);
    let outcome = pipeline::run_pipeline(&config, &ctx)
        .with_context(|| format!("Building store {:?}", config.store_path))?;
    print_drop_summary(&outcome.stages);
    info!(
        "Run {} wrote {} movie(s), {} genre(s), {} link(s), {} budget(s) to {:?}",
        outcome.run_id,
        outcome.load.movies,
        outcome.load.genres,
        outcome.load.links,
        outcome.load.budgets,
        outcome.store_path
    );
    Ok(())
}

fn print_drop_summary(stages: &[StageSummary]) {
    let rows: Vec<Vec<String>> = stages
        .iter()
        .flat_map(|summary| {
            summary.drops.iter().map(|(reason, count)| {
                vec![
                    summary.stage.clone(),
                    reason.to_string(),
                    count.to_string(),
                ]
            })
        })
        .collect();
    table::print_table(&["stage", "dropped because", "rows"], &rows);
}
