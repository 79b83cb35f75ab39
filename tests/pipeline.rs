mod common;

use chrono::NaiveDate;
use common::{TODAY, TestWorkspace};
use moviz::{
    clean::DropReason,
    error::PipelineError,
    pipeline::{RunContext, run_pipeline},
    query::{FilterSet, StoreReader},
    rating::Certificate,
    records::Source,
    store::StoreCounts,
};

fn context() -> RunContext {
    RunContext::with_today(NaiveDate::parse_from_str(TODAY, "%Y-%m-%d").unwrap())
}

fn dropped(outcome: &moviz::pipeline::PipelineOutcome, stage: &str, reason: DropReason) -> usize {
    outcome
        .stages
        .iter()
        .find(|s| s.stage == stage)
        .and_then(|s| s.drops.get(&reason).copied())
        .unwrap_or(0)
}

#[test]
fn build_links_sources_and_loads_store() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let outcome = run_pipeline(&workspace.config(), &context()).expect("pipeline run");

    assert_eq!(outcome.load.movies, 2);
    assert_eq!(outcome.load.genres, 6);
    assert_eq!(outcome.load.links, 6);
    assert_eq!(outcome.load.budgets, 2);
    assert_eq!(outcome.matching.via_metadata, 2);
    assert_eq!(outcome.matching.via_genre, 1);
    assert_eq!(outcome.matching.unresolved, 1);
    assert_eq!(outcome.matching.orphaned, 1);

    assert_eq!(dropped(&outcome, "clean.metadata", DropReason::NotReleased), 1);
    assert_eq!(
        dropped(&outcome, "clean.metadata", DropReason::DuplicateIdentifier),
        1
    );
    assert_eq!(
        dropped(&outcome, "clean.genre", DropReason::ExcludedCertificate),
        1
    );
    assert_eq!(dropped(&outcome, "clean.budget", DropReason::FutureRelease), 1);
    assert_eq!(dropped(&outcome, "match", DropReason::UnresolvedMatch), 1);
}

#[test]
fn second_load_leaves_counts_unchanged() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let config = workspace.config();
    run_pipeline(&config, &context()).expect("first run");
    let first = StoreReader::open(&config.store_path)
        .unwrap()
        .integrity_report()
        .unwrap();

    let outcome = run_pipeline(&config, &context()).expect("second run");
    assert_eq!(outcome.load.total(), 0);
    let second = StoreReader::open(&config.store_path)
        .unwrap()
        .integrity_report()
        .unwrap();
    assert_eq!(first.counts, second.counts);
    assert_eq!(
        second.counts,
        StoreCounts {
            movies: 2,
            genres: 6,
            links: 6,
            budgets: 2
        }
    );
    assert!(second.is_clean());
}

#[test]
fn merged_movie_takes_certificate_from_catalog() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let config = workspace.config();
    run_pipeline(&config, &context()).unwrap();

    let reader = StoreReader::open(&config.store_path).unwrap();
    let rows = reader
        .filtered_rows(
            &FilterSet {
                genres: vec!["Crime".into()],
                ..FilterSet::default()
            },
            None,
        )
        .unwrap();
    assert_eq!(rows.len(), 1);
    let heat = &rows[0];
    assert_eq!(heat.title, "Heat");
    assert_eq!(heat.decade, "1990–1999");
    assert_eq!(heat.certificate.as_deref(), Some("R"));
    assert_eq!(heat.rating, Some(7.9));
    assert_eq!(heat.production_budget, Some(60_000_000));
}

#[test]
fn filters_combine_with_and_semantics() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let config = workspace.config();
    run_pipeline(&config, &context()).unwrap();
    let reader = StoreReader::open(&config.store_path).unwrap();

    let all = reader.filtered_rows(&FilterSet::default(), None).unwrap();
    assert_eq!(all.len(), 6);

    let cheap = FilterSet {
        budget: Some((0, 40_000_000)),
        ..FilterSet::default()
    };
    let rows = reader.filtered_rows(&cheap, None).unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.title == "Toy Story"));

    let none = FilterSet {
        budget: Some((0, 40_000_000)),
        certificates: vec![Certificate::R],
        ..FilterSet::default()
    };
    assert!(reader.filtered_rows(&none, None).unwrap().is_empty());

    let limited = reader.filtered_rows(&FilterSet::default(), Some(2)).unwrap();
    assert_eq!(limited.len(), 2);

    assert_eq!(
        reader.genre_names().unwrap(),
        vec!["Action", "Animation", "Comedy", "Crime", "Drama", "Family"]
    );
    assert_eq!(reader.decades(Some("Family")).unwrap(), vec!["1990–1999"]);
    assert_eq!(
        reader.titles("Crime", "1990–1999").unwrap(),
        vec!["heat".to_string()]
    );
    let points = reader.budget_points(None, None, Some("toystory")).unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].worldwide_gross, Some(373_554_033));
}

#[test]
fn artifacts_are_written_and_resumed() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let mut config = workspace.config();
    config.write_artifacts = true;
    run_pipeline(&config, &context()).unwrap();
    for source in [Source::Metadata, Source::Genre, Source::Budget] {
        assert!(config.artifact_path(source).is_file(), "{source} artifact");
    }

    std::fs::remove_dir_all(workspace.path().join("raw")).unwrap();
    std::fs::remove_file(&config.store_path).unwrap();
    config.write_artifacts = false;
    config.resume = true;
    let outcome = run_pipeline(&config, &context()).expect("resume from artifacts");
    assert_eq!(outcome.load.movies, 2);
    assert_eq!(outcome.load.links, 6);
    assert_eq!(outcome.load.budgets, 2);
}

#[test]
fn missing_title_column_is_fatal() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    workspace.write(
        "raw/tmdb_movies/part1.csv",
        "id,name,release_date,imdb_id\n1,Heat,1995-12-15,tt0113277\n",
    );
    let err = run_pipeline(&workspace.config(), &context()).unwrap_err();
    match err {
        PipelineError::SchemaPrecondition {
            source_name,
            column,
        } => {
            assert_eq!(source_name, Source::Metadata);
            assert_eq!(column, "title");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!workspace.store_path().exists());
}

#[test]
fn missing_identifier_column_is_fatal() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    workspace.write(
        "raw/genres/action.csv",
        "movie_name,year,certificate\nHeat,1995,R\n",
    );
    let err = run_pipeline(&workspace.config(), &context()).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::SchemaPrecondition {
            source_name: Source::Genre,
            ..
        }
    ));
}

#[test]
fn schema_union_across_files_in_a_folder() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    workspace.write(
        "raw/tmdb_movies/part2.csv",
        "title,imdb_id,status,release_date,runtime,genres,overview,vote_average,vote_count\n\
         Alien,tt0078748,Released,1979-05-25,117,\"Horror, Sci-Fi\",In space,8.1,9000\n",
    );
    let outcome = run_pipeline(&workspace.config(), &context()).unwrap();
    assert_eq!(outcome.load.movies, 3);
    let reader = StoreReader::open(&workspace.store_path()).unwrap();
    assert!(reader.genre_names().unwrap().contains(&"Horror".to_string()));
    assert_eq!(reader.decades(None).unwrap(), vec!["1970–1979", "1990–1999"]);
}

#[test]
fn resumed_run_keeps_missing_identifier_fatal() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    workspace.write(
        "raw/genres/action.csv",
        "movie_name,year,certificate,genre\nHeat,1995,R,Crime\n",
    );
    let mut config = workspace.config();
    config.write_artifacts = true;
    let first = run_pipeline(&config, &context()).unwrap_err();
    assert!(matches!(
        first,
        PipelineError::SchemaPrecondition {
            source_name: Source::Genre,
            ..
        }
    ));
    assert!(config.artifact_path(Source::Genre).is_file());

    config.write_artifacts = false;
    config.resume = true;
    let resumed = run_pipeline(&config, &context()).unwrap_err();
    match resumed {
        PipelineError::SchemaPrecondition {
            source_name,
            column,
        } => {
            assert_eq!(source_name, Source::Genre);
            assert_eq!(column, "movie_id");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!workspace.store_path().exists());
}

#[test]
fn undecodable_cell_names_file_and_row() {
    let workspace = TestWorkspace::new();
    workspace.seed_sources();
    let path = workspace.path().join("raw/genres/action.csv");
    std::fs::write(
        &path,
        b"movie_id,movie_name,year\ntt0113277,Heat,1995\ntt0211915,Am\xe9lie,2001\n",
    )
    .unwrap();

    let err = run_pipeline(&workspace.config(), &context()).unwrap_err();
    match err {
        PipelineError::Decode {
            path: failing,
            row,
            encoding,
        } => {
            assert_eq!(failing, path);
            assert_eq!(row, 3);
            assert_eq!(encoding, "UTF-8");
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut config = workspace.config();
    config.input_encoding = Some("windows-1252".into());
    let outcome = run_pipeline(&config, &context()).expect("latin-1 input decodes");
    assert_eq!(outcome.load.movies, 2);
}
