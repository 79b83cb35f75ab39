//! YAML pipeline configuration.
//!
//! Every field is optional in the file; missing fields fall back to the
//! default data layout. Command-line flags are applied on top with
//! [`PipelineConfig::apply_overrides`].

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{cli::PipelineArgs, records::Source};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub metadata_dir: PathBuf,
    pub genres_dir: PathBuf,
    pub budgets_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub store_path: PathBuf,
    pub input_encoding: Option<String>,
    pub write_artifacts: bool,
    pub resume: bool,
    pub rebuild: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metadata_dir: PathBuf::from("data/raw/tmdb_movies"),
            genres_dir: PathBuf::from("data/raw/genres"),
            budgets_dir: PathBuf::from("data/raw/budgets"),
            processed_dir: PathBuf::from("data/processed"),
            store_path: PathBuf::from("data/moviz.sqlite"),
            input_encoding: None,
            write_artifacts: false,
            resume: false,
            rebuild: false,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading pipeline configuration {path:?}"))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing pipeline configuration {path:?}"))
    }

    /// Loads `path` when given, otherwise the defaults, then applies flags.
    pub fn resolve(args: &PipelineArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &PipelineArgs) {
        if let Some(dir) = &args.metadata_dir {
            self.metadata_dir = dir.clone();
        }
        if let Some(dir) = &args.genres_dir {
            self.genres_dir = dir.clone();
        }
        if let Some(dir) = &args.budgets_dir {
            self.budgets_dir = dir.clone();
        }
        if let Some(dir) = &args.processed_dir {
            self.processed_dir = dir.clone();
        }
        if let Some(path) = &args.store {
            self.store_path = path.clone();
        }
        if args.input_encoding.is_some() {
            self.input_encoding = args.input_encoding.clone();
        }
    }

    pub fn source_dir(&self, source: Source) -> &Path {
        match source {
            Source::Metadata => &self.metadata_dir,
            Source::Genre => &self.genres_dir,
            Source::Budget => &self.budgets_dir,
        }
    }

    pub fn artifact_path(&self, source: Source) -> PathBuf {
        self.processed_dir.join(source.artifact_name())
    }
}
