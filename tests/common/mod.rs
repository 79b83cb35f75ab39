#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use moviz::config::PipelineConfig;
use tempfile::{TempDir, tempdir};

pub const METADATA_CSV: &str = "\
id,title,release_date,status,runtime,revenue,budget,adult,imdb_id,genres,vote_average,vote_count,overview,production_countries,poster_path
1,Heat,1995-12-15,Released,170,187436818,60000000,False,tt0113277,\"Action, Crime, Drama\",7.9,6000,A group of thieves,United States of America,/heat.jpg
2,Toy Story,1995-10-30,Released,81,373554033,30000000,False,tt0114709,\"Animation, Comedy, Family\",7.9,17000,Toys come alive,United States of America,/toy.jpg
3,Unreleased,2020-01-01,Rumored,0,0,0,False,tt9999999,Drama,0,0,,,
4,HEAT,1995-12-15,Released,170,0,0,False,tt0113277,Crime,1.0,1,duplicate,,
";

pub const GENRES_CSV: &str = "\
movie_id,movie_name,year,certificate,runtime,genre,rating,description,director,director_id,star,star_id,votes,gross(in $)
tt0113277,Heat,1995,R,170 min,\"Action, Crime, Drama\",8.3,Cops and robbers,Michael Mann,/name/nm0000520/,\"['Al Pacino', 'Robert De Niro']\",/name/nm0000199/,600000,67436818
tt1375666,Inception,2010,PG-13,148 min,\"Action, Adventure, Sci-Fi\",8.8,Dream heist,Christopher Nolan,/name/nm0634240/,\"['Leonardo DiCaprio']\",/name/nm0000138/,2400000,292576195
tt0000007,Kid Film,2001,7,90 min,Family,6.0,For kids,Someone,/name/nm1/,\"['Somebody']\",/name/nm2/,100,
";

pub const BUDGETS_CSV: &str = "\
Index,Release Date,Movie,Production Budget,Domestic Gross,Worldwide Gross
1,\"Dec 15, 1995\",Heat,\"$60,000,000\",\"$67,436,818\",\"$187,436,818\"
2,\"Nov 22, 1995\",Toy Story,\"$30,000,000\",\"$191,796,233\",\"$373,554,033\"
3,\"Jul 16, 2010\",Inception,\"$160,000,000\",\"$292,576,195\",\"$836,836,967\"
4,\"Jun 1, 2024\",Later,\"$1,000\",$0,$0
5,\"Jan 1, 2001\",Unknown Film,\"$5,000\",$0,$0
";

/// Processing date that makes the 2024 budget row a future release.
pub const TODAY: &str = "2024-01-01";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` under the workspace, creating parent folders.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    /// Lays out the three raw source folders with the sample datasets.
    pub fn seed_sources(&self) {
        self.write("raw/tmdb_movies/part1.csv", METADATA_CSV);
        self.write("raw/genres/action.csv", GENRES_CSV);
        self.write("raw/budgets/numbers.csv", BUDGETS_CSV);
    }

    pub fn store_path(&self) -> PathBuf {
        self.path().join("moviz.sqlite")
    }

    /// Configuration pointing every folder into this workspace.
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            metadata_dir: self.path().join("raw/tmdb_movies"),
            genres_dir: self.path().join("raw/genres"),
            budgets_dir: self.path().join("raw/budgets"),
            processed_dir: self.path().join("processed"),
            store_path: self.store_path(),
            ..PipelineConfig::default()
        }
    }

    /// The folder flags matching [`TestWorkspace::config`], for CLI runs.
    pub fn pipeline_flags(&self) -> Vec<String> {
        let config = self.config();
        vec![
            "--metadata-dir".into(),
            path_arg(&config.metadata_dir),
            "--genres-dir".into(),
            path_arg(&config.genres_dir),
            "--budgets-dir".into(),
            path_arg(&config.budgets_dir),
            "--processed-dir".into(),
            path_arg(&config.processed_dir),
            "--store".into(),
            path_arg(&config.store_path),
            "--today".into(),
            TODAY.into(),
        ]
    }
}

pub fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
