//! Project configuration for the reporter.
//!
//! A configuration is a small JSON document naming the project and mapping the recorder's
//! artifact directories into the report:
//!
//! ```json
//! {
//!   "project_name": "ExampleProject",
//!   "title": "Nightly performance",
//!   "top_n": 10,
//!   "rank_by": "leaf",
//!   "paths": {
//!     "perf_stat": "gen/stat",
//!     "collapsed": "gen/collapsed",
//!     "flamegraph": "gen/flamegraph",
//!     "report_output": "rpt"
//!   }
//! }
//! ```
//!
//! Artifact paths in `paths` are relative to the data root, `report_output` and
//! `google_benchmark` to the destination root. Older configurations that spell the artifact
//! directories as top-level `perf_stat_path`, `collapsed_path` and `flamegraph_path` keys are
//! still accepted. Unknown keys are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::folded::{self, RankBy, DEFAULT_TOP_N};

/// Report directory, relative to the destination root, used when none is configured.
pub const DEFAULT_REPORT_OUTPUT: &str = "rpt";

/// Google Benchmark results file, relative to the destination root, used when none is
/// configured.
pub const DEFAULT_GOOGLE_BENCHMARK: &str = "benchmarks/benchmark.json";

/// A parsed and validated project configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Display name of the profiled project.
    pub project_name: String,

    /// Optional report heading; defaults to "Performance Report".
    #[serde(default)]
    pub title: Option<String>,

    /// How many functions the hot-function ranking keeps.
    #[serde(default)]
    pub top_n: Option<usize>,

    /// What the hot-function ranking is keyed on.
    #[serde(default)]
    pub rank_by: RankBy,

    #[serde(default)]
    paths: Option<Paths>,

    #[serde(default)]
    perf_stat_path: Option<PathBuf>,
    #[serde(default)]
    collapsed_path: Option<PathBuf>,
    #[serde(default)]
    flamegraph_path: Option<PathBuf>,
    #[serde(default)]
    google_benchmark_path: Option<PathBuf>,
    #[serde(default)]
    report_output: Option<PathBuf>,

    #[serde(skip)]
    source: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct Paths {
    perf_stat: PathBuf,
    collapsed: PathBuf,
    flamegraph: PathBuf,
    #[serde(default)]
    report_output: Option<PathBuf>,
    #[serde(default)]
    google_benchmark: Option<PathBuf>,
}

/// The directories the reporter reads artifacts from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ArtifactDirs {
    /// Where `perf-stat-*.txt` files live.
    pub stat: PathBuf,
    /// Where collapsed stack files live.
    pub collapsed: PathBuf,
    /// Where flamegraph SVGs live.
    pub flamegraph: PathBuf,
}

impl Config {
    /// Read and validate the configuration file at `path`.
    pub fn from_file<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::config(path, format!("cannot read file: {}", e)))?;
        Self::from_json(path, &text)
    }

    /// Parse and validate configuration text. `path` is only used in error messages.
    pub fn from_json(path: &Path, text: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(text).map_err(|e| Error::config(path, e.to_string()))?;
        config.source = path.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.project_name.trim().is_empty() {
            return Err(Error::config(&self.source, "`project_name` is empty"));
        }
        if self.paths.is_none() {
            for (key, value) in [
                ("perf_stat_path", &self.perf_stat_path),
                ("collapsed_path", &self.collapsed_path),
                ("flamegraph_path", &self.flamegraph_path),
            ] {
                if value.is_none() {
                    return Err(Error::config(
                        &self.source,
                        format!("missing field `paths` (or legacy `{}`)", key),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The file this configuration was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The heading shown at the top of the report.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Performance Report")
    }

    /// Ranking options for the hot-function chart.
    pub fn rank_options(&self) -> folded::Options {
        folded::Options {
            rank_by: self.rank_by,
            top_n: self.top_n.unwrap_or(DEFAULT_TOP_N),
        }
    }

    /// Resolve the artifact directories against `data_root`.
    pub fn artifact_dirs(&self, data_root: &Path) -> ArtifactDirs {
        match &self.paths {
            Some(p) => ArtifactDirs {
                stat: data_root.join(&p.perf_stat),
                collapsed: data_root.join(&p.collapsed),
                flamegraph: data_root.join(&p.flamegraph),
            },
            None => {
                let resolve =
                    |p: &Option<PathBuf>| data_root.join(expand_home(p.as_deref().unwrap_or(Path::new(""))));
                ArtifactDirs {
                    stat: resolve(&self.perf_stat_path),
                    collapsed: resolve(&self.collapsed_path),
                    flamegraph: resolve(&self.flamegraph_path),
                }
            }
        }
    }

    /// The directory under `dst_root` that versioned report folders are created in.
    pub fn report_root(&self, dst_root: &Path) -> PathBuf {
        let configured = self
            .paths
            .as_ref()
            .and_then(|p| p.report_output.as_ref())
            .or(self.report_output.as_ref());
        match configured {
            Some(dir) => dst_root.join(dir),
            None => dst_root.join(DEFAULT_REPORT_OUTPUT),
        }
    }

    /// Where Google Benchmark results are looked for.
    pub fn benchmark_path(&self, dst_root: &Path) -> PathBuf {
        let configured = self
            .paths
            .as_ref()
            .and_then(|p| p.google_benchmark.as_ref())
            .or(self.google_benchmark_path.as_ref());
        match configured {
            Some(file) => dst_root.join(expand_home(file)),
            None => dst_root.join(DEFAULT_GOOGLE_BENCHMARK),
        }
    }
}

// `~/x` -> `$HOME/x`. Joining an absolute path onto a root yields the absolute path.
fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}
