//! perf-report records [`perf`] profiles of a native binary and turns the newest recording into
//! a static HTML report. It is project-agnostic: a small JSON configuration maps a project's
//! artifact directories into the report.
//!
//! The crate has two independent pipelines, each available as a library entry point and as a
//! binary.
//!
//! # Recording
//!
//! The recorder runs the target under `perf record` with call graphs, collapses the samples
//! with [`inferno-collapse-perf`], renders them with `inferno-flamegraph`, and then runs the
//! target a second time under `perf stat` to count cache and branch events. Each recording
//! produces four files sharing one timestamp:
//!
//! ```text
//! gen/perfdata/perf-20261019-101500.data
//! gen/collapsed/collapsed-20261019-101500.txt
//! gen/flamegraph/flamegraph-20261019-101500.svg
//! gen/stat/perf-stat-20261019-101500.txt
//! ```
//!
//! ```console
//! $ perf-report-record target/release/mybin
//! ```
//!
//! The `perf`, `inferno-collapse-perf` and `inferno-flamegraph` programs can be overridden with
//! the `PERF`, `INFERNO_COLLAPSE_PERF` and `INFERNO_FLAMEGRAPH` environment variables.
//!
//! # Reporting
//!
//! The reporter picks the newest stat, collapsed stack and flamegraph files (by the timestamp
//! in their names), ranks the hottest functions, and writes a self-contained HTML file with
//! bar charts for the counters and the hot functions plus a link to the flamegraph:
//!
//! ```console
//! $ perf-report --dst ~/src/myproject --ver v1.2.0
//! /home/me/src/myproject/rpt/v1.2.0/report.html
//! ```
//!
//! Reports are never overwritten. If `rpt/v1.2.0/report.html` already exists the new report
//! goes into a timestamp-suffixed folder next to it.
//!
//! See [`config`] for the configuration format.
//!
//!   [`perf`]: https://perf.wiki.kernel.org/index.php/Main_Page
//!   [`inferno-collapse-perf`]: https://github.com/jonhoo/inferno

#![deny(missing_docs)]

#[macro_use]
extern crate log;

/// Locating recorder output by kind and timestamp.
pub mod artifact;

/// Parsing Google Benchmark JSON results.
pub mod benchmark;

/// Horizontal bar charts as inline SVG.
pub mod chart;

pub mod config;

mod error;

/// Parsing and ranking folded stack files.
pub mod folded;

/// Path helpers.
pub mod paths;

/// Running a target under `perf` and producing one recording.
pub mod recorder;

/// Rendering the HTML report.
pub mod report;

/// Turning the newest recording into a report on disk.
pub mod reporter;

/// Parsing `perf stat` output.
pub mod stat;

pub use config::Config;
pub use error::{Error, Result};
