use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use chrono::Local;

use crate::artifact::{self, ArtifactKind};
use crate::benchmark;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::folded;
use crate::paths;
use crate::report::{self, ReportContext};
use crate::stat;

/// Name of the file written into each report folder.
pub const REPORT_FILE: &str = "report.html";

const MAX_SUFFIX_ATTEMPTS: usize = 100;

/// Where the reporter reads from and writes to.
#[derive(Debug, Clone)]
pub struct Options {
    /// Root that the configured artifact directories are relative to.
    pub data_root: PathBuf,
    /// Project root that receives `<report_output>/<folder>/report.html`.
    pub dst_root: PathBuf,
    /// Release or version tag shown in the report.
    pub version: String,
    /// Report folder name; defaults to `version`.
    pub report_name: Option<String>,
}

impl Options {
    fn folder_name(&self) -> &str {
        self.report_name.as_deref().unwrap_or(&self.version)
    }
}

/// Generate an HTML report from the newest recorded artifacts.
///
/// The newest stat, collapsed stack and flamegraph files are located before anything is
/// parsed or written, so a missing artifact never leaves a partial report behind. An existing
/// report is never overwritten: the report folder gets a timestamp suffix instead.
///
/// Returns the absolute path of the written report.
pub fn generate(config: &Config, opt: &Options) -> Result<PathBuf> {
    let folder = opt.folder_name();
    check_folder_name(folder)?;

    let data_root = paths::absolute(&opt.data_root).map_err(|e| Error::io(&opt.data_root, e))?;
    let dst_root = paths::absolute(&opt.dst_root).map_err(|e| Error::io(&opt.dst_root, e))?;
    let dirs = config.artifact_dirs(&data_root);

    let stat_file = artifact::latest(ArtifactKind::Stat, &dirs.stat)?;
    let collapsed_file = artifact::latest(ArtifactKind::Collapsed, &dirs.collapsed)?;
    let flamegraph_file = artifact::latest(ArtifactKind::Flamegraph, &dirs.flamegraph)?;
    info!(
        "Using {}, {} and {}",
        stat_file.display(),
        collapsed_file.display(),
        flamegraph_file.display()
    );

    let counters = stat::from_file(&stat_file)?;
    let ranking = folded::from_file(&config.rank_options(), &collapsed_file)?;
    let benchmarks = benchmark::load(&config.benchmark_path(&dst_root));

    let report_root = config.report_root(&dst_root);
    let report_dir = free_report_dir(&report_root, folder)?;
    fs::create_dir_all(&report_dir).map_err(|e| Error::io(&report_dir, e))?;

    let ctx = ReportContext {
        project_name: config.project_name.clone(),
        title: config.title().to_string(),
        version: opt.version.clone(),
        generated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        flamegraph_link: link(&paths::relative(&flamegraph_file, &report_dir)),
        stat_file,
        collapsed_file,
        counters,
        ranking,
        rank_by: config.rank_by,
        benchmarks,
    };

    let report_path = report_dir.join(REPORT_FILE);
    write_report(&ctx, &report_path)?;
    info!("Report written to {}", report_path.display());
    Ok(report_path)
}

/// The folder under `report_root` the next report named `name` goes into.
///
/// That is `report_root/name` unless it already holds a report, in which case a
/// `_<timestamp>` suffix (and, if needed, a `-<n>` counter) is appended.
pub fn free_report_dir(report_root: &Path, name: &str) -> Result<PathBuf> {
    let candidate = report_root.join(name);
    if !candidate.join(REPORT_FILE).exists() {
        return Ok(candidate);
    }

    let stamped = format!("{}_{}", name, artifact::timestamp_now());
    let mut candidate = report_root.join(&stamped);
    let mut attempt = 1;
    while candidate.join(REPORT_FILE).exists() {
        if attempt == MAX_SUFFIX_ATTEMPTS {
            return Err(Error::OutputConflict {
                path: candidate.join(REPORT_FILE),
            });
        }
        attempt += 1;
        candidate = report_root.join(format!("{}-{}", stamped, attempt));
    }
    info!(
        "A report for {} already exists, writing to {} instead",
        name,
        candidate.display()
    );
    Ok(candidate)
}

fn check_folder_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::InvalidReportName {
            name: name.to_string(),
        }),
    }
}

// HTML links always use forward slashes.
fn link(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn write_report(ctx: &ReportContext, path: &Path) -> Result<()> {
    write_new(path, |writer| Ok(report::render(ctx, writer)?))
}

// Creates `path`, which must not exist yet, and removes it again if `write` fails so a failed
// run never claims the report folder.
fn write_new<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::OutputConflict {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(Error::io(path, e)),
    };
    let mut writer = BufWriter::new(file);
    let written = write(&mut writer).and_then(|()| writer.flush().map_err(|e| Error::io(path, e)));
    if written.is_err() {
        drop(writer);
        if let Err(e) = fs::remove_file(path) {
            warn!("Cannot remove incomplete report {}: {}", path.display(), e);
        }
    }
    written
}
