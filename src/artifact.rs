use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};

use crate::error::{Error, Result};

/// Directory, relative to the tool root, that holds everything the recorder produces.
pub const GEN_DIR: &str = "gen";

/// `strftime` format of the timestamp embedded in every artifact filename.
///
/// The format sorts lexicographically in chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
const TIMESTAMP_LEN: usize = 15;

/// The four kinds of files a recording produces.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ArtifactKind {
    /// Raw `perf record` samples.
    PerfData,
    /// Folded stacks produced by `inferno-collapse-perf`.
    Collapsed,
    /// SVG produced by `inferno-flamegraph`.
    Flamegraph,
    /// Counter output of `perf stat`.
    Stat,
}

impl ArtifactKind {
    /// Every kind, in the order the recorder produces them.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::PerfData,
        ArtifactKind::Collapsed,
        ArtifactKind::Flamegraph,
        ArtifactKind::Stat,
    ];

    /// Name of the subdirectory of [`GEN_DIR`] this kind lives in.
    pub fn subdir(self) -> &'static str {
        match self {
            ArtifactKind::PerfData => "perfdata",
            ArtifactKind::Collapsed => "collapsed",
            ArtifactKind::Flamegraph => "flamegraph",
            ArtifactKind::Stat => "stat",
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            ArtifactKind::PerfData => "perf-",
            ArtifactKind::Collapsed => "collapsed-",
            ArtifactKind::Flamegraph => "flamegraph-",
            ArtifactKind::Stat => "perf-stat-",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            ArtifactKind::PerfData => "data",
            ArtifactKind::Collapsed | ArtifactKind::Stat => "txt",
            ArtifactKind::Flamegraph => "svg",
        }
    }

    /// The filename a recording made at `stamp` uses for this kind.
    pub fn file_name(self, stamp: &str) -> String {
        format!("{}{}.{}", self.prefix(), stamp, self.extension())
    }

    /// Whether `name` looks like an artifact of this kind.
    ///
    /// Stat files must carry the `perf-stat-` prefix; the other kinds only need the right
    /// extension so hand-made collapsed files and SVGs are picked up too.
    pub fn matches(self, name: &str) -> bool {
        let ext_ok = Path::new(name)
            .extension()
            .map_or(false, |ext| ext == self.extension());
        match self {
            ArtifactKind::Stat => ext_ok && name.starts_with(self.prefix()),
            _ => ext_ok,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::PerfData => "perf data",
            ArtifactKind::Collapsed => "collapsed stack",
            ArtifactKind::Flamegraph => "flamegraph",
            ArtifactKind::Stat => "perf stat",
        };
        f.write_str(name)
    }
}

/// The directory `root/gen/<subdir>` for the given kind.
pub fn artifact_dir(root: &Path, kind: ArtifactKind) -> PathBuf {
    root.join(GEN_DIR).join(kind.subdir())
}

/// The current local time, formatted with [`TIMESTAMP_FORMAT`].
pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Extract the timestamp embedded at the end of a filename's stem, if any.
pub fn embedded_timestamp(name: &str) -> Option<NaiveDateTime> {
    let stem = Path::new(name).file_stem()?.to_str()?;
    let start = stem.len().checked_sub(TIMESTAMP_LEN)?;
    let suffix = stem.get(start..)?;
    NaiveDateTime::parse_from_str(suffix, TIMESTAMP_FORMAT).ok()
}

/// Find the newest artifact of `kind` in `dir`.
///
/// Files are ordered by the timestamp embedded in their name, then by name. Files without a
/// timestamp sort before every timestamped file. Modification times are never consulted.
pub fn latest(kind: ArtifactKind, dir: &Path) -> Result<PathBuf> {
    let missing = || Error::MissingArtifact {
        kind,
        dir: dir.to_path_buf(),
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot read {}: {}", dir.display(), e);
            return Err(missing());
        }
    };

    let mut newest: Option<(Option<NaiveDateTime>, String)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(_) => continue,
        };
        if !kind.matches(&name) || !entry.path().is_file() {
            continue;
        }
        let key = (embedded_timestamp(&name), name);
        if newest.as_ref().map_or(true, |best| key > *best) {
            newest = Some(key);
        }
    }

    let (_, name) = newest.ok_or_else(missing)?;
    trace!("Selected {} as newest {} artifact", name, kind);
    Ok(dir.join(name))
}
