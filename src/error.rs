use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use crate::artifact::ArtifactKind;

/// Convenience alias used by every fallible operation in this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while recording or reporting.
///
/// All variants except [`Error::MalformedCollapsed`] abort the current invocation.
/// Malformed collapsed-stack lines are skipped and only ever surface as warnings
/// attached to a [`Ranking`](crate::folded::Ranking).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The recorder target is missing, not a regular file, or not executable.
    #[error("invalid target {}: {reason}", path.display())]
    InvalidTarget {
        /// The path given on the command line.
        path: PathBuf,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// An artifact directory holds no file of the expected kind.
    #[error("no {kind} artifact found in {}", dir.display())]
    MissingArtifact {
        /// Which artifact was being looked for.
        kind: ArtifactKind,
        /// The directory that was searched.
        dir: PathBuf,
    },

    /// A `perf stat` file contained none of the recognized counters.
    #[error("no recognized counters in {}", path.display())]
    MalformedStat {
        /// The stat file that was parsed.
        path: PathBuf,
    },

    /// A collapsed-stack line had no parseable trailing sample count.
    #[error("line {line_no}: no sample count in {line:?}")]
    MalformedCollapsed {
        /// 1-based line number within the collapsed file.
        line_no: usize,
        /// The offending line, without its line terminator.
        line: String,
    },

    /// The configuration file is missing, unparseable or incomplete.
    #[error("configuration error in {}: {message}", path.display())]
    Config {
        /// The configuration file.
        path: PathBuf,
        /// What is wrong with it.
        message: String,
    },

    /// A report folder name that is not a single path component.
    #[error("invalid report folder name {name:?}: must be a single, non-empty path component")]
    InvalidReportName {
        /// The rejected name.
        name: String,
    },

    /// No free report folder could be found next to an existing report.
    #[error("refusing to overwrite existing report at {}", path.display())]
    OutputConflict {
        /// The last candidate path that was already taken.
        path: PathBuf,
    },

    /// An external tool could not be started or exited unsuccessfully.
    #[error("{step} step failed running `{program}`: {detail}")]
    Subprocess {
        /// The pipeline step that failed.
        step: &'static str,
        /// The program that was run.
        program: String,
        /// Exit status or spawn error.
        detail: String,
    },

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// Writing the HTML report failed.
    #[error("failed to render report: {0}")]
    Render(#[from] quick_xml::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    pub(crate) fn exited(step: &'static str, program: &str, status: ExitStatus) -> Self {
        Error::Subprocess {
            step,
            program: program.to_string(),
            detail: status.to_string(),
        }
    }

    pub(crate) fn spawn(step: &'static str, program: &str, source: io::Error) -> Self {
        Error::Subprocess {
            step,
            program: program.to_string(),
            detail: source.to_string(),
        }
    }
}
