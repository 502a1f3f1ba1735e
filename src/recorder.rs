use std::env;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::{self, File};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::artifact::{self, ArtifactKind};
use crate::error::{Error, Result};
use crate::paths;
use crate::stat::Counter;

/// Sampling frequency passed to `perf record`, in Hz.
pub const DEFAULT_FREQUENCY: u32 = 99;

/// The external programs the recorder drives.
#[derive(Debug, Clone)]
pub struct Tools {
    /// `perf`, used for `record`, `script` and `stat`.
    pub perf: OsString,
    /// Turns `perf script` output into folded stacks.
    pub collapse: OsString,
    /// Turns folded stacks into an SVG.
    pub flamegraph: OsString,
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            perf: "perf".into(),
            collapse: "inferno-collapse-perf".into(),
            flamegraph: "inferno-flamegraph".into(),
        }
    }
}

impl Tools {
    /// The default tools, each overridable through `PERF`, `INFERNO_COLLAPSE_PERF` and
    /// `INFERNO_FLAMEGRAPH`.
    pub fn from_env() -> Self {
        let defaults = Tools::default();
        Tools {
            perf: env::var_os("PERF").unwrap_or(defaults.perf),
            collapse: env::var_os("INFERNO_COLLAPSE_PERF").unwrap_or(defaults.collapse),
            flamegraph: env::var_os("INFERNO_FLAMEGRAPH").unwrap_or(defaults.flamegraph),
        }
    }
}

/// Configure a [`Recorder`].
#[derive(Debug, Clone)]
pub struct Options {
    /// Root under which `gen/{perfdata,collapsed,flamegraph,stat}` are created.
    pub root: PathBuf,

    /// `perf record` sampling frequency.
    ///
    /// [Default value](DEFAULT_FREQUENCY).
    pub frequency: u32,

    /// External programs to run.
    pub tools: Tools,
}

impl Options {
    /// Options recording under `root` with the default frequency and tools from the
    /// environment.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Options {
            root: root.into(),
            frequency: DEFAULT_FREQUENCY,
            tools: Tools::from_env(),
        }
    }
}

/// One stage of a recording. Stages run in [`Step::PIPELINE`] order.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Step {
    /// `perf record` with call graphs.
    Record,
    /// `perf script | inferno-collapse-perf`.
    Collapse,
    /// `inferno-flamegraph`.
    Flamegraph,
    /// `perf stat` for the hardware counters; a separate run of the target.
    Stat,
}

impl Step {
    /// All steps, in execution order.
    pub const PIPELINE: [Step; 4] = [Step::Record, Step::Collapse, Step::Flamegraph, Step::Stat];

    /// The artifact this step reads, if it reads one.
    pub fn input(self) -> Option<ArtifactKind> {
        match self {
            Step::Record | Step::Stat => None,
            Step::Collapse => Some(ArtifactKind::PerfData),
            Step::Flamegraph => Some(ArtifactKind::Collapsed),
        }
    }

    /// The artifact this step writes.
    pub fn output(self) -> ArtifactKind {
        match self {
            Step::Record => ArtifactKind::PerfData,
            Step::Collapse => ArtifactKind::Collapsed,
            Step::Flamegraph => ArtifactKind::Flamegraph,
            Step::Stat => ArtifactKind::Stat,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Step::Record => "record",
            Step::Collapse => "collapse",
            Step::Flamegraph => "flamegraph",
            Step::Stat => "stat",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The four files of one recording, all sharing one timestamp.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Recording {
    /// The shared timestamp.
    pub stamp: String,
    /// Raw samples.
    pub perf_data: PathBuf,
    /// Folded stacks.
    pub collapsed: PathBuf,
    /// Flamegraph SVG.
    pub flamegraph: PathBuf,
    /// Counter output.
    pub stat: PathBuf,
}

impl Recording {
    /// The artifact paths for a recording under `root` made at `stamp`.
    pub fn new(root: &Path, stamp: &str) -> Self {
        let path = |kind: ArtifactKind| artifact::artifact_dir(root, kind).join(kind.file_name(stamp));
        Recording {
            stamp: stamp.to_string(),
            perf_data: path(ArtifactKind::PerfData),
            collapsed: path(ArtifactKind::Collapsed),
            flamegraph: path(ArtifactKind::Flamegraph),
            stat: path(ArtifactKind::Stat),
        }
    }

    /// The path of the given artifact.
    pub fn path(&self, kind: ArtifactKind) -> &Path {
        match kind {
            ArtifactKind::PerfData => &self.perf_data,
            ArtifactKind::Collapsed => &self.collapsed,
            ArtifactKind::Flamegraph => &self.flamegraph,
            ArtifactKind::Stat => &self.stat,
        }
    }
}

/// Check that `path` is an executable regular file and return its absolute path.
pub fn validate_target(path: &Path) -> Result<PathBuf> {
    let invalid = |reason| Error::InvalidTarget {
        path: path.to_path_buf(),
        reason,
    };
    let meta = fs::metadata(path).map_err(|_| invalid("no such file"))?;
    if !meta.is_file() {
        return Err(invalid("not a regular file"));
    }
    if meta.permissions().mode() & 0o111 == 0 {
        return Err(invalid("not executable"));
    }
    paths::absolute(path).map_err(|e| Error::io(path, e))
}

/// Records profiles of a target binary.
#[derive(Debug, Clone)]
pub struct Recorder {
    opt: Options,
}

impl From<Options> for Recorder {
    fn from(opt: Options) -> Self {
        Recorder { opt }
    }
}

impl Recorder {
    /// Profile `target` (run with `args`) and write the four artifacts of one recording.
    ///
    /// The target is validated before anything else happens. Steps run in order and the
    /// first failure stops the recording; files already written are left in place.
    pub fn record(&self, target: &Path, args: &[OsString]) -> Result<Recording> {
        let target = validate_target(target)?;

        for kind in ArtifactKind::ALL {
            let dir = artifact::artifact_dir(&self.opt.root, kind);
            fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        }

        let recording = Recording::new(&self.opt.root, &artifact::timestamp_now());
        for step in Step::PIPELINE {
            match step.input() {
                Some(input) => info!(
                    "Running {} step: {} -> {}",
                    step,
                    recording.path(input).display(),
                    recording.path(step.output()).display()
                ),
                None => info!(
                    "Running {} step -> {}",
                    step,
                    recording.path(step.output()).display()
                ),
            }
            self.run_step(step, &target, args, &recording)?;
        }
        Ok(recording)
    }

    /// The command `step` starts. For [`Step::Collapse`] this is the `perf script` half of the
    /// pipe.
    pub fn command(&self, step: Step, target: &Path, args: &[OsString], rec: &Recording) -> Command {
        let tools = &self.opt.tools;
        match step {
            Step::Record => {
                let mut c = Command::new(&tools.perf);
                c.arg("record")
                    .arg("-F")
                    .arg(self.opt.frequency.to_string())
                    .arg("-g")
                    .arg("-o")
                    .arg(&rec.perf_data)
                    .arg("--")
                    .arg(target)
                    .args(args);
                c
            }
            Step::Collapse => {
                let mut c = Command::new(&tools.perf);
                c.arg("script").arg("-i").arg(&rec.perf_data);
                c
            }
            Step::Flamegraph => {
                let mut c = Command::new(&tools.flamegraph);
                c.arg(&rec.collapsed);
                c
            }
            Step::Stat => {
                let events: Vec<&str> = Counter::ALL.iter().map(|c| c.name()).collect();
                let mut c = Command::new(&tools.perf);
                // keep counts parseable whatever the user's LC_NUMERIC is
                c.env("LC_ALL", "C")
                    .arg("stat")
                    .arg("-e")
                    .arg(events.join(","))
                    .arg("-o")
                    .arg(&rec.stat)
                    .arg("--")
                    .arg(target)
                    .args(args);
                c
            }
        }
    }

    fn run_step(&self, step: Step, target: &Path, args: &[OsString], rec: &Recording) -> Result<()> {
        let mut command = self.command(step, target, args, rec);
        match step {
            Step::Record | Step::Stat => run(step, &mut command),
            Step::Flamegraph => {
                command.stdout(create(&rec.flamegraph)?);
                run(step, &mut command)
            }
            Step::Collapse => {
                let program = self.opt.tools.perf.clone();
                let collapsed = create(&rec.collapsed)?;
                let mut script = command
                    .stdout(Stdio::piped())
                    .spawn()
                    .map_err(|e| Error::spawn(step.name(), &display(&program), e))?;
                let stdin = match script.stdout.take() {
                    Some(stdout) => Stdio::from(stdout),
                    None => Stdio::null(),
                };

                let mut collapse = Command::new(&self.opt.tools.collapse);
                collapse.stdin(stdin).stdout(collapsed);
                let collapsed = run(step, &mut collapse);

                let status = script
                    .wait()
                    .map_err(|e| Error::spawn(step.name(), &display(&program), e))?;
                if !status.success() {
                    return Err(Error::exited(step.name(), &display(&program), status));
                }
                collapsed
            }
        }
    }
}

fn run(step: Step, command: &mut Command) -> Result<()> {
    let program = display(command.get_program());
    debug!("Running {:?}", command);
    let status = command
        .status()
        .map_err(|e| Error::spawn(step.name(), &program, e))?;
    if !status.success() {
        return Err(Error::exited(step.name(), &program, status));
    }
    Ok(())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| Error::io(path, e))
}

fn display(program: &OsStr) -> String {
    program.to_string_lossy().into_owned()
}
