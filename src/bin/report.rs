use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use env_logger::Env;
use perf_report::reporter::{self, Options};
use perf_report::{paths, Config, Error};

#[derive(Debug, Parser)]
#[clap(
    name = "perf-report",
    about,
    after_help = "\
Reads the newest gen/{stat,collapsed,flamegraph} artifacts below the data root and writes
<DST>/rpt/<VER>/report.html. An existing report is never overwritten; the new one goes into a
timestamp-suffixed folder instead. Only the report's absolute path is printed."
)]
struct Opt {
    // ************* //
    // *** FLAGS *** //
    // ************* //
    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (--verbose, --verbose --verbose, ...)
    #[clap(long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    // *************** //
    // *** OPTIONS *** //
    // *************** //
    /// Destination project root that receives the report
    #[clap(short = 't', long = "dst", value_name = "DIR")]
    dst: PathBuf,

    /// Release or version tag of the profiled build
    #[clap(short = 'v', long = "ver", value_name = "TAG")]
    ver: String,

    /// Report folder name [default: the version tag]
    #[clap(short = 'n', long = "report-name", value_name = "NAME")]
    report_name: Option<String>,

    /// Configuration file [default: <tool root>/cfg/default.json]
    #[clap(short = 'c', long = "cfg", alias = "config", value_name = "PATH")]
    cfg: Option<PathBuf>,

    /// Root the configured artifact directories are relative to [default: tool root]
    #[clap(short = 'd', long = "data", value_name = "DIR")]
    data: Option<PathBuf>,
}

fn main() {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(1);
        }
        Err(e) => e.exit(),
    };

    // Initialize logger
    if !opt.quiet {
        env_logger::Builder::from_env(Env::default().default_filter_or(match opt.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }))
        .format_timestamp(None)
        .init();
    }

    match run(opt) {
        Ok(report) => println!("{}", report.display()),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run(opt: Opt) -> perf_report::Result<PathBuf> {
    let root = paths::tool_root().map_err(|source| Error::Io {
        path: PathBuf::from(paths::HOME_VAR),
        source,
    })?;
    let cfg = opt
        .cfg
        .unwrap_or_else(|| root.join("cfg").join("default.json"));
    let config = Config::from_file(&cfg)?;

    let options = Options {
        data_root: opt.data.unwrap_or(root),
        dst_root: opt.dst,
        version: opt.ver,
        report_name: opt.report_name,
    };
    reporter::generate(&config, &options)
}
