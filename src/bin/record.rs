use std::ffi::OsString;
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, CommandFactory, Parser};
use env_logger::Env;
use perf_report::paths;
use perf_report::recorder::{Options, Recorder, DEFAULT_FREQUENCY};
use perf_report::Error;

#[derive(Debug, Parser)]
#[clap(
    name = "perf-report-record",
    about,
    after_help = "\
Writes gen/{perfdata,collapsed,flamegraph,stat}/ under $PERF_REPORT_HOME (or the current
directory). Set PERF, INFERNO_COLLAPSE_PERF or INFERNO_FLAMEGRAPH to use other binaries."
)]
struct Opt {
    // ************* //
    // *** FLAGS *** //
    // ************* //
    /// Silence all log output
    #[clap(short = 'q', long = "quiet")]
    quiet: bool,

    /// Verbose logging mode (-v, -vv, -vvv)
    #[clap(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    // *************** //
    // *** OPTIONS *** //
    // *************** //
    /// Sampling frequency for perf record
    #[clap(short = 'F', long = "freq", default_value_t = DEFAULT_FREQUENCY, value_name = "HZ")]
    frequency: u32,

    // ************ //
    // *** ARGS *** //
    // ************ //
    /// Executable to profile
    #[clap(value_name = "BINARY")]
    target: PathBuf,

    /// Arguments passed on to the executable
    #[clap(value_name = "ARGS", last = true)]
    args: Vec<OsString>,
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

    let root = match paths::tool_root() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("error: cannot determine tool root: {}", e);
            process::exit(1);
        }
    };

    let mut options = Options::new(root);
    options.frequency = opt.frequency;
    match Recorder::from(options).record(&opt.target, &opt.args) {
        Ok(recording) => {
            println!("Flamegraph: {}", recording.flamegraph.display());
            println!("Counters:   {}", recording.stat.display());
        }
        Err(e) => {
            eprintln!("error: {}", e);
            if let Error::InvalidTarget { .. } = e {
                eprintln!("\n{}", Opt::command().render_usage());
            }
            process::exit(1);
        }
    }
}
