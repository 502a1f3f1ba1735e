use std::fmt;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use std::str::FromStr;

use crate::error::{Error, Result};

const READER_CAPACITY: usize = 128 * 1024;

/// The hardware counters the recorder asks `perf stat` for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Counter {
    /// `cache-references`
    CacheReferences,
    /// `cache-misses`
    CacheMisses,
    /// `branches`
    Branches,
    /// `branch-misses`
    BranchMisses,
}

impl Counter {
    /// All counters, in the order they are reported.
    pub const ALL: [Counter; 4] = [
        Counter::CacheReferences,
        Counter::CacheMisses,
        Counter::Branches,
        Counter::BranchMisses,
    ];

    /// The event name `perf` uses for this counter.
    pub fn name(self) -> &'static str {
        match self {
            Counter::CacheReferences => "cache-references",
            Counter::CacheMisses => "cache-misses",
            Counter::Branches => "branches",
            Counter::BranchMisses => "branch-misses",
        }
    }

    // The counter a miss counter is a fraction of.
    fn base(self) -> Option<Counter> {
        match self {
            Counter::CacheMisses => Some(Counter::CacheReferences),
            Counter::BranchMisses => Some(Counter::Branches),
            _ => None,
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Counter {
    type Err = String;

    /// Accepts bare event names as well as perf's decorated spellings, such as
    /// `cache-misses:u` or `cpu_core/cache-misses/`.
    fn from_str(event: &str) -> Result<Self, Self::Err> {
        let mut name = event;
        if let Some(inner) = name.split('/').nth(1) {
            if !inner.is_empty() {
                name = inner;
            }
        }
        let name = name.split(':').next().unwrap_or(name);
        Counter::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| format!("unrecognized counter: {}", event))
    }
}

/// One counter value from a `perf stat` run.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSample {
    /// Which counter this is.
    pub counter: Counter,
    /// The counted events.
    pub value: u64,
    /// For miss counters, the miss rate in percent.
    pub percentage: Option<f64>,
}

/// Parse `perf stat` output.
///
/// Each counter line has the form `<value> <event> [# <annotation>]`, with the value possibly
/// containing thousands separators (`,`, `.` or `'`, depending on the locale perf ran in).
/// Headers, blank lines, `<not counted>` entries and events other than the four recognized
/// counters are ignored. A counter reported on several lines (hybrid CPUs report one line per
/// PMU) is summed. Invalid UTF-8 never fails the parse; such bytes are replaced.
///
/// Samples are returned in [`Counter::ALL`] order. The result is empty if no recognized counter
/// was found.
pub fn from_reader<R>(mut reader: R) -> io::Result<Vec<CounterSample>>
where
    R: BufRead,
{
    let mut samples: Vec<CounterSample> = Vec::with_capacity(Counter::ALL.len());
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);

        let (counter, value, percentage) = match parse_line(&line) {
            Some(parsed) => parsed,
            None => continue,
        };
        match samples.iter_mut().find(|s| s.counter == counter) {
            Some(existing) => {
                existing.value = existing.value.saturating_add(value);
                existing.percentage = None;
            }
            None => samples.push(CounterSample {
                counter,
                value,
                percentage,
            }),
        }
    }

    samples.sort_by_key(|s| s.counter);
    derive_ratios(&mut samples);
    Ok(samples)
}

/// Parse the `perf stat` output in `path`.
///
/// Fails with [`Error::MalformedStat`] if none of the recognized counters is present.
pub fn from_file<P>(path: P) -> Result<Vec<CounterSample>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = io::BufReader::with_capacity(READER_CAPACITY, file);
    let samples = from_reader(reader).map_err(|e| Error::io(path, e))?;
    if samples.is_empty() {
        return Err(Error::MalformedStat {
            path: path.to_path_buf(),
        });
    }
    debug!("Parsed {} counters from {}", samples.len(), path.display());
    Ok(samples)
}

fn parse_line(line: &str) -> Option<(Counter, u64, Option<f64>)> {
    let mut fields = line.split_whitespace();
    let value = fields.next()?;
    let event = fields.next()?;

    // perf groups digits per LC_NUMERIC: `1,234`, `1.234` or `1'234`
    let digits: String = value
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | '\''))
        .collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = digits.parse::<u64>().ok()?;
    let counter = event.parse::<Counter>().ok()?;
    Some((counter, value, parse_percentage(line)))
}

// Pull the number out of an annotation like `#   10.00 % of all cache refs`.
fn parse_percentage(line: &str) -> Option<f64> {
    let annotation = line[line.find('#')? + 1..].trim_start();
    let end = annotation
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(annotation.len());
    let (number, rest) = annotation.split_at(end);
    if !rest.trim_start().starts_with('%') {
        return None;
    }
    number.parse().ok()
}

fn derive_ratios(samples: &mut [CounterSample]) {
    for i in 0..samples.len() {
        if samples[i].percentage.is_some() {
            continue;
        }
        let base = match samples[i].counter.base() {
            Some(base) => base,
            None => continue,
        };
        let total = samples
            .iter()
            .find(|s| s.counter == base)
            .map_or(0, |s| s.value);
        if total > 0 {
            samples[i].percentage = Some(samples[i].value as f64 * 100.0 / total as f64);
        }
    }
}
