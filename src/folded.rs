use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};

const READER_CAPACITY: usize = 128 * 1024;

/// Number of functions kept in a ranking unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 10;

/// What a folded stack line is credited to when ranking.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// The innermost frame of the stack, i.e. where the samples actually landed.
    #[default]
    Leaf,
    /// The whole folded stack, so each distinct call path is ranked separately.
    Stack,
    /// Every distinct frame on the stack. A function is credited with all samples taken while
    /// it was anywhere on the stack.
    Inclusive,
}

/// Configure how collapsed stacks are ranked.
#[derive(Debug, Clone)]
pub struct Options {
    /// Ranking key.
    ///
    /// [Default value](RankBy::Leaf).
    pub rank_by: RankBy,

    /// Number of entries to keep.
    ///
    /// [Default value](DEFAULT_TOP_N).
    pub top_n: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rank_by: RankBy::default(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// A ranked function (or stack, depending on [`RankBy`]) and its summed sample count.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TopFunction {
    /// Frame name or folded stack.
    pub name: String,
    /// Total samples credited to `name`.
    pub samples: u64,
}

/// A collapsed-stack line that was skipped because it had no sample count.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MalformedLine {
    /// 1-based line number.
    pub line_no: usize,
    /// The line, without trailing whitespace.
    pub line: String,
}

/// The result of ranking a collapsed-stack file.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Ranking {
    /// The top entries, by descending sample count. Ties keep the order in which the entries
    /// first appeared in the input.
    pub functions: Vec<TopFunction>,
    /// Sum of the counts of every valid line.
    pub total_samples: u64,
    /// Lines that were skipped.
    pub skipped: Vec<MalformedLine>,
}

/// Split a folded stack line into the stack and its sample count.
///
/// The count is whatever follows the last run of whitespace; `None` is returned if it is not
/// an integer or if the stack before it is empty.
pub fn parse_line(line: &str) -> Option<(&str, u64)> {
    let (stack, count) = line.trim_end().rsplit_once(char::is_whitespace)?;
    let count = count.parse::<u64>().ok()?;
    let stack = stack.trim_end();
    if stack.is_empty() {
        return None;
    }
    Some((stack, count))
}

/// Rank the folded stack lines read from `reader`.
///
/// Lines without a parseable trailing count are logged, recorded in [`Ranking::skipped`] and
/// otherwise ignored. Blank lines are ignored silently. Invalid UTF-8 is replaced with
/// `U+FFFD` rather than failing the whole file.
pub fn from_reader<R>(opt: &Options, mut reader: R) -> io::Result<Ranking>
where
    R: BufRead,
{
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    let mut ranking = Ranking::default();
    let mut buf = Vec::new();
    let mut line_no = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;

        // mangled symbols are not always valid UTF-8
        let line = String::from_utf8_lossy(&buf);

        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }

        let (stack, count) = match parse_line(trimmed) {
            Some(parsed) => parsed,
            None => {
                let err = Error::MalformedCollapsed {
                    line_no,
                    line: trimmed.to_string(),
                };
                warn!("Skipping collapsed stack {}", err);
                ranking.skipped.push(MalformedLine {
                    line_no,
                    line: trimmed.to_string(),
                });
                continue;
            }
        };

        ranking.total_samples = ranking.total_samples.saturating_add(count);
        match opt.rank_by {
            RankBy::Leaf => {
                let leaf = stack.rsplit(';').next().unwrap_or(stack);
                credit(&mut counts, leaf, count);
            }
            RankBy::Stack => credit(&mut counts, stack, count),
            RankBy::Inclusive => {
                let mut seen: Vec<&str> = Vec::new();
                for frame in stack.split(';') {
                    // recursive frames are only credited once per stack
                    if !seen.contains(&frame) {
                        seen.push(frame);
                        credit(&mut counts, frame, count);
                    }
                }
            }
        }
    }

    if ranking.total_samples == 0 {
        warn!("No stack counts found");
    }

    let mut functions: Vec<TopFunction> = counts
        .into_iter()
        .map(|(name, samples)| TopFunction { name, samples })
        .collect();
    // stable, so equal counts stay in first-seen order
    functions.sort_by(|a, b| b.samples.cmp(&a.samples));
    functions.truncate(opt.top_n);
    ranking.functions = functions;
    Ok(ranking)
}

/// Rank the folded stack lines in the file at `path`.
///
/// See [`from_reader`].
pub fn from_file<P>(opt: &Options, path: P) -> Result<Ranking>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = io::BufReader::with_capacity(READER_CAPACITY, file);
    let ranking = from_reader(opt, reader).map_err(|e| Error::io(path, e))?;
    debug!(
        "Ranked {} samples from {} ({} lines skipped)",
        ranking.total_samples,
        path.display(),
        ranking.skipped.len()
    );
    Ok(ranking)
}

fn credit(counts: &mut IndexMap<String, u64>, key: &str, count: u64) {
    match counts.get_mut(key) {
        Some(total) => *total = total.saturating_add(count),
        None => {
            counts.insert(key.to_string(), count);
        }
    }
}
