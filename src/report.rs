use std::borrow::Cow;
use std::io::prelude::*;
use std::path::PathBuf;

use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use rgb::RGB8;

use crate::benchmark::BenchmarkResult;
use crate::chart::{Bar, BarChart};
use crate::folded::{RankBy, Ranking};
use crate::stat::CounterSample;

const COUNTER_COLOR: RGB8 = RGB8 { r: 41, g: 128, b: 185 };
const FUNCTION_COLOR: RGB8 = RGB8 { r: 230, g: 126, b: 34 };
const BENCHMARK_COLOR: RGB8 = RGB8 { r: 39, g: 174, b: 96 };

const STYLE: &str = "
body { font-family: Arial, sans-serif; margin: 40px; color: #2c3e50; }
h1 { color: #2c3e50; }
h2 { color: #34495e; margin-top: 40px; }
a { color: #2980b9; text-decoration: none; }
a:hover { text-decoration: underline; }
.chart-container { width: 100%; overflow-x: auto; margin-bottom: 16px; }
.chart text { font-family: Verdana, sans-serif; font-size: 12px; fill: #2c3e50; }
.chart text.title { font-size: 16px; font-weight: bold; }
table { border-collapse: collapse; margin-bottom: 24px; }
th, td { border: 1px solid #dde; padding: 4px 10px; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
td.name { font-family: monospace; word-break: break-all; }
p.empty, p.warning { color: #c0392b; }
footer { margin-top: 40px; font-size: 11px; color: #7f8c8d; }
";

macro_rules! args {
    ($($key:expr => $value:expr),*) => {{
        [$(($key, $value),)*].into_iter()
    }};
}

/// Everything that goes into one HTML report.
///
/// Built once by the reporter and only read by [`render`].
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// Display name of the profiled project.
    pub project_name: String,
    /// Report heading.
    pub title: String,
    /// Release or version tag the report is filed under.
    pub version: String,
    /// When the report was generated, human readable.
    pub generated: String,
    /// The `perf stat` file the counters came from.
    pub stat_file: PathBuf,
    /// The collapsed stack file the ranking came from.
    pub collapsed_file: PathBuf,
    /// Link to the flamegraph SVG, relative to the report's directory.
    pub flamegraph_link: String,
    /// Parsed hardware counters.
    pub counters: Vec<CounterSample>,
    /// Ranked hot functions.
    pub ranking: Ranking,
    /// How [`ReportContext::ranking`] was keyed.
    pub rank_by: RankBy,
    /// Google Benchmark results, possibly empty.
    pub benchmarks: Vec<BenchmarkResult>,
}

impl ReportContext {
    /// The counter chart, one bar per counter.
    pub fn counter_chart(&self) -> BarChart {
        let mut chart = BarChart::new("Cache & Branch Statistics", COUNTER_COLOR);
        chart.bars = self
            .counters
            .iter()
            .map(|sample| {
                let bar = Bar::count(sample.counter.name(), sample.value);
                match sample.percentage {
                    Some(pct) => bar.with_note(&format!("{:.2}%", pct)),
                    None => bar,
                }
            })
            .collect();
        chart
    }

    /// The hot-function chart, hottest first.
    pub fn function_chart(&self) -> BarChart {
        let title = match self.rank_by {
            RankBy::Leaf => "Top Sampled Functions",
            RankBy::Stack => "Top Sampled Stacks",
            RankBy::Inclusive => "Top Functions (inclusive)",
        };
        let mut chart = BarChart::new(title, FUNCTION_COLOR);
        chart.bars = self
            .ranking
            .functions
            .iter()
            .map(|f| Bar::count(f.name.as_str(), f.samples))
            .collect();
        chart
    }

    /// The benchmark chart, if there are any benchmark results.
    pub fn benchmark_chart(&self) -> Option<BarChart> {
        if self.benchmarks.is_empty() {
            return None;
        }
        let mut chart = BarChart::new("Google Benchmark Results", BENCHMARK_COLOR);
        chart.bars = self
            .benchmarks
            .iter()
            .map(|b| Bar::measure(b.name.as_str(), b.cpu_time_ns, "ns"))
            .collect();
        Some(chart)
    }

    fn percent_of_samples(&self, samples: u64) -> f64 {
        if self.ranking.total_samples == 0 {
            0.0
        } else {
            samples as f64 * 100.0 / self.ranking.total_samples as f64
        }
    }
}

/// Write `ctx` as a self-contained HTML document.
pub fn render<W>(ctx: &ReportContext, writer: W) -> quick_xml::Result<()>
where
    W: Write,
{
    let mut html = Writer::new_with_indent(writer, b' ', 2);

    html.inner().write_all(b"<!DOCTYPE html>\n")?;
    html.write_event(Event::Start(
        BytesStart::new("html").with_attributes(args!("lang" => "en")),
    ))?;

    html.write_event(Event::Start(BytesStart::new("head")))?;
    html.write_event(Event::Empty(
        BytesStart::new("meta").with_attributes(args!("charset" => "UTF-8")),
    ))?;
    text_element(
        &mut html,
        "title",
        &format!("{} - {} {}", ctx.title, ctx.project_name, ctx.version),
    )?;
    html.write_event(Event::Start(BytesStart::new("style")))?;
    html.write_event(Event::Text(BytesText::from_escaped(STYLE)))?;
    html.write_event(Event::End(BytesEnd::new("style")))?;
    html.write_event(Event::End(BytesEnd::new("head")))?;

    html.write_event(Event::Start(BytesStart::new("body")))?;
    text_element(&mut html, "h1", &ctx.title)?;
    html.write_event(Event::Start(BytesStart::new("p")))?;
    for (i, (key, value)) in [
        ("Project:", ctx.project_name.as_str()),
        ("Release:", ctx.version.as_str()),
        ("Generated:", ctx.generated.as_str()),
    ]
    .into_iter()
    .enumerate()
    {
        if i > 0 {
            html.write_event(Event::Empty(BytesStart::new("br")))?;
        }
        text_element(&mut html, "strong", key)?;
        html.write_event(Event::Text(BytesText::new(&format!(" {}", value))))?;
    }
    html.write_event(Event::End(BytesEnd::new("p")))?;

    text_element(&mut html, "h2", "Flamegraph")?;
    html.write_event(Event::Start(BytesStart::new("p")))?;
    html.write_event(Event::Start(BytesStart::new("a").with_attributes(args!(
        "href" => ctx.flamegraph_link.as_str(),
        "target" => "_blank"
    ))))?;
    html.write_event(Event::Text(BytesText::new("Open Flamegraph (SVG)")))?;
    html.write_event(Event::End(BytesEnd::new("a")))?;
    html.write_event(Event::End(BytesEnd::new("p")))?;

    text_element(&mut html, "h2", "Cache & Branch Statistics")?;
    write_chart(&mut html, &ctx.counter_chart())?;
    write_table(
        &mut html,
        &["Counter", "Value", "Rate"],
        ctx.counters.iter().map(|s| {
            vec![
                Cell::name(s.counter.name()),
                Cell::num(s.value.to_string()),
                Cell::num(s.percentage.map_or_else(String::new, |p| format!("{:.2}%", p))),
            ]
        }),
    )?;

    let functions = ctx.function_chart();
    text_element(&mut html, "h2", &functions.title)?;
    write_chart(&mut html, &functions)?;
    write_table(
        &mut html,
        &["#", "Function", "Samples", "Share"],
        ctx.ranking.functions.iter().enumerate().map(|(i, f)| {
            vec![
                Cell::num((i + 1).to_string()),
                Cell::name(f.name.as_str()),
                Cell::num(f.samples.to_string()),
                Cell::num(format!("{:.2}%", ctx.percent_of_samples(f.samples))),
            ]
        }),
    )?;
    if !ctx.ranking.skipped.is_empty() {
        html.write_event(Event::Start(
            BytesStart::new("p").with_attributes(args!("class" => "warning")),
        ))?;
        html.write_event(Event::Text(BytesText::new(&format!(
            "Skipped {} malformed line(s) in the collapsed stack file (first at line {}).",
            ctx.ranking.skipped.len(),
            ctx.ranking.skipped[0].line_no
        ))))?;
        html.write_event(Event::End(BytesEnd::new("p")))?;
    }

    if let Some(chart) = ctx.benchmark_chart() {
        text_element(&mut html, "h2", &chart.title)?;
        write_chart(&mut html, &chart)?;
    }

    html.write_event(Event::Start(BytesStart::new("footer")))?;
    text_element(
        &mut html,
        "p",
        &format!(
            "Counters: {} | Stacks: {} ({} samples)",
            ctx.stat_file.display(),
            ctx.collapsed_file.display(),
            ctx.ranking.total_samples
        ),
    )?;
    html.write_event(Event::End(BytesEnd::new("footer")))?;

    html.write_event(Event::End(BytesEnd::new("body")))?;
    html.write_event(Event::End(BytesEnd::new("html")))?;
    html.inner().write_all(b"\n")?;
    Ok(())
}

struct Cell<'a> {
    text: Cow<'a, str>,
    class: &'static str,
}

impl<'a> Cell<'a> {
    fn name(text: impl Into<Cow<'a, str>>) -> Self {
        Cell {
            text: text.into(),
            class: "name",
        }
    }

    fn num(text: impl Into<Cow<'a, str>>) -> Self {
        Cell {
            text: text.into(),
            class: "num",
        }
    }
}

fn text_element<W>(html: &mut Writer<W>, name: &str, text: &str) -> quick_xml::Result<()>
where
    W: Write,
{
    html.write_event(Event::Start(BytesStart::new(name)))?;
    html.write_event(Event::Text(BytesText::new(text)))?;
    html.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn write_chart<W>(html: &mut Writer<W>, chart: &BarChart) -> quick_xml::Result<()>
where
    W: Write,
{
    html.write_event(Event::Start(
        BytesStart::new("div").with_attributes(args!("class" => "chart-container")),
    ))?;
    chart.write(html)?;
    html.write_event(Event::End(BytesEnd::new("div")))?;
    Ok(())
}

fn write_table<'a, W, I>(html: &mut Writer<W>, headers: &[&str], rows: I) -> quick_xml::Result<()>
where
    W: Write,
    I: IntoIterator<Item = Vec<Cell<'a>>>,
{
    let mut rows = rows.into_iter().peekable();
    if rows.peek().is_none() {
        return Ok(());
    }

    html.write_event(Event::Start(BytesStart::new("table")))?;
    html.write_event(Event::Start(BytesStart::new("tr")))?;
    for header in headers {
        text_element(html, "th", header)?;
    }
    html.write_event(Event::End(BytesEnd::new("tr")))?;
    for row in rows {
        html.write_event(Event::Start(BytesStart::new("tr")))?;
        for cell in row {
            html.write_event(Event::Start(
                BytesStart::new("td").with_attributes(args!("class" => cell.class)),
            ))?;
            html.write_event(Event::Text(BytesText::new(&cell.text)))?;
            html.write_event(Event::End(BytesEnd::new("td")))?;
        }
        html.write_event(Event::End(BytesEnd::new("tr")))?;
    }
    html.write_event(Event::End(BytesEnd::new("table")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folded::{MalformedLine, TopFunction};
    use crate::stat::Counter;

    fn context() -> ReportContext {
        ReportContext {
            project_name: "chronocache".to_string(),
            title: "Performance Report".to_string(),
            version: "v1.2.0".to_string(),
            generated: "2026-10-19 10:15:00".to_string(),
            stat_file: PathBuf::from("/tool/gen/stat/perf-stat-20261019-101500.txt"),
            collapsed_file: PathBuf::from("/tool/gen/collapsed/collapsed-20261019-101500.txt"),
            flamegraph_link: "../../gen/flamegraph/flamegraph-20261019-101500.svg".to_string(),
            counters: vec![
                CounterSample {
                    counter: Counter::CacheReferences,
                    value: 1_000_000,
                    percentage: None,
                },
                CounterSample {
                    counter: Counter::CacheMisses,
                    value: 200_000,
                    percentage: Some(20.0),
                },
            ],
            ranking: Ranking {
                functions: vec![
                    TopFunction {
                        name: "bar".to_string(),
                        samples: 13,
                    },
                    TopFunction {
                        name: "Vec<T>::push".to_string(),
                        samples: 5,
                    },
                ],
                total_samples: 20,
                skipped: vec![MalformedLine {
                    line_no: 4,
                    line: "main;foo".to_string(),
                }],
            },
            rank_by: RankBy::Leaf,
            benchmarks: Vec::new(),
        }
    }

    fn render_to_string(ctx: &ReportContext) -> String {
        let mut out = Vec::new();
        render(ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_metadata_link_and_charts() {
        let html = render_to_string(&context());

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>Performance Report - chronocache v1.2.0</title>"));
        assert!(html.contains(
            r#"<a href="../../gen/flamegraph/flamegraph-20261019-101500.svg" target="_blank">Open Flamegraph (SVG)</a>"#
        ));
        assert!(html.contains("<h2>Cache &amp; Branch Statistics</h2>"));
        assert!(html.contains("<h2>Top Sampled Functions</h2>"));
        assert_eq!(html.matches("<svg ").count(), 2);
        assert!(html.contains("Vec&lt;T&gt;::push"));
        assert!(html.contains(r#"<td class="num">65.00%</td>"#));
        assert!(html.contains(r#"<td class="num">20.00%</td>"#));
        assert!(html.contains("Skipped 1 malformed line(s)"));
        assert!(!html.contains("Google Benchmark"));
    }

    #[test]
    fn empty_ranking_renders_placeholder() {
        let mut ctx = context();
        ctx.ranking = Ranking::default();
        let html = render_to_string(&ctx);

        assert!(html.contains("No data available for Top Sampled Functions"));
        assert!(!html.contains("Skipped"));
    }

    #[test]
    fn benchmark_section_when_present() {
        let mut ctx = context();
        ctx.benchmarks.push(BenchmarkResult {
            name: "BM_Get".to_string(),
            cpu_time_ns: 12.5,
        });
        let html = render_to_string(&ctx);

        assert!(html.contains("<h2>Google Benchmark Results</h2>"));
        assert!(html.contains("12.50 ns"));
    }
}
