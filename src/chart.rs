use std::borrow::Cow;
use std::io::prelude::*;

use num_format::{Buffer, Locale};
use quick_xml::{
    events::{BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use rgb::RGB8;

const CHARTWIDTH: usize = 960; // total width, pixels
const LABELWIDTH: usize = 320; // space reserved for bar labels
const VALUEWIDTH: usize = 150; // space reserved for value text right of the bars
const BARHEIGHT: usize = 22;
const BARPAD: usize = 4; // vertical gap between bars
const TITLEHEIGHT: usize = 36;
const FONTSIZE: usize = 12;
const MAXLABELCHARS: usize = 43; // what fits in LABELWIDTH at FONTSIZE

macro_rules! args {
    ($($key:expr => $value:expr),*) => {{
        [$(($key, $value),)*].into_iter()
    }};
}

/// One bar of a [`BarChart`].
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Text drawn left of the bar.
    pub label: String,
    /// Bar length, relative to the longest bar of the chart.
    pub value: f64,
    /// Text drawn right of the bar.
    pub text: String,
}

impl Bar {
    /// A bar for an integer count, labelled with thousands separators.
    pub fn count(label: impl Into<String>, value: u64) -> Self {
        let mut buf = Buffer::default();
        buf.write_formatted(&value, &Locale::en);
        Bar {
            label: label.into(),
            value: value as f64,
            text: buf.as_str().to_string(),
        }
    }

    /// A bar for a measurement in `unit`.
    pub fn measure(label: impl Into<String>, value: f64, unit: &str) -> Self {
        Bar {
            label: label.into(),
            value,
            text: format!("{:.2} {}", value, unit),
        }
    }

    /// Append `note` to the text drawn right of the bar.
    pub fn with_note(mut self, note: &str) -> Self {
        self.text.push_str(" (");
        self.text.push_str(note);
        self.text.push(')');
        self
    }
}

/// A horizontal bar chart, rendered as inline SVG.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    /// Heading drawn above the bars.
    pub title: String,
    /// Bars, top to bottom.
    pub bars: Vec<Bar>,
    /// Fill color of the bars.
    pub color: RGB8,
}

impl BarChart {
    /// An empty chart.
    pub fn new(title: impl Into<String>, color: RGB8) -> Self {
        BarChart {
            title: title.into(),
            bars: Vec::new(),
            color,
        }
    }

    /// Total height of the rendered SVG.
    pub fn height(&self) -> usize {
        TITLEHEIGHT + self.bars.len() * (BARHEIGHT + BARPAD) + BARPAD
    }

    /// Write the chart as an `<svg>` element.
    ///
    /// A chart without bars is written as a paragraph saying there is no data instead.
    pub fn write<W>(&self, xml: &mut Writer<W>) -> quick_xml::Result<()>
    where
        W: Write,
    {
        if self.bars.is_empty() {
            xml.write_event(Event::Start(
                BytesStart::new("p").with_attributes(args!("class" => "empty")),
            ))?;
            xml.write_event(Event::Text(BytesText::new(&format!(
                "No data available for {}",
                self.title
            ))))?;
            xml.write_event(Event::End(BytesEnd::new("p")))?;
            return Ok(());
        }

        let mut ibuf = itoa::Buffer::new();
        let mut svg = BytesStart::new("svg").with_attributes(args!(
            "class" => "chart",
            "xmlns" => "http://www.w3.org/2000/svg"
        ));
        svg.push_attribute(("width", ibuf.format(CHARTWIDTH)));
        svg.push_attribute(("height", ibuf.format(self.height())));
        svg.push_attribute((
            "viewBox",
            &*format!("0 0 {} {}", CHARTWIDTH, self.height()),
        ));
        svg.push_attribute(("role", "img"));
        xml.write_event(Event::Start(svg))?;

        write_text(xml, &self.title, 0.0, (FONTSIZE * 2) as f64, "title", None)?;

        let fill = format!("rgb({},{},{})", self.color.r, self.color.g, self.color.b);
        let max = self.bars.iter().map(|b| b.value).fold(0.0, f64::max);
        let span = (CHARTWIDTH - LABELWIDTH - VALUEWIDTH) as f64;
        for (i, bar) in self.bars.iter().enumerate() {
            let y = TITLEHEIGHT + i * (BARHEIGHT + BARPAD);
            let baseline = (y + BARHEIGHT / 2 + FONTSIZE / 2 - 2) as f64;
            let length = if max > 0.0 {
                (bar.value / max * span).max(1.0)
            } else {
                1.0
            };

            xml.write_event(Event::Start(BytesStart::new("g")))?;
            xml.write_event(Event::Start(BytesStart::new("title")))?;
            xml.write_event(Event::Text(BytesText::new(&format!(
                "{}: {}",
                bar.label, bar.text
            ))))?;
            xml.write_event(Event::End(BytesEnd::new("title")))?;

            write_text(
                xml,
                &truncate(&bar.label, MAXLABELCHARS),
                (LABELWIDTH - 8) as f64,
                baseline,
                "label",
                Some("end"),
            )?;
            let mut rect = BytesStart::new("rect");
            rect.push_attribute(("x", ibuf.format(LABELWIDTH)));
            rect.push_attribute(("y", ibuf.format(y)));
            rect.push_attribute(("width", &*format!("{:.1}", length)));
            rect.push_attribute(("height", ibuf.format(BARHEIGHT)));
            rect.push_attribute(("fill", fill.as_str()));
            xml.write_event(Event::Empty(rect))?;
            write_text(
                xml,
                &bar.text,
                LABELWIDTH as f64 + length + 6.0,
                baseline,
                "value",
                None,
            )?;
            xml.write_event(Event::End(BytesEnd::new("g")))?;
        }

        xml.write_event(Event::End(BytesEnd::new("svg")))?;
        Ok(())
    }
}

fn write_text<W>(
    xml: &mut Writer<W>,
    text: &str,
    x: f64,
    y: f64,
    class: &str,
    anchor: Option<&str>,
) -> quick_xml::Result<()>
where
    W: Write,
{
    let x = format!("{:.1}", x);
    let y = format!("{:.1}", y);
    let mut start = BytesStart::new("text").with_attributes(args!(
        "class" => class,
        "x" => x.as_str(),
        "y" => y.as_str()
    ));
    if let Some(anchor) = anchor {
        start.push_attribute(("text-anchor", anchor));
    }
    xml.write_event(Event::Start(start))?;
    xml.write_event(Event::Text(BytesText::new(text)))?;
    xml.write_event(Event::End(BytesEnd::new("text")))?;
    Ok(())
}

// Shorten long symbol names so they fit in the label column.
fn truncate(label: &str, max_chars: usize) -> Cow<'_, str> {
    if label.chars().count() <= max_chars {
        return Cow::Borrowed(label);
    }
    let kept: String = label.chars().take(max_chars.saturating_sub(2)).collect();
    Cow::Owned(kept + "..")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(chart: &BarChart) -> String {
        let mut xml = Writer::new(Vec::new());
        chart.write(&mut xml).unwrap();
        String::from_utf8(xml.into_inner()).unwrap()
    }

    #[test]
    fn count_bars_use_thousands_separators() {
        let bar = Bar::count("cache-misses", 1_234_567);
        assert_eq!(bar.text, "1,234,567");
        assert_eq!(bar.value, 1_234_567.0);
        assert_eq!(bar.with_note("10.00%").text, "1,234,567 (10.00%)");
    }

    #[test]
    fn empty_chart_says_so() {
        let chart = BarChart::new("Top Sampled Functions", RGB8::new(1, 2, 3));
        assert_eq!(
            render(&chart),
            r#"<p class="empty">No data available for Top Sampled Functions</p>"#
        );
    }

    #[test]
    fn bars_are_scaled_to_the_longest() {
        let mut chart = BarChart::new("Hot", RGB8::new(200, 60, 40));
        chart.bars.push(Bar::count("bar", 13));
        chart.bars.push(Bar::count("baz", 5));
        let svg = render(&chart);

        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect ").count(), 2);
        assert!(svg.contains(r#"width="960" height="92" viewBox="0 0 960 92""#), "{}", svg);
        assert!(svg.contains(r#"<rect x="320" y="36" width="490.0" height="22""#), "{}", svg);
        assert!(svg.contains(r#"<rect x="320" y="62" "#), "{}", svg);
        assert!(svg.contains(r#"fill="rgb(200,60,40)""#));
        assert!(svg.contains("<title>bar: 13</title>"));
    }

    #[test]
    fn labels_are_escaped_and_truncated() {
        let mut chart = BarChart::new("Hot", RGB8::new(0, 0, 0));
        let long = format!("std::vec::Vec<T>::push{}", "x".repeat(100));
        chart.bars.push(Bar::count(long.as_str(), 1));
        let svg = render(&chart);

        assert!(svg.contains("std::vec::Vec&lt;T&gt;::push"));
        assert!(svg.contains(".."));
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abc..");
    }
}
