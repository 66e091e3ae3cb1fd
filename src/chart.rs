//! SVG renderers for the three dashboard charts.
//!
//! Output is a standalone `<svg>` element that can be inlined into the
//! page. Renderers only read their summary table.

use std::f64::consts::PI;
use std::fmt::Write;

use crate::aggregate::{ObstacleTable, ValueCounts};
use crate::error::ChartError;

pub const BAR_TITLE: &str = "Distribution of Food Purchase Locations (Canteen vs. Online)";
pub const PIE_TITLE: &str = "Most Common Reasons for Choosing Online Food Ordering";
pub const STACKED_TITLE: &str = "Comparison of Preferences for Food Purchase Based on Obstacles";

/// Bar fills by position, cycling.
pub const BAR_COLORS: [&str; 2] = ["#87ceeb", "#ffa500"];

/// Qualitative "Paired" palette, assigned to pie wedges by position.
pub const PAIRED: [&str; 12] = [
    "#a6cee3", "#1f78b4", "#b2df8a", "#33a02c", "#fb9a99", "#e31a1c", "#fdbf6f", "#ff7f00",
    "#cab2d6", "#6a3d9a", "#ffff99", "#b15928",
];

/// Qualitative "Set2" colormap, sampled evenly for stacked segments.
pub const SET2: [&str; 8] = [
    "#66c2a5", "#fc8d62", "#8da0cb", "#e78ac3", "#a6d854", "#ffd92f", "#e5c494", "#b3b3b3",
];

const FONT: &str = "DejaVu Sans, Helvetica, Arial, sans-serif";

/// Evenly sample `n` colors across a listed colormap, first and last included.
pub fn sample_colormap(palette: &[&'static str], n: usize) -> Vec<&'static str> {
    let len = palette.len();
    (0..n)
        .map(|i| {
            let x = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
            palette[((x * len as f64) as usize).min(len - 1)]
        })
        .collect()
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Upper bound and step for a count axis, step drawn from 1/2/5 x 10^k.
pub fn nice_scale(max: usize) -> (f64, f64) {
    let max = max.max(1) as f64;
    let raw = max / 6.0;
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude)
        .max(1.0);
    ((max / step).ceil() * step, step)
}

fn open_svg(out: &mut String, width: u32, height: u32, title: &str) -> Result<(), ChartError> {
    write!(
        out,
        r##"<svg xmlns="http://www.w3.org/2000/svg" class="chart" viewBox="0 0 {w} {h}" width="{w}" height="{h}" font-family="{font}">"##,
        w = width,
        h = height,
        font = FONT
    )?;
    write!(
        out,
        r##"<rect width="{}" height="{}" fill="#ffffff"/>"##,
        width, height
    )?;
    write!(
        out,
        r##"<text x="{}" y="32" font-size="16" text-anchor="middle">{}</text>"##,
        width / 2,
        escape_xml(title)
    )?;
    Ok(())
}

/// Plot area of a cartesian chart with a count y axis.
struct Axes {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
    y_max: f64,
    y_step: f64,
}

impl Axes {
    fn new(svg_w: u32, svg_h: u32, bottom: f64, max_count: usize) -> Self {
        let (y_max, y_step) = nice_scale(max_count);
        let left = 80.0;
        let top = 56.0;
        Self {
            left,
            top,
            width: svg_w as f64 - left - 30.0,
            height: svg_h as f64 - top - bottom,
            y_max,
            y_step,
        }
    }

    fn y(&self, value: f64) -> f64 {
        self.top + self.height * (1.0 - value / self.y_max)
    }

    fn baseline(&self) -> f64 {
        self.top + self.height
    }

    /// Center of the `i`-th of `n` equal slots along x.
    fn slot_center(&self, i: usize, n: usize) -> f64 {
        self.left + self.width * (i as f64 + 0.5) / n as f64
    }

    fn slot_width(&self, n: usize) -> f64 {
        self.width / n as f64
    }

    fn draw_grid(&self, out: &mut String) -> Result<(), ChartError> {
        let mut v = 0.0;
        while v <= self.y_max + 1e-9 {
            let y = self.y(v);
            write!(
                out,
                r##"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="#000" stroke-width="0.8"/>"##,
                self.left - 4.0,
                y,
                self.left,
                y
            )?;
            write!(
                out,
                r##"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{}</text>"##,
                self.left - 7.0,
                y + 4.0,
                v as u64
            )?;
            v += self.y_step;
        }
        Ok(())
    }

    fn draw_frame(
        &self,
        out: &mut String,
        x_label: &str,
        y_label: &str,
        label_gap: f64,
    ) -> Result<(), ChartError> {
        write!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#000" stroke-width="0.8"/>"##,
            self.left, self.top, self.width, self.height
        )?;
        write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">{}</text>"##,
            self.left + self.width / 2.0,
            self.baseline() + label_gap,
            escape_xml(x_label)
        )?;
        let cy = self.top + self.height / 2.0;
        write!(
            out,
            r##"<text x="24" y="{cy:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 24 {cy:.1})">{}</text>"##,
            escape_xml(y_label),
            cy = cy
        )?;
        Ok(())
    }

    fn draw_x_label(
        &self,
        out: &mut String,
        x: f64,
        label: &str,
        rotate: f64,
    ) -> Result<(), ChartError> {
        let y = self.baseline() + 16.0;
        write!(
            out,
            r##"<line x1="{x:.1}" y1="{b:.1}" x2="{x:.1}" y2="{t:.1}" stroke="#000" stroke-width="0.8"/>"##,
            x = x,
            b = self.baseline(),
            t = self.baseline() + 4.0
        )?;
        if rotate == 0.0 {
            write!(
                out,
                r##"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle">{}</text>"##,
                x,
                y,
                escape_xml(label)
            )?;
        } else {
            write!(
                out,
                r##"<text x="{x:.1}" y="{y:.1}" font-size="11" text-anchor="end" transform="rotate({r} {x:.1} {y:.1})">{}</text>"##,
                escape_xml(label),
                x = x,
                y = y,
                r = -rotate
            )?;
        }
        Ok(())
    }
}

/// Bar per location, colors by position, tick labels at 45 degrees.
pub fn bar_chart(counts: &ValueCounts) -> Result<String, ChartError> {
    if counts.is_empty() {
        return Err(ChartError::EmptyData("location".into()));
    }
    let (w, h) = (800, 600);
    let max = counts.iter().map(|(_, c)| c).max().unwrap_or(0);
    let axes = Axes::new(w, h, 140.0, max);
    let n = counts.len();

    let mut out = String::new();
    open_svg(&mut out, w, h, BAR_TITLE)?;
    axes.draw_grid(&mut out)?;
    let bar_w = axes.slot_width(n) * 0.8;
    for (i, (label, count)) in counts.iter().enumerate() {
        let cx = axes.slot_center(i, n);
        let top = axes.y(count as f64);
        write!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {}</title></rect>"##,
            cx - bar_w / 2.0,
            top,
            bar_w,
            axes.baseline() - top,
            BAR_COLORS[i % BAR_COLORS.len()],
            escape_xml(label),
            count
        )?;
        axes.draw_x_label(&mut out, cx, label, 45.0)?;
    }
    axes.draw_frame(&mut out, "Location", "Number of Responses", 120.0)?;
    out.push_str("</svg>");
    Ok(out)
}

fn polar(cx: f64, cy: f64, r: f64, angle: f64) -> (f64, f64) {
    (cx + r * angle.cos(), cy - r * angle.sin())
}

/// Pie starting at 12 o'clock and running counter-clockwise, with
/// one-decimal percentage labels inside each wedge.
pub fn pie_chart(counts: &ValueCounts) -> Result<String, ChartError> {
    let total = counts.total();
    if total == 0 {
        return Err(ChartError::EmptyData("reason".into()));
    }
    let (w, h) = (800, 600);
    let (cx, cy, r) = (400.0, 320.0, 210.0);

    let mut out = String::new();
    open_svg(&mut out, w, h, PIE_TITLE)?;

    let mut start = PI / 2.0;
    for (i, (label, count)) in counts.iter().enumerate() {
        let fraction = count as f64 / total as f64;
        let sweep = fraction * 2.0 * PI;
        let end = start + sweep;
        let color = PAIRED[i % PAIRED.len()];

        if counts.len() == 1 {
            write!(
                out,
                r##"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{}"><title>{}: {}</title></circle>"##,
                color,
                escape_xml(label),
                count,
                cx = cx,
                cy = cy,
                r = r
            )?;
        } else {
            let (x1, y1) = polar(cx, cy, r, start);
            let (x2, y2) = polar(cx, cy, r, end);
            let large = if sweep > PI { 1 } else { 0 };
            write!(
                out,
                r##"<path d="M {cx} {cy} L {x1:.2} {y1:.2} A {r} {r} 0 {large} 0 {x2:.2} {y2:.2} Z" fill="{color}" stroke="#ffffff" stroke-width="0.5"><title>{label}: {count}</title></path>"##,
                cx = cx,
                cy = cy,
                r = r,
                x1 = x1,
                y1 = y1,
                x2 = x2,
                y2 = y2,
                large = large,
                color = color,
                label = escape_xml(label),
                count = count
            )?;
        }

        let mid = start + sweep / 2.0;
        let (lx, ly) = polar(cx, cy, r * 1.1, mid);
        let anchor = if mid.cos() >= 0.0 { "start" } else { "end" };
        write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="{}">{}</text>"##,
            lx,
            ly + 4.0,
            anchor,
            escape_xml(label)
        )?;
        let (px, py) = polar(cx, cy, r * 0.6, mid);
        write!(
            out,
            r##"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="middle">{}</text>"##,
            px,
            py + 4.0,
            format_percent(fraction)
        )?;
        start = end;
    }
    out.push_str("</svg>");
    Ok(out)
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// One bar per location, obstacle segments stacked in table order.
pub fn stacked_bar_chart(table: &ObstacleTable) -> Result<String, ChartError> {
    if table.rows.is_empty() {
        return Err(ChartError::EmptyData("obstacle".into()));
    }
    let (w, h) = (1000, 600);
    let axes = Axes::new(w, h, 80.0, table.max_total());
    let n = table.rows.len();
    let colors = sample_colormap(&SET2, table.obstacles.len());

    let mut out = String::new();
    open_svg(&mut out, w, h, STACKED_TITLE)?;
    axes.draw_grid(&mut out)?;
    let bar_w = axes.slot_width(n) * 0.5;
    for (i, row) in table.rows.iter().enumerate() {
        let cx = axes.slot_center(i, n);
        let mut acc = 0usize;
        for ((obstacle, count), color) in table
            .obstacles
            .iter()
            .zip(row.counts.iter())
            .zip(colors.iter())
        {
            if *count == 0 {
                continue;
            }
            let top = axes.y((acc + count) as f64);
            let bottom = axes.y(acc as f64);
            write!(
                out,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{} / {}: {}</title></rect>"##,
                cx - bar_w / 2.0,
                top,
                bar_w,
                bottom - top,
                color,
                escape_xml(&row.location),
                escape_xml(obstacle),
                count
            )?;
            acc += count;
        }
        axes.draw_x_label(&mut out, cx, &row.location, 0.0)?;
    }
    axes.draw_frame(&mut out, "Food Purchase Location", "Number of Responses", 44.0)?;

    // legend, upper right inside the plot area
    let lx = axes.left + axes.width - 190.0;
    let ly = axes.top + 10.0;
    write!(
        out,
        r##"<rect x="{:.1}" y="{:.1}" width="180" height="{}" fill="#ffffff" fill-opacity="0.8" stroke="#cccccc"/>"##,
        lx,
        ly,
        12 + 20 * table.obstacles.len()
    )?;
    for (i, (obstacle, color)) in table.obstacles.iter().zip(colors.iter()).enumerate() {
        let y = ly + 10.0 + 20.0 * i as f64;
        write!(
            out,
            r##"<rect x="{:.1}" y="{:.1}" width="20" height="10" fill="{}"/><text x="{:.1}" y="{:.1}" font-size="11">{}</text>"##,
            lx + 8.0,
            y,
            color,
            lx + 34.0,
            y + 9.0,
            escape_xml(obstacle)
        )?;
    }
    out.push_str("</svg>");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{ObstacleRow, OBSTACLES};

    fn table(rows: &[(&str, [usize; 5])]) -> ObstacleTable {
        ObstacleTable {
            obstacles: OBSTACLES.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(loc, counts)| ObstacleRow {
                    location: loc.to_string(),
                    counts: *counts,
                })
                .collect(),
        }
    }

    #[test]
    fn set2_sampled_like_a_colormap() {
        assert_eq!(
            sample_colormap(&SET2, 5),
            vec!["#66c2a5", "#8da0cb", "#a6d854", "#e5c494", "#b3b3b3"]
        );
        assert_eq!(sample_colormap(&SET2, 1), vec!["#66c2a5"]);
    }

    #[test]
    fn nice_scale_covers_max() {
        assert_eq!(nice_scale(0), (1.0, 1.0));
        assert_eq!(nice_scale(2), (2.0, 1.0));
        let (top, step) = nice_scale(47);
        assert!(top >= 47.0);
        assert_eq!(step, 10.0);
    }

    #[test]
    fn bar_chart_draws_one_bar_per_category() {
        let counts = ValueCounts::from_values(["Canteen", "Online", "Canteen"]);
        let svg = bar_chart(&counts).unwrap();
        assert_eq!(svg.matches("<title>").count(), 2);
        assert!(svg.contains("fill=\"#87ceeb\"><title>Canteen: 2"));
        assert!(svg.contains("fill=\"#ffa500\"><title>Online: 1"));
        assert!(svg.contains("rotate(-45"));
        assert!(svg.contains("Number of Responses"));
    }

    #[test]
    fn pie_labels_have_one_decimal() {
        let counts = ValueCounts::from_values(["Fast", "Cheap", "Fast"]);
        let svg = pie_chart(&counts).unwrap();
        assert!(svg.contains(">66.7%<"));
        assert!(svg.contains(">33.3%<"));
        assert!(svg.contains(PAIRED[0]));
        assert!(svg.contains(PAIRED[1]));
    }

    #[test]
    fn pie_first_wedge_starts_at_top() {
        let counts = ValueCounts::from_values(["a", "b"]);
        let svg = pie_chart(&counts).unwrap();
        assert!(svg.contains("M 400 320 L 400.00 110.00"));
    }

    #[test]
    fn single_category_pie_is_a_circle() {
        let counts = ValueCounts::from_values(["Fast"]);
        let svg = pie_chart(&counts).unwrap();
        assert!(svg.contains("<circle"));
        assert!(svg.contains(">100.0%<"));
    }

    #[test]
    fn empty_tables_are_errors() {
        assert!(matches!(
            bar_chart(&ValueCounts::default()),
            Err(ChartError::EmptyData(_))
        ));
        assert!(matches!(
            pie_chart(&ValueCounts::default()),
            Err(ChartError::EmptyData(_))
        ));
        assert!(matches!(
            stacked_bar_chart(&table(&[])),
            Err(ChartError::EmptyData(_))
        ));
    }

    #[test]
    fn stacked_segments_skip_zero_counts() {
        let svg = stacked_bar_chart(&table(&[
            ("Canteen", [3, 1, 0, 0, 0]),
            ("Online", [0, 0, 2, 0, 1]),
        ]))
        .unwrap();
        assert_eq!(svg.matches("<title>").count(), 4);
        assert!(svg.contains("Online / Other: 1"));
        assert!(!svg.contains("rotate(-45"));
        for name in OBSTACLES {
            assert!(svg.contains(name));
        }
    }

    #[test]
    fn labels_are_escaped() {
        let counts = ValueCounts::from_values(["Fish & <chips>"]);
        let svg = bar_chart(&counts).unwrap();
        assert!(svg.contains("Fish &amp; &lt;chips&gt;"));
    }
}
