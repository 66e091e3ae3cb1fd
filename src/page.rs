//! Page assembly: loads the dataset, runs each chart section in order and
//! lays the results out as one self-contained HTML document.
//!
//! A load failure stops the page after the intro. A section failure is
//! shown in place of that section's chart and the next section still runs.

use serde::Serialize;
use std::fmt::Write;

use crate::aggregate::{self, ObstacleTable, ValueCounts};
use crate::chart::{self, escape_xml};
use crate::config::Config;
use crate::data::{Dataset, DatasetManifest};
use crate::error::ChartError;
use crate::logging::{self, ProfileScope};

pub const PAGE_TITLE: &str = "Food Purchase Preferences Analysis";
pub const INTRO: &str = "This app analyzes student preferences for food purchases and reasons for choosing online or canteen options.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Locations,
    Reasons,
    Obstacles,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Locations,
        SectionKind::Reasons,
        SectionKind::Obstacles,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            SectionKind::Locations => "locations",
            SectionKind::Reasons => "reasons",
            SectionKind::Obstacles => "obstacles",
        }
    }

    pub fn heading(&self) -> &'static str {
        match self {
            SectionKind::Locations => "1. Distribution of Food Purchase Locations",
            SectionKind::Reasons => "2. Most Common Reasons for Choosing Online Ordering",
            SectionKind::Obstacles => "3. Comparison of Preferences Based on Obstacles",
        }
    }

    /// Name used in "An error occurred while generating the ..." messages.
    pub fn chart_name(&self) -> &'static str {
        match self {
            SectionKind::Locations => "bar chart",
            SectionKind::Reasons => "pie chart",
            SectionKind::Obstacles => "stacked bar chart",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionOutcome {
    pub kind: SectionKind,
    pub heading: &'static str,
    pub error: Option<String>,
    #[serde(skip)]
    pub svg: Option<String>,
}

impl SectionOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate tables that made it onto the page, embedded as JSON.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Tables {
    pub locations: Option<ValueCounts>,
    pub reasons: Option<ValueCounts>,
    pub obstacles: Option<ObstacleTable>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub generated: String,
    pub run_id: String,
    pub dataset: Option<DatasetManifest>,
    pub load_error: Option<String>,
    pub obstacle_match: aggregate::MatchMode,
    pub reason_tokens: aggregate::TokenMode,
    pub sections: Vec<SectionOutcome>,
    pub tables: Tables,
}

impl PageSummary {
    pub fn section(&self, kind: SectionKind) -> Option<&SectionOutcome> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn failed_sections(&self) -> usize {
        self.sections.iter().filter(|s| !s.is_ok()).count()
    }
}

#[derive(Debug, Clone)]
pub struct Page {
    pub html: String,
    pub summary: PageSummary,
}

/// Load the configured dataset and build the page.
pub fn render(config: &Config) -> Page {
    let _scope = ProfileScope::with_context(
        "page.render",
        &[("path", logging::v_str(&config.data_path.display().to_string()))],
    );
    match Dataset::load(&config.data_path) {
        Ok(dataset) => {
            logging::log_dataset_loaded(&dataset.manifest());
            render_dataset(&dataset, config)
        }
        Err(err) => {
            logging::log_load_failed(&err);
            let summary = PageSummary {
                generated: logging::ts_now(),
                run_id: logging::run_id().to_string(),
                dataset: None,
                load_error: Some(err.to_string()),
                obstacle_match: config.obstacle_match,
                reason_tokens: config.reason_tokens,
                sections: Vec::new(),
                tables: Tables::default(),
            };
            Page {
                html: assemble(&summary, None, config),
                summary,
            }
        }
    }
}

/// Build the page from an already loaded dataset.
pub fn render_dataset(dataset: &Dataset, config: &Config) -> Page {
    let mut tables = Tables::default();
    let mut sections = Vec::with_capacity(SectionKind::ALL.len());

    for kind in SectionKind::ALL {
        let section = kind.id();
        let _scope =
            ProfileScope::with_context("page.section", &[("section", logging::v_str(section))]);
        let drawn = match kind {
            SectionKind::Locations => aggregate::location_counts(dataset).and_then(|counts| {
                logging::log_table(section, counts.len(), counts.total());
                let svg = chart::bar_chart(&counts)?;
                tables.locations = Some(counts);
                Ok(svg)
            }),
            SectionKind::Reasons => {
                aggregate::reason_counts(dataset, config.reason_tokens).and_then(|counts| {
                    logging::log_table(section, counts.len(), counts.total());
                    let svg = chart::pie_chart(&counts)?;
                    tables.reasons = Some(counts);
                    Ok(svg)
                })
            }
            SectionKind::Obstacles => {
                aggregate::obstacles_by_location(dataset, config.obstacle_match).and_then(|table| {
                    let marked = table.rows.iter().map(|row| row.total()).sum::<usize>();
                    logging::log_table(section, table.rows.len(), marked);
                    let svg = chart::stacked_bar_chart(&table)?;
                    tables.obstacles = Some(table);
                    Ok(svg)
                })
            }
        };
        if let Ok(svg) = &drawn {
            logging::log_chart(section, svg.len());
        }
        sections.push(outcome(kind, drawn));
    }

    let summary = PageSummary {
        generated: logging::ts_now(),
        run_id: logging::run_id().to_string(),
        dataset: Some(dataset.manifest()),
        load_error: None,
        obstacle_match: config.obstacle_match,
        reason_tokens: config.reason_tokens,
        sections,
        tables,
    };
    Page {
        html: assemble(&summary, Some(dataset), config),
        summary,
    }
}

fn outcome(kind: SectionKind, drawn: Result<String, ChartError>) -> SectionOutcome {
    match drawn {
        Ok(svg) => {
            logging::log_section_ok(kind.id());
            SectionOutcome {
                kind,
                heading: kind.heading(),
                error: None,
                svg: Some(svg),
            }
        }
        Err(err) => {
            let shown = err.user_message(kind.chart_name());
            logging::log_section_failed(kind.id(), &err, &shown);
            SectionOutcome {
                kind,
                heading: kind.heading(),
                error: Some(shown),
                svg: None,
            }
        }
    }
}

fn assemble(summary: &PageSummary, dataset: Option<&Dataset>, config: &Config) -> String {
    let mut body = String::new();
    // writing into a String cannot fail
    let _ = write_body(&mut body, summary, dataset, config);

    let data = serde_json::to_string(summary)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/");
    TEMPLATE
        .replace("__PAGE_TITLE__", &escape_xml(PAGE_TITLE))
        .replace("__PAGE_BODY__", &body)
        .replace("__PAGE_DATA__", &data)
}

fn write_body(
    out: &mut String,
    summary: &PageSummary,
    dataset: Option<&Dataset>,
    config: &Config,
) -> std::fmt::Result {
    write!(out, "<h1>{}</h1>", escape_xml(PAGE_TITLE))?;
    write!(out, r#"<p class="intro">{}</p>"#, escape_xml(INTRO))?;

    if let Some(err) = &summary.load_error {
        write!(out, r#"<div class="error" role="alert">{}</div>"#, escape_xml(err))?;
        return write_footer(out, summary);
    }

    if let (Some(dataset), true) = (dataset, config.show_preview) {
        write_preview(out, dataset)?;
    }

    for section in &summary.sections {
        write!(
            out,
            r#"<section id="{}"><h2>{}</h2>"#,
            section.kind.id(),
            escape_xml(section.heading)
        )?;
        match (&section.svg, &section.error) {
            (Some(svg), _) => write!(out, r#"<div class="chart-wrap">{}</div>"#, svg)?,
            (None, Some(err)) => {
                write!(out, r#"<div class="error" role="alert">{}</div>"#, escape_xml(err))?
            }
            (None, None) => {}
        }
        out.push_str("</section>");
    }
    write_footer(out, summary)
}

fn write_preview(out: &mut String, dataset: &Dataset) -> std::fmt::Result {
    out.push_str(r#"<section id="preview"><h2>Dataset Preview</h2><div class="table-wrap"><table><thead><tr><th></th>"#);
    for column in dataset.columns() {
        write!(out, "<th>{}</th>", escape_xml(column))?;
    }
    out.push_str("</tr></thead><tbody>");
    for (i, row) in dataset.rows().iter().enumerate() {
        write!(out, r#"<tr><th class="idx">{}</th>"#, i)?;
        for cell in row {
            match cell {
                Some(value) => write!(out, "<td>{}</td>", escape_xml(value))?,
                None => out.push_str(r#"<td class="na">None</td>"#),
            }
        }
        out.push_str("</tr>");
    }
    write!(
        out,
        r#"</tbody></table></div><p class="meta">{} rows x {} columns</p></section>"#,
        dataset.row_count(),
        dataset.columns().len()
    )
}

fn write_footer(out: &mut String, summary: &PageSummary) -> std::fmt::Result {
    out.push_str("<footer>");
    if let Some(manifest) = &summary.dataset {
        if let Some(path) = &manifest.path {
            write!(out, "<span>dataset: {}</span>", escape_xml(path))?;
        }
        if let Some(hash) = &manifest.hash_sha256 {
            write!(out, "<span>sha256: {}</span>", &hash[..hash.len().min(12)])?;
        }
    }
    write!(
        out,
        "<span>run: {}</span><span>generated: {}</span></footer>",
        escape_xml(&summary.run_id),
        escape_xml(&summary.generated)
    )
}

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>__PAGE_TITLE__</title>
  <style>
    :root {
      --bg: #ffffff; --fg: #31333f; --fg-muted: #808495;
      --border: #e6eaf1; --error-bg: #ffecec; --error-fg: #7d353b;
      --sans: "Source Sans Pro", -apple-system, BlinkMacSystemFont, "Segoe UI", Helvetica, Arial, sans-serif;
      --mono: "SF Mono", "Fira Code", monospace;
    }
    *, *::before, *::after { box-sizing: border-box; }
    body { margin: 0; font-family: var(--sans); background: var(--bg); color: var(--fg); line-height: 1.6; }
    main { max-width: 1040px; margin: 0 auto; padding: 3rem 1.5rem; }
    h1 { font-size: 2.4rem; font-weight: 700; margin: 0 0 1rem; }
    h2 { font-size: 1.5rem; font-weight: 600; margin: 2rem 0 1rem; }
    .intro { margin-bottom: 1.5rem; }
    .table-wrap { max-height: 420px; overflow: auto; border: 1px solid var(--border); border-radius: 4px; }
    table { border-collapse: collapse; font-size: 0.82rem; white-space: nowrap; }
    th, td { border-bottom: 1px solid var(--border); border-right: 1px solid var(--border); padding: 0.25rem 0.6rem; text-align: left; }
    thead th { position: sticky; top: 0; background: #f8f9fb; font-weight: 600; }
    th.idx { color: var(--fg-muted); font-weight: 400; background: #f8f9fb; }
    td.na { color: var(--fg-muted); font-style: italic; }
    .meta { color: var(--fg-muted); font-size: 0.8rem; margin: 0.3rem 0 0; }
    .chart-wrap svg { max-width: 100%; height: auto; }
    .error { background: var(--error-bg); color: var(--error-fg); border-radius: 4px; padding: 1rem; margin: 1rem 0; }
    footer { margin-top: 3rem; display: flex; flex-wrap: wrap; gap: 1.2rem; color: var(--fg-muted); font-size: 0.72rem; font-family: var(--mono); }
  </style>
</head>
<body>
  <main>
__PAGE_BODY__
  </main>
  <script id="page-data" type="application/json">__PAGE_DATA__</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LOCATION_COLUMN, OBSTACLE_COLUMN, REASON_COLUMN};

    fn dataset(text: &str) -> Dataset {
        Dataset::from_reader(text.as_bytes()).unwrap()
    }

    fn survey() -> Dataset {
        dataset(&format!(
            "{},\"{}\",{}\nCanteen,,Long queues\nOnline,Cheap;Fast,Expensive\nOnline,Fast,\n",
            LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN
        ))
    }

    #[test]
    fn sections_render_in_order() {
        let page = render_dataset(&survey(), &Config::default());
        let kinds: Vec<_> = page.summary.sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, SectionKind::ALL.to_vec());
        assert_eq!(page.summary.failed_sections(), 0);

        let preview = page.html.find("Dataset Preview").unwrap();
        let first = page.html.find(SectionKind::Locations.heading()).unwrap();
        let second = page.html.find(SectionKind::Reasons.heading()).unwrap();
        let third = page.html.find(SectionKind::Obstacles.heading()).unwrap();
        assert!(preview < first && first < second && second < third);
    }

    #[test]
    fn preview_can_be_turned_off() {
        let config = Config {
            show_preview: false,
            ..Config::default()
        };
        let page = render_dataset(&survey(), &config);
        assert!(!page.html.contains("Dataset Preview"));
        assert_eq!(page.html.matches("<svg").count(), 3);
    }

    #[test]
    fn failed_section_does_not_stop_later_ones() {
        let ds = dataset(&format!(
            "{},\"{}\"\nCanteen,Fast\n",
            LOCATION_COLUMN, REASON_COLUMN
        ));
        let page = render_dataset(&ds, &Config::default());
        let obstacles = page.summary.section(SectionKind::Obstacles).unwrap();
        assert_eq!(
            obstacles.error.as_deref(),
            Some(format!("The column '{}' is missing in the dataset.", OBSTACLE_COLUMN).as_str())
        );
        assert!(page.summary.section(SectionKind::Locations).unwrap().is_ok());
        assert!(page.summary.section(SectionKind::Reasons).unwrap().is_ok());
        assert_eq!(page.html.matches("<svg").count(), 2);
    }

    #[test]
    fn missing_reason_column_only_fails_pie_chart() {
        let ds = dataset(&format!(
            "{},{}\nCanteen,Expensive\nOnline,Long queues\n",
            LOCATION_COLUMN, OBSTACLE_COLUMN
        ));
        let page = render_dataset(&ds, &Config::default());
        let reasons = page.summary.section(SectionKind::Reasons).unwrap();
        assert_eq!(
            reasons.error.as_deref(),
            Some(
                "The column 'What is the main reason you choose to buy food online? \
                 (Choose a maximum of 2)' is missing in the dataset."
            )
        );
        assert!(page.summary.section(SectionKind::Locations).unwrap().is_ok());
        assert!(page.summary.section(SectionKind::Obstacles).unwrap().is_ok());
        assert!(page.summary.tables.reasons.is_none());
        assert_eq!(page.html.matches("<svg").count(), 2);
    }

    #[test]
    fn empty_reasons_report_pie_chart_error() {
        let ds = dataset(&format!(
            "{},\"{}\",{}\nCanteen,,Other\n",
            LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN
        ));
        let page = render_dataset(&ds, &Config::default());
        let reasons = page.summary.section(SectionKind::Reasons).unwrap();
        assert!(reasons
            .error
            .as_deref()
            .unwrap()
            .starts_with("An error occurred while generating the pie chart:"));
    }

    #[test]
    fn page_data_is_embedded() {
        let page = render_dataset(&survey(), &Config::default());
        assert!(page.html.contains(r#"<script id="page-data" type="application/json">{"#));
        assert!(page.html.contains("\"obstacle_match\":\"substring\""));
        assert!(page.html.contains("\"reason_tokens\":\"raw\""));
    }

    #[test]
    fn cell_text_is_escaped() {
        let ds = dataset(&format!(
            "{},\"{}\",{}\n<b>Canteen</b>,,\n",
            LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN
        ));
        let page = render_dataset(&ds, &Config::default());
        assert!(!page.html.contains("<b>Canteen</b>"));
        assert!(page.html.contains("&lt;b&gt;Canteen&lt;/b&gt;"));
    }
}
