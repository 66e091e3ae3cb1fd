//! End-to-end checks: CSV on disk in, HTML page out.

use kantin::aggregate::{obstacles_by_location, MatchMode, ALL_RESPONDENTS};
use kantin::config::Config;
use kantin::data::{Dataset, LOCATION_COLUMN, OBSTACLE_COLUMN, REASON_COLUMN};
use kantin::page::{render, SectionKind};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_csv(path: &Path, header: &[&str], rows: &[&str]) {
    let quoted: Vec<String> = header.iter().map(|h| format!("\"{}\"", h)).collect();
    let mut out = quoted.join(",");
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(path, out).unwrap();
}

fn config_for(path: &Path) -> Config {
    Config::default().with_data_path(path)
}

#[test]
fn full_dataset_renders_every_section() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sta24.csv");
    write_csv(
        &path,
        &[LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN],
        &[
            "Canteen,,Long queues",
            "Online,Cheap;Fast,\"Long queues, Expensive\"",
            "Canteen,Fast,Unhealthy food options",
        ],
    );
    let page = render(&config_for(&path));
    assert!(page.summary.load_error.is_none());
    assert_eq!(page.summary.failed_sections(), 0);
    assert_eq!(page.html.matches("<svg").count(), 3);

    let tables = &page.summary.tables;
    let locations = tables.locations.as_ref().unwrap();
    assert_eq!(locations.get("Canteen"), Some(2));
    assert_eq!(locations.get("Online"), Some(1));
    let reasons = tables.reasons.as_ref().unwrap();
    assert_eq!(reasons.get("Fast"), Some(2));
    assert_eq!(reasons.total(), 3);
    let obstacles = tables.obstacles.as_ref().unwrap();
    assert_eq!(obstacles.row("Online").unwrap().counts, [1, 0, 0, 1, 0]);
}

#[test]
fn missing_file_halts_before_any_chart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("missing.csv");
    let page = render(&config_for(&path));
    assert_eq!(
        page.summary.load_error.as_deref(),
        Some(format!("The file {} could not be found.", path.display()).as_str())
    );
    assert!(page.summary.sections.is_empty());
    assert!(!page.html.contains("<svg"));
    assert!(!page.html.contains("Dataset Preview"));
    assert!(page.html.contains("could not be found."));
}

#[test]
fn missing_location_column_only_fails_bar_chart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no_location.csv");
    write_csv(
        &path,
        &[REASON_COLUMN, OBSTACLE_COLUMN],
        &["Cheap;Fast,Expensive", "Fast,Other"],
    );
    let page = render(&config_for(&path));
    let bar = page.summary.section(SectionKind::Locations).unwrap();
    assert_eq!(
        bar.error.as_deref(),
        Some("The column 'Where do you buy food more often?' is missing in the dataset.")
    );
    assert!(page.summary.section(SectionKind::Reasons).unwrap().is_ok());
    let stacked = page.summary.section(SectionKind::Obstacles).unwrap();
    assert!(stacked.is_ok());
    let table = page.summary.tables.obstacles.as_ref().unwrap();
    assert_eq!(table.rows[0].location, ALL_RESPONDENTS);
    assert_eq!(page.html.matches("<svg").count(), 2);
}

#[test]
fn whole_word_mode_from_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.csv");
    write_csv(
        &path,
        &[LOCATION_COLUMN, OBSTACLE_COLUMN],
        &["Canteen,My mother says it is expensive"],
    );
    let ds = Dataset::load(&path).unwrap();

    let loose = obstacles_by_location(&ds, MatchMode::Substring).unwrap();
    assert_eq!(loose.rows[0].counts, [0, 0, 0, 1, 1]);

    let strict = Config {
        obstacle_match: MatchMode::WholeWord,
        ..config_for(&path)
    };
    let page = render(&strict);
    let table = page.summary.tables.obstacles.as_ref().unwrap();
    assert_eq!(table.rows[0].counts, [0, 0, 0, 1, 0]);
}

#[test]
fn rendering_twice_gives_the_same_tables() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("twice.csv");
    write_csv(
        &path,
        &[LOCATION_COLUMN, REASON_COLUMN, OBSTACLE_COLUMN],
        &["Online,Fast,Expensive", "Canteen,,Long queues"],
    );
    let ds = Dataset::load(&path).unwrap();
    let first = obstacles_by_location(&ds, MatchMode::Substring).unwrap();
    let second = obstacles_by_location(&ds, MatchMode::Substring).unwrap();
    assert_eq!(first, second);
    assert_eq!(ds.columns().len(), 3);
}
