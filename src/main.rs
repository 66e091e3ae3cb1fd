//! Dashboard page generator: loads the survey CSV, renders the three
//! chart sections and writes one self-contained HTML file.
//!
//! Output: out/dashboard/index.html (override with KANTIN_OUT)

use std::fs;

use anyhow::{Context, Result};
use kantin::config::Config;
use kantin::logging::{log, obj, v_str, Domain, Level};
use kantin::page;
use serde_json::json;

fn main() -> Result<()> {
    let config = Config::from_env();
    println!("=== Food Purchase Dashboard ===");
    println!("  dataset: {}", config.data_path.display());

    let page = page::render(&config);
    let summary = &page.summary;

    match &summary.dataset {
        Some(manifest) => println!(
            "  rows: {}  columns: {}",
            manifest.row_count,
            manifest.columns.len()
        ),
        None => println!("  rows: -"),
    }
    for section in &summary.sections {
        println!(
            "  {}: {}",
            section.kind.id(),
            section.error.as_deref().unwrap_or("ok")
        );
    }

    if let Some(parent) = config.out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&config.out_path, &page.html)
        .with_context(|| format!("writing {}", config.out_path.display()))?;

    log(
        Level::Info,
        Domain::System,
        "page_written",
        obj(&[
            ("path", v_str(&config.out_path.display().to_string())),
            ("bytes", json!(page.html.len())),
            ("failed_sections", json!(summary.failed_sections())),
        ]),
    );
    println!();
    println!(
        "  {} written ({:.1} KB)",
        config.out_path.display(),
        page.html.len() as f64 / 1024.0
    );

    if let Some(err) = &summary.load_error {
        eprintln!("{}", err);
        std::process::exit(2);
    }
    Ok(())
}
