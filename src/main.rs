//! gridmacro - headless driver for the grid, its formulas and macros

mod args;
mod settings;

use std::path::Path;

use anyhow::{Context, bail};
use gridmacro_core::Document;
use gridmacro_core::document::MAX_EXTENT;
use gridmacro_engine::engine::CellPos;

use args::{Action, Cli, parse_args, print_usage};
use settings::load_settings;

fn print_grid(doc: &Document) {
    let (row_labels, col_labels) = doc.headers();
    println!("\t{}", col_labels.join("\t"));
    for (row, label) in row_labels.iter().enumerate() {
        let values: Vec<String> = (0..col_labels.len())
            .map(|col| doc.store.get_value(CellPos::new(row, col)))
            .collect();
        println!("{}\t{}", label, values.join("\t"));
    }
}

/// Apply the prelude as a macro. A missing or unreadable prelude is a warning.
fn run_prelude(doc: &mut Document, path: &Path) {
    match Document::load_macro(path) {
        Ok(script) => {
            doc.apply_macro(&script);
        }
        Err(e) => eprintln!("Warning: Failed to read {}: {}", path.display(), e),
    }
}

/// Returns whether any error report was emitted.
fn run(cli: Cli) -> anyhow::Result<bool> {
    let (settings, warnings) = load_settings(cli.config.as_deref());
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }

    let rows = cli.rows.unwrap_or(settings.rows);
    let cols = cli.cols.unwrap_or(settings.cols);
    if !(1..=MAX_EXTENT).contains(&rows) || !(1..=MAX_EXTENT).contains(&cols) {
        bail!(
            "Grid size must be between 1x1 and {}x{}, got {}x{}",
            MAX_EXTENT,
            MAX_EXTENT,
            rows,
            cols
        );
    }
    let mut doc = Document::with_extent(rows, cols);

    if !cli.no_prelude {
        if let Some(prelude) = settings.prelude_path() {
            run_prelude(&mut doc, &prelude);
        }
    }

    if let Some(path) = &cli.file {
        doc.load_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
    }

    for action in &cli.actions {
        match action {
            Action::Edit { row, col, text } => doc
                .commit(*row, *col, text)
                .with_context(|| format!("Failed to edit ({}, {})", row, col))?,
            Action::Macro(path) => {
                let script = Document::load_macro(path)
                    .with_context(|| format!("Failed to read macro {}", path.display()))?;
                doc.apply_macro(&script);
            }
        }
    }

    let reports = doc.take_reports();
    for report in &reports {
        eprintln!("{}", report);
    }

    if let Some(path) = &cli.output {
        doc.save_file(path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
        eprintln!("Saved to {}", path.display());
    }

    if cli.print {
        print_grid(&doc);
    }

    Ok(!reports.is_empty())
}

fn main() {
    let cli = match parse_args(std::env::args().skip(1)) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };
    if cli.help {
        print_usage();
        return;
    }

    match run(cli) {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
