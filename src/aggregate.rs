// src/aggregate.rs - Experiment-wide aggregation
//
// Expected layout: `<root>/<condition>/.../<line>/tracks_processed/`. Every
// directory below a condition folder is treated as a potential line folder;
// those holding exported workbooks get a `<line>_results.xlsx` workbook with
// one BBPM column per exported video, labelled with the export's file name.

use crate::config::ReviewConfig;
use crate::error::{CurateError, Result};
use crate::export::BBPM_COLUMN;
use crate::workbook::{read_column, Sheet, Workbook};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

fn walk_error(root: &Path, e: walkdir::Error) -> CurateError {
    let path = e.path().unwrap_or(root).to_path_buf();
    CurateError::file_access(path, e.into())
}

/// Directories below each immediate subfolder of `root`, at any depth.
pub fn line_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut conditions: Vec<PathBuf> = std::fs::read_dir(root)
        .map_err(|e| CurateError::file_access(root, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    conditions.sort();

    let mut lines = Vec::new();
    for condition in conditions {
        for entry in WalkDir::new(&condition).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| walk_error(&condition, e))?;
            if entry.file_type().is_dir() {
                lines.push(entry.into_path());
            }
        }
    }
    Ok(lines)
}

const EXPORT_SUFFIX: &str = "_processed.xlsx";

/// Exported workbooks inside `processed`, with the column label each
/// contributes (the workbook's file name). Office lock files are skipped.
fn exported_workbooks(processed: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();
    for entry in WalkDir::new(processed).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(processed, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.ends_with(EXPORT_SUFFIX) && !name.starts_with("~$") {
            found.push((name.into_owned(), entry.path().to_path_buf()));
        }
    }
    Ok(found)
}

/// Collect one line folder's BBPM columns into `<line>/<line>_results.xlsx`,
/// one sheet named after the line.
/// Returns the written file, or `None` when the folder has no exports.
pub fn aggregate_line(line: &Path, config: &ReviewConfig) -> Result<Option<PathBuf>> {
    let processed = line.join(&config.processed_dir);
    if !processed.is_dir() {
        return Ok(None);
    }
    let sheets = exported_workbooks(&processed)?;
    if sheets.is_empty() {
        debug!("No exports in {}", processed.display());
        return Ok(None);
    }

    let mut headers = Vec::with_capacity(sheets.len());
    let mut columns = Vec::with_capacity(sheets.len());
    for (label, path) in sheets {
        columns.push(read_column(&path, BBPM_COLUMN)?);
        headers.push(label);
    }

    let line_name = line
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "results".to_string());
    let mut sheet = Sheet::new(line_name.clone(), headers);
    let height = columns.iter().map(Vec::len).max().unwrap_or(0);
    for i in 0..height {
        sheet.push_row(
            columns
                .iter()
                .map(|col| col.get(i).cloned().unwrap_or_default())
                .collect(),
        );
    }

    let mut workbook = Workbook::new();
    workbook.add_sheet(sheet);
    let file = workbook.save(&line.join(format!("{line_name}_results")))?;
    info!("Results written to: {}", file.display());
    Ok(Some(file))
}

/// Aggregate every line folder below `root`.
pub fn aggregate_experiment(root: &Path, config: &ReviewConfig) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for line in line_folders(root)? {
        if line.file_name().map_or(false, |n| n == config.processed_dir.as_str()) {
            continue;
        }
        if let Some(file) = aggregate_line(&line, config)? {
            written.push(file);
        }
    }
    Ok(written)
}
