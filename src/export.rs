// src/export.rs
use crate::error::Result;
use crate::tracks::{format_cell, TrackTable, BENDS_COLUMN, FRAMES_COLUMN, TIME_COLUMN, TRACK_COLUMN};
use crate::workbook::{Sheet, Workbook};
use std::path::{Path, PathBuf};

pub const LONG_TRACKS_SHEET: &str = ">50%_tracked_swimming_cycles";
pub const ALL_TRACKS_SHEET: &str = "all_swimming_cycles";
pub const RAW_SHEET: &str = "all_data";

pub const BBPM_COLUMN: &str = "BBPM";

const DERIVED_HEADERS: [&str; 9] = [
    TRACK_COLUMN,
    FRAMES_COLUMN,
    TIME_COLUMN,
    BENDS_COLUMN,
    "BBPS",
    BBPM_COLUMN,
    "mean (BBPM)",
    "SEM",
    "n",
];

/// One track with its bend rates.
#[derive(Debug, Clone, PartialEq)]
pub struct BendRate {
    pub track: i64,
    pub frames: f64,
    pub time: f64,
    pub bends: f64,
    /// Body bends per second; `NaN` when the track has no elapsed time.
    pub bbps: f64,
    pub bbpm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateStats {
    /// Mean BBPM over tracks with a finite rate.
    pub mean: f64,
    /// Standard error of the mean (n-1 denominator); `NaN` below two rates.
    pub sem: f64,
    /// Number of tracks in the set, including those without a rate.
    pub n: usize,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub path: PathBuf,
    pub all: RateStats,
    pub long: RateStats,
}

pub fn bend_rates(table: &TrackTable) -> Vec<BendRate> {
    let get = |row: &[f64], col: Option<usize>| col.map(|c| row[c]).unwrap_or(f64::NAN);
    let frames_col = table.column_index(FRAMES_COLUMN);
    let time_col = table.column_index(TIME_COLUMN);
    let bends_col = table.column_index(BENDS_COLUMN);

    table
        .rows()
        .map(|(track, row)| {
            let time = get(row, time_col);
            let bends = get(row, bends_col);
            let bbps = if time != 0.0 { bends / time } else { f64::NAN };
            BendRate {
                track,
                frames: get(row, frames_col),
                time,
                bends,
                bbps,
                bbpm: bbps * 60.0,
            }
        })
        .collect()
}

pub fn rate_stats(rates: &[BendRate]) -> RateStats {
    let values: Vec<f64> = rates.iter().map(|r| r.bbpm).filter(|v| v.is_finite()).collect();
    let count = values.len() as f64;
    let mean = if values.is_empty() {
        f64::NAN
    } else {
        values.iter().sum::<f64>() / count
    };
    let sem = if values.len() < 2 {
        f64::NAN
    } else {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1.0);
        var.sqrt() / count.sqrt()
    };
    RateStats {
        mean,
        sem,
        n: rates.len(),
    }
}

/// Tracks whose elapsed time exceeds `fraction` of the longest track's.
pub fn long_tracks(rates: &[BendRate], fraction: f64) -> Vec<BendRate> {
    let max = rates
        .iter()
        .map(|r| r.time)
        .filter(|t| !t.is_nan())
        .fold(f64::NAN, f64::max);
    let threshold = max * fraction;
    rates.iter().filter(|r| r.time > threshold).cloned().collect()
}

fn rates_sheet(name: &str, rates: &[BendRate], stats: &RateStats) -> Sheet {
    let mut sheet = Sheet::new(name, DERIVED_HEADERS.iter().map(|h| h.to_string()).collect());
    for r in rates {
        sheet.push_row(vec![
            r.track.to_string(),
            format_cell(r.frames),
            format_cell(r.time),
            format_cell(r.bends),
            format_cell(r.bbps),
            format_cell(r.bbpm),
            format_cell(stats.mean),
            format_cell(stats.sem),
            stats.n.to_string(),
        ]);
    }
    sheet
}

fn raw_sheet(table: &TrackTable) -> Sheet {
    let headers = std::iter::once(TRACK_COLUMN.to_string())
        .chain(table.columns().iter().cloned())
        .collect();
    let mut sheet = Sheet::new(RAW_SHEET, headers);
    for (id, row) in table.rows() {
        sheet.push_row(
            std::iter::once(id.to_string())
                .chain(row.iter().map(|v| format_cell(*v)))
                .collect(),
        );
    }
    sheet
}

/// Build the long-track, all-track and raw sheets, in that order.
pub fn build_workbook(table: &TrackTable, long_track_fraction: f64) -> (Workbook, RateStats, RateStats) {
    let all = bend_rates(table);
    let all_stats = rate_stats(&all);
    let long = long_tracks(&all, long_track_fraction);
    let long_stats = rate_stats(&long);

    let mut workbook = Workbook::new();
    workbook.add_sheet(rates_sheet(LONG_TRACKS_SHEET, &long, &long_stats));
    workbook.add_sheet(rates_sheet(ALL_TRACKS_SHEET, &all, &all_stats));
    workbook.add_sheet(raw_sheet(table));
    (workbook, all_stats, long_stats)
}

pub fn export_workbook(table: &TrackTable, stem: &Path, long_track_fraction: f64) -> Result<ExportReport> {
    let (workbook, all, long) = build_workbook(table, long_track_fraction);
    let path = workbook.save(stem)?;
    Ok(ExportReport { path, all, long })
}
