// src/tracks.rs
use crate::error::{CurateError, Result};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use std::collections::BTreeMap;
use std::path::Path;

pub const TRACK_COLUMN: &str = "Track";
pub const FRAMES_COLUMN: &str = "#Frames";
pub const FIRST_FRAME_COLUMN: &str = "1stFrame";
pub const TIME_COLUMN: &str = "time(s)";
pub const BENDS_COLUMN: &str = "Bends";

pub const REQUIRED_COLUMNS: [&str; 4] = [FRAMES_COLUMN, FIRST_FRAME_COLUMN, TIME_COLUMN, BENDS_COLUMN];

/// Per-track summary statistics keyed by track id.
///
/// `columns` lists every non-key column in file order; each row holds one
/// value per column. Missing cells are `NaN`.
#[derive(Debug, Clone, Default)]
pub struct TrackTable {
    columns: Vec<String>,
    rows: BTreeMap<i64, Vec<f64>>,
}

impl PartialEq for TrackTable {
    fn eq(&self, other: &Self) -> bool {
        self.columns == other.columns
            && self.rows.len() == other.rows.len()
            && self.rows.iter().zip(&other.rows).all(|((ka, va), (kb, vb))| {
                ka == kb
                    && va.len() == vb.len()
                    && va
                        .iter()
                        .zip(vb)
                        .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
            })
    }
}

impl TrackTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Insert or replace a row; short rows are padded with missing cells.
    pub fn insert(&mut self, id: i64, mut values: Vec<f64>) {
        values.resize(self.columns.len(), f64::NAN);
        self.rows.insert(id, values);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (i64, &[f64])> + '_ {
        self.rows.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    pub fn row(&self, id: i64) -> Option<&[f64]> {
        self.rows.get(&id).map(Vec::as_slice)
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn value(&self, id: i64, column: &str) -> Option<f64> {
        let col = self.column_index(column)?;
        self.rows.get(&id).map(|row| row[col])
    }

    /// Ids from `ids` that have no row.
    pub fn missing(&self, ids: &[i64]) -> Vec<i64> {
        ids.iter().copied().filter(|id| !self.contains(*id)).collect()
    }

    /// Relabel every row in `ids` to `ids[0]` and sum them column-wise.
    /// Missing cells are skipped by the sum.
    pub fn combined(&self, ids: &[i64]) -> Self {
        let mut out = self.clone();
        let Some(&target) = ids.first() else {
            return out;
        };
        let group: Vec<Vec<f64>> = ids.iter().filter_map(|id| out.rows.remove(id)).collect();
        if group.is_empty() {
            return out;
        }
        let merged = if group.len() == 1 {
            group.into_iter().next().unwrap_or_default()
        } else {
            (0..self.columns.len())
                .map(|col| {
                    group
                        .iter()
                        .map(|row| row[col])
                        .filter(|v| !v.is_nan())
                        .sum::<f64>()
                })
                .collect()
        };
        out.rows.insert(target, merged);
        out
    }

    /// Copy without the rows in `ids`.
    pub fn without(&self, ids: &[i64]) -> Self {
        let mut out = self.clone();
        for id in ids {
            out.rows.remove(id);
        }
        out
    }

    /// Read the tracker's tab-delimited per-video summary.
    pub fn read_summary(path: &Path) -> Result<Self> {
        Self::read_delimited(path, b'\t')
    }

    pub fn read_checkpoint(path: &Path) -> Result<Self> {
        Self::read_delimited(path, b',')
    }

    fn read_delimited(path: &Path, delimiter: u8) -> Result<Self> {
        if !path.exists() {
            return Err(CurateError::file_access(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(Trim::All)
            .from_path(path)
            .map_err(|e| CurateError::csv(path, e))?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| CurateError::csv(path, e))?
            .iter()
            .map(str::to_string)
            .collect();

        let key = headers
            .iter()
            .position(|h| h == TRACK_COLUMN)
            .ok_or_else(|| CurateError::MissingColumn {
                path: path.to_path_buf(),
                column: TRACK_COLUMN.to_string(),
            })?;
        for required in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == required) {
                return Err(CurateError::MissingColumn {
                    path: path.to_path_buf(),
                    column: required.to_string(),
                });
            }
        }

        let columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != key)
            .map(|(_, h)| h.clone())
            .collect();
        let mut table = Self::new(columns);

        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| CurateError::csv(path, e))?;
            let raw_id = record.get(key).unwrap_or("");
            let id = parse_track_id(raw_id).ok_or_else(|| {
                CurateError::InvalidInput(format!(
                    "{} row {}: track id {:?} is not an integer",
                    path.display(),
                    line + 2,
                    raw_id
                ))
            })?;
            if table.contains(id) {
                return Err(CurateError::InvalidInput(format!(
                    "{}: track {} listed twice",
                    path.display(),
                    id
                )));
            }
            let values = (0..headers.len())
                .filter(|i| *i != key)
                .map(|i| parse_cell(record.get(i).unwrap_or("")))
                .collect();
            table.insert(id, values);
        }

        Ok(table)
    }

    /// Overwrite `path` with this table as comma-separated values, key first.
    pub fn write_checkpoint(&self, path: &Path) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .from_path(path)
            .map_err(|e| CurateError::csv(path, e))?;
        let header = std::iter::once(TRACK_COLUMN).chain(self.columns.iter().map(String::as_str));
        writer
            .write_record(header)
            .map_err(|e| CurateError::csv(path, e))?;
        for (id, row) in &self.rows {
            let record = std::iter::once(id.to_string()).chain(row.iter().map(|v| format_cell(*v)));
            writer
                .write_record(record)
                .map_err(|e| CurateError::csv(path, e))?;
        }
        writer.flush().map_err(|e| CurateError::file_access(path, e))?;
        Ok(())
    }
}

fn parse_track_id(raw: &str) -> Option<i64> {
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
        _ => None,
    }
}

fn parse_cell(raw: &str) -> f64 {
    raw.parse().unwrap_or(f64::NAN)
}

/// Integral values print without a decimal point; missing cells print empty.
pub fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Parse reviewer input such as `"3,7, 12"` into distinct ids, first
/// occurrence order kept.
pub fn parse_identifiers(text: &str) -> Result<Vec<i64>> {
    let mut ids = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        let id: i64 = token.parse().map_err(|_| {
            CurateError::InvalidInput(format!(
                "{:?} is not a track number; enter integers separated by commas",
                token
            ))
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}
