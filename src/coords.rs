// src/coords.rs - Coordinate file reader
//
// The tracker exports per-frame X/Y/flag triplets in fixed-width sections:
// once the track count exceeds what one section holds, the file continues
// with a `Tracks <start> to <end>` line followed by the next section's rows.
// This module stitches those sections back into one frame-indexed table.

use crate::error::{CurateError, ParseError, Result};
use std::path::Path;
use tracing::debug;

pub const FRAME_COLUMN: &str = "Frame";
const TRACKS_MARKER: &str = "Tracks";
/// Widest `Tracks a to b` range accepted in one section.
const MAX_TRACKS_PER_BLOCK: u32 = 100_000;

/// One section of the coordinate file, already reconciled to a common width.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateBlock {
    /// Track index range declared by the `Tracks` line, if the block had one.
    pub range: Option<(u32, u32)>,
    pub labels: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CoordinateBlock {
    /// Truncate or pad every row to `min(header width, widest row)`.
    fn close(range: Option<(u32, u32)>, header: &[String], rows: Vec<Vec<String>>) -> Self {
        let widest = rows.iter().map(Vec::len).max().unwrap_or(0);
        let width = header.len().min(widest);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self {
            range,
            labels: header[..width].to_vec(),
            rows,
        }
    }

    fn frame_values(&self) -> Vec<i64> {
        self.rows
            .iter()
            .map(|row| row.first().map(|cell| coerce_cell(cell)).unwrap_or(0))
            .collect()
    }
}

/// Frame-indexed integer table joining every block of a coordinate file.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateTable {
    columns: Vec<String>,
    rows: Vec<Vec<i64>>,
}

impl CoordinateTable {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    pub fn has_column(&self, label: &str) -> bool {
        self.column_index(label).is_some()
    }

    pub fn value(&self, row: usize, label: &str) -> Option<i64> {
        let col = self.column_index(label)?;
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Row position whose `Frame` cell equals `frame`.
    pub fn row_for_frame(&self, frame: i64) -> Option<usize> {
        let col = self.column_index(FRAME_COLUMN)?;
        self.rows.iter().position(|r| r.get(col) == Some(&frame))
    }

    /// Track indices that have an `X{i}` column, in column order.
    pub fn track_indices(&self) -> Vec<u32> {
        self.columns
            .iter()
            .filter_map(|c| c.strip_prefix('X'))
            .filter_map(|n| n.parse().ok())
            .collect()
    }
}

/// Numeric coercion used for every coordinate cell: integers parse directly,
/// decimals truncate toward zero, anything else becomes 0.
pub fn coerce_cell(cell: &str) -> i64 {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<i64>() {
        return v;
    }
    match cell.parse::<f64>() {
        Ok(v) if v.is_finite() => v.trunc() as i64,
        _ => 0,
    }
}

fn parse_track_range(line_no: usize, line: &str) -> std::result::Result<(u32, u32), ParseError> {
    let malformed = || ParseError::MalformedTracksHeader {
        line: line_no,
        text: line.to_string(),
    };
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(malformed());
    }
    let start: u32 = tokens[1].parse().map_err(|_| malformed())?;
    let end: u32 = tokens[3].parse().map_err(|_| malformed())?;
    let width = end.checked_sub(start).and_then(|w| w.checked_add(1)).ok_or_else(malformed)?;
    if width > MAX_TRACKS_PER_BLOCK {
        return Err(malformed());
    }
    Ok((start, end))
}

/// Header for a validated range, `end - start < MAX_TRACKS_PER_BLOCK`.
fn range_header(start: u32, end: u32) -> Vec<String> {
    let tracks = (end - start) as usize + 1;
    let mut header = Vec::with_capacity(1 + 3 * tracks);
    header.push(FRAME_COLUMN.to_string());
    for i in start..=end {
        header.push(format!("X{i}"));
        header.push(format!("Y{i}"));
        header.push(format!("Flag{i}"));
    }
    header
}

/// Split raw lines into reconciled blocks.
pub fn split_blocks<I, S>(lines: I) -> std::result::Result<Vec<CoordinateBlock>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut blocks = Vec::new();
    let mut header: Option<Vec<String>> = None;
    let mut range = None;
    let mut rows: Vec<Vec<String>> = Vec::new();

    for (idx, raw) in lines.into_iter().enumerate() {
        let line_no = idx + 1;
        let line = raw.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(FRAME_COLUMN) {
            header = Some(line.split('\t').map(str::to_string).collect());
            continue;
        }

        if line.starts_with(TRACKS_MARKER) {
            let (start, end) = parse_track_range(line_no, line)?;
            if let (Some(h), false) = (&header, rows.is_empty()) {
                blocks.push(CoordinateBlock::close(range, h, std::mem::take(&mut rows)));
            }
            header = Some(range_header(start, end));
            range = Some((start, end));
            continue;
        }

        if header.is_none() {
            return Err(ParseError::RowBeforeHeader { line: line_no });
        }
        rows.push(line.split('\t').map(str::to_string).collect());
    }

    if let (Some(h), false) = (&header, rows.is_empty()) {
        blocks.push(CoordinateBlock::close(range, h, rows));
    }

    Ok(blocks)
}

/// Join blocks side by side on row position and coerce to integers.
///
/// Every block must have the first block's row count and the same `Frame`
/// value at each row.
pub fn join_blocks(blocks: Vec<CoordinateBlock>) -> std::result::Result<CoordinateTable, ParseError> {
    let mut iter = blocks.into_iter();
    let first = iter.next().ok_or(ParseError::Empty)?;
    let frames = first.frame_values();

    let mut columns = first.labels.clone();
    let mut rows: Vec<Vec<i64>> = first
        .rows
        .iter()
        .map(|row| row.iter().map(|c| coerce_cell(c)).collect())
        .collect();

    for (offset, block) in iter.enumerate() {
        let block_no = offset + 2;
        if block.rows.len() != rows.len() {
            return Err(ParseError::MisalignedBlock {
                block: block_no,
                detail: format!("{} rows, first block has {}", block.rows.len(), rows.len()),
            });
        }
        if let Some(row) = block
            .frame_values()
            .iter()
            .zip(&frames)
            .position(|(a, b)| a != b)
        {
            return Err(ParseError::MisalignedBlock {
                block: block_no,
                detail: format!("frame mismatch at row {}", row + 1),
            });
        }

        let keep: Vec<usize> = block
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.as_str() != FRAME_COLUMN && !columns.contains(label))
            .map(|(i, _)| i)
            .collect();
        debug!(
            "Joining block {} ({:?}): {} new columns",
            block_no,
            block.range,
            keep.len()
        );

        columns.extend(keep.iter().map(|&i| block.labels[i].clone()));
        for (dst, src) in rows.iter_mut().zip(&block.rows) {
            dst.extend(keep.iter().map(|&i| coerce_cell(&src[i])));
        }
    }

    Ok(CoordinateTable { columns, rows })
}

pub fn parse_coordinates<I, S>(lines: I) -> std::result::Result<CoordinateTable, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_blocks(split_blocks(lines)?)
}

pub fn read_coordinate_file(path: &Path) -> Result<CoordinateTable> {
    let text = std::fs::read_to_string(path).map_err(|e| CurateError::file_access(path, e))?;
    let table = parse_coordinates(text.lines())?;
    debug!(
        "Parsed {}: {} frames, {} tracks",
        path.display(),
        table.row_count(),
        table.track_indices().len()
    );
    Ok(table)
}
