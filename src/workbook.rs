// src/workbook.rs - Named-sheet workbooks saved as `.xlsx`
use crate::error::{CurateError, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use rust_xlsxwriter::XlsxError;
use std::path::{Path, PathBuf};

/// Longest sheet name Excel accepts.
const MAX_SHEET_NAME: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    pub fn column(&self, header: &str) -> Option<Vec<&str>> {
        let col = self.headers.iter().position(|h| h == header)?;
        Some(self.rows.iter().map(|r| r[col].as_str()).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Write every sheet into `<stem>.xlsx`, creating the parent folder.
    pub fn save(&self, stem: &Path) -> Result<PathBuf> {
        let path = workbook_path(stem);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CurateError::file_access(parent, e))?;
        }
        self.to_xlsx(&path)
            .map_err(|e| CurateError::workbook_write(&path, e))?;
        Ok(path)
    }

    fn to_xlsx(&self, path: &Path) -> std::result::Result<(), XlsxError> {
        let mut out = rust_xlsxwriter::Workbook::new();
        for sheet in &self.sheets {
            let worksheet = out.add_worksheet();
            worksheet.set_name(sheet_name(&sheet.name))?;
            for (col, header) in sheet.headers.iter().enumerate() {
                worksheet.write_string(0, column_index(col)?, header)?;
            }
            for (row, cells) in sheet.rows.iter().enumerate() {
                let row = u32::try_from(row + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
                for (col, cell) in cells.iter().enumerate() {
                    let col = column_index(col)?;
                    match cell.parse::<f64>() {
                        Ok(value) if value.is_finite() => {
                            worksheet.write_number(row, col, value)?;
                        }
                        _ if cell.is_empty() => {}
                        _ => {
                            worksheet.write_string(row, col, cell)?;
                        }
                    }
                }
            }
        }
        out.save(path)
    }
}

fn column_index(col: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}

/// `<stem>.xlsx`, keeping any dots already in the stem.
pub fn workbook_path(stem: &Path) -> PathBuf {
    let base = stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    stem.with_file_name(format!("{base}.xlsx"))
}

/// Sheet name Excel will accept: no `[]:*?/\`, at most 31 characters.
pub fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'');
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Load every sheet of an `.xlsx` file, taking the first row as headers.
pub fn read_workbook(path: &Path) -> Result<Workbook> {
    let mut source: Xlsx<_> = open_workbook(path).map_err(|e| CurateError::workbook_read(path, e))?;
    let mut workbook = Workbook::new();
    for (name, range) in source.worksheets() {
        let mut rows = range.rows();
        let headers = rows.next().map(cell_texts).unwrap_or_default();
        let mut sheet = Sheet::new(name, headers);
        for row in rows {
            sheet.push_row(cell_texts(row));
        }
        workbook.add_sheet(sheet);
    }
    Ok(workbook)
}

fn cell_texts(row: &[Data]) -> Vec<String> {
    row.iter().map(ToString::to_string).collect()
}

/// One column of the first sheet in `path`.
pub fn read_column(path: &Path, header: &str) -> Result<Vec<String>> {
    let workbook = read_workbook(path)?;
    let missing = || CurateError::MissingColumn {
        path: path.to_path_buf(),
        column: header.to_string(),
    };
    let first = workbook.sheets().first().ok_or_else(missing)?;
    let column = first.column(header).ok_or_else(missing)?;
    Ok(column.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_name() {
        assert_eq!(sheet_name(">50%_tracked_swimming_cycles"), ">50%_tracked_swimming_cycles");
        assert_eq!(sheet_name("line 3/b"), "line 3_b");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
        assert_eq!(sheet_name(""), "Sheet1");
    }

    #[test]
    fn test_workbook_path() {
        let p = workbook_path(Path::new("/data/tracks_processed/v1.a_processed"));
        assert_eq!(p, PathBuf::from("/data/tracks_processed/v1.a_processed.xlsx"));
    }

    #[test]
    fn test_save_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("out").join("v1_processed");
        let mut first = Sheet::new("first", vec!["Track".into(), "BBPM".into(), "Note".into()]);
        first.push_row(vec!["1".into(), "200".into(), "ok".into()]);
        first.push_row(vec!["2".into(), "12.5".into()]);
        let mut second = Sheet::new("all_data", vec!["Track".into()]);
        second.push_row(vec!["7".into()]);
        let mut wb = Workbook::new();
        wb.add_sheet(first);
        wb.add_sheet(second);

        let path = wb.save(&stem).unwrap();
        assert_eq!(path, dir.path().join("out").join("v1_processed.xlsx"));

        let loaded = read_workbook(&path).unwrap();
        let names: Vec<&str> = loaded.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["first", "all_data"]);
        assert_eq!(loaded.sheet("first").unwrap().column("Note").unwrap(), vec!["ok", ""]);

        assert_eq!(read_column(&path, "BBPM").unwrap(), vec!["200", "12.5"]);
        assert!(matches!(
            read_column(&path, "SEM"),
            Err(CurateError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_read_missing_workbook() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_column(&dir.path().join("none.xlsx"), "BBPM"),
            Err(CurateError::WorkbookRead { .. })
        ));
    }
}
