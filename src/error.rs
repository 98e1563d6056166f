// src/error.rs
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurateError>;

/// Structural problems in a coordinate file.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: malformed track range header {text:?} (expected `Tracks <start> to <end>`)")]
    MalformedTracksHeader { line: usize, text: String },

    #[error("line {line}: data row appears before any header")]
    RowBeforeHeader { line: usize },

    #[error("block {block} does not line up with the first block: {detail}")]
    MisalignedBlock { block: usize, detail: String },

    #[error("coordinate file contains no data rows")]
    Empty,
}

#[derive(Debug, Error)]
pub enum CurateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    KeyNotFound(String),

    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is missing required column `{column}`", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("malformed table {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot write workbook {}: {source}", path.display())]
    WorkbookWrite {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("cannot read workbook {}: {source}", path.display())]
    WorkbookRead {
        path: PathBuf,
        #[source]
        source: calamine::XlsxError,
    },

    #[error("no track data loaded")]
    NoData,

    #[error("no videos ending in {suffix:?} found in {}", folder.display())]
    NoVideos { folder: PathBuf, suffix: String },
}

impl CurateError {
    pub fn file_access(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn workbook_write(path: impl AsRef<Path>, source: rust_xlsxwriter::XlsxError) -> Self {
        Self::WorkbookWrite {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn workbook_read(path: impl AsRef<Path>, source: calamine::XlsxError) -> Self {
        Self::WorkbookRead {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Short title for the reviewer's alert dialog.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Parse(_) => "Coordinate File Error",
            Self::InvalidInput(_) => "Invalid Input",
            Self::KeyNotFound(_) => "Track Not Found",
            Self::FileAccess { .. } => "File Not Found",
            Self::MissingColumn { .. } | Self::Csv { .. } | Self::WorkbookRead { .. } => "File Loading Error",
            Self::WorkbookWrite { .. } => "Save Error",
            Self::NoData => "No Track Data",
            Self::NoVideos { .. } => "No Videos Found",
        }
    }
}
