// src/lib.rs - Curation of worm-tracker output
//
// Merge or drop fragmented tracks per video, export bend-rate workbooks, and
// aggregate them per line.

pub mod aggregate;
pub mod config;
pub mod coords;
pub mod engine;
pub mod error;
pub mod export;
pub mod locate;
pub mod reviewer;
pub mod session;
pub mod tracks;
pub mod workbook;

pub use config::ReviewConfig;
pub use error::{CurateError, ParseError, Result};
pub use reviewer::{FrameSurface, Notifier, Reviewer, Severity};
