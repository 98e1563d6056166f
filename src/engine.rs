// src/engine.rs - Track reconciliation with on-disk checkpoints
//
// The in-memory snapshot is what `undo` restores. The undo checkpoint file
// mirrors it so a crashed session can be inspected; the working checkpoint
// always holds the current table and is preferred over the tracker's summary
// the next time the video is opened.

use crate::error::{CurateError, Result};
use crate::export::{self, ExportReport};
use crate::tracks::TrackTable;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointPaths {
    pub working: PathBuf,
    pub undo: PathBuf,
    pub audit_log: PathBuf,
}

pub struct ReconciliationEngine {
    paths: CheckpointPaths,
    table: Option<TrackTable>,
    snapshot: Option<TrackTable>,
}

impl ReconciliationEngine {
    /// Open a video's track table. An existing working checkpoint wins over
    /// the tracker's summary file.
    pub fn load(summary: &Path, paths: CheckpointPaths) -> Result<Self> {
        let table = if paths.working.exists() {
            info!("Resuming from checkpoint {}", paths.working.display());
            TrackTable::read_checkpoint(&paths.working)?
        } else {
            info!("No checkpoint found, loading {}", summary.display());
            TrackTable::read_summary(summary)?
        };
        Self::from_table(table, paths)
    }

    pub fn from_table(table: TrackTable, paths: CheckpointPaths) -> Result<Self> {
        table.write_checkpoint(&paths.undo)?;
        Ok(Self {
            paths,
            snapshot: Some(table.clone()),
            table: Some(table),
        })
    }

    pub fn paths(&self) -> &CheckpointPaths {
        &self.paths
    }

    pub fn table(&self) -> Option<&TrackTable> {
        self.table.as_ref()
    }

    pub fn snapshot(&self) -> Option<&TrackTable> {
        self.snapshot.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.table.is_some()
    }

    /// Merge `ids` into `ids[0]`. Every id must exist.
    pub fn combine(&mut self, ids: &[i64]) -> Result<()> {
        let table = self.table.as_ref().ok_or(CurateError::NoData)?;
        let first = *ids
            .first()
            .ok_or_else(|| CurateError::InvalidInput("no tracks given".to_string()))?;
        let missing = table.missing(ids);
        if !missing.is_empty() {
            return Err(CurateError::KeyNotFound(format!("track(s) {}", join_ids(&missing))));
        }

        let next = table.combined(ids);
        self.commit(
            next,
            format!("Tracks {} combined to Track {}!", join_ids(ids), first),
        )
    }

    /// Remove `ids`. Either every row goes or, if any id is unknown, none do.
    pub fn delete(&mut self, ids: &[i64]) -> Result<()> {
        let table = self.table.as_ref().ok_or(CurateError::NoData)?;
        if ids.is_empty() {
            return Err(CurateError::InvalidInput("no tracks given".to_string()));
        }
        let missing = table.missing(ids);
        if !missing.is_empty() {
            return Err(CurateError::KeyNotFound(format!("track(s) {}", join_ids(&missing))));
        }

        let next = table.without(ids);
        self.commit(next, format!("Track(s) {} deleted!", join_ids(ids)))
    }

    /// Restore the table from before the last change. Repeating it restores
    /// the same snapshot again.
    pub fn undo(&mut self) -> Result<()> {
        if self.table.is_none() {
            return Err(CurateError::NoData);
        }
        let restored = self
            .snapshot
            .clone()
            .ok_or_else(|| CurateError::KeyNotFound("undo snapshot".to_string()))?;
        let mut log = self.open_log()?;
        restored.write_checkpoint(&self.paths.working)?;
        self.write_log(&mut log, "Last step undone.")?;
        self.table = Some(restored);
        Ok(())
    }

    /// Write the three-sheet workbook `<stem>.xlsx` and clear the table.
    pub fn export(&mut self, stem: &Path, long_track_fraction: f64) -> Result<ExportReport> {
        let table = self.table.as_ref().ok_or(CurateError::NoData)?;
        let report = export::export_workbook(table, stem, long_track_fraction)?;
        info!("Exported {} tracks to {}", table.len(), report.path.display());
        self.table = None;
        self.snapshot = None;
        Ok(report)
    }

    /// Checkpoint both states and log `entry`, then swap `next` in. Any
    /// failed write leaves the in-memory state unchanged.
    fn commit(&mut self, next: TrackTable, entry: String) -> Result<()> {
        let current = self.table.as_ref().ok_or(CurateError::NoData)?;
        let mut log = self.open_log()?;
        current.write_checkpoint(&self.paths.undo)?;
        next.write_checkpoint(&self.paths.working)?;
        self.write_log(&mut log, &entry)?;
        self.snapshot = self.table.replace(next);
        Ok(())
    }

    fn open_log(&self) -> Result<File> {
        let path = &self.paths.audit_log;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CurateError::file_access(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| CurateError::file_access(path, e))
    }

    fn write_log(&self, file: &mut File, entry: &str) -> Result<()> {
        writeln!(file, "{}", entry).map_err(|e| {
            warn!("Audit log write failed for {:?}", entry);
            CurateError::file_access(&self.paths.audit_log, e)
        })?;
        info!("{}", entry);
        Ok(())
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter().map(i64::to_string).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> CheckpointPaths {
        CheckpointPaths {
            working: dir.path().join("v1_tracks.txt.temp.csv"),
            undo: dir.path().join("v1_tracks.txt.temp_undo.csv"),
            audit_log: dir.path().join("tracks_processed").join("v1_log.txt"),
        }
    }

    fn sample() -> TrackTable {
        let mut t = TrackTable::new(
            ["#Frames", "1stFrame", "time(s)", "Bends"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );
        t.insert(1, vec![10.0, 1.0, 5.0, 20.0]);
        t.insert(2, vec![8.0, 3.0, 4.0, 10.0]);
        t.insert(5, vec![40.0, 1.0, 20.0, 80.0]);
        t
    }

    fn log(dir: &TempDir) -> String {
        std::fs::read_to_string(paths(dir).audit_log).unwrap_or_default()
    }

    #[test]
    fn test_load_writes_undo_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        assert_eq!(TrackTable::read_checkpoint(&paths(&dir).undo).unwrap(), sample());
        assert_eq!(engine.snapshot(), Some(&sample()));
        assert!(!paths(&dir).working.exists());
    }

    #[test]
    fn test_combine() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        engine.combine(&[1, 2]).unwrap();

        let table = engine.table().unwrap();
        assert_eq!(table.row(1), Some(&[18.0, 4.0, 9.0, 30.0][..]));
        assert!(!table.contains(2));
        assert_eq!(&TrackTable::read_checkpoint(&paths(&dir).working).unwrap(), table);
        assert_eq!(TrackTable::read_checkpoint(&paths(&dir).undo).unwrap(), sample());
        assert_eq!(log(&dir), "Tracks 1, 2 combined to Track 1!\n");
    }

    #[test]
    fn test_combine_single_track_only_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        engine.combine(&[5]).unwrap();
        assert_eq!(engine.table(), Some(&sample()));
        assert_eq!(log(&dir), "Tracks 5 combined to Track 5!\n");
    }

    #[test]
    fn test_combine_unknown_track_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        let err = engine.combine(&[1, 42]).unwrap_err();
        assert!(matches!(err, CurateError::KeyNotFound(ref m) if m.contains("42")));
        assert_eq!(engine.table(), Some(&sample()));
        assert!(log(&dir).is_empty());
    }

    #[test]
    fn test_delete_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        let err = engine.delete(&[2, 999]).unwrap_err();
        assert!(matches!(err, CurateError::KeyNotFound(ref m) if m.contains("999")));
        assert_eq!(engine.table(), Some(&sample()));
        assert!(!paths(&dir).working.exists());
        assert!(log(&dir).is_empty());
    }

    #[test]
    fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        engine.delete(&[2, 5]).unwrap();
        assert_eq!(engine.table().unwrap().ids().collect::<Vec<_>>(), vec![1]);
        assert_eq!(log(&dir), "Track(s) 2, 5 deleted!\n");
    }

    #[test]
    fn test_undo_restores_previous_table_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        engine.delete(&[5]).unwrap();
        let after_delete = engine.table().unwrap().clone();
        engine.combine(&[1, 2]).unwrap();

        engine.undo().unwrap();
        assert_eq!(engine.table(), Some(&after_delete));
        engine.undo().unwrap();
        assert_eq!(engine.table(), Some(&after_delete));
        assert_eq!(
            TrackTable::read_checkpoint(&paths(&dir).working).unwrap(),
            after_delete
        );
        assert!(log(&dir).ends_with("Last step undone.\nLast step undone.\n"));
    }

    #[test]
    fn test_undo_right_after_load_keeps_loaded_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        engine.undo().unwrap();
        assert_eq!(engine.table(), Some(&sample()));
    }

    #[test]
    fn test_failed_checkpoint_write_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        let mut engine = ReconciliationEngine::from_table(sample(), paths.clone()).unwrap();
        std::fs::create_dir_all(&paths.working).unwrap();

        let err = engine.delete(&[5]).unwrap_err();
        assert!(matches!(err, CurateError::Csv { .. } | CurateError::FileAccess { .. }));
        assert_eq!(engine.table(), Some(&sample()));
        assert_eq!(engine.snapshot(), Some(&sample()));
        assert!(log(&dir).is_empty());

        assert!(engine.undo().is_err());
        assert_eq!(engine.table(), Some(&sample()));
        assert!(log(&dir).is_empty());
    }

    #[test]
    fn test_failed_log_append_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths(&dir);
        let mut engine = ReconciliationEngine::from_table(sample(), paths.clone()).unwrap();
        std::fs::create_dir_all(&paths.audit_log).unwrap();

        let err = engine.combine(&[1, 2]).unwrap_err();
        assert!(matches!(err, CurateError::FileAccess { .. }));
        assert_eq!(engine.table(), Some(&sample()));
        assert_eq!(engine.snapshot(), Some(&sample()));
        assert!(!paths.working.exists());

        assert!(engine.undo().is_err());
        assert_eq!(engine.table(), Some(&sample()));
        assert!(!paths.working.exists());
    }

    #[test]
    fn test_load_prefers_working_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let summary = dir.path().join("v1_tracks.txt");
        std::fs::write(
            &summary,
            "Track\t#Frames\t1stFrame\ttime(s)\tBends\n1\t10\t1\t5\t20\n2\t8\t3\t4\t10\n",
        )
        .unwrap();

        let engine = ReconciliationEngine::load(&summary, paths(&dir)).unwrap();
        assert_eq!(engine.table().unwrap().len(), 2);

        sample().write_checkpoint(&paths(&dir).working).unwrap();
        let engine = ReconciliationEngine::load(&summary, paths(&dir)).unwrap();
        assert_eq!(engine.table(), Some(&sample()));
    }

    #[test]
    fn test_export_clears_table() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("tracks_processed").join("v1_processed");
        let mut engine = ReconciliationEngine::from_table(sample(), paths(&dir)).unwrap();
        let report = engine.export(&stem, 0.5).unwrap();
        assert_eq!(report.path, dir.path().join("tracks_processed").join("v1_processed.xlsx"));
        assert!(report.path.is_file());
        assert!(!engine.is_loaded());
        assert!(matches!(engine.export(&stem, 0.5), Err(CurateError::NoData)));
        assert!(matches!(engine.combine(&[1, 2]), Err(CurateError::NoData)));
        assert!(matches!(engine.undo(), Err(CurateError::NoData)));
    }
}
