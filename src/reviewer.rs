// src/reviewer.rs - Reviewer session between the window and the curation core
//
// Each method corresponds to one reviewer action. Failures never escape;
// they are logged and handed to the notifier as an alert.

use crate::aggregate;
use crate::config::ReviewConfig;
use crate::coords::{read_coordinate_file, CoordinateTable};
use crate::engine::ReconciliationEngine;
use crate::error::{CurateError, Result};
use crate::locate::{locate_track, TrackLocation};
use crate::session::{VideoPaths, VideoQueue};
use crate::tracks::{parse_identifiers, TrackTable};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Alert surface (message boxes in the desktop app).
pub trait Notifier {
    fn notify(&mut self, severity: Severity, title: &str, message: &str);
}

/// Video display that can jump to a frame and mark a coordinate.
pub trait FrameSurface {
    fn show_frame(&mut self, frame: i64, highlight: Option<(i64, i64)>);
}

/// Data held for the video under review.
pub struct LoadedVideo {
    pub paths: VideoPaths,
    /// Tracker summary as exported, used to find where tracks start.
    pub summary: TrackTable,
    pub coordinates: CoordinateTable,
    pub engine: ReconciliationEngine,
}

impl LoadedVideo {
    pub fn open(paths: VideoPaths) -> Result<Self> {
        let summary = TrackTable::read_summary(&paths.summary)?;
        let coordinates = read_coordinate_file(&paths.coordinates)?;
        let engine = ReconciliationEngine::load(&paths.summary, paths.checkpoints.clone())?;
        Ok(Self {
            paths,
            summary,
            coordinates,
            engine,
        })
    }
}

pub struct Reviewer<N: Notifier> {
    config: ReviewConfig,
    notifier: N,
    queue: Option<VideoQueue>,
    current: Option<LoadedVideo>,
}

impl<N: Notifier> Reviewer<N> {
    pub fn new(config: ReviewConfig, notifier: N) -> Self {
        Self {
            config,
            notifier,
            queue: None,
            current: None,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn current(&self) -> Option<&LoadedVideo> {
        self.current.as_ref()
    }

    /// Track table as currently edited, if a video is loaded.
    pub fn table(&self) -> Option<&TrackTable> {
        self.current.as_ref().and_then(|v| v.engine.table())
    }

    pub fn status(&self) -> String {
        match &self.queue {
            Some(queue) => queue.status(),
            None => String::new(),
        }
    }

    /// Start reviewing the videos in `folder`.
    pub fn open_folder(&mut self, folder: &Path) -> bool {
        self.current = None;
        match VideoQueue::scan(folder, &self.config) {
            Ok(queue) => {
                self.queue = Some(queue);
                self.load_current()
            }
            Err(e) => {
                self.queue = None;
                self.report(e);
                false
            }
        }
    }

    fn load_current(&mut self) -> bool {
        let Some(paths) = self.queue.as_ref().and_then(VideoQueue::current) else {
            self.current = None;
            self.notifier
                .notify(Severity::Info, "Completed", "All videos have been processed.");
            return false;
        };
        let name = paths.video.display().to_string();
        match LoadedVideo::open(paths) {
            Ok(video) => {
                info!("Loaded video: {}", name);
                self.current = Some(video);
                true
            }
            Err(e) => {
                error!("Error loading data for {}: {}", name, e);
                self.current = None;
                self.report(e);
                false
            }
        }
    }

    /// Merge the comma-separated tracks into the first one.
    pub fn combine(&mut self, input: &str) -> bool {
        self.edit(|engine| {
            let ids = parse_identifiers(input)?;
            engine.combine(&ids)
        })
    }

    pub fn delete(&mut self, input: &str) -> bool {
        self.edit(|engine| {
            let ids = parse_identifiers(input)?;
            engine.delete(&ids)
        })
    }

    pub fn undo(&mut self) -> bool {
        self.edit(ReconciliationEngine::undo)
    }

    fn edit<F>(&mut self, op: F) -> bool
    where
        F: FnOnce(&mut ReconciliationEngine) -> Result<()>,
    {
        let Some(video) = self.current.as_mut().filter(|v| v.engine.is_loaded()) else {
            self.notifier
                .notify(Severity::Warning, "No Track Data", "Please load a track first.");
            return false;
        };
        match op(&mut video.engine) {
            Ok(()) => true,
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Jump the display to where the track first appears.
    pub fn find_track(&mut self, input: &str, surface: &mut dyn FrameSurface) -> Option<TrackLocation> {
        let Some(video) = self.current.as_ref() else {
            self.notifier.notify(
                Severity::Warning,
                "Data Not Loaded",
                "Please load the video and associated data files first.",
            );
            return None;
        };
        let located = input
            .trim()
            .parse::<i64>()
            .map_err(|_| CurateError::InvalidInput("Please enter a valid integer for the track number.".to_string()))
            .and_then(|track| locate_track(&video.summary, &video.coordinates, track));
        match located {
            Ok(loc) => {
                info!("Searching for Track: {}", loc.track);
                surface.show_frame(loc.frame, Some((loc.x, loc.y)));
                Some(loc)
            }
            Err(e) => {
                self.report(e);
                None
            }
        }
    }

    /// Export the current video's results.
    pub fn save(&mut self) -> bool {
        let fraction = self.config.long_track_fraction;
        let Some(video) = self.current.as_mut() else {
            self.notifier
                .notify(Severity::Warning, "No Track Data", "There is no track data to save.");
            return false;
        };
        match video.engine.export(&video.paths.export_stem, fraction) {
            Ok(report) => {
                let message = format!(
                    "Processed data saved to {}.\nMean BBPM {:.1} over {} tracks ({} long tracks).",
                    video.paths.processed_dir.display(),
                    report.all.mean,
                    report.all.n,
                    report.long.n
                );
                self.notifier.notify(Severity::Info, "Save Successful", &message);
                true
            }
            Err(e) => {
                self.report(e);
                false
            }
        }
    }

    /// Export, then open the next video (or report that all are done).
    /// A video whose data could not be loaded is skipped without exporting.
    /// Returns false only when nothing was advanced.
    pub fn save_and_proceed(&mut self) -> bool {
        if self.queue.as_ref().map_or(true, VideoQueue::is_finished) {
            self.notifier
                .notify(Severity::Warning, "No Track Data", "There is no track data to save.");
            return false;
        }
        if self.current.is_some() {
            if !self.save() {
                return false;
            }
        } else {
            let name = self.queue.as_ref().and_then(VideoQueue::current).map(|p| p.base_name);
            warn!("Skipping {} without track data", name.unwrap_or_default());
        }
        self.current = None;
        if let Some(queue) = self.queue.as_mut() {
            queue.advance();
        }
        self.load_current();
        true
    }

    /// Write a results workbook for every line folder under `root`.
    pub fn aggregate(&mut self, root: &Path) -> Vec<PathBuf> {
        match aggregate::aggregate_experiment(root, &self.config) {
            Ok(files) => {
                let message = format!("Data processing complete. {} result files written.", files.len());
                self.notifier.notify(Severity::Info, "Process Complete", &message);
                files
            }
            Err(e) => {
                self.report(e);
                Vec::new()
            }
        }
    }

    fn report(&mut self, err: CurateError) {
        let severity = match err {
            CurateError::NoData | CurateError::NoVideos { .. } => Severity::Warning,
            _ => Severity::Error,
        };
        match severity {
            Severity::Warning => warn!("{}", err),
            _ => error!("{}", err),
        }
        self.notifier.notify(severity, err.title(), &err.to_string());
    }
}
