// src/session.rs
use crate::config::ReviewConfig;
use crate::engine::CheckpointPaths;
use crate::error::{CurateError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Every file that belongs to one reviewed video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPaths {
    pub folder: PathBuf,
    pub base_name: String,
    pub video: PathBuf,
    /// Tracker's per-track summary (`<base>_tracks.txt`).
    pub summary: PathBuf,
    /// Tracker's per-frame coordinates (`<base>_tracks_raw.txt`).
    pub coordinates: PathBuf,
    pub processed_dir: PathBuf,
    pub checkpoints: CheckpointPaths,
    /// Export workbook stem inside `processed_dir`.
    pub export_stem: PathBuf,
}

impl VideoPaths {
    pub fn new(folder: &Path, video_file: &str, config: &ReviewConfig) -> Self {
        let base_name = video_file
            .strip_suffix(config.video_suffix.as_str())
            .unwrap_or(video_file)
            .to_string();
        let summary_name = format!("{base_name}_tracks.txt");
        let processed_dir = folder.join(&config.processed_dir);

        Self {
            folder: folder.to_path_buf(),
            video: folder.join(video_file),
            summary: folder.join(&summary_name),
            coordinates: folder.join(format!("{base_name}_tracks_raw.txt")),
            checkpoints: CheckpointPaths {
                working: folder.join(format!("{summary_name}.temp.csv")),
                undo: folder.join(format!("{summary_name}.temp_undo.csv")),
                audit_log: processed_dir.join(format!("{base_name}_log.txt")),
            },
            export_stem: processed_dir.join(format!("{base_name}_processed")),
            processed_dir,
            base_name,
        }
    }
}

/// Ordered list of the videos in a folder and the reviewer's position in it.
#[derive(Debug, Clone)]
pub struct VideoQueue {
    folder: PathBuf,
    config: ReviewConfig,
    videos: Vec<String>,
    index: usize,
}

impl VideoQueue {
    pub fn scan(folder: &Path, config: &ReviewConfig) -> Result<Self> {
        let entries = std::fs::read_dir(folder).map_err(|e| CurateError::file_access(folder, e))?;
        let mut videos: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| name.ends_with(config.video_suffix.as_str()))
            .collect();
        videos.sort();

        if videos.is_empty() {
            return Err(CurateError::NoVideos {
                folder: folder.to_path_buf(),
                suffix: config.video_suffix.clone(),
            });
        }
        info!("Found {} videos in {}", videos.len(), folder.display());

        Ok(Self {
            folder: folder.to_path_buf(),
            config: config.clone(),
            videos,
            index: 0,
        })
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn video_names(&self) -> &[String] {
        &self.videos
    }

    pub fn current(&self) -> Option<VideoPaths> {
        self.videos
            .get(self.index)
            .map(|name| VideoPaths::new(&self.folder, name, &self.config))
    }

    /// Move to the next video; `false` once every video has been visited.
    pub fn advance(&mut self) -> bool {
        if self.index < self.videos.len() {
            self.index += 1;
        }
        self.index < self.videos.len()
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.videos.len()
    }

    pub fn status(&self) -> String {
        if self.is_finished() {
            "All videos have been processed.".to_string()
        } else {
            format!("(Video {} of {})", self.index + 1, self.videos.len())
        }
    }
}
