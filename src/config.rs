// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// File name suffix that marks a reviewable video.
    pub video_suffix: String,
    /// Subfolder (next to the videos) receiving logs and exports.
    pub processed_dir: String,
    /// Tracks longer than this fraction of the longest track count as long tracks.
    pub long_track_fraction: f64,
    /// Columns shown in the track table.
    pub display_columns: Vec<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            video_suffix: "_labels_compressed.AVI".to_string(),
            processed_dir: "tracks_processed".to_string(),
            long_track_fraction: 0.5,
            display_columns: ["#Frames", "1stFrame", "time(s)", "Bends", "BBPS"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl ReviewConfig {
    /// Platform config location, e.g. `~/.config/swimcurator/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "swimcurator", "swimcurator")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from the platform location, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&text) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring unreadable configuration {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
