// src/video.rs - On-demand frame extraction through ffprobe/ffmpeg
use anyhow::{Context, Result};
use image::DynamicImage;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

const CACHE_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    pub total_frames: usize,
}

/// Parse `ffprobe -of csv=p=0` output for `width,height,r_frame_rate,nb_frames`.
pub fn parse_probe(output: &str) -> Result<VideoInfo> {
    let parts: Vec<&str> = output.trim().split(',').map(str::trim).collect();
    if parts.len() < 4 {
        return Err(anyhow::anyhow!("Invalid video format or corrupted file"));
    }

    let width = parts[0]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid video width"))?;
    let height = parts[1]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid video height"))?;
    let fps = parse_frame_rate(parts[2])?;
    let total_frames: usize = parts[3]
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid frame count"))?;

    if total_frames == 0 {
        return Err(anyhow::anyhow!("Video has no frames"));
    }

    Ok(VideoInfo {
        width,
        height,
        fps,
        total_frames,
    })
}

/// `30000/1001` or `25`.
pub fn parse_frame_rate(text: &str) -> Result<f32> {
    match text.split_once('/') {
        Some((num, den)) => {
            let num: f32 = num.parse().unwrap_or(30.0);
            let den: f32 = den.parse().unwrap_or(1.0);
            if den == 0.0 {
                return Err(anyhow::anyhow!("Invalid frame rate format"));
            }
            Ok(num / den)
        }
        None => Ok(text.parse().unwrap_or(30.0)),
    }
}

/// Reads single frames of a video file, caching the decoded images.
pub struct VideoFileReader {
    path: PathBuf,
    info: VideoInfo,
    temp_dir: PathBuf,
    cache: HashMap<usize, DynamicImage>,
}

impl VideoFileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(anyhow::anyhow!("Video file does not exist: {}", path.display()));
        }

        if Command::new("ffprobe").arg("-version").output().is_err() {
            return Err(anyhow::anyhow!(
                "FFmpeg is not installed or not in PATH. Please install FFmpeg to view videos."
            ));
        }

        let output = Command::new("ffprobe")
            .args(["-v", "error", "-select_streams", "v:0", "-count_frames"])
            .args(["-show_entries", "stream=width,height,r_frame_rate,nb_read_frames"])
            .args(["-of", "csv=p=0"])
            .arg(&path)
            .output()
            .context("Failed to run ffprobe")?;
        let info = parse_probe(&String::from_utf8_lossy(&output.stdout))
            .with_context(|| format!("Cannot read {}", path.display()))?;

        let temp_dir = std::env::temp_dir().join(format!("swim_curator_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).context("Cannot create temporary directory")?;

        info!(
            "Opened {} ({}x{}, {} frames at {:.2} fps)",
            path.display(),
            info.width,
            info.height,
            info.total_frames,
            info.fps
        );

        Ok(Self {
            path,
            info,
            temp_dir,
            cache: HashMap::new(),
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    pub fn total_frames(&self) -> usize {
        self.info.total_frames
    }

    /// Decoded frame at zero-based position `index` (clamped to the last frame).
    pub fn frame(&mut self, index: usize) -> Result<&DynamicImage> {
        let index = index.min(self.info.total_frames.saturating_sub(1));
        if !self.cache.contains_key(&index) {
            let image = self.extract(index)?;
            if self.cache.len() >= CACHE_LIMIT {
                self.cache.clear();
            }
            self.cache.insert(index, image);
        }
        self.cache
            .get(&index)
            .ok_or_else(|| anyhow::anyhow!("Frame {} not cached", index))
    }

    fn extract(&self, index: usize) -> Result<DynamicImage> {
        let out = self.temp_dir.join(format!("frame_{:06}.png", index));
        debug!("Extracting frame {} of {}", index, self.path.display());

        let status = Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-i"])
            .arg(&self.path)
            .args(["-vf", &format!("select=eq(n\\,{})", index)])
            .args(["-vsync", "0", "-frames:v", "1"])
            .arg(&out)
            .status()
            .context("Failed to extract frame with ffmpeg")?;

        if !status.success() {
            return Err(anyhow::anyhow!("FFmpeg could not extract frame {}", index));
        }

        let image = image::open(&out).with_context(|| format!("Failed to decode frame {}", index))?;
        let _ = fs::remove_file(&out);
        Ok(image)
    }
}

impl Drop for VideoFileReader {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.temp_dir) {
            warn!("Could not remove {}: {}", self.temp_dir.display(), e);
        }
    }
}
