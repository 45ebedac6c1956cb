// Pipeline configuration
//
// Built from defaults, optionally loaded from a JSON file, then overridden by CLI flags.
// Passed to the Coordinator at construction; nothing reads it from global state.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DB_FILENAME, DEFAULT_MARGIN_FRACTION, DEFAULT_PREVIEW_SECONDS, DEFAULT_TARGET_WIDTH,
    MIN_TARGET_WIDTH, PREVIEWS_FOLDER, PREVIEW_GIF_FPS, TEMP_VIDEOS_FOLDER, THUMBNAILS_FOLDER,
};
use crate::error::{VidpeekError, Result};

/// Container produced for the looping preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PreviewFormat {
    #[default]
    Mp4,
    Gif,
}

impl PreviewFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreviewFormat::Mp4 => "mp4",
            PreviewFormat::Gif => "gif",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl std::str::FromStr for PreviewFormat {
    type Err = VidpeekError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(PreviewFormat::Mp4),
            "gif" => Ok(PreviewFormat::Gif),
            other => Err(VidpeekError::Config(format!("unknown preview format '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root of the file store (temp_videos/, thumbnails/, previews/).
    pub output_dir: PathBuf,
    /// Database file; defaults to `<output_dir>/videos.db`.
    pub db_path: Option<PathBuf>,
    pub preview_seconds: f64,
    pub margin_fraction: f64,
    pub target_width: u32,
    pub gif_fps: u32,
    pub preview_format: PreviewFormat,
    /// Re-render and upsert even when the url is already stored.
    pub force_reprocess: bool,
    /// Delete artifacts of a replaced row when nothing else references them.
    pub reclaim_replaced_artifacts: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            db_path: None,
            preview_seconds: DEFAULT_PREVIEW_SECONDS,
            margin_fraction: DEFAULT_MARGIN_FRACTION,
            target_width: DEFAULT_TARGET_WIDTH,
            gif_fps: PREVIEW_GIF_FPS,
            preview_format: PreviewFormat::Mp4,
            force_reprocess: false,
            reclaim_replaced_artifacts: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| VidpeekError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: PipelineConfig = serde_json::from_str(&text)
            .map_err(|e| VidpeekError::Config(format!("invalid config {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.preview_seconds.is_finite() && self.preview_seconds > 0.0) {
            return Err(VidpeekError::Config(format!(
                "preview_seconds must be positive, got {}", self.preview_seconds
            )));
        }
        if !(0.0..0.5).contains(&self.margin_fraction) {
            return Err(VidpeekError::Config(format!(
                "margin_fraction must be in [0, 0.5), got {}", self.margin_fraction
            )));
        }
        if self.target_width < MIN_TARGET_WIDTH {
            return Err(VidpeekError::Config(format!(
                "target_width must be at least {}, got {}", MIN_TARGET_WIDTH, self.target_width
            )));
        }
        if self.gif_fps == 0 {
            return Err(VidpeekError::Config("gif_fps must be positive".to_string()));
        }
        Ok(())
    }

    /// H.264 needs even dimensions.
    pub fn encode_width(&self) -> u32 {
        self.target_width - (self.target_width % 2)
    }

    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.output_dir.join(DB_FILENAME))
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.output_dir.join(TEMP_VIDEOS_FOLDER)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.output_dir.join(THUMBNAILS_FOLDER)
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.output_dir.join(PREVIEWS_FOLDER)
    }

    /// Create the file store layout.
    pub fn init_folders(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::create_dir_all(self.temp_dir())?;
        std::fs::create_dir_all(self.thumbnails_dir())?;
        std::fs::create_dir_all(self.previews_dir())?;
        Ok(())
    }
}
