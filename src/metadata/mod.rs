// Media probing module

pub mod ffprobe;

use serde::{Deserialize, Serialize};

/// Stream properties read from a fetched video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub duration_ms: Option<i64>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub fps: Option<f64>,
    pub codec: Option<String>,
    pub has_video: bool,
}

impl MediaMetadata {
    /// Duration in seconds, if the container reported one.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_ms.map(|ms| ms as f64 / 1000.0)
    }
}
