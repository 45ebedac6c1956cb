// Thumbnail generation
//
// Single JPG still taken at the start of the preview window.

use std::path::Path;
use std::process::Command;

use crate::constants::THUMB_QUALITY;
use crate::error::{VidpeekError, Result};
use crate::preview::RenderSettings;
use crate::tools::Tool;

/// FFmpeg quality scale is 1-31 where 1 is best
pub fn jpeg_q_value(quality: u32) -> u32 {
    let quality = quality.min(100);
    ((100 - quality) as f32 / 100.0 * 30.0 + 1.0) as u32
}

/// Extract one frame at `at_seconds` into `output_path`.
pub fn render_still(
    source_path: &Path,
    at_seconds: f64,
    settings: &RenderSettings,
    output_path: &Path,
) -> Result<()> {
    let seek_time = format_duration(at_seconds.max(0.0));
    let scale_filter = format!("scale={}:-2", settings.width);
    let q_value = jpeg_q_value(THUMB_QUALITY);

    let mut cmd = Command::new(Tool::Ffmpeg.path());
    cmd.args(["-y", "-v", "error", "-ss", &seek_time, "-i"])
        .arg(source_path)
        .args(["-frames:v", "1", "-vf", &scale_filter, "-q:v", &q_value.to_string()])
        .arg(output_path);

    let output = cmd
        .output()
        .map_err(|e| VidpeekError::Tool(format!("Failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidpeekError::Encode(format!(
            "ffmpeg thumbnail generation failed: {}", stderr.trim()
        )));
    }

    Ok(())
}

/// Format seconds as HH:MM:SS.mmm for ffmpeg.
/// Rounds to whole milliseconds first so a value just under a minute never prints as `:60.000`.
pub fn format_duration(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let ms = total_ms % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
}
