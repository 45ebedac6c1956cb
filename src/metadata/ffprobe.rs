// FFprobe wrapper for duration and stream info

use std::path::Path;
use std::process::Command;
use serde::Deserialize;
use crate::error::{VidpeekError, Result};
use crate::metadata::MediaMetadata;
use crate::tools::Tool;

#[derive(Debug, Deserialize)]
struct FFprobeOutput {
    streams: Option<Vec<FFprobeStream>>,
    format: Option<FFprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FFprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<i32>,
    height: Option<i32>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FFprobeFormat {
    duration: Option<String>,
}

/// Run ffprobe on a file and extract metadata
pub fn probe(path: &Path) -> Result<MediaMetadata> {
    if !path.exists() {
        return Err(VidpeekError::SourceMissing(path.display().to_string()));
    }

    let output = Command::new(Tool::Ffprobe.path())
        .args([
            "-v", "quiet",
            "-print_format", "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| VidpeekError::Tool(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidpeekError::FFprobe(format!("ffprobe failed: {}", stderr)));
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> Result<MediaMetadata> {
    let probe_output: FFprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| VidpeekError::FFprobe(format!("Failed to parse ffprobe output: {}", e)))?;

    let mut meta = MediaMetadata::default();

    if let Some(ref streams) = probe_output.streams {
        if let Some(stream) = streams.iter().find(|s| s.codec_type.as_deref() == Some("video")) {
            meta.has_video = true;
            meta.codec = stream.codec_name.clone();
            meta.width = stream.width;
            meta.height = stream.height;
            meta.fps = parse_frame_rate(stream.r_frame_rate.as_deref());
            meta.duration_ms = parse_duration_ms(stream.duration.as_deref());
        }
    }

    // Container duration is more reliable than per-stream for most muxers
    if let Some(ref format) = probe_output.format {
        if let Some(ms) = parse_duration_ms(format.duration.as_deref()) {
            meta.duration_ms = Some(ms);
        }
    }

    Ok(meta)
}

/// Parse frame rate string like "30000/1001" to f64
fn parse_frame_rate(rate_str: Option<&str>) -> Option<f64> {
    let rate_str = rate_str?;
    if let Some((num, den)) = rate_str.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    rate_str.parse().ok()
}

/// Parse duration string to milliseconds
fn parse_duration_ms(duration_str: Option<&str>) -> Option<i64> {
    let duration_str = duration_str?;
    let seconds: f64 = duration_str.parse().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    Some((seconds * 1000.0) as i64)
}
