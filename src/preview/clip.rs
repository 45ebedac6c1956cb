// Looping preview clip generation
//
// Muted, downscaled excerpt of the selected window. MP4 (H.264) by default,
// animated GIF with a generated palette when configured.

use std::path::Path;
use std::process::Command;

use crate::config::PreviewFormat;
use crate::constants::PREVIEW_CRF;
use crate::error::{VidpeekError, Result};
use crate::preview::thumb::format_duration;
use crate::preview::{PreviewWindow, RenderSettings};
use crate::tools::Tool;

/// Build the ffmpeg argument list for a preview clip.
pub fn clip_args(
    source_path: &Path,
    window: &PreviewWindow,
    settings: &RenderSettings,
    output_path: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-v".into(), "error".into(),
        // Seek before input (faster)
        "-ss".into(), format_duration(window.start),
        "-t".into(), format!("{:.3}", window.duration),
        "-i".into(), source_path.to_string_lossy().to_string(),
        "-an".into(),
    ];

    match settings.format {
        PreviewFormat::Mp4 => {
            args.extend([
                "-vf".into(), format!("scale={}:-2", settings.width),
                "-c:v".into(), "libx264".into(),
                "-preset".into(), "medium".into(),
                "-crf".into(), PREVIEW_CRF.to_string(),
                "-pix_fmt".into(), "yuv420p".into(),
                "-movflags".into(), "+faststart".into(),
            ]);
        }
        PreviewFormat::Gif => {
            let filter = format!(
                "fps={},scale={}:-1:flags=lanczos,split[a][b];[a]palettegen[p];[b][p]paletteuse",
                settings.gif_fps, settings.width
            );
            args.extend([
                "-filter_complex".into(), filter,
                "-loop".into(), "0".into(),
            ]);
        }
    }

    args.push(output_path.to_string_lossy().to_string());
    args
}

/// Render the window into `output_path`. The caller owns tmp naming and rename.
pub fn render_clip(
    source_path: &Path,
    window: &PreviewWindow,
    settings: &RenderSettings,
    output_path: &Path,
) -> Result<()> {
    let output = Command::new(Tool::Ffmpeg.path())
        .args(clip_args(source_path, window, settings, output_path))
        .output()
        .map_err(|e| VidpeekError::Tool(format!("Failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(VidpeekError::Encode(format!(
            "ffmpeg preview generation failed: {}", stderr.trim()
        )));
    }

    Ok(())
}
