// Preview pipeline module
//
// Picks a representative window of a video and renders:
// - Preview: short muted looping clip (MP4 or GIF) into previews/
// - Thumbnail: JPG still of the window's first frame into thumbnails/
//
// Both artifacts are rendered to temporary siblings and only renamed into
// place once both exist and are non-empty.

pub mod clip;
pub mod thumb;

use std::path::{Path, PathBuf};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::{PipelineConfig, PreviewFormat};
use crate::constants::THUMB_FORMAT;
use crate::error::{VidpeekError, Result};
use crate::source::safe_file_stem;

/// Time range of the source rendered into the preview, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PreviewWindow {
    pub start: f64,
    pub duration: f64,
}

impl PreviewWindow {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Select the window to render.
///
/// A fraction `margin` of the video is skipped at each end to avoid intros and
/// credits. When the remaining middle cannot hold `preview_len`, the window starts
/// at 0 and covers as much as is available. Otherwise the start is uniform over
/// every position that keeps the whole window inside the middle region.
pub fn select_window<R: Rng + ?Sized>(
    total_duration: f64,
    preview_len: f64,
    margin: f64,
    rng: &mut R,
) -> Result<PreviewWindow> {
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Err(VidpeekError::Encode(format!(
            "invalid video duration: {}", total_duration
        )));
    }

    let lead = total_duration * margin;
    let tail = total_duration - lead;

    if tail - lead < preview_len {
        return Ok(PreviewWindow {
            start: 0.0,
            duration: preview_len.min(total_duration),
        });
    }

    let latest_start = tail - preview_len;
    let start = if latest_start > lead {
        rng.gen_range(lead..=latest_start)
    } else {
        lead
    };

    Ok(PreviewWindow { start, duration: preview_len })
}

/// Encoder knobs shared by the clip and still renderers.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub width: u32,
    pub format: PreviewFormat,
    pub gif_fps: u32,
}

impl RenderSettings {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            width: config.encode_width(),
            format: config.preview_format,
            gif_fps: config.gif_fps,
        }
    }
}

/// Media backend used by the extractor.
pub trait Renderer {
    /// Total duration of the video in seconds.
    fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    fn render_clip(
        &self,
        video_path: &Path,
        window: &PreviewWindow,
        settings: &RenderSettings,
        output_path: &Path,
    ) -> Result<()>;

    fn render_still(
        &self,
        video_path: &Path,
        at_seconds: f64,
        settings: &RenderSettings,
        output_path: &Path,
    ) -> Result<()>;
}

/// Renderer backed by the ffprobe/ffmpeg binaries.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRenderer;

impl Renderer for FfmpegRenderer {
    fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        let meta = crate::metadata::ffprobe::probe(video_path)?;
        if !meta.has_video {
            return Err(VidpeekError::Encode(format!(
                "no video stream in {}", video_path.display()
            )));
        }
        meta.duration_seconds().ok_or_else(|| {
            VidpeekError::FFprobe(format!("no duration reported for {}", video_path.display()))
        })
    }

    fn render_clip(
        &self,
        video_path: &Path,
        window: &PreviewWindow,
        settings: &RenderSettings,
        output_path: &Path,
    ) -> Result<()> {
        clip::render_clip(video_path, window, settings, output_path)
    }

    fn render_still(
        &self,
        video_path: &Path,
        at_seconds: f64,
        settings: &RenderSettings,
        output_path: &Path,
    ) -> Result<()> {
        thumb::render_still(video_path, at_seconds, settings, output_path)
    }
}

/// Final locations of a rendered preview.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewArtifacts {
    pub preview_path: PathBuf,
    pub thumbnail_path: PathBuf,
    pub window: PreviewWindow,
    pub format: PreviewFormat,
}

/// Removes every tracked path on drop unless disarmed.
struct PartialOutputs {
    paths: Vec<PathBuf>,
}

impl PartialOutputs {
    fn new() -> Self {
        Self { paths: Vec::new() }
    }

    fn track(&mut self, path: &Path) {
        self.paths.push(path.to_path_buf());
    }

    /// Remove one tracked path now.
    fn discard(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
        remove_partial(path);
    }

    fn disarm(mut self) {
        self.paths.clear();
    }
}

fn remove_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Could not remove partial output {}: {}", path.display(), e);
        }
    }
}

/// Keep the real extension last so ffmpeg picks the right muxer.
fn preview_tmp_path(preview_path: &Path, format: PreviewFormat) -> PathBuf {
    preview_path.with_extension(format!("tmp.{}", format.extension()))
}

impl Drop for PartialOutputs {
    fn drop(&mut self) {
        for path in &self.paths {
            remove_partial(path);
        }
    }
}

pub struct PreviewExtractor<R: Renderer> {
    renderer: R,
    previews_dir: PathBuf,
    thumbnails_dir: PathBuf,
    preview_seconds: f64,
    margin_fraction: f64,
    settings: RenderSettings,
    rng: StdRng,
}

impl<R: Renderer> PreviewExtractor<R> {
    pub fn new(renderer: R, config: &PipelineConfig) -> Self {
        Self {
            renderer,
            previews_dir: config.previews_dir(),
            thumbnails_dir: config.thumbnails_dir(),
            preview_seconds: config.preview_seconds,
            margin_fraction: config.margin_fraction,
            settings: RenderSettings::from_config(config),
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed seed for reproducible window selection.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        if !video_path.exists() {
            return Err(VidpeekError::SourceMissing(video_path.display().to_string()));
        }
        self.renderer.probe_duration(video_path)
    }

    /// Artifact stem derived from the video's file name.
    pub fn extract(&mut self, video_path: &Path, total_duration: f64) -> Result<PreviewArtifacts> {
        let stem = video_path
            .file_stem()
            .map(|s| safe_file_stem(&s.to_string_lossy()))
            .unwrap_or_else(|| "video".to_string());
        self.extract_named(video_path, total_duration, &stem)
    }

    pub fn preview_path_for(&self, stem: &str) -> PathBuf {
        self.preview_path_in(stem, self.settings.format)
    }

    fn preview_path_in(&self, stem: &str, format: PreviewFormat) -> PathBuf {
        self.previews_dir
            .join(format!("{}_preview.{}", stem, format.extension()))
    }

    pub fn thumbnail_path_for(&self, stem: &str) -> PathBuf {
        self.thumbnails_dir.join(format!("{}.{}", stem, THUMB_FORMAT))
    }

    /// Render both artifacts for `video_path` under `stem`.
    ///
    /// An MP4 preview that fails to encode is retried once as a GIF; the returned
    /// `format` is whichever one was written.
    pub fn extract_named(
        &mut self,
        video_path: &Path,
        total_duration: f64,
        stem: &str,
    ) -> Result<PreviewArtifacts> {
        if !video_path.exists() {
            return Err(VidpeekError::SourceMissing(video_path.display().to_string()));
        }

        let window = select_window(
            total_duration,
            self.preview_seconds,
            self.margin_fraction,
            &mut self.rng,
        )?;
        log::debug!(
            "Preview window for {}: {:.2}s..{:.2}s of {:.2}s",
            video_path.display(), window.start, window.end(), total_duration
        );

        std::fs::create_dir_all(&self.previews_dir)?;
        std::fs::create_dir_all(&self.thumbnails_dir)?;

        let thumbnail_path = self.thumbnail_path_for(stem);
        let thumbnail_tmp = thumbnail_path.with_extension(format!("tmp.{}", THUMB_FORMAT));

        let mut partial = PartialOutputs::new();
        partial.track(&thumbnail_tmp);

        let (format, preview_tmp) = self.render_preview(video_path, &window, stem, &mut partial)?;

        self.renderer
            .render_still(video_path, window.start, &self.settings, &thumbnail_tmp)
            .map_err(|e| self.classify_failure(video_path, e))?;
        ensure_non_empty(&thumbnail_tmp)?;

        // Atomic renames. A final path that already existed belongs to a committed
        // row and must survive a failure here.
        let preview_path = self.preview_path_in(stem, format);
        let preview_existed = preview_path.exists();
        std::fs::rename(&preview_tmp, &preview_path)?;
        if !preview_existed {
            partial.track(&preview_path);
        }
        std::fs::rename(&thumbnail_tmp, &thumbnail_path)?;
        partial.disarm();

        Ok(PreviewArtifacts {
            preview_path,
            thumbnail_path,
            window,
            format,
        })
    }

    /// Clip into a tmp sibling of its final path, falling back from MP4 to GIF on an encoder failure.
    fn render_preview(
        &self,
        video_path: &Path,
        window: &PreviewWindow,
        stem: &str,
        partial: &mut PartialOutputs,
    ) -> Result<(PreviewFormat, PathBuf)> {
        let primary = self.settings.format;
        let primary_tmp = preview_tmp_path(&self.preview_path_in(stem, primary), primary);
        partial.track(&primary_tmp);

        let err = match self.render_clip_to(video_path, window, &self.settings, &primary_tmp) {
            Ok(()) => return Ok((primary, primary_tmp)),
            Err(e) => e,
        };
        if primary != PreviewFormat::Mp4 || !matches!(err, VidpeekError::Encode(_)) {
            return Err(err);
        }

        log::warn!("MP4 preview failed for {}, falling back to GIF: {}", video_path.display(), err);
        partial.discard(&primary_tmp);

        let fallback = RenderSettings { format: PreviewFormat::Gif, ..self.settings.clone() };
        let gif_tmp = preview_tmp_path(&self.preview_path_in(stem, PreviewFormat::Gif), PreviewFormat::Gif);
        partial.track(&gif_tmp);
        self.render_clip_to(video_path, window, &fallback, &gif_tmp)?;
        Ok((PreviewFormat::Gif, gif_tmp))
    }

    fn render_clip_to(
        &self,
        video_path: &Path,
        window: &PreviewWindow,
        settings: &RenderSettings,
        output_path: &Path,
    ) -> Result<()> {
        self.renderer
            .render_clip(video_path, window, settings, output_path)
            .map_err(|e| self.classify_failure(video_path, e))?;
        ensure_non_empty(output_path)
    }

    /// A vanished source is reported as such rather than as an encoder failure.
    fn classify_failure(&self, video_path: &Path, err: VidpeekError) -> VidpeekError {
        if !video_path.exists() {
            VidpeekError::SourceMissing(video_path.display().to_string())
        } else {
            err
        }
    }
}

fn ensure_non_empty(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        Ok(_) => Err(VidpeekError::Encode(format!("{} is empty", path.display()))),
        Err(_) => Err(VidpeekError::Encode(format!("{} was not created", path.display()))),
    }
}
