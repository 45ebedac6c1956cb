// Coordinator tests: local sources on disk, stub renderer instead of ffmpeg.

use super::*;
use crate::config::PreviewFormat;
use crate::db::schema::VideoFilter;
use crate::dedup::DuplicateReason;
use crate::preview::{PreviewWindow, RenderSettings};
use crate::source::LocalSource;
use std::cell::Cell;
use tempfile::TempDir;

/// Writes fixed bytes instead of encoding.
struct StubRenderer {
    duration: f64,
    fail_clip: bool,
    failing_format: Option<PreviewFormat>,
    delete_source_on_probe: bool,
    clip_calls: Cell<usize>,
    last_window: Cell<Option<PreviewWindow>>,
}

impl Default for StubRenderer {
    fn default() -> Self {
        Self {
            duration: 30.0,
            fail_clip: false,
            failing_format: None,
            delete_source_on_probe: false,
            clip_calls: Cell::new(0),
            last_window: Cell::new(None),
        }
    }
}

impl Renderer for StubRenderer {
    fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        if self.delete_source_on_probe {
            std::fs::remove_file(video_path)?;
        }
        Ok(self.duration)
    }

    fn render_clip(&self, _video: &Path, window: &PreviewWindow, s: &RenderSettings, out: &Path) -> Result<()> {
        self.clip_calls.set(self.clip_calls.get() + 1);
        self.last_window.set(Some(*window));
        if self.fail_clip || self.failing_format == Some(s.format) {
            std::fs::write(out, b"partial")?;
            return Err(VidpeekError::Encode("stub encoder failure".to_string()));
        }
        std::fs::write(out, b"preview bytes")?;
        Ok(())
    }

    fn render_still(&self, _video: &Path, _at: f64, _s: &RenderSettings, out: &Path) -> Result<()> {
        std::fs::write(out, b"jpeg bytes")?;
        Ok(())
    }
}

struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("media")).unwrap();
        Self { tmp }
    }

    fn output_dir(&self) -> PathBuf {
        self.tmp.path().join("out")
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::with_output_dir(self.output_dir())
    }

    fn video(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.tmp.path().join("media").join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn coordinator(&self, renderer: StubRenderer) -> Coordinator<StubRenderer> {
        self.coordinator_with(self.config(), renderer)
    }

    fn coordinator_with(&self, config: PipelineConfig, renderer: StubRenderer) -> Coordinator<StubRenderer> {
        Coordinator::with_renderer(config, renderer).unwrap().with_seed(11)
    }

    fn dir_entries(&self, folder: &str) -> usize {
        std::fs::read_dir(self.output_dir().join(folder)).unwrap().count()
    }
}

fn ingested(outcome: IngestOutcome) -> IngestedVideo {
    match outcome {
        IngestOutcome::Ingested(video) => video,
        IngestOutcome::Duplicate(dup) => panic!("expected ingest, got duplicate of {}", dup.existing_url),
    }
}

fn assert_rows_have_artifacts(coord: &Coordinator<StubRenderer>) {
    for row in coord.store().list(&VideoFilter::default()).unwrap() {
        let thumb = row.thumb_path.expect("thumb_path");
        let preview = row.vid_preview_path.expect("vid_preview_path");
        assert!(coord.config().output_dir.join(&thumb).is_file(), "missing {}", thumb);
        assert!(coord.config().output_dir.join(&preview).is_file(), "missing {}", preview);
    }
}

// ---------------------------------------------------------------
// End-to-end: clip.mp4 with a "Demo" sidecar, ingested by alice
// ---------------------------------------------------------------
#[test]
fn test_local_clip_end_to_end() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"thirty seconds of clip");
    std::fs::write(clip.with_extension("txt"), "Demo\n").unwrap();

    let mut coord = fx.coordinator(StubRenderer::default());
    let video = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());

    let record = coord.store().get(video.id).unwrap().unwrap();
    assert_eq!(record.user, "alice");
    assert_eq!(record.title.as_deref(), Some("Demo"));
    assert_eq!(record.upload_year, None);
    assert_eq!(record.source.as_deref(), Some("local"));
    assert_eq!(record.preview_type.as_deref(), Some("mp4"));
    assert!(record.content_hash.as_deref().unwrap().starts_with("blake3:"));
    assert!(!record.thumb_path.as_deref().unwrap().is_empty());
    assert!(record.vid_preview_path.as_deref().unwrap().starts_with("previews/"));
    assert_rows_have_artifacts(&coord);

    // Re-run with the identical file adds no row
    let again = coord.process(clip.to_str().unwrap(), "alice").unwrap();
    assert!(again.is_duplicate());
    assert_eq!(coord.store().count().unwrap(), 1);
    assert_eq!(coord.extractor.renderer().clip_calls.get(), 1);
}

#[test]
fn test_file_scheme_and_plain_path_share_a_url() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let mut coord = fx.coordinator(StubRenderer::default());

    coord.process(clip.to_str().unwrap(), "alice").unwrap();
    let second = coord.process(&format!("file://{}", clip.display()), "alice").unwrap();

    match second {
        IngestOutcome::Duplicate(dup) => assert_eq!(dup.reason, DuplicateReason::Url),
        other => panic!("expected url duplicate, got {:?}", other),
    }
}

// ---------------------------------------------------------------
// Idempotence: forced re-ingest of the same url upserts one row
// ---------------------------------------------------------------
#[test]
fn test_forced_reingest_upserts() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let config = PipelineConfig { force_reprocess: true, ..fx.config() };
    let mut coord = fx.coordinator_with(config, StubRenderer::default());

    let first = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    let second = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());

    assert!(!first.replaced);
    assert!(second.replaced);
    assert_eq!(first.thumb_path, second.thumb_path);
    assert_eq!(coord.store().count().unwrap(), 1);
    assert_eq!(fx.dir_entries("previews"), 1);
    assert_rows_have_artifacts(&coord);
}

// ---------------------------------------------------------------
// Same bytes behind two urls: only the first is rendered
// ---------------------------------------------------------------
#[test]
fn test_content_duplicate_across_urls() {
    let fx = Fixture::new();
    let a = fx.video("holiday.mp4", b"identical video bytes");
    let b = fx.video("holiday-copy.mkv", b"identical video bytes");

    let mut coord = fx.coordinator(StubRenderer::default());
    let first = ingested(coord.process(a.to_str().unwrap(), "alice").unwrap());

    match coord.process(b.to_str().unwrap(), "bob").unwrap() {
        IngestOutcome::Duplicate(dup) => {
            assert_eq!(dup.reason, DuplicateReason::ContentHash);
            assert_eq!(dup.existing_url, first.url);
        }
        other => panic!("expected content duplicate, got {:?}", other),
    }

    assert_eq!(coord.store().count().unwrap(), 1);
    assert_eq!(coord.extractor.renderer().clip_calls.get(), 1);
    assert_eq!(fx.dir_entries("previews"), 1);
    assert_eq!(fx.dir_entries("thumbnails"), 1);
}

#[test]
fn test_same_name_different_content_keeps_both() {
    let fx = Fixture::new();
    std::fs::create_dir_all(fx.tmp.path().join("media/other")).unwrap();
    let a = fx.video("clip.mp4", b"first clip");
    let b = fx.video("other/clip.mp4", b"second clip");

    let mut coord = fx.coordinator(StubRenderer::default());
    let va = ingested(coord.process(a.to_str().unwrap(), "alice").unwrap());
    let vb = ingested(coord.process(b.to_str().unwrap(), "alice").unwrap());

    assert_ne!(va.vid_preview_path, vb.vid_preview_path);
    assert_rows_have_artifacts(&coord);
}

// ---------------------------------------------------------------
// Failures leave no row, no artifacts, no working files
// ---------------------------------------------------------------
#[test]
fn test_encode_failure_leaves_nothing() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let renderer = StubRenderer { fail_clip: true, ..Default::default() };
    let mut coord = fx.coordinator(renderer);

    let err = coord.process(clip.to_str().unwrap(), "alice").unwrap_err();
    assert!(matches!(err, VidpeekError::Encode(_)));
    assert_eq!(coord.store().count().unwrap(), 0);
    assert_eq!(fx.dir_entries("previews"), 0);
    assert_eq!(fx.dir_entries("thumbnails"), 0);
    assert_eq!(fx.dir_entries("temp_videos"), 0);
}

#[test]
fn test_mp4_encoder_failure_stores_gif_preview() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let renderer = StubRenderer { failing_format: Some(PreviewFormat::Mp4), ..Default::default() };
    let mut coord = fx.coordinator(renderer);

    let video = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    assert!(video.vid_preview_path.ends_with("_preview.gif"));

    let record = coord.store().get(video.id).unwrap().unwrap();
    assert_eq!(record.preview_type.as_deref(), Some("gif"));
    assert_eq!(fx.dir_entries("previews"), 1);
    assert_rows_have_artifacts(&coord);
}

#[test]
fn test_source_vanishing_before_render() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let renderer = StubRenderer { delete_source_on_probe: true, ..Default::default() };
    let mut coord = fx.coordinator(renderer);

    let err = coord.process(clip.to_str().unwrap(), "alice").unwrap_err();
    assert!(matches!(err, VidpeekError::SourceMissing(_)));
    assert_eq!(coord.store().count().unwrap(), 0);
}

#[test]
fn test_working_dir_removed_after_success() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let mut coord = fx.coordinator(StubRenderer::default());

    coord.process(clip.to_str().unwrap(), "alice").unwrap();
    assert_eq!(fx.dir_entries("temp_videos"), 0);
    // Local files are used in place
    assert!(clip.exists());
}

#[test]
fn test_missing_local_file() {
    let fx = Fixture::new();
    let mut coord = fx.coordinator(StubRenderer::default());
    let err = coord.process("file:///no/such/clip.mp4", "alice").unwrap_err();
    assert!(matches!(err, VidpeekError::NotFound(_)));
}

#[test]
fn test_unknown_reference() {
    let fx = Fixture::new();
    let mut coord = fx.coordinator(StubRenderer::default());
    let err = coord.process("gopher://example.org/film", "alice").unwrap_err();
    assert!(matches!(err, VidpeekError::NoCompatibleSource(_)));
}

#[test]
fn test_empty_user_rejected() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let mut coord = fx.coordinator(StubRenderer::default());
    let err = coord.process(clip.to_str().unwrap(), "  ").unwrap_err();
    assert!(matches!(err, VidpeekError::InvalidInput(_)));
}

// ---------------------------------------------------------------
// Preview window
// ---------------------------------------------------------------
#[test]
fn test_short_video_degrades_to_full_duration() {
    let fx = Fixture::new();
    let clip = fx.video("short.mp4", b"bytes");
    let renderer = StubRenderer { duration: 3.0, ..Default::default() };
    let mut coord = fx.coordinator(renderer);

    let video = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    assert_eq!(video.window, PreviewWindow { start: 0.0, duration: 3.0 });
    assert_eq!(coord.extractor.renderer().last_window.get(), Some(video.window));
}

#[test]
fn test_long_video_window_inside_margins() {
    let fx = Fixture::new();
    let clip = fx.video("long.mp4", b"bytes");
    let renderer = StubRenderer { duration: 120.0, ..Default::default() };
    let mut coord = fx.coordinator(renderer);

    let video = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    assert!(video.window.start >= 12.0);
    assert!(video.window.end() <= 108.0);
    assert_eq!(video.window.duration, 7.0);
}

// ---------------------------------------------------------------
// Batches
// ---------------------------------------------------------------
#[test]
fn test_batch_isolates_failures() {
    let fx = Fixture::new();
    let a = fx.video("a.mp4", b"aaa");
    let b = fx.video("b.mp4", b"bbb");
    let refs = vec![
        a.to_string_lossy().to_string(),
        "file:///no/such/clip.mp4".to_string(),
        "gopher://example.org/film".to_string(),
        b.to_string_lossy().to_string(),
        a.to_string_lossy().to_string(),
    ];

    let mut coord = fx.coordinator(StubRenderer::default());
    let report = coord.process_batch(&refs, "alice");

    assert!(!report.is_aborted());
    assert_eq!(report.ingested(), 2);
    assert_eq!(report.failed(), 2);
    // Repeated reference is attempted once
    assert_eq!(report.items.len(), 4);
    match &report.items[1].result {
        ItemResult::Failed { stage, .. } => assert_eq!(*stage, IngestStage::Downloading),
        other => panic!("unexpected {:?}", other),
    }
    match &report.items[2].result {
        ItemResult::Failed { stage, .. } => assert_eq!(*stage, IngestStage::Resolving),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(coord.store().count().unwrap(), 2);
}

#[test]
fn test_batch_aborts_on_store_failure() {
    let fx = Fixture::new();
    let a = fx.video("a.mp4", b"aaa");
    let b = fx.video("b.mp4", b"bbb");
    let c = fx.video("c.mp4", b"ccc");

    let mut coord = fx.coordinator(StubRenderer::default());
    coord.store().conn().execute_batch("DROP TABLE videos").unwrap();

    let refs = [a, b, c].map(|p| p.to_string_lossy().to_string());
    let report = coord.process_batch(&refs, "alice");

    assert!(report.is_aborted());
    assert_eq!(report.items.len(), 1);
    match &report.items[0].result {
        ItemResult::Failed { stage, .. } => assert_eq!(*stage, IngestStage::DuplicateCheck),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(report.not_attempted, refs[1..].to_vec());
    assert_eq!(coord.extractor.renderer().clip_calls.get(), 0);
}

#[test]
fn test_batch_aborts_when_insert_is_rejected() {
    let fx = Fixture::new();
    let a = fx.video("a.mp4", b"aaa");
    let b = fx.video("b.mp4", b"bbb");

    let mut coord = fx.coordinator(StubRenderer::default());
    coord.store().conn().execute_batch(
        "CREATE TRIGGER reject_videos BEFORE INSERT ON videos BEGIN SELECT RAISE(ABORT, 'x'); END;",
    ).unwrap();

    let refs = [a, b].map(|p| p.to_string_lossy().to_string());
    let report = coord.process_batch(&refs, "alice");

    assert!(report.is_aborted());
    assert_eq!(report.items.len(), 1);
    match &report.items[0].result {
        ItemResult::Failed { stage, .. } => assert_eq!(*stage, IngestStage::Persisting),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(report.not_attempted, vec![refs[1].clone()]);

    // The first item rendered both artifacts before the insert failed
    assert_eq!(coord.extractor.renderer().clip_calls.get(), 1);
    assert_eq!(fx.dir_entries("previews"), 0);
    assert_eq!(fx.dir_entries("thumbnails"), 0);
    assert_eq!(coord.store().count().unwrap(), 0);
}

// ---------------------------------------------------------------
// Replaced artifacts
// ---------------------------------------------------------------
#[test]
fn test_replaced_artifacts_are_reclaimed() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"version one");
    let config = PipelineConfig { force_reprocess: true, ..fx.config() };
    let mut coord = fx.coordinator_with(config, StubRenderer::default());

    let first = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    std::fs::write(&clip, b"version two, re-exported").unwrap();
    let second = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());

    let out = fx.output_dir();
    assert_ne!(first.vid_preview_path, second.vid_preview_path);
    assert!(!out.join(&first.vid_preview_path).exists());
    assert!(!out.join(&first.thumb_path).exists());
    assert!(out.join(&second.vid_preview_path).exists());
    assert_eq!(coord.store().count().unwrap(), 1);
}

#[test]
fn test_reclaim_can_be_disabled() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"version one");
    let config = PipelineConfig {
        force_reprocess: true,
        reclaim_replaced_artifacts: false,
        ..fx.config()
    };
    let mut coord = fx.coordinator_with(config, StubRenderer::default());

    let first = ingested(coord.process(clip.to_str().unwrap(), "alice").unwrap());
    std::fs::write(&clip, b"version two").unwrap();
    coord.process(clip.to_str().unwrap(), "alice").unwrap();

    assert!(fx.output_dir().join(&first.vid_preview_path).exists());
}

// ---------------------------------------------------------------
// Source registration
// ---------------------------------------------------------------
#[test]
fn test_registered_source_replaces_default() {
    let fx = Fixture::new();
    let clip = fx.video("clip.mp4", b"bytes");
    let mut coord = fx.coordinator(StubRenderer::default());

    coord.register_source("local", LocalSource::with_extensions(&["ogv"]));
    assert_eq!(coord.sources().names(), vec!["remote", "local"]);

    let err = coord.process(clip.to_str().unwrap(), "alice").unwrap_err();
    assert!(matches!(err, VidpeekError::NoCompatibleSource(_)));
}

// ---------------------------------------------------------------
// Legacy store without content_hash
// ---------------------------------------------------------------
#[test]
fn test_legacy_store_is_migrated_and_used() {
    let fx = Fixture::new();
    let config = fx.config();
    std::fs::create_dir_all(&config.output_dir).unwrap();
    {
        let conn = rusqlite::Connection::open(config.db_path()).unwrap();
        conn.execute_batch(
            "CREATE TABLE videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                url TEXT UNIQUE,
                source TEXT,
                title TEXT,
                description TEXT,
                thumb_path TEXT,
                vid_preview_path TEXT,
                upload_year INTEGER,
                date_added TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO videos (user, url, source, title) VALUES ('bob', 'https://youtu.be/aaaaaaaaaaa', 'youtube', 'Old');",
        ).unwrap();
    }

    let a = fx.video("a.mp4", b"same bytes");
    let b = fx.video("b.mp4", b"same bytes");
    let mut coord = fx.coordinator_with(config, StubRenderer::default());

    ingested(coord.process(a.to_str().unwrap(), "alice").unwrap());
    assert!(coord.process(b.to_str().unwrap(), "alice").unwrap().is_duplicate());
    assert_eq!(coord.store().count().unwrap(), 2);
}
