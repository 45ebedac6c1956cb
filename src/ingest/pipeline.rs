// Pipeline coordinator
//
// resolve -> url check -> fetch -> content check -> render -> persist, one reference
// at a time. Each reference gets its own scoped directory under temp_videos/ that is
// removed on every exit path. A row is written only after both artifacts exist.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::constants::PATH_DB_SEPARATOR;
use crate::db::schema::{NewVideo, ReplacedArtifacts};
use crate::db::MetadataStore;
use crate::dedup::DuplicateDetector;
use crate::error::{VidpeekError, Result};
use crate::hash::short_tag;
use crate::ingest::{BatchReport, IngestOutcome, IngestStage, IngestedVideo, ItemReport, ItemResult};
use crate::preview::{FfmpegRenderer, PreviewExtractor, Renderer};
use crate::source::{safe_file_stem, SourceRegistry, VideoSource};

pub struct Coordinator<R: Renderer = FfmpegRenderer> {
    config: PipelineConfig,
    store: MetadataStore,
    sources: SourceRegistry,
    extractor: PreviewExtractor<R>,
}

impl Coordinator<FfmpegRenderer> {
    /// Open (or create) the store at `config.db_path()` with the default sources.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_renderer(config, FfmpegRenderer)
    }
}

impl<R: Renderer> Coordinator<R> {
    pub fn with_renderer(config: PipelineConfig, renderer: R) -> Result<Self> {
        config.validate()?;
        let store = MetadataStore::open(&config.db_path())?;
        Self::with_store(config, store, renderer)
    }

    pub fn with_store(config: PipelineConfig, store: MetadataStore, renderer: R) -> Result<Self> {
        config.validate()?;
        config.init_folders()?;
        let extractor = PreviewExtractor::new(renderer, &config);
        Ok(Self {
            config,
            store,
            sources: SourceRegistry::with_defaults(),
            extractor,
        })
    }

    /// Reproducible preview windows.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.extractor = self.extractor.with_seed(seed);
        self
    }

    /// Add or replace a named source. New names go last in dispatch order.
    pub fn register_source(&mut self, name: &str, source: impl Into<VideoSource>) {
        self.sources.register(name, source);
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Ingest one reference for `user`.
    pub fn process(&mut self, reference: &str, user: &str) -> Result<IngestOutcome> {
        self.process_tracked(reference, user).map_err(|(_, e)| e)
    }

    /// Ingest references in order. Per-item failures are recorded and the batch
    /// continues; a store failure stops it.
    pub fn process_batch<I, S>(&mut self, references: I, user: &str) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut references = references.into_iter();

        for reference in references.by_ref() {
            let reference = reference.as_ref().trim().to_string();
            if !seen.insert(reference.clone()) {
                log::warn!("Skipping repeated reference {}", reference);
                continue;
            }

            let result = match self.process_tracked(&reference, user) {
                Ok(IngestOutcome::Ingested(video)) => ItemResult::Ingested { id: video.id, url: video.url },
                Ok(IngestOutcome::Duplicate(dup)) => ItemResult::Duplicate {
                    existing_url: dup.existing_url,
                    reason: dup.reason,
                },
                Err((stage, e)) => {
                    let fatal = e.is_fatal();
                    report.items.push(ItemReport {
                        reference: reference.clone(),
                        result: ItemResult::Failed { stage, error: e.to_string() },
                    });
                    if fatal {
                        log::error!("Store failure, aborting batch: {}", e);
                        report.aborted = Some(e.to_string());
                        break;
                    }
                    continue;
                }
            };
            report.items.push(ItemReport { reference, result });
        }

        if report.is_aborted() {
            report.not_attempted = references
                .map(|r| r.as_ref().trim().to_string())
                .collect();
        }

        log::info!(
            "Batch complete: {} ingested, {} duplicates, {} failed",
            report.ingested(), report.duplicates(), report.failed()
        );
        report
    }

    fn process_tracked(
        &mut self,
        reference: &str,
        user: &str,
    ) -> std::result::Result<IngestOutcome, (IngestStage, VidpeekError)> {
        let mut stage = IngestStage::Resolving;
        match self.run_stages(reference, user, &mut stage) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("Failed to process {} during {}: {}", reference, stage, e);
                Err((stage, e))
            }
        }
    }

    fn run_stages(&mut self, reference: &str, user: &str, stage: &mut IngestStage) -> Result<IngestOutcome> {
        let user = user.trim();
        if user.is_empty() {
            return Err(VidpeekError::InvalidInput("user must not be empty".to_string()));
        }

        let (source_name, source) = self.sources.select(reference)?;
        let source = source.clone();
        let url = source.canonical_reference(reference);
        log::info!("Processing {} with {} source", url, source_name);

        advance(stage, IngestStage::DuplicateCheck);
        if let Some(dup) = self.detector().check_url(&url)? {
            advance(stage, IngestStage::Done);
            return Ok(IngestOutcome::Duplicate(dup));
        }

        advance(stage, IngestStage::Downloading);
        // Dropped (and deleted) on every return path below
        let workdir = tempfile::Builder::new()
            .prefix("item-")
            .tempdir_in(self.config.temp_dir())?;
        let fetched = source.fetch(reference, workdir.path())?;

        advance(stage, IngestStage::ContentCheck);
        let (content_hash, duplicate) = self.detector().fingerprint_and_check(&url, &fetched.local_path)?;
        if let Some(dup) = duplicate {
            advance(stage, IngestStage::Done);
            return Ok(IngestOutcome::Duplicate(dup));
        }

        advance(stage, IngestStage::Extracting);
        let duration = self.extractor.probe_duration(&fetched.local_path)?;
        let stem = artifact_stem(&fetched.local_path, &content_hash);
        let artifacts = self.extractor.extract_named(&fetched.local_path, duration, &stem)?;

        advance(stage, IngestStage::Persisting);
        let thumb_path = self.relative_path(&artifacts.thumbnail_path);
        let vid_preview_path = self.relative_path(&artifacts.preview_path);
        let record = NewVideo {
            user: user.to_string(),
            url: url.clone(),
            source: source.kind(),
            title: fetched.title.clone(),
            description: fetched.description.clone(),
            thumb_path: thumb_path.clone(),
            vid_preview_path: vid_preview_path.clone(),
            upload_year: fetched.upload_year,
            content_hash: Some(content_hash.clone()),
            preview_type: artifacts.format.as_str().to_string(),
        };

        let upserted = match self.store.upsert(&record) {
            Ok(result) => result,
            Err(e) => {
                self.discard_unreferenced(&[thumb_path.as_str(), vid_preview_path.as_str()]);
                return Err(e);
            }
        };

        let replaced = upserted.replaced.is_some();
        if let Some(old) = upserted.replaced {
            self.reclaim_replaced(&old, &thumb_path, &vid_preview_path);
        }

        advance(stage, IngestStage::Done);
        log::info!("Ingested {} as record {}", url, upserted.id);

        Ok(IngestOutcome::Ingested(IngestedVideo {
            id: upserted.id,
            url,
            source: source.kind(),
            title: fetched.title,
            upload_year: fetched.upload_year,
            thumb_path,
            vid_preview_path,
            content_hash,
            window: artifacts.window,
            thumbnail_hint: fetched.thumbnail_hint,
            replaced,
        }))
    }

    fn detector(&self) -> DuplicateDetector<'_> {
        DuplicateDetector::new(&self.store, self.config.force_reprocess)
    }

    /// Store-relative path with `/` separators.
    fn relative_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.config.output_dir).unwrap_or(path);
        let separator = PATH_DB_SEPARATOR.to_string();
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join(separator.as_str())
    }

    fn absolute_path(&self, rel_path: &str) -> PathBuf {
        self.config.output_dir.join(rel_path)
    }

    /// Delete artifacts of a replaced row that nothing references any more.
    fn reclaim_replaced(&self, old: &ReplacedArtifacts, new_thumb: &str, new_preview: &str) {
        if !self.config.reclaim_replaced_artifacts {
            return;
        }
        let stale: Vec<&str> = [old.thumb_path.as_deref(), old.vid_preview_path.as_deref()]
            .into_iter()
            .flatten()
            .filter(|p| *p != new_thumb && *p != new_preview)
            .collect();
        self.discard_unreferenced(&stale);
    }

    fn discard_unreferenced(&self, rel_paths: &[&str]) {
        for rel in rel_paths {
            match self.store.artifact_references(rel) {
                Ok(0) => {
                    let path = self.absolute_path(rel);
                    if path.exists() {
                        match std::fs::remove_file(&path) {
                            Ok(()) => log::debug!("Removed unreferenced artifact {}", path.display()),
                            Err(e) => log::warn!("Could not remove {}: {}", path.display(), e),
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => log::warn!("Keeping {}: reference check failed: {}", rel, e),
            }
        }
    }
}

fn advance(stage: &mut IngestStage, next: IngestStage) {
    debug_assert!(next > *stage, "stage {} cannot follow {}", next, stage);
    *stage = next;
}

/// Base file name plus a fingerprint tag, so two different files with the same
/// name never share artifacts while the same file always maps to the same names.
fn artifact_stem(video_path: &Path, content_hash: &str) -> String {
    let base = video_path
        .file_stem()
        .map(|s| safe_file_stem(&s.to_string_lossy()))
        .unwrap_or_else(|| "video".to_string());
    format!("{}_{}", base, short_tag(content_hash))
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
