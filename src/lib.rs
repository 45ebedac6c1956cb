// vidpeek - video ingestion and preview library

pub mod config;
pub mod constants;
pub mod db;
pub mod dedup;
pub mod error;
pub mod hash;
pub mod ingest;
pub mod metadata;
pub mod preview;
pub mod source;
pub mod tools;

pub use config::{PipelineConfig, PreviewFormat};
pub use db::MetadataStore;
pub use db::schema::{VideoFilter, VideoRecord};
pub use error::{VidpeekError, Result};
pub use ingest::{BatchReport, Coordinator, IngestOutcome, IngestStage, IngestedVideo};
pub use preview::{FfmpegRenderer, PreviewExtractor, Renderer};
pub use source::{LocalSource, RemoteSource, SourceKind, SourceRegistry, VideoSource};
