// Source adapters
//
// A reference (URL or filesystem path) is resolved into a local video file plus
// best-effort metadata. Adapters are a closed set of variants; the registry keeps
// them in dispatch order.

pub mod local;
pub mod remote;

use std::fmt;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::{VidpeekError, Result};

pub use local::LocalSource;
pub use remote::RemoteSource;

/// Value stored in the `source` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Remote,
    Local,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Remote => "remote",
            SourceKind::Local => "local",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = VidpeekError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "remote" => Ok(SourceKind::Remote),
            "local" => Ok(SourceKind::Local),
            other => Err(VidpeekError::InvalidInput(format!("unknown source '{}'", other))),
        }
    }
}

/// A located video plus whatever metadata the source could supply.
#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub local_path: PathBuf,
    /// Published thumbnail location, if the source has one.
    pub thumbnail_hint: Option<String>,
    pub title: String,
    pub description: String,
    pub upload_year: Option<i32>,
}

#[derive(Debug, Clone)]
pub enum VideoSource {
    Remote(RemoteSource),
    Local(LocalSource),
}

impl VideoSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            VideoSource::Remote(_) => SourceKind::Remote,
            VideoSource::Local(_) => SourceKind::Local,
        }
    }

    /// Cheap, offline check of whether this source handles the reference.
    pub fn accepts(&self, reference: &str) -> bool {
        match self {
            VideoSource::Remote(s) => s.accepts(reference),
            VideoSource::Local(s) => s.accepts(reference),
        }
    }

    /// The `url` value a record for this reference is stored under.
    pub fn canonical_reference(&self, reference: &str) -> String {
        match self {
            VideoSource::Remote(s) => s.canonical_reference(reference),
            VideoSource::Local(s) => s.canonical_reference(reference),
        }
    }

    pub fn fetch(&self, reference: &str, workdir: &Path) -> Result<FetchedVideo> {
        match self {
            VideoSource::Remote(s) => s.fetch(reference, workdir),
            VideoSource::Local(s) => s.fetch(reference, workdir),
        }
    }
}

impl From<RemoteSource> for VideoSource {
    fn from(source: RemoteSource) -> Self {
        VideoSource::Remote(source)
    }
}

impl From<LocalSource> for VideoSource {
    fn from(source: LocalSource) -> Self {
        VideoSource::Local(source)
    }
}

/// Named sources in dispatch priority order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    entries: Vec<(String, VideoSource)>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Remote first, then local.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("remote", RemoteSource::default());
        registry.register("local", LocalSource::default());
        registry
    }

    /// Add a source. Re-registering a name replaces it and keeps its position.
    pub fn register(&mut self, name: &str, source: impl Into<VideoSource>) {
        let source = source.into();
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = source,
            None => self.entries.push((name.to_string(), source)),
        }
    }

    /// First registered source accepting the reference.
    pub fn select(&self, reference: &str) -> Result<(&str, &VideoSource)> {
        self.entries
            .iter()
            .find(|(_, source)| source.accepts(reference))
            .map(|(name, source)| (name.as_str(), source))
            .ok_or_else(|| VidpeekError::NoCompatibleSource(reference.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Keep alphanumerics, spaces, dots, dashes and underscores.
pub fn safe_file_stem(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '.' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').replace(' ', "_");
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let registry = SourceRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["remote", "local"]);
    }

    #[test]
    fn test_select_remote_before_local() {
        let registry = SourceRegistry::with_defaults();
        let (name, source) = registry.select("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(name, "remote");
        assert_eq!(source.kind(), SourceKind::Remote);
    }

    #[test]
    fn test_select_local_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").unwrap();

        let registry = SourceRegistry::with_defaults();
        let (name, _) = registry.select(video.to_str().unwrap()).unwrap();
        assert_eq!(name, "local");
    }

    #[test]
    fn test_no_compatible_source() {
        let registry = SourceRegistry::with_defaults();
        let err = registry.select("ftp://example.com/whatever").unwrap_err();
        assert!(matches!(err, VidpeekError::NoCompatibleSource(_)));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let mut registry = SourceRegistry::with_defaults();
        registry.register("remote", LocalSource::with_extensions(&["ogv"]));
        registry.register("archive", LocalSource::default());

        assert_eq!(registry.names(), vec!["remote", "local", "archive"]);
        assert!(registry.select("https://youtu.be/dQw4w9WgXcQ").is_err());
    }

    #[test]
    fn test_source_kind_round_trip() {
        assert_eq!("local".parse::<SourceKind>().unwrap(), SourceKind::Local);
        assert_eq!(SourceKind::Remote.to_string(), "remote");
        assert!("youtube".parse::<SourceKind>().is_err());
    }

    #[test]
    fn test_safe_file_stem() {
        assert_eq!(safe_file_stem("My Video: Part 1/2"), "My_Video_Part_12");
        assert_eq!(safe_file_stem("???"), "video");
        assert_eq!(safe_file_stem("  clip.final "), "clip.final");
    }
}
