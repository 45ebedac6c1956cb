// Local file source
//
// Uses the file in place. Metadata comes from an optional `<stem>.txt` sidecar:
// first line title, a `year: N` line, everything else description.

use std::path::{Path, PathBuf};

use crate::constants::{SIDECAR_EXTENSION, VIDEO_EXTENSIONS};
use crate::error::{VidpeekError, Result};
use crate::source::FetchedVideo;

const FILE_SCHEME: &str = "file://";

#[derive(Debug, Clone)]
pub struct LocalSource {
    extensions: Vec<String>,
}

impl Default for LocalSource {
    fn default() -> Self {
        Self::with_extensions(&VIDEO_EXTENSIONS)
    }
}

/// Metadata parsed from a sidecar text file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SidecarInfo {
    pub title: Option<String>,
    pub description: String,
    pub upload_year: Option<i32>,
}

impl LocalSource {
    pub fn with_extensions(extensions: &[&str]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|ext| ext.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// `file://` references are always ours; bare paths need a known extension.
    pub fn accepts(&self, reference: &str) -> bool {
        let reference = reference.trim();
        if reference.starts_with(FILE_SCHEME) {
            return true;
        }
        if reference.contains("://") {
            return false;
        }
        let path = Path::new(reference);
        path.is_file() && self.has_supported_extension(path)
    }

    /// Absolute, symlink-free path when the file exists.
    pub fn canonical_reference(&self, reference: &str) -> String {
        let path = strip_file_scheme(reference);
        let resolved = path
            .canonicalize()
            .or_else(|_| std::path::absolute(&path))
            .unwrap_or(path);
        resolved.to_string_lossy().to_string()
    }

    pub fn fetch(&self, reference: &str, _workdir: &Path) -> Result<FetchedVideo> {
        let path = strip_file_scheme(reference);
        if !path.is_file() {
            log::error!("Video file not found: {}", path.display());
            return Err(VidpeekError::NotFound(path.display().to_string()));
        }
        if !self.has_supported_extension(&path) {
            return Err(VidpeekError::InvalidInput(format!(
                "unsupported container: {}", path.display()
            )));
        }
        // Readability check; the extractor opens it again later
        std::fs::File::open(&path)
            .map_err(|e| VidpeekError::NotFound(format!("{}: {}", path.display(), e)))?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());

        let sidecar = match find_sidecar(&path) {
            Some(sidecar_path) => {
                log::debug!("Reading sidecar {}", sidecar_path.display());
                let bytes = std::fs::read(&sidecar_path)?;
                parse_sidecar(&String::from_utf8_lossy(&bytes))
            }
            None => SidecarInfo::default(),
        };

        Ok(FetchedVideo {
            local_path: path.canonicalize().unwrap_or(path),
            thumbnail_hint: None,
            title: sidecar.title.unwrap_or(stem),
            description: sidecar.description,
            upload_year: sidecar.upload_year,
        })
    }
}

fn strip_file_scheme(reference: &str) -> PathBuf {
    let reference = reference.trim();
    PathBuf::from(reference.strip_prefix(FILE_SCHEME).unwrap_or(reference))
}

/// `<stem>.txt` (or `.TXT`) next to the video.
pub fn find_sidecar(video_path: &Path) -> Option<PathBuf> {
    let stem = video_path.file_stem()?.to_str()?;
    let parent = video_path.parent()?;

    [SIDECAR_EXTENSION.to_string(), SIDECAR_EXTENSION.to_uppercase()]
        .iter()
        .map(|ext| parent.join(format!("{}.{}", stem, ext)))
        .find(|p| p.is_file())
}

pub fn parse_sidecar(content: &str) -> SidecarInfo {
    let content = content.trim();
    let mut lines = content.lines();

    let title = lines
        .next()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    let mut upload_year = None;
    let mut rest = Vec::new();
    for line in lines {
        let lower = line.trim_start().to_lowercase();
        if let Some(value) = lower.strip_prefix("year:") {
            // Invalid year values are dropped, not kept as description
            if let Ok(year) = value.trim().parse::<i32>() {
                upload_year = Some(year);
            }
        } else {
            rest.push(line);
        }
    }

    SidecarInfo {
        title,
        description: rest.join("\n").trim().to_string(),
        upload_year,
    }
}
