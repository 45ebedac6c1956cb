// Duplicate detection
//
// Two gates against the store: the raw url before anything is fetched, and the
// content fingerprint after the fetch but before any rendering.

use std::path::Path;
use serde::Serialize;

use crate::db::MetadataStore;
use crate::error::Result;
use crate::hash::compute_fast_hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateReason {
    Url,
    ContentHash,
}

impl DuplicateReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateReason::Url => "url",
            DuplicateReason::ContentHash => "content",
        }
    }
}

/// A reference that was skipped because the store already holds it.
#[derive(Debug, Clone, Serialize)]
pub struct Duplicate {
    pub url: String,
    pub existing_url: String,
    pub reason: DuplicateReason,
}

pub struct DuplicateDetector<'a> {
    store: &'a MetadataStore,
    force: bool,
}

impl<'a> DuplicateDetector<'a> {
    pub fn new(store: &'a MetadataStore, force: bool) -> Self {
        Self { store, force }
    }

    /// Cheap gate. Skipped entirely in force mode so the url is re-rendered.
    pub fn check_url(&self, url: &str) -> Result<Option<Duplicate>> {
        if self.force {
            return Ok(None);
        }
        if self.store.exists_by_url(url)? {
            log::info!("Skipping {}: url already ingested", url);
            return Ok(Some(Duplicate {
                url: url.to_string(),
                existing_url: url.to_string(),
                reason: DuplicateReason::Url,
            }));
        }
        Ok(None)
    }

    /// Content gate. The item's own row only exists in force mode and never counts as a match.
    pub fn check_content(&self, url: &str, content_hash: &str) -> Result<Option<Duplicate>> {
        match self.store.find_content_match(content_hash, url)? {
            Some(existing) => {
                log::info!("Skipping {}: same content as {}", url, existing);
                Ok(Some(Duplicate {
                    url: url.to_string(),
                    existing_url: existing,
                    reason: DuplicateReason::ContentHash,
                }))
            }
            None => Ok(None),
        }
    }

    /// Fingerprint the fetched file, then run the content gate.
    pub fn fingerprint_and_check(&self, url: &str, video_path: &Path) -> Result<(String, Option<Duplicate>)> {
        let content_hash = compute_fast_hash(video_path)?;
        let duplicate = self.check_content(url, &content_hash)?;
        Ok((content_hash, duplicate))
    }
}
