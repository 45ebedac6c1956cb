// Ingest pipeline module

pub mod discover;
pub mod pipeline;

use std::fmt;
use serde::Serialize;

use crate::dedup::{Duplicate, DuplicateReason};
use crate::preview::PreviewWindow;
use crate::source::SourceKind;

pub use pipeline::Coordinator;

/// Per-reference progress. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Resolving,
    DuplicateCheck,
    Downloading,
    ContentCheck,
    Extracting,
    Persisting,
    Done,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Resolving => "resolving",
            IngestStage::DuplicateCheck => "duplicate_check",
            IngestStage::Downloading => "downloading",
            IngestStage::ContentCheck => "content_check",
            IngestStage::Extracting => "extracting",
            IngestStage::Persisting => "persisting",
            IngestStage::Done => "done",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference that made it all the way into the store.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedVideo {
    pub id: i64,
    pub url: String,
    pub source: SourceKind,
    pub title: String,
    pub upload_year: Option<i32>,
    pub thumb_path: String,
    pub vid_preview_path: String,
    pub content_hash: String,
    pub window: PreviewWindow,
    pub thumbnail_hint: Option<String>,
    /// An existing row for this url was replaced.
    pub replaced: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    Ingested(IngestedVideo),
    Duplicate(Duplicate),
}

impl IngestOutcome {
    pub fn record_id(&self) -> Option<i64> {
        match self {
            IngestOutcome::Ingested(v) => Some(v.id),
            IngestOutcome::Duplicate(_) => None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate(_))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemResult {
    Ingested { id: i64, url: String },
    Duplicate { existing_url: String, reason: DuplicateReason },
    Failed { stage: IngestStage, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub reference: String,
    #[serde(flatten)]
    pub result: ItemResult,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
    /// Set when a store failure stopped the batch early.
    pub aborted: Option<String>,
    /// References never attempted because the batch aborted.
    pub not_attempted: Vec<String>,
}

impl BatchReport {
    pub fn ingested(&self) -> usize {
        self.items.iter().filter(|i| matches!(i.result, ItemResult::Ingested { .. })).count()
    }

    pub fn duplicates(&self) -> usize {
        self.items.iter().filter(|i| matches!(i.result, ItemResult::Duplicate { .. })).count()
    }

    pub fn failed(&self) -> usize {
        self.items.iter().filter(|i| matches!(i.result, ItemResult::Failed { .. })).count()
    }

    pub fn record_ids(&self) -> Vec<i64> {
        self.items
            .iter()
            .filter_map(|i| match i.result {
                ItemResult::Ingested { id, .. } => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        assert!(IngestStage::Resolving < IngestStage::DuplicateCheck);
        assert!(IngestStage::Downloading < IngestStage::ContentCheck);
        assert!(IngestStage::Persisting < IngestStage::Done);
        assert_eq!(IngestStage::ContentCheck.to_string(), "content_check");
    }

    #[test]
    fn test_batch_counts() {
        let report = BatchReport {
            items: vec![
                ItemReport { reference: "a".into(), result: ItemResult::Ingested { id: 1, url: "a".into() } },
                ItemReport {
                    reference: "b".into(),
                    result: ItemResult::Duplicate { existing_url: "a".into(), reason: DuplicateReason::ContentHash },
                },
                ItemReport {
                    reference: "c".into(),
                    result: ItemResult::Failed { stage: IngestStage::Downloading, error: "x".into() },
                },
            ],
            aborted: None,
            not_attempted: vec![],
        };
        assert_eq!((report.ingested(), report.duplicates(), report.failed()), (1, 1, 1));
        assert_eq!(report.record_ids(), vec![1]);

        let json = serde_json::to_value(&report.items[2]).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["stage"], "downloading");
    }
}
