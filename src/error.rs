// Vidpeek Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VidpeekError {
    #[error("No compatible source for reference: {0}")]
    NoCompatibleSource(String),

    #[error("Not accessible: {0}")]
    NotAccessible(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Source video missing: {0}")]
    SourceMissing(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("Database schema version {found} is newer than this build supports (max {supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("FFprobe error: {0}")]
    FFprobe(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Hash error: {0}")]
    Hash(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl VidpeekError {
    /// Errors that mean the store itself is unusable. A batch stops on these.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VidpeekError::Persistence(_) | VidpeekError::SchemaTooNew { .. })
    }
}

impl From<anyhow::Error> for VidpeekError {
    fn from(err: anyhow::Error) -> Self {
        VidpeekError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VidpeekError>;
