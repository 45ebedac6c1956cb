// Vidpeek Constants
// Defaults for PipelineConfig and on-disk layout. Changing folder names breaks existing stores.

// Hashing
pub const HASH_ALGORITHM: &str = "blake3";
pub const HASH_CHUNK_SIZE: usize = 1_048_576; // 1MB
pub const HASH_FAST_SCHEME: &str = "first_last_size_v1";

// Paths
pub const PATH_DB_SEPARATOR: char = '/';
pub const DB_FILENAME: &str = "videos.db";
pub const TEMP_VIDEOS_FOLDER: &str = "temp_videos";
pub const THUMBNAILS_FOLDER: &str = "thumbnails";
pub const PREVIEWS_FOLDER: &str = "previews";

// Preview window
pub const DEFAULT_PREVIEW_SECONDS: f64 = 7.0;
pub const DEFAULT_MARGIN_FRACTION: f64 = 0.10;
pub const DEFAULT_TARGET_WIDTH: u32 = 320;
pub const MIN_TARGET_WIDTH: u32 = 16;

// Preview encoding
pub const PREVIEW_CRF: u32 = 28;
pub const PREVIEW_GIF_FPS: u32 = 10;

// Thumbnail settings
pub const THUMB_FORMAT: &str = "jpg";
pub const THUMB_QUALITY: u32 = 85;

// Remote sources
pub const ACCESS_CHECK_TIMEOUT_SECS: u64 = 10;
pub const REMOTE_MAX_HEIGHT: u32 = 720;

// Artifact stems carry this many hex chars of the content fingerprint
pub const STEM_HASH_CHARS: usize = 12;

// Local sources: sidecar metadata file next to the video
pub const SIDECAR_EXTENSION: &str = "txt";

// Video extensions accepted by the local source
pub const VIDEO_EXTENSIONS: [&str; 10] = [
    "mp4", "avi", "mov", "mkv", "webm", "flv", "wmv", "m4v", "mpg", "mpeg",
];

// Links files: accepted line prefixes
pub const LINK_PREFIXES: [&str; 3] = ["http", "file://", "/"];
