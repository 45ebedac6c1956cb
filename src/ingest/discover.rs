// Batch inputs: links files and local directory walks

use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::constants::{LINK_PREFIXES, VIDEO_EXTENSIONS};
use crate::error::{VidpeekError, Result};

/// One reference per line. Blank lines and `#` comments are ignored; lines that
/// do not look like a url or absolute path are skipped with a warning.
pub fn parse_links(content: &str) -> Vec<String> {
    let mut links = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if LINK_PREFIXES.iter().any(|p| line.starts_with(p)) {
            links.push(line.to_string());
        } else {
            log::warn!("Skipping invalid link on line {}: {}", idx + 1, line);
        }
    }

    links
}

pub fn read_links_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        VidpeekError::InvalidInput(format!("cannot read links file {}: {}", path.display(), e))
    })?;
    Ok(parse_links(&content))
}

/// Discover all video files under a directory (or the single file given)
pub fn discover_videos(source_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if source_path.is_file() {
        if is_video_file(source_path) {
            files.push(source_path.to_path_buf());
        }
    } else if source_path.is_dir() {
        for entry in WalkDir::new(source_path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && is_video_file(path) {
                files.push(path.to_path_buf());
            }
        }
    } else {
        return Err(VidpeekError::NotFound(source_path.display().to_string()));
    }

    // Sort by path for consistent ordering
    files.sort();

    Ok(files)
}

/// Check if a file is a video file based on extension
pub fn is_video_file(path: &Path) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e.to_lowercase(),
        None => return false,
    };

    VIDEO_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_links() {
        let content = "\
# my list
https://www.youtube.com/watch?v=dQw4w9WgXcQ

file:///videos/a.mp4
/videos/b.mov
not a link
  https://youtu.be/aaaaaaaaaaa
";
        let links = parse_links(content);
        assert_eq!(links, vec![
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "file:///videos/a.mp4",
            "/videos/b.mov",
            "https://youtu.be/aaaaaaaaaaa",
        ]);
    }

    #[test]
    fn test_read_links_file_missing() {
        let err = read_links_file(Path::new("/no/such/links.txt")).unwrap_err();
        assert!(matches!(err, VidpeekError::InvalidInput(_)));
    }

    #[test]
    fn test_discover_videos_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        for name in ["b.mp4", "a.MKV", "notes.txt", "sub/c.webm", "sub/c.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = discover_videos(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.MKV", "b.mp4", "sub/c.webm"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        assert!(discover_videos(Path::new("/no/such/dir")).is_err());
    }
}
