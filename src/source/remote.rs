// Remote (YouTube-style) source
//
// fetch() runs an accessibility check (HTTP HEAD, then a metadata-only yt-dlp probe)
// before committing to a download, so private/removed/blocked videos fail fast.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate};
use regex::Regex;
use serde::Deserialize;

use crate::constants::{ACCESS_CHECK_TIMEOUT_SECS, REMOTE_MAX_HEIGHT, VIDEO_EXTENSIONS};
use crate::error::{VidpeekError, Result};
use crate::source::{safe_file_stem, FetchedVideo};
use crate::tools::Tool;

static REMOTE_URL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(https?://)?(www\.|m\.)?youtube\.com/watch\?(.*&)?v=[\w-]{11}",
        r"^(https?://)?(www\.|m\.)?youtube\.com/shorts/[\w-]{11}",
        r"^(https?://)?youtu\.be/[\w-]{11}",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Subset of the `yt-dlp --dump-single-json` payload. Everything is optional
/// because older videos may lack metadata.
#[derive(Debug, Default, Deserialize)]
pub struct RemoteVideoInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub fulltitle: Option<String>,
    pub description: Option<String>,
    pub upload_date: Option<String>,
    #[serde(default)]
    pub release_timestamp: Option<i64>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    #[serde(default)]
    pub is_live: Option<bool>,
    pub availability: Option<String>,
}

impl RemoteVideoInfo {
    pub fn upload_year(&self) -> Option<i32> {
        self.upload_date
            .as_deref()
            .and_then(parse_upload_year)
            .or_else(|| {
                self.release_timestamp
                    .and_then(|ts| DateTime::from_timestamp(ts, 0))
                    .map(|dt| dt.year())
            })
    }

    pub fn display_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.fulltitle.clone())
            .or_else(|| self.id.clone())
            .unwrap_or_else(|| "video".to_string())
    }

    /// Reasons the video cannot be downloaded even though metadata resolved.
    pub fn blocking_reason(&self) -> Option<String> {
        if self.is_live == Some(true) {
            return Some("live stream is not accessible".to_string());
        }
        match self.availability.as_deref() {
            Some("private") => Some("video is private".to_string()),
            Some(a @ ("needs_auth" | "subscriber_only" | "premium_only")) => {
                Some(format!("login required ({})", a))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemoteSource {
    pub check_access: bool,
    pub head_timeout: Duration,
    pub max_height: u32,
}

impl Default for RemoteSource {
    fn default() -> Self {
        Self {
            check_access: true,
            head_timeout: Duration::from_secs(ACCESS_CHECK_TIMEOUT_SECS),
            max_height: REMOTE_MAX_HEIGHT,
        }
    }
}

impl RemoteSource {
    /// Format-only check; no network.
    pub fn accepts(&self, reference: &str) -> bool {
        is_valid_remote_url(reference.trim())
    }

    pub fn canonical_reference(&self, reference: &str) -> String {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!("https://{}", reference)
        }
    }

    pub fn fetch(&self, reference: &str, workdir: &Path) -> Result<FetchedVideo> {
        let url = self.canonical_reference(reference);

        if self.check_access {
            self.check_reachable(&url)?;
        }
        let info = probe_info(&url)?;
        if let Some(reason) = info.blocking_reason() {
            log::warn!("{} is not accessible: {}", url, reason);
            return Err(VidpeekError::NotAccessible(format!("{}: {}", url, reason)));
        }

        let title = info.display_title();
        let local_path = self.download(&url, &safe_file_stem(&title), workdir)?;

        Ok(FetchedVideo {
            local_path,
            thumbnail_hint: info.thumbnail.clone(),
            title,
            description: info.description.clone().unwrap_or_default(),
            upload_year: info.upload_year(),
        })
    }

    /// HEAD request with redirects followed; anything but 200 is a refusal.
    fn check_reachable(&self, url: &str) -> Result<()> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.head_timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| VidpeekError::Other(format!("http client: {}", e)))?;

        let response = client
            .head(url)
            .send()
            .map_err(|e| VidpeekError::NotAccessible(format!("{}: connection failed: {}", url, e)))?;

        if response.status() != reqwest::StatusCode::OK {
            log::warn!("HTTP {} for {}", response.status(), url);
            return Err(VidpeekError::NotAccessible(format!(
                "{}: HTTP {}", url, response.status()
            )));
        }
        Ok(())
    }

    fn download(&self, url: &str, stem: &str, workdir: &Path) -> Result<PathBuf> {
        let format = format!(
            "bv*[height<={h}]+ba/b[height<={h}]/b",
            h = self.max_height
        );
        let template = workdir.join(format!("{}.%(ext)s", stem));

        log::info!("Downloading {} into {}", url, workdir.display());
        let output = Command::new(Tool::YtDlp.path())
            .args([
                "-f", &format,
                "--merge-output-format", "mp4",
                "--no-playlist",
                "--no-warnings",
                "--no-progress",
                "--print", "after_move:filepath",
                "--no-simulate",
                "-o",
            ])
            .arg(&template)
            .arg(url)
            .output()
            .map_err(|e| VidpeekError::Tool(format!("Failed to run yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidpeekError::DownloadFailed(format!("{}: {}", url, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let printed = stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .last()
            .map(PathBuf::from)
            .filter(|p| p.is_file());

        printed
            .or_else(|| find_downloaded(workdir))
            .ok_or_else(|| VidpeekError::DownloadFailed(format!("{}: no output file", url)))
    }
}

pub fn is_valid_remote_url(reference: &str) -> bool {
    REMOTE_URL_PATTERNS.iter().any(|re| re.is_match(reference))
}

/// Metadata-only probe. Failures here mean the content is unreachable.
pub fn probe_info(url: &str) -> Result<RemoteVideoInfo> {
    let output = Command::new(Tool::YtDlp.path())
        .args([
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--no-playlist",
        ])
        .arg(url)
        .output()
        .map_err(|e| VidpeekError::Tool(format!("Failed to run yt-dlp: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = classify_probe_error(&stderr);
        log::warn!("{} is not accessible: {}", url, reason);
        return Err(VidpeekError::NotAccessible(format!("{}: {}", url, reason)));
    }

    let info: RemoteVideoInfo = serde_json::from_slice(&output.stdout)?;
    Ok(info)
}

/// Map yt-dlp error text onto a short reason.
pub fn classify_probe_error(stderr: &str) -> String {
    let lower = stderr.to_lowercase();
    let reason = if lower.contains("private video") {
        "video is private"
    } else if lower.contains("confirm your age") || lower.contains("age-restricted") {
        "age-restricted content (login required)"
    } else if lower.contains("available in your country") || lower.contains("geo restrict") {
        "blocked in this region"
    } else if lower.contains("live event") || lower.contains("is live") {
        "live stream is not accessible"
    } else if lower.contains("video unavailable") || lower.contains("has been removed") {
        "video unavailable (deleted or private)"
    } else {
        return stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("unknown error")
            .trim()
            .to_string();
    };
    reason.to_string()
}

/// `YYYYMMDD` → year.
pub fn parse_upload_year(upload_date: &str) -> Option<i32> {
    NaiveDate::parse_from_str(upload_date.trim(), "%Y%m%d")
        .ok()
        .map(|d| d.year())
}

fn find_downloaded(workdir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(workdir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                    .unwrap_or(false)
        })
}
