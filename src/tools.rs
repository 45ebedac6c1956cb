// External binaries vidpeek shells out to
//
// Lookup per tool: its VIDPEEK_*_PATH override, then next to the running
// executable or in a bin/ folder beside it, then whatever PATH yields.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    YtDlp,
}

impl Tool {
    /// Needed for every item; yt-dlp only matters for remote references.
    pub const REQUIRED: [Tool; 2] = [Tool::Ffmpeg, Tool::Ffprobe];

    pub fn binary(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::YtDlp => "yt-dlp",
        }
    }

    pub fn env_key(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "VIDPEEK_FFMPEG_PATH",
            Tool::Ffprobe => "VIDPEEK_FFPROBE_PATH",
            Tool::YtDlp => "VIDPEEK_YTDLP_PATH",
        }
    }

    fn version_flag(self) -> &'static str {
        match self {
            Tool::YtDlp => "--version",
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
        }
    }

    pub fn path(self) -> PathBuf {
        locate(self.env_key(), self.binary())
    }

    /// A resolved file counts as present; a bare name has to answer its version flag.
    pub fn is_available(self) -> bool {
        let path = self.path();
        if path.is_file() {
            return true;
        }
        Command::new(&path)
            .arg(self.version_flag())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// The subset of `tools` that cannot be run.
pub fn missing_tools(tools: &[Tool]) -> Vec<Tool> {
    tools.iter().copied().filter(|t| !t.is_available()).collect()
}

fn locate(env_key: &str, binary: &str) -> PathBuf {
    if let Some(value) = env::var_os(env_key) {
        let path = PathBuf::from(&value);
        if path.is_file() {
            return path;
        }
        log::warn!("{} is set to {}, which does not exist", env_key, path.display());
    }

    let file_name = if cfg!(windows) {
        format!("{}.exe", binary)
    } else {
        binary.to_string()
    };

    bundled_candidates(&file_name)
        .into_iter()
        .find(|p| p.is_file())
        .unwrap_or_else(|| PathBuf::from(binary))
}

fn bundled_candidates(file_name: &str) -> Vec<PathBuf> {
    let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(PathBuf::from)) else {
        return Vec::new();
    };
    vec![dir.join(file_name), dir.join("bin").join(file_name)]
}
