//! Remote source download.

use std::path::{Path, PathBuf};
use std::process::Command;

use clipforge_common::error::{ClipforgeError, ClipforgeResult};

use crate::engine::command_exists;

/// Format selection passed to yt-dlp: best mp4 video plus m4a audio,
/// falling back to the best single file.
pub const YTDLP_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best";

/// Downloads a source video to local disk.
pub trait SourceFetcher: Send + Sync {
    /// Returns the path of the downloaded file inside `dest_dir`.
    fn fetch(&self, url: &str, dest_dir: &Path) -> ClipforgeResult<PathBuf>;

    fn is_available(&self) -> bool;
}

/// Shells out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
        }
    }
}

impl YtDlpFetcher {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl SourceFetcher for YtDlpFetcher {
    fn fetch(&self, url: &str, dest_dir: &Path) -> ClipforgeResult<PathBuf> {
        let id = video_id_from_url(url)?;
        std::fs::create_dir_all(dest_dir)?;
        let dest = dest_dir.join(format!("{id}.mp4"));

        tracing::info!(url, dest = %dest.display(), "Downloading source");
        let output = Command::new(&self.binary)
            .args(ytdlp_args(url, &dest))
            .output()
            .map_err(|e| ClipforgeError::fetch(format!("Failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            return Err(ClipforgeError::fetch(format!(
                "yt-dlp failed for {url}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        if !dest.is_file() {
            return Err(ClipforgeError::fetch(format!(
                "yt-dlp reported success but {} is missing",
                dest.display()
            )));
        }
        Ok(dest)
    }

    fn is_available(&self) -> bool {
        command_exists(&self.binary)
    }
}

/// Last path segment of `url`, query string and fragment removed.
pub fn video_id_from_url(url: &str) -> ClipforgeResult<String> {
    let without_query = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let id = without_query.rsplit('/').next().unwrap_or_default();

    if id.is_empty() || id.contains(':') {
        return Err(ClipforgeError::fetch(format!(
            "cannot derive a video id from {url:?}"
        )));
    }
    Ok(id.to_string())
}

/// yt-dlp arguments for downloading `url` to `dest`.
pub fn ytdlp_args(url: &str, dest: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        YTDLP_FORMAT.to_string(),
        "--merge-output-format".to_string(),
        "mp4".to_string(),
        url.to_string(),
        "-o".to_string(),
        dest.display().to_string(),
    ]
}
