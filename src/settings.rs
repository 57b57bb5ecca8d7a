//! Downloader settings supplied by the configuration layer.

use std::path::PathBuf;

/// Default downloader executable, resolved through `PATH`.
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

/// Default container for video downloads.
pub const DEFAULT_VIDEO_FORMAT: &str = "mp4";

/// Default codec for audio extraction.
pub const DEFAULT_AUDIO_FORMAT: &str = "mp3";

/// Settings shared by every job launched by a [`ProcessManager`](crate::download::ProcessManager).
///
/// These come from the config file and CLI; per-request overrides
/// (cookies, embedding options) travel on the
/// [`DownloadRequest`](crate::download::DownloadRequest) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Downloader executable.
    pub ytdlp_path: String,
    /// Directory the output template is rooted in.
    pub download_dir: PathBuf,
    /// Merge/remux container for video requests.
    pub video_format: String,
    /// Extraction format for audio requests.
    pub audio_format: String,
    /// Passed as `--ffmpeg-path` when set.
    pub ffmpeg_path: Option<String>,
    /// Fallback `--cookies-from-browser` value.
    pub cookies_browser: Option<String>,
    /// Fallback `--cookies` file.
    pub cookies_file: Option<String>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            ytdlp_path: DEFAULT_YTDLP_PATH.to_string(),
            download_dir: default_download_dir(),
            video_format: DEFAULT_VIDEO_FORMAT.to_string(),
            audio_format: DEFAULT_AUDIO_FORMAT.to_string(),
            ffmpeg_path: None,
            cookies_browser: None,
            cookies_file: None,
        }
    }
}

/// `$HOME/Videos`, or a relative `Videos` when no home directory is known.
#[must_use]
pub fn default_download_dir() -> PathBuf {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(|| PathBuf::from("Videos"), |home| PathBuf::from(home).join("Videos"))
}
