//! Launch parameters for one downloader job and the argument vector built from them.

use std::fmt;

use crate::parser::is_playlist_url;
use crate::settings::DownloadSettings;

/// Identity of one launch.
///
/// Two launches of the same queue index (a retry, or a restart after
/// cancel) get distinct ids, so a late result from the older process can be
/// told apart from the current one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    /// Wraps a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The id following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Format selector and track choice shared by every item of a queue.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSelection {
    /// Downloader format selector (`-f`).
    pub format_id: String,
    /// Extract audio only.
    pub audio_only: bool,
    /// Target audio bitrate in kbit/s; used only when `audio_only`.
    pub abr: f64,
}

impl FormatSelection {
    /// Video (or muxed) download with the given selector.
    #[must_use]
    pub fn video(format_id: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            audio_only: false,
            abr: 0.0,
        }
    }

    /// Audio extraction at the given bitrate.
    #[must_use]
    pub fn audio(format_id: impl Into<String>, abr: f64) -> Self {
        Self {
            format_id: format_id.into(),
            audio_only: true,
            abr,
        }
    }
}

/// Post-processing embedding toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOptions {
    pub embed_subtitles: bool,
    pub embed_metadata: bool,
    pub embed_chapters: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            embed_subtitles: false,
            embed_metadata: true,
            embed_chapters: true,
        }
    }
}

/// Where the downloader should take cookies from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CookieSource {
    /// Use the configured fallback, if any.
    #[default]
    None,
    /// `--cookies-from-browser <name>`
    Browser(String),
    /// `--cookies <file>`
    File(String),
}

impl CookieSource {
    /// Picks the request source, falling back to the configured one.
    ///
    /// A configured browser wins over a configured cookie file.
    #[must_use]
    pub fn resolve(&self, settings: &DownloadSettings) -> Self {
        if *self != Self::None {
            return self.clone();
        }
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
        };
        if let Some(browser) = non_empty(&settings.cookies_browser) {
            Self::Browser(browser)
        } else if let Some(file) = non_empty(&settings.cookies_file) {
            Self::File(file)
        } else {
            Self::None
        }
    }
}

/// Recovery entry the driver should maintain for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryTarget {
    pub key: String,
    pub title: String,
    pub desc: Option<String>,
}

/// Everything needed to launch one downloader job.
///
/// `queue_index`/`queue_total` are 1-based position and size of the owning
/// queue, or `0`/`0` for a standalone download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub job_id: JobId,
    pub url: String,
    pub format: FormatSelection,
    pub title: String,
    pub queue_index: usize,
    pub queue_total: usize,
    pub recovery: RecoveryTarget,
    pub options: DownloadOptions,
    pub cookies: CookieSource,
}

impl DownloadRequest {
    /// A single download outside any queue, recovered under its own URL.
    #[must_use]
    pub fn standalone(
        job_id: JobId,
        url: impl Into<String>,
        title: impl Into<String>,
        format: FormatSelection,
    ) -> Self {
        let url = url.into();
        let title = title.into();
        Self {
            job_id,
            recovery: RecoveryTarget {
                key: url.clone(),
                title: title.clone(),
                desc: None,
            },
            url,
            format,
            title,
            queue_index: 0,
            queue_total: 0,
            options: DownloadOptions::default(),
            cookies: CookieSource::None,
        }
    }

    /// True when the request is not part of a queue.
    #[must_use]
    pub fn is_standalone(&self) -> bool {
        self.queue_total == 0
    }

    /// Extension of the produced file, taken from the configured container.
    #[must_use]
    pub fn file_extension<'a>(&self, settings: &'a DownloadSettings) -> &'a str {
        if self.format.audio_only {
            &settings.audio_format
        } else {
            &settings.video_format
        }
    }
}

/// Builds the downloader argument vector for a request.
///
/// Layout: optional `--ffmpeg-path`, optional cookie flags, `--no-playlist`
/// unless the URL is a playlist, output template plus audio or video
/// post-processing flags, `-f <format> --newline -R infinite <url>`, then
/// any enabled embedding flags.
#[must_use]
pub fn build_args(request: &DownloadRequest, settings: &DownloadSettings) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    if let Some(ffmpeg) = settings.ffmpeg_path.as_deref().filter(|p| !p.trim().is_empty()) {
        args.extend(["--ffmpeg-path".to_string(), ffmpeg.to_string()]);
    }

    match request.cookies.resolve(settings) {
        CookieSource::Browser(browser) => {
            args.extend(["--cookies-from-browser".to_string(), browser]);
        }
        CookieSource::File(file) => args.extend(["--cookies".to_string(), file]),
        CookieSource::None => {}
    }

    if !is_playlist_url(&request.url) {
        args.push("--no-playlist".to_string());
    }

    let dir = &settings.download_dir;
    if request.format.audio_only {
        let template = dir.join("%(artist)s - %(title)s.%(ext)s");
        // Truncation to whole kbit/s is intended.
        #[allow(clippy::cast_possible_truncation)]
        let quality = format!("{}K", request.format.abr as i64);
        args.extend([
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--restrict-filenames".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            settings.audio_format.clone(),
            "--audio-quality".to_string(),
            quality,
            "--add-metadata".to_string(),
            "--metadata-from-title".to_string(),
            "%(artist)s - %(title)s".to_string(),
        ]);
    } else {
        let template = dir.join("%(title)s.%(ext)s");
        args.extend([
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--merge-output-format".to_string(),
            settings.video_format.clone(),
            "--remux-video".to_string(),
            settings.video_format.clone(),
        ]);
    }

    args.extend([
        "-f".to_string(),
        request.format.format_id.clone(),
        "--newline".to_string(),
        "-R".to_string(),
        "infinite".to_string(),
        request.url.clone(),
    ]);

    let options = request.options;
    if options.embed_subtitles {
        args.push("--embed-subs".to_string());
    }
    if options.embed_metadata {
        args.push("--embed-metadata".to_string());
    }
    if options.embed_chapters {
        args.push("--embed-chapters".to_string());
    }

    args
}
