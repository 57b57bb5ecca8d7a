//! Shared runtime context built after CLI/config resolution.

use std::path::PathBuf;

use anyhow::{Result, bail};
use dlqueue_core::DownloadSettings;
use dlqueue_core::download::{
    CookieSource, DEFAULT_QUALITY, DownloadOptions, FormatSelection, resolve_quality,
};
use dlqueue_core::queue::QueueExtras;
use dlqueue_core::settings::default_download_dir;

use crate::app_config::FileConfig;
use crate::cli::{DownloadArgs, OnError};

/// Holds everything the download flows need so they do not re-read CLI or config.
#[derive(Debug, Clone)]
pub(crate) struct RunContext {
    pub(crate) settings: DownloadSettings,
    /// Quality as typed (preset name or raw selector), before resolution.
    pub(crate) quality: String,
    pub(crate) audio: bool,
    pub(crate) abr: f64,
    pub(crate) label: Option<String>,
    pub(crate) extras: QueueExtras,
    pub(crate) on_error: OnError,
    pub(crate) max_retries: u8,
    pub(crate) quiet: bool,
}

impl RunContext {
    /// Format selection for a freshly typed quality.
    pub(crate) fn format(&self) -> FormatSelection {
        self.format_for(&resolve_quality(&self.quality))
    }

    /// Format selection reusing an already resolved selector (resume).
    pub(crate) fn format_for(&self, format_id: &str) -> FormatSelection {
        if self.audio {
            FormatSelection::audio(format_id, self.abr)
        } else {
            FormatSelection::video(format_id)
        }
    }
}

/// Merges CLI flags over file config over built-in defaults.
pub(crate) fn build_context(args: &DownloadArgs, file: Option<&FileConfig>) -> Result<RunContext> {
    let file = file.cloned().unwrap_or_default();

    if args.audio && !(args.abr.is_finite() && args.abr > 0.0) {
        bail!("Invalid --abr value {}: expected a positive bitrate in kbit/s", args.abr);
    }

    let defaults = DownloadSettings::default();
    let settings = DownloadSettings {
        ytdlp_path: args
            .ytdlp_path
            .clone()
            .or(file.ytdlp_path)
            .unwrap_or(defaults.ytdlp_path),
        download_dir: args
            .output_dir
            .clone()
            .or(file.download_dir)
            .unwrap_or_else(default_download_dir),
        video_format: file.video_format.unwrap_or(defaults.video_format),
        audio_format: file.audio_format.unwrap_or(defaults.audio_format),
        ffmpeg_path: file.ffmpeg_path,
        cookies_browser: file.cookies_browser,
        cookies_file: file.cookies_file,
    };

    let base = DownloadOptions::default();
    let options = DownloadOptions {
        embed_subtitles: args
            .embed_subs
            .or(file.embed_subtitles)
            .unwrap_or(base.embed_subtitles),
        embed_metadata: args
            .embed_metadata
            .or(file.embed_metadata)
            .unwrap_or(base.embed_metadata),
        embed_chapters: args
            .embed_chapters
            .or(file.embed_chapters)
            .unwrap_or(base.embed_chapters),
    };

    let cookies = match (&args.cookies_from_browser, &args.cookies) {
        (Some(browser), _) => CookieSource::Browser(browser.clone()),
        (None, Some(file)) => CookieSource::File(file.to_string_lossy().into_owned()),
        (None, None) => CookieSource::None,
    };

    Ok(RunContext {
        settings,
        quality: args
            .quality
            .clone()
            .or(file.default_quality)
            .unwrap_or_else(|| DEFAULT_QUALITY.to_string()),
        audio: args.audio,
        abr: args.abr,
        label: args.label.clone(),
        extras: QueueExtras { options, cookies },
        on_error: args.on_error,
        max_retries: args.max_retries,
        quiet: args.quiet,
    })
}

/// Output directory that will actually be used, for display.
pub(crate) fn effective_download_dir(ctx: &RunContext) -> &PathBuf {
    &ctx.settings.download_dir
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn args(argv: &[&str]) -> DownloadArgs {
        let mut full = vec!["dlqueue"];
        full.extend_from_slice(argv);
        Cli::try_parse_from(full).unwrap().download
    }

    #[test]
    fn test_build_context_defaults() {
        let ctx = build_context(&args(&[]), None).unwrap();
        assert_eq!(ctx.quality, "best");
        assert_eq!(ctx.settings.ytdlp_path, "yt-dlp");
        assert_eq!(ctx.settings.video_format, "mp4");
        assert!(ctx.extras.options.embed_metadata);
        assert!(ctx.extras.options.embed_chapters);
        assert!(!ctx.extras.options.embed_subtitles);
        assert_eq!(ctx.extras.cookies, CookieSource::None);
        assert_eq!(ctx.format().format_id, "bv*+ba/b");
    }

    #[test]
    fn test_build_context_file_overrides_defaults() {
        let file = FileConfig {
            default_quality: Some("720p".to_string()),
            embed_metadata: Some(false),
            video_format: Some("mkv".to_string()),
            download_dir: Some(PathBuf::from("/srv/media")),
            ..FileConfig::default()
        };
        let ctx = build_context(&args(&[]), Some(&file)).unwrap();
        assert_eq!(ctx.quality, "720p");
        assert!(!ctx.extras.options.embed_metadata);
        assert_eq!(ctx.settings.video_format, "mkv");
        assert_eq!(effective_download_dir(&ctx), &PathBuf::from("/srv/media"));
    }

    #[test]
    fn test_build_context_cli_overrides_file() {
        let file = FileConfig {
            default_quality: Some("720p".to_string()),
            embed_metadata: Some(false),
            download_dir: Some(PathBuf::from("/srv/media")),
            ..FileConfig::default()
        };
        let ctx = build_context(
            &args(&["-f", "1080p", "--embed-metadata", "-o", "/tmp/out"]),
            Some(&file),
        )
        .unwrap();
        assert_eq!(ctx.quality, "1080p");
        assert!(ctx.extras.options.embed_metadata);
        assert_eq!(ctx.settings.download_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_build_context_cookie_flags() {
        let ctx = build_context(&args(&["--cookies", "/tmp/c.txt"]), None).unwrap();
        assert_eq!(ctx.extras.cookies, CookieSource::File("/tmp/c.txt".to_string()));

        let ctx = build_context(&args(&["--cookies-from-browser", "brave"]), None).unwrap();
        assert_eq!(ctx.extras.cookies, CookieSource::Browser("brave".to_string()));
    }

    #[test]
    fn test_build_context_audio_format() {
        let ctx = build_context(&args(&["-x", "--abr", "128", "-f", "bestaudio"]), None).unwrap();
        let format = ctx.format();
        assert!(format.audio_only);
        assert_eq!(format.format_id, "bestaudio");
        assert!((format.abr - 128.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_build_context_rejects_zero_abr_for_audio() {
        assert!(build_context(&args(&["-x", "--abr", "0"]), None).is_err());
    }
}
