//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default retry budget per item for `--on-error retry`.
pub const DEFAULT_MAX_RETRIES: u8 = 3;

/// Default audio bitrate (kbit/s) for `--audio`.
pub const DEFAULT_ABR: f64 = 192.0;

/// Download videos through yt-dlp, one at a time, with pause, retry and resume.
///
/// A single URL is downloaded on its own; several URLs form a queue that
/// stops on the first failure until you skip, retry or cancel. Unfinished
/// work is remembered and can be picked up later with `dlqueue resume`.
#[derive(Parser, Debug)]
#[command(name = "dlqueue")]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub download: DownloadArgs,
}

/// Top-level commands besides downloading.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Resume an unfinished download or queue (most recent when KEY is omitted)
    Resume {
        /// Recovery key as printed by `dlqueue pending`
        key: Option<String>,
    },
    /// List unfinished downloads and queues
    Pending,
    /// Drop an unfinished entry without downloading it
    Forget {
        /// Recovery key as printed by `dlqueue pending`
        key: String,
    },
}

/// What a non-interactive run does when a queue item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OnError {
    /// Prompt on an interactive terminal, otherwise stop
    #[default]
    Ask,
    /// Skip the failed item and continue
    Skip,
    /// Retry up to --max-retries times, then stop
    Retry,
    /// Stop the queue and keep it for a later resume
    Stop,
}

/// Flags for the download flow, also honoured by `resume`.
#[derive(Args, Debug, Clone, Default)]
pub struct DownloadArgs {
    /// Video URLs to download (several URLs form a queue)
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quality preset (best, 4k, 2k, 1080p, 720p, 480p, 360p) or a raw format selector
    #[arg(short = 'f', long)]
    pub quality: Option<String>,

    /// Extract audio only
    #[arg(short = 'x', long)]
    pub audio: bool,

    /// Audio bitrate in kbit/s when extracting audio
    #[arg(long, default_value_t = DEFAULT_ABR)]
    pub abr: f64,

    /// Directory to save downloads in
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Name under which a queue is remembered for resuming
    #[arg(short = 'l', long)]
    pub label: Option<String>,

    /// Action when a queue item fails without a terminal to ask on
    #[arg(long, value_enum, default_value_t = OnError::Ask)]
    pub on_error: OnError,

    /// Maximum retries per item with --on-error retry (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Embed subtitles into the output file
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub embed_subs: Option<bool>,

    /// Embed metadata into the output file
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub embed_metadata: Option<bool>,

    /// Embed chapter markers into the output file
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_name = "BOOL")]
    pub embed_chapters: Option<bool>,

    /// Read cookies from this browser's profile
    #[arg(long, value_name = "BROWSER", conflicts_with = "cookies")]
    pub cookies_from_browser: Option<String>,

    /// Read cookies from a Netscape cookie file
    #[arg(long, value_name = "FILE")]
    pub cookies: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long, value_name = "PATH")]
    pub ytdlp_path: Option<String>,
}
