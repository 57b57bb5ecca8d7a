//! Queue item types and status definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of a queue item.
///
/// Items move `Pending -> Downloading -> {Complete | Error | Skipped}`.
/// `Error` returns to `Downloading` on retry, and `Downloading` falls back
/// to `Pending` when the queue is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    /// Waiting to be downloaded.
    Pending,
    /// The item the active job is working on.
    Downloading,
    /// Downloaded successfully.
    Complete,
    /// The last attempt failed; waiting for skip, retry or cancel.
    Error,
    /// Abandoned by the user after an error.
    Skipped,
}

impl QueueStatus {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }

    /// Statuses that still owe a download (recoverable on the next launch).
    #[must_use]
    pub fn is_owed(&self) -> bool {
        matches!(self, Self::Pending | Self::Downloading | Self::Error)
    }

    /// Statuses counted as remaining work.
    #[must_use]
    pub fn is_remaining(&self) -> bool {
        matches!(self, Self::Pending | Self::Downloading)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "downloading" => Ok(Self::Downloading),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("invalid queue status: {s}")),
        }
    }
}

/// Metadata of the video behind a queue item, as produced by search/listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMeta {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    /// Seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub views: f64,
}

impl VideoMeta {
    /// Placeholder metadata for a bare URL: id and title are the URL itself.
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        Self {
            id: url.to_string(),
            title: url.to_string(),
            ..Self::default()
        }
    }
}

/// One video handed to the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueInput {
    pub video: VideoMeta,
    pub url: String,
}

impl QueueInput {
    /// Input for a bare URL with placeholder metadata.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            video: VideoMeta::from_url(&url),
            url,
        }
    }
}

/// A single item in the download queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    /// 1-based position, fixed for the life of the queue.
    pub index: usize,
    pub video: VideoMeta,
    pub url: String,
    pub status: QueueStatus,
    /// Live progress, `0.0..=100.0`.
    pub progress: f64,
    pub speed: String,
    pub eta: String,
    pub phase: String,
    /// Last error message, if the most recent attempt failed.
    pub error: Option<String>,
    /// Output path once downloaded (or the last announced one while running).
    pub destination: Option<String>,
}

impl QueueItem {
    /// Creates a pending item.
    #[must_use]
    pub fn new(index: usize, input: QueueInput) -> Self {
        Self {
            index,
            video: input.video,
            url: input.url,
            status: QueueStatus::Pending,
            progress: 0.0,
            speed: String::new(),
            eta: String::new(),
            phase: String::new(),
            error: None,
            destination: None,
        }
    }

    /// Clears the live progress fields before a (re)launch.
    pub fn reset_progress(&mut self) {
        self.progress = 0.0;
        self.speed.clear();
        self.eta.clear();
        self.phase.clear();
    }

    /// Display title, falling back to the URL.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.video.title.trim().is_empty() {
            &self.url
        } else {
            &self.video.title
        }
    }
}
