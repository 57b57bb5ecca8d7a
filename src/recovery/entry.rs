//! Persisted description of unfinished work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RecoveryError;
use crate::queue::{QueueInput, VideoMeta};

/// Label used when a queue has no usable label.
pub const DEFAULT_QUEUE_LABEL: &str = "Queued downloads";

const QUEUE_KEY_PREFIX: &str = "queue:";

/// One unfinished download or queue.
///
/// `url` is the key: the video URL for a single download, or
/// [`queue_key`] of the label for a queue. Queue entries list every URL
/// still owed in `urls`, with matching metadata in `videos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryEntry {
    pub url: String,
    pub format_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub videos: Vec<VideoMeta>,
    pub timestamp: DateTime<Utc>,
}

impl RecoveryEntry {
    /// Entry for a single download keyed by its URL.
    #[must_use]
    pub fn single(url: impl Into<String>, format_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format_id: format_id.into(),
            title: title.into(),
            desc: None,
            urls: Vec::new(),
            videos: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// The lookup key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.url
    }

    /// True for multi-item queue entries.
    #[must_use]
    pub fn is_queue(&self) -> bool {
        !self.urls.is_empty()
    }

    /// Checks the fields a stored entry must carry.
    ///
    /// # Errors
    ///
    /// Returns [`RecoveryError::InvalidEntry`] when the key or title is blank.
    pub fn validate(&self) -> Result<(), RecoveryError> {
        if self.url.trim().is_empty() {
            return Err(RecoveryError::InvalidEntry {
                reason: "key must not be empty",
            });
        }
        if self.title.trim().is_empty() {
            return Err(RecoveryError::InvalidEntry {
                reason: "title must not be empty",
            });
        }
        Ok(())
    }

    /// Rebuilds queue inputs from the stored URLs.
    ///
    /// Stored metadata is used only when it lines up one-to-one with the
    /// URLs; otherwise each URL gets placeholder metadata.
    #[must_use]
    pub fn queue_inputs(&self) -> Vec<QueueInput> {
        if self.videos.len() == self.urls.len() {
            self.urls
                .iter()
                .zip(&self.videos)
                .map(|(url, video)| QueueInput {
                    video: video.clone(),
                    url: url.clone(),
                })
                .collect()
        } else {
            self.urls.iter().map(QueueInput::from_url).collect()
        }
    }
}

/// Recovery key for a queue label.
///
/// Blank labels fall back to [`DEFAULT_QUEUE_LABEL`].
///
/// ```
/// use dlqueue_core::recovery::queue_key;
///
/// assert_eq!(queue_key("  "), "queue:Queued downloads");
/// assert_eq!(queue_key(" Talks "), "queue:Talks");
/// ```
#[must_use]
pub fn queue_key(label: &str) -> String {
    format!("{QUEUE_KEY_PREFIX}{}", queue_label(label))
}

/// Trimmed label, or [`DEFAULT_QUEUE_LABEL`] when blank.
#[must_use]
pub fn queue_label(label: &str) -> &str {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        DEFAULT_QUEUE_LABEL
    } else {
        trimmed
    }
}

/// Human summary stored with queue entries.
#[must_use]
pub fn queue_description(remaining: usize) -> String {
    format!("{remaining} items left")
}

/// A write the queue wants applied to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryUpdate {
    Upsert(RecoveryEntry),
    Remove(String),
}

/// Computes the store change for a queue with `remaining` items left.
///
/// Nothing remaining removes the entry. An empty URL list with work
/// remaining leaves the store alone. Otherwise the entry is rewritten.
#[must_use]
pub fn queue_update(
    label: &str,
    format_id: &str,
    remaining: usize,
    urls: Vec<String>,
    videos: Vec<VideoMeta>,
) -> Option<RecoveryUpdate> {
    let key = queue_key(label);
    if remaining == 0 {
        return Some(RecoveryUpdate::Remove(key));
    }
    if urls.is_empty() {
        return None;
    }
    Some(RecoveryUpdate::Upsert(RecoveryEntry {
        url: key,
        format_id: format_id.to_string(),
        title: queue_label(label).to_string(),
        desc: Some(queue_description(remaining)),
        urls,
        videos,
        timestamp: Utc::now(),
    }))
}
