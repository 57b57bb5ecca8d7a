//! Download queue core library.
//!
//! Runs external downloader jobs one at a time, decodes their progress
//! output, and keeps a crash-recovery record of unfinished work so an
//! interrupted queue can be resumed by a later run.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - progress line decoding and URL helpers
//! - [`download`] - request model, process manager and job events
//! - [`queue`] - queue state machine (pure reducer over queue events)
//! - [`recovery`] - JSON store of unfinished downloads
//! - [`settings`] - downloader settings supplied by configuration

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod parser;
pub mod queue;
pub mod recovery;
pub mod settings;

// Re-export commonly used types
pub use download::{
    DownloadError, DownloadEvent, DownloadRequest, FormatSelection, JobId, JobOutcome,
    ProcessManager, ProgressEvent, ResultEvent,
};
pub use parser::{ProgressLine, parse_line};
pub use queue::{
    QueueEffect, QueueError, QueueEvent, QueueInput, QueueItem, QueueState, QueueStatus,
    VideoMeta,
};
pub use recovery::{RecoveryEntry, RecoveryError, RecoveryStore, RecoveryUpdate};
pub use settings::DownloadSettings;
