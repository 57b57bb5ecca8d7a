//! External downloader jobs.
//!
//! This module turns a [`DownloadRequest`] into a running downloader process
//! and reports what happens to it.
//!
//! # Components
//!
//! - [`request`] - request model and argument vector construction
//! - [`format`] - named quality presets
//! - [`ProcessManager`] - the single active process and its controls
//! - [`ProcessSuspender`] - platform pause capability
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use dlqueue_core::download::{DownloadEvent, DownloadRequest, FormatSelection, JobId, ProcessManager};
//! use dlqueue_core::DownloadSettings;
//!
//! # async fn example() {
//! let manager = Arc::new(ProcessManager::new(DownloadSettings::default()));
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let request = DownloadRequest::standalone(
//!     JobId::new(1),
//!     "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!     "Never Gonna Give You Up",
//!     FormatSelection::video("bv*+ba/b"),
//! );
//! manager.start(request, tx);
//! while let Some(event) = rx.recv().await {
//!     if let DownloadEvent::Finished(result) = event {
//!         println!("{:?}", result.outcome);
//!         break;
//!     }
//! }
//! # }
//! ```

mod error;
mod events;
pub mod format;
mod manager;
pub mod request;
mod suspend;

pub use error::DownloadError;
pub use events::{DownloadEvent, JobOutcome, ProgressEvent, ResultEvent};
pub use format::{DEFAULT_QUALITY, QUALITY_PRESETS, resolve_quality};
pub use manager::ProcessManager;
pub use request::{
    CookieSource, DownloadOptions, DownloadRequest, FormatSelection, JobId, RecoveryTarget,
    build_args,
};
#[cfg(unix)]
pub use suspend::SignalSuspender;
pub use suspend::{ProcessSuspender, UnsupportedSuspender, platform_suspender};

