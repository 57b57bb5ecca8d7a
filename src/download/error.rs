//! Error types for the download module.
//!
//! Failures are structured so the caller can either report them or fold
//! them into a [`ResultEvent`](super::ResultEvent) message.

use thiserror::Error;

/// Errors that can occur while driving a downloader process.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The request carried no URL.
    #[error("no URL provided")]
    EmptyUrl,

    /// The downloader executable could not be started.
    #[error("failed to start {program}: {source}")]
    Spawn {
        /// Program that failed to spawn.
        program: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A piped stream was not available on the spawned child.
    #[error("{stream} pipe unavailable on spawned process")]
    MissingPipe {
        /// `stdout` or `stderr`.
        stream: &'static str,
    },

    /// Reading a child output stream failed.
    #[error("error reading {stream}: {source}")]
    Output {
        /// `stdout` or `stderr`.
        stream: &'static str,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child process failed.
    #[error("failed waiting for downloader process: {source}")]
    Wait {
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The downloader exited unsuccessfully.
    #[error("Download error: {}", exit_description(*.code))]
    ExitStatus {
        /// Exit code, or `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// Suspending or continuing the process failed.
    #[error("failed to {action} process {pid}: {source}")]
    Suspend {
        /// `pause` or `resume`.
        action: &'static str,
        /// Target process id.
        pid: u32,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },
}

fn exit_description(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

impl DownloadError {
    /// Creates a spawn error.
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            program: program.into(),
            source,
        }
    }

    /// Creates an exit-status error.
    #[must_use]
    pub fn exit_status(code: Option<i32>) -> Self {
        Self::ExitStatus { code }
    }

    /// Creates a suspend/continue error.
    #[must_use]
    pub fn suspend(action: &'static str, pid: u32, source: std::io::Error) -> Self {
        Self::Suspend {
            action,
            pid,
            source,
        }
    }
}
