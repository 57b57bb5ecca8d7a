//! Events reported by a running job.

use super::request::JobId;

/// Live progress parsed from one downloader output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    pub job_id: JobId,
    /// Always within `0.0..=100.0`.
    pub percent: f64,
    pub speed: String,
    pub eta: String,
    pub phase: String,
    pub destination: String,
    pub file_extension: String,
    pub queue_index: usize,
    pub queue_total: usize,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Process exited successfully. `destination` is the last announced output path.
    Completed { destination: Option<String> },
    /// Spawn failure, read error or unsuccessful exit.
    Failed { message: String },
    /// The job was cancelled, whatever the process exit status was.
    Cancelled,
}

/// Terminal report for one job. Always sent after every progress event of that job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultEvent {
    pub job_id: JobId,
    pub outcome: JobOutcome,
    pub queue_index: usize,
    pub queue_total: usize,
}

impl ResultEvent {
    /// User-facing error text, `None` on success.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        match &self.outcome {
            JobOutcome::Completed { .. } => None,
            JobOutcome::Failed { message } => Some(message.clone()),
            JobOutcome::Cancelled => Some("Download cancelled".to_string()),
        }
    }

    /// Output path on success.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Completed { destination } => destination.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Completed { .. })
    }
}

/// Everything a job reports to its listener.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Progress(ProgressEvent),
    Finished(ResultEvent),
}
