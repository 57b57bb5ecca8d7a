//! Download queue state machine.
//!
//! A queue downloads its items strictly one after another. All changes go
//! through [`QueueState::reduce`], which consumes one [`QueueEvent`] and
//! returns the new state together with the [`QueueEffect`]s the caller must
//! carry out (launch a job, update the recovery file, stop the process).
//! The state itself performs no IO.
//!
//! # Overview
//!
//! - [`QueueState`] - items plus the queue-level flags
//! - [`QueueItem`] - one video and its live progress
//! - [`QueueStatus`] - item lifecycle states
//! - [`QueueError`] - start-up validation errors
//!
//! # Example
//!
//! ```
//! use dlqueue_core::download::FormatSelection;
//! use dlqueue_core::queue::{QueueEffect, QueueExtras, QueueInput, QueueState};
//!
//! let inputs = vec![
//!     QueueInput::from_url("https://youtu.be/a"),
//!     QueueInput::from_url("https://youtu.be/b"),
//! ];
//! let (state, effects) = QueueState::start(
//!     inputs,
//!     FormatSelection::video("bv*+ba/b"),
//!     "Mix",
//!     QueueExtras::default(),
//! )
//! .unwrap();
//! assert_eq!(state.current_index(), 1);
//! assert!(matches!(effects.last(), Some(QueueEffect::Launch(_))));
//! ```

mod error;
mod item;

pub use error::QueueError;
pub use item::{QueueInput, QueueItem, QueueStatus, VideoMeta};

use tracing::{debug, info, instrument, warn};

use crate::download::{
    CookieSource, DownloadOptions, DownloadRequest, FormatSelection, JobId, JobOutcome,
    ProgressEvent, RecoveryTarget, ResultEvent,
};
use crate::recovery::{
    RecoveryUpdate, queue_description, queue_key, queue_label, queue_update,
};

/// Per-queue request settings carried onto every launch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueExtras {
    pub options: DownloadOptions,
    pub cookies: CookieSource,
}

/// Inputs to [`QueueState::reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEvent {
    /// Live progress from a job.
    Progress(ProgressEvent),
    /// Terminal report from a job.
    Result(ResultEvent),
    /// User chose to skip the failed item.
    Skip,
    /// User chose to retry the failed item.
    Retry,
    /// User cancelled the queue.
    Cancel,
}

/// Side effects requested by a transition, in the order they should run.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueEffect {
    /// Start a job for the request.
    Launch(DownloadRequest),
    /// Apply to the recovery store. Failures must not abort the queue.
    Recovery(RecoveryUpdate),
    /// Cancel whatever job is running.
    StopProcess,
}

/// Counts of finished items for status lines and exit codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueTally {
    pub complete: usize,
    pub failed: usize,
    pub skipped: usize,
    pub pending: usize,
}

/// State of one queue run.
///
/// At most one item is [`QueueStatus::Downloading`] at any time, and once
/// the queue is completed or cancelled no item changes status again.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueState {
    items: Vec<QueueItem>,
    /// 1-based index of the item being downloaded or last acted on.
    current_index: usize,
    label: String,
    format: FormatSelection,
    extras: QueueExtras,
    completed: bool,
    cancelled: bool,
    error: Option<String>,
    /// Job whose progress and result are currently accepted.
    active_job: Option<JobId>,
    next_job: JobId,
}

impl QueueState {
    /// Builds a queue and launches its first item.
    ///
    /// Returned effects: the recovery entry listing every item, then the
    /// launch of item 1.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::EmptyQueue`] when `inputs` is empty.
    #[instrument(skip(inputs, format, extras), fields(items = inputs.len()))]
    pub fn start(
        inputs: Vec<QueueInput>,
        format: FormatSelection,
        label: &str,
        extras: QueueExtras,
    ) -> Result<(Self, Vec<QueueEffect>), QueueError> {
        if inputs.is_empty() {
            return Err(QueueError::EmptyQueue);
        }

        let items = inputs
            .into_iter()
            .enumerate()
            .map(|(i, input)| QueueItem::new(i + 1, input))
            .collect();
        let mut state = Self {
            items,
            current_index: 1,
            label: queue_label(label).to_string(),
            format,
            extras,
            completed: false,
            cancelled: false,
            error: None,
            active_job: None,
            next_job: JobId::new(1),
        };

        info!(label = %state.label, total = state.total(), "queue started");
        let launch = state.launch_current();
        let mut effects = Vec::with_capacity(2);
        effects.extend(state.recovery_sync().map(QueueEffect::Recovery));
        effects.extend(launch);
        Ok((state, effects))
    }

    /// Applies one event.
    #[must_use]
    pub fn reduce(mut self, event: QueueEvent) -> (Self, Vec<QueueEffect>) {
        let effects = match event {
            QueueEvent::Progress(progress) => {
                self.on_progress(&progress);
                Vec::new()
            }
            QueueEvent::Result(result) => self.on_result(result),
            QueueEvent::Skip => self.on_skip(),
            QueueEvent::Retry => self.on_retry(),
            QueueEvent::Cancel => self.on_cancel(),
        };
        (self, effects)
    }

    fn on_progress(&mut self, progress: &ProgressEvent) {
        if self.is_finished() || !self.accepts(progress.job_id, progress.queue_index) {
            return;
        }
        let Some(item) = self.current_mut() else {
            return;
        };
        if progress.percent > 0.0 {
            item.progress = progress.percent;
        }
        if !progress.speed.is_empty() {
            item.speed.clone_from(&progress.speed);
        }
        if !progress.eta.is_empty() {
            item.eta.clone_from(&progress.eta);
        }
        if !progress.phase.is_empty() {
            item.phase.clone_from(&progress.phase);
        }
        if !progress.destination.is_empty() {
            item.destination = Some(progress.destination.clone());
        }
    }

    fn on_result(&mut self, result: ResultEvent) -> Vec<QueueEffect> {
        if self.is_finished() {
            debug!(job = %result.job_id, "result after queue end ignored");
            return Vec::new();
        }
        if !self.accepts(result.job_id, result.queue_index) {
            debug!(
                job = %result.job_id,
                index = result.queue_index,
                "stale result ignored"
            );
            return Vec::new();
        }
        self.active_job = None;

        match result.outcome {
            JobOutcome::Completed { destination } => {
                if let Some(item) = self.current_mut() {
                    item.status = QueueStatus::Complete;
                    item.error = None;
                    if destination.is_some() {
                        item.destination = destination;
                    }
                    info!(index = item.index, destination = ?item.destination, "item complete");
                }
                self.advance()
            }
            JobOutcome::Failed { message } => self.halt(message),
            // The queue was not cancelled, so the job was stopped from outside.
            JobOutcome::Cancelled => self.halt("Download cancelled".to_string()),
        }
    }

    fn on_skip(&mut self) -> Vec<QueueEffect> {
        if !self.is_halted() {
            debug!("skip ignored: queue is not halted");
            return Vec::new();
        }
        if let Some(item) = self.current_mut() {
            item.status = QueueStatus::Skipped;
            info!(index = item.index, "item skipped");
        }
        self.error = None;
        self.advance()
    }

    fn on_retry(&mut self) -> Vec<QueueEffect> {
        if !self.is_halted() {
            debug!("retry ignored: queue is not halted");
            return Vec::new();
        }
        self.error = None;
        info!(index = self.current_index, "retrying item");
        let launch = self.launch_current();
        let mut effects = Vec::with_capacity(2);
        effects.extend(self.recovery_sync().map(QueueEffect::Recovery));
        effects.extend(launch);
        effects
    }

    fn on_cancel(&mut self) -> Vec<QueueEffect> {
        if self.is_finished() {
            debug!("cancel ignored: queue already finished");
            return Vec::new();
        }
        self.cancelled = true;
        self.completed = true;
        self.active_job = None;
        for item in &mut self.items {
            if item.status == QueueStatus::Downloading {
                item.status = QueueStatus::Pending;
                item.reset_progress();
            }
        }
        info!(remaining = self.remaining(), "queue cancelled");

        let mut effects = Vec::with_capacity(2);
        effects.extend(self.recovery_sync().map(QueueEffect::Recovery));
        effects.push(QueueEffect::StopProcess);
        effects
    }

    /// Moves to the next item, or completes the queue after the last one.
    fn advance(&mut self) -> Vec<QueueEffect> {
        if self.current_index < self.items.len() {
            self.current_index += 1;
            let launch = self.launch_current();
            let mut effects = Vec::with_capacity(2);
            effects.extend(self.recovery_sync().map(QueueEffect::Recovery));
            effects.extend(launch);
            effects
        } else {
            self.completed = true;
            let tally = self.tally();
            info!(
                complete = tally.complete,
                skipped = tally.skipped,
                "queue finished"
            );
            vec![QueueEffect::Recovery(RecoveryUpdate::Remove(queue_key(
                &self.label,
            )))]
        }
    }

    fn halt(&mut self, message: String) -> Vec<QueueEffect> {
        if let Some(item) = self.current_mut() {
            warn!(index = item.index, error = %message, "item failed; queue halted");
            item.status = QueueStatus::Error;
            item.error = Some(message.clone());
        }
        self.error = Some(message);
        self.recovery_sync()
            .map(QueueEffect::Recovery)
            .into_iter()
            .collect()
    }

    /// Marks the current item downloading under a fresh job id.
    fn launch_current(&mut self) -> Option<QueueEffect> {
        let job_id = self.next_job;
        self.next_job = job_id.next();
        self.active_job = Some(job_id);

        let total = self.total();
        let recovery = RecoveryTarget {
            key: queue_key(&self.label),
            title: self.label.clone(),
            desc: Some(queue_description(self.remaining().max(1))),
        };
        let format = self.format.clone();
        let extras = self.extras.clone();

        let item = self.current_mut()?;
        item.status = QueueStatus::Downloading;
        item.error = None;
        item.destination = None;
        item.reset_progress();
        debug!(index = item.index, job = %job_id, url = %item.url, "launching item");

        Some(QueueEffect::Launch(DownloadRequest {
            job_id,
            url: item.url.clone(),
            format,
            title: item.display_title().to_string(),
            queue_index: item.index,
            queue_total: total,
            recovery,
            options: extras.options,
            cookies: extras.cookies,
        }))
    }

    /// Recovery write describing what is still owed.
    fn recovery_sync(&self) -> Option<RecoveryUpdate> {
        let urls = self.pending_urls();
        let mut remaining = self.remaining();
        if remaining == 0 && !urls.is_empty() {
            remaining = urls.len();
        }
        queue_update(
            &self.label,
            &self.format.format_id,
            remaining,
            urls,
            self.pending_videos(),
        )
    }

    fn accepts(&self, job_id: JobId, queue_index: usize) -> bool {
        self.active_job == Some(job_id) && queue_index == self.current_index
    }

    fn current_mut(&mut self) -> Option<&mut QueueItem> {
        let index = self.current_index.checked_sub(1)?;
        self.items.get_mut(index)
    }

    // ==== Queries ====

    #[must_use]
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    /// Item at a 1-based index.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&QueueItem> {
        self.items.get(index.checked_sub(1)?)
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&QueueItem> {
        self.item(self.current_index)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[must_use]
    pub fn format(&self) -> &FormatSelection {
        &self.format
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Queue-level error; set while halted on a failed item.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Job whose events are currently accepted.
    #[must_use]
    pub fn active_job(&self) -> Option<JobId> {
        self.active_job
    }

    /// Completed or cancelled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed || self.cancelled
    }

    /// Waiting for skip, retry or cancel.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.error.is_some() && !self.is_finished()
    }

    /// Items still pending or downloading.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status.is_remaining())
            .count()
    }

    #[must_use]
    pub fn downloading_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.status == QueueStatus::Downloading)
            .count()
    }

    /// URLs still owed: pending, downloading or failed.
    #[must_use]
    pub fn pending_urls(&self) -> Vec<String> {
        self.owed().map(|item| item.url.clone()).collect()
    }

    /// Metadata matching [`pending_urls`](Self::pending_urls).
    #[must_use]
    pub fn pending_videos(&self) -> Vec<VideoMeta> {
        self.owed().map(|item| item.video.clone()).collect()
    }

    fn owed(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter().filter(|item| item.status.is_owed())
    }

    #[must_use]
    pub fn tally(&self) -> QueueTally {
        self.items
            .iter()
            .fold(QueueTally::default(), |mut tally, item| {
                match item.status {
                    QueueStatus::Complete => tally.complete += 1,
                    QueueStatus::Error => tally.failed += 1,
                    QueueStatus::Skipped => tally.skipped += 1,
                    QueueStatus::Pending | QueueStatus::Downloading => tally.pending += 1,
                }
                tally
            })
    }
}
