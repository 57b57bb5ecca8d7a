//! Lifecycle of the single active downloader process.
//!
//! [`ProcessManager`] launches one job at a time. Each job runs as its own
//! tokio task that drains stdout and stderr concurrently through
//! [`parse_line`], waits for both readers before reaping the child, and only
//! then reports a [`ResultEvent`]. Pause, resume and cancel act on the
//! currently attached job through a single lock.

use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::{self, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::error::DownloadError;
use super::events::{DownloadEvent, JobOutcome, ProgressEvent, ResultEvent};
use super::request::{DownloadRequest, JobId, build_args};
use super::suspend::{ProcessSuspender, platform_suspender};
use crate::parser::{ProgressLine, parse_line};
use crate::settings::DownloadSettings;

/// The job currently attached to the manager.
#[derive(Debug)]
struct ActiveJob {
    /// Private launch counter; guards `clear` against superseded jobs.
    generation: u64,
    job_id: JobId,
    pid: Option<u32>,
    cancel: CancellationToken,
    paused: bool,
}

#[derive(Debug, Default)]
struct ManagerState {
    active: Option<ActiveJob>,
    next_generation: u64,
}

/// Owns at most one downloader process and its pause/cancel controls.
#[derive(Debug)]
pub struct ProcessManager {
    state: Mutex<ManagerState>,
    suspender: Box<dyn ProcessSuspender>,
    settings: Arc<DownloadSettings>,
}

impl ProcessManager {
    /// Creates a manager using the platform suspender.
    #[must_use]
    pub fn new(settings: DownloadSettings) -> Self {
        Self::with_suspender(settings, platform_suspender())
    }

    /// Creates a manager with an explicit suspension capability.
    #[must_use]
    pub fn with_suspender(settings: DownloadSettings, suspender: Box<dyn ProcessSuspender>) -> Self {
        Self {
            state: Mutex::new(ManagerState::default()),
            suspender,
            settings: Arc::new(settings),
        }
    }

    /// Settings every launch is built from.
    #[must_use]
    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    /// Whether pause/resume have any effect here.
    #[must_use]
    pub fn supports_pause(&self) -> bool {
        self.suspender.is_supported()
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launches a job for `request`, superseding any job still attached.
    ///
    /// Progress and the final result are sent on `events`. Spawn failures
    /// are reported as an immediate [`JobOutcome::Failed`] result rather
    /// than returned, so callers handle every outcome in one place.
    #[instrument(skip(self, request, events), fields(job = %request.job_id, url = %request.url))]
    pub fn start(
        self: &Arc<Self>,
        request: DownloadRequest,
        events: mpsc::UnboundedSender<DownloadEvent>,
    ) -> JoinHandle<()> {
        let (generation, token) = self.attach(request.job_id);
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let result = manager.run(generation, &token, &request, &events).await;
            manager.clear(generation);

            let outcome = if token.is_cancelled() {
                info!(job = %request.job_id, "download cancelled");
                JobOutcome::Cancelled
            } else {
                match result {
                    Ok(destination) => {
                        info!(job = %request.job_id, ?destination, "download finished");
                        JobOutcome::Completed { destination }
                    }
                    Err(e) => {
                        warn!(job = %request.job_id, error = %e, "download failed");
                        JobOutcome::Failed {
                            message: e.to_string(),
                        }
                    }
                }
            };

            let finished = DownloadEvent::Finished(ResultEvent {
                job_id: request.job_id,
                outcome,
                queue_index: request.queue_index,
                queue_total: request.queue_total,
            });
            if events.send(finished).is_err() {
                debug!("result dropped: listener gone");
            }
        })
    }

    /// Attaches a fresh job slot, cancelling whatever was attached before.
    fn attach(&self, job_id: JobId) -> (u64, CancellationToken) {
        let mut state = self.lock();
        if let Some(previous) = state.active.take() {
            debug!(job = %previous.job_id, "superseding attached job");
            previous.cancel.cancel();
        }
        let generation = state.next_generation;
        state.next_generation = state.next_generation.wrapping_add(1);
        let token = CancellationToken::new();
        state.active = Some(ActiveJob {
            generation,
            job_id,
            pid: None,
            cancel: token.clone(),
            paused: false,
        });
        (generation, token)
    }

    fn set_pid(&self, generation: u64, pid: Option<u32>) {
        let mut state = self.lock();
        if let Some(active) = state.active.as_mut().filter(|a| a.generation == generation) {
            active.pid = pid;
        }
    }

    /// Spawns the process and drives it to completion or cancellation.
    ///
    /// Returns the last announced destination on success.
    async fn run(
        &self,
        generation: u64,
        token: &CancellationToken,
        request: &DownloadRequest,
        events: &mpsc::UnboundedSender<DownloadEvent>,
    ) -> Result<Option<String>, DownloadError> {
        if request.url.trim().is_empty() {
            return Err(DownloadError::EmptyUrl);
        }

        let program = &self.settings.ytdlp_path;
        let args = build_args(request, &self.settings);
        debug!(%program, ?args, "spawning downloader");

        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DownloadError::spawn(program.as_str(), e))?;
        self.set_pid(generation, child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or(DownloadError::MissingPipe { stream: "stdout" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(DownloadError::MissingPipe { stream: "stderr" })?;

        let sink = ProgressSink {
            job_id: request.job_id,
            file_extension: request.file_extension(&self.settings).to_string(),
            queue_index: request.queue_index,
            queue_total: request.queue_total,
            events,
        };

        let drained = tokio::select! {
            drained = async {
                let (out, err) = tokio::join!(
                    drain_stream(stdout, "stdout", &sink),
                    drain_stream(stderr, "stderr", &sink),
                );
                let status = child.wait().await;
                (out, err, status)
            } => Some(drained),
            () = token.cancelled() => None,
        };

        let Some((stdout_dest, stderr_dest, status)) = drained else {
            terminate(&mut child).await;
            return Ok(None);
        };

        let status = status.map_err(|source| DownloadError::Wait { source })?;
        if !status.success() {
            return Err(DownloadError::exit_status(status.code()));
        }
        let stdout_dest = stdout_dest?;
        let stderr_dest = stderr_dest?;
        Ok(stdout_dest.or(stderr_dest))
    }

    /// Suspends the attached process.
    ///
    /// Returns `Ok(false)` without doing anything when no process is
    /// attached, it is already paused, or the platform cannot suspend.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Suspend`] if the signal could not be delivered.
    #[instrument(skip(self))]
    pub fn pause(&self) -> Result<bool, DownloadError> {
        let mut state = self.lock();
        let Some(active) = state.active.as_mut() else {
            debug!("pause ignored: no active job");
            return Ok(false);
        };
        if active.paused {
            debug!(job = %active.job_id, "pause ignored: already paused");
            return Ok(false);
        }
        let Some(pid) = active.pid else {
            debug!(job = %active.job_id, "pause ignored: process not started");
            return Ok(false);
        };
        let applied = self.suspender.suspend(pid)?;
        active.paused = applied;
        if applied {
            info!(job = %active.job_id, pid, "download paused");
        }
        Ok(applied)
    }

    /// Continues a paused process. Inverse of [`pause`](Self::pause).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Suspend`] if the signal could not be delivered.
    #[instrument(skip(self))]
    pub fn resume(&self) -> Result<bool, DownloadError> {
        let mut state = self.lock();
        let Some(active) = state.active.as_mut() else {
            debug!("resume ignored: no active job");
            return Ok(false);
        };
        if !active.paused {
            debug!(job = %active.job_id, "resume ignored: not paused");
            return Ok(false);
        }
        let Some(pid) = active.pid else {
            return Ok(false);
        };
        let applied = self.suspender.resume(pid)?;
        if applied {
            active.paused = false;
            info!(job = %active.job_id, pid, "download resumed");
        }
        Ok(applied)
    }

    /// Cancels the attached job. Safe to call when idle.
    ///
    /// The job task kills the process and reports [`JobOutcome::Cancelled`].
    #[instrument(skip(self))]
    pub fn cancel(&self) {
        let state = self.lock();
        match state.active.as_ref() {
            Some(active) => {
                info!(job = %active.job_id, pid = ?active.pid, "cancelling download");
                active.cancel.cancel();
            }
            None => debug!("cancel ignored: no active job"),
        }
    }

    /// Releases the slot of a finished job.
    ///
    /// A no-op when a newer job has been attached since.
    fn clear(&self, generation: u64) {
        let mut state = self.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
        {
            state.active = None;
        } else {
            trace!(generation, "clear skipped: job superseded");
        }
    }

    /// True when no job is attached.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.lock().active.is_none()
    }

    /// True while the attached job is suspended.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.lock().active.as_ref().is_some_and(|a| a.paused)
    }
}

/// Kills a cancelled child, retrying with a waited kill if it is still alive.
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "kill signal not delivered");
    }
    match child.try_wait() {
        Ok(Some(status)) => debug!(?status, "downloader exited after cancel"),
        Ok(None) | Err(_) => {
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill downloader process");
            }
        }
    }
}

/// Per-job context shared by both stream readers.
struct ProgressSink<'a> {
    job_id: JobId,
    file_extension: String,
    queue_index: usize,
    queue_total: usize,
    events: &'a mpsc::UnboundedSender<DownloadEvent>,
}

impl ProgressSink<'_> {
    fn emit(&self, line: ProgressLine) {
        let event = DownloadEvent::Progress(ProgressEvent {
            job_id: self.job_id,
            percent: line.percent,
            speed: line.speed,
            eta: line.eta,
            phase: line.phase,
            destination: line.destination,
            file_extension: self.file_extension.clone(),
            queue_index: self.queue_index,
            queue_total: self.queue_total,
        });
        if self.events.send(event).is_err() {
            trace!("progress dropped: listener gone");
        }
    }
}

/// Reads one output stream to EOF, forwarding every meaningful line.
///
/// Returns the last destination announced on this stream.
async fn drain_stream<R>(
    stream: R,
    name: &'static str,
    sink: &ProgressSink<'_>,
) -> Result<Option<String>, DownloadError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut destination = None;

    loop {
        buf.clear();
        let read = match reader.read_until(b'\n', &mut buf).await {
            Ok(read) => read,
            Err(source) => {
                warn!(stream = name, error = %source, "output unreadable, discarding the rest");
                // The child must never block on a full pipe.
                if let Err(e) = io::copy(&mut reader, &mut io::sink()).await {
                    debug!(stream = name, error = %e, "discard stopped early");
                }
                return Err(DownloadError::Output {
                    stream: name,
                    source,
                });
            }
        };
        if read == 0 {
            break;
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end_matches(['\r', '\n']);
        trace!(stream = name, line, "downloader output");

        let parsed = parse_line(line);
        if parsed.is_empty() {
            continue;
        }
        if !parsed.destination.is_empty() {
            destination = Some(parsed.destination.clone());
        }
        sink.emit(parsed);
    }

    Ok(destination)
}
