use std::fs;
use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use dlqueue_core::download::{
    DownloadEvent, DownloadRequest, FormatSelection, JobId, JobOutcome, ProcessManager,
    ResultEvent,
};
use dlqueue_core::parser::{canonical_video_url, extract_urls};
use dlqueue_core::queue::{QueueEffect, QueueEvent, QueueInput, QueueState, QueueStatus};
use dlqueue_core::recovery::{RecoveryEntry, RecoveryStore, queue_key};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::context::{self, RunContext};
use crate::app::input::{self, COMMAND_HINT, UserCommand};
use crate::app::progress_manager::ProgressView;
use crate::app::{command_dispatcher, exit_handler, terminal};
use crate::app_config;
use crate::cli::{Cli, Command, OnError};

/// What to do when a queue item fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HaltAction {
    /// Wait for the user to skip, retry or cancel.
    Prompt,
    Skip,
    Retry,
    Stop,
}

/// Chooses the reaction to a failed item.
///
/// `attempts` counts retries already spent on the item.
pub(crate) fn halt_action(
    on_error: OnError,
    interactive: bool,
    attempts: u8,
    max_retries: u8,
) -> HaltAction {
    match on_error {
        OnError::Ask if interactive => HaltAction::Prompt,
        OnError::Ask | OnError::Stop => HaltAction::Stop,
        OnError::Skip => HaltAction::Skip,
        OnError::Retry if attempts < max_retries => HaltAction::Retry,
        OnError::Retry => HaltAction::Stop,
    }
}

/// Pulls video links out of the command-line arguments in order.
///
/// Single-video links become watch URLs so the recovery key does not depend
/// on how the link was shared.
pub(crate) fn collect_urls(raw_urls: &[String]) -> Vec<String> {
    let mut urls = Vec::new();
    for parsed in extract_urls(&raw_urls.join("\n")) {
        match parsed {
            Ok(url) => urls.push(canonical_video_url(&url)),
            Err(e) => warn!(error = %e, "skipping input"),
        }
    }
    urls
}

pub(crate) async fn run_downloader() -> Result<ProcessExit> {
    let cli = Cli::parse();
    let args = &cli.download;

    let dumb_terminal = terminal::is_dumb_terminal();
    let no_color = terminal::should_disable_color(
        args.no_color,
        terminal::no_color_env_requested(),
        dumb_terminal,
    );
    terminal::init_tracing(
        terminal::resolve_default_log_level(args.verbose, args.quiet),
        no_color,
    );
    debug!(?cli, "CLI arguments parsed");

    let store = RecoveryStore::open_default().context("Could not locate the recovery file")?;
    debug!(path = %store.path().display(), "recovery store");

    if let Some(exit) = command_dispatcher::try_dispatch(&cli, &store)? {
        return Ok(exit);
    }

    let loaded = app_config::load_default_file_config()?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), found = loaded.config.is_some(), "config file");
    }
    let ctx = context::build_context(args, loaded.config.as_ref())?;

    let interactive = io::stdin().is_terminal() && !ctx.quiet;
    let show_progress =
        terminal::should_show_progress(io::stderr().is_terminal(), ctx.quiet, dumb_terminal);
    let driver = Driver::new(ctx, store, show_progress, interactive);

    match &cli.command {
        Some(Command::Resume { key }) => driver.resume(key.as_deref()).await,
        _ => driver.download(&args.urls).await,
    }
}

/// Runs downloads for one invocation.
struct Driver {
    ctx: RunContext,
    store: RecoveryStore,
    manager: Arc<ProcessManager>,
    view: ProgressView,
    interactive: bool,
}

impl Driver {
    fn new(ctx: RunContext, store: RecoveryStore, show_progress: bool, interactive: bool) -> Self {
        let manager = Arc::new(ProcessManager::new(ctx.settings.clone()));
        let view = ProgressView::new(show_progress, ctx.quiet);
        Self {
            ctx,
            store,
            manager,
            view,
            interactive,
        }
    }

    /// Downloads the URLs typed on the command line.
    async fn download(&self, raw_urls: &[String]) -> Result<ProcessExit> {
        if raw_urls.is_empty() {
            println!("Nothing to download. Pass one or more video URLs:");
            println!("  dlqueue https://www.youtube.com/watch?v=<id>");
            println!("Run `dlqueue pending` to see unfinished downloads.");
            return Ok(ProcessExit::Success);
        }

        let mut urls = collect_urls(raw_urls);
        match urls.len() {
            0 => bail!("No valid URLs found in input"),
            1 => {
                let url = urls.remove(0);
                let title = url.clone();
                self.run_single(url, title, self.ctx.format()).await
            }
            _ => {
                let inputs = urls.into_iter().map(QueueInput::from_url).collect();
                let label = self.ctx.label.clone().unwrap_or_default();
                self.run_queue(inputs, self.ctx.format(), &label).await
            }
        }
    }

    /// Picks up an entry from the recovery store, newest when `key` is omitted.
    async fn resume(&self, key: Option<&str>) -> Result<ProcessExit> {
        let entry = match key {
            Some(key) => self.store.find_by_key(key)?.ok_or_else(|| {
                anyhow!("No unfinished download with key '{key}'. Run `dlqueue pending` to list them.")
            })?,
            None => match self.store.list()?.into_iter().next() {
                Some(entry) => entry,
                None => {
                    println!("Nothing to resume.");
                    return Ok(ProcessExit::Success);
                }
            },
        };
        info!(key = %entry.key(), queue = entry.is_queue(), "resuming");

        let format = self.ctx.format_for(&entry.format_id);
        if entry.is_queue() {
            self.run_queue(entry.queue_inputs(), format, &entry.title)
                .await
        } else {
            self.run_single(entry.url, entry.title, format).await
        }
    }

    fn prepare_output_dir(&self) -> Result<()> {
        let dir = context::effective_download_dir(&self.ctx);
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create download directory '{}'", dir.display()))?;
            info!(dir = %dir.display(), "Created download directory");
        }
        Ok(())
    }

    fn command_channel(&self) -> UnboundedReceiver<UserCommand> {
        let (tx, rx) = mpsc::unbounded_channel();
        input::spawn_listeners(&tx, self.interactive);
        if self.interactive {
            self.view.println(COMMAND_HINT);
        }
        rx
    }

    // ==== Standalone ====

    async fn run_single(
        &self,
        url: String,
        title: String,
        format: FormatSelection,
    ) -> Result<ProcessExit> {
        self.prepare_output_dir()?;

        let mut request = DownloadRequest::standalone(JobId::new(1), url, title, format);
        request.options = self.ctx.extras.options;
        request.cookies = self.ctx.extras.cookies.clone();

        let entry = RecoveryEntry::single(
            &request.recovery.key,
            &request.format.format_id,
            &request.recovery.title,
        );
        if let Err(e) = self.store.upsert(entry) {
            warn!(error = %e, "could not record download for recovery");
        }

        let mut commands = self.command_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let _job = self.manager.start(request.clone(), events_tx);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(DownloadEvent::Progress(progress)) => {
                        self.view.show_event(&request.title, &progress);
                    }
                    Some(DownloadEvent::Finished(result)) => {
                        self.view.finish();
                        return Ok(self.finish_single(&request, &result));
                    }
                    None => bail!("Download task ended without reporting a result"),
                },
                Some(command) = commands.recv() => self.control_single(command),
            }
        }
    }

    fn control_single(&self, command: UserCommand) {
        match command {
            UserCommand::Pause => self.pause(),
            UserCommand::Resume => self.resume_process(),
            UserCommand::Skip => self.view.println("Nothing to skip outside a queue"),
            UserCommand::Cancel => self.manager.cancel(),
        }
    }

    fn finish_single(&self, request: &DownloadRequest, result: &ResultEvent) -> ProcessExit {
        match &result.outcome {
            JobOutcome::Completed { destination } => {
                if let Err(e) = self.store.remove(&request.recovery.key) {
                    warn!(error = %e, "could not clear recovery entry");
                }
                match destination {
                    Some(path) => self.view.println(format!("Saved {path}")),
                    None => self.view.println(format!("Downloaded {}", request.title)),
                }
                ProcessExit::Success
            }
            JobOutcome::Failed { message } => {
                eprintln!("Download failed: {message}");
                eprintln!("Run `dlqueue resume` to try again.");
                ProcessExit::Failure
            }
            JobOutcome::Cancelled => {
                eprintln!("Download cancelled. Run `dlqueue resume` to continue later.");
                ProcessExit::Failure
            }
        }
    }

    fn pause(&self) {
        if !self.manager.supports_pause() {
            self.view.println("Pausing is not supported on this platform");
            return;
        }
        match self.manager.pause() {
            Ok(true) => self.view.set_paused(true),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "pause failed"),
        }
    }

    fn resume_process(&self) {
        match self.manager.resume() {
            Ok(true) => self.view.println("Resumed"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "resume failed"),
        }
    }

    // ==== Queue ====

    async fn run_queue(
        &self,
        inputs: Vec<QueueInput>,
        format: FormatSelection,
        label: &str,
    ) -> Result<ProcessExit> {
        self.prepare_output_dir()?;

        let (mut state, effects) =
            QueueState::start(inputs, format, label, self.ctx.extras.clone())?;
        self.view.println(format!(
            "Queue '{}': {} items",
            state.label(),
            state.total()
        ));

        let mut commands = self.command_channel();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut run = QueueRun {
            events_tx,
            in_flight: 0,
            retries: (0, 0),
        };
        self.execute(effects, &mut run);
        self.view.show_queue(&state, self.manager.is_paused());

        while !(state.is_finished() && run.in_flight == 0) {
            tokio::select! {
                Some(event) = events.recv() => {
                    state = match event {
                        DownloadEvent::Progress(progress) => {
                            let (state, effects) = state.reduce(QueueEvent::Progress(progress));
                            self.execute(effects, &mut run);
                            state
                        }
                        DownloadEvent::Finished(result) => {
                            run.in_flight = run.in_flight.saturating_sub(1);
                            self.on_result(state, result, &mut run)
                        }
                    };
                    self.view.show_queue(&state, self.manager.is_paused());
                }
                Some(command) = commands.recv() => {
                    state = self.control_queue(state, command, &mut run);
                    self.view.show_queue(&state, self.manager.is_paused());
                }
            }
        }

        self.view.finish();
        Ok(self.finish_queue(&state))
    }

    fn on_result(&self, state: QueueState, result: ResultEvent, run: &mut QueueRun) -> QueueState {
        let index = result.queue_index;
        let before = state.item(index).map(|item| item.status);
        let (state, effects) = state.reduce(QueueEvent::Result(result));
        self.execute(effects, run);

        if let Some(item) = state.item(index).filter(|item| Some(item.status) != before) {
            match item.status {
                QueueStatus::Complete => self.view.println(format!(
                    "[{}/{}] done: {}",
                    item.index,
                    state.total(),
                    item.destination.as_deref().unwrap_or(item.display_title())
                )),
                QueueStatus::Error => self.view.println(format!(
                    "[{}/{}] failed: {}: {}",
                    item.index,
                    state.total(),
                    item.display_title(),
                    item.error.as_deref().unwrap_or("unknown error")
                )),
                _ => {}
            }
        }

        if state.is_halted() {
            self.on_halt(state, run)
        } else {
            state
        }
    }

    fn on_halt(&self, state: QueueState, run: &mut QueueRun) -> QueueState {
        let attempts = run.attempts(state.current_index());
        match halt_action(
            self.ctx.on_error,
            self.interactive,
            attempts,
            self.ctx.max_retries,
        ) {
            HaltAction::Prompt => {
                self.view
                    .println("Queue halted: type s to skip, r to retry or c to cancel");
                state
            }
            HaltAction::Skip => self.apply(state, QueueEvent::Skip, run),
            HaltAction::Retry => {
                self.view.println(format!(
                    "Retrying ({}/{})",
                    attempts + 1,
                    self.ctx.max_retries
                ));
                self.retry(state, run)
            }
            HaltAction::Stop => self.apply(state, QueueEvent::Cancel, run),
        }
    }

    fn control_queue(&self, state: QueueState, command: UserCommand, run: &mut QueueRun) -> QueueState {
        if state.is_finished() {
            return state;
        }
        match command {
            UserCommand::Cancel => self.apply(state, QueueEvent::Cancel, run),
            UserCommand::Skip if state.is_halted() => self.apply(state, QueueEvent::Skip, run),
            UserCommand::Skip => {
                self.view.println("Skip is available once an item fails");
                state
            }
            UserCommand::Resume if state.is_halted() => self.retry(state, run),
            UserCommand::Resume => {
                self.resume_process();
                state
            }
            UserCommand::Pause if state.is_halted() => state,
            UserCommand::Pause => {
                self.pause();
                state
            }
        }
    }

    fn retry(&self, state: QueueState, run: &mut QueueRun) -> QueueState {
        run.record_retry(state.current_index());
        self.apply(state, QueueEvent::Retry, run)
    }

    fn apply(&self, state: QueueState, event: QueueEvent, run: &mut QueueRun) -> QueueState {
        let (state, effects) = state.reduce(event);
        self.execute(effects, run);
        state
    }

    fn execute(&self, effects: Vec<QueueEffect>, run: &mut QueueRun) {
        for effect in effects {
            match effect {
                QueueEffect::Launch(request) => {
                    run.in_flight += 1;
                    let _job = self.manager.start(request, run.events_tx.clone());
                }
                QueueEffect::Recovery(update) => self.store.apply_logged(update),
                QueueEffect::StopProcess => self.manager.cancel(),
            }
        }
    }

    fn finish_queue(&self, state: &QueueState) -> ProcessExit {
        let tally = state.tally();
        let summary = format!(
            "Queue '{}': {} downloaded, {} failed, {} skipped, {} left",
            state.label(),
            tally.complete,
            tally.failed,
            tally.skipped,
            tally.pending
        );
        if self.ctx.quiet {
            debug!("{summary}");
        } else {
            eprintln!("{summary}");
        }
        if state.remaining() > 0 {
            eprintln!(
                "Resume with: dlqueue resume \"{}\"",
                queue_key(state.label())
            );
        }
        exit_handler::queue_exit_outcome(tally)
    }
}

/// Bookkeeping for one queue loop.
struct QueueRun {
    events_tx: UnboundedSender<DownloadEvent>,
    /// Jobs started whose result has not arrived yet.
    in_flight: usize,
    /// `(item index, retries spent on it)`.
    retries: (usize, u8),
}

impl QueueRun {
    fn attempts(&self, index: usize) -> u8 {
        if self.retries.0 == index { self.retries.1 } else { 0 }
    }

    fn record_retry(&mut self, index: usize) {
        let spent = self.attempts(index).saturating_add(1);
        self.retries = (index, spent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_urls_canonicalizes_and_skips_invalid() {
        let raw = vec![
            "https://youtu.be/dQw4w9WgXcQ?si=share".to_string(),
            "https://example.com:99999/bad".to_string(),
            "https://www.youtube.com/playlist?list=PL123".to_string(),
        ];
        assert_eq!(
            collect_urls(&raw),
            vec![
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                "https://www.youtube.com/playlist?list=PL123".to_string(),
            ]
        );
    }

    #[test]
    fn test_halt_action_ask_prompts_only_on_terminal() {
        assert_eq!(halt_action(OnError::Ask, true, 0, 3), HaltAction::Prompt);
        assert_eq!(halt_action(OnError::Ask, false, 0, 3), HaltAction::Stop);
    }

    #[test]
    fn test_halt_action_explicit_policies_ignore_terminal() {
        assert_eq!(halt_action(OnError::Skip, true, 0, 3), HaltAction::Skip);
        assert_eq!(halt_action(OnError::Stop, true, 0, 3), HaltAction::Stop);
    }

    #[test]
    fn test_halt_action_retry_until_budget_spent() {
        assert_eq!(halt_action(OnError::Retry, false, 0, 2), HaltAction::Retry);
        assert_eq!(halt_action(OnError::Retry, false, 1, 2), HaltAction::Retry);
        assert_eq!(halt_action(OnError::Retry, false, 2, 2), HaltAction::Stop);
        assert_eq!(halt_action(OnError::Retry, false, 0, 0), HaltAction::Stop);
    }

    #[test]
    fn test_queue_run_counts_retries_per_item() {
        let (events_tx, _events) = mpsc::unbounded_channel();
        let mut run = QueueRun {
            events_tx,
            in_flight: 0,
            retries: (0, 0),
        };
        assert_eq!(run.attempts(1), 0);
        run.record_retry(1);
        run.record_retry(1);
        assert_eq!(run.attempts(1), 2);
        assert_eq!(run.attempts(2), 0);
        run.record_retry(2);
        assert_eq!(run.attempts(2), 1);
        assert_eq!(run.attempts(1), 0);
    }
}
