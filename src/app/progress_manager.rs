//! Progress UI (bar) for download runs.

use std::time::Duration;

use dlqueue_core::download::ProgressEvent;
use dlqueue_core::queue::{QueueItem, QueueState, QueueStatus};
use indicatif::{ProgressBar, ProgressStyle};

/// Bar resolution: tenths of a percent.
const BAR_LENGTH: u64 = 1000;

const PAUSED_MESSAGE: &str = "paused (r to resume)";

/// Renders the current item's progress on stderr.
///
/// When disabled the bar is hidden and status lines go to stderr unless
/// quiet.
pub(crate) struct ProgressView {
    bar: ProgressBar,
    enabled: bool,
    quiet: bool,
}

impl ProgressView {
    pub(crate) fn new(enabled: bool, quiet: bool) -> Self {
        let bar = if enabled {
            let bar = ProgressBar::new(BAR_LENGTH);
            bar.set_style(
                ProgressStyle::with_template("{prefix:.bold} [{bar:30}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        } else {
            ProgressBar::hidden()
        };
        Self {
            bar,
            enabled,
            quiet,
        }
    }

    /// Prints a status line above the bar.
    pub(crate) fn println(&self, line: impl AsRef<str>) {
        if self.enabled {
            self.bar.println(line.as_ref());
        } else if !self.quiet {
            eprintln!("{}", line.as_ref());
        }
    }

    /// Updates the bar from a standalone download's progress event.
    pub(crate) fn show_event(&self, title: &str, event: &ProgressEvent) {
        self.bar.set_prefix(title.to_string());
        if event.percent > 0.0 {
            self.bar.set_position(percent_to_position(event.percent));
        }
        self.bar.set_message(status_message(
            event.percent,
            &event.speed,
            &event.eta,
            &event.phase,
        ));
    }

    /// Redraws the bar for the queue's current item.
    ///
    /// `paused` reflects the process manager, which the queue knows nothing about.
    pub(crate) fn show_queue(&self, state: &QueueState, paused: bool) {
        let Some(item) = state.current_item() else {
            return;
        };
        self.bar.set_prefix(format!(
            "[{}/{}] {}",
            item.index,
            state.total(),
            truncate(item.display_title(), 40)
        ));
        self.bar.set_position(percent_to_position(item.progress));
        self.bar.set_message(queue_message(item, paused));
    }

    pub(crate) fn set_paused(&self, paused: bool) {
        if paused {
            self.bar.set_message(PAUSED_MESSAGE);
        }
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn percent_to_position(percent: f64) -> u64 {
    // Clamped to 0..=1000 before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let position = (percent.clamp(0.0, 100.0) * 10.0).round() as u64;
    position
}

fn queue_message(item: &QueueItem, paused: bool) -> String {
    match item.status {
        QueueStatus::Downloading if paused => PAUSED_MESSAGE.to_string(),
        QueueStatus::Downloading => {
            status_message(item.progress, &item.speed, &item.eta, &item.phase)
        }
        status => status.to_string(),
    }
}

fn status_message(percent: f64, speed: &str, eta: &str, phase: &str) -> String {
    let mut parts = vec![format!("{percent:5.1}%")];
    if !speed.is_empty() {
        parts.push(speed.to_string());
    }
    if !eta.is_empty() {
        parts.push(format!("ETA {eta}"));
    }
    if !phase.is_empty() {
        parts.push(phase.to_string());
    }
    parts.join("  ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlqueue_core::queue::QueueInput;

    #[test]
    fn test_percent_to_position_clamps() {
        assert_eq!(percent_to_position(-5.0), 0);
        assert_eq!(percent_to_position(10.56), 106);
        assert_eq!(percent_to_position(250.0), 1000);
    }

    #[test]
    fn test_status_message_skips_empty_parts() {
        assert_eq!(
            status_message(10.5, "2.50MiB/s", "00:20", "[download]"),
            " 10.5%  2.50MiB/s  ETA 00:20  [download]"
        );
        assert_eq!(status_message(0.0, "", "", ""), "  0.0%");
    }

    #[test]
    fn test_paused_item_keeps_paused_message() {
        let mut item = QueueItem::new(1, QueueInput::from_url("https://youtu.be/a"));
        item.status = QueueStatus::Downloading;
        item.progress = 42.0;
        item.speed = "1.00MiB/s".to_string();

        assert_eq!(queue_message(&item, true), PAUSED_MESSAGE);
        assert!(queue_message(&item, false).starts_with(" 42.0%"));

        item.status = QueueStatus::Error;
        assert_eq!(queue_message(&item, true), QueueStatus::Error.to_string());
    }

    #[test]
    fn test_truncate_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
    }

    #[test]
    fn test_hidden_view_accepts_updates() {
        let view = ProgressView::new(false, true);
        view.println("not shown");
        view.set_paused(true);
        view.finish();
    }
}
