//! Decoder for the downloader's line-oriented progress output.
//!
//! yt-dlp run with `--newline` prints one status line per progress tick:
//!
//! ```text
//! [download]  10.5% of 50.00MiB at 2.50MiB/s ETA 00:20
//! [download] Destination: /videos/clip.mp4
//! ```
//!
//! [`parse_line`] turns such a line into a [`ProgressLine`]. Lines that carry
//! nothing recognisable decode to [`ProgressLine::default()`]; unmatched input
//! is never an error.

use std::sync::LazyLock;

use regex::Regex;

/// Phase tag reported when a percentage line has no leading `[tag]`.
pub const DEFAULT_PHASE: &str = "[download]";

#[allow(clippy::expect_used)]
static PERCENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(\[[^\]]+\])\s+)?(\d+(?:\.\d+)?)%").expect("percent regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static SPEED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bat\s+(\S+/s)").expect("speed regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ETA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bETA\s+(\d{1,2}:\d{2}(?::\d{2})?)").expect("ETA regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static FORMAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/s\s+(format\s+\S+)").expect("format regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static DESTINATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[[^\]]+\]\s+Destination:\s+(.+\.[A-Za-z0-9]+)\s*$")
        .expect("destination regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static MERGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*\[Merger\]\s+Merging formats into\s+"(.+)"\s*$"#)
        .expect("merger regex is valid") // Static pattern, safe to panic
});

#[allow(clippy::expect_used)]
static ALREADY_DOWNLOADED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\[download\]\s+(.+\.[A-Za-z0-9]+) has already been downloaded")
        .expect("already-downloaded regex is valid") // Static pattern, safe to panic
});

/// Fields decoded from a single output line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressLine {
    /// Completion percentage in `0.0..=100.0`.
    pub percent: f64,
    /// Transfer rate exactly as printed (`2.50MiB/s`).
    pub speed: String,
    /// Remaining time as printed (`MM:SS` or `HH:MM:SS`).
    pub eta: String,
    /// Phase tag, optionally followed by the inline format id.
    pub phase: String,
    /// Output path announced by the downloader.
    pub destination: String,
}

impl ProgressLine {
    /// Returns true when the line carried no usable information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.percent == 0.0
            && self.speed.is_empty()
            && self.eta.is_empty()
            && self.phase.is_empty()
            && self.destination.is_empty()
    }
}

/// Decodes one line of downloader output.
///
/// Destination announcements (`[download] Destination: …`, merger output,
/// "has already been downloaded") yield only a destination. Everything else
/// is scanned for a percentage, a speed, an ETA and an inline format id.
#[must_use]
pub fn parse_line(line: &str) -> ProgressLine {
    if let Some(destination) = parse_destination(line) {
        return ProgressLine {
            destination,
            ..ProgressLine::default()
        };
    }

    let mut parsed = ProgressLine::default();

    if let Some(caps) = PERCENT_PATTERN.captures(line) {
        parsed.percent = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .map_or(0.0, |p| p.clamp(0.0, 100.0));
        let tag = caps.get(1).map_or(DEFAULT_PHASE, |m| m.as_str());
        parsed.phase = match FORMAT_PATTERN.captures(line).and_then(|c| c.get(1)) {
            Some(format) => format!("{tag} {}", format.as_str()),
            None => tag.to_string(),
        };
    }

    if let Some(speed) = SPEED_PATTERN.captures(line).and_then(|c| c.get(1)) {
        parsed.speed = speed.as_str().to_string();
    }

    if let Some(eta) = ETA_PATTERN.captures(line).and_then(|c| c.get(1)) {
        parsed.eta = eta.as_str().to_string();
    }

    parsed
}

fn parse_destination(line: &str) -> Option<String> {
    [
        &*DESTINATION_PATTERN,
        &*MERGER_PATTERN,
        &*ALREADY_DOWNLOADED_PATTERN,
    ]
    .iter()
    .find_map(|pattern| pattern.captures(line))
    .and_then(|caps| caps.get(1))
    .map(|m| m.as_str().trim().to_string())
}
