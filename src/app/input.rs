//! Keyboard and signal commands for a running download.

use std::io::{self, BufRead};
use std::thread;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A control request typed by the user or raised by Ctrl-C.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UserCommand {
    Pause,
    /// Resume a paused download, or retry a failed queue item.
    Resume,
    Skip,
    Cancel,
}

/// One-line help shown when commands are read from the terminal.
pub(crate) const COMMAND_HINT: &str = "Keys: p pause, r resume/retry, s skip, c cancel (then Enter)";

/// Maps a typed line to a command. Case and surrounding blanks are ignored.
pub(crate) fn parse_command(line: &str) -> Option<UserCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(UserCommand::Pause),
        "r" | "resume" | "retry" => Some(UserCommand::Resume),
        "s" | "skip" => Some(UserCommand::Skip),
        "c" | "cancel" | "q" | "quit" => Some(UserCommand::Cancel),
        _ => None,
    }
}

/// Starts the command sources feeding `commands`.
///
/// Ctrl-C always maps to [`UserCommand::Cancel`]. Typed commands are read
/// only when `interactive`; the reader is a plain thread so a pending read
/// never holds up runtime shutdown.
pub(crate) fn spawn_listeners(commands: &UnboundedSender<UserCommand>, interactive: bool) {
    let ctrl_c = commands.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            if ctrl_c.send(UserCommand::Cancel).is_err() {
                break;
            }
        }
    });

    if !interactive {
        return;
    }
    let typed = commands.clone();
    let spawned = thread::Builder::new()
        .name("dlqueue-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Some(command) => {
                        if typed.send(command).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!("{COMMAND_HINT}"),
                }
            }
        });
    if let Err(e) = spawned {
        debug!(error = %e, "stdin reader not started");
    }
}
