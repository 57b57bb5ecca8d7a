//! CLI command routing: runs Pending and Forget subcommands.
//!
//! `resume` and plain URL arguments fall through to the download flow, so
//! this returns `None` for them.

use anyhow::Result;
use dlqueue_core::recovery::RecoveryStore;

use crate::cli::{Cli, Command};
use crate::{ProcessExit, commands};

/// If `cli` has a bookkeeping command, run it and return `Some(exit)`; otherwise return `None`.
pub(crate) fn try_dispatch(cli: &Cli, store: &RecoveryStore) -> Result<Option<ProcessExit>> {
    match &cli.command {
        Some(Command::Pending) => {
            commands::run_pending_command(store)?;
            Ok(Some(ProcessExit::Success))
        }
        Some(Command::Forget { key }) => commands::run_forget_command(store, key).map(Some),
        Some(Command::Resume { .. }) | None => Ok(None),
    }
}
