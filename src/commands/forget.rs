//! Forget command handler: drop an unfinished entry.

use anyhow::Result;
use dlqueue_core::recovery::RecoveryStore;
use tracing::info;

use crate::ProcessExit;

pub fn run_forget_command(store: &RecoveryStore, key: &str) -> Result<ProcessExit> {
    if store.find_by_key(key)?.is_none() {
        eprintln!("No unfinished download with key '{key}'. Run `dlqueue pending` to list them.");
        return Ok(ProcessExit::Failure);
    }
    store.remove(key)?;
    info!(%key, "recovery entry removed");
    println!("Forgot {key}");
    Ok(ProcessExit::Success)
}
