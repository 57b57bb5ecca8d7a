//! CLI command handlers.

mod forget;
mod pending;

pub use forget::run_forget_command;
pub use pending::run_pending_command;
