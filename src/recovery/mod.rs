//! Crash recovery for unfinished downloads.
//!
//! The queue describes what is still owed as [`RecoveryUpdate`]s; the
//! [`RecoveryStore`] keeps the resulting [`RecoveryEntry`] list on disk so
//! a later run can resume it.

mod entry;
mod error;
mod store;

pub use entry::{
    DEFAULT_QUEUE_LABEL, RecoveryEntry, RecoveryUpdate, queue_description, queue_key, queue_label,
    queue_update,
};
pub use error::RecoveryError;
pub use store::{RECOVERY_FILE_NAME, RecoveryStore, default_recovery_path};
