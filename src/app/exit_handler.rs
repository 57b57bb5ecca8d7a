//! Exit code logic for the downloader process.
//!
//! Single responsibility: map completion/failure counts to the process exit outcome.

use dlqueue_core::queue::QueueTally;

use crate::ProcessExit;

/// Determines the process exit outcome from completed and failed download counts.
pub(crate) fn determine_exit_outcome(completed: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if completed > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

/// Exit outcome for a finished or stopped queue.
///
/// Skipped items and items left unfinished count as failures.
pub(crate) fn queue_exit_outcome(tally: QueueTally) -> ProcessExit {
    determine_exit_outcome(
        tally.complete,
        tally.failed + tally.skipped + tally.pending,
    )
}
