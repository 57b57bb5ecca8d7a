//! Error types for queue operations.

use thiserror::Error;

/// Errors raised by the queue state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A queue needs at least one item to have a first item to download.
    #[error("cannot start a queue with no items")]
    EmptyQueue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_queue_display() {
        assert_eq!(
            QueueError::EmptyQueue.to_string(),
            "cannot start a queue with no items"
        );
    }
}
