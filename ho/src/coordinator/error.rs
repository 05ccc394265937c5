//! Coordinator precondition errors

use thiserror::Error;

/// Precondition violations on the coordinator's public contract
///
/// Every variant signals a caller sequencing bug (double connect, double
/// subscribe, use after destroy), not a runtime condition to recover from.
/// Callers propagate these; handling them gracefully would mask a lifecycle
/// bug that leaks the previous task or observer. Operation failure is never
/// a coordinator error - it travels as [`cachedtask::Outcome::Error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// `connect` was called while a task is still running
    #[error("a task is already connected and still running")]
    AlreadyConnected,

    /// `subscribe` was called while an observer factory is registered
    #[error("an observer factory is already subscribed")]
    AlreadySubscribed,

    /// The coordinator was already destroyed
    #[error("coordinator has been destroyed")]
    Destroyed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CoordinatorError::AlreadyConnected.to_string(),
            "a task is already connected and still running"
        );
        assert_eq!(
            CoordinatorError::AlreadySubscribed.to_string(),
            "an observer factory is already subscribed"
        );
        assert_eq!(CoordinatorError::Destroyed.to_string(), "coordinator has been destroyed");
    }
}
