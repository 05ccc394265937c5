//! Error type for failed tasks

use thiserror::Error;

/// Error terminal outcome of a one-shot task
///
/// Cloneable so a cached outcome can be replayed to any number of
/// subscribers. The message is the only payload: by the time an outcome is
/// cached and multicast, the failure is data to be displayed or logged, not
/// a live error to be downcast.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task failed: {message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    /// Create an error from a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for TaskError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for TaskError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_error_message() {
        let err = TaskError::new("connection refused");
        assert_eq!(err.message(), "connection refused");
        assert_eq!(err.to_string(), "task failed: connection refused");
    }

    #[test]
    fn test_task_error_from_str() {
        let err: TaskError = "nope".into();
        assert_eq!(err, TaskError::new("nope"));
    }

    #[test]
    fn test_task_error_clone_eq() {
        let err = TaskError::new("boom");
        assert_eq!(err.clone(), err);
    }
}
