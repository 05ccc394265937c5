//! Terminal outcomes for one-shot tasks

use crate::error::TaskError;

/// Terminal outcome of a one-shot async operation
///
/// One variant per way a zero-or-one-result operation can end: with a value,
/// without one, or with an error. A task publishes exactly one `Outcome`;
/// everything downstream (caching, replay, delivery) treats the three cases
/// uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation produced a value
    Value(T),
    /// The operation completed without producing a value
    Empty,
    /// The operation failed
    Error(TaskError),
}

impl<T> Outcome<T> {
    /// Short label for the outcome variant (for logs and events)
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Value(_) => "value",
            Outcome::Empty => "empty",
            Outcome::Error(_) => "error",
        }
    }

    /// True if the outcome carries a value
    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    /// True if the operation completed without a value
    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty)
    }

    /// True if the operation failed
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    /// Extract the value, discarding the other cases
    pub fn into_value(self) -> Option<T> {
        match self {
            Outcome::Value(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, TaskError>> for Outcome<T> {
    fn from(result: Result<T, TaskError>) -> Self {
        match result {
            Ok(value) => Outcome::Value(value),
            Err(err) => Outcome::Error(err),
        }
    }
}

impl<T> From<Option<T>> for Outcome<T> {
    fn from(maybe: Option<T>) -> Self {
        match maybe {
            Some(value) => Outcome::Value(value),
            None => Outcome::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_kind() {
        assert_eq!(Outcome::Value(1).kind(), "value");
        assert_eq!(Outcome::<u32>::Empty.kind(), "empty");
        assert_eq!(Outcome::<u32>::Error(TaskError::new("x")).kind(), "error");
    }

    #[test]
    fn test_outcome_predicates() {
        assert!(Outcome::Value(1).is_value());
        assert!(Outcome::<u32>::Empty.is_empty());
        assert!(Outcome::<u32>::Error(TaskError::new("x")).is_error());
        assert!(!Outcome::Value(1).is_error());
    }

    #[test]
    fn test_outcome_into_value() {
        assert_eq!(Outcome::Value(5).into_value(), Some(5));
        assert_eq!(Outcome::<u32>::Empty.into_value(), None);
        assert_eq!(Outcome::<u32>::Error(TaskError::new("x")).into_value(), None);
    }

    #[test]
    fn test_outcome_from_result() {
        let ok: Outcome<u32> = Ok(7).into();
        assert_eq!(ok, Outcome::Value(7));

        let err: Outcome<u32> = Err(TaskError::new("bad")).into();
        assert_eq!(err, Outcome::Error(TaskError::new("bad")));
    }

    #[test]
    fn test_outcome_from_option() {
        let some: Outcome<u32> = Some(7).into();
        assert_eq!(some, Outcome::Value(7));

        let none: Outcome<u32> = None.into();
        assert_eq!(none, Outcome::Empty);
    }
}
