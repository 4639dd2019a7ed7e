use crate::task::TaskId;

/// Domain errors raised by task mutations and input parsing.
///
/// None of these are fatal: callers surface them to the user and keep
/// whatever is already in memory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,
    /// No task with this id exists in the store.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("invalid date (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),
    #[error("invalid priority (expected low, medium or high): {0}")]
    InvalidPriority(String),
    #[error("invalid month (expected YYYY-MM): {0}")]
    InvalidMonth(String),
}
