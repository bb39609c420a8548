//! Error types for the placement optimizer.
//!
//! Store failures are reported by the store as [`StoreError`]; everything the caller
//! of [`crate::find_placements`] can see is a [`SlotFinderError`].

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for optimizer operations
pub type SlotFinderResult<T> = Result<T, SlotFinderError>;

/// Errors raised by a [`crate::store::ScheduleStore`] or [`crate::store::PlanExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be read (connection lost, lock poisoned, ...)
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Stored data is inconsistent (e.g. a group references an unknown student)
    #[error("inconsistent store data: {0}")]
    Inconsistent(String),

    /// A plan could not be applied; nothing was committed
    #[error("plan rejected: {0}")]
    PlanRejected(String),
}

/// Coarse classification of [`SlotFinderError`] for callers that map errors to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    PreconditionFailed,
    DependencyUnavailable,
    Configuration,
}

#[derive(Debug, thiserror::Error)]
pub enum SlotFinderError {
    /// Unknown student (or other entity named by the request)
    #[error("not found: {0}")]
    NotFound(String),

    /// The request cannot be served in the current state, e.g. no enrollment for the term
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// Reading the schedule snapshot failed. The whole request may be retried.
    #[error("dependency unavailable during {operation}: {source}")]
    DependencyUnavailable {
        operation: String,
        #[source]
        source: StoreError,
    },

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SlotFinderError {
    pub fn dependency(operation: impl Into<String>, source: StoreError) -> Self {
        Self::DependencyUnavailable {
            operation: operation.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SlotFinderError::NotFound(_) => ErrorKind::NotFound,
            SlotFinderError::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            SlotFinderError::DependencyUnavailable { .. } => ErrorKind::DependencyUnavailable,
            SlotFinderError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Only store outages are worth retrying; the optimizer never retries internally
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SlotFinderError::DependencyUnavailable {
                source: StoreError::Unavailable(_),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_is_retryable() {
        let err = SlotFinderError::dependency(
            "list_candidate_groups",
            StoreError::Unavailable("connection reset".to_string()),
        );
        assert_eq!(err.kind(), ErrorKind::DependencyUnavailable);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("list_candidate_groups"));
    }

    #[test]
    fn test_not_found_is_not_retryable() {
        let err = SlotFinderError::NotFound("student 42".to_string());
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!err.is_retryable());
    }
}
