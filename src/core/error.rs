// ============================================================================
// spark-query - Errors
// Fetch failures from the data source and construction-time misuse
// ============================================================================

use thiserror::Error;

// =============================================================================
// FETCH ERROR
// =============================================================================

/// A failure reported by the external data source for one fetch execution.
///
/// The dispatcher forwards each failure of the latest execution exactly once
/// and never retries. `Clone` because views replay their latest value to
/// late subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never produced a response (connection refused, reset, ...)
    #[error("transport error: {0}")]
    Transport(String),

    /// The data source gave up waiting
    #[error("fetch timed out")]
    Timeout,

    /// The data source answered with a refusal
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl FetchError {
    /// Shorthand for a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        FetchError::Transport(message.into())
    }

    /// Shorthand for a rejection
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        FetchError::Rejected {
            status,
            message: message.into(),
        }
    }
}

// =============================================================================
// PIPELINE ERROR
// =============================================================================

/// Programmer errors detected while building a pipeline.
///
/// These fail fast at construction instead of surfacing at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// Gates, composers and dispatchers schedule work on the current tokio
    /// runtime, and none was found on this thread
    #[error("no tokio runtime on this thread")]
    NoRuntime,

    /// A page must hold at least one row
    #[error("page size must be at least 1, got {0}")]
    InvalidPageSize(usize),

    /// Sort direction wire values are 1 and -1
    #[error("sort direction must be 1 or -1, got {0}")]
    InvalidDirection(i8),
}

// =============================================================================
// TESTS
// =============================================================================
