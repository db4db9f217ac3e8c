// ============================================================================
// spark-query - Fetch State
// Tagged output of a dispatcher
// ============================================================================

use crate::core::error::FetchError;

/// What a dispatcher reports for the latest query.
///
/// `Loading` is a variant of its own, so an empty result (`Ready(vec![])`)
/// can never be mistaken for "still fetching".
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    /// A fetch for the latest query is outstanding.
    Loading,
    /// The latest query's fetch succeeded.
    Ready(T),
    /// The latest query's fetch failed. Not retried.
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    /// The settled outcome, or `None` while loading.
    pub fn settled(&self) -> Option<Result<T, FetchError>>
    where
        T: Clone,
    {
        match self {
            FetchState::Loading => None,
            FetchState::Ready(value) => Some(Ok(value.clone())),
            FetchState::Failed(error) => Some(Err(error.clone())),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            FetchState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Result<T, FetchError>> for FetchState<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => FetchState::Ready(value),
            Err(error) => FetchState::Failed(error),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
