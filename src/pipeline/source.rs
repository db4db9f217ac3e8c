// ============================================================================
// spark-query - Data Source
// The external, asynchronous collaborator the pipeline fetches from
// ============================================================================

use async_trait::async_trait;

use crate::core::error::FetchError;
use crate::pipeline::query::{CompositeQuery, TotalQuery};

/// The transport behind a list.
///
/// Implementations own retries, timeouts and transport-level cancellation;
/// the pipeline calls each method once per composite query and ignores
/// results that arrive after a newer query was issued. Futures are not
/// required to be `Send`: they run on the pipeline's local task set.
#[async_trait(?Send)]
pub trait DataSource: 'static {
    /// The owner context a list belongs to (an account, a project, ...).
    type Scope: Clone + 'static;

    /// One row of the list.
    type Item: Clone + 'static;

    /// One page of items, sorted and filtered as the query says.
    async fn fetch_page(
        &self,
        scope: &Self::Scope,
        query: &CompositeQuery,
    ) -> Result<Vec<Self::Item>, FetchError>;

    /// Number of items matching the query's filters, across all pages.
    async fn fetch_total(&self, scope: &Self::Scope, query: &TotalQuery) -> Result<u64, FetchError>;
}
