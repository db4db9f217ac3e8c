// ============================================================================
// spark-query - Reactive Query Composition for Paged Lists
// ============================================================================
//
// Six query cells (sort, direction, page, page size, search, category) are
// gated, coalesced into distinct composite queries and dispatched to an
// asynchronous data source with latest-wins cancellation. Results fan out
// to any number of subscribers through replaying view streams.
//
// Everything is single-threaded: handles are `Rc`, deferred work runs on a
// tokio `LocalSet`.
// ============================================================================

#[macro_use]
mod macros;

pub mod core;
pub mod pipeline;
pub mod primitives;
pub mod reactivity;

// Re-export core items at crate root
pub use crate::core::constants;
pub use crate::core::config::{PipelineConfig, QueryDefaults};
pub use crate::core::context::{with_context, PendingFlush, PipelineContext};
pub use crate::core::error::{FetchError, PipelineError};
pub use crate::core::types::{Callback, DisposeFn, EqualsFn, FetchFn, FetchFuture, Trigger};

// Re-export primitives
pub use primitives::cell::QueryCell;
pub use primitives::gate::{gate, gate_on, GatePolicy};
pub use primitives::subscription::{SubscriberList, Subscription, SubscriptionId};
pub use primitives::view::ViewStream;

// Re-export reactivity functions
pub use reactivity::batching::{batch, is_batching};
pub use reactivity::equality::equals;
pub use reactivity::scheduling::{flush_pending, has_runtime, Spawner};

// Re-export the pipeline
pub use pipeline::{
    Composer, CompositeQuery, DataSource, Dispatcher, FetchState, ListPipeline, RowsResult,
    SortDirection, TotalQuery,
};

// =============================================================================
// TESTS
// =============================================================================
