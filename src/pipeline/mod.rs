// ============================================================================
// spark-query - Pipeline Module
// Query values, composition, dispatch and the assembled list pipeline
// ============================================================================

pub mod composer;
pub mod dispatcher;
pub mod list;
pub mod query;
pub mod source;
pub mod state;

pub use composer::Composer;
pub use dispatcher::Dispatcher;
pub use list::{ListPipeline, RowsResult};
pub use query::{CompositeQuery, SortDirection, TotalQuery};
pub use source::DataSource;
pub use state::FetchState;
