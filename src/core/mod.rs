// ============================================================================
// spark-query - Core Module
// Context, types, errors and configuration shared by every layer
// ============================================================================

pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{PipelineConfig, QueryDefaults};
pub use constants::*;
pub use context::{with_context, PendingFlush, PipelineContext};
pub use error::{FetchError, PipelineError};
pub use types::{Callback, DisposeFn, EqualsFn, FetchFn, FetchFuture, Trigger};
