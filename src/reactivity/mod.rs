// ============================================================================
// spark-query - Reactivity Module
// Equality, batching and scheduling
// ============================================================================

pub mod batching;
pub mod equality;
pub mod scheduling;

pub use batching::{batch, is_batching};
pub use equality::equals;
pub use scheduling::{flush_pending, has_runtime, schedule_flush, Spawner};
