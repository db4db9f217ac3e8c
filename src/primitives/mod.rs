// ============================================================================
// spark-query - Primitives Module
// Cells, gates, view streams and the subscriptions tying them together
// ============================================================================

pub mod cell;
pub mod gate;
pub mod subscription;
pub mod view;

// Re-export for convenience
pub use cell::QueryCell;
pub use gate::{gate, gate_on, GatePolicy};
pub use subscription::{SubscriberList, Subscription, SubscriptionId};
pub use view::ViewStream;
