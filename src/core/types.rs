// ============================================================================
// spark-query - Type Definitions
// Shared aliases for callbacks, triggers and fetch futures
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use super::error::FetchError;

// =============================================================================
// EQUALITY
// =============================================================================

/// Equality function used by distinct gates.
///
/// Plain `fn` pointers keep policies `Copy`; non-capturing closures coerce.
pub type EqualsFn<T> = fn(&T, &T) -> bool;

// =============================================================================
// CALLBACKS
// =============================================================================

/// Observer callback invoked with each value of a cell or view.
pub type Callback<T> = Rc<dyn Fn(&T)>;

/// Zero-argument signal that "something upstream changed".
///
/// Gates call triggers; composers hand them out.
pub type Trigger = Rc<dyn Fn()>;

/// Detaches an observer. Run at most once.
pub type DisposeFn = Box<dyn FnOnce()>;

// =============================================================================
// FETCHING
// =============================================================================

/// A boxed, non-`Send` fetch. Everything runs on one local task set, so
/// data sources are free to hold `Rc` state across await points.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<T, FetchError>>>>;

/// Turns a composite query into one fetch execution.
pub type FetchFn<Q, T> = Rc<dyn Fn(Q) -> FetchFuture<T>>;

// =============================================================================
// TESTS
// =============================================================================
