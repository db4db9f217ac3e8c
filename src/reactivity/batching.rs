// ============================================================================
// spark-query - Batching
// Group several cell writes into a single composition
// ============================================================================

use crate::core::context::with_context;
use crate::reactivity::scheduling::flush_pending;

// =============================================================================
// BATCH
// =============================================================================

/// Batch multiple cell updates into a single composition.
///
/// Composers triggered inside a batch do not schedule a deferred flush;
/// they flush synchronously, once, when the outermost batch closes. This is
/// how one pagination event that changes both page and page size turns into
/// exactly one composite query even without waiting for a scheduler tick.
///
/// # Example
///
/// ```
/// use spark_query::{batch, Composer, QueryCell};
///
/// let page = QueryCell::new(0usize);
/// let size = QueryCell::new(10usize);
///
/// let composer = Composer::new(
///     {
///         let (page, size) = (page.clone(), size.clone());
///         move || (page.current(), size.current())
///     },
///     std::time::Duration::ZERO,
/// );
///
/// batch(|| {
///     page.set(3);
///     composer.trigger();
///     size.set(25);
///     composer.trigger();
/// });
///
/// assert_eq!(composer.output().latest(), Some((3, 25)));
/// assert_eq!(composer.emitted(), 2); // cold start + one batched flush
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Use a guard pattern to ensure we exit the batch even on panic
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());

            if depth > 0 {
                return;
            }

            // When outermost batch completes, flush pending composers.
            // After a panic the queued work is dropped instead.
            if std::thread::panicking() {
                let dropped = with_context(|ctx| ctx.take_pending_flushes());
                for weak in dropped {
                    if let Some(target) = weak.upgrade() {
                        target.discard();
                    }
                }
            } else {
                flush_pending();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

/// Check if currently inside a batch.
///
/// # Example
///
/// ```
/// use spark_query::{batch, is_batching};
///
/// assert!(!is_batching());
///
/// batch(|| {
///     assert!(is_batching());
/// });
///
/// assert!(!is_batching());
/// ```
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// TESTS
// =============================================================================
