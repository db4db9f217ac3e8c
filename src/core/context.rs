// ============================================================================
// spark-query - Pipeline Context
// Thread-local state shared by every cell and composer on this thread
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Weak;

// =============================================================================
// PENDING FLUSH
// =============================================================================

/// Something that deferred work until the outermost batch closes.
///
/// Composers register here when triggered inside `batch()`.
pub trait PendingFlush {
    /// Run the deferred work now.
    fn flush(&self);

    /// The batch that queued this flush unwound; the work will not run.
    fn discard(&self) {}
}

// =============================================================================
// PIPELINE CONTEXT
// =============================================================================

/// Thread-local pipeline context.
///
/// The pipeline is single-threaded cooperative: cells, composers and
/// dispatchers are `Rc`-based and never leave the thread that built them,
/// so one context per thread is all the shared state there is.
pub struct PipelineContext {
    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Flushes to run after the outermost batch completes
    pub pending_flushes: RefCell<Vec<Weak<dyn PendingFlush>>>,
}

impl PipelineContext {
    /// Create a new context with default values
    pub fn new() -> Self {
        Self {
            batch_depth: Cell::new(0),
            pending_flushes: RefCell::new(Vec::new()),
        }
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    /// Check if currently in a batch
    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Queue a flush to run after the batch
    pub fn add_pending_flush(&self, flush: Weak<dyn PendingFlush>) {
        self.pending_flushes.borrow_mut().push(flush);
    }

    /// Take all pending flushes
    pub fn take_pending_flushes(&self) -> Vec<Weak<dyn PendingFlush>> {
        self.pending_flushes.replace(Vec::new())
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local pipeline context
    static CONTEXT: PipelineContext = PipelineContext::new();
}

/// Access the thread-local pipeline context.
///
/// Never call back into user code from inside `f`: callbacks may start a
/// batch of their own.
pub fn with_context<R>(f: impl FnOnce(&PipelineContext) -> R) -> R {
    CONTEXT.with(f)
}

// =============================================================================
// TESTS
// =============================================================================
