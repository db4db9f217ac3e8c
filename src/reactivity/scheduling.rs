// ============================================================================
// spark-query - Scheduling
// Deferring composer flushes and timers onto the local task set
// ============================================================================
//
// Everything deferred runs as a local (non-`Send`) task on a
// `tokio::task::LocalSet`. A spawned task only starts once the code that
// spawned it yields, which is what makes "same synchronous tick" coalescing
// work without any extra bookkeeping.
//
// Key functions:
// - Spawner: where local tasks go (the ambient set, or a given one)
// - schedule_flush: run a flush after the coalesce delay, or at batch end
// - flush_pending: run every flush queued by a batch
// ============================================================================

use std::future::Future;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::{JoinHandle, LocalSet};

use crate::core::context::{with_context, PendingFlush};

// =============================================================================
// SPAWNER
// =============================================================================

/// Where deferred work is spawned.
#[derive(Clone, Default)]
pub enum Spawner {
    /// The `LocalSet` currently driving this thread.
    ///
    /// Spawning panics when no set is being driven.
    #[default]
    Ambient,

    /// A specific set. Spawning never panics and works from outside the
    /// set; the tasks make progress whenever the set is driven.
    Local(Rc<LocalSet>),
}

impl Spawner {
    /// Spawn onto the given set.
    pub fn local(set: &Rc<LocalSet>) -> Self {
        Spawner::Local(set.clone())
    }

    /// Spawn a local task.
    pub fn spawn(&self, task: impl Future<Output = ()> + 'static) -> JoinHandle<()> {
        match self {
            Spawner::Ambient => tokio::task::spawn_local(task),
            Spawner::Local(set) => set.spawn_local(task),
        }
    }

    /// Run `f` after `delay`.
    ///
    /// A zero delay still defers: `f` runs on a later turn of the scheduler,
    /// never inside the caller's stack frame.
    pub fn defer(&self, delay: Duration, f: impl FnOnce() + 'static) -> JoinHandle<()> {
        self.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            f();
        })
    }
}

impl std::fmt::Debug for Spawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Spawner::Ambient => f.write_str("Ambient"),
            Spawner::Local(_) => f.write_str("Local"),
        }
    }
}

/// Check whether a tokio runtime is available on this thread.
pub fn has_runtime() -> bool {
    tokio::runtime::Handle::try_current().is_ok()
}

// =============================================================================
// SCHEDULE FLUSH
// =============================================================================

/// Schedule `flush` to run once.
///
/// Inside a batch the flush is queued on the context and runs synchronously
/// when the outermost batch closes (returns `None`). Otherwise it is deferred
/// by `delay` through `spawner`.
pub fn schedule_flush(
    flush: Weak<dyn PendingFlush>,
    delay: Duration,
    spawner: &Spawner,
) -> Option<JoinHandle<()>> {
    let queued = with_context(|ctx| {
        if ctx.is_batching() {
            ctx.add_pending_flush(flush.clone());
            true
        } else {
            false
        }
    });

    if queued {
        return None;
    }

    Some(spawner.defer(delay, move || {
        if let Some(target) = flush.upgrade() {
            target.flush();
        }
    }))
}

// =============================================================================
// FLUSH PENDING
// =============================================================================

/// Run every flush queued during a batch.
///
/// Flushes may emit and cause further writes; anything they queue (only
/// possible if they open a batch themselves) is drained in the same call.
pub fn flush_pending() {
    loop {
        let pending = with_context(|ctx| ctx.take_pending_flushes());
        if pending.is_empty() {
            break;
        }

        for weak in pending {
            if let Some(target) = weak.upgrade() {
                target.flush();
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
