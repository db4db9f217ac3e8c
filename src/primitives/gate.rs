// ============================================================================
// spark-query - Gates
// Per-cell policies deciding which changes may trigger composition
// ============================================================================
//
// A gate sits between a cell and a composer. It does not carry values: the
// composer re-reads every cell when it flushes. A gate only decides *whether*
// and *when* a change counts.
//
// - PassThrough: every change triggers immediately
// - Distinct:    a change equal to the preceding value is dropped
// - Debounce:    a change triggers after a quiet window; newer changes
//                within the window restart it
//
// The value replayed when the gate attaches seeds it and never triggers;
// composers emit their cold-start query on their own.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::core::types::{EqualsFn, Trigger};
use crate::primitives::cell::QueryCell;
use crate::primitives::subscription::Subscription;
use crate::reactivity::equality::equals;
use crate::reactivity::scheduling::Spawner;

// =============================================================================
// GATE POLICY
// =============================================================================

/// How a cell's changes are conditioned before reaching a composer.
pub enum GatePolicy<T> {
    /// Every change triggers.
    PassThrough,
    /// Changes equal (by the given function) to the preceding value are dropped.
    Distinct(EqualsFn<T>),
    /// Changes trigger only after the window elapses with no further change.
    Debounce(Duration),
}

impl<T> Clone for GatePolicy<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for GatePolicy<T> {}

impl<T: PartialEq + 'static> GatePolicy<T> {
    /// Distinct by `PartialEq`.
    pub fn distinct() -> Self {
        GatePolicy::Distinct(equals)
    }
}

impl<T> GatePolicy<T> {
    /// Debounce with the given quiescence window.
    pub fn debounce(window: Duration) -> Self {
        GatePolicy::Debounce(window)
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GatePolicy::PassThrough => "pass-through",
            GatePolicy::Distinct(_) => "distinct",
            GatePolicy::Debounce(_) => "debounce",
        }
    }
}

impl<T> std::fmt::Debug for GatePolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatePolicy::Debounce(window) => write!(f, "Debounce({window:?})"),
            other => f.write_str(other.name()),
        }
    }
}

// =============================================================================
// GATE
// =============================================================================

/// Attach `policy` to `cell`, calling `trigger` for every admitted change.
///
/// The gate lives as long as the returned subscription. Dropping it also
/// cancels a pending debounce timer.
///
/// # Panics
///
/// A debounce gate schedules its timer on the ambient local set, so cell
/// writes must happen inside a `tokio::task::LocalSet`. `gate_on` takes an
/// explicit spawner instead.
pub fn gate<T: Clone + 'static>(
    cell: &QueryCell<T>,
    policy: GatePolicy<T>,
    trigger: Trigger,
) -> Subscription {
    gate_on(cell, policy, trigger, &Spawner::Ambient)
}

/// Like `gate`, with debounce timers spawned through `spawner`.
pub fn gate_on<T: Clone + 'static>(
    cell: &QueryCell<T>,
    policy: GatePolicy<T>,
    trigger: Trigger,
    spawner: &Spawner,
) -> Subscription {
    match policy {
        GatePolicy::PassThrough => {
            let seeded = Cell::new(false);
            cell.changes(move |_| {
                if seeded.replace(true) {
                    trigger();
                }
            })
        }

        GatePolicy::Distinct(eq) => {
            let last: RefCell<Option<T>> = RefCell::new(None);
            cell.changes(move |value| {
                let admit = {
                    let mut last = last.borrow_mut();
                    let admit = match last.as_ref() {
                        Some(previous) if eq(previous, value) => {
                            trace!(gate = "distinct", "repeated value suppressed");
                            return;
                        }
                        Some(_) => true,
                        None => false,
                    };
                    *last = Some(value.clone());
                    admit
                };

                if admit {
                    trigger();
                }
            })
        }

        GatePolicy::Debounce(window) => {
            let seeded = Cell::new(false);
            let timer = DebounceTimer::new(spawner.clone());
            cell.changes(move |_| {
                if seeded.replace(true) {
                    timer.restart(window, trigger.clone());
                }
            })
        }
    }
}

// =============================================================================
// DEBOUNCE TIMER
// =============================================================================

/// The single pending quiet-window timer of a debounce gate.
struct DebounceTimer {
    spawner: Spawner,
    pending: RefCell<Option<JoinHandle<()>>>,
    restarts: Cell<u64>,
}

impl DebounceTimer {
    fn new(spawner: Spawner) -> Self {
        Self {
            spawner,
            pending: RefCell::new(None),
            restarts: Cell::new(0),
        }
    }

    fn restart(&self, window: Duration, trigger: Trigger) {
        if let Some(previous) = self.pending.borrow_mut().take() {
            if !previous.is_finished() {
                self.restarts.set(self.restarts.get() + 1);
                trace!(
                    gate = "debounce",
                    restarts = self.restarts.get(),
                    "quiet window restarted"
                );
            }
            previous.abort();
        }

        let handle = self.spawner.defer(window, move || trigger());
        *self.pending.borrow_mut() = Some(handle);
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
