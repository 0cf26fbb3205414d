//! Wakeup primitive shared between a buffer end and whoever waits on it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// A generation counter paired with a condition variable
///
/// Waiters capture [`Signal::generation`] before checking their condition and
/// then wait for the generation to move on. A notification between the check
/// and the wait is never lost, because it has already bumped the counter.
#[derive(Clone, Default)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

#[derive(Default)]
struct SignalInner {
    generation: Mutex<u64>,
    changed: Condvar,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // A panic while holding this lock cannot leave the counter inconsistent
        self.inner
            .generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn generation(&self) -> u64 {
        *self.lock()
    }

    /// Wake everyone waiting on this signal
    pub fn notify(&self) {
        let mut generation = self.lock();
        *generation = generation.wrapping_add(1);
        self.inner.changed.notify_all();
    }

    /// Block until the generation differs from `seen`, or `cancel` is set
    ///
    /// `cancel` is read under the signal lock, so a canceller that sets the
    /// flag and then calls [`Signal::notify`] always wakes this waiter.
    pub fn wait(&self, seen: u64, cancel: Option<&AtomicBool>) {
        let mut generation = self.lock();
        while *generation == seen {
            if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                return;
            }
            generation = self
                .inner
                .changed
                .wait(generation)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("generation", &self.generation())
            .finish()
    }
}
