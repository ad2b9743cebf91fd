//! Scoped interrupt cleanup.
//!
//! The binary installs a single SIGINT handler at startup. A cleanup action
//! is armed only while a risky call is in flight; the returned
//! [`CleanupGuard`] disarms it when dropped, on every exit path. An interrupt
//! with an action armed runs the action and exits successfully. With nothing
//! armed, the process terminates with [`EXIT_INTERRUPTED`].
//!
//! The action is taken out of the slot exactly once, under the lock. While it
//! runs, both a disarming guard and a repeated interrupt block until it has
//! finished, so no thread observes the interrupt before the cleanup is done.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Exit code after an armed cleanup ran.
pub const EXIT_CLEANED_UP: i32 = 0;

/// Exit code for an interrupt outside any armed scope (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

type CleanupAction = Box<dyn FnOnce() + Send>;

#[derive(Default)]
enum Slot {
    #[default]
    Idle,
    Armed(CleanupAction),
    Running,
    Done,
}

#[derive(Default)]
struct State {
    slot: Mutex<Slot>,
    finished: Condvar,
    fired: AtomicBool,
}

impl State {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block while an action taken by an interrupt is still running.
    fn settle<'a>(&self, mut slot: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        while matches!(*slot, Slot::Running) {
            slot = self
                .finished
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slot
    }
}

/// Handle to the process interrupt state. Cheap to clone.
#[derive(Clone, Default)]
pub struct Interrupts {
    state: Arc<State>,
}

impl Interrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the SIGINT handler. Must be called at most once per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            if handle.interrupt() {
                std::process::exit(EXIT_CLEANED_UP);
            }
            eprintln!("\nInterrupted.");
            std::process::exit(EXIT_INTERRUPTED);
        })
    }

    /// Arm `action` until the returned guard is dropped.
    ///
    /// Arming replaces any previously armed action.
    #[must_use = "the action is disarmed as soon as the guard is dropped"]
    pub fn arm(&self, action: impl FnOnce() + Send + 'static) -> CleanupGuard {
        let mut slot = self.state.settle(self.state.lock());
        *slot = Slot::Armed(Box::new(action));
        CleanupGuard {
            state: Arc::clone(&self.state),
        }
    }

    /// Deliver an interrupt and report whether a cleanup action ran.
    ///
    /// Returns only once the action has finished, including when another
    /// thread is the one running it.
    pub fn interrupt(&self) -> bool {
        let mut slot = self.state.settle(self.state.lock());
        let action = match std::mem::replace(&mut *slot, Slot::Running) {
            Slot::Armed(action) => action,
            Slot::Done => {
                *slot = Slot::Done;
                return true;
            }
            Slot::Idle | Slot::Running => {
                *slot = Slot::Idle;
                return false;
            }
        };
        self.state.fired.store(true, Ordering::SeqCst);
        drop(slot);

        println!("^C detected.  Cleaning up...");
        action();

        *self.state.lock() = Slot::Done;
        self.state.finished.notify_all();
        true
    }

    /// True once an interrupt has taken an armed action. The action may
    /// still be running; dropping its guard waits for it.
    pub fn was_interrupted(&self) -> bool {
        self.state.fired.load(Ordering::SeqCst)
    }

    pub fn is_armed(&self) -> bool {
        matches!(*self.state.lock(), Slot::Armed(_))
    }
}

/// Disarms the cleanup action on drop, or waits for it to finish if an
/// interrupt already took it.
pub struct CleanupGuard {
    state: Arc<State>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let mut slot = self.state.settle(self.state.lock());
        if matches!(*slot, Slot::Armed(_)) {
            *slot = Slot::Idle;
        }
    }
}
