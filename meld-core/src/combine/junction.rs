//! Shared state for combinators that keep more than a single slot.

use std::cell::RefCell;

use parking_lot::ReentrantMutex;

/// Internal state of a merged holder plus the lock that orders its publishes.
///
/// `apply` runs the state update and the publish of its result under one
/// reentrant lock. Emissions arriving from different threads are therefore
/// applied and published one at a time, and the output always reflects the
/// last update. Re-entrant emissions on the same thread (a listener feeding
/// back into one of the sources) take the lock again and publish inside the
/// outer emission. The source stops delivering the superseded outer value, so
/// afterwards the output holds the result of the nested, newest update.
pub(crate) struct Junction<S> {
    state: ReentrantMutex<RefCell<S>>,
}

impl<S> Junction<S> {
    pub(crate) fn new(state: S) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(state)),
        }
    }

    /// Mutate the state, then publish what `update` returned.
    ///
    /// The state borrow ends before `publish` runs, so publishing may
    /// re-enter this junction.
    pub(crate) fn apply<R>(&self, update: impl FnOnce(&mut S) -> R, publish: impl FnOnce(R)) {
        let guard = self.state.lock();
        let result = {
            let mut state = guard.borrow_mut();
            update(&mut state)
        };
        publish(result);
    }
}
