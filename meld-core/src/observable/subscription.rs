//! Subscription handles.
//!
//! Every listener registered on an observable is identified by a
//! [`SubscriptionId`] and owned through a [`Subscription`] guard. Dropping the
//! guard removes the listener from its source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with the new value every time a source is set.
pub(crate) type Listener<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;

/// Unique identifier for a registered listener.
///
/// IDs come from a process-wide atomic counter, so they stay unique across
/// threads and across observables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique subscription ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased side of an observable that can drop a listener again.
pub(crate) trait Unsubscribe: Send + Sync {
    /// Remove the listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Whether the listener is still registered.
    fn is_subscribed(&self, id: SubscriptionId) -> bool;
}

/// Guard for a registered listener.
///
/// The guard only holds a weak reference to its source: it never keeps the
/// source alive. When dropped, it unregisters the listener if the source still
/// exists.
#[must_use = "dropping a Subscription immediately unregisters its listener"]
pub struct Subscription {
    id: SubscriptionId,
    source: Option<Weak<dyn Unsubscribe>>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, source: Weak<dyn Unsubscribe>) -> Self {
        Self {
            id,
            source: Some(source),
        }
    }

    /// Get the ID of the listener this guard owns.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the source is alive and the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|source| source.is_subscribed(self.id))
            .unwrap_or(false)
    }

    /// Release the guard without unregistering.
    ///
    /// The listener then lives as long as its source does.
    pub fn detach(mut self) {
        self.source = None;
    }

    /// Unregister the listener now.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.take().and_then(|weak| weak.upgrade()) {
            source.unsubscribe(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.source.is_some())
            .finish()
    }
}
