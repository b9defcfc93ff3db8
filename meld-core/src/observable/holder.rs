//! Observable Implementation
//!
//! An [`Observable`] is a value cell with change notification. It holds an
//! optional current value and a list of listeners that are invoked
//! synchronously, in registration order, every time the value is set.
//!
//! # How Observables Work
//!
//! 1. A holder starts absent (`None`) unless built with [`Observable::with_value`].
//!
//! 2. Every `set` stores the value, bumps the version and calls each listener
//!    with the new value. Setting the same value twice notifies twice.
//!
//! 3. `observe` registers a listener and, if the holder has ever been set,
//!    immediately replays the current value to it.
//!
//! # Thread Safety
//!
//! The value sits behind a `parking_lot::RwLock` and the listener list behind a
//! `Mutex`. Listeners are called with neither lock held, so they may read or
//! set any holder. Emissions on one holder are serialized by a reentrant emit
//! lock: other threads wait, the emitting thread may re-enter.
//!
//! # Ownership
//!
//! Cloning an `Observable` yields another handle to the same cell. A holder
//! can adopt upstream [`Subscription`]s; those are released when the last
//! handle is dropped.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use smallvec::SmallVec;
use tracing::trace;

use super::source::Source;
use super::subscription::{Listener, Subscription, SubscriptionId, Unsubscribe};

/// Unique identifier for an observable cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservableId(u64);

impl ObservableId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type ListenerList<T> = SmallVec<[(SubscriptionId, Listener<T>); 4]>;

/// Current value plus the number of times it has been set.
struct Slot<T> {
    value: Option<T>,
    version: u64,
}

struct Inner<T> {
    id: ObservableId,
    slot: RwLock<Slot<T>>,
    listeners: Mutex<ListenerList<T>>,

    /// Held for the duration of a store-and-notify, and while `observe`
    /// registers and replays, so listeners see emissions in order.
    emit: ReentrantMutex<()>,

    /// Subscriptions this cell owns on other cells (combinator inputs).
    upstream: Mutex<Vec<Subscription>>,
}

impl<T> Unsubscribe for Inner<T>
where
    T: Send + Sync + 'static,
{
    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        let removed = listeners.len() != before;
        if removed {
            trace!(observable = self.id.0, subscription = id.raw(), "listener removed");
        }
        removed
    }

    fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .iter()
            .any(|(registered, _)| *registered == id)
    }
}

/// An observable value holder for values of type `T`.
///
/// # Example
///
/// ```rust
/// use meld_core::Observable;
///
/// let name = Observable::new();
/// assert_eq!(name.get(), None);
///
/// let _subscription = name.subscribe(|value: Option<&String>| {
///     println!("name is now {:?}", value);
/// });
///
/// name.set_value("meld".to_string());
/// assert_eq!(name.get().as_deref(), Some("meld"));
/// ```
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an absent holder that has never been set.
    pub fn new() -> Self {
        Self::from_slot(None, 0)
    }

    /// Create a holder that already carries `value`.
    ///
    /// Counts as one emission: `observe` replays it.
    pub fn with_value(value: T) -> Self {
        Self::from_slot(Some(value), 1)
    }

    fn from_slot(value: Option<T>, version: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: ObservableId::next(),
                slot: RwLock::new(Slot { value, version }),
                listeners: Mutex::new(SmallVec::new()),
                emit: ReentrantMutex::new(()),
                upstream: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Get the holder's unique ID.
    pub fn id(&self) -> ObservableId {
        self.inner.id
    }

    /// Get a clone of the current value.
    pub fn get(&self) -> Option<T> {
        self.inner.slot.read().value.clone()
    }

    /// Borrow the current value without cloning it.
    ///
    /// `f` runs under the value's read lock and must not set this holder.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.inner.slot.read().value.as_ref())
    }

    /// Whether the current value is present.
    pub fn has_value(&self) -> bool {
        self.inner.slot.read().value.is_some()
    }

    /// Number of times the holder has been set. Zero means never.
    pub fn version(&self) -> u64 {
        self.inner.slot.read().version
    }

    /// Store a new value and notify every listener with it.
    ///
    /// If a listener sets this holder again on the same thread, delivery of
    /// the older value stops there: the nested set has notified everyone with
    /// the newer one, so no listener is left holding a stale value.
    pub fn set(&self, value: Option<T>) {
        let _emitting = self.inner.emit.lock();

        let version = {
            let mut slot = self.inner.slot.write();
            slot.value = value.clone();
            slot.version += 1;
            slot.version
        };

        let listeners = self.snapshot_listeners();
        trace!(
            observable = self.inner.id.0,
            version,
            present = value.is_some(),
            listeners = listeners.len(),
            "emit"
        );

        for listener in listeners.iter() {
            // A listener re-entered with a newer value, which has already
            // reached every listener.
            if self.inner.slot.read().version != version {
                trace!(observable = self.inner.id.0, version, "emit superseded");
                break;
            }
            listener(value.as_ref());
        }
    }

    /// Set a present value.
    pub fn set_value(&self, value: T) {
        self.set(Some(value));
    }

    /// Set the holder to absent. Listeners are notified with `None`.
    pub fn clear(&self) {
        self.set(None);
    }

    /// Compute the next value from the current one and set it.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let _emitting = self.inner.emit.lock();
        let current = self.get();
        self.set(f(current.as_ref()));
    }

    /// Register a listener for future changes.
    ///
    /// The listener is not called with the current value.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        self.register(Arc::new(listener))
    }

    /// Register a listener and replay the current value to it.
    ///
    /// The replay only happens if the holder has been set at least once, so a
    /// fresh `Observable::new()` stays silent until its first emission.
    pub fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        let _emitting = self.inner.emit.lock();

        let listener: Listener<T> = Arc::new(listener);
        let subscription = self.register(Arc::clone(&listener));

        let pending = {
            let slot = self.inner.slot.read();
            (slot.version > 0).then(|| slot.value.clone())
        };
        if let Some(current) = pending {
            listener(current.as_ref());
        }

        subscription
    }

    fn register(&self, listener: Listener<T>) -> Subscription {
        let id = SubscriptionId::new();
        self.inner.listeners.lock().push((id, listener));
        trace!(observable = self.inner.id.0, subscription = id.raw(), "listener added");

        let weak = Arc::downgrade(&self.inner);
        let source: Weak<dyn Unsubscribe> = weak;
        Subscription::new(id, source)
    }

    fn snapshot_listeners(&self) -> SmallVec<[Listener<T>; 4]> {
        self.inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Get the number of registered listeners.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Keep `subscription` alive for as long as this holder lives.
    pub(crate) fn adopt(&self, subscription: Subscription) {
        self.inner.upstream.lock().push(subscription);
    }

    /// Create a weak handle that does not keep the cell alive.
    pub fn downgrade(&self) -> WeakObservable<T> {
        WeakObservable {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Default for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Observable<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &self.get())
            .field("version", &self.version())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T> Source<T> for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn latest(&self) -> Option<T> {
        self.get()
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        Observable::subscribe(self, listener)
    }

    fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        Observable::observe(self, listener)
    }
}

/// Weak handle to an [`Observable`].
///
/// Combinators hand these to their source listeners so a discarded output
/// holder is freed even while its sources live on.
pub struct WeakObservable<T> {
    inner: Weak<Inner<T>>,
}

impl<T> WeakObservable<T> {
    /// Get a strong handle if the cell is still alive.
    pub fn upgrade(&self) -> Option<Observable<T>> {
        self.inner.upgrade().map(|inner| Observable { inner })
    }
}

impl<T> Clone for WeakObservable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn recorder<T: Clone + Send + Sync + 'static>() -> (
        Arc<Mutex<Vec<Option<T>>>>,
        impl Fn(Option<&T>) + Send + Sync + 'static,
    ) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |value: Option<&T>| sink.lock().push(value.cloned()))
    }

    #[test]
    fn observable_starts_absent() {
        let holder: Observable<i32> = Observable::new();
        assert_eq!(holder.get(), None);
        assert_eq!(holder.version(), 0);
        assert!(!holder.has_value());
    }

    #[test]
    fn observable_get_and_set() {
        let holder = Observable::new();
        holder.set_value(42);
        assert_eq!(holder.get(), Some(42));
        assert_eq!(holder.version(), 1);

        holder.clear();
        assert_eq!(holder.get(), None);
        assert_eq!(holder.version(), 2);
    }

    #[test]
    fn observable_update() {
        let holder = Observable::with_value(10);
        holder.update(|v| v.map(|v| v + 5));
        assert_eq!(holder.get(), Some(15));
    }

    #[test]
    fn subscribe_notifies_every_set() {
        let holder = Observable::new();
        let (seen, listener) = recorder::<i32>();
        let _subscription = holder.subscribe(listener);

        holder.set_value(1);
        holder.set_value(1);
        holder.clear();

        assert_eq!(*seen.lock(), vec![Some(1), Some(1), None]);
    }

    #[test]
    fn subscribe_does_not_replay() {
        let holder = Observable::with_value(7);
        let (seen, listener) = recorder::<i32>();
        let _subscription = holder.subscribe(listener);

        assert!(seen.lock().is_empty());
    }

    #[test]
    fn observe_replays_only_after_first_set() {
        let fresh: Observable<i32> = Observable::new();
        let (seen, listener) = recorder::<i32>();
        let _a = fresh.observe(listener);
        assert!(seen.lock().is_empty());

        let cleared: Observable<i32> = Observable::new();
        cleared.clear();
        let (seen, listener) = recorder::<i32>();
        let _b = cleared.observe(listener);
        assert_eq!(*seen.lock(), vec![None]);

        let seeded = Observable::with_value(3);
        let (seen, listener) = recorder::<i32>();
        let _c = seeded.observe(listener);
        assert_eq!(*seen.lock(), vec![Some(3)]);
    }

    #[test]
    fn dropped_subscription_stops_notifications() {
        let holder = Observable::new();
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let subscription = holder.subscribe(move |_: Option<&i32>| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(holder.subscriber_count(), 1);

        holder.set_value(1);
        drop(subscription);
        holder.set_value(2);

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert_eq!(holder.subscriber_count(), 0);
    }

    #[test]
    fn listener_may_set_another_holder() {
        let upstream = Observable::new();
        let downstream = Observable::new();

        let target = downstream.clone();
        let _subscription = upstream.subscribe(move |value: Option<&i32>| {
            target.set(value.map(|v| v * 10));
        });

        upstream.set_value(4);
        assert_eq!(downstream.get(), Some(40));
    }

    #[test]
    fn listener_may_unsubscribe_during_emit() {
        let holder = Observable::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let call_count = Arc::new(AtomicI32::new(0));

        let slot_clone = Arc::clone(&slot);
        let call_count_clone = call_count.clone();
        let subscription = holder.subscribe(move |_: Option<&i32>| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            slot_clone.lock().take();
        });
        *slot.lock() = Some(subscription);

        holder.set_value(1);
        holder.set_value(2);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clone_shares_state() {
        let holder1 = Observable::new();
        let holder2 = holder1.clone();

        holder1.set_value(42);
        assert_eq!(holder2.get(), Some(42));
        assert!(holder1.ptr_eq(&holder2));
        assert_eq!(holder1.id(), holder2.id());
    }

    #[test]
    fn weak_handle_does_not_keep_cell_alive() {
        let holder = Observable::with_value(1);
        let weak = holder.downgrade();
        assert!(weak.upgrade().is_some());

        drop(holder);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn adopted_subscriptions_released_with_holder() {
        let source: Observable<i32> = Observable::new();
        let owner: Observable<i32> = Observable::new();

        owner.adopt(source.subscribe(|_| {}));
        assert_eq!(source.subscriber_count(), 1);

        drop(owner);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[test]
    fn with_borrows_current_value() {
        let holder = Observable::with_value(vec![1, 2, 3]);
        assert_eq!(holder.with(|v| v.map(Vec::len)), Some(3));

        holder.clear();
        assert!(holder.with(|v| v.is_none()));
    }

    #[test]
    fn latest_reads_through_source_trait() {
        fn latest_of<S: Source<i32>>(source: S) -> Option<i32> {
            source.latest()
        }

        let holder: Observable<i32> = Observable::new();
        assert_eq!(latest_of(&holder), None);

        holder.set_value(9);
        assert_eq!(latest_of(&holder), Some(9));
        assert_eq!(latest_of(holder), Some(9));
    }

    #[test]
    fn reentrant_set_delivers_newest_to_later_listeners() {
        let holder: Observable<i32> = Observable::new();

        let clamp = holder.downgrade();
        let _clamp = holder.subscribe(move |value: Option<&i32>| {
            if let (Some(v), Some(holder)) = (value, clamp.upgrade()) {
                if *v > 10 {
                    holder.set_value(10);
                }
            }
        });

        let (seen, listener) = recorder::<i32>();
        let _late = holder.subscribe(listener);

        holder.set_value(50);
        assert_eq!(holder.get(), Some(10));
        assert_eq!(*seen.lock(), vec![Some(10)]);
        assert_eq!(holder.version(), 2);
    }

    #[test]
    fn ids_are_unique() {
        let h1: Observable<()> = Observable::new();
        let h2: Observable<()> = Observable::new();
        assert_ne!(h1.id(), h2.id());
    }
}
