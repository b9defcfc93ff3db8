//! The `Source` trait: anything a combinator can read from and listen to.

use super::subscription::Subscription;

/// A publish/subscribe value cell.
///
/// Combinators only depend on this trait, never on a concrete holder. An
/// implementor exposes the latest value, lets callers register a listener that
/// is invoked with every new value, and returns a [`Subscription`] whose drop
/// unregisters that listener.
pub trait Source<T> {
    /// The most recent value, or `None` while absent.
    fn latest(&self) -> Option<T>;

    /// Listen for future emissions only.
    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static;

    /// Listen for future emissions, first replaying the current value if the
    /// source has emitted before.
    fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static;
}

impl<T, S> Source<T> for &S
where
    S: Source<T> + ?Sized,
{
    fn latest(&self) -> Option<T> {
        (**self).latest()
    }

    fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        (**self).subscribe(listener)
    }

    fn observe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        (**self).observe(listener)
    }
}
