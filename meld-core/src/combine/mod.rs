//! Combinators
//!
//! Functions that build a new [`Observable`] from existing sources. The new
//! holder's value is always a pure function of the latest values its sources
//! emitted:
//!
//! - [`merge`]: last emission across N sources of one type.
//! - [`merge_with`]: `merger(a, b)` once both sides are present.
//! - [`combine_map`]: `key -> latest present value` for keyed sources.
//! - [`map`]: null-safe projection.
//!
//! # Ownership
//!
//! A combinator's output owns its subscriptions on the sources. Source
//! listeners only hold the output weakly, so dropping the last handle to the
//! output unregisters everything it set up.
//!
//! # Replay
//!
//! Sources that have already been set replay their current value once when
//! the combinator is built, as if they had emitted it at that moment.

mod combine_map;
mod junction;
mod map;
mod merge;

pub use combine_map::combine_map;
pub use map::map;
pub use merge::{merge, merge_with};

use crate::observable::{Observable, Source};

/// Method-call forms of the combinators for any [`Source`].
///
/// ```rust
/// use meld_core::{Observable, SourceExt};
///
/// let age: Observable<u32> = Observable::new();
/// let label = age.map_present(|years: &u32| (*years >= 18).then(|| "adult"));
///
/// age.set_value(30);
/// assert_eq!(label.get(), Some("adult"));
/// ```
pub trait SourceExt<T>: Source<T> {
    /// See [`map`].
    fn map_present<U, F>(&self, mapper: F) -> Observable<U>
    where
        T: Clone + Send + Sync + 'static,
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        map(self, mapper)
    }

    /// See [`merge_with`].
    fn merge_with<U, V, B, F>(&self, other: B, merger: F) -> Observable<V>
    where
        T: Clone + Send + Sync + 'static,
        U: Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
        B: Source<U>,
        F: Fn(&T, &U) -> V + Send + Sync + 'static,
    {
        merge_with(self, other, merger)
    }
}

impl<T, S> SourceExt<T> for S where S: Source<T> + ?Sized {}
