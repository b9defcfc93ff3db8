//! Merging combinators.
//!
//! - [`merge`]: many sources of one type, last writer wins.
//! - [`merge_with`]: a join of two sources through a merger function.

use std::sync::Arc;

use tracing::debug;

use super::junction::Junction;
use crate::observable::{Observable, Source};

/// Merge sources of the same type into a single holder.
///
/// Whichever source emitted most recently determines the value. The result is
/// absent until the first source emits. Sources that already have a value
/// replay it at construction, in iteration order, so the last of them wins.
///
/// The returned holder owns one subscription per source and releases them all
/// when it is dropped.
pub fn merge<T, S, I>(sources: I) -> Observable<T>
where
    T: Clone + Send + Sync + 'static,
    S: Source<T>,
    I: IntoIterator<Item = S>,
{
    let merged = Observable::new();
    let mut count = 0usize;

    for source in sources {
        let target = merged.downgrade();
        let subscription = source.observe(move |value: Option<&T>| {
            if let Some(target) = target.upgrade() {
                target.set(value.cloned());
            }
        });
        merged.adopt(subscription);
        count += 1;
    }

    debug!(observable = merged.id().raw(), sources = count, "merge built");
    merged
}

/// Latest known value of each side of a two-source join.
struct Pair<T, U> {
    first: Option<T>,
    second: Option<U>,
}

impl<T: Clone, U: Clone> Pair<T, U> {
    fn latest(&self) -> (Option<T>, Option<U>) {
        (self.first.clone(), self.second.clone())
    }
}

fn join<T, U, V>(merger: &dyn Fn(&T, &U) -> V, latest: (Option<T>, Option<U>)) -> Option<V> {
    match latest {
        (Some(first), Some(second)) => Some(merger(&first, &second)),
        _ => None,
    }
}

/// Join two sources through `merger`.
///
/// Each emission updates only its own side; the other side keeps its last
/// value. After every emission the result is set to `merger(a, b)` when both
/// sides are present and to absent otherwise. Nothing is computed before the
/// first emission.
///
/// A panicking merger unwinds into whichever `set` triggered it. The holder
/// stays usable afterwards.
///
/// # Example
///
/// ```rust
/// use meld_core::{merge_with, Observable};
///
/// let count = Observable::new();
/// let label = Observable::new();
/// let line = merge_with(&count, &label, |n: &u32, s: &String| format!("{s}: {n}"));
///
/// count.set_value(1);
/// assert_eq!(line.get(), None);
///
/// label.set_value("items".to_string());
/// assert_eq!(line.get().as_deref(), Some("items: 1"));
/// ```
pub fn merge_with<T, U, V, A, B, F>(source_a: A, source_b: B, merger: F) -> Observable<V>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    A: Source<T>,
    B: Source<U>,
    F: Fn(&T, &U) -> V + Send + Sync + 'static,
{
    let merged = Observable::new();
    let junction = Arc::new(Junction::new(Pair::<T, U> {
        first: None,
        second: None,
    }));
    let merger: Arc<dyn Fn(&T, &U) -> V + Send + Sync> = Arc::new(merger);

    let subscription_a = {
        let target = merged.downgrade();
        let junction = Arc::clone(&junction);
        let merger = Arc::clone(&merger);
        source_a.observe(move |value: Option<&T>| {
            let Some(target) = target.upgrade() else {
                return;
            };
            junction.apply(
                |pair| {
                    pair.first = value.cloned();
                    pair.latest()
                },
                |latest| target.set(join(&*merger, latest)),
            );
        })
    };
    merged.adopt(subscription_a);

    let subscription_b = {
        let target = merged.downgrade();
        let junction = Arc::clone(&junction);
        source_b.observe(move |value: Option<&U>| {
            let Some(target) = target.upgrade() else {
                return;
            };
            junction.apply(
                |pair| {
                    pair.second = value.cloned();
                    pair.latest()
                },
                |latest| target.set(join(&*merger, latest)),
            );
        })
    };
    merged.adopt(subscription_b);

    debug!(observable = merged.id().raw(), "merge_with built");
    merged
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
