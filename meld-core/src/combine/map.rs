//! Null-safe projection.

use tracing::debug;

use crate::observable::{Observable, Source};

/// Project a source through `mapper`, skipping absent values.
///
/// An absent source yields an absent result without calling `mapper`. A
/// present source yields whatever `mapper` returns, which may itself be
/// absent.
pub fn map<T, U, S, F>(source: S, mapper: F) -> Observable<U>
where
    T: Clone + Send + Sync + 'static,
    U: Clone + Send + Sync + 'static,
    S: Source<T>,
    F: Fn(&T) -> Option<U> + Send + Sync + 'static,
{
    let mapped = Observable::new();
    let target = mapped.downgrade();

    let subscription = source.observe(move |value: Option<&T>| {
        if let Some(target) = target.upgrade() {
            target.set(value.and_then(|value| mapper(value)));
        }
    });
    mapped.adopt(subscription);

    debug!(observable = mapped.id().raw(), "map built");
    mapped
}
