//! Assemble a keyed map from one source per key.

use std::hash::Hash;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::junction::Junction;
use crate::observable::{Observable, Source};

/// Combine keyed sources into one holder of `key -> latest value`.
///
/// The result starts as an empty map. When the source for `key` emits a
/// present value, `key` is inserted or updated; when it emits absent, `key` is
/// removed. Every emission publishes a fresh snapshot, so listeners never see
/// the map change under them.
///
/// Keys keep the order in which they first received a value; a removed key
/// that comes back is appended at the end.
///
/// # Example
///
/// ```rust
/// use meld_core::{combine_map, Observable};
///
/// let draft = Observable::new();
/// let published = Observable::new();
/// let counts = combine_map([("draft", &draft), ("published", &published)]);
///
/// draft.set_value(3);
/// published.set_value(7);
/// draft.clear();
///
/// let snapshot = counts.get().unwrap();
/// assert_eq!(snapshot.get("published"), Some(&7));
/// assert!(!snapshot.contains_key("draft"));
/// ```
pub fn combine_map<K, V, S, I>(sources: I) -> Observable<IndexMap<K, V>>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Source<V>,
    I: IntoIterator<Item = (K, S)>,
{
    let combined = Observable::with_value(IndexMap::new());
    let junction = Arc::new(Junction::new(IndexMap::<K, V>::new()));
    let mut count = 0usize;

    for (key, source) in sources {
        let target = combined.downgrade();
        let junction = Arc::clone(&junction);
        let subscription = source.observe(move |value: Option<&V>| {
            let Some(target) = target.upgrade() else {
                return;
            };
            junction.apply(
                |entries| {
                    match value {
                        Some(value) => {
                            entries.insert(key.clone(), value.clone());
                        }
                        None => {
                            entries.shift_remove(&key);
                        }
                    }
                    entries.clone()
                },
                |snapshot| target.set_value(snapshot),
            );
        });
        combined.adopt(subscription);
        count += 1;
    }

    debug!(observable = combined.id().raw(), sources = count, "combine_map built");
    combined
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
