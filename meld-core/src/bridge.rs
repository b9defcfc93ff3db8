//! Suspend Bridge
//!
//! Turns "wait for a callback" into an awaited result.
//!
//! A typical use: an action is dispatched to a store, and the store reports
//! the outcome later by setting a holder. [`await_emission`] registers for
//! the holder's next emission, runs the dispatch, and resumes the caller with
//! the value the callback delivered:
//!
//! ```rust
//! use meld_core::{bridge, Observable};
//!
//! # tokio_test_runtime(async {
//! let created: Observable<u64> = Observable::new();
//! let callback = created.clone();
//!
//! let site_id = bridge::await_emission(&created, || {
//!     // The store answers synchronously here; it could equally answer
//!     // later from another task.
//!     callback.set_value(123);
//! })
//! .await
//! .unwrap();
//!
//! assert_eq!(site_id, Some(123));
//! # });
//! # fn tokio_test_runtime(f: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
//! # }
//! ```
//!
//! The listener is registered before the trigger runs, so an answer delivered
//! synchronously from inside the trigger is not lost. Without a timeout, a
//! trigger that never leads to an emission leaves the caller waiting; drop the
//! future to cancel.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::stream::{self, Stream};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::{trace, warn};

use crate::config::BridgeConfig;
use crate::error::{MeldError, Result};
use crate::observable::{Source, Subscription};

/// Future resolving to a source's next emission.
///
/// Created by [`next_emission`]. The listener is live from creation, not from
/// the first poll.
#[must_use = "futures do nothing unless awaited"]
pub struct NextEmission<T> {
    receiver: oneshot::Receiver<Option<T>>,
    _subscription: Subscription,
}

impl<T> Future for NextEmission<T> {
    type Output = Result<Option<T>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.map_err(|_| MeldError::SourceClosed))
    }
}

/// Capture the next value set on `source`.
///
/// The current value is not replayed. The emission may be absent, hence
/// `Option<T>`. If the source is dropped first, the future fails with
/// [`MeldError::SourceClosed`].
pub fn next_emission<T, S>(source: &S) -> NextEmission<T>
where
    T: Clone + Send + Sync + 'static,
    S: Source<T> + ?Sized,
{
    let (sender, receiver) = oneshot::channel();
    let sender = Mutex::new(Some(sender));

    let subscription = source.subscribe(move |value: Option<&T>| {
        if let Some(sender) = sender.lock().take() {
            // The waiter may already be gone.
            let _ = sender.send(value.cloned());
        }
    });
    trace!(subscription = subscription.id().raw(), "waiting for next emission");

    NextEmission {
        receiver,
        _subscription: subscription,
    }
}

/// Run `trigger`, then wait for the source's next emission.
pub async fn await_emission<T, S, F>(source: &S, trigger: F) -> Result<Option<T>>
where
    T: Clone + Send + Sync + 'static,
    S: Source<T> + ?Sized,
    F: FnOnce(),
{
    let pending = next_emission(source);
    trigger();
    pending.await
}

/// Like [`await_emission`], bounded by the configured timeout.
pub async fn await_emission_with<T, S, F>(
    source: &S,
    config: &BridgeConfig,
    trigger: F,
) -> Result<Option<T>>
where
    T: Clone + Send + Sync + 'static,
    S: Source<T> + ?Sized,
    F: FnOnce(),
{
    let pending = next_emission(source);
    trigger();

    match config.timeout() {
        Some(after) => match tokio::time::timeout(after, pending).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?after, "no emission before timeout");
                Err(MeldError::Timeout { after })
            }
        },
        None => pending.await,
    }
}

/// Every later emission of `source` as a stream.
///
/// The stream ends once the source is dropped. Emissions are buffered, so a
/// slow consumer still sees each one in order.
pub fn changes<T, S>(source: &S) -> impl Stream<Item = Option<T>> + Send + 'static
where
    T: Clone + Send + Sync + 'static,
    S: Source<T> + ?Sized,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    let subscription = source.subscribe(move |value: Option<&T>| {
        let _ = sender.send(value.cloned());
    });

    stream::unfold(
        (receiver, subscription),
        |(mut receiver, subscription)| async move {
            let value = receiver.recv().await?;
            Some((value, (receiver, subscription)))
        },
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::Observable;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn resumes_with_synchronous_answer() {
        let holder: Observable<&str> = Observable::new();
        let callback = holder.clone();

        let result = await_emission(&holder, || callback.set_value("done")).await;
        assert_eq!(result.unwrap(), Some("done"));
    }

    #[tokio::test]
    async fn trigger_runs_exactly_once() {
        let holder = Observable::new();
        let callback = holder.clone();
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        await_emission(&holder, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            callback.set_value(1);
        })
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resumes_with_answer_from_another_task() {
        let holder = Observable::new();
        let callback = holder.clone();

        let result = await_emission(&holder, move || {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                callback.set_value(7u32);
            });
        })
        .await;

        assert_eq!(result.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn does_not_replay_current_value() {
        let holder = Observable::with_value(1);
        let pending = next_emission(&holder);

        holder.set_value(2);
        assert_eq!(pending.await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn absent_emission_is_delivered() {
        let holder = Observable::with_value(1);
        let callback = holder.clone();

        let result = await_emission(&holder, || callback.clear()).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn dropped_source_closes_wait() {
        let holder: Observable<i32> = Observable::new();
        let pending = next_emission(&holder);

        drop(holder);
        assert!(matches!(pending.await, Err(MeldError::SourceClosed)));
    }

    #[tokio::test]
    async fn times_out_without_answer() {
        let holder: Observable<i32> = Observable::new();
        let config = BridgeConfig::with_timeout(Duration::from_millis(20));

        let result = await_emission_with(&holder, &config, || {}).await;
        assert!(matches!(result, Err(MeldError::Timeout { .. })));
    }

    #[tokio::test]
    async fn answers_within_timeout() {
        let holder = Observable::new();
        let callback = holder.clone();
        let config = BridgeConfig::with_timeout(Duration::from_secs(5));

        let result = await_emission_with(&holder, &config, || callback.set_value(3)).await;
        assert_eq!(result.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn finished_wait_releases_listener() {
        let holder = Observable::new();
        let callback = holder.clone();

        await_emission(&holder, || callback.set_value(1)).await.unwrap();
        assert_eq!(holder.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn changes_yields_each_emission_then_ends() {
        let holder = Observable::with_value(0);
        let stream = changes(&holder);

        holder.set_value(1);
        holder.clear();
        holder.set_value(1);
        drop(holder);

        let seen: Vec<_> = stream.collect().await;
        assert_eq!(seen, vec![Some(1), None, Some(1)]);
    }
}
