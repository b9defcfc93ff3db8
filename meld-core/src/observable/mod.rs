//! Observable Value Holders
//!
//! This module implements the value cell every combinator is built on.
//!
//! # Concepts
//!
//! ## Observable
//!
//! An [`Observable`] holds an optional current value. Setting it stores the
//! value and synchronously notifies every registered listener with it. There
//! is no deduplication: setting an equal value notifies again.
//!
//! ## Source
//!
//! [`Source`] is the seam combinators depend on: read the latest value,
//! register a listener, release it by dropping the returned guard.
//!
//! ## Subscription
//!
//! A [`Subscription`] owns one registered listener. It holds its source weakly
//! and unregisters the listener on drop.
//!
//! # Implementation Notes
//!
//! Absent is `None`, never a sentinel. Every holder tracks a version counter
//! so `observe` can tell "never set" apart from "set to absent": only the
//! latter is replayed to new listeners.

mod holder;
mod source;
mod subscription;

pub use holder::{Observable, ObservableId, WeakObservable};
pub use source::Source;
pub use subscription::{Subscription, SubscriptionId};
