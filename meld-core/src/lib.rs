//! Meld Core
//!
//! Observable value holders and the combinators that merge them.
//!
//! It implements:
//!
//! - An observable value cell with synchronous change notification
//! - Combinators that derive new cells from existing ones (merge, join,
//!   keyed map assembly, null-safe projection)
//! - A bridge that awaits a cell's next emission, for callback-style APIs
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `observable`: the value cell, its subscriptions, and the `Source` trait
//! - `combine`: combinators over any `Source`
//! - `bridge`: futures and streams over emissions
//!
//! # Example
//!
//! ```rust
//! use meld_core::{merge_with, Observable};
//!
//! let first = Observable::new();
//! let last = Observable::new();
//!
//! let full_name = merge_with(&first, &last, |f: &String, l: &String| format!("{f} {l}"));
//! assert_eq!(full_name.get(), None);
//!
//! first.set_value("Ada".to_string());
//! last.set_value("Lovelace".to_string());
//! assert_eq!(full_name.get().as_deref(), Some("Ada Lovelace"));
//! ```

pub mod bridge;
pub mod combine;
pub mod observable;

mod config;
mod error;

pub use combine::{combine_map, map, merge, merge_with, SourceExt};
pub use config::BridgeConfig;
pub use error::{MeldError, Result};
pub use observable::{Observable, ObservableId, Source, Subscription, SubscriptionId, WeakObservable};
