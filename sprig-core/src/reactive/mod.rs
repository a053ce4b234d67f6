//! Reactive Primitives
//!
//! This module implements dependency tracking and batched updates: observed
//! data, dependencies, watchers, and the scheduler that re-runs them.
//!
//! # Concepts
//!
//! ## Observed data
//!
//! Data is a tree of [`Value`]s. [`observe`] walks a container and makes it
//! reactive: every key of a keyed container gets its own [`Dependency`], and
//! every container gets an [`Observer`] whose dependency is notified on
//! structural change (keys added or removed, array mutators).
//!
//! ## Watchers
//!
//! A [`Watcher`] runs a getter while registered as the runtime's active
//! subscriber. Every reactive read inside the getter subscribes the watcher
//! to the dependency that was read. When any of them changes, the watcher is
//! queued rather than re-run immediately.
//!
//! ## Scheduling
//!
//! Queued watchers are deduplicated and run together in one flush, which the
//! [`Runtime`] places on its microtask queue. Callbacks registered with
//! [`Runtime::next_tick`] run in a later microtask, after that flush.
//!
//! # Implementation Notes
//!
//! The active-subscriber slot lives on the [`Runtime`] rather than in a
//! global, and dependencies hold subscribers weakly. Dropping a watcher is
//! enough to disconnect it.

mod array;
mod cell;
mod context;
mod dep;
mod object;
mod observer;
mod runtime;
mod scheduler;
mod subscriber;
mod value;
mod watcher;

pub use array::ReactiveArray;
pub use cell::ReactiveCell;
pub use context::{ContextGuard, ReactiveContext};
pub use dep::{DepId, Dependency, WeakDependency};
pub use object::ReactiveObject;
pub use observer::{define_reactive, observe, observe_array, observe_object, Observer};
pub use runtime::{NextTick, Runtime};
pub use scheduler::{TickQueue, UpdateScheduler};
pub use subscriber::{Subscriber, SubscriberId};
pub use value::{Value, ValueKind};
pub use watcher::Watcher;
