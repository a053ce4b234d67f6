//! Subscriber types for the reactive system.
//!
//! A Subscriber represents any computation that depends on reactive values.
//! Dependencies hold weak references to subscribers; the runtime's scheduler
//! holds strong ones only while a re-run is pending.

use std::sync::atomic::{AtomicU64, Ordering};

use super::dep::Dependency;

/// Unique identifier for a subscriber.
///
/// Used as the dedup key both in a dependency's subscriber set and in the
/// scheduler's pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A re-runnable computation tied to reactive reads.
pub trait Subscriber {
    /// Get the subscriber ID.
    fn id(&self) -> SubscriberId;

    /// Called by [`Dependency::depend`] while this subscriber is the active one.
    ///
    /// Implementations are expected to register themselves with `dep`
    /// (see [`Dependency::add_subscriber`]).
    fn add_dependency(&self, dep: &Dependency);

    /// A dependency changed. Must not run the computation synchronously.
    fn update(&self);

    /// Re-run the computation. Called by the scheduler during a flush.
    fn run(&self);
}
