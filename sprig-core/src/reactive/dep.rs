//! Dependency
//!
//! A Dependency is the set of subscribers interested in one reactive value:
//! one object key, one reactive cell, or one observed container as a whole.
//!
//! Subscribers are kept in insertion order without duplicates and are held
//! weakly, so dropping a watcher is enough to stop it from being notified.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use tracing::trace;

use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

/// Unique identifier for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct DepInner {
    id: DepId,
    runtime: Runtime,
    subscribers: RefCell<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

/// Shared handle to one dependency.
#[derive(Clone)]
pub struct Dependency(Rc<DepInner>);

impl Dependency {
    /// Create a dependency bound to `runtime`'s active-subscriber slot.
    pub fn new(runtime: &Runtime) -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            runtime: runtime.clone(),
            subscribers: RefCell::new(IndexMap::new()),
        }))
    }

    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// The runtime this dependency reports to.
    pub fn runtime(&self) -> &Runtime {
        &self.0.runtime
    }

    /// Register the runtime's active subscriber, if there is one.
    pub fn depend(&self) {
        if let Some(subscriber) = self.0.runtime.context().current() {
            trace!(dep = ?self.0.id, subscriber = ?subscriber.id(), "depend");
            subscriber.add_dependency(self);
        }
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn add_subscriber(&self, id: SubscriberId, subscriber: Weak<dyn Subscriber>) -> bool {
        let mut subscribers = self.0.subscribers.borrow_mut();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, subscriber);
        true
    }

    /// Remove a subscriber, keeping the order of the others.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.0.subscribers.borrow_mut().shift_remove(&id).is_some()
    }

    pub fn has_subscriber(&self, id: SubscriberId) -> bool {
        self.0.subscribers.borrow().contains_key(&id)
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0
            .subscribers
            .borrow()
            .values()
            .filter(|sub| sub.strong_count() > 0)
            .count()
    }

    /// Call `update()` on every subscriber in insertion order.
    ///
    /// Iterates a snapshot: subscribers added while notifying are not
    /// visited by this call.
    pub fn notify(&self) {
        let snapshot: Vec<Rc<dyn Subscriber>> = {
            let mut subscribers = self.0.subscribers.borrow_mut();
            subscribers.retain(|_, sub| sub.strong_count() > 0);
            let live: Vec<Rc<dyn Subscriber>> =
                subscribers.values().filter_map(Weak::upgrade).collect();
            live
        };

        trace!(dep = ?self.0.id, subscribers = snapshot.len(), "notify");

        for subscriber in snapshot {
            subscriber.update();
        }
    }

    pub fn downgrade(&self) -> WeakDependency {
        WeakDependency(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Dependency) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.0.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Non-owning handle to a dependency, kept by subscribers for cleanup.
#[derive(Clone)]
pub struct WeakDependency(Weak<DepInner>);

impl WeakDependency {
    pub fn upgrade(&self) -> Option<Dependency> {
        self.0.upgrade().map(Dependency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    /// Subscriber that records update calls into a shared log.
    struct Recorder {
        id: SubscriberId,
        this: Weak<Recorder>,
        log: Rc<RefCell<Vec<SubscriberId>>>,
        updates: Cell<usize>,
        /// Subscribed to the dependency on the next update.
        recruit: RefCell<Option<(Dependency, Rc<Recorder>)>>,
    }

    impl Recorder {
        fn new(log: &Rc<RefCell<Vec<SubscriberId>>>) -> Rc<Self> {
            Rc::new_cyclic(|this| Self {
                id: SubscriberId::new(),
                this: this.clone(),
                log: log.clone(),
                updates: Cell::new(0),
                recruit: RefCell::new(None),
            })
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn add_dependency(&self, dep: &Dependency) {
            let this: Weak<dyn Subscriber> = self.this.clone();
            dep.add_subscriber(self.id, this);
        }

        fn update(&self) {
            self.updates.set(self.updates.get() + 1);
            self.log.borrow_mut().push(self.id);
            if let Some((dep, other)) = self.recruit.borrow_mut().take() {
                other.add_dependency(&dep);
            }
        }

        fn run(&self) {}
    }

    #[test]
    fn depend_without_active_subscriber_is_noop() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);

        dep.depend();
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn depend_adds_active_subscriber_once() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder::new(&log);

        {
            let _guard = runtime.context().enter(recorder.clone());
            dep.depend();
            dep.depend();
            dep.depend();
        }

        assert_eq!(dep.subscriber_count(), 1);
        assert!(dep.has_subscriber(recorder.id));
    }

    #[test]
    fn notify_visits_in_insertion_order() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Recorder::new(&log);
        let second = Recorder::new(&log);
        let third = Recorder::new(&log);

        for recorder in [&second, &first, &third] {
            let _guard = runtime.context().enter(recorder.clone());
            dep.depend();
        }

        dep.notify();
        assert_eq!(*log.borrow(), vec![second.id, first.id, third.id]);
    }

    #[test]
    fn dropped_subscribers_are_skipped() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));
        let kept = Recorder::new(&log);

        {
            let dropped = Recorder::new(&log);
            let _guard = runtime.context().enter(dropped.clone());
            dep.depend();
        }
        {
            let _guard = runtime.context().enter(kept.clone());
            dep.depend();
        }

        dep.notify();
        assert_eq!(*log.borrow(), vec![kept.id]);
        assert_eq!(dep.subscriber_count(), 1);
    }

    #[test]
    fn remove_subscriber_stops_notifications() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder::new(&log);

        {
            let _guard = runtime.context().enter(recorder.clone());
            dep.depend();
        }
        assert!(dep.remove_subscriber(recorder.id));

        dep.notify();
        assert_eq!(recorder.updates.get(), 0);
    }

    #[test]
    fn subscribers_added_during_notify_wait_for_next_call() {
        let runtime = Runtime::new();
        let dep = Dependency::new(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));
        let first = Recorder::new(&log);
        let late = Recorder::new(&log);

        {
            let _guard = runtime.context().enter(first.clone());
            dep.depend();
        }
        *first.recruit.borrow_mut() = Some((dep.clone(), late.clone()));

        dep.notify();
        assert!(dep.has_subscriber(late.id));
        assert_eq!(late.updates.get(), 0);
        assert_eq!(*log.borrow(), vec![first.id]);

        dep.notify();
        assert_eq!(late.updates.get(), 1);
        assert_eq!(*log.borrow(), vec![first.id, first.id, late.id]);
    }
}
