//! Watcher Implementation
//!
//! A Watcher wraps a zero-argument computation and re-runs it whenever a
//! reactive value it read during its last run changes.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher runs its computation immediately, as the
//!    runtime's active subscriber, to collect its initial dependencies.
//!
//! 2. When any of those dependencies notifies, `update()` hands the watcher
//!    to the runtime's scheduler. The computation never runs synchronously
//!    from a notification.
//!
//! 3. The scheduler's flush calls `run()`, which repeats step 1.
//!
//! # Dependency Cleanup
//!
//! Each run collects a fresh dependency set. With
//! [`RuntimeConfig::prune_stale_dependencies`](crate::config::RuntimeConfig)
//! enabled, the watcher then leaves every dependency it did not read this
//! time; otherwise it stays subscribed to everything it ever read.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use tracing::trace;

use super::dep::{DepId, Dependency, WeakDependency};
use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};

struct WatcherInner {
    id: SubscriberId,
    this: Weak<WatcherInner>,
    runtime: Runtime,
    getter: Box<dyn Fn()>,
    /// Dependencies collected by the last completed run.
    deps: RefCell<IndexMap<DepId, WeakDependency>>,
    /// Dependencies collected by the run in progress.
    new_deps: RefCell<IndexMap<DepId, WeakDependency>>,
    active: Cell<bool>,
    run_count: Cell<usize>,
}

/// A re-runnable computation driven by reactive reads.
///
/// # Example
///
/// ```rust,ignore
/// let runtime = Runtime::new();
/// let count = ReactiveCell::new(&runtime, 0);
///
/// let c = count.clone();
/// let watcher = Watcher::new(&runtime, move || println!("count = {}", c.get()));
///
/// count.set(5);
/// runtime.run_microtasks()?; // prints "count = 5"
/// ```
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

impl Watcher {
    /// Create a watcher and run its computation immediately.
    pub fn new<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() + 'static,
    {
        let watcher = Self::new_lazy(runtime, getter);
        watcher.get();
        watcher
    }

    /// Create a watcher without running it.
    ///
    /// It has no dependencies until [`Watcher::get`] is called.
    pub fn new_lazy<F>(runtime: &Runtime, getter: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self(Rc::new_cyclic(|this| WatcherInner {
            id: SubscriberId::new(),
            this: this.clone(),
            runtime: runtime.clone(),
            getter: Box::new(getter),
            deps: RefCell::new(IndexMap::new()),
            new_deps: RefCell::new(IndexMap::new()),
            active: Cell::new(true),
            run_count: Cell::new(0),
        }))
    }

    pub fn id(&self) -> SubscriberId {
        self.0.id
    }

    /// Run the computation now, collecting dependencies.
    pub fn get(&self) {
        self.0.get();
    }

    /// Schedule a re-run on the runtime's next flush.
    pub fn update(&self) {
        self.0.update();
    }

    /// Unsubscribe from every dependency and stop running.
    pub fn teardown(&self) {
        if !self.0.active.replace(false) {
            return;
        }
        let deps = std::mem::take(&mut *self.0.deps.borrow_mut());
        for dep in deps.values().filter_map(WeakDependency::upgrade) {
            dep.remove_subscriber(self.0.id);
        }
        trace!(watcher = ?self.0.id, "teardown");
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    /// Number of dependencies collected by the last run.
    pub fn dependency_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    /// Whether the last run read `dep`.
    pub fn depends_on(&self, dep: &Dependency) -> bool {
        self.0.deps.borrow().contains_key(&dep.id())
    }

    /// This watcher as a type-erased subscriber.
    pub fn as_subscriber(&self) -> Rc<dyn Subscriber> {
        self.0.clone()
    }
}

impl WatcherInner {
    fn get(&self) {
        if !self.active.get() {
            return;
        }
        let Some(this) = self.this.upgrade() else { return };

        self.new_deps.borrow_mut().clear();
        {
            let _guard = self.runtime.context().enter(this);
            (self.getter)();
        }
        self.cleanup_deps();
        self.run_count.set(self.run_count.get() + 1);
    }

    /// Swap in the dependencies collected by the run that just finished.
    fn cleanup_deps(&self) {
        let new_deps = std::mem::take(&mut *self.new_deps.borrow_mut());
        let mut deps = self.deps.borrow_mut();

        if self.runtime.config().prune_stale_dependencies {
            for (id, dep) in deps.iter() {
                if new_deps.contains_key(id) {
                    continue;
                }
                if let Some(dep) = dep.upgrade() {
                    dep.remove_subscriber(self.id);
                }
            }
            *deps = new_deps;
        } else {
            deps.extend(new_deps);
        }
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dependency(&self, dep: &Dependency) {
        let mut new_deps = self.new_deps.borrow_mut();
        if new_deps.contains_key(&dep.id()) {
            return;
        }
        new_deps.insert(dep.id(), dep.downgrade());

        let this: Weak<dyn Subscriber> = self.this.clone();
        dep.add_subscriber(self.id, this);
    }

    fn update(&self) {
        if !self.active.get() {
            return;
        }
        if let Some(this) = self.this.upgrade() {
            self.runtime.queue_subscriber(this);
        }
    }

    fn run(&self) {
        self.get();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}
