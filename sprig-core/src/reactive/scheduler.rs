//! Update Scheduler
//!
//! Batches subscriber re-runs into one deferred flush.
//!
//! # Algorithm
//!
//! 1. `enqueue` adds a subscriber to the pending queue unless it is already
//!    there. Queue membership is the only dedup key.
//! 2. The first `enqueue` since the last flush reports that a flush must be
//!    scheduled; the runtime then queues exactly one microtask.
//! 3. The flush walks the live queue in insertion order and runs each entry.
//!    Entries appended during the walk are visited in the same pass; entries
//!    already present (run or not) are not queued twice.
//! 4. After the walk, the queue and the flag are cleared.
//!
//! The next-tick queue follows the same "one microtask per drain cycle"
//! policy for arbitrary callbacks.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use super::subscriber::{Subscriber, SubscriberId};

/// Pending subscriber queue plus the "flush already scheduled" flag.
#[derive(Default)]
pub struct UpdateScheduler {
    queue: RefCell<IndexMap<SubscriberId, Rc<dyn Subscriber>>>,
    waiting: Cell<bool>,
}

impl UpdateScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `subscriber` for the next flush.
    ///
    /// Returns `true` when the caller must schedule the flush.
    pub fn enqueue(&self, subscriber: Rc<dyn Subscriber>) -> bool {
        let schedule = !self.waiting.replace(true);

        let id = subscriber.id();
        let mut queue = self.queue.borrow_mut();
        if !queue.contains_key(&id) {
            trace!(subscriber = ?id, position = queue.len(), "queue subscriber");
            queue.insert(id, subscriber);
        }

        schedule
    }

    /// Run every queued subscriber once. Returns how many ran.
    pub fn flush(&self) -> usize {
        // Clears the queue and flag on every exit path, including a panicking
        // subscriber, so later updates can schedule a new flush.
        let _reset = FlushReset(self);

        let mut index = 0;
        loop {
            let next = self
                .queue
                .borrow()
                .get_index(index)
                .map(|(_, subscriber)| subscriber.clone());

            let Some(subscriber) = next else { break };
            subscriber.run();
            index += 1;
        }

        debug!(ran = index, "flushed subscriber queue");
        index
    }

    /// Whether a flush is scheduled and not yet finished.
    pub fn is_waiting(&self) -> bool {
        self.waiting.get()
    }

    pub fn is_queued(&self, id: SubscriberId) -> bool {
        self.queue.borrow().contains_key(&id)
    }

    /// Number of subscribers waiting for the flush.
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

struct FlushReset<'a>(&'a UpdateScheduler);

impl Drop for FlushReset<'_> {
    fn drop(&mut self) {
        // Take the entries out before dropping them: a subscriber's drop may
        // touch the scheduler again.
        let drained = std::mem::take(&mut *self.0.queue.borrow_mut());
        self.0.waiting.set(false);
        drop(drained);
    }
}

type Callback = Box<dyn FnOnce()>;

/// Deferred callbacks unrelated to a specific subscriber.
#[derive(Default)]
pub struct TickQueue {
    callbacks: RefCell<Vec<Callback>>,
    pending: Cell<bool>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback. Returns `true` when the caller must schedule a drain.
    pub fn push(&self, callback: Callback) -> bool {
        let schedule = !self.pending.replace(true);
        self.callbacks.borrow_mut().push(callback);
        schedule
    }

    /// Run the callbacks queued so far, in order.
    ///
    /// Callbacks queued while draining go to the next drain cycle.
    pub fn drain(&self) -> usize {
        self.pending.set(false);
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        trace!(count, "drained next-tick callbacks");
        count
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get()
    }
}
