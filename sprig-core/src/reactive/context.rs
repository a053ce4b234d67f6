//! Reactive Context
//!
//! The reactive context records which subscriber is currently collecting
//! dependencies. When a reactive value is read, its dependency asks the
//! context for the active subscriber and registers it.
//!
//! # Implementation
//!
//! Each [`Runtime`](super::Runtime) owns exactly one context with a single
//! slot. Entering returns a guard; dropping the guard restores the slot to
//! what it held before, so the slot is cleared even if the computation
//! panics.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, SubscriberId};

/// The active-subscriber slot of one runtime.
#[derive(Default)]
pub struct ReactiveContext {
    active: RefCell<Option<Rc<dyn Subscriber>>>,
}

impl ReactiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `subscriber` the active one until the returned guard is dropped.
    pub fn enter(&self, subscriber: Rc<dyn Subscriber>) -> ContextGuard<'_> {
        // Active spans are expected to be disjoint; `previous` is normally None.
        let previous = self.active.replace(Some(subscriber));
        ContextGuard {
            context: self,
            previous,
        }
    }

    /// Check if a subscriber is collecting dependencies.
    pub fn is_active(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Get the active subscriber, if any.
    pub fn current(&self) -> Option<Rc<dyn Subscriber>> {
        self.active.borrow().clone()
    }

    /// Get the active subscriber's ID, if any.
    pub fn current_id(&self) -> Option<SubscriberId> {
        self.active.borrow().as_ref().map(|sub| sub.id())
    }
}

/// Restores the context slot when dropped.
pub struct ContextGuard<'a> {
    context: &'a ReactiveContext,
    previous: Option<Rc<dyn Subscriber>>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        *self.context.active.borrow_mut() = self.previous.take();
    }
}
