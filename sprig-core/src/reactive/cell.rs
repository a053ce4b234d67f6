//! Reactive Cell
//!
//! A `ReactiveCell` is a single typed value with its own dependency. It is
//! the explicit form of an intercepted property: `get()` collects the active
//! subscriber, `set()` notifies subscribers when the value actually changes.
//!
//! Keyed and ordered containers ([`ReactiveObject`](super::ReactiveObject),
//! [`ReactiveArray`](super::ReactiveArray)) provide the same capability over
//! dynamically typed [`Value`](super::Value)s.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::dep::Dependency;
use super::runtime::Runtime;

/// A reactive cell holding a value of type `T`.
///
/// Clones share the value and the dependency.
pub struct ReactiveCell<T> {
    value: Rc<RefCell<T>>,
    dep: Dependency,
}

impl<T> ReactiveCell<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new cell with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            dep: Dependency::new(runtime),
        }
    }

    /// Get the current value, registering the active subscriber.
    pub fn get(&self) -> T {
        self.dep.depend();
        self.value.borrow().clone()
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }

    /// Read the value by reference, registering the active subscriber.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.dep.depend();
        f(&self.value.borrow())
    }

    /// Store a new value and notify subscribers.
    ///
    /// Writing a value equal to the current one is a no-op.
    pub fn set(&self, value: T) {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.dep.notify();
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value.borrow());
        self.set(next);
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dep
    }
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            dep: self.dep.clone(),
        }
    }
}

impl<T: Debug> Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveCell")
            .field("value", &*self.value.borrow())
            .field("subscriber_count", &self.dep.subscriber_count())
            .finish()
    }
}
