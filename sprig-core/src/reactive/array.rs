//! Ordered reactive container.
//!
//! An ordered container has no per-index accessors. Instead, every structural
//! operation goes through a mutator that performs the change, observes any
//! newly inserted elements, and notifies the container's own dependency.
//! On an array that was never observed the mutators only perform the change.

use std::cell::{OnceCell, RefCell};
use std::cmp::Ordering;
use std::rc::Rc;

use super::observer::Observer;
use super::value::Value;

#[derive(Default)]
struct ArrayInner {
    items: RefCell<Vec<Value>>,
    observer: OnceCell<Rc<Observer>>,
}

/// Shared handle to an ordered container.
#[derive(Clone, Default)]
pub struct ReactiveArray(Rc<ArrayInner>);

impl ReactiveArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Self(Rc::new(ArrayInner {
            items: RefCell::new(values.into_iter().map(Into::into).collect()),
            observer: OnceCell::new(),
        }))
    }

    // ------------------------------------------------------------------
    // Reads. On an observed array these register the active subscriber
    // with the array's dependency.
    // ------------------------------------------------------------------

    pub fn get(&self, index: usize) -> Option<Value> {
        self.track();
        self.0.items.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.track();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track();
        self.0.items.borrow().clone()
    }

    pub fn to_vec_untracked(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    fn track(&self) {
        if let Some(observer) = self.0.observer.get() {
            observer.dep().depend();
        }
    }

    // ------------------------------------------------------------------
    // Mutators
    // ------------------------------------------------------------------

    /// Append a value.
    pub fn push(&self, value: impl Into<Value>) {
        let value = value.into();
        self.0.items.borrow_mut().push(value.clone());
        self.mutated(&[value]);
    }

    /// Remove and return the last value.
    pub fn pop(&self) -> Option<Value> {
        let popped = self.0.items.borrow_mut().pop();
        self.mutated(&[]);
        popped
    }

    /// Remove and return the first value.
    pub fn shift(&self) -> Option<Value> {
        let shifted = {
            let mut items = self.0.items.borrow_mut();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        self.mutated(&[]);
        shifted
    }

    /// Prepend values, keeping their order.
    pub fn unshift<V, I>(&self, values: I)
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.splice(0, 0, values);
    }

    /// Remove `delete_count` values starting at `start` and insert `items` in
    /// their place. Out-of-range arguments are clamped. Returns the removed
    /// values.
    pub fn splice<V, I>(&self, start: usize, delete_count: usize, items: I) -> Vec<Value>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let inserted: Vec<Value> = items.into_iter().map(Into::into).collect();
        let removed = {
            let mut current = self.0.items.borrow_mut();
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            let removed: Vec<Value> = current.splice(start..end, inserted.iter().cloned()).collect();
            removed
        };
        self.mutated(&inserted);
        removed
    }

    /// Insert a value at `index` (clamped to the length).
    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        self.splice(index, 0, [value.into()]);
    }

    /// Remove the value at `index`, if there is one.
    pub fn remove(&self, index: usize) -> Option<Value> {
        self.splice(index, 1, std::iter::empty::<Value>()).pop()
    }

    /// Replace the value at `index`. Writing past the end appends.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        self.splice(index, 1, [value.into()]);
    }

    /// Shorten to `len` values.
    pub fn truncate(&self, len: usize) {
        self.0.items.borrow_mut().truncate(len);
        self.mutated(&[]);
    }

    /// Stable sort with a comparator.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        self.0.items.borrow_mut().sort_by(compare);
        self.mutated(&[]);
    }

    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.mutated(&[]);
    }

    /// Observe `inserted` and notify, if this array is observed.
    fn mutated(&self, inserted: &[Value]) {
        let Some(observer) = self.observer() else { return };
        for value in inserted {
            observer.observe_value(value);
        }
        observer.dep().notify();
    }

    /// The observer attached by [`observe`](super::observe), if any.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.get().cloned()
    }

    pub fn ptr_eq(&self, other: &ReactiveArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) -> Rc<Observer> {
        self.0.observer.get_or_init(|| observer).clone()
    }
}

impl std::fmt::Debug for ReactiveArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, Runtime, Watcher};
    use serde_json::json;
    use std::cell::Cell;

    fn numbers(arr: &ReactiveArray) -> Vec<f64> {
        arr.to_vec_untracked()
            .iter()
            .filter_map(Value::as_f64)
            .collect()
    }

    #[test]
    fn mutators_on_plain_array() {
        let arr = ReactiveArray::from_values([1, 2, 3]);
        arr.push(4);
        arr.unshift([0]);
        assert_eq!(numbers(&arr), vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        let removed = arr.splice(1, 2, [9, 9, 9]);
        assert_eq!(removed.len(), 2);
        assert_eq!(numbers(&arr), vec![0.0, 9.0, 9.0, 9.0, 3.0, 4.0]);

        assert_eq!(arr.pop().and_then(|v| v.as_f64()), Some(4.0));
        assert_eq!(arr.shift().and_then(|v| v.as_f64()), Some(0.0));
        arr.truncate(2);
        assert_eq!(numbers(&arr), vec![9.0, 9.0]);
        assert!(arr.observer().is_none());
    }

    #[test]
    fn splice_clamps_out_of_range() {
        let arr = ReactiveArray::from_values([1, 2]);
        let removed = arr.splice(10, 5, [3]);
        assert!(removed.is_empty());
        assert_eq!(numbers(&arr), vec![1.0, 2.0, 3.0]);
        assert!(arr.remove(99).is_none());
    }

    #[test]
    fn sort_and_reverse() {
        let arr = ReactiveArray::from_values([3, 1, 2]);
        arr.sort_by(|a, b| {
            a.as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal)
        });
        assert_eq!(numbers(&arr), vec![1.0, 2.0, 3.0]);
        arr.reverse();
        assert_eq!(numbers(&arr), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn each_mutator_notifies_observed_array() {
        let runtime = Runtime::new();
        let value = Value::from(json!([3, 1, 2]));
        observe(&runtime, &value);
        let arr = value.as_array().unwrap().clone();

        let runs = Rc::new(Cell::new(0));
        let (reader, r) = (arr.clone(), runs.clone());
        let _watcher = Watcher::new(&runtime, move || {
            reader.len();
            r.set(r.get() + 1);
        });

        let mutations: Vec<Box<dyn Fn(&ReactiveArray)>> = vec![
            Box::new(|a| a.push(4)),
            Box::new(|a| {
                a.pop();
            }),
            Box::new(|a| {
                a.shift();
            }),
            Box::new(|a| a.unshift([0])),
            Box::new(|a| {
                a.splice(0, 1, [5]);
            }),
            Box::new(|a| a.insert(1, 7)),
            Box::new(|a| {
                a.remove(0);
            }),
            Box::new(|a| a.truncate(1)),
            Box::new(|a| a.sort_by(|_, _| Ordering::Equal)),
            Box::new(|a| a.reverse()),
        ];

        for (n, mutate) in mutations.iter().enumerate() {
            mutate(&arr);
            runtime.run_microtasks().unwrap();
            assert_eq!(runs.get(), n + 2);
        }
    }

    #[test]
    fn inserted_elements_are_observed() {
        let runtime = Runtime::new();
        let value = Value::from(json!([]));
        observe(&runtime, &value);
        let arr = value.as_array().unwrap();

        arr.push(json!({"id": 1}));
        arr.unshift([json!([1, 2])]);

        let items = arr.to_vec_untracked();
        assert!(items[0].as_array().unwrap().observer().is_some());
        assert!(items[1].as_object().unwrap().observer().is_some());
    }
}
