//! Keyed reactive container.
//!
//! A `ReactiveObject` is an insertion-ordered map of [`Value`]s. Before it is
//! observed it behaves like a plain shared map. Once observed, every key owns
//! a [`Dependency`]: `get` collects the active subscriber and `set` notifies
//! when the stored value changes.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::dep::Dependency;
use super::observer::{define_reactive, depend_container, Observer};
use super::value::Value;

/// One key's storage.
pub(crate) struct Slot {
    pub(crate) value: Value,
    /// Present once the key has been made reactive.
    pub(crate) dep: Option<Dependency>,
}

#[derive(Default)]
struct ObjectInner {
    entries: RefCell<IndexMap<String, Slot>>,
    /// Marker set by `observe`; never part of `entries`.
    observer: OnceCell<Rc<Observer>>,
}

/// Shared handle to a keyed container.
#[derive(Clone, Default)]
pub struct ReactiveObject(Rc<ObjectInner>);

impl ReactiveObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entries = entries
            .into_iter()
            .map(|(k, v)| {
                let slot = Slot {
                    value: v.into(),
                    dep: None,
                };
                (k.into(), slot)
            })
            .collect();

        Self(Rc::new(ObjectInner {
            entries: RefCell::new(entries),
            observer: OnceCell::new(),
        }))
    }

    /// Read a key, registering the active subscriber with its dependency.
    ///
    /// If the value is itself an observed container, the subscriber is also
    /// registered with that container's dependency (and, for arrays, with
    /// every nested container inside it), so structural mutations reach it.
    ///
    /// Reading a key that does not exist registers with the object's own
    /// dependency instead, so a later `set` that adds the key reaches it.
    pub fn get(&self, key: &str) -> Option<Value> {
        let found = {
            let entries = self.0.entries.borrow();
            entries.get(key).map(|slot| (slot.value.clone(), slot.dep.clone()))
        };
        let Some((value, dep)) = found else {
            if let Some(observer) = self.observer() {
                observer.dep().depend();
            }
            return None;
        };

        if let Some(dep) = dep {
            if dep.runtime().is_tracking() {
                dep.depend();
                depend_container(&value);
            }
        }
        Some(value)
    }

    /// Read a key without tracking.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.0
            .entries
            .borrow()
            .get(key)
            .map(|slot| slot.value.clone())
    }

    /// Write a key.
    ///
    /// On an observed object:
    /// - writing a value identical to the current one does nothing;
    /// - otherwise the new value is stored, observed, and the key's
    ///   subscribers are notified;
    /// - a key that did not exist becomes reactive and the object's own
    ///   dependency is notified (the key set changed).
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let existing = {
            let mut entries = self.0.entries.borrow_mut();
            match entries.get_mut(key) {
                Some(slot) => {
                    if slot.value.same(&value) {
                        return;
                    }
                    slot.value = value.clone();
                    Some(slot.dep.clone())
                }
                None => {
                    entries.insert(
                        key.to_string(),
                        Slot {
                            value: value.clone(),
                            dep: None,
                        },
                    );
                    None
                }
            }
        };

        let Some(observer) = self.observer() else { return };

        match existing {
            Some(dep) => {
                observer.observe_value(&value);
                if let Some(dep) = dep {
                    dep.notify();
                }
            }
            None => {
                define_reactive(observer.runtime(), self, key);
                observer.dep().notify();
            }
        }
    }

    /// Remove a key. On an observed object this notifies the key's readers
    /// and the object's own dependency.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.0.entries.borrow_mut().shift_remove(key)?;
        if let Some(dep) = &removed.dep {
            dep.notify();
        }
        if let Some(observer) = self.observer() {
            observer.dep().notify();
        }
        Some(removed.value)
    }

    /// Keys in insertion order.
    ///
    /// Enumerating an observed object registers the active subscriber with
    /// the object's own dependency, so added or removed keys reach it.
    pub fn keys(&self) -> Vec<String> {
        if let Some(observer) = self.observer() {
            observer.dep().depend();
        }
        self.keys_untracked()
    }

    pub fn keys_untracked(&self) -> Vec<String> {
        self.0.entries.borrow().keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.entries.borrow().is_empty()
    }

    /// The observer attached by [`observe`](super::observe), if any.
    pub fn observer(&self) -> Option<Rc<Observer>> {
        self.0.observer.get().cloned()
    }

    /// The dependency owned by `key`, once the key is reactive.
    pub fn key_dependency(&self, key: &str) -> Option<Dependency> {
        self.0.entries.borrow().get(key).and_then(|slot| slot.dep.clone())
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Attach `observer` unless one is already attached; returns the one in place.
    pub(crate) fn attach_observer(&self, observer: Rc<Observer>) -> Rc<Observer> {
        self.0.observer.get_or_init(|| observer).clone()
    }

    /// Give `key` a dependency if it has none. Returns the key's value.
    pub(crate) fn make_key_reactive(&self, key: &str, dep: impl FnOnce() -> Dependency) -> Option<Value> {
        let mut entries = self.0.entries.borrow_mut();
        let slot = entries.get_mut(key)?;
        if slot.dep.is_none() {
            slot.dep = Some(dep());
        }
        Some(slot.value.clone())
    }
}

impl std::fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.0.entries.borrow();
        f.debug_map()
            .entries(entries.iter().map(|(k, slot)| (k, &slot.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{observe, Runtime, Watcher};
    use serde_json::json;
    use std::cell::Cell;

    fn counting_watcher(runtime: &Runtime, read: impl Fn() + 'static) -> (Watcher, Rc<Cell<usize>>) {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let watcher = Watcher::new(runtime, move || {
            read();
            r.set(r.get() + 1);
        });
        (watcher, runs)
    }

    #[test]
    fn unobserved_object_is_plain() {
        let obj = ReactiveObject::from_entries([("a", 1)]);
        obj.set("a", 2);
        obj.set("b", 3);

        assert!(obj.observer().is_none());
        assert!(obj.key_dependency("a").is_none());
        assert_eq!(obj.get("a").unwrap().as_f64(), Some(2.0));
        assert_eq!(obj.len(), 2);
    }

    #[test]
    fn write_notifies_readers_once_per_flush() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"count": 0}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let reader = obj.clone();
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            reader.get("count");
        });

        obj.set("count", 1);
        obj.set("count", 2);
        obj.set("count", 3);
        runtime.run_microtasks().unwrap();

        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn writing_same_value_is_silent() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"name": "a", "list": []}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let reader = obj.clone();
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            reader.get("name");
            reader.get("list");
        });

        obj.set("name", "a");
        let list = obj.get_untracked("list").unwrap();
        obj.set("list", list);

        assert!(!runtime.has_pending_microtasks());
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn new_value_is_observed() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"user": null}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap();

        obj.set("user", json!({"name": "ada"}));
        let user = obj.get_untracked("user").unwrap();
        let user = user.as_object().unwrap();
        assert!(user.observer().is_some());
        assert!(user.key_dependency("name").is_some());
    }

    #[test]
    fn adding_a_key_notifies_enumerators() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"a": 1}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let reader = obj.clone();
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            reader.keys();
        });

        obj.set("b", 2);
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 2);
        assert!(obj.key_dependency("b").is_some());

        obj.remove("a");
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 3);
        assert_eq!(obj.keys_untracked(), vec!["b"]);
    }

    #[test]
    fn reading_a_missing_key_tracks_its_addition() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"a": 1}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let reader = obj.clone();
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            reader.get("b");
        });

        obj.set("b", 2);
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 2);

        // Now subscribed to the key itself.
        obj.set("b", 3);
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn removing_a_key_notifies_its_readers() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"msg": "x", "other": 0}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let seen = Rc::new(RefCell::new(None));
        let (reader, out) = (obj.clone(), seen.clone());
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            *out.borrow_mut() = reader.get("msg");
        });

        assert!(obj.remove("msg").is_some());
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 2);
        assert!(seen.borrow().is_none());

        obj.set("msg", "back");
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 3);
        assert_eq!(seen.borrow().as_ref().and_then(Value::as_str), Some("back"));
    }

    #[test]
    fn nested_object_writes_reach_deep_readers() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"user": {"name": "ada"}}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let reader = obj.clone();
        let (_watcher, runs) = counting_watcher(&runtime, move || {
            let user = reader.get("user").unwrap();
            user.as_object().unwrap().get("name");
        });

        let user = obj.get_untracked("user").unwrap();
        user.as_object().unwrap().set("name", "grace");
        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 2);
    }
}
