//! Observation of data containers.
//!
//! `observe` turns a container into a reactive one, once. Keyed containers
//! get a dependency per key; ordered containers rely on their mutators. Both
//! get an [`Observer`] whose dependency carries whole-container (structural)
//! notifications.

use std::rc::Rc;

use tracing::trace;

use super::array::ReactiveArray;
use super::dep::Dependency;
use super::object::ReactiveObject;
use super::runtime::Runtime;
use super::value::{Value, ValueKind};

/// Reactive bookkeeping attached to an observed container.
pub struct Observer {
    dep: Dependency,
    runtime: Runtime,
    kind: ValueKind,
}

impl Observer {
    fn new(runtime: &Runtime, kind: ValueKind) -> Self {
        Self {
            dep: Dependency::new(runtime),
            runtime: runtime.clone(),
            kind,
        }
    }

    /// Dependency notified on structural changes to the container.
    pub fn dep(&self) -> &Dependency {
        &self.dep
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Observe a value newly placed inside this container.
    pub(crate) fn observe_value(&self, value: &Value) {
        observe(&self.runtime, value);
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer")
            .field("kind", &self.kind)
            .field("dep", &self.dep)
            .finish()
    }
}

/// Make `value` reactive under `runtime`.
///
/// Returns `None` for scalars. For containers, returns the container's
/// observer; observing the same container again returns the same `Rc`. A
/// container stays bound to the runtime that observed it first.
pub fn observe(runtime: &Runtime, value: &Value) -> Option<Rc<Observer>> {
    match value {
        Value::Object(object) => Some(observe_object(runtime, object)),
        Value::Array(array) => Some(observe_array(runtime, array)),
        _ => None,
    }
}

/// Observe a keyed container: every key becomes reactive.
pub fn observe_object(runtime: &Runtime, object: &ReactiveObject) -> Rc<Observer> {
    if let Some(observer) = object.observer() {
        return observer;
    }

    // Attach before walking so self-referencing data terminates.
    let observer = object.attach_observer(Rc::new(Observer::new(runtime, ValueKind::Keyed)));
    let keys = object.keys_untracked();
    trace!(keys = keys.len(), "observe object");

    for key in &keys {
        define_reactive(runtime, object, key);
    }
    observer
}

/// Observe an ordered container: enable its mutators and observe elements.
pub fn observe_array(runtime: &Runtime, array: &ReactiveArray) -> Rc<Observer> {
    if let Some(observer) = array.observer() {
        return observer;
    }

    let observer = array.attach_observer(Rc::new(Observer::new(runtime, ValueKind::Ordered)));
    let items = array.to_vec_untracked();
    trace!(items = items.len(), "observe array");

    for item in &items {
        observe(runtime, item);
    }
    observer
}

/// Give `key` on `object` its own dependency and observe its value.
///
/// Returns `false` if the key does not exist. Calling it again on a key that
/// is already reactive keeps the existing dependency.
pub fn define_reactive(runtime: &Runtime, object: &ReactiveObject, key: &str) -> bool {
    let Some(value) = object.make_key_reactive(key, || Dependency::new(runtime)) else {
        return false;
    };
    observe(runtime, &value);
    true
}

/// Register the active subscriber with a container value's own dependency
/// and, for arrays, with every container nested inside it.
pub(crate) fn depend_container(value: &Value) {
    match value {
        Value::Object(object) => {
            if let Some(observer) = object.observer() {
                observer.dep().depend();
            }
        }
        Value::Array(array) => {
            if let Some(observer) = array.observer() {
                observer.dep().depend();
            }
            depend_array(array);
        }
        _ => {}
    }
}

fn depend_array(array: &ReactiveArray) {
    for item in array.to_vec_untracked() {
        depend_container(&item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Watcher;
    use serde_json::json;
    use std::cell::Cell;

    #[test]
    fn observe_is_idempotent() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"a": 1, "list": [1, 2]}));

        let first = observe(&runtime, &data).unwrap();
        let second = observe(&runtime, &data).unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        let dep_a = data.as_object().unwrap().key_dependency("a").unwrap();
        observe(&runtime, &data);
        let dep_a_again = data.as_object().unwrap().key_dependency("a").unwrap();
        assert!(dep_a.ptr_eq(&dep_a_again));
    }

    #[test]
    fn scalars_are_not_observed() {
        let runtime = Runtime::new();
        assert!(observe(&runtime, &Value::from(3)).is_none());
        assert!(observe(&runtime, &Value::Null).is_none());
    }

    #[test]
    fn observation_is_deep() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"outer": {"inner": [{"leaf": true}]}}));
        observe(&runtime, &data);

        let outer = data.as_object().unwrap().get_untracked("outer").unwrap();
        let inner = outer.as_object().unwrap().get_untracked("inner").unwrap();
        let leaf = inner.as_array().unwrap().get(0).unwrap();

        assert_eq!(inner.as_array().unwrap().observer().unwrap().kind(), ValueKind::Ordered);
        assert!(leaf.as_object().unwrap().key_dependency("leaf").is_some());
    }

    #[test]
    fn self_referencing_object_terminates() {
        let runtime = Runtime::new();
        let object = ReactiveObject::new();
        object.set("me", object.clone());

        let observer = observe_object(&runtime, &object);
        assert_eq!(observer.kind(), ValueKind::Keyed);
        assert!(object.key_dependency("me").is_some());

        // Break the Rc cycle
        object.remove("me");
    }

    #[test]
    fn reading_an_array_key_tracks_nested_mutations() {
        let runtime = Runtime::new();
        let data = Value::from(json!({"matrix": [[1, 2], [3]]}));
        observe(&runtime, &data);
        let obj = data.as_object().unwrap().clone();

        let runs = Rc::new(Cell::new(0));
        let (reader, r) = (obj.clone(), runs.clone());
        let _watcher = Watcher::new(&runtime, move || {
            reader.get("matrix");
            r.set(r.get() + 1);
        });

        let matrix = obj.get_untracked("matrix").unwrap();
        let row = matrix.as_array().unwrap().to_vec_untracked()[1].clone();
        row.as_array().unwrap().push(4);

        runtime.run_microtasks().unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn define_reactive_on_missing_key() {
        let runtime = Runtime::new();
        let object = ReactiveObject::new();
        assert!(!define_reactive(&runtime, &object, "nope"));
    }
}
