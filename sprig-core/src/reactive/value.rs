//! Dynamic values for reactive data.
//!
//! Data handed to [`observe`](super::observe) is a tree of [`Value`]s. Each
//! value is classified once as scalar, keyed container or ordered container;
//! that classification decides how it is observed.

use serde_json::Number;
use tracing::warn;

use super::array::ReactiveArray;
use super::object::ReactiveObject;

/// How a value takes part in observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Not observable by itself; tracked through the key holding it.
    Scalar,
    /// Keyed container: every key becomes a reactive accessor.
    Keyed,
    /// Ordered container: structural mutators notify the container.
    Ordered,
}

/// A reactive data value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ReactiveObject),
    Array(ReactiveArray),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Object(_) => ValueKind::Keyed,
            Value::Array(_) => ValueKind::Ordered,
            _ => ValueKind::Scalar,
        }
    }

    /// Identity check used to skip redundant writes.
    ///
    /// Scalars compare by value (NaN counts as identical to itself);
    /// containers compare by reference.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ReactiveObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ReactiveArray> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Build fresh, unobserved containers from JSON data.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(ReactiveArray::from_values(
                items.into_iter().map(Value::from_json),
            )),
            serde_json::Value::Object(map) => Value::Object(ReactiveObject::from_entries(
                map.into_iter().map(|(k, v)| (k, Value::from_json(v))),
            )),
        }
    }

    /// Snapshot as JSON, reading through tracked accessors.
    ///
    /// A subscriber that serialises data this way depends on all of it.
    /// Non-finite numbers become `null`, and so does a container reached
    /// again from inside itself.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_within(&mut Vec::new())
    }

    /// `ancestors` holds the containers currently being serialised.
    fn to_json_within(&self, ancestors: &mut Vec<Value>) -> serde_json::Value {
        if matches!(self, Value::Object(_) | Value::Array(_)) {
            if ancestors.iter().any(|seen| seen.same(self)) {
                warn!("cyclic value serialised as null");
                return serde_json::Value::Null;
            }
            ancestors.push(self.clone());
        }

        let json = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(
                arr.to_vec()
                    .iter()
                    .map(|item| item.to_json_within(ancestors))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut map = serde_json::Map::new();
                for key in obj.keys() {
                    let value = obj.get(&key).unwrap_or_default();
                    map.insert(key, value.to_json_within(ancestors));
                }
                serde_json::Value::Object(map)
            }
        };

        if matches!(self, Value::Object(_) | Value::Array(_)) {
            ancestors.pop();
        }
        json
    }

    /// String form used when interpolating data into text.
    ///
    /// `Null` renders empty, containers as pretty-printed JSON, scalars in
    /// their natural form.
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Object(_) | Value::Array(_) => {
                serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
            }
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        n.to_string()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ReactiveObject> for Value {
    fn from(obj: ReactiveObject) -> Self {
        Value::Object(obj)
    }
}

impl From<ReactiveArray> for Value {
    fn from(arr: ReactiveArray) -> Self {
        Value::Array(arr)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}
