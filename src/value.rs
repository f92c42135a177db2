//! Value Serializer - cycle-safe structural capture of call payloads
//!
//! [`TraceValue`] is the dynamic form arguments and return values travel in.
//! Composites (arrays, objects) are shared handles, so genuinely
//! self-referential graphs are expressible; encoding to `serde_json::Value`
//! runs one identity-based visited pass per emitted event and substitutes the
//! [`CYCLE_MARKER`] on re-visit.
//!
//! Pass semantics: the visited set lives for exactly one emission and is
//! never shared across events, so repeated values in *separate* emissions are
//! never falsely marked. Within a single emission, a composite reachable
//! twice is marked on its second visit (identity, not equality — the set is
//! never un-marked mid-pass).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::error::CallError;
use crate::event::ErrorDescriptor;

/// Sentinel substituted for a composite already visited in the same pass.
pub const CYCLE_MARKER: &str = "[Circular]";

type ArrayHandle = Arc<RwLock<Vec<TraceValue>>>;
type ObjectHandle = Arc<RwLock<BTreeMap<String, TraceValue>>>;

/// A captured runtime value.
///
/// Scalar variants are plain data. `Array` and `Object` are shared handles:
/// cloning yields another handle to the *same* collection, which is what
/// makes cycles expressible and identity-based cycle detection meaningful.
#[derive(Clone)]
pub enum TraceValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Error(ErrorDescriptor),
    Array(ArrayHandle),
    Object(ObjectHandle),
}

impl TraceValue {
    /// Fresh shared array.
    pub fn array(items: impl IntoIterator<Item = TraceValue>) -> Self {
        Self::Array(Arc::new(RwLock::new(items.into_iter().collect())))
    }

    /// Fresh shared object.
    pub fn object(entries: impl IntoIterator<Item = (String, TraceValue)>) -> Self {
        Self::Object(Arc::new(RwLock::new(entries.into_iter().collect())))
    }

    /// Append to an array value. Returns false (and does nothing) on
    /// non-array variants.
    pub fn push(&self, value: TraceValue) -> bool {
        match self {
            Self::Array(handle) => {
                handle.write().push(value);
                true
            }
            _ => false,
        }
    }

    /// Insert into an object value. Returns false (and does nothing) on
    /// non-object variants.
    pub fn insert(&self, key: impl Into<String>, value: TraceValue) -> bool {
        match self {
            Self::Object(handle) => {
                handle.write().insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Encode as JSON in one fresh serialization pass.
    ///
    /// This is the per-emission entry point: each call gets its own visited
    /// set, so cycle marks never leak between emissions.
    pub fn to_json(&self) -> Value {
        let mut seen = HashSet::new();
        encode_value(self, &mut seen)
    }
}

/// Encode an event's whole argument list in a single shared pass, so a value
/// reachable through two arguments of the same call is marked exactly like a
/// value reachable twice through one argument.
pub(crate) fn encode_args(args: &[TraceValue]) -> Vec<Value> {
    let mut seen = HashSet::new();
    args.iter().map(|a| encode_value(a, &mut seen)).collect()
}

fn encode_value(value: &TraceValue, seen: &mut HashSet<usize>) -> Value {
    match value {
        TraceValue::Null => Value::Null,
        TraceValue::Bool(b) => Value::Bool(*b),
        TraceValue::Number(n) => Value::Number(n.clone()),
        TraceValue::String(s) => Value::String(s.clone()),
        TraceValue::Error(descriptor) => encode_descriptor(descriptor),
        TraceValue::Array(handle) => {
            if !seen.insert(identity(handle)) {
                return Value::String(CYCLE_MARKER.to_string());
            }
            // Clone the children out under a short read lock; recursion never
            // holds a lock, so re-entry is cut by the visited check alone.
            let items = handle.read().clone();
            Value::Array(items.iter().map(|item| encode_value(item, seen)).collect())
        }
        TraceValue::Object(handle) => {
            if !seen.insert(identity(handle)) {
                return Value::String(CYCLE_MARKER.to_string());
            }
            let entries = handle.read().clone();
            let mut map = serde_json::Map::new();
            for (key, item) in &entries {
                map.insert(key.clone(), encode_value(item, seen));
            }
            Value::Object(map)
        }
    }
}

fn encode_descriptor(descriptor: &ErrorDescriptor) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("name".to_string(), Value::String(descriptor.name.clone()));
    map.insert(
        "message".to_string(),
        Value::String(descriptor.message.clone()),
    );
    if let Some(stack) = &descriptor.stack {
        map.insert("stack".to_string(), Value::String(stack.clone()));
    }
    Value::Object(map)
}

fn identity<T>(handle: &Arc<T>) -> usize {
    Arc::as_ptr(handle) as *const () as usize
}

impl fmt::Debug for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Cycle-safe: rendering goes through a fresh pass.
        write!(f, "TraceValue({})", self.to_json())
    }
}

/// Scalars compare by value, composites by handle identity. That is the
/// equality the wrapper contract needs: "same return value" means the very
/// handle the callable produced, not a structural copy.
impl PartialEq for TraceValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Error(a), Self::Error(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Arc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for TraceValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for TraceValue {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<i64> for TraceValue {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for TraceValue {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for TraceValue {
    fn from(f: f64) -> Self {
        // NaN and infinities have no JSON form; degrade to null.
        serde_json::Number::from_f64(f)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl From<&str> for TraceValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for TraceValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<ErrorDescriptor> for TraceValue {
    fn from(descriptor: ErrorDescriptor) -> Self {
        Self::Error(descriptor)
    }
}

impl From<&CallError> for TraceValue {
    fn from(err: &CallError) -> Self {
        Self::Error(err.descriptor())
    }
}

impl From<Value> for TraceValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::array(items.into_iter().map(TraceValue::from)),
            Value::Object(entries) => Self::object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, TraceValue::from(v))),
            ),
        }
    }
}
