//! The value codec: a structured-clone-equivalent encoding shared by both
//! transports.
//!
//! Two distinct types exist on purpose. [`Value`] is the acyclic, wire-safe
//! form that actually crosses a transport (it derives `Serialize`/
//! `Deserialize` and is encoded with `bincode`). [`Encodable`] is what a
//! caller builds *before* encoding — it uses `Rc<RefCell<_>>` containers so
//! it is capable of representing the same kind of cyclic object graphs a
//! caller might naturally construct. `encode()` walks an `Encodable` graph
//! and breaks cycles by omitting the back-edge entirely, never by inserting
//! a placeholder.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GoroutineError;

/// Which flavor of binary buffer a [`Value::Bytes`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypedArrayKind {
    ArrayBuffer,
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

/// The acyclic, transport-neutral value form.
///
/// `Number` stores a raw `f64` so `NaN` and `±Infinity` survive a
/// `bincode` round trip bit-for-bit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    Str(String),
    Date(DateTime<Utc>),
    Regex { pattern: String, flags: String },
    Bytes { kind: TypedArrayKind, data: Vec<u8> },
    Array(Vec<Value>),
    /// Insertion-ordered key/value pairs — plain objects are not hash maps.
    Object(Vec<(String, Value)>),
    Map(Vec<(Value, Value)>),
    Set(Vec<Value>),
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn object(fields: Vec<(&str, Value)>) -> Self {
        Value::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Build a `Regex` value, rejecting a pattern that doesn't actually
    /// compile rather than shipping it to a worker only to fail there.
    /// The compiled `regex::Regex` itself is never carried over the wire —
    /// only the pattern/flags pair is, so both sides recompile it locally.
    pub fn regex(pattern: impl Into<String>, flags: impl Into<String>) -> Result<Value, GoroutineError> {
        let pattern = pattern.into();
        regex::Regex::new(&pattern).map_err(|e| GoroutineError::InvalidArgument(format!("invalid regex pattern: {e}")))?;
        Ok(Value::Regex {
            pattern,
            flags: flags.into(),
        })
    }
}

type Fields = Rc<RefCell<Vec<(String, Encodable)>>>;
type Items = Rc<RefCell<Vec<Encodable>>>;
type Pairs = Rc<RefCell<Vec<(Encodable, Encodable)>>>;

/// The possibly-cyclic value graph a caller builds before handing it to
/// [`encode`]. Only the container variants (`Array`, `Object`, `Map`,
/// `Set`) carry shared, mutable `Rc` handles — those are the only kinds
/// that can participate in a cycle.
#[derive(Debug, Clone)]
pub enum Encodable {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    Str(String),
    Date(DateTime<Utc>),
    Regex { pattern: String, flags: String },
    Bytes { kind: TypedArrayKind, data: Vec<u8> },
    Array(Items),
    Object(Fields),
    Map(Pairs),
    Set(Items),
    Error {
        name: String,
        message: String,
        stack: Option<String>,
    },
}

impl Encodable {
    pub fn array(items: Vec<Encodable>) -> Self {
        Encodable::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(fields: Vec<(String, Encodable)>) -> Self {
        Encodable::Object(Rc::new(RefCell::new(fields)))
    }

    /// Handle to the backing storage of an `Object`, used to wire up a
    /// self-referential field after the object has already been created.
    pub fn object_handle(&self) -> Option<Fields> {
        match self {
            Encodable::Object(rc) => Some(Rc::clone(rc)),
            _ => None,
        }
    }
}

fn container_ptr<T>(rc: &Rc<RefCell<T>>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

/// Encode a possibly-cyclic [`Encodable`] graph into the acyclic wire form.
///
/// Any container already on the current ancestor path is dropped from its
/// parent rather than replaced with a placeholder: for an object field that
/// closes a cycle, the key itself disappears from the encoded output.
pub fn encode(value: &Encodable) -> Value {
    encode_inner(value, &mut HashSet::new()).unwrap_or(Value::Undefined)
}

fn encode_inner(value: &Encodable, ancestors: &mut HashSet<usize>) -> Option<Value> {
    Some(match value {
        Encodable::Null => Value::Null,
        Encodable::Undefined => Value::Undefined,
        Encodable::Bool(b) => Value::Bool(*b),
        Encodable::Number(n) => Value::Number(*n),
        Encodable::BigInt(n) => Value::BigInt(*n),
        Encodable::Str(s) => Value::Str(s.clone()),
        Encodable::Date(d) => Value::Date(*d),
        Encodable::Regex { pattern, flags } => Value::Regex {
            pattern: pattern.clone(),
            flags: flags.clone(),
        },
        Encodable::Bytes { kind, data } => Value::Bytes {
            kind: *kind,
            data: data.clone(),
        },
        Encodable::Error { name, message, stack } => Value::Error {
            name: name.clone(),
            message: message.clone(),
            stack: stack.clone(),
        },
        Encodable::Array(rc) => {
            let ptr = container_ptr(rc);
            if !ancestors.insert(ptr) {
                return None;
            }
            let items = rc
                .borrow()
                .iter()
                .filter_map(|item| encode_inner(item, ancestors))
                .collect();
            ancestors.remove(&ptr);
            Value::Array(items)
        }
        Encodable::Set(rc) => {
            let ptr = container_ptr(rc);
            if !ancestors.insert(ptr) {
                return None;
            }
            let items = rc
                .borrow()
                .iter()
                .filter_map(|item| encode_inner(item, ancestors))
                .collect();
            ancestors.remove(&ptr);
            Value::Set(items)
        }
        Encodable::Object(rc) => {
            let ptr = container_ptr(rc);
            if !ancestors.insert(ptr) {
                return None;
            }
            let fields = rc
                .borrow()
                .iter()
                .filter_map(|(k, v)| encode_inner(v, ancestors).map(|v| (k.clone(), v)))
                .collect();
            ancestors.remove(&ptr);
            Value::Object(fields)
        }
        Encodable::Map(rc) => {
            let ptr = container_ptr(rc);
            if !ancestors.insert(ptr) {
                return None;
            }
            let pairs = rc
                .borrow()
                .iter()
                .filter_map(|(k, v)| {
                    let k = encode_inner(k, ancestors)?;
                    let v = encode_inner(v, ancestors)?;
                    Some((k, v))
                })
                .collect();
            ancestors.remove(&ptr);
            Value::Map(pairs)
        }
    })
}

/// Rebuild a fresh, non-shared [`Encodable`] tree from a [`Value`]. The
/// result is trivially acyclic since `Value` itself cannot contain a cycle.
pub fn decode(value: &Value) -> Encodable {
    match value {
        Value::Null => Encodable::Null,
        Value::Undefined => Encodable::Undefined,
        Value::Bool(b) => Encodable::Bool(*b),
        Value::Number(n) => Encodable::Number(*n),
        Value::BigInt(n) => Encodable::BigInt(*n),
        Value::Str(s) => Encodable::Str(s.clone()),
        Value::Date(d) => Encodable::Date(*d),
        Value::Regex { pattern, flags } => Encodable::Regex {
            pattern: pattern.clone(),
            flags: flags.clone(),
        },
        Value::Bytes { kind, data } => Encodable::Bytes {
            kind: *kind,
            data: data.clone(),
        },
        Value::Error { name, message, stack } => Encodable::Error {
            name: name.clone(),
            message: message.clone(),
            stack: stack.clone(),
        },
        Value::Array(items) => Encodable::array(items.iter().map(decode).collect()),
        Value::Set(items) => Encodable::Set(Rc::new(RefCell::new(items.iter().map(decode).collect()))),
        Value::Object(fields) => {
            Encodable::object(fields.iter().map(|(k, v)| (k.clone(), decode(v))).collect())
        }
        Value::Map(pairs) => Encodable::Map(Rc::new(RefCell::new(
            pairs.iter().map(|(k, v)| (decode(k), decode(v))).collect(),
        ))),
    }
}
