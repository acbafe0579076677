//! Inline-source call targets.
//!
//! Rust has no runtime `eval`, so a caller that never registered its
//! function up front is served by embedding a small scripting engine in the
//! worker rather than trying to serialize a closure. `rhai` is used because
//! it's a lightweight, pure-Rust engine meant for exactly this kind of
//! sandboxed-expression-evaluation niche (see DESIGN.md).
//!
//! Only the scalar and array/object kinds of [`Value`] round-trip through
//! `rhai`'s `Dynamic`; `Map`/`Set`/`Regex`/`Date`/typed-array values are
//! rejected up front with `GoroutineError::InvalidArgument` rather than
//! silently coerced, since `rhai` has no native representation for them.

use rhai::{Dynamic, Engine, Scope};

use crate::codec::Value;
use crate::error::GoroutineError;

fn value_to_dynamic(value: &Value) -> Result<Dynamic, GoroutineError> {
    Ok(match value {
        Value::Null | Value::Undefined => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => Dynamic::from(*n),
        Value::BigInt(n) => Dynamic::from(*n as i64),
        Value::Str(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let mut arr = rhai::Array::new();
            for item in items {
                arr.push(value_to_dynamic(item)?);
            }
            Dynamic::from_array(arr)
        }
        Value::Object(fields) => {
            let mut map = rhai::Map::new();
            for (k, v) in fields {
                map.insert(k.as_str().into(), value_to_dynamic(v)?);
            }
            Dynamic::from_map(map)
        }
        other => {
            return Err(GoroutineError::InvalidArgument(format!(
                "inline call targets cannot accept a {other:?} argument"
            )))
        }
    })
}

fn dynamic_to_value(dynamic: Dynamic) -> Value {
    if dynamic.is_unit() {
        return Value::Undefined;
    }
    if let Some(b) = dynamic.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(n) = dynamic.clone().try_cast::<i64>() {
        return Value::Number(n as f64);
    }
    if let Some(n) = dynamic.clone().try_cast::<f64>() {
        return Value::Number(n);
    }
    if let Some(s) = dynamic.clone().try_cast::<String>() {
        return Value::Str(s);
    }
    if let Some(s) = dynamic.clone().try_cast::<rhai::ImmutableString>() {
        return Value::Str(s.to_string());
    }
    if let Some(arr) = dynamic.clone().try_cast::<rhai::Array>() {
        return Value::Array(arr.into_iter().map(dynamic_to_value).collect());
    }
    if let Some(map) = dynamic.try_cast::<rhai::Map>() {
        return Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_string(), dynamic_to_value(v)))
                .collect(),
        );
    }
    Value::Undefined
}

/// Evaluate `source` with `args` bound as `a0`, `a1`, ... in scope, returning
/// the script's final expression value.
pub fn eval_inline(source: &str, args: &[Value]) -> Result<Value, GoroutineError> {
    let engine = Engine::new();
    let mut scope = Scope::new();
    for (i, arg) in args.iter().enumerate() {
        scope.push(format!("a{i}"), value_to_dynamic(arg)?);
    }
    let result = engine
        .eval_with_scope::<Dynamic>(&mut scope, source)
        .map_err(|e| GoroutineError::User(e.to_string()))?;
    Ok(dynamic_to_value(result))
}
