// Scalar coercion registry for the Tabula shape engine
//
// Every cast from a raw value to a declared scalar type goes through the
// functions in this module, one per target type, each with defined
// failure conditions. Null passes through uncast so optional values can
// coexist with the required-field check performed after construction.

use log::trace;

use crate::blueprint::value::{ScalarType, Value};
use crate::internal::error::{Error, Result};

/// Casts `value` to `target`, returning the normalized value.
///
/// A value already satisfying the target type is kept as-is; `Null` is
/// never cast. A failing cast reports the field's fullname, the offending
/// value and the target type.
pub fn cast_scalar(target: ScalarType, value: Value, fullname: &str) -> Result<Value> {
    if value.is_null() {
        return Ok(value);
    }
    if target.matches(&value) {
        return Ok(value);
    }
    let casted = match target {
        ScalarType::Bool => cast_bool(&value),
        ScalarType::Int => cast_int(&value),
        ScalarType::Float => cast_float(&value),
        ScalarType::Str => cast_str(&value),
    };
    match casted {
        Some(cleaned) => {
            trace!("cast {} value to {}", fullname, target.name());
            Ok(cleaned)
        }
        None => Err(Error::CastFailure(format!(
            "cannot cast value {:?} of {} to type {}",
            value,
            fullname,
            target.name()
        ))),
    }
}

/// Bool accepts numeric zero/non-zero and the string literals
/// "true"/"false" (case-insensitive). Anything else fails.
fn cast_bool(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Bool(*i != 0)),
        Value::Float(f) => Some(Value::Bool(*f != 0.0)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

/// Int accepts floats (truncating), bools and integer string literals.
fn cast_int(value: &Value) -> Option<Value> {
    match value {
        Value::Float(f) => Some(Value::Int(*f as i64)),
        Value::Bool(b) => Some(Value::Int(i64::from(*b))),
        Value::Str(s) => s.trim().parse::<i64>().ok().map(Value::Int),
        _ => None,
    }
}

/// Float accepts ints, bools and float string literals.
fn cast_float(value: &Value) -> Option<Value> {
    match value {
        Value::Int(i) => Some(Value::Float(*i as f64)),
        Value::Bool(b) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
        Value::Str(s) => s.trim().parse::<f64>().ok().map(Value::Float),
        _ => None,
    }
}

/// Str accepts the display rendering of any scalar. Containers and
/// records never stringify implicitly.
fn cast_str(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Str(b.to_string())),
        Value::Int(i) => Some(Value::Str(i.to_string())),
        Value::Float(f) => Some(Value::Str(f.to_string())),
        _ => None,
    }
}
