//! Type inspection and the odd builtins that don't fit elsewhere

use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::manifest;
use crate::value::Value;

use super::string;

pub(super) fn length(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Object(obj) => obj.field_names(false).len(),
        Value::Function(f) => f.arity(),
        other => {
            return Err(runtime(format!(
                "std.length: can't take the length of {}",
                other.type_name()
            )))
        }
    };
    Ok(Value::Number(len as f64))
}

pub(super) fn type_of(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(args[0].type_name()))
}

pub(super) fn to_string(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = interp.to_display_string(&args[0])?;
    interp.string(s)
}

pub(super) fn is_string(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Str(_))))
}

pub(super) fn is_number(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Number(_))))
}

pub(super) fn is_boolean(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Bool(_))))
}

pub(super) fn is_object(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Object(_))))
}

pub(super) fn is_array(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Array(_))))
}

pub(super) fn is_function(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(matches!(args[0], Value::Function(_))))
}

/// Equality restricted to primitives; values of different types are unequal
pub(super) fn primitive_equals(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let equal = match (&args[0], &args[1]) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (a, b) if a.type_name() != b.type_name() => false,
        (a, _) => {
            return Err(runtime(format!(
                "std.primitiveEquals: cannot compare values of type {}",
                a.type_name()
            )))
        }
    };
    Ok(Value::Bool(equal))
}

pub(super) fn equals(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(interp.equals(&args[0], &args[1])?))
}

pub(super) fn assert_equal(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    if interp.equals(&args[0], &args[1])? {
        return Ok(Value::Bool(true));
    }
    Err(runtime(format!(
        "assertion failed: {} != {}",
        manifest::inline(interp, &args[0])?,
        manifest::inline(interp, &args[1])?
    )))
}

/// Log a message and pass `rest` through
pub(super) fn trace(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let message = string("trace", "str", &args[0])?;
    tracing::info!(target: "jsonnet", text = %message, "std.trace");
    Ok(args[1].clone())
}

pub(super) fn ext_var(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let name = match &args[0] {
        Value::Str(s) => s.to_string(),
        other => other.type_name().to_string(),
    };
    Err(runtime(format!(
        "std.extVar: external variables are not available (requested {})",
        name
    )))
}

/// No native extensions are registered
pub(super) fn native(_: &Interpreter, args: &[Value]) -> Result<Value> {
    string("native", "x", &args[0])?;
    Ok(Value::Null)
}
