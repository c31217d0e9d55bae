//! Object builtins

use std::rc::Rc;

use crate::error::Result;
use crate::eval::Interpreter;
use crate::value::{ObjectValue, Value};

use super::{flag, function, names_value, object, string};

pub(super) fn object_fields(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(names_value(object("objectFields", "o", &args[0])?.field_names(false)))
}

pub(super) fn object_fields_all(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(names_value(object("objectFieldsAll", "o", &args[0])?.field_names(true)))
}

pub(super) fn object_fields_ex(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("objectFieldsEx", "obj", &args[0])?;
    let hidden = flag("objectFieldsEx", "hidden", &args[1], false)?;
    Ok(names_value(obj.field_names(hidden)))
}

fn has(obj: &ObjectValue, name: &str, include_hidden: bool) -> bool {
    obj.has_field(name) && (include_hidden || !obj.is_hidden(name))
}

pub(super) fn object_has(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("objectHas", "o", &args[0])?;
    let name = string("objectHas", "f", &args[1])?;
    Ok(Value::Bool(has(obj, name, false)))
}

pub(super) fn object_has_all(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("objectHasAll", "o", &args[0])?;
    let name = string("objectHasAll", "f", &args[1])?;
    Ok(Value::Bool(has(obj, name, true)))
}

pub(super) fn object_has_ex(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("objectHasEx", "obj", &args[0])?;
    let name = string("objectHasEx", "fname", &args[1])?;
    let hidden = flag("objectHasEx", "hidden", &args[2], false)?;
    Ok(Value::Bool(has(obj, name, hidden)))
}

/// Field values in field-name order
pub(super) fn entries(
    interp: &Interpreter,
    obj: &ObjectValue,
    include_hidden: bool,
) -> Result<Vec<(Rc<str>, Value)>> {
    obj.field_names(include_hidden)
        .into_iter()
        .map(|name| {
            let value = interp.object_field(obj, &name)?.unwrap_or(Value::Null);
            Ok((name, value))
        })
        .collect()
}

fn values(interp: &Interpreter, func: &str, v: &Value, include_hidden: bool) -> Result<Value> {
    let obj = object(func, "o", v)?;
    let out = entries(interp, obj, include_hidden)?
        .into_iter()
        .map(|(_, value)| value)
        .collect();
    Ok(Value::array(out))
}

pub(super) fn object_values(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    values(interp, "objectValues", &args[0], false)
}

pub(super) fn object_values_all(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    values(interp, "objectValuesAll", &args[0], true)
}

fn key_values(interp: &Interpreter, func: &str, v: &Value, include_hidden: bool) -> Result<Value> {
    let obj = object(func, "o", v)?;
    let out = entries(interp, obj, include_hidden)?
        .into_iter()
        .map(|(name, value)| {
            interp.object_from_values(vec![
                (Rc::from("key"), Value::Str(name)),
                (Rc::from("value"), value),
            ])
        })
        .collect();
    Ok(Value::array(out))
}

pub(super) fn object_keys_values(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    key_values(interp, "objectKeysValues", &args[0], false)
}

pub(super) fn object_keys_values_all(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    key_values(interp, "objectKeysValuesAll", &args[0], true)
}

pub(super) fn object_remove_key(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("objectRemoveKey", "obj", &args[0])?;
    let key = string("objectRemoveKey", "key", &args[1])?;
    let kept = entries(interp, obj, false)?
        .into_iter()
        .filter(|(name, _)| name != key)
        .collect();
    Ok(interp.object_from_values(kept))
}

pub(super) fn map_with_key(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("mapWithKey", "func", &args[0])?;
    let obj = object("mapWithKey", "obj", &args[1])?;
    let mapped = entries(interp, obj, false)?
        .into_iter()
        .map(|(name, value)| {
            let out = interp.call_value(&args[0], vec![Value::Str(name.clone()), value])?;
            Ok((name, out))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(interp.object_from_values(mapped))
}

pub(super) fn merge_patch(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    merge_patch_values(interp, &args[0], &args[1])
}

fn merge_patch_values(interp: &Interpreter, target: &Value, patch: &Value) -> Result<Value> {
    let _guard = interp.enter()?;
    let Value::Object(patch) = patch else {
        return Ok(patch.clone());
    };
    let mut merged: Vec<(Rc<str>, Value)> = Vec::new();
    if let Value::Object(target) = target {
        for (name, value) in entries(interp, target, false)? {
            if !patch.has_field(&name) {
                merged.push((name, value));
            }
        }
    }
    for (name, value) in entries(interp, patch, false)? {
        if matches!(value, Value::Null) {
            continue;
        }
        let base = match target {
            Value::Object(target) if has(target, &name, false) => {
                interp.object_field(target, &name)?.unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };
        merged.push((name, merge_patch_values(interp, &base, &value)?));
    }
    Ok(interp.object_from_values(merged))
}

fn is_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(obj) => !obj.field_names(false).is_empty(),
        _ => true,
    }
}

fn prune_value(interp: &Interpreter, value: Value) -> Result<Value> {
    let _guard = interp.enter()?;
    match value {
        Value::Array(items) => {
            let mut out = Vec::new();
            for thunk in items.iter() {
                let item = prune_value(interp, interp.force(thunk)?)?;
                if is_content(&item) {
                    out.push(item);
                }
            }
            Ok(Value::array(out))
        }
        Value::Object(obj) => {
            let mut out = Vec::new();
            for (name, item) in entries(interp, &obj, false)? {
                let item = prune_value(interp, item)?;
                if is_content(&item) {
                    out.push((name, item));
                }
            }
            Ok(interp.object_from_values(out))
        }
        other => Ok(other),
    }
}

pub(super) fn prune(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    prune_value(interp, args[0].clone())
}

pub(super) fn get(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let obj = object("get", "o", &args[0])?;
    let name = string("get", "f", &args[1])?;
    let include_hidden = flag("get", "inc_hidden", &args[3], true)?;
    if !has(obj, name, include_hidden) {
        return Ok(args[2].clone());
    }
    Ok(interp.object_field(obj, name)?.unwrap_or(Value::Null))
}
