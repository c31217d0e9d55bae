//! Array builtins, including the sorted-set family

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::value::{Thunk, Value};

use super::{array, forced, function, int, key_of, keys, num, string, type_error};

fn length_arg(interp: &Interpreter, func: &str, param: &str, v: &Value) -> Result<usize> {
    let n = int(func, param, v)?;
    if n < 0 {
        return Err(runtime(format!("std.{}: {} must be non-negative, got {}", func, param, n)));
    }
    let len = usize::try_from(n).unwrap_or(usize::MAX);
    interp.check_array_len(len)?;
    Ok(len)
}

pub(super) fn make_array(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let size = length_arg(interp, "makeArray", "sz", &args[0])?;
    function("makeArray", "func", &args[1])?;
    let mut out = Vec::new();
    for i in 0..size {
        interp.tick()?;
        out.push(interp.call_value(&args[1], vec![Value::Number(i as f64)])?);
    }
    Ok(Value::array(out))
}

pub(super) fn range(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let from = int("range", "from", &args[0])?;
    let to = int("range", "to", &args[1])?;
    let len = (i128::from(to) - i128::from(from) + 1).max(0);
    interp.check_array_len(usize::try_from(len).unwrap_or(usize::MAX))?;
    let mut out = Vec::new();
    for i in from..=to {
        interp.tick()?;
        out.push(Value::Number(i as f64));
    }
    Ok(Value::array(out))
}

pub(super) fn repeat(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let count = int("repeat", "count", &args[1])?;
    if count < 0 {
        return Err(runtime(format!("std.repeat: count must be non-negative, got {}", count)));
    }
    let count = usize::try_from(count).unwrap_or(usize::MAX);
    match &args[0] {
        Value::Str(s) => {
            interp.check_string_len(s.len().saturating_mul(count))?;
            interp.charge(count as u64)?;
            interp.string(s.repeat(count))
        }
        Value::Array(items) => {
            interp.check_array_len(items.len().saturating_mul(count))?;
            interp.charge(count as u64)?;
            let mut out = Vec::new();
            for _ in 0..count {
                out.extend(items.iter().cloned());
            }
            Ok(Value::Array(Rc::new(out)))
        }
        other => Err(type_error("repeat", "what", "a string or array", other)),
    }
}

pub(super) fn slice(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let bound = |param: &str, v: &Value| match v {
        Value::Null => Ok(None),
        other => int("slice", param, other).map(Some),
    };
    interp.slice(
        &args[0],
        bound("index", &args[1])?,
        bound("end", &args[2])?,
        bound("step", &args[3])?,
    )
}

/// Strings are treated as arrays of one-character strings
fn elements(interp: &Interpreter, func: &str, v: &Value) -> Result<Vec<Value>> {
    match v {
        Value::Str(s) => Ok(s.chars().map(|c| Value::string(String::from(c))).collect()),
        other => forced(interp, array(func, "arr", other)?),
    }
}

pub(super) fn map(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("map", "func", &args[0])?;
    let out = elements(interp, "map", &args[1])?
        .into_iter()
        .map(|item| interp.call_value(&args[0], vec![item]))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::array(out))
}

pub(super) fn map_with_index(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("mapWithIndex", "func", &args[0])?;
    let out = elements(interp, "mapWithIndex", &args[1])?
        .into_iter()
        .enumerate()
        .map(|(i, item)| interp.call_value(&args[0], vec![Value::Number(i as f64), item]))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::array(out))
}

fn keep(interp: &Interpreter, func: &str, pred: &Value, item: Value) -> Result<bool> {
    match interp.call_value(pred, vec![item])? {
        Value::Bool(b) => Ok(b),
        other => Err(type_error(func, "filter function result", "a boolean", &other)),
    }
}

pub(super) fn filter(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("filter", "func", &args[0])?;
    let items = array("filter", "arr", &args[1])?;
    let mut out = Vec::new();
    for thunk in items.iter() {
        if keep(interp, "filter", &args[0], interp.force(thunk)?)? {
            out.push(thunk.clone());
        }
    }
    Ok(Value::Array(Rc::new(out)))
}

pub(super) fn filter_map(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("filterMap", "filter_func", &args[0])?;
    function("filterMap", "map_func", &args[1])?;
    let mut out = Vec::new();
    for item in forced(interp, array("filterMap", "arr", &args[2])?)? {
        if keep(interp, "filterMap", &args[0], item.clone())? {
            out.push(interp.call_value(&args[1], vec![item])?);
        }
    }
    Ok(Value::array(out))
}

pub(super) fn flat_map(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("flatMap", "func", &args[0])?;
    match &args[1] {
        Value::Str(s) => {
            let mut out = String::new();
            for c in s.chars() {
                let part = interp.call_value(&args[0], vec![Value::string(String::from(c))])?;
                let part = string("flatMap", "func result", &part)?;
                interp.check_string_len(out.len() + part.len())?;
                out.push_str(part);
            }
            interp.string(out)
        }
        other => {
            let mut out: Vec<Thunk> = Vec::new();
            for item in forced(interp, array("flatMap", "arr", other)?)? {
                match interp.call_value(&args[0], vec![item])? {
                    Value::Array(part) => {
                        interp.check_array_len(out.len() + part.len())?;
                        out.extend(part.iter().cloned());
                    }
                    Value::Null => {}
                    other => return Err(type_error("flatMap", "func result", "an array", &other)),
                }
            }
            Ok(Value::Array(Rc::new(out)))
        }
    }
}

pub(super) fn foldl(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("foldl", "func", &args[0])?;
    let mut acc = args[2].clone();
    for item in elements(interp, "foldl", &args[1])? {
        acc = interp.call_value(&args[0], vec![acc, item])?;
    }
    Ok(acc)
}

pub(super) fn foldr(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    function("foldr", "func", &args[0])?;
    let mut acc = args[2].clone();
    for item in elements(interp, "foldr", &args[1])?.into_iter().rev() {
        acc = interp.call_value(&args[0], vec![item, acc])?;
    }
    Ok(acc)
}

fn join_values(interp: &Interpreter, sep: &Value, items: Vec<Value>) -> Result<Value> {
    match sep {
        Value::Str(sep) => {
            let mut out = String::new();
            let mut first = true;
            for item in items {
                match item {
                    Value::Null => continue,
                    Value::Str(s) => {
                        if !first {
                            out.push_str(sep);
                        }
                        interp.check_string_len(out.len() + s.len())?;
                        out.push_str(&s);
                        first = false;
                    }
                    other => return Err(type_error("join", "arr elements", "strings", &other)),
                }
            }
            interp.string(out)
        }
        Value::Array(sep) => {
            let mut out = Vec::new();
            let mut first = true;
            for item in items {
                match item {
                    Value::Null => continue,
                    Value::Array(part) => {
                        if !first {
                            out.extend(sep.iter().cloned());
                        }
                        interp.check_array_len(out.len() + part.len())?;
                        out.extend(part.iter().cloned());
                        first = false;
                    }
                    other => return Err(type_error("join", "arr elements", "arrays", &other)),
                }
            }
            Ok(Value::Array(Rc::new(out)))
        }
        other => Err(type_error("join", "sep", "a string or array", other)),
    }
}

pub(super) fn join(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = forced(interp, array("join", "arr", &args[1])?)?;
    join_values(interp, &args[0], items)
}

pub(super) fn deep_join(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let _guard = interp.enter()?;
    match &args[0] {
        Value::Str(_) => Ok(args[0].clone()),
        Value::Array(items) => {
            let parts = forced(interp, items)?
                .into_iter()
                .map(|item| deep_join(interp, &[item]))
                .collect::<Result<Vec<_>>>()?;
            join_values(interp, &Value::string(""), parts)
        }
        other => Err(type_error("deepJoin", "arr", "a string or array", other)),
    }
}

pub(super) fn lines(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let mut items = forced(interp, array("lines", "arr", &args[0])?)?;
    items.push(Value::string(""));
    join_values(interp, &Value::string("\n"), items)
}

pub(super) fn flatten_arrays(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let mut out = Vec::new();
    for item in forced(interp, array("flattenArrays", "arrs", &args[0])?)? {
        match item {
            Value::Array(part) => {
                interp.check_array_len(out.len() + part.len())?;
                out.extend(part.iter().cloned());
            }
            Value::Null => {}
            other => return Err(type_error("flattenArrays", "arrs elements", "arrays", &other)),
        }
    }
    Ok(Value::Array(Rc::new(out)))
}

fn flatten_deep(interp: &Interpreter, value: Value, out: &mut Vec<Value>) -> Result<()> {
    let _guard = interp.enter()?;
    match value {
        Value::Array(items) => {
            for item in forced(interp, &items)? {
                flatten_deep(interp, item, out)?;
            }
        }
        other => {
            interp.check_array_len(out.len() + 1)?;
            out.push(other);
        }
    }
    Ok(())
}

pub(super) fn flatten_deep_array(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let mut out = Vec::new();
    flatten_deep(interp, args[0].clone(), &mut out)?;
    Ok(Value::array(out))
}

pub(super) fn reverse(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = array("reverse", "arr", &args[0])?;
    Ok(Value::Array(Rc::new(items.iter().rev().cloned().collect())))
}

/// Stable sort of `items` by their keys; comparison errors abort the sort
fn sorted(interp: &Interpreter, items: Vec<Value>, key_f: &Value) -> Result<Vec<(Value, Value)>> {
    let keys = keys(interp, &items, key_f)?;
    let mut pairs: Vec<(Value, Value)> = items.into_iter().zip(keys).collect();
    let mut failure = None;
    pairs.sort_by(|a, b| match interp.compare(&a.1, &b.1) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(pairs),
    }
}

fn dedup(interp: &Interpreter, pairs: Vec<(Value, Value)>) -> Result<Vec<(Value, Value)>> {
    let mut out: Vec<(Value, Value)> = Vec::new();
    for pair in pairs {
        if let Some(prev) = out.last() {
            if interp.equals(&prev.1, &pair.1)? {
                continue;
            }
        }
        out.push(pair);
    }
    Ok(out)
}

fn firsts(pairs: Vec<(Value, Value)>) -> Value {
    Value::array(pairs.into_iter().map(|(item, _)| item).collect())
}

pub(super) fn sort(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = forced(interp, array("sort", "arr", &args[0])?)?;
    Ok(firsts(sorted(interp, items, &args[1])?))
}

pub(super) fn uniq(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = forced(interp, array("uniq", "arr", &args[0])?)?;
    let pairs = keys(interp, &items, &args[1])?;
    Ok(firsts(dedup(interp, items.into_iter().zip(pairs).collect())?))
}

pub(super) fn set(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = forced(interp, array("set", "arr", &args[0])?)?;
    Ok(firsts(dedup(interp, sorted(interp, items, &args[1])?)?))
}

pub(super) fn set_member(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let needle = key_of(interp, &args[0], &args[2])?;
    let items = array("setMember", "arr", &args[1])?;
    let (mut lo, mut hi) = (0, items.len());
    while lo < hi {
        interp.tick()?;
        let mid = lo + (hi - lo) / 2;
        let key = key_of(interp, &interp.force(&items[mid])?, &args[2])?;
        match interp.compare(&key, &needle)? {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Ok(Value::Bool(true)),
        }
    }
    Ok(Value::Bool(false))
}

enum SetOp {
    Union,
    Inter,
    Diff,
}

/// Merge two sets already ordered by `key_f`
fn merge_sets(interp: &Interpreter, func: &str, args: &[Value], op: SetOp) -> Result<Value> {
    let a = forced(interp, array(func, "a", &args[0])?)?;
    let b = forced(interp, array(func, "b", &args[1])?)?;
    let a_keys = keys(interp, &a, &args[2])?;
    let b_keys = keys(interp, &b, &args[2])?;
    let (mut i, mut j) = (0, 0);
    let mut out = Vec::new();
    while i < a.len() && j < b.len() {
        interp.tick()?;
        match interp.compare(&a_keys[i], &b_keys[j])? {
            Ordering::Less => {
                if !matches!(op, SetOp::Inter) {
                    out.push(a[i].clone());
                }
                i += 1;
            }
            Ordering::Greater => {
                if matches!(op, SetOp::Union) {
                    out.push(b[j].clone());
                }
                j += 1;
            }
            Ordering::Equal => {
                if !matches!(op, SetOp::Diff) {
                    out.push(a[i].clone());
                }
                i += 1;
                j += 1;
            }
        }
    }
    if !matches!(op, SetOp::Inter) {
        out.extend(a[i..].iter().cloned());
    }
    if matches!(op, SetOp::Union) {
        out.extend(b[j..].iter().cloned());
    }
    Ok(Value::array(out))
}

pub(super) fn set_union(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    merge_sets(interp, "setUnion", args, SetOp::Union)
}

pub(super) fn set_inter(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    merge_sets(interp, "setInter", args, SetOp::Inter)
}

pub(super) fn set_diff(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    merge_sets(interp, "setDiff", args, SetOp::Diff)
}

fn positions(interp: &Interpreter, func: &str, arr: &Value, x: &Value) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for (i, item) in forced(interp, array(func, "arr", arr)?)?.iter().enumerate() {
        if interp.equals(item, x)? {
            out.push(i);
        }
    }
    Ok(out)
}

pub(super) fn member(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    if let Value::Str(s) = &args[0] {
        let needle = string("member", "x", &args[1])?;
        return Ok(Value::Bool(!needle.is_empty() && s.contains(&**needle)));
    }
    Ok(Value::Bool(!positions(interp, "member", &args[0], &args[1])?.is_empty()))
}

pub(super) fn count(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(positions(interp, "count", &args[0], &args[1])?.len() as f64))
}

pub(super) fn find(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let found = positions(interp, "find", &args[1], &args[0])?;
    Ok(Value::array(found.into_iter().map(|i| Value::Number(i as f64)).collect()))
}

pub(super) fn contains(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    for item in forced(interp, array("contains", "arr", &args[0])?)? {
        if interp.equals(&item, &args[1])? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

fn without(items: &[Thunk], idx: usize) -> Value {
    let out = items
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, t)| t.clone())
        .collect();
    Value::Array(Rc::new(out))
}

pub(super) fn remove(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = array("remove", "arr", &args[0])?;
    for (i, thunk) in items.iter().enumerate() {
        if interp.equals(&interp.force(thunk)?, &args[1])? {
            return Ok(without(items, i));
        }
    }
    Ok(args[0].clone())
}

pub(super) fn remove_at(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let items = array("removeAt", "arr", &args[0])?;
    let idx = int("removeAt", "idx", &args[1])?;
    Ok(match usize::try_from(idx) {
        Ok(idx) => without(items, idx),
        Err(_) => args[0].clone(),
    })
}

fn booleans(interp: &Interpreter, func: &str, v: &Value) -> Result<Vec<bool>> {
    forced(interp, array(func, "arr", v)?)?
        .into_iter()
        .map(|item| match item {
            Value::Bool(b) => Ok(b),
            other => Err(type_error(func, "arr elements", "booleans", &other)),
        })
        .collect()
}

pub(super) fn all(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(booleans(interp, "all", &args[0])?.into_iter().all(|b| b)))
}

pub(super) fn any(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(booleans(interp, "any", &args[0])?.into_iter().any(|b| b)))
}

fn numbers(interp: &Interpreter, func: &str, v: &Value) -> Result<Vec<f64>> {
    forced(interp, array(func, "arr", v)?)?
        .iter()
        .map(|item| num(func, "arr elements", item))
        .collect()
}

pub(super) fn sum(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(numbers(interp, "sum", &args[0])?.into_iter().sum()))
}

pub(super) fn avg(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let values = numbers(interp, "avg", &args[0])?;
    if values.is_empty() {
        return Err(runtime("std.avg: cannot calculate average of an empty array"));
    }
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

fn extreme(interp: &Interpreter, func: &str, args: &[Value], want: Ordering) -> Result<Value> {
    let items = forced(interp, array(func, "arr", &args[0])?)?;
    let mut best: Option<(Value, Value)> = None;
    for item in items {
        let key = key_of(interp, &item, &args[1])?;
        let better = match &best {
            None => true,
            Some((_, best_key)) => interp.compare(&key, best_key)? == want,
        };
        if better {
            best = Some((item, key));
        }
    }
    match (best, &args[2]) {
        (Some((item, _)), _) => Ok(item),
        (None, Value::Null) => Err(runtime(format!(
            "std.{}: expected at least one element in array, got none",
            func
        ))),
        (None, on_empty) => Ok(on_empty.clone()),
    }
}

pub(super) fn min_array(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    extreme(interp, "minArray", args, Ordering::Less)
}

pub(super) fn max_array(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    extreme(interp, "maxArray", args, Ordering::Greater)
}
