//! The `std` object
//!
//! Every builtin is a native function over forced arguments. Parameters
//! left out by the caller arrive as `null`, so functions with non-null
//! defaults resolve them here rather than in the call machinery.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::Visibility;
use crate::error::{runtime, JsonnetError, Result};
use crate::eval::Interpreter;
use crate::value::{Env, FieldBody, Frame, Function, Layer, LayerField, ObjectValue, Thunk, Value};

mod arrays;
mod encoding;
mod math;
mod objects;
mod serialize;
mod strings;
mod types;

type BuiltinFn = fn(&Interpreter, &[Value]) -> Result<Value>;

/// A native function exposed as a field of `std`
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub params: &'static [&'static str],
    /// Leading parameters that must be supplied; the rest default to null
    pub required: usize,
    pub imp: BuiltinFn,
}

macro_rules! builtin {
    ($name:literal, [$($param:literal),*], $required:expr, $imp:expr) => {
        Builtin {
            name: $name,
            params: &[$($param),*],
            required: $required,
            imp: $imp,
        }
    };
}

const BUILTINS: &[Builtin] = &[
    // Types and reflection
    builtin!("length", ["x"], 1, types::length),
    builtin!("type", ["x"], 1, types::type_of),
    builtin!("toString", ["a"], 1, types::to_string),
    builtin!("isString", ["v"], 1, types::is_string),
    builtin!("isNumber", ["v"], 1, types::is_number),
    builtin!("isBoolean", ["v"], 1, types::is_boolean),
    builtin!("isObject", ["v"], 1, types::is_object),
    builtin!("isArray", ["v"], 1, types::is_array),
    builtin!("isFunction", ["v"], 1, types::is_function),
    builtin!("primitiveEquals", ["x", "y"], 2, types::primitive_equals),
    builtin!("equals", ["x", "y"], 2, types::equals),
    builtin!("assertEqual", ["a", "b"], 2, types::assert_equal),
    builtin!("trace", ["str", "rest"], 2, types::trace),
    builtin!("extVar", ["x"], 1, types::ext_var),
    builtin!("native", ["x"], 1, types::native),
    // Arrays
    builtin!("makeArray", ["sz", "func"], 2, arrays::make_array),
    builtin!("range", ["from", "to"], 2, arrays::range),
    builtin!("repeat", ["what", "count"], 2, arrays::repeat),
    builtin!("slice", ["indexable", "index", "end", "step"], 4, arrays::slice),
    builtin!("map", ["func", "arr"], 2, arrays::map),
    builtin!("mapWithIndex", ["func", "arr"], 2, arrays::map_with_index),
    builtin!("filter", ["func", "arr"], 2, arrays::filter),
    builtin!("filterMap", ["filter_func", "map_func", "arr"], 3, arrays::filter_map),
    builtin!("flatMap", ["func", "arr"], 2, arrays::flat_map),
    builtin!("foldl", ["func", "arr", "init"], 3, arrays::foldl),
    builtin!("foldr", ["func", "arr", "init"], 3, arrays::foldr),
    builtin!("join", ["sep", "arr"], 2, arrays::join),
    builtin!("deepJoin", ["arr"], 1, arrays::deep_join),
    builtin!("lines", ["arr"], 1, arrays::lines),
    builtin!("flattenArrays", ["arrs"], 1, arrays::flatten_arrays),
    builtin!("flattenDeepArray", ["value"], 1, arrays::flatten_deep_array),
    builtin!("reverse", ["arr"], 1, arrays::reverse),
    builtin!("sort", ["arr", "keyF"], 1, arrays::sort),
    builtin!("uniq", ["arr", "keyF"], 1, arrays::uniq),
    builtin!("set", ["arr", "keyF"], 1, arrays::set),
    builtin!("setMember", ["x", "arr", "keyF"], 2, arrays::set_member),
    builtin!("setUnion", ["a", "b", "keyF"], 2, arrays::set_union),
    builtin!("setInter", ["a", "b", "keyF"], 2, arrays::set_inter),
    builtin!("setDiff", ["a", "b", "keyF"], 2, arrays::set_diff),
    builtin!("member", ["arr", "x"], 2, arrays::member),
    builtin!("count", ["arr", "x"], 2, arrays::count),
    builtin!("find", ["value", "arr"], 2, arrays::find),
    builtin!("contains", ["arr", "elem"], 2, arrays::contains),
    builtin!("remove", ["arr", "elem"], 2, arrays::remove),
    builtin!("removeAt", ["arr", "idx"], 2, arrays::remove_at),
    builtin!("all", ["arr"], 1, arrays::all),
    builtin!("any", ["arr"], 1, arrays::any),
    builtin!("sum", ["arr"], 1, arrays::sum),
    builtin!("avg", ["arr"], 1, arrays::avg),
    builtin!("minArray", ["arr", "keyF", "onEmpty"], 1, arrays::min_array),
    builtin!("maxArray", ["arr", "keyF", "onEmpty"], 1, arrays::max_array),
    // Objects
    builtin!("objectFields", ["o"], 1, objects::object_fields),
    builtin!("objectFieldsAll", ["o"], 1, objects::object_fields_all),
    builtin!("objectFieldsEx", ["obj", "hidden"], 2, objects::object_fields_ex),
    builtin!("objectHas", ["o", "f"], 2, objects::object_has),
    builtin!("objectHasAll", ["o", "f"], 2, objects::object_has_all),
    builtin!("objectHasEx", ["obj", "fname", "hidden"], 3, objects::object_has_ex),
    builtin!("objectValues", ["o"], 1, objects::object_values),
    builtin!("objectValuesAll", ["o"], 1, objects::object_values_all),
    builtin!("objectKeysValues", ["o"], 1, objects::object_keys_values),
    builtin!("objectKeysValuesAll", ["o"], 1, objects::object_keys_values_all),
    builtin!("objectRemoveKey", ["obj", "key"], 2, objects::object_remove_key),
    builtin!("mapWithKey", ["func", "obj"], 2, objects::map_with_key),
    builtin!("mergePatch", ["target", "patch"], 2, objects::merge_patch),
    builtin!("prune", ["a"], 1, objects::prune),
    builtin!("get", ["o", "f", "default", "inc_hidden"], 2, objects::get),
    // Math
    builtin!("abs", ["n"], 1, math::abs),
    builtin!("sign", ["n"], 1, math::sign),
    builtin!("max", ["a", "b"], 2, math::max),
    builtin!("min", ["a", "b"], 2, math::min),
    builtin!("clamp", ["x", "minVal", "maxVal"], 3, math::clamp),
    builtin!("pow", ["x", "n"], 2, math::pow),
    builtin!("exp", ["x"], 1, math::exp),
    builtin!("log", ["x"], 1, math::log),
    builtin!("log2", ["x"], 1, math::log2),
    builtin!("log10", ["x"], 1, math::log10),
    builtin!("exponent", ["x"], 1, math::exponent),
    builtin!("mantissa", ["x"], 1, math::mantissa),
    builtin!("floor", ["x"], 1, math::floor),
    builtin!("ceil", ["x"], 1, math::ceil),
    builtin!("round", ["x"], 1, math::round),
    builtin!("sqrt", ["x"], 1, math::sqrt),
    builtin!("hypot", ["a", "b"], 2, math::hypot),
    builtin!("sin", ["x"], 1, math::sin),
    builtin!("cos", ["x"], 1, math::cos),
    builtin!("tan", ["x"], 1, math::tan),
    builtin!("asin", ["x"], 1, math::asin),
    builtin!("acos", ["x"], 1, math::acos),
    builtin!("atan", ["x"], 1, math::atan),
    builtin!("atan2", ["y", "x"], 2, math::atan2),
    builtin!("deg2rad", ["x"], 1, math::deg2rad),
    builtin!("rad2deg", ["x"], 1, math::rad2deg),
    builtin!("mod", ["a", "b"], 2, math::mod_builtin),
    builtin!("modulo", ["x", "y"], 2, math::modulo),
    builtin!("isEven", ["x"], 1, math::is_even),
    builtin!("isOdd", ["x"], 1, math::is_odd),
    builtin!("isInteger", ["x"], 1, math::is_integer),
    builtin!("isDecimal", ["x"], 1, math::is_decimal),
    builtin!("xor", ["x", "y"], 2, math::xor),
    builtin!("xnor", ["x", "y"], 2, math::xnor),
    // Strings
    builtin!("codepoint", ["str"], 1, strings::codepoint),
    builtin!("char", ["n"], 1, strings::char_of),
    builtin!("substr", ["str", "from", "len"], 3, strings::substr),
    builtin!("findSubstr", ["pat", "str"], 2, strings::find_substr),
    builtin!("startsWith", ["a", "b"], 2, strings::starts_with),
    builtin!("endsWith", ["a", "b"], 2, strings::ends_with),
    builtin!("stripChars", ["str", "chars"], 2, strings::strip_chars),
    builtin!("lstripChars", ["str", "chars"], 2, strings::lstrip_chars),
    builtin!("rstripChars", ["str", "chars"], 2, strings::rstrip_chars),
    builtin!("trim", ["str"], 1, strings::trim),
    builtin!("split", ["str", "c"], 2, strings::split),
    builtin!("splitLimit", ["str", "c", "maxsplits"], 3, strings::split_limit),
    builtin!("splitLimitR", ["str", "c", "maxsplits"], 3, strings::split_limit_r),
    builtin!("strReplace", ["str", "from", "to"], 3, strings::str_replace),
    builtin!("asciiUpper", ["str"], 1, strings::ascii_upper),
    builtin!("asciiLower", ["str"], 1, strings::ascii_lower),
    builtin!("stringChars", ["str"], 1, strings::string_chars),
    builtin!("equalsIgnoreCase", ["str1", "str2"], 2, strings::equals_ignore_case),
    builtin!("isEmpty", ["str"], 1, strings::is_empty),
    builtin!("format", ["str", "vals"], 2, strings::format_builtin),
    builtin!("escapeStringJson", ["str"], 1, strings::escape_string_json),
    builtin!("escapeStringPython", ["str"], 1, strings::escape_string_json),
    builtin!("escapeStringBash", ["str"], 1, strings::escape_string_bash),
    builtin!("escapeStringDollars", ["str"], 1, strings::escape_string_dollars),
    builtin!("escapeStringXml", ["str"], 1, strings::escape_string_xml),
    builtin!("parseInt", ["str"], 1, strings::parse_int),
    builtin!("parseOctal", ["str"], 1, strings::parse_octal),
    builtin!("parseHex", ["str"], 1, strings::parse_hex),
    // Encodings and digests
    builtin!("encodeUTF8", ["str"], 1, encoding::encode_utf8),
    builtin!("decodeUTF8", ["arr"], 1, encoding::decode_utf8),
    builtin!("base64", ["input"], 1, encoding::base64_encode),
    builtin!("base64Decode", ["str"], 1, encoding::base64_decode),
    builtin!("base64DecodeBytes", ["str"], 1, encoding::base64_decode_bytes),
    builtin!("md5", ["s"], 1, encoding::md5),
    builtin!("sha1", ["s"], 1, encoding::sha1),
    builtin!("sha256", ["s"], 1, encoding::sha256),
    builtin!("sha512", ["s"], 1, encoding::sha512),
    builtin!("sha3", ["s"], 1, encoding::sha3),
    builtin!("parseJson", ["str"], 1, encoding::parse_json),
    builtin!("parseYaml", ["str"], 1, encoding::parse_yaml),
    // Manifestation
    builtin!("manifestJson", ["value"], 1, serialize::manifest_json),
    builtin!(
        "manifestJsonEx",
        ["value", "indent", "newline", "key_val_sep"],
        2,
        serialize::manifest_json_ex
    ),
    builtin!("manifestJsonMinified", ["value"], 1, serialize::manifest_json_minified),
    builtin!(
        "manifestYamlDoc",
        ["value", "indent_array_in_object", "quote_keys"],
        1,
        serialize::manifest_yaml_doc
    ),
    builtin!(
        "manifestYamlStream",
        ["value", "indent_array_in_object", "c_document_end", "quote_keys"],
        1,
        serialize::manifest_yaml_stream
    ),
    builtin!("manifestPython", ["v"], 1, serialize::manifest_python),
    builtin!("manifestPythonVars", ["conf"], 1, serialize::manifest_python_vars),
    builtin!("manifestIni", ["ini"], 1, serialize::manifest_ini),
    builtin!("manifestXmlJsonml", ["value"], 1, serialize::manifest_xml_jsonml),
    builtin!("manifestToml", ["value"], 1, serialize::manifest_toml),
    builtin!("manifestTomlEx", ["value", "indent"], 2, serialize::manifest_toml_ex),
];

/// Plain values exposed next to the functions
fn constants() -> Vec<(&'static str, Value)> {
    vec![
        ("pi", Value::Number(std::f64::consts::PI)),
        // Snippets have no file name
        ("thisFile", Value::string("")),
    ]
}

fn hidden(value: Value) -> LayerField {
    LayerField {
        visibility: Visibility::Hidden,
        plus: false,
        body: FieldBody::Value(value),
        env: None,
    }
}

/// Build `std`; every member is a hidden field
pub(crate) fn std_object(interp: &Interpreter) -> ObjectValue {
    let mut fields: HashMap<Rc<str>, LayerField> = BUILTINS
        .iter()
        .map(|b| {
            let func = Value::Function(Rc::new(Function::Builtin(*b)));
            (Rc::from(b.name), hidden(func))
        })
        .collect();
    for (name, value) in constants() {
        fields.insert(Rc::from(name), hidden(value));
    }
    let env: Env = interp.new_env(None, Frame::default());
    interp.new_object(vec![Rc::new(Layer {
        fields,
        locals: Rc::new(Vec::new()),
        asserts: Rc::new(Vec::new()),
        env,
        binds_dollar: false,
    })])
}

fn type_error(func: &str, param: &str, expected: &str, got: &Value) -> JsonnetError {
    runtime(format!(
        "std.{}: {} must be {}, got {}",
        func,
        param,
        expected,
        got.type_name()
    ))
}

fn num(func: &str, param: &str, v: &Value) -> Result<f64> {
    match v {
        Value::Number(n) => Ok(*n),
        other => Err(type_error(func, param, "a number", other)),
    }
}

fn int(func: &str, param: &str, v: &Value) -> Result<i64> {
    let n = num(func, param, v)?;
    if n.fract() != 0.0 {
        return Err(runtime(format!("std.{}: {} must be an integer, got {}", func, param, n)));
    }
    Ok(n as i64)
}

fn string<'a>(func: &str, param: &str, v: &'a Value) -> Result<&'a Rc<str>> {
    match v {
        Value::Str(s) => Ok(s),
        other => Err(type_error(func, param, "a string", other)),
    }
}

fn array<'a>(func: &str, param: &str, v: &'a Value) -> Result<&'a Rc<Vec<Thunk>>> {
    match v {
        Value::Array(items) => Ok(items),
        other => Err(type_error(func, param, "an array", other)),
    }
}

fn object<'a>(func: &str, param: &str, v: &'a Value) -> Result<&'a ObjectValue> {
    match v {
        Value::Object(obj) => Ok(obj),
        other => Err(type_error(func, param, "an object", other)),
    }
}

fn function(func: &str, param: &str, v: &Value) -> Result<()> {
    match v {
        Value::Function(_) => Ok(()),
        other => Err(type_error(func, param, "a function", other)),
    }
}

/// Optional boolean argument
fn flag(func: &str, param: &str, v: &Value, default: bool) -> Result<bool> {
    match v {
        Value::Null => Ok(default),
        Value::Bool(b) => Ok(*b),
        other => Err(type_error(func, param, "a boolean", other)),
    }
}

fn forced(interp: &Interpreter, items: &[Thunk]) -> Result<Vec<Value>> {
    items.iter().map(|t| interp.force(t)).collect()
}

/// Key of one element under an optional key function
fn key_of(interp: &Interpreter, item: &Value, key_f: &Value) -> Result<Value> {
    match key_f {
        Value::Null => Ok(item.clone()),
        f => interp.call_value(f, vec![item.clone()]),
    }
}

fn keys(interp: &Interpreter, items: &[Value], key_f: &Value) -> Result<Vec<Value>> {
    items.iter().map(|item| key_of(interp, item, key_f)).collect()
}

fn names_value(names: Vec<Rc<str>>) -> Value {
    Value::array(names.into_iter().map(Value::Str).collect())
}

fn finite(func: &str, n: f64) -> Result<Value> {
    if n.is_finite() {
        Ok(Value::Number(n))
    } else {
        Err(runtime(format!("std.{}: result is not a finite number", func)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_unique() {
        let mut names: Vec<&str> = BUILTINS.iter().map(|b| b.name).collect();
        names.extend(constants().into_iter().map(|(name, _)| name));
        names.sort_unstable();
        let before = names.len();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_required_never_exceeds_params() {
        for b in BUILTINS {
            assert!(b.required <= b.params.len(), "std.{}", b.name);
        }
    }

    #[test]
    fn test_flag_defaults_on_null() {
        assert!(flag("f", "p", &Value::Null, true).unwrap());
        assert!(!flag("f", "p", &Value::Bool(false), true).unwrap());
        assert!(flag("f", "p", &Value::Number(1.0), true).is_err());
    }
}
