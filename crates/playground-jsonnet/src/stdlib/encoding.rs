//! Byte encodings, digests and data-format parsing

use std::rc::Rc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use ::sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use ::sha3::Sha3_512;

use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::value::Value;

use super::{array, forced, int, string, type_error};

pub(super) fn encode_utf8(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("encodeUTF8", "str", &args[0])?;
    interp.check_array_len(s.len())?;
    Ok(bytes_value(s.as_bytes()))
}

fn bytes_value(bytes: &[u8]) -> Value {
    Value::array(bytes.iter().map(|b| Value::Number(f64::from(*b))).collect())
}

fn byte_array(interp: &Interpreter, func: &str, v: &Value) -> Result<Vec<u8>> {
    forced(interp, array(func, "arr", v)?)?
        .iter()
        .map(|item| {
            let n = int(func, "arr elements", item)?;
            u8::try_from(n).map_err(|_| runtime(format!("std.{}: {} is not a byte", func, n)))
        })
        .collect()
}

pub(super) fn decode_utf8(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let bytes = byte_array(interp, "decodeUTF8", &args[0])?;
    interp.string(String::from_utf8_lossy(&bytes).into_owned())
}

pub(super) fn base64_encode(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let encoded = match &args[0] {
        Value::Str(s) => STANDARD.encode(s.as_bytes()),
        Value::Array(_) => STANDARD.encode(byte_array(interp, "base64", &args[0])?),
        other => return Err(type_error("base64", "input", "a string or array of bytes", other)),
    };
    interp.string(encoded)
}

fn decode(func: &str, v: &Value) -> Result<Vec<u8>> {
    let s = string(func, "str", v)?;
    STANDARD
        .decode(s.as_bytes())
        .map_err(|err| runtime(format!("std.{}: invalid base64: {}", func, err)))
}

pub(super) fn base64_decode(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let bytes = decode("base64Decode", &args[0])?;
    interp.string(String::from_utf8_lossy(&bytes).into_owned())
}

pub(super) fn base64_decode_bytes(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let bytes = decode("base64DecodeBytes", &args[0])?;
    interp.check_array_len(bytes.len())?;
    Ok(bytes_value(&bytes))
}

fn digest<D: Digest>(func: &str, v: &Value) -> Result<Value> {
    let s = string(func, "s", v)?;
    Ok(Value::string(hex::encode(D::digest(s.as_bytes()))))
}

pub(super) fn md5(_: &Interpreter, args: &[Value]) -> Result<Value> {
    digest::<::md5::Md5>("md5", &args[0])
}

pub(super) fn sha1(_: &Interpreter, args: &[Value]) -> Result<Value> {
    digest::<Sha1>("sha1", &args[0])
}

pub(super) fn sha256(_: &Interpreter, args: &[Value]) -> Result<Value> {
    digest::<Sha256>("sha256", &args[0])
}

pub(super) fn sha512(_: &Interpreter, args: &[Value]) -> Result<Value> {
    digest::<Sha512>("sha512", &args[0])
}

pub(super) fn sha3(_: &Interpreter, args: &[Value]) -> Result<Value> {
    digest::<Sha3_512>("sha3", &args[0])
}

fn from_json(interp: &Interpreter, value: serde_json::Value) -> Result<Value> {
    let _guard = interp.enter()?;
    Ok(match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => Value::array(
            items
                .into_iter()
                .map(|item| from_json(interp, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_json::Value::Object(fields) => {
            let fields = fields
                .into_iter()
                .map(|(k, v)| Ok((Rc::from(k), from_json(interp, v)?)))
                .collect::<Result<Vec<_>>>()?;
            interp.object_from_values(fields)
        }
    })
}

pub(super) fn parse_json(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("parseJson", "str", &args[0])?;
    let parsed: serde_json::Value = serde_json::from_str(s)
        .map_err(|err| runtime(format!("std.parseJson: failed to parse JSON: {}", err)))?;
    from_json(interp, parsed)
}

fn yaml_key(value: serde_yaml::Value) -> Result<Rc<str>> {
    match value {
        serde_yaml::Value::String(s) => Ok(Rc::from(s)),
        serde_yaml::Value::Bool(b) => Ok(Rc::from(b.to_string())),
        serde_yaml::Value::Number(n) => Ok(Rc::from(n.to_string())),
        serde_yaml::Value::Null => Ok(Rc::from("null")),
        serde_yaml::Value::Tagged(tagged) => yaml_key(tagged.value),
        _ => Err(runtime("std.parseYaml: mapping keys must be scalars")),
    }
}

fn from_yaml(interp: &Interpreter, value: serde_yaml::Value) -> Result<Value> {
    let _guard = interp.enter()?;
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_yaml::Value::String(s) => Value::string(s),
        serde_yaml::Value::Sequence(items) => Value::array(
            items
                .into_iter()
                .map(|item| from_yaml(interp, item))
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(fields) => {
            let fields = fields
                .into_iter()
                .map(|(k, v)| Ok((yaml_key(k)?, from_yaml(interp, v)?)))
                .collect::<Result<Vec<_>>>()?;
            interp.object_from_values(fields)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(interp, tagged.value)?,
    })
}

/// A single document yields its value; a multi-document stream an array
pub(super) fn parse_yaml(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("parseYaml", "str", &args[0])?;
    let mut docs = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(s) {
        let parsed = serde_yaml::Value::deserialize(doc)
            .map_err(|err| runtime(format!("std.parseYaml: failed to parse YAML: {}", err)))?;
        docs.push(from_yaml(interp, parsed)?);
    }
    Ok(match docs.len() {
        0 => Value::Null,
        1 => docs.remove(0),
        _ => Value::array(docs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_keys_are_stringified() {
        assert_eq!(&*yaml_key(serde_yaml::Value::Bool(true)).unwrap(), "true");
        assert_eq!(&*yaml_key(serde_yaml::Value::Number(3i64.into())).unwrap(), "3");
        assert!(yaml_key(serde_yaml::Value::Sequence(Vec::new())).is_err());
    }
}
