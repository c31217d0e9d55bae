//! Manifesting values as JSON, YAML, Python, INI, XML and TOML text

use std::rc::Rc;

use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::manifest::{self, escape_json_string, format_number, Style};
use crate::value::{ObjectValue, Value};

use super::objects::entries;
use super::{array, flag, forced, object, string, type_error};

/// Join with the string-length limit checked before allocating
fn join(interp: &Interpreter, parts: &[String], sep: &str) -> Result<String> {
    let len = parts
        .iter()
        .fold(sep.len().saturating_mul(parts.len()), |acc, p| acc.saturating_add(p.len()));
    interp.check_string_len(len)?;
    Ok(parts.join(sep))
}

fn concat(interp: &Interpreter, parts: &[&str]) -> Result<String> {
    let len = parts.iter().fold(0usize, |acc, p| acc.saturating_add(p.len()));
    interp.check_string_len(len)?;
    Ok(parts.concat())
}

fn non_empty_object(v: &Value) -> bool {
    matches!(v, Value::Object(obj) if !obj.field_names(false).is_empty())
}

fn non_empty_array(v: &Value) -> bool {
    matches!(v, Value::Array(items) if !items.is_empty())
}

pub(super) fn manifest_json(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let out = manifest::pretty(interp, &args[0], "    ")?;
    interp.string(out)
}

pub(super) fn manifest_json_ex(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let indent: &str = &**string("manifestJsonEx", "indent", &args[1])?;
    let newline: &str = match &args[2] {
        Value::Null => "\n",
        other => &**string("manifestJsonEx", "newline", other)?,
    };
    let key_val_sep: &str = match &args[3] {
        Value::Null => ": ",
        other => &**string("manifestJsonEx", "key_val_sep", other)?,
    };
    let style = Style {
        indent,
        newline,
        key_val_sep,
    };
    let out = manifest::with_style(interp, &args[0], &style)?;
    interp.string(out)
}

pub(super) fn manifest_json_minified(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let style = Style {
        indent: "",
        newline: "",
        key_val_sep: ":",
    };
    let out = manifest::with_style(interp, &args[0], &style)?;
    interp.string(out)
}

const YAML_RESERVED: &[&str] = &[
    "true", "false", "yes", "no", "on", "off", "y", "n", "null", "~",
];

/// Keys that need no quoting in YAML
fn yaml_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    let leading = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    leading
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/'))
        && !YAML_RESERVED.iter().any(|r| r.eq_ignore_ascii_case(key))
}

struct Yaml<'i> {
    interp: &'i Interpreter,
    indent_array_in_object: bool,
    quote_keys: bool,
}

impl Yaml<'_> {
    fn key(&self, key: &str) -> String {
        if !self.quote_keys && yaml_bare_key(key) {
            key.to_string()
        } else {
            escape_json_string(key)
        }
    }

    fn render(&self, v: &Value, cindent: &str) -> Result<String> {
        let interp = self.interp;
        let _guard = interp.enter()?;
        match v {
            Value::Null => Ok("null".to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::Str(s) if s.is_empty() => Ok("\"\"".to_string()),
            Value::Str(s) => match s.strip_suffix('\n') {
                Some(body) => {
                    let mut lines = vec!["|".to_string()];
                    lines.extend(body.split('\n').map(str::to_string));
                    join(interp, &lines, &format!("\n{}  ", cindent))
                }
                None => Ok(escape_json_string(s)),
            },
            Value::Function(_) => Err(runtime("tried to manifest function as YAML")),
            Value::Array(items) if items.is_empty() => Ok("[]".to_string()),
            Value::Array(items) => {
                let mut parts = Vec::new();
                for item in forced(interp, items)? {
                    let (new_indent, space) = if non_empty_array(&item) {
                        let new_indent = format!("{}  ", cindent);
                        let space = format!("\n{}", new_indent);
                        (new_indent, space)
                    } else if non_empty_object(&item) {
                        (format!("{}  ", cindent), " ".to_string())
                    } else {
                        (cindent.to_string(), " ".to_string())
                    };
                    let body = self.render(&item, &new_indent)?;
                    parts.push(concat(interp, &["-", space.as_str(), body.as_str()])?);
                }
                join(interp, &parts, &format!("\n{}", cindent))
            }
            Value::Object(obj) => {
                let fields = entries(interp, obj, false)?;
                if fields.is_empty() {
                    return Ok("{}".to_string());
                }
                let mut lines = Vec::new();
                for (name, value) in fields {
                    let new_indent = if non_empty_array(&value) {
                        if self.indent_array_in_object {
                            format!("{}  ", cindent)
                        } else {
                            cindent.to_string()
                        }
                    } else if non_empty_object(&value) {
                        format!("{}  ", cindent)
                    } else {
                        cindent.to_string()
                    };
                    let space = if non_empty_array(&value) || non_empty_object(&value) {
                        format!("\n{}", new_indent)
                    } else {
                        " ".to_string()
                    };
                    let key = self.key(&name);
                    let body = self.render(&value, &new_indent)?;
                    lines.push(concat(interp, &[key.as_str(), ":", space.as_str(), body.as_str()])?);
                }
                join(interp, &lines, &format!("\n{}", cindent))
            }
        }
    }
}

pub(super) fn manifest_yaml_doc(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let yaml = Yaml {
        interp,
        indent_array_in_object: flag("manifestYamlDoc", "indent_array_in_object", &args[1], false)?,
        quote_keys: flag("manifestYamlDoc", "quote_keys", &args[2], true)?,
    };
    let out = yaml.render(&args[0], "")?;
    interp.string(out)
}

pub(super) fn manifest_yaml_stream(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let docs = match &args[0] {
        Value::Array(items) => forced(interp, items)?,
        other => {
            return Err(runtime(format!(
                "std.manifestYamlStream: only takes arrays, got {}",
                other.type_name()
            )))
        }
    };
    let yaml = Yaml {
        interp,
        indent_array_in_object: flag("manifestYamlStream", "indent_array_in_object", &args[1], false)?,
        quote_keys: flag("manifestYamlStream", "quote_keys", &args[3], true)?,
    };
    let document_end = flag("manifestYamlStream", "c_document_end", &args[2], true)?;
    let rendered = docs
        .iter()
        .map(|doc| yaml.render(doc, ""))
        .collect::<Result<Vec<_>>>()?;
    let body = join(interp, &rendered, "\n---\n")?;
    let tail = if document_end { "\n...\n" } else { "\n" };
    let out = concat(interp, &["---\n", body.as_str(), tail])?;
    interp.string(out)
}

fn python(interp: &Interpreter, v: &Value) -> Result<String> {
    let _guard = interp.enter()?;
    match v {
        Value::Null => Ok("None".to_string()),
        Value::Bool(true) => Ok("True".to_string()),
        Value::Bool(false) => Ok("False".to_string()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Str(s) => Ok(escape_json_string(s)),
        Value::Function(_) => Err(runtime("tried to manifest function as Python")),
        Value::Array(items) => {
            let parts = forced(interp, items)?
                .iter()
                .map(|item| python(interp, item))
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("[{}]", join(interp, &parts, ", ")?))
        }
        Value::Object(obj) => {
            let parts = entries(interp, obj, false)?
                .into_iter()
                .map(|(name, value)| {
                    Ok(format!("{}: {}", escape_json_string(&name), python(interp, &value)?))
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(format!("{{{}}}", join(interp, &parts, ", ")?))
        }
    }
}

pub(super) fn manifest_python(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let out = python(interp, &args[0])?;
    interp.string(out)
}

pub(super) fn manifest_python_vars(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let conf = object("manifestPythonVars", "conf", &args[0])?;
    let mut lines = entries(interp, conf, false)?
        .into_iter()
        .map(|(name, value)| Ok(format!("{} = {}", name, python(interp, &value)?)))
        .collect::<Result<Vec<_>>>()?;
    lines.push(String::new());
    let out = join(interp, &lines, "\n")?;
    interp.string(out)
}

fn ini_body(interp: &Interpreter, body: &Value, lines: &mut Vec<String>) -> Result<()> {
    let body = object("manifestIni", "section", body)?;
    for (name, value) in entries(interp, body, false)? {
        let values = match &value {
            Value::Array(items) => forced(interp, items)?,
            _ => vec![value],
        };
        for value in values {
            lines.push(format!("{} = {}", name, interp.to_display_string(&value)?));
        }
    }
    Ok(())
}

pub(super) fn manifest_ini(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let ini = object("manifestIni", "ini", &args[0])?;
    let mut lines = Vec::new();
    if let Some(main) = field(interp, ini, "main")? {
        ini_body(interp, &main, &mut lines)?;
    }
    let sections = field(interp, ini, "sections")?
        .ok_or_else(|| runtime("std.manifestIni: ini must have a sections field"))?;
    let sections = object("manifestIni", "sections", &sections)?;
    for (name, body) in entries(interp, sections, false)? {
        lines.push(format!("[{}]", name));
        ini_body(interp, &body, &mut lines)?;
    }
    lines.push(String::new());
    let out = join(interp, &lines, "\n")?;
    interp.string(out)
}

fn field(interp: &Interpreter, obj: &ObjectValue, name: &str) -> Result<Option<Value>> {
    if obj.has_field(name) && !obj.is_hidden(name) {
        interp.object_field(obj, name)
    } else {
        Ok(None)
    }
}

fn jsonml(interp: &Interpreter, v: &Value) -> Result<String> {
    let _guard = interp.enter()?;
    let items = match v {
        Value::Str(s) => return Ok(s.to_string()),
        other => forced(interp, array("manifestXmlJsonml", "value", other)?)?,
    };
    let Some((tag, rest)) = items.split_first() else {
        return Err(runtime("std.manifestXmlJsonml: element must have a tag name"));
    };
    let tag = string("manifestXmlJsonml", "tag", tag)?;
    let (attrs, children) = match rest.split_first() {
        Some((Value::Object(attrs), children)) => (Some(attrs), children),
        _ => (None, rest),
    };
    let mut parts = vec![format!("<{}", tag)];
    if let Some(attrs) = attrs {
        for (name, value) in entries(interp, attrs, false)? {
            parts.push(format!(" {}=\"{}\"", name, interp.to_display_string(&value)?));
        }
    }
    parts.push(">".to_string());
    for child in children {
        parts.push(jsonml(interp, child)?);
    }
    parts.push(format!("</{}>", tag));
    join(interp, &parts, "")
}

pub(super) fn manifest_xml_jsonml(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    if !matches!(args[0], Value::Array(_)) {
        return Err(type_error("manifestXmlJsonml", "value", "an array", &args[0]));
    }
    let out = jsonml(interp, &args[0])?;
    interp.string(out)
}

fn toml_key(key: &str) -> String {
    if key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        key.to_string()
    } else {
        escape_json_string(key)
    }
}

fn toml_path(path: &[Rc<str>]) -> String {
    path.iter()
        .map(|k| toml_key(k))
        .collect::<Vec<_>>()
        .join(".")
}

struct Toml<'i> {
    interp: &'i Interpreter,
    indent: &'i str,
}

impl Toml<'_> {
    fn is_table_array(&self, v: &Value) -> Result<bool> {
        match v {
            Value::Array(items) if !items.is_empty() => Ok(forced(self.interp, items)?
                .iter()
                .all(|item| matches!(item, Value::Object(_)))),
            _ => Ok(false),
        }
    }

    fn is_section(&self, v: &Value) -> Result<bool> {
        Ok(matches!(v, Value::Object(_)) || self.is_table_array(v)?)
    }

    fn value(&self, v: &Value, path: &[Rc<str>], inline: bool, cindent: &str) -> Result<String> {
        let interp = self.interp;
        let _guard = interp.enter()?;
        match v {
            Value::Bool(b) => Ok(b.to_string()),
            Value::Number(n) => Ok(format_number(*n)),
            Value::Str(s) => Ok(escape_json_string(s)),
            Value::Null => Err(runtime(format!(
                "std.manifestTomlEx: tried to manifest null at {}",
                toml_path(path)
            ))),
            Value::Function(_) => Err(runtime(format!(
                "std.manifestTomlEx: tried to manifest function at {}",
                toml_path(path)
            ))),
            Value::Array(items) if items.is_empty() => Ok("[]".to_string()),
            Value::Array(items) => {
                let new_indent = if inline {
                    String::new()
                } else {
                    format!("{}{}", cindent, self.indent)
                };
                let separator = if inline { " " } else { "\n" };
                let mut parts = Vec::new();
                for (i, item) in forced(interp, items)?.iter().enumerate() {
                    let mut item_path = path.to_vec();
                    item_path.push(Rc::from(i.to_string()));
                    parts.push(format!("{}{}", new_indent, self.value(item, &item_path, true, "")?));
                }
                let body = join(interp, &parts, &format!(",{}", separator))?;
                let close = if inline { "" } else { cindent };
                concat(interp, &["[", separator, body.as_str(), separator, close, "]"])
            }
            Value::Object(obj) => {
                let mut parts = Vec::new();
                for (name, value) in entries(interp, obj, false)? {
                    let mut item_path = path.to_vec();
                    item_path.push(name.clone());
                    let body = self.value(&value, &item_path, true, "")?;
                    parts.push(format!("{} = {}", toml_key(&name), body));
                }
                let body = join(interp, &parts, ", ")?;
                concat(interp, &["{ ", body.as_str(), " }"])
            }
        }
    }

    fn table_internal(&self, obj: &ObjectValue, path: &[Rc<str>], cindent: &str) -> Result<String> {
        let interp = self.interp;
        let _guard = interp.enter()?;
        let fields = entries(interp, obj, false)?;
        let mut kvp = Vec::new();
        let mut sections = Vec::new();
        for (name, value) in &fields {
            let mut item_path = path.to_vec();
            item_path.push(name.clone());
            if self.is_section(value)? {
                sections.push(match value {
                    Value::Object(child) => self.table(child, &item_path, cindent)?,
                    _ => self.table_array(value, &item_path, cindent)?,
                });
            } else {
                let body = self.value(value, &item_path, false, cindent)?;
                kvp.push(format!("{}{} = {}", cindent, toml_key(name), body));
            }
        }
        let mut all = vec![join(interp, &kvp, "\n")?];
        all.extend(sections);
        join(interp, &all, "\n\n")
    }

    fn table(&self, obj: &ObjectValue, path: &[Rc<str>], cindent: &str) -> Result<String> {
        let header = format!("{}[{}]", cindent, toml_path(path));
        let sep = if obj.field_names(false).is_empty() { "" } else { "\n" };
        let body = self.table_internal(obj, path, &format!("{}{}", cindent, self.indent))?;
        concat(self.interp, &[header.as_str(), sep, body.as_str()])
    }

    fn table_array(&self, v: &Value, path: &[Rc<str>], cindent: &str) -> Result<String> {
        let interp = self.interp;
        let items = forced(interp, array("manifestTomlEx", "value", v)?)?;
        let mut sections = Vec::new();
        for item in &items {
            let obj = object("manifestTomlEx", "table", item)?;
            let header = format!("{}[[{}]]", cindent, toml_path(path));
            let sep = if obj.field_names(false).is_empty() { "" } else { "\n" };
            let body = self.table_internal(obj, path, &format!("{}{}", cindent, self.indent))?;
            sections.push(concat(interp, &[header.as_str(), sep, body.as_str()])?);
        }
        join(interp, &sections, "\n\n")
    }
}

fn toml(interp: &Interpreter, value: &Value, indent: &str) -> Result<Value> {
    let obj = match value {
        Value::Object(obj) => obj,
        other => {
            return Err(runtime(format!(
                "std.manifestTomlEx: TOML body must be an object, got {}",
                other.type_name()
            )))
        }
    };
    let out = Toml { interp, indent }.table_internal(obj, &[], "")?;
    interp.string(out)
}

pub(super) fn manifest_toml(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    toml(interp, &args[0], "  ")
}

pub(super) fn manifest_toml_ex(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let indent = string("manifestTomlEx", "indent", &args[1])?;
    toml(interp, &args[0], indent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_bare_keys() {
        assert!(yaml_bare_key("name"));
        assert!(yaml_bare_key("my-key.sub"));
        assert!(!yaml_bare_key("yes"));
        assert!(!yaml_bare_key("1abc"));
        assert!(!yaml_bare_key("has space"));
        assert!(!yaml_bare_key(""));
    }

    #[test]
    fn test_toml_keys_quote_outside_bare_set() {
        assert_eq!(toml_key("a_b-c1"), "a_b-c1");
        assert_eq!(toml_key("a.b"), "\"a.b\"");
    }
}
