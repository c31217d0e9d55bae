//! JSON manifestation of evaluated values

use std::fmt::Write as _;

use crate::error::{limit, runtime, Result};
use crate::eval::Interpreter;
use crate::value::Value;

/// Layout knobs for multi-line output
pub struct Style<'a> {
    pub indent: &'a str,
    pub newline: &'a str,
    pub key_val_sep: &'a str,
}

/// Multi-line JSON with the given indent, as printed for a whole program
pub fn pretty(interp: &Interpreter, value: &Value, indent: &str) -> Result<String> {
    let style = Style {
        indent,
        newline: "\n",
        key_val_sep: ": ",
    };
    with_style(interp, value, &style)
}

pub fn with_style(interp: &Interpreter, value: &Value, style: &Style<'_>) -> Result<String> {
    let mut writer = Writer::new(interp);
    writer.multi_line(value, style, 0)?;
    Ok(writer.out)
}

/// Single-line JSON used for string conversion and error messages
pub fn inline(interp: &Interpreter, value: &Value) -> Result<String> {
    let mut writer = Writer::new(interp);
    writer.single_line(value)?;
    Ok(writer.out)
}

/// Integral values print in full; everything else with 17 significant
/// digits, switching to exponent form below 1e-4
pub fn format_number(n: f64) -> String {
    if n == n.floor() {
        return format!("{:.0}", n);
    }
    let sci = format!("{:.16e}", n.abs());
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = match digits.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    let sign = if n < 0.0 { "-" } else { "" };
    if exp < -4 || exp >= 17 {
        let (first, rest) = digits.split_at(1);
        let dot = if rest.is_empty() { "" } else { "." };
        let exp_sign = if exp < 0 { '-' } else { '+' };
        return format!("{}{}{}{}e{}{:02}", sign, first, dot, rest, exp_sign, exp.abs());
    }
    if exp < 0 {
        let zeros = "0".repeat((-exp - 1) as usize);
        return format!("{}0.{}{}", sign, zeros, digits);
    }
    let int_len = exp as usize + 1;
    if digits.len() <= int_len {
        return format!("{}{}{}", sign, digits, "0".repeat(int_len - digits.len()));
    }
    let (int_part, frac) = digits.split_at(int_len);
    format!("{}{}.{}", sign, int_part, frac)
}

pub fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (0x7f..=0x9f).contains(&(c as u32)) => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

struct Writer<'i> {
    interp: &'i Interpreter,
    out: String,
}

impl<'i> Writer<'i> {
    fn new(interp: &'i Interpreter) -> Self {
        Self {
            interp,
            out: String::new(),
        }
    }

    fn push(&mut self, s: &str) -> Result<()> {
        let max = self.interp.limits().max_output_bytes;
        if self.out.len() + s.len() > max {
            return Err(limit(format!("output larger than {} bytes", max)));
        }
        self.out.push_str(s);
        Ok(())
    }

    fn indent(&mut self, style: &Style<'_>, level: usize) -> Result<()> {
        for _ in 0..level {
            self.push(style.indent)?;
        }
        Ok(())
    }

    fn scalar(&mut self, value: &Value) -> Result<bool> {
        match value {
            Value::Null => self.push("null")?,
            Value::Bool(b) => self.push(if *b { "true" } else { "false" })?,
            Value::Number(n) => self.push(&format_number(*n))?,
            Value::Str(s) => self.push(&escape_json_string(s))?,
            Value::Function(_) => return Err(runtime("couldn't manifest function as JSON")),
            Value::Array(_) | Value::Object(_) => return Ok(false),
        }
        Ok(true)
    }

    fn single_line(&mut self, value: &Value) -> Result<()> {
        let interp = self.interp;
        let _guard = interp.enter()?;
        if self.scalar(value)? {
            return Ok(());
        }
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return self.push("[ ]");
                }
                self.push("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(", ")?;
                    }
                    let item = self.interp.force(item)?;
                    self.single_line(&item)?;
                }
                self.push("]")
            }
            Value::Object(obj) => {
                let names = obj.field_names(false);
                if names.is_empty() {
                    return self.push("{ }");
                }
                self.push("{")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        self.push(", ")?;
                    }
                    self.push(&escape_json_string(name))?;
                    self.push(": ")?;
                    let field = self.interp.object_field(obj, name)?.unwrap_or(Value::Null);
                    self.single_line(&field)?;
                }
                self.push("}")
            }
            _ => Ok(()),
        }
    }

    fn multi_line(&mut self, value: &Value, style: &Style<'_>, level: usize) -> Result<()> {
        let interp = self.interp;
        let _guard = interp.enter()?;
        if self.scalar(value)? {
            return Ok(());
        }
        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return self.push("[ ]");
                }
                self.push("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.push(",")?;
                    }
                    self.push(style.newline)?;
                    self.indent(style, level + 1)?;
                    let item = self.interp.force(item)?;
                    self.multi_line(&item, style, level + 1)?;
                }
                self.push(style.newline)?;
                self.indent(style, level)?;
                self.push("]")
            }
            Value::Object(obj) => {
                let names = obj.field_names(false);
                if names.is_empty() {
                    return self.push("{ }");
                }
                self.push("{")?;
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        self.push(",")?;
                    }
                    self.push(style.newline)?;
                    self.indent(style, level + 1)?;
                    self.push(&escape_json_string(name))?;
                    self.push(style.key_val_sep)?;
                    let field = self.interp.object_field(obj, name)?.unwrap_or(Value::Null);
                    self.multi_line(&field, style, level + 1)?;
                }
                self.push(style.newline)?;
                self.indent(style, level)?;
                self.push("}")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(1e21), "1000000000000000000000");
        assert_eq!(format_number(0.1), "0.10000000000000001");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.30000000000000004), "0.30000000000000004");
        assert_eq!(format_number(1e-7), "9.9999999999999995e-08");
        assert_eq!(format_number(0.001), "0.001");
    }

    #[test]
    fn test_escape_json_string() {
        assert_eq!(escape_json_string("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(escape_json_string("\u{1}"), r#""\u0001""#);
        assert_eq!(escape_json_string("\u{7f}"), r#""\u007f""#);
        assert_eq!(escape_json_string("é"), "\"é\"");
    }
}
