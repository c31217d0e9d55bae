//! String builtins

use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::format;
use crate::manifest::escape_json_string;
use crate::value::Value;

use super::{int, string};

/// Whitespace removed by `std.trim`
const TRIM_CHARS: &[char] = &[' ', '\t', '\n', '\u{c}', '\r', '\u{85}', '\u{a0}'];

pub(super) fn codepoint(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("codepoint", "str", &args[0])?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Value::Number(c as u32 as f64)),
        _ => Err(runtime("std.codepoint: str must be a single character")),
    }
}

pub(super) fn char_of(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let n = int("char", "n", &args[0])?;
    u32::try_from(n)
        .ok()
        .and_then(char::from_u32)
        .map(|c| Value::string(String::from(c)))
        .ok_or_else(|| runtime(format!("std.char: invalid code point {}", n)))
}

pub(super) fn substr(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("substr", "str", &args[0])?;
    let from = int("substr", "from", &args[1])?;
    let len = int("substr", "len", &args[2])?;
    if from < 0 || len < 0 {
        return Err(runtime("std.substr: from and len must be non-negative"));
    }
    let out: String = s.chars().skip(from as usize).take(len as usize).collect();
    interp.string(out)
}

/// Character offsets of every occurrence, overlapping ones included
pub(super) fn find_substr(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let pat: Vec<char> = string("findSubstr", "pat", &args[0])?.chars().collect();
    let s: Vec<char> = string("findSubstr", "str", &args[1])?.chars().collect();
    if pat.is_empty() || pat.len() > s.len() {
        return Ok(Value::array(Vec::new()));
    }
    let mut out = Vec::new();
    for (i, window) in s.windows(pat.len()).enumerate() {
        interp.tick()?;
        if window == pat.as_slice() {
            out.push(Value::Number(i as f64));
        }
    }
    Ok(Value::array(out))
}

pub(super) fn starts_with(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let a = string("startsWith", "a", &args[0])?;
    let b = string("startsWith", "b", &args[1])?;
    Ok(Value::Bool(a.starts_with(&**b)))
}

pub(super) fn ends_with(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let a = string("endsWith", "a", &args[0])?;
    let b = string("endsWith", "b", &args[1])?;
    Ok(Value::Bool(a.ends_with(&**b)))
}

fn strip_args<'a>(func: &str, args: &'a [Value]) -> Result<(&'a str, Vec<char>)> {
    let s: &str = string(func, "str", &args[0])?;
    let chars = string(func, "chars", &args[1])?.chars().collect();
    Ok((s, chars))
}

pub(super) fn strip_chars(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let (s, chars) = strip_args("stripChars", args)?;
    Ok(Value::string(s.trim_matches(chars.as_slice())))
}

pub(super) fn lstrip_chars(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let (s, chars) = strip_args("lstripChars", args)?;
    Ok(Value::string(s.trim_start_matches(chars.as_slice())))
}

pub(super) fn rstrip_chars(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let (s, chars) = strip_args("rstripChars", args)?;
    Ok(Value::string(s.trim_end_matches(chars.as_slice())))
}

pub(super) fn trim(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(string("trim", "str", &args[0])?.trim_matches(TRIM_CHARS)))
}

fn parts(interp: &Interpreter, parts: Vec<&str>) -> Result<Value> {
    interp.check_array_len(parts.len())?;
    Ok(Value::array(parts.into_iter().map(Value::string).collect()))
}

fn split_args<'a>(func: &str, args: &'a [Value]) -> Result<(&'a str, &'a str, Option<usize>)> {
    let s: &str = string(func, "str", &args[0])?;
    let c: &str = string(func, "c", &args[1])?;
    if c.is_empty() {
        return Err(runtime(format!("std.{}: c must not be empty", func)));
    }
    let max = match args.get(2) {
        None => None,
        Some(v) => match int(func, "maxsplits", v)? {
            -1 => None,
            n if n < 0 => {
                return Err(runtime(format!(
                    "std.{}: maxsplits must be -1 or non-negative, got {}",
                    func, n
                )))
            }
            n => Some(usize::try_from(n).unwrap_or(usize::MAX).saturating_add(1)),
        },
    };
    Ok((s, c, max))
}

pub(super) fn split(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let (s, c, _) = split_args("split", args)?;
    parts(interp, s.split(c).collect())
}

pub(super) fn split_limit(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    match split_args("splitLimit", args)? {
        (s, c, None) => parts(interp, s.split(c).collect()),
        (s, c, Some(n)) => parts(interp, s.splitn(n, c).collect()),
    }
}

pub(super) fn split_limit_r(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    match split_args("splitLimitR", args)? {
        (s, c, None) => parts(interp, s.split(c).collect()),
        (s, c, Some(n)) => {
            let mut found: Vec<&str> = s.rsplitn(n, c).collect();
            found.reverse();
            parts(interp, found)
        }
    }
}

pub(super) fn str_replace(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("strReplace", "str", &args[0])?;
    let from = string("strReplace", "from", &args[1])?;
    let to = string("strReplace", "to", &args[2])?;
    if from.is_empty() {
        return Err(runtime("std.strReplace: from must not be empty"));
    }
    let hits = s.matches(&**from).count();
    let grown = hits.saturating_mul(to.len()).saturating_add(s.len());
    interp.check_string_len(grown.saturating_sub(hits * from.len()))?;
    interp.string(s.replace(&**from, to))
}

pub(super) fn ascii_upper(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(string("asciiUpper", "str", &args[0])?.to_ascii_uppercase()))
}

pub(super) fn ascii_lower(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::string(string("asciiLower", "str", &args[0])?.to_ascii_lowercase()))
}

pub(super) fn string_chars(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("stringChars", "str", &args[0])?;
    interp.check_array_len(s.chars().count())?;
    Ok(Value::array(s.chars().map(|c| Value::string(String::from(c))).collect()))
}

pub(super) fn equals_ignore_case(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let a = string("equalsIgnoreCase", "str1", &args[0])?;
    let b = string("equalsIgnoreCase", "str2", &args[1])?;
    Ok(Value::Bool(a.eq_ignore_ascii_case(b)))
}

pub(super) fn is_empty(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(string("isEmpty", "str", &args[0])?.is_empty()))
}

pub(super) fn format_builtin(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let fmt = string("format", "str", &args[0])?;
    let out = format::format(interp, fmt, &args[1])?;
    interp.string(out)
}

pub(super) fn escape_string_json(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = interp.to_display_string(&args[0])?;
    interp.string(escape_json_string(&s))
}

pub(super) fn escape_string_bash(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = interp.to_display_string(&args[0])?;
    interp.string(format!("'{}'", s.replace('\'', "'\"'\"'")))
}

pub(super) fn escape_string_dollars(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = interp.to_display_string(&args[0])?;
    interp.string(s.replace('$', "$$"))
}

pub(super) fn escape_string_xml(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = interp.to_display_string(&args[0])?;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    interp.string(out)
}

/// Digits in `radix` folded into a float; long inputs lose precision
/// rather than overflow
fn parse_radix(func: &str, s: &str, radix: u32) -> Result<f64> {
    if s.is_empty() {
        return Err(runtime(format!("std.{}: {:?} is not a valid number", func, s)));
    }
    s.chars().try_fold(0.0, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
            .ok_or_else(|| runtime(format!("std.{}: {:?} is not a valid number", func, s)))
    })
}

pub(super) fn parse_int(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("parseInt", "str", &args[0])?;
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, &**s),
    };
    let magnitude = parse_radix("parseInt", digits, 10)?;
    Ok(Value::Number(if negative { -magnitude } else { magnitude }))
}

pub(super) fn parse_octal(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("parseOctal", "str", &args[0])?;
    Ok(Value::Number(parse_radix("parseOctal", s, 8)?))
}

pub(super) fn parse_hex(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let s = string("parseHex", "str", &args[0])?;
    Ok(Value::Number(parse_radix("parseHex", s, 16)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_radix() {
        assert_eq!(parse_radix("parseHex", "ff", 16).unwrap(), 255.0);
        assert_eq!(parse_radix("parseOctal", "755", 8).unwrap(), 493.0);
        assert!(parse_radix("parseInt", "", 10).is_err());
        assert!(parse_radix("parseInt", "12a", 10).is_err());
    }
}
