//! printf-style formatting behind `str % args` and `std.format`

use crate::error::{limit, runtime, Result};
use crate::eval::Interpreter;
use crate::manifest::format_number;
use crate::value::Value;

#[derive(Default)]
struct Spec {
    key: Option<String>,
    left: bool,
    zero: bool,
    plus: bool,
    space: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
    conv: char,
}

/// Width or precision as written: a number or `*`
#[derive(Clone, Copy)]
enum Count {
    Fixed(usize),
    Star,
}

enum Piece {
    Literal(String),
    Spec {
        spec: Spec,
        width: Option<Count>,
        precision: Option<Count>,
    },
}

/// Digits or `*` at `chars[*i]`; numbers above `max` are refused before
/// anything is padded to them
fn parse_count(chars: &[char], i: &mut usize, max: usize) -> Result<Option<Count>> {
    if chars.get(*i) == Some(&'*') {
        *i += 1;
        return Ok(Some(Count::Star));
    }
    let mut value: Option<usize> = None;
    while let Some(d) = chars.get(*i).and_then(|c| c.to_digit(10)) {
        let next = value
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as usize))
            .filter(|v| *v <= max)
            .ok_or_else(|| too_wide(max))?;
        value = Some(next);
        *i += 1;
    }
    Ok(value.map(Count::Fixed))
}

fn too_wide(max: usize) -> crate::JsonnetError {
    limit(format!("format: width or precision larger than {} bytes", max))
}

fn parse(fmt: &str, max: usize) -> Result<Vec<Piece>> {
    let chars: Vec<char> = fmt.chars().collect();
    let mut codes = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '%' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let mut spec = Spec::default();
        if chars.get(i) == Some(&'(') {
            let close = chars[i..]
                .iter()
                .position(|c| *c == ')')
                .ok_or_else(|| runtime("format: unterminated mapping key"))?;
            spec.key = Some(chars[i + 1..i + close].iter().collect());
            i += close + 1;
        }
        while let Some(flag) = chars.get(i) {
            match flag {
                '-' => spec.left = true,
                '0' => spec.zero = true,
                '+' => spec.plus = true,
                ' ' => spec.space = true,
                '#' => spec.alt = true,
                _ => break,
            }
            i += 1;
        }
        let width = parse_count(&chars, &mut i, max)?;
        let precision = if chars.get(i) == Some(&'.') {
            i += 1;
            Some(parse_count(&chars, &mut i, max)?.unwrap_or(Count::Fixed(0)))
        } else {
            None
        };
        // Length modifiers are accepted and ignored
        while matches!(chars.get(i), Some('h' | 'l' | 'L')) {
            i += 1;
        }
        spec.conv = *chars
            .get(i)
            .ok_or_else(|| runtime("format: truncated format code"))?;
        i += 1;
        if spec.conv == '%' {
            literal.push('%');
            continue;
        }
        if !literal.is_empty() {
            codes.push(Piece::Literal(std::mem::take(&mut literal)));
        }
        codes.push(Piece::Spec {
            spec,
            width,
            precision,
        });
    }
    if !literal.is_empty() {
        codes.push(Piece::Literal(literal));
    }
    Ok(codes)
}

/// Format `fmt` with an array of positional values, an object of named
/// values, or a single value
pub fn format(interp: &Interpreter, fmt: &str, args: &Value) -> Result<String> {
    let max = interp.limits().max_string_bytes;
    let codes = parse(fmt, max)?;
    let positional: Vec<Value> = match args {
        Value::Array(items) => items
            .iter()
            .map(|t| interp.force(t))
            .collect::<Result<_>>()?,
        Value::Object(_) => Vec::new(),
        other => vec![other.clone()],
    };
    let mut next = 0;
    let mut take_positional = || -> Result<Value> {
        let value = positional
            .get(next)
            .cloned()
            .ok_or_else(|| runtime("format: not enough values"))?;
        next += 1;
        Ok(value)
    };
    let mut out = String::new();
    for code in codes {
        let (mut spec, width, precision) = match code {
            Piece::Literal(text) => {
                out.push_str(&text);
                continue;
            }
            Piece::Spec {
                spec,
                width,
                precision,
            } => (spec, width, precision),
        };
        let mut resolve = |count: Count| -> Result<usize> {
            match count {
                Count::Fixed(n) => Ok(n),
                Count::Star => match take_positional()? {
                    Value::Number(n) if n.fract() == 0.0 && n >= 0.0 => {
                        if n > max as f64 {
                            Err(too_wide(max))
                        } else {
                            Ok(n as usize)
                        }
                    }
                    other => Err(runtime(format!(
                        "format: * expects a non-negative integer, got {}",
                        other.type_name()
                    ))),
                },
            }
        };
        if let Some(width) = width {
            spec.width = resolve(width)?;
        }
        if let Some(precision) = precision {
            spec.precision = Some(resolve(precision)?);
        }
        let value = match (&spec.key, args) {
            (Some(key), Value::Object(obj)) => interp
                .object_field(obj, key)?
                .ok_or_else(|| runtime(format!("format: no such field: {}", key)))?,
            (Some(_), _) => return Err(runtime("format: mapping keys require an object")),
            (None, Value::Object(_)) => {
                return Err(runtime("format: an object requires mapping keys"))
            }
            (None, _) => take_positional()?,
        };
        let piece = format_one(interp, &spec, &value)?;
        interp.check_string_len(out.len().saturating_add(piece.len()))?;
        out.push_str(&piece);
    }
    if !matches!(args, Value::Object(_)) && next < positional.len() {
        return Err(runtime("format: too many values"));
    }
    Ok(out)
}

fn format_one(interp: &Interpreter, spec: &Spec, value: &Value) -> Result<String> {
    let body = match spec.conv {
        's' => {
            let s = interp.to_display_string(value)?;
            match spec.precision {
                Some(p) => s.chars().take(p).collect(),
                None => s,
            }
        }
        'd' | 'i' | 'u' => {
            let n = number(spec, value)?.trunc();
            let digits = format!("{:.0}", n.abs());
            let digits = zero_pad_precision(digits, spec.precision);
            signed(spec, n < 0.0, digits, "")
        }
        'o' | 'x' | 'X' => {
            let n = number(spec, value)?.trunc() as i64;
            let magnitude = n.unsigned_abs();
            let (digits, prefix) = match spec.conv {
                'o' => (format!("{:o}", magnitude), "0"),
                'x' => (format!("{:x}", magnitude), "0x"),
                _ => (format!("{:X}", magnitude), "0X"),
            };
            let digits = zero_pad_precision(digits, spec.precision);
            let prefix = if spec.alt { prefix } else { "" };
            signed(spec, n < 0, digits, prefix)
        }
        'f' | 'F' => {
            let n = number(spec, value)?;
            let digits = format!("{:.*}", spec.precision.unwrap_or(6), n.abs());
            signed(spec, n.is_sign_negative() && n != 0.0, digits, "")
        }
        'e' | 'E' => {
            let n = number(spec, value)?;
            let digits = exponent(n.abs(), spec.precision.unwrap_or(6), spec.conv == 'E');
            signed(spec, n < 0.0, digits, "")
        }
        'g' | 'G' => {
            let n = number(spec, value)?;
            let digits = general(n.abs(), spec.precision.unwrap_or(6), spec.alt, spec.conv == 'G');
            signed(spec, n < 0.0, digits, "")
        }
        'c' => match value {
            Value::Number(n) => char::from_u32(*n as u32)
                .map(String::from)
                .ok_or_else(|| runtime(format!("format: invalid code point {}", n)))?,
            Value::Str(s) if s.chars().count() == 1 => s.to_string(),
            other => {
                return Err(runtime(format!(
                    "format: %c expects a number or single character, got {}",
                    other.type_name()
                )))
            }
        },
        other => return Err(runtime(format!("format: unknown conversion %{}", other))),
    };
    Ok(pad(spec, body))
}

fn number(spec: &Spec, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        other => Err(runtime(format!(
            "format: %{} expects a number, got {}",
            spec.conv,
            other.type_name()
        ))),
    }
}

fn zero_pad_precision(digits: String, precision: Option<usize>) -> String {
    match precision {
        Some(p) if digits.len() < p => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

fn signed(spec: &Spec, negative: bool, digits: String, prefix: &str) -> String {
    let sign = if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    };
    let used = sign.len() + prefix.len() + digits.len();
    if spec.zero && !spec.left && used < spec.width {
        format!("{}{}{}{}", sign, prefix, "0".repeat(spec.width - used), digits)
    } else {
        format!("{}{}{}", sign, prefix, digits)
    }
}

fn pad(spec: &Spec, body: String) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = " ".repeat(spec.width - len);
    if spec.left {
        body + &fill
    } else {
        fill + &body
    }
}

/// `1.500000e+03` style
fn exponent(n: f64, precision: usize, upper: bool) -> String {
    let raw = format!("{:.*e}", precision, n);
    let (mantissa, exp) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    let out = format!("{}e{}{:02}", mantissa, sign, exp.abs());
    if upper {
        out.to_uppercase()
    } else {
        out
    }
}

fn general(n: f64, precision: usize, alt: bool, upper: bool) -> String {
    let precision = precision.max(1);
    if n == 0.0 {
        return "0".to_string();
    }
    let exp = format!("{:.*e}", precision - 1, n)
        .split_once('e')
        .and_then(|(_, e)| e.parse::<i32>().ok())
        .unwrap_or(0);
    let out = if exp < -4 || exp >= precision as i32 {
        let s = exponent(n, precision - 1, upper);
        if alt {
            s
        } else {
            match s.split_once(if upper { 'E' } else { 'e' }) {
                Some((m, e)) => format!("{}{}{}", strip_zeros(m), if upper { 'E' } else { 'e' }, e),
                None => s,
            }
        }
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let s = format!("{:.*}", decimals, n);
        if alt {
            s
        } else {
            strip_zeros(&s)
        }
    };
    if out.is_empty() {
        format_number(n)
    } else {
        out
    }
}

fn strip_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::EvalLimits;

    fn fmt(f: &str, args: Vec<Value>) -> Result<String> {
        let interp = Interpreter::new(EvalLimits::default());
        format(&interp, f, &Value::array(args))
    }

    #[test]
    fn test_basic_conversions() {
        assert_eq!(
            fmt("%s is %d years", vec![Value::string("Ann"), Value::Number(42.0)]).unwrap(),
            "Ann is 42 years"
        );
        assert_eq!(fmt("%05.2f", vec![Value::Number(3.14159)]).unwrap(), "03.14");
        assert_eq!(fmt("%x", vec![Value::Number(255.0)]).unwrap(), "ff");
        assert_eq!(fmt("%#o", vec![Value::Number(8.0)]).unwrap(), "010");
        assert_eq!(fmt("100%%", vec![]).unwrap(), "100%");
    }

    #[test]
    fn test_width_and_alignment() {
        assert_eq!(fmt("[%5s]", vec![Value::string("ab")]).unwrap(), "[   ab]");
        assert_eq!(fmt("[%-5s]", vec![Value::string("ab")]).unwrap(), "[ab   ]");
        assert_eq!(fmt("%+d", vec![Value::Number(7.0)]).unwrap(), "+7");
    }

    #[test]
    fn test_exponent_and_general() {
        assert_eq!(fmt("%e", vec![Value::Number(1500.0)]).unwrap(), "1.500000e+03");
        assert_eq!(fmt("%g", vec![Value::Number(0.0001)]).unwrap(), "0.0001");
        assert_eq!(fmt("%g", vec![Value::Number(1e-5)]).unwrap(), "1e-05");
        assert_eq!(fmt("%g", vec![Value::Number(123456789.0)]).unwrap(), "1.23457e+08");
    }

    #[test]
    fn test_star_width_takes_a_value() {
        assert_eq!(
            fmt("[%*d]", vec![Value::Number(4.0), Value::Number(7.0)]).unwrap(),
            "[   7]"
        );
        assert_eq!(
            fmt("%.*f", vec![Value::Number(1.0), Value::Number(2.26)]).unwrap(),
            "2.3"
        );
    }

    #[test]
    fn test_huge_width_is_refused_before_padding() {
        for f in ["%1000000000000d", "%99999999999999999999d", "%.99999999999999999999f"] {
            let err = fmt(f, vec![Value::Number(1.0)]).unwrap_err();
            assert!(matches!(err, crate::JsonnetError::Limit { .. }), "{}", f);
        }
        let err = fmt("%*d", vec![Value::Number(1e12), Value::Number(1.0)]).unwrap_err();
        assert!(matches!(err, crate::JsonnetError::Limit { .. }));
    }

    #[test]
    fn test_argument_count_mismatch() {
        assert!(fmt("%s %s", vec![Value::string("a")]).is_err());
        assert!(fmt("%s", vec![Value::string("a"), Value::string("b")]).is_err());
    }
}
