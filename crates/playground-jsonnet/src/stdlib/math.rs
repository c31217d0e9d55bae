//! Numeric builtins

use crate::ast::BinaryOp;
use crate::error::{runtime, Result};
use crate::eval::Interpreter;
use crate::value::Value;

use super::{finite, num, type_error};

fn unary(func: &str, args: &[Value], op: fn(f64) -> f64) -> Result<Value> {
    finite(func, op(num(func, "x", &args[0])?))
}

pub(super) fn abs(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(num("abs", "n", &args[0])?.abs()))
}

pub(super) fn sign(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let n = num("sign", "n", &args[0])?;
    let s = if n > 0.0 {
        1.0
    } else if n < 0.0 {
        -1.0
    } else {
        0.0
    };
    Ok(Value::Number(s))
}

pub(super) fn max(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(num("max", "a", &args[0])?.max(num("max", "b", &args[1])?)))
}

pub(super) fn min(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(num("min", "a", &args[0])?.min(num("min", "b", &args[1])?)))
}

pub(super) fn clamp(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let x = num("clamp", "x", &args[0])?;
    let lo = num("clamp", "minVal", &args[1])?;
    let hi = num("clamp", "maxVal", &args[2])?;
    let clamped = if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    };
    Ok(Value::Number(clamped))
}

pub(super) fn pow(_: &Interpreter, args: &[Value]) -> Result<Value> {
    finite("pow", num("pow", "x", &args[0])?.powf(num("pow", "n", &args[1])?))
}

pub(super) fn exp(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("exp", args, f64::exp)
}

pub(super) fn log(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("log", args, f64::ln)
}

pub(super) fn log2(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("log2", args, f64::log2)
}

pub(super) fn log10(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("log10", args, f64::log10)
}

/// Split `x` into a mantissa in [0.5, 1) and a power of two
fn frexp(x: f64) -> (f64, i32) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }
    let bits = x.to_bits();
    let raw = ((bits >> 52) & 0x7ff) as i32;
    if raw == 0 {
        // subnormal
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }
    let mantissa = f64::from_bits((bits & !(0x7ff << 52)) | (1022 << 52));
    (mantissa, raw - 1022)
}

pub(super) fn exponent(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(f64::from(frexp(num("exponent", "x", &args[0])?).1)))
}

pub(super) fn mantissa(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(frexp(num("mantissa", "x", &args[0])?).0))
}

pub(super) fn floor(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(num("floor", "x", &args[0])?.floor()))
}

pub(super) fn ceil(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(num("ceil", "x", &args[0])?.ceil()))
}

fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

pub(super) fn round(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Number(round_half_up(num("round", "x", &args[0])?)))
}

pub(super) fn sqrt(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("sqrt", args, f64::sqrt)
}

pub(super) fn hypot(_: &Interpreter, args: &[Value]) -> Result<Value> {
    finite("hypot", num("hypot", "a", &args[0])?.hypot(num("hypot", "b", &args[1])?))
}

pub(super) fn sin(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("sin", args, f64::sin)
}

pub(super) fn cos(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("cos", args, f64::cos)
}

pub(super) fn tan(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("tan", args, f64::tan)
}

pub(super) fn asin(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("asin", args, f64::asin)
}

pub(super) fn acos(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("acos", args, f64::acos)
}

pub(super) fn atan(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("atan", args, f64::atan)
}

pub(super) fn atan2(_: &Interpreter, args: &[Value]) -> Result<Value> {
    finite("atan2", num("atan2", "y", &args[0])?.atan2(num("atan2", "x", &args[1])?))
}

pub(super) fn deg2rad(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("deg2rad", args, f64::to_radians)
}

pub(super) fn rad2deg(_: &Interpreter, args: &[Value]) -> Result<Value> {
    unary("rad2deg", args, f64::to_degrees)
}

/// `%` as a function: remainder for numbers, formatting for strings
pub(super) fn mod_builtin(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    match (&args[0], &args[1]) {
        (Value::Number(_), Value::Number(_)) | (Value::Str(_), _) => {
            interp.binary(BinaryOp::Mod, &args[0], &args[1])
        }
        (a, b) => Err(runtime(format!(
            "std.mod: operator % cannot be used on types {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

pub(super) fn modulo(interp: &Interpreter, args: &[Value]) -> Result<Value> {
    num("modulo", "x", &args[0])?;
    num("modulo", "y", &args[1])?;
    interp.binary(BinaryOp::Mod, &args[0], &args[1])
}

pub(super) fn is_even(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(round_half_up(num("isEven", "x", &args[0])?) % 2.0 == 0.0))
}

pub(super) fn is_odd(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(round_half_up(num("isOdd", "x", &args[0])?) % 2.0 != 0.0))
}

pub(super) fn is_integer(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let x = num("isInteger", "x", &args[0])?;
    Ok(Value::Bool(round_half_up(x) == x))
}

pub(super) fn is_decimal(_: &Interpreter, args: &[Value]) -> Result<Value> {
    let x = num("isDecimal", "x", &args[0])?;
    Ok(Value::Bool(round_half_up(x) != x))
}

fn boolean(func: &str, param: &str, v: &Value) -> Result<bool> {
    match v {
        Value::Bool(b) => Ok(*b),
        other => Err(type_error(func, param, "a boolean", other)),
    }
}

pub(super) fn xor(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(boolean("xor", "x", &args[0])? != boolean("xor", "y", &args[1])?))
}

pub(super) fn xnor(_: &Interpreter, args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(boolean("xnor", "x", &args[0])? == boolean("xnor", "y", &args[1])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frexp_splits_into_half_open_mantissa() {
        assert_eq!(frexp(1.0), (0.5, 1));
        assert_eq!(frexp(8.0), (0.5, 4));
        assert_eq!(frexp(-3.0), (-0.75, 2));
        assert_eq!(frexp(0.0), (0.0, 0));
        let (m, e) = frexp(f64::MIN_POSITIVE / 4.0);
        assert_eq!(m, 0.5);
        assert_eq!(e, -1023);
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(1.2), 1.0);
    }
}
