//! Built-in operators and functions
//!
//! Standard operator processors for every symbol of the grammar, and the
//! stateless function library: scale, clamp, abs, sign, sqrt, floor, ceil,
//! round, pow, remap, min, max, avg, rand.
//!
//! Every processor propagates NaN operands and answers NaN instead of
//! panicking on bad input, so a degraded input never aborts an evaluation.

use crate::evaluator::truthy;
use crate::registry::Registry;
use crate::token::{BinaryOp, UnaryOp};

// === Operators ===

fn from_bool(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Operand as a 32-bit signed integer, if it is exactly representable
pub fn as_i32(value: f64) -> Option<i32> {
    if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Some(value as i32)
    } else {
        None
    }
}

fn bitwise(a: f64, b: f64, op: impl Fn(i32, i32) -> i32) -> f64 {
    match (as_i32(a), as_i32(b)) {
        (Some(a), Some(b)) => f64::from(op(a, b)),
        _ => f64::NAN,
    }
}

fn compare(a: f64, b: f64, op: impl Fn(f64, f64) -> bool) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        from_bool(op(a, b))
    }
}

fn logical(a: f64, b: f64, op: impl Fn(bool, bool) -> bool) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        from_bool(op(truthy(a), truthy(b)))
    }
}

/// Register a processor for every unary and binary operator
pub fn register_operators(registry: &mut Registry) {
    registry
        .register_unary(UnaryOp::Plus, |v| v)
        .register_unary(UnaryOp::Minus, |v| -v)
        .register_unary(UnaryOp::Not, |v| {
            if v.is_nan() {
                f64::NAN
            } else {
                from_bool(!truthy(v))
            }
        })
        .register_unary(UnaryOp::BitNot, |v| as_i32(v).map_or(f64::NAN, |i| f64::from(!i)));

    registry
        .register_binary(BinaryOp::Add, |a, b| a + b)
        .register_binary(BinaryOp::Subtract, |a, b| a - b)
        .register_binary(BinaryOp::Multiply, |a, b| a * b)
        .register_binary(BinaryOp::Divide, |a, b| a / b)
        .register_binary(BinaryOp::Modulo, |a, b| a % b)
        .register_binary(BinaryOp::And, |a, b| logical(a, b, |a, b| a && b))
        .register_binary(BinaryOp::Or, |a, b| logical(a, b, |a, b| a || b))
        .register_binary(BinaryOp::BitAnd, |a, b| bitwise(a, b, |a, b| a & b))
        .register_binary(BinaryOp::BitOr, |a, b| bitwise(a, b, |a, b| a | b))
        .register_binary(BinaryOp::BitXor, |a, b| bitwise(a, b, |a, b| a ^ b))
        .register_binary(BinaryOp::ShiftLeft, |a, b| {
            bitwise(a, b, |a, b| a.wrapping_shl(b as u32))
        })
        .register_binary(BinaryOp::ShiftRight, |a, b| {
            bitwise(a, b, |a, b| a.wrapping_shr(b as u32))
        })
        .register_binary(BinaryOp::Greater, |a, b| compare(a, b, |a, b| a > b))
        .register_binary(BinaryOp::GreaterEqual, |a, b| compare(a, b, |a, b| a >= b))
        .register_binary(BinaryOp::Less, |a, b| compare(a, b, |a, b| a < b))
        .register_binary(BinaryOp::LessEqual, |a, b| compare(a, b, |a, b| a <= b))
        .register_binary(BinaryOp::Equal, |a, b| compare(a, b, |a, b| a == b))
        .register_binary(BinaryOp::NotEqual, |a, b| compare(a, b, |a, b| a != b));
}

// === Stateless functions ===

/// Scale a value by a factor
pub fn scale(value: f64, factor: f64) -> f64 {
    value * factor
}

/// Clamp a value to a range; NaN when the range is inverted or NaN
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() || min.is_nan() || max.is_nan() || min > max {
        return f64::NAN;
    }
    value.clamp(min, max)
}

/// Absolute value
pub fn abs(value: f64) -> f64 {
    value.abs()
}

/// Round to specified decimal places
pub fn round(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Sign function: returns -1, 0, or 1
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else if value == 0.0 {
        0.0
    } else {
        f64::NAN
    }
}

/// Linear map of `value` from `[in_min, in_max]` onto `[out_min, out_max]`
///
/// Not clamped: values outside the input range extrapolate.
pub fn remap(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    if in_max == in_min {
        return f64::NAN;
    }
    out_min + (value - in_min) * (out_max - out_min) / (in_max - in_min)
}

/// Smallest of the values; NaN when empty or any value is NaN
pub fn min(values: &[f64]) -> f64 {
    fold(values, f64::min)
}

/// Largest of the values; NaN when empty or any value is NaN
pub fn max(values: &[f64]) -> f64 {
    fold(values, f64::max)
}

/// Arithmetic mean; NaN when empty
pub fn avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn fold(values: &[f64], op: fn(f64, f64) -> f64) -> f64 {
    if values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }
    values.iter().copied().reduce(op).unwrap_or(f64::NAN)
}

/// Uniform random value in `[low, high)`
pub fn rand_range(low: f64, high: f64) -> f64 {
    if low > high {
        return f64::NAN;
    }
    low + rand::random::<f64>() * (high - low)
}

fn any_nan(args: &[f64]) -> bool {
    args.iter().any(|v| v.is_nan())
}

/// Adapt a fixed-arity function to the slice calling convention;
/// any other argument count, or a NaN argument, yields NaN
fn fixed<const N: usize>(f: fn([f64; N]) -> f64) -> impl Fn(&[f64]) -> f64 + Send + Sync {
    move |args: &[f64]| {
        if any_nan(args) {
            return f64::NAN;
        }
        <[f64; N]>::try_from(args).map_or(f64::NAN, f)
    }
}

/// Register the built-in function library
pub fn register_functions(registry: &mut Registry) {
    registry
        .register_function("scale", fixed::<2>(|[v, factor]| scale(v, factor)))
        .register_function("clamp", fixed::<3>(|[v, lo, hi]| clamp(v, lo, hi)))
        .register_function("abs", fixed::<1>(|[v]| abs(v)))
        .register_function("sign", fixed::<1>(|[v]| sign(v)))
        .register_function("sqrt", fixed::<1>(|[v]| v.sqrt()))
        .register_function("floor", fixed::<1>(|[v]| v.floor()))
        .register_function("ceil", fixed::<1>(|[v]| v.ceil()))
        .register_function("pow", fixed::<2>(|[base, exp]| base.powf(exp)))
        .register_function(
            "remap",
            fixed::<5>(|[v, in_min, in_max, out_min, out_max]| {
                remap(v, in_min, in_max, out_min, out_max)
            }),
        )
        .register_function("round", |args| match *args {
            _ if any_nan(args) => f64::NAN,
            [v] => v.round(),
            [v, decimals] => as_i32(decimals).map_or(f64::NAN, |d| round(v, d)),
            _ => f64::NAN,
        })
        .register_function("min", min)
        .register_function("max", max)
        .register_function("avg", avg)
        .register_function("rand", |args| match *args {
            _ if any_nan(args) => f64::NAN,
            [] => rand::random::<f64>(),
            [low, high] => rand_range(low, high),
            _ => f64::NAN,
        });
}
