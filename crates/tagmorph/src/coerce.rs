//! Pure coercion helpers used by the clause dispatcher.

use chrono::{DateTime, Utc};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::model::{ArithOp, Numeric, RoundOp, TimeUnit};
use crate::value::Value;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Read a numeric value or numeric string.
pub fn numeric(value: &Value) -> Result<Numeric, DecodeError> {
    let parsed = match value {
        Value::Int(i) => Some(Numeric::Int(*i)),
        Value::UInt(u) => Some(Numeric::Float(*u as f64)),
        Value::Float(f) if f.is_finite() => Some(Numeric::Float(*f)),
        Value::String(s) => Numeric::parse(s),
        _ => None,
    };
    parsed.ok_or_else(|| {
        DecodeError::new(
            DecodeErrorKind::ParseFailed,
            format!("invalid number {}", value.render()),
        )
    })
}

fn scaled_nanos(n: Numeric, unit: TimeUnit) -> Option<i128> {
    let per_unit = unit.nanos() as i128;
    match n {
        Numeric::Int(i) => Some(i as i128 * per_unit),
        Numeric::Float(f) => {
            let whole = f.trunc();
            if whole.abs() >= 9.2e18 {
                return None;
            }
            let frac = ((f - whole) * per_unit as f64).round() as i128;
            Some(whole as i128 * per_unit + frac)
        }
    }
}

/// Parse `value` in `unit` into an interval of nanoseconds.
pub fn parse_interval(value: &Value, unit: TimeUnit) -> Result<i64, DecodeError> {
    let n = numeric(value)?;
    scaled_nanos(n, unit)
        .and_then(|nanos| i64::try_from(nanos).ok())
        .ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::ParseFailed,
                format!("interval {} {} is out of range", value.render(), unit.as_str()),
            )
        })
}

/// Parse `value` as an offset from the Unix epoch in `unit`.
pub fn parse_epoch(value: &Value, unit: TimeUnit) -> Result<DateTime<Utc>, DecodeError> {
    let n = numeric(value)?;
    scaled_nanos(n, unit)
        .and_then(|nanos| {
            let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND)).ok()?;
            let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
            DateTime::from_timestamp(secs, subsec)
        })
        .ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::ParseFailed,
                format!("timestamp {} {} is out of range", value.render(), unit.as_str()),
            )
        })
}

/// Typed comparison against a literal. Unsupported variants compare unequal.
pub fn compare(value: &Value, literal: &str) -> bool {
    match value {
        Value::Bool(b) => (literal == "true" && *b) || (literal == "false" && !*b),
        Value::Int(i) => literal.parse::<i64>().is_ok_and(|arg| arg == *i),
        Value::UInt(u) => literal.parse::<u64>().is_ok_and(|arg| arg == *u),
        Value::Float(f) => literal.parse::<f64>().is_ok_and(|arg| arg == *f),
        _ => false,
    }
}

fn arithmetic_error(message: impl Into<String>) -> DecodeError {
    DecodeError::new(DecodeErrorKind::ArithmeticFailed, message)
}

fn not_a_number(value: &Value) -> DecodeError {
    DecodeError::new(
        DecodeErrorKind::TypeMismatch,
        format!("expected a number, got {}", value.type_name()),
    )
}

/// Apply `op` between `value` and `operand`. Integers stay integers unless
/// the operand is fractional.
pub fn arithmetic(op: ArithOp, value: &Value, operand: Numeric) -> Result<Value, DecodeError> {
    match (value, operand) {
        (Value::Int(a), Numeric::Int(b)) => {
            let result = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Subtract => a.checked_sub(b),
                ArithOp::Multiply => a.checked_mul(b),
                ArithOp::Divide => {
                    if b == 0 {
                        return Err(arithmetic_error("division by zero"));
                    }
                    a.checked_div(b)
                }
            };
            result
                .map(Value::Int)
                .ok_or_else(|| arithmetic_error("integer overflow"))
        }
        (Value::UInt(a), Numeric::Int(b)) => {
            let (a, b) = (*a as i128, b as i128);
            let result = match op {
                ArithOp::Add => a.checked_add(b),
                ArithOp::Subtract => a.checked_sub(b),
                ArithOp::Multiply => a.checked_mul(b),
                ArithOp::Divide => {
                    if b == 0 {
                        return Err(arithmetic_error("division by zero"));
                    }
                    a.checked_div(b)
                }
            };
            result
                .and_then(integer_value)
                .ok_or_else(|| arithmetic_error("integer overflow"))
        }
        (Value::Int(a), Numeric::Float(b)) => float_arithmetic(op, *a as f64, b),
        (Value::UInt(a), Numeric::Float(b)) => float_arithmetic(op, *a as f64, b),
        (Value::Float(a), Numeric::Int(b)) => float_arithmetic(op, *a, b as f64),
        (Value::Float(a), Numeric::Float(b)) => float_arithmetic(op, *a, b),
        (other, _) => Err(not_a_number(other)),
    }
}

fn float_arithmetic(op: ArithOp, a: f64, b: f64) -> Result<Value, DecodeError> {
    let result = match op {
        ArithOp::Add => a + b,
        ArithOp::Subtract => a - b,
        ArithOp::Multiply => a * b,
        ArithOp::Divide => {
            if b == 0.0 {
                return Err(arithmetic_error("division by zero"));
            }
            a / b
        }
    };
    if !result.is_finite() {
        return Err(arithmetic_error("result is not finite"));
    }
    Ok(Value::Float(result))
}

/// Round `value` at `places` decimal places. Inverted rounding shifts the
/// other way, rounding to a multiple of `10^places`.
pub fn round(op: RoundOp, value: &Value, places: u8, inverted: bool) -> Result<Value, DecodeError> {
    match value {
        Value::Float(v) => {
            if places == 0 {
                return float_to_int(op.apply(*v));
            }
            let factor = 10f64.powi(places as i32);
            let shifted = if inverted { v / factor } else { v * factor };
            if !shifted.is_finite() {
                return Err(arithmetic_error(format!(
                    "{} cannot be rounded at {} places",
                    v, places
                )));
            }
            let result = if inverted {
                op.apply(shifted) * factor
            } else {
                op.apply(shifted) / factor
            };
            if !result.is_finite() {
                return Err(arithmetic_error("result is not finite"));
            }
            Ok(Value::Float(result))
        }
        Value::Int(_) | Value::UInt(_) if !inverted || places == 0 => Ok(value.clone()),
        Value::Int(i) => round_integer(op, *i as i128, places),
        Value::UInt(u) => round_integer(op, *u as i128, places),
        other => Err(not_a_number(other)),
    }
}

fn float_to_int(v: f64) -> Result<Value, DecodeError> {
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Ok(Value::Int(v as i64))
    } else {
        Err(arithmetic_error(format!("{} does not fit an integer", v)))
    }
}

/// Narrow an exact integer result back into `Int`, or `UInt` above `i64::MAX`.
fn integer_value(i: i128) -> Option<Value> {
    if let Ok(i) = i64::try_from(i) {
        return Some(Value::Int(i));
    }
    u64::try_from(i).ok().map(Value::UInt)
}

fn round_integer(op: RoundOp, i: i128, places: u8) -> Result<Value, DecodeError> {
    let multiple = 10i128
        .checked_pow(places as u32)
        .ok_or_else(|| arithmetic_error(format!("10^{} overflows an integer", places)))?;
    round_to_multiple(op, i, multiple)
        .and_then(integer_value)
        .ok_or_else(|| arithmetic_error("integer overflow"))
}

fn round_to_multiple(op: RoundOp, i: i128, multiple: i128) -> Option<i128> {
    let quotient = i.div_euclid(multiple);
    let remainder = i.rem_euclid(multiple);
    let upper = multiple - remainder;
    let quotient = match op {
        RoundOp::Floor => quotient,
        RoundOp::Ceil if remainder == 0 => quotient,
        RoundOp::Ceil => quotient + 1,
        // half away from zero
        RoundOp::Round => {
            if remainder > upper || (remainder == upper && i > 0) {
                quotient + 1
            } else {
                quotient
            }
        }
    };
    quotient.checked_mul(multiple)
}
