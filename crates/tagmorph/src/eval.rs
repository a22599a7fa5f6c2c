//! Clause dispatcher: threads one current value through a field's chain.

use chrono::{TimeDelta, Utc};
use serde_json::Value as JsonValue;
use tracing::trace;

use crate::coerce::{arithmetic, compare, parse_epoch, parse_interval, round};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::model::{CompiledClause, Operation};
use crate::slot::Shape;
use crate::value::Value;

/// What the destination field sees about itself while its chain runs.
#[derive(Debug, Clone)]
pub struct FieldContext<'a> {
    pub name: &'a str,
    pub shape: Shape,
    /// Whether the destination held its zero value before the chain started.
    pub was_zero: bool,
}

/// Result of a single clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue(Value),
    Stop,
}

/// Result of a whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Assign(Value),
    Clear,
}

pub fn eval_chain(
    clauses: &[CompiledClause],
    value: Value,
    ctx: &FieldContext<'_>,
) -> Result<Outcome, DecodeError> {
    let mut current = value;
    for clause in clauses {
        trace!(field = ctx.name, clause = %clause.label, "applying clause");
        match eval_clause(clause, current, ctx) {
            Ok(Flow::Continue(next)) => current = next,
            Ok(Flow::Stop) => {
                trace!(field = ctx.name, clause = %clause.label, "clause cleared field");
                return Ok(Outcome::Clear);
            }
            Err(err) => {
                return Err(err.with_field(ctx.name).with_clause(clause.label.clone()));
            }
        }
    }
    Ok(Outcome::Assign(current))
}

pub fn eval_clause(
    clause: &CompiledClause,
    value: Value,
    ctx: &FieldContext<'_>,
) -> Result<Flow, DecodeError> {
    let next = match &clause.operation {
        Operation::Duration { unit, inverted } => {
            let nanos = parse_interval(&value, *unit)?;
            if *inverted {
                Utc::now()
                    .checked_add_signed(TimeDelta::nanoseconds(nanos))
                    .map(Value::Time)
                    .ok_or_else(|| {
                        DecodeError::new(
                            DecodeErrorKind::ArithmeticFailed,
                            "now plus interval is out of range",
                        )
                    })?
            } else {
                Value::Int(nanos)
            }
        }
        Operation::Unix { unit } => Value::Time(parse_epoch(&value, *unit)?),
        Operation::NilSlice { inverted } => {
            require_shape(ctx, ctx.shape.is_sequence(), "a sequence")?;
            match value {
                Value::Null if !*inverted => Value::Seq(Vec::new()),
                Value::Seq(items) if *inverted && items.is_empty() => Value::Null,
                other => other,
            }
        }
        Operation::NilMap { inverted } => {
            require_shape(ctx, ctx.shape.is_mapping(), "a mapping")?;
            match value {
                Value::Null if !*inverted => Value::Map(Default::default()),
                Value::Map(entries) if *inverted && entries.is_empty() => Value::Null,
                other => other,
            }
        }
        Operation::Equals { literal, inverted } => {
            let equal = match literal {
                Some(literal) => compare(&value, literal),
                None => ctx.was_zero,
            };
            Value::Bool(equal != *inverted)
        }
        Operation::Contains => Value::Bool(true),
        Operation::Empty {
            capability,
            inverted,
        } => {
            let empty = value.is_zero()
                || capability.is_some_and(|capability| (capability.predicate)(&value));
            if empty != *inverted {
                return Ok(Flow::Stop);
            }
            value
        }
        Operation::FromString { inverted: false } => match value {
            Value::String(s) => serde_json::from_str::<JsonValue>(&s)
                .map(Value::from)
                .map_err(|err| {
                    DecodeError::new(
                        DecodeErrorKind::ParseFailed,
                        format!("embedded document is invalid: {}", err),
                    )
                })?,
            other => {
                return Err(DecodeError::new(
                    DecodeErrorKind::TypeMismatch,
                    format!("expected a string, got {}", other.type_name()),
                ));
            }
        },
        Operation::FromString { inverted: true } => match value {
            Value::String(_) => {
                return Err(DecodeError::new(
                    DecodeErrorKind::TypeMismatch,
                    "expected a non-string value, got string",
                ));
            }
            other => Value::String(other.render()),
        },
        Operation::Arithmetic { op, operand } => arithmetic(*op, &value, *operand)?,
        Operation::Round {
            op,
            places,
            inverted,
        } => round(*op, &value, *places, *inverted)?,
    };
    Ok(Flow::Continue(next))
}

fn require_shape(ctx: &FieldContext<'_>, ok: bool, expected: &str) -> Result<(), DecodeError> {
    if ok {
        return Ok(());
    }
    Err(DecodeError::new(
        DecodeErrorKind::TypeMismatch,
        format!("field must be {}, found {}", expected, ctx.shape),
    ))
}
