//! Annotation parser.
//!
//! Clauses are separated by the clause delimiter (`;` by default); within a
//! clause, the name and its arguments are separated by the argument delimiter
//! (`,` by default). A trailing negation marker (`!`) on the name inverts that
//! clause. Example: `equals!,"5";empty`.

use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::model::{
    ArithOp, Capability, CompiledClause, Numeric, OptionClause, Operation, RoundOp, TimeUnit,
};
use crate::tokenizer::{split_quoted, unquote};

/// Split an annotation into its clauses. Blank clauses are dropped, so an
/// empty annotation yields an empty chain.
pub fn parse_annotation(annotation: &str, config: &DecoderConfig) -> Vec<OptionClause> {
    split_quoted(annotation, config.clause_delimiter)
        .into_iter()
        .filter(|clause| !clause.is_empty())
        .map(|clause| parse_clause(&clause, config))
        .collect()
}

fn parse_clause(clause: &str, config: &DecoderConfig) -> OptionClause {
    let mut parts = split_quoted(clause, config.argument_delimiter).into_iter();
    let head = parts.next().unwrap_or_default();
    let (name, inverted) = match head.strip_suffix(config.negation_marker) {
        Some(name) => (name.trim_end().to_string(), true),
        None => (head.clone(), false),
    };
    OptionClause {
        name,
        inverted,
        arguments: parts.map(|arg| unquote(&arg)).collect(),
    }
}

/// Resolve a parsed clause into a typed operation.
pub fn compile_clause(
    clause: &OptionClause,
    config: &DecoderConfig,
    capabilities: &[Capability],
) -> Result<CompiledClause, DecodeError> {
    let label = clause.label(config.negation_marker);
    let args = &clause.arguments;
    let inverted = clause.inverted;

    let operation = match (clause.name.as_str(), inverted) {
        ("duration", _) => {
            expect_at_most(&label, args, 1)?;
            Operation::Duration {
                unit: parse_unit(&label, args.first())?,
                inverted,
            }
        }
        ("unix", false) => {
            expect_at_most(&label, args, 1)?;
            Operation::Unix {
                unit: parse_unit(&label, args.first())?,
            }
        }
        ("nilslice", _) => {
            expect_at_most(&label, args, 0)?;
            Operation::NilSlice { inverted }
        }
        ("nilmap", _) => {
            expect_at_most(&label, args, 0)?;
            Operation::NilMap { inverted }
        }
        ("equals", _) => {
            expect_at_most(&label, args, 1)?;
            Operation::Equals {
                literal: args.first().cloned(),
                inverted,
            }
        }
        ("contains", false) => {
            expect_at_most(&label, args, 0)?;
            Operation::Contains
        }
        ("empty", _) => {
            expect_at_most(&label, args, 1)?;
            let capability = match args.first() {
                Some(name) => Some(
                    capabilities
                        .iter()
                        .find(|cap| cap.name == name)
                        .copied()
                        .ok_or_else(|| {
                            DecodeError::new(
                                DecodeErrorKind::UnknownCapability,
                                format!("unknown capability '{}'", name),
                            )
                            .with_clause(label.clone())
                        })?,
                ),
                None => None,
            };
            Operation::Empty {
                capability,
                inverted,
            }
        }
        ("fromstring", _) => {
            expect_at_most(&label, args, 0)?;
            Operation::FromString { inverted }
        }
        (name @ ("add" | "subtract" | "multiply" | "divide"), false) => {
            let op = match name {
                "add" => ArithOp::Add,
                "subtract" => ArithOp::Subtract,
                "multiply" => ArithOp::Multiply,
                _ => ArithOp::Divide,
            };
            let [arg] = args.as_slice() else {
                return Err(DecodeError::new(
                    DecodeErrorKind::InvalidArgs,
                    format!("clause '{}' requires exactly one argument", label),
                )
                .with_clause(label));
            };
            let operand = Numeric::parse(arg).ok_or_else(|| {
                DecodeError::new(
                    DecodeErrorKind::InvalidArgs,
                    format!("clause '{}' received invalid argument {}", label, arg),
                )
                .with_clause(label.clone())
            })?;
            Operation::Arithmetic { op, operand }
        }
        (name @ ("round" | "floor" | "ceil"), _) => {
            expect_at_most(&label, args, 1)?;
            let op = match name {
                "round" => RoundOp::Round,
                "floor" => RoundOp::Floor,
                _ => RoundOp::Ceil,
            };
            let places = match args.first() {
                Some(arg) => arg.parse::<u8>().map_err(|_| {
                    DecodeError::new(
                        DecodeErrorKind::InvalidArgs,
                        format!("clause '{}' received invalid argument {}", label, arg),
                    )
                    .with_clause(label.clone())
                })?,
                None => 0,
            };
            Operation::Round {
                op,
                places,
                inverted,
            }
        }
        _ => {
            return Err(DecodeError::new(
                DecodeErrorKind::UnknownClause,
                format!("unknown clause '{}'", label),
            )
            .with_clause(label));
        }
    };

    Ok(CompiledClause { label, operation })
}

fn expect_at_most(label: &str, args: &[String], max: usize) -> Result<(), DecodeError> {
    if args.len() > max {
        return Err(DecodeError::new(
            DecodeErrorKind::InvalidArgs,
            format!(
                "clause '{}' accepts at most {} argument(s), got {}",
                label,
                max,
                args.len()
            ),
        )
        .with_clause(label));
    }
    Ok(())
}

fn parse_unit(label: &str, arg: Option<&String>) -> Result<TimeUnit, DecodeError> {
    match arg {
        None => Ok(TimeUnit::Seconds),
        Some(name) => TimeUnit::parse(name).ok_or_else(|| {
            DecodeError::new(
                DecodeErrorKind::InvalidArgs,
                format!("clause '{}' received unknown unit '{}'", label, name),
            )
            .with_clause(label)
        }),
    }
}
