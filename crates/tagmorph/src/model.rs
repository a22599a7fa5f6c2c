//! Annotation types: raw clauses and their compiled operations.

use crate::value::Value;

/// Predicate registered on a schema under a capability name, used by `empty`.
pub type Predicate = fn(&Value) -> bool;

/// A named predicate resolved from a schema's capability registry.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    pub name: &'static str,
    pub predicate: Predicate,
}

impl PartialEq for Capability {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// One parsed clause of an annotation, before compilation.
///
/// `inverted` is set when the name carries the negation marker; it applies to
/// this clause only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionClause {
    pub name: String,
    pub inverted: bool,
    pub arguments: Vec<String>,
}

impl OptionClause {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inverted: false,
            arguments: Vec::new(),
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Name as written in the annotation, used in error messages.
    pub fn label(&self, negation_marker: char) -> String {
        if self.inverted {
            format!("{}{}", self.name, negation_marker)
        } else {
            self.name.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl TimeUnit {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "nanoseconds" => Some(TimeUnit::Nanoseconds),
            "microseconds" => Some(TimeUnit::Microseconds),
            "milliseconds" => Some(TimeUnit::Milliseconds),
            "seconds" => Some(TimeUnit::Seconds),
            "minutes" => Some(TimeUnit::Minutes),
            "hours" => Some(TimeUnit::Hours),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "nanoseconds",
            TimeUnit::Microseconds => "microseconds",
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
        }
    }

    pub fn nanos(&self) -> i64 {
        match self {
            TimeUnit::Nanoseconds => 1,
            TimeUnit::Microseconds => 1_000,
            TimeUnit::Milliseconds => 1_000_000,
            TimeUnit::Seconds => 1_000_000_000,
            TimeUnit::Minutes => 60_000_000_000,
            TimeUnit::Hours => 3_600_000_000_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOp {
    Round,
    Floor,
    Ceil,
}

impl RoundOp {
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            RoundOp::Round => v.round(),
            RoundOp::Floor => v.floor(),
            RoundOp::Ceil => v.ceil(),
        }
    }
}

/// Numeric literal or parsed numeric string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    /// Integer first, falling back to a finite float.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return Some(Numeric::Int(i));
        }
        s.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Numeric::Float)
    }
}

/// A compiled clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Duration { unit: TimeUnit, inverted: bool },
    Unix { unit: TimeUnit },
    NilSlice { inverted: bool },
    NilMap { inverted: bool },
    Equals { literal: Option<String>, inverted: bool },
    Contains,
    Empty { capability: Option<Capability>, inverted: bool },
    FromString { inverted: bool },
    Arithmetic { op: ArithOp, operand: Numeric },
    Round { op: RoundOp, places: u8, inverted: bool },
}

/// A compiled clause plus the label it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledClause {
    pub label: String,
    pub operation: Operation,
}
