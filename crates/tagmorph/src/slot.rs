//! Destination slots: static shapes and value assignment.
//!
//! Indirection is modelled by the recursive `Option<T>` / `Box<T>` impls. A
//! non-null value allocates every optional layer on its way down to the
//! innermost type; `Null` resolves to `None` at the outermost layer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value as JsonValue;

use crate::error::AssignError;
use crate::value::Value;

/// Static type of a destination field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Bool,
    Int,
    Float,
    String,
    Time,
    Interval,
    Any,
    Seq(Box<Shape>),
    Map(Box<Shape>),
    Optional(Box<Shape>),
}

impl Shape {
    /// The shape below every optional layer.
    pub fn target(&self) -> &Shape {
        let mut shape = self;
        while let Shape::Optional(inner) = shape {
            shape = inner;
        }
        shape
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.target(), Shape::Seq(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.target(), Shape::Map(_))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Bool => write!(f, "bool"),
            Shape::Int => write!(f, "integer"),
            Shape::Float => write!(f, "float"),
            Shape::String => write!(f, "string"),
            Shape::Time => write!(f, "time"),
            Shape::Interval => write!(f, "interval"),
            Shape::Any => write!(f, "any"),
            Shape::Seq(inner) => write!(f, "sequence<{}>", inner),
            Shape::Map(inner) => write!(f, "mapping<{}>", inner),
            Shape::Optional(inner) => write!(f, "optional<{}>", inner),
        }
    }
}

/// A type that can be produced from a [`Value`].
pub trait FieldValue: Sized {
    fn shape() -> Shape;

    fn zero() -> Self;

    fn is_zero(&self) -> bool;

    /// Convert `value`, treating `Null` as the zero value.
    fn from_value(value: Value) -> Result<Self, AssignError>;
}

/// Object-safe view of a destination field.
pub trait FieldSlot {
    fn shape(&self) -> Shape;

    fn is_zero(&self) -> bool;

    fn reset(&mut self);

    fn assign(&mut self, value: Value) -> Result<(), AssignError>;
}

impl<V: FieldValue> FieldSlot for V {
    fn shape(&self) -> Shape {
        V::shape()
    }

    fn is_zero(&self) -> bool {
        FieldValue::is_zero(self)
    }

    fn reset(&mut self) {
        *self = V::zero();
    }

    fn assign(&mut self, value: Value) -> Result<(), AssignError> {
        *self = V::from_value(value)?;
        Ok(())
    }
}

fn mismatch<T: FieldValue>(value: &Value) -> AssignError {
    AssignError::new(T::shape().to_string(), value.type_name())
}

impl FieldValue for bool {
    fn shape() -> Shape {
        Shape::Bool
    }

    fn zero() -> Self {
        false
    }

    fn is_zero(&self) -> bool {
        !*self
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Largest magnitude below which every integer is exactly representable as `f64`.
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn integral(value: &Value) -> Option<i128> {
    match value {
        Value::Int(i) => Some(*i as i128),
        Value::UInt(u) => Some(*u as i128),
        Value::Float(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT => Some(*f as i128),
        _ => None,
    }
}

macro_rules! impl_integer_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn shape() -> Shape {
                    Shape::Int
                }

                fn zero() -> Self {
                    0
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }

                fn from_value(value: Value) -> Result<Self, AssignError> {
                    if value.is_null() {
                        return Ok(0);
                    }
                    integral(&value)
                        .and_then(|i| <$ty>::try_from(i).ok())
                        .ok_or_else(|| AssignError::new(stringify!($ty), value.type_name()))
                }
            }
        )*
    };
}

impl_integer_field!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

macro_rules! impl_float_field {
    ($($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn shape() -> Shape {
                    Shape::Float
                }

                fn zero() -> Self {
                    0.0
                }

                fn is_zero(&self) -> bool {
                    *self == 0.0
                }

                fn from_value(value: Value) -> Result<Self, AssignError> {
                    match value {
                        Value::Null => Ok(0.0),
                        Value::Int(i) => Ok(i as $ty),
                        Value::UInt(u) => Ok(u as $ty),
                        Value::Float(f) => {
                            let narrowed = f as $ty;
                            if f.is_finite() && !narrowed.is_finite() {
                                return Err(AssignError::new(stringify!($ty), "out-of-range float"));
                            }
                            Ok(narrowed)
                        }
                        other => Err(mismatch::<Self>(&other)),
                    }
                }
            }
        )*
    };
}

impl_float_field!(f32, f64);

impl FieldValue for String {
    fn shape() -> Shape {
        Shape::String
    }

    fn zero() -> Self {
        String::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FieldValue for DateTime<Utc> {
    fn shape() -> Shape {
        Shape::Time
    }

    fn zero() -> Self {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::UNIX_EPOCH
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(Self::zero()),
            Value::Time(t) => Ok(t),
            Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| AssignError::new("time", "non-RFC 3339 string")),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FieldValue for TimeDelta {
    fn shape() -> Shape {
        Shape::Interval
    }

    fn zero() -> Self {
        TimeDelta::zero()
    }

    fn is_zero(&self) -> bool {
        TimeDelta::is_zero(self)
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(TimeDelta::zero()),
            Value::Int(nanos) => Ok(TimeDelta::nanoseconds(nanos)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FieldValue for std::time::Duration {
    fn shape() -> Shape {
        Shape::Interval
    }

    fn zero() -> Self {
        std::time::Duration::ZERO
    }

    fn is_zero(&self) -> bool {
        std::time::Duration::is_zero(self)
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(std::time::Duration::ZERO),
            Value::Int(nanos) => u64::try_from(nanos)
                .map(std::time::Duration::from_nanos)
                .map_err(|_| AssignError::new("non-negative interval", "negative integer")),
            Value::UInt(nanos) => Ok(std::time::Duration::from_nanos(nanos)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FieldValue for Value {
    fn shape() -> Shape {
        Shape::Any
    }

    fn zero() -> Self {
        Value::Null
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        Ok(value)
    }
}

impl FieldValue for JsonValue {
    fn shape() -> Shape {
        Shape::Any
    }

    fn zero() -> Self {
        JsonValue::Null
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        Ok(value.to_json())
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }

    fn zero() -> Self {
        Vec::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Seq(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FieldValue> FieldValue for BTreeMap<String, T> {
    fn shape() -> Shape {
        Shape::Map(Box::new(T::shape()))
    }

    fn zero() -> Self {
        BTreeMap::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(BTreeMap::new()),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FieldValue> FieldValue for HashMap<String, T> {
    fn shape() -> Shape {
        Shape::Map(Box::new(T::shape()))
    }

    fn zero() -> Self {
        HashMap::new()
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(HashMap::new()),
            Value::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_value(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }

    fn zero() -> Self {
        None
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }

    fn zero() -> Self {
        Box::new(T::zero())
    }

    fn is_zero(&self) -> bool {
        T::is_zero(self)
    }

    fn from_value(value: Value) -> Result<Self, AssignError> {
        T::from_value(value).map(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_options_allocate_every_layer() {
        let mut slot: Option<Option<Box<i64>>> = None;
        slot.assign(Value::Int(7)).expect("assign should succeed");
        assert_eq!(slot, Some(Some(Box::new(7))));
    }

    #[test]
    fn null_clears_outermost_option() {
        let mut slot: Option<Option<i64>> = Some(Some(3));
        slot.assign(Value::Null).expect("assign should succeed");
        assert_eq!(slot, None);
    }

    #[test]
    fn shape_target_strips_optional_layers() {
        let shape = <Option<Option<Vec<String>>> as FieldValue>::shape();
        assert_eq!(shape.target(), &Shape::Seq(Box::new(Shape::String)));
        assert!(shape.is_sequence());
        assert!(!shape.is_mapping());
    }

    #[test]
    fn narrow_integers_are_range_checked() {
        let mut slot: u8 = 0;
        slot.assign(Value::Int(255)).expect("255 fits in u8");
        assert_eq!(slot, 255);
        let err = slot.assign(Value::Int(256)).unwrap_err();
        assert_eq!(err.expected, "u8");
        assert!(slot.assign(Value::Int(-1)).is_err());
    }

    #[test]
    fn integral_floats_fit_integer_fields() {
        let mut slot: i64 = 0;
        slot.assign(Value::Float(4.0)).expect("integral float");
        assert_eq!(slot, 4);
        let err = slot.assign(Value::Float(5.5)).unwrap_err();
        assert_eq!(err.found, "float");
    }

    #[test]
    fn large_unsigned_integers_stay_exact() {
        let mut slot: u64 = 0;
        slot.assign(Value::UInt(12_345_678_901_234_567_891))
            .expect("fits in u64");
        assert_eq!(slot, 12_345_678_901_234_567_891);

        let mut signed: i64 = 0;
        let err = signed.assign(Value::UInt(u64::MAX)).unwrap_err();
        assert_eq!(err.expected, "i64");
        assert_eq!(err.found, "integer");
    }

    #[test]
    fn inexact_floats_are_not_truncated_into_integers() {
        let mut slot: u64 = 0;
        slot.assign(Value::Float(9_007_199_254_740_992.0))
            .expect("exactly representable");
        assert_eq!(slot, 9_007_199_254_740_992);
        let err = slot.assign(Value::Float(1.2345678901234567e19)).unwrap_err();
        assert_eq!(err.found, "float");
    }

    #[test]
    fn narrow_float_fields_are_range_checked() {
        let mut slot: f32 = 0.0;
        slot.assign(Value::Float(1.5)).expect("fits in f32");
        assert_eq!(slot, 1.5);
        let err = slot.assign(Value::Float(1e39)).unwrap_err();
        assert_eq!(err.expected, "f32");
        assert_eq!(slot, 1.5);
        slot.assign(Value::Float(f64::INFINITY))
            .expect("infinity is representable");
        assert!(slot.is_infinite());
    }

    #[test]
    fn integers_promote_into_float_fields() {
        let mut slot: f64 = 0.0;
        slot.assign(Value::Int(3)).expect("int promotes");
        assert_eq!(slot, 3.0);
    }

    #[test]
    fn interval_fields_take_nanoseconds() {
        let mut delta = TimeDelta::zero();
        delta.assign(Value::Int(1_500_000_000)).expect("nanoseconds");
        assert_eq!(delta, TimeDelta::milliseconds(1500));

        let mut std_duration = std::time::Duration::ZERO;
        std_duration.assign(Value::Int(2_000)).expect("nanoseconds");
        assert_eq!(std_duration, std::time::Duration::from_micros(2));
        assert!(std_duration.assign(Value::Int(-1)).is_err());
    }

    #[test]
    fn time_fields_accept_rfc3339_strings() {
        let mut slot = DateTime::<Utc>::UNIX_EPOCH;
        slot.assign(Value::String("2024-01-02T03:04:05Z".to_string()))
            .expect("rfc3339");
        assert_eq!(slot.to_rfc3339(), "2024-01-02T03:04:05+00:00");
        assert!(slot.assign(Value::String("yesterday".to_string())).is_err());
        assert!(slot.assign(Value::Int(5)).is_err());
    }

    #[test]
    fn collections_convert_elementwise() {
        let mut list: Vec<Option<i32>> = Vec::new();
        list.assign(Value::Seq(vec![Value::Int(1), Value::Null]))
            .expect("sequence");
        assert_eq!(list, vec![Some(1), None]);

        let mut map: HashMap<String, String> = HashMap::new();
        let mut entries = BTreeMap::new();
        entries.insert("a".to_string(), Value::String("b".to_string()));
        map.assign(Value::Map(entries)).expect("mapping");
        assert_eq!(map.get("a").map(String::as_str), Some("b"));

        let err = list.assign(Value::String("x".to_string())).unwrap_err();
        assert_eq!(err.expected, "sequence<optional<integer>>");
    }

    #[test]
    fn reset_restores_zero() {
        let mut slot: Option<String> = Some("x".to_string());
        slot.reset();
        assert!(FieldSlot::is_zero(&slot));
    }
}
