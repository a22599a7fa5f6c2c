//! Field resolution and the decode entry points.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::eval::{FieldContext, Outcome, eval_chain};
use crate::schema::{Decodable, FieldDescriptor, Schema};
use crate::value::Value;

/// Top-level entries of a decoded document, keyed by folded name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: HashMap<String, Value>,
}

impl Document {
    /// Build a document from a decoded JSON object. Keys are folded with
    /// `config`; when two keys fold to the same name the later one in key
    /// order wins.
    pub fn from_json(value: JsonValue, config: &DecoderConfig) -> Result<Self, DecodeError> {
        let object = match value {
            JsonValue::Object(object) => object,
            other => {
                return Err(DecodeError::new(
                    DecodeErrorKind::InvalidDocument,
                    format!(
                        "document must be an object, got {}",
                        Value::from(other).type_name()
                    ),
                ));
            }
        };
        let entries = object
            .into_iter()
            .map(|(key, value)| (config.fold_key(&key), Value::from(value)))
            .collect();
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compiled schema for `T`, reusable across decode calls.
pub struct Decoder<T> {
    config: DecoderConfig,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: Decodable> Decoder<T> {
    pub fn new() -> Result<Self, DecodeError> {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Result<Self, DecodeError> {
        Self::from_schema(T::schema(), config)
    }
}

impl<T: 'static> Decoder<T> {
    pub fn from_schema(schema: Schema<T>, config: DecoderConfig) -> Result<Self, DecodeError> {
        config.validate()?;
        let fields = schema.compile(&config)?;
        Ok(Self { config, fields })
    }

    pub fn decode(&self, bytes: &[u8], target: &mut T) -> Result<(), DecodeError> {
        let document: JsonValue = serde_json::from_slice(bytes)?;
        self.decode_value(document, target)
    }

    pub fn decode_str(&self, input: &str, target: &mut T) -> Result<(), DecodeError> {
        let document: JsonValue = serde_json::from_str(input)?;
        self.decode_value(document, target)
    }

    pub fn decode_value(&self, document: JsonValue, target: &mut T) -> Result<(), DecodeError> {
        let document = Document::from_json(document, &self.config)?;
        self.decode_document(&document, target)
    }

    /// Apply every field in declaration order. The first error aborts; fields
    /// written before it keep their new values.
    pub fn decode_document(&self, document: &Document, target: &mut T) -> Result<(), DecodeError> {
        for field in &self.fields {
            apply_field(field, document, target)?;
        }
        Ok(())
    }
}

fn apply_field<T>(
    field: &FieldDescriptor<T>,
    document: &Document,
    target: &mut T,
) -> Result<(), DecodeError> {
    if field.skip {
        return Ok(());
    }

    let slot = field.slot(target);
    let Some(raw) = document.get(&field.lookup_key) else {
        debug!(field = %field.declared_name, "key absent, resetting to zero value");
        slot.reset();
        return Ok(());
    };

    let value = if field.string_encoded {
        decode_embedded(raw).map_err(|err| err.with_field(field.declared_name.clone()))?
    } else {
        raw.clone()
    };

    let ctx = FieldContext {
        name: &field.declared_name,
        shape: slot.shape(),
        was_zero: slot.is_zero(),
    };
    match eval_chain(&field.clauses, value, &ctx)? {
        Outcome::Assign(value) => {
            trace!(field = %field.declared_name, kind = value.type_name(), "assigning");
            slot.assign(value)
                .map_err(|err| DecodeError::from(err).with_field(field.declared_name.clone()))
        }
        Outcome::Clear => {
            slot.reset();
            Ok(())
        }
    }
}

fn decode_embedded(raw: &Value) -> Result<Value, DecodeError> {
    match raw {
        Value::String(s) => serde_json::from_str::<JsonValue>(s)
            .map(Value::from)
            .map_err(|err| {
                DecodeError::new(
                    DecodeErrorKind::ParseFailed,
                    format!("string-encoded value is invalid: {}", err),
                )
            }),
        other => Err(DecodeError::new(
            DecodeErrorKind::TypeMismatch,
            format!("string-encoded field holds {}", other.type_name()),
        )),
    }
}
