mod coerce;
mod config;
mod decode;
mod error;
mod schema;
mod slot;
mod tokenizer;
mod value;
pub mod eval;
pub mod model;
pub mod parser;

pub use config::DecoderConfig;
pub use decode::{Decoder, Document};
pub use error::{AssignError, DecodeError, DecodeErrorKind};
pub use eval::{FieldContext, Outcome, eval_chain};
pub use model::{Capability, CompiledClause, OptionClause, Operation, Predicate, TimeUnit};
pub use parser::{compile_clause, parse_annotation};
pub use schema::{Decodable, FieldDescriptor, FieldSpec, Schema, SchemaBuilder};
pub use slot::{FieldSlot, FieldValue, Shape};
pub use tokenizer::split_quoted;
pub use value::Value;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value as JsonValue;

type CachedDecoder = Arc<dyn Any + Send + Sync>;

fn decoder_cache() -> &'static Mutex<HashMap<TypeId, CachedDecoder>> {
    static DECODER_CACHE: OnceLock<Mutex<HashMap<TypeId, CachedDecoder>>> = OnceLock::new();
    DECODER_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Compiled decoder for `T` with the default configuration. Schemas that fail
/// to compile are not cached.
pub fn cached_decoder<T: Decodable>() -> Result<Arc<Decoder<T>>, DecodeError> {
    let key = TypeId::of::<T>();
    if let Some(entry) = {
        let cache = decoder_cache().lock().unwrap_or_else(|err| err.into_inner());
        cache.get(&key).cloned()
    } {
        if let Ok(decoder) = entry.downcast::<Decoder<T>>() {
            return Ok(decoder);
        }
    }

    let decoder = Arc::new(Decoder::<T>::new()?);
    {
        let mut cache = decoder_cache().lock().unwrap_or_else(|err| err.into_inner());
        cache.insert(key, decoder.clone());
    }
    Ok(decoder)
}

/// Decode a JSON object into `target`.
pub fn decode<T: Decodable>(bytes: &[u8], target: &mut T) -> Result<(), DecodeError> {
    cached_decoder::<T>()?.decode(bytes, target)
}

pub fn decode_str<T: Decodable>(input: &str, target: &mut T) -> Result<(), DecodeError> {
    cached_decoder::<T>()?.decode_str(input, target)
}

pub fn decode_value<T: Decodable>(document: JsonValue, target: &mut T) -> Result<(), DecodeError> {
    cached_decoder::<T>()?.decode_value(document, target)
}
