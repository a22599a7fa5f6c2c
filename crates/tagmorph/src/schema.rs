//! Destination schemas: the ordered field list a type exposes for decoding.

use std::marker::PhantomData;

use tracing::debug;

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::model::{Capability, CompiledClause, Predicate};
use crate::parser::{compile_clause, parse_annotation};
use crate::slot::{FieldSlot, FieldValue};

/// A type that can be decoded through annotated fields.
///
/// ```
/// use tagmorph::{Decodable, Schema};
///
/// #[derive(Default)]
/// struct Session {
///     expiry: chrono::TimeDelta,
///     name: String,
/// }
///
/// impl Decodable for Session {
///     fn schema() -> Schema<Self> {
///         Schema::builder()
///             .field("Expiry", |s: &mut Session| &mut s.expiry)
///             .annotate("duration,minutes")
///             .field("Name", |s: &mut Session| &mut s.name)
///             .build()
///     }
/// }
///
/// let mut session = Session::default();
/// tagmorph::decode(br#"{"expiry": "30", "name": "Ada"}"#, &mut session).unwrap();
/// assert_eq!(session.expiry, chrono::TimeDelta::minutes(30));
/// assert_eq!(session.name, "Ada");
/// ```
pub trait Decodable: Sized + 'static {
    fn schema() -> Schema<Self>;
}

pub(crate) trait Access<T>: Send + Sync {
    fn slot<'a>(&self, target: &'a mut T) -> &'a mut dyn FieldSlot;
}

struct FnAccess<A, F> {
    access: A,
    _field: PhantomData<fn() -> F>,
}

impl<T, A, F> Access<T> for FnAccess<A, F>
where
    A: Fn(&mut T) -> &mut F + Send + Sync,
    F: FieldValue + 'static,
{
    fn slot<'a>(&self, target: &'a mut T) -> &'a mut dyn FieldSlot {
        (self.access)(target)
    }
}

/// Declared metadata for one destination field.
pub struct FieldSpec<T> {
    pub ident: &'static str,
    pub rename: Option<String>,
    pub skip: bool,
    pub string_encoded: bool,
    pub annotation: String,
    access: Box<dyn Access<T>>,
}

impl<T> FieldSpec<T> {
    /// External name: the rename when present and non-empty, else the identifier.
    pub fn declared_name(&self) -> &str {
        match self.rename.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self.ident,
        }
    }
}

pub struct Schema<T> {
    fields: Vec<FieldSpec<T>>,
    capabilities: Vec<Capability>,
}

impl<T: 'static> Schema<T> {
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            fields: Vec::new(),
            capabilities: Vec::new(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec<T>] {
        &self.fields
    }

    /// Parse and resolve every annotation.
    pub fn compile(self, config: &DecoderConfig) -> Result<Vec<FieldDescriptor<T>>, DecodeError> {
        let capabilities = self.capabilities;
        let descriptors = self
            .fields
            .into_iter()
            .map(|spec| -> Result<FieldDescriptor<T>, DecodeError> {
                let declared_name = spec.declared_name().to_string();
                let clauses = parse_annotation(&spec.annotation, config)
                    .iter()
                    .map(|clause| compile_clause(clause, config, &capabilities))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| err.with_field(declared_name.clone()))?;
                Ok(FieldDescriptor {
                    lookup_key: config.fold_key(&declared_name),
                    declared_name,
                    skip: spec.skip,
                    string_encoded: spec.string_encoded,
                    clauses,
                    access: spec.access,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            fields = descriptors.len(),
            capabilities = capabilities.len(),
            "compiled schema"
        );
        Ok(descriptors)
    }
}

/// Builds a [`Schema`]. Field modifiers (`rename`, `skip`, `string_encoded`,
/// `annotate`) apply to the most recently added field.
pub struct SchemaBuilder<T> {
    fields: Vec<FieldSpec<T>>,
    capabilities: Vec<Capability>,
}

impl<T: 'static> SchemaBuilder<T> {
    pub fn field<A, F>(mut self, ident: &'static str, access: A) -> Self
    where
        A: Fn(&mut T) -> &mut F + Send + Sync + 'static,
        F: FieldValue + 'static,
    {
        self.fields.push(FieldSpec {
            ident,
            rename: None,
            skip: false,
            string_encoded: false,
            annotation: String::new(),
            access: Box::new(FnAccess {
                access,
                _field: PhantomData,
            }),
        });
        self
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.rename = Some(name.into());
        }
        self
    }

    pub fn skip(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.skip = true;
        }
        self
    }

    pub fn string_encoded(mut self) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.string_encoded = true;
        }
        self
    }

    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        if let Some(field) = self.fields.last_mut() {
            field.annotation = annotation.into();
        }
        self
    }

    /// Register a predicate that `empty,<name>` clauses can refer to.
    pub fn capability(mut self, name: &'static str, predicate: Predicate) -> Self {
        self.capabilities.retain(|cap| cap.name != name);
        self.capabilities.push(Capability { name, predicate });
        self
    }

    pub fn build(self) -> Schema<T> {
        Schema {
            fields: self.fields,
            capabilities: self.capabilities,
        }
    }
}

/// A field with its annotation compiled, ready to be resolved and assigned.
pub struct FieldDescriptor<T> {
    pub declared_name: String,
    pub lookup_key: String,
    pub skip: bool,
    pub string_encoded: bool,
    pub clauses: Vec<CompiledClause>,
    access: Box<dyn Access<T>>,
}

impl<T> FieldDescriptor<T> {
    pub fn slot<'a>(&self, target: &'a mut T) -> &'a mut dyn FieldSlot {
        self.access.slot(target)
    }
}
