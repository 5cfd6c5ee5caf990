//! # Schema Synthesis and the Typed Round Trip
//!
//! [`SchemaBuilder`] is the single construction path for a schema: declare
//! the tag, optionally a version, bind codecs to attributes, provide the
//! constructor, and register. Synthesis walks the record type's attribute
//! table in declaration order and enforces total coverage — every attribute
//! is either bound or defaulted, and every binding names a declared
//! attribute. The result is an immutable [`SchemaDescriptor`] shared between
//! the caller and the registry.
//!
//! ## Emission Order
//!
//! A dumped document's keys are the type tag, the version when declared,
//! then the bound attributes in declaration order. This is a correctness
//! requirement: consumers compare serialized bytes, so repeated dumps must
//! be byte-identical.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use tagform_core::{DumpError, FieldError, LoadError, SchemaError, TaggedDocument, TYPE_KEY, VERSION_KEY};

use crate::fields::FieldCodec;
use crate::record::Record;
use crate::registry::SchemaRegistry;

// ---------------------------------------------------------------------------
// Version tags
// ---------------------------------------------------------------------------

/// A schema revision literal, string or integer, validated for exact match
/// on load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTag {
    /// String revision, e.g. a release identifier.
    Text(String),
    /// Integer revision.
    Number(i64),
}

impl VersionTag {
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => Value::from(*number),
        }
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text}"),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

impl From<&str> for VersionTag {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for VersionTag {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for VersionTag {
    fn from(number: i64) -> Self {
        Self::Number(number)
    }
}

// ---------------------------------------------------------------------------
// Decoded field map
// ---------------------------------------------------------------------------

/// Decoded field values handed to a record constructor, keyed by attribute
/// name. The synthetic tag and version entries are already stripped.
pub struct FieldMap {
    values: HashMap<String, Box<dyn Any + Send>>,
}

impl FieldMap {
    fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    fn insert(&mut self, field: &str, value: Box<dyn Any + Send>) {
        self.values.insert(field.to_owned(), value);
    }

    /// Remove and return the decoded value for `field`.
    ///
    /// Fails with [`LoadError::MissingField`] when the field was not decoded
    /// and with a field-level error when the requested type does not match
    /// what the bound codec produced.
    pub fn take<V: Send + 'static>(&mut self, field: &str) -> Result<V, LoadError> {
        let boxed = self
            .values
            .remove(field)
            .ok_or_else(|| LoadError::MissingField {
                field: field.to_owned(),
            })?;
        boxed.downcast::<V>().map(|value| *value).map_err(|_| {
            LoadError::Field {
                field: field.to_owned(),
                source: FieldError::Invalid(
                    "constructor requested a different type than the bound codec produced".into(),
                ),
            }
        })
    }

    /// Whether a decoded value is present for `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }
}

// ---------------------------------------------------------------------------
// Bound fields
// ---------------------------------------------------------------------------

/// Type-erased binding of one codec to one attribute of `T`.
pub(crate) trait DynField<T>: Send + Sync {
    fn encode(&self, record: &T, registry: &SchemaRegistry) -> Result<Value, FieldError>;
    fn decode(
        &self,
        raw: &Value,
        registry: &SchemaRegistry,
    ) -> Result<Box<dyn Any + Send>, FieldError>;
    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError>;
}

struct BoundField<T, C: FieldCodec> {
    codec: C,
    get: fn(&T) -> &C::Value,
}

impl<T, C: FieldCodec> DynField<T> for BoundField<T, C>
where
    T: Send + Sync,
{
    fn encode(&self, record: &T, registry: &SchemaRegistry) -> Result<Value, FieldError> {
        self.codec.encode((self.get)(record), registry)
    }

    fn decode(
        &self,
        raw: &Value,
        registry: &SchemaRegistry,
    ) -> Result<Box<dyn Any + Send>, FieldError> {
        Ok(Box::new(self.codec.decode(raw, registry)?))
    }

    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError> {
        self.codec.check(registry, owner)
    }
}

struct FieldEntry<T> {
    name: &'static str,
    field: Box<dyn DynField<T>>,
}

type Constructor<T> = Box<dyn Fn(&mut FieldMap) -> Result<T, LoadError> + Send + Sync>;

// ---------------------------------------------------------------------------
// Schema descriptor
// ---------------------------------------------------------------------------

/// The synthesized, immutable description of how one record type serializes.
///
/// Created exactly once per record type by [`SchemaBuilder::register`] and
/// shared as an `Arc` between the caller and the registry.
pub struct SchemaDescriptor<T: Record> {
    tag: String,
    version: Option<VersionTag>,
    fields: Vec<FieldEntry<T>>,
    constructor: Constructor<T>,
}

impl<T: Record> SchemaDescriptor<T> {
    /// The type tag embedded as the first key of every dumped document.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The declared version tag, if any.
    pub fn version(&self) -> Option<&VersionTag> {
        self.version.as_ref()
    }

    /// Bound attribute names in emission order, reserved keys excluded.
    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|entry| entry.name)
    }

    pub(crate) fn dump_with(
        &self,
        record: &T,
        registry: &SchemaRegistry,
    ) -> Result<TaggedDocument, DumpError> {
        let mut document = TaggedDocument::new();
        document.insert(TYPE_KEY, Value::String(self.tag.clone()));
        if let Some(version) = &self.version {
            document.insert(VERSION_KEY, version.to_value());
        }
        for entry in &self.fields {
            let value = entry
                .field
                .encode(record, registry)
                .map_err(|source| DumpError::Field {
                    field: entry.name.to_owned(),
                    source,
                })?;
            document.insert(entry.name, value);
        }
        Ok(document)
    }

    pub(crate) fn load_with(
        &self,
        document: &TaggedDocument,
        registry: &SchemaRegistry,
    ) -> Result<T, LoadError> {
        match document.get(TYPE_KEY) {
            Some(Value::String(tag)) if tag == &self.tag => {}
            other => {
                return Err(LoadError::TagMismatch {
                    expected: self.tag.clone(),
                    actual: other.map(describe_value),
                })
            }
        }

        if let Some(expected) = &self.version {
            let expected_value = expected.to_value();
            match document.get(VERSION_KEY) {
                Some(actual) if actual == &expected_value => {}
                other => {
                    return Err(LoadError::VersionMismatch {
                        expected: expected.to_string(),
                        actual: other.map(describe_value),
                    })
                }
            }
        }

        for key in document.keys() {
            let reserved = key == TYPE_KEY || (self.version.is_some() && key == VERSION_KEY);
            if reserved || self.fields.iter().any(|entry| entry.name == key) {
                continue;
            }
            return Err(LoadError::UnknownField {
                field: key.to_owned(),
            });
        }

        let mut decoded = FieldMap::new();
        for entry in &self.fields {
            let raw = document
                .get(entry.name)
                .ok_or_else(|| LoadError::MissingField {
                    field: entry.name.to_owned(),
                })?;
            let value = entry
                .field
                .decode(raw, registry)
                .map_err(|source| LoadError::Field {
                    field: entry.name.to_owned(),
                    source,
                })?;
            decoded.insert(entry.name, value);
        }

        (self.constructor)(&mut decoded)
    }

    pub(crate) fn check_fields(&self, registry: &SchemaRegistry) -> Result<(), SchemaError> {
        for entry in &self.fields {
            entry.field.check(registry, T::NAME)?;
        }
        Ok(())
    }
}

impl<T: Record> std::fmt::Debug for SchemaDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("name", &T::NAME)
            .field("tag", &self.tag)
            .field("version", &self.version)
            .field("fields", &self.fields.iter().map(|e| e.name).collect::<Vec<_>>())
            .finish()
    }
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Schema builder
// ---------------------------------------------------------------------------

/// Builder for synthesizing a record type's schema.
///
/// # Example
///
/// ```
/// use tagform_schema::{Attribute, Record, SchemaBuilder, SchemaRegistry};
/// use tagform_schema::fields::Text;
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Leaf {
///     name: String,
/// }
///
/// impl Record for Leaf {
///     const NAME: &'static str = "leaf";
///
///     fn attributes() -> &'static [Attribute] {
///         const ATTRS: &[Attribute] = &[Attribute::required("name")];
///         ATTRS
///     }
/// }
///
/// let registry = SchemaRegistry::new();
/// SchemaBuilder::<Leaf>::new("leaf")
///     .field("name", Text, |leaf| &leaf.name)
///     .construct(|fields| {
///         Ok(Leaf {
///             name: fields.take("name")?,
///         })
///     })
///     .register(&registry)
///     .expect("valid schema");
///
/// let document = registry.dump(&Leaf { name: "x".into() }).unwrap();
/// assert_eq!(document.type_tag(), Some("leaf"));
/// ```
pub struct SchemaBuilder<T: Record> {
    tag: String,
    version: Option<VersionTag>,
    bindings: Vec<(&'static str, Box<dyn DynField<T>>)>,
    constructor: Option<Constructor<T>>,
}

impl<T: Record> SchemaBuilder<T> {
    /// Start a schema with the given type tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            version: None,
            bindings: Vec::new(),
            constructor: None,
        }
    }

    /// Declare a version tag, validated for exact match on every load.
    pub fn version(mut self, version: impl Into<VersionTag>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Bind a codec to a declared attribute.
    ///
    /// Binding the same attribute twice replaces only that attribute's
    /// binding; everything else the builder holds is untouched.
    pub fn field<C: FieldCodec>(
        mut self,
        attribute: &'static str,
        codec: C,
        get: fn(&T) -> &C::Value,
    ) -> Self {
        let bound: Box<dyn DynField<T>> = Box::new(BoundField { codec, get });
        match self.bindings.iter_mut().find(|(name, _)| *name == attribute) {
            Some(slot) => slot.1 = bound,
            None => self.bindings.push((attribute, bound)),
        }
        self
    }

    /// Provide the constructor invoked on load with the decoded field map.
    pub fn construct(
        mut self,
        constructor: impl Fn(&mut FieldMap) -> Result<T, LoadError> + Send + Sync + 'static,
    ) -> Self {
        self.constructor = Some(Box::new(constructor));
        self
    }

    /// Synthesize the schema and register it under `T::NAME`.
    ///
    /// Walks the attribute table in declaration order: bound attributes
    /// become document fields, defaulted unbound attributes are skipped, and
    /// a non-defaulted unbound attribute fails with
    /// [`SchemaError::MissingMetadata`]. Bindings that name no declared
    /// attribute fail with [`SchemaError::UnknownAttribute`].
    pub fn register(self, registry: &SchemaRegistry) -> Result<Arc<SchemaDescriptor<T>>, SchemaError> {
        let Self {
            tag,
            version,
            mut bindings,
            constructor,
        } = self;

        let mut fields = Vec::with_capacity(bindings.len());
        for attribute in T::attributes() {
            let position = bindings.iter().position(|(name, _)| *name == attribute.name());
            match position {
                Some(position) => {
                    let (name, field) = bindings.remove(position);
                    fields.push(FieldEntry { name, field });
                }
                None if attribute.has_default() => continue,
                None => {
                    return Err(SchemaError::MissingMetadata {
                        type_name: T::NAME.to_owned(),
                        attribute: attribute.name().to_owned(),
                    })
                }
            }
        }

        if let Some((name, _)) = bindings.first() {
            return Err(SchemaError::UnknownAttribute {
                type_name: T::NAME.to_owned(),
                attribute: (*name).to_owned(),
            });
        }

        let constructor = constructor.ok_or_else(|| SchemaError::MissingConstructor {
            type_name: T::NAME.to_owned(),
        })?;

        let descriptor = Arc::new(SchemaDescriptor {
            tag,
            version,
            fields,
            constructor,
        });
        registry.register::<T>(descriptor.clone())?;
        Ok(descriptor)
    }
}
