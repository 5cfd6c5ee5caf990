//! # Field Codecs
//!
//! The field-level serialization boundary. A [`FieldCodec`] converts one
//! typed attribute value to and from a `serde_json::Value`, validating in
//! both directions. The schema engine never looks past this trait: it binds
//! a codec to an attribute and invokes the encode/decode/check contract.
//!
//! Built-in kinds: [`Text`], [`Integer`], [`Boolean`], [`Real`], [`Email`],
//! [`Constant`], [`Optional`], [`ListOf`], [`Nested`], and [`Raw`]. The
//! polymorphic sequence codec lives in [`crate::poly`].
//!
//! [`Nested`] resolves its target schema through the registry at call time,
//! not at construction, so a record type can nest itself or a type whose
//! schema does not exist yet.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use tagform_core::{value_kind, DumpError, FieldError, LoadError, SchemaError, TaggedDocument};

use crate::record::Record;
use crate::registry::SchemaRegistry;

/// A field-level codec: one typed value to and from one serialized value.
///
/// `check` runs when the owning registry is frozen; codecs that hold lazy
/// references override it to validate that their targets resolve.
pub trait FieldCodec: Send + Sync + 'static {
    /// The typed attribute value this codec handles.
    type Value: Send + 'static;

    /// Serialize a value, validating it first.
    fn encode(&self, value: &Self::Value, registry: &SchemaRegistry) -> Result<Value, FieldError>;

    /// Deserialize and validate a serialized value.
    fn decode(&self, raw: &Value, registry: &SchemaRegistry) -> Result<Self::Value, FieldError>;

    /// Validate lazy references against the registry. `owner` is the name of
    /// the schema holding this binding, for diagnostics.
    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError> {
        let _ = (registry, owner);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scalar codecs
// ---------------------------------------------------------------------------

/// UTF-8 string field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl FieldCodec for Text {
    type Value = String;

    fn encode(&self, value: &String, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        Ok(Value::String(value.clone()))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<String, FieldError> {
        raw.as_str()
            .map(str::to_owned)
            .ok_or_else(|| FieldError::UnexpectedType {
                expected: "string",
                actual: value_kind(raw),
            })
    }
}

/// Signed integer field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integer;

impl FieldCodec for Integer {
    type Value = i64;

    fn encode(&self, value: &i64, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        Ok(Value::from(*value))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<i64, FieldError> {
        raw.as_i64().ok_or_else(|| FieldError::UnexpectedType {
            expected: "integer",
            actual: value_kind(raw),
        })
    }
}

/// Boolean field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Boolean;

impl FieldCodec for Boolean {
    type Value = bool;

    fn encode(&self, value: &bool, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        Ok(Value::Bool(*value))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<bool, FieldError> {
        raw.as_bool().ok_or_else(|| FieldError::UnexpectedType {
            expected: "boolean",
            actual: value_kind(raw),
        })
    }
}

/// Finite floating-point field. Rejects NaN and infinities on encode — JSON
/// has no representation for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Real;

impl FieldCodec for Real {
    type Value = f64;

    fn encode(&self, value: &f64, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        serde_json::Number::from_f64(*value)
            .map(Value::Number)
            .ok_or_else(|| FieldError::Invalid(format!("non-finite float `{value}`")))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<f64, FieldError> {
        raw.as_f64().ok_or_else(|| FieldError::UnexpectedType {
            expected: "number",
            actual: value_kind(raw),
        })
    }
}

/// Email address field: a string with structural validation on both encode
/// and decode. One `@`, non-empty local part, dotted non-empty domain, no
/// whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

fn validate_email(address: &str) -> Result<(), FieldError> {
    let invalid = || FieldError::Invalid(format!("`{address}` is not a valid email address"));

    if address.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = address.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    // The domain must have a non-empty label on each side of a dot.
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(invalid());
    }
    Ok(())
}

impl FieldCodec for Email {
    type Value = String;

    fn encode(&self, value: &String, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        validate_email(value)?;
        Ok(Value::String(value.clone()))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<String, FieldError> {
        let address = raw.as_str().ok_or_else(|| FieldError::UnexpectedType {
            expected: "string",
            actual: value_kind(raw),
        })?;
        validate_email(address)?;
        Ok(address.to_owned())
    }
}

/// Constant field: emits a fixed literal and requires exact equality on
/// decode. The engine uses the same exact-match discipline for the synthetic
/// tag and version entries.
#[derive(Debug, Clone)]
pub struct Constant {
    expected: Value,
}

impl Constant {
    /// Create a constant field with the given literal.
    pub fn new(expected: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    /// The literal this field pins.
    pub fn expected(&self) -> &Value {
        &self.expected
    }
}

impl FieldCodec for Constant {
    type Value = Value;

    fn encode(&self, value: &Value, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        if value != &self.expected {
            return Err(FieldError::Invalid(format!(
                "constant should be `{}` but `{value}` was received",
                self.expected
            )));
        }
        Ok(self.expected.clone())
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        if raw != &self.expected {
            return Err(FieldError::Invalid(format!(
                "constant should be `{}` but `{raw}` was received",
                self.expected
            )));
        }
        Ok(raw.clone())
    }
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Optional wrapper: `None` maps to JSON `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Optional<C>(C);

impl<C: FieldCodec> Optional<C> {
    /// Wrap an inner codec.
    pub fn new(inner: C) -> Self {
        Self(inner)
    }
}

impl<C: FieldCodec> FieldCodec for Optional<C> {
    type Value = Option<C::Value>;

    fn encode(
        &self,
        value: &Option<C::Value>,
        registry: &SchemaRegistry,
    ) -> Result<Value, FieldError> {
        match value {
            Some(inner) => self.0.encode(inner, registry),
            None => Ok(Value::Null),
        }
    }

    fn decode(&self, raw: &Value, registry: &SchemaRegistry) -> Result<Option<C::Value>, FieldError> {
        match raw {
            Value::Null => Ok(None),
            present => self.0.decode(present, registry).map(Some),
        }
    }

    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError> {
        self.0.check(registry, owner)
    }
}

/// Homogeneous sequence of one inner codec. Element failures carry the
/// element index.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOf<C>(C);

impl<C: FieldCodec> ListOf<C> {
    /// Wrap an element codec.
    pub fn new(element: C) -> Self {
        Self(element)
    }
}

impl<C: FieldCodec> FieldCodec for ListOf<C> {
    type Value = Vec<C::Value>;

    fn encode(&self, value: &Vec<C::Value>, registry: &SchemaRegistry) -> Result<Value, FieldError> {
        let mut out = Vec::with_capacity(value.len());
        for (index, element) in value.iter().enumerate() {
            let encoded = self.0.encode(element, registry).map_err(|source| {
                FieldError::Element {
                    index,
                    source: Box::new(source),
                }
            })?;
            out.push(encoded);
        }
        Ok(Value::Array(out))
    }

    fn decode(&self, raw: &Value, registry: &SchemaRegistry) -> Result<Vec<C::Value>, FieldError> {
        let items = raw.as_array().ok_or_else(|| FieldError::UnexpectedType {
            expected: "array",
            actual: value_kind(raw),
        })?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let decoded = self.0.decode(item, registry).map_err(|source| {
                FieldError::Element {
                    index,
                    source: Box::new(source),
                }
            })?;
            out.push(decoded);
        }
        Ok(out)
    }

    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError> {
        self.0.check(registry, owner)
    }
}

/// Nested record field: the value is a whole record of type `T`, serialized
/// as a self-describing tagged document.
///
/// Resolution is lazy: the registry is consulted on every encode/decode, so
/// `Nested<Group>` inside `Group`'s own schema works, as does nesting a type
/// whose schema is registered later.
pub struct Nested<T>(PhantomData<fn() -> T>);

impl<T: Record> Nested<T> {
    /// Create a nested-record field for `T`.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Record> Default for Nested<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> std::fmt::Debug for Nested<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Nested").field(&T::NAME).finish()
    }
}

impl<T: Record> FieldCodec for Nested<T> {
    type Value = T;

    fn encode(&self, value: &T, registry: &SchemaRegistry) -> Result<Value, FieldError> {
        let schema = registry
            .typed_schema::<T>()
            .ok_or_else(|| FieldError::Dump(Box::new(DumpError::UnknownType {
                name: T::NAME.to_owned(),
            })))?;
        let document = schema
            .dump_with(value, registry)
            .map_err(|error| FieldError::Dump(Box::new(error)))?;
        Ok(document.into_value())
    }

    fn decode(&self, raw: &Value, registry: &SchemaRegistry) -> Result<T, FieldError> {
        let object = raw.as_object().ok_or_else(|| FieldError::UnexpectedType {
            expected: "object",
            actual: value_kind(raw),
        })?;
        let schema = registry
            .typed_schema::<T>()
            .ok_or_else(|| FieldError::Load(Box::new(LoadError::UnknownType {
                name: T::NAME.to_owned(),
            })))?;
        let document = TaggedDocument::from(object.clone());
        schema
            .load_with(&document, registry)
            .map_err(|error| FieldError::Load(Box::new(error)))
    }

    fn check(&self, registry: &SchemaRegistry, owner: &'static str) -> Result<(), SchemaError> {
        if registry.get(T::NAME).is_none() {
            return Err(SchemaError::UnresolvedReference {
                schema: owner.to_owned(),
                reference: T::NAME.to_owned(),
            });
        }
        Ok(())
    }
}

/// Pass-through codec for any `serde` value, round-tripped via
/// `serde_json`. The escape hatch for attribute types that already carry
/// their own `Serialize`/`Deserialize` impls.
pub struct Raw<V>(PhantomData<fn() -> V>);

impl<V> Raw<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    /// Create a pass-through field for `V`.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<V> Default for Raw<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for Raw<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raw").finish()
    }
}

impl<V> FieldCodec for Raw<V>
where
    V: Serialize + DeserializeOwned + Send + 'static,
{
    type Value = V;

    fn encode(&self, value: &V, _registry: &SchemaRegistry) -> Result<Value, FieldError> {
        serde_json::to_value(value).map_err(|error| FieldError::Invalid(error.to_string()))
    }

    fn decode(&self, raw: &Value, _registry: &SchemaRegistry) -> Result<V, FieldError> {
        serde_json::from_value(raw.clone()).map_err(|error| FieldError::Invalid(error.to_string()))
    }
}
