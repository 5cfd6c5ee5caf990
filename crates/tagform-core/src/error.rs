//! # Error Hierarchy
//!
//! Structured error types for the whole workspace, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.
//!
//! Each phase of the pipeline has its own enum: [`SchemaError`] for
//! definition time, [`DumpError`] and [`LoadError`] for the two directions of
//! the round trip, and [`FieldError`] for codec-level validation. Every
//! variant carries the diagnostic context a caller needs: the record type,
//! the attribute or field, and the expected versus received value.
//!
//! Definition-time errors are expected to abort schema construction.
//! Load-time errors mean "this input is invalid" — they are never retried or
//! silently defaulted by the engine.

use thiserror::Error;

/// Top-level error type for tagform.
#[derive(Error, Debug)]
pub enum TagformError {
    /// Schema definition failure.
    #[error("schema definition error: {0}")]
    Schema(#[from] SchemaError),

    /// Record-to-document serialization failure.
    #[error("dump error: {0}")]
    Dump(#[from] DumpError),

    /// Document-to-record deserialization failure.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// JSON text projection failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while a schema is being synthesized or registered.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A non-defaulted attribute has no field binding. Caught at definition
    /// time so "forgot to serialize this field" never survives to first dump.
    #[error("no field binding for {type_name}.{attribute} and the attribute has no default")]
    MissingMetadata {
        /// The record type being synthesized.
        type_name: String,
        /// The attribute that lacks a binding.
        attribute: String,
    },

    /// A binding names an attribute the record type never declared.
    #[error("binding refers to unknown attribute {type_name}.{attribute}")]
    UnknownAttribute {
        /// The record type being synthesized.
        type_name: String,
        /// The undeclared attribute name.
        attribute: String,
    },

    /// The builder was finalized without a constructor.
    #[error("schema for {type_name} declares no constructor")]
    MissingConstructor {
        /// The record type being synthesized.
        type_name: String,
    },

    /// A schema is already registered under this name. Registration is
    /// fail-fast: last-writer-wins would let two divergent schemas share a
    /// name silently.
    #[error("a schema named `{name}` is already registered")]
    DuplicateType {
        /// The contested registry name.
        name: String,
    },

    /// Registration was attempted after the registry was frozen.
    #[error("registry is frozen; cannot register `{name}`")]
    RegistryFrozen {
        /// The name whose registration was rejected.
        name: String,
    },

    /// A lazy forward or self reference never resolved. Surfaced when the
    /// registry is frozen and every registered schema's references are
    /// validated.
    #[error("schema `{schema}` references unknown type `{reference}`")]
    UnresolvedReference {
        /// The schema holding the dangling reference.
        schema: String,
        /// The name that could not be resolved.
        reference: String,
    },

    /// Two polymorphic candidates of one schema advertise the same tag.
    #[error("schema `{schema}` has polymorphic candidates with duplicate tag `{tag}`")]
    DuplicateTag {
        /// The schema holding the polymorphic field.
        schema: String,
        /// The contested tag.
        tag: String,
    },
}

/// Errors raised while dumping a record to a document.
#[derive(Error, Debug)]
pub enum DumpError {
    /// No schema is registered for the record's type name.
    #[error("no schema registered for type `{name}`")]
    UnknownType {
        /// The unresolved type name.
        name: String,
    },

    /// A schema was asked to dump a value of a different record type.
    #[error("schema for `{expected}` cannot dump a value of type `{actual}`")]
    TypeMismatch {
        /// The record type the schema was synthesized for.
        expected: &'static str,
        /// The runtime type of the value received.
        actual: &'static str,
    },

    /// A field codec rejected the attribute value.
    #[error("field `{field}`: {source}")]
    Field {
        /// The offending field.
        field: String,
        /// The codec-level failure.
        source: FieldError,
    },
}

/// Errors raised while loading a document into a record.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The document's type tag differs from the schema's, or is absent.
    #[error("type tag should be `{expected}` but `{}` was received", .actual.as_deref().unwrap_or("<absent>"))]
    TagMismatch {
        /// The tag the schema expects.
        expected: String,
        /// The tag found in the document, if any.
        actual: Option<String>,
    },

    /// The document's version tag differs from the schema's, or is absent.
    #[error("version should be `{expected}` but `{}` was received", .actual.as_deref().unwrap_or("<absent>"))]
    VersionMismatch {
        /// The version the schema expects.
        expected: String,
        /// The version found in the document, if any.
        actual: Option<String>,
    },

    /// A type name or polymorphic tag could not be resolved.
    #[error("no schema registered for type `{name}`")]
    UnknownType {
        /// The unresolved name or tag.
        name: String,
    },

    /// Two polymorphic candidates advertise the same tag; dispatch would be
    /// ambiguous, so the load fails fast.
    #[error("two polymorphic candidates advertise the tag `{tag}`")]
    DuplicateTag {
        /// The contested tag.
        tag: String,
    },

    /// A bound field is missing from the document.
    #[error("document is missing required field `{field}`")]
    MissingField {
        /// The missing field.
        field: String,
    },

    /// The document carries a key the schema never declared.
    #[error("document contains unknown field `{field}`")]
    UnknownField {
        /// The undeclared key.
        field: String,
    },

    /// A field codec rejected the serialized value.
    #[error("field `{field}`: {source}")]
    Field {
        /// The offending field.
        field: String,
        /// The codec-level failure.
        source: FieldError,
    },
}

/// Codec-level validation failures, raised by field implementations during
/// encode or decode and wrapped with the field name by the engine.
#[derive(Error, Debug)]
pub enum FieldError {
    /// The serialized value has the wrong JSON kind.
    #[error("expected {expected}, got {actual}")]
    UnexpectedType {
        /// The JSON kind the codec accepts.
        expected: &'static str,
        /// The JSON kind received.
        actual: &'static str,
    },

    /// The value has the right kind but fails validation.
    #[error("{0}")]
    Invalid(String),

    /// A sequence element failed; carries the element index.
    #[error("element {index}: {source}")]
    Element {
        /// Zero-based index of the failing element.
        index: usize,
        /// The element's failure.
        source: Box<FieldError>,
    },

    /// A nested dump failed inside a field codec.
    #[error(transparent)]
    Dump(Box<DumpError>),

    /// A nested load failed inside a field codec.
    #[error(transparent)]
    Load(Box<LoadError>),
}
