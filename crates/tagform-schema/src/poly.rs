//! # Polymorphic Sequences
//!
//! [`PolyList`] serializes a sequence whose elements are instances of
//! different record types and reconstructs each element's concrete type from
//! its embedded tag at decode time.
//!
//! The candidate set is fixed at construction, but resolution is not: a
//! [`Candidate::named`] reference is looked up in the registry on first use,
//! so a schema can list itself or a type registered later. The tag-dispatch
//! table is built at most once per field instance and never invalidated —
//! types cannot change tags after registration.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::OnceLock;

use serde_json::Value;
use tracing::trace;

use tagform_core::{value_kind, DumpError, FieldError, LoadError, SchemaError, TaggedDocument, TYPE_KEY};

use crate::fields::FieldCodec;
use crate::record::{DynRecord, Record};
use crate::registry::{DynSchema, SchemaRegistry};

/// One member of a [`PolyList`] candidate set.
pub struct Candidate(CandidateKind);

enum CandidateKind {
    Schema(Arc<dyn DynSchema>),
    Named(String),
}

impl Candidate {
    /// A concrete candidate: the schema is known at construction time.
    pub fn schema<T: Record>(descriptor: &Arc<crate::schema::SchemaDescriptor<T>>) -> Self {
        let erased: Arc<dyn DynSchema> = descriptor.clone();
        Self(CandidateKind::Schema(erased))
    }

    /// A forward or self reference, resolved against the registry on first
    /// use rather than at construction.
    pub fn named(name: impl Into<String>) -> Self {
        Self(CandidateKind::Named(name.into()))
    }
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            CandidateKind::Schema(schema) => f.debug_tuple("Schema").field(&schema.name()).finish(),
            CandidateKind::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

enum DispatchError {
    UnknownType(String),
    DuplicateTag(String),
}

impl DispatchError {
    fn into_field_error(self) -> FieldError {
        match self {
            Self::UnknownType(name) => {
                FieldError::Load(Box::new(LoadError::UnknownType { name }))
            }
            Self::DuplicateTag(tag) => {
                FieldError::Load(Box::new(LoadError::DuplicateTag { tag }))
            }
        }
    }
}

/// Field codec for a heterogeneous sequence of tagged records.
///
/// Encode resolves each element's schema from its runtime type name and
/// dumps it as a self-describing document; elements of excluded types are
/// dropped, not errors. Decode reads each document's tag and dispatches to
/// the candidate advertising that tag.
pub struct PolyList {
    candidates: Vec<Candidate>,
    excluded: HashSet<&'static str>,
    dispatch: OnceLock<HashMap<String, Arc<dyn DynSchema>>>,
}

impl PolyList {
    /// Create a polymorphic sequence field over a fixed candidate set.
    pub fn new(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        Self {
            candidates: candidates.into_iter().collect(),
            excluded: HashSet::new(),
            dispatch: OnceLock::new(),
        }
    }

    /// Mark a record type as excluded: elements of this runtime type are
    /// skipped during encode instead of failing. Used to filter untagged
    /// foreign types out of a mixed collection.
    pub fn exclude<B: Record>(mut self) -> Self {
        self.excluded.insert(B::NAME);
        self
    }

    fn dispatch_table(
        &self,
        registry: &SchemaRegistry,
    ) -> Result<&HashMap<String, Arc<dyn DynSchema>>, DispatchError> {
        if let Some(table) = self.dispatch.get() {
            return Ok(table);
        }
        let built = self.build_table(registry)?;
        trace!(candidates = built.len(), "built polymorphic dispatch table");
        // Two threads may race to build; exactly one table is published and
        // both builds are derived from the same immutable candidate set.
        Ok(self.dispatch.get_or_init(|| built))
    }

    fn build_table(
        &self,
        registry: &SchemaRegistry,
    ) -> Result<HashMap<String, Arc<dyn DynSchema>>, DispatchError> {
        let mut table = HashMap::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            let schema = match &candidate.0 {
                CandidateKind::Schema(schema) => schema.clone(),
                CandidateKind::Named(name) => registry
                    .get(name)
                    .ok_or_else(|| DispatchError::UnknownType(name.clone()))?,
            };
            let tag = schema.tag().to_owned();
            if table.insert(tag.clone(), schema).is_some() {
                return Err(DispatchError::DuplicateTag(tag));
            }
        }
        Ok(table)
    }
}

impl std::fmt::Debug for PolyList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyList")
            .field("candidates", &self.candidates)
            .field("excluded", &self.excluded)
            .finish()
    }
}

impl FieldCodec for PolyList {
    type Value = Vec<Box<dyn DynRecord>>;

    fn encode(
        &self,
        value: &Vec<Box<dyn DynRecord>>,
        registry: &SchemaRegistry,
    ) -> Result<Value, FieldError> {
        let mut out = Vec::with_capacity(value.len());
        for (index, element) in value.iter().enumerate() {
            let name = element.record_name();
            if self.excluded.contains(name) {
                continue;
            }
            let schema = registry.get(name).ok_or_else(|| FieldError::Element {
                index,
                source: Box::new(FieldError::Dump(Box::new(DumpError::UnknownType {
                    name: name.to_owned(),
                }))),
            })?;
            let document = schema
                .dump_dyn(element.as_ref(), registry)
                .map_err(|error| FieldError::Element {
                    index,
                    source: Box::new(FieldError::Dump(Box::new(error))),
                })?;
            out.push(document.into_value());
        }
        Ok(Value::Array(out))
    }

    fn decode(
        &self,
        raw: &Value,
        registry: &SchemaRegistry,
    ) -> Result<Vec<Box<dyn DynRecord>>, FieldError> {
        let items = raw.as_array().ok_or_else(|| FieldError::UnexpectedType {
            expected: "array",
            actual: value_kind(raw),
        })?;
        let table = self
            .dispatch_table(registry)
            .map_err(DispatchError::into_field_error)?;

        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let decoded = decode_element(item, table, registry).map_err(|source| {
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
        self.dispatch_table(registry).map(|_| ()).map_err(|error| match error {
            DispatchError::UnknownType(reference) => SchemaError::UnresolvedReference {
                schema: owner.to_owned(),
                reference,
            },
            DispatchError::DuplicateTag(tag) => SchemaError::DuplicateTag {
                schema: owner.to_owned(),
                tag,
            },
        })
    }
}

fn decode_element(
    item: &Value,
    table: &HashMap<String, Arc<dyn DynSchema>>,
    registry: &SchemaRegistry,
) -> Result<Box<dyn DynRecord>, FieldError> {
    let object = item.as_object().ok_or_else(|| FieldError::UnexpectedType {
        expected: "object",
        actual: value_kind(item),
    })?;
    let tag = object
        .get(TYPE_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            FieldError::Load(Box::new(LoadError::MissingField {
                field: TYPE_KEY.to_owned(),
            }))
        })?;
    let schema = table.get(tag).ok_or_else(|| {
        FieldError::Load(Box::new(LoadError::UnknownType {
            name: tag.to_owned(),
        }))
    })?;
    let document = TaggedDocument::from(object.clone());
    schema
        .load_dyn(&document, registry)
        .map_err(|error| FieldError::Load(Box::new(error)))
}
