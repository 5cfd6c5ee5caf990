//! # Schema Registry
//!
//! [`SchemaRegistry`] is the explicit, shareable home of every synthesized
//! schema — there is no process-global table. It resolves three things:
//! forward references (a binding names a type whose schema does not exist
//! yet), self references (a record type nesting its own type), and
//! tag-to-type dispatch for polymorphic sequences.
//!
//! Registration is append-only and fail-fast: a second schema under the same
//! name is rejected, never silently replaced. [`SchemaRegistry::freeze`]
//! validates every registered schema's lazy references and then rejects
//! further registration, giving construction-order problems one
//! deterministic place to surface.
//!
//! ## Concurrency
//!
//! Interior state sits behind a `parking_lot::RwLock`; the freeze flag is an
//! atomic. Dump and load take the lock only for the brief schema lookup, and
//! reference validation runs on a snapshot taken outside the lock.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use tagform_core::{DumpError, LoadError, SchemaError, TaggedDocument, TagformError};

use crate::record::{DynRecord, Record};
use crate::schema::{SchemaDescriptor, VersionTag};

/// Type-erased schema surface, used by the registry and by polymorphic
/// dispatch where the concrete record type is only known at runtime.
pub trait DynSchema: Send + Sync {
    /// The declared type name the schema is registered under.
    fn name(&self) -> &'static str;

    /// The schema's type tag.
    fn tag(&self) -> &str;

    /// The schema's version tag, if declared.
    fn version(&self) -> Option<&VersionTag>;

    /// Dump a record through the erased boundary. Fails with
    /// [`DumpError::TypeMismatch`] when the value is not an instance of the
    /// schema's record type.
    fn dump_dyn(
        &self,
        record: &dyn DynRecord,
        registry: &SchemaRegistry,
    ) -> Result<TaggedDocument, DumpError>;

    /// Load a record through the erased boundary.
    fn load_dyn(
        &self,
        document: &TaggedDocument,
        registry: &SchemaRegistry,
    ) -> Result<Box<dyn DynRecord>, LoadError>;

    /// Validate the schema's lazy references against the registry.
    fn check(&self, registry: &SchemaRegistry) -> Result<(), SchemaError>;
}

impl<T: Record> DynSchema for SchemaDescriptor<T> {
    fn name(&self) -> &'static str {
        T::NAME
    }

    fn tag(&self) -> &str {
        SchemaDescriptor::tag(self)
    }

    fn version(&self) -> Option<&VersionTag> {
        SchemaDescriptor::version(self)
    }

    fn dump_dyn(
        &self,
        record: &dyn DynRecord,
        registry: &SchemaRegistry,
    ) -> Result<TaggedDocument, DumpError> {
        let typed = record
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| DumpError::TypeMismatch {
                expected: T::NAME,
                actual: record.record_name(),
            })?;
        self.dump_with(typed, registry)
    }

    fn load_dyn(
        &self,
        document: &TaggedDocument,
        registry: &SchemaRegistry,
    ) -> Result<Box<dyn DynRecord>, LoadError> {
        Ok(Box::new(self.load_with(document, registry)?))
    }

    fn check(&self, registry: &SchemaRegistry) -> Result<(), SchemaError> {
        self.check_fields(registry)
    }
}

struct RegistryEntry {
    erased: Arc<dyn DynSchema>,
    typed: Arc<dyn Any + Send + Sync>,
}

/// The explicit table mapping declared type names to synthesized schemas,
/// and the entry point of the round-trip engine.
pub struct SchemaRegistry {
    entries: RwLock<HashMap<&'static str, RegistryEntry>>,
    frozen: AtomicBool,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    pub(crate) fn register<T: Record>(
        &self,
        descriptor: Arc<SchemaDescriptor<T>>,
    ) -> Result<(), SchemaError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(SchemaError::RegistryFrozen {
                name: T::NAME.to_owned(),
            });
        }
        let mut entries = self.entries.write();
        if entries.contains_key(T::NAME) {
            return Err(SchemaError::DuplicateType {
                name: T::NAME.to_owned(),
            });
        }
        debug!(name = T::NAME, tag = descriptor.tag(), "registered schema");
        entries.insert(
            T::NAME,
            RegistryEntry {
                erased: descriptor.clone(),
                typed: descriptor,
            },
        );
        Ok(())
    }

    /// Look up the erased schema registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DynSchema>> {
        self.entries.read().get(name).map(|entry| entry.erased.clone())
    }

    pub(crate) fn typed_schema<T: Record>(&self) -> Option<Arc<SchemaDescriptor<T>>> {
        let entries = self.entries.read();
        let entry = entries.get(T::NAME)?;
        entry.typed.clone().downcast::<SchemaDescriptor<T>>().ok()
    }

    /// Resolve the typed schema for `T`, failing with
    /// [`LoadError::UnknownType`] when none is registered.
    pub fn resolve<T: Record>(&self) -> Result<Arc<SchemaDescriptor<T>>, LoadError> {
        self.typed_schema::<T>().ok_or_else(|| LoadError::UnknownType {
            name: T::NAME.to_owned(),
        })
    }

    /// Dump a record to its tagged document.
    pub fn dump<T: Record>(&self, record: &T) -> Result<TaggedDocument, DumpError> {
        let schema = self.typed_schema::<T>().ok_or_else(|| DumpError::UnknownType {
            name: T::NAME.to_owned(),
        })?;
        schema.dump_with(record, self)
    }

    /// Dump a record through the erased boundary, dispatching on its runtime
    /// type name.
    pub fn dump_dyn(&self, record: &dyn DynRecord) -> Result<TaggedDocument, DumpError> {
        let schema = self
            .get(record.record_name())
            .ok_or_else(|| DumpError::UnknownType {
                name: record.record_name().to_owned(),
            })?;
        schema.dump_dyn(record, self)
    }

    /// Dump a record straight to JSON text, preserving key order.
    pub fn dump_json<T: Record>(&self, record: &T) -> Result<String, TagformError> {
        Ok(self.dump(record)?.to_json_string()?)
    }

    /// Load a record of the caller-named type from a tagged document.
    ///
    /// The document's tag is validated against `T`'s schema — it is never
    /// used to pick the type. Tag-based dispatch happens only inside
    /// polymorphic sequence fields.
    pub fn load<T: Record>(&self, document: &TaggedDocument) -> Result<T, LoadError> {
        let schema = self.resolve::<T>()?;
        schema.load_with(document, self)
    }

    /// Load a record of the caller-named type from JSON text.
    pub fn load_json<T: Record>(&self, text: &str) -> Result<T, TagformError> {
        let document = TaggedDocument::from_json_str(text)?;
        Ok(self.load::<T>(&document)?)
    }

    /// Validate every registered schema's lazy references, then reject all
    /// further registration. After a successful freeze, lookups are stable.
    pub fn freeze(&self) -> Result<(), SchemaError> {
        let schemas: Vec<Arc<dyn DynSchema>> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.erased.clone())
            .collect();
        for schema in &schemas {
            schema.check(self)?;
        }
        self.frozen.store(true, Ordering::Release);
        debug!(schemas = schemas.len(), "schema registry frozen");
        Ok(())
    }

    /// Whether the registry has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Number of registered schemas.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no schema has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.read().keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("SchemaRegistry")
            .field("schemas", &names)
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Text;
    use crate::record::Attribute;
    use crate::schema::SchemaBuilder;

    #[derive(Debug, Clone, PartialEq)]
    struct Alpha {
        name: String,
    }

    impl Record for Alpha {
        const NAME: &'static str = "alpha";

        fn attributes() -> &'static [Attribute] {
            const ATTRS: &[Attribute] = &[Attribute::required("name")];
            ATTRS
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Beta {
        name: String,
    }

    impl Record for Beta {
        const NAME: &'static str = "beta";

        fn attributes() -> &'static [Attribute] {
            const ATTRS: &[Attribute] = &[Attribute::required("name")];
            ATTRS
        }
    }

    // Distinct Rust type contesting Alpha's registry name.
    #[derive(Debug, Clone, PartialEq)]
    struct AlphaImpostor {
        name: String,
    }

    impl Record for AlphaImpostor {
        const NAME: &'static str = "alpha";

        fn attributes() -> &'static [Attribute] {
            const ATTRS: &[Attribute] = &[Attribute::required("name")];
            ATTRS
        }
    }

    fn register_alpha(registry: &SchemaRegistry) -> Arc<SchemaDescriptor<Alpha>> {
        SchemaBuilder::<Alpha>::new("alpha")
            .field("name", Text, |a| &a.name)
            .construct(|fields| {
                Ok(Alpha {
                    name: fields.take("name")?,
                })
            })
            .register(registry)
            .expect("valid schema")
    }

    #[test]
    fn registered_schema_is_resolvable() {
        let registry = SchemaRegistry::new();
        register_alpha(&registry);

        assert!(registry.get("alpha").is_some());
        assert!(registry.resolve::<Alpha>().is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_is_not_resolvable() {
        let registry = SchemaRegistry::new();
        assert!(registry.get("alpha").is_none());
        let err = registry.resolve::<Alpha>().unwrap_err();
        assert!(matches!(err, LoadError::UnknownType { .. }));
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = SchemaRegistry::new();
        register_alpha(&registry);

        let err = SchemaBuilder::<AlphaImpostor>::new("alpha")
            .field("name", Text, |a| &a.name)
            .construct(|fields| {
                Ok(AlphaImpostor {
                    name: fields.take("name")?,
                })
            })
            .register(&registry)
            .unwrap_err();
        match err {
            SchemaError::DuplicateType { name } => assert_eq!(name, "alpha"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn frozen_registry_rejects_registration() {
        let registry = SchemaRegistry::new();
        register_alpha(&registry);
        registry.freeze().expect("nothing unresolved");
        assert!(registry.is_frozen());

        let err = SchemaBuilder::<Beta>::new("beta")
            .field("name", Text, |b| &b.name)
            .construct(|fields| {
                Ok(Beta {
                    name: fields.take("name")?,
                })
            })
            .register(&registry)
            .unwrap_err();
        assert!(matches!(err, SchemaError::RegistryFrozen { .. }));
    }

    #[test]
    fn frozen_registry_still_round_trips() {
        let registry = SchemaRegistry::new();
        register_alpha(&registry);
        registry.freeze().unwrap();

        let original = Alpha { name: "a".into() };
        let document = registry.dump(&original).unwrap();
        let restored: Alpha = registry.load(&document).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn dump_dyn_dispatches_on_runtime_type() {
        let registry = SchemaRegistry::new();
        register_alpha(&registry);

        let record: Box<dyn DynRecord> = Box::new(Alpha { name: "a".into() });
        let document = registry.dump_dyn(record.as_ref()).unwrap();
        assert_eq!(document.type_tag(), Some("alpha"));
    }

    #[test]
    fn dump_dyn_of_unregistered_type_fails() {
        let registry = SchemaRegistry::new();
        let record: Box<dyn DynRecord> = Box::new(Beta { name: "b".into() });
        let err = registry.dump_dyn(record.as_ref()).unwrap_err();
        assert!(matches!(err, DumpError::UnknownType { .. }));
    }
}
