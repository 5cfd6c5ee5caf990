//! # Record Declarations
//!
//! A record type participates in serialization by declaring two things: a
//! registry name and an ordered attribute table. Both are compile-time
//! constants — there is no runtime introspection, and the schema synthesizer
//! checks the binding table exhaustively against the attribute table, in both
//! directions, when the schema is built.
//!
//! [`DynRecord`] is the object-safe runtime view used wherever elements of
//! different record types share one sequence. It is implemented for every
//! [`Record`] automatically.

use std::any::Any;
use std::fmt;

/// One declared attribute of a record type.
///
/// `has_default` marks attributes the record type can fill in on its own: an
/// attribute with a default and no field binding is simply not serialized,
/// while an attribute with neither fails synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    name: &'static str,
    has_default: bool,
}

impl Attribute {
    /// Declare an attribute that must carry a field binding.
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            has_default: false,
        }
    }

    /// Declare an attribute the record type defaults when unbound.
    pub const fn defaulted(name: &'static str) -> Self {
        Self {
            name,
            has_default: true,
        }
    }

    /// The attribute name, which doubles as the serialized key when bound.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the record type supplies a default for this attribute.
    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

/// A plain data type that can be bound to a tagged-document schema.
///
/// `NAME` is the registry key and the target of forward references — distinct
/// from the type tag, which is chosen when the schema is built. The attribute
/// table is the declaration-order list the synthesizer iterates; serialized
/// key order follows it.
pub trait Record: Any + Sized + Send + Sync + fmt::Debug + Clone + PartialEq {
    /// Declared type name; the registry key.
    const NAME: &'static str;

    /// Ordered attribute declarations.
    fn attributes() -> &'static [Attribute];
}

/// Object-safe runtime view of a record.
///
/// Heterogeneous sequences hold `Box<dyn DynRecord>`; the equality and clone
/// hooks let records containing such sequences keep their derived
/// `PartialEq` and `Clone`.
pub trait DynRecord: Send + Sync + fmt::Debug {
    /// The element's declared type name, used for registry dispatch.
    fn record_name(&self) -> &'static str;

    /// Downcast access to the concrete record.
    fn as_any(&self) -> &dyn Any;

    /// Equality across the erased boundary; false when the concrete types
    /// differ.
    fn dyn_eq(&self, other: &dyn DynRecord) -> bool;

    /// Clone across the erased boundary.
    fn dyn_clone(&self) -> Box<dyn DynRecord>;
}

impl<T: Record> DynRecord for T {
    fn record_name(&self) -> &'static str {
        T::NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynRecord) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn dyn_clone(&self) -> Box<dyn DynRecord> {
        Box::new(self.clone())
    }
}

impl PartialEq for Box<dyn DynRecord> {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other.as_ref())
    }
}

impl Clone for Box<dyn DynRecord> {
    fn clone(&self) -> Self {
        self.dyn_clone()
    }
}
