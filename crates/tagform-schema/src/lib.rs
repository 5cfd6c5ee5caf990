//! # tagform-schema — Schema Synthesis & Polymorphic Dispatch
//!
//! This crate binds plain Rust record types to declarative serialization
//! schemas. A record type declares an ordered attribute table; the
//! [`SchemaBuilder`] binds a field codec to each attribute, synthesizes an
//! immutable [`SchemaDescriptor`], and registers it in an explicit
//! [`SchemaRegistry`]. From there, [`SchemaRegistry::dump`] and
//! [`SchemaRegistry::load`] convert records to and from ordered tagged
//! documents — including heterogeneous sequences whose element types are
//! recovered from embedded tags at load time.
//!
//! ## Design
//!
//! - **Total coverage at definition time.** Every non-defaulted attribute
//!   must carry a binding; "forgot to serialize this field" fails when the
//!   schema is built, not at first dump.
//! - **Explicit registry, lazy references.** Schemas live in a
//!   [`SchemaRegistry`] value the caller owns. Self and forward references
//!   are names resolved at first use, so declaration order never matters;
//!   [`SchemaRegistry::freeze`] validates every reference at once.
//! - **Tags validate, candidates dispatch.** A top-level load validates the
//!   tag against the caller-named type. Only [`PolyList`] uses tags to pick
//!   types, and only among its declared candidates.

pub mod fields;
pub mod poly;
pub mod record;
pub mod registry;
pub mod schema;

// Re-export primary types at crate root for ergonomic imports.
pub use poly::{Candidate, PolyList};
pub use record::{Attribute, DynRecord, Record};
pub use registry::{DynSchema, SchemaRegistry};
pub use schema::{FieldMap, SchemaBuilder, SchemaDescriptor, VersionTag};
