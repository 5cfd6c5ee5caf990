#![deny(missing_docs)]

//! # tagform-core — Foundational Types for Tagform
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies — only `serde`, `serde_json`,
//! and `thiserror` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **[`TaggedDocument`] is the sole serialized form.** Every record dumps
//!    to exactly one ordered key/value document whose first key is the type
//!    tag. Key order is part of the contract, not a presentation detail:
//!    consumers compare serialized bytes.
//!
//! 2. **Structured errors with `thiserror`.** No `Box<dyn Error>`, no
//!    `.unwrap()` outside tests. Each phase of the pipeline (definition,
//!    dump, load, field codec) has its own error enum whose variants carry
//!    the type name, attribute, or field that failed.
//!
//! 3. **Reserved keys are constants.** `_type` and `_version` are defined
//!    once, here, and stripped by the engine before records are constructed.

pub mod document;
pub mod error;

// Re-export primary types at crate root for ergonomic imports.
pub use document::{value_kind, TaggedDocument, TYPE_KEY, VERSION_KEY};
pub use error::{DumpError, FieldError, LoadError, SchemaError, TagformError};
