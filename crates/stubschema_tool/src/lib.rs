//! stubschema tool descriptors
//!
//! Cross-validates stub declarations against their docstrings and emits
//! JSON-Schema tool descriptors for the ones that pass.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pipeline;
pub mod schema;
pub mod validate;

pub use pipeline::{validate_declarations, StubValidator};
pub use schema::{to_json, ParametersSchema, PropertySchema, SchemaDescriptor};
pub use validate::{CrossValidator, ValidatedDeclaration, ValidatedParameter, ValidationRule};
