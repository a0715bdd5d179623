//! stubschema core types
//!
//! Pure data types shared by every stage: type descriptors, diagnostics,
//! and configuration. No I/O happens in this crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod types;

// Re-exports
pub use config::{DocstringStyle, ValidateConfig, DEFAULT_MAX_NESTING_DEPTH};
pub use error::{CheckResult, Diagnostic, ErrorKind};
pub use types::{LiteralKind, LiteralValue, TypeDescriptor};
