//! Diagnostic types for stubschema.

use serde::Serialize;
use std::fmt;

/// Result type used by every validation stage
pub type CheckResult<T> = Result<T, Diagnostic>;

/// Kind of failure reported for a stub declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Source text is not a well-formed declaration list
    SyntaxError,
    /// Function body is something other than a single docstring
    UnsupportedBody,
    /// Parameter default is not a literal constant
    NonConstantDefault,
    /// Docstring is not valid structured-comment syntax
    DocstringParseError,
    /// Type annotation has no JSON Schema counterpart
    UnsupportedType,
    /// Mapping key type is not the string primitive
    UnsupportedKeyType,
    /// Literal values of different runtime types
    MixedLiteralTypes,
    /// Docstring documents a parameter the signature lacks
    UnknownParameter,
    /// Parameter described as optional has no default
    OptionalWithoutDefault,
    /// Parameter described as required has a default
    RequiredWithDefault,
    /// Docstring type disagrees with the annotation
    TypeMismatch,
    /// Parameter type is declared nowhere
    MissingType,
    /// Parameter description is empty
    MissingDescription,
    /// Signature parameter is absent from the docstring
    UndocumentedParameter,
    /// Raises section declares real exceptions
    UnexpectedExceptions,
    /// Documented return type disagrees with the annotation
    ReturnTypeMismatch,
    /// Function summary is empty
    MissingSummary,
}

impl ErrorKind {
    /// Stable name of the kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SyntaxError => "SyntaxError",
            Self::UnsupportedBody => "UnsupportedBody",
            Self::NonConstantDefault => "NonConstantDefault",
            Self::DocstringParseError => "DocstringParseError",
            Self::UnsupportedType => "UnsupportedType",
            Self::UnsupportedKeyType => "UnsupportedKeyType",
            Self::MixedLiteralTypes => "MixedLiteralTypes",
            Self::UnknownParameter => "UnknownParameter",
            Self::OptionalWithoutDefault => "OptionalWithoutDefault",
            Self::RequiredWithDefault => "RequiredWithDefault",
            Self::TypeMismatch => "TypeMismatch",
            Self::MissingType => "MissingType",
            Self::MissingDescription => "MissingDescription",
            Self::UndocumentedParameter => "UndocumentedParameter",
            Self::UnexpectedExceptions => "UnexpectedExceptions",
            Self::ReturnTypeMismatch => "ReturnTypeMismatch",
            Self::MissingSummary => "MissingSummary",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure produced for an invalid input.
///
/// A diagnostic is terminal: once one is produced, no descriptors are
/// returned for any declaration of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Diagnostic {
    /// What went wrong
    pub kind: ErrorKind,
    /// Human-readable explanation
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Syntax error at a 1-based source position
    #[must_use]
    pub fn syntax(line: usize, column: usize, message: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::SyntaxError,
            format!("Invalid declaration at {}:{}: {}", line, column, message),
        )
    }

    /// Unsupported type annotation
    #[must_use]
    pub fn unsupported_type(annotation: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::UnsupportedType,
            format!("Unsupported type: {}", annotation),
        )
    }

    /// Check whether this diagnostic has the given kind
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}
