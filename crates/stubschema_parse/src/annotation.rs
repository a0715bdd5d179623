//! Resolution of type annotations into canonical type descriptors.
//!
//! Annotations are interpreted structurally from their syntax. The
//! mapping rules, by annotation shape:
//!
//! | Annotation                       | Descriptor                      |
//! |----------------------------------|---------------------------------|
//! | `str` / `int` / `float` / `bool` | primitive                       |
//! | `int \| float`                   | number                          |
//! | `None`, `types.NoneType`         | null                            |
//! | `list`, `list[T]`                | array, with items when given    |
//! | `dict`, `dict[str, V]`           | object, with values when given  |
//! | `Literal[a, b, ...]`             | enum over the values' one type  |
//! | `"T"`                            | `T`, parsed as a forward reference |

use crate::ast::{Constant, Expr};
use crate::parser::parse_expression;
use stubschema_core::{
    CheckResult, Diagnostic, ErrorKind, LiteralValue, TypeDescriptor, ValidateConfig,
    DEFAULT_MAX_NESTING_DEPTH,
};

/// Maps annotation expressions to type descriptors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeResolver {
    max_depth: usize,
}

impl TypeResolver {
    /// Create a resolver with the given nesting bound
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create a resolver from a validation configuration
    #[must_use]
    pub fn from_config(config: &ValidateConfig) -> Self {
        Self::new(config.max_nesting_depth)
    }

    /// Resolve an annotation expression
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType`, `UnsupportedKeyType`, or
    /// `MixedLiteralTypes` when the annotation has no descriptor
    pub fn resolve(&self, expr: &Expr) -> CheckResult<TypeDescriptor> {
        self.resolve_at(expr, 0)
    }

    /// Resolve annotation text, as written in a docstring
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` if the text is not an expression, or any
    /// error [`TypeResolver::resolve`] returns
    pub fn resolve_str(&self, text: &str) -> CheckResult<TypeDescriptor> {
        self.resolve_text(text, 0)
    }

    fn resolve_text(&self, text: &str, depth: usize) -> CheckResult<TypeDescriptor> {
        let text = text.trim();
        let expr = parse_expression(text, self.max_depth)
            .map_err(|_| Diagnostic::unsupported_type(text))?;
        self.resolve_at(&expr, depth + 1)
    }

    fn resolve_at(&self, expr: &Expr, depth: usize) -> CheckResult<TypeDescriptor> {
        if depth > self.max_depth {
            return Err(Diagnostic::new(
                ErrorKind::UnsupportedType,
                format!("Unsupported type (nested too deeply): {}", expr),
            ));
        }

        match expr {
            Expr::Name(name) => match name.as_str() {
                "str" => Ok(TypeDescriptor::String),
                "int" => Ok(TypeDescriptor::Integer),
                "float" => Ok(TypeDescriptor::Number),
                "bool" => Ok(TypeDescriptor::Boolean),
                "list" => Ok(TypeDescriptor::Array { items: None }),
                "dict" => Ok(TypeDescriptor::Object { values: None }),
                _ => Err(Diagnostic::unsupported_type(expr)),
            },
            Expr::Constant(Constant::None) => Ok(TypeDescriptor::Null),
            Expr::Constant(Constant::Str(text)) => self.resolve_text(text, depth),
            Expr::Attribute { .. } => match expr.dotted_name().as_deref() {
                Some("types.NoneType") => Ok(TypeDescriptor::Null),
                _ => Err(Diagnostic::unsupported_type(expr)),
            },
            Expr::BinOp { op: "|", .. } => self.resolve_union(expr, depth),
            Expr::Subscript { value, index } => self.resolve_generic(expr, value, index, depth),
            _ => Err(Diagnostic::unsupported_type(expr)),
        }
    }

    fn resolve_generic(
        &self,
        expr: &Expr,
        origin: &Expr,
        index: &Expr,
        depth: usize,
    ) -> CheckResult<TypeDescriptor> {
        let args: Vec<&Expr> = match index {
            Expr::Tuple(items) => items.iter().collect(),
            single => vec![single],
        };

        match generic_origin(origin) {
            Some("list") => match args.as_slice() {
                [item] => Ok(TypeDescriptor::array_of(self.resolve_at(item, depth + 1)?)),
                _ => Err(Diagnostic::unsupported_type(expr)),
            },
            Some("dict") => match args.as_slice() {
                [key, value] => {
                    if !matches!(self.resolve_at(key, depth + 1), Ok(TypeDescriptor::String)) {
                        return Err(Diagnostic::new(
                            ErrorKind::UnsupportedKeyType,
                            format!("Unsupported type (JSON keys must be strings): {}", expr),
                        ));
                    }
                    Ok(TypeDescriptor::object_of(self.resolve_at(value, depth + 1)?))
                }
                _ => Err(Diagnostic::unsupported_type(expr)),
            },
            Some("Literal") => resolve_literal(expr, &args),
            Some("Union") => self.resolve_union(expr, depth),
            _ => Err(Diagnostic::unsupported_type(expr)),
        }
    }

    /// Only a single distinct member, or exactly `int | float`, has a
    /// descriptor
    fn resolve_union(&self, expr: &Expr, depth: usize) -> CheckResult<TypeDescriptor> {
        let mut members = Vec::new();
        flatten_union(expr, &mut members);

        let mut distinct: Vec<TypeDescriptor> = Vec::new();
        for member in members {
            let resolved = self
                .resolve_at(member, depth + 1)
                .map_err(|_| Diagnostic::unsupported_type(expr))?;
            if !distinct.iter().any(|d| d.equivalent(&resolved)) {
                distinct.push(resolved);
            }
        }

        match distinct.as_slice() {
            [single] => Ok(single.clone()),
            [a, b]
                if matches!(
                    (a, b),
                    (TypeDescriptor::Integer, TypeDescriptor::Number)
                        | (TypeDescriptor::Number, TypeDescriptor::Integer)
                ) =>
            {
                Ok(TypeDescriptor::Number)
            }
            _ => Err(Diagnostic::unsupported_type(expr)),
        }
    }
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NESTING_DEPTH)
    }
}

/// Name of a generic alias, accepting the `typing.` qualified forms
fn generic_origin(expr: &Expr) -> Option<&'static str> {
    match expr.dotted_name()?.as_str() {
        "list" => Some("list"),
        "dict" => Some("dict"),
        "Literal" | "typing.Literal" => Some("Literal"),
        "Union" | "typing.Union" => Some("Union"),
        _ => None,
    }
}

fn flatten_union<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::BinOp {
            op: "|",
            left,
            right,
        } => {
            flatten_union(left, out);
            flatten_union(right, out);
        }
        Expr::Subscript { value, index } if generic_origin(value) == Some("Union") => {
            match index.as_ref() {
                Expr::Tuple(items) => items.iter().for_each(|item| flatten_union(item, out)),
                single => flatten_union(single, out),
            }
        }
        other => out.push(other),
    }
}

fn resolve_literal(expr: &Expr, args: &[&Expr]) -> CheckResult<TypeDescriptor> {
    let mut values: Vec<LiteralValue> = Vec::new();
    for arg in args {
        let value = match arg.literal_constant() {
            Some(Constant::Str(s)) => LiteralValue::Str(s),
            Some(Constant::Int(i)) => LiteralValue::Int(i),
            Some(Constant::Float(x)) => LiteralValue::Float(x),
            Some(Constant::Bool(b)) => LiteralValue::Bool(b),
            Some(Constant::None) => LiteralValue::Null,
            Some(Constant::BigInt(_)) => {
                return Err(Diagnostic::new(
                    ErrorKind::UnsupportedType,
                    format!("Unsupported type (integer literal out of range): {}", expr),
                ))
            }
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::UnsupportedType,
                    format!("Unsupported type (literal values must be constants): {}", expr),
                ))
            }
        };
        if !values.contains(&value) {
            values.push(value);
        }
    }

    let Some(kind) = values.first().map(LiteralValue::kind) else {
        return Err(Diagnostic::unsupported_type(expr));
    };
    if values.iter().any(|v| v.kind() != kind) {
        return Err(Diagnostic::new(
            ErrorKind::MixedLiteralTypes,
            format!("Unsupported type (definite type is required): {}", expr),
        ));
    }
    Ok(TypeDescriptor::enumeration(kind.descriptor(), values))
}
