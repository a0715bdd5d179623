//! Function declarations extracted from parsed source.

use crate::annotation::TypeResolver;
use crate::ast::{Constant, Expr, FunctionDef, Module, Statement};
use crate::parser::parse_module;
use indexmap::IndexMap;
use stubschema_core::{CheckResult, Diagnostic, ErrorKind, TypeDescriptor, ValidateConfig};
use tracing::trace;

/// Positional parameter of a declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Literal default value
    pub default: Option<Constant>,
}

impl Parameter {
    /// Whether the parameter can be omitted by callers
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// One stub function, checked for shape and with annotations resolved
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// Function name
    pub name: String,
    /// Positional parameters in declaration order
    pub parameters: Vec<Parameter>,
    /// Resolved annotations of the annotated parameters
    pub param_types: IndexMap<String, TypeDescriptor>,
    /// Resolved return annotation
    pub return_type: Option<TypeDescriptor>,
    /// Raw docstring text
    pub docstring: String,
    /// Line of the `def` keyword
    pub line: usize,
}

impl FunctionDeclaration {
    /// Look up a parameter by name
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Resolved annotation of a parameter
    #[must_use]
    pub fn declared_type(&self, name: &str) -> Option<&TypeDescriptor> {
        self.param_types.get(name)
    }
}

/// Turns source text into function declarations
#[derive(Debug, Clone, Copy)]
pub struct DeclarationParser {
    resolver: TypeResolver,
    max_depth: usize,
}

impl DeclarationParser {
    /// Create a parser for the given configuration
    #[must_use]
    pub fn new(config: &ValidateConfig) -> Self {
        Self {
            resolver: TypeResolver::from_config(config),
            max_depth: config.max_nesting_depth,
        }
    }

    /// Parse source into a syntax tree without lowering any function
    ///
    /// # Errors
    ///
    /// Returns a `SyntaxError` diagnostic if the source is malformed
    pub fn parse_module(&self, source: &str) -> CheckResult<Module> {
        parse_module(source, self.max_depth)
    }

    /// Parse source and lower every top-level function, stopping at the
    /// first failure
    ///
    /// # Errors
    ///
    /// Returns the first diagnostic produced by parsing or lowering
    pub fn parse(&self, source: &str) -> CheckResult<Vec<FunctionDeclaration>> {
        let module = self.parse_module(source)?;
        module.functions().map(|def| self.lower(def)).collect()
    }

    /// Check one function definition and resolve its annotations.
    ///
    /// Checks run in order: defaults, body shape, parameter annotations,
    /// return annotation.
    ///
    /// # Errors
    ///
    /// Returns `NonConstantDefault`, `UnsupportedBody`, or a type
    /// resolution diagnostic
    pub fn lower(&self, def: &FunctionDef) -> CheckResult<FunctionDeclaration> {
        let positional: Vec<_> = def.params.iter().filter(|p| p.kind.is_positional()).collect();

        let mut parameters = Vec::with_capacity(positional.len());
        for param in &positional {
            let default = match &param.default {
                Some(expr) => Some(constant_default(&def.name, &param.name, expr)?),
                None => None,
            };
            parameters.push(Parameter {
                name: param.name.clone(),
                default,
            });
        }

        let docstring = match def.body.as_slice() {
            [Statement::Expr {
                value: Expr::Constant(Constant::Str(text)),
                ..
            }] => text.clone(),
            _ => {
                return Err(Diagnostic::new(
                    ErrorKind::UnsupportedBody,
                    format!(
                        "The body of function {} should only contain a docstring",
                        def.name
                    ),
                ))
            }
        };

        let mut param_types = IndexMap::new();
        for param in &positional {
            if let Some(annotation) = &param.annotation {
                param_types.insert(param.name.clone(), self.resolver.resolve(annotation)?);
            }
        }
        let return_type = def
            .returns
            .as_ref()
            .map(|annotation| self.resolver.resolve(annotation))
            .transpose()?;

        trace!(function = %def.name, params = parameters.len(), "lowered declaration");
        Ok(FunctionDeclaration {
            name: def.name.clone(),
            parameters,
            param_types,
            return_type,
            docstring,
            line: def.line,
        })
    }
}

impl Default for DeclarationParser {
    fn default() -> Self {
        Self::new(&ValidateConfig::default())
    }
}

fn constant_default(function: &str, param: &str, expr: &Expr) -> CheckResult<Constant> {
    expr.literal_constant().ok_or_else(|| {
        Diagnostic::new(
            ErrorKind::NonConstantDefault,
            format!(
                "Only constant default values are supported ({}: parameter {} defaults to {})",
                function, param, expr
            ),
        )
    })
}
