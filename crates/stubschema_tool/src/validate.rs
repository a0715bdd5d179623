//! Cross-validation of a declaration against its docstring.

use stubschema_core::{CheckResult, Diagnostic, ErrorKind, TypeDescriptor};
use stubschema_parse::{DocstringModel, FunctionDeclaration, ParamDoc, TypeResolver};
use tracing::trace;

/// Rule checked by [`CrossValidator`], in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Documented parameters exist in the signature
    ParameterExists,
    /// "optional" in a description implies a default
    OptionalHasDefault,
    /// "required" in a description implies no default
    RequiredHasNoDefault,
    /// Documented and annotated types agree
    TypesAgree,
    /// Every parameter has a type from one source or the other
    TypeDeclared,
    /// Every documented parameter has a description
    DescriptionPresent,
    /// Every signature parameter is documented
    ParameterDocumented,
    /// Exceptions are not declared
    NoExceptions,
    /// Documented and annotated return types agree
    ReturnTypesAgree,
    /// The function has a summary
    SummaryPresent,
}

impl ValidationRule {
    /// Every rule, in evaluation order
    pub const ALL: [ValidationRule; 10] = [
        Self::ParameterExists,
        Self::OptionalHasDefault,
        Self::RequiredHasNoDefault,
        Self::TypesAgree,
        Self::TypeDeclared,
        Self::DescriptionPresent,
        Self::ParameterDocumented,
        Self::NoExceptions,
        Self::ReturnTypesAgree,
        Self::SummaryPresent,
    ];

    /// Diagnostic kind reported when the rule is violated
    #[must_use]
    pub const fn error_kind(self) -> ErrorKind {
        match self {
            Self::ParameterExists => ErrorKind::UnknownParameter,
            Self::OptionalHasDefault => ErrorKind::OptionalWithoutDefault,
            Self::RequiredHasNoDefault => ErrorKind::RequiredWithDefault,
            Self::TypesAgree => ErrorKind::TypeMismatch,
            Self::TypeDeclared => ErrorKind::MissingType,
            Self::DescriptionPresent => ErrorKind::MissingDescription,
            Self::ParameterDocumented => ErrorKind::UndocumentedParameter,
            Self::NoExceptions => ErrorKind::UnexpectedExceptions,
            Self::ReturnTypesAgree => ErrorKind::ReturnTypeMismatch,
            Self::SummaryPresent => ErrorKind::MissingSummary,
        }
    }

    fn violation(self, message: String) -> Diagnostic {
        trace!(rule = ?self, %message, "rule violated");
        Diagnostic::new(self.error_kind(), message)
    }
}

/// Parameter that passed validation, with its final type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParameter<'a> {
    /// Parameter name
    pub name: &'a str,
    /// Documented type if given, otherwise the annotated one
    pub schema: TypeDescriptor,
    /// Description from the last docstring entry for the parameter
    pub description: &'a str,
    /// Whether the parameter has a default
    pub has_default: bool,
}

/// Declaration that passed every rule
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDeclaration<'a> {
    /// Function name
    pub name: &'a str,
    /// Docstring summary
    pub summary: &'a str,
    /// Signature parameters in declaration order
    pub parameters: Vec<ValidatedParameter<'a>>,
}

/// Checks a declaration against its parsed docstring
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator<'r> {
    resolver: &'r TypeResolver,
}

impl<'r> CrossValidator<'r> {
    /// Create a validator resolving docstring types with `resolver`
    #[must_use]
    pub fn new(resolver: &'r TypeResolver) -> Self {
        Self { resolver }
    }

    /// Apply every rule in [`ValidationRule::ALL`] order.
    ///
    /// Parameter rules run entry by entry in docstring order, so the
    /// first failing entry decides the diagnostic.
    ///
    /// # Errors
    ///
    /// Returns the first rule violation, or a type resolution diagnostic
    /// for a documented type
    pub fn validate<'a>(
        &self,
        declaration: &'a FunctionDeclaration,
        docstring: &'a DocstringModel,
    ) -> CheckResult<ValidatedDeclaration<'a>> {
        for entry in &docstring.params {
            self.check_entry(declaration, entry)?;
        }

        for param in &declaration.parameters {
            if docstring.param(&param.name).is_none() {
                return Err(ValidationRule::ParameterDocumented.violation(format!(
                    "Docstring doesn't include argument: {}",
                    param.name
                )));
            }
        }

        let raises_nothing = match docstring.raises.as_slice() {
            [] => true,
            [only] => only.type_name.as_deref() == Some("None"),
            _ => false,
        };
        if !raises_nothing {
            return Err(ValidationRule::NoExceptions
                .violation("The function should not raise any exception".to_string()));
        }

        self.check_return(declaration, docstring)?;

        let summary = docstring
            .short_description
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                ValidationRule::SummaryPresent
                    .violation("Docstring doesn't describe function".to_string())
            })?;

        let parameters = declaration
            .parameters
            .iter()
            .map(|param| self.finalize(declaration, docstring, &param.name, param.has_default()))
            .collect::<CheckResult<Vec<_>>>()?;

        Ok(ValidatedDeclaration {
            name: &declaration.name,
            summary,
            parameters,
        })
    }

    /// Rules 1 to 6 for one docstring entry
    fn check_entry(&self, declaration: &FunctionDeclaration, entry: &ParamDoc) -> CheckResult<()> {
        let name = entry.name.as_str();
        let Some(param) = declaration.parameter(name) else {
            return Err(ValidationRule::ParameterExists.violation(format!(
                "Docstring describes non-existing argument: {}",
                name
            )));
        };

        let description = entry.description.as_deref().unwrap_or("").to_lowercase();
        if description.contains("optional") && !param.has_default() {
            return Err(ValidationRule::OptionalHasDefault.violation(format!(
                "Docstring marks parameter {} as optional but it doesn't have a default value",
                name
            )));
        }
        if description.contains("required") && param.has_default() {
            return Err(ValidationRule::RequiredHasNoDefault.violation(format!(
                "Docstring marks parameter {} as required but it has a default value",
                name
            )));
        }

        let declared = declaration.declared_type(name);
        if let (Some(type_expr), Some(declared)) = (entry.type_expr.as_deref(), declared) {
            let documented = self.resolver.resolve_str(type_expr)?;
            if !documented.equivalent(declared) {
                return Err(ValidationRule::TypesAgree.violation(format!(
                    "Type hint {} for parameter {} doesn't match with its description in docstring {}",
                    declared, name, documented
                )));
            }
        }
        if entry.type_expr.is_none() && declared.is_none() {
            return Err(ValidationRule::TypeDeclared.violation(format!(
                "Docstring doesn't describe type of parameter {}",
                name
            )));
        }

        if entry.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
            return Err(ValidationRule::DescriptionPresent.violation(format!(
                "Docstring doesn't describe parameter {}",
                name
            )));
        }
        Ok(())
    }

    /// Rule 9, applied only when the docstring states a return type
    fn check_return(
        &self,
        declaration: &FunctionDeclaration,
        docstring: &DocstringModel,
    ) -> CheckResult<()> {
        let Some(type_expr) = docstring
            .returns
            .as_ref()
            .and_then(|r| r.type_expr.as_deref())
        else {
            return Ok(());
        };
        let documented = self.resolver.resolve_str(type_expr)?;
        match &declaration.return_type {
            Some(declared) if declared.equivalent(&documented) => Ok(()),
            Some(declared) => Err(ValidationRule::ReturnTypesAgree.violation(format!(
                "Return type {} doesn't match with its description in docstring {}",
                declared, documented
            ))),
            // an unannotated function implicitly returns `None`
            None if documented == TypeDescriptor::Null => Ok(()),
            None => Err(ValidationRule::ReturnTypesAgree.violation(format!(
                "Return type is not annotated but the docstring describes it as {}",
                documented
            ))),
        }
    }

    fn finalize<'a>(
        &self,
        declaration: &'a FunctionDeclaration,
        docstring: &'a DocstringModel,
        name: &'a str,
        has_default: bool,
    ) -> CheckResult<ValidatedParameter<'a>> {
        let entry = docstring.param(name).ok_or_else(|| {
            Diagnostic::new(
                ErrorKind::UndocumentedParameter,
                format!("Docstring doesn't include argument: {}", name),
            )
        })?;
        let schema = match entry.type_expr.as_deref() {
            Some(type_expr) => self.resolver.resolve_str(type_expr)?,
            None => declaration.declared_type(name).cloned().ok_or_else(|| {
                Diagnostic::new(
                    ErrorKind::MissingType,
                    format!("Docstring doesn't describe type of parameter {}", name),
                )
            })?,
        };
        Ok(ValidatedParameter {
            name,
            schema,
            description: entry.description.as_deref().unwrap_or(""),
            has_default,
        })
    }
}
