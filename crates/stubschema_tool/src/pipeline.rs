//! End-to-end validation of stub declaration source.

use crate::schema::SchemaDescriptor;
use crate::validate::CrossValidator;
use stubschema_core::{CheckResult, ValidateConfig};
use stubschema_parse::{parser_for, DeclarationParser, DocstringParser, TypeResolver};
use tracing::{debug, info, warn};

/// Validates declarations and emits their descriptors.
///
/// Declarations are processed in source order and processing stops at the
/// first diagnostic, so either every declaration yields a descriptor or
/// none does.
#[derive(Debug)]
pub struct StubValidator {
    config: ValidateConfig,
    declarations: DeclarationParser,
    resolver: TypeResolver,
    docstrings: Box<dyn DocstringParser>,
}

impl StubValidator {
    /// Create a validator for the given configuration
    #[must_use]
    pub fn new(config: ValidateConfig) -> Self {
        Self {
            declarations: DeclarationParser::new(&config),
            resolver: TypeResolver::from_config(&config),
            docstrings: parser_for(config.docstring_style),
            config,
        }
    }

    /// Replace the docstring parser chosen by the configuration
    #[must_use]
    pub fn with_docstring_parser(mut self, parser: Box<dyn DocstringParser>) -> Self {
        self.docstrings = parser;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ValidateConfig {
        &self.config
    }

    /// Validate every declaration in `source`
    ///
    /// # Errors
    ///
    /// Returns the first diagnostic from parsing, docstring analysis,
    /// type resolution, or cross-validation
    pub fn validate(&self, source: &str) -> CheckResult<Vec<SchemaDescriptor>> {
        self.run(source).inspect_err(|diagnostic| {
            warn!(kind = %diagnostic.kind, message = %diagnostic.message, "validation failed");
        })
    }

    fn run(&self, source: &str) -> CheckResult<Vec<SchemaDescriptor>> {
        let module = self.declarations.parse_module(source)?;
        let validator = CrossValidator::new(&self.resolver);

        let mut descriptors = Vec::new();
        for def in module.functions() {
            debug!(function = %def.name, line = def.line, "validating declaration");
            let declaration = self.declarations.lower(def)?;
            let docstring = self.docstrings.parse(&declaration.docstring)?;
            debug!(
                function = %declaration.name,
                style = %self.docstrings.style(),
                params = docstring.params.len(),
                "docstring parsed"
            );
            let validated = validator.validate(&declaration, &docstring)?;
            descriptors.push(SchemaDescriptor::from_validated(&validated));
        }

        info!(count = descriptors.len(), "declarations validated");
        Ok(descriptors)
    }
}

impl Default for StubValidator {
    fn default() -> Self {
        Self::new(ValidateConfig::default())
    }
}

/// Validate `source` with the default configuration
///
/// # Errors
///
/// Returns the first diagnostic produced, see [`StubValidator::validate`]
pub fn validate_declarations(source: &str) -> CheckResult<Vec<SchemaDescriptor>> {
    StubValidator::default().validate(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::to_json;
    use serde_json::json;
    use stubschema_core::{DocstringStyle, ErrorKind};
    use stubschema_parse::{DocstringModel, GoogleParser};

    const GREET: &str = r#"def greet(name: str, times: int = 1) -> str:
    """Greets a person.

    Args:
        name: the name to greet
        times: how many times, optional

    Returns:
        str: greeting string
    """
"#;

    fn error(source: &str) -> ErrorKind {
        validate_declarations(source).unwrap_err().kind
    }

    #[test]
    fn test_greet_end_to_end() {
        let descriptors = validate_declarations(GREET).unwrap();
        assert_eq!(
            to_json(&descriptors, false).unwrap(),
            r#"[{"name":"greet","description":"Greets a person.","parameters":{"type":"object","properties":{"name":{"type":"string","description":"the name to greet"},"times":{"type":"integer","description":"how many times, optional"}}},"required":["name"]}]"#
        );
    }

    #[test]
    fn test_empty_source() {
        assert!(validate_declarations("").unwrap().is_empty());
    }

    #[test]
    fn test_multiple_declarations_in_order() {
        let source = r#"
def first(a: int):
    """First.

    :param a: The a.
    """

def second(b: list[str], c: dict[str, float] = None):
    """Second.

    Parameters
    ----------
    b : list[str]
        The b.
    c : dict[str, float], optional
        The c, optional.
    """
"#;
        let descriptors = validate_declarations(source).unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].name, "first");
        assert_eq!(descriptors[1].name, "second");
        assert_eq!(descriptors[1].required, vec!["b".to_string()]);
        assert_eq!(
            serde_json::to_value(&descriptors[1].parameters).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "b": {"type": "array", "items": {"type": "string"}, "description": "The b."},
                    "c": {
                        "type": "object",
                        "patternProperties": {".*": {"type": "number"}},
                        "description": "The c, optional."
                    }
                }
            })
        );
    }

    #[test]
    fn test_literal_parameter() {
        let source = r#"def pick(color: Literal["a", "b"]):
    """Picks.

    Args:
        color: The color.
    """
"#;
        let descriptors = validate_declarations(source).unwrap();
        assert_eq!(
            serde_json::to_value(descriptors[0].property("color").unwrap()).unwrap(),
            json!({"type": "string", "enum": ["a", "b"], "description": "The color."})
        );
    }

    #[test]
    fn test_property_order_follows_signature() {
        let source = r#"def f(b: int, a: int):
    """F.

    Args:
        a: A.
        b: B.
    """
"#;
        let descriptors = validate_declarations(source).unwrap();
        let keys: Vec<_> = descriptors[0].parameters.properties.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_fail_fast_reports_first_declaration() {
        let source = r#"def bad(x: int):
    """Bad.

    Args:
        x: The x.
        y: Not a parameter.
    """

def worse(x: set):
    pass
"#;
        assert_eq!(error(source), ErrorKind::UnknownParameter);
    }

    #[test]
    fn test_valid_declaration_before_invalid_one() {
        let source = r#"def ok(x: int):
    """Ok.

    Args:
        x: The x.
    """

def broken(x):
    """Broken.

    Args:
        x: The x.
    """
"#;
        assert_eq!(error(source), ErrorKind::MissingType);
    }

    #[test]
    fn test_syntax_error() {
        assert_eq!(error("def f(:\n    'x'\n"), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_body_error() {
        assert_eq!(error("def f():\n    return 1\n"), ErrorKind::UnsupportedBody);
    }

    #[test]
    fn test_dict_key_error() {
        let source = "def f(m: dict[int, str]):\n    \"\"\"F.\n\n    Args:\n        m: M.\n    \"\"\"\n";
        assert_eq!(error(source), ErrorKind::UnsupportedKeyType);
    }

    #[test]
    fn test_mixed_literal_error() {
        let source = "def f(m: Literal[1, 'a']):\n    \"\"\"F.\n\n    Args:\n        m: M.\n    \"\"\"\n";
        assert_eq!(error(source), ErrorKind::MixedLiteralTypes);
    }

    #[test]
    fn test_optional_and_required_markers() {
        let optional = "def f(a: int):\n    \"\"\"F.\n\n    Args:\n        a: Optional a.\n    \"\"\"\n";
        assert_eq!(error(optional), ErrorKind::OptionalWithoutDefault);
        let required = "def f(a: int = 1):\n    \"\"\"F.\n\n    Args:\n        a: Required a.\n    \"\"\"\n";
        assert_eq!(error(required), ErrorKind::RequiredWithDefault);
    }

    #[test]
    fn test_raises_section() {
        let raises = "def f():\n    \"\"\"F.\n\n    Raises:\n        ValueError: Bad.\n    \"\"\"\n";
        assert_eq!(error(raises), ErrorKind::UnexpectedExceptions);
        let none = "def f():\n    \"\"\"F.\n\n    Raises:\n        None: Never.\n    \"\"\"\n";
        assert!(validate_declarations(none).is_ok());
    }

    #[test]
    fn test_return_mismatch() {
        let source = "def f() -> int:\n    \"\"\"F.\n\n    Returns:\n        str: S.\n    \"\"\"\n";
        assert_eq!(error(source), ErrorKind::ReturnTypeMismatch);
    }

    #[test]
    fn test_missing_summary() {
        assert_eq!(error("def f():\n    \"\"\"   \"\"\"\n"), ErrorKind::MissingSummary);
    }

    #[test]
    fn test_configured_style() {
        let config = ValidateConfig::new().with_docstring_style(DocstringStyle::Rest);
        let validator = StubValidator::new(config);
        assert_eq!(validator.config().docstring_style, DocstringStyle::Rest);
        // the google section is plain text to the ReST dialect
        let err = validator.validate(GREET).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UndocumentedParameter);
    }

    #[derive(Debug)]
    struct SummaryOnly;

    impl DocstringParser for SummaryOnly {
        fn style(&self) -> DocstringStyle {
            DocstringStyle::Auto
        }

        fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
            Ok(DocstringModel {
                short_description: Some(text.trim().to_string()),
                ..DocstringModel::default()
            })
        }
    }

    #[test]
    fn test_custom_docstring_parser() {
        let validator = StubValidator::default().with_docstring_parser(Box::new(SummaryOnly));
        let descriptors = validator.validate("def ping():\n    'Pings.'\n").unwrap();
        assert_eq!(descriptors[0].description, "Pings.");

        let google = StubValidator::default().with_docstring_parser(Box::new(GoogleParser));
        assert!(google.validate(GREET).is_ok());
    }

    #[test]
    fn test_nesting_limit_from_config() {
        let config = ValidateConfig::new().with_max_nesting_depth(4);
        let validator = StubValidator::new(config);
        let source = "def f(a: list[list[list[list[list[int]]]]]):\n    \"\"\"F.\n\n    Args:\n        a: A.\n    \"\"\"\n";
        assert!(validator.validate(source).is_err());
        assert!(validate_declarations(source).is_ok());
    }

    #[test]
    fn test_epydoc_declaration() {
        let source = r#"def greet(name, times: int = 1) -> str:
    """Greets a person.

    @param name: the name to greet
    @type name: str
    @param times: how many times, optional
    @return: greeting string
    @rtype: str
    """
"#;
        let descriptors = validate_declarations(source).unwrap();
        assert_eq!(descriptors[0].required, vec!["name".to_string()]);
        assert_eq!(
            serde_json::to_value(&descriptors[0].parameters).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string", "description": "the name to greet"},
                    "times": {"type": "integer", "description": "how many times, optional"}
                }
            })
        );

        let epydoc = StubValidator::new(ValidateConfig::new().with_docstring_style(DocstringStyle::Epydoc));
        assert!(epydoc.validate(source).is_ok());
    }

    #[test]
    fn test_long_operator_chains_are_diagnostics() {
        let union = vec!["int"; 20_000].join(" | ");
        let source = format!("def f(a: {}):\n    \"\"\"F.\n\n    Args:\n        a: A.\n    \"\"\"\n", union);
        assert_eq!(error(&source), ErrorKind::SyntaxError);

        let sum = vec!["1"; 20_000].join(" + ");
        let source = format!("def f(a: int = {}):\n    \"\"\"F.\n\n    Args:\n        a: A.\n    \"\"\"\n", sum);
        assert_eq!(error(&source), ErrorKind::SyntaxError);
    }

    #[test]
    fn test_integer_default_beyond_i64() {
        let source = "def f(a: int = 99999999999999999999):\n    \"\"\"F.\n\n    Args:\n        a: The a, optional.\n    \"\"\"\n";
        let descriptors = validate_declarations(source).unwrap();
        assert!(descriptors[0].required.is_empty());
        assert_eq!(descriptors[0].property("a").unwrap().schema, stubschema_core::TypeDescriptor::Integer);
    }

    fn generated(required: usize, defaulted: usize) -> String {
        let names: Vec<String> = (0..required + defaulted).map(|i| format!("p{i}")).collect();
        let signature: Vec<String> = names
            .iter()
            .enumerate()
            .map(|(i, n)| if i < required { format!("{n}: int") } else { format!("{n}: int = {i}") })
            .collect();
        let mut source = format!("def gen({}):\n    \"\"\"Generated.\n\n", signature.join(", "));
        if !names.is_empty() {
            source.push_str("    Args:\n");
            for n in &names {
                source.push_str(&format!("        {n} (int): Value {n}.\n"));
            }
        }
        source.push_str("    \"\"\"\n");
        source
    }

    proptest::proptest! {
        #[test]
        fn prop_required_matches_defaults(required in 0usize..6, defaulted in 0usize..6) {
            let descriptors = validate_declarations(&generated(required, defaulted)).unwrap();
            let descriptor = &descriptors[0];
            proptest::prop_assert_eq!(descriptor.parameters.properties.len(), required + defaulted);
            let expected: Vec<String> = (0..required).map(|i| format!("p{i}")).collect();
            proptest::prop_assert_eq!(&descriptor.required, &expected);
        }
    }
}
