//! Tool descriptors emitted for validated declarations.

use crate::validate::ValidatedDeclaration;
use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use stubschema_core::TypeDescriptor;

/// Callable tool descriptor for one declaration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    /// Function name
    pub name: String,
    /// Docstring summary
    pub description: String,
    /// Parameter object schema
    pub parameters: ParametersSchema,
    /// Names of parameters without defaults, in declaration order
    pub required: Vec<String>,
}

impl SchemaDescriptor {
    /// Build the descriptor for a validated declaration
    #[must_use]
    pub fn from_validated(validated: &ValidatedDeclaration<'_>) -> Self {
        let properties = validated
            .parameters
            .iter()
            .map(|param| {
                (
                    param.name.to_string(),
                    PropertySchema {
                        schema: param.schema.clone(),
                        description: param.description.to_string(),
                    },
                )
            })
            .collect();
        let required = validated
            .parameters
            .iter()
            .filter(|param| !param.has_default)
            .map(|param| param.name.to_string())
            .collect();

        Self {
            name: validated.name.to_string(),
            description: validated.summary.to_string(),
            parameters: ParametersSchema::new(properties),
            required,
        }
    }

    /// Property schema of a parameter
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertySchema> {
        self.parameters.properties.get(name)
    }
}

/// `{"type": "object", "properties": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    schema_type: &'static str,
    /// Property schemas keyed by parameter name, in declaration order
    pub properties: IndexMap<String, PropertySchema>,
}

impl ParametersSchema {
    /// Object schema over the given properties
    #[must_use]
    pub fn new(properties: IndexMap<String, PropertySchema>) -> Self {
        Self {
            schema_type: "object",
            properties,
        }
    }
}

/// Schema of one parameter: its type keywords followed by `description`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    /// Parameter type
    pub schema: TypeDescriptor,
    /// Parameter description
    pub description: String,
}

impl Serialize for PropertySchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.schema.serialize_fields(&mut map)?;
        map.serialize_entry("description", &self.description)?;
        map.end()
    }
}

/// Render descriptors as JSON text
///
/// # Errors
///
/// Returns error if serialization fails
pub fn to_json(descriptors: &[SchemaDescriptor], pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(descriptors)
    } else {
        serde_json::to_string(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValidatedParameter;
    use serde_json::json;
    use stubschema_core::LiteralValue;

    fn validated() -> ValidatedDeclaration<'static> {
        ValidatedDeclaration {
            name: "pick",
            summary: "Picks a color.",
            parameters: vec![
                ValidatedParameter {
                    name: "color",
                    schema: TypeDescriptor::enumeration(
                        TypeDescriptor::String,
                        vec![
                            LiteralValue::Str("red".to_string()),
                            LiteralValue::Str("blue".to_string()),
                        ],
                    ),
                    description: "Color to pick.",
                    has_default: false,
                },
                ValidatedParameter {
                    name: "weights",
                    schema: TypeDescriptor::object_of(TypeDescriptor::Number),
                    description: "Weights, optional.",
                    has_default: true,
                },
            ],
        }
    }

    #[test]
    fn test_descriptor_fields() {
        let descriptor = SchemaDescriptor::from_validated(&validated());
        assert_eq!(descriptor.name, "pick");
        assert_eq!(descriptor.description, "Picks a color.");
        assert_eq!(descriptor.required, vec!["color".to_string()]);
        assert_eq!(
            descriptor.property("weights").unwrap().schema,
            TypeDescriptor::object_of(TypeDescriptor::Number)
        );
    }

    #[test]
    fn test_descriptor_json() {
        let descriptor = SchemaDescriptor::from_validated(&validated());
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({
                "name": "pick",
                "description": "Picks a color.",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "color": {"type": "string", "enum": ["red", "blue"], "description": "Color to pick."},
                        "weights": {
                            "type": "object",
                            "patternProperties": {".*": {"type": "number"}},
                            "description": "Weights, optional."
                        }
                    }
                },
                "required": ["color"]
            })
        );
    }

    #[test]
    fn test_property_key_order() {
        let descriptor = SchemaDescriptor::from_validated(&validated());
        let text = serde_json::to_string(&descriptor).unwrap();
        assert!(text.contains(
            r#""color":{"type":"string","enum":["red","blue"],"description":"Color to pick."}"#
        ));
        assert!(text.find("\"color\"").unwrap() < text.find("\"weights\"").unwrap());
    }

    #[test]
    fn test_no_parameters() {
        let descriptor = SchemaDescriptor::from_validated(&ValidatedDeclaration {
            name: "ping",
            summary: "Pings.",
            parameters: Vec::new(),
        });
        assert_eq!(
            to_json(&[descriptor], false).unwrap(),
            r#"[{"name":"ping","description":"Pings.","parameters":{"type":"object","properties":{}},"required":[]}]"#
        );
    }
}
