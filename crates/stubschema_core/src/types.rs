//! Canonical type descriptors and their JSON Schema rendering.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Constant admitted inside a `Literal[...]` annotation
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// String constant
    Str(String),
    /// Integer constant
    Int(i64),
    /// Floating point constant
    Float(f64),
    /// Boolean constant
    Bool(bool),
    /// The null constant
    Null,
}

/// Runtime kind of a literal value.
///
/// Kinds are compared by identity: a boolean is never an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// `str`
    Str,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `NoneType`
    Null,
}

impl LiteralKind {
    /// Descriptor of the primitive type holding values of this kind
    #[must_use]
    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            Self::Str => TypeDescriptor::String,
            Self::Int => TypeDescriptor::Integer,
            Self::Float => TypeDescriptor::Number,
            Self::Bool => TypeDescriptor::Boolean,
            Self::Null => TypeDescriptor::Null,
        }
    }

    /// Source-language name of the kind
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Null => "NoneType",
        }
    }
}

impl LiteralValue {
    /// Runtime kind of this value
    #[must_use]
    pub fn kind(&self) -> LiteralKind {
        match self {
            Self::Str(_) => LiteralKind::Str,
            Self::Int(_) => LiteralKind::Int,
            Self::Float(_) => LiteralKind::Float,
            Self::Bool(_) => LiteralKind::Bool,
            Self::Null => LiteralKind::Null,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Null => write!(f, "None"),
        }
    }
}

impl Serialize for LiteralValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(x) => serializer.serialize_f64(*x),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Null => serializer.serialize_unit(),
        }
    }
}

/// Canonical structural representation of a parameter or return type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// `{"type": "string"}`
    String,
    /// `{"type": "integer"}`
    Integer,
    /// `{"type": "number"}`
    Number,
    /// `{"type": "boolean"}`
    Boolean,
    /// `{"type": "null"}`
    Null,
    /// Ordered sequence, with an item type when one was given
    Array {
        /// Item type
        items: Option<Box<TypeDescriptor>>,
    },
    /// String-keyed mapping, with a value type when one was given
    Object {
        /// Value type shared by every key
        values: Option<Box<TypeDescriptor>>,
    },
    /// Fixed set of constants of one primitive type
    Enum {
        /// Primitive type of the values
        base: Box<TypeDescriptor>,
        /// Allowed values in declared order
        values: Vec<LiteralValue>,
    },
}

impl TypeDescriptor {
    /// Sequence of `items`
    #[must_use]
    pub fn array_of(items: TypeDescriptor) -> Self {
        Self::Array {
            items: Some(Box::new(items)),
        }
    }

    /// Mapping from strings to `values`
    #[must_use]
    pub fn object_of(values: TypeDescriptor) -> Self {
        Self::Object {
            values: Some(Box::new(values)),
        }
    }

    /// Enumeration of `values` over `base`
    #[must_use]
    pub fn enumeration(base: TypeDescriptor, values: Vec<LiteralValue>) -> Self {
        Self::Enum {
            base: Box::new(base),
            values,
        }
    }

    /// JSON Schema `type` keyword for this descriptor
    #[must_use]
    pub fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Array { .. } => "array",
            Self::Object { .. } => "object",
            Self::Enum { base, .. } => base.json_type(),
        }
    }

    /// Type equality as the validator applies it.
    ///
    /// Identical to `==` except that enum values are compared as sets,
    /// the way literal types compare in the declaration language.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Array { items: a }, Self::Array { items: b })
            | (Self::Object { values: a }, Self::Object { values: b }) => match (a, b) {
                (Some(a), Some(b)) => a.equivalent(b),
                (None, None) => true,
                _ => false,
            },
            (
                Self::Enum {
                    base: base_a,
                    values: values_a,
                },
                Self::Enum {
                    base: base_b,
                    values: values_b,
                },
            ) => {
                base_a.equivalent(base_b)
                    && values_a.iter().all(|v| values_b.contains(v))
                    && values_b.iter().all(|v| values_a.contains(v))
            }
            _ => self == other,
        }
    }

    /// Write this descriptor's JSON Schema keywords into an open map.
    ///
    /// Used both for standalone fragments and for property schemas that
    /// append their own keys after the type keywords.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying serializer fails
    pub fn serialize_fields<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        match self {
            Self::Array { items } => {
                map.serialize_entry("type", "array")?;
                if let Some(items) = items {
                    map.serialize_entry("items", items.as_ref())?;
                }
            }
            Self::Object { values } => {
                map.serialize_entry("type", "object")?;
                if let Some(values) = values {
                    let pattern: BTreeMap<&str, &TypeDescriptor> =
                        BTreeMap::from([(".*", values.as_ref())]);
                    map.serialize_entry("patternProperties", &pattern)?;
                }
            }
            Self::Enum { base, values } => {
                base.serialize_fields(map)?;
                map.serialize_entry("enum", values)?;
            }
            _ => map.serialize_entry("type", self.json_type())?,
        }
        Ok(())
    }
}

impl Serialize for TypeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        self.serialize_fields(&mut map)?;
        map.end()
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array { items: Some(items) } => write!(f, "array[{}]", items),
            Self::Object {
                values: Some(values),
            } => write!(f, "object[{}]", values),
            Self::Enum { base, values } => {
                write!(f, "{} enum [", base)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            _ => f.write_str(self.json_type()),
        }
    }
}
