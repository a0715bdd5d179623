//! Syntax tree for stub declaration source.
//!
//! Only function definitions are modeled in full. Other statements are
//! kept as opaque markers so the declaration list can be walked without
//! interpreting them.

use std::fmt;

/// Parsed source file
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Top-level statements in source order
    pub body: Vec<Statement>,
}

impl Module {
    /// Top-level function definitions in source order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.body.iter().filter_map(|stmt| match stmt {
            Statement::FunctionDef(def) => Some(def),
            _ => None,
        })
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `def name(...): ...`
    FunctionDef(FunctionDef),
    /// Bare expression statement
    Expr {
        /// The expression
        value: Expr,
        /// Line the statement starts on
        line: usize,
    },
    /// Any statement not modeled further
    Other {
        /// Line the statement starts on
        line: usize,
    },
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Parameters in declaration order
    pub params: Vec<Param>,
    /// Return annotation
    pub returns: Option<Expr>,
    /// Body statements
    pub body: Vec<Statement>,
    /// Line of the `def` keyword
    pub line: usize,
}

/// How a parameter binds arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Before a `/` marker
    PositionalOnly,
    /// Positional or keyword
    Positional,
    /// `*args`
    VarPositional,
    /// After `*` or `*args`
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

impl ParamKind {
    /// Whether the parameter takes part in the declaration's parameter list
    #[must_use]
    pub fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::Positional)
    }
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Binding kind
    pub kind: ParamKind,
    /// Annotation expression
    pub annotation: Option<Expr>,
    /// Default value expression
    pub default: Option<Expr>,
}

/// Literal constant
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Text string
    Str(String),
    /// Byte string
    Bytes(String),
    /// Integer
    Int(i64),
    /// Integer outside the `i64` range, in source spelling
    BigInt(String),
    /// Float
    Float(f64),
    /// Imaginary number
    Imaginary(f64),
    /// `True` or `False`
    Bool(bool),
    /// `None`
    None,
    /// `...`
    Ellipsis,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{:?}", s),
            Self::Bytes(s) => write!(f, "b{:?}", s),
            Self::Int(i) => write!(f, "{}", i),
            Self::BigInt(text) => f.write_str(text),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Imaginary(x) => write!(f, "{:?}j", x),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::None => f.write_str("None"),
            Self::Ellipsis => f.write_str("..."),
        }
    }
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Constant(Constant),
    /// f-string, kept as its raw text
    FormattedString(String),
    /// Identifier
    Name(String),
    /// `value.attr`
    Attribute {
        /// Object expression
        value: Box<Expr>,
        /// Attribute name
        attr: String,
    },
    /// `value[index]`, with multiple indices packed into a tuple
    Subscript {
        /// Subscripted expression
        value: Box<Expr>,
        /// Index expression
        index: Box<Expr>,
    },
    /// `lower:upper:step` inside a subscript
    Slice {
        /// Lower bound
        lower: Option<Box<Expr>>,
        /// Upper bound
        upper: Option<Box<Expr>>,
        /// Step
        step: Option<Box<Expr>>,
    },
    /// `func(args)`
    Call {
        /// Called expression
        func: Box<Expr>,
        /// Arguments, including keyword and unpacked ones
        args: Vec<Expr>,
    },
    /// `name=value` call argument, or `**value` when `name` is absent
    Keyword {
        /// Keyword name
        name: Option<String>,
        /// Argument value
        value: Box<Expr>,
    },
    /// `*value`
    Starred(Box<Expr>),
    /// `(a, b)`
    Tuple(Vec<Expr>),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `{a, b}`
    Set(Vec<Expr>),
    /// `{k: v}`; a `None` key is a `**mapping` entry
    Dict(Vec<(Option<Expr>, Expr)>),
    /// Comprehension or generator expression, not inspected further
    Comprehension,
    /// Binary, boolean, or comparison operator
    BinOp {
        /// Operator text
        op: &'static str,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Prefix operator
    UnaryOp {
        /// Operator text
        op: &'static str,
        /// Operand
        operand: Box<Expr>,
    },
    /// `body if test else orelse`
    Conditional {
        /// Value when the test holds
        body: Box<Expr>,
        /// Condition
        test: Box<Expr>,
        /// Value otherwise
        orelse: Box<Expr>,
    },
    /// `lambda ...: body`
    Lambda {
        /// Lambda body
        body: Box<Expr>,
    },
}

impl Expr {
    /// Literal constant denoted by this expression.
    ///
    /// Accepts plain constants and numeric constants with a leading sign.
    #[must_use]
    pub fn literal_constant(&self) -> Option<Constant> {
        match self {
            Self::Constant(c) => Some(c.clone()),
            Self::UnaryOp { op, operand } if *op == "-" || *op == "+" => {
                let negate = *op == "-";
                match operand.as_ref() {
                    Self::Constant(Constant::Int(i)) if negate => i.checked_neg().map(Constant::Int),
                    Self::Constant(Constant::BigInt(text)) if negate => {
                        Some(Constant::BigInt(format!("-{}", text)))
                    }
                    Self::Constant(Constant::Float(x)) if negate => Some(Constant::Float(-x)),
                    Self::Constant(Constant::Imaginary(x)) if negate => {
                        Some(Constant::Imaginary(-x))
                    }
                    Self::Constant(
                        c @ (Constant::Int(_)
                        | Constant::BigInt(_)
                        | Constant::Float(_)
                        | Constant::Imaginary(_)),
                    ) => Some(c.clone()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Dotted name this expression spells, if any
    #[must_use]
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(name) => Some(name.clone()),
            Self::Attribute { value, attr } => {
                value.dotted_name().map(|base| format!("{}.{}", base, attr))
            }
            _ => None,
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => write!(f, "{}", c),
            Self::FormattedString(s) => write!(f, "f{:?}", s),
            Self::Name(name) => f.write_str(name),
            Self::Attribute { value, attr } => write!(f, "{}.{}", value, attr),
            Self::Subscript { value, index } => match index.as_ref() {
                Self::Tuple(items) if !items.is_empty() => {
                    write!(f, "{}[", value)?;
                    write_list(f, items)?;
                    f.write_str("]")
                }
                other => write!(f, "{}[{}]", value, other),
            },
            Self::Slice { lower, upper, step } => {
                if let Some(lower) = lower {
                    write!(f, "{}", lower)?;
                }
                f.write_str(":")?;
                if let Some(upper) = upper {
                    write!(f, "{}", upper)?;
                }
                if let Some(step) = step {
                    write!(f, ":{}", step)?;
                }
                Ok(())
            }
            Self::Call { func, args } => {
                write!(f, "{}(", func)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Self::Keyword {
                name: Some(name),
                value,
            } => write!(f, "{}={}", name, value),
            Self::Keyword { name: None, value } => write!(f, "**{}", value),
            Self::Starred(value) => write!(f, "*{}", value),
            Self::Tuple(items) if items.len() == 1 => write!(f, "({},)", items[0]),
            Self::Tuple(items) => {
                f.write_str("(")?;
                write_list(f, items)?;
                f.write_str(")")
            }
            Self::List(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Self::Set(items) => {
                f.write_str("{")?;
                write_list(f, items)?;
                f.write_str("}")
            }
            Self::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    match key {
                        Some(key) => write!(f, "{}: {}", key, value)?,
                        None => write!(f, "**{}", value)?,
                    }
                }
                f.write_str("}")
            }
            Self::Comprehension => f.write_str("<comprehension>"),
            Self::BinOp { op, left, right } => write!(f, "{} {} {}", left, op, right),
            Self::UnaryOp { op, operand } if op.chars().all(char::is_alphabetic) => {
                write!(f, "{} {}", op, operand)
            }
            Self::UnaryOp { op, operand } => write!(f, "{}{}", op, operand),
            Self::Conditional { body, test, orelse } => {
                write!(f, "{} if {} else {}", body, test, orelse)
            }
            Self::Lambda { body } => write!(f, "lambda: {}", body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    #[test]
    fn test_literal_constant_signed() {
        let neg = Expr::UnaryOp {
            op: "-",
            operand: Box::new(Expr::Constant(Constant::Int(5))),
        };
        assert_eq!(neg.literal_constant(), Some(Constant::Int(-5)));

        let pos = Expr::UnaryOp {
            op: "+",
            operand: Box::new(Expr::Constant(Constant::Float(1.5))),
        };
        assert_eq!(pos.literal_constant(), Some(Constant::Float(1.5)));
    }

    #[test]
    fn test_literal_constant_rejects_non_numeric_sign() {
        let neg_str = Expr::UnaryOp {
            op: "-",
            operand: Box::new(Expr::Constant(Constant::Str("x".to_string()))),
        };
        assert_eq!(neg_str.literal_constant(), None);
        assert_eq!(Expr::List(vec![]).literal_constant(), None);
    }

    #[test]
    fn test_dotted_name() {
        let attr = Expr::Attribute {
            value: name("typing"),
            attr: "Literal".to_string(),
        };
        assert_eq!(attr.dotted_name().as_deref(), Some("typing.Literal"));
        assert_eq!(Expr::List(vec![]).dotted_name(), None);
    }

    #[test]
    fn test_display_subscript() {
        let expr = Expr::Subscript {
            value: name("dict"),
            index: Box::new(Expr::Tuple(vec![Expr::Name("str".into()), Expr::Name("int".into())])),
        };
        assert_eq!(expr.to_string(), "dict[str, int]");
    }

    #[test]
    fn test_display_union() {
        let expr = Expr::BinOp {
            op: "|",
            left: name("int"),
            right: Box::new(Expr::Constant(Constant::None)),
        };
        assert_eq!(expr.to_string(), "int | None");
    }
}
