//! stubschema parser
//!
//! Turns stub declaration source into [`FunctionDeclaration`]s. The
//! source is tokenized and parsed, never executed. Type annotations are
//! resolved structurally by [`TypeResolver`], and docstrings are read by
//! one of the [`docstring`] dialects.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod annotation;
pub mod ast;
pub mod declaration;
pub mod docstring;
pub mod lexer;
pub mod parser;

pub use annotation::TypeResolver;
pub use ast::{Constant, Expr, FunctionDef, Module, Param, ParamKind, Statement};
pub use declaration::{DeclarationParser, FunctionDeclaration, Parameter};
pub use docstring::{
    parser_for, AutoParser, DocstringModel, DocstringParser, EpydocParser, GoogleParser, NumpyParser, ParamDoc,
    RaisesDoc, RestParser, ReturnsDoc,
};
pub use parser::{parse_expression, parse_module};
