//! Structured docstring parsing.
//!
//! Four dialects are supported: reStructuredText field lists, Google
//! sections, NumPy underlined sections and Epydoc `@` fields.
//! [`AutoParser`] runs all of them and keeps the parse that found the most
//! metadata.

mod epydoc;
mod google;
mod numpy;
mod rest;

pub use epydoc::EpydocParser;
pub use google::GoogleParser;
pub use numpy::NumpyParser;
pub use rest::RestParser;

use std::fmt;
use stubschema_core::{CheckResult, Diagnostic, DocstringStyle, ErrorKind};
use tracing::trace;

/// Documentation of one parameter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDoc {
    /// Parameter name
    pub name: String,
    /// Type text as written
    pub type_expr: Option<String>,
    /// Description text
    pub description: Option<String>,
    /// Whether the type text carried an optional marker
    pub is_optional: bool,
}

/// One declared exception
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RaisesDoc {
    /// Exception type text
    pub type_name: Option<String>,
    /// Description text
    pub description: Option<String>,
}

/// Documentation of the return value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnsDoc {
    /// Type text as written
    pub type_expr: Option<String>,
    /// Description text
    pub description: Option<String>,
}

/// Parsed docstring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocstringModel {
    /// First line of the description
    pub short_description: Option<String>,
    /// Remaining description text
    pub long_description: Option<String>,
    /// Parameter entries in docstring order, duplicates included
    pub params: Vec<ParamDoc>,
    /// Exception entries
    pub raises: Vec<RaisesDoc>,
    /// Return entry
    pub returns: Option<ReturnsDoc>,
}

impl DocstringModel {
    /// Number of metadata entries recognized
    #[must_use]
    pub fn meta_count(&self) -> usize {
        self.params.len() + self.raises.len() + usize::from(self.returns.is_some())
    }

    /// Last entry documenting `name`
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamDoc> {
        self.params.iter().rev().find(|p| p.name == name)
    }
}

/// A docstring dialect
pub trait DocstringParser: fmt::Debug + Send + Sync {
    /// Dialect this parser implements
    fn style(&self) -> DocstringStyle;

    /// Parse raw docstring text
    ///
    /// # Errors
    ///
    /// Returns `DocstringParseError` when the text is not valid in this
    /// dialect
    fn parse(&self, text: &str) -> CheckResult<DocstringModel>;
}

/// Tries every dialect and keeps the richest successful parse
#[derive(Debug)]
pub struct AutoParser {
    dialects: Vec<Box<dyn DocstringParser>>,
}

impl AutoParser {
    /// Create a parser trying ReST, Google, NumPy, then Epydoc
    #[must_use]
    pub fn new() -> Self {
        Self {
            dialects: vec![
                Box::new(RestParser),
                Box::new(GoogleParser),
                Box::new(NumpyParser),
                Box::new(EpydocParser),
            ],
        }
    }
}

impl Default for AutoParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocstringParser for AutoParser {
    fn style(&self) -> DocstringStyle {
        DocstringStyle::Auto
    }

    fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
        let mut best: Option<(DocstringStyle, DocstringModel)> = None;
        let mut first_error: Option<Diagnostic> = None;

        for dialect in &self.dialects {
            match dialect.parse(text) {
                Ok(model) => {
                    if best
                        .as_ref()
                        .is_none_or(|(_, b)| model.meta_count() > b.meta_count())
                    {
                        best = Some((dialect.style(), model));
                    }
                }
                Err(err) => {
                    trace!(style = %dialect.style(), error = %err, "dialect rejected docstring");
                    first_error.get_or_insert(err);
                }
            }
        }

        match (best, first_error) {
            (Some((style, model)), _) => {
                trace!(%style, meta = model.meta_count(), "selected docstring dialect");
                Ok(model)
            }
            (None, Some(err)) => Err(err),
            (None, None) => Err(Diagnostic::new(
                ErrorKind::DocstringParseError,
                "No docstring dialect is configured",
            )),
        }
    }
}

/// Parser for a configured style
#[must_use]
pub fn parser_for(style: DocstringStyle) -> Box<dyn DocstringParser> {
    match style {
        DocstringStyle::Auto => Box::new(AutoParser::new()),
        DocstringStyle::Rest => Box::new(RestParser),
        DocstringStyle::Google => Box::new(GoogleParser),
        DocstringStyle::Numpy => Box::new(NumpyParser),
        DocstringStyle::Epydoc => Box::new(EpydocParser),
    }
}

/// Normalize docstring indentation.
///
/// Tabs are expanded, the first line is left-stripped, the common
/// indentation of the remaining lines is removed, and empty lines at
/// either end are dropped.
#[must_use]
pub fn cleandoc(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = normalized.split('\n').map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().take_while(|c| c.is_whitespace()).count())
        .min();

    let mut cleaned: Vec<String> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            cleaned.push(line.trim_start().to_string());
        } else {
            let margin = margin.unwrap_or(0);
            cleaned.push(line.chars().skip(margin).collect());
        }
    }

    while cleaned.last().is_some_and(String::is_empty) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|line| line.is_empty()).count();
    cleaned.drain(..leading);
    cleaned.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0usize;
    for c in line.chars() {
        if c == '\t' {
            let next = (column / 8 + 1) * 8;
            out.extend(std::iter::repeat_n(' ', next - column));
            column = next;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

/// Split a description block into its first line and the rest
fn split_description(chunk: &str) -> (Option<String>, Option<String>) {
    let (short, long) = match chunk.split_once('\n') {
        Some((short, rest)) => (short, rest.trim()),
        None => (chunk, ""),
    };
    let short = (!short.is_empty()).then(|| short.to_string());
    let long = (!long.is_empty()).then(|| long.to_string());
    (short, long)
}

/// Keep a description's first line and dedent its continuation lines
fn join_continuation(description: &str) -> String {
    match description.split_once('\n') {
        Some((first, rest)) => {
            let rest = cleandoc(rest);
            if rest.is_empty() {
                first.to_string()
            } else {
                format!("{}\n{}", first, rest)
            }
        }
        None => description.to_string(),
    }
}

fn parse_error(message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(ErrorKind::DocstringParseError, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleandoc_strips_margin() {
        let text = "Summary.\n\n    Details here.\n      Indented.\n    ";
        assert_eq!(cleandoc(text), "Summary.\n\nDetails here.\n  Indented.");
    }

    #[test]
    fn test_cleandoc_leading_blank_lines() {
        assert_eq!(cleandoc("\n\n    Summary.\n    "), "Summary.");
    }

    #[test]
    fn test_cleandoc_tabs_and_crlf() {
        assert_eq!(cleandoc("A\r\n\tB\r\n\tC"), "A\nB\nC");
    }

    #[test]
    fn test_split_description() {
        assert_eq!(
            split_description("Short.\n\nLong text.\n"),
            (Some("Short.".to_string()), Some("Long text.".to_string()))
        );
        assert_eq!(split_description(""), (None, None));
    }

    #[test]
    fn test_join_continuation() {
        assert_eq!(join_continuation("first\n    second\n    third"), "first\nsecond\nthird");
        assert_eq!(join_continuation("only"), "only");
    }

    #[test]
    fn test_auto_prefers_richest_parse() {
        let text = "Sum.\n\nArgs:\n    a (int): First.\n    b (int): Second.\n";
        let model = AutoParser::new().parse(text).unwrap();
        assert_eq!(model.params.len(), 2);
        assert_eq!(model.params[0].type_expr.as_deref(), Some("int"));
    }

    #[test]
    fn test_auto_selects_rest() {
        let text = "Sum.\n\n:param a: First.\n:type a: int\n";
        let model = AutoParser::new().parse(text).unwrap();
        assert_eq!(model.params.len(), 1);
        assert_eq!(model.params[0].type_expr.as_deref(), Some("int"));
    }

    #[test]
    fn test_auto_selects_numpy() {
        let text = "Sum.\n\nParameters\n----------\na : int\n    First.\n";
        let model = AutoParser::new().parse(text).unwrap();
        assert_eq!(model.params.len(), 1);
        assert_eq!(model.params[0].description.as_deref(), Some("First."));
    }

    #[test]
    fn test_auto_selects_epydoc() {
        let text = "Sum.\n\n@param a: First.\n@type a: int\n@raise None: Never.\n";
        let model = AutoParser::new().parse(text).unwrap();
        assert_eq!(model.params.len(), 1);
        assert_eq!(model.params[0].type_expr.as_deref(), Some("int"));
        assert_eq!(model.raises[0].type_name.as_deref(), Some("None"));
    }

    #[test]
    fn test_auto_plain_summary() {
        let model = AutoParser::new().parse("Just a summary.").unwrap();
        assert_eq!(model.short_description.as_deref(), Some("Just a summary."));
        assert_eq!(model.meta_count(), 0);
    }

    #[test]
    fn test_auto_falls_back_when_one_dialect_fails() {
        let model = AutoParser::new().parse("Sum.\n\n:param a b c d: x\n").unwrap();
        assert_eq!(model.short_description.as_deref(), Some("Sum."));
    }

    #[test]
    fn test_param_lookup_returns_last_entry() {
        let model = DocstringModel {
            params: vec![
                ParamDoc {
                    name: "a".into(),
                    description: Some("first".into()),
                    ..ParamDoc::default()
                },
                ParamDoc {
                    name: "a".into(),
                    description: Some("second".into()),
                    ..ParamDoc::default()
                },
            ],
            ..DocstringModel::default()
        };
        assert_eq!(model.param("a").unwrap().description.as_deref(), Some("second"));
        assert!(model.param("b").is_none());
    }

    #[test]
    fn test_parser_for_style() {
        assert_eq!(parser_for(DocstringStyle::Google).style(), DocstringStyle::Google);
        assert_eq!(parser_for(DocstringStyle::Auto).style(), DocstringStyle::Auto);
        assert_eq!(parser_for(DocstringStyle::Epydoc).style(), DocstringStyle::Epydoc);
    }
}
