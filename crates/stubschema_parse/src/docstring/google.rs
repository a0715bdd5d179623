//! Google style docstrings.
//!
//! ```text
//! Summary line.
//!
//! Args:
//!     name (str): Who to greet.
//!     times (int, optional): How often.
//!
//! Returns:
//!     str: The greeting.
//! ```

use super::{
    cleandoc, join_continuation, parse_error, split_description, DocstringModel, DocstringParser,
    ParamDoc, RaisesDoc, ReturnsDoc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use stubschema_core::{CheckResult, DocstringStyle};

const PARAM_TITLES: &[&str] = &[
    "Args",
    "Arguments",
    "Parameters",
    "Params",
    "Keyword Args",
    "Keyword Arguments",
    "Other Parameters",
];
const RAISES_TITLES: &[&str] = &["Raises", "Exceptions", "Except"];
const RETURNS_TITLES: &[&str] = &["Returns", "Return"];
const OTHER_TITLES: &[&str] = &[
    "Attributes",
    "Example",
    "Examples",
    "Yields",
    "Yield",
    "Note",
    "Notes",
    "Warning",
    "Warnings",
    "See Also",
    "Todo",
    "References",
];

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    let titles: Vec<String> = PARAM_TITLES
        .iter()
        .chain(RAISES_TITLES)
        .chain(RETURNS_TITLES)
        .chain(OTHER_TITLES)
        .map(|t| regex::escape(t))
        .collect();
    Regex::new(&format!(r"(?m)^({})[ \t]*:[ \t]*$", titles.join("|")))
        .expect("section title pattern is valid")
});

static TYPED_ARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(.+?)\s*\(\s*(.*\S)\s*\)").expect("typed arg pattern is valid"));

static MULTIPLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\s*[^:\s]+:|[^:]*\]:)").expect("multiple entry pattern is valid")
});

static UNKNOWN_META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\S").expect("unknown meta pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Params,
    Raises,
    Returns,
    Other,
}

impl Section {
    fn of(title: &str) -> Self {
        if PARAM_TITLES.contains(&title) {
            Self::Params
        } else if RAISES_TITLES.contains(&title) {
            Self::Raises
        } else if RETURNS_TITLES.contains(&title) {
            Self::Returns
        } else {
            Self::Other
        }
    }
}

/// Google dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleParser;

impl DocstringParser for GoogleParser {
    fn style(&self) -> DocstringStyle {
        DocstringStyle::Google
    }

    fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
        let text = cleandoc(text);
        let titles: Vec<_> = TITLE_RE.captures_iter(&text).collect();

        let desc_end = titles
            .first()
            .and_then(|caps| caps.get(0))
            .map_or(text.len(), |m| m.start());
        let (short_description, long_description) = split_description(&text[..desc_end]);
        let mut model = DocstringModel {
            short_description,
            long_description,
            ..DocstringModel::default()
        };

        for (i, caps) in titles.iter().enumerate() {
            let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = titles
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let section = Section::of(title.as_str());
            if section == Section::Other {
                continue;
            }

            let mut chunk = &text[whole.end()..end];
            if let Some(unknown) = UNKNOWN_META_RE.find(chunk) {
                chunk = &chunk[..unknown.start()];
            }
            let chunk = chunk.trim_matches('\n');

            match section {
                Section::Returns => {
                    let entry = returns_entry(&cleandoc(chunk))?;
                    model.returns.get_or_insert(entry);
                }
                Section::Params => {
                    for entry in entries(title.as_str(), chunk)? {
                        model.params.push(param_entry(entry)?);
                    }
                }
                Section::Raises => {
                    for entry in entries(title.as_str(), chunk)? {
                        model.raises.push(raises_entry(entry)?);
                    }
                }
                Section::Other => {}
            }
        }

        Ok(model)
    }
}

/// Split a section into entries at lines indented exactly like the first
fn entries<'c>(title: &str, chunk: &'c str) -> CheckResult<Vec<&'c str>> {
    let indent_len = chunk
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map_or(chunk.len(), |(i, _)| i);
    let indent = &chunk[..indent_len];

    let mut starts: Vec<(usize, usize)> = Vec::new();
    let mut offset = 0;
    for line in chunk.split_inclusive('\n') {
        if let Some(rest) = line.strip_prefix(indent) {
            if rest.chars().next().is_some_and(|c| !c.is_whitespace()) {
                starts.push((offset, offset + indent.len()));
            }
        }
        offset += line.len();
    }

    if starts.is_empty() {
        return Err(parse_error(format!("No specification for \"{}\"", title)));
    }

    let mut out = Vec::with_capacity(starts.len());
    for (i, &(_, body_start)) in starts.iter().enumerate() {
        let end = starts.get(i + 1).map_or(chunk.len(), |&(line_start, _)| line_start);
        out.push(chunk[body_start..end].trim_matches('\n'));
    }
    Ok(out)
}

/// Split an entry at its first colon and normalize the description
fn split_entry(text: &str) -> CheckResult<(&str, String)> {
    let Some((before, desc)) = text.split_once(':') else {
        return Err(parse_error(format!("Expected a colon in {:?}.", text)));
    };
    let desc = desc.strip_prefix(' ').unwrap_or(desc);
    let desc = join_continuation(desc);
    Ok((before, desc.trim_matches('\n').to_string()))
}

fn param_entry(text: &str) -> CheckResult<ParamDoc> {
    let (before, description) = split_entry(text)?;
    let (name, type_expr, is_optional) = match TYPED_ARG_RE.captures(before) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str());
            let type_text = caps.get(2).map_or("", |m| m.as_str());
            let (type_text, is_optional) = if let Some(t) = type_text.strip_suffix(", optional") {
                (t, true)
            } else if let Some(t) = type_text.strip_suffix('?') {
                (t, true)
            } else {
                (type_text, false)
            };
            (name, Some(type_text.to_string()), is_optional)
        }
        None => (before.trim(), None, false),
    };
    Ok(ParamDoc {
        name: name.to_string(),
        type_expr,
        description: Some(description),
        is_optional,
    })
}

fn raises_entry(text: &str) -> CheckResult<RaisesDoc> {
    let (before, description) = split_entry(text)?;
    let type_name = before.trim();
    Ok(RaisesDoc {
        type_name: (!type_name.is_empty()).then(|| type_name.to_string()),
        description: Some(description),
    })
}

/// A returns section is either `type: description` or free text
fn returns_entry(text: &str) -> CheckResult<ReturnsDoc> {
    if !MULTIPLE_RE.is_match(text) {
        return Ok(ReturnsDoc {
            type_expr: None,
            description: Some(text.to_string()),
        });
    }
    let (before, description) = split_entry(text)?;
    Ok(ReturnsDoc {
        type_expr: Some(before.trim().to_string()),
        description: Some(description),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stubschema_core::ErrorKind;

    fn parse(text: &str) -> DocstringModel {
        GoogleParser.parse(text).unwrap()
    }

    const GREET: &str = "Greets a person.

    Longer description.

    Args:
        name (str): Who to greet.
        times (int, optional): How many times.
            Defaults to once.

    Returns:
        str: The greeting.
    ";

    #[test]
    fn test_full_docstring() {
        let model = parse(GREET);
        assert_eq!(model.short_description.as_deref(), Some("Greets a person."));
        assert_eq!(model.long_description.as_deref(), Some("Longer description."));
        assert_eq!(model.params.len(), 2);

        let name = &model.params[0];
        assert_eq!(name.name, "name");
        assert_eq!(name.type_expr.as_deref(), Some("str"));
        assert_eq!(name.description.as_deref(), Some("Who to greet."));
        assert!(!name.is_optional);

        let times = &model.params[1];
        assert_eq!(times.type_expr.as_deref(), Some("int"));
        assert!(times.is_optional);
        assert_eq!(
            times.description.as_deref(),
            Some("How many times.\nDefaults to once.")
        );

        let returns = model.returns.unwrap();
        assert_eq!(returns.type_expr.as_deref(), Some("str"));
        assert_eq!(returns.description.as_deref(), Some("The greeting."));
    }

    #[test]
    fn test_untyped_param() {
        let model = parse("S.\n\nArgs:\n    x: The x.\n");
        assert_eq!(model.params[0].name, "x");
        assert_eq!(model.params[0].type_expr, None);
    }

    #[test]
    fn test_generic_type_with_comma() {
        let model = parse("S.\n\nArgs:\n    m (dict[str, int]): Map.\n");
        assert_eq!(model.params[0].type_expr.as_deref(), Some("dict[str, int]"));
    }

    #[test]
    fn test_free_text_returns() {
        let model = parse("S.\n\nReturns:\n    The greeting text.\n");
        let returns = model.returns.unwrap();
        assert_eq!(returns.type_expr, None);
        assert_eq!(returns.description.as_deref(), Some("The greeting text."));
    }

    #[test]
    fn test_raises() {
        let model = parse("S.\n\nRaises:\n    ValueError: Bad input.\n    KeyError: Missing.\n");
        assert_eq!(model.raises.len(), 2);
        assert_eq!(model.raises[1].type_name.as_deref(), Some("KeyError"));
    }

    #[test]
    fn test_unknown_text_ends_section() {
        let model = parse("S.\n\nArgs:\n    x (int): X.\nTrailing paragraph.\n");
        assert_eq!(model.params.len(), 1);
        assert_eq!(model.params[0].description.as_deref(), Some("X."));
    }

    #[test]
    fn test_attributes_ignored() {
        let model = parse("S.\n\nAttributes:\n    x (int): X.\n");
        assert!(model.params.is_empty());
    }

    #[test]
    fn test_missing_colon() {
        let err = GoogleParser.parse("S.\n\nArgs:\n    x (int) no colon\n").unwrap_err();
        assert!(err.is(ErrorKind::DocstringParseError));
        assert!(err.message.contains("Expected a colon"));
    }

    #[test]
    fn test_empty_section() {
        let err = GoogleParser.parse("S.\n\nArgs:\n").unwrap_err();
        assert!(err.message.contains("No specification"));
    }

    #[test]
    fn test_no_sections() {
        let model = parse("Summary only.\n\nMore text.");
        assert_eq!(model.short_description.as_deref(), Some("Summary only."));
        assert_eq!(model.long_description.as_deref(), Some("More text."));
        assert_eq!(model.meta_count(), 0);
    }
}
