//! NumPy style docstrings.
//!
//! ```text
//! Summary line.
//!
//! Parameters
//! ----------
//! name : str
//!     Who to greet.
//! times : int, optional
//!     How often.
//!
//! Returns
//! -------
//! str
//!     The greeting.
//! ```

use super::{
    cleandoc, split_description, DocstringModel, DocstringParser, ParamDoc, RaisesDoc, ReturnsDoc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use stubschema_core::{CheckResult, DocstringStyle};

const PARAM_TITLES: &[&str] = &[
    "Parameters",
    "Params",
    "Arguments",
    "Args",
    "Other Parameters",
    "Other Params",
    "Receives",
];
const RAISES_TITLES: &[&str] = &["Raises", "Raise", "Warns", "Warn"];
const RETURNS_TITLES: &[&str] = &["Returns", "Return"];
const OTHER_TITLES: &[&str] = &[
    "Attributes",
    "Yields",
    "Yield",
    "Examples",
    "Example",
    "Notes",
    "Note",
    "Warnings",
    "Warning",
    "See Also",
    "References",
    "Deprecated",
];

static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    let titles: Vec<String> = PARAM_TITLES
        .iter()
        .chain(RAISES_TITLES)
        .chain(RETURNS_TITLES)
        .chain(OTHER_TITLES)
        .map(|t| regex::escape(t))
        .collect();
    Regex::new(&format!(
        r"(?m)^({})[ \t]*\n[ \t]*-+[ \t]*$",
        titles.join("|")
    ))
    .expect("section pattern is valid")
});

/// NumPy dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct NumpyParser;

impl DocstringParser for NumpyParser {
    fn style(&self) -> DocstringStyle {
        DocstringStyle::Numpy
    }

    fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
        let text = cleandoc(text);
        let sections: Vec<_> = SECTION_RE.captures_iter(&text).collect();

        let desc_end = sections
            .first()
            .and_then(|caps| caps.get(0))
            .map_or(text.len(), |m| m.start());
        let (short_description, long_description) = split_description(&text[..desc_end]);
        let mut model = DocstringModel {
            short_description,
            long_description,
            ..DocstringModel::default()
        };

        for (i, caps) in sections.iter().enumerate() {
            let (Some(whole), Some(title)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = sections
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let body = &text[whole.end()..end];
            let title = title.as_str();

            if PARAM_TITLES.contains(&title) {
                for (key, value) in items(body) {
                    model.params.push(param_entry(key, value));
                }
            } else if RAISES_TITLES.contains(&title) {
                for (key, value) in items(body) {
                    model.raises.push(RaisesDoc {
                        type_name: (!key.is_empty()).then(|| key.to_string()),
                        description: Some(value),
                    });
                }
            } else if RETURNS_TITLES.contains(&title) {
                if let Some((key, value)) = items(body).into_iter().next() {
                    model.returns.get_or_insert(returns_entry(key, value));
                }
            }
        }

        Ok(model)
    }
}

/// Key/value items: a key line at column zero followed by indented text
fn items(body: &str) -> Vec<(&str, String)> {
    let mut out: Vec<(&str, Vec<&str>)> = Vec::new();
    for line in body.split('\n') {
        let starts_item = line.chars().next().is_some_and(|c| !c.is_whitespace());
        if starts_item {
            out.push((line.trim_end(), Vec::new()));
        } else if let Some((_, value)) = out.last_mut() {
            value.push(line);
        }
    }
    out.into_iter()
        .map(|(key, value)| (key, cleandoc(&value.join("\n"))))
        .collect()
}

fn param_entry(key: &str, description: String) -> ParamDoc {
    let (name, type_text) = match key.split_once(':') {
        Some((name, type_text)) => (name.trim(), Some(type_text.trim())),
        None => (key.trim(), None),
    };
    let (type_expr, is_optional) = match type_text {
        Some(t) => {
            if let Some(stripped) = t.strip_suffix(", optional") {
                (Some(stripped), true)
            } else if let Some(stripped) = t.strip_suffix("(optional)") {
                (Some(stripped.trim_end()), true)
            } else {
                (Some(t), false)
            }
        }
        None => (None, false),
    };
    ParamDoc {
        name: name.to_string(),
        type_expr: type_expr.filter(|t| !t.is_empty()).map(str::to_string),
        description: Some(description),
        is_optional,
    }
}

fn returns_entry(key: &str, description: String) -> ReturnsDoc {
    let type_text = match key.split_once(':') {
        Some((_, type_text)) => type_text.trim(),
        None => key.trim(),
    };
    ReturnsDoc {
        type_expr: (!type_text.is_empty()).then(|| type_text.to_string()),
        description: Some(description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DocstringModel {
        NumpyParser.parse(text).unwrap()
    }

    const GREET: &str = "Greets a person.

    Parameters
    ----------
    name : str
        Who to greet.
    times : int, optional
        How many times.

    Returns
    -------
    str
        The greeting.
    ";

    #[test]
    fn test_full_docstring() {
        let model = parse(GREET);
        assert_eq!(model.short_description.as_deref(), Some("Greets a person."));
        assert_eq!(model.params.len(), 2);
        assert_eq!(model.params[0].name, "name");
        assert_eq!(model.params[0].type_expr.as_deref(), Some("str"));
        assert_eq!(model.params[0].description.as_deref(), Some("Who to greet."));
        assert_eq!(model.params[1].type_expr.as_deref(), Some("int"));
        assert!(model.params[1].is_optional);

        let returns = model.returns.unwrap();
        assert_eq!(returns.type_expr.as_deref(), Some("str"));
        assert_eq!(returns.description.as_deref(), Some("The greeting."));
    }

    #[test]
    fn test_named_return() {
        let model = parse("S.\n\nReturns\n-------\nresult : list[int]\n    Values.\n");
        assert_eq!(
            model.returns.unwrap().type_expr.as_deref(),
            Some("list[int]")
        );
    }

    #[test]
    fn test_untyped_param() {
        let model = parse("S.\n\nParameters\n----------\nx\n    The x.\n");
        assert_eq!(model.params[0].name, "x");
        assert_eq!(model.params[0].type_expr, None);
    }

    #[test]
    fn test_missing_description() {
        let model = parse("S.\n\nParameters\n----------\nx : int\n");
        assert_eq!(model.params[0].description.as_deref(), Some(""));
    }

    #[test]
    fn test_raises() {
        let model = parse("S.\n\nRaises\n------\nValueError\n    If bad.\n");
        assert_eq!(model.raises.len(), 1);
        assert_eq!(model.raises[0].type_name.as_deref(), Some("ValueError"));
    }

    #[test]
    fn test_ignored_sections() {
        let model = parse("S.\n\nNotes\n-----\nx : int\n    Not a parameter.\n");
        assert!(model.params.is_empty());
    }

    #[test]
    fn test_no_sections() {
        let model = parse("Just text.");
        assert_eq!(model.meta_count(), 0);
    }
}
