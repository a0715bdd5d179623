//! Epydoc field docstrings.
//!
//! ```text
//! Summary line.
//!
//! @param name: Who to greet.
//! @type name: str
//! @param times: How often.
//! @type times: int?
//! @return: The greeting.
//! @rtype: str
//! ```

use super::{
    cleandoc, join_continuation, parse_error, split_description, DocstringModel, DocstringParser,
    ParamDoc, RaisesDoc, ReturnsDoc,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use stubschema_core::{CheckResult, DocstringStyle};

const PARAM_KEYWORDS: &[&str] = &["param", "keyword"];
const RAISES_KEYWORDS: &[&str] = &["raise", "raises"];
const RETURNS_KEYWORDS: &[&str] = &["return", "returns"];

static FIELD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^@").expect("field pattern is valid"));

/// Epydoc dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct EpydocParser;

impl DocstringParser for EpydocParser {
    fn style(&self) -> DocstringStyle {
        DocstringStyle::Epydoc
    }

    fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
        let text = cleandoc(text);
        let starts: Vec<usize> = FIELD_RE.find_iter(&text).map(|m| m.start()).collect();

        let desc_end = starts.first().copied().unwrap_or(text.len());
        let (short_description, long_description) = split_description(&text[..desc_end]);
        let mut model = DocstringModel {
            short_description,
            long_description,
            ..DocstringModel::default()
        };

        // `@param` and `@type` for one name share an entry
        let mut params: IndexMap<String, ParamDoc> = IndexMap::new();
        let mut rtype: Option<String> = None;

        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            let chunk = text[start..end].trim_end();
            let Some((args, description)) = chunk[1..].split_once(':') else {
                return Err(parse_error(format!(
                    "Error parsing meta information near \"{}\"",
                    chunk
                )));
            };
            let args: Vec<&str> = args.split_whitespace().collect();
            let description = join_continuation(description.trim());

            let Some(&key) = args.first() else {
                return Err(parse_error(format!("Empty field name near \"{}\"", chunk)));
            };

            if PARAM_KEYWORDS.contains(&key) || key == "type" {
                let [_, name] = args.as_slice() else {
                    return Err(parse_error(format!(
                        "Expected one argument for a {} keyword.",
                        key
                    )));
                };
                let entry = params.entry((*name).to_string()).or_insert_with(|| ParamDoc {
                    name: (*name).to_string(),
                    ..ParamDoc::default()
                });
                if key == "type" {
                    match description.strip_suffix('?') {
                        Some(stripped) => {
                            entry.type_expr = Some(stripped.trim_end().to_string());
                            entry.is_optional = true;
                        }
                        None => entry.type_expr = Some(description),
                    }
                } else {
                    entry.description = Some(description);
                }
            } else if RAISES_KEYWORDS.contains(&key) {
                let type_name = match args.as_slice() {
                    [_] => None,
                    [_, type_name] => Some((*type_name).to_string()),
                    _ => {
                        return Err(parse_error(format!(
                            "Expected one or zero arguments for a {} keyword.",
                            key
                        )))
                    }
                };
                model.raises.push(RaisesDoc {
                    type_name,
                    description: Some(description),
                });
            } else if RETURNS_KEYWORDS.contains(&key) {
                model.returns.get_or_insert(ReturnsDoc {
                    type_expr: None,
                    description: Some(description),
                });
            } else if key == "rtype" {
                rtype.get_or_insert(description);
            }
        }

        model.params = params.into_values().collect();
        if let Some(rtype) = rtype {
            model
                .returns
                .get_or_insert_with(ReturnsDoc::default)
                .type_expr
                .get_or_insert(rtype);
        }

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stubschema_core::ErrorKind;

    fn parse(text: &str) -> DocstringModel {
        EpydocParser.parse(text).unwrap()
    }

    const GREET: &str = "Greets a person.

    @param name: Who to greet.
    @type name: str
    @param times: How many
        times.
    @type times: int?
    @return: The greeting.
    @rtype: str
    ";

    #[test]
    fn test_full_docstring() {
        let model = parse(GREET);
        assert_eq!(model.short_description.as_deref(), Some("Greets a person."));
        assert_eq!(model.params.len(), 2);

        let name = &model.params[0];
        assert_eq!(name.name, "name");
        assert_eq!(name.type_expr.as_deref(), Some("str"));
        assert_eq!(name.description.as_deref(), Some("Who to greet."));
        assert!(!name.is_optional);

        let times = &model.params[1];
        assert_eq!(times.type_expr.as_deref(), Some("int"));
        assert!(times.is_optional);
        assert_eq!(times.description.as_deref(), Some("How many\ntimes."));

        let returns = model.returns.unwrap();
        assert_eq!(returns.type_expr.as_deref(), Some("str"));
        assert_eq!(returns.description.as_deref(), Some("The greeting."));
    }

    #[test]
    fn test_type_before_param() {
        let model = parse("S.\n@type x: list[int]\n@param x: The x.\n");
        assert_eq!(model.params.len(), 1);
        assert_eq!(model.params[0].type_expr.as_deref(), Some("list[int]"));
        assert_eq!(model.params[0].description.as_deref(), Some("The x."));
    }

    #[test]
    fn test_type_without_param_has_no_description() {
        let model = parse("S.\n@type x: int\n");
        assert_eq!(model.params[0].name, "x");
        assert_eq!(model.params[0].description, None);
    }

    #[test]
    fn test_raises() {
        let model = parse("S.\n@raise ValueError: When bad.\n@raise: Anything.\n");
        assert_eq!(model.raises.len(), 2);
        assert_eq!(model.raises[0].type_name.as_deref(), Some("ValueError"));
        assert_eq!(model.raises[1].type_name, None);
    }

    #[test]
    fn test_rtype_only() {
        let model = parse("S.\n@rtype: int\n");
        let returns = model.returns.unwrap();
        assert_eq!(returns.type_expr.as_deref(), Some("int"));
        assert_eq!(returns.description, None);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let model = parse("S.\n@author: Someone\n@param x: X.\n");
        assert_eq!(model.meta_count(), 1);
    }

    #[test]
    fn test_no_fields() {
        let model = parse("Just text.\n\nMore.");
        assert_eq!(model.long_description.as_deref(), Some("More."));
        assert_eq!(model.meta_count(), 0);
    }

    #[test]
    fn test_missing_name() {
        let err = EpydocParser.parse("S.\n@param: X.\n").unwrap_err();
        assert!(err.is(ErrorKind::DocstringParseError));
        assert!(err.message.contains("Expected one argument"));
    }

    #[test]
    fn test_missing_colon() {
        let err = EpydocParser.parse("S.\n@param x\n").unwrap_err();
        assert!(err.is(ErrorKind::DocstringParseError));
    }
}
