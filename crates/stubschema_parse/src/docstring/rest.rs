//! reStructuredText field-list docstrings.
//!
//! ```text
//! Summary line.
//!
//! :param str name: Who to greet.
//! :param times: How often.
//! :type times: int
//! :returns: The greeting.
//! :rtype: str
//! ```

use super::{
    cleandoc, join_continuation, parse_error, split_description, DocstringModel, DocstringParser,
    ParamDoc, RaisesDoc, ReturnsDoc,
};
use std::collections::HashMap;
use stubschema_core::{CheckResult, DocstringStyle};

const PARAM_KEYWORDS: &[&str] = &[
    "param",
    "parameter",
    "arg",
    "argument",
    "attribute",
    "key",
    "keyword",
];
const RAISES_KEYWORDS: &[&str] = &["raises", "raise", "except", "exception"];
const RETURNS_KEYWORDS: &[&str] = &["return", "returns"];

/// reStructuredText dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct RestParser;

impl DocstringParser for RestParser {
    fn style(&self) -> DocstringStyle {
        DocstringStyle::Rest
    }

    fn parse(&self, text: &str) -> CheckResult<DocstringModel> {
        let text = cleandoc(text);
        let meta_start = field_start(&text);
        let (desc_chunk, meta_chunk) = text.split_at(meta_start.unwrap_or(text.len()));

        let (short_description, long_description) = split_description(desc_chunk);
        let mut model = DocstringModel {
            short_description,
            long_description,
            ..DocstringModel::default()
        };

        let mut types: HashMap<String, String> = HashMap::new();
        let mut rtype: Option<String> = None;

        for chunk in field_chunks(meta_chunk) {
            let body = chunk.trim_start_matches(':');
            let Some((args, description)) = body.split_once(':') else {
                return Err(parse_error(format!(
                    "Error parsing meta information near \"{}\"",
                    chunk.trim_end()
                )));
            };
            let args: Vec<&str> = args.split_whitespace().collect();
            let description = join_continuation(description.trim());

            let Some(&key) = args.first() else {
                return Err(parse_error(format!(
                    "Empty field name near \"{}\"",
                    chunk.trim_end()
                )));
            };

            if key == "type" && args.len() == 2 {
                types.insert(args[1].to_string(), description);
            } else if key == "rtype" && args.len() <= 2 {
                rtype.get_or_insert(description);
            } else if PARAM_KEYWORDS.contains(&key) {
                model.params.push(param_entry(key, &args, description)?);
            } else if RAISES_KEYWORDS.contains(&key) {
                let type_name = single_argument(key, &args)?;
                model.raises.push(RaisesDoc {
                    type_name,
                    description: Some(description),
                });
            } else if RETURNS_KEYWORDS.contains(&key) {
                let type_expr = single_argument(key, &args)?;
                model.returns.get_or_insert(ReturnsDoc {
                    type_expr,
                    description: Some(description),
                });
            }
        }

        for param in &mut model.params {
            if param.type_expr.is_none() {
                param.type_expr = types.get(&param.name).cloned();
            }
        }
        if let Some(rtype) = rtype {
            match model.returns.as_mut() {
                Some(returns) => {
                    returns.type_expr.get_or_insert(rtype);
                }
                None => {
                    model.returns = Some(ReturnsDoc {
                        type_expr: Some(rtype),
                        description: None,
                    });
                }
            }
        }

        Ok(model)
    }
}

/// Byte offset of the first line starting with `:`
fn field_start(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.starts_with(':') {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

/// Group lines into fields, each starting at a line beginning with `:`
fn field_chunks(meta: &str) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    for line in meta.split('\n') {
        match chunks.last_mut() {
            Some(chunk) if !line.starts_with(':') => {
                chunk.push('\n');
                chunk.push_str(line);
            }
            _ => chunks.push(line.to_string()),
        }
    }
    chunks
}

fn param_entry(key: &str, args: &[&str], description: String) -> CheckResult<ParamDoc> {
    let (type_expr, name) = match args {
        [_, name] => (None, *name),
        [_, type_expr, name] => (Some(*type_expr), *name),
        _ => {
            return Err(parse_error(format!(
                "Expected one or two arguments for a {} keyword.",
                key
            )))
        }
    };
    let (type_expr, is_optional) = match type_expr {
        Some(t) => match t.strip_suffix('?') {
            Some(stripped) => (Some(stripped.to_string()), true),
            None => (Some(t.to_string()), false),
        },
        None => (None, false),
    };
    Ok(ParamDoc {
        name: name.to_string(),
        type_expr,
        description: Some(description),
        is_optional,
    })
}

fn single_argument(key: &str, args: &[&str]) -> CheckResult<Option<String>> {
    match args {
        [_] => Ok(None),
        [_, arg] => Ok(Some((*arg).to_string())),
        _ => Err(parse_error(format!(
            "Expected one or zero arguments for a {} keyword.",
            key
        ))),
    }
}
