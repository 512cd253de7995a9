//! Path templates expanded against attribute values.
//!
//! # Design
//! A template is literal text with `:name` placeholders. Placeholders wrapped
//! in parentheses are optional: `/users/(:id)` expands to `/users` when there
//! is no `id` and to `/users/5` when there is, which is how the same template
//! serves both collection and member requests. A placeholder outside
//! parentheses is required and resolving without it is an error.

use crate::attributes::Params;
use crate::error::ModelError;
use crate::http::{encode_component, scalar_to_string};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Var(String),
    Optional(Vec<Token>),
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse(template: &str) -> Vec<Token> {
    let chars: Vec<char> = template.chars().collect();
    let mut pos = 0;
    parse_until(&chars, &mut pos, false)
}

fn parse_until(chars: &[char], pos: &mut usize, in_group: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    while *pos < chars.len() {
        let c = chars[*pos];
        match c {
            ':' if chars.get(*pos + 1).copied().is_some_and(is_ident_start) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                *pos += 1;
                let start = *pos;
                while *pos < chars.len() && is_ident_char(chars[*pos]) {
                    *pos += 1;
                }
                tokens.push(Token::Var(chars[start..*pos].iter().collect()));
            }
            '(' => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                *pos += 1;
                tokens.push(Token::Optional(parse_until(chars, pos, true)));
            }
            ')' if in_group => {
                *pos += 1;
                break;
            }
            _ => {
                literal.push(c);
                *pos += 1;
            }
        }
    }
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    tokens
}

fn collect_vars(tokens: &[Token], include_optional: bool, out: &mut Vec<String>) {
    for token in tokens {
        match token {
            Token::Var(name) if !out.contains(name) => out.push(name.clone()),
            Token::Optional(inner) if include_optional => collect_vars(inner, true, out),
            _ => {}
        }
    }
}

fn lookup(params: &Params, name: &str) -> Option<String> {
    params
        .get(name)
        .filter(|v| !v.is_null())
        .map(|v| encode_component(&scalar_to_string(v)))
}

fn expand(tokens: &[Token], params: &Params, missing: &mut Vec<String>) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::Var(name) => match lookup(params, name) {
                Some(value) => out.push_str(&value),
                None => {
                    if !missing.contains(name) {
                        missing.push(name.clone());
                    }
                }
            },
            Token::Optional(inner) => {
                let mut inner_missing = Vec::new();
                let expanded = expand(inner, params, &mut inner_missing);
                if inner_missing.is_empty() {
                    out.push_str(&expanded);
                }
            }
        }
    }
    out
}

/// A template bound to the parameters it expands against.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    template: String,
    params: Params,
    segments: Vec<String>,
}

impl Path {
    pub fn new(template: &str, params: Params) -> Self {
        Self {
            template: template.to_string(),
            params,
            segments: Vec::new(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Every placeholder name in template order, optional ones included.
    pub fn variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_vars(&parse(&self.template), true, &mut out);
        out
    }

    pub fn required_variables(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_vars(&parse(&self.template), false, &mut out);
        out
    }

    /// Append a literal path segment, e.g. a member action like `publish`.
    pub fn join(&self, segment: &str) -> Path {
        let mut joined = self.clone();
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            joined.segments.push(segment.to_string());
        }
        joined
    }

    /// The same parameters expanded through a different template.
    pub fn with_template(&self, template: &str) -> Path {
        Path::new(template, self.params.clone())
    }

    /// Expand the template. Fails when a required placeholder has no value.
    pub fn resolve(&self) -> Result<String, ModelError> {
        let mut missing = Vec::new();
        let expanded = expand(&parse(&self.template), &self.params, &mut missing);
        if !missing.is_empty() {
            return Err(ModelError::InvalidPath {
                template: self.template.clone(),
                missing,
            });
        }

        let mut path = expanded.strip_suffix('/').unwrap_or(&expanded).to_string();
        for segment in &self.segments {
            path.push('/');
            path.push_str(segment);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn optional_placeholder_drops_when_absent() {
        let path = Path::new("/users/(:id)", Params::new());
        assert_eq!(path.resolve().unwrap(), "/users");
    }

    #[test]
    fn optional_placeholder_fills_when_present() {
        let path = Path::new("/users/(:id)", params(json!({"id": 5})));
        assert_eq!(path.resolve().unwrap(), "/users/5");
    }

    #[test]
    fn null_counts_as_absent() {
        let path = Path::new("/users/(:id)", params(json!({"id": null})));
        assert_eq!(path.resolve().unwrap(), "/users");
    }

    #[test]
    fn required_placeholder_missing_is_an_error() {
        let path = Path::new("/users/:user_id/posts/(:id)", params(json!({"id": 1})));
        match path.resolve().unwrap_err() {
            ModelError::InvalidPath { template, missing } => {
                assert_eq!(template, "/users/:user_id/posts/(:id)");
                assert_eq!(missing, vec!["user_id".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn variables_lists_required_and_optional() {
        let path = Path::new("/users/:user_id/posts/(:id)", Params::new());
        assert_eq!(path.variables(), vec!["user_id", "id"]);
        assert_eq!(path.required_variables(), vec!["user_id"]);
    }

    #[test]
    fn values_are_percent_encoded() {
        let path = Path::new("/tags/:name", params(json!({"name": "a b/c"})));
        assert_eq!(path.resolve().unwrap(), "/tags/a%20b%2Fc");
    }

    #[test]
    fn join_appends_a_segment() {
        let path = Path::new("/users/(:id)", params(json!({"id": 3})));
        assert_eq!(path.join("publish").resolve().unwrap(), "/users/3/publish");
        assert_eq!(path.join("/archive/").resolve().unwrap(), "/users/3/archive");
    }

    #[test]
    fn with_template_keeps_params() {
        let path = Path::new("/users/(:id)", params(json!({"id": 3})));
        let custom = path.with_template("/accounts/:id/activate");
        assert_eq!(custom.resolve().unwrap(), "/accounts/3/activate");
    }

    #[test]
    fn colon_without_identifier_is_literal() {
        let path = Path::new("/search/:/(:q)", Params::new());
        assert_eq!(path.resolve().unwrap(), "/search/:");
    }
}
