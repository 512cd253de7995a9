//! Field-scoped error records accumulated on a model.
//!
//! Server-side validation failures are data: each verb call folds the
//! `errors` section of its response into the model's `ValidationErrors`
//! and the caller inspects them afterwards.

use std::fmt;

use serde_json::{Map, Value};

use crate::result::ErrorsBySection;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A translation key, rendered as `:key`.
    Key(String),
    /// Literal text, used when the server sent `use_i18n: false`.
    Text(String),
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Key(key) => write!(f, ":{key}"),
            Message::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub message: Message,
    /// Whatever else the server attached, e.g. `count` for length errors.
    pub options: Map<String, Value>,
}

impl ErrorDetail {
    /// Split a server detail object into message and options.
    ///
    /// `use_i18n` defaults to true and is not kept in the options.
    pub fn from_server(detail: &Value) -> Self {
        let mut options = detail.as_object().cloned().unwrap_or_default();
        let use_i18n = options
            .remove("use_i18n")
            .map(|v| !matches!(v, Value::Null | Value::Bool(false)))
            .unwrap_or(true);
        let raw = match options.remove("error") {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        let message = if use_i18n {
            Message::Key(raw)
        } else {
            Message::Text(raw)
        };
        Self { message, options }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    fields: Vec<(String, Vec<ErrorDetail>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, detail: ErrorDetail) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, details)) => details.push(detail),
            None => self.fields.push((field.to_string(), vec![detail])),
        }
    }

    /// Fold a response's `errors` section in, keeping server order.
    pub fn add_from_envelope(&mut self, errors: &ErrorsBySection) {
        for (field, details) in errors {
            let Some(details) = details.as_array() else {
                continue;
            };
            for detail in details {
                self.add(field, ErrorDetail::from_server(detail));
            }
        }
    }

    pub fn get(&self, field: &str) -> &[ErrorDetail] {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, details)| details.as_slice())
            .unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorDetail)> {
        self.fields
            .iter()
            .flat_map(|(name, details)| details.iter().map(move |d| (name.as_str(), d)))
    }

    /// Total number of error records across all fields.
    pub fn len(&self) -> usize {
        self.fields.iter().map(|(_, details)| details.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }
}
