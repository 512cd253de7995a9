//! Normalised view of one HTTP response.
//!
//! # Design
//! Every response is reduced to the same three parts regardless of whether
//! it carried one record, many records or nothing at all. APIs that wrap
//! their payload as `{"data": …, "errors": …, "metadata": …}` are read
//! section by section; any other JSON body is taken as `data` verbatim.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ModelError;
use crate::http::HttpResponse;

const ENVELOPE_KEYS: [&str; 3] = ["data", "errors", "metadata"];

/// Field name → ordered error detail objects, as returned by the server.
pub type ErrorsBySection = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// An object, an array of objects, or null.
    pub data: Value,
    /// Every value is an array of detail objects.
    pub errors: ErrorsBySection,
    /// Passed through untouched; `{}` when absent.
    pub metadata: Value,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            data: Value::Null,
            errors: Map::new(),
            metadata: Value::Object(Map::new()),
        }
    }
}

impl Envelope {
    pub fn from_response(response: &HttpResponse) -> Result<Self, ModelError> {
        if response.body.trim().is_empty() {
            return Ok(Self::default());
        }
        let body: Value = serde_json::from_str(&response.body)
            .map_err(|e| ModelError::Deserialization(e.to_string()))?;
        Ok(Self::from_body(body))
    }

    pub fn from_body(body: Value) -> Self {
        match body {
            Value::Object(mut map) if ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k)) => {
                let data = map.remove("data").unwrap_or(Value::Null);
                let errors = map.remove("errors").map(normalize_errors).unwrap_or_default();
                let metadata = match map.remove("metadata") {
                    Some(Value::Null) | None => Value::Object(Map::new()),
                    Some(metadata) => metadata,
                };
                Self {
                    data,
                    errors,
                    metadata,
                }
            }
            data => Self {
                data,
                ..Self::default()
            },
        }
    }

    pub fn is_collection(&self) -> bool {
        self.data.is_array()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Coerce the `errors` section into field → array of detail objects.
/// A bare string detail becomes `{"error": <string>}`.
fn normalize_errors(errors: Value) -> ErrorsBySection {
    let Value::Object(fields) = errors else {
        return Map::new();
    };
    fields
        .into_iter()
        .map(|(field, details)| {
            let details = match details {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                single => vec![single],
            };
            let details = details
                .into_iter()
                .map(|detail| match detail {
                    Value::Object(_) => detail,
                    Value::String(message) => {
                        let mut obj = Map::new();
                        obj.insert("error".to_string(), Value::String(message));
                        Value::Object(obj)
                    }
                    other => {
                        let mut obj = Map::new();
                        obj.insert("error".to_string(), Value::String(other.to_string()));
                        Value::Object(obj)
                    }
                })
                .collect();
            (field, Value::Array(details))
        })
        .collect()
}
