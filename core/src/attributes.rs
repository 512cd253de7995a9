//! Per-instance attribute storage.
//!
//! # Design
//! Values are kept as `serde_json::Value` in an insertion-ordered map, so the
//! store round-trips through JSON without loss and iteration order matches
//! the order in which keys were first written. Coercion rules are declared
//! per class and shared between instances; they run on every write through
//! `set`. `set_raw` bypasses them for internal bookkeeping.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

/// Request parameters and attribute maps share one representation.
pub type Params = Map<String, Value>;

/// A cast applied to a value when it is written to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Integer,
    Float,
    Boolean,
    String,
    /// Stored as `YYYY-MM-DD`.
    Date,
    /// Stored as an RFC 3339 UTC timestamp.
    DateTime,
}

impl Coercion {
    /// Cast `value`, handing it back unchanged in `Err` when it cannot be cast.
    /// `null` always passes through.
    pub fn apply(self, value: Value) -> Result<Value, Value> {
        if value.is_null() {
            return Ok(value);
        }
        let cast = match (self, &value) {
            (Coercion::Integer, v) => to_integer(v),
            (Coercion::Float, v) => to_float(v),
            (Coercion::Boolean, v) => to_boolean(v),
            (Coercion::String, Value::String(_)) => Some(value.clone()),
            (Coercion::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Coercion::String, Value::Bool(b)) => Some(Value::String(b.to_string())),
            (Coercion::String, _) => None,
            (Coercion::Date, v) => parse_date(v).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            (Coercion::DateTime, v) => parse_datetime(v)
                .map(|t| Value::String(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        };
        cast.ok_or(value)
    }
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Value::from),
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Number::from_f64(f).map(Value::Number)
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::Bool(n.as_f64() != Some(0.0))),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" | "on" => Some(Value::Bool(true)),
            "false" | "f" | "0" | "no" | "n" | "off" | "" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?;
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|t| t.date_naive()))
}

fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|t| t.and_utc())
            }),
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        _ => None,
    }
}

/// The object behind `value` as a parameter map; anything else is empty.
pub fn params_from(value: Value) -> Params {
    match value {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

/// Truthiness used by predicates: only `null` and `false` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// Whether a value counts as blank for id assignment and lookups.
pub(crate) fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[derive(Debug, Clone, Default)]
pub struct Attributes {
    values: Params,
    coercions: Arc<BTreeMap<String, Coercion>>,
}

impl Attributes {
    pub fn new(coercions: Arc<BTreeMap<String, Coercion>>) -> Self {
        Self {
            values: Params::new(),
            coercions,
        }
    }

    /// Start from scope parameters, e.g. the foreign key of an association.
    pub fn seeded(coercions: Arc<BTreeMap<String, Coercion>>, params: &Params) -> Self {
        let mut attributes = Self::new(coercions);
        for (key, value) in params {
            attributes.set(key, value.clone());
        }
        attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Write `value` under `key`, applying the key's coercion if one is declared.
    /// An existing value is replaced, never merged.
    pub fn set(&mut self, key: &str, value: Value) {
        let value = match self.coercions.get(key) {
            Some(coercion) => coercion.apply(value).unwrap_or_else(|original| {
                tracing::debug!(key, ?coercion, value = %original, "value left uncoerced");
                original
            }),
            None => value,
        };
        self.set_raw(key, value);
    }

    pub fn set_raw(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.shift_remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// A copy of the values without `keys`, preserving order.
    pub fn except(&self, keys: &[&str]) -> Params {
        self.values
            .iter()
            .filter(|(k, _)| !keys.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn as_map(&self) -> &Params {
        &self.values
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        self.get(key).and_then(parse_date)
    }

    pub fn datetime(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(parse_datetime)
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}
