//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `Connection` builds `HttpRequest` values and turns `HttpResponse` values
//! into envelopes; a `Transport` implementation is the only place that ever
//! touches the network. Swapping `UreqTransport` for `MockTransport` is how
//! every unit test in this crate runs without a server.

use std::fmt;

use serde_json::{Map, Value};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 5] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute (base url joined with the resolved path). `query` holds
/// already-flattened pairs, `None` for a key sent without a value;
/// transports append them to the url.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, Option<String>)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// The url with the query string appended, as it goes over the wire.
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{}={}", encode_component(k), encode_component(v)),
                None => encode_component(k),
            })
            .collect();
        format!("{}?{}", self.url, query.join("&"))
    }
}

/// An HTTP response described as plain data.
///
/// `url` is the url the transport actually requested; it is carried for
/// instrumentation only.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub url: String,
    pub body: String,
}

/// Flatten request parameters into bracket-notation query pairs.
///
/// `{"a": 1, "b": {"c": 2}, "d": [1, 2]}` becomes
/// `a=1`, `b[c]=2`, `d[]=1`, `d[]=2`. A null value leaves the bare key.
pub fn flatten_query(params: &Map<String, Value>) -> Vec<(String, Option<String>)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten_into(key.clone(), value, &mut pairs);
    }
    pairs
}

fn flatten_into(prefix: String, value: &Value, pairs: &mut Vec<(String, Option<String>)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(format!("{prefix}[{key}]"), nested, pairs);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(format!("{prefix}[]"), item, pairs);
            }
        }
        Value::Null => pairs.push((prefix, None)),
        other => pairs.push((prefix, Some(scalar_to_string(other)))),
    }
}

/// Render a scalar JSON value the way it appears in a url.
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub(crate) fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
