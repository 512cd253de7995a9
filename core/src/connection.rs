//! Request building, execution and instrumentation.
//!
//! # Design
//! `Connection` is the only object that talks to a `Transport`. It turns a
//! method, a resolved path and a parameter map into a plain-data
//! `HttpRequest` (query string for GET, JSON body otherwise), executes it
//! inside a tracing span, and reduces the response to an `Envelope`. It is
//! created once from a `Config` and shared by every class of a schema.

use std::fmt;

use tracing::field;

use crate::attributes::Params;
use crate::config::Config;
use crate::error::ModelError;
use crate::http::{flatten_query, HttpMethod, HttpRequest};
use crate::result::Envelope;
use crate::transport::{Transport, UreqTransport};

pub struct Connection {
    config: Config,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new(config: Config, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Box::new(transport),
        }
    }

    /// A connection backed by a blocking `ureq` agent.
    pub fn ureq(config: Config) -> Self {
        let transport = UreqTransport::new(&config);
        Self::new(config, transport)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<HttpRequest, ModelError> {
        let mut headers = vec![("accept".to_string(), "application/json".to_string())];
        headers.extend(self.config.headers.iter().cloned());

        let url = format!("{}{}", self.config.base_url, path);
        if method == HttpMethod::Get {
            return Ok(HttpRequest {
                method,
                url,
                query: flatten_query(params),
                headers,
                body: None,
            });
        }

        let body = if params.is_empty() {
            None
        } else {
            headers.push(("content-type".to_string(), "application/json".to_string()));
            Some(
                serde_json::to_string(params)
                    .map_err(|e| ModelError::Serialization(e.to_string()))?,
            )
        };
        Ok(HttpRequest {
            method,
            url,
            query: Vec::new(),
            headers,
            body,
        })
    }

    /// Perform one request and normalise its response.
    ///
    /// Any status code yields an envelope; only transport failures and
    /// unparseable bodies are errors.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        params: &Params,
    ) -> Result<Envelope, ModelError> {
        let request = self.build_request(method, path, params)?;

        let span = tracing::info_span!(
            "request",
            method = %method,
            url = field::Empty,
            status = field::Empty
        );
        let _entered = span.enter();

        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(url = %request.full_url(), error = %err, "request failed");
                return Err(err);
            }
        };
        span.record("url", response.url.as_str());
        span.record("status", response.status);
        tracing::debug!(bytes = response.body.len(), "response received");

        Envelope::from_response(&response)
    }
}
