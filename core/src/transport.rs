//! The seam between request building and the network.
//!
//! # Design
//! `Transport` takes a plain-data `HttpRequest` and returns a plain-data
//! `HttpResponse`. Any status code is a successful round-trip at this layer;
//! only failures that prevent a response (DNS, refused connection, timeout,
//! unreadable body) are errors. Nothing here retries.

use std::time::Duration;

use crate::config::Config;
use crate::error::ModelError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ModelError>;
}

/// Blocking transport backed by a `ureq` agent.
///
/// The agent is configured with `http_status_as_error(false)` so 4xx/5xx
/// responses come back as data and their bodies (which usually carry the
/// `errors` section) can be mapped onto the model.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &Config) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout_secs.map(Duration::from_secs))
            .build()
            .new_agent();
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ModelError> {
        let url = request.full_url();
        let headers = &request.headers;
        let body = request.body.as_deref();

        let result = match (request.method, body) {
            (HttpMethod::Get, None) => with_headers(self.agent.get(&url), headers).call(),
            (HttpMethod::Get, Some(body)) => with_headers(self.agent.get(&url), headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Delete, None) => with_headers(self.agent.delete(&url), headers).call(),
            (HttpMethod::Delete, Some(body)) => with_headers(self.agent.delete(&url), headers)
                .force_send_body()
                .send(body.as_bytes()),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&url), headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers(self.agent.patch(&url), headers).send(body.as_bytes())
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(&url), headers).send_empty(),
        };

        let mut response = result.map_err(|e| ModelError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, url, body })
    }
}
