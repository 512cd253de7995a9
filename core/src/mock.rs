//! In-memory `Transport` for tests.
//!
//! `MockTransport` answers requests from a queue of canned outcomes and
//! records every request it receives, so tests can assert on exactly what
//! the mapping layer put on the wire. A clone shares the same queue and log,
//! which lets a test keep a handle after moving the transport into a
//! `Connection`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::error::ModelError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

enum Canned {
    Respond { status: u16, body: String },
    Fail(String),
}

#[derive(Default)]
struct State {
    queue: VecDeque<Canned>,
    requests: Vec<HttpRequest>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a response with a JSON body.
    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(status, body.to_string())
    }

    /// Queue a response with a raw body.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Canned::Respond {
            status,
            body: body.into(),
        });
        self
    }

    /// Queue a transport failure.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.lock().queue.push_back(Canned::Fail(message.into()));
        self
    }

    /// Every request executed so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.lock().requests.last().cloned()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ModelError> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        match state.queue.pop_front() {
            Some(Canned::Respond { status, body }) => Ok(HttpResponse {
                status,
                url: request.full_url(),
                body,
            }),
            Some(Canned::Fail(message)) => Err(ModelError::Transport(message)),
            None => Err(ModelError::Transport(format!(
                "no canned response for {} {}",
                request.method,
                request.full_url()
            ))),
        }
    }
}
