//! Scripted transport for tests.
//!
//! [`FakeNetworkClient`] replays a queue of canned outcomes and records every
//! request it was handed, so tests can assert on retries and headers without
//! a server.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use boxkit_core::{ApiRequest, BoxError, BoxResult, FetchResponse, NetworkClient, ResponseFormat};
use serde_json::{json, Value};

/// One scripted attempt.
#[derive(Debug, Clone)]
pub enum CannedOutcome {
    Response(FetchResponse),
    /// The attempt fails before any response arrives
    TransportError(String),
}

/// Build a JSON response with the given status.
pub fn json_response(status: u16, body: Value) -> FetchResponse {
    FetchResponse {
        url: String::new(),
        status,
        headers: BTreeMap::from([("content-type".to_string(), "application/json".to_string())]),
        content: body.to_string().into_bytes(),
        data: Some(body),
    }
}

/// A Box style error body.
pub fn error_body(status: u16, code: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "status": status,
        "code": code,
        "message": message,
        "request_id": "fake-request-id",
    })
}

/// A fake transport that returns canned outcomes in order.
///
/// Once the script runs out it answers with the fallback response, or a 404
/// error body when none was set.
#[derive(Debug, Default)]
pub struct FakeNetworkClient {
    script: Mutex<VecDeque<CannedOutcome>>,
    fallback: Option<FetchResponse>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeNetworkClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a JSON response.
    #[must_use]
    pub fn with_json(self, status: u16, body: Value) -> Self {
        self.push(CannedOutcome::Response(json_response(status, body)));
        self
    }

    /// Queue a fully specified response.
    #[must_use]
    pub fn with_response(self, response: FetchResponse) -> Self {
        self.push(CannedOutcome::Response(response));
        self
    }

    /// Queue a transport failure.
    #[must_use]
    pub fn with_transport_error(self, message: &str) -> Self {
        self.push(CannedOutcome::TransportError(message.to_string()));
        self
    }

    /// Response used after the script is exhausted.
    #[must_use]
    pub fn with_fallback(mut self, response: FetchResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// Queue an outcome on a client that is already shared.
    pub fn push(&self, outcome: CannedOutcome) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Every request handed to the transport, oldest first.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<ApiRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    fn next_outcome(&self) -> CannedOutcome {
        let scripted = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        scripted.unwrap_or_else(|| {
            CannedOutcome::Response(self.fallback.clone().unwrap_or_else(|| {
                json_response(404, error_body(404, "not_found", "No scripted response"))
            }))
        })
    }
}

#[async_trait]
impl NetworkClient for FakeNetworkClient {
    async fn execute(&self, request: &ApiRequest, _format: ResponseFormat) -> BoxResult<FetchResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        match self.next_outcome() {
            CannedOutcome::Response(mut response) => {
                if response.url.is_empty() {
                    response.url.clone_from(&request.url);
                }
                Ok(response)
            }
            CannedOutcome::TransportError(message) => Err(BoxError::Network { message }),
        }
    }
}
