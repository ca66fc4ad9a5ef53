//! In-memory gateway for tests.
//!
//! Responses are queued per `(method, endpoint)` and consumed in order.
//! Every call is recorded so tests can assert exact call counts and bodies.
//! A call with nothing queued fails with a transport error naming the route.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use crm_bridge_core::LocationId;
use serde_json::Value;

use crate::gateway::{CrmError, CrmGateway, Method, Payload};

/// One request as seen by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub endpoint: String,
    pub payload: Payload,
}

type Route = (Method, String);

/// Scripted [`CrmGateway`].
#[derive(Debug)]
pub struct ScriptedGateway {
    location_id: LocationId,
    responses: Mutex<HashMap<Route, VecDeque<Result<Value, CrmError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new(location_id: &str) -> Self {
        Self {
            location_id: LocationId::new_unchecked(location_id),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next call to `method endpoint`.
    pub fn respond(
        &self,
        method: Method,
        endpoint: &str,
        response: Result<Value, CrmError>,
    ) -> &Self {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((method, endpoint.to_string()))
            .or_default()
            .push_back(response);
        self
    }

    /// Queue a remote rejection.
    pub fn reject(&self, method: Method, endpoint: &str, status: u16, body: &str) -> &Self {
        self.respond(
            method,
            endpoint,
            Err(CrmError::Remote {
                status,
                body: body.to_string(),
            }),
        )
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Calls made to one route.
    #[must_use]
    pub fn calls_to(&self, method: &Method, endpoint: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| &c.method == method && c.endpoint == endpoint)
            .collect()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// The single call made so far.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one call was made.
    #[must_use]
    pub fn only_call(&self) -> RecordedCall {
        let mut calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one call, got {calls:#?}");
        calls.remove(0)
    }

    /// Whether every queued response has been consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(VecDeque::is_empty)
    }
}

impl CrmGateway for ScriptedGateway {
    fn location_id(&self) -> &LocationId {
        &self.location_id
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        payload: Payload,
    ) -> Result<Value, CrmError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                method: method.clone(),
                endpoint: endpoint.to_string(),
                payload,
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&(method.clone(), endpoint.to_string()))
            .and_then(VecDeque::pop_front);

        next.unwrap_or_else(|| {
            Err(CrmError::Transport(format!(
                "no scripted response for {method} {endpoint}"
            )))
        })
    }
}
